use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStrategy {
    GrowthMomentum,
    DefensiveValue,
    VolatilityTrading,
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub sentiment: Sentiment,
    /// Mean one-month index momentum, in percent.
    pub momentum: f64,
    /// Mean annualized index volatility, in percent.
    pub volatility: f64,
    pub strategy: MarketStrategy,
}

impl MarketContext {
    /// Context used whenever no index data could be read.
    pub const fn neutral() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            momentum: 0.0,
            volatility: 15.0,
            strategy: MarketStrategy::Balanced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Issuer snapshot. Every field is optional because providers routinely omit them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub trailing_pe: Option<f64>,
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
    /// Fraction, e.g. 0.18 for 18%.
    #[serde(default)]
    pub return_on_equity: Option<f64>,
    /// Fraction, e.g. 0.12 for 12%.
    #[serde(default)]
    pub earnings_growth: Option<f64>,
    #[serde(default)]
    pub current_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCapBucket {
    Large,
    Mid,
    Small,
}

impl MarketCapBucket {
    pub fn from_market_cap(market_cap: f64) -> Self {
        if market_cap > 10_000_000_000.0 {
            Self::Large
        } else if market_cap >= 2_000_000_000.0 {
            Self::Mid
        } else {
            Self::Small
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Large => "large",
            Self::Mid => "mid",
            Self::Small => "small",
        }
    }
}
