use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingStyle {
    DayTrading,
    ShortTerm,
    Swing,
    Position,
}

impl TradingStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DayTrading => "day_trading",
            Self::ShortTerm => "short_term",
            Self::Swing => "swing",
            Self::Position => "position",
        }
    }

    /// Suggested holding horizon shown next to each recommendation.
    pub fn time_horizon(self) -> &'static str {
        match self {
            Self::DayTrading => "1-3 days",
            Self::ShortTerm => "1-2 weeks",
            Self::Swing => "2-6 weeks",
            Self::Position => "3-6 months",
        }
    }

    pub fn refresh_interval(self) -> &'static str {
        match self {
            Self::DayTrading => "1 hour",
            Self::ShortTerm => "4 hours",
            Self::Swing => "1 day",
            Self::Position => "1 week",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuccessPatterns {
    pub success_rate: f64,
    pub avg_winner: f64,
    pub avg_loser: f64,
    pub win_loss_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePreference {
    pub min: f64,
    pub max: f64,
    pub preferred: f64,
}

impl PricePreference {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub avg_return: f64,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub risk_tolerance: RiskTolerance,
    pub preferred_sectors: Vec<String>,
    pub trading_style: TradingStyle,
    pub avg_holding_period: f64,
    pub success_patterns: SuccessPatterns,
    pub price_preference: PricePreference,
    pub market_cap_preference: String,
    pub volatility_preference: f64,
    pub performance_metrics: PerformanceMetrics,
    pub total_trades: usize,
}

/// Compact view of the profile echoed back in recommendation responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub risk_tolerance: RiskTolerance,
    pub preferred_sectors: Vec<String>,
    pub trading_style: TradingStyle,
    pub avg_holding_period: f64,
    pub win_rate: f64,
    pub total_trades: usize,
}

impl From<&UserProfile> for ProfileSummary {
    fn from(p: &UserProfile) -> Self {
        Self {
            risk_tolerance: p.risk_tolerance,
            preferred_sectors: p.preferred_sectors.clone(),
            trading_style: p.trading_style,
            avg_holding_period: p.avg_holding_period,
            win_rate: p.success_patterns.success_rate,
            total_trades: p.total_trades,
        }
    }
}
