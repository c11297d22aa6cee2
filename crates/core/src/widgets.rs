//! Technical-indicator chart widgets, cached per (symbol, chart type).

use crate::analysis::indicators::{self, BollingerBands, FibonacciLevel, MacdSeries, RSI_PERIOD};
use crate::cache::{Clock, TtlCache};
use crate::ingest::provider::MarketDataClient;
use anyhow::{ensure, Context};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_WIDGET_TTL_SECS: i64 = 300;
const WIDGET_PERIOD: &str = "6mo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Price,
    Rsi,
    Macd,
    Bollinger,
    Volume,
    Fibonacci,
}

impl ChartType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Rsi => "rsi",
            Self::Macd => "macd",
            Self::Bollinger => "bollinger",
            Self::Volume => "volume",
            Self::Fibonacci => "fibonacci",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price" => Ok(Self::Price),
            "rsi" => Ok(Self::Rsi),
            "macd" => Ok(Self::Macd),
            "bollinger" => Ok(Self::Bollinger),
            "volume" => Ok(Self::Volume),
            "fibonacci" => Ok(Self::Fibonacci),
            other => anyhow::bail!("unknown chart type: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetSeries {
    Price {
        close: Vec<f64>,
        sma_20: Vec<Option<f64>>,
        sma_50: Vec<Option<f64>>,
    },
    Rsi {
        rsi: Vec<Option<f64>>,
        overbought: f64,
        oversold: f64,
    },
    Macd(MacdSeries),
    Bollinger(BollingerBands),
    Volume {
        volume: Vec<f64>,
        avg_20: Vec<Option<f64>>,
    },
    Fibonacci {
        high: f64,
        low: f64,
        levels: Vec<FibonacciLevel>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartWidget {
    pub symbol: String,
    pub chart_type: ChartType,
    pub dates: Vec<NaiveDate>,
    pub last_close: f64,
    pub series: WidgetSeries,
    pub generated_at: DateTime<Utc>,
}

pub struct WidgetGenerator {
    market_data: Arc<dyn MarketDataClient>,
    clock: Arc<dyn Clock>,
    cache: TtlCache<(String, ChartType), ChartWidget>,
}

impl WidgetGenerator {
    pub fn new(
        market_data: Arc<dyn MarketDataClient>,
        clock: Arc<dyn Clock>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            market_data,
            cache: TtlCache::new(ttl, clock.clone()),
            clock,
        }
    }

    pub async fn widget(&self, symbol: &str, chart_type: ChartType) -> anyhow::Result<ChartWidget> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let key = (symbol.clone(), chart_type);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(%symbol, %chart_type, "widget cache hit");
            return Ok(hit);
        }

        let bars = self
            .market_data
            .fetch_history(&symbol, WIDGET_PERIOD, "1d")
            .await
            .with_context(|| format!("failed to load history for {symbol}"))?;
        ensure!(!bars.is_empty(), "no price history for {symbol}");

        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let series = match chart_type {
            ChartType::Price => WidgetSeries::Price {
                sma_20: indicators::sma_series(&closes, 20),
                sma_50: indicators::sma_series(&closes, 50),
                close: closes.clone(),
            },
            ChartType::Rsi => WidgetSeries::Rsi {
                rsi: indicators::rsi_series(&closes, RSI_PERIOD),
                overbought: 70.0,
                oversold: 30.0,
            },
            ChartType::Macd => WidgetSeries::Macd(indicators::macd(&closes, 12, 26, 9)),
            ChartType::Bollinger => WidgetSeries::Bollinger(indicators::bollinger(&closes, 20, 2.0)),
            ChartType::Volume => WidgetSeries::Volume {
                avg_20: indicators::sma_series(&volumes, 20),
                volume: volumes,
            },
            ChartType::Fibonacci => {
                let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
                let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
                WidgetSeries::Fibonacci {
                    high,
                    low,
                    levels: indicators::fibonacci_levels(high, low),
                }
            }
        };

        let widget = ChartWidget {
            symbol: symbol.clone(),
            chart_type,
            dates,
            last_close: closes.last().copied().unwrap_or_default(),
            series,
            generated_at: self.clock.now(),
        };
        self.cache.insert(key, widget.clone());
        Ok(widget)
    }
}
