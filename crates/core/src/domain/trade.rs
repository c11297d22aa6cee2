use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A closed trade as reported by the trading-history source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub sector: String,
    /// Market-cap bucket as recorded at trade time ("large", "Mid", ...).
    pub market_cap: String,
    pub success: bool,
    pub holding_period_days: f64,
    pub return_pct: f64,
}
