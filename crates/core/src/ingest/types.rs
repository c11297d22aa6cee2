use crate::domain::market::{Fundamentals, PriceBar};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub symbol: String,
    #[serde(default)]
    pub bars: Vec<PriceBar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalsResponse {
    pub symbol: String,
    #[serde(default)]
    pub fundamentals: Fundamentals,
}
