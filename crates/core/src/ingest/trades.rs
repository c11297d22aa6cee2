//! Trading-history sources.

use crate::domain::trade::TradeRecord;
use anyhow::Context;
use std::path::PathBuf;

#[async_trait::async_trait]
pub trait TradeHistorySource: Send + Sync {
    /// Closed trades for the user, in the order the source records them.
    async fn load_trades(&self, user_id: &str) -> anyhow::Result<Vec<TradeRecord>>;
}

/// Source for deployments without a history store; every user starts from the default profile.
#[derive(Debug, Clone, Default)]
pub struct EmptyTradeHistory;

#[async_trait::async_trait]
impl TradeHistorySource for EmptyTradeHistory {
    async fn load_trades(&self, _user_id: &str) -> anyhow::Result<Vec<TradeRecord>> {
        Ok(Vec::new())
    }
}

/// Reads a JSON array of trade records from disk, ignoring the user id.
/// Records keep their file order.
#[derive(Debug, Clone)]
pub struct JsonFileTradeHistory {
    path: PathBuf,
}

impl JsonFileTradeHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl TradeHistorySource for JsonFileTradeHistory {
    async fn load_trades(&self, _user_id: &str) -> anyhow::Result<Vec<TradeRecord>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read trades file {}", self.path.display()))?;
        serde_json::from_str::<Vec<TradeRecord>>(&text).with_context(|| {
            format!("trades file {} is not a JSON array of trades", self.path.display())
        })
    }
}
