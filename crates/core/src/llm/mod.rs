pub mod anthropic;
pub mod error;
pub mod json;

use crate::domain::profile::{RiskTolerance, TradingStyle};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Disabled,
}

/// Everything the text generator may see about one recommendation.
#[derive(Debug, Clone, Serialize)]
pub struct InsightPrompt {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: String,
    pub price: f64,
    pub total_score: f64,
    pub technical_score: f64,
    pub fundamental_score: f64,
    pub sentiment_score: f64,
    pub fit_score: f64,
    pub rsi: f64,
    pub pe_ratio: Option<f64>,
    pub reason: String,
    pub risk_tolerance: RiskTolerance,
    pub trading_style: TradingStyle,
    pub preferred_sectors: Vec<String>,
}

impl InsightPrompt {
    /// Deterministic rendering; identical inputs give identical prompts.
    pub fn render(&self) -> String {
        let name = self.name.as_deref().unwrap_or(&self.symbol);
        let pe = self
            .pe_ratio
            .map(|pe| format!("{pe:.1}"))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "Stock: {symbol} ({name}), sector {sector}, price ${price:.2}.\n\
Scores (0-100): total {total:.1}, technical {tech:.1}, fundamental {fund:.1}, sentiment {sent:.1}, profile fit {fit:.1}.\n\
RSI(14) {rsi:.1}, trailing P/E {pe}.\n\
Why it was picked: {reason}.\n\
Investor: {risk} risk tolerance, {style} trading style, prefers {sectors}.\n\n\
Write 2-3 sentences explaining why this stock suits this investor and the main risk to watch.",
            symbol = self.symbol,
            sector = self.sector,
            price = self.price,
            total = self.total_score,
            tech = self.technical_score,
            fund = self.fundamental_score,
            sent = self.sentiment_score,
            fit = self.fit_score,
            rsi = self.rsi,
            reason = self.reason,
            risk = self.risk_tolerance.as_str(),
            style = self.trading_style.as_str(),
            sectors = self.preferred_sectors.join(", "),
        )
    }
}

#[async_trait::async_trait]
pub trait InsightGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_insight(&self, prompt: &InsightPrompt) -> anyhow::Result<String>;
}

/// Generator used when no LLM credentials are configured; every call falls back.
#[derive(Debug, Clone, Default)]
pub struct DisabledInsights;

#[async_trait::async_trait]
impl InsightGenerator for DisabledInsights {
    fn provider(&self) -> Provider {
        Provider::Disabled
    }

    async fn generate_insight(&self, _prompt: &InsightPrompt) -> anyhow::Result<String> {
        anyhow::bail!("insight generation is disabled")
    }
}
