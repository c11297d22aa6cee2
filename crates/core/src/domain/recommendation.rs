use crate::domain::market::MarketContext;
use crate::domain::profile::ProfileSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TECHNICAL_WEIGHT: f64 = 0.30;
pub const FUNDAMENTAL_WEIGHT: f64 = 0.25;
pub const SENTIMENT_WEIGHT: f64 = 0.20;
pub const FIT_WEIGHT: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
    pub fit: f64,
}

impl SubScores {
    pub fn total(&self) -> f64 {
        self.technical * TECHNICAL_WEIGHT
            + self.fundamental * FUNDAMENTAL_WEIGHT
            + self.sentiment * SENTIMENT_WEIGHT
            + self.fit * FIT_WEIGHT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub symbol: String,
    pub name: Option<String>,
    pub scores: SubScores,
    pub total_score: f64,
    pub price: f64,
    pub volume: f64,
    pub sector: String,
    pub beta: f64,
    pub pe_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub momentum: f64,
    pub rsi: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn from_score(total_score: f64) -> Self {
        if total_score >= 80.0 {
            Self::High
        } else if total_score >= 65.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rank: usize,
    #[serde(flatten)]
    pub candidate: ScoredCandidate,
    pub ai_insight: String,
    pub confidence: ConfidenceLabel,
    pub risk_level: RiskLabel,
    pub target_price: f64,
    pub time_horizon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub recommendations: Vec<Recommendation>,
    pub user_profile_summary: ProfileSummary,
    pub market_context: MarketContext,
    pub confidence_score: f64,
    pub generated_at: DateTime<Utc>,
    pub refresh_recommended_in: String,
}
