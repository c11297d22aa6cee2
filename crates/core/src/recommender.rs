//! End-to-end recommendation pipeline.
//!
//! Every stage degrades instead of failing: a missing history becomes the default profile,
//! missing index data becomes the neutral market context, unscorable candidates are dropped,
//! insight failures become fallback text, and a failure of the pipeline as a whole becomes
//! [`fallback_response`].

use crate::analysis::{confidence, enrich, market, profile, scoring, selection};
use crate::cache::ProfileCache;
use crate::domain::market::MarketContext;
use crate::domain::profile::{ProfileSummary, UserProfile};
use crate::domain::recommendation::{
    ConfidenceLabel, Recommendation, RecommendationResponse, ScoredCandidate, SubScores,
};
use crate::ingest::provider::MarketDataClient;
use crate::ingest::trades::TradeHistorySource;
use crate::ingest::universe::{build_candidate_pool, CandidateUniverse};
use crate::llm::InsightGenerator;
use anyhow::{ensure, Context};
use chrono::Utc;
use std::sync::Arc;

pub const FALLBACK_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct RecommenderOptions {
    /// Recommendations returned when the caller does not ask for a specific count.
    pub default_count: usize,

    /// Upper bound on symbols scored per request.
    pub max_candidates: usize,
}

impl Default for RecommenderOptions {
    fn default() -> Self {
        Self {
            default_count: 5,
            max_candidates: 30,
        }
    }
}

impl RecommenderOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        let var = |name: &str| positive_env(name, std::env::var(name).ok());

        if let Some(n) = var("RECOMMENDATION_COUNT") {
            out.default_count = n;
        }

        if let Some(n) = var("MAX_CANDIDATES") {
            out.max_candidates = n;
        }

        out
    }
}

/// `None` for unset, unparsable or zero values; the latter two are logged.
fn positive_env(name: &str, raw: Option<String>) -> Option<usize> {
    let raw = raw?;
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(name, value = %raw, "expected a positive integer; keeping default");
            None
        }
    }
}

pub struct Recommender {
    pub market_data: Arc<dyn MarketDataClient>,
    pub insights: Arc<dyn InsightGenerator>,
    pub trades: Arc<dyn TradeHistorySource>,
    pub universe: Arc<dyn CandidateUniverse>,
    pub profiles: Arc<dyn ProfileCache>,
    pub options: RecommenderOptions,
}

impl Recommender {
    /// Always returns a well-formed response.
    pub async fn recommend(&self, user_id: &str, count: Option<usize>) -> RecommendationResponse {
        let count = count.unwrap_or(self.options.default_count);
        match self.try_recommend(user_id, count).await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::error!(user_id, error = %format!("{err:#}"), "recommendation pipeline failed; serving fallback payload");
                fallback_response(user_id)
            }
        }
    }

    pub async fn try_recommend(
        &self,
        user_id: &str,
        count: usize,
    ) -> anyhow::Result<RecommendationResponse> {
        let profile = self.build_profile(user_id).await;
        self.profiles.put(profile.clone());

        let market_context = market::analyze_market_context(self.market_data.as_ref()).await;

        let pool = build_candidate_pool(
            self.universe.as_ref(),
            &profile.preferred_sectors,
            self.options.max_candidates,
        )
        .context("candidate universe unavailable")?;
        ensure!(!pool.is_empty(), "candidate universe is empty");

        let scored =
            scoring::score_candidates(self.market_data.as_ref(), &pool, &profile, &market_context)
                .await;
        ensure!(!scored.is_empty(), "no candidate could be scored");

        let selected = selection::select_diversified(&scored, count);
        let confidence_score = confidence::overall_confidence(&selected, &profile);
        let recommendations = enrich::enrich(selected, &profile, self.insights.as_ref()).await;

        tracing::info!(
            user_id,
            candidates = pool.len(),
            scored = scored.len(),
            returned = recommendations.len(),
            confidence_score,
            sentiment = ?market_context.sentiment,
            "recommendations generated"
        );

        Ok(RecommendationResponse {
            user_id: user_id.to_string(),
            recommendations,
            user_profile_summary: ProfileSummary::from(&profile),
            market_context,
            confidence_score,
            generated_at: Utc::now(),
            refresh_recommended_in: profile.trading_style.refresh_interval().to_string(),
        })
    }

    pub async fn build_profile(&self, user_id: &str) -> UserProfile {
        let trades = match self.trades.load_trades(user_id).await {
            Ok(trades) => trades,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "trading history unavailable; treating as empty");
                Vec::new()
            }
        };
        profile::build_profile(user_id, &trades)
    }
}

/// Fixed payload served when the pipeline cannot produce anything better.
pub fn fallback_response(user_id: &str) -> RecommendationResponse {
    let default_profile = profile::default_profile(user_id);
    let scores = SubScores {
        technical: 65.0,
        fundamental: 65.0,
        sentiment: 65.0,
        fit: 65.0,
    };
    let total_score = scores.total();
    let candidate = ScoredCandidate {
        symbol: "AAPL".to_string(),
        name: Some("Apple Inc.".to_string()),
        scores,
        total_score,
        price: 150.0,
        volume: 0.0,
        sector: "Technology".to_string(),
        beta: 1.2,
        pe_ratio: None,
        market_cap: None,
        momentum: 0.0,
        rsi: 50.0,
        reason: "a large-cap technology leader with strong fundamentals".to_string(),
    };

    RecommendationResponse {
        user_id: user_id.to_string(),
        recommendations: vec![Recommendation {
            rank: 1,
            confidence: ConfidenceLabel::from_score(candidate.total_score),
            risk_level: enrich::risk_label(candidate.beta, &candidate.sector),
            target_price: enrich::target_price(candidate.price, candidate.total_score),
            time_horizon: default_profile.trading_style.time_horizon().to_string(),
            ai_insight: enrich::fallback_insight(&candidate, &default_profile),
            candidate,
        }],
        user_profile_summary: ProfileSummary::from(&default_profile),
        market_context: MarketContext::neutral(),
        confidence_score: FALLBACK_CONFIDENCE,
        generated_at: Utc::now(),
        refresh_recommended_in: "1 hour".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryProfileCache;
    use crate::domain::market::{Fundamentals, PriceBar, Sentiment};
    use crate::domain::profile::RiskTolerance;
    use crate::domain::trade::TradeRecord;
    use crate::ingest::trades::EmptyTradeHistory;
    use crate::ingest::universe::StaticUniverse;
    use crate::llm::{DisabledInsights, InsightPrompt, Provider};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    /// Deterministic market: each symbol has a linear price path and fixed fundamentals.
    struct FixtureMarket {
        slopes: HashMap<&'static str, f64>,
        fundamentals: HashMap<&'static str, Fundamentals>,
        fail_all: bool,
    }

    impl FixtureMarket {
        fn new() -> Self {
            let mut slopes = HashMap::new();
            let mut fundamentals = HashMap::new();
            let mut add = |sym: &'static str, slope: f64, sector: &str, pe: f64, beta: f64| {
                slopes.insert(sym, slope);
                fundamentals.insert(
                    sym,
                    Fundamentals {
                        name: Some(format!("{sym} Corp")),
                        sector: Some(sector.to_string()),
                        market_cap: Some(50.0e9),
                        beta: Some(beta),
                        trailing_pe: Some(pe),
                        ..Default::default()
                    },
                );
            };
            add("^GSPC", 0.2, "Index", 0.0, 1.0);
            add("^IXIC", 0.2, "Index", 0.0, 1.0);
            add("^DJI", 0.2, "Index", 0.0, 1.0);
            add("AAPL", 0.5, "Technology", 28.0, 1.2);
            add("MSFT", 0.4, "Technology", 32.0, 0.9);
            add("JNJ", 0.1, "Healthcare", 14.0, 0.6);
            add("JPM", 0.3, "Financial", 12.0, 1.1);
            add("XOM", -0.3, "Energy", 11.0, 0.9);
            Self {
                slopes,
                fundamentals,
                fail_all: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketDataClient for FixtureMarket {
        fn provider_name(&self) -> &'static str {
            "fixture"
        }

        async fn fetch_history(
            &self,
            symbol: &str,
            _period: &str,
            _interval: &str,
        ) -> anyhow::Result<Vec<PriceBar>> {
            anyhow::ensure!(!self.fail_all, "market data offline");
            let Some(slope) = self.slopes.get(symbol) else {
                return Ok(Vec::new());
            };
            let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
            Ok((0..40)
                .map(|i| {
                    let c = 100.0 + slope * i as f64;
                    PriceBar {
                        date: start + chrono::Duration::days(i),
                        open: c,
                        high: c,
                        low: c,
                        close: c,
                        volume: 1_000.0,
                    }
                })
                .collect())
        }

        async fn fetch_fundamentals(&self, symbol: &str) -> anyhow::Result<Fundamentals> {
            Ok(self.fundamentals.get(symbol).cloned().unwrap_or_default())
        }
    }

    struct BrokenUniverse;

    impl CandidateUniverse for BrokenUniverse {
        fn sectors(&self) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("universe store offline")
        }

        fn symbols_for(&self, _sector: &str) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("universe store offline")
        }
    }

    struct FailingTrades;

    #[async_trait::async_trait]
    impl TradeHistorySource for FailingTrades {
        async fn load_trades(&self, _user_id: &str) -> anyhow::Result<Vec<TradeRecord>> {
            anyhow::bail!("history db offline")
        }
    }

    struct CannedInsights;

    #[async_trait::async_trait]
    impl InsightGenerator for CannedInsights {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn generate_insight(&self, prompt: &InsightPrompt) -> anyhow::Result<String> {
            Ok(format!("{} fits a {} plan.", prompt.symbol, prompt.trading_style.as_str()))
        }
    }

    fn universe() -> StaticUniverse {
        StaticUniverse::new([
            ("Technology", vec!["AAPL", "MSFT"]),
            ("Healthcare", vec!["JNJ"]),
            ("Financial", vec!["JPM"]),
            ("Energy", vec!["XOM", "DELISTED"]),
        ])
    }

    fn recommender(
        market: FixtureMarket,
        universe: Arc<dyn CandidateUniverse>,
        trades: Arc<dyn TradeHistorySource>,
    ) -> (Recommender, Arc<InMemoryProfileCache>) {
        let profiles = Arc::new(InMemoryProfileCache::new());
        let rec = Recommender {
            market_data: Arc::new(market),
            insights: Arc::new(CannedInsights),
            trades,
            universe,
            profiles: profiles.clone(),
            options: RecommenderOptions::default(),
        };
        (rec, profiles)
    }

    #[tokio::test]
    async fn end_to_end_with_fixture_data() {
        let (rec, profiles) = recommender(
            FixtureMarket::new(),
            Arc::new(universe()),
            Arc::new(EmptyTradeHistory),
        );
        let resp = rec.recommend("user-1", Some(4)).await;

        assert_eq!(resp.user_id, "user-1");
        assert_eq!(resp.recommendations.len(), 4);
        assert_eq!(resp.market_context.sentiment, Sentiment::Bullish);
        assert_eq!(resp.user_profile_summary.risk_tolerance, RiskTolerance::Moderate);
        assert_eq!(resp.refresh_recommended_in, "1 day");
        assert!((0.1..=1.0).contains(&resp.confidence_score));

        let symbols: Vec<&str> = resp
            .recommendations
            .iter()
            .map(|r| r.candidate.symbol.as_str())
            .collect();
        assert!(!symbols.contains(&"DELISTED"));
        let ranks: Vec<usize> = resp.recommendations.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert_eq!(
            resp.recommendations[0].ai_insight,
            format!("{} fits a swing plan.", symbols[0])
        );

        // First three picks cover three distinct sectors.
        let sectors: std::collections::HashSet<&str> = resp.recommendations[..3]
            .iter()
            .map(|r| r.candidate.sector.as_str())
            .collect();
        assert_eq!(sectors.len(), 3);

        assert!(profiles.get("user-1").is_some());
    }

    #[tokio::test]
    async fn total_failure_serves_exact_fallback_payload() {
        let mut market = FixtureMarket::new();
        market.fail_all = true;
        let (rec, _) = recommender(market, Arc::new(universe()), Arc::new(FailingTrades));
        let resp = rec.recommend("user-2", None).await;

        assert_eq!(resp.user_id, "user-2");
        assert_eq!(resp.confidence_score, 0.6);
        assert_eq!(resp.recommendations.len(), 1);
        assert_eq!(resp.recommendations[0].candidate.symbol, "AAPL");
        assert_eq!(resp.market_context, MarketContext::neutral());
        assert_eq!(
            resp.user_profile_summary.preferred_sectors,
            vec!["Technology", "Healthcare", "Financial"]
        );
    }

    #[tokio::test]
    async fn universe_failure_serves_fallback_payload() {
        let (rec, _) = recommender(
            FixtureMarket::new(),
            Arc::new(BrokenUniverse),
            Arc::new(EmptyTradeHistory),
        );
        let resp = rec.recommend("user-3", Some(3)).await;
        assert_eq!(resp.confidence_score, FALLBACK_CONFIDENCE);
        assert_eq!(resp.recommendations[0].candidate.symbol, "AAPL");
    }

    #[tokio::test]
    async fn disabled_insights_still_produce_full_recommendations() {
        let (mut rec, _) = recommender(
            FixtureMarket::new(),
            Arc::new(universe()),
            Arc::new(EmptyTradeHistory),
        );
        rec.insights = Arc::new(DisabledInsights);
        let resp = rec.recommend("user-4", Some(2)).await;
        assert_eq!(resp.recommendations.len(), 2);
        for r in &resp.recommendations {
            assert!(r.ai_insight.starts_with(&r.candidate.symbol));
            assert!(r.ai_insight.ends_with("moderate risk tolerance."));
        }
    }

    #[test]
    fn options_ignore_zero_and_garbage() {
        assert_eq!(positive_env("RECOMMENDATION_COUNT", None), None);
        assert_eq!(positive_env("RECOMMENDATION_COUNT", Some("0".into())), None);
        assert_eq!(positive_env("RECOMMENDATION_COUNT", Some("five".into())), None);
        assert_eq!(positive_env("MAX_CANDIDATES", Some(" 12 ".into())), Some(12));
    }

    #[test]
    fn stored_payload_decodes_back_to_the_same_response() {
        let resp = fallback_response("user-9");
        let stored = serde_json::to_value(&resp).unwrap();
        let loaded: RecommendationResponse = serde_json::from_value(stored).unwrap();
        assert_eq!(loaded, resp);
    }

    #[test]
    fn fallback_payload_serializes_with_expected_keys() {
        let v = serde_json::to_value(fallback_response("u")).unwrap();
        for key in [
            "user_id",
            "recommendations",
            "user_profile_summary",
            "market_context",
            "confidence_score",
            "generated_at",
            "refresh_recommended_in",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["recommendations"][0]["symbol"], "AAPL");
        assert_eq!(v["market_context"]["sentiment"], "neutral");
        assert_eq!(v["user_profile_summary"]["trading_style"], "swing");
        assert_eq!(v["recommendations"][0]["target_price"], 156.75);
        assert_eq!(v["recommendations"][0]["confidence"], "Medium");
    }
}
