//! Turns selected candidates into annotated recommendations.

use crate::domain::profile::UserProfile;
use crate::domain::recommendation::{
    ConfidenceLabel, Recommendation, RiskLabel, ScoredCandidate,
};
use crate::llm::error::InsightError;
use crate::llm::{InsightGenerator, InsightPrompt};

const HIGH_RISK_SECTORS: [&str; 3] = ["Technology", "Biotech", "Energy"];
const TARGET_PRICE_SPREAD: f64 = 0.15;

pub fn risk_label(beta: f64, sector: &str) -> RiskLabel {
    if beta > 1.5 || HIGH_RISK_SECTORS.contains(&sector) {
        RiskLabel::High
    } else if beta > 1.2 {
        RiskLabel::Medium
    } else {
        RiskLabel::Low
    }
}

/// Price target scaled by how far the total score sits from the neutral 50, rounded to cents.
pub fn target_price(price: f64, total_score: f64) -> f64 {
    let tilt = ((total_score - 50.0) / 50.0).clamp(-1.0, 1.0);
    let target = price * (1.0 + tilt * TARGET_PRICE_SPREAD);
    (target * 100.0).round() / 100.0
}

/// Deterministic insight used whenever the text generator is unavailable.
pub fn fallback_insight(candidate: &ScoredCandidate, profile: &UserProfile) -> String {
    format!(
        "{} offers {}. Size the position to match your {} risk tolerance.",
        candidate.symbol,
        candidate.reason,
        profile.risk_tolerance.as_str()
    )
}

pub fn insight_prompt(candidate: &ScoredCandidate, profile: &UserProfile) -> InsightPrompt {
    InsightPrompt {
        symbol: candidate.symbol.clone(),
        name: candidate.name.clone(),
        sector: candidate.sector.clone(),
        price: candidate.price,
        total_score: candidate.total_score,
        technical_score: candidate.scores.technical,
        fundamental_score: candidate.scores.fundamental,
        sentiment_score: candidate.scores.sentiment,
        fit_score: candidate.scores.fit,
        rsi: candidate.rsi,
        pe_ratio: candidate.pe_ratio,
        reason: candidate.reason.clone(),
        risk_tolerance: profile.risk_tolerance,
        trading_style: profile.trading_style,
        preferred_sectors: profile.preferred_sectors.clone(),
    }
}

pub async fn enrich(
    selected: Vec<ScoredCandidate>,
    profile: &UserProfile,
    insights: &dyn InsightGenerator,
) -> Vec<Recommendation> {
    let mut out = Vec::with_capacity(selected.len());
    for (idx, candidate) in selected.into_iter().enumerate() {
        let prompt = insight_prompt(&candidate, profile);
        let ai_insight = match insights.generate_insight(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => fallback_insight(&candidate, profile),
            Err(err) => {
                match err.downcast_ref::<InsightError>() {
                    Some(diag) => tracing::warn!(
                        symbol = %candidate.symbol,
                        provider = ?diag.provider,
                        stage = %diag.stage,
                        raw_output = diag.raw_excerpt().unwrap_or_default(),
                        error = %err,
                        "insight generation failed; using fallback text"
                    ),
                    None => tracing::warn!(
                        symbol = %candidate.symbol,
                        provider = ?insights.provider(),
                        error = %err,
                        "insight generation failed; using fallback text"
                    ),
                }
                fallback_insight(&candidate, profile)
            }
        };

        out.push(Recommendation {
            rank: idx + 1,
            confidence: ConfidenceLabel::from_score(candidate.total_score),
            risk_level: risk_label(candidate.beta, &candidate.sector),
            target_price: target_price(candidate.price, candidate.total_score),
            time_horizon: profile.trading_style.time_horizon().to_string(),
            ai_insight,
            candidate,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::profile::default_profile;
    use crate::domain::recommendation::SubScores;
    use crate::llm::error::InsightStage;
    use crate::llm::Provider;

    struct Failing;

    #[async_trait::async_trait]
    impl InsightGenerator for Failing {
        fn provider(&self) -> Provider {
            Provider::Disabled
        }

        async fn generate_insight(&self, _prompt: &InsightPrompt) -> anyhow::Result<String> {
            anyhow::bail!("upstream timeout")
        }
    }

    struct Malformed;

    #[async_trait::async_trait]
    impl InsightGenerator for Malformed {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn generate_insight(&self, prompt: &InsightPrompt) -> anyhow::Result<String> {
            Err(InsightError {
                provider: Provider::Anthropic,
                stage: InsightStage::Parse,
                symbol: prompt.symbol.clone(),
                detail: "no insight field".to_string(),
                raw_output: Some("{\"summary\": 1}".to_string()),
            }
            .into())
        }
    }

    struct Echo;

    #[async_trait::async_trait]
    impl InsightGenerator for Echo {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn generate_insight(&self, prompt: &InsightPrompt) -> anyhow::Result<String> {
            Ok(format!("insight for {}", prompt.symbol))
        }
    }

    fn candidate(symbol: &str, sector: &str, beta: f64, total: f64) -> ScoredCandidate {
        ScoredCandidate {
            symbol: symbol.to_string(),
            name: None,
            scores: SubScores {
                technical: total,
                fundamental: total,
                sentiment: total,
                fit: total,
            },
            total_score: total,
            price: 100.0,
            volume: 1.0,
            sector: sector.to_string(),
            beta,
            pe_ratio: Some(18.0),
            market_cap: None,
            momentum: 1.0,
            rsi: 55.0,
            reason: "solid fundamentals".to_string(),
        }
    }

    #[test]
    fn risk_labels() {
        assert_eq!(risk_label(1.0, "Technology"), RiskLabel::High);
        assert_eq!(risk_label(1.6, "Utilities"), RiskLabel::High);
        assert_eq!(risk_label(1.3, "Utilities"), RiskLabel::Medium);
        assert_eq!(risk_label(1.2, "Financial"), RiskLabel::Low);
    }

    #[test]
    fn target_price_scales_with_score() {
        assert_eq!(target_price(100.0, 100.0), 115.0);
        assert_eq!(target_price(100.0, 50.0), 100.0);
        assert_eq!(target_price(100.0, 0.0), 85.0);
        assert_eq!(target_price(80.0, 75.0), 86.0);
    }

    #[tokio::test]
    async fn failing_generator_keeps_numbers_and_uses_fallback_text() {
        let profile = default_profile("u");
        let recs = enrich(
            vec![candidate("JPM", "Financial", 1.1, 82.0)],
            &profile,
            &Failing,
        )
        .await;
        assert_eq!(recs.len(), 1);
        let r = &recs[0];
        assert_eq!(
            r.ai_insight,
            "JPM offers solid fundamentals. Size the position to match your moderate risk tolerance."
        );
        assert_eq!(r.rank, 1);
        assert_eq!(r.confidence, ConfidenceLabel::High);
        assert_eq!(r.risk_level, RiskLabel::Low);
        assert_eq!(r.time_horizon, "2-6 weeks");
        assert_eq!(r.target_price, 109.6);
    }

    #[tokio::test]
    async fn diagnosed_provider_failure_falls_back_per_candidate() {
        let profile = default_profile("u");
        let recs = enrich(
            vec![
                candidate("AAPL", "Technology", 1.2, 70.0),
                candidate("JNJ", "Healthcare", 0.6, 66.0),
            ],
            &profile,
            &Malformed,
        )
        .await;
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].rank, 2);
        for r in &recs {
            assert_eq!(r.ai_insight, fallback_insight(&r.candidate, &profile));
        }
    }

    #[tokio::test]
    async fn generator_text_is_used_when_available() {
        let profile = default_profile("u");
        let recs = enrich(
            vec![
                candidate("AAPL", "Technology", 1.2, 70.0),
                candidate("XOM", "Energy", 0.9, 60.0),
            ],
            &profile,
            &Echo,
        )
        .await;
        assert_eq!(recs[0].ai_insight, "insight for AAPL");
        assert_eq!(recs[1].rank, 2);
        assert_eq!(recs[1].confidence, ConfidenceLabel::Low);
    }
}
