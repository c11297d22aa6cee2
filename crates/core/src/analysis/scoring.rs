//! Candidate scoring: four sub-scores in [0, 100] combined with fixed weights.

use crate::analysis::indicators::{self, RSI_PERIOD};
use crate::domain::market::{
    Fundamentals, MarketCapBucket, MarketContext, PriceBar, Sentiment,
};
use crate::domain::profile::{RiskTolerance, UserProfile};
use crate::domain::recommendation::{ScoredCandidate, SubScores};
use crate::ingest::provider::MarketDataClient;
use anyhow::{ensure, Context};

const BASE_SCORE: f64 = 50.0;
const STRONG_SUBSCORE: f64 = 70.0;
const NEUTRAL_RSI: f64 = 50.0;
const MOMENTUM_LOOKBACK: usize = 20;
const VOLUME_WINDOW: usize = 20;
const DEFAULT_BETA: f64 = 1.0;
pub const UNKNOWN_SECTOR: &str = "Unknown";
pub const BALANCED_REASON: &str = "balanced opportunity";

fn clamp_score(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnicalReading {
    pub score: f64,
    pub rsi: f64,
}

pub fn technical_score(bars: &[PriceBar]) -> TechnicalReading {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let mut score = BASE_SCORE;

    let rsi = indicators::rsi(&closes, RSI_PERIOD).unwrap_or(NEUTRAL_RSI);
    if (30.0..=70.0).contains(&rsi) {
        score += 20.0;
    } else if rsi < 30.0 {
        score += 15.0;
    } else {
        score += 5.0;
    }

    if let Some(price) = closes.last().copied() {
        if indicators::sma(&closes, 20).is_some_and(|sma| price > sma) {
            score += 15.0;
        }
        if indicators::sma(&closes, 50).is_some_and(|sma| price > sma) {
            score += 10.0;
        }
    }

    match indicators::volume_ratio(&volumes, VOLUME_WINDOW) {
        Some(r) if r > 1.2 => score += 10.0,
        Some(r) if r > 1.0 => score += 5.0,
        _ => {}
    }

    TechnicalReading {
        score: clamp_score(score),
        rsi,
    }
}

pub fn fundamental_score(f: &Fundamentals, profile: &UserProfile) -> f64 {
    let mut score = BASE_SCORE;

    if let Some(pe) = f.trailing_pe {
        if pe > 0.0 && pe < 15.0 {
            score += 20.0;
        } else if (15.0..25.0).contains(&pe) {
            score += 15.0;
        } else if (25.0..35.0).contains(&pe) {
            score += 5.0;
        }
    }

    if let Some(cap) = f.market_cap {
        let bucket = MarketCapBucket::from_market_cap(cap);
        if bucket.as_str() == profile.market_cap_preference {
            score += 15.0;
        }
    }

    if f.debt_to_equity.is_some_and(|d| d < 50.0) {
        score += 10.0;
    }
    if f.return_on_equity.is_some_and(|r| r > 0.15) {
        score += 10.0;
    }
    if f.earnings_growth.is_some_and(|g| g > 0.10) {
        score += 10.0;
    }

    clamp_score(score)
}

pub fn sentiment_score(market: &MarketContext, momentum: f64) -> f64 {
    let mut score = BASE_SCORE;
    match market.sentiment {
        Sentiment::Bullish => score += 20.0,
        Sentiment::Bearish => score -= 10.0,
        Sentiment::Neutral => {}
    }

    if momentum > 3.0 {
        score += 15.0;
    } else if momentum > 0.0 {
        score += 5.0;
    } else if momentum < -3.0 {
        score -= 15.0;
    }

    clamp_score(score)
}

pub fn beta_matches_risk(beta: f64, risk: RiskTolerance) -> bool {
    match risk {
        RiskTolerance::Conservative => beta < 1.2,
        RiskTolerance::Moderate => (0.8..=1.5).contains(&beta),
        RiskTolerance::Aggressive => beta > 1.2,
    }
}

pub fn fit_score(sector: &str, price: f64, beta: f64, profile: &UserProfile) -> f64 {
    let mut score = BASE_SCORE;
    if profile.preferred_sectors.iter().any(|s| s == sector) {
        score += 25.0;
    }
    if profile.price_preference.contains(price) {
        score += 15.0;
    }
    if beta_matches_risk(beta, profile.risk_tolerance) {
        score += 10.0;
    }
    clamp_score(score)
}

pub fn build_reason(scores: &SubScores) -> String {
    let mut parts = Vec::new();
    if scores.technical > STRONG_SUBSCORE {
        parts.push("strong technical setup");
    }
    if scores.fundamental > STRONG_SUBSCORE {
        parts.push("solid fundamentals");
    }
    if scores.sentiment > STRONG_SUBSCORE {
        parts.push("positive market sentiment");
    }
    if scores.fit > STRONG_SUBSCORE {
        parts.push("excellent match for your profile");
    }

    if parts.is_empty() {
        BALANCED_REASON.to_string()
    } else {
        parts.join(", ")
    }
}

/// Scores one candidate from already-fetched data. `Ok(None)` when there is no history.
pub fn score_from_data(
    symbol: &str,
    bars: &[PriceBar],
    fundamentals: &Fundamentals,
    profile: &UserProfile,
    market: &MarketContext,
) -> anyhow::Result<Option<ScoredCandidate>> {
    let Some(last) = bars.last() else {
        return Ok(None);
    };
    ensure!(
        last.close.is_finite() && last.close > 0.0,
        "last close must be positive (got {})",
        last.close
    );

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let momentum = indicators::momentum(&closes, MOMENTUM_LOOKBACK).unwrap_or(0.0);

    let price = fundamentals
        .current_price
        .filter(|p| p.is_finite() && *p > 0.0)
        .unwrap_or(last.close);
    let sector = fundamentals
        .sector
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_SECTOR.to_string());
    let beta = fundamentals
        .beta
        .filter(|b| b.is_finite())
        .unwrap_or(DEFAULT_BETA);

    let technical = technical_score(bars);
    let scores = SubScores {
        technical: technical.score,
        fundamental: fundamental_score(fundamentals, profile),
        sentiment: sentiment_score(market, momentum),
        fit: fit_score(&sector, price, beta, profile),
    };
    let total_score = scores.total();
    ensure!(total_score.is_finite(), "total score is not finite");

    Ok(Some(ScoredCandidate {
        symbol: symbol.to_string(),
        name: fundamentals.name.clone(),
        reason: build_reason(&scores),
        scores,
        total_score,
        price,
        volume: last.volume,
        sector,
        beta,
        pe_ratio: fundamentals.trailing_pe,
        market_cap: fundamentals.market_cap,
        momentum,
        rsi: technical.rsi,
    }))
}

pub async fn score_candidate(
    market_data: &dyn MarketDataClient,
    symbol: &str,
    profile: &UserProfile,
    market: &MarketContext,
) -> anyhow::Result<Option<ScoredCandidate>> {
    let bars = market_data
        .fetch_history(symbol, "3mo", "1d")
        .await
        .context("history unavailable")?;
    if bars.is_empty() {
        return Ok(None);
    }
    let fundamentals = market_data
        .fetch_fundamentals(symbol)
        .await
        .context("fundamentals unavailable")?;
    score_from_data(symbol, &bars, &fundamentals, profile, market)
}

/// Scores every symbol, dropping failures, sorted by total score (ties by symbol).
pub async fn score_candidates(
    market_data: &dyn MarketDataClient,
    symbols: &[String],
    profile: &UserProfile,
    market: &MarketContext,
) -> Vec<ScoredCandidate> {
    let mut scored = Vec::with_capacity(symbols.len());
    let mut dropped: usize = 0;
    for symbol in symbols {
        match score_candidate(market_data, symbol, profile, market).await {
            Ok(Some(candidate)) => scored.push(candidate),
            Ok(None) => {
                dropped += 1;
                tracing::debug!(%symbol, "no price history; skipping candidate");
            }
            Err(err) => {
                dropped += 1;
                tracing::warn!(%symbol, error = %err, "candidate scoring failed; skipping");
            }
        }
    }

    sort_by_score(&mut scored);
    tracing::info!(
        user_id = %profile.user_id,
        scored = scored.len(),
        dropped,
        "candidate scoring finished"
    );
    scored
}

pub fn sort_by_score(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}
