//! Summarizes broad index behavior into a [`MarketContext`].

use crate::analysis::stats;
use crate::domain::market::{MarketContext, MarketStrategy, Sentiment};
use crate::ingest::provider::MarketDataClient;

pub const MARKET_INDICES: [&str; 3] = ["^GSPC", "^IXIC", "^DJI"];
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexStats {
    pub momentum: f64,
    pub volatility: f64,
}

/// Momentum and annualized volatility (both in percent) of one index's closes.
pub fn index_stats(closes: &[f64]) -> Option<IndexStats> {
    if closes.len() < 2 {
        return None;
    }
    let first = closes[0];
    let last = closes[closes.len() - 1];
    if first == 0.0 || !first.is_finite() || !last.is_finite() {
        return None;
    }

    let momentum = (last - first) / first * 100.0;
    let daily = stats::pct_changes(closes);
    let volatility = stats::sample_std_dev(&daily).unwrap_or(0.0) * TRADING_DAYS_PER_YEAR.sqrt();
    Some(IndexStats {
        momentum,
        volatility,
    })
}

pub fn classify_sentiment(momentum: f64) -> Sentiment {
    if momentum > 2.0 {
        Sentiment::Bullish
    } else if momentum < -2.0 {
        Sentiment::Bearish
    } else {
        Sentiment::Neutral
    }
}

pub fn classify_strategy(sentiment: Sentiment, volatility: f64) -> MarketStrategy {
    match sentiment {
        Sentiment::Bullish if volatility < 20.0 => MarketStrategy::GrowthMomentum,
        Sentiment::Bearish if volatility > 25.0 => MarketStrategy::DefensiveValue,
        _ if volatility > 30.0 => MarketStrategy::VolatilityTrading,
        _ => MarketStrategy::Balanced,
    }
}

/// Aggregates per-index stats; no usable index means [`MarketContext::neutral`].
pub fn summarize(indices: &[IndexStats]) -> MarketContext {
    let momenta: Vec<f64> = indices.iter().map(|s| s.momentum).collect();
    let vols: Vec<f64> = indices.iter().map(|s| s.volatility).collect();
    let (Some(momentum), Some(volatility)) = (stats::mean(&momenta), stats::mean(&vols)) else {
        return MarketContext::neutral();
    };

    let sentiment = classify_sentiment(momentum);
    MarketContext {
        sentiment,
        momentum,
        volatility,
        strategy: classify_strategy(sentiment, volatility),
    }
}

/// Reads one month of daily closes for each index. Never fails: indices that cannot be
/// read are skipped and a total outage yields the neutral context.
pub async fn analyze_market_context(market: &dyn MarketDataClient) -> MarketContext {
    let mut collected = Vec::with_capacity(MARKET_INDICES.len());
    for index in MARKET_INDICES {
        match market.fetch_history(index, "1mo", "1d").await {
            Ok(bars) => {
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                match index_stats(&closes) {
                    Some(s) => collected.push(s),
                    None => tracing::debug!(index, bars = bars.len(), "index has no usable closes"),
                }
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "index history fetch failed; skipping");
            }
        }
    }

    if collected.is_empty() {
        tracing::warn!("no index data available; using neutral market context");
    }
    summarize(&collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::{Fundamentals, PriceBar};
    use chrono::NaiveDate;

    struct FixedIndices {
        closes: Option<Vec<f64>>,
    }

    #[async_trait::async_trait]
    impl MarketDataClient for FixedIndices {
        fn provider_name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_history(
            &self,
            _symbol: &str,
            _period: &str,
            _interval: &str,
        ) -> anyhow::Result<Vec<PriceBar>> {
            let Some(closes) = &self.closes else {
                anyhow::bail!("provider down");
            };
            let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
            Ok(closes
                .iter()
                .enumerate()
                .map(|(i, c)| PriceBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: *c,
                    high: *c,
                    low: *c,
                    close: *c,
                    volume: 1.0,
                })
                .collect())
        }

        async fn fetch_fundamentals(&self, _symbol: &str) -> anyhow::Result<Fundamentals> {
            Ok(Fundamentals::default())
        }
    }

    #[test]
    fn strategy_labels() {
        assert_eq!(
            classify_strategy(Sentiment::Bullish, 15.0),
            MarketStrategy::GrowthMomentum
        );
        assert_eq!(
            classify_strategy(Sentiment::Bearish, 26.0),
            MarketStrategy::DefensiveValue
        );
        assert_eq!(
            classify_strategy(Sentiment::Bullish, 31.0),
            MarketStrategy::VolatilityTrading
        );
        assert_eq!(
            classify_strategy(Sentiment::Neutral, 22.0),
            MarketStrategy::Balanced
        );
        assert_eq!(
            classify_strategy(Sentiment::Bearish, 24.0),
            MarketStrategy::Balanced
        );
    }

    #[test]
    fn sentiment_thresholds_are_exclusive() {
        assert_eq!(classify_sentiment(2.0), Sentiment::Neutral);
        assert_eq!(classify_sentiment(2.1), Sentiment::Bullish);
        assert_eq!(classify_sentiment(-2.1), Sentiment::Bearish);
    }

    #[test]
    fn index_stats_of_flat_series() {
        let s = index_stats(&[100.0, 100.0, 100.0]).unwrap();
        assert_eq!(s.momentum, 0.0);
        assert_eq!(s.volatility, 0.0);
        assert!(index_stats(&[100.0]).is_none());
    }

    #[tokio::test]
    async fn total_outage_yields_neutral_defaults() {
        let ctx = analyze_market_context(&FixedIndices { closes: None }).await;
        assert_eq!(ctx, MarketContext::neutral());
        assert_eq!(ctx.volatility, 15.0);
        assert_eq!(ctx.strategy, MarketStrategy::Balanced);
    }

    #[tokio::test]
    async fn steady_rally_is_bullish_growth() {
        let closes: Vec<f64> = (0..21).map(|i| 100.0 + i as f64 * 0.25).collect();
        let ctx = analyze_market_context(&FixedIndices {
            closes: Some(closes),
        })
        .await;
        assert_eq!(ctx.sentiment, Sentiment::Bullish);
        assert!((ctx.momentum - 5.0).abs() < 1e-9);
        assert_eq!(ctx.strategy, MarketStrategy::GrowthMomentum);
    }
}
