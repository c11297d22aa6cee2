//! Derives a [`UserProfile`] from a user's closed trades.

use crate::analysis::stats;
use crate::domain::profile::{
    PerformanceMetrics, PricePreference, RiskTolerance, SuccessPatterns, TradingStyle, UserProfile,
};
use crate::domain::trade::TradeRecord;
use anyhow::{ensure, Context};

pub const DEFAULT_SECTORS: [&str; 3] = ["Technology", "Healthcare", "Financial"];
pub const DEFAULT_SECTOR_PAIR: [&str; 2] = ["Technology", "Healthcare"];
pub const DEFAULT_AVG_HOLDING_DAYS: f64 = 21.0;
pub const DEFAULT_MARKET_CAP: &str = "large";
pub const DEFAULT_VOLATILITY: f64 = 0.15;
pub const DEFAULT_SUCCESS_PATTERNS: SuccessPatterns = SuccessPatterns {
    success_rate: 0.5,
    avg_winner: 5.0,
    avg_loser: -3.0,
    win_loss_ratio: 1.5,
};
pub const DEFAULT_PRICE_PREFERENCE: PricePreference = PricePreference {
    min: 10.0,
    max: 500.0,
    preferred: 100.0,
};

const MAX_PREFERRED_SECTORS: usize = 3;

/// Profile used for users without history and whenever building fails.
pub fn default_profile(user_id: &str) -> UserProfile {
    UserProfile {
        user_id: user_id.to_string(),
        risk_tolerance: RiskTolerance::Moderate,
        preferred_sectors: DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect(),
        trading_style: TradingStyle::Swing,
        avg_holding_period: DEFAULT_AVG_HOLDING_DAYS,
        success_patterns: DEFAULT_SUCCESS_PATTERNS,
        price_preference: DEFAULT_PRICE_PREFERENCE,
        market_cap_preference: DEFAULT_MARKET_CAP.to_string(),
        volatility_preference: DEFAULT_VOLATILITY,
        performance_metrics: PerformanceMetrics::default(),
        total_trades: 0,
    }
}

/// Builds the profile, substituting [`default_profile`] on any failure.
pub fn build_profile(user_id: &str, trades: &[TradeRecord]) -> UserProfile {
    match try_build_profile(user_id, trades) {
        Ok(profile) => profile,
        Err(err) => {
            tracing::warn!(user_id, error = %err, "profile build failed; using default profile");
            default_profile(user_id)
        }
    }
}

pub fn try_build_profile(user_id: &str, trades: &[TradeRecord]) -> anyhow::Result<UserProfile> {
    if trades.is_empty() {
        return Ok(default_profile(user_id));
    }

    for trade in trades {
        validate_trade(trade).with_context(|| format!("invalid trade for {}", trade.symbol))?;
    }

    let holding: Vec<f64> = trades.iter().map(|t| t.holding_period_days).collect();
    let avg_holding_period = stats::mean(&holding).unwrap_or(DEFAULT_AVG_HOLDING_DAYS);

    Ok(UserProfile {
        user_id: user_id.to_string(),
        risk_tolerance: risk_tolerance(trades),
        preferred_sectors: preferred_sectors(trades),
        trading_style: trading_style(trades),
        avg_holding_period,
        success_patterns: success_patterns(trades),
        price_preference: price_preference(trades),
        market_cap_preference: market_cap_preference(trades),
        volatility_preference: volatility_preference(trades),
        performance_metrics: performance_metrics(trades),
        total_trades: trades.len(),
    })
}

fn validate_trade(trade: &TradeRecord) -> anyhow::Result<()> {
    ensure!(
        trade.entry_price.is_finite() && trade.exit_price.is_finite(),
        "prices must be finite"
    );
    ensure!(trade.return_pct.is_finite(), "return_pct must be finite");
    ensure!(
        trade.holding_period_days.is_finite() && trade.holding_period_days >= 0.0,
        "holding_period_days must be a non-negative number (got {})",
        trade.holding_period_days
    );
    Ok(())
}

fn abs_returns(trades: &[TradeRecord]) -> Vec<f64> {
    trades.iter().map(|t| t.return_pct.abs()).collect()
}

pub fn risk_tolerance(trades: &[TradeRecord]) -> RiskTolerance {
    match stats::mean(&abs_returns(trades)) {
        Some(v) if v > 15.0 => RiskTolerance::Aggressive,
        Some(v) if v > 8.0 => RiskTolerance::Moderate,
        Some(_) => RiskTolerance::Conservative,
        None => RiskTolerance::Moderate,
    }
}

/// Top sectors by `count * (1 + max(0, mean_return) / 10)`; ties keep first-seen order.
pub fn preferred_sectors(trades: &[TradeRecord]) -> Vec<String> {
    if trades.is_empty() {
        return DEFAULT_SECTOR_PAIR.iter().map(|s| s.to_string()).collect();
    }

    let mut groups: Vec<(&str, Vec<f64>)> = Vec::new();
    for trade in trades {
        match groups.iter_mut().find(|(sector, _)| *sector == trade.sector) {
            Some((_, returns)) => returns.push(trade.return_pct),
            None => groups.push((trade.sector.as_str(), vec![trade.return_pct])),
        }
    }

    let mut scored: Vec<(&str, f64)> = groups
        .iter()
        .map(|(sector, returns)| {
            let avg = stats::mean(returns).unwrap_or(0.0);
            let score = returns.len() as f64 * (1.0 + avg.max(0.0) / 10.0);
            (*sector, score)
        })
        .collect();

    // Stable sort keeps grouping order on equal scores.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
        .into_iter()
        .take(MAX_PREFERRED_SECTORS)
        .map(|(sector, _)| sector.to_string())
        .collect()
}

pub fn trading_style(trades: &[TradeRecord]) -> TradingStyle {
    let holding: Vec<f64> = trades.iter().map(|t| t.holding_period_days).collect();
    match stats::mean(&holding) {
        None => TradingStyle::Swing,
        Some(d) if d <= 1.0 => TradingStyle::DayTrading,
        Some(d) if d <= 7.0 => TradingStyle::ShortTerm,
        Some(d) if d <= 30.0 => TradingStyle::Swing,
        Some(_) => TradingStyle::Position,
    }
}

pub fn success_patterns(trades: &[TradeRecord]) -> SuccessPatterns {
    if trades.is_empty() {
        return DEFAULT_SUCCESS_PATTERNS;
    }

    let winners: Vec<f64> = trades.iter().filter(|t| t.success).map(|t| t.return_pct).collect();
    let losers: Vec<f64> = trades.iter().filter(|t| !t.success).map(|t| t.return_pct).collect();

    let avg_winner = stats::mean(&winners).unwrap_or(DEFAULT_SUCCESS_PATTERNS.avg_winner);
    let avg_loser = stats::mean(&losers).unwrap_or(DEFAULT_SUCCESS_PATTERNS.avg_loser);
    let win_loss_ratio = if avg_loser == 0.0 {
        DEFAULT_SUCCESS_PATTERNS.win_loss_ratio
    } else {
        (avg_winner / avg_loser).abs()
    };

    SuccessPatterns {
        success_rate: winners.len() as f64 / trades.len() as f64,
        avg_winner,
        avg_loser,
        win_loss_ratio,
    }
}

pub fn price_preference(trades: &[TradeRecord]) -> PricePreference {
    let entries: Vec<f64> = trades.iter().map(|t| t.entry_price).collect();
    match (
        stats::percentile(&entries, 25.0),
        stats::percentile(&entries, 75.0),
        stats::median(&entries),
    ) {
        (Some(p25), Some(p75), Some(median)) => PricePreference {
            min: p25.max(5.0),
            max: (p75 * 2.0).min(1000.0),
            preferred: median,
        },
        _ => DEFAULT_PRICE_PREFERENCE,
    }
}

/// Most frequent lower-cased market-cap bucket; ties go to the first seen.
pub fn market_cap_preference(trades: &[TradeRecord]) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for trade in trades {
        let bucket = trade.market_cap.trim().to_lowercase();
        match counts.iter_mut().find(|(b, _)| *b == bucket) {
            Some((_, n)) => *n += 1,
            None => counts.push((bucket, 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (bucket, n) in counts {
        if best.as_ref().map_or(true, |(_, m)| n > *m) {
            best = Some((bucket, n));
        }
    }
    best.map(|(b, _)| b)
        .unwrap_or_else(|| DEFAULT_MARKET_CAP.to_string())
}

pub fn volatility_preference(trades: &[TradeRecord]) -> f64 {
    let scaled: Vec<f64> = trades.iter().map(|t| t.return_pct.abs() / 100.0).collect();
    stats::mean(&scaled).unwrap_or(DEFAULT_VOLATILITY)
}

pub fn performance_metrics(trades: &[TradeRecord]) -> PerformanceMetrics {
    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
    let Some(avg_return) = stats::mean(&returns) else {
        return PerformanceMetrics::default();
    };

    let sharpe_ratio = match stats::std_dev(&returns) {
        Some(sd) if sd > 0.0 => avg_return / sd,
        _ => 0.0,
    };

    let mut cumulative = 0.0;
    let mut peak = 0.0_f64;
    let mut max_drawdown = 0.0_f64;
    for r in &returns {
        cumulative += r;
        peak = peak.max(cumulative);
        max_drawdown = max_drawdown.max(peak - cumulative);
    }

    let wins = trades.iter().filter(|t| t.success).count();
    PerformanceMetrics {
        total_return: returns.iter().sum(),
        avg_return,
        win_rate: wins as f64 / trades.len() as f64,
        sharpe_ratio,
        max_drawdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trade(symbol: &str, sector: &str, entry: f64, ret: f64, days: f64, cap: &str) -> TradeRecord {
        let d = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        TradeRecord {
            symbol: symbol.to_string(),
            entry_date: d,
            exit_date: d + chrono::Duration::days(days as i64),
            entry_price: entry,
            exit_price: entry * (1.0 + ret / 100.0),
            quantity: 10.0,
            sector: sector.to_string(),
            market_cap: cap.to_string(),
            success: ret > 0.0,
            holding_period_days: days,
            return_pct: ret,
        }
    }

    #[test]
    fn empty_history_yields_default_profile() {
        let p = build_profile("u1", &[]);
        assert_eq!(p.risk_tolerance, RiskTolerance::Moderate);
        assert_eq!(p.preferred_sectors, vec!["Technology", "Healthcare", "Financial"]);
        assert_eq!(p.trading_style, TradingStyle::Swing);
        assert_eq!(p.avg_holding_period, 21.0);
        assert_eq!(p.price_preference, DEFAULT_PRICE_PREFERENCE);
        assert_eq!(p.market_cap_preference, "large");
        assert_eq!(p.volatility_preference, 0.15);
        assert_eq!(p.total_trades, 0);
    }

    #[test]
    fn invalid_trade_falls_back_to_default_profile() {
        let trades = vec![
            trade("AAPL", "Technology", 150.0, 30.0, 3.0, "large"),
            trade("BAD", "Energy", f64::NAN, 5.0, 3.0, "small"),
        ];
        assert_eq!(build_profile("u2", &trades), default_profile("u2"));
    }

    #[test]
    fn risk_tolerance_thresholds() {
        assert_eq!(
            risk_tolerance(&[trade("A", "X", 10.0, -16.0, 1.0, "large")]),
            RiskTolerance::Aggressive
        );
        assert_eq!(
            risk_tolerance(&[trade("A", "X", 10.0, 9.0, 1.0, "large")]),
            RiskTolerance::Moderate
        );
        assert_eq!(
            risk_tolerance(&[trade("A", "X", 10.0, 8.0, 1.0, "large")]),
            RiskTolerance::Conservative
        );
    }

    #[test]
    fn preferred_sectors_rank_by_frequency_and_performance() {
        let trades = vec![
            trade("A", "Energy", 10.0, -5.0, 5.0, "large"),
            trade("B", "Technology", 10.0, 10.0, 5.0, "large"),
            trade("C", "Energy", 10.0, -5.0, 5.0, "large"),
            trade("D", "Utilities", 10.0, 2.0, 5.0, "large"),
            trade("E", "Healthcare", 10.0, 2.0, 5.0, "large"),
        ];
        // Energy 2*1.0=2.0, Technology 1*2.0=2.0, Utilities 1.2, Healthcare 1.2
        let sectors = preferred_sectors(&trades);
        assert_eq!(sectors, vec!["Energy", "Technology", "Utilities"]);
        assert!(sectors.len() <= 3);
    }

    #[test]
    fn preferred_sectors_default_pair_on_empty() {
        assert_eq!(preferred_sectors(&[]), vec!["Technology", "Healthcare"]);
    }

    #[test]
    fn trading_style_by_mean_holding_days() {
        let style = |days: f64| trading_style(&[trade("A", "X", 10.0, 1.0, days, "large")]);
        assert_eq!(style(1.0), TradingStyle::DayTrading);
        assert_eq!(style(7.0), TradingStyle::ShortTerm);
        assert_eq!(style(30.0), TradingStyle::Swing);
        assert_eq!(style(31.0), TradingStyle::Position);
    }

    #[test]
    fn success_patterns_default_missing_groups() {
        let all_wins = vec![
            trade("A", "X", 10.0, 4.0, 2.0, "large"),
            trade("B", "X", 10.0, 6.0, 2.0, "large"),
        ];
        let p = success_patterns(&all_wins);
        assert_eq!(p.success_rate, 1.0);
        assert_eq!(p.avg_winner, 5.0);
        assert_eq!(p.avg_loser, -3.0);
        assert!((p.win_loss_ratio - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn price_preference_bounds() {
        let trades: Vec<_> = [2.0, 4.0, 300.0, 800.0]
            .iter()
            .map(|&p| trade("A", "X", p, 1.0, 2.0, "large"))
            .collect();
        let pref = price_preference(&trades);
        // P25 = 3.5 -> floored at 5; P75 = 425 -> 850; median = 152
        assert_eq!(pref.min, 5.0);
        assert_eq!(pref.max, 850.0);
        assert_eq!(pref.preferred, 152.0);
    }

    #[test]
    fn market_cap_mode_is_case_insensitive() {
        let trades = vec![
            trade("A", "X", 10.0, 1.0, 2.0, "Mid"),
            trade("B", "X", 10.0, 1.0, 2.0, "large"),
            trade("C", "X", 10.0, 1.0, 2.0, "MID"),
        ];
        assert_eq!(market_cap_preference(&trades), "mid");
    }

    #[test]
    fn performance_metrics_track_drawdown() {
        let trades = vec![
            trade("A", "X", 10.0, 10.0, 2.0, "large"),
            trade("B", "X", 10.0, -4.0, 2.0, "large"),
            trade("C", "X", 10.0, -6.0, 2.0, "large"),
            trade("D", "X", 10.0, 8.0, 2.0, "large"),
        ];
        let m = performance_metrics(&trades);
        assert_eq!(m.total_return, 8.0);
        assert_eq!(m.avg_return, 2.0);
        assert_eq!(m.win_rate, 0.5);
        assert_eq!(m.max_drawdown, 10.0);
        assert!(m.sharpe_ratio > 0.0);
    }

    #[test]
    fn builds_full_profile_from_history() {
        let trades = vec![
            trade("NVDA", "Technology", 400.0, 20.0, 10.0, "large"),
            trade("AMD", "Technology", 120.0, 12.0, 14.0, "large"),
            trade("XOM", "Energy", 100.0, -6.0, 20.0, "large"),
        ];
        let p = build_profile("u3", &trades);
        assert_eq!(p.user_id, "u3");
        assert_eq!(p.total_trades, 3);
        assert_eq!(p.preferred_sectors[0], "Technology");
        assert_eq!(p.trading_style, TradingStyle::Swing);
        assert_eq!(p.risk_tolerance, RiskTolerance::Moderate);
        assert!((p.volatility_preference - 38.0 / 300.0).abs() < 1e-9);
    }
}
