//! Sector-diversified selection of the final recommendation list.

use crate::domain::recommendation::ScoredCandidate;
use std::collections::HashSet;

/// Sector diversity target for the first pass.
pub const DIVERSIFY_SECTORS: usize = 3;

/// Picks up to `count` candidates from a list already sorted by descending total score.
///
/// The first pass takes the best candidate of each new sector until `count` are chosen or
/// [`DIVERSIFY_SECTORS`] sectors are covered. The second pass fills the remaining slots in
/// score order.
pub fn select_diversified(sorted: &[ScoredCandidate], count: usize) -> Vec<ScoredCandidate> {
    if count == 0 || sorted.is_empty() {
        return Vec::new();
    }

    let mut taken = vec![false; sorted.len()];
    let mut order: Vec<usize> = Vec::with_capacity(count);
    let mut sectors: HashSet<&str> = HashSet::new();

    for (idx, candidate) in sorted.iter().enumerate() {
        if order.len() >= count || sectors.len() >= DIVERSIFY_SECTORS {
            break;
        }
        if sectors.insert(candidate.sector.as_str()) {
            taken[idx] = true;
            order.push(idx);
        }
    }

    for idx in 0..sorted.len() {
        if order.len() >= count {
            break;
        }
        if !taken[idx] {
            taken[idx] = true;
            order.push(idx);
        }
    }

    order.into_iter().map(|idx| sorted[idx].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::SubScores;

    fn candidate(symbol: &str, sector: &str, total: f64) -> ScoredCandidate {
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
            volume: 1_000.0,
            sector: sector.to_string(),
            beta: 1.0,
            pe_ratio: None,
            market_cap: None,
            momentum: 0.0,
            rsi: 50.0,
            reason: "balanced opportunity".to_string(),
        }
    }

    fn symbols(list: &[ScoredCandidate]) -> Vec<&str> {
        list.iter().map(|c| c.symbol.as_str()).collect()
    }

    fn five_across_four_sectors() -> Vec<ScoredCandidate> {
        vec![
            candidate("AAPL", "Technology", 90.0),
            candidate("MSFT", "Technology", 85.0),
            candidate("JNJ", "Healthcare", 80.0),
            candidate("JPM", "Financial", 75.0),
            candidate("XOM", "Energy", 70.0),
        ]
    }

    #[test]
    fn diversification_stops_at_three_sectors_then_fills_by_score() {
        let picked = select_diversified(&five_across_four_sectors(), 4);
        assert_eq!(symbols(&picked), vec!["AAPL", "JNJ", "JPM", "MSFT"]);
    }

    #[test]
    fn all_five_when_count_exceeds_three_sectors() {
        let picked = select_diversified(&five_across_four_sectors(), 5);
        assert_eq!(symbols(&picked), vec!["AAPL", "JNJ", "JPM", "MSFT", "XOM"]);
    }

    #[test]
    fn count_smaller_than_sector_target() {
        let picked = select_diversified(&five_across_four_sectors(), 2);
        assert_eq!(symbols(&picked), vec!["AAPL", "JNJ"]);
    }

    #[test]
    fn single_sector_falls_back_to_score_order() {
        let list = vec![
            candidate("A", "Technology", 90.0),
            candidate("B", "Technology", 80.0),
            candidate("C", "Technology", 70.0),
        ];
        let picked = select_diversified(&list, 2);
        assert_eq!(symbols(&picked), vec!["A", "B"]);
    }

    #[test]
    fn never_exceeds_count_or_duplicates() {
        let list = five_across_four_sectors();
        for n in 0..8 {
            let picked = select_diversified(&list, n);
            assert!(picked.len() <= n);
            assert_eq!(picked.len(), n.min(list.len()));
            let unique: HashSet<_> = picked.iter().map(|c| c.symbol.clone()).collect();
            assert_eq!(unique.len(), picked.len());
        }
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select_diversified(&[], 5).is_empty());
    }
}
