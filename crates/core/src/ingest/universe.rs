//! Candidate universe: which symbols are considered for each sector.

use std::collections::HashSet;

pub trait CandidateUniverse: Send + Sync {
    /// Sectors in the order they should be explored.
    fn sectors(&self) -> anyhow::Result<Vec<String>>;

    fn symbols_for(&self, sector: &str) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct StaticUniverse {
    table: Vec<(String, Vec<String>)>,
}

impl StaticUniverse {
    pub fn new<S, I, T>(table: impl IntoIterator<Item = (S, I)>) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            table: table
                .into_iter()
                .map(|(sector, symbols)| {
                    (sector.into(), symbols.into_iter().map(Into::into).collect())
                })
                .collect(),
        }
    }

    /// Large, liquid US names grouped by sector.
    pub fn us_large_caps() -> Self {
        Self::new([
            ("Technology", vec!["AAPL", "MSFT", "NVDA", "GOOGL", "META", "AMD", "CRM", "ADBE"]),
            ("Healthcare", vec!["JNJ", "UNH", "PFE", "ABBV", "MRK", "LLY", "TMO"]),
            ("Financial", vec!["JPM", "BAC", "WFC", "GS", "MS", "V", "MA"]),
            ("Consumer", vec!["AMZN", "TSLA", "HD", "MCD", "NKE", "COST", "WMT"]),
            ("Energy", vec!["XOM", "CVX", "COP", "SLB", "EOG"]),
            ("Industrial", vec!["CAT", "BA", "GE", "HON", "UPS"]),
        ])
    }
}

impl CandidateUniverse for StaticUniverse {
    fn sectors(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.table.iter().map(|(s, _)| s.clone()).collect())
    }

    fn symbols_for(&self, sector: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .table
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(sector))
            .map(|(_, symbols)| symbols.clone())
            .unwrap_or_default())
    }
}

/// Preferred sectors first, then every other sector in universe order.
/// Symbols are de-duplicated and the pool is capped at `limit`.
pub fn build_candidate_pool(
    universe: &dyn CandidateUniverse,
    preferred_sectors: &[String],
    limit: usize,
) -> anyhow::Result<Vec<String>> {
    let mut sector_order: Vec<String> = preferred_sectors.to_vec();
    for sector in universe.sectors()? {
        if !sector_order.iter().any(|s| s.eq_ignore_ascii_case(&sector)) {
            sector_order.push(sector);
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for sector in &sector_order {
        for symbol in universe.symbols_for(sector)? {
            if out.len() >= limit {
                return Ok(out);
            }
            if seen.insert(symbol.clone()) {
                out.push(symbol);
            }
        }
    }
    Ok(out)
}
