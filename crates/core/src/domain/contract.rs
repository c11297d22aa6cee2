use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Upper bound on insight length; longer output is truncated at a char boundary.
pub const MAX_INSIGHT_CHARS: usize = 600;

/// Shape the LLM must emit for a single recommendation insight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmInsight {
    pub insight: String,
}

impl LlmInsight {
    pub fn validate_and_into_text(self) -> anyhow::Result<String> {
        let text = self.insight.trim();
        ensure!(!text.is_empty(), "insight must be non-empty");
        ensure!(
            !text.starts_with('{'),
            "insight must be prose, not nested JSON"
        );

        // Collapse newlines so the insight renders as a single paragraph.
        let mut out = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if out.chars().count() > MAX_INSIGHT_CHARS {
            out = out.chars().take(MAX_INSIGHT_CHARS).collect();
        }
        Ok(out)
    }
}
