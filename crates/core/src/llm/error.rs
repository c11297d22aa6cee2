use crate::llm::Provider;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightStage {
    /// Non-2xx response from the provider.
    Http,
    /// Response body did not match the provider's message schema.
    Decode,
    /// Message decoded but carried no usable insight text.
    Parse,
}

impl fmt::Display for InsightStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Decode => "decode",
            Self::Parse => "parse",
        })
    }
}

/// Insight failure carrying whatever the provider sent back, for logs and Sentry.
#[derive(Debug, Clone)]
pub struct InsightError {
    pub provider: Provider,
    pub stage: InsightStage,
    pub symbol: String,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl fmt::Display for InsightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "insight generation failed for {} (provider={:?}, stage={}): {}",
            self.symbol, self.provider, self.stage, self.detail
        )
    }
}

impl InsightError {
    pub const RAW_EXCERPT_CHARS: usize = 500;

    /// Leading part of the provider output, short enough for a log line.
    pub fn raw_excerpt(&self) -> Option<&str> {
        let raw = self.raw_output.as_deref()?;
        match raw.char_indices().nth(Self::RAW_EXCERPT_CHARS) {
            Some((cut, _)) => Some(&raw[..cut]),
            None => Some(raw),
        }
    }
}

impl std::error::Error for InsightError {}
