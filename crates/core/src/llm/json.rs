use crate::domain::contract::LlmInsight;
use anyhow::Context;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Accepts either `{"insight": "..."}` (optionally fenced) or plain prose.
pub fn parse_insight(text: &str) -> anyhow::Result<String> {
    let trimmed = text.trim();
    let looks_like_json = trimmed.starts_with('{') || trimmed.starts_with("```");
    if !looks_like_json {
        return LlmInsight {
            insight: trimmed.to_string(),
        }
        .validate_and_into_text();
    }

    let json_str = extract_json(trimmed).unwrap_or_else(|| trimmed.to_string());
    let parsed = serde_json::from_str::<LlmInsight>(&json_str)
        .with_context(|| format!("LLM output is not valid JSON for insight schema: {json_str}"))?;
    parsed.validate_and_into_text()
}
