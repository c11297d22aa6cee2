use crate::config::Settings;
use crate::domain::contract::LlmInsight;
use crate::llm::error::{InsightError, InsightStage};
use crate::llm::json;
use crate::llm::{InsightGenerator, InsightPrompt, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 20;

const TOOL_NAME_EMIT_INSIGHT: &str = "emit_insight";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    async fn create_message(
        &self,
        symbol: &str,
        req: CreateMessageRequest,
    ) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            return Err(InsightError {
                provider: Provider::Anthropic,
                stage: InsightStage::Http,
                symbol: symbol.to_string(),
                detail: format!("status={status}"),
                raw_output: Some(text),
            }
            .into());
        }

        match serde_json::from_str::<CreateMessageResponse>(&text) {
            Ok(parsed) => Ok(parsed),
            Err(err) => Err(InsightError {
                provider: Provider::Anthropic,
                stage: InsightStage::Decode,
                symbol: symbol.to_string(),
                detail: err.to_string(),
                raw_output: Some(text),
            }
            .into()),
        }
    }

    fn tools() -> Vec<Tool> {
        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["insight"],
            "properties": {
                "insight": {"type": "string"}
            }
        });

        vec![Tool {
            name: TOOL_NAME_EMIT_INSIGHT,
            description: "Emit the investor-facing insight for one stock recommendation",
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_INSIGHT,
        }
    }

    fn system_prompt() -> String {
        [
            "You are an equity research assistant writing for retail investors.",
            "Explain recommendations in plain English, 2-3 sentences, no bullet points.",
            "Mention one concrete risk. Do not promise returns. Do not invent figures",
            "beyond the ones provided.",
        ]
        .join("\n")
    }

    fn build_request(&self, prompt: &InsightPrompt) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(Self::system_prompt()),
            messages: vec![Message {
                role: "user",
                content: prompt.render(),
            }],
            tools: Some(Self::tools()),
            tool_choice: Some(Self::tool_choice()),
        }
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_insight(res: &CreateMessageResponse) -> anyhow::Result<Option<LlmInsight>> {
        for block in &res.content {
            if let ContentBlock::ToolUse { name, input, .. } = block {
                if name == TOOL_NAME_EMIT_INSIGHT {
                    let parsed = serde_json::from_value::<LlmInsight>(input.clone())
                        .context("failed to decode tool_use.input into LlmInsight")?;
                    return Ok(Some(parsed));
                }
            }
        }
        Ok(None)
    }

    fn insight_from_response(
        symbol: &str,
        res: &CreateMessageResponse,
    ) -> anyhow::Result<String> {
        if let Some(tool_insight) = Self::response_tool_insight(res)? {
            return tool_insight.validate_and_into_text();
        }

        let text = Self::response_text(res);
        match json::parse_insight(&text) {
            Ok(insight) => Ok(insight),
            Err(err) => Err(InsightError {
                provider: Provider::Anthropic,
                stage: InsightStage::Parse,
                symbol: symbol.to_string(),
                detail: format!("error={err}, stop_reason={:?}", res.stop_reason),
                raw_output: Some(text),
            }
            .into()),
        }
    }
}

#[async_trait::async_trait]
impl InsightGenerator for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    /// One request, no retries. Prefers the forced tool call and falls back to text blocks.
    async fn generate_insight(&self, prompt: &InsightPrompt) -> anyhow::Result<String> {
        let res = self
            .create_message(&prompt.symbol, self.build_request(prompt))
            .await?;
        Self::insight_from_response(&prompt.symbol, &res)
    }
}


#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolChoice {
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}
