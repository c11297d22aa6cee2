use crate::config::Settings;
use crate::domain::market::{Fundamentals, PriceBar};
use crate::ingest::types::{FundamentalsResponse, HistoryResponse};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const HISTORY_PATH: &str = "/v1/history";
const FUNDAMENTALS_PATH: &str = "/v1/fundamentals";

/// Source of OHLCV history and issuer fundamentals.
///
/// Unknown or delisted symbols must come back as empty data rather than an error.
#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily bars ordered oldest first.
    async fn fetch_history(&self, symbol: &str, period: &str, interval: &str)
        -> Result<Vec<PriceBar>>;

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals>;
}

#[derive(Debug, Clone)]
pub struct HttpMarketData {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMarketData {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_market_data_base_url()?.to_string();

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url, settings.market_data_api_key.clone(), timeout_secs)
    }

    pub fn new(base_url: String, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    /// Single attempt. `Ok(None)` means the provider does not know the symbol.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let res = self
            .http
            .get(self.url(path))
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        if !status.is_success() {
            anyhow::bail!("market data HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<T>(&text)
            .with_context(|| format!("market data response has unexpected shape: {text}"))?;
        Ok(Some(parsed))
    }
}

#[async_trait::async_trait]
impl MarketDataClient for HttpMarketData {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<PriceBar>> {
        let resp: Option<HistoryResponse> = self
            .get_json(
                HISTORY_PATH,
                &[("symbol", symbol), ("period", period), ("interval", interval)],
            )
            .await
            .with_context(|| format!("history fetch failed for {symbol}"))?;

        let Some(resp) = resp else {
            return Ok(Vec::new());
        };
        normalize_bars(resp.bars)
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        let resp: Option<FundamentalsResponse> = self
            .get_json(FUNDAMENTALS_PATH, &[("symbol", symbol)])
            .await
            .with_context(|| format!("fundamentals fetch failed for {symbol}"))?;
        Ok(resp.map(|r| r.fundamentals).unwrap_or_default())
    }
}

/// Orders bars oldest first and rejects non-finite prices or volumes.
pub fn normalize_bars(mut bars: Vec<PriceBar>) -> Result<Vec<PriceBar>> {
    for bar in &bars {
        anyhow::ensure!(
            [bar.open, bar.high, bar.low, bar.close, bar.volume]
                .iter()
                .all(|v| v.is_finite()),
            "non-finite values in bar dated {}",
            bar.date
        );
    }
    bars.sort_by_key(|b| b.date);
    Ok(bars)
}
