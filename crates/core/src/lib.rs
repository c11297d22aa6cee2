pub mod analysis;
pub mod cache;
pub mod domain;
pub mod ingest;
pub mod llm;
pub mod recommender;
pub mod storage;
pub mod widgets;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub market_data_base_url: Option<String>,
        pub market_data_api_key: Option<String>,
        pub widget_cache_ttl_secs: i64,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let widget_cache_ttl_secs = match std::env::var("WIDGET_CACHE_TTL_SECS") {
                Ok(s) => s
                    .parse::<i64>()
                    .with_context(|| format!("WIDGET_CACHE_TTL_SECS must be an integer (got {s})"))?,
                Err(_) => crate::widgets::DEFAULT_WIDGET_TTL_SECS,
            };
            anyhow::ensure!(
                widget_cache_ttl_secs > 0,
                "WIDGET_CACHE_TTL_SECS must be positive"
            );

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                market_data_base_url: std::env::var("MARKET_DATA_BASE_URL").ok(),
                market_data_api_key: std::env::var("MARKET_DATA_API_KEY").ok(),
                widget_cache_ttl_secs,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_market_data_base_url(&self) -> anyhow::Result<&str> {
            self.market_data_base_url
                .as_deref()
                .context("MARKET_DATA_BASE_URL is required")
        }
    }
}
