use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockpick_core::cache::InMemoryProfileCache;
use stockpick_core::ingest::provider::{HttpMarketData, MarketDataClient};
use stockpick_core::ingest::trades::{EmptyTradeHistory, JsonFileTradeHistory, TradeHistorySource};
use stockpick_core::ingest::universe::StaticUniverse;
use stockpick_core::llm::anthropic::AnthropicClient;
use stockpick_core::llm::{DisabledInsights, InsightGenerator};
use stockpick_core::recommender::{Recommender, RecommenderOptions};
use stockpick_core::storage::trades::PgTradeHistory;

#[derive(Debug, Parser)]
#[command(name = "stockpick_worker")]
struct Args {
    /// User to generate recommendations for.
    #[arg(long)]
    user_id: String,

    /// Number of recommendations. Defaults to RECOMMENDATION_COUNT.
    #[arg(long)]
    count: Option<usize>,

    /// JSON array of closed trades to build the profile from, instead of the database.
    #[arg(long)]
    trades: Option<PathBuf>,

    /// Store the --trades file in trade_history before generating.
    #[arg(long, requires = "trades")]
    import_trades: bool,

    /// Do everything except writing to the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockpick_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.count != Some(0), "--count must be at least 1");

    if let Err(err) = run(&settings, &args).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(user_id = %args.user_id, error = %format!("{err:#}"), "worker run failed");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: &stockpick_core::config::Settings, args: &Args) -> anyhow::Result<()> {
    let pool = if args.dry_run {
        None
    } else {
        let db_url = settings.require_database_url()?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .context("connect DATABASE_URL failed")?;
        stockpick_core::storage::migrate(&pool).await?;
        Some(pool)
    };

    let trades: Arc<dyn TradeHistorySource> = match (&args.trades, &pool) {
        (Some(path), Some(pool)) if args.import_trades => {
            let records = JsonFileTradeHistory::new(path).load_trades(&args.user_id).await?;
            let rows = PgTradeHistory::new(pool.clone())
                .insert_trades(&args.user_id, &records)
                .await?;
            tracing::info!(user_id = %args.user_id, rows, "imported trades");
            Arc::new(PgTradeHistory::new(pool.clone()))
        }
        (Some(path), _) => Arc::new(JsonFileTradeHistory::new(path)),
        (None, Some(pool)) => Arc::new(PgTradeHistory::new(pool.clone())),
        (None, None) => Arc::new(EmptyTradeHistory),
    };

    let market_data: Arc<dyn MarketDataClient> = Arc::new(HttpMarketData::from_settings(settings)?);
    let insights: Arc<dyn InsightGenerator> = match AnthropicClient::from_settings(settings) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(error = %e, "insight generation disabled; using fallback text");
            Arc::new(DisabledInsights)
        }
    };

    let recommender = Recommender {
        market_data,
        insights,
        trades,
        universe: Arc::new(StaticUniverse::us_large_caps()),
        profiles: Arc::new(InMemoryProfileCache::new()),
        options: RecommenderOptions::from_env(),
    };

    let response = recommender.recommend(&args.user_id, args.count).await;
    let json =
        serde_json::to_string_pretty(&response).context("failed to serialize recommendations")?;
    println!("{json}");

    let Some(pool) = &pool else {
        tracing::info!(
            user_id = %args.user_id,
            dry_run = true,
            recommendations = response.recommendations.len(),
            "skipping persistence"
        );
        return Ok(());
    };

    let run_id = stockpick_core::storage::recommendations::persist_run(pool, &response).await?;
    tracing::info!(user_id = %args.user_id, %run_id, "persisted recommendation run");
    Ok(())
}

fn init_sentry(settings: &stockpick_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
