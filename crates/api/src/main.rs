use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockpick_core::cache::{InMemoryProfileCache, ProfileCache, SystemClock};
use stockpick_core::domain::market::MarketContext;
use stockpick_core::domain::profile::UserProfile;
use stockpick_core::domain::recommendation::RecommendationResponse;
use stockpick_core::ingest::provider::{HttpMarketData, MarketDataClient};
use stockpick_core::ingest::trades::{EmptyTradeHistory, TradeHistorySource};
use stockpick_core::ingest::universe::StaticUniverse;
use stockpick_core::llm::anthropic::AnthropicClient;
use stockpick_core::llm::{DisabledInsights, InsightGenerator};
use stockpick_core::recommender::{Recommender, RecommenderOptions};
use stockpick_core::storage::trades::PgTradeHistory;
use stockpick_core::widgets::{ChartType, ChartWidget, WidgetGenerator};

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
    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match stockpick_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "DATABASE_URL missing; starting API without history or persistence");
            None
        }
    };

    let market_data: Arc<dyn MarketDataClient> = Arc::new(HttpMarketData::from_settings(&settings)?);
    tracing::info!(provider = market_data.provider_name(), "market data client ready");

    let insights: Arc<dyn InsightGenerator> = match AnthropicClient::from_settings(&settings) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(error = %e, "insight generation disabled; recommendations use fallback text");
            Arc::new(DisabledInsights)
        }
    };

    let trades: Arc<dyn TradeHistorySource> = match &pool {
        Some(pool) => Arc::new(PgTradeHistory::new(pool.clone())),
        None => Arc::new(EmptyTradeHistory),
    };

    let profiles = Arc::new(InMemoryProfileCache::new());
    let recommender = Recommender {
        market_data: market_data.clone(),
        insights,
        trades,
        universe: Arc::new(StaticUniverse::us_large_caps()),
        profiles: profiles.clone(),
        options: RecommenderOptions::from_env(),
    };
    let widgets = WidgetGenerator::new(
        market_data.clone(),
        Arc::new(SystemClock),
        chrono::Duration::seconds(settings.widget_cache_ttl_secs),
    );

    let state = AppState {
        pool,
        recommender: Arc::new(recommender),
        widgets: Arc::new(widgets),
        profiles,
        market_data,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/recommendations/:user_id", get(get_recommendations))
        .route(
            "/recommendations/:user_id/latest",
            get(get_latest_recommendations),
        )
        .route("/profiles/:user_id", get(get_profile))
        .route("/market/context", get(get_market_context))
        .route("/widgets/:symbol/:chart_type", get(get_widget))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pool: Option<PgPool>,
    recommender: Arc<Recommender>,
    widgets: Arc<WidgetGenerator>,
    profiles: Arc<InMemoryProfileCache>,
    market_data: Arc<dyn MarketDataClient>,
}

#[derive(Debug, Deserialize)]
struct RecommendationQuery {
    count: Option<usize>,
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecommendationResponse>, StatusCode> {
    if user_id.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if query.count == Some(0) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let response = state.recommender.recommend(&user_id, query.count).await;

    if let Some(pool) = &state.pool {
        match stockpick_core::storage::recommendations::persist_run(pool, &response).await {
            Ok(run_id) => tracing::info!(%user_id, %run_id, "persisted recommendation run"),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(%user_id, error = %e, "failed to persist recommendation run");
            }
        }
    }

    Ok(Json(response))
}

async fn get_latest_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<RecommendationResponse>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let response = stockpick_core::storage::recommendations::latest_run(pool, &user_id)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(response))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, StatusCode> {
    state
        .profiles
        .get(&user_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_market_context(State(state): State<AppState>) -> Json<MarketContext> {
    Json(stockpick_core::analysis::market::analyze_market_context(state.market_data.as_ref()).await)
}

async fn get_widget(
    State(state): State<AppState>,
    Path((symbol, chart_type)): Path<(String, String)>,
) -> Result<Json<ChartWidget>, StatusCode> {
    let chart_type: ChartType = chart_type.parse().map_err(|_| StatusCode::BAD_REQUEST)?;

    let widget = state
        .widgets
        .widget(&symbol, chart_type)
        .await
        .map_err(|e| {
            tracing::warn!(%symbol, %chart_type, error = %format!("{e:#}"), "widget unavailable");
            StatusCode::NOT_FOUND
        })?;

    Ok(Json(widget))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
