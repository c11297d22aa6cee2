use crate::domain::trade::TradeRecord;
use crate::ingest::trades::TradeHistorySource;
use anyhow::Context;
use chrono::NaiveDate;

const INSERT_BATCH: usize = 200;

/// Trading history backed by the `trade_history` table.
#[derive(Debug, Clone)]
pub struct PgTradeHistory {
    pool: sqlx::PgPool,
}

impl PgTradeHistory {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_trades(&self, user_id: &str, trades: &[TradeRecord]) -> anyhow::Result<u64> {
        anyhow::ensure!(!trades.is_empty(), "trades must be non-empty");

        let mut tx = self.pool.begin().await.context("begin transaction failed")?;
        let mut affected: u64 = 0;
        for chunk in trades.chunks(INSERT_BATCH) {
            let mut qb = sqlx::QueryBuilder::new(
                "INSERT INTO trade_history (user_id, symbol, entry_date, exit_date, entry_price, exit_price, \
                 quantity, sector, market_cap, success, holding_period_days, return_pct) ",
            );
            qb.push_values(chunk, |mut b, t| {
                b.push_bind(user_id)
                    .push_bind(t.symbol.trim())
                    .push_bind(t.entry_date)
                    .push_bind(t.exit_date)
                    .push_bind(t.entry_price)
                    .push_bind(t.exit_price)
                    .push_bind(t.quantity)
                    .push_bind(t.sector.trim())
                    .push_bind(t.market_cap.trim())
                    .push_bind(t.success)
                    .push_bind(t.holding_period_days)
                    .push_bind(t.return_pct);
            });
            let res = qb
                .build()
                .persistent(false)
                .execute(&mut *tx)
                .await
                .context("insert trade_history failed")?;
            affected += res.rows_affected();
        }
        tx.commit().await.context("commit transaction failed")?;

        tracing::info!(user_id, rows = affected, "trade history stored");
        Ok(affected)
    }
}

type TradeRow = (
    String,
    NaiveDate,
    NaiveDate,
    f64,
    f64,
    f64,
    String,
    String,
    bool,
    f64,
    f64,
);

#[async_trait::async_trait]
impl TradeHistorySource for PgTradeHistory {
    async fn load_trades(&self, user_id: &str) -> anyhow::Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> = sqlx::query_as(
            "SELECT symbol, entry_date, exit_date, entry_price, exit_price, quantity, sector, \
             market_cap, success, holding_period_days, return_pct \
             FROM trade_history \
             WHERE user_id = $1 \
             ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("select trade_history failed (user_id={user_id})"))?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    symbol,
                    entry_date,
                    exit_date,
                    entry_price,
                    exit_price,
                    quantity,
                    sector,
                    market_cap,
                    success,
                    holding_period_days,
                    return_pct,
                )| TradeRecord {
                    symbol,
                    entry_date,
                    exit_date,
                    entry_price,
                    exit_price,
                    quantity,
                    sector,
                    market_cap,
                    success,
                    holding_period_days,
                    return_pct,
                },
            )
            .collect())
    }
}
