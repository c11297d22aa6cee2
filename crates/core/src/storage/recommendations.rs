use crate::domain::recommendation::RecommendationResponse;
use anyhow::Context;

pub async fn persist_run(
    pool: &sqlx::PgPool,
    response: &RecommendationResponse,
) -> anyhow::Result<uuid::Uuid> {
    let payload =
        serde_json::to_value(response).context("failed to serialize recommendation payload")?;
    let count = i32::try_from(response.recommendations.len())
        .context("recommendation count does not fit in INTEGER")?;

    let run_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO recommendation_runs (id, user_id, generated_at, confidence_score, recommendation_count, payload) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(uuid::Uuid::new_v4())
    .bind(&response.user_id)
    .bind(response.generated_at)
    .bind(response.confidence_score)
    .bind(count)
    .bind(payload)
    .fetch_one(pool)
    .await
    .context("insert recommendation_runs failed")?;

    Ok(run_id)
}

/// Most recent stored payload for the user, if any.
pub async fn latest_run(
    pool: &sqlx::PgPool,
    user_id: &str,
) -> anyhow::Result<Option<RecommendationResponse>> {
    let row: Option<(serde_json::Value,)> = sqlx::query_as(
        "SELECT payload FROM recommendation_runs \
         WHERE user_id = $1 \
         ORDER BY generated_at DESC \
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("select latest recommendation_runs failed")?;

    row.map(|(payload,)| {
        serde_json::from_value::<RecommendationResponse>(payload)
            .context("stored recommendation payload has an unexpected shape")
    })
    .transpose()
}
