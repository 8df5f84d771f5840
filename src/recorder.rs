// src/recorder.rs
//
// Persists one finished attempt as an immutable progress record and updates
// the content engagement counters in the same transaction.
//
// This operation is not idempotent: a blind retry after an ambiguous
// failure could double-count in aggregation, so no retry happens here.
// Callers surface the error and let the learner retry explicitly.

use chrono::Utc;
use sqlx::{SqlitePool, types::Json};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::progress::ProgressRecord,
    scoring::ScoreOutcome,
};

pub async fn record_submission(
    pool: &SqlitePool,
    user_id: &str,
    content_id: &str,
    outcome: &ScoreOutcome,
    total_time_spent: i64,
) -> Result<ProgressRecord, AppError> {
    let record = ProgressRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        content_id: content_id.to_string(),
        score: outcome.score,
        time_spent_seconds: total_time_spent,
        answers: Json(outcome.reviews.clone()),
        completed_at: Utc::now(),
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO progress_records
            (id, user_id, content_id, score, time_spent_seconds, answers, completed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(&record.content_id)
    .bind(record.score)
    .bind(record.time_spent_seconds)
    .bind(&record.answers)
    .bind(record.completed_at)
    .execute(&mut *tx)
    .await?;

    // Rolling average over completions; every SET expression reads the
    // pre-update column values.
    let updated = sqlx::query(
        r#"
        UPDATE contents
        SET average_score = (average_score * completions + ?) / (completions + 1),
            completions = completions + 1
        WHERE id = ?
        "#,
    )
    .bind(record.score)
    .bind(&record.content_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Content {} not found",
            record.content_id
        )));
    }

    tx.commit().await?;

    tracing::info!(
        user_id = %record.user_id,
        content_id = %record.content_id,
        score = record.score,
        "Progress recorded"
    );

    Ok(record)
}
