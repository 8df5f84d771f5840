// src/handlers/progress.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    cache::ContentCache,
    dashboard::{self, ActivityRow},
    error::AppError,
    models::{
        document::Document,
        progress::{ProgressRecord, ProgressResponse, SubmitProgressRequest, feedback_message},
    },
    recorder,
    scoring::{self, ScoreOutcome},
    session::LoadedContent,
    utils::jwt::Claims,
};

/// Assembles the response DTO for a freshly recorded submission.
pub fn progress_response(record: ProgressRecord, outcome: &ScoreOutcome) -> ProgressResponse {
    ProgressResponse {
        id: record.id,
        user_id: record.user_id,
        content_id: record.content_id,
        score: record.score,
        correct_count: outcome.correct_count,
        total_questions: outcome.total_questions,
        time_spent_seconds: record.time_spent_seconds,
        answers: record.answers.0,
        message: feedback_message(record.score).to_string(),
        completed_at: record.completed_at,
    }
}

/// Direct submission of a completed answer set.
///
/// * Scores server-side against the stored question definitions.
/// * Persists the progress record and updates content engagement metrics.
/// * Never retried here: a duplicate record would double-count.
pub async fn submit_progress(
    State(pool): State<SqlitePool>,
    State(content_cache): State<ContentCache>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let item = content_cache.fetch(&pool, &req.content_id).await?;
    let loaded = LoadedContent::from_item(&item)?;

    let outcome = scoring::score_submissions(&loaded.questions, &req.answers);
    let record = recorder::record_submission(
        &pool,
        &claims.sub,
        &req.content_id,
        &outcome,
        req.total_time_spent,
    )
    .await?;

    // The cached copy no longer reflects the engagement counters.
    content_cache.invalidate(&req.content_id);

    Ok((
        StatusCode::CREATED,
        Json(progress_response(record, &outcome)),
    ))
}

/// Query parameters for the progress history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// The caller's progress history, newest first.
pub async fn list_user_progress(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(50).clamp(1, 100);

    let records = sqlx::query_as::<_, ProgressRecord>(
        r#"
        SELECT id, user_id, content_id, score, time_spent_seconds, answers, completed_at
        FROM progress_records
        WHERE user_id = ?
        ORDER BY completed_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&claims.sub)
    .bind(limit)
    .bind(skip)
    .fetch_all(&pool)
    .await?;

    Ok(Json(records))
}

/// Aggregated dashboard for the caller.
///
/// Fetches the caller's documents and progress/content join rows, then
/// hands both to the pure aggregator.
pub async fn get_dashboard(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let documents = sqlx::query_as::<_, Document>(
        r#"
        SELECT id, user_id, subject, raw_image_uri, processing_status, created_at
        FROM documents
        WHERE user_id = ?
        "#,
    )
    .bind(&claims.sub)
    .fetch_all(&pool)
    .await?;

    let activities = sqlx::query_as::<_, ActivityRow>(
        r#"
        SELECT p.content_id,
               c.title AS content_title,
               c.content_type,
               c.subject,
               p.score,
               p.time_spent_seconds,
               p.completed_at
        FROM progress_records p
        JOIN contents c ON p.content_id = c.id
        WHERE p.user_id = ?
        "#,
    )
    .bind(&claims.sub)
    .fetch_all(&pool)
    .await?;

    Ok(Json(dashboard::aggregate(&documents, &activities)))
}
