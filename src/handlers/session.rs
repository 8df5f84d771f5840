// src/handlers/session.rs
//
// HTTP surface of the assessment session state machine. Each handler maps
// onto one transition; transition legality is enforced by the session
// itself, before any database work is attempted.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    cache::ContentCache,
    error::AppError,
    handlers::progress::progress_response,
    recorder, scoring,
    session::{LoadedContent, Session, SessionStore},
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub content_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: String,
    pub answer: String,
}

/// Starts a new attempt: fetches the content through the cache, validates
/// it, and stores the session in progress.
///
/// Fails with 404 for unknown content and 422 for content that cannot be
/// assessed (no questions, broken invariants); a failed load discards the
/// controller, a new attempt must be created to retry.
pub async fn create_session(
    State(pool): State<SqlitePool>,
    State(content_cache): State<ContentCache>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut session = Session::new(&claims.sub, &req.content_id);

    let item = match content_cache.fetch(&pool, &req.content_id).await {
        Ok(item) => item,
        Err(e) => {
            session.load_failed();
            return Err(e);
        }
    };

    let loaded = match LoadedContent::from_item(&item) {
        Ok(loaded) => Arc::new(loaded),
        Err(e) => {
            session.load_failed();
            return Err(e);
        }
    };

    session.content_loaded(loaded)?;

    tracing::info!(
        session_id = %session.id,
        content_id = %req.content_id,
        user_id = %claims.sub,
        "Session started"
    );

    let view = session.view();
    sessions.insert(session);

    Ok((StatusCode::CREATED, Json(view)))
}

/// Returns the owner's view of a session (no correct answers).
pub async fn get_session(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with_session(&session_id, &claims.sub, |s| Ok(s.view()))?;
    Ok(Json(view))
}

/// Upserts an answer for a question of the session.
pub async fn answer_question(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with_session(&session_id, &claims.sub, |s| {
        s.answer(&req.question_id, &req.answer)?;
        Ok(s.view())
    })?;
    Ok(Json(view))
}

/// Advances to the next question.
pub async fn next_question(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with_session(&session_id, &claims.sub, |s| {
        s.next()?;
        Ok(s.view())
    })?;
    Ok(Json(view))
}

/// Steps back to the previous question.
pub async fn previous_question(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with_session(&session_id, &claims.sub, |s| {
        s.previous()?;
        Ok(s.view())
    })?;
    Ok(Json(view))
}

/// Submits the attempt.
///
/// * Builds the answer submissions under the store lock; a double submit is
///   rejected there, before any database call is made.
/// * Scores server-side and records the progress.
/// * On recorder failure the session stays in Submitting for an explicit
///   retry by the learner.
pub async fn submit_session(
    State(pool): State<SqlitePool>,
    State(content_cache): State<ContentCache>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (prepared, content) = sessions.with_session(&session_id, &claims.sub, |s| {
        let prepared = s.begin_submit(Utc::now())?;
        let content = s
            .content()
            .cloned()
            .ok_or_else(|| AppError::InternalServerError("Session has no content".to_string()))?;
        Ok((prepared, content))
    })?;

    let outcome = scoring::score_submissions(&content.questions, &prepared.submissions);

    match recorder::record_submission(
        &pool,
        &claims.sub,
        &content.content_id,
        &outcome,
        prepared.total_time_spent,
    )
    .await
    {
        Ok(record) => {
            content_cache.invalidate(&content.content_id);

            // The learner may have abandoned the session while the record
            // was being written; a late result is discarded, never applied
            // to a stale or replaced session.
            if sessions
                .with_session(&session_id, &claims.sub, |s| s.complete(outcome.score))
                .is_err()
            {
                tracing::debug!(session_id = %session_id, "Session gone before completion");
            }

            Ok((
                StatusCode::CREATED,
                Json(progress_response(record, &outcome)),
            ))
        }
        Err(e) => {
            let _ = sessions.with_session(&session_id, &claims.sub, |s| {
                s.submission_failed();
                Ok(())
            });
            Err(e)
        }
    }
}

/// Abandons the attempt and destroys its state.
pub async fn abandon_session(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    sessions
        .remove(&session_id, &claims.sub)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;
    Ok(StatusCode::NO_CONTENT)
}
