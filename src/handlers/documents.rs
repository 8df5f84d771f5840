// src/handlers/documents.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{error::AppError, models::document::Document, utils::jwt::Claims};

/// Lists the caller's documents, newest first.
/// Document creation happens in the upstream ingestion pipeline.
pub async fn list_documents(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let documents = sqlx::query_as::<_, Document>(
        r#"
        SELECT id, user_id, subject, raw_image_uri, processing_status, created_at
        FROM documents
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(&claims.sub)
    .fetch_all(&pool)
    .await?;

    Ok(Json(documents))
}
