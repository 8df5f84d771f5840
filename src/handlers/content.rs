// src/handlers/content.rs

use axum::{Json, extract::{Path, State}, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{cache, error::AppError, models::content::{ContentItem, ContentResponse}};

/// Retrieves a single content item by ID.
///
/// * Increments the view counter server-side, as a side effect of the fetch.
/// * Correct answers are stripped from the returned payload.
pub async fn get_content(
    State(pool): State<SqlitePool>,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // Count the view and read the row in one transaction; a failed read
    // must not leave a view behind that was never served.
    let mut tx = pool.begin().await?;

    let updated = sqlx::query("UPDATE contents SET views = views + 1 WHERE id = ?")
        .bind(&content_id)
        .execute(&mut *tx)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Content {} not found",
            content_id
        )));
    }

    let item = cache::load_content(&mut *tx, &content_id).await?;

    tx.commit().await?;

    Ok(Json(ContentResponse::from(&item)))
}

/// Lists all generated content for a document (answers stripped).
pub async fn list_document_content(
    State(pool): State<SqlitePool>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let items = sqlx::query_as::<_, ContentItem>(
        r#"
        SELECT id, document_id, user_id, content_type, subject, title,
               description, content_json, views, completions, average_score,
               created_at
        FROM contents
        WHERE document_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(&document_id)
    .fetch_all(&pool)
    .await?;

    let responses: Vec<ContentResponse> = items.iter().map(ContentResponse::from).collect();

    Ok(Json(responses))
}
