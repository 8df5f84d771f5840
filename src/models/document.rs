// src/models/document.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'documents' table in the database.
///
/// Documents are created by the upstream ingestion/OCR pipeline; this
/// service reads them to feed dashboard aggregation and to anchor generated
/// content.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub subject: Option<String>,

    /// URI of the uploaded homework image.
    pub raw_image_uri: String,

    /// Pipeline status: 'pending', 'processing', 'completed' or 'error'.
    pub processing_status: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}
