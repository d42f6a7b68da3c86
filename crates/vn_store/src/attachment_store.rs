//! Attachment storage collaborator.
//!
//! The message entity never touches attachment bytes directly; it holds ids
//! and goes through this store to resolve, create or delete the records.

use sqlx::SqliteConnection;
use uuid::Uuid;
use vn_model::ContentType;

use crate::error::StoreError;
use crate::models::AttachmentRow;

/// A resolved attachment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub content_type: ContentType,
    pub byte_count: u64,
    pub data: Vec<u8>,
}

pub struct AttachmentStore;

impl AttachmentStore {
    /// Resolve an id to a live attachment. A dangling id is absence, not an
    /// error: a referenced attachment may have been deleted out from under
    /// the message (soft-delete tolerance).
    pub async fn resolve(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> Result<Option<Attachment>, StoreError> {
        let row: Option<AttachmentRow> =
            sqlx::query_as("SELECT id, content_type, byte_count, data FROM attachments WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        row.map(Attachment::try_from).transpose()
    }

    /// Delete the underlying attachment record. Deleting an id that is
    /// already gone is a no-op.
    pub async fn delete(conn: &mut SqliteConnection, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Create a new attachment stream from raw data, returning the stored
    /// record with its fresh id.
    pub async fn create_stream(
        conn: &mut SqliteConnection,
        content_type: ContentType,
        data: Vec<u8>,
    ) -> Result<Attachment, StoreError> {
        let attachment = Attachment {
            id: Uuid::new_v4().to_string(),
            content_type,
            byte_count: data.len() as u64,
            data,
        };
        sqlx::query("INSERT INTO attachments (id, content_type, byte_count, data) VALUES (?, ?, ?, ?)")
            .bind(&attachment.id)
            .bind(attachment.content_type.as_str())
            .bind(attachment.byte_count as i64)
            .bind(&attachment.data)
            .execute(&mut *conn)
            .await?;
        Ok(attachment)
    }
}
