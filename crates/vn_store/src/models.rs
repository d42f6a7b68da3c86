//! Database row models — these map to/from SQL rows.

use vn_model::{
    ContactShare, ContentType, ConversationExpiration, InteractionRecord, LinkPreview,
    MessageSticker, PerMessageExpiration, QuotedMessage,
};

use crate::attachment_store::Attachment;
use crate::error::StoreError;
use crate::message::Message;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub unique_id: String,
    pub thread_id: String,
    pub timestamp: i64,
    pub sort_id: i64,
    pub received_at: i64,
    pub body: Option<String>,
    /// JSON array of body attachment ids, insertion order = display order.
    pub attachment_ids: String,
    pub quoted_message: Option<String>,
    pub contact_share: Option<String>,
    pub link_preview: Option<String>,
    pub message_sticker: Option<String>,
    pub expires_in_seconds: i64,
    pub expire_started_at: i64,
    pub expires_at: i64,
    pub per_message_expiration_duration_seconds: i64,
    pub per_message_expire_started_at: i64,
    pub per_message_expires_at: i64,
    pub per_message_expiration_has_expired: bool,
    pub schema_version: i64,
}

fn decode_json<T: serde::de::DeserializeOwned>(col: &Option<String>) -> Result<Option<T>, StoreError> {
    match col {
        Some(json) => Ok(Some(serde_json::from_str(json)?)),
        None => Ok(None),
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    /// Decode a persisted row, validating the raw timer columns. Rows with
    /// inconsistent timer state (a deadline without a start time, an expired
    /// flag on a timer that never ran) are rejected rather than guessed at.
    fn try_from(row: MessageRow) -> Result<Self, StoreError> {
        let conversation_expiration = ConversationExpiration::from_parts(
            row.expires_in_seconds as u32,
            row.expire_started_at as u64,
            row.expires_at as u64,
        )?;
        let per_message_expiration = PerMessageExpiration::from_parts(
            row.per_message_expiration_duration_seconds as u32,
            row.per_message_expire_started_at as u64,
            row.per_message_expiration_has_expired,
        )?;

        let quoted_message: Option<QuotedMessage> = decode_json(&row.quoted_message)?;
        let contact_share: Option<ContactShare> = decode_json(&row.contact_share)?;
        let link_preview: Option<LinkPreview> = decode_json(&row.link_preview)?;
        let message_sticker: Option<MessageSticker> = decode_json(&row.message_sticker)?;
        let attachment_ids: Vec<String> = serde_json::from_str(&row.attachment_ids)?;

        Ok(Message {
            record: InteractionRecord {
                unique_id: row.unique_id,
                thread_id: row.thread_id,
                timestamp: row.timestamp as u64,
                sort_id: row.sort_id as u64,
                received_at: row.received_at as u64,
            },
            body: row.body,
            attachment_ids,
            quoted_message,
            contact_share,
            link_preview,
            message_sticker,
            conversation_expiration,
            per_message_expiration,
            schema_version: row.schema_version as u32,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttachmentRow {
    pub id: String,
    pub content_type: String,
    pub byte_count: i64,
    pub data: Vec<u8>,
}

impl TryFrom<AttachmentRow> for Attachment {
    type Error = StoreError;

    fn try_from(row: AttachmentRow) -> Result<Self, StoreError> {
        Ok(Attachment {
            id: row.id,
            content_type: ContentType::parse(&row.content_type)?,
            byte_count: row.byte_count as u64,
            data: row.data,
        })
    }
}
