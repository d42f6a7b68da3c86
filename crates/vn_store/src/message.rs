//! The persisted message entity.
//!
//! A message owns its body text, its ordered body attachment ids, four
//! optional sub-objects that may carry one attachment reference each, and
//! two independent expiration timers. Every mutation here runs inside a
//! caller-held write transaction and persists before returning; read
//! accessors resolve attachment ids through [`AttachmentStore`] on a read
//! connection.

use sqlx::SqliteConnection;
use tracing::{debug, warn};

use vn_model::{
    collect_attachment_ids, AttachmentSlot, ContactShare, ConversationExpiration,
    InteractionRecord, LinkPreview, MessageSticker, ModelError, PerMessageExpiration,
    QuotedMessage,
};

use crate::attachment_store::{Attachment, AttachmentStore};
use crate::error::StoreError;
use crate::models::MessageRow;

/// Current persisted schema version, stored with every row for forward
/// migration.
pub const MESSAGE_SCHEMA_VERSION: u32 = 1;

/// Decides whether now is the right moment to start the per-conversation
/// disappearing-message countdown. The trigger policy (start on read, start
/// on send, ...) belongs to the caller; the entity only contributes the
/// state predicate.
pub trait ExpireTimerPolicy {
    fn should_start(&self, message: &Message) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Identity and ordering, held by composition.
    pub record: InteractionRecord,
    pub body: Option<String>,
    /// Body attachment ids only; insertion order = display order.
    pub attachment_ids: Vec<String>,
    pub quoted_message: Option<QuotedMessage>,
    pub contact_share: Option<ContactShare>,
    pub link_preview: Option<LinkPreview>,
    pub message_sticker: Option<MessageSticker>,
    pub conversation_expiration: ConversationExpiration,
    pub per_message_expiration: PerMessageExpiration,
    pub schema_version: u32,
}

/// Designated construction path for a new message. Everything not settable
/// here defaults to zero/absent.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    thread_id: String,
    timestamp: u64,
    body: Option<String>,
    attachment_ids: Vec<String>,
    expires_in_seconds: u32,
    expire_started_at: u64,
    quoted_message: Option<QuotedMessage>,
    contact_share: Option<ContactShare>,
    link_preview: Option<LinkPreview>,
    message_sticker: Option<MessageSticker>,
    per_message_expiration_duration_seconds: u32,
}

impl MessageBuilder {
    pub fn new(thread_id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            thread_id: thread_id.into(),
            timestamp,
            body: None,
            attachment_ids: Vec::new(),
            expires_in_seconds: 0,
            expire_started_at: 0,
            quoted_message: None,
            contact_share: None,
            link_preview: None,
            message_sticker: None,
            per_message_expiration_duration_seconds: 0,
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn attachment_ids(mut self, ids: Vec<String>) -> Self {
        self.attachment_ids = ids;
        self
    }

    /// Per-conversation disappearing-messages duration.
    pub fn expires_in(mut self, duration_secs: u32) -> Self {
        self.expires_in_seconds = duration_secs;
        self
    }

    /// Start time for a conversation countdown already running at creation
    /// (e.g. an incoming message from a peer that started it).
    pub fn expire_started_at(mut self, started_at: u64) -> Self {
        self.expire_started_at = started_at;
        self
    }

    pub fn quoted_message(mut self, quote: QuotedMessage) -> Self {
        self.quoted_message = Some(quote);
        self
    }

    pub fn contact_share(mut self, contact: ContactShare) -> Self {
        self.contact_share = Some(contact);
        self
    }

    pub fn link_preview(mut self, preview: LinkPreview) -> Self {
        self.link_preview = Some(preview);
        self
    }

    pub fn message_sticker(mut self, sticker: MessageSticker) -> Self {
        self.message_sticker = Some(sticker);
        self
    }

    /// Per-message (view-once) expiration duration.
    pub fn per_message_expiration(mut self, duration_secs: u32) -> Self {
        self.per_message_expiration_duration_seconds = duration_secs;
        self
    }

    /// Validates the timer parameters; inconsistent combinations are a
    /// construction-time contract failure.
    pub fn build(self) -> Result<Message, ModelError> {
        let conversation_expiration =
            ConversationExpiration::from_parts(self.expires_in_seconds, self.expire_started_at, 0)?;
        let per_message_expiration = PerMessageExpiration::from_parts(
            self.per_message_expiration_duration_seconds,
            0,
            false,
        )?;
        Ok(Message {
            record: InteractionRecord::new(self.thread_id, self.timestamp),
            body: self.body,
            attachment_ids: self.attachment_ids,
            quoted_message: self.quoted_message,
            contact_share: self.contact_share,
            link_preview: self.link_preview,
            message_sticker: self.message_sticker,
            conversation_expiration,
            per_message_expiration,
            schema_version: MESSAGE_SCHEMA_VERSION,
        })
    }
}

// ── Attachment aggregation ───────────────────────────────────────────────────

impl Message {
    pub fn has_attachments(&self) -> bool {
        !self.attachment_ids.is_empty()
    }

    /// The sub-object reference slots, in canonical aggregation order:
    /// quoted thumbnail, contact avatar, link-preview image, sticker image.
    fn sub_object_slots(&self) -> Vec<AttachmentSlot> {
        let mut slots = Vec::with_capacity(4);
        if let Some(quote) = &self.quoted_message {
            slots.push(quote.attachment_slot());
        }
        if let Some(contact) = &self.contact_share {
            slots.push(contact.attachment_slot());
        }
        if let Some(preview) = &self.link_preview {
            slots.push(preview.attachment_slot());
        }
        if let Some(sticker) = &self.message_sticker {
            slots.push(sticker.attachment_slot());
        }
        slots
    }

    /// Ids of every attachment referenced anywhere on this message: body
    /// attachments first, then sub-object references, deduplicated. No
    /// resolution, no transaction needed.
    pub fn all_attachment_ids(&self) -> Vec<String> {
        collect_attachment_ids(&self.attachment_ids, self.sub_object_slots())
    }

    /// Resolve the body attachments, in order. Dangling ids are omitted.
    pub async fn body_attachments(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Attachment>, StoreError> {
        Self::resolve_ids(conn, &self.attachment_ids).await
    }

    /// Body attachments that are visual/audio media (excludes the
    /// oversize-text carrier and generic files).
    pub async fn media_attachments(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Attachment>, StoreError> {
        let mut attachments = self.body_attachments(conn).await?;
        attachments.retain(|a| a.content_type.is_media());
        Ok(attachments)
    }

    /// The single oversize-text attachment, if any. At most one exists.
    pub async fn oversize_text_attachment(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Attachment>, StoreError> {
        let attachments = self.body_attachments(conn).await?;
        Ok(attachments.into_iter().find(|a| a.content_type.is_oversize_text()))
    }

    /// Resolve every referenced attachment, in the `all_attachment_ids`
    /// order.
    pub async fn all_attachments(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Attachment>, StoreError> {
        Self::resolve_ids(conn, &self.all_attachment_ids()).await
    }

    async fn resolve_ids(
        conn: &mut SqliteConnection,
        ids: &[String],
    ) -> Result<Vec<Attachment>, StoreError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match AttachmentStore::resolve(conn, id).await? {
                Some(attachment) => out.push(attachment),
                None => debug!("[message] dangling attachment id {id}, omitting"),
            }
        }
        Ok(out)
    }

    /// Full body text: the oversize-text attachment's content when present,
    /// the inline body otherwise.
    pub async fn body_text(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Option<String>, StoreError> {
        if let Some(text) = self.oversize_text(conn).await? {
            return Ok(Some(text));
        }
        Ok(self.body.clone())
    }

    /// Decoded content of the oversize-text attachment, if any.
    pub async fn oversize_text(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Option<String>, StoreError> {
        match self.oversize_text_attachment(conn).await? {
            Some(attachment) => {
                let text = String::from_utf8(attachment.data)
                    .map_err(|_| ModelError::OversizeTextNotUtf8)?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    /// Distinguishes structurally-present-but-empty rows (a tombstoned
    /// view-once message) from genuine content.
    pub fn has_renderable_content(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.is_empty())
            || self.has_attachments()
            || self.quoted_message.is_some()
            || self.contact_share.is_some()
            || self.link_preview.is_some()
            || self.message_sticker.is_some()
    }

    /// Point the quoted-message thumbnail at a freshly created attachment
    /// stream (thumbnails are generated lazily after quote creation).
    /// Does NOT persist; the caller wraps this in its own transaction and
    /// calls `save`.
    pub fn set_quoted_thumbnail_attachment(&mut self, attachment: &Attachment) {
        match &mut self.quoted_message {
            Some(quote) => quote.thumbnail_attachment_id = Some(attachment.id.clone()),
            None => warn!(
                "[message] {} has no quoted message to attach a thumbnail to",
                self.record.unique_id
            ),
        }
    }

    /// Remove `attachment` from every slot that references it, persist, and
    /// delete the underlying record. A sub-object may share an id with the
    /// body list, so all slots are cleared before the record goes away.
    /// Idempotent: an unreferenced id is a no-op.
    pub async fn remove_attachment(
        &mut self,
        attachment: &Attachment,
        conn: &mut SqliteConnection,
    ) -> Result<(), StoreError> {
        let id = attachment.id.as_str();
        let body_count = self.attachment_ids.len();
        self.attachment_ids.retain(|a| a.as_str() != id);
        let mut found = self.attachment_ids.len() != body_count;

        if let Some(quote) = self
            .quoted_message
            .as_mut()
            .filter(|q| q.thumbnail_attachment_id.as_deref() == Some(id))
        {
            quote.thumbnail_attachment_id = None;
            found = true;
        }
        if let Some(contact) = self
            .contact_share
            .as_mut()
            .filter(|c| c.avatar_attachment_id.as_deref() == Some(id))
        {
            contact.avatar_attachment_id = None;
            found = true;
        }
        if let Some(preview) = self
            .link_preview
            .as_mut()
            .filter(|p| p.image_attachment_id.as_deref() == Some(id))
        {
            preview.image_attachment_id = None;
            found = true;
        }
        if self.message_sticker.as_ref().is_some_and(|s| s.attachment_id == id) {
            // The image is the sticker: dropping it drops the sub-object.
            self.message_sticker = None;
            found = true;
        }

        if !found {
            debug!("[message] {} does not reference attachment {id}", self.record.unique_id);
            return Ok(());
        }

        self.save(conn).await?;
        AttachmentStore::delete(conn, id).await
    }
}

// ── Expiration timers ────────────────────────────────────────────────────────

impl Message {
    pub fn has_per_conversation_expiration(&self) -> bool {
        self.conversation_expiration.is_enabled()
    }

    pub fn expires_in_seconds(&self) -> u32 {
        self.conversation_expiration.duration_secs()
    }

    pub fn expire_started_at(&self) -> u64 {
        self.conversation_expiration.started_at()
    }

    pub fn expires_at(&self) -> u64 {
        self.conversation_expiration.expires_at()
    }

    pub fn has_per_message_expiration(&self) -> bool {
        self.per_message_expiration.is_enabled()
    }

    pub fn has_per_message_expiration_started(&self) -> bool {
        self.per_message_expiration.has_started()
    }

    pub fn per_message_expiration_has_expired(&self) -> bool {
        self.per_message_expiration.has_expired()
    }

    pub fn per_message_expires_at(&self) -> u64 {
        self.per_message_expiration.expires_at()
    }

    /// Whether the message-processing pipeline should start the
    /// conversation countdown now. True only while the timer is armed and
    /// not yet counting AND the caller's policy agrees.
    pub fn should_start_expire_timer(&self, policy: &dyn ExpireTimerPolicy) -> bool {
        self.conversation_expiration.is_enabled()
            && !self.conversation_expiration.has_started()
            && policy.should_start(self)
    }

    /// Armed -> Counting-down for the conversation timer, or re-base an
    /// already running countdown. Idempotent for an identical timestamp;
    /// a no-op when no timer is configured.
    pub async fn update_with_expire_started_at(
        &mut self,
        started_at: u64,
        conn: &mut SqliteConnection,
    ) -> Result<(), StoreError> {
        if !self.conversation_expiration.is_enabled() {
            debug!("[message] {} has no conversation timer to start", self.record.unique_id);
            return Ok(());
        }
        if self.conversation_expiration.started_at() == started_at {
            return Ok(());
        }

        self.conversation_expiration = self.conversation_expiration.start(started_at);
        sqlx::query("UPDATE messages SET expire_started_at = ?, expires_at = ? WHERE unique_id = ?")
            .bind(started_at as i64)
            .bind(self.conversation_expiration.expires_at() as i64)
            .bind(&self.record.unique_id)
            .execute(&mut *conn)
            .await?;
        debug!(
            "[message] {} conversation countdown started at {started_at}, expires {}",
            self.record.unique_id,
            self.conversation_expiration.expires_at()
        );
        Ok(())
    }

    /// Armed -> Counting-down for the per-message timer.
    ///
    /// Internal primitive: route through the countdown coordinator instead
    /// of calling this directly, so races between concurrent viewers stay
    /// centralized. The transition itself is first-writer-wins: the guarded
    /// UPDATE only fires while the stored start time is still zero, and a
    /// losing caller adopts the winner's start time.
    pub async fn update_with_per_message_expire_started_at(
        &mut self,
        started_at: u64,
        conn: &mut SqliteConnection,
    ) -> Result<(), StoreError> {
        if !self.per_message_expiration.is_enabled() {
            debug!("[message] {} has no per-message timer to start", self.record.unique_id);
            return Ok(());
        }

        let candidate = self.per_message_expiration.start(started_at);
        let result = sqlx::query(
            "UPDATE messages SET per_message_expire_started_at = ?, per_message_expires_at = ? \
             WHERE unique_id = ? AND per_message_expire_started_at = 0",
        )
        .bind(started_at as i64)
        .bind(candidate.expires_at() as i64)
        .bind(&self.record.unique_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // Another viewer won the race (or the countdown was already
            // running); converge on the committed start time.
            let winner: i64 = sqlx::query_scalar(
                "SELECT per_message_expire_started_at FROM messages WHERE unique_id = ?",
            )
            .bind(&self.record.unique_id)
            .fetch_one(&mut *conn)
            .await?;
            self.per_message_expiration = self.per_message_expiration.start(winner as u64);
            debug!(
                "[message] {} per-message countdown already started at {winner}",
                self.record.unique_id
            );
        } else {
            self.per_message_expiration = candidate;
            debug!(
                "[message] {} per-message countdown started at {started_at}",
                self.record.unique_id
            );
        }
        Ok(())
    }

    /// Counting-down -> Expired: tombstone the message. The row survives
    /// for consistency, but body, sub-objects and every attachment
    /// reference (and the attachment records themselves) are gone, so
    /// `has_renderable_content()` turns false. Irreversible; calling it
    /// again is a no-op.
    pub async fn update_with_per_message_expired_and_remove_renderable_content(
        &mut self,
        conn: &mut SqliteConnection,
    ) -> Result<(), StoreError> {
        if self.per_message_expiration.has_expired() {
            return Ok(());
        }
        if !self.per_message_expiration.has_started() {
            warn!(
                "[message] {} per-message countdown never started; not expiring",
                self.record.unique_id
            );
            return Ok(());
        }

        for id in self.all_attachment_ids() {
            AttachmentStore::delete(conn, &id).await?;
        }
        self.body = None;
        self.attachment_ids.clear();
        self.quoted_message = None;
        self.contact_share = None;
        self.link_preview = None;
        self.message_sticker = None;
        self.per_message_expiration = self.per_message_expiration.expire();

        sqlx::query(
            "UPDATE messages SET body = NULL, attachment_ids = '[]', quoted_message = NULL, \
             contact_share = NULL, link_preview = NULL, message_sticker = NULL, \
             per_message_expiration_has_expired = 1 WHERE unique_id = ?",
        )
        .bind(&self.record.unique_id)
        .execute(&mut *conn)
        .await?;
        debug!("[message] {} tombstoned after per-message expiry", self.record.unique_id);
        Ok(())
    }
}

// ── Sub-object replacement ───────────────────────────────────────────────────

impl Message {
    /// Replace the link preview wholesale (preview metadata typically
    /// arrives after the message is first stored) and persist.
    pub async fn update_with_link_preview(
        &mut self,
        preview: LinkPreview,
        conn: &mut SqliteConnection,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(&preview)?;
        self.link_preview = Some(preview);
        sqlx::query("UPDATE messages SET link_preview = ? WHERE unique_id = ?")
            .bind(json)
            .bind(&self.record.unique_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Replace the sticker payload wholesale and persist.
    pub async fn update_with_message_sticker(
        &mut self,
        sticker: MessageSticker,
        conn: &mut SqliteConnection,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(&sticker)?;
        self.message_sticker = Some(sticker);
        sqlx::query("UPDATE messages SET message_sticker = ? WHERE unique_id = ?")
            .bind(json)
            .bind(&self.record.unique_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

// ── Persistence primitives ───────────────────────────────────────────────────

impl Message {
    /// Persist the full entity. First save assigns the next store-global
    /// sort id; messages order consistently across threads.
    pub async fn save(&mut self, conn: &mut SqliteConnection) -> Result<(), StoreError> {
        if self.record.sort_id == 0 {
            let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(sort_id), 0) + 1 FROM messages")
                .fetch_one(&mut *conn)
                .await?;
            self.record.sort_id = next as u64;
        }

        let quoted = self.quoted_message.as_ref().map(serde_json::to_string).transpose()?;
        let contact = self.contact_share.as_ref().map(serde_json::to_string).transpose()?;
        let preview = self.link_preview.as_ref().map(serde_json::to_string).transpose()?;
        let sticker = self.message_sticker.as_ref().map(serde_json::to_string).transpose()?;
        let attachment_ids = serde_json::to_string(&self.attachment_ids)?;

        sqlx::query(
            "INSERT OR REPLACE INTO messages (unique_id, thread_id, timestamp, sort_id, \
             received_at, body, attachment_ids, quoted_message, contact_share, link_preview, \
             message_sticker, expires_in_seconds, expire_started_at, expires_at, \
             per_message_expiration_duration_seconds, per_message_expire_started_at, \
             per_message_expires_at, per_message_expiration_has_expired, schema_version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.record.unique_id)
        .bind(&self.record.thread_id)
        .bind(self.record.timestamp as i64)
        .bind(self.record.sort_id as i64)
        .bind(self.record.received_at as i64)
        .bind(&self.body)
        .bind(attachment_ids)
        .bind(quoted)
        .bind(contact)
        .bind(preview)
        .bind(sticker)
        .bind(self.conversation_expiration.duration_secs() as i64)
        .bind(self.conversation_expiration.started_at() as i64)
        .bind(self.conversation_expiration.expires_at() as i64)
        .bind(self.per_message_expiration.duration_secs() as i64)
        .bind(self.per_message_expiration.started_at() as i64)
        .bind(self.per_message_expiration.expires_at() as i64)
        .bind(self.per_message_expiration.has_expired())
        .bind(self.schema_version as i64)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Load by unique id; absent rows are `None`.
    pub async fn load(
        conn: &mut SqliteConnection,
        unique_id: &str,
    ) -> Result<Option<Message>, StoreError> {
        let row: Option<MessageRow> = sqlx::query_as(
            "SELECT unique_id, thread_id, timestamp, sort_id, received_at, body, \
             attachment_ids, quoted_message, contact_share, link_preview, message_sticker, \
             expires_in_seconds, expire_started_at, expires_at, \
             per_message_expiration_duration_seconds, per_message_expire_started_at, \
             per_message_expires_at, per_message_expiration_has_expired, schema_version \
             FROM messages WHERE unique_id = ?",
        )
        .bind(unique_id)
        .fetch_optional(&mut *conn)
        .await?;
        row.map(Message::try_from).transpose()
    }
}
