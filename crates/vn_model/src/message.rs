//! Optional sub-object payloads carried by a message.
//!
//! Each sub-object may reference at most one attachment of its own; the
//! reference is surfaced through `attachment_slot()` so the aggregation
//! views in the store never need to know which field holds what.

use serde::{Deserialize, Serialize};

use crate::attachment::{AttachmentRole, AttachmentSlot};

/// Excerpt of a replied-to message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedMessage {
    /// Author of the message being quoted.
    pub author_id: String,
    /// Sender timestamp of the quoted message (Unix ms).
    pub quoted_timestamp: u64,
    pub body: Option<String>,
    /// Thumbnail of the quoted media, if one has been generated.
    /// May be filled in lazily after the quote itself is created.
    pub thumbnail_attachment_id: Option<String>,
}

impl QuotedMessage {
    pub fn attachment_slot(&self) -> AttachmentSlot {
        AttachmentSlot::new(AttachmentRole::QuotedThumbnail, self.thumbnail_attachment_id.clone())
    }
}

/// Shared contact card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactShare {
    pub display_name: String,
    pub phone_number: Option<String>,
    pub avatar_attachment_id: Option<String>,
}

impl ContactShare {
    pub fn attachment_slot(&self) -> AttachmentSlot {
        AttachmentSlot::new(AttachmentRole::ContactAvatar, self.avatar_attachment_id.clone())
    }
}

/// Link preview metadata, typically fetched after the message is first stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: String,
    pub title: Option<String>,
    pub image_attachment_id: Option<String>,
}

impl LinkPreview {
    pub fn attachment_slot(&self) -> AttachmentSlot {
        AttachmentSlot::new(AttachmentRole::LinkPreviewImage, self.image_attachment_id.clone())
    }
}

/// Sticker payload. The sticker image IS the sticker, so its attachment
/// reference is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSticker {
    pub pack_id: String,
    pub sticker_id: u32,
    pub attachment_id: String,
}

impl MessageSticker {
    pub fn attachment_slot(&self) -> AttachmentSlot {
        AttachmentSlot::new(AttachmentRole::StickerImage, Some(self.attachment_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_carry_their_role() {
        let quote = QuotedMessage {
            author_id: "alice".into(),
            quoted_timestamp: 1,
            body: Some("hello".into()),
            thumbnail_attachment_id: Some("t1".into()),
        };
        let slot = quote.attachment_slot();
        assert_eq!(slot.role, AttachmentRole::QuotedThumbnail);
        assert_eq!(slot.attachment_id.as_deref(), Some("t1"));

        let contact = ContactShare {
            display_name: "Bob".into(),
            phone_number: None,
            avatar_attachment_id: None,
        };
        assert_eq!(contact.attachment_slot().attachment_id, None);
    }
}
