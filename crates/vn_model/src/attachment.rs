//! Attachment slots: a uniform view over every place a message can hold an
//! attachment reference.
//!
//! Body attachments live in an ordered id list; each optional sub-object
//! (quoted reply, contact share, link preview, sticker) holds at most one
//! more reference. Aggregation views must union all of them in a fixed
//! order without double-counting, so the sub-object references are exposed
//! as `AttachmentSlot` values and the union is one fold.

use serde::{Deserialize, Serialize};

/// Which sub-object a reference belongs to. The ordered body id list is not
/// a slot; it is always folded first. Variant order is the canonical
/// aggregation order after the body attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentRole {
    QuotedThumbnail,
    ContactAvatar,
    LinkPreviewImage,
    StickerImage,
}

/// One named reference point holding zero or one attachment id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSlot {
    pub role: AttachmentRole,
    pub attachment_id: Option<String>,
}

impl AttachmentSlot {
    pub fn new(role: AttachmentRole, attachment_id: Option<String>) -> Self {
        Self { role, attachment_id }
    }

    pub fn empty(role: AttachmentRole) -> Self {
        Self { role, attachment_id: None }
    }
}

/// Union of body attachment ids and sub-object slots, in canonical order
/// (body first, then slots), dropping empty slots and duplicate ids while
/// preserving first-occurrence order.
pub fn collect_attachment_ids<'a>(
    body_ids: impl IntoIterator<Item = &'a String>,
    slots: impl IntoIterator<Item = AttachmentSlot>,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let ids = body_ids
        .into_iter()
        .cloned()
        .chain(slots.into_iter().filter_map(|slot| slot.attachment_id));
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
