//! vn_model — Vanish message entity model
//!
//! Pure types for the persisted chat message entity: the two independent
//! expiration state machines (per-conversation disappearing messages and
//! per-message view-once expiration), the attachment slot abstraction that
//! unifies body attachments with sub-object references (quoted-reply
//! thumbnail, contact-share avatar, link-preview image, sticker image),
//! and the embedded interaction identity record.
//!
//! No I/O lives here; persistence is `vn_store`'s job.

pub mod attachment;
pub mod content;
pub mod error;
pub mod expiration;
pub mod interaction;
pub mod message;

pub use attachment::{collect_attachment_ids, AttachmentRole, AttachmentSlot};
pub use content::ContentType;
pub use error::ModelError;
pub use expiration::{ConversationExpiration, PerMessageExpiration};
pub use interaction::InteractionRecord;
pub use message::{ContactShare, LinkPreview, MessageSticker, QuotedMessage};
