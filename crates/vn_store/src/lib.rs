//! vn_store — SQLite persistence for the Vanish message entity
//!
//! # Transaction model
//! Every mutation takes a caller-held `&mut SqliteConnection` obtained from
//! [`Store::begin_write`] (or the scoped [`Store::with_write`] helper) and
//! persists before returning; the entity does no locking of its own. Read
//! accessors that resolve attachments take a connection from
//! [`Store::read_conn`] / [`Store::with_read`].
//!
//! # Expiry
//! There is no background timer anywhere in this crate: the store records
//! when a countdown started, and whoever reads `expires_at` compares it to
//! the clock. Deletion of expired conversation messages belongs to the
//! owning collaborator.
//!
//! # Migration
//! SQLx migrations in `migrations/` are run on first open.

pub mod attachment_store;
pub mod db;
pub mod error;
pub mod message;
pub mod models;

pub use attachment_store::{Attachment, AttachmentStore};
pub use db::Store;
pub use error::StoreError;
pub use message::{ExpireTimerPolicy, Message, MessageBuilder, MESSAGE_SCHEMA_VERSION};
