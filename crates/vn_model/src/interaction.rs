//! Embedded interaction identity record.
//!
//! The original design hung message identity off an inherited interaction
//! base class; here the record is held by composition inside the message
//! entity and carries only identity, ordering and thread association.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Stable unique ID, primary key of the persisted row.
    pub unique_id: String,
    /// Owning conversation/thread ID.
    pub thread_id: String,
    /// Sender-asserted timestamp (Unix ms).
    pub timestamp: u64,
    /// Monotonic ordering key assigned by the storage layer (0 until assigned).
    pub sort_id: u64,
    /// Local receive time (Unix ms).
    pub received_at: u64,
}

impl InteractionRecord {
    /// Fresh identity for a newly created message.
    pub fn new(thread_id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            unique_id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            timestamp,
            sort_id: 0,
            received_at: Utc::now().timestamp_millis() as u64,
        }
    }
}
