//! The two expiration state machines of a message.
//!
//! A message carries two fully independent timers:
//! - `ConversationExpiration`: the per-thread disappearing-messages timer.
//! - `PerMessageExpiration`: the message-scoped view-once countdown.
//!
//! Both are persisted as loose integer columns (duration / started-at /
//! derived expires-at, plus an expired flag for the per-message timer) but
//! modeled here as tagged enums so that illegal column combinations, such
//! as an expiry deadline without a start time, cannot be represented
//! in memory. `from_parts` is the only place raw columns are interpreted.
//!
//! Neither timer schedules anything. Expiry is evaluated lazily by whoever
//! compares `expires_at()` against the current clock.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

fn deadline(started_at: u64, duration_secs: u32) -> u64 {
    started_at + u64::from(duration_secs) * 1000
}

/// Per-thread disappearing-messages timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationExpiration {
    /// No timer configured for this message (`expires_in_seconds == 0`).
    Disabled,
    /// Timer configured but the start event has not happened yet.
    Armed { duration_secs: u32 },
    /// Countdown running since `started_at` (Unix ms).
    CountingDown { duration_secs: u32, started_at: u64 },
}

impl ConversationExpiration {
    /// Interpret the raw persisted columns, rejecting inconsistent
    /// combinations and normalising the derived deadline.
    pub fn from_parts(duration_secs: u32, started_at: u64, expires_at: u64) -> Result<Self, ModelError> {
        if duration_secs == 0 {
            if started_at != 0 || expires_at != 0 {
                return Err(ModelError::InconsistentExpiration(format!(
                    "conversation timer disabled but started_at={started_at} expires_at={expires_at}"
                )));
            }
            return Ok(ConversationExpiration::Disabled);
        }
        if started_at == 0 {
            if expires_at != 0 {
                return Err(ModelError::InconsistentExpiration(format!(
                    "conversation expires_at={expires_at} set without a start time"
                )));
            }
            return Ok(ConversationExpiration::Armed { duration_secs });
        }
        // expires_at is derived; a stale stored value is recomputed, not trusted.
        Ok(ConversationExpiration::CountingDown { duration_secs, started_at })
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, ConversationExpiration::Disabled)
    }

    pub fn has_started(&self) -> bool {
        matches!(self, ConversationExpiration::CountingDown { .. })
    }

    pub fn duration_secs(&self) -> u32 {
        match *self {
            ConversationExpiration::Disabled => 0,
            ConversationExpiration::Armed { duration_secs }
            | ConversationExpiration::CountingDown { duration_secs, .. } => duration_secs,
        }
    }

    pub fn started_at(&self) -> u64 {
        match *self {
            ConversationExpiration::CountingDown { started_at, .. } => started_at,
            _ => 0,
        }
    }

    /// Deadline in Unix ms; 0 until the countdown has started.
    pub fn expires_at(&self) -> u64 {
        match *self {
            ConversationExpiration::CountingDown { duration_secs, started_at } => {
                deadline(started_at, duration_secs)
            }
            _ => 0,
        }
    }

    /// Armed -> CountingDown; re-bases an already running countdown.
    /// Starting a disabled timer is a no-op.
    pub fn start(self, started_at: u64) -> Self {
        match self {
            ConversationExpiration::Disabled => ConversationExpiration::Disabled,
            ConversationExpiration::Armed { duration_secs }
            | ConversationExpiration::CountingDown { duration_secs, .. } => {
                ConversationExpiration::CountingDown { duration_secs, started_at }
            }
        }
    }
}

/// Message-scoped (view-once) countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PerMessageExpiration {
    Disabled,
    Armed { duration_secs: u32 },
    CountingDown { duration_secs: u32, started_at: u64 },
    /// Terminal: content has been tombstoned. Irreversible.
    Expired { duration_secs: u32, started_at: u64 },
}

impl PerMessageExpiration {
    pub fn from_parts(duration_secs: u32, started_at: u64, has_expired: bool) -> Result<Self, ModelError> {
        if duration_secs == 0 {
            if started_at != 0 || has_expired {
                return Err(ModelError::InconsistentExpiration(format!(
                    "per-message timer disabled but started_at={started_at} has_expired={has_expired}"
                )));
            }
            return Ok(PerMessageExpiration::Disabled);
        }
        if started_at == 0 {
            if has_expired {
                return Err(ModelError::InconsistentExpiration(
                    "per-message timer expired without ever starting".to_string(),
                ));
            }
            return Ok(PerMessageExpiration::Armed { duration_secs });
        }
        if has_expired {
            Ok(PerMessageExpiration::Expired { duration_secs, started_at })
        } else {
            Ok(PerMessageExpiration::CountingDown { duration_secs, started_at })
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, PerMessageExpiration::Disabled)
    }

    pub fn has_started(&self) -> bool {
        matches!(
            self,
            PerMessageExpiration::CountingDown { .. } | PerMessageExpiration::Expired { .. }
        )
    }

    pub fn has_expired(&self) -> bool {
        matches!(self, PerMessageExpiration::Expired { .. })
    }

    pub fn duration_secs(&self) -> u32 {
        match *self {
            PerMessageExpiration::Disabled => 0,
            PerMessageExpiration::Armed { duration_secs }
            | PerMessageExpiration::CountingDown { duration_secs, .. }
            | PerMessageExpiration::Expired { duration_secs, .. } => duration_secs,
        }
    }

    pub fn started_at(&self) -> u64 {
        match *self {
            PerMessageExpiration::CountingDown { started_at, .. }
            | PerMessageExpiration::Expired { started_at, .. } => started_at,
            _ => 0,
        }
    }

    pub fn expires_at(&self) -> u64 {
        match *self {
            PerMessageExpiration::CountingDown { duration_secs, started_at }
            | PerMessageExpiration::Expired { duration_secs, started_at } => {
                deadline(started_at, duration_secs)
            }
            _ => 0,
        }
    }

    /// Armed -> CountingDown. First writer wins: a countdown that is already
    /// running (or already expired) keeps its original start time.
    pub fn start(self, started_at: u64) -> Self {
        match self {
            PerMessageExpiration::Armed { duration_secs } => {
                PerMessageExpiration::CountingDown { duration_secs, started_at }
            }
            other => other,
        }
    }

    /// CountingDown -> Expired. Idempotent; no effect on states that have
    /// not started counting.
    pub fn expire(self) -> Self {
        match self {
            PerMessageExpiration::CountingDown { duration_secs, started_at } => {
                PerMessageExpiration::Expired { duration_secs, started_at }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_deadline_is_start_plus_duration_ms() {
        let exp = ConversationExpiration::from_parts(86400, 0, 0).unwrap().start(1000);
        assert_eq!(exp.expires_at(), 86_401_000);
        assert!(exp.is_enabled());
        assert!(exp.has_started());
    }

    #[test]
    fn conversation_disabled_never_counts() {
        let exp = ConversationExpiration::from_parts(0, 0, 0).unwrap();
        assert!(!exp.is_enabled());
        assert_eq!(exp.start(5000), ConversationExpiration::Disabled);
        assert_eq!(exp.expires_at(), 0);
    }

    #[test]
    fn conversation_rejects_deadline_without_start() {
        assert!(ConversationExpiration::from_parts(60, 0, 12345).is_err());
        assert!(ConversationExpiration::from_parts(0, 1000, 0).is_err());
    }

    #[test]
    fn conversation_restart_rebases() {
        let exp = ConversationExpiration::from_parts(10, 1000, 11000).unwrap();
        assert_eq!(exp.start(2000).expires_at(), 12_000);
    }

    #[test]
    fn per_message_armed_has_not_started() {
        let exp = PerMessageExpiration::from_parts(30, 0, false).unwrap();
        assert!(exp.is_enabled());
        assert!(!exp.has_started());
        assert!(!exp.has_expired());
        assert_eq!(exp.expires_at(), 0);
    }

    #[test]
    fn per_message_first_start_wins() {
        let exp = PerMessageExpiration::from_parts(30, 0, false).unwrap();
        let started = exp.start(1000);
        assert_eq!(started.started_at(), 1000);
        // A second start attempt keeps the original base.
        assert_eq!(started.start(9999).started_at(), 1000);
        assert_eq!(started.expires_at(), 31_000);
    }

    #[test]
    fn per_message_expire_is_terminal_and_idempotent() {
        let exp = PerMessageExpiration::from_parts(30, 0, false).unwrap().start(1000);
        let expired = exp.expire();
        assert!(expired.has_expired());
        assert_eq!(expired.expire(), expired);
        assert_eq!(expired.start(5000), expired);
        // Start time survives into the terminal state.
        assert_eq!(expired.started_at(), 1000);
    }

    #[test]
    fn per_message_rejects_expired_without_start() {
        assert!(PerMessageExpiration::from_parts(30, 0, true).is_err());
        assert!(PerMessageExpiration::from_parts(0, 1000, false).is_err());
        assert!(PerMessageExpiration::from_parts(0, 0, true).is_err());
    }

    #[test]
    fn timers_are_independent() {
        let convo = ConversationExpiration::from_parts(60, 0, 0).unwrap().start(500);
        let per_msg = PerMessageExpiration::from_parts(30, 0, false).unwrap();
        assert!(convo.has_started());
        assert!(!per_msg.has_started());
    }
}
