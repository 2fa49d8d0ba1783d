//! Notices dispatched to counterparts after a successful transition.
//!
//! The core only produces notices. Delivery belongs to whatever implements
//! [`MatchNotifier`] (the event bus in production).

use serde::{Deserialize, Serialize};

use crate::types::DbId;

use super::model::{LockId, UserId};

/// Serialized as JSON with an internally-tagged `"type"` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatchNotice {
    #[serde(rename = "request.received")]
    RequestReceived {
        request_id: DbId,
        from_id: UserId,
        to_id: UserId,
    },

    #[serde(rename = "request.withdrawn")]
    RequestWithdrawn {
        request_id: DbId,
        from_id: UserId,
        to_id: UserId,
    },

    #[serde(rename = "request.accepted")]
    RequestAccepted {
        request_id: DbId,
        lock_id: LockId,
        from_id: UserId,
        to_id: UserId,
    },

    #[serde(rename = "request.declined")]
    RequestDeclined {
        request_id: DbId,
        from_id: UserId,
        to_id: UserId,
    },

    #[serde(rename = "lock.withdrawn")]
    LockWithdrawn {
        lock_id: LockId,
        withdrawn_by: UserId,
        counterpart_id: UserId,
    },

    /// Phase 1 of the marriage handshake: the counterpart is asked to confirm.
    #[serde(rename = "lock.marriage_confirmation_requested")]
    MarriageConfirmationRequested {
        lock_id: LockId,
        notifier_id: UserId,
        counterpart_id: UserId,
    },

    #[serde(rename = "lock.marriage_confirmed")]
    MarriageConfirmed {
        lock_id: LockId,
        couple_id: DbId,
        confirmed_by: UserId,
        counterpart_id: UserId,
    },

    #[serde(rename = "lock.marriage_declined")]
    MarriageDeclined {
        lock_id: LockId,
        declined_by: UserId,
        counterpart_id: UserId,
    },

    /// Phase 1 of the reject handshake: the counterpart is asked to confirm.
    #[serde(rename = "lock.reject_confirmation_requested")]
    RejectConfirmationRequested {
        lock_id: LockId,
        rejector_id: UserId,
        counterpart_id: UserId,
    },

    #[serde(rename = "lock.reject_confirmed")]
    RejectConfirmed {
        lock_id: LockId,
        confirmed_by: UserId,
        counterpart_id: UserId,
    },

    #[serde(rename = "lock.reject_cancelled")]
    RejectCancelled {
        lock_id: LockId,
        cancelled_by: UserId,
        counterpart_id: UserId,
    },
}

impl MatchNotice {
    /// Dot-separated event name, identical to the serde tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RequestReceived { .. } => "request.received",
            Self::RequestWithdrawn { .. } => "request.withdrawn",
            Self::RequestAccepted { .. } => "request.accepted",
            Self::RequestDeclined { .. } => "request.declined",
            Self::LockWithdrawn { .. } => "lock.withdrawn",
            Self::MarriageConfirmationRequested { .. } => "lock.marriage_confirmation_requested",
            Self::MarriageConfirmed { .. } => "lock.marriage_confirmed",
            Self::MarriageDeclined { .. } => "lock.marriage_declined",
            Self::RejectConfirmationRequested { .. } => "lock.reject_confirmation_requested",
            Self::RejectConfirmed { .. } => "lock.reject_confirmed",
            Self::RejectCancelled { .. } => "lock.reject_cancelled",
        }
    }

    /// The user the notice is addressed to.
    pub fn recipient(&self) -> UserId {
        match self {
            Self::RequestReceived { to_id, .. } | Self::RequestWithdrawn { to_id, .. } => *to_id,
            Self::RequestAccepted { from_id, .. } | Self::RequestDeclined { from_id, .. } => {
                *from_id
            }
            Self::LockWithdrawn { counterpart_id, .. }
            | Self::MarriageConfirmationRequested { counterpart_id, .. }
            | Self::MarriageConfirmed { counterpart_id, .. }
            | Self::MarriageDeclined { counterpart_id, .. }
            | Self::RejectConfirmationRequested { counterpart_id, .. }
            | Self::RejectConfirmed { counterpart_id, .. }
            | Self::RejectCancelled { counterpart_id, .. } => *counterpart_id,
        }
    }
}

pub trait MatchNotifier: Send + Sync {
    fn notify(&self, notice: MatchNotice);
}

/// Drops every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl MatchNotifier for NoopNotifier {
    fn notify(&self, _notice: MatchNotice) {}
}
