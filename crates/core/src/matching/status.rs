//! Closed status enums for users, requests, and lock endings.
//!
//! Each enum has a stable lowercase string form. That form is what the
//! `status` / `end_reason` TEXT columns store and what the API serializes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UserStatus
// ---------------------------------------------------------------------------

/// A user's relationship status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Available,
    Locked,
    /// The user has claimed the lock ended in marriage and is waiting for the
    /// counterpart to confirm.
    PendingMarriageConfirmation,
    Married,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Locked => "locked",
            Self::PendingMarriageConfirmation => "pending_marriage_confirmation",
            Self::Married => "married",
        }
    }

    /// Whether a user in this status must be bound to an active lock.
    pub fn holds_lock(self) -> bool {
        matches!(self, Self::Locked | Self::PendingMarriageConfirmation)
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "locked" => Ok(Self::Locked),
            "pending_marriage_confirmation" => Ok(Self::PendingMarriageConfirmation),
            "married" => Ok(Self::Married),
            other => Err(format!("Unknown user status '{other}'")),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Asked,
    Accepted,
    Declined,
    Withdrawn,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asked => "asked",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Withdrawn => "withdrawn",
        }
    }

    /// Terminal states are immutable.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Asked)
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asked" => Ok(Self::Asked),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "withdrawn" => Ok(Self::Withdrawn),
            other => Err(format!("Unknown request status '{other}'")),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LockEnd
// ---------------------------------------------------------------------------

/// How an inactive lock ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockEnd {
    /// One party walked away unilaterally.
    Withdrawn,
    /// Both parties agreed to dissolve the lock.
    Rejected,
    /// Both parties confirmed the marriage.
    Married,
}

impl LockEnd {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Withdrawn => "withdrawn",
            Self::Rejected => "rejected",
            Self::Married => "married",
        }
    }
}

impl FromStr for LockEnd {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "withdrawn" => Ok(Self::Withdrawn),
            "rejected" => Ok(Self::Rejected),
            "married" => Ok(Self::Married),
            other => Err(format!("Unknown lock end reason '{other}'")),
        }
    }
}

impl fmt::Display for LockEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
