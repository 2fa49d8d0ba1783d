//! Status ids mapping to SMALLSERIAL lookup tables.
//!
//! Each variant's id matches the seed order (1-based) of the corresponding
//! lookup table in `db/migrations`.

use troth_core::matching::{LockEnd, RequestStatus, UserStatus};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// A domain enum stored as a lookup-table id.
pub trait StatusCode: Sized {
    /// Lookup table name, used in decode errors.
    const TABLE: &'static str;

    fn id(self) -> StatusId;

    fn from_id(id: StatusId) -> Option<Self>;

    /// Decode a column value, failing the row if the id is unknown.
    fn decode(id: StatusId) -> Result<Self, sqlx::Error> {
        Self::from_id(id)
            .ok_or_else(|| sqlx::Error::Decode(format!("Unknown {} id {id}", Self::TABLE).into()))
    }
}

macro_rules! define_status_ids {
    (
        $(#[$meta:meta])*
        $name:ident in $table:literal {
            $( $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        impl StatusCode for $name {
            const TABLE: &'static str = $table;

            fn id(self) -> StatusId {
                match self {
                    $( $name::$variant => $val ),+
                }
            }

            fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

define_status_ids! {
    /// `user_statuses`
    UserStatus in "user_statuses" {
        Available = 1,
        Locked = 2,
        PendingMarriageConfirmation = 3,
        Married = 4,
    }
}

define_status_ids! {
    /// `request_statuses`
    RequestStatus in "request_statuses" {
        Asked = 1,
        Accepted = 2,
        Declined = 3,
        Withdrawn = 4,
    }
}

define_status_ids! {
    /// `lock_end_reasons`
    LockEnd in "lock_end_reasons" {
        Withdrawn = 1,
        Rejected = 2,
        Married = 3,
    }
}
