//! Matchmaking workflow: connection requests, locks, and marriages.
//!
//! - [`request_manager::RequestManager`] -- create / withdraw / accept / decline.
//! - [`lock_manager::LockManager`] -- lock withdrawal and the two-phase
//!   confirm/reject handshake.
//! - [`transition`] -- pure planners that validate a snapshot and produce a
//!   [`store::Changeset`].
//! - [`store::MatchStore`] -- persistence seam; every commit is all-or-nothing
//!   and version-checked.

pub mod memory;
pub mod messages;
pub mod model;
pub mod notice;
pub mod outcome;
pub mod status;
pub mod store;
pub mod subscription;
pub mod transition;

mod context;
pub mod lock_manager;
pub mod request_manager;

#[cfg(test)]
mod test_support;

pub use context::MatchContext;
pub use lock_manager::{CounterpartView, LockManager, RelationshipView};
pub use memory::InMemoryMatchStore;
pub use messages::{template_for, MatchOperation, MessageTemplate};
pub use model::{ConnectionRequest, Couple, Lock, LockId, UserAccount, UserId};
pub use notice::{MatchNotice, MatchNotifier, NoopNotifier};
pub use outcome::{FailureReason, MatchOutcome};
pub use request_manager::{RequestActions, RequestManager};
pub use status::{LockEnd, RequestStatus, UserStatus};
pub use store::{Changeset, CommitReceipt, MatchStore, StoreError};
pub use subscription::{AllowAllSubscriptions, SubscriptionCheck, SubscriptionExpiry};
