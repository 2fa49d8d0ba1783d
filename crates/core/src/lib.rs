//! Troth core domain crate.
//!
//! Holds the request/lock/marriage state machine and the seams it talks
//! through (store, subscription check, notifier). This crate has zero
//! internal deps so the DB adapter, the event bus, and the HTTP layer can all
//! build on the same types.

pub mod error;
pub mod matching;
pub mod types;
