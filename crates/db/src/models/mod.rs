//! Row structs for the matching tables.
//!
//! Each submodule contains a `FromRow` struct matching the database row and a
//! `TryFrom` conversion into the `troth-core` domain type. Status columns are
//! SMALLINT ids into lookup tables; see [`status`].

pub mod connection_request;
pub mod couple;
pub mod lock;
pub mod status;
pub mod user_account;
