//! Repository layer.
//!
//! Each repository is a zero-sized struct. Reads accept `&PgPool`; writes
//! accept `&mut PgConnection` so the store can run them inside one
//! transaction.

pub mod connection_request_repo;
pub mod couple_repo;
pub mod lock_repo;
pub mod user_account_repo;

pub use connection_request_repo::ConnectionRequestRepo;
pub use couple_repo::CoupleRepo;
pub use lock_repo::LockRepo;
pub use user_account_repo::UserAccountRepo;
