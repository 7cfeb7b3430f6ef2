//! Staging Module
//!
//! Holds the receipt a session has captured but not yet submitted.
//!
//! Each session owns at most one staged receipt together with its temporary
//! file. Replacing, releasing, discarding and expiring an entry all delete
//! that file; only `clear` leaves it on disk.

pub mod store;
pub mod types;

pub use store::StagingStore;
pub use types::*;
