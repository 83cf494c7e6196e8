//! Shared types for the repack notification client.
//!
//! Holds the data model the REST backend and the push server speak, so the
//! client crate (and its tests) agree on a single wire shape.

pub mod error;
pub mod models;
pub mod protocol;

pub use error::*;
pub use models::*;
pub use protocol::*;
