//! Foundation types for Depot.
//!
//! This crate provides the identity, temporal, and naming types shared by
//! every other Depot crate.
//!
//! # Key Types
//!
//! - [`Author`] -- Opaque identity attributed to a creation event
//! - [`CreationTime`] -- Wall-clock milliseconds since the UNIX epoch
//! - [`validate_entity_name`] -- Rules for names that map onto directories

pub mod author;
pub mod error;
pub mod names;
pub mod time;

pub use author::Author;
pub use error::TypeError;
pub use names::{validate_entity_name, MAX_NAME_LEN};
pub use time::CreationTime;
