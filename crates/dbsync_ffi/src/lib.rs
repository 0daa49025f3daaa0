//! # dbsync FFI
//!
//! Stable C ABI for the dbsync snapshot synchronization engine.
//!
//! This crate provides:
//! - C-compatible function exports
//! - Memory ownership conventions
//! - Error code mapping
//!
//! ## Ownership
//!
//! Handles are plain integers and never addresses; an invalid handle is
//! reported as `InvalidHandle`. A diff result returned through the
//! `out_result` parameter of `dbsync_update_with_snapshot` belongs to the
//! caller and must be released exactly once with `dbsync_free_result`, which
//! nulls the caller's pointer.

#![warn(missing_docs)]

mod database;
mod error;
mod types;

pub use database::*;
pub use error::*;
pub use types::*;
