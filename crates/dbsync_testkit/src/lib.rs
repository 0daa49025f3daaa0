//! # dbsync Testkit
//!
//! Test utilities for dbsync.
//!
//! This crate provides:
//! - Test fixtures owning a private handle registry
//! - Property-based test generators using proptest
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbsync_testkit::prelude::*;
//! use serde_json::json;
//!
//! #[test]
//! fn test_with_table() {
//!     with_temp_table(|table| {
//!         let result = table.update(&json!([{"path": "/a"}])).unwrap();
//!         assert_eq!(result.inserted(), 1);
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
