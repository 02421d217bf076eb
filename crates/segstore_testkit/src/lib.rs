//! # Segstore Testkit
//!
//! Test utilities for segstore.
//!
//! This crate provides:
//! - Store fixtures on temporary directories
//! - In-memory metadata providers and recording collaborators
//! - Property-based generators using proptest
//! - Deterministic random data-set builders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use segstore_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     let store = TestStore::new().with_share("1").with_share("2");
//!     let provider = MemoryProvider::default();
//!     // ... drive the engine against store.root()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
