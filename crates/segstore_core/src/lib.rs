//! # Segstore Core
//!
//! Maintenance engine for a segmented data store.
//!
//! This crate provides:
//! - Share inventory with free-space accounting
//! - Shuffling of data sets away from full or withdrawing shares
//! - Checksum-verified relocation with no silent data loss
//! - Archive-candidate grouping within a size window
//! - Orphan reconciliation between archive directory and metadata
//!
//! External systems (metadata database, notification transport, archive
//! transport) stay behind the [`provider::MetadataProvider`],
//! [`notify::Notifier`] and [`relocate::DataSetMover`] traits.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod checkpoint;
pub mod checksum;
pub mod config;
pub mod dataset;
pub mod error;
pub mod finder;
pub mod grouping;
pub mod lock;
pub mod notify;
pub mod orphan;
pub mod probe;
pub mod provider;
pub mod relocate;
pub mod share;
pub mod shuffle;

pub use config::StoreConfig;
pub use dataset::DataSet;
pub use error::{CoreError, CoreResult};
