//! # termeta-core
//!
//! Core types, traits, and abstractions for taxonomy term metadata.
//!
//! This crate provides the data structures and trait definitions that the
//! storage backends (`termeta-db`) and the metadata store / relationship
//! engine (`termeta`) depend on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod memory;
pub mod models;
pub mod relations;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{ConfigError, DatabaseConfig, RecordsConfig, RelationsConfig, TermMetaConfig};
pub use error::{Error, Result};
pub use memory::{MemoryRecordStore, MemoryTaxonomyRegistry};
pub use models::*;
pub use relations::*;
pub use traits::*;
