//! # termeta
//!
//! Key/value metadata for taxonomy terms, and the term extraction support
//! built on it.
//!
//! - [`TermMetaStore`]: term-scoped metadata over a shadow record store
//! - [`save_term_fields`]: persists the relationship fields of a term form
//! - [`TermRelationshipEngine`]: synonym match patterns and cross-taxonomy
//!   parent expansion
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use termeta::{MatchTable, MemoryRecordStore, MemoryTaxonomyRegistry, Term};
//! use termeta::{TermMetaStore, TermRelationshipEngine};
//!
//! # async fn example() -> termeta::Result<()> {
//! let store = Arc::new(TermMetaStore::new(Arc::new(MemoryRecordStore::new())));
//! let engine = TermRelationshipEngine::new(store.clone(), Arc::new(MemoryTaxonomyRegistry::new()));
//!
//! store.update(7, "synonym-list", "Kitten, Feline", None).await?;
//! let pattern = engine.build_match_pattern("Cat", 7).await?;
//! assert_eq!(pattern, "(?:Kitten|Feline|Cat)");
//!
//! let matches = engine
//!     .expand_parent_matches(MatchTable::new(), &Term::new(7, "Cat", "animals"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod fields;
pub mod locks;
pub mod relations;
pub mod store;

pub use termeta_core::*;

pub use fields::{save_term_fields, SavedFields, TermFieldsSubmission};
pub use locks::TermLocks;
pub use relations::{match_pattern, ExpansionStop, ParentExpansion, TermRelationshipEngine};
pub use store::TermMetaStore;
