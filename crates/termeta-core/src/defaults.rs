//! Centralized default constants.
//!
//! Crates reference these constants instead of defining their own magic
//! values. Configuration overrides them where a field exists.

// =============================================================================
// SHADOW RECORDS
// =============================================================================

/// Prefix of the deterministic shadow record name (`<prefix><term_id>`).
pub const RECORD_PREFIX: &str = "ec-term-meta-";

// =============================================================================
// RELATIONS
// =============================================================================

/// Maximum number of parent links followed from a single term.
pub const MAX_PARENT_DEPTH: usize = 32;

/// Whether empty synonym entries (`"a,,b"`, trailing commas) survive parsing.
pub const KEEP_EMPTY_SYNONYMS: bool = false;

// =============================================================================
// DATABASE
// =============================================================================

/// Default maximum number of connections in the pool.
pub const MAX_CONNECTIONS: u32 = 10;

/// Default connection timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout in seconds.
pub const IDLE_TIMEOUT_SECS: u64 = 600;

/// Default maximum connection lifetime in seconds.
pub const MAX_LIFETIME_SECS: u64 = 1800;

// =============================================================================
// STORE
// =============================================================================

/// Number of idle per-term lock entries tolerated before the lock table is pruned.
pub const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1024;
