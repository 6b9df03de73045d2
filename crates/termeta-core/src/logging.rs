//! Structured logging field name constants.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue: truncated parent walk, failed backing store call |
//! | INFO  | Lifecycle events (pool creation, migrations) |
//! | DEBUG | Decision points (shadow record created or pruned, pattern built) |
//! | TRACE | Per-step iteration (each parent visited) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "store", "relations", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "term_meta", "pool", "records", "parent_walk"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "add", "update", "delete", "expand_parents"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Taxonomy term identifier being operated on.
pub const TERM_ID: &str = "term_id";

/// Shadow record identifier.
pub const RECORD_ID: &str = "record_id";

/// Metadata key.
pub const META_KEY: &str = "meta_key";

/// Taxonomy name.
pub const TAXONOMY: &str = "taxonomy";

/// Parent term identifier referenced by a parent link.
pub const PARENT_ID: &str = "parent_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of values or entries returned.
pub const RESULT_COUNT: &str = "result_count";

/// Depth reached by a parent walk.
pub const DEPTH: &str = "depth";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Reason a parent walk stopped early.
pub const STOP_REASON: &str = "stop_reason";
