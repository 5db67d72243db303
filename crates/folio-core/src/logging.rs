//! Structured logging schema and field name constants for folio.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the request layer. Format: UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "db", "content", "core"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "documents", "tags", "metadata", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "move", "list", "upsert"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document UUID being operated on.
pub const DOCUMENT_ID: &str = "document_id";

/// Parent document UUID involved in a create/move.
pub const PARENT_ID: &str = "parent_id";

/// Tag name being attached or detached.
pub const TAG_NAME: &str = "tag_name";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a list query.
pub const RESULT_COUNT: &str = "result_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Initialize the global tracing subscriber for binaries and tests.
///
/// Honors `RUST_LOG`; defaults to `info` when unset. Safe to call more than
/// once (later calls are no-ops).
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }

    #[test]
    fn test_field_names_are_snake_case() {
        for field in [
            REQUEST_ID, SUBSYSTEM, COMPONENT, OPERATION, DOCUMENT_ID, PARENT_ID, TAG_NAME,
            DURATION_MS, RESULT_COUNT, POOL_SIZE, POOL_IDLE,
        ] {
            assert!(!field.is_empty());
            assert!(field.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
