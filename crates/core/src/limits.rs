//! Size and count limits
//!
//! These bound what a single request may carry. Schema construction enforces
//! the shape limit, the facade enforces the watch and atomic-op limits, and
//! stores enforce the value size.

/// Maximum number of components in a key shape.
pub const MAX_KEY_PARTS: usize = 16;

/// Maximum encoded value size in bytes.
pub const MAX_VALUE_BYTES: usize = 64 * 1024;

/// Maximum number of keys in one watch subscription.
pub const MAX_WATCHED_KEYS: usize = 10;

/// Maximum number of checks plus mutations in one atomic operation.
pub const MAX_ATOMIC_OPS: usize = 100;

/// Default redelivery backoff schedule for queue messages, in milliseconds.
pub const DEFAULT_BACKOFF_SCHEDULE_MS: [u64; 5] = [100, 200, 400, 800, 1600];
