//! # Lapse
//!
//! A bounded in-memory key-value map whose entries expire after a
//! per-entry TTL (time-to-live).
//!
//! ## Features
//!
//! - Fixed capacity with silent oldest-written eviction when full
//! - Lazy expiration on read plus bounded sweeps on every write
//! - Atomic increment with TTL refresh for ephemeral counters
//! - Optional callback fired once per TTL-expired entry
//! - Injectable clock for deterministic tests
//!
//! ## Example
//!
//! ```rust
//! use lapse::TtlMap;
//!
//! // Track request counts per client over 60-second windows,
//! // holding at most 10k clients at a time.
//! let mut windows = TtlMap::new(10_000);
//!
//! let hits = windows.increment("client:7", 1, 60).unwrap();
//! if hits > 100 {
//!     println!("client:7 is over its window limit");
//! }
//!
//! // Periodically reclaim entries nobody read again.
//! windows.remove_expired(1_000);
//! ```

mod clock;
mod config;
mod entry;
mod error;
mod map;
mod value;

pub use clock::{Clock, MockClock, SystemClock};
pub use config::MapConfig;
pub use error::MapError;
pub use map::TtlMap;
pub use value::Value;

// Re-export tuning constants for callers that size their own sweeps
pub use config::DEFAULT_SWEEP_LIMIT;
pub use map::MAX_TTL_SECONDS;
