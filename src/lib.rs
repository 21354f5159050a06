//! topn-strings: approximate top-N counting of string keys in bounded memory.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: report the most frequent keys of a stream whose distinct keys do
//!   not fit in memory, assuming a skewed (Zipf-like) popularity curve.
//! - Layers:
//!   - ChainedHashMap<K, V, S>: fixed-modulus separate chaining. Nodes live
//!     in a slot arena and are linked by generational keys; new keys go to
//!     the chain tail.
//!   - ranking: snapshot + sort by count descending (key ascending on ties),
//!     then either cull the tail or emit the head.
//!   - TopNCounter<K, S>: the counting context. Accumulates counts and culls
//!     down to the low watermark whenever the high watermark is reached.
//!   - record / driver: line parsing and the stdin-to-stdout loop used by
//!     the `top-n-strings` binary.
//!
//! Constraints
//! - No internal locking; share a table across threads only behind a lock.
//! - The bucket count never changes after construction.
//! - `ChainedHashMap::add` does not deduplicate; uniqueness is the caller's
//!   job (`find` first, or `find_or_add_with`).
//! - Eviction is destructive. A key that is culled and reappears starts
//!   counting from zero, so results are approximate on flat distributions.
//!
//! Iteration
//! - `iter()` borrows the table, so mutating mid-pass does not compile.
//! - `Cursor` is a detached position checked against a modification stamp;
//!   stepping it after the table changed yields `MapError::StaleCursor`.
//!
//! Hashing
//! - Buckets are chosen by `hash % modulus` over a 32-bit `KeyHasher`.
//!   The default is SuperFastHash; `StdBuildHasher` adapts any
//!   `BuildHasher`. Each node caches its hash, so removal by handle never
//!   rehashes.

pub mod chained_map;
mod chained_map_proptest;
pub mod counter;
pub mod driver;
pub mod error;
pub mod hash;
pub mod ranking;
pub mod record;

// Public surface
pub use chained_map::{ChainedHashMap, Cursor, Handle, TableStats};
pub use counter::{CounterStats, TopNCounter, Watermarks};
pub use error::{ConfigError, Error, MapError, RecordError};
pub use hash::{KeyHasher, StdBuildHasher, SuperFastHash};
