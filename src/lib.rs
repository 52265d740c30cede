// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod classify;
pub mod config;
pub mod digest;
pub mod ingest;
pub mod metrics;
pub mod normalize;

// ---- Re-exports for stable public API ----
pub use crate::classify::{Category, Classifier, Verdict};
pub use crate::digest::{Digest, DigestItem, Kind, NormalizedItem};
pub use crate::ingest::types::{FeedSnapshot, FeedSource, RawEntry};
pub use crate::ingest::{Pipeline, RunStats};
