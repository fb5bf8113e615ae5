//! evalua-store: entity store backends.
//!
//! Provides a JSON snapshot file store for the CLI and a fault-injecting
//! wrapper for exercising timeout and retry paths in tests. The in-memory
//! store itself lives in `evalua_core::memory`.

pub mod error;
pub mod faulty;
pub mod json;

pub use error::SnapshotError;
pub use faulty::FaultyStore;
pub use json::{read_snapshot, JsonFileStore};
