//! Durable per-day execution counter store.
//!
//! Holds one `DayStat` per UTC day and applies increments as atomic
//! read-modify-write units:
//! - `LogCounterStore`: per-day async locks in front of an append-only JSON
//!   Lines log that is replayed on open and periodically compacted
//! - `MemoryCounterStore`: same contract without durability, for tests and
//!   ephemeral deployments

pub mod config;
pub mod error;
pub mod log_store;
pub mod memory_store;
pub mod store;

pub use config::StoreConfig;
pub use error::{PersistenceError, PersistenceResult};
pub use log_store::LogCounterStore;
pub use memory_store::MemoryCounterStore;
pub use store::CounterStore;
