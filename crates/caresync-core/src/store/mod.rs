//! Durable key-value storage behind the outbox.
//!
//! The queue only needs two primitives over a single logical key: a plain
//! read and an atomic read-modify-write. Anything that can provide those
//! (an embedded database, a locked file, a map in memory) can back it.

mod libsql_store;
mod memory;

pub use libsql_store::LibSqlStore;
pub use memory::MemoryStore;

use serde_json::Value;

use crate::error::Result;

/// Key-value storage with transactional updates (async)
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value under `key` with `apply(current)` in one transaction.
    ///
    /// Concurrent updates to the same store are serialized. When `apply`
    /// returns an error nothing is written and the error is returned.
    async fn update<F>(&self, key: &str, apply: F) -> Result<Value>
    where
        F: FnOnce(Option<Value>) -> Result<Value>;
}
