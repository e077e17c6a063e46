//! Backing store contract for the regis registry.
//!
//! The registry persists every resource in a single hierarchical, versioned
//! key-value store. This crate defines that contract and ships an in-memory
//! backend modelled on the etcd v2 semantics the registry was built against.
//!
//! # Storage Backends
//!
//! All backends implement the [`KeyValueStore`] trait:
//!
//! - [`InMemoryStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. One index advances on every mutation and becomes the record's version.
//! 2. Records are enumerated in key order.
//! 3. Watches are fed from the same critical section as the mutation, so a
//!    subscriber never sees changes out of version order.
//! 4. The store never interprets payloads and never retries.

pub mod config;
pub mod error;
pub mod memory;
pub mod record;
pub mod traits;
pub mod watch;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use record::{is_under, RawEvent, StoredRecord};
pub use traits::KeyValueStore;
pub use watch::{EndSignal, RawWatch, WatchEnd};
