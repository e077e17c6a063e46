//! Typed registry layer for the regis resource store.
//!
//! A [`Registry`] binds one resource kind to a [`KeyValueStore`] namespace
//! and offers the same five operations for every kind: selector listing,
//! get, create, update and delete, plus a resumable [`WatchStream`].
//!
//! Store failures are translated into [`RegistryError`] per operation, so
//! callers see "not found" or "already exists" instead of store codes.
//! Listing and watch setup return store failures untranslated.
//!
//! [`KeyValueStore`]: regis_store::KeyValueStore

pub mod cursor;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod key;
pub mod registry;
pub mod watch;

#[cfg(test)]
mod testing;

pub use cursor::{parse_watch_resource_version, WatchCursor};
pub use diagnostics::{Diagnostic, DiagnosticSink, DropReason, InMemorySink, TracingSink};
pub use error::{interpret, translate, Operation, RegistryError, RegistryResult};
pub use filter::filter_by_selector;
pub use key::{key_for, make_key};
pub use registry::Registry;
pub use watch::{WatchPredicate, WatchState, WatchStream};
