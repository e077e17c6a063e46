//! Foundation types for the regis resource registry.
//!
//! This crate provides the resource model shared by the store and registry
//! layers. Every other regis crate depends on `regis-types`.
//!
//! # Key Types
//!
//! - [`Resource`] -- Compile-time kind descriptor implemented by every resource kind
//! - [`ObjectMeta`] -- Id, labels and resource version carried by every resource
//! - [`WatchEvent`] -- Added / Modified / Deleted change notification
//! - [`LabelSelector`] -- Predicate capability over a label mapping
//! - [`Selector`] -- Expression-based label selector
//! - [`RawObject`] -- Decoded payload whose kind has not been checked yet

pub mod codec;
pub mod error;
pub mod event;
pub mod labels;
pub mod meta;
pub mod resource;

pub use codec::{decode, encode, RawObject};
pub use error::CodecError;
pub use event::{EventType, WatchEvent};
pub use labels::{Everything, Expression, LabelSelector, Selector};
pub use meta::{Labels, ObjectMeta};
pub use resource::Resource;
