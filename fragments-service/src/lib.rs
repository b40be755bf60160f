//! The service layer of the fragments system.
//!
//! Fragments are owner-scoped, typed byte blobs. This crate provides the building blocks that the
//! HTTP server exposes:
//!
//!  - [`FragmentStore`] persists fragment metadata and data in two namespaces keyed by
//!    `(owner_id, id)`, on top of a pluggable [`Backend`](backend::Backend).
//!  - [`convert`] transforms fragment data from one media type into another.
//!  - [`Fragment`] is the aggregate tying both together. It enforces the invariants of a fragment
//!    and exposes its lifecycle: creation, saving metadata, setting data, conversion and deletion.
//!
//! There is no global state. Every operation that touches storage receives a [`FragmentStore`]
//! handle, which is cheap to clone and can be shared across tasks.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod backend;
pub mod convert;
pub mod error;
mod fragment;
mod store;

pub use error::{Error, Result};
pub use fragment::{Fragment, FragmentInit, FragmentList};
pub use fragments_types::record::FragmentRecord;
pub use store::{FragmentStore, Listing, StorageConfig};
