//! Shared types for the fragments service.
//!
//! This crate contains the parts of the fragment model that perform no I/O:
//!
//!  - [`media`] is the registry of supported media types, file extensions and the conversion
//!    capability matrix.
//!  - [`record`] defines the persisted metadata record of a fragment.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod media;
pub mod record;
