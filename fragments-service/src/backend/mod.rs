//! Storage backends for fragment metadata and data.
//!
//! A [`Backend`] is the low-level persistence contract. It is wrapped by
//! [`FragmentStore`](crate::FragmentStore), which is what the rest of the crate talks to.

mod common;
mod in_memory;
mod local_fs;

pub use common::{Backend, BackendError, BackendResult, BoxedBackend};
pub use in_memory::InMemoryBackend;
pub use local_fs::LocalFs;
