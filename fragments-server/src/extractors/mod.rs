//! Request extractors shared by endpoint handlers.

mod owner;

pub use owner::{HEADER_OWNER_ID, Owner};
