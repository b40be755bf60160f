//! Error types of the fragment service.

use fragments_types::media::InvalidMediaTypeError;
use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur when working with fragments.
#[derive(Debug, Error)]
pub enum Error {
    /// The input to an operation is malformed, e.g. a missing owner or media type.
    #[error("invalid fragment: {0}")]
    Validation(String),

    /// The declared media type is well-formed but not supported.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// No fragment exists for the owner and id.
    ///
    /// This is also the result of looking up a fragment that belongs to another owner.
    #[error("fragment not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The data cannot be converted between the two media types.
    #[error("conversion from {from} to {to} is not supported")]
    ConversionUnsupported {
        /// The media type of the fragment.
        from: String,
        /// The requested media type.
        to: String,
    },

    /// The storage backend failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<InvalidMediaTypeError> for Error {
    fn from(err: InvalidMediaTypeError) -> Self {
        Error::Validation(err.to_string())
    }
}

/// Result type for fragment operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
