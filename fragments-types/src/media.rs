//! Registry of supported media types.
//!
//! Fragments carry a declared media type such as `text/markdown; charset=utf-8`. Only the *base
//! type*, which is the media type with all parameters stripped, is relevant for deciding whether a
//! type is supported and into which representations a fragment can be converted.
//!
//! All tables in this module are constants. They are part of the external contract: clients that
//! fetch a fragment through a file extension rely on exactly these mappings.

use std::fmt;
use std::str::FromStr;

use mime::Mime;

/// Plain text.
pub const TEXT_PLAIN: &str = "text/plain";
/// Markdown source.
pub const TEXT_MARKDOWN: &str = "text/markdown";
/// HTML markup.
pub const TEXT_HTML: &str = "text/html";
/// Comma-separated values.
pub const TEXT_CSV: &str = "text/csv";
/// JSON documents.
pub const APPLICATION_JSON: &str = "application/json";

/// All base types a fragment may be declared with.
pub const SUPPORTED_TYPES: &[&str] = &[
    TEXT_PLAIN,
    TEXT_MARKDOWN,
    TEXT_HTML,
    TEXT_CSV,
    APPLICATION_JSON,
];

/// Mapping from file extensions (including the leading dot) to base types.
const EXTENSIONS: &[(&str, &str)] = &[
    (".txt", TEXT_PLAIN),
    (".md", TEXT_MARKDOWN),
    (".html", TEXT_HTML),
    (".json", APPLICATION_JSON),
    (".csv", TEXT_CSV),
];

/// The capability matrix: base types and the representations they may be converted into.
///
/// Every source lists itself as a target.
const CONVERSIONS: &[(&str, &[&str])] = &[
    (TEXT_PLAIN, &[TEXT_PLAIN]),
    (TEXT_MARKDOWN, &[TEXT_MARKDOWN, TEXT_HTML, TEXT_PLAIN]),
    (TEXT_HTML, &[TEXT_HTML, TEXT_PLAIN]),
    (TEXT_CSV, &[TEXT_CSV, TEXT_PLAIN, APPLICATION_JSON]),
    (APPLICATION_JSON, &[APPLICATION_JSON, TEXT_PLAIN]),
];

/// A parsed media type, retaining the original string.
///
/// # Examples
///
/// ```
/// use fragments_types::media::MediaType;
///
/// let media_type = MediaType::parse("text/html; charset=utf-8").unwrap();
/// assert_eq!(media_type.base_type(), "text/html");
/// assert_eq!(media_type.charset(), Some("utf-8"));
/// assert!(media_type.is_supported());
/// ```
#[derive(Clone, Debug)]
pub struct MediaType {
    raw: String,
    mime: Mime,
}

impl MediaType {
    /// Parses a media type string such as a `Content-Type` header value.
    pub fn parse(raw: &str) -> Result<Self, InvalidMediaTypeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidMediaTypeError::Empty);
        }

        let mime = Mime::from_str(trimmed).map_err(|cause| InvalidMediaTypeError::Malformed {
            raw: raw.to_owned(),
            cause,
        })?;

        Ok(Self {
            raw: trimmed.to_owned(),
            mime,
        })
    }

    /// Returns the media type as it was declared, including parameters.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the base type, i.e. `type/subtype` without parameters.
    pub fn base_type(&self) -> &str {
        self.mime.essence_str()
    }

    /// Returns the value of the `charset` parameter, if declared.
    pub fn charset(&self) -> Option<&str> {
        self.mime.get_param(mime::CHARSET).map(|value| value.as_str())
    }

    /// Returns `true` if the top-level type is `text`.
    pub fn is_text(&self) -> bool {
        self.mime.type_() == mime::TEXT
    }

    /// Returns `true` if the base type is one of the [`SUPPORTED_TYPES`].
    pub fn is_supported(&self) -> bool {
        SUPPORTED_TYPES.contains(&self.base_type())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// An error returned by [`MediaType::parse`].
#[derive(Debug, thiserror::Error)]
pub enum InvalidMediaTypeError {
    /// The media type string is empty.
    #[error("media type must be non-empty")]
    Empty,
    /// The media type string is not a valid `type/subtype[; params]` expression.
    #[error("malformed media type {raw:?}")]
    Malformed {
        /// The rejected input.
        raw: String,
        /// The underlying parse error.
        #[source]
        cause: mime::FromStrError,
    },
}

/// Returns `true` if the base type of `raw` is supported.
///
/// Malformed input is reported as unsupported rather than as an error.
pub fn is_supported_type(raw: &str) -> bool {
    MediaType::parse(raw).is_ok_and(|media_type| media_type.is_supported())
}

/// Returns `true` if `ext` is one of the known file extensions, e.g. `".md"`.
pub fn is_valid_extension(ext: &str) -> bool {
    mime_type_for_extension(ext).is_some()
}

/// Returns the base type associated with a file extension, or `None` for unknown extensions.
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime_type)| *mime_type)
}

/// Returns the base types a fragment of `base_type` may be converted into.
///
/// The result always contains `base_type` itself. Types without an entry in the capability matrix
/// convert only to themselves.
pub fn conversions_for(base_type: &str) -> Vec<&str> {
    match CONVERSIONS.iter().find(|(source, _)| *source == base_type) {
        Some((_, targets)) => targets.to_vec(),
        None => vec![base_type],
    }
}

/// Returns an iterator over every `(source, target)` pair of the capability matrix.
pub fn capability_matrix() -> impl Iterator<Item = (&'static str, &'static str)> {
    CONVERSIONS
        .iter()
        .flat_map(|(source, targets)| targets.iter().map(move |target| (*source, *target)))
}
