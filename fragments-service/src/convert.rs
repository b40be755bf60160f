//! Conversion of fragment data between media types.
//!
//! Conversions are looked up in a fixed table keyed by `(source, target)` base types. A pair
//! without an entry cannot be converted, even if the capability matrix in
//! [`fragments_types::media`] declares the target reachable. Converting a type into itself is
//! handled before the table lookup and returns the input unchanged.
//!
//! The engine is pure: it performs no I/O and the same input always yields the same output.

use std::borrow::Cow;
use std::sync::LazyLock;

use bytes::Bytes;
use fragments_types::media::{TEXT_HTML, TEXT_MARKDOWN, TEXT_PLAIN};
use regex::bytes::Regex;

use crate::error::{Error, Result};

type ConvertFn = fn(Bytes) -> Bytes;

/// Implemented conversions as `(source, target, function)`.
const RULES: &[(&str, &str, ConvertFn)] = &[
    (TEXT_MARKDOWN, TEXT_HTML, markdown_to_html),
    (TEXT_MARKDOWN, TEXT_PLAIN, markdown_to_plain),
    (TEXT_HTML, TEXT_PLAIN, html_to_plain),
];

/// Matches anything that looks like a tag. Runs on raw bytes.
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)<[^>]*>").expect("tag pattern is valid"));

/// Converts `data` from the `source` base type into the `target` base type.
///
/// Returns [`Error::ConversionUnsupported`] if there is no rule for the pair.
pub fn convert(data: Bytes, source: &str, target: &str) -> Result<Bytes> {
    if source == target {
        return Ok(data);
    }

    let convert_fn = find_rule(source, target).ok_or_else(|| Error::ConversionUnsupported {
        from: source.to_owned(),
        to: target.to_owned(),
    })?;

    Ok(convert_fn(data))
}

fn find_rule(source: &str, target: &str) -> Option<ConvertFn> {
    RULES
        .iter()
        .find(|(from, to, _)| *from == source && *to == target)
        .map(|(_, _, convert_fn)| *convert_fn)
}

fn markdown_to_html(data: Bytes) -> Bytes {
    let text = String::from_utf8_lossy(&data);
    let mut html = String::with_capacity(text.len() + text.len() / 2);
    pulldown_cmark::html::push_html(&mut html, pulldown_cmark::Parser::new(&text));
    Bytes::from(html)
}

/// Markdown source is acceptable plain text as-is.
fn markdown_to_plain(data: Bytes) -> Bytes {
    data
}

/// Strips everything between `<` and `>`. This is not an HTML parser: entities are left alone.
fn html_to_plain(data: Bytes) -> Bytes {
    let stripped = match TAG_PATTERN.replace_all(&data, &b""[..]) {
        Cow::Borrowed(_) => None,
        Cow::Owned(stripped) => Some(stripped),
    };
    stripped.map_or(data, Bytes::from)
}

#[cfg(test)]
mod tests {
    use fragments_types::media::{
        APPLICATION_JSON, SUPPORTED_TYPES, TEXT_CSV, capability_matrix,
    };

    use super::*;

    fn is_implemented(source: &str, target: &str) -> bool {
        source == target || find_rule(source, target).is_some()
    }

    /// Pairs declared in the capability matrix that have no conversion rule yet.
    ///
    /// Adding a rule for one of these must also remove it from this list.
    const KNOWN_GAPS: &[(&str, &str)] = &[
        (TEXT_CSV, TEXT_PLAIN),
        (TEXT_CSV, APPLICATION_JSON),
        (APPLICATION_JSON, TEXT_PLAIN),
    ];

    fn convert_str(data: &'static str, source: &str, target: &str) -> Result<String> {
        let output = convert(Bytes::from_static(data.as_bytes()), source, target)?;
        Ok(String::from_utf8(output.to_vec()).unwrap())
    }

    #[test]
    fn identity_returns_input() {
        for ty in SUPPORTED_TYPES {
            let data = Bytes::from_static(b"\x00\xffnot even utf-8 <b>");
            let output = convert(data.clone(), ty, ty).unwrap();
            assert_eq!(output, data);
            // No copy was made.
            assert_eq!(output.as_ptr(), data.as_ptr());
        }
    }

    #[test]
    fn markdown_to_html_renders() {
        let html = convert_str("# Heading\n\n**bold**", TEXT_MARKDOWN, TEXT_HTML).unwrap();
        assert!(html.contains("<h1>Heading</h1>"), "{html}");
        assert!(html.contains("<strong>bold</strong>"), "{html}");
    }

    #[test]
    fn markdown_to_plain_is_unchanged() {
        let text = convert_str("# Heading\n\n**bold**", TEXT_MARKDOWN, TEXT_PLAIN).unwrap();
        assert_eq!(text, "# Heading\n\n**bold**");
    }

    #[test]
    fn html_to_plain_strips_tags() {
        assert_eq!(convert_str("<h1>x</h1>", TEXT_HTML, TEXT_PLAIN).unwrap(), "x");
        assert_eq!(
            convert_str(
                "<p class=\"a\">one &amp; <a href='/x'>two</a></p>\n<br/>",
                TEXT_HTML,
                TEXT_PLAIN
            )
            .unwrap(),
            "one &amp; two\n"
        );
        assert_eq!(
            convert_str("no tags at all", TEXT_HTML, TEXT_PLAIN).unwrap(),
            "no tags at all"
        );
    }

    #[test]
    fn unsupported_pair_names_both_types() {
        let err = convert_str("plain", TEXT_PLAIN, TEXT_HTML).unwrap_err();
        let Error::ConversionUnsupported { from, to } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(from, TEXT_PLAIN);
        assert_eq!(to, TEXT_HTML);

        let message = err.to_string();
        assert!(message.contains(TEXT_PLAIN) && message.contains(TEXT_HTML));
    }

    /// Walks the capability matrix and flags every declared pair without a rule.
    #[test]
    fn capability_matrix_coverage() {
        for (source, target) in capability_matrix() {
            let is_gap = KNOWN_GAPS.contains(&(source, target));
            let result = convert(Bytes::from_static(b"a,b\n1,2\n"), source, target);

            if is_gap {
                assert!(
                    matches!(result, Err(Error::ConversionUnsupported { .. })),
                    "{source} -> {target} is implemented now, remove it from KNOWN_GAPS"
                );
            } else {
                assert!(
                    result.is_ok(),
                    "{source} -> {target} is declared reachable but has no conversion rule"
                );
            }
            assert_eq!(is_implemented(source, target), !is_gap);
        }
    }

    #[test]
    fn rules_are_declared_in_matrix() {
        for (source, target, _) in RULES {
            assert!(
                capability_matrix().any(|pair| pair == (*source, *target)),
                "rule {source} -> {target} is not reachable through the capability matrix"
            );
        }
    }
}
