#![forbid(unsafe_code)]

//! Minimal whitespace and namespace normalization for digest stability.
//!
//! This is NOT W3C Canonical XML. The signature block is built from fixed
//! templates, so the only normalization needed is (a) making the source
//! document's whitespace deterministic before it is digested and (b) adding
//! the `ds`/`etsi` namespace declarations to a fragment's root tag so the
//! digested bytes see the declarations a consumer would resolve. Attribute
//! reordering, entity expansion and the other C14N concerns are out of scope.

use firmador_core::{CanonicalizationError, Result};

/// Normalize the whitespace of a whole document.
///
/// Rules, applied in one pass over the text:
/// - a whitespace run containing a newline that touches a tag boundary
///   (a `>` immediately before it or a `<` immediately after it) is removed,
///   so pretty-printed markup collapses to `><`;
/// - every other whitespace run collapses to a single space;
/// - leading and trailing whitespace is trimmed.
///
/// The result is idempotent: normalizing already-normal text is a no-op.
/// Must run exactly once, before any digest is computed.
pub fn normalize_whitespace(xml: &str) -> String {
    let chars: Vec<char> = xml.chars().collect();
    let mut out = String::with_capacity(xml.len());

    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_whitespace() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let run_start = i;
        let mut has_newline = false;
        while i < chars.len() && chars[i].is_whitespace() {
            if chars[i] == '\n' || chars[i] == '\r' {
                has_newline = true;
            }
            i += 1;
        }

        let after_tag_close = run_start > 0 && chars[run_start - 1] == '>';
        let before_tag_open = i < chars.len() && chars[i] == '<';
        if !(has_newline && (after_tag_close || before_tag_open)) {
            out.push(' ');
        }
    }

    out.trim().to_owned()
}

/// Insert a namespace declaration after the first occurrence of `root_tag`.
///
/// Purely textual: `root_tag` must include the opening angle bracket and
/// prefix (e.g. `<etsi:SignedProperties`). Fails when the tag is absent,
/// which means the fragment and the template shape have diverged.
pub fn inject_namespace(fragment: &str, root_tag: &str, ns_decl: &str) -> Result<String> {
    if !fragment.contains(root_tag) {
        return Err(CanonicalizationError::TagNotFound(root_tag.to_owned()).into());
    }
    Ok(fragment.replacen(root_tag, &format!("{root_tag} {ns_decl}"), 1))
}

/// Drop a leading `<?xml ...?>` declaration, if present.
///
/// The document-body reference digests the text without the declaration.
/// Whatever whitespace followed the declaration is kept, so the digested
/// bytes match the document as normalized.
pub fn strip_xml_declaration(xml: &str) -> &str {
    if let Some(rest) = xml.strip_prefix("<?xml") {
        if let Some(end) = rest.find("?>") {
            return &rest[end + 2..];
        }
    }
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use firmador_core::Error;

    #[test]
    fn test_normalize_collapses_inner_runs() {
        assert_eq!(normalize_whitespace("<a>hello   world</a>"), "<a>hello world</a>");
        assert_eq!(normalize_whitespace("<a>hello\tworld</a>"), "<a>hello world</a>");
    }

    #[test]
    fn test_normalize_trims_ends() {
        assert_eq!(normalize_whitespace("  <a>x</a>\n"), "<a>x</a>");
    }

    #[test]
    fn test_normalize_drops_newlines_at_tag_boundaries() {
        assert_eq!(
            normalize_whitespace("<a>\n  <b>x y</b>\n</a>"),
            "<a><b>x y</b></a>"
        );
    }

    #[test]
    fn test_normalize_keeps_plain_space_between_tags() {
        // no newline in the run, so it stays as one space
        assert_eq!(normalize_whitespace("<a> <b>x</b></a>"), "<a> <b>x</b></a>");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let messy = "  <a>\r\n\t<b>hello   world</b>\n </a> ";
        let once = normalize_whitespace(messy);
        assert_eq!(normalize_whitespace(&once), once);
    }

    #[test]
    fn test_inject_namespace_first_occurrence_only() {
        let fragment = "<x:Node a=\"1\"><x:Node a=\"2\"/></x:Node>";
        let injected = inject_namespace(fragment, "<x:Node", "xmlns:x=\"urn:x\"").unwrap();
        assert_eq!(
            injected,
            "<x:Node xmlns:x=\"urn:x\" a=\"1\"><x:Node a=\"2\"/></x:Node>"
        );
    }

    #[test]
    fn test_inject_namespace_missing_tag() {
        let err = inject_namespace("", "<x:Node", "xmlns:x=\"urn:x\"").unwrap_err();
        match err {
            Error::Canonicalization(CanonicalizationError::TagNotFound(tag)) => {
                assert_eq!(tag, "<x:Node");
            }
            other => panic!("expected TagNotFound, got: {other}"),
        }
    }

    #[test]
    fn test_strip_xml_declaration() {
        assert_eq!(
            strip_xml_declaration("<?xml version=\"1.0\" encoding=\"UTF-8\"?> <a/>"),
            " <a/>"
        );
        assert_eq!(strip_xml_declaration("<a/>"), "<a/>");
    }
}
