//! The fixed table of character references understood by the extractor.
//!
//! Only seven references are recognised. `&#39;` and `&apos;` both map to an
//! apostrophe so that markup produced by either convention decodes the same.

use std::borrow::Cow;

/// Reference → replacement, in lookup order.
pub const ENTITIES: [(&str, &str); 7] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
];

/// Longest reference in [`ENTITIES`], `;` included.
const MAX_REFERENCE_LEN: usize = 6;

/// Replacement text for a complete reference such as `&lt;`.
///
/// ```
/// use gleaner_extract::entities::lookup;
///
/// assert_eq!(lookup("&quot;"), Some("\""));
/// assert_eq!(lookup("&copy;"), None);
/// ```
pub fn lookup(reference: &str) -> Option<&'static str> {
    ENTITIES
        .iter()
        .find(|(name, _)| *name == reference)
        .map(|(_, replacement)| *replacement)
}

/// Decode every reference from [`ENTITIES`] in one left-to-right pass.
///
/// Each reference is decoded exactly once: the output of one replacement is
/// never rescanned, so `&amp;lt;` becomes `&lt;` and not `<`. Unknown or
/// unterminated references are copied through untouched.
///
/// ```
/// use gleaner_extract::entities::decode_entities;
///
/// assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
/// assert_eq!(decode_entities("&amp;lt;b&amp;gt;"), "&lt;b&gt;");
/// assert_eq!(decode_entities("&copy; 2024"), "&copy; 2024");
/// ```
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .bytes()
            .take(MAX_REFERENCE_LEN)
            .position(|b| b == b';')
            .and_then(|semi| lookup(&candidate[..=semi]).map(|ch| (semi, ch)));
        match decoded {
            Some((semi, replacement)) => {
                out.push_str(replacement);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
