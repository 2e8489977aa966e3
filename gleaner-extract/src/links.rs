//! Anchor `href` scanner.

use regex::Regex;
use std::sync::LazyLock;

static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s+[^>]*href=["']([^"']+)["']"#).expect("ANCHOR_HREF regex should compile")
});

/// Collect the raw `href` value of every anchor tag, in document order.
///
/// Values are returned exactly as written: no entity decoding, no resolution
/// against a base URL and no de-duplication.
///
/// ```
/// use gleaner_extract::extract_links;
///
/// let links = extract_links(r#"<a href="/x">A</a><a href='/y'>B</a>"#);
/// assert_eq!(links, vec!["/x", "/y"]);
/// ```
pub fn extract_links(markup: &str) -> Vec<String> {
    ANCHOR_HREF
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_leading_attributes_and_case() {
        let html = r#"<A CLASS="nav" HREF="https://example.com/a">a</A>
            <a
              id=x href='relative/b?c=d&amp;e'>b</a>"#;
        assert_eq!(
            extract_links(html),
            vec!["https://example.com/a", "relative/b?c=d&amp;e"]
        );
    }

    #[test]
    fn keeps_duplicates_in_order() {
        let html = r#"<a href="/1"></a><a href="/2"></a><a href="/1"></a>"#;
        assert_eq!(extract_links(html), vec!["/1", "/2", "/1"]);
    }

    #[test]
    fn ignores_non_anchor_and_valueless_links() {
        let html = r#"<link href="/style.css"><abbr href="/no"></abbr><a name="top"></a><a href="">empty</a>"#;
        assert!(extract_links(html).is_empty());
    }

    #[test]
    fn tolerates_garbage() {
        assert!(extract_links("").is_empty());
        assert!(extract_links("<a href=").is_empty());
        assert!(extract_links("<<<>>> href=\"/x\"").is_empty());
    }
}
