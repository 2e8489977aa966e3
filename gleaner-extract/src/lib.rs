//! Plain-text and link extraction from raw markup.
//!
//! - [`extract_text`]: strip tags, drop script/style blocks, decode the
//!   references in [`entities::ENTITIES`], collapse whitespace
//! - [`extract_links`]: raw anchor `href` values in document order
//! - [`Page`]: both results for one document
//!
//! This is not an HTML parser. There is no DOM, no encoding detection and no
//! URL resolution, and the output is not safe to render as markup. Every
//! function here is total: malformed input degrades to best-effort output.

pub mod entities;
pub mod links;
pub mod strip;

use serde::Serialize;
use serde_json::Value;

pub use links::extract_links;
pub use strip::extract_text;

/// [`extract_text`] for callers that hold loosely typed JSON.
///
/// Anything other than a JSON string yields the empty string.
///
/// ```
/// use gleaner_extract::extract_text_value;
/// use serde_json::json;
///
/// assert_eq!(extract_text_value(&json!("<b>hi</b>")), "hi");
/// assert_eq!(extract_text_value(&json!(42)), "");
/// assert_eq!(extract_text_value(&json!(null)), "");
/// ```
pub fn extract_text_value(markup: &Value) -> String {
    match markup {
        Value::String(s) => extract_text(s),
        _ => String::new(),
    }
}

/// Text summary and outbound links of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Page {
    pub text: String,
    pub links: Vec<String>,
}

impl Page {
    /// Run both extractors over the same markup.
    ///
    /// ```
    /// use gleaner_extract::Page;
    ///
    /// let page = Page::from_markup(r#"<p>See <a href="/docs">the docs</a>.</p>"#);
    /// assert_eq!(page.text, "See the docs .");
    /// assert_eq!(page.links, vec!["/docs"]);
    /// ```
    pub fn from_markup(markup: &str) -> Self {
        let page = Self {
            text: extract_text(markup),
            links: extract_links(markup),
        };
        tracing::debug!(
            markup_len = markup.len(),
            text_len = page.text.len(),
            links = page.links.len(),
            "extract.page"
        );
        page
    }
}
