//! Console rendering for the CLI.

use gleaner_common::ELLIPSIS;
use gleaner_extract::Page;

pub fn fetching_line(url: &str) -> String {
    format!("Fetching: {url}")
}

/// Text preview (first `preview_chars` characters, always followed by an
/// ellipsis) and the link count.
pub fn render(page: &Page, preview_chars: usize) -> String {
    let head: String = page.text.chars().take(preview_chars).collect();
    format!(
        "\nExtracted text:\n{head}{ELLIPSIS}\n\nFound {} links\n",
        page.links.len()
    )
}
