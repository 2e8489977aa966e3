//! Markup → plain text.
//!
//! A single forward pass over the input drives a small state machine:
//!
//! ```text
//! Text ──'<'──▶ TagOpen ──'>'──▶ Text
//!                  │  ├─ <script…> ──▶ InScriptBody ──</script>──▶ Text
//!                  │  └─ <style…>  ──▶ InStyleBody  ──</style>───▶ Text
//!                  └─ "<!--" ──▶ InComment ──"-->"──▶ Text
//! ```
//!
//! Every removed construct leaves one space behind so that words on either
//! side never run together. Character references are decoded afterwards and
//! whitespace is collapsed last.

use crate::entities::decode_entities;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    TagOpen,
    InScriptBody,
    InStyleBody,
    InComment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawText {
    Script,
    Style,
}

impl RawText {
    fn name(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Style => "style",
        }
    }

    fn body_state(self) -> State {
        match self {
            Self::Script => State::InScriptBody,
            Self::Style => State::InStyleBody,
        }
    }

    /// Classify the text right after a `<`. The name has to end where a tag
    /// name would, so `<scripts>` is an ordinary tag but `<script">` is not.
    fn opening_at(rest: &str) -> Option<Self> {
        [Self::Script, Self::Style].into_iter().find(|kind| {
            let name = kind.name();
            let bytes = rest.as_bytes();
            bytes.len() >= name.len()
                && bytes[..name.len()].eq_ignore_ascii_case(name.as_bytes())
                && bytes
                    .get(name.len())
                    .is_none_or(|&b| !is_tag_name_byte(b))
        })
    }
}

fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

/// Constructs already known to have no terminator ahead. Searching for one
/// again could only fail, so each search runs at most once per kind.
#[derive(Debug, Default)]
struct Unclosed {
    script: bool,
    style: bool,
    comment: bool,
}

impl Unclosed {
    fn raw(&self, kind: RawText) -> bool {
        match kind {
            RawText::Script => self.script,
            RawText::Style => self.style,
        }
    }

    fn mark_raw(&mut self, kind: RawText) {
        match kind {
            RawText::Script => self.script = true,
            RawText::Style => self.style = true,
        }
    }
}

/// Reduce markup to a single line of plain text.
///
/// Script and style blocks are dropped with their content, every other tag
/// and comment is replaced by a space, the references listed in
/// [`ENTITIES`](crate::entities::ENTITIES) are decoded, and whitespace runs
/// are collapsed. Never fails; malformed markup degrades to best-effort text.
///
/// ```
/// use gleaner_extract::extract_text;
///
/// assert_eq!(extract_text("<p>A &amp; B</p>"), "A & B");
/// assert_eq!(extract_text("<script>x</script><p>Hi</p>"), "Hi");
/// assert_eq!(extract_text("a   b\n\tc"), "a b c");
/// ```
pub fn extract_text(markup: &str) -> String {
    let stripped = strip_tags(markup);
    let decoded = decode_entities(&stripped);
    collapse_whitespace(&decoded)
}

/// Collapse every run of whitespace into one space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove tags, comments and script/style blocks, leaving one space per
/// removed construct. Text content (including references) is left as is.
///
/// Script and style blocks take precedence over ordinary tags: a block that
/// starts inside a stray `<…` run is removed on its own, and the run is then
/// judged as if the block had never been there.
///
/// Runs in time linear in the input: each byte is visited a bounded number
/// of times, and a failed search for a terminator is remembered so it is
/// never repeated.
pub fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut state = State::Text;
    // Byte offset of the next unread input.
    let mut pos = 0;
    // Offset of the `<` that opened the construct being read.
    let mut tag_start = 0;
    let mut unclosed = Unclosed::default();

    loop {
        match state {
            State::Text => match markup[pos..].find('<') {
                Some(off) => {
                    out.push_str(&markup[pos..pos + off]);
                    tag_start = pos + off;
                    pos = tag_start + 1;
                    state = State::TagOpen;
                }
                None => {
                    out.push_str(&markup[pos..]);
                    break;
                }
            },
            State::TagOpen => {
                if !unclosed.comment && markup[pos..].starts_with("!--") {
                    pos += 3;
                    state = State::InComment;
                    continue;
                }
                if let Some(kind) =
                    RawText::opening_at(&markup[pos..]).filter(|&kind| !unclosed.raw(kind))
                {
                    let Some(off) = markup[pos..].find('>') else {
                        out.push_str(&markup[tag_start..]);
                        break;
                    };
                    pos += off + 1;
                    out.push(' ');
                    state = kind.body_state();
                    continue;
                }
                match scan_tag(markup, tag_start, pos, &mut unclosed, &mut out) {
                    Some(end) => {
                        pos = end;
                        state = State::Text;
                    }
                    None => break,
                }
            }
            State::InScriptBody | State::InStyleBody => {
                let kind = if state == State::InScriptBody {
                    RawText::Script
                } else {
                    RawText::Style
                };
                match find_close_tag(markup, pos, kind.name()) {
                    Some(end) => pos = end,
                    // The opening tag already became a space; keep the body
                    // as ordinary text.
                    None => unclosed.mark_raw(kind),
                }
                state = State::Text;
            }
            State::InComment => match markup[pos..].find("-->") {
                Some(off) => {
                    out.push(' ');
                    pos += off + 3;
                    state = State::Text;
                }
                None => {
                    // Unterminated comment: read `<!…` as an ordinary tag.
                    unclosed.comment = true;
                    pos = tag_start + 1;
                    state = State::TagOpen;
                }
            },
        }
    }
    out
}

/// Read an ordinary tag opened at `tag_start`, scanning from `from` for its
/// `>`. Script and style blocks met on the way are removed first.
///
/// Returns the offset just past the `>`, or `None` once the rest of the
/// input has been copied out because no `>` follows.
fn scan_tag(
    markup: &str,
    tag_start: usize,
    from: usize,
    unclosed: &mut Unclosed,
    out: &mut String,
) -> Option<usize> {
    let bytes = markup.as_bytes();
    // Text pushed since here belongs to the tag if a `>` turns up.
    let rollback = out.len();
    let mut segment = tag_start;
    let mut at = from;
    while let Some(off) = markup[at..].find(['<', '>']) {
        let hit = at + off;
        if bytes[hit] == b'>' {
            out.truncate(rollback);
            out.push(' ');
            return Some(hit + 1);
        }
        at = hit + 1;
        let Some(kind) = RawText::opening_at(&markup[at..]).filter(|&kind| !unclosed.raw(kind))
        else {
            continue;
        };
        let block_end = markup[at..]
            .find('>')
            .and_then(|gt| find_close_tag(markup, at + gt + 1, kind.name()));
        match block_end {
            Some(end) => {
                out.push_str(&markup[segment..hit]);
                out.push(' ');
                segment = end;
                at = end;
            }
            None => unclosed.mark_raw(kind),
        }
    }
    out.push_str(&markup[segment..]);
    None
}

/// Find the end offset (just past `>`) of the first `</name>` at or after
/// `from`, allowing whitespace around the slash and the name.
fn find_close_tag(markup: &str, from: usize, name: &str) -> Option<usize> {
    let bytes = markup.as_bytes();
    let mut at = from;
    while let Some(off) = markup[at..].find('<') {
        let lt = at + off;
        if let Some(len) = match_close_tag(&bytes[lt + 1..], name) {
            return Some(lt + 1 + len);
        }
        at = lt + 1;
    }
    None
}

/// Length of `\s*/\s*name\s*>` at the start of `bytes`, if it matches.
fn match_close_tag(bytes: &[u8], name: &str) -> Option<usize> {
    let mut i = skip_whitespace(bytes, 0);
    if bytes.get(i) != Some(&b'/') {
        return None;
    }
    i = skip_whitespace(bytes, i + 1);
    let end = i + name.len();
    if !bytes.get(i..end)?.eq_ignore_ascii_case(name.as_bytes()) {
        return None;
    }
    i = skip_whitespace(bytes, end);
    (bytes.get(i) == Some(&b'>')).then_some(i + 1)
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_script_and_style_blocks() {
        assert_eq!(
            extract_text("<style>p { color: red }</style><p>Body</p><script>alert(1)</script>"),
            "Body"
        );
        assert_eq!(
            extract_text("a<SCRIPT type=\"text/javascript\">var x = '<b>';</ScRiPt>b"),
            "a b"
        );
    }

    #[test]
    fn nested_scripts_disappear_entirely() {
        assert_eq!(extract_text("<script><script>evil</script></script>"), "");
        assert_eq!(
            extract_text("x<script><script>evil()</script>more()</script>y"),
            "x more() y"
        );
    }

    #[test]
    fn abutting_blocks_are_all_removed() {
        assert_eq!(
            extract_text("<script>a</script><script>b</script><style>c</style>ok"),
            "ok"
        );
    }

    #[test]
    fn closing_tag_may_contain_whitespace() {
        assert_eq!(extract_text("<script>bad()< / script >good"), "good");
        assert_eq!(extract_text("<style>x{}</\n style\t>good"), "good");
    }

    #[test]
    fn tag_name_must_end_at_a_boundary() {
        assert_eq!(extract_text("<scripts>kept</scripts>"), "kept");
        assert_eq!(extract_text("<script/>gone</script>after"), "after");
        assert_eq!(extract_text("<style\nmedia=\"x\">gone</style>after"), "after");
    }

    #[test]
    fn unterminated_block_keeps_its_body_as_text() {
        assert_eq!(extract_text("before<script>never closed"), "before never closed");
        assert_eq!(
            extract_text("<style>a<style>b</p>"),
            "a b"
        );
    }

    #[test]
    fn comments_are_removed() {
        assert_eq!(extract_text("a<!-- hidden <b>x</b> -->b"), "a b");
        assert_eq!(extract_text("a<!-- a > b -->c"), "a c");
        assert_eq!(extract_text("a<!-- no end > tail"), "a tail");
    }

    #[test]
    fn unclosed_angle_bracket_is_left_alone() {
        assert_eq!(extract_text("1 < 2 and more"), "1 < 2 and more");
        assert_eq!(extract_text("<b>bold</b> x <y"), "bold x <y");
    }

    #[test]
    fn bracket_runs_are_one_tag() {
        assert_eq!(extract_text("a < b > c"), "a c");
        assert_eq!(extract_text("x<a <b>y"), "x y");
    }

    #[test]
    fn decodes_after_stripping() {
        assert_eq!(extract_text("<p>&lt;b&gt; is bold</p>"), "<b> is bold");
        assert_eq!(extract_text("&amp;lt;"), "&lt;");
        assert_eq!(extract_text("a&nbsp;&nbsp;b"), "a b");
        assert_eq!(extract_text("It&#39;s &quot;fine&quot;"), "It's \"fine\"");
    }

    #[test]
    fn words_never_run_together() {
        assert_eq!(extract_text("<li>one</li><li>two</li>"), "one two");
        assert_eq!(extract_text("line<br>break"), "line break");
    }

    #[test]
    fn empty_and_plain_inputs() {
        assert_eq!(extract_text(""), "");
        assert_eq!(extract_text("   \n\t "), "");
        assert_eq!(extract_text("plain"), "plain");
    }

    #[test]
    fn multibyte_text_is_preserved() {
        assert_eq!(extract_text("<p>héllo</p><p>世界</p>"), "héllo 世界");
    }

    #[test]
    fn strip_tags_leaves_one_space_per_construct() {
        assert_eq!(strip_tags("<p>a</p>"), " a ");
        assert_eq!(strip_tags("x<script>y</script>z"), "x z");
    }

    #[test]
    fn many_unterminated_scripts_stay_linear() {
        let markup = "<script>".repeat(20_000);
        assert_eq!(extract_text(&markup), "");
    }

    #[test]
    fn many_unterminated_comments_stay_linear() {
        let markup = "<!--a>".repeat(40_000);
        assert_eq!(extract_text(&markup), "");
        assert_eq!(extract_text("<!--x>keep<!-- y"), "keep<!-- y");
    }

    #[test]
    fn block_inside_stray_bracket_run_is_still_removed() {
        assert_eq!(extract_text("<scr<script>ipt>alert(1)</script>"), "<scr");
        assert_eq!(
            extract_text("if a < b <script>track()</script> end"),
            "if a < b end"
        );
        assert_eq!(
            extract_text("<div title=\"<script\">secret</script>"),
            "<div title=\""
        );
        assert_eq!(extract_text("x < y <style>p{}</style> z"), "x < y z");
    }

    #[test]
    fn bracket_run_closing_after_a_block_is_one_tag() {
        assert_eq!(extract_text("a<b <script>x</script> c>d"), "a d");
        assert_eq!(
            extract_text("<a <script><script>evil</script></script>ok"),
            "ok"
        );
    }

    #[test]
    fn unterminated_block_inside_bracket_run_is_an_ordinary_tag() {
        assert_eq!(extract_text("a<b <script>c"), "a c");
    }

    #[test]
    fn open_tag_classification() {
        assert_eq!(RawText::opening_at("script"), Some(RawText::Script));
        assert_eq!(RawText::opening_at("SCRIPT src=x>"), Some(RawText::Script));
        assert_eq!(RawText::opening_at("script\">"), Some(RawText::Script));
        assert_eq!(RawText::opening_at("style>"), Some(RawText::Style));
        assert_eq!(RawText::opening_at("scriptx"), None);
        assert_eq!(RawText::opening_at("script-data>"), None);
        assert_eq!(RawText::opening_at("/script"), None);
        assert_eq!(RawText::opening_at("p"), None);
    }
}
