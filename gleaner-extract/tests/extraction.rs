use gleaner_extract::entities::ENTITIES;
use gleaner_extract::{Page, extract_links, extract_text, extract_text_value};
use regex::Regex;
use serde_json::json;

const ADVERSARIAL: &[&str] = &[
    "",
    "<",
    ">",
    "<>",
    "<<>>",
    "<script>",
    "</script>",
    "<script><script>evil</script></script>",
    "<script>a</script><script>b</script>",
    "<style><script>x</style></script>",
    "<scr<script>ipt>alert(1)</script>",
    "<!---->",
    "<!-- <script>x</script> -->visible",
    "<p class=\"a>b\">text</p>",
    "<div><p>unbalanced</div></span>",
    "&amp; &quot;&#39;&apos;&nbsp;x",
    "<a href=\"/x\">A</a><a href='/y'>B</a>",
    "\u{0}\u{1}<b>\u{7f}</b>",
    "ü<ß>é</ß>ñ",
    "if a < b <script>track()</script> end",
    "<div title=\"<script\">secret</script>",
    "a<b <script>hidden</script> c>d",
    "x < y <style>p{}</style> z",
    "<!--a><!--b>",
];

/// Bodies of script blocks that do have a closing tag.
fn closed_script_bodies(input: &str) -> Vec<String> {
    let re = Regex::new(r"(?is)<script[^>]*>(.*?)<\s*/\s*script\s*>").unwrap();
    re.captures_iter(input)
        .map(|caps| caps[1].trim().to_string())
        .filter(|body| !body.is_empty())
        .collect()
}

fn has_tag_construct(text: &str) -> bool {
    text.find('<')
        .is_some_and(|lt| text[lt..].contains('>'))
}

#[test]
fn documented_examples() {
    assert_eq!(extract_text("<p>A &amp; B</p>"), "A & B");
    assert_eq!(extract_text("<script>x</script><p>Hi</p>"), "Hi");
    assert_eq!(extract_text("<script><script>evil</script></script>"), "");
    assert_eq!(extract_text("a   b\n\tc"), "a b c");
    assert_eq!(
        extract_links("<a href=\"/x\">A</a><a href='/y'>B</a>"),
        vec!["/x", "/y"]
    );
}

#[test]
fn non_string_json_yields_empty_text() {
    for value in [
        json!(null),
        json!(true),
        json!(3.5),
        json!(["<p>x</p>"]),
        json!({ "html": "<p>x</p>" }),
    ] {
        assert_eq!(extract_text_value(&value), "", "{value}");
    }
    assert_eq!(extract_text_value(&json!("<p>x</p>")), "x");
}

#[test]
fn adversarial_inputs_produce_clean_single_line_text() {
    for input in ADVERSARIAL {
        let text = extract_text(input);
        assert!(!has_tag_construct(&text), "{input:?} -> {text:?}");
        assert_eq!(text, text.trim(), "{input:?} not trimmed");
        assert!(!text.contains("  "), "{input:?} has a double space");
        assert!(!text.contains(['\n', '\t', '\r']), "{input:?} not single-line");
        for (name, _) in ENTITIES {
            assert!(!text.contains(name), "{input:?} left {name} undecoded");
        }
        for body in closed_script_bodies(input) {
            assert!(!text.contains(&body), "{input:?} leaked script body {body:?}");
        }
    }
}

#[test]
fn adversarial_inputs_never_break_the_link_scanner() {
    for input in ADVERSARIAL {
        let _ = extract_links(input);
    }
    assert_eq!(
        extract_links(ADVERSARIAL[16]),
        vec!["/x".to_string(), "/y".to_string()]
    );
}

#[test]
fn script_hidden_inside_comment_is_dropped_with_it() {
    assert_eq!(
        extract_text("<!-- <script>x</script> -->visible"),
        "visible"
    );
}

#[test]
fn realistic_document() {
    let html = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Rust &amp; You</title>
    <style type="text/css">body { font: 12px/1.5 sans-serif; }</style>
    <script src="/app.js"></script>
    <script>
      window.dataLayer = [];
      if (a < b && c > d) { track("</scr" + "ipt>"); }
    </script>
  </head>
  <body>
    <nav><a href="/">Home</a> | <a class="ext" href='https://example.org/about'>About</a></nav>
    <h1>Hello,&nbsp;world</h1>
    <p>It&#39;s a <em>small</em> page.</p>
  </body>
</html>"#;

    let page = Page::from_markup(html);
    assert_eq!(
        page.text,
        "Rust & You Home | About Hello, world It's a small page."
    );
    assert_eq!(page.links, vec!["/", "https://example.org/about"]);
}

#[test]
fn page_serializes_for_json_callers() {
    let page = Page::from_markup("<a href=\"/a\">x</a>");
    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value, json!({ "text": "x", "links": ["/a"] }));
}

#[test]
fn extraction_is_safe_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let html = format!("<p>item {i}</p><a href=\"/{i}\">{i}</a>");
                Page::from_markup(&html)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let page = handle.join().unwrap();
        assert_eq!(page.text, format!("item {i} {i}"));
        assert_eq!(page.links, vec![format!("/{i}")]);
    }
}
