// Shallow tag scanning for RSS-shaped documents.
//
// Bulletin feeds are flat `<item>` lists with namespaced child tags that a
// generic feed parser drops, so we pull the pieces out by pattern instead of
// building a document model.

use std::sync::LazyLock;

use regex::Regex;

static ITEM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<item(?:\s[^>]*)?>(.*?)</item>").expect("Invalid item regex")
});

static CDATA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("Invalid CDATA regex"));

/// Any opening or self-closing element: name, attribute text, closing slash.
static OPEN_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z_][\w:.\-]*)((?:\s[^>]*?)?)(/?)>").expect("Invalid open-tag regex")
});

static ATTR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:.\-]+)\s*=\s*["']([^"']*)["']"#).expect("Invalid attribute regex")
});

/// True if the text looks like an RSS/Atom envelope at all.
pub(crate) fn looks_like_feed(xml: &str) -> bool {
    xml.contains("<rss") || xml.contains("<channel") || xml.contains("<feed")
}

/// Inner text of every `<item>...</item>` block, in document order.
pub(crate) fn items(xml: &str) -> Vec<&str> {
    ITEM_PATTERN
        .captures_iter(xml)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Text of the first `<tag>...</tag>` pair in the fragment: CDATA unwrapped,
/// entities decoded, trimmed. Empty or self-closing tags yield `None`.
pub(crate) fn tag_text(fragment: &str, tag: &str) -> Option<String> {
    let closing = format!("</{tag}>");
    let raw = OPEN_TAG_PATTERN
        .captures_iter(fragment)
        .filter(|c| &c[1] == tag && c[3].is_empty())
        .find_map(|c| {
            let body_start = c.get(0)?.end();
            let len = fragment[body_start..].find(&closing)?;
            Some(&fragment[body_start..body_start + len])
        })?;
    let text = decode_entities(&unwrap_cdata(raw));
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Value of `attr` on the first `<tag ...>` in the fragment.
pub(crate) fn tag_attr(fragment: &str, tag: &str, attr: &str) -> Option<String> {
    let open = OPEN_TAG_PATTERN
        .captures_iter(fragment)
        .find(|c| &c[1] == tag)?;
    let attrs = open.get(2)?.as_str();
    let value = ATTR_PATTERN
        .captures_iter(attrs)
        .find(|c| &c[1] == attr)?
        .get(2)?
        .as_str()
        .trim();
    (!value.is_empty()).then(|| decode_entities(value))
}

fn unwrap_cdata(raw: &str) -> String {
    CDATA_PATTERN.replace_all(raw, "$1").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
