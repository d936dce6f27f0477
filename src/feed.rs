//! Minimal RSS item extraction.
//!
//! The feed sources only need a handful of well-known tags out of small RSS
//! documents, so this sticks to substring scanning rather than a full XML
//! parser. Namespaced tags ("letterboxd:filmTitle") work the same as plain
//! ones. Field semantics stay in the source adapters.

/// Return the inner text of each `<item>...</item>` block.
pub fn items(xml: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut from = 0;
    while let Some(start) = xml[from..].find("<item") {
        let start = from + start;
        let open_end = match xml[start..].find('>') {
            Some(i) => start + i + 1,
            None => break,
        };
        let end = match xml[open_end..].find("</item>") {
            Some(i) => open_end + i,
            None => break,
        };
        blocks.push(&xml[open_end..end]);
        from = end + "</item>".len();
    }
    blocks
}

/// Extract the text of the first `<tag>` occurrence inside `block`, with
/// CDATA wrappers stripped and entities unescaped. `None` when absent.
pub fn tag_text(block: &str, tag: &str) -> Option<String> {
    let open_a = format!("<{tag}>");
    let open_b = format!("<{tag} ");
    let start = match block.find(&open_a) {
        Some(i) => i,
        None => block.find(&open_b)?,
    };
    let content_start = start + block[start..].find('>')? + 1;
    let close = format!("</{tag}>");
    let content_end = content_start + block[content_start..].find(&close)?;
    let mut inner = block[content_start..content_end].trim();
    if let Some(stripped) = inner.strip_prefix("<![CDATA[") {
        inner = stripped.strip_suffix("]]>").unwrap_or(stripped).trim();
    }
    Some(unescape(inner))
}

/// Drop markup, keeping text content with whitespace collapsed.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Value of the first `attr="..."` on the first `<tag ...>` in `block`.
pub fn tag_attr(block: &str, tag: &str, attr: &str) -> Option<String> {
    let start = block.find(&format!("<{tag} "))?;
    let tag_end = start + block[start..].find('>')?;
    let open = &block[start..tag_end];
    let needle = format!("{attr}=\"");
    let value_start = open.find(&needle)? + needle.len();
    let value_end = value_start + open[value_start..].find('"')?;
    Some(unescape(&open[value_start..value_end]))
}

/// Decode the five predefined XML entities plus the common numeric apostrophe.
pub fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
