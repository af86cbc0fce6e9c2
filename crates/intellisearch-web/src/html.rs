//! Regex-based HTML to plain text conversion.

use std::sync::LazyLock;

use regex::Regex;

/// Elements whose whole subtree is boilerplate.
static STRIPPED_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "noscript", "nav", "footer", "aside", "header"]
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).ok())
        .collect()
});

/// Containers tried in order for the main content.
static MAIN_CONTAINERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<article\b[^>]*>(.*?)</article\s*>",
        r"(?is)<main\b[^>]*>(.*?)</main\s*>",
        r#"(?is)<div\b[^>]*role=["']main["'][^>]*>(.*?)</div\s*>"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static TEXT_BLOCKS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:p|h[1-6])\b[^>]*>(.*?)</(?:p|h[1-6])\s*>").ok());
static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").ok());
static COMMENT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").ok());

/// Main text shorter than this falls back to paragraphs and headings.
const MIN_MAIN_CHARS: usize = 100;

pub fn html_to_text(html: &str) -> String {
    let mut cleaned = replace_all(COMMENT.as_ref(), html, " ");
    for re in STRIPPED_BLOCKS.iter() {
        cleaned = re.replace_all(&cleaned, " ").into_owned();
    }

    let main = MAIN_CONTAINERS
        .iter()
        .find_map(|re| re.captures(&cleaned).and_then(|c| c.get(1)).map(|m| plain(m.as_str())))
        .unwrap_or_default();
    if main.chars().count() >= MIN_MAIN_CHARS {
        return main;
    }

    let blocks: Vec<String> = TEXT_BLOCKS
        .as_ref()
        .map(|re| {
            re.captures_iter(&cleaned)
                .filter_map(|c| c.get(1))
                .map(|m| plain(m.as_str()))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if blocks.is_empty() {
        plain(&cleaned)
    } else {
        blocks.join(" ")
    }
}

fn replace_all(re: Option<&Regex>, text: &str, with: &str) -> String {
    match re {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

/// Drop tags, decode common entities, collapse whitespace.
fn plain(fragment: &str) -> String {
    let text = replace_all(TAG.as_ref(), fragment, " ")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap `text` at `max_chars` characters, cutting after the last full stop
/// inside the window when there is one.
pub fn truncate_at_sentence(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let window = &text[..cut];
    match window.rfind('.') {
        Some(dot) => window[..=dot].to_string(),
        None => window.to_string(),
    }
}
