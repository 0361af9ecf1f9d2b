//! Best-effort recovery of a JSON document from free-form model output.
//!
//! Models wrap JSON in markdown fences, prepend prose, leave `//` comments
//! and trailing commas, or emit typographic quotes. [`extract_json`] peels
//! those layers off without ever failing; whatever it returns is handed to
//! the strict parser.

use std::sync::LazyLock;

use regex::Regex;

static JSON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("valid json fence regex"));

static OBJECT_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid object span regex"));

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:,\s*)+([}\]])").expect("valid trailing comma regex"));

/// Extract a JSON-shaped substring from raw model text.
///
/// Applies, in order: fenced-block selection, fence-marker stripping,
/// narrowing to the outermost `{ ... }` span, smart-quote replacement,
/// `//` comment removal and trailing-comma removal. The pass is repeated
/// until the text stops changing, so `extract_json(extract_json(x)) ==
/// extract_json(x)` for every input.
pub fn extract_json(raw: &str) -> String {
    let mut current = extract_once(raw);
    loop {
        let next = extract_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One ordered pass. Every step either leaves the text alone or makes it
/// strictly shorter in bytes, so iterating reaches a fixed point.
fn extract_once(text: &str) -> String {
    let text = match JSON_FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => strip_fence_markers(text),
    };

    let text = OBJECT_SPAN_RE
        .find(text)
        .map_or(text, |m| m.as_str());

    let text = replace_smart_quotes(text);
    let text = strip_line_comments(&text);
    let text = TRAILING_COMMA_RE.replace_all(&text, "$1");

    text.trim().to_owned()
}

fn strip_fence_markers(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn replace_smart_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}' => '"',
            other => other,
        })
        .collect()
}

/// Remove `//` comments up to (not including) the end of line. A `//` that
/// appears inside a string literal, such as a URL, is kept.
fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|&next| next != '\n') {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn takes_fenced_json_block() {
        let raw = "Here is your plan:\n```json\n{\"plan_title\": \"X\"}\n```\nEnjoy!";
        assert_eq!(extract_json(raw), r#"{"plan_title": "X"}"#);
    }

    #[test]
    fn strips_bare_fence_markers() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(raw), r#"{"a": 1}"#);
    }

    #[test]
    fn unterminated_json_fence_is_stripped() {
        let raw = "```json\n{\"a\": 1}";
        assert_eq!(extract_json(raw), r#"{"a": 1}"#);
    }

    #[test]
    fn narrows_to_outermost_object() {
        let raw = "Sure! {\"a\": {\"b\": 2}} Let me know if you need more.";
        assert_eq!(extract_json(raw), r#"{"a": {"b": 2}}"#);
    }

    #[test]
    fn replaces_smart_quotes() {
        let raw = "{\u{201C}a\u{201D}: \u{2018}b\u{2019}}";
        assert_eq!(extract_json(raw), r#"{"a": "b"}"#);
    }

    #[test]
    fn strips_comments_but_keeps_urls() {
        let raw = "{\n  \"url\": \"https://docs.python.org\", // official docs\n  \"n\": 1\n}";
        let out = extract_json(raw);
        assert!(out.contains("https://docs.python.org"));
        assert!(!out.contains("official docs"));
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["n"], 1);
    }

    #[test]
    fn removes_trailing_commas() {
        let raw = r#"{"items": [1, 2, 3,], "k": "v",}"#;
        let out = extract_json(raw);
        assert_eq!(out, r#"{"items": [1, 2, 3], "k": "v"}"#);
    }

    #[test]
    fn repeated_commas_collapse() {
        assert_eq!(extract_json("{\"a\": [1,, ]}"), "{\"a\": [1]}");
    }

    #[test]
    fn prose_without_json_is_returned_trimmed() {
        assert_eq!(
            extract_json("  I cannot help with that.  "),
            "I cannot help with that."
        );
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(extract_json(""), "");
    }

    #[test]
    fn comment_hiding_closing_brace_is_stable() {
        let raw = "{\"a\": 1} // trailing }";
        let once = extract_json(raw);
        assert_eq!(extract_json(&once), once);
    }

    fn fragment() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("```json".to_owned()),
            Just("```".to_owned()),
            Just("{".to_owned()),
            Just("}".to_owned()),
            Just("[".to_owned()),
            Just("]".to_owned()),
            Just(",".to_owned()),
            Just("//".to_owned()),
            Just("\n".to_owned()),
            Just("\"".to_owned()),
            Just("\\".to_owned()),
            Just("\u{201C}".to_owned()),
            Just("\u{2019}".to_owned()),
            "[a-z :0-9]{0,4}",
        ]
    }

    proptest! {
        #[test]
        fn extraction_is_idempotent_for_any_text(s in ".*") {
            let once = extract_json(&s);
            prop_assert_eq!(extract_json(&once), once);
        }

        #[test]
        fn extraction_is_idempotent_for_json_like_text(
            parts in prop::collection::vec(fragment(), 0..32)
        ) {
            let s = parts.concat();
            let once = extract_json(&s);
            prop_assert_eq!(extract_json(&once), once);
        }
    }
}
