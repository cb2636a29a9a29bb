//! Markdown cleanup for AI replies
//!
//! The assistant's answers are rendered as plain text, so markdown syntax is
//! stripped while keeping the content readable: emphasis markers drop away,
//! links keep their text, list markers become bullets.

use std::sync::LazyLock;

use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let rule = |pattern: &str, replacement: &'static str| Rule {
        pattern: Regex::new(pattern).expect("static cleanup pattern"),
        replacement,
    };
    vec![
        // Fenced code blocks vanish entirely
        rule(r"```[\s\S]*?```", ""),
        // Inline code keeps its content
        rule(r"`([^`]+)`", "$1"),
        // Bold, then italic (order matters: ** before *)
        rule(r"\*\*([^*]+)\*\*", "$1"),
        rule(r"__([^_]+)__", "$1"),
        rule(r"\*([^*]+)\*", "$1"),
        rule(r"_([^_]+)_", "$1"),
        // Strikethrough
        rule(r"~~([^~]+)~~", "$1"),
        // Headers
        rule(r"(?m)^#{1,6}\s+", ""),
        // Images before links, so the alt text survives without a stray '!'
        rule(r"!\[([^\]]*)\]\([^)]+\)", "$1"),
        rule(r"\[([^\]]+)\]\([^)]+\)", "$1"),
        // Unordered list markers become bullets; ordered lists stay as-is
        rule(r"(?m)^[-*]\s+", "\u{2022} "),
        // Blockquotes
        rule(r"(?m)^>\s+", ""),
        // Horizontal rules
        rule(r"(?m)^[-*_]{3,}$", ""),
        // Stray HTML tags
        rule(r"<[^>]+>", ""),
        // Collapse runs of blank lines and spaces
        rule(r"\n{3,}", "\n\n"),
        rule(r" {2,}", " "),
    ]
});

/// Strip markdown syntax from `text`, returning readable plain text.
pub fn clean(text: &str) -> String {
    let mut cleaned = text.to_string();
    for rule in RULES.iter() {
        cleaned = rule
            .pattern
            .replace_all(&cleaned, rule.replacement)
            .into_owned();
    }

    // Trim each line, then the whole thing
    cleaned
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
