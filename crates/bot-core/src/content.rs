//! Caption parsing and content identifier helpers.

use std::sync::LazyLock;

use regex::Regex;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([\w.-]+)/(.+)").unwrap_or_else(|e| panic!("identifier regex: {e}"))
});

/// Split a caption into a title and trailing hashtags.
///
/// Tags are collected from the end of the caption only: the scan walks
/// backwards over whitespace-separated words and stops at the first word
/// that is not a `#tag`. Hash words earlier in the caption stay part of
/// the title.
pub fn parse_hashtags(caption: &str) -> (String, Vec<String>) {
    let words: Vec<&str> = caption.split_whitespace().collect();
    let mut split = words.len();
    for word in words.iter().rev() {
        if word.len() > 1 && word.starts_with('#') {
            split -= 1;
        } else {
            break;
        }
    }
    let title = words[..split].join(" ");
    let tags = words[split..]
        .iter()
        .map(|w| w[1..].trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .collect();
    (title, tags)
}

/// `"@author/permlink"` as used in logs and post references.
pub fn construct_identifier(author: &str, permlink: &str) -> String {
    format!("@{author}/{permlink}")
}

/// Pull an identifier out of a post URL (or any string ending in one).
pub fn resolve_identifier(url: &str) -> Option<String> {
    IDENTIFIER
        .captures(url)
        .map(|c| construct_identifier(&c[1], &c[2]))
}
