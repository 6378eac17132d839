//! Tag list parsing and rendering.
//!
//! A post's tags arrive as one free-text field (`"rust, Web,  async"`). The
//! stored form is one row per distinct, lower-cased name.

use crate::models::Tag;

pub const TAG_LIST_SEPARATOR: &str = ", ";

/// Splits `raw` on commas and returns the distinct lower-cased names in
/// first-occurrence order. Blank entries are dropped.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let name = normalize_tag_name(token);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn render_tag_list(tags: &[Tag]) -> String {
    tags.iter()
        .map(|tag| tag.name.as_str())
        .collect::<Vec<_>>()
        .join(TAG_LIST_SEPARATOR)
}
