//! Word tokenization shared by tag validation and request classification.
//!
//! Text is lower-cased and split into folded word tokens, so `"front-end"`
//! and `"Front End"` are the same two-token phrase and `"tables"` matches
//! the tag `"table"`.

use regex_lite::Regex;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9][a-z0-9+#]*").expect("word pattern is valid"));

/// Lower-case `text` and split it into folded word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| fold(m.as_str()))
        .collect()
}

/// Light plural fold: `entities` -> `entity`, `tables` -> `table`.
/// Short words and `-ss` endings are left alone (`api`, `css`, `glass`).
fn fold(token: &str) -> String {
    if token.len() > 4 && token.ends_with("ies") {
        return format!("{}y", &token[..token.len() - 3]);
    }
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}
