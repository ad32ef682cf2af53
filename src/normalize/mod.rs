//! Code normalization for dataset samples.
//!
//! Samples arrive as chat-style answers: wrapped in Markdown fences,
//! sprinkled with non-ASCII punctuation and commented. Before scanning, each
//! one goes through three steps in order:
//!
//! 1. [`strip_fences`]: drop ```` ```python ```` / ```` ``` ```` markers
//! 2. [`sanitize`]: drop every run of non-ASCII characters
//! 3. [`remove_comments`]: re-lex and re-emit everything but comments
//!
//! Only the last step can fail, with a [`LexError`].

mod lexer;

pub use lexer::{tokenize, LexError, Token, TokenKind};

use regex::Regex;
use std::sync::LazyLock;

static NON_ASCII: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\x00-\x7F]+").unwrap());

/// Remove Markdown code-fence markers wherever they occur and trim.
pub fn strip_fences(code: &str) -> String {
    code.replace("```python", "").replace("```", "").trim().to_string()
}

/// Remove every maximal run of non-ASCII characters.
pub fn sanitize(code: &str) -> String {
    NON_ASCII.replace_all(code, "").into_owned()
}

/// Re-emit `code` without comments.
///
/// Tokens are concatenated in order; a single space is inserted between two
/// neighbours that are both names, numbers or operators so that nothing is
/// glued together. Original inter-token spacing is not preserved.
pub fn remove_comments(code: &str) -> Result<String, LexError> {
    let tokens = tokenize(code)?;
    let mut out = String::with_capacity(code.len());
    let mut prev: Option<TokenKind> = None;

    for token in tokens.iter().filter(|t| t.kind != TokenKind::Comment) {
        if prev.is_some_and(TokenKind::is_spaced) && token.kind.is_spaced() {
            out.push(' ');
        }
        out.push_str(&token.text);
        prev = Some(token.kind);
    }

    Ok(out.trim().to_string())
}

/// Full normalization pipeline: fences → non-ASCII → comments.
pub fn normalize(code: &str) -> Result<String, LexError> {
    remove_comments(&sanitize(&strip_fences(code)))
}

// ── Tests ────────────────────────────────────────────────────────
