//! Framing of tokens inside documents: `<!MASK-SMITH:{token}>`.

use std::{ops::Range, sync::LazyLock};

use regex::Regex;

pub const PREFIX: &str = "<!MASK-SMITH:";
pub const SUFFIX: &str = ">";

// The character class is the transport alphabet; `>` is not in it.
#[allow(clippy::unwrap_used)]
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!MASK-SMITH:([0-9A-Za-z.\-:+=^!/*?&<_()\[\]{}@%$#]+)>").unwrap()
});

/// A delimited token found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch<'a> {
    /// Byte range of the whole delimited form, delimiters included.
    pub range: Range<usize>,
    /// The transport-encoded token between the delimiters.
    pub token: &'a str,
}

/// Wrap token text in the document delimiters.
#[must_use]
pub fn wrap(token: &str) -> String {
    format!("{PREFIX}{token}{SUFFIX}")
}

/// Accept either a bare token or its delimited form and return the token.
///
/// Surrounding whitespace is ignored. Returns `None` for an empty token.
#[must_use]
pub fn unwrap(text: &str) -> Option<&str> {
    let text = text.trim();
    let token = match text.strip_prefix(PREFIX) {
        Some(rest) => rest.strip_suffix(SUFFIX)?,
        None => text,
    };
    (!token.is_empty()).then_some(token)
}

/// All delimited tokens in `text`, in document order.
///
/// The prefix characters are all in the transport alphabet, so an
/// unterminated prefix can run into the next token. Each match is anchored
/// at the last prefix before its `>`.
#[must_use]
pub fn find_all(text: &str) -> Vec<TokenMatch<'_>> {
    TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let token = caps.get(1)?;
            let start = match token.as_str().rfind(PREFIX) {
                Some(i) if token.start() + i + PREFIX.len() < token.end() => token.start() + i,
                _ => whole.start(),
            };
            Some(TokenMatch {
                range: start..whole.end(),
                token: &text[start + PREFIX.len()..token.end()],
            })
        })
        .collect()
}

/// The token whose delimited span contains byte `offset`.
#[must_use]
pub fn token_at(text: &str, offset: usize) -> Option<TokenMatch<'_>> {
    find_all(text)
        .into_iter()
        .find(|m| m.range.contains(&offset))
}
