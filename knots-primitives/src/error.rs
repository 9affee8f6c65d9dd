/*!
Lexical error type, carried through nom's [`FromExternalError`] so that
higher level parsers can surface precise messages for malformed literals.

[`FromExternalError`]: nom::error::FromExternalError
*/

use thiserror::Error;

/// An error encountered while scanning a single KDL lexical item. The parsers
/// in this crate attach a `LexError` to the exact input position where the
/// offending construct *begins* (the opening quote of an unterminated string,
/// the `/*` of an unterminated comment), rather than wherever scanning
/// happened to stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A `"` string with no closing quote before end of input
    #[error("unterminated string")]
    UnterminatedString,

    /// A raw string with no closing quote-and-hashes before end of input
    #[error("unterminated raw string")]
    UnterminatedRawString,

    /// A `/*` comment (possibly nested) with no matching `*/`
    #[error("unterminated block comment")]
    UnterminatedBlockComment,

    /// A backslash escape other than the allowed set
    #[error("invalid escape character {0:?}")]
    InvalidEscape(char),

    /// A `\u{...}` escape denoting a surrogate or a value above U+10FFFF
    #[error("invalid unicode escape {0:#x} (surrogate or out of range)")]
    InvalidUnicodeEscape(u32),

    /// A number with misplaced underscores, a bare radix prefix, or trailing
    /// identifier characters
    #[error("malformed number")]
    MalformedNumber,

    /// A number too large to represent
    #[error("number out of range")]
    NumberOverflow,

    /// A bare word in value position that isn't `true`, `false`, or `null`
    #[error("unknown keyword {0:?}")]
    UnknownKeyword(String),
}
