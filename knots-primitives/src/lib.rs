/*!
This crate contains parsers and other low-level helper types for handling
[KDL](https://kdl.dev/) documents. It is a complete but highly skeletal KDL
implementation, suitable for use by KDL crate authors to provide higher level
access to KDL data. Unless you're working on a KDL implementation, you should
probably not be using this crate.

The parsers here are all [`nom`] parsers, generic over the error type, and
additionally generic over *builder* types (see [`string::StringBuilder`],
[`number::NumberBuilder`], [`value::ValueBuilder`]) so that callers can
recognize-and-discard syntax without paying to build it.
*/

#![deny(missing_docs)]

use nom::{
    error::{ErrorKind, FromExternalError, ParseError},
    Err as NomErr, IResult,
};

pub mod annotation;
pub mod error;
pub mod number;
pub mod string;
mod util;
pub mod value;
pub mod whitespace;

pub use error::LexError;

/// The reserved KDL keyword literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `true` or `false`
    Bool(bool),

    /// `null`
    Null,
}

/// Returns true if `word` is one of the reserved keywords, which can't be
/// used as bare identifiers.
#[inline]
pub fn is_keyword(word: &str) -> bool {
    matches!(word, "true" | "false" | "null")
}

/// Parse a bare word in value position and classify it as a keyword. Any
/// bare word that *isn't* a keyword is an unconditional failure, since
/// nothing else bare can appear where a value is expected.
pub fn parse_keyword<'i, E>(input: &'i str) -> IResult<&'i str, Keyword, E>
where
    E: ParseError<&'i str>,
    E: FromExternalError<&'i str, LexError>,
{
    let (tail, word) = string::parse_bare_identifier(input)?;

    match word {
        "true" => Ok((tail, Keyword::Bool(true))),
        "false" => Ok((tail, Keyword::Bool(false))),
        "null" => Ok((tail, Keyword::Null)),
        word => Err(NomErr::Failure(E::from_external_error(
            input,
            ErrorKind::Tag,
            LexError::UnknownKeyword(word.to_owned()),
        ))),
    }
}
