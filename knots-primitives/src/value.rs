/*!
Parsers and builder traits related to parsing primitive values. Values can
be `null`, `true`, `false`, a number, or a string.
*/

use nom::{
    branch::alt,
    error::{FromExternalError, ParseError},
    IResult, Parser,
};
use nom_supreme::{context::ContextError, tag::TagError, ParserExt};

use crate::{
    error::LexError,
    number::{parse_number, NumberBuilder},
    parse_keyword,
    string::{parse_escaped_string, parse_raw_string, StringBuilder},
    Keyword,
};

/// Trait for building primitive KDL values. Used to abstract over cases where
/// the caller might not care about the actual content of the value. Used as
/// the return value for [`parse_bare_value`].
pub trait ValueBuilder<'a>: Sized {
    /// The number type used in this value.
    type Number: NumberBuilder;

    /// The string type used in this value.
    type String: StringBuilder<'a>;

    /// Build a KDL value from `null`.
    fn from_null() -> Self;

    /// Build a KDL value from `true` or `false`.
    fn from_bool(value: bool) -> Self;

    /// Build a KDL value from a number.
    fn from_number(value: Self::Number) -> Self;

    /// Build a KDL value from an escaped string.
    fn from_string(value: Self::String) -> Self;

    /// Build a KDL value from a raw string and the hash count of its guard.
    fn from_raw_string(value: Self::String, hashes: usize) -> Self;
}

/// The unit type can be used as a value builder in cases where the caller
/// doesn't care about the actual content of the value.
impl ValueBuilder<'_> for () {
    type Number = ();
    type String = ();

    fn from_null() {}
    fn from_bool(_value: bool) {}
    fn from_number(_value: Self::Number) {}
    fn from_string(_value: Self::String) {}
    fn from_raw_string(_value: Self::String, _hashes: usize) {}
}

/// Parse any one KDL value: a string of either kind, a number, or a keyword.
/// A bare word that isn't a keyword is a failure, since nothing else can
/// appear in value position.
pub fn parse_bare_value<'i, T, E>(input: &'i str) -> IResult<&'i str, T, E>
where
    T: ValueBuilder<'i>,
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
    E: ContextError<&'i str, &'static str>,
{
    alt((
        parse_raw_string
            .map(|(hashes, payload)| T::from_raw_string(T::String::from_str(payload), hashes))
            .context("raw string"),
        parse_escaped_string.map(T::from_string).context("string"),
        parse_number.map(T::from_number).context("number"),
        parse_keyword
            .map(|keyword| match keyword {
                Keyword::Bool(value) => T::from_bool(value),
                Keyword::Null => T::from_null(),
            })
            .context("keyword"),
    ))
    .parse(input)
}
