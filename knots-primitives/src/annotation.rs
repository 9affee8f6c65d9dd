/*!
Parsers and types related to annotations, which are optional string tags that
can precede nodes and values. Usually used for type hinting, especially in
dynamic languages.
*/

use nom::{
    branch::alt,
    character::complete::char,
    combinator::success,
    error::{FromExternalError, ParseError},
    IResult, Parser,
};
use nom_supreme::{context::ContextError, tag::TagError, ParserExt};

use crate::{
    error::LexError,
    string::{parse_identifier, StringBuilder},
    whitespace::parse_plain_whitespace,
};

/// Parse an annotation, which is an identifier enclosed in parentheses.
/// Whitespace is permitted inside the parentheses.
pub fn parse_annotation<'i, T, E>(input: &'i str) -> IResult<&'i str, T, E>
where
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
    E: ContextError<&'i str, &'static str>,
    T: StringBuilder<'i>,
{
    parse_identifier
        .preceded_by(parse_plain_whitespace.opt())
        .terminated(parse_plain_whitespace.opt())
        .terminated(char(')'))
        .cut()
        .preceded_by(char('('))
        .parse(input)
}

/// Trait for annotations. An annotation is essentially an optional string;
/// this trait allows for abstracting over cases where the caller doesn't care
/// about the annotation, or only cares about the *presence* of an annotation.
/// Used as the return type for [`parse_maybe_annotation`].
pub trait AnnotationBuilder<'i> {
    /// String type for the annotation
    type String: StringBuilder<'i>;

    /// There was no annotation
    #[must_use]
    fn absent() -> Self;

    /// There was an annotation
    #[must_use]
    fn annotated(annotation: Self::String) -> Self;
}

/// The unit type can be used as an annotation type in cases where the caller
/// doesn't care about the presence or value of an annotation.
impl<'i> AnnotationBuilder<'i> for () {
    type String = ();

    #[must_use]
    #[inline]
    fn absent() -> Self {}

    #[must_use]
    #[inline]
    fn annotated(_annotation: Self::String) -> Self {}
}

impl<'i, S: StringBuilder<'i>> AnnotationBuilder<'i> for Option<S> {
    type String = S;

    #[must_use]
    #[inline]
    fn absent() -> Self {
        None
    }

    #[must_use]
    #[inline]
    fn annotated(annotation: Self::String) -> Self {
        Some(annotation)
    }
}

/// Try to parse an annotation, but succeed if there is none present. Uses
/// [`AnnotationBuilder`] as a return type. Returns an error if the opening
/// parenthesis exists but an error occurred inside.
pub fn parse_maybe_annotation<'i, T, E>(input: &'i str) -> IResult<&'i str, T, E>
where
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
    E: ContextError<&'i str, &'static str>,
    T: AnnotationBuilder<'i>,
{
    alt((
        parse_annotation.map(T::annotated),
        success(()).map(|()| T::absent()),
    ))
    .parse(input)
}

#[cfg(test)]
mod tests {
    use nom::error::Error;

    use super::*;

    fn parse(input: &str) -> IResult<&str, Option<String>, Error<&str>> {
        parse_maybe_annotation(input)
    }

    #[test]
    fn absent() {
        assert_eq!(parse("hello world"), Ok(("hello world", None)));
    }

    #[test]
    fn present() {
        assert_eq!(
            parse("(type)hello world"),
            Ok(("hello world", Some("type".to_owned())))
        );
    }

    #[test]
    fn present_quoted() {
        assert_eq!(
            parse("(\"ty pe\")hello world"),
            Ok(("hello world", Some("ty pe".to_owned())))
        );
    }

    #[test]
    fn present_raw() {
        assert_eq!(
            parse("(r\"type\")hello"),
            Ok(("hello", Some("type".to_owned())))
        );
    }

    #[test]
    fn inner_whitespace() {
        assert_eq!(parse("( type )hello"), Ok(("hello", Some("type".to_owned()))));
    }

    #[test]
    fn empty_parens() {
        parse("()hello").expect_err("parse success");
    }

    #[test]
    fn number_annotation() {
        parse("(123)hello").expect_err("parse success");
    }

    #[test]
    fn unterminated() {
        parse("(type hello").expect_err("parse success");
    }
}
