/*!
Parsers and utility types for parsing KDL strings and identifiers.
 */

use std::ops::{Index, RangeFrom, RangeTo};

use memchr::{memchr, memchr2};
use nom::{
    bytes::complete::take_while_m_n,
    character::complete::char,
    combinator::success,
    error::{make_error, ErrorKind, FromExternalError, ParseError},
    Err as NomErr, IResult, Parser,
};
use nom_supreme::{
    context::ContextError,
    multi::parse_separated_terminated,
    tag::{complete::tag, TagError},
    ParserExt,
};

use crate::{
    error::LexError,
    whitespace::{is_newline, is_whitespace},
};

/// Helper trait for parsing strings with escape sequences. Allows for returning
/// built strings without any allocation when the caller only needs to
/// recognize a string rather than keep it.
pub trait StringBuilder<'a>: Sized {
    /// Add a borrowed string to the back of this string
    fn push_str(&mut self, s: &'a str);

    /// Add a char to the back of this string
    fn push_char(&mut self, c: char);

    /// Create a new instance from a borrowed string
    fn from_str(s: &'a str) -> Self;

    /// Create a new empty instance
    fn empty() -> Self {
        Self::from_str("")
    }
}

/// The empty tuple can be used as a string builder in cases where it's only
/// necessary to recognize a string and not to parse it
impl<'a> StringBuilder<'a> for () {
    fn push_str(&mut self, _s: &'a str) {}
    fn push_char(&mut self, _c: char) {}
    fn from_str(_s: &'a str) {}
}

/// Strings can, of course, be built
impl<'a> StringBuilder<'a> for String {
    fn push_str(&mut self, s: &'a str) {
        self.push_str(s)
    }

    fn push_char(&mut self, c: char) {
        self.push(c)
    }

    fn from_str(s: &'a str) -> Self {
        s.to_owned()
    }
}

struct SliceShifter<'a, T: ?Sized> {
    base: &'a T,
    point: usize,
}

impl<'a, T: ?Sized, A: ?Sized, B: ?Sized> SliceShifter<'a, T>
where
    T: Index<RangeTo<usize>, Output = A>,
    T: Index<RangeFrom<usize>, Output = B>,
{
    fn new(base: &'a T) -> Self {
        Self { base, point: 0 }
    }

    fn head(&self) -> &'a A {
        &self.base[..self.point]
    }

    fn tail(&self) -> &'a B {
        &self.base[self.point..]
    }

    fn shift(&mut self, amount: usize) {
        self.point += amount
    }
}

/// Parse a raw string, resembling `r##"abc"##`. Returns the number of hashes
/// in the opening guard along with the payload; the closing guard must use
/// the same count.
pub fn parse_raw_string<'i, E>(input: &'i str) -> IResult<&'i str, (usize, &'i str), E>
where
    E: ParseError<&'i str>,
    E: FromExternalError<&'i str, LexError>,
{
    let unterminated = || {
        NomErr::Failure(E::from_external_error(
            input,
            ErrorKind::Eof,
            LexError::UnterminatedRawString,
        ))
    };

    let (body, hash_count) =
        parse_separated_terminated(char('#'), success(()), char('"'), || 0, |n, _c| n + 1)
            .or(char('"').value(0))
            .preceded_by(char('r'))
            .parse(input)?;

    let mut shifter = SliceShifter::new(body);

    loop {
        match memchr(b'"', shifter.tail().as_bytes()) {
            // Couldn't find any quotes; need more input
            None => return Err(unterminated()),

            // Found a quote; search the successor bytes for hashes
            Some(quote_idx) => {
                shifter.shift(quote_idx);
                let payload = shifter.head();
                shifter.shift(1);

                match shifter.tail().as_bytes().get(0..hash_count) {
                    // Bounds error here means the input isn't large enough to
                    // contain the hash bytes; this is an unexpected EoF
                    None => return Err(unterminated()),

                    // Found our chunk; if it's all hashes, this is the end of
                    // the string
                    Some(chunk) => {
                        if chunk.iter().all(|&b| b == b'#') {
                            shifter.shift(hash_count);
                            return Ok((shifter.tail(), (hash_count, payload)));
                        }
                    }
                }
            }
        }
    }
}

/// Returns true if this is not considered a "non-identifier character"
#[inline]
pub fn is_identifier(c: char) -> bool {
    u32::from(c) > 0x20
        && !is_whitespace(c)
        && !is_newline(c)
        && !matches!(
            c,
            '\\' | '/' | '(' | ')' | '{' | '}' | '<' | '>' | ';' | '[' | ']' | '=' | ',' | '"'
        )
}

/// Returns true if this is not considered a "non-initial character"
#[inline]
pub fn is_initial_identifier(c: char) -> bool {
    is_identifier(c) && !c.is_ascii_digit()
}

/// Returns true if `text` would lex as a single bare identifier. This doesn't
/// consider keywords; `true` is identifier shaped even though it must be
/// quoted in identifier position.
pub fn is_bare_identifier(text: &str) -> bool {
    let mut chars = text.chars();

    match chars.next() {
        Some(c) if is_initial_identifier(c) => {
            let number_like =
                matches!(c, '+' | '-') && matches!(chars.clone().next(), Some(d) if d.is_ascii_digit());
            !number_like && chars.all(is_identifier)
        }
        _ => false,
    }
}

/// Parse a KDL bare identifier. A sign character may begin an identifier,
/// but not when a digit follows it; that text is a number.
pub fn parse_bare_identifier<'i, E: ParseError<&'i str>>(
    input: &'i str,
) -> IResult<&'i str, &'i str, E> {
    let mut chars = input.chars();
    match chars.next() {
        Some(c) if is_initial_identifier(c) => {
            if matches!(c, '+' | '-')
                && matches!(chars.clone().next(), Some(d) if d.is_ascii_digit())
            {
                return Err(NomErr::Error(make_error(input, ErrorKind::Alpha)));
            }

            let split_point = chars
                .as_str()
                .find(|c: char| !is_identifier(c))
                .unwrap_or_else(|| chars.as_str().len())
                + c.len_utf8();
            let (ident, tail) = input.split_at(split_point);
            Ok((tail, ident))
        }
        _ => Err(NomErr::Error(make_error(input, ErrorKind::Alpha))),
    }
}

// Parse a string matching u{00F1} as an escaped unicode code point. Rejects
// surrogates and values above U+10FFFF.
fn parse_unicode_escape<'i, E>(input: &'i str) -> IResult<&'i str, char, E>
where
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
{
    take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit())
        .map(|s| u32::from_str_radix(s, 16).expect("failed to parse 1-6 hex digits to a u32?"))
        .map_res(|value: u32| char::try_from(value).map_err(|_| LexError::InvalidUnicodeEscape(value)))
        .terminated(char('}'))
        .cut()
        .preceded_by(tag("u{"))
        .parse(input)
}

fn parse_escape<'i, E>(input: &'i str) -> IResult<&'i str, char, E>
where
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
{
    let (tail, _) = char('\\').parse(input)?;
    let mut chars = tail.chars();

    let escaped = match chars.next() {
        None => {
            return Err(NomErr::Failure(E::from_external_error(
                input,
                ErrorKind::Eof,
                LexError::UnterminatedString,
            )))
        }
        Some('u') => {
            return parse_unicode_escape(tail).map_err(|err| match err {
                NomErr::Error(_) => NomErr::Failure(E::from_external_error(
                    input,
                    ErrorKind::Tag,
                    LexError::InvalidEscape('u'),
                )),
                err => err,
            })
        }
        Some('n') => '\n',
        Some('r') => '\r',
        Some('t') => '\t',
        Some('\\') => '\\',
        Some('/') => '/',
        Some('"') => '"',
        Some('b') => '\u{08}',
        Some('f') => '\u{0C}',
        Some(c) => {
            return Err(NomErr::Failure(E::from_external_error(
                input,
                ErrorKind::Char,
                LexError::InvalidEscape(c),
            )))
        }
    };

    Ok((chars.as_str(), escaped))
}

/// Parse a regular, quoted string (with escape sequences). An unterminated
/// string is reported at the opening quote.
pub fn parse_escaped_string<'i, T, E>(input: &'i str) -> IResult<&'i str, T, E>
where
    T: StringBuilder<'i>,
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
{
    let (mut tail, _) = char('"').parse(input)?;
    let mut string = T::empty();

    loop {
        match memchr2(b'"', b'\\', tail.as_bytes()) {
            None => {
                return Err(NomErr::Failure(E::from_external_error(
                    input,
                    ErrorKind::Char,
                    LexError::UnterminatedString,
                )))
            }
            Some(i) => {
                let (chunk, rest) = tail.split_at(i);
                if !chunk.is_empty() {
                    string.push_str(chunk);
                }

                if rest.as_bytes()[0] == b'"' {
                    return Ok((&rest[1..], string));
                }

                let (rest, c) = parse_escape(rest)?;
                string.push_char(c);
                tail = rest;
            }
        }
    }
}

/// Parse a KDL string, which is either a raw or escaped string. The
/// distinction between the two kinds is discarded; use
/// [`parse_escaped_string`] and [`parse_raw_string`] directly when it
/// matters.
pub fn parse_string<'i, T, E>(input: &'i str) -> IResult<&'i str, T, E>
where
    T: StringBuilder<'i>,
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
    E: ContextError<&'i str, &'static str>,
{
    parse_escaped_string
        .context("escaped string")
        .or(parse_raw_string
            .map(|(_hashes, payload)| T::from_str(payload))
            .context("raw string"))
        .parse(input)
}

/// Parse a KDL identifier, which is either a bare identifer or a string
pub fn parse_identifier<'i, T, E>(input: &'i str) -> IResult<&'i str, T, E>
where
    T: StringBuilder<'i>,
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
    E: ContextError<&'i str, &'static str>,
{
    parse_bare_identifier
        .map(T::from_str)
        .context("bare identifier")
        .or(parse_string.context("string"))
        .parse(input)
}

#[cfg(test)]
mod test_parse_raw {
    use super::*;
    use cool_asserts::assert_matches;
    use nom::error::Error;

    fn typed_parse_raw(input: &str) -> IResult<&str, (usize, &str), Error<&str>> {
        parse_raw_string(input)
    }

    #[test]
    fn hashless() {
        assert_eq!(typed_parse_raw(r#"r"abc"def"#), Ok(("def", (0, "abc"))))
    }

    #[test]
    fn hashed() {
        assert_eq!(
            typed_parse_raw(r####"r##"abc"##def"####),
            Ok(("def", (2, "abc")))
        )
    }

    #[test]
    fn inner_hashes() {
        assert_eq!(
            typed_parse_raw(r####"r##"abc"#abc"##def"####),
            Ok(("def", (2, r##"abc"#abc"##)))
        )
    }

    #[test]
    fn extra_hashes() {
        assert_eq!(typed_parse_raw(r####"r##"abc"###"####), Ok(("#", (2, "abc"))))
    }

    #[test]
    fn unfinished() {
        assert_matches!(
            typed_parse_raw(r####"r###"abc"####),
            Err(NomErr::Failure(Error { input, .. })) => assert!(input.starts_with("r###"))
        )
    }

    #[test]
    fn partially_finished() {
        assert_matches!(
            typed_parse_raw(r####"r###"abc"#"####),
            Err(NomErr::Failure(Error { input, .. })) => assert!(input.starts_with("r###"))
        )
    }

    #[test]
    fn not_regular_string() {
        assert_matches!(
            typed_parse_raw(r##""abc""##),
            Err(NomErr::Error(Error {
                input: r##""abc""##,
                ..
            }))
        )
    }

    #[test]
    fn not_identifier() {
        assert_matches!(
            typed_parse_raw("abc"),
            Err(NomErr::Error(Error { input: "abc", .. }))
        )
    }

    #[test]
    fn not_r_identifier() {
        assert_matches!(
            typed_parse_raw("raw"),
            Err(NomErr::Error(Error { input: "aw", .. }))
        )
    }
}

#[cfg(test)]
mod test_parse_identifier {
    use super::*;
    use nom::error::{Error, ErrorKind};

    fn typed_parse_identifier(input: &str) -> IResult<&str, &str, Error<&str>> {
        parse_bare_identifier(input)
    }

    #[test]
    fn basic() {
        assert_eq!(typed_parse_identifier("abc abc"), Ok((" abc", "abc")))
    }

    #[test]
    fn with_num() {
        assert_eq!(typed_parse_identifier("abc123 abc"), Ok((" abc", "abc123")))
    }

    #[test]
    fn to_end_of_input() {
        assert_eq!(typed_parse_identifier("abc"), Ok(("", "abc")))
    }

    #[test]
    fn start_with_digit() {
        assert_eq!(
            typed_parse_identifier("123"),
            Err(NomErr::Error(Error {
                input: "123",
                code: ErrorKind::Alpha
            }))
        )
    }

    #[test]
    fn with_punctuation() {
        assert_eq!(
            typed_parse_identifier("abc-def_ghi 123"),
            Ok((" 123", "abc-def_ghi"))
        )
    }

    #[test]
    fn is_dash() {
        assert_eq!(typed_parse_identifier("- 10"), Ok((" 10", "-")))
    }

    #[test]
    fn sign_then_letter() {
        assert_eq!(typed_parse_identifier("+foo 10"), Ok((" 10", "+foo")))
    }

    #[test]
    fn sign_then_digit_is_a_number() {
        assert_eq!(
            typed_parse_identifier("-10 20"),
            Err(NomErr::Error(Error {
                input: "-10 20",
                code: ErrorKind::Alpha
            }))
        )
    }

    #[test]
    fn stops_at_unicode_space() {
        assert_eq!(typed_parse_identifier("abc\u{3000}x"), Ok(("\u{3000}x", "abc")))
    }

    #[test]
    fn bare_shapes() {
        assert!(is_bare_identifier("foo"));
        assert!(is_bare_identifier("foo-bar123"));
        assert!(is_bare_identifier("+foo"));
        assert!(is_bare_identifier("-"));
        assert!(!is_bare_identifier(""));
        assert!(!is_bare_identifier("5cents"));
        assert!(!is_bare_identifier("-5"));
        assert!(!is_bare_identifier("two words"));
        assert!(!is_bare_identifier("semi;colon"));
    }
}

#[cfg(test)]
mod test_parse_escaped_string {
    use super::*;
    use cool_asserts::assert_matches;
    use nom::error::Error;

    fn typed_parse_string(input: &str) -> IResult<&str, String, Error<&str>> {
        parse_escaped_string(input)
    }

    #[test]
    fn basic() {
        assert_eq!(typed_parse_string("\"hello\" abc"), Ok((" abc", "hello".to_owned())))
    }

    #[test]
    fn empty() {
        assert_eq!(typed_parse_string("\"\" abc"), Ok((" abc", String::new())))
    }

    #[test]
    fn with_escape() {
        assert_eq!(
            typed_parse_string("\"hello \\t world\" abc"),
            Ok((" abc", "hello \t world".to_owned()))
        );
    }

    #[test]
    fn with_escaped_unicode() {
        assert_eq!(
            typed_parse_string("\"hello\\u{0A}world\" abc"),
            Ok((" abc", "hello\nworld".to_owned()))
        );
    }

    #[test]
    fn unterminated() {
        assert_matches!(
            typed_parse_string("\"hello"),
            Err(NomErr::Failure(Error { input: "\"hello", .. }))
        );
    }

    #[test]
    fn bad_escape() {
        assert_matches!(
            typed_parse_string("\"hel\\qlo\""),
            Err(NomErr::Failure(Error { input, .. })) => assert!(input.starts_with("\\q"))
        );
    }

    #[test]
    fn surrogate_escape() {
        assert_matches!(
            typed_parse_string("\"bad \\u{D800} escape\""),
            Err(NomErr::Failure(_))
        );
    }

    #[test]
    fn escape_out_of_range() {
        assert_matches!(
            typed_parse_string("\"bad \\u{110000} escape\""),
            Err(NomErr::Failure(_))
        );
    }
}
