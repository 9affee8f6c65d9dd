/*!
Various whitespace parsers. We never care about the contents of whitespace so
they always return `()`
*/

use nom::{
    branch::alt,
    character::complete::{char, satisfy},
    combinator::eof,
    error::{make_error, ErrorKind, FromExternalError, ParseError},
    Err as NomErr, IResult, Parser,
};
use nom_supreme::{
    tag::{complete::tag, TagError},
    ParserExt,
};

use crate::{
    error::LexError,
    util::{at_least_one, back},
};

/// Returns true for the KDL `ws` production: tab, space, and the fixed set
/// of Unicode space characters. Newlines are *not* whitespace; see
/// [`is_newline`].
#[inline]
pub fn is_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'
            | '\u{0020}'
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Returns true for any KDL line terminator character. CRLF is two such
/// characters but is consumed atomically by [`parse_newline`].
#[inline]
pub fn is_newline(c: char) -> bool {
    matches!(
        c,
        '\r' | '\n' | '\u{85}' | '\u{0C}' | '\u{2028}' | '\u{2029}'
    )
}

enum BlockCommentTag {
    Start,
    End,
}

/// Parse the part of a multi line comment that comes after the /*. Operates
/// recursively.
fn finish_block_comment<'i, E>(mut input: &'i str) -> IResult<&'i str, (), E>
where
    E: ParseError<&'i str>,
{
    let back = back(input);

    loop {
        let event = input
            .as_bytes()
            .windows(2)
            .enumerate()
            .find_map(|(i, tag)| match tag {
                b"/*" => Some((i, BlockCommentTag::Start)),
                b"*/" => Some((i, BlockCommentTag::End)),
                _ => None,
            });

        match event {
            None => return Err(NomErr::Error(make_error(back, ErrorKind::Eof))),
            Some((i, BlockCommentTag::End)) => return Ok((&input[i + 2..], ())),
            Some((i, BlockCommentTag::Start)) => {
                let (tail, ()) = finish_block_comment(&input[i + 2..])?;
                input = tail;
            }
        }
    }
}

/// Parse a multi line comment, which may be nested. An unterminated comment
/// is reported at the opening `/*`.
pub fn parse_block_comment<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
{
    let (tail, _) = tag("/*").parse(input)?;

    finish_block_comment::<E>(tail).map_err(|_| {
        NomErr::Failure(E::from_external_error(
            input,
            ErrorKind::TakeUntil,
            LexError::UnterminatedBlockComment,
        ))
    })
}

/// Parse any amount (1 or more) of plain non-newline whitespace, including
/// multiline comments
pub fn parse_plain_whitespace<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
{
    at_least_one(satisfy(is_whitespace).value(()).or(parse_block_comment)).parse(input)
}

/// Parse a single newline
pub fn parse_newline<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
{
    alt((
        tag("\r\n").value('\n'),
        char('\r'),
        char('\n'),
        char('\u{85}'),
        char('\u{0C}'),
        char('\u{2028}'),
        char('\u{2029}'),
    ))
    .value(())
    .parse(input)
}

/// Parse a single `//` style comment, terminated by a newline.
pub fn parse_single_line_comment<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: TagError<&'i str, &'static str>,
    E: ParseError<&'i str>,
{
    let (input, _) = tag("//").parse(input)?;
    match input
        .char_indices()
        .find_map(|(i, c)| is_newline(c).then(|| i))
    {
        None => Ok((back(input), ())),
        Some(i) => {
            let input = &input[i..];
            parse_newline(input)
        }
    }
}

/// Parse a normal line terminator (newline or single line comment)
pub fn parse_endline<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: TagError<&'i str, &'static str>,
    E: ParseError<&'i str>,
{
    alt((parse_newline, parse_single_line_comment)).parse(input)
}

/// Parse 0 or more linespace. Linespace is any endline or plain whitespace
pub fn parse_linespace<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: TagError<&'i str, &'static str>,
    E: ParseError<&'i str>,
    E: FromExternalError<&'i str, LexError>,
{
    at_least_one(alt((parse_endline, parse_plain_whitespace)))
        .opt()
        .value(())
        .parse(input)
}

/// Parse a single escline. An escline is an endline that doesn't count as a
/// line terminator (because it's preceeded by an escape), preceeded by 0 or
/// more plain whitespace. It is an error for the escape to not be followed
/// by an endline.
pub fn parse_escaped_endline<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: TagError<&'i str, &'static str>,
    E: ParseError<&'i str>,
    E: FromExternalError<&'i str, LexError>,
{
    char('\\')
        .precedes(parse_plain_whitespace.opt())
        .precedes(parse_endline.cut())
        .parse(input)
}

/// Parse 1 or more nodespace. A nodespace is the whitespace that exists between
/// components of a node; conceptually it's all kinds of non-newline whitespace,
/// plus escaped newlines
pub fn parse_node_space<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: TagError<&'i str, &'static str>,
    E: ParseError<&'i str>,
    E: FromExternalError<&'i str, LexError>,
{
    at_least_one(alt((parse_plain_whitespace, parse_escaped_endline))).parse(input)
}

/// Parse a node terminator, which is an endline, eof, or semicolon
pub fn parse_node_terminator<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: TagError<&'i str, &'static str>,
    E: ParseError<&'i str>,
{
    alt((parse_endline, eof.value(()), char(';').value(()))).parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test {
        ($test:ident: $parser:ident($input:literal) ok $tail:literal) => {
            #[test]
            fn $test() {
                let res: IResult<&str, (), (&str, nom::error::ErrorKind)> = $parser($input);
                let (tail, ()) = res.expect("parse failed");
                assert_eq!(tail, $tail);
            }
        };

        ($test:ident: $parser:ident($input:literal) err $location:literal) => {
            #[test]
            fn $test() {
                let res: IResult<&str, (), (&str, nom::error::ErrorKind)> = $parser($input);
                cool_asserts::assert_matches!(res, Err(nom::Err::Error(($location, _))));
            }
        };

        ($test:ident: $parser:ident($input:literal) fail $location:literal) => {
            #[test]
            fn $test() {
                let res: IResult<&str, (), (&str, nom::error::ErrorKind)> = $parser($input);
                cool_asserts::assert_matches!(res, Err(nom::Err::Failure(($location, _))));
            }
        };
    }

    macro_rules! tests {
        ($parser:ident: $(
            $test:ident: $input:literal $state:ident $tail:literal;
        )*) => {
            mod $parser {
                use super::*;

                $(
                    test!{ $test: $parser($input) $state $tail }
                )*
            }
        };
    }

    tests! {
        parse_block_comment:

        basic: "/* abc */ def" ok " def";
        newlines: "/*\nabc\n123*/ def" ok " def";
        nested: "/* abc /* 123 */ def */ 456" ok " 456";

        missing_terminator: "/* 123" fail "/* 123";

        missing_nested_terminator: "/* 123 /* abc */ def" fail "/* 123 /* abc */ def";

        adjacent: "/* 123 */ abc /* 456 */ def" ok " abc /* 456 */ def";
    }

    tests! {
        parse_node_space:

        plain: "  \u{00A0} abc" ok "abc";
        comment: " /* inline */ abc" ok "abc";
        escline: " \\\nabc" ok "abc";
        escline_comment: " \\ // note\nabc" ok "abc";

        empty: "abc" err "abc";
    }

    tests! {
        parse_node_terminator:

        newline: "\nabc" ok "abc";
        crlf: "\r\nabc" ok "abc";
        semicolon: ";abc" ok "abc";
        comment: "// abc\ndef" ok "def";
        comment_eof: "// abc" ok "";
        eof: "" ok "";

        not_terminated: "abc" err "abc";
    }
}
