/*!
Parsers and utility types for parsing KDL numbers. KDL numbers come in four
radices; the parsers here preserve the radix (and, for hex, the source
digits) so that a printer can reproduce the notation the document used.

# Number type logic

A decimal number with no fractional part is kept as an integer mantissa and
exponent, so `1e3` survives a round trip as written. A decimal number with a
fractional part is parsed as an `f64`. Binary, octal, and hex numbers are
always integers in this dialect.
*/

use arrayvec::ArrayString;
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::recognize,
    error::{ErrorKind, FromExternalError, ParseError},
    multi::many0_count,
    sequence::pair,
    Err as NomErr, IResult, Parser,
};
use nom_supreme::{
    tag::{complete::tag, TagError},
    ParserExt,
};

use crate::{error::LexError, string::is_identifier};

/// The parsed sign of a number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Positive, `+`. No sign character is assumed positive.
    Positive,

    /// Negative, `-`.
    Negative,
}

impl Sign {
    fn apply(self, magnitude: i128) -> i128 {
        match self {
            Sign::Positive => magnitude,
            Sign::Negative => -magnitude,
        }
    }
}

/// The radix of a non-decimal number literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    /// `0b`
    Binary,

    /// `0o`
    Octal,

    /// `0x`
    Hex,
}

impl Radix {
    /// The numeric base of this radix
    pub fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Octal => 8,
            Radix::Hex => 16,
        }
    }
}

/// A base-10 KDL number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KdlDecimal {
    /// A number with no fractional part. The mantissa and exponent are kept
    /// separately so `12e3` can be reprinted in the notation it was written
    /// in.
    Integer {
        /// The signed mantissa
        mantissa: i128,

        /// The signed power-of-ten exponent. Zero when the source had no
        /// exponent.
        exponent: i32,
    },

    /// A number with a fractional part
    Float(f64),
}

/// A KDL number, preserving the radix it was written in.
#[derive(Debug, Clone, PartialEq)]
pub enum KdlNumber {
    /// A base-10 number, possibly fractional
    Decimal(KdlDecimal),

    /// A `0x` number. The source digits (minus any underscores, case
    /// preserved) are kept alongside the value; printers should prefer them.
    Hex {
        /// The signed value
        value: i128,

        /// The digits as written, without underscores or sign
        digits: String,
    },

    /// A `0o` number
    Octal(i128),

    /// A `0b` number
    Binary(i128),
}

impl KdlNumber {
    /// Get this number as an integer, if it has no fractional part. Decimal
    /// numbers with a non-negative exponent are scaled; a negative exponent
    /// means the number isn't (necessarily) whole, and overflow during
    /// scaling also returns None.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            KdlNumber::Decimal(KdlDecimal::Integer { mantissa, exponent }) => {
                if exponent < 0 {
                    return None;
                }

                (0..exponent).try_fold(mantissa, |value, _| value.checked_mul(10))
            }
            KdlNumber::Decimal(KdlDecimal::Float(_)) => None,
            KdlNumber::Hex { value, .. } => Some(value),
            KdlNumber::Octal(value) => Some(value),
            KdlNumber::Binary(value) => Some(value),
        }
    }

    /// Get this number as a float
    pub fn as_f64(&self) -> f64 {
        match *self {
            KdlNumber::Decimal(KdlDecimal::Integer { mantissa, exponent }) => {
                (mantissa as f64) * 10f64.powi(exponent)
            }
            KdlNumber::Decimal(KdlDecimal::Float(value)) => value,
            KdlNumber::Hex { value, .. } => value as f64,
            KdlNumber::Octal(value) => value as f64,
            KdlNumber::Binary(value) => value as f64,
        }
    }
}

impl From<i128> for KdlNumber {
    fn from(value: i128) -> Self {
        KdlNumber::Decimal(KdlDecimal::Integer {
            mantissa: value,
            exponent: 0,
        })
    }
}

impl From<i64> for KdlNumber {
    fn from(value: i64) -> Self {
        Self::from(value as i128)
    }
}

impl From<f64> for KdlNumber {
    fn from(value: f64) -> Self {
        KdlNumber::Decimal(KdlDecimal::Float(value))
    }
}

/// Trait for building KDL numbers. Used to abstract over cases where the
/// caller might not care about the actual value of the number.
pub trait NumberBuilder: Sized {
    /// Receive a decimal number with no fractional part
    fn from_decimal_integer(mantissa: i128, exponent: i32) -> Self;

    /// Receive a decimal number with a fractional part
    fn from_decimal_float(value: f64) -> Self;

    /// Receive a binary, octal, or hex number. `digits` are the source
    /// digits, without underscores or sign.
    fn from_radix(radix: Radix, value: i128, digits: &str) -> Self;
}

/// The empty tuple can be used as a number builder in cases where it's only
/// necessary to recognize the presence of a number and not to parse it.
impl NumberBuilder for () {
    fn from_decimal_integer(_mantissa: i128, _exponent: i32) -> Self {}
    fn from_decimal_float(_value: f64) -> Self {}
    fn from_radix(_radix: Radix, _value: i128, _digits: &str) -> Self {}
}

impl NumberBuilder for KdlNumber {
    fn from_decimal_integer(mantissa: i128, exponent: i32) -> Self {
        KdlNumber::Decimal(KdlDecimal::Integer { mantissa, exponent })
    }

    fn from_decimal_float(value: f64) -> Self {
        KdlNumber::Decimal(KdlDecimal::Float(value))
    }

    fn from_radix(radix: Radix, value: i128, digits: &str) -> Self {
        match radix {
            Radix::Hex => KdlNumber::Hex {
                value,
                digits: digits.to_owned(),
            },
            Radix::Octal => KdlNumber::Octal(value),
            Radix::Binary => KdlNumber::Binary(value),
        }
    }
}

/// Parse a `+` or `-`
fn parse_sign<'i, E>(input: &'i str) -> IResult<&'i str, Sign, E>
where
    E: ParseError<&'i str>,
{
    alt((
        char('+').value(Sign::Positive),
        char('-').value(Sign::Negative),
    ))
    .parse(input)
}

/// Parse an optional `+` or `-`. Returns `Sign::Positive` if there was no sign.
fn parse_optional_sign<'i, E>(input: &'i str) -> IResult<&'i str, Sign, E>
where
    E: ParseError<&'i str>,
{
    parse_sign
        .opt()
        .map(|sign| sign.unwrap_or(Sign::Positive))
        .parse(input)
}

/// Parse `0x`, `0o`, or `0b`.
fn parse_radix_prefix<'i, E>(input: &'i str) -> IResult<&'i str, Radix, E>
where
    E: ParseError<&'i str> + TagError<&'i str, &'static str>,
{
    alt((
        tag("0x").value(Radix::Hex),
        tag("0o").value(Radix::Octal),
        tag("0b").value(Radix::Binary),
    ))
    .parse(input)
}

/// Recognize a run of digits in the given base, separated by single
/// underscores. An underscore must have a digit on both sides, so this stops
/// before a trailing underscore (which [`ensure_number_boundary`] will then
/// reject).
fn parse_digit_run<'i, E: ParseError<&'i str>>(base: u32) -> impl Parser<&'i str, &'i str, E> {
    recognize(pair(
        take_while1(move |c: char| c.is_digit(base)),
        many0_count(pair(
            char('_'),
            take_while1(move |c: char| c.is_digit(base)),
        )),
    ))
}

/// A number must end at a word boundary; `1_`, `1__2`, and `12px` all fail
/// here.
fn ensure_number_boundary<'i, E>(input: &'i str) -> IResult<&'i str, (), E>
where
    E: ParseError<&'i str>,
    E: FromExternalError<&'i str, LexError>,
{
    match input.chars().next() {
        Some(c) if is_identifier(c) => Err(malformed(input)),
        _ => Ok((input, ())),
    }
}

fn malformed<'i, E>(input: &'i str) -> NomErr<E>
where
    E: FromExternalError<&'i str, LexError>,
{
    NomErr::Failure(E::from_external_error(
        input,
        ErrorKind::Digit,
        LexError::MalformedNumber,
    ))
}

fn overflow<'i, E>(input: &'i str) -> NomErr<E>
where
    E: FromExternalError<&'i str, LexError>,
{
    NomErr::Failure(E::from_external_error(
        input,
        ErrorKind::MapRes,
        LexError::NumberOverflow,
    ))
}

/// Copy `source` without its underscores, using `buffer` as scratch space.
/// Returns None if the result doesn't fit the buffer.
fn without_underscores<'a>(source: &'a str, buffer: &'a mut ArrayString<64>) -> Option<&'a str> {
    if !source.contains('_') {
        return Some(source);
    }

    source
        .split('_')
        .try_for_each(|chunk| buffer.try_push_str(chunk).ok())?;

    Some(buffer.as_str())
}

/// Parse a binary, hex, or octal number
fn parse_radix_number<'i, T, E>(input: &'i str) -> IResult<&'i str, T, E>
where
    T: NumberBuilder,
    E: ParseError<&'i str>,
    E: TagError<&'i str, &'static str>,
    E: FromExternalError<&'i str, LexError>,
{
    let (tail, sign) = parse_optional_sign(input)?;
    let (tail, radix) = parse_radix_prefix(tail)?;

    let digits_start = tail;
    let (tail, digits) = parse_digit_run(radix.base())
        .parse(tail)
        .map_err(|_: NomErr<E>| malformed(digits_start))?;
    let (tail, ()) = ensure_number_boundary(tail)?;

    let mut buffer = ArrayString::new();
    let digits = without_underscores(digits, &mut buffer).ok_or_else(|| overflow(input))?;

    let magnitude =
        i128::from_str_radix(digits, radix.base()).map_err(|_| overflow(input))?;

    Ok((tail, T::from_radix(radix, sign.apply(magnitude), digits)))
}

/// Parse a decimal number, which may be an integer or a float.
fn parse_decimal_number<'i, T, E>(input: &'i str) -> IResult<&'i str, T, E>
where
    T: NumberBuilder,
    E: ParseError<&'i str>,
    E: FromExternalError<&'i str, LexError>,
{
    let (tail, sign) = parse_optional_sign(input)?;
    let (tail, int_digits) = parse_digit_run(10).parse(tail)?;

    let (tail, has_fraction) = match tail.strip_prefix('.') {
        None => (tail, false),
        Some(rest) => {
            let (tail, _digits) = parse_digit_run::<E>(10)
                .parse(rest)
                .map_err(|_| malformed(rest))?;
            (tail, true)
        }
    };

    let (tail, exponent) = match tail.strip_prefix(['e', 'E']) {
        None => (tail, None),
        Some(rest) => {
            let (rest, exp_sign) = parse_optional_sign(rest)?;
            let (tail, digits) = parse_digit_run::<E>(10)
                .parse(rest)
                .map_err(|_| malformed(rest))?;
            (tail, Some((exp_sign, digits)))
        }
    };

    let (tail, ()) = ensure_number_boundary(tail)?;

    let recognized = &input[..input.len() - tail.len()];

    let float_fallback = |input| {
        let mut buffer = ArrayString::new();
        without_underscores(recognized, &mut buffer)
            .and_then(|text| text.parse().ok())
            .map(T::from_decimal_float)
            .ok_or_else(|| overflow(input))
    };

    if has_fraction {
        return float_fallback(input).map(|value| (tail, value));
    }

    let mut buffer = ArrayString::new();
    let mantissa = without_underscores(int_digits, &mut buffer)
        .and_then(|digits| digits.parse::<i128>().ok())
        .map(|magnitude| sign.apply(magnitude));

    let exponent = match exponent {
        None => Some(0),
        Some((exp_sign, digits)) => {
            let mut buffer = ArrayString::new();
            without_underscores(digits, &mut buffer)
                .and_then(|digits| digits.parse::<i32>().ok())
                .map(|exp| match exp_sign {
                    Sign::Positive => exp,
                    Sign::Negative => -exp,
                })
        }
    };

    match (mantissa, exponent) {
        (Some(mantissa), Some(exponent)) => {
            Ok((tail, T::from_decimal_integer(mantissa, exponent)))
        }
        // Mantissa or exponent too large for the integer form; fall back to
        // parsing the whole literal as a float
        _ => float_fallback(input).map(|value| (tail, value)),
    }
}

/// Parse a KDL number
pub fn parse_number<'i, T, E>(input: &'i str) -> IResult<&'i str, T, E>
where
    T: NumberBuilder,
    E: ParseError<&'i str>,
    E: FromExternalError<&'i str, LexError>,
    E: TagError<&'i str, &'static str>,
{
    alt((
        // Important: Given the number "-0xFF", the "-0" is a valid decimal
        // integer. It is therefore important that we try the radix forms
        // *first*, then fall back to the decimal version.
        parse_radix_number,
        parse_decimal_number,
    ))
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer(mantissa: i128, exponent: i32) -> KdlNumber {
        KdlNumber::Decimal(KdlDecimal::Integer { mantissa, exponent })
    }

    fn hex(value: i128, digits: &str) -> KdlNumber {
        KdlNumber::Hex {
            value,
            digits: digits.to_owned(),
        }
    }

    macro_rules! test {
        ($test:ident: $input:literal ok $expected:expr, $tail:literal) => {
            #[test]
            fn $test() {
                let res: IResult<&str, KdlNumber, ()> = parse_number($input);
                assert_eq!(res, Ok(($tail, $expected)));
            }
        };

        ($test:ident: $input:literal err) => {
            #[test]
            fn $test() {
                let res: IResult<&str, (), ()> = parse_number($input);
                res.expect_err("parser succeeded");
            }
        };
    }

    macro_rules! tests {
        ($(
            $test:ident: $input:literal $state:ident $($expected:expr, $tail:literal)?;
        )*) => {
            $(
                test!{ $test: $input $state $($expected, $tail)? }
            )*
        };
    }

    tests! {
        decimal: "10 " ok integer(10, 0), " ";
        negative: "-10 " ok integer(-10, 0), " ";
        explicit_positive: "+10 " ok integer(10, 0), " ";
        underscores: "1_000_000 " ok integer(1000000, 0), " ";
        leading_zeros: "007 " ok integer(7, 0), " ";

        float: "-10.5 " ok KdlNumber::from(-10.5), " ";
        float_exponent: "10.5e3 " ok KdlNumber::from(10500.0), " ";

        integer_exponent: "1e3 " ok integer(1, 3), " ";
        negative_exponent: "2E-4 " ok integer(2, -4), " ";

        hexadecimal: "0xFF " ok hex(0xFF, "FF"), " ";
        neg_hex: "-0x0A " ok hex(-0x0A, "0A"), " ";
        hex_underscore: "0xFF_FF " ok hex(0xFFFF, "FFFF"), " ";

        binary: "0b00001111 " ok KdlNumber::Binary(15), " ";
        octal: "-0o777_7 " ok KdlNumber::Octal(-0o7777), " ";

        doubled_underscore: "1__2 " err;
        trailing_underscore: "1_ " err;
        bare_prefix: "0x " err;
        underscore_after_prefix: "0x_1 " err;
        underscore_after_point: "1._5 " err;
        missing_fraction: "1. " err;
        missing_exponent: "1e " err;
        word_after_number: "12px " err;
    }

    #[test]
    fn as_integer_scales_exponents() {
        assert_eq!(integer(12, 2).as_integer(), Some(1200));
        assert_eq!(integer(12, -1).as_integer(), None);
        assert_eq!(KdlNumber::from(1.5).as_integer(), None);
        assert_eq!(hex(31, "1F").as_integer(), Some(31));
    }
}
