/*!
The value model: KDL literals as written, optional tags, and the host-native
values that tagged literals convert into.
*/

use std::net::{Ipv4Addr, Ipv6Addr};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use knots_primitives::{
    number::{KdlDecimal, KdlNumber},
    value::ValueBuilder,
};

use crate::key::ValueKey;

/// A KDL literal, as written in a document. String and raw-string literals
/// are kept distinct (and raw strings remember their hash count) so that a
/// printer can reproduce the form the document used.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A `"..."` string
    String(String),

    /// An `r#"..."#` string
    RawString {
        /// The string contents
        value: String,

        /// The hash count of the guard used in the source
        hashes: usize,
    },

    /// A number in any radix
    Number(KdlNumber),

    /// `true` or `false`
    Bool(bool),

    /// `null`
    Null,

    /// Preformatted text that the printer emits verbatim. The parser never
    /// produces this; it exists so that [`ToKdl`] implementations can demand
    /// bit-exact output.
    Exact(String),
}

impl Literal {
    pub(crate) fn kind(&self) -> ValueKind {
        match self {
            Literal::String(_) | Literal::RawString { .. } => ValueKind::String,
            Literal::Number(_) => ValueKind::Number,
            Literal::Bool(_) => ValueKind::Bool,
            Literal::Null => ValueKind::Null,
            Literal::Exact(_) => ValueKind::Exact,
        }
    }

    /// Convert this literal into its host-native equivalent: the string
    /// contents, an integer for exponent-free whole decimals and all
    /// hex/octal/binary numbers, a float for everything else numeric, a
    /// bool, or null.
    pub fn into_native(self) -> Native {
        match self {
            Literal::String(value) | Literal::RawString { value, .. } => Native::String(value),
            Literal::Number(KdlNumber::Decimal(KdlDecimal::Integer {
                mantissa,
                exponent: 0,
            })) => Native::Int(mantissa),
            Literal::Number(number @ KdlNumber::Decimal(_)) => Native::Float(number.as_f64()),
            Literal::Number(number) => match number.as_integer() {
                Some(value) => Native::Int(value),
                // Unreachable today; hex/octal/binary are always whole
                None => Native::Float(number.as_f64()),
            },
            Literal::Bool(value) => Native::Bool(value),
            Literal::Null => Native::Null,
            Literal::Exact(value) => Native::String(value),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value.into())
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_owned())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl ValueBuilder<'_> for Literal {
    type Number = KdlNumber;
    type String = String;

    fn from_null() -> Self {
        Literal::Null
    }

    fn from_bool(value: bool) -> Self {
        Literal::Bool(value)
    }

    fn from_number(value: KdlNumber) -> Self {
        Literal::Number(value)
    }

    fn from_string(value: String) -> Self {
        Literal::String(value)
    }

    fn from_raw_string(value: String, hashes: usize) -> Self {
        Literal::RawString { value, hashes }
    }
}

/// A [`Literal`] together with its optional tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    /// The parenthesized tag, if any
    pub tag: Option<String>,

    /// The literal itself
    pub literal: Literal,
}

impl Value {
    /// Create an untagged value
    pub fn new(literal: impl Into<Literal>) -> Self {
        Self {
            tag: None,
            literal: literal.into(),
        }
    }

    /// Create a tagged value
    pub fn tagged(tag: impl Into<String>, literal: impl Into<Literal>) -> Self {
        Self {
            tag: Some(tag.into()),
            literal: literal.into(),
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Value::new(literal)
    }
}

/// A host-native value, produced by the built-in tag conversions (or by user
/// converters), rather than kept as a KDL literal.
#[derive(Debug, Clone)]
pub enum Native {
    /// From an `(i8)` tagged number
    I8(i8),
    /// From an `(i16)` tagged number
    I16(i16),
    /// From an `(i32)` tagged number
    I32(i32),
    /// From an `(i64)` tagged number
    I64(i64),
    /// From a `(u8)` tagged number
    U8(u8),
    /// From a `(u16)` tagged number
    U16(u16),
    /// From a `(u32)` tagged number
    U32(u32),
    /// From a `(u64)` tagged number
    U64(u64),
    /// From an `(f32)` tagged number
    F32(f32),
    /// From an `(f64)` tagged number
    F64(f64),

    /// An untagged whole number
    Int(i128),
    /// An untagged fractional number
    Float(f64),
    /// An untagged string
    String(String),
    /// An untagged bool
    Bool(bool),
    /// An untagged null
    Null,

    /// From a `(decimal)` tagged string or number
    Decimal(rust_decimal::Decimal),
    /// From a `(date-time)` tagged string
    DateTime(NaiveDateTime),
    /// From a `(date)` tagged string
    Date(NaiveDate),
    /// From a `(time)` tagged string
    Time(NaiveTime),
    /// From an `(ipv4)` tagged string
    Ipv4(Ipv4Addr),
    /// From an `(ipv6)` tagged string
    Ipv6(Ipv6Addr),
    /// From a `(url)` tagged string
    Url(url::Url),
    /// From a `(uuid)` tagged string
    Uuid(uuid::Uuid),
    /// From a `(regex)` tagged string
    Regex(regex::Regex),
    /// From a `(base64)` tagged string
    Bytes(Vec<u8>),
}

impl Native {
    pub(crate) fn kind(&self) -> ValueKind {
        match self {
            Native::I8(_)
            | Native::I16(_)
            | Native::I32(_)
            | Native::I64(_)
            | Native::U8(_)
            | Native::U16(_)
            | Native::U32(_)
            | Native::U64(_)
            | Native::F32(_)
            | Native::F64(_)
            | Native::Int(_)
            | Native::Float(_) => ValueKind::Number,
            Native::String(_) => ValueKind::String,
            Native::Bool(_) => ValueKind::Bool,
            Native::Null => ValueKind::Null,
            Native::Decimal(_) => ValueKind::Decimal,
            Native::DateTime(_) => ValueKind::DateTime,
            Native::Date(_) => ValueKind::Date,
            Native::Time(_) => ValueKind::Time,
            Native::Ipv4(_) | Native::Ipv6(_) => ValueKind::Ip,
            Native::Url(_) => ValueKind::Url,
            Native::Uuid(_) => ValueKind::Uuid,
            Native::Regex(_) => ValueKind::Regex,
            Native::Bytes(_) => ValueKind::Bytes,
        }
    }
}

impl PartialEq for Native {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Native::I8(a), Native::I8(b)) => a == b,
            (Native::I16(a), Native::I16(b)) => a == b,
            (Native::I32(a), Native::I32(b)) => a == b,
            (Native::I64(a), Native::I64(b)) => a == b,
            (Native::U8(a), Native::U8(b)) => a == b,
            (Native::U16(a), Native::U16(b)) => a == b,
            (Native::U32(a), Native::U32(b)) => a == b,
            (Native::U64(a), Native::U64(b)) => a == b,
            (Native::F32(a), Native::F32(b)) => a == b,
            (Native::F64(a), Native::F64(b)) => a == b,
            (Native::Int(a), Native::Int(b)) => a == b,
            (Native::Float(a), Native::Float(b)) => a == b,
            (Native::String(a), Native::String(b)) => a == b,
            (Native::Bool(a), Native::Bool(b)) => a == b,
            (Native::Null, Native::Null) => true,
            (Native::Decimal(a), Native::Decimal(b)) => a == b,
            (Native::DateTime(a), Native::DateTime(b)) => a == b,
            (Native::Date(a), Native::Date(b)) => a == b,
            (Native::Time(a), Native::Time(b)) => a == b,
            (Native::Ipv4(a), Native::Ipv4(b)) => a == b,
            (Native::Ipv6(a), Native::Ipv6(b)) => a == b,
            (Native::Url(a), Native::Url(b)) => a == b,
            (Native::Uuid(a), Native::Uuid(b)) => a == b,
            // Compiled regexes compare by their pattern text
            (Native::Regex(a), Native::Regex(b)) => a.as_str() == b.as_str(),
            (Native::Bytes(a), Native::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

/// Either a KDL value as written, or a host-native value produced by
/// conversion. This is what node arguments and properties actually store.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    /// A value kept in its KDL form
    Value(Value),

    /// A converted host-native value
    Native(Native),
}

impl AnyValue {
    /// The value's tag, if it has one. Converted native values no longer
    /// carry a tag.
    pub fn tag(&self) -> Option<&str> {
        match self {
            AnyValue::Value(value) => value.tag.as_deref(),
            AnyValue::Native(_) => None,
        }
    }

    /// The coarse type of this value, used by key matching
    pub fn kind(&self) -> ValueKind {
        match self {
            AnyValue::Value(value) => value.literal.kind(),
            AnyValue::Native(native) => native.kind(),
        }
    }

    /// True if this value is a null (in either form)
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            AnyValue::Value(Value {
                literal: Literal::Null,
                ..
            }) | AnyValue::Native(Native::Null)
        )
    }

    /// True if this value matches the given key
    pub fn matches(&self, key: &ValueKey) -> bool {
        key.matches(self)
    }
}

impl From<Value> for AnyValue {
    fn from(value: Value) -> Self {
        AnyValue::Value(value)
    }
}

impl From<Literal> for AnyValue {
    fn from(literal: Literal) -> Self {
        AnyValue::Value(Value::new(literal))
    }
}

impl From<Native> for AnyValue {
    fn from(native: Native) -> Self {
        AnyValue::Native(native)
    }
}

/// The coarse type of an [`AnyValue`], used as the type half of a
/// [`ValueKey`]. Escaped and raw strings are the same kind, as are numbers
/// of every radix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Any string literal, or a native string
    String,
    /// Any number literal, or a native integer or float
    Number,
    /// A boolean
    Bool,
    /// A null
    Null,
    /// A preformatted [`Literal::Exact`]
    Exact,
    /// A native arbitrary-precision decimal
    Decimal,
    /// A native date-time
    DateTime,
    /// A native date
    Date,
    /// A native time
    Time,
    /// A native IPv4 or IPv6 address
    Ip,
    /// A native URL
    Url,
    /// A native UUID
    Uuid,
    /// A native compiled regex
    Regex,
    /// A native byte string
    Bytes,
}

/// Capability trait for values that know how to render themselves as a KDL
/// value. The printer calls this once for anything that isn't already a
/// [`Value`] and prints the result.
pub trait ToKdl {
    /// Render this value as a KDL value
    fn to_kdl(&self) -> Value;
}

impl ToKdl for NaiveDateTime {
    fn to_kdl(&self) -> Value {
        Value::tagged(
            "date-time",
            Literal::String(self.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        )
    }
}

impl ToKdl for NaiveDate {
    fn to_kdl(&self) -> Value {
        Value::tagged("date", Literal::String(self.format("%Y-%m-%d").to_string()))
    }
}

impl ToKdl for NaiveTime {
    fn to_kdl(&self) -> Value {
        Value::tagged(
            "time",
            Literal::String(self.format("%H:%M:%S%.f").to_string()),
        )
    }
}

impl ToKdl for Ipv4Addr {
    fn to_kdl(&self) -> Value {
        Value::tagged("ipv4", Literal::String(self.to_string()))
    }
}

impl ToKdl for Ipv6Addr {
    fn to_kdl(&self) -> Value {
        Value::tagged("ipv6", Literal::String(self.to_string()))
    }
}

impl ToKdl for url::Url {
    fn to_kdl(&self) -> Value {
        Value::tagged("url", Literal::String(self.to_string()))
    }
}

impl ToKdl for uuid::Uuid {
    fn to_kdl(&self) -> Value {
        Value::tagged("uuid", Literal::String(self.to_string()))
    }
}

impl ToKdl for regex::Regex {
    fn to_kdl(&self) -> Value {
        Value::tagged(
            "regex",
            Literal::RawString {
                value: self.as_str().to_owned(),
                hashes: 0,
            },
        )
    }
}

impl ToKdl for rust_decimal::Decimal {
    fn to_kdl(&self) -> Value {
        Value::tagged("decimal", Literal::String(self.to_string()))
    }
}

impl ToKdl for Native {
    fn to_kdl(&self) -> Value {
        match self {
            Native::I8(value) => Value::new(Literal::from(i64::from(*value))),
            Native::I16(value) => Value::new(Literal::from(i64::from(*value))),
            Native::I32(value) => Value::new(Literal::from(i64::from(*value))),
            Native::I64(value) => Value::new(Literal::from(*value)),
            Native::U8(value) => Value::new(Literal::from(i64::from(*value))),
            Native::U16(value) => Value::new(Literal::from(i64::from(*value))),
            Native::U32(value) => Value::new(Literal::from(i64::from(*value))),
            Native::U64(value) => Value::new(Literal::Number(KdlNumber::from(*value as i128))),
            Native::Int(value) => Value::new(Literal::Number(KdlNumber::from(*value))),

            // A finite f32 is formatted at its own precision; a non-finite
            // one falls through to the float path so the printer reports it
            Native::F32(value) if value.is_finite() => {
                let mut text = value.to_string();
                if !text.contains(['.', 'e', 'E']) {
                    text.push_str(".0");
                }
                Value::new(Literal::Exact(text))
            }
            Native::F32(value) => Value::new(Literal::from(f64::from(*value))),
            Native::F64(value) => Value::new(Literal::from(*value)),
            Native::Float(value) => Value::new(Literal::from(*value)),

            Native::String(value) => Value::new(Literal::String(value.clone())),
            Native::Bool(value) => Value::new(Literal::Bool(*value)),
            Native::Null => Value::new(Literal::Null),

            Native::Decimal(value) => value.to_kdl(),
            Native::DateTime(value) => value.to_kdl(),
            Native::Date(value) => value.to_kdl(),
            Native::Time(value) => value.to_kdl(),
            Native::Ipv4(value) => value.to_kdl(),
            Native::Ipv6(value) => value.to_kdl(),
            Native::Url(value) => value.to_kdl(),
            Native::Uuid(value) => value.to_kdl(),
            Native::Regex(value) => value.to_kdl(),
            Native::Bytes(value) => Value::tagged("base64", Literal::String(BASE64.encode(value))),
        }
    }
}
