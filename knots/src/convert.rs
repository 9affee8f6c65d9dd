/*!
The conversion layer: parse configuration, user hooks over values and nodes,
and the built-in converters for the reserved KDL tags.

Hooks run during the parse, immediately after a value or node is
constructed. Each hook receives a [`ParseFragment`] exposing the raw source
text of the construct and a factory for positioned errors.
*/

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use knots_primitives::number::{KdlDecimal, KdlNumber};
use nom_supreme::final_parser::RecreateContext;

use crate::{
    error::{ParseError, SourcePosition},
    key::{NodeKey, ValueKey},
    node::Node,
    value::{AnyValue, Literal, Native, Value},
};

/// A handle on the raw source text of a single value or node, given to
/// conversion hooks. Provides the exact literal text and a factory for
/// [`ParseError`]s positioned at the fragment.
#[derive(Debug, Clone, Copy)]
pub struct ParseFragment<'i> {
    text: &'i str,
    location: SourcePosition,
}

impl<'i> ParseFragment<'i> {
    pub(crate) fn new(source: &'i str, start: &'i str, text: &'i str) -> Self {
        Self {
            text,
            location: SourcePosition::recreate_context(source, start),
        }
    }

    /// The raw source text of the fragment
    pub fn text(&self) -> &'i str {
        self.text
    }

    /// The 1-indexed line of the fragment
    pub fn line(&self) -> usize {
        self.location.line
    }

    /// The 1-indexed column of the fragment
    pub fn column(&self) -> usize {
        self.location.column
    }

    /// Create a [`ParseError`] positioned at this fragment
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.location.line, self.location.column)
    }
}

/// The outcome of a value converter.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueOutcome {
    /// This converter doesn't apply; hand the value back and continue the
    /// chain
    Unchanged(Value),

    /// Replace the value and stop
    Converted(AnyValue),
}

/// The outcome of a node converter.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// This converter doesn't apply; hand the node back and continue the
    /// chain
    Unchanged(Node),

    /// Replace the node and stop
    Replaced(Node),

    /// Drop the node from its parent and stop
    Discarded,
}

/// A user hook over tagged values
pub type ValueConverter =
    Box<dyn Fn(Value, &ParseFragment<'_>) -> Result<ValueOutcome, ParseError> + Send + Sync>;

/// A user hook over whole nodes
pub type NodeConverter =
    Box<dyn Fn(Node, &ParseFragment<'_>) -> Result<NodeOutcome, ParseError> + Send + Sync>;

/// Configuration for a parse. The converter lists are consulted in order;
/// the key decides whether a hook sees a given value or node at all.
pub struct ParseConfig {
    /// Hooks over tagged values, in consultation order
    pub value_converters: Vec<(ValueKey, ValueConverter)>,

    /// Hooks over assembled nodes, in consultation order
    pub node_converters: Vec<(NodeKey, NodeConverter)>,

    /// When true, untagged values become [`Native`] values (plain strings,
    /// integers, floats, bools, nulls) instead of staying in their KDL form
    pub native_untagged_values: bool,

    /// When true, the reserved tags (`i8`..`u64`, `f32`, `f64`, `decimal`,
    /// `date-time`, `date`, `time`, `ipv4`, `ipv6`, `url`, `uuid`, `regex`,
    /// `base64`) convert values to their native forms, unless a user hook
    /// intercepts first
    pub native_tagged_values: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            value_converters: Vec::new(),
            node_converters: Vec::new(),
            native_untagged_values: false,
            native_tagged_values: true,
        }
    }
}

impl fmt::Debug for ParseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseConfig")
            .field("value_converters", &self.value_converters.len())
            .field("node_converters", &self.node_converters.len())
            .field("native_untagged_values", &self.native_untagged_values)
            .field("native_tagged_values", &self.native_tagged_values)
            .finish()
    }
}

impl ParseConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value converter, keyed by `key`
    pub fn value_converter(
        mut self,
        key: impl Into<ValueKey>,
        converter: impl Fn(Value, &ParseFragment<'_>) -> Result<ValueOutcome, ParseError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.value_converters.push((key.into(), Box::new(converter)));
        self
    }

    /// Append a node converter, keyed by `key`
    pub fn node_converter(
        mut self,
        key: impl Into<NodeKey>,
        converter: impl Fn(Node, &ParseFragment<'_>) -> Result<NodeOutcome, ParseError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.node_converters.push((key.into(), Box::new(converter)));
        self
    }
}

/// Run a freshly parsed value through the conversion pipeline: user hooks
/// (tagged values only), then the reserved tag table, then the untagged
/// native conversion.
pub(crate) fn apply_value_conversions(
    config: &ParseConfig,
    mut value: Value,
    fragment: &ParseFragment<'_>,
) -> Result<AnyValue, ParseError> {
    if value.tag.is_some() {
        for (key, converter) in &config.value_converters {
            if key.matches_parts(value.tag.as_deref(), value.literal.kind()) {
                match converter(value, fragment)? {
                    ValueOutcome::Unchanged(unchanged) => value = unchanged,
                    ValueOutcome::Converted(converted) => return Ok(converted),
                }
            }
        }

        if config.native_tagged_values {
            if let Some(native) = convert_reserved(&value, fragment)? {
                return Ok(AnyValue::Native(native));
            }
        }

        Ok(AnyValue::Value(value))
    } else if config.native_untagged_values {
        Ok(AnyValue::Native(value.literal.into_native()))
    } else {
        Ok(AnyValue::Value(value))
    }
}

/// Run a freshly assembled node through the node converters. Returns None
/// if a converter discarded the node.
pub(crate) fn apply_node_conversions(
    config: &ParseConfig,
    mut node: Node,
    fragment: &ParseFragment<'_>,
) -> Result<Option<Node>, ParseError> {
    for (key, converter) in &config.node_converters {
        if node.matches(key) {
            match converter(node, fragment)? {
                NodeOutcome::Unchanged(unchanged) => node = unchanged,
                NodeOutcome::Replaced(replacement) => return Ok(Some(replacement)),
                NodeOutcome::Discarded => return Ok(None),
            }
        }
    }

    Ok(Some(node))
}

fn number_payload<'v>(
    value: &'v Value,
    fragment: &ParseFragment<'_>,
    tag: &str,
) -> Result<&'v KdlNumber, ParseError> {
    match &value.literal {
        Literal::Number(number) => Ok(number),
        _ => Err(fragment.error(format!("({tag}) requires a number"))),
    }
}

fn string_payload<'v>(
    value: &'v Value,
    fragment: &ParseFragment<'_>,
    tag: &str,
) -> Result<&'v str, ParseError> {
    match &value.literal {
        Literal::String(text) | Literal::RawString { value: text, .. } => Ok(text),
        _ => Err(fragment.error(format!("({tag}) requires a string"))),
    }
}

fn bounded_integer<T: TryFrom<i128>>(
    value: &Value,
    fragment: &ParseFragment<'_>,
    tag: &str,
) -> Result<T, ParseError> {
    let number = number_payload(value, fragment, tag)?;
    let whole = number
        .as_integer()
        .ok_or_else(|| fragment.error(format!("({tag}) requires a whole number")))?;

    T::try_from(whole).map_err(|_| fragment.error(format!("{whole} is out of range for ({tag})")))
}

fn decimal_payload(
    value: &Value,
    fragment: &ParseFragment<'_>,
    tag: &str,
) -> Result<rust_decimal::Decimal, ParseError> {
    let text = match &value.literal {
        Literal::String(text) | Literal::RawString { value: text, .. } => text.clone(),
        Literal::Number(number) => match number {
            KdlNumber::Decimal(KdlDecimal::Integer {
                mantissa,
                exponent: 0,
            }) => mantissa.to_string(),
            KdlNumber::Decimal(KdlDecimal::Integer { mantissa, exponent }) => {
                format!("{mantissa}e{exponent}")
            }
            KdlNumber::Decimal(KdlDecimal::Float(float)) => float.to_string(),
            number => match number.as_integer() {
                Some(whole) => whole.to_string(),
                None => return Err(fragment.error(format!("({tag}) requires a decimal number"))),
            },
        },
        _ => return Err(fragment.error(format!("({tag}) requires a string or number"))),
    };

    let parsed = if text.contains(['e', 'E']) {
        rust_decimal::Decimal::from_scientific(&text)
    } else {
        rust_decimal::Decimal::from_str(&text)
    };

    parsed.map_err(|error| fragment.error(format!("invalid ({tag}) value: {error}")))
}

/// Apply the built-in reserved tag table. Returns None for tags that aren't
/// reserved, leaving the value in its KDL form.
fn convert_reserved(
    value: &Value,
    fragment: &ParseFragment<'_>,
) -> Result<Option<Native>, ParseError> {
    let tag = match value.tag.as_deref() {
        Some(tag) => tag,
        None => return Ok(None),
    };

    let native = match tag {
        "i8" => Native::I8(bounded_integer(value, fragment, tag)?),
        "i16" => Native::I16(bounded_integer(value, fragment, tag)?),
        "i32" => Native::I32(bounded_integer(value, fragment, tag)?),
        "i64" => Native::I64(bounded_integer(value, fragment, tag)?),
        "u8" => Native::U8(bounded_integer(value, fragment, tag)?),
        "u16" => Native::U16(bounded_integer(value, fragment, tag)?),
        "u32" => Native::U32(bounded_integer(value, fragment, tag)?),
        "u64" => Native::U64(bounded_integer(value, fragment, tag)?),

        "f32" => Native::F32(number_payload(value, fragment, tag)?.as_f64() as f32),
        "f64" => Native::F64(number_payload(value, fragment, tag)?.as_f64()),

        "decimal" | "decimal64" | "decimal128" => {
            Native::Decimal(decimal_payload(value, fragment, tag)?)
        }

        "date-time" => {
            let text = string_payload(value, fragment, tag)?;
            Native::DateTime(text.parse::<NaiveDateTime>().map_err(|error| {
                fragment.error(format!("invalid (date-time) value: {error}"))
            })?)
        }
        "date" => {
            let text = string_payload(value, fragment, tag)?;
            Native::Date(
                text.parse::<NaiveDate>()
                    .map_err(|error| fragment.error(format!("invalid (date) value: {error}")))?,
            )
        }
        "time" => {
            let text = string_payload(value, fragment, tag)?;
            Native::Time(
                text.parse::<NaiveTime>()
                    .map_err(|error| fragment.error(format!("invalid (time) value: {error}")))?,
            )
        }

        "ipv4" => {
            let text = string_payload(value, fragment, tag)?;
            Native::Ipv4(
                text.parse()
                    .map_err(|error| fragment.error(format!("invalid (ipv4) value: {error}")))?,
            )
        }
        "ipv6" => {
            let text = string_payload(value, fragment, tag)?;
            Native::Ipv6(
                text.parse()
                    .map_err(|error| fragment.error(format!("invalid (ipv6) value: {error}")))?,
            )
        }

        "url" => {
            let text = string_payload(value, fragment, tag)?;
            Native::Url(
                url::Url::parse(text)
                    .map_err(|error| fragment.error(format!("invalid (url) value: {error}")))?,
            )
        }
        "uuid" => {
            let text = string_payload(value, fragment, tag)?;
            Native::Uuid(
                uuid::Uuid::parse_str(text)
                    .map_err(|error| fragment.error(format!("invalid (uuid) value: {error}")))?,
            )
        }
        "regex" => {
            let text = string_payload(value, fragment, tag)?;
            Native::Regex(
                regex::Regex::new(text)
                    .map_err(|error| fragment.error(format!("invalid (regex) value: {error}")))?,
            )
        }
        "base64" => {
            let text = string_payload(value, fragment, tag)?;
            Native::Bytes(
                BASE64
                    .decode(text)
                    .map_err(|error| fragment.error(format!("invalid (base64) value: {error}")))?,
            )
        }

        _ => return Ok(None),
    };

    Ok(Some(native))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::StringMatcher;

    fn fragment() -> ParseFragment<'static> {
        ParseFragment {
            text: "test",
            location: SourcePosition { line: 1, column: 1 },
        }
    }

    fn convert(value: Value) -> Result<AnyValue, ParseError> {
        apply_value_conversions(&ParseConfig::default(), value, &fragment())
    }

    #[test]
    fn bounded_integers() {
        assert_eq!(
            convert(Value::tagged("u8", Literal::from(255i64))),
            Ok(AnyValue::Native(Native::U8(255)))
        );

        assert_eq!(
            convert(Value::tagged("i8", Literal::from(-128i64))),
            Ok(AnyValue::Native(Native::I8(-128)))
        );

        let error = convert(Value::tagged("u8", Literal::from(256i64))).unwrap_err();
        assert!(error.message.contains("out of range"));

        let error = convert(Value::tagged("u32", Literal::from(-1i64))).unwrap_err();
        assert!(error.message.contains("out of range"));
    }

    #[test]
    fn floats() {
        assert_eq!(
            convert(Value::tagged("f64", Literal::from(1.5))),
            Ok(AnyValue::Native(Native::F64(1.5)))
        );
        assert_eq!(
            convert(Value::tagged("f32", Literal::from(1.5))),
            Ok(AnyValue::Native(Native::F32(1.5)))
        );
    }

    #[test]
    fn dates_and_times() {
        assert_eq!(
            convert(Value::tagged("date", Literal::from("2021-02-03"))),
            Ok(AnyValue::Native(Native::Date(
                NaiveDate::from_ymd_opt(2021, 2, 3).unwrap()
            )))
        );

        let error = convert(Value::tagged("date", Literal::from("not a date"))).unwrap_err();
        assert!(error.message.contains("invalid (date)"));

        let error = convert(Value::tagged("date", Literal::from(5i64))).unwrap_err();
        assert!(error.message.contains("requires a string"));
    }

    #[test]
    fn addresses() {
        assert_eq!(
            convert(Value::tagged("ipv4", Literal::from("127.0.0.1"))),
            Ok(AnyValue::Native(Native::Ipv4(
                std::net::Ipv4Addr::new(127, 0, 0, 1)
            )))
        );
        assert_eq!(
            convert(Value::tagged("ipv6", Literal::from("::1"))),
            Ok(AnyValue::Native(Native::Ipv6(
                std::net::Ipv6Addr::LOCALHOST
            )))
        );
    }

    #[test]
    fn bytes() {
        assert_eq!(
            convert(Value::tagged("base64", Literal::from("aGVsbG8="))),
            Ok(AnyValue::Native(Native::Bytes(b"hello".to_vec())))
        );
    }

    #[test]
    fn decimals() {
        let converted = convert(Value::tagged("decimal", Literal::from("1.23"))).unwrap();
        assert_eq!(
            converted,
            AnyValue::Native(Native::Decimal("1.23".parse().unwrap()))
        );
    }

    #[test]
    fn unreserved_tag_passes_through() {
        let value = Value::tagged("widget", Literal::from("payload"));
        assert_eq!(convert(value.clone()), Ok(AnyValue::Value(value)));
    }

    #[test]
    fn tagged_conversion_can_be_disabled() {
        let config = ParseConfig {
            native_tagged_values: false,
            ..ParseConfig::default()
        };

        let value = Value::tagged("u8", Literal::from(256i64));
        let converted =
            apply_value_conversions(&config, value.clone(), &fragment()).unwrap();
        assert_eq!(converted, AnyValue::Value(value));
    }

    #[test]
    fn user_converter_chain() {
        // The first converter declines, the second converts
        let config = ParseConfig::new()
            .value_converter("never", |value, _fragment| {
                Ok(ValueOutcome::Unchanged(value))
            })
            .value_converter(StringMatcher::Any, |value, _fragment| {
                Ok(ValueOutcome::Unchanged(value))
            })
            .value_converter("celsius", |value, _fragment| match &value.literal {
                Literal::Number(number) => Ok(ValueOutcome::Converted(AnyValue::Native(
                    Native::F64(number.as_f64() + 273.15),
                ))),
                _ => Ok(ValueOutcome::Unchanged(value)),
            });

        let converted = apply_value_conversions(
            &config,
            Value::tagged("celsius", Literal::from(0i64)),
            &fragment(),
        )
        .unwrap();

        assert_eq!(converted, AnyValue::Native(Native::F64(273.15)));
    }

    #[test]
    fn user_converter_takes_priority_over_reserved() {
        let config = ParseConfig::new().value_converter("u8", |_value, _fragment| {
            Ok(ValueOutcome::Converted(AnyValue::Native(Native::Bool(true))))
        });

        // (u8)9000 would be out of range, but the user hook intercepts first
        let converted = apply_value_conversions(
            &config,
            Value::tagged("u8", Literal::from(9000i64)),
            &fragment(),
        )
        .unwrap();

        assert_eq!(converted, AnyValue::Native(Native::Bool(true)));
    }

    #[test]
    fn user_converter_error() {
        let config = ParseConfig::new().value_converter("id", |_value, fragment| {
            Err(fragment.error("bad id"))
        });

        let error = apply_value_conversions(
            &config,
            Value::tagged("id", Literal::from("nope")),
            &fragment(),
        )
        .unwrap_err();

        assert_eq!(error, ParseError::new("bad id", 1, 1));
    }

    #[test]
    fn node_converters() {
        let config = ParseConfig::new()
            .node_converter("secret", |_node, _fragment| Ok(NodeOutcome::Discarded))
            .node_converter(StringMatcher::Any, |mut node, _fragment| {
                node.name = node.name.to_uppercase();
                Ok(NodeOutcome::Replaced(node))
            });

        let kept = apply_node_conversions(&config, Node::new("visible"), &fragment()).unwrap();
        assert_eq!(kept.unwrap().name, "VISIBLE");

        let dropped = apply_node_conversions(&config, Node::new("secret"), &fragment()).unwrap();
        assert!(dropped.is_none());
    }
}
