/*!
The printer: formats a document tree back to KDL text under a
[`PrintConfig`]. The output re-parses to an equal tree, modulo the
information loss the configuration explicitly allows (radix and
string-kind normalization, null suppression).
*/

use std::fmt::Write;

use knots_primitives::{
    is_keyword,
    number::{KdlDecimal, KdlNumber},
    string::is_bare_identifier,
};

use crate::{
    error::PrintError,
    node::{Document, Node},
    value::{AnyValue, Literal, ToKdl, Value},
};

/// Configuration for printing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintConfig {
    /// The per-level indentation string. Defaults to a tab.
    pub indent: String,

    /// Emit `;` before each node's newline
    pub semicolons: bool,

    /// Emit null arguments; when false they are omitted
    pub print_null_args: bool,

    /// Emit null-valued properties; when false they are omitted
    pub print_null_props: bool,

    /// Print hex/octal/binary numbers in their source radix; when false
    /// every number is decimal
    pub respect_radix: bool,

    /// Print raw strings as raw strings; when false every string is
    /// escaped
    pub respect_string_type: bool,

    /// The exponent character for scientific notation, `e` or `E`
    pub exponent_char: char,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            indent: "\t".to_owned(),
            semicolons: false,
            print_null_args: true,
            print_null_props: true,
            respect_radix: true,
            respect_string_type: true,
            exponent_char: 'e',
        }
    }
}

pub(crate) fn print_document(
    document: &Document,
    config: &PrintConfig,
) -> Result<String, PrintError> {
    let mut out = String::new();

    for node in &document.nodes {
        print_node(&mut out, node, 0, config)?;
    }

    Ok(out)
}

fn print_node(
    out: &mut String,
    node: &Node,
    depth: usize,
    config: &PrintConfig,
) -> Result<(), PrintError> {
    for _ in 0..depth {
        out.push_str(&config.indent);
    }

    if let Some(tag) = &node.tag {
        out.push('(');
        push_identifier(out, tag);
        out.push(')');
    }

    push_identifier(out, &node.name);

    for value in &node.args {
        if !config.print_null_args && value.is_null() {
            continue;
        }
        out.push(' ');
        push_value(out, value, config)?;
    }

    for (key, value) in &node.props {
        if !config.print_null_props && value.is_null() {
            continue;
        }
        out.push(' ');
        push_identifier(out, key);
        out.push('=');
        push_value(out, value, config)?;
    }

    if !node.children.is_empty() {
        out.push_str(" {\n");
        for child in &node.children {
            print_node(out, child, depth + 1, config)?;
        }
        for _ in 0..depth {
            out.push_str(&config.indent);
        }
        out.push('}');
    }

    if config.semicolons {
        out.push(';');
    }
    out.push('\n');

    Ok(())
}

/// Emit a name bare if it would re-lex as a single bare identifier, quoted
/// otherwise.
fn push_identifier(out: &mut String, name: &str) {
    if is_bare_identifier(name) && !is_keyword(name) {
        out.push_str(name);
    } else {
        push_quoted(out, name);
    }
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('"');

    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", u32::from(c));
            }
            c => out.push(c),
        }
    }

    out.push('"');
}

/// Emit a raw string. The guard is the hash count the value carries, raised
/// to the minimum that avoids every `"#...#` run in the payload, so the
/// parsed form survives a round trip even after the payload is mutated.
fn push_raw_string(out: &mut String, text: &str, guard: usize) {
    let mut hashes = guard;
    let mut search = text;
    while let Some(quote) = search.find('"') {
        search = &search[quote + 1..];
        let run = search.bytes().take_while(|&b| b == b'#').count();
        hashes = hashes.max(run + 1);
    }

    out.push('r');
    for _ in 0..hashes {
        out.push('#');
    }
    out.push('"');
    out.push_str(text);
    out.push('"');
    for _ in 0..hashes {
        out.push('#');
    }
}

fn push_value(out: &mut String, value: &AnyValue, config: &PrintConfig) -> Result<(), PrintError> {
    match value {
        AnyValue::Value(value) => push_tagged_value(out, value, config),
        // Anything that isn't a KDL value renders itself once, then prints
        // as one
        AnyValue::Native(native) => push_tagged_value(out, &native.to_kdl(), config),
    }
}

fn push_tagged_value(
    out: &mut String,
    value: &Value,
    config: &PrintConfig,
) -> Result<(), PrintError> {
    if let Some(tag) = &value.tag {
        out.push('(');
        push_identifier(out, tag);
        out.push(')');
    }

    match &value.literal {
        Literal::String(text) => push_quoted(out, text),
        Literal::RawString {
            value: text,
            hashes,
        } => {
            if config.respect_string_type {
                push_raw_string(out, text, *hashes);
            } else {
                push_quoted(out, text);
            }
        }
        Literal::Number(number) => push_number(out, number, config)?,
        Literal::Bool(true) => out.push_str("true"),
        Literal::Bool(false) => out.push_str("false"),
        Literal::Null => out.push_str("null"),
        Literal::Exact(text) => out.push_str(text),
    }

    Ok(())
}

fn push_number(
    out: &mut String,
    number: &KdlNumber,
    config: &PrintConfig,
) -> Result<(), PrintError> {
    match number {
        KdlNumber::Decimal(KdlDecimal::Integer { mantissa, exponent }) => match exponent {
            0 => {
                let _ = write!(out, "{mantissa}");
            }
            exponent => {
                let _ = write!(out, "{mantissa}{}{exponent}", config.exponent_char);
            }
        },

        KdlNumber::Decimal(KdlDecimal::Float(value)) => push_float(out, *value)?,

        KdlNumber::Hex { value, digits } => {
            if config.respect_radix {
                if *value < 0 {
                    out.push('-');
                }
                out.push_str("0x");
                out.push_str(digits);
            } else {
                let _ = write!(out, "{value}");
            }
        }

        KdlNumber::Octal(value) => {
            if config.respect_radix {
                if *value < 0 {
                    out.push('-');
                }
                let _ = write!(out, "0o{:o}", value.unsigned_abs());
            } else {
                let _ = write!(out, "{value}");
            }
        }

        KdlNumber::Binary(value) => {
            if config.respect_radix {
                if *value < 0 {
                    out.push('-');
                }
                let _ = write!(out, "0b{:b}", value.unsigned_abs());
            } else {
                let _ = write!(out, "{value}");
            }
        }
    }

    Ok(())
}

fn push_float(out: &mut String, value: f64) -> Result<(), PrintError> {
    if !value.is_finite() {
        return Err(PrintError::NonFiniteFloat(value));
    }

    let text = value.to_string();
    out.push_str(&text);

    // An integral float keeps its fractional part, so the type survives a
    // round trip
    if !text.contains(['.', 'e', 'E']) {
        out.push_str(".0");
    }

    Ok(())
}
