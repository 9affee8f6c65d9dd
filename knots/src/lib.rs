/*!
A document-tree parser and printer for the [KDL](https://kdl.dev/) document
language, version 1.0.0.

[`parse`] converts KDL source text into a mutable [`Document`] tree of
[`Node`]s and values; [`Document::print`] formats a tree back to KDL text.
Printing preserves the radix of numbers and the raw/escaped kind of strings
by default, so a document round-trips through the tree.

```
let doc = knots::parse("plugin \"tree-sitter\" version=\"0.22\" {\n\tfeature \"highlight\"\n}")
    .expect("invalid KDL");

assert_eq!(doc["plugin"].children[0].name, "feature");

let printed = doc.print().expect("unprintable");
assert_eq!(knots::parse(&printed).expect("reparse"), doc);
```

Conversion hooks ([`ParseConfig::value_converter`],
[`ParseConfig::node_converter`]) run during the parse, and the reserved KDL
tags (`(u8)`, `(date)`, `(ipv4)`, ...) convert tagged values into
host-native types unless disabled. The low-level scanners live in the
`knots-primitives` crate.
*/

mod convert;
mod error;
mod key;
mod node;
mod parse;
mod print;
mod value;

pub use convert::{
    NodeConverter, NodeOutcome, ParseConfig, ParseFragment, ValueConverter, ValueOutcome,
};
pub use error::{ParseError, PrintError, SourcePosition};
pub use key::{NodeKey, StringMatcher, TypeKey, ValueKey};
pub use node::{Document, Node};
pub use parse::{parse, parse_with};
pub use print::PrintConfig;
pub use value::{AnyValue, Literal, Native, ToKdl, Value, ValueKind};

pub use knots_primitives::number::{KdlDecimal, KdlNumber, Radix};

/// A parser with its own parse and print configuration. Documents parsed by
/// a `Parser` carry its print configuration, so they stringify the way the
/// parser was configured.
///
/// Configuration is always parser-scoped; there is no process-wide mutable
/// state.
#[derive(Debug, Default)]
pub struct Parser {
    /// Configuration applied by [`parse`][Self::parse]
    pub parse_config: ParseConfig,

    /// Configuration applied by [`print`][Self::print], and attached to
    /// parsed documents
    pub print_config: PrintConfig,
}

impl Parser {
    /// Create a parser with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document with this parser's configuration
    pub fn parse(&self, text: &str) -> Result<Document, ParseError> {
        parse_with(text, &self.parse_config).map(|mut document| {
            document.print_config = Some(self.print_config.clone());
            document
        })
    }

    /// Print a document with this parser's configuration, ignoring any
    /// configuration attached to the document
    pub fn print(&self, document: &Document) -> Result<String, PrintError> {
        document.print_with(&self.print_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &[&str] = &[
        "",
        "node",
        "node 1 2 3",
        "node_name \"arg\" {\n    child_node foo=1 bar=true\n}\n",
        "n r#\"a \"quoted\" b\"# 0x1F",
        "numbers 1 -2 +3 1_000 1e3 2E-4 1.5 -0.25 0xdead_beef 0o755 0b1010 -0x0A",
        "strings \"\" \"a\\tb\" \"\\u{1F600}\" r\"raw\" r##\"has \"# inside\"## r##\"overguarded\"##",
        "keywords true false null (tag)true",
        "(widget)button label=(i18n)\"ok\" {\n  (widget)icon null\n}",
        "props a=1 a=2 b=\"x\" \"quoted key\"=null",
        "deep { a { b { c { d 1 } } } }",
        "esc a=1 \\ // trailing\n  b=2",
        "term1; term2;\nterm3",
        "weird-\n-also-a-name\n+name\nr\"quoted name\" 1",
    ];

    /// Parsing, printing, and reparsing yields the same tree
    #[test]
    fn round_trip_tree() {
        for source in CORPUS {
            let doc = parse(source).expect(source);
            let printed = doc.print().expect(source);
            let reparsed = parse(&printed).unwrap_or_else(|error| {
                panic!("{source:?} printed as {printed:?}, which didn't reparse: {error}")
            });
            assert_eq!(reparsed, doc, "{source:?} printed as {printed:?}");
        }
    }

    /// A single print fully canonicalizes: print(parse(print(parse(t)))) is
    /// print(parse(t))
    #[test]
    fn printing_is_idempotent() {
        for source in CORPUS {
            let once = parse(source).expect(source).print().expect(source);
            let twice = parse(&once).expect(source).print().expect(source);
            assert_eq!(twice, once, "{source:?}");
        }
    }

    /// With respect_radix off, no radix prefixes survive in the output
    #[test]
    fn radix_neutral_output_is_decimal() {
        let config = PrintConfig {
            respect_radix: false,
            ..PrintConfig::default()
        };

        for source in CORPUS {
            let printed = parse(source).expect(source).print_with(&config).expect(source);
            assert!(!printed.contains("0x"), "{printed:?}");
            assert!(!printed.contains("0o"), "{printed:?}");
            assert!(!printed.contains("0b"), "{printed:?}");
        }
    }

    /// With null printing off, no null appears in the output
    #[test]
    fn null_suppression_is_sound() {
        let config = PrintConfig {
            print_null_args: false,
            print_null_props: false,
            ..PrintConfig::default()
        };

        for source in CORPUS {
            let printed = parse(source).expect(source).print_with(&config).expect(source);
            assert!(!printed.contains("null"), "{printed:?}");
        }
    }

    #[test]
    fn parser_attaches_print_config() {
        let parser = Parser {
            print_config: PrintConfig {
                semicolons: true,
                ..PrintConfig::default()
            },
            ..Parser::default()
        };

        let doc = parser.parse("a\nb").expect("parse failed");
        assert_eq!(doc.to_string(), "a;\nb;\n");
        assert_eq!(parser.print(&doc).expect("print failed"), "a;\nb;\n");
    }

    #[test]
    fn document_display_uses_default_config() {
        let doc = parse("a { b 0x10 }").expect("parse failed");
        assert_eq!(doc.to_string(), "a {\n\tb 0x10\n}\n");
    }

    /// The parser never produces `Literal::Exact`
    #[test]
    fn exact_is_printer_only() {
        fn check_value(value: &AnyValue) {
            if let AnyValue::Value(value) = value {
                assert!(!matches!(value.literal, Literal::Exact(_)));
            }
        }

        fn check_node(node: &Node) {
            node.args.iter().for_each(check_value);
            node.props.values().for_each(check_value);
            node.children.iter().for_each(check_node);
        }

        for source in CORPUS {
            parse(source).expect(source).nodes.iter().for_each(check_node);
        }
    }
}
