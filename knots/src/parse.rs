/*!
The document parser: recursive descent over the KDL grammar, built from the
scanners in `knots-primitives`, producing a [`Document`] tree.

Slash-dashed arguments and properties are parsed with the primitives'
recognize-only builders, so discarding them costs no allocation; their
syntax (including string escapes and number formats) is still fully
validated. Slash-dashed `{ ... }` children blocks are skipped by balanced
brace matching that honors strings and comments.
*/

use knots_primitives::{
    annotation::parse_maybe_annotation,
    is_keyword,
    string::{parse_bare_identifier, parse_identifier, parse_raw_string, parse_string},
    value::parse_bare_value,
    whitespace::{
        parse_block_comment, parse_linespace, parse_node_space, parse_node_terminator,
        parse_plain_whitespace, parse_single_line_comment,
    },
};
use nom::{
    character::complete::char,
    combinator::consumed,
    error::{ErrorKind, FromExternalError},
    Err as NomErr, IResult, Parser,
};
use nom_supreme::{
    error::{BaseErrorKind, ErrorTree, Expectation, GenericErrorTree},
    final_parser::final_parser,
    ParserExt,
};

use crate::{
    convert::{apply_node_conversions, apply_value_conversions, ParseConfig, ParseFragment},
    error::{summarize_error_tree, ParseError, SourcePosition, SyntaxError},
    node::{Document, Node},
    value::{AnyValue, Literal, Value},
};

type TreeResult<'i, T> = IResult<&'i str, T, ErrorTree<&'i str>>;

/// Shared state of a single parse: the complete source (for positioning)
/// and the configuration. The cursor itself is the `&str` input threaded
/// through each parser.
struct Context<'i, 'c> {
    source: &'i str,
    config: &'c ParseConfig,
}

/// Parse a KDL document with the default [`ParseConfig`].
pub fn parse(text: &str) -> Result<Document, ParseError> {
    parse_with(text, &ParseConfig::default())
}

/// Parse a KDL document. A single leading byte-order mark is accepted and
/// ignored.
pub fn parse_with(text: &str, config: &ParseConfig) -> Result<Document, ParseError> {
    let source = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let context = Context { source, config };

    let result = final_parser(|input| parse_nodes(&context, input, true))(source)
        .map(|nodes| Document {
            nodes,
            print_config: None,
        })
        .map_err(|tree: ErrorTree<SourcePosition>| summarize_error_tree(tree));
    result
}

fn expected<'i>(input: &'i str, expectation: Expectation<&'static str>) -> NomErr<ErrorTree<&'i str>> {
    NomErr::Error(GenericErrorTree::Base {
        location: input,
        kind: BaseErrorKind::Expected(expectation),
    })
}

fn syntax_failure(input: &str, error: SyntaxError) -> NomErr<ErrorTree<&str>> {
    NomErr::Failure(FromExternalError::from_external_error(
        input,
        ErrorKind::Verify,
        error,
    ))
}

fn convert_failure(input: &str, error: ParseError) -> NomErr<ErrorTree<&str>> {
    NomErr::Failure(FromExternalError::from_external_error(
        input,
        ErrorKind::MapRes,
        error,
    ))
}

/// Parse a node list: the whole document when `at_top`, or the interior of
/// a `{ }` block (stopping before the closing brace) otherwise.
fn parse_nodes<'i>(
    context: &Context<'i, '_>,
    mut input: &'i str,
    at_top: bool,
) -> TreeResult<'i, Vec<Node>> {
    let mut nodes = Vec::new();

    loop {
        let (tail, ()) = parse_linespace.parse(input)?;
        input = tail;

        if at_top && input.is_empty() {
            return Ok((input, nodes));
        }

        if !at_top {
            if input.starts_with('}') {
                return Ok((input, nodes));
            }

            if input.is_empty() {
                return Err(expected(input, Expectation::Char('}')));
            }
        }

        input = match input.strip_prefix("/-") {
            Some(tail) => {
                let (tail, _) = parse_node_space.opt().parse(tail)?;
                let (tail, ()) = discard_node(tail)?;
                tail
            }
            None => {
                let (tail, node) = parse_node(context, input)?;
                nodes.extend(node);
                tail
            }
        };
    }
}

/// Parse one node: tag, name, arguments/properties/children, terminator.
/// Returns None if a node converter discarded the node.
fn parse_node<'i>(context: &Context<'i, '_>, input: &'i str) -> TreeResult<'i, Option<Node>> {
    let start = input;

    let (input, tag) = parse_tag(input)?;
    let input = match tag {
        Some(_) => parse_plain_whitespace.opt().parse(input)?.0,
        None => input,
    };
    let (input, name) = parse_node_name(input, tag.is_some())?;

    let mut node = Node::new(name);
    node.tag = tag;

    let mut input = input;
    let mut has_children = false;

    let input = loop {
        let (tail, had_space) = parse_node_space
            .opt()
            .map(|space| space.is_some())
            .parse(input)?;

        if let Some(tail) = match_node_terminator(tail) {
            break tail;
        }

        if !had_space {
            return Err(expected(tail, Expectation::Space));
        }

        if let Some(rest) = tail.strip_prefix("/-") {
            let (rest, _) = parse_node_space.opt().parse(rest)?;
            if rest.starts_with('{') {
                input = skip_children_block(rest)?.0;
                continue;
            }

            // Arguments and properties can't follow the children block,
            // slash-dashed or not
            if has_children {
                return Err(expected(tail, Expectation::Eof));
            }

            input = discard_entry(rest)?.0;
            continue;
        }

        if tail.starts_with('{') {
            if has_children {
                return Err(syntax_failure(tail, SyntaxError::DuplicateChildren));
            }

            let (rest, children) = parse_children(context, tail)?;
            node.children = children;
            has_children = true;
            input = rest;
            continue;
        }

        if has_children {
            // Nothing but a terminator (or a slash-dashed children block)
            // may follow a node's children
            return match parse_node_terminator::<ErrorTree<&'i str>>(tail) {
                Err(err) => Err(err),
                Ok(_) => Err(expected(tail, Expectation::Eof)),
            };
        }

        let (rest, entry) = parse_entry(context, tail)?;
        match entry {
            Entry::Arg(value) => node.args.push(value),
            Entry::Prop(key, value) => {
                // Last-wins: overwrites the value in place, keeping the
                // position of the first occurrence
                node.props.insert(key, value);
            }
        }
        input = rest;
    };

    let text = start[..start.len() - input.len()].trim_end();
    let fragment = ParseFragment::new(context.source, start, text);

    let node = apply_node_conversions(context.config, node, &fragment)
        .map_err(|error| convert_failure(start, error))?;

    Ok((input, node))
}

/// Consume a node terminator, if one is next. A closing brace terminates
/// the node but is left for the enclosing children parser to consume.
fn match_node_terminator(input: &str) -> Option<&str> {
    if input.starts_with('}') {
        return Some(input);
    }

    match parse_node_terminator::<ErrorTree<&str>>(input) {
        Ok((tail, ())) => Some(tail),
        Err(_) => None,
    }
}

/// Parse a `{ ... }` children block.
fn parse_children<'i>(context: &Context<'i, '_>, input: &'i str) -> TreeResult<'i, Vec<Node>> {
    let (input, _) = char('{').parse(input)?;
    let (input, children) = parse_nodes(context, input, false)?;
    let (input, _) = char('}').cut().parse(input)?;
    Ok((input, children))
}

/// Parse an optional `(tag)` annotation, enforcing that a bare tag isn't a
/// reserved keyword.
fn parse_tag<'i>(input: &'i str) -> TreeResult<'i, Option<String>> {
    let tail = match input.strip_prefix('(') {
        Some(tail) => tail,
        None => return Ok((input, None)),
    };

    let (tail, _) = parse_plain_whitespace.opt().parse(tail)?;

    let name_start = tail;
    let (tail, (bare, name)) = match parse_identifier_classified(tail) {
        Ok(ok) => ok,
        // Once inside the parentheses, there's no going back
        Err(NomErr::Error(error)) => return Err(NomErr::Failure(error)),
        Err(err) => return Err(err),
    };

    if bare && is_keyword(&name) {
        return Err(syntax_failure(
            name_start,
            SyntaxError::ReservedIdentifier(name),
        ));
    }

    let (tail, _) = parse_plain_whitespace.opt().parse(tail)?;
    let (tail, _) = char(')').cut().parse(tail)?;

    Ok((tail, Some(name)))
}

/// Parse a node name. A bare keyword can't open a node, but a tag in front
/// disambiguates, so `(tag)true` is a node named `true`.
fn parse_node_name(input: &str, tagged: bool) -> TreeResult<'_, String> {
    let (tail, (bare, name)) = parse_identifier_classified(input)?;

    if bare && !tagged && is_keyword(&name) {
        return Err(syntax_failure(input, SyntaxError::ReservedIdentifier(name)));
    }

    Ok((tail, name))
}

/// Parse an identifier, reporting whether it was bare (as opposed to a
/// quoted or raw string).
fn parse_identifier_classified(input: &str) -> TreeResult<'_, (bool, String)> {
    match parse_bare_identifier::<ErrorTree<&str>>(input) {
        Ok((tail, word)) => Ok((tail, (true, word.to_owned()))),
        Err(NomErr::Error(_)) => {
            parse_string(input).map(|(tail, name): (_, String)| (tail, (false, name)))
        }
        Err(err) => Err(err),
    }
}

/// One argument or property of a node.
enum Entry {
    Arg(AnyValue),
    Prop(String, AnyValue),
}

/// Parse a single argument or property.
fn parse_entry<'i>(context: &Context<'i, '_>, input: &'i str) -> TreeResult<'i, Entry> {
    // Try a property first, since `"abc"=10` could be conservatively parsed
    // as just the value "abc"
    if let Ok((tail, (bare, key))) = parse_identifier_classified(input) {
        if let Ok((tail, _)) = char::<_, ErrorTree<&str>>('=').parse(tail) {
            if bare && is_keyword(&key) {
                return Err(syntax_failure(input, SyntaxError::ReservedIdentifier(key)));
            }

            // Past the `=`, the value is mandatory
            let (tail, value) = match parse_value_built(context, tail) {
                Ok(ok) => ok,
                Err(NomErr::Error(error)) => return Err(NomErr::Failure(error)),
                Err(err) => return Err(err),
            };

            return Ok((tail, Entry::Prop(key, value)));
        }
    }

    let (tail, value) = parse_value_built(context, input)?;
    Ok((tail, Entry::Arg(value)))
}

/// Parse a value (with optional tag) and run it through the conversion
/// pipeline.
fn parse_value_built<'i>(context: &Context<'i, '_>, input: &'i str) -> TreeResult<'i, AnyValue> {
    let (input, tag) = parse_tag(input)?;

    // Whitespace is only allowed between a tag and its value
    let input = match tag {
        Some(_) => parse_plain_whitespace.opt().parse(input)?.0,
        None => input,
    };

    let literal_start = input;
    let (input, (raw, literal)) = match consumed(parse_bare_value::<Literal, _>).parse(input) {
        Ok(ok) => ok,
        // A tag commits us to a value
        Err(NomErr::Error(error)) if tag.is_some() => return Err(NomErr::Failure(error)),
        Err(err) => return Err(err),
    };

    let fragment = ParseFragment::new(context.source, literal_start, raw);
    let value = Value { tag, literal };

    match apply_value_conversions(context.config, value, &fragment) {
        Ok(value) => Ok((input, value)),
        Err(error) => Err(convert_failure(literal_start, error)),
    }
}

/// Parse and discard a slash-dashed node. Its arguments and properties are
/// fully validated (but not built, and not run through any converters); its
/// children blocks are skipped by brace matching.
fn discard_node(input: &str) -> TreeResult<'_, ()> {
    let (input, tag) = parse_maybe_annotation::<Option<()>, _>(input)?;
    let input = match tag {
        Some(()) => parse_plain_whitespace.opt().parse(input)?.0,
        None => input,
    };
    let (mut input, ()) = parse_identifier::<(), _>(input)?;

    loop {
        let (tail, had_space) = parse_node_space
            .opt()
            .map(|space| space.is_some())
            .parse(input)?;

        if let Some(tail) = match_node_terminator(tail) {
            return Ok((tail, ()));
        }

        if !had_space {
            return Err(expected(tail, Expectation::Space));
        }

        if let Some(rest) = tail.strip_prefix("/-") {
            let (rest, _) = parse_node_space.opt().parse(rest)?;
            input = if rest.starts_with('{') {
                skip_children_block(rest)?.0
            } else {
                discard_entry(rest)?.0
            };
            continue;
        }

        if tail.starts_with('{') {
            input = skip_children_block(tail)?.0;
            continue;
        }

        input = discard_entry(tail)?.0;
    }
}

/// Parse and discard a single argument or property, using the recognize-only
/// builders.
fn discard_entry(input: &str) -> TreeResult<'_, ()> {
    if let Ok((tail, ())) = parse_identifier::<(), ErrorTree<&str>>
        .terminated(char('='))
        .parse(input)
    {
        return match discard_value(tail) {
            Ok(ok) => Ok(ok),
            Err(NomErr::Error(error)) => Err(NomErr::Failure(error)),
            Err(err) => Err(err),
        };
    }

    discard_value(input)
}

fn discard_value(input: &str) -> TreeResult<'_, ()> {
    let (input, tag) = parse_maybe_annotation::<Option<()>, _>(input)?;
    let input = match tag {
        Some(()) => parse_plain_whitespace.opt().parse(input)?.0,
        None => input,
    };
    parse_bare_value::<(), _>(input)
}

/// Skip a balanced `{ ... }` block without parsing its contents as nodes.
/// Strings and comments are honored, so braces inside them don't count, and
/// unterminated strings and comments are still errors.
fn skip_children_block(input: &str) -> TreeResult<'_, ()> {
    let (mut tail, _) = char::<_, ErrorTree<&str>>('{').parse(input)?;
    let mut depth = 1usize;

    while depth > 0 {
        let c = match tail.chars().next() {
            Some(c) => c,
            None => return Err(syntax_failure(input, SyntaxError::UnclosedChildren)),
        };

        match c {
            '{' => {
                depth += 1;
                tail = &tail[1..];
            }
            '}' => {
                depth -= 1;
                tail = &tail[1..];
            }
            '"' => {
                let (rest, ()) = parse_string::<(), _>(tail)?;
                tail = rest;
            }
            'r' => match parse_raw_string::<ErrorTree<&str>>(tail) {
                Ok((rest, _)) => tail = rest,
                // Just an `r` inside a word
                Err(NomErr::Error(_)) => tail = &tail[1..],
                Err(err) => return Err(err),
            },
            '/' if tail.starts_with("//") => {
                let (rest, ()) = parse_single_line_comment(tail)?;
                tail = rest;
            }
            '/' if tail.starts_with("/*") => {
                let (rest, ()) = parse_block_comment(tail)?;
                tail = rest;
            }
            c => tail = &tail[c.len_utf8()..],
        }
    }

    Ok((tail, ()))
}
