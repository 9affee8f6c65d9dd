/*!
Error types for parsing, printing, and the machinery that collapses a nom
error tree into a single positioned message.
*/

use knots_primitives::whitespace::is_newline;
use nom_supreme::{
    error::{BaseErrorKind, ErrorTree, GenericErrorTree, StackContext},
    final_parser::RecreateContext,
};
use thiserror::Error;

/// An error produced while parsing a KDL document, including the 1-indexed
/// line and column where the problem was found. All parse failures abort the
/// parse; there is no recovery.
///
/// Parse errors are also producible by conversion hooks, via
/// [`ParseFragment::error`][crate::ParseFragment::error].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    /// A human-readable description of the problem
    pub message: String,

    /// 1-indexed line number
    pub line: usize,

    /// 1-indexed column number
    pub column: usize,
}

impl ParseError {
    /// Create a parse error at the given position
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Structural errors detected by the document parser, above the lexical
/// level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum SyntaxError {
    #[error("{0:?} is a reserved keyword; quote it to use it here")]
    ReservedIdentifier(String),

    #[error("node already has a children block")]
    DuplicateChildren,

    #[error("unclosed children block")]
    UnclosedChildren,
}

/// A 1-indexed position in the source text. Every KDL newline form (LF, CR,
/// CRLF, NEL, FF, LS, PS) counts as exactly one line break, with CRLF
/// counted atomically; columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    /// 1-indexed line number
    pub line: usize,

    /// 1-indexed column number
    pub column: usize,
}

impl RecreateContext<&str> for SourcePosition {
    fn recreate_context(original_input: &str, tail: &str) -> Self {
        let consumed = &original_input[..original_input.len() - tail.len()];

        let mut line = 1;
        let mut column = 1;
        let mut chars = consumed.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\r' && chars.peek() == Some(&'\n') {
                // CRLF counts once, at the \n
                continue;
            }

            if is_newline(c) {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Self { line, column }
    }
}

/// An error produced while printing a document. This is distinct from
/// [`ParseError`]: it indicates a value in the tree that has no KDL
/// representation, not a problem with any source text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrintError {
    /// KDL has no literal for NaN or infinity
    #[error("cannot serialize non-finite float {0}")]
    NonFiniteFloat(f64),
}

/// Collapse a located error tree into a single [`ParseError`], preferring
/// the branch that made it furthest through the input. External errors that
/// are already [`ParseError`]s (from conversion hooks) pass through with
/// their own positions.
pub(crate) fn summarize_error_tree(tree: ErrorTree<SourcePosition>) -> ParseError {
    summarize(tree).0
}

/// The bool reports whether the message came from an external error, whose
/// messages are already self-descriptive and don't want parser context
/// appended.
fn summarize(tree: ErrorTree<SourcePosition>) -> (ParseError, bool) {
    match tree {
        GenericErrorTree::Base { location, kind } => {
            let (message, external) = match kind {
                BaseErrorKind::External(external) => match external.downcast::<ParseError>() {
                    Ok(error) => return (*error, true),
                    Err(external) => (external.to_string(), true),
                },
                kind => (kind.to_string(), false),
            };

            (
                ParseError {
                    message,
                    line: location.line,
                    column: location.column,
                },
                external,
            )
        }

        GenericErrorTree::Stack { base, contexts } => {
            let (mut error, external) = summarize(*base);

            let context = contexts.iter().find_map(|(_, context)| match context {
                StackContext::Context(context) => Some(*context),
                StackContext::Kind(_) => None,
            });

            if let (Some(context), false) = (context, external) {
                error.message = format!("{} (while parsing {})", error.message, context);
            }

            (error, external)
        }

        GenericErrorTree::Alt(branches) => branches
            .into_iter()
            .map(summarize)
            .max_by_key(|(error, _)| (error.line, error.column))
            .expect("error tree alt with no branches"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position() {
        let error = ParseError::new("unterminated string", 3, 14);
        assert_eq!(error.to_string(), "unterminated string (line 3, column 14)");
    }

    #[test]
    fn source_position_counts_every_newline_form() {
        let source = "ab\r\ncd\u{85}e\u{2028}xyz";
        let tail = &source[source.len() - 2..];
        assert_eq!(
            SourcePosition::recreate_context(source, tail),
            SourcePosition { line: 4, column: 2 },
        );
    }

    #[test]
    fn source_position_counts_chars_not_bytes() {
        let source = "日本語 x";
        let tail = &source[source.len() - 1..];
        assert_eq!(
            SourcePosition::recreate_context(source, tail),
            SourcePosition { line: 1, column: 5 },
        );
    }
}
