//! Locates method-call operators in a token sequence together with the
//! whitespace hugging each side of them.

use crate::parse::lexer::{CallOperator, Token, TokenKind};
use crate::parse::span::SourceSpan;

/// One `.`, `&.` or `::` in the source and the whitespace around it.
///
/// Both whitespace spans are confined to the operator's line. When there is
/// no whitespace on a side, that span is empty and sits at the operator edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorOccurrence {
    pub operator: CallOperator,
    pub span: SourceSpan,
    pub space_before: SourceSpan,
    pub space_after: SourceSpan,
    /// Only whitespace precedes the operator on its line (`foo\n  .bar`).
    pub starts_line: bool,
    /// Only whitespace, optionally a comment, follows the operator on its
    /// line (`foo.\n  bar`).
    pub ends_line: bool,
    /// The nearest non-whitespace token before the operator on the same line
    /// can end an expression.
    pub has_receiver: bool,
    /// That token is a bare identifier, which may be a method name taking
    /// the rest of the line as arguments (`include ::Comparable`).
    pub follows_identifier: bool,
}

impl OperatorOccurrence {
    /// `::` written as a top-level constant prefix: whitespace before it and
    /// either none after (`Foo ::Bar`) or an identifier in front of it
    /// (`include :: Comparable`). Removing the space before would turn the
    /// argument into a scoped lookup.
    pub fn is_constant_prefix(&self) -> bool {
        self.operator == CallOperator::DoubleColon
            && !self.space_before.is_empty()
            && (self.space_after.is_empty() || self.follows_identifier)
    }
}

/// Find every method-call operator in document order.
pub fn locate_operators(tokens: &[Token<'_>]) -> Vec<OperatorOccurrence> {
    tokens
        .iter()
        .enumerate()
        .filter_map(|(i, token)| {
            let operator = token.call_operator()?;
            Some(occurrence_at(tokens, i, operator))
        })
        .collect()
}

fn occurrence_at(tokens: &[Token<'_>], i: usize, operator: CallOperator) -> OperatorOccurrence {
    let token = &tokens[i];

    let mut first_ws = i;
    while first_ws > 0 && tokens[first_ws - 1].is_whitespace() {
        first_ws -= 1;
    }
    let space_before = if first_ws < i {
        SourceSpan::new(tokens[first_ws].span.start, tokens[i - 1].span.end)
    } else {
        SourceSpan::point(token.span.start)
    };
    let prev = first_ws.checked_sub(1).map(|j| &tokens[j]);

    let mut past_ws = i + 1;
    while tokens.get(past_ws).is_some_and(Token::is_whitespace) {
        past_ws += 1;
    }
    let space_after = if past_ws > i + 1 {
        SourceSpan::new(tokens[i + 1].span.start, tokens[past_ws - 1].span.end)
    } else {
        SourceSpan::point(token.span.end)
    };
    let next = tokens.get(past_ws);

    OperatorOccurrence {
        operator,
        span: token.span,
        space_before,
        space_after,
        starts_line: prev.is_none_or(|t| t.kind == TokenKind::Newline),
        ends_line: next.is_none_or(|t| matches!(t.kind, TokenKind::Newline | TokenKind::Comment)),
        has_receiver: prev.is_some_and(Token::is_receiver),
        follows_identifier: prev.is_some_and(|t| t.kind == TokenKind::Identifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::lexer::tokenize;

    fn locate(source: &str) -> Vec<OperatorOccurrence> {
        locate_operators(&tokenize(source))
    }

    fn only(source: &str) -> OperatorOccurrence {
        let mut found = locate(source);
        assert_eq!(found.len(), 1, "expected one operator in {source:?}");
        found.remove(0)
    }

    #[test]
    fn tight_call_has_empty_spans_at_edges() {
        let occ = only("foo.bar");
        assert_eq!(occ.operator, CallOperator::Dot);
        assert_eq!(occ.span.range(), 3..4);
        assert!(occ.space_before.is_empty());
        assert_eq!(occ.space_before.start.offset, 3);
        assert!(occ.space_after.is_empty());
        assert_eq!(occ.space_after.start.offset, 4);
        assert!(occ.has_receiver);
        assert!(!occ.starts_line);
        assert!(!occ.ends_line);
    }

    #[test]
    fn whitespace_on_both_sides() {
        let occ = only("foo  &.\tbar");
        assert_eq!(occ.operator, CallOperator::SafeNavigation);
        assert_eq!(occ.space_before.range(), 3..5);
        assert_eq!(occ.space_after.range(), 7..8);
    }

    #[test]
    fn leading_indentation_starts_line() {
        let occ = only("foo\n  .bar");
        assert!(occ.starts_line);
        assert!(!occ.has_receiver);
        assert_eq!(occ.space_before.range(), 4..6);
    }

    #[test]
    fn trailing_operator_ends_line() {
        let occ = only("foo .\n  bar");
        assert!(occ.ends_line);
        assert!(occ.space_after.is_empty());
        assert_eq!(occ.space_before.range(), 3..4);
    }

    #[test]
    fn trailing_spaces_before_newline_still_end_line() {
        let occ = only("foo.  \n  bar");
        assert!(occ.ends_line);
        assert_eq!(occ.space_after.range(), 4..6);
    }

    #[test]
    fn comment_after_operator_ends_line() {
        assert!(only("foo. # why\n  bar").ends_line);
    }

    #[test]
    fn operator_at_end_of_input_ends_line() {
        assert!(only("foo.").ends_line);
    }

    #[test]
    fn operator_at_start_of_input_starts_line() {
        let occ = only("::Foo");
        assert!(occ.starts_line);
        assert!(!occ.has_receiver);
    }

    #[test]
    fn operators_after_non_receivers_have_no_receiver() {
        assert!(!only("klass = :: Foo").has_receiver);
        assert!(!only("class A <  ::B\nend").has_receiver);
        assert!(only("'foo' .bar").has_receiver);
        assert!(only("foo() .bar").has_receiver);
        assert!(only("self .bar").has_receiver);
    }

    #[test]
    fn constant_prefix_detection() {
        assert!(only("include ::Comparable").is_constant_prefix());
        assert!(only("Foo ::Bar").is_constant_prefix());
        assert!(!only("Foo:: Bar").is_constant_prefix());
        assert!(!only("foo .bar").is_constant_prefix());
    }

    #[test]
    fn spaced_double_colon_after_identifier_is_an_argument_prefix() {
        let occ = only("include :: Comparable");
        assert!(occ.follows_identifier);
        assert!(occ.is_constant_prefix());

        let occ = only("RuboCop :: Cop");
        assert!(!occ.follows_identifier);
        assert!(!occ.is_constant_prefix());

        assert!(!only("include::Comparable").is_constant_prefix());
    }

    #[test]
    fn chain_is_reported_in_document_order() {
        let found = locate(":: RuboCop:: Cop:: Cop::Cop");
        let starts: Vec<usize> = found.iter().map(|o| o.span.start.offset).collect();
        assert_eq!(starts, vec![0, 10, 16, 22]);
        assert!(found.iter().all(|o| o.operator == CallOperator::DoubleColon));
    }

    #[test]
    fn operators_in_literals_are_not_located() {
        assert!(locate("'foo. bar' # baz. qux").is_empty());
        assert!(locate("x = 1..2").is_empty());
        assert!(locate("foo && bar").is_empty());
    }

    #[test]
    fn positions_are_reported_per_line() {
        let occ = only("foo\n  . bar");
        assert_eq!(occ.span.start.line, 2);
        assert_eq!(occ.span.start.column, 3);
        assert_eq!(occ.space_after.start.column, 4);
        assert_eq!(occ.space_after.end.column, 5);
    }
}
