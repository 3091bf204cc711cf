//! Node boundaries.
//!
//! A node's syntax span never includes the grouping parentheses around it.
//! Patchers need them anyway: wrapping `(a)` in a call must put the call
//! outside the parens, and a node that already sits in parens needs no new
//! ones. Three nested ranges describe each node:
//!
//! - content: the node's own span
//! - inner: content plus the closest pair of grouping parens, if any
//! - outer: content plus every layer of grouping parens
//!
//! Only `(`/`)` group tokens count. Call parentheses and the parentheses of
//! a parameter list belong to the enclosing construct.

use decaf_coffee::TokenKind;
use decaf_core::patch::Span;

use crate::tokens::TokenIndex;

/// Boundaries of one node in the text being patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub content: Span,
    pub inner: Span,
    pub outer: Span,
    /// First and last token of the content.
    pub content_tokens: Option<(usize, usize)>,
    /// First and last token of the outer range.
    pub outer_tokens: Option<(usize, usize)>,
}

impl Bounds {
    pub fn compute(tokens: &TokenIndex<'_>, content: Span) -> Bounds {
        let content_tokens = token_range(tokens, content);
        let mut outer = content;
        let mut outer_tokens = content_tokens;
        let mut inner = None;
        while let Some((open, close)) = enclosing_group(tokens, outer) {
            outer = Span::new(tokens.span(open).start, tokens.span(close).end);
            outer_tokens = Some((open, close));
            inner.get_or_insert(outer);
        }
        Bounds {
            content,
            inner: inner.unwrap_or(content),
            outer,
            content_tokens,
            outer_tokens,
        }
    }

    /// Whether grouping parentheses surround the content.
    pub fn is_parenthesized(&self) -> bool {
        self.inner != self.content
    }
}

fn token_range(tokens: &TokenIndex<'_>, span: Span) -> Option<(usize, usize)> {
    let first = tokens.first_at_or_after(span.start)?;
    let last = tokens.last_at_or_before(span.end)?;
    (first <= last && tokens.span(first).start < span.end).then_some((first, last))
}

/// The grouping parens immediately around `span`.
fn enclosing_group(tokens: &TokenIndex<'_>, span: Span) -> Option<(usize, usize)> {
    let open = tokens.semantic_before(span.start)?;
    if tokens.kind(open) != Some(TokenKind::LParen) {
        return None;
    }
    let close = tokens.matching(open)?;
    if tokens.semantic_after(span.end)? != close {
        return None;
    }
    let follows_params = tokens
        .semantic_after(tokens.span(close).end)
        .and_then(|next| tokens.kind(next))
        .is_some_and(|kind| matches!(kind, TokenKind::Function | TokenKind::BoundFunction));
    (!follows_params).then_some((open, close))
}
