//! Random access over a token list.
//!
//! [`TokenIndex`] answers the positional questions patchers ask about the
//! original text: which token starts or ends at an offset, which semantic
//! token is next to a range, which bracket closes a given one.
//!
//! "Trivia" below means comments and line ends: tokens that never change
//! what the code between two semantic tokens means.

use decaf_coffee::{Token, TokenKind};
use decaf_core::patch::Span;

/// Tokens of one source text plus bracket matching.
#[derive(Debug, Clone)]
pub struct TokenIndex<'a> {
    source: &'a str,
    tokens: &'a [Token],
    /// Index of the matching bracket for every bracket token.
    matching: Vec<Option<usize>>,
}

fn is_trivia(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Comment | TokenKind::HereComment | TokenKind::Newline
    )
}

impl<'a> TokenIndex<'a> {
    pub fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        let mut matching = vec![None; tokens.len()];
        let mut open: Vec<usize> = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            if token.kind.is_open_bracket() {
                open.push(i);
            } else if token.kind.is_close_bracket() {
                if let Some(j) = open.pop() {
                    matching[i] = Some(j);
                    matching[j] = Some(i);
                }
            }
        }
        TokenIndex {
            source,
            tokens,
            matching,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Token> {
        self.tokens.get(index)
    }

    pub fn kind(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|t| t.kind)
    }

    pub fn text(&self, index: usize) -> &'a str {
        self.tokens
            .get(index)
            .map_or("", |t| t.text(self.source))
    }

    /// The bracket closing (or opening) the bracket at `index`.
    pub fn matching(&self, index: usize) -> Option<usize> {
        self.matching.get(index).copied().flatten()
    }

    /// First token starting at or after `offset`.
    pub fn first_at_or_after(&self, offset: usize) -> Option<usize> {
        let i = self.tokens.partition_point(|t| t.start() < offset);
        (i < self.tokens.len()).then_some(i)
    }

    /// Last token ending at or before `offset`.
    pub fn last_at_or_before(&self, offset: usize) -> Option<usize> {
        let i = self.tokens.partition_point(|t| t.end() <= offset);
        i.checked_sub(1)
    }

    /// The token starting exactly at `offset`.
    pub fn starting_at(&self, offset: usize) -> Option<usize> {
        let i = self.first_at_or_after(offset)?;
        (self.tokens[i].start() == offset).then_some(i)
    }

    /// Nearest non-trivia token ending at or before `offset`.
    pub fn semantic_before(&self, offset: usize) -> Option<usize> {
        let last = self.last_at_or_before(offset)?;
        (0..=last).rev().find(|&i| !is_trivia(self.tokens[i].kind))
    }

    /// Nearest non-trivia token starting at or after `offset`.
    pub fn semantic_after(&self, offset: usize) -> Option<usize> {
        let first = self.first_at_or_after(offset)?;
        (first..self.tokens.len()).find(|&i| !is_trivia(self.tokens[i].kind))
    }

    /// First token of `kind` inside `[from, to)`.
    pub fn find_in(&self, from: usize, to: usize, kind: TokenKind) -> Option<usize> {
        let first = self.first_at_or_after(from)?;
        self.tokens[first..]
            .iter()
            .take_while(|t| t.end() <= to)
            .position(|t| t.kind == kind)
            .map(|p| first + p)
    }

    /// Last token of `kind` inside `[from, to)`.
    pub fn rfind_in(&self, from: usize, to: usize, kind: TokenKind) -> Option<usize> {
        let first = self.first_at_or_after(from)?;
        let last = self.last_at_or_before(to)?;
        (first..=last)
            .rev()
            .find(|&i| self.tokens[i].kind == kind)
    }

    /// First token of any of `kinds` inside `[from, to)`.
    pub fn find_any_in(&self, from: usize, to: usize, kinds: &[TokenKind]) -> Option<usize> {
        let first = self.first_at_or_after(from)?;
        self.tokens[first..]
            .iter()
            .take_while(|t| t.end() <= to)
            .position(|t| kinds.contains(&t.kind))
            .map(|p| first + p)
    }

    /// Span of the token at `index`.
    pub fn span(&self, index: usize) -> Span {
        self.tokens
            .get(index)
            .map_or(Span::empty_at(self.source.len()), |t| t.span)
    }

    /// Comment tokens in source order.
    pub fn comments(&self) -> impl Iterator<Item = &'a Token> + 'a {
        self.tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Comment | TokenKind::HereComment))
    }

    /// Whether `offset` lies strictly inside a string or block comment, where
    /// inserted text would change the value or the comment.
    pub fn inside_literal_text(&self, offset: usize) -> bool {
        let i = self.tokens.partition_point(|t| t.start() < offset);
        let Some(token) = i.checked_sub(1).map(|j| &self.tokens[j]) else {
            return false;
        };
        matches!(
            token.kind,
            TokenKind::String | TokenKind::StringContent | TokenKind::HereComment
        ) && offset < token.end()
    }

    /// A line comment starting on the same line after `offset` with only
    /// whitespace before it.
    pub fn trailing_comment(&self, offset: usize) -> Option<usize> {
        let i = self.first_at_or_after(offset)?;
        let token = &self.tokens[i];
        if token.kind != TokenKind::Comment {
            return None;
        }
        let gap = &self.source[offset..token.start()];
        gap.bytes().all(|b| b == b' ' || b == b'\t').then_some(i)
    }
}
