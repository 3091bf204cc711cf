//! Recursive-descent parser over the semantic token stream.
//!
//! Layout rules:
//! - A statement block is a run of statements starting at the same column.
//!   A body is indented when the line after its header starts deeper than
//!   the header's line; otherwise it is an inline block on the header line.
//! - `else`, `catch` and `finally` continue their construct when they appear
//!   on the same line or at the indentation of the construct's first line.
//! - Inside brackets newlines only separate elements.

mod errors;
mod expression;
mod statement;

pub use errors::{ParseError, ParseResult};

use decaf_core::patch::Span;
use decaf_core::text;

use crate::nodes::{FunctionFlavor, NodeId, NodeKind, SyntaxNode, SyntaxTree};
use crate::tokenizer::{Token, TokenKind};

pub(crate) struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    nodes: Vec<SyntaxNode>,
    /// Flavor of each function being parsed, innermost last.
    functions: Vec<FunctionFlavor>,
    /// Set while parsing unparenthesized call arguments, where a newline
    /// ends the argument rather than continuing a `.member` chain.
    in_implicit_call: bool,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(source: &'src str, tokens: &[Token]) -> Self {
        Parser {
            source,
            tokens: tokens.iter().copied().filter(Token::is_semantic).collect(),
            pos: 0,
            nodes: Vec::new(),
            functions: Vec::new(),
            in_implicit_call: false,
        }
    }

    pub(crate) fn parse_program(mut self) -> ParseResult<SyntaxTree> {
        self.skip_newlines();
        let body = match self.peek() {
            None => None,
            Some(first) => {
                let column = self.column(first.start());
                Some(self.parse_block_at(column)?)
            }
        };
        self.skip_newlines();
        if self.peek().is_some() {
            return Err(self.unexpected());
        }
        let root = self.add(NodeKind::Program { body }, Span::new(0, self.source.len()));
        tracing::trace!(nodes = self.nodes.len(), "parsed program");
        Ok(SyntaxTree::from_parts(self.nodes, root))
    }

    // ========================================================================
    // Cursor
    // ========================================================================

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<Token> {
        self.tokens.get(self.pos + ahead).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_kind_at(&self, ahead: usize) -> Option<TokenKind> {
        self.peek_at(ahead).map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn text_of(&self, token: Token) -> &'src str {
        token.text(self.source)
    }

    /// Start of the current token, or the end of the source.
    fn peek_start(&self) -> usize {
        self.peek().map_or(self.source.len(), |t| t.start())
    }

    /// End of the most recently consumed token.
    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            return 0;
        }
        self.tokens[self.pos - 1].end()
    }

    /// End of the most recently consumed token other than a `Newline`.
    ///
    /// A block swallows the newline that ends its last line, which never
    /// belongs to the construct that owns the block.
    fn node_end(&self) -> usize {
        self.tokens[..self.pos]
            .iter()
            .rev()
            .find(|t| t.kind != TokenKind::Newline)
            .map_or(0, |t| t.end())
    }

    fn advance(&mut self) -> ParseResult<Token> {
        let token = self.peek().ok_or_else(|| self.unexpected())?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        let token = self.peek().filter(|t| t.kind == kind)?;
        self.pos += 1;
        Some(token)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        match self.eat(kind) {
            Some(token) => Ok(token),
            None => Err(self.expected(what)),
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(TokenKind::Newline).is_some() {}
    }

    /// The current token starts right where the previous one ended.
    fn adjacent(&self) -> bool {
        self.peek().is_some_and(|t| self.pos > 0 && t.start() == self.prev_end())
    }

    // ========================================================================
    // Layout
    // ========================================================================

    fn column(&self, offset: usize) -> usize {
        offset - text::line_start(self.source, offset)
    }

    /// Indentation width of the line containing `offset`.
    fn line_indent(&self, offset: usize) -> usize {
        text::indentation_at(self.source, offset).len()
    }

    /// Statements aligned at `column`, separated by newlines or `;`.
    fn parse_block_at(&mut self, column: usize) -> ParseResult<NodeId> {
        let saved = std::mem::replace(&mut self.in_implicit_call, false);
        let start = self.peek_start();
        let mut statements = Vec::new();
        let mut end = start;
        loop {
            statements.push(self.parse_statement()?);
            end = self.node_end().max(end);
            if self.eat(TokenKind::Semicolon).is_some()
                && self.peek_kind().is_some_and(starts_statement)
            {
                continue;
            }
            if !self.at(TokenKind::Newline) {
                break;
            }
            let Some(next) = self.peek_at(1) else {
                self.pos += 1;
                break;
            };
            let next_column = self.column(next.start());
            if next_column > column {
                return Err(ParseError::syntax("unexpected indentation", next.start()));
            }
            if next_column < column || !starts_statement(next.kind) {
                break;
            }
            self.pos += 1;
        }
        self.in_implicit_call = saved;
        Ok(self.add(
            NodeKind::Block {
                statements,
                inline: false,
            },
            Span::new(start, end),
        ))
    }

    /// Statements on the current line separated by `;`.
    fn parse_inline_block(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let mut statements = vec![self.parse_statement()?];
        let mut end = self.node_end();
        while self.at(TokenKind::Semicolon) && self.peek_kind_at(1).is_some_and(starts_statement) {
            self.pos += 1;
            statements.push(self.parse_statement()?);
            end = self.node_end();
        }
        Ok(self.add(
            NodeKind::Block {
                statements,
                inline: true,
            },
            Span::new(start, end),
        ))
    }

    /// Body of a construct whose header was just consumed.
    ///
    /// `then` forces an inline body. Returns `None` for an empty body.
    fn parse_body(&mut self) -> ParseResult<Option<NodeId>> {
        if self.eat(TokenKind::Then).is_some() {
            return self.parse_inline_block().map(Some);
        }
        let header_indent = self.line_indent(self.prev_end());
        match self.peek_kind() {
            Some(TokenKind::Newline) => match self.peek_at(1) {
                Some(next) if self.column(next.start()) > header_indent => {
                    self.pos += 1;
                    let column = self.column(next.start());
                    self.parse_block_at(column).map(Some)
                }
                _ => Ok(None),
            },
            Some(kind) if starts_statement(kind) => self.parse_inline_block().map(Some),
            _ => Ok(None),
        }
    }

    /// Consume `kind` when it continues a construct starting on a line with
    /// indentation `indent` (same line, or a following line at that indent).
    fn eat_continuation(&mut self, kind: TokenKind, indent: usize) -> bool {
        if self.eat(kind).is_some() {
            return true;
        }
        if self.at(TokenKind::Newline) {
            if let Some(next) = self.peek_at(1) {
                if next.kind == kind && self.column(next.start()) == indent {
                    self.pos += 2;
                    return true;
                }
            }
        }
        false
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    fn add(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.child_ids() {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(SyntaxNode {
            kind,
            span,
            parent: None,
        });
        id
    }

    fn span_of(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    fn kind_of(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// Replace the kind of an existing node, re-parenting its children.
    fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        for child in kind.child_ids() {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes[id.index()].kind = kind;
    }

    // ========================================================================
    // Errors
    // ========================================================================

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Newline => {
                ParseError::syntax("unexpected end of line", token.start())
            }
            Some(token) => ParseError::syntax(
                format!("unexpected `{}`", self.text_of(token)),
                token.start(),
            ),
            None => ParseError::syntax("unexpected end of input", self.source.len()),
        }
    }

    fn expected(&self, what: &str) -> ParseError {
        let found = match self.peek() {
            Some(token) if token.kind == TokenKind::Newline => "end of line".to_string(),
            Some(token) => format!("`{}`", self.text_of(token)),
            None => "end of input".to_string(),
        };
        ParseError::syntax(format!("expected {}, found {}", what, found), self.peek_start())
    }
}

/// Tokens that can begin a statement.
fn starts_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Return | TokenKind::Break | TokenKind::Continue
    ) || starts_expression(kind)
}

/// Tokens that can begin an expression.
fn starts_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::StringStart
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::At
            | TokenKind::This
            | TokenKind::Super
            | TokenKind::Bool
            | TokenKind::Null
            | TokenKind::Undefined
            | TokenKind::Function
            | TokenKind::BoundFunction
            | TokenKind::Operator
            | TokenKind::Ellipsis
            | TokenKind::New
            | TokenKind::Do
            | TokenKind::Await
            | TokenKind::Yield
            | TokenKind::Throw
            | TokenKind::If
            | TokenKind::Unless
            | TokenKind::While
            | TokenKind::Until
            | TokenKind::Loop
            | TokenKind::For
            | TokenKind::Switch
            | TokenKind::Try
            | TokenKind::Class
    )
}

/// Decimal, hex, binary or octal integer value, if the literal is one.
fn parse_int_literal(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        return i64::from_str_radix(bin, 2).ok();
    }
    if let Some(oct) = lower.strip_prefix("0o") {
        return i64::from_str_radix(oct, 8).ok();
    }
    if lower.contains(['.', 'e']) {
        return None;
    }
    lower.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literals() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("1_000"), Some(1000));
        assert_eq!(parse_int_literal("0xff"), Some(255));
        assert_eq!(parse_int_literal("0b101"), Some(5));
        assert_eq!(parse_int_literal("0o17"), Some(15));
        assert_eq!(parse_int_literal("1.5"), None);
        assert_eq!(parse_int_literal("1e3"), None);
    }
}
