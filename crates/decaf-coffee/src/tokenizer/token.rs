//! Token types produced by the tokenizer.

use decaf_core::patch::Span;

/// Classification of a source token.
///
/// Brackets are classified by role: `CallStart`/`CallEnd` and
/// `IndexStart`/`IndexEnd` surround call arguments and index expressions,
/// while `LParen`/`RParen` and `LBracket`/`RBracket` are grouping parentheses
/// and array literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    /// A complete string without interpolation.
    String,
    StringStart,
    StringContent,
    StringEnd,
    InterpolationStart,
    InterpolationEnd,

    LParen,
    RParen,
    CallStart,
    CallEnd,
    LBracket,
    RBracket,
    IndexStart,
    IndexEnd,
    LBrace,
    RBrace,

    Comma,
    Semicolon,
    Colon,
    Dot,
    /// `?.`
    SoakDot,
    /// `?[`
    SoakIndexStart,
    /// `?(`
    SoakCallStart,
    /// `::`
    Proto,
    /// `?::`
    SoakProto,
    /// Postfix `?` (`a?`).
    Existence,
    /// Binary `?` (`a ? b`).
    Question,
    At,
    /// `..`
    Range,
    /// `...`
    Ellipsis,
    /// `->`
    Function,
    /// `=>`
    BoundFunction,
    Assign,
    /// `+=`, `?=`, `or=`, ...
    CompoundAssign,
    /// Arithmetic, comparison, logical and word operators (`and`, `is`, ...).
    Operator,

    If,
    Unless,
    Then,
    Else,
    While,
    Until,
    Loop,
    For,
    In,
    Of,
    By,
    When,
    Own,
    From,
    Switch,
    Try,
    Catch,
    Finally,
    Throw,
    Return,
    Break,
    Continue,
    Class,
    Extends,
    Super,
    New,
    This,
    Bool,
    Null,
    Undefined,
    Do,
    Yield,
    Await,

    Newline,
    Comment,
    HereComment,
}

impl TokenKind {
    /// Comments carry no meaning for the parser.
    pub fn is_semantic(self) -> bool {
        !matches!(self, TokenKind::Comment | TokenKind::HereComment)
    }

    pub fn is_open_bracket(self) -> bool {
        matches!(
            self,
            TokenKind::LParen
                | TokenKind::CallStart
                | TokenKind::SoakCallStart
                | TokenKind::LBracket
                | TokenKind::IndexStart
                | TokenKind::SoakIndexStart
                | TokenKind::LBrace
                | TokenKind::InterpolationStart
        )
    }

    pub fn is_close_bracket(self) -> bool {
        matches!(
            self,
            TokenKind::RParen
                | TokenKind::CallEnd
                | TokenKind::RBracket
                | TokenKind::IndexEnd
                | TokenKind::RBrace
                | TokenKind::InterpolationEnd
        )
    }

    /// Tokens after which an adjacent `(` starts a call and `[` an index.
    pub(crate) fn is_callable_end(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::RParen
                | TokenKind::CallEnd
                | TokenKind::RBracket
                | TokenKind::IndexEnd
                | TokenKind::String
                | TokenKind::StringEnd
                | TokenKind::This
                | TokenKind::Super
        )
    }
}

/// A token with its byte range in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Token {
            kind,
            span: Span::new(start, end),
        }
    }

    pub fn start(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }

    /// The token's text in `source`.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.start..self.span.end]
    }

    pub fn is_semantic(&self) -> bool {
        self.kind.is_semantic()
    }
}
