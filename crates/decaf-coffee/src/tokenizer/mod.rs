//! CoffeeScript tokenizer.
//!
//! Produces an ordered list of [`Token`]s covering every semantic element
//! and comment of the input. Whitespace is not tokenized; a `Newline` token
//! is emitted at the end of every line that holds at least one semantic
//! token, so blank and comment-only lines produce none.
//!
//! Strings with `#{...}` interpolation are split into `StringStart`,
//! `StringContent`, `InterpolationStart`, the interpolated tokens,
//! `InterpolationEnd` and `StringEnd`.

mod token;

#[cfg(test)]
mod tests;

pub use token::{Token, TokenKind};

use thiserror::Error;

/// Error raised when the input cannot be split into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TokenizeError {
    pub message: String,
    pub offset: usize,
}

impl TokenizeError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        TokenizeError {
            message: message.into(),
            offset,
        }
    }
}

/// Tokenize `source`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenizeError> {
    Lexer::new(source).run()
}

const PUNCTUATION: &[(&str, TokenKind)] = &[
    (">>>=", TokenKind::CompoundAssign),
    ("...", TokenKind::Ellipsis),
    ("?::", TokenKind::SoakProto),
    ("**=", TokenKind::CompoundAssign),
    ("//=", TokenKind::CompoundAssign),
    ("%%=", TokenKind::CompoundAssign),
    ("<<=", TokenKind::CompoundAssign),
    (">>=", TokenKind::CompoundAssign),
    ("||=", TokenKind::CompoundAssign),
    ("&&=", TokenKind::CompoundAssign),
    (">>>", TokenKind::Operator),
    ("->", TokenKind::Function),
    ("=>", TokenKind::BoundFunction),
    ("..", TokenKind::Range),
    ("::", TokenKind::Proto),
    ("?.", TokenKind::SoakDot),
    ("?[", TokenKind::SoakIndexStart),
    ("?(", TokenKind::SoakCallStart),
    ("?=", TokenKind::CompoundAssign),
    ("+=", TokenKind::CompoundAssign),
    ("-=", TokenKind::CompoundAssign),
    ("*=", TokenKind::CompoundAssign),
    ("/=", TokenKind::CompoundAssign),
    ("%=", TokenKind::CompoundAssign),
    ("&=", TokenKind::CompoundAssign),
    ("|=", TokenKind::CompoundAssign),
    ("^=", TokenKind::CompoundAssign),
    ("**", TokenKind::Operator),
    ("//", TokenKind::Operator),
    ("%%", TokenKind::Operator),
    ("<<", TokenKind::Operator),
    (">>", TokenKind::Operator),
    ("<=", TokenKind::Operator),
    (">=", TokenKind::Operator),
    ("==", TokenKind::Operator),
    ("!=", TokenKind::Operator),
    ("&&", TokenKind::Operator),
    ("||", TokenKind::Operator),
    ("++", TokenKind::Operator),
    ("--", TokenKind::Operator),
    ("+", TokenKind::Operator),
    ("-", TokenKind::Operator),
    ("*", TokenKind::Operator),
    ("/", TokenKind::Operator),
    ("%", TokenKind::Operator),
    ("<", TokenKind::Operator),
    (">", TokenKind::Operator),
    ("&", TokenKind::Operator),
    ("|", TokenKind::Operator),
    ("^", TokenKind::Operator),
    ("!", TokenKind::Operator),
    ("~", TokenKind::Operator),
    ("=", TokenKind::Assign),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (";", TokenKind::Semicolon),
    (":", TokenKind::Colon),
    (".", TokenKind::Dot),
    ("@", TokenKind::At),
    ("?", TokenKind::Question),
];

/// An open bracket awaiting its partner.
#[derive(Debug, Clone, Copy)]
enum Open {
    Bracket(TokenKind),
    Interpolation { quote: u8 },
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    open: Vec<(Open, usize)>,
    line_has_content: bool,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            open: Vec::new(),
            line_has_content: false,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, TokenizeError> {
        while self.pos < self.bytes.len() {
            self.lex_next()?;
        }
        if self.line_has_content {
            let end = self.bytes.len();
            self.tokens.push(Token::new(TokenKind::Newline, end, end));
        }
        if let Some(&(open, offset)) = self.open.last() {
            let message = match open {
                Open::Interpolation { .. } => "unterminated string interpolation".to_string(),
                Open::Bracket(kind) => format!("unclosed {}", describe_open(kind)),
            };
            return Err(TokenizeError::new(message, offset));
        }
        tracing::trace!(tokens = self.tokens.len(), "tokenized source");
        Ok(self.tokens)
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        if kind.is_semantic() && kind != TokenKind::Newline {
            self.line_has_content = true;
        }
        self.tokens.push(Token::new(kind, start, end));
    }

    fn last_semantic(&self) -> Option<&Token> {
        self.tokens.iter().rev().find(|t| t.is_semantic())
    }

    /// The previous semantic token, when it ends exactly at `offset`.
    fn adjacent_before(&self, offset: usize) -> Option<TokenKind> {
        self.last_semantic()
            .filter(|t| t.end() == offset && t.kind != TokenKind::Newline)
            .map(|t| t.kind)
    }

    fn lex_next(&mut self) -> Result<(), TokenizeError> {
        let b = self.bytes[self.pos];
        if b == b'}' {
            if let Some((Open::Interpolation { quote }, _)) = self.open.last().copied() {
                self.open.pop();
                self.push(TokenKind::InterpolationEnd, self.pos, self.pos + 1);
                self.pos += 1;
                return self.lex_string_body(quote);
            }
        }
        match b {
            b' ' | b'\t' | b'\r' => {
                self.pos += 1;
                Ok(())
            }
            b'\n' => {
                if self.line_has_content {
                    self.push(TokenKind::Newline, self.pos, self.pos + 1);
                    self.line_has_content = false;
                }
                self.pos += 1;
                Ok(())
            }
            b'\\' if self.is_line_continuation() => {
                while self.bytes[self.pos] != b'\n' {
                    self.pos += 1;
                }
                self.pos += 1;
                Ok(())
            }
            b'#' => {
                self.lex_comment();
                Ok(())
            }
            b'"' | b'\'' => self.lex_string(b),
            b'`' => Err(TokenizeError::new(
                "embedded JavaScript is not supported",
                self.pos,
            )),
            b'0'..=b'9' => {
                self.lex_number();
                Ok(())
            }
            _ if is_identifier_start(b) => {
                self.lex_word();
                Ok(())
            }
            _ => self.lex_punctuation(),
        }
    }

    fn is_line_continuation(&self) -> bool {
        self.bytes[self.pos + 1..]
            .iter()
            .take_while(|&&c| c != b'\n')
            .all(|&c| c == b' ' || c == b'\t' || c == b'\r')
            && self.bytes[self.pos + 1..].contains(&b'\n')
    }

    fn lex_comment(&mut self) {
        let start = self.pos;
        let rest = &self.bytes[start..];
        if rest.starts_with(b"###") && !rest.starts_with(b"####") {
            let body_start = start + 3;
            let end = self.source[body_start..]
                .find("###")
                .map(|p| body_start + p + 3)
                .unwrap_or(self.bytes.len());
            self.push(TokenKind::HereComment, start, end);
            self.pos = end;
            return;
        }
        let end = self.source[start..]
            .find('\n')
            .map(|p| start + p)
            .unwrap_or(self.bytes.len());
        self.push(TokenKind::Comment, start, end);
        self.pos = end;
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        let radix_prefix = self.bytes[start] == b'0'
            && matches!(self.peek_byte(1), Some(b'x' | b'X' | b'b' | b'B' | b'o' | b'O'));
        if radix_prefix {
            self.pos += 2;
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_alphanumeric() {
                self.pos += 1;
            }
        } else {
            self.eat_digits();
            if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|c| c.is_ascii_digit())
            {
                self.pos += 1;
                self.eat_digits();
            }
            if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
                let sign = usize::from(matches!(self.peek_byte(1), Some(b'+' | b'-')));
                if self.peek_byte(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1 + sign;
                    self.eat_digits();
                }
            }
        }
        self.push(TokenKind::Number, start, self.pos);
    }

    fn eat_digits(&mut self) {
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_digit() || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
    }

    fn lex_word(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_identifier_part(self.bytes[self.pos]) {
            self.pos += 1;
        }
        let word = &self.source[start..self.pos];

        if matches!(word, "or" | "and")
            && self.peek_byte(0) == Some(b'=')
            && self.peek_byte(1) != Some(b'=')
        {
            self.pos += 1;
            self.push(TokenKind::CompoundAssign, start, self.pos);
            return;
        }

        let after_accessor = matches!(
            self.adjacent_before(start),
            Some(TokenKind::Dot | TokenKind::SoakDot | TokenKind::Proto | TokenKind::SoakProto | TokenKind::At)
        );
        let is_key = self.peek_byte(0) == Some(b':') && self.peek_byte(1) != Some(b':');
        let kind = if after_accessor || is_key {
            TokenKind::Identifier
        } else {
            self.keyword_kind(word)
        };
        self.push(kind, start, self.pos);
    }

    fn keyword_kind(&self, word: &str) -> TokenKind {
        let previous = self.last_semantic().map(|t| t.kind);
        match word {
            "if" => TokenKind::If,
            "unless" => TokenKind::Unless,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "until" => TokenKind::Until,
            "loop" => TokenKind::Loop,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "of" => TokenKind::Of,
            "by" => TokenKind::By,
            "when" => TokenKind::When,
            "own" if previous == Some(TokenKind::For) => TokenKind::Own,
            "from" if previous == Some(TokenKind::Yield) => TokenKind::From,
            "switch" => TokenKind::Switch,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "super" => TokenKind::Super,
            "new" => TokenKind::New,
            "this" => TokenKind::This,
            "true" | "false" | "yes" | "no" | "on" | "off" => TokenKind::Bool,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "do" => TokenKind::Do,
            "yield" => TokenKind::Yield,
            "await" => TokenKind::Await,
            "and" | "or" | "not" | "is" | "isnt" | "instanceof" | "typeof" | "delete" => {
                TokenKind::Operator
            }
            _ => TokenKind::Identifier,
        }
    }

    // ========================================================================
    // Strings
    // ========================================================================

    fn lex_string(&mut self, quote: u8) -> Result<(), TokenizeError> {
        let start = self.pos;
        if self.peek_byte(1) == Some(quote) && self.peek_byte(2) == Some(quote) {
            return Err(TokenizeError::new("block strings are not supported", start));
        }
        if quote == b'"' && self.has_interpolation(start + 1) {
            self.push(TokenKind::StringStart, start, start + 1);
            self.pos += 1;
            return self.lex_string_body(quote);
        }
        let mut i = start + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                c if c == quote => {
                    self.push(TokenKind::String, start, i + 1);
                    self.pos = i + 1;
                    return Ok(());
                }
                _ => i += 1,
            }
        }
        Err(TokenizeError::new("unterminated string", start))
    }

    fn has_interpolation(&self, from: usize) -> bool {
        let mut i = from;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'"' => return false,
                b'#' if self.bytes.get(i + 1) == Some(&b'{') => return true,
                _ => i += 1,
            }
        }
        false
    }

    /// Lex string content up to the closing quote or the next `#{`.
    fn lex_string_body(&mut self, quote: u8) -> Result<(), TokenizeError> {
        let start = self.pos;
        let mut i = start;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                c if c == quote => {
                    if i > start {
                        self.push(TokenKind::StringContent, start, i);
                    }
                    self.push(TokenKind::StringEnd, i, i + 1);
                    self.pos = i + 1;
                    return Ok(());
                }
                b'#' if self.bytes.get(i + 1) == Some(&b'{') => {
                    if i > start {
                        self.push(TokenKind::StringContent, start, i);
                    }
                    self.push(TokenKind::InterpolationStart, i, i + 2);
                    self.open.push((Open::Interpolation { quote }, i));
                    self.pos = i + 2;
                    return Ok(());
                }
                _ => i += 1,
            }
        }
        Err(TokenizeError::new("unterminated string", start))
    }

    // ========================================================================
    // Punctuation
    // ========================================================================

    fn lex_punctuation(&mut self) -> Result<(), TokenizeError> {
        let start = self.pos;
        let rest = &self.source[start..];
        let Some(&(text, kind)) = PUNCTUATION.iter().find(|(text, _)| rest.starts_with(text)) else {
            let ch = rest.chars().next().unwrap_or('?');
            return Err(TokenizeError::new(format!("unexpected character `{}`", ch), start));
        };
        let end = start + text.len();
        let adjacent = self.adjacent_before(start);

        let kind = match kind {
            TokenKind::LParen if adjacent.is_some_and(TokenKind::is_callable_end) => {
                TokenKind::CallStart
            }
            TokenKind::LBracket
                if adjacent.is_some_and(|k| k.is_callable_end() || k == TokenKind::At) =>
            {
                TokenKind::IndexStart
            }
            TokenKind::Question => {
                let next = self.bytes.get(end).copied();
                let ends_operand = matches!(
                    next,
                    None | Some(b' ' | b'\t' | b'\r' | b'\n' | b')' | b']' | b'}' | b',' | b';')
                );
                if adjacent.is_some() && ends_operand {
                    TokenKind::Existence
                } else {
                    TokenKind::Question
                }
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                self.close_bracket(kind, start)?
            }
            other => other,
        };

        if kind.is_open_bracket() {
            self.open.push((Open::Bracket(kind), start));
        }
        self.push(kind, start, end);
        self.pos = end;
        Ok(())
    }

    fn close_bracket(&mut self, close: TokenKind, offset: usize) -> Result<TokenKind, TokenizeError> {
        let Some((Open::Bracket(open), _)) = self.open.last().copied() else {
            return Err(TokenizeError::new(
                format!("unmatched `{}`", &self.source[offset..offset + 1]),
                offset,
            ));
        };
        let resolved = match (open, close) {
            (TokenKind::LParen, TokenKind::RParen) => TokenKind::RParen,
            (TokenKind::CallStart | TokenKind::SoakCallStart, TokenKind::RParen) => {
                TokenKind::CallEnd
            }
            (TokenKind::LBracket, TokenKind::RBracket) => TokenKind::RBracket,
            (TokenKind::IndexStart | TokenKind::SoakIndexStart, TokenKind::RBracket) => {
                TokenKind::IndexEnd
            }
            (TokenKind::LBrace, TokenKind::RBrace) => TokenKind::RBrace,
            _ => {
                return Err(TokenizeError::new(
                    format!(
                        "`{}` does not close {}",
                        &self.source[offset..offset + 1],
                        describe_open(open)
                    ),
                    offset,
                ))
            }
        };
        self.open.pop();
        Ok(resolved)
    }
}

fn describe_open(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::LParen | TokenKind::CallStart | TokenKind::SoakCallStart => "`(`",
        TokenKind::LBracket | TokenKind::IndexStart | TokenKind::SoakIndexStart => "`[`",
        _ => "`{`",
    }
}

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_identifier_part(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}
