//! CoffeeScript front end for decaf.
//!
//! - [`tokenizer`]: source text to an ordered token list, comments included
//! - [`nodes`]: arena syntax tree with parent links
//! - [`parse`]: tokens to tree
//!
//! The tree is immutable once built. Patchers edit text through
//! `decaf_core::SourceEditor` and re-parse when they need a fresh tree.

pub mod nodes;
pub mod parser;
pub mod tokenizer;

pub use nodes::{
    BinaryOperator, FunctionFlavor, NodeId, NodeKind, SyntaxNode, SyntaxTree, UnaryOperator,
};
pub use parser::ParseError;
pub use tokenizer::{Token, TokenKind, TokenizeError};

/// Tokens and syntax tree of one source text.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    /// Every token, comments included, in source order.
    pub tokens: Vec<Token>,
    pub tree: SyntaxTree,
}

/// Tokenize and parse `source`.
pub fn parse(source: &str) -> Result<ParsedSource, ParseError> {
    let tokens = tokenizer::tokenize(source)?;
    let tree = parser::Parser::new(source, &tokens).parse_program()?;
    tracing::debug!(tokens = tokens.len(), nodes = tree.len(), "parsed source");
    Ok(ParsedSource { tokens, tree })
}
