//! Statements and control-flow constructs.

use decaf_core::patch::Span;

use super::{starts_expression, ParseError, ParseResult, Parser};
use crate::nodes::{NodeId, NodeKind};
use crate::tokenizer::TokenKind;

/// Parsed `for` header, shared by prefix and postfix loops.
struct ForHeader {
    own: bool,
    first: NodeId,
    second: Option<NodeId>,
    of: bool,
    target: NodeId,
    step: Option<NodeId>,
    filter: Option<NodeId>,
}

impl Parser<'_> {
    pub(super) fn parse_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let statement = match self.peek_kind() {
            Some(TokenKind::Return) => self.parse_return()?,
            Some(TokenKind::Break) => {
                let token = self.advance()?;
                self.add(NodeKind::Break, token.span)
            }
            Some(TokenKind::Continue) => {
                let token = self.advance()?;
                self.add(NodeKind::Continue, token.span)
            }
            _ => self.parse_expression()?,
        };
        self.parse_postfix_modifiers(statement, start)
    }

    fn parse_return(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance()?;
        let has_value = self.peek_kind().is_some_and(|kind| {
            starts_expression(kind)
                && !matches!(
                    kind,
                    TokenKind::If
                        | TokenKind::Unless
                        | TokenKind::While
                        | TokenKind::Until
                        | TokenKind::For
                )
        });
        let expression = if has_value {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(self.add(
            NodeKind::Return { expression },
            Span::new(keyword.start(), self.node_end()),
        ))
    }

    /// Trailing `if`, `unless`, `while`, `until` and `for` clauses.
    pub(super) fn parse_postfix_modifiers(
        &mut self,
        mut statement: NodeId,
        start: usize,
    ) -> ParseResult<NodeId> {
        loop {
            statement = match self.peek_kind() {
                Some(TokenKind::If | TokenKind::Unless) => {
                    let keyword = self.advance()?;
                    let condition = self.parse_header_expression()?;
                    let body = self.wrap_in_block(statement, start);
                    self.add(
                        NodeKind::Conditional {
                            condition,
                            consequent: Some(body),
                            alternate: None,
                            negated: keyword.kind == TokenKind::Unless,
                            postfix: true,
                        },
                        Span::new(start, self.node_end()),
                    )
                }
                Some(TokenKind::While | TokenKind::Until) => {
                    let keyword = self.advance()?;
                    let condition = self.parse_header_expression()?;
                    let guard = self.parse_guard()?;
                    let body = self.wrap_in_block(statement, start);
                    self.add(
                        NodeKind::While {
                            condition: Some(condition),
                            guard,
                            body: Some(body),
                            negated: keyword.kind == TokenKind::Until,
                            postfix: true,
                        },
                        Span::new(start, self.node_end()),
                    )
                }
                Some(TokenKind::For) => {
                    let header = self.parse_for_header()?;
                    let body = self.wrap_in_block(statement, start);
                    self.build_for(header, Some(body), true, start)?
                }
                _ => return Ok(statement),
            };
        }
    }

    /// An expression in a construct header. A line break always ends it, so
    /// an indented body is never taken for call arguments.
    fn parse_header_expression(&mut self) -> ParseResult<NodeId> {
        let saved = std::mem::replace(&mut self.in_implicit_call, true);
        let expression = self.parse_expression();
        self.in_implicit_call = saved;
        expression
    }

    fn wrap_in_block(&mut self, statement: NodeId, start: usize) -> NodeId {
        let end = self.span_of(statement).end.max(start);
        self.add(
            NodeKind::Block {
                statements: vec![statement],
                inline: true,
            },
            Span::new(start, end),
        )
    }

    fn parse_guard(&mut self) -> ParseResult<Option<NodeId>> {
        if self.eat(TokenKind::When).is_some() {
            return self.parse_header_expression().map(Some);
        }
        Ok(None)
    }

    // ========================================================================
    // Conditionals and loops
    // ========================================================================

    pub(super) fn parse_conditional(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance()?;
        let start = keyword.start();
        let indent = self.line_indent(start);
        let condition = self.parse_header_expression()?;
        let consequent = self.parse_body()?;
        let mut alternate = None;
        if self.eat_continuation(TokenKind::Else, indent) {
            alternate = if self.at(TokenKind::If) {
                Some(self.parse_conditional()?)
            } else {
                self.parse_body()?
            };
        }
        Ok(self.add(
            NodeKind::Conditional {
                condition,
                consequent,
                alternate,
                negated: keyword.kind == TokenKind::Unless,
                postfix: false,
            },
            Span::new(start, self.node_end()),
        ))
    }

    pub(super) fn parse_while(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance()?;
        let condition = if keyword.kind == TokenKind::Loop {
            None
        } else {
            Some(self.parse_header_expression()?)
        };
        let guard = self.parse_guard()?;
        let body = self.parse_body()?;
        Ok(self.add(
            NodeKind::While {
                condition,
                guard,
                body,
                negated: keyword.kind == TokenKind::Until,
                postfix: false,
            },
            Span::new(keyword.start(), self.node_end()),
        ))
    }

    pub(super) fn parse_for(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let header = self.parse_for_header()?;
        let body = self.parse_body()?;
        self.build_for(header, body, false, start)
    }

    fn parse_for_header(&mut self) -> ParseResult<ForHeader> {
        self.expect(TokenKind::For, "`for`")?;
        let own = self.eat(TokenKind::Own).is_some();
        let first = self.parse_assignee()?;
        let second = if self.eat(TokenKind::Comma).is_some() {
            Some(self.parse_assignee()?)
        } else {
            None
        };
        let of = match self.peek_kind() {
            Some(TokenKind::In) => false,
            Some(TokenKind::Of) => true,
            _ => return Err(self.expected("`in` or `of`")),
        };
        let keyword = self.advance()?;
        if own && !of {
            return Err(ParseError::syntax(
                "`own` is only allowed with `for ... of`",
                keyword.start(),
            ));
        }
        let target = self.parse_header_expression()?;
        let mut step = None;
        let mut filter = None;
        loop {
            if !of && step.is_none() && self.eat(TokenKind::By).is_some() {
                step = Some(self.parse_header_expression()?);
            } else if filter.is_none() && self.eat(TokenKind::When).is_some() {
                filter = Some(self.parse_header_expression()?);
            } else {
                break;
            }
        }
        Ok(ForHeader {
            own,
            first,
            second,
            of,
            target,
            step,
            filter,
        })
    }

    fn build_for(
        &mut self,
        header: ForHeader,
        body: Option<NodeId>,
        postfix: bool,
        start: usize,
    ) -> ParseResult<NodeId> {
        let span = Span::new(start, self.node_end());
        let kind = if header.of {
            NodeKind::ForOf {
                key_assignee: header.first,
                value_assignee: header.second,
                target: header.target,
                filter: header.filter,
                body,
                own: header.own,
                postfix,
            }
        } else {
            NodeKind::ForIn {
                key_assignee: header.second,
                value_assignee: Some(header.first),
                target: header.target,
                step: header.step,
                filter: header.filter,
                body,
                postfix,
            }
        };
        Ok(self.add(kind, span))
    }

    // ========================================================================
    // Switch and try
    // ========================================================================

    pub(super) fn parse_switch(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance()?;
        let indent = self.line_indent(keyword.start());
        let expression = if self.at(TokenKind::Newline) {
            None
        } else {
            Some(self.parse_header_expression()?)
        };
        let column = match (self.peek_kind(), self.peek_at(1)) {
            (Some(TokenKind::Newline), Some(next)) if self.column(next.start()) > indent => {
                self.pos += 1;
                self.column(next.start())
            }
            _ => return Err(self.expected("an indented `when` clause")),
        };
        let mut cases = Vec::new();
        let mut alternate = None;
        loop {
            match self.peek_kind() {
                Some(TokenKind::When) if alternate.is_none() => cases.push(self.parse_switch_case()?),
                Some(TokenKind::Else) if alternate.is_none() => {
                    self.pos += 1;
                    alternate = self.parse_body()?;
                }
                _ => return Err(self.expected("`when` or `else`")),
            }
            let continues = self.at(TokenKind::Newline)
                && self.peek_at(1).is_some_and(|next| {
                    self.column(next.start()) == column
                        && matches!(next.kind, TokenKind::When | TokenKind::Else)
                });
            if !continues {
                break;
            }
            self.pos += 1;
        }
        Ok(self.add(
            NodeKind::Switch {
                expression,
                cases,
                alternate,
            },
            Span::new(keyword.start(), self.node_end()),
        ))
    }

    fn parse_switch_case(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance()?;
        let mut conditions = vec![self.parse_header_expression()?];
        while self.eat(TokenKind::Comma).is_some() {
            conditions.push(self.parse_header_expression()?);
        }
        let consequent = self.parse_body()?;
        Ok(self.add(
            NodeKind::SwitchCase {
                conditions,
                consequent,
            },
            Span::new(keyword.start(), self.node_end()),
        ))
    }

    pub(super) fn parse_try(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance()?;
        let indent = self.line_indent(keyword.start());
        let body = self.parse_body()?;
        let mut catch_assignee = None;
        let mut catch_body = None;
        let has_catch = self.eat_continuation(TokenKind::Catch, indent);
        if has_catch {
            if matches!(
                self.peek_kind(),
                Some(TokenKind::Identifier | TokenKind::LBrace | TokenKind::LBracket)
            ) {
                catch_assignee = Some(self.parse_assignee()?);
            }
            catch_body = self.parse_body()?;
        }
        let has_finally = self.eat_continuation(TokenKind::Finally, indent);
        let finally_body = if has_finally { self.parse_body()? } else { None };
        Ok(self.add(
            NodeKind::Try {
                body,
                catch_assignee,
                catch_body,
                finally_body,
                has_catch,
                has_finally,
            },
            Span::new(keyword.start(), self.node_end()),
        ))
    }

    // ========================================================================
    // Classes
    // ========================================================================

    pub(super) fn parse_class(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance()?;
        let name = match self.peek_kind() {
            Some(TokenKind::Identifier | TokenKind::At) => {
                let start = self.peek_start();
                let primary = self.parse_primary()?;
                Some(self.parse_chain(primary, start, false)?)
            }
            _ => None,
        };
        let parent = if self.eat(TokenKind::Extends).is_some() {
            Some(self.parse_header_expression()?)
        } else {
            None
        };
        let body = self.parse_body()?;
        if let Some(body) = body {
            self.split_class_members(body)?;
        }
        Ok(self.add(
            NodeKind::Class { name, parent, body },
            Span::new(keyword.start(), self.node_end()),
        ))
    }

    /// Replace implicit-object statements of a class body by one member
    /// statement per object member.
    fn split_class_members(&mut self, body: NodeId) -> ParseResult<()> {
        let NodeKind::Block { statements, inline } = self.kind_of(body).clone() else {
            return Ok(());
        };
        let mut flattened = Vec::with_capacity(statements.len());
        for statement in statements {
            let NodeKind::Object {
                members,
                implicit: true,
            } = self.kind_of(statement).clone()
            else {
                flattened.push(statement);
                continue;
            };
            for member in members {
                let NodeKind::ObjectMember { key, value } = self.kind_of(member).clone() else {
                    flattened.push(member);
                    continue;
                };
                let Some(value) = value else {
                    return Err(ParseError::syntax(
                        "class members need a value",
                        self.span_of(member).start,
                    ));
                };
                let kind = match self.kind_of(key) {
                    NodeKind::Identifier { name } if name == "constructor" => {
                        NodeKind::Constructor { key, value }
                    }
                    NodeKind::MemberAccess { expression, .. }
                        if matches!(self.kind_of(*expression), NodeKind::This { .. }) =>
                    {
                        NodeKind::ClassMember {
                            key,
                            value,
                            is_static: true,
                        }
                    }
                    _ => NodeKind::ClassMember {
                        key,
                        value,
                        is_static: false,
                    },
                };
                self.set_kind(member, kind);
                flattened.push(member);
            }
        }
        self.set_kind(
            body,
            NodeKind::Block {
                statements: flattened,
                inline,
            },
        );
        Ok(())
    }
}
