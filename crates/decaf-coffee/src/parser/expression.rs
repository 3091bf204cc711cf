//! Expressions: operators, access chains, calls and literals.

use decaf_core::patch::Span;

use super::{parse_int_literal, ParseError, ParseResult, Parser};
use crate::nodes::{BinaryOperator, FunctionFlavor, NodeId, NodeKind, UnaryOperator};
use crate::tokenizer::{Token, TokenKind};

impl Parser<'_> {
    /// An expression, including assignment.
    pub(super) fn parse_expression(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let left = self.parse_binary(0)?;
        match self.peek_kind() {
            Some(TokenKind::Assign) => {
                self.pos += 1;
                self.skip_newlines();
                let expression = self.parse_expression()?;
                Ok(self.add(
                    NodeKind::AssignOp {
                        assignee: left,
                        expression,
                    },
                    Span::new(start, self.node_end()),
                ))
            }
            Some(TokenKind::CompoundAssign) => {
                let token = self.advance()?;
                let op = BinaryOperator::from_compound_assign(self.text_of(token)).ok_or_else(
                    || ParseError::syntax("unknown assignment operator", token.start()),
                )?;
                self.skip_newlines();
                let expression = self.parse_expression()?;
                let span = Span::new(start, self.node_end());
                let kind = if op == BinaryOperator::Exists {
                    NodeKind::ExistsAssignOp {
                        assignee: left,
                        expression,
                        op_span: token.span,
                    }
                } else {
                    NodeKind::CompoundAssignOp {
                        op,
                        assignee: left,
                        expression,
                        op_span: token.span,
                    }
                };
                Ok(self.add(kind, span))
            }
            _ => Ok(left),
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let mut left = self.parse_unary()?;
        // Comparison node built by this loop, which a following comparison
        // extends into a chain.
        let mut chain_head: Option<NodeId> = None;
        while let Some((op, op_span, width)) = self.peek_binary_operator() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.pos += width;
            self.skip_newlines();
            let next_min = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let right = self.parse_binary(next_min)?;
            let span = Span::new(start, self.node_end());

            if op.is_comparison() && chain_head == Some(left) {
                let kind = match self.kind_of(left).clone() {
                    NodeKind::BinaryOp {
                        op: first_op,
                        left: first,
                        right: second,
                        op_span: first_span,
                    } => NodeKind::ChainedComparison {
                        operands: vec![first, second, right],
                        operators: vec![(first_op, first_span), (op, op_span)],
                    },
                    NodeKind::ChainedComparison {
                        mut operands,
                        mut operators,
                    } => {
                        operands.push(right);
                        operators.push((op, op_span));
                        NodeKind::ChainedComparison {
                            operands,
                            operators,
                        }
                    }
                    other => {
                        return Err(ParseError::syntax(
                            format!("cannot chain comparison onto {}", other.name()),
                            op_span.start,
                        ))
                    }
                };
                left = self.add(kind, span);
            } else {
                left = self.add(
                    NodeKind::BinaryOp {
                        op,
                        left,
                        right,
                        op_span,
                    },
                    span,
                );
            }
            chain_head = op.is_comparison().then_some(left);
        }
        Ok(left)
    }

    /// Binary operator at the cursor: operator, span and token count.
    fn peek_binary_operator(&self) -> Option<(BinaryOperator, Span, usize)> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::In => Some((BinaryOperator::In, token.span, 1)),
            TokenKind::Of => Some((BinaryOperator::Of, token.span, 1)),
            TokenKind::Question => Some((BinaryOperator::Exists, token.span, 1)),
            TokenKind::Operator => {
                let text = self.text_of(token);
                if text == "not" {
                    let next = self.peek_at(1)?;
                    let positive = match next.kind {
                        TokenKind::In => BinaryOperator::In,
                        TokenKind::Of => BinaryOperator::Of,
                        TokenKind::Operator if self.text_of(next) == "instanceof" => {
                            BinaryOperator::InstanceOf
                        }
                        _ => return None,
                    };
                    let op = positive.negated_word_form()?;
                    return Some((op, token.span.cover(&next.span), 2));
                }
                BinaryOperator::from_text(text).map(|op| (op, token.span, 1))
            }
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> ParseResult<NodeId> {
        let token = self.peek().ok_or_else(|| self.unexpected())?;
        let start = token.start();
        match token.kind {
            TokenKind::Operator => {
                let text = self.text_of(token);
                let Some(op) = UnaryOperator::from_prefix_text(text) else {
                    return Err(self.unexpected());
                };
                self.pos += 1;
                let expression = self.parse_unary()?;
                Ok(self.add(
                    NodeKind::UnaryOp {
                        op,
                        expression,
                        op_span: token.span,
                    },
                    Span::new(start, self.node_end()),
                ))
            }
            TokenKind::New => {
                let node = self.parse_new()?;
                self.parse_chain(node, start, true)
            }
            TokenKind::Do => {
                self.pos += 1;
                let expression = self.parse_unary()?;
                Ok(self.add(NodeKind::Do { expression }, Span::new(start, self.node_end())))
            }
            TokenKind::Await => {
                self.pos += 1;
                if let Some(flavor) = self.functions.last_mut() {
                    flavor.asynchronous = true;
                }
                let expression = self.parse_unary()?;
                Ok(self.add(
                    NodeKind::Await { expression },
                    Span::new(start, self.node_end()),
                ))
            }
            TokenKind::Yield => {
                self.pos += 1;
                if let Some(flavor) = self.functions.last_mut() {
                    flavor.generator = true;
                }
                if self.eat(TokenKind::From).is_some() {
                    let expression = self.parse_binary(0)?;
                    return Ok(self.add(
                        NodeKind::YieldFrom { expression },
                        Span::new(start, self.node_end()),
                    ));
                }
                let expression = if self.peek_kind().is_some_and(super::starts_expression) {
                    Some(self.parse_binary(0)?)
                } else {
                    None
                };
                Ok(self.add(
                    NodeKind::Yield { expression },
                    Span::new(start, self.node_end()),
                ))
            }
            TokenKind::Throw => {
                self.pos += 1;
                let expression = self.parse_binary(0)?;
                Ok(self.add(
                    NodeKind::Throw { expression },
                    Span::new(start, self.node_end()),
                ))
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_chain(primary, start, true)
            }
        }
    }

    fn parse_new(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance()?;
        let ctor_start = self.peek_start();
        let primary = self.parse_primary()?;
        let ctor = self.parse_chain(primary, ctor_start, false)?;
        let (arguments, implicit, has_arguments) = if self.at(TokenKind::CallStart) {
            self.pos += 1;
            (self.parse_call_arguments()?, false, true)
        } else if self.implicit_call_allowed(ctor) {
            (self.parse_implicit_arguments()?, true, true)
        } else {
            (Vec::new(), false, false)
        };
        Ok(self.add(
            NodeKind::New {
                ctor,
                arguments,
                implicit,
                has_arguments,
            },
            Span::new(keyword.start(), self.node_end()),
        ))
    }

    // ========================================================================
    // Access chains and calls
    // ========================================================================

    /// Member accesses, indexing, calls and postfix operators after `expr`,
    /// which starts at `start` (including any grouping parenthesis).
    pub(super) fn parse_chain(
        &mut self,
        mut expr: NodeId,
        start: usize,
        allow_calls: bool,
    ) -> ParseResult<NodeId> {
        loop {
            let Some(token) = self.peek() else { break };
            expr = match token.kind {
                TokenKind::Dot | TokenKind::SoakDot => {
                    self.pos += 1;
                    let name = self.expect(TokenKind::Identifier, "a property name")?;
                    let member = self.text_of(name).to_string();
                    let kind = if token.kind == TokenKind::Dot {
                        NodeKind::MemberAccess {
                            expression: expr,
                            member,
                            member_span: name.span,
                        }
                    } else {
                        NodeKind::SoakedMemberAccess {
                            expression: expr,
                            member,
                            member_span: name.span,
                        }
                    };
                    self.add(kind, Span::new(start, name.end()))
                }
                TokenKind::Proto | TokenKind::SoakProto => {
                    self.pos += 1;
                    let proto_kind = if token.kind == TokenKind::Proto {
                        NodeKind::ProtoMemberAccess { expression: expr }
                    } else {
                        NodeKind::SoakedProtoMemberAccess { expression: expr }
                    };
                    let proto = self.add(proto_kind, Span::new(start, token.end()));
                    if self.at(TokenKind::Identifier) && self.adjacent() {
                        let name = self.advance()?;
                        let member = self.text_of(name).to_string();
                        self.add(
                            NodeKind::MemberAccess {
                                expression: proto,
                                member,
                                member_span: name.span,
                            },
                            Span::new(start, name.end()),
                        )
                    } else {
                        proto
                    }
                }
                TokenKind::IndexStart | TokenKind::SoakIndexStart => {
                    self.pos += 1;
                    self.parse_index(expr, start, token)?
                }
                TokenKind::CallStart | TokenKind::SoakCallStart if allow_calls => {
                    self.pos += 1;
                    let arguments = self.parse_call_arguments()?;
                    let span = Span::new(start, self.node_end());
                    let kind = if token.kind == TokenKind::CallStart {
                        NodeKind::Call {
                            function: expr,
                            arguments,
                            implicit: false,
                        }
                    } else {
                        NodeKind::SoakedCall {
                            function: expr,
                            arguments,
                            implicit: false,
                        }
                    };
                    self.add(kind, span)
                }
                TokenKind::Existence => {
                    self.pos += 1;
                    self.add(
                        NodeKind::UnaryExists { expression: expr },
                        Span::new(start, token.end()),
                    )
                }
                TokenKind::Operator
                    if self.adjacent() && matches!(self.text_of(token), "++" | "--") =>
                {
                    self.pos += 1;
                    let op = if self.text_of(token) == "++" {
                        UnaryOperator::PostIncrement
                    } else {
                        UnaryOperator::PostDecrement
                    };
                    self.add(
                        NodeKind::UnaryOp {
                            op,
                            expression: expr,
                            op_span: token.span,
                        },
                        Span::new(start, token.end()),
                    )
                }
                TokenKind::Newline
                    if !self.in_implicit_call
                        && matches!(
                            self.peek_kind_at(1),
                            Some(
                                TokenKind::Dot
                                    | TokenKind::SoakDot
                                    | TokenKind::Proto
                                    | TokenKind::SoakProto
                            )
                        ) =>
                {
                    self.pos += 1;
                    continue;
                }
                _ if allow_calls && self.implicit_call_allowed(expr) => {
                    let arguments = self.parse_implicit_arguments()?;
                    let kind = NodeKind::Call {
                        function: expr,
                        arguments,
                        implicit: true,
                    };
                    self.add(kind, Span::new(start, self.node_end()))
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    /// After `[` or `?[`: an index or a slice.
    fn parse_index(&mut self, expr: NodeId, start: usize, open: Token) -> ParseResult<NodeId> {
        let soaked = open.kind == TokenKind::SoakIndexStart;
        let saved = std::mem::replace(&mut self.in_implicit_call, false);
        self.skip_newlines();
        let left = if matches!(self.peek_kind(), Some(TokenKind::Range | TokenKind::Ellipsis)) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let node = if let Some(dots) = self
            .eat(TokenKind::Range)
            .or_else(|| self.eat(TokenKind::Ellipsis))
        {
            if soaked {
                return Err(ParseError::syntax("soaked slices are not supported", open.start()));
            }
            let right = if self.at(TokenKind::IndexEnd) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.skip_newlines();
            self.expect(TokenKind::IndexEnd, "`]`")?;
            self.add(
                NodeKind::Slice {
                    expression: expr,
                    left,
                    right,
                    inclusive: dots.kind == TokenKind::Range,
                },
                Span::new(start, self.node_end()),
            )
        } else {
            let Some(index) = left else {
                return Err(self.expected("an index"));
            };
            self.skip_newlines();
            self.expect(TokenKind::IndexEnd, "`]`")?;
            let kind = if soaked {
                NodeKind::SoakedDynamicMemberAccess {
                    expression: expr,
                    index,
                }
            } else {
                NodeKind::DynamicMemberAccess {
                    expression: expr,
                    index,
                }
            };
            self.add(kind, Span::new(start, self.node_end()))
        };
        self.in_implicit_call = saved;
        Ok(node)
    }

    /// Arguments after a consumed `(`, through the closing `)`.
    fn parse_call_arguments(&mut self) -> ParseResult<Vec<NodeId>> {
        let saved = std::mem::replace(&mut self.in_implicit_call, false);
        let arguments = self.parse_delimited(TokenKind::CallEnd, "`)`", Self::parse_argument)?;
        self.in_implicit_call = saved;
        Ok(arguments)
    }

    /// Elements separated by commas or newlines up to `close`, consumed.
    fn parse_delimited(
        &mut self,
        close: TokenKind,
        what: &str,
        element: impl FnMut(&mut Self) -> ParseResult<NodeId>,
    ) -> ParseResult<Vec<NodeId>> {
        self.skip_newlines();
        self.parse_delimited_after(Vec::new(), close, what, element)
    }

    /// Like `parse_delimited`, continuing after already parsed `elements`.
    fn parse_delimited_after(
        &mut self,
        mut elements: Vec<NodeId>,
        close: TokenKind,
        what: &str,
        mut element: impl FnMut(&mut Self) -> ParseResult<NodeId>,
    ) -> ParseResult<Vec<NodeId>> {
        if !elements.is_empty() {
            self.expect_separator(close, what)?;
        }
        while !self.at(close) {
            elements.push(element(self)?);
            self.expect_separator(close, what)?;
        }
        self.pos += 1;
        Ok(elements)
    }

    fn expect_separator(&mut self, close: TokenKind, what: &str) -> ParseResult<()> {
        let separated = self.eat(TokenKind::Comma).is_some();
        let newline = self.at(TokenKind::Newline);
        self.skip_newlines();
        if !separated && !newline && !self.at(close) {
            return Err(self.expected(what));
        }
        Ok(())
    }

    fn parse_argument(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        if self.eat(TokenKind::Ellipsis).is_some() {
            let expression = self.parse_expression()?;
            return Ok(self.add(
                NodeKind::Spread { expression },
                Span::new(start, self.node_end()),
            ));
        }
        let expression = self.parse_expression()?;
        if self.eat(TokenKind::Ellipsis).is_some() {
            return Ok(self.add(
                NodeKind::Spread { expression },
                Span::new(start, self.node_end()),
            ));
        }
        Ok(expression)
    }

    /// Whether the tokens after `callee` are unparenthesized arguments.
    fn implicit_call_allowed(&self, callee: NodeId) -> bool {
        let callable = matches!(
            self.kind_of(callee),
            NodeKind::Identifier { .. }
                | NodeKind::Super
                | NodeKind::MemberAccess { .. }
                | NodeKind::SoakedMemberAccess { .. }
                | NodeKind::DynamicMemberAccess { .. }
                | NodeKind::SoakedDynamicMemberAccess { .. }
                | NodeKind::Call { .. }
                | NodeKind::SoakedCall { .. }
        );
        if !callable {
            return false;
        }
        let Some(token) = self.peek() else {
            return false;
        };
        if token.kind == TokenKind::Newline {
            return !self.in_implicit_call && self.implicit_object_follows_on_next_line(callee);
        }
        if token.start() == self.prev_end() {
            return false;
        }
        match token.kind {
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
            | TokenKind::New
            | TokenKind::Do
            | TokenKind::Await
            | TokenKind::Switch
            | TokenKind::Try
            | TokenKind::Class => true,
            TokenKind::Operator => match self.text_of(token) {
                "-" | "+" => self
                    .peek_at(1)
                    .is_some_and(|next| next.start() == token.end()),
                "!" | "~" | "typeof" | "delete" => true,
                "not" => !matches!(
                    self.peek_kind_at(1),
                    Some(TokenKind::In | TokenKind::Of | TokenKind::Operator)
                ),
                _ => false,
            },
            _ => false,
        }
    }

    /// `callee` followed by an indented `key: value` line.
    fn implicit_object_follows_on_next_line(&self, callee: NodeId) -> bool {
        let Some(next) = self.peek_at(1) else {
            return false;
        };
        let callee_indent = self.line_indent(self.span_of(callee).start);
        self.column(next.start()) > callee_indent && self.is_object_key_at(self.pos + 1)
    }

    fn parse_implicit_arguments(&mut self) -> ParseResult<Vec<NodeId>> {
        let saved = std::mem::replace(&mut self.in_implicit_call, true);
        // Object arguments on following lines.
        self.eat(TokenKind::Newline);
        let mut arguments = Vec::new();
        loop {
            arguments.push(self.parse_argument()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
            self.skip_newlines();
        }
        self.in_implicit_call = saved;
        Ok(arguments)
    }

    // ========================================================================
    // Primary expressions
    // ========================================================================

    pub(super) fn parse_primary(&mut self) -> ParseResult<NodeId> {
        let token = self.peek().ok_or_else(|| self.unexpected())?;
        if self.is_object_key_at(self.pos) {
            return self.parse_implicit_object();
        }
        match token.kind {
            TokenKind::Identifier => {
                self.pos += 1;
                let name = self.text_of(token).to_string();
                Ok(self.add(NodeKind::Identifier { name }, token.span))
            }
            TokenKind::Number => {
                self.pos += 1;
                let kind = match parse_int_literal(self.text_of(token)) {
                    Some(value) => NodeKind::Int { value },
                    None => NodeKind::Float,
                };
                Ok(self.add(kind, token.span))
            }
            TokenKind::String => {
                self.pos += 1;
                Ok(self.add(NodeKind::String, token.span))
            }
            TokenKind::StringStart => self.parse_template(),
            TokenKind::Bool => {
                self.pos += 1;
                let value = matches!(self.text_of(token), "true" | "yes" | "on");
                Ok(self.add(NodeKind::Bool { value }, token.span))
            }
            TokenKind::Null => self.leaf(NodeKind::Null),
            TokenKind::Undefined => self.leaf(NodeKind::Undefined),
            TokenKind::This => self.leaf(NodeKind::This { shorthand: false }),
            TokenKind::Super => self.leaf(NodeKind::Super),
            TokenKind::At => self.parse_at(),
            TokenKind::LParen => {
                if self.at_parameter_list() {
                    self.parse_function()
                } else {
                    self.parse_group()
                }
            }
            TokenKind::Function | TokenKind::BoundFunction => self.parse_function(),
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_explicit_object(),
            TokenKind::If | TokenKind::Unless => self.parse_conditional(),
            TokenKind::While | TokenKind::Until | TokenKind::Loop => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Class => self.parse_class(),
            _ => Err(self.unexpected()),
        }
    }

    fn leaf(&mut self, kind: NodeKind) -> ParseResult<NodeId> {
        let token = self.advance()?;
        Ok(self.add(kind, token.span))
    }

    /// `@`, `@name`.
    fn parse_at(&mut self) -> ParseResult<NodeId> {
        let at = self.advance()?;
        let this = self.add(NodeKind::This { shorthand: true }, at.span);
        if self.at(TokenKind::Identifier) && self.adjacent() {
            let name = self.advance()?;
            let member = self.text_of(name).to_string();
            return Ok(self.add(
                NodeKind::MemberAccess {
                    expression: this,
                    member,
                    member_span: name.span,
                },
                Span::new(at.start(), name.end()),
            ));
        }
        Ok(this)
    }

    /// A parenthesized expression. The returned node excludes the parens.
    fn parse_group(&mut self) -> ParseResult<NodeId> {
        let open = self.advance()?;
        let saved = std::mem::replace(&mut self.in_implicit_call, false);
        self.skip_newlines();
        let seq_start = self.peek_start();
        let mut expr = self.parse_statement()?;
        while self.eat(TokenKind::Semicolon).is_some() {
            self.skip_newlines();
            let right = self.parse_statement()?;
            expr = self.add(
                NodeKind::Seq { left: expr, right },
                Span::new(seq_start, self.node_end()),
            );
        }
        self.skip_newlines();
        if !self.at(TokenKind::RParen) {
            return Err(ParseError::syntax(
                format!("expected `)` to close `(` at offset {}", open.start()),
                self.peek_start(),
            ));
        }
        self.pos += 1;
        self.in_implicit_call = saved;
        Ok(expr)
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Cursor is on a `(` whose matching `)` is followed by `->` or `=>`.
    fn at_parameter_list(&self) -> bool {
        let mut depth = 0usize;
        for (i, token) in self.tokens[self.pos..].iter().enumerate() {
            if token.kind.is_open_bracket() {
                depth += 1;
            } else if token.kind.is_close_bracket() {
                depth -= 1;
                if depth == 0 {
                    return matches!(
                        self.peek_kind_at(i + 1),
                        Some(TokenKind::Function | TokenKind::BoundFunction)
                    );
                }
            }
        }
        false
    }

    fn parse_function(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let params = if self.eat(TokenKind::LParen).is_some() {
            let saved = std::mem::replace(&mut self.in_implicit_call, false);
            let params = self.parse_delimited(TokenKind::RParen, "`)`", Self::parse_param)?;
            self.in_implicit_call = saved;
            params
        } else {
            Vec::new()
        };
        let arrow = self.advance()?;
        let bound = match arrow.kind {
            TokenKind::Function => false,
            TokenKind::BoundFunction => true,
            _ => {
                return Err(ParseError::syntax(
                    "expected `->` or `=>`",
                    arrow.start(),
                ))
            }
        };
        self.functions.push(FunctionFlavor {
            bound,
            ..FunctionFlavor::default()
        });
        let saved = std::mem::replace(&mut self.in_implicit_call, false);
        let body = self.parse_body();
        self.in_implicit_call = saved;
        let flavor = self.functions.pop().unwrap_or_default();
        let body = body?;
        Ok(self.add(
            NodeKind::Function {
                params,
                body,
                flavor,
            },
            Span::new(start, self.node_end()),
        ))
    }

    fn parse_param(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        if self.eat(TokenKind::Ellipsis).is_some() {
            let expression = self.parse_assignee()?;
            return Ok(self.add(
                NodeKind::Rest { expression },
                Span::new(start, self.node_end()),
            ));
        }
        let param = self.parse_assignee()?;
        if self.eat(TokenKind::Ellipsis).is_some() {
            return Ok(self.add(
                NodeKind::Rest { expression: param },
                Span::new(start, self.node_end()),
            ));
        }
        if self.eat(TokenKind::Assign).is_some() {
            let default = self.parse_expression()?;
            return Ok(self.add(
                NodeKind::DefaultParam { param, default },
                Span::new(start, self.node_end()),
            ));
        }
        Ok(param)
    }

    /// A binding target: identifier, `@name`, or array/object pattern.
    pub(super) fn parse_assignee(&mut self) -> ParseResult<NodeId> {
        match self.peek_kind() {
            Some(TokenKind::Identifier) => {
                let token = self.advance()?;
                let name = self.text_of(token).to_string();
                Ok(self.add(NodeKind::Identifier { name }, token.span))
            }
            Some(TokenKind::At) => self.parse_at(),
            Some(TokenKind::LBracket) => self.parse_array(),
            Some(TokenKind::LBrace) => self.parse_explicit_object(),
            _ => Err(self.expected("an assignment target")),
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn parse_template(&mut self) -> ParseResult<NodeId> {
        let open = self.advance()?;
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        let mut quasi_start = open.end();
        loop {
            let token = self.advance()?;
            match token.kind {
                TokenKind::StringContent => continue,
                TokenKind::InterpolationStart => {
                    quasis.push(self.add(NodeKind::Quasi, Span::new(quasi_start, token.start())));
                    let saved = std::mem::replace(&mut self.in_implicit_call, false);
                    self.skip_newlines();
                    expressions.push(self.parse_statement()?);
                    self.skip_newlines();
                    self.in_implicit_call = saved;
                    let close = self.expect(TokenKind::InterpolationEnd, "`}`")?;
                    quasi_start = close.end();
                }
                TokenKind::StringEnd => {
                    quasis.push(self.add(NodeKind::Quasi, Span::new(quasi_start, token.start())));
                    break;
                }
                _ => return Err(ParseError::syntax("malformed string", token.start())),
            }
        }
        Ok(self.add(
            NodeKind::TemplateLiteral {
                quasis,
                expressions,
            },
            Span::new(open.start(), self.node_end()),
        ))
    }

    /// `[a, b]`, `[a..b]` or `[a...b]`.
    fn parse_array(&mut self) -> ParseResult<NodeId> {
        let open = self.advance()?;
        let saved = std::mem::replace(&mut self.in_implicit_call, false);
        self.skip_newlines();
        let mut members = Vec::new();
        if !self.at(TokenKind::RBracket) && !self.at(TokenKind::Ellipsis) {
            let first_start = self.peek_start();
            let first = self.parse_expression()?;
            let range_dots = match self.peek_kind() {
                Some(TokenKind::Range) => true,
                Some(TokenKind::Ellipsis) => !matches!(
                    self.peek_kind_at(1),
                    Some(TokenKind::RBracket | TokenKind::Comma | TokenKind::Newline)
                ),
                _ => false,
            };
            if range_dots {
                let dots = self.advance()?;
                let right = self.parse_expression()?;
                self.skip_newlines();
                self.expect(TokenKind::RBracket, "`]`")?;
                self.in_implicit_call = saved;
                return Ok(self.add(
                    NodeKind::Range {
                        left: first,
                        right,
                        inclusive: dots.kind == TokenKind::Range,
                    },
                    Span::new(open.start(), self.node_end()),
                ));
            }
            let first = if self.eat(TokenKind::Ellipsis).is_some() {
                self.add(
                    NodeKind::Spread { expression: first },
                    Span::new(first_start, self.node_end()),
                )
            } else {
                first
            };
            members.push(first);
        }
        let members =
            self.parse_delimited_after(members, TokenKind::RBracket, "`]`", Self::parse_argument)?;
        self.in_implicit_call = saved;
        Ok(self.add(
            NodeKind::Array { members },
            Span::new(open.start(), self.node_end()),
        ))
    }

    fn parse_explicit_object(&mut self) -> ParseResult<NodeId> {
        let open = self.advance()?;
        let saved = std::mem::replace(&mut self.in_implicit_call, false);
        let members =
            self.parse_delimited(TokenKind::RBrace, "`}`", |p| p.parse_object_member(false))?;
        self.in_implicit_call = saved;
        Ok(self.add(
            NodeKind::Object {
                members,
                implicit: false,
            },
            Span::new(open.start(), self.node_end()),
        ))
    }

    /// Whether the token at `index` starts a `key:` pair.
    pub(super) fn is_object_key_at(&self, index: usize) -> bool {
        let kind_at = |i: usize| self.tokens.get(i).map(|t| t.kind);
        match kind_at(index) {
            Some(TokenKind::Identifier | TokenKind::String | TokenKind::Number) => {
                kind_at(index + 1) == Some(TokenKind::Colon)
            }
            Some(TokenKind::At) => {
                kind_at(index + 1) == Some(TokenKind::Identifier)
                    && kind_at(index + 2) == Some(TokenKind::Colon)
            }
            _ => false,
        }
    }

    fn parse_implicit_object(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let column = self.column(start);
        let mut members = Vec::new();
        loop {
            members.push(self.parse_object_member(true)?);
            if self.at(TokenKind::Comma) {
                let mut next = self.pos + 1;
                while self.tokens.get(next).map(|t| t.kind) == Some(TokenKind::Newline) {
                    next += 1;
                }
                if self.is_object_key_at(next) {
                    self.pos = next;
                    continue;
                }
                break;
            }
            let continues_on_next_line = self.at(TokenKind::Newline)
                && self
                    .peek_at(1)
                    .is_some_and(|next| self.column(next.start()) == column)
                && self.is_object_key_at(self.pos + 1);
            if !continues_on_next_line {
                break;
            }
            self.pos += 1;
        }
        Ok(self.add(
            NodeKind::Object {
                members,
                implicit: true,
            },
            Span::new(start, self.node_end()),
        ))
    }

    fn parse_object_member(&mut self, implicit: bool) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let key = match self.peek_kind() {
            Some(TokenKind::Identifier) => {
                let token = self.advance()?;
                let name = self.text_of(token).to_string();
                self.add(NodeKind::Identifier { name }, token.span)
            }
            Some(TokenKind::String) => self.leaf(NodeKind::String)?,
            Some(TokenKind::Number) => {
                let token = self.advance()?;
                let kind = match parse_int_literal(self.text_of(token)) {
                    Some(value) => NodeKind::Int { value },
                    None => NodeKind::Float,
                };
                self.add(kind, token.span)
            }
            Some(TokenKind::At) => self.parse_at()?,
            _ => return Err(self.expected("an object key")),
        };
        if self.eat(TokenKind::Colon).is_none() {
            if implicit {
                return Err(self.expected("`:`"));
            }
            return Ok(self.add(
                NodeKind::ObjectMember { key, value: None },
                Span::new(start, self.node_end()),
            ));
        }
        let key_indent = self.line_indent(start);
        if self.at(TokenKind::Newline)
            && self
                .peek_at(1)
                .is_some_and(|next| self.column(next.start()) > key_indent)
        {
            self.pos += 1;
        }
        let value = self.parse_expression()?;
        Ok(self.add(
            NodeKind::ObjectMember {
                key,
                value: Some(value),
            },
            Span::new(start, self.node_end()),
        ))
    }
}
