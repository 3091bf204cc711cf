//! Conditionals, `switch`, `try`, and the statements that leave a block.

use decaf_coffee::{NodeId, NodeKind, TokenKind};

use crate::error::{PatchError, PatchResult};
use crate::patcher::{Patcher, Tail};

impl Patcher<'_> {
    // ========================================================================
    // Conditionals
    // ========================================================================

    pub(crate) fn patch_conditional(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Conditional {
            condition,
            consequent,
            alternate,
            negated,
            ..
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a conditional"));
        };
        let (condition, consequent, alternate) = (*condition, *consequent, *alternate);
        let tail = self.tail(id);
        let start = self.content(id).start;
        if *negated {
            self.overwrite(id, start, start + "unless".len(), "if")?;
            self.negate(condition);
        }
        self.patch_header_condition(id, condition)?;
        let header_end = self.outer(condition).end;
        self.open_block(id, header_end, consequent)?;
        if let Some(body) = consequent {
            self.patch_block(body, tail.clone())?;
        }

        let after_consequent = consequent.map_or(header_end, |b| self.content(b).end);
        let else_token = alternate.and_then(|alt| {
            self.tokens
                .rfind_in(after_consequent, self.content(alt).start, TokenKind::Else)
        });
        let next = else_token.map(|t| self.tokens.span(t).start);
        self.close_block(id, consequent, next)?;

        match (alternate, else_token) {
            (Some(alt), Some(else_token)) => {
                if matches!(self.kind(alt), NodeKind::Conditional { .. }) {
                    self.set_tail(alt, tail);
                    self.patch_statement(alt)
                } else {
                    let else_end = self.tokens.span(else_token).end;
                    self.open_block(id, else_end, Some(alt))?;
                    self.patch_block(alt, tail)?;
                    self.close_block(id, Some(alt), None)
                }
            }
            (None, _) => match tail.as_ref().and_then(Tail::fallback) {
                Some(fallback) => {
                    let end = self.after_close(consequent, header_end);
                    self.insert(id, end, &format!(" else {{ {} }}", fallback))
                }
                None => Ok(()),
            },
            (Some(_), None) => Err(PatchError::internal("conditional alternate without `else`")),
        }
    }

    /// Where text following the closing brace of `body` goes.
    pub(crate) fn after_close(&self, body: Option<NodeId>, header_end: usize) -> usize {
        match body {
            Some(body) if self.is_inline_block(body) => self.code_end(self.outer(body).end),
            Some(body) => self.code_end(self.content(body).end),
            None => header_end,
        }
    }

    /// Patch the condition of an `if`, `while` or `switch` header inside the
    /// parens JavaScript requires.
    pub(crate) fn patch_header_condition(&mut self, id: NodeId, condition: NodeId) -> PatchResult<()> {
        let wrap = !self.is_parenthesized(condition)
            || (self.is_negated(condition) && !self.negates_natively(condition));
        if !wrap {
            return self.patch_expression(condition);
        }
        let start = self.outer(condition).start;
        self.insert(id, start, "(")?;
        self.patch_expression(condition)?;
        let end = self.outer(condition).end;
        self.insert(id, end, ")")
    }

    /// Whether a conditional can become `a ? b : c`: every branch is a
    /// single expression and no comment would be lost.
    pub(crate) fn is_ternary_candidate(&self, id: NodeId) -> bool {
        let NodeKind::Conditional {
            consequent: Some(consequent),
            alternate,
            ..
        } = self.kind(id)
        else {
            return false;
        };
        let alternate_ok = match alternate {
            None => true,
            Some(alt) if matches!(self.kind(*alt), NodeKind::Conditional { .. }) => {
                self.is_ternary_candidate(*alt)
            }
            Some(alt) => self.is_single_expression(*alt),
        };
        alternate_ok && self.is_single_expression(*consequent) && !self.contains_comment(id)
    }

    fn is_single_expression(&self, block: NodeId) -> bool {
        self.single_statement(block).is_some_and(|statement| {
            !matches!(
                self.kind(statement),
                NodeKind::Return { .. } | NodeKind::Throw { .. } | NodeKind::Break | NodeKind::Continue
            ) && self.prefers_expression(statement)
        })
    }

    pub(crate) fn patch_ternary(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Conditional {
            condition,
            consequent: Some(consequent),
            alternate,
            negated,
            ..
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a conditional with a consequent"));
        };
        let condition = *condition;
        let consequent = self
            .single_statement(*consequent)
            .ok_or_else(|| PatchError::internal("ternary branch is not a single statement"))?;
        let mark = self.mark();
        let start = self.content(id).start;
        self.remove(id, start, self.outer(condition).start)?;
        if *negated {
            self.negate(condition);
        }
        self.patch_expression(condition)?;
        let condition_end = self.outer(condition).end;
        self.overwrite(id, condition_end, self.outer(consequent).start, " ? ")?;
        self.patch_expression(consequent)?;

        let consequent_end = self.outer(consequent).end;
        match alternate {
            Some(alt) => {
                let target = match self.kind(*alt) {
                    NodeKind::Conditional { .. } => *alt,
                    _ => self
                        .single_statement(*alt)
                        .ok_or_else(|| PatchError::internal("ternary branch is not a single statement"))?,
                };
                self.overwrite(id, consequent_end, self.outer(target).start, " : ")?;
                self.patch_expression(target)?;
            }
            None => {
                let end = self.code_end(consequent_end);
                self.insert(id, end, " : undefined")?;
            }
        }
        self.parenthesize_operand(id, mark)
    }

    // ========================================================================
    // Switch
    // ========================================================================

    pub(crate) fn patch_switch(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Switch {
            expression,
            cases,
            alternate,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a switch"));
        };
        let tail = self.tail(id);
        let content = self.content(id);
        let keyword_end = content.start + "switch".len();
        let header_end = match expression {
            Some(expression) => {
                self.patch_header_condition(id, *expression)?;
                self.outer(*expression).end
            }
            None => {
                self.insert(id, keyword_end, " (false)")?;
                keyword_end
            }
        };
        self.insert(id, header_end, " {")?;

        for &case in cases {
            self.patch_switch_case(case, expression.is_none(), tail.as_ref())?;
        }

        let after_cases = cases.last().map_or(header_end, |&c| self.content(c).end);
        match alternate {
            Some(alt) => {
                let else_token = self
                    .tokens
                    .rfind_in(after_cases, self.content(*alt).start, TokenKind::Else)
                    .ok_or_else(|| PatchError::internal("switch default without `else`"))?;
                let span = self.tokens.span(else_token);
                self.overwrite(id, span.start, span.end, "default:")?;
                self.patch_block(*alt, tail)?;
            }
            None => {
                if let (Some(fallback), Some(&first)) =
                    (tail.as_ref().and_then(Tail::fallback), cases.first())
                {
                    let indent = self.effective_indent(self.content(first).start);
                    let end = self.closing_offset(content.end);
                    self.insert(id, end, &format!("\n{}default: {}", indent, fallback))?;
                }
            }
        }

        let end = self.closing_offset(content.end);
        let indent = self.effective_indent(content.start);
        self.insert(id, end, &format!("\n{}}}", indent))
    }

    /// `when a, b then c` becomes `case a: case b: c; break;`. Without a
    /// subject every condition is negated and matched against `false`.
    fn patch_switch_case(&mut self, case: NodeId, negate: bool, tail: Option<&Tail>) -> PatchResult<()> {
        let NodeKind::SwitchCase {
            conditions,
            consequent,
        } = self.kind(case)
        else {
            return Err(self.unexpected_kind(case, "a switch case"));
        };
        let start = self.content(case).start;
        self.overwrite(case, start, start + "when".len(), "case")?;
        for (i, &condition) in conditions.iter().enumerate() {
            if negate {
                self.negate(condition);
            }
            if i > 0 {
                let previous_end = self.outer(conditions[i - 1]).end;
                self.overwrite(case, previous_end, self.outer(condition).start, ": case ")?;
            }
            self.patch_expression(condition)?;
        }
        let last_end = conditions
            .last()
            .map_or(start + "when".len(), |&c| self.outer(c).end);

        let Some(body) = *consequent else {
            return self.insert(case, last_end, ":");
        };
        match self
            .tokens
            .find_in(last_end, self.content(body).start, TokenKind::Then)
        {
            Some(then) => self.overwrite(case, last_end, self.tokens.span(then).end, ":")?,
            None => self.insert(case, last_end, ":")?,
        }
        self.patch_block(body, tail.cloned())?;
        if !self.case_falls_through(body, tail) {
            return Ok(());
        }
        if self.is_inline_block(body) {
            let end = self.code_end(self.outer(body).end);
            self.insert(case, end, " break;")
        } else {
            let indent = self.body_indent(body);
            let end = self.closing_offset(self.content(body).end);
            self.insert(case, end, &format!("\n{}break;", indent))
        }
    }

    /// Whether control can reach the end of a case body.
    fn case_falls_through(&self, body: NodeId, tail: Option<&Tail>) -> bool {
        let NodeKind::Block { statements, .. } = self.kind(body) else {
            return true;
        };
        let Some(&last) = statements.last() else {
            return true;
        };
        match self.kind(last) {
            NodeKind::Return { .. } | NodeKind::Throw { .. } | NodeKind::Break | NodeKind::Continue => {
                false
            }
            NodeKind::Conditional { .. } | NodeKind::Switch { .. } | NodeKind::Try { .. } => true,
            _ => tail != Some(&Tail::Return),
        }
    }

    // ========================================================================
    // Try
    // ========================================================================

    pub(crate) fn patch_try(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Try {
            body,
            catch_assignee,
            catch_body,
            finally_body,
            has_catch,
            has_finally,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a try"));
        };
        let (body, catch_assignee, catch_body, finally_body) =
            (*body, *catch_assignee, *catch_body, *finally_body);
        let tail = self.tail(id);
        let content = self.content(id);
        let try_end = content.start + "try".len();

        let after_body = body.map_or(try_end, |b| self.content(b).end);
        let catch_token = if *has_catch {
            self.tokens.find_in(after_body, content.end, TokenKind::Catch)
        } else {
            None
        };
        let after_catch = catch_body
            .or(catch_assignee)
            .map(|n| self.content(n).end)
            .or(catch_token.map(|t| self.tokens.span(t).end))
            .unwrap_or(after_body);
        let finally_token = if *has_finally {
            self.tokens.find_in(after_catch, content.end, TokenKind::Finally)
        } else {
            None
        };
        let keyword_start = |token: Option<usize>| token.map(|t| self.tokens.span(t).start);
        let after_try_next = keyword_start(catch_token.or(finally_token));
        let after_catch_next = keyword_start(finally_token);

        self.open_block(id, try_end, body)?;
        if let Some(body) = body {
            self.patch_block(body, tail.clone())?;
        }
        self.close_block(id, body, after_try_next)?;

        if let Some(catch) = catch_token {
            let catch_end = self.tokens.span(catch).end;
            let header_end = match catch_assignee {
                Some(assignee) => {
                    let start = self.outer(assignee).start;
                    self.insert(id, start, "(")?;
                    self.patch_expression(assignee)?;
                    let end = self.outer(assignee).end;
                    self.insert(id, end, ")")?;
                    end
                }
                None => {
                    let name = self.claim_local(id, &["error"]);
                    self.insert(id, catch_end, &format!(" ({})", name))?;
                    catch_end
                }
            };
            self.open_block(id, header_end, catch_body)?;
            if let Some(catch_body) = catch_body {
                self.patch_block(catch_body, tail)?;
            }
            self.close_block(id, catch_body, after_catch_next)?;
        }

        if let Some(finally) = finally_token {
            let finally_end = self.tokens.span(finally).end;
            self.open_block(id, finally_end, finally_body)?;
            if let Some(finally_body) = finally_body {
                self.patch_block(finally_body, None)?;
            }
            self.close_block(id, finally_body, None)?;
        }

        if catch_token.is_none() && finally_token.is_none() {
            let name = self.claim_local(id, &["error"]);
            let end = self.after_close(body, try_end);
            self.insert(id, end, &format!(" catch ({}) {{}}", name))?;
        }
        Ok(())
    }

    // ========================================================================
    // Leaving a block
    // ========================================================================

    pub(crate) fn patch_throw(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Throw { expression } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "a throw"));
        };
        self.patch_expression(*expression)
    }

    pub(crate) fn patch_return(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Return { expression } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "a return"));
        };
        self.patch_opt_expression(*expression)
    }

    /// `yield`, `yield from` (as `yield*`) and `await`.
    pub(crate) fn patch_suspension(&mut self, id: NodeId) -> PatchResult<()> {
        let mark = self.mark();
        match self.kind(id) {
            NodeKind::Yield { expression } => self.patch_opt_expression(*expression)?,
            NodeKind::YieldFrom { expression } => {
                let start = self.content(id).start;
                let from = self
                    .tokens
                    .find_in(start, self.outer(*expression).start, TokenKind::From)
                    .ok_or_else(|| PatchError::internal("`yield from` without `from`"))?;
                let from_end = self.tokens.span(from).end;
                self.overwrite(id, start + "yield".len(), from_end, "*")?;
                self.patch_expression(*expression)?;
            }
            NodeKind::Await { expression } => self.patch_expression(*expression)?,
            _ => return Err(self.unexpected_kind(id, "yield or await")),
        }
        self.parenthesize_operand(id, mark)
    }
}

#[cfg(test)]
mod tests {
    use crate::options::ConvertOptions;
    use crate::patcher::Patcher;

    fn main_stage(source: &str) -> String {
        let parsed = decaf_coffee::parse(source).unwrap();
        let options = ConvertOptions::default();
        let mut p = Patcher::new(source, &parsed, &options);
        p.patch_program().unwrap();
        p.render()
    }

    mod conditionals {
        use super::*;

        #[test]
        fn unless_negates_the_condition() {
            assert_eq!(main_stage("unless a then b"), "if (!a) { b; }");
            assert_eq!(main_stage("unless a is b then c"), "if (a !== b) { c; }");
        }

        #[test]
        fn else_if_chains() {
            assert_eq!(
                main_stage("if a\n  b\nelse if c\n  d\nelse\n  e\n"),
                "if (a) {\n  b;\n} else if (c) {\n  d;\n} else {\n  e;\n}\n"
            );
        }

        #[test]
        fn single_expression_branches_become_ternaries() {
            assert_eq!(main_stage("x = if a then b else c"), "let x = a ? b : c;");
            assert_eq!(main_stage("x = if a then b"), "let x = a ? b : undefined;");
            assert_eq!(
                main_stage("x = if a then b else if c then d else e"),
                "let x = a ? b : c ? d : e;"
            );
        }

        #[test]
        fn parenthesized_negated_conditions_keep_their_parens() {
            assert_eq!(main_stage("unless (a) then b"), "if (!(a)) { b; }");
        }
    }

    mod switches {
        use super::*;

        #[test]
        fn cases_break_unless_they_leave() {
            assert_eq!(
                main_stage("switch a\n  when 1, 2\n    b\n  when 3 then return c\n  else d\n"),
                "switch (a) {\n  case 1: case 2:\n    b;\n    break;\n  case 3: return c;\n  default: d;\n}\n"
            );
        }

        #[test]
        fn subjectless_switch_matches_false() {
            assert_eq!(
                main_stage("switch\n  when a then b\n"),
                "switch (false) {\n  case !a: b; break;\n}\n"
            );
        }
    }

    mod try_catch {
        use super::*;

        #[test]
        fn catch_binding_gets_parens() {
            assert_eq!(
                main_stage("try\n  a()\ncatch e\n  b(e)\nfinally\n  c()\n"),
                "try {\n  a();\n} catch (e) {\n  b(e);\n} finally {\n  c();\n}\n"
            );
        }

        #[test]
        fn bare_try_gets_an_empty_catch() {
            assert_eq!(main_stage("try a()"), "try { a(); } catch (error) {}");
        }

        #[test]
        fn catch_without_binding_claims_a_name() {
            assert_eq!(
                main_stage("try a() catch then b()"),
                "try { a(); } catch (error) { b(); }"
            );
        }
    }

    mod suspensions {
        use super::*;

        #[test]
        fn yield_from_delegates() {
            assert_eq!(main_stage("f = -> yield from g()"), "let f = function*() { return yield* g(); };");
        }
    }
}
