//! Operators and assignments.

use decaf_coffee::{BinaryOperator, NodeId, NodeKind, UnaryOperator};
use decaf_core::editor::EditMark;
use decaf_core::patch::Span;

use crate::error::{PatchError, PatchResult};
use crate::helpers::Helper;
use crate::patcher::{Patcher, RepeatOptions};
use crate::scope::Declaration;
use crate::suggestions::Suggestion;

impl Patcher<'_> {
    // ========================================================================
    // Assignment
    // ========================================================================

    pub(crate) fn patch_assign(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::AssignOp {
            assignee,
            expression,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "an assignment"));
        };
        let (assignee, expression) = (*assignee, *expression);
        let mark = self.mark();
        if self.declares_inline(id, assignee) {
            let start = self.content(id).start;
            self.insert(id, start, "let ")?;
        }
        self.patch_expression(assignee)?;
        self.patch_expression(expression)?;
        self.parenthesize_unless_negated(id, mark)
    }

    /// Whether the assignment itself starts with `let`. An inline
    /// declaration that ended up inside an expression is hoisted instead.
    fn declares_inline(&mut self, id: NodeId, assignee: NodeId) -> bool {
        let NodeKind::Identifier { name } = self.kind(assignee) else {
            return false;
        };
        if self.scopes.declaration(assignee) != Some(Declaration::Inline) {
            return false;
        }
        let statement = !self.node(id).expression
            && self
                .parent(id)
                .is_some_and(|parent| matches!(self.kind(parent), NodeKind::Block { .. }));
        if statement {
            return true;
        }
        let scope = self.scopes.scope_of(self.tree, id);
        self.scopes.hoist(scope, name);
        false
    }

    fn parenthesize_unless_negated(&mut self, id: NodeId, mark: EditMark) -> PatchResult<()> {
        if self.is_negated(id) {
            return Ok(());
        }
        self.parenthesize_operand(id, mark)
    }

    /// `a += b` stays; `a or= b` becomes `a || (a = b)`; `a //= b` becomes
    /// `a = Math.floor(a / b)`.
    pub(crate) fn patch_compound_assign(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::CompoundAssignOp {
            op,
            assignee,
            expression,
            op_span,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a compound assignment"));
        };
        let (op, assignee, expression, op_span) = (*op, *assignee, *expression, *op_span);
        let mark = self.mark();
        let logical = matches!(op, BinaryOperator::Or | BinaryOperator::And);
        if logical && !self.options.logical_assignment {
            let reference = self.patch_repeatable(assignee, RepeatOptions::default())?;
            let text = format!(" {} ({} = ", if op == BinaryOperator::Or { "||" } else { "&&" }, reference);
            self.overwrite(id, self.outer(assignee).end, self.outer(expression).start, &text)?;
            self.patch_expression(expression)?;
            self.insert(id, self.outer(expression).end, ")")?;
            return self.parenthesize_unless_negated(id, mark);
        }
        match op {
            BinaryOperator::FloorDiv | BinaryOperator::FloorMod => {
                let reference = self.patch_repeatable(assignee, RepeatOptions::default())?;
                let text = if op == BinaryOperator::FloorDiv {
                    format!(" = Math.floor({} / ", reference)
                } else {
                    let helper = self.register_helper(Helper::Mod);
                    format!(" = {}({}, ", helper, reference)
                };
                self.overwrite(id, self.outer(assignee).end, self.outer(expression).start, &text)?;
                self.patch_expression(expression)?;
                self.insert(id, self.outer(expression).end, ")")?;
            }
            _ => {
                let js = op
                    .js_text()
                    .ok_or_else(|| PatchError::internal(format!("no compound form for {:?}", op)))?;
                let js = format!("{}=", js);
                if &self.source[op_span.start..op_span.end] != js {
                    self.overwrite(id, op_span.start, op_span.end, &js)?;
                }
                self.patch_expression(assignee)?;
                self.patch_expression(expression)?;
            }
        }
        self.parenthesize_unless_negated(id, mark)
    }

    /// `a ?= b` as a value: `a != null ? a : (a = b)`.
    pub(crate) fn patch_exists_assign(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::ExistsAssignOp {
            assignee,
            expression,
            op_span,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "an existence assignment"));
        };
        let (assignee, expression, op_span) = (*assignee, *expression, *op_span);
        if self.options.logical_assignment {
            return self.patch_nullish_assign(id, assignee, expression, op_span);
        }
        let mark = self.mark();
        let reference = self.patch_repeatable(assignee, RepeatOptions::default())?;
        let text = format!(" != null ? {0} : ({0} = ", reference);
        self.overwrite(id, self.outer(assignee).end, self.outer(expression).start, &text)?;
        self.patch_expression(expression)?;
        self.insert(id, self.outer(expression).end, ")")?;
        self.parenthesize_unless_negated(id, mark)
    }

    /// `a ?= b` as a statement: `if (a == null) { a = b; }`.
    pub(crate) fn patch_exists_assign_statement(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::ExistsAssignOp {
            assignee,
            expression,
            op_span,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "an existence assignment"));
        };
        let (assignee, expression, op_span) = (*assignee, *expression, *op_span);
        if self.options.logical_assignment {
            return self.patch_nullish_assign(id, assignee, expression, op_span);
        }
        let start = self.content(id).start;
        self.insert(id, start, "if (")?;
        let reference = self.patch_repeatable(assignee, RepeatOptions::default())?;
        let text = format!(" == null) {{ {} = ", reference);
        self.overwrite(id, self.outer(assignee).end, self.outer(expression).start, &text)?;
        self.patch_expression(expression)?;
        let end = self.code_end(self.outer(expression).end);
        self.insert(id, end, "; }")
    }

    fn patch_nullish_assign(
        &mut self,
        id: NodeId,
        assignee: NodeId,
        expression: NodeId,
        op_span: Span,
    ) -> PatchResult<()> {
        let mark = self.mark();
        self.patch_expression(assignee)?;
        self.overwrite(id, op_span.start, op_span.end, "??=")?;
        self.patch_expression(expression)?;
        self.parenthesize_unless_negated(id, mark)
    }

    // ========================================================================
    // Binary operators
    // ========================================================================

    pub(crate) fn patch_binary(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::BinaryOp {
            op,
            left,
            right,
            op_span,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a binary operator"));
        };
        let (left, right, op_span) = (*left, *right, *op_span);
        let op = match op.inverse(self.options.loose_comparison_negation) {
            Some(inverse) if self.is_negated(id) => inverse,
            _ => *op,
        };
        match op {
            BinaryOperator::Exists => self.patch_exists_binary(id, left, right, op_span),
            BinaryOperator::In | BinaryOperator::NotIn => self.patch_in(id, op, left, right),
            BinaryOperator::FloorDiv => {
                self.insert(id, self.outer(left).start, "Math.floor(")?;
                self.patch_expression(left)?;
                self.overwrite(id, op_span.start, op_span.end, "/")?;
                self.patch_expression(right)?;
                self.insert(id, self.outer(right).end, ")")
            }
            BinaryOperator::FloorMod => {
                let helper = self.register_helper(Helper::Mod);
                self.insert(id, self.outer(left).start, &format!("{}(", helper))?;
                self.patch_expression(left)?;
                self.overwrite(id, self.outer(left).end, self.outer(right).start, ", ")?;
                self.patch_expression(right)?;
                self.insert(id, self.outer(right).end, ")")
            }
            BinaryOperator::NotOf | BinaryOperator::NotInstanceOf => {
                let js = if op == BinaryOperator::NotOf { "in" } else { "instanceof" };
                self.insert(id, self.outer(left).start, "!(")?;
                self.patch_expression(left)?;
                self.overwrite(id, op_span.start, op_span.end, js)?;
                self.patch_expression(right)?;
                self.insert(id, self.outer(right).end, ")")
            }
            _ => {
                let js = match op {
                    BinaryOperator::Of => "in",
                    _ => op
                        .js_text()
                        .ok_or_else(|| PatchError::internal(format!("no JavaScript form for {:?}", op)))?,
                };
                self.patch_expression(left)?;
                if &self.source[op_span.start..op_span.end] != js {
                    self.overwrite(id, op_span.start, op_span.end, js)?;
                }
                self.patch_expression(right)
            }
        }
    }

    /// `a in b` becomes `Array.from(b).includes(a)`, or `__in__(a, b)`.
    fn patch_in(&mut self, id: NodeId, op: BinaryOperator, left: NodeId, right: NodeId) -> PatchResult<()> {
        let mark = self.mark();
        self.patch_expression(left)?;
        let needle = self.capture(left, mark)?;
        self.patch_expression(right)?;
        let haystack = self.capture(right, mark)?;
        let bang = if op == BinaryOperator::NotIn { "!" } else { "" };
        let text = if self.options.no_array_includes {
            let helper = self.register_helper(Helper::In);
            format!("{}{}({}, {})", bang, helper, needle, haystack)
        } else {
            self.record(Suggestion::IncludesOrder);
            let literal = matches!(self.kind(right), NodeKind::Array { .. } | NodeKind::Range { .. });
            let target = if literal || self.options.no_array_from {
                if self.is_atomic(right) {
                    haystack
                } else {
                    format!("({})", haystack)
                }
            } else {
                self.record(Suggestion::RemoveArrayFrom);
                format!("Array.from({})", haystack)
            };
            format!("{}{}.includes({})", bang, target, needle)
        };
        let content = self.content(id);
        self.overwrite_since(id, content.start, content.end, &text, mark)
    }

    /// `a ? b`: `a != null ? a : b`, or `a ?? b`.
    fn patch_exists_binary(
        &mut self,
        id: NodeId,
        left: NodeId,
        right: NodeId,
        op_span: Span,
    ) -> PatchResult<()> {
        let mark = self.mark();
        if self.options.nullish_coalescing {
            self.patch_expression(left)?;
            self.overwrite(id, op_span.start, op_span.end, "??")?;
            self.patch_expression(right)?;
            return self.parenthesize_unless_negated(id, mark);
        }
        let separator = match self.kind(left) {
            NodeKind::Identifier { name } if !self.scopes.is_bound(self.tree, left, name) => {
                self.record(Suggestion::ShorterNullChecks);
                let start = self.outer(left).start;
                self.insert(id, start, &format!("typeof {0} !== 'undefined' && {0} !== null ? ", name))?;
                " : ".to_string()
            }
            _ => {
                let reference = self.patch_repeatable(left, RepeatOptions::default())?;
                format!(" != null ? {} : ", reference)
            }
        };
        self.overwrite(id, self.outer(left).end, self.outer(right).start, &separator)?;
        self.patch_expression(right)?;
        self.parenthesize_unless_negated(id, mark)
    }

    /// `a < b < c` becomes `a < b && b < c`.
    pub(crate) fn patch_chained_comparison(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::ChainedComparison {
            operands,
            operators,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a chained comparison"));
        };
        let mark = self.mark();
        let last = operands.len().saturating_sub(1);
        for (i, &operand) in operands.iter().enumerate() {
            if i == 0 || i == last {
                self.patch_expression(operand)?;
            } else {
                let reference = self.patch_repeatable(operand, RepeatOptions::default())?;
                let end = self.outer(operand).end;
                self.insert(id, end, &format!(" && {}", reference))?;
            }
        }
        for &(op, span) in operators {
            let js = op
                .js_text()
                .ok_or_else(|| PatchError::internal(format!("{:?} cannot be chained", op)))?;
            if &self.source[span.start..span.end] != js {
                self.overwrite(id, span.start, span.end, js)?;
            }
        }
        self.parenthesize_unless_negated(id, mark)
    }

    // ========================================================================
    // Unary operators
    // ========================================================================

    pub(crate) fn patch_unary(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::UnaryOp {
            op,
            expression,
            op_span,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a unary operator"));
        };
        let (op, expression, op_span) = (*op, *expression, *op_span);
        if op == UnaryOperator::Not {
            let operand_start = self.outer(expression).start;
            let double_negation = matches!(
                self.kind(expression),
                NodeKind::UnaryOp {
                    op: UnaryOperator::Not,
                    ..
                }
            );
            if self.is_negated(id) {
                self.remove(id, op_span.start, operand_start)?;
            } else if self.negates_natively(expression) && !double_negation {
                self.remove(id, op_span.start, operand_start)?;
                self.negate(expression);
            } else {
                self.overwrite(id, op_span.start, operand_start, "!")?;
            }
            return self.patch_expression(expression);
        }
        let js = op.js_text();
        if &self.source[op_span.start..op_span.end] != js.trim_end() {
            self.overwrite(id, op_span.start, op_span.end, js.trim_end())?;
        }
        self.patch_expression(expression)
    }

    /// `a?` becomes `a != null`, or `a == null` when negated.
    pub(crate) fn patch_unary_exists(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::UnaryExists { expression } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "an existence check"));
        };
        let expression = *expression;
        let negated = self.is_negated(id);
        let mark = self.mark();
        let end = self.content(id).end;
        if let NodeKind::Identifier { name } = self.kind(expression) {
            if !self.scopes.is_bound(self.tree, expression, name) {
                self.record(Suggestion::ShorterNullChecks);
                let text = if negated {
                    format!("typeof {0} === 'undefined' || {0} === null", name)
                } else {
                    format!("typeof {0} !== 'undefined' && {0} !== null", name)
                };
                let start = self.content(id).start;
                self.overwrite(id, start, end, &text)?;
                return self.parenthesize_operand(id, mark);
            }
        }
        self.patch_expression(expression)?;
        let check = if negated { " == null" } else { " != null" };
        self.overwrite(id, self.outer(expression).end, end, check)
    }

    /// `(a; b)` becomes `(a, b)`.
    pub(crate) fn patch_seq(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Seq { left, right } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "a sequence"));
        };
        let (left, right) = (*left, *right);
        self.patch_expression(left)?;
        self.overwrite(id, self.outer(left).end, self.outer(right).start, ", ")?;
        self.patch_expression(right)
    }
}

#[cfg(test)]
mod tests {
    use crate::options::ConvertOptions;
    use crate::patcher::Patcher;

    fn main_stage_with(source: &str, options: &ConvertOptions) -> (String, Vec<&'static str>) {
        let parsed = decaf_coffee::parse(source).unwrap();
        let mut p = Patcher::new(source, &parsed, options);
        p.patch_program().unwrap();
        let codes = p.suggestions.iter().map(|s| s.code()).collect();
        (p.render(), codes)
    }

    fn main_stage(source: &str) -> String {
        main_stage_with(source, &ConvertOptions::default()).0
    }

    fn with(configure: impl FnOnce(&mut ConvertOptions)) -> ConvertOptions {
        let mut options = ConvertOptions::default();
        configure(&mut options);
        options
    }

    mod binary {
        use super::*;

        #[test]
        fn word_operators() {
            assert_eq!(main_stage("x = a is b and c isnt d"), "let x = a === b && c !== d;");
            assert_eq!(main_stage("x = a or b"), "let x = a || b;");
            assert_eq!(main_stage("x = a of b"), "let x = a in b;");
            assert_eq!(main_stage("x = a not of b"), "let x = !(a in b);");
            assert_eq!(main_stage("x = a not instanceof B"), "let x = !(a instanceof B);");
        }

        #[test]
        fn floor_division_and_modulo() {
            assert_eq!(main_stage("x = a // b"), "let x = Math.floor(a / b);");
            assert_eq!(main_stage("x = a %% b"), "let x = __mod__(a, b);");
        }

        #[test]
        fn membership_uses_includes() {
            let (code, codes) = main_stage_with("x = a in b", &ConvertOptions::default());
            assert_eq!(code, "let x = Array.from(b).includes(a);");
            assert_eq!(codes, vec!["DS101", "DS204"]);
            assert_eq!(main_stage("x = a in [1, 2]"), "let x = [1, 2].includes(a);");
            assert_eq!(main_stage("x = a not in [1, 2]"), "let x = ![1, 2].includes(a);");
        }

        #[test]
        fn membership_without_includes_uses_a_helper() {
            let options = with(|o| o.no_array_includes = true);
            let (code, _) = main_stage_with("x = a in b", &options);
            assert_eq!(code, "let x = __in__(a, b);");
        }

        #[test]
        fn existence_operator() {
            assert_eq!(
                main_stage("x = a ? b"),
                "let x = typeof a !== 'undefined' && a !== null ? a : b;"
            );
            assert_eq!(main_stage("a = 1\nx = a ? b"), "let a = 1;\nlet x = a != null ? a : b;");
            assert_eq!(
                main_stage("x = f() ? b"),
                "let ref;\nlet x = (ref = f()) != null ? ref : b;"
            );
            let options = with(|o| o.nullish_coalescing = true);
            assert_eq!(main_stage_with("x = a ? b", &options).0, "let x = a ?? b;");
        }

        #[test]
        fn chained_comparisons_repeat_the_middle() {
            assert_eq!(main_stage("x = a < b < c"), "let x = a < b && b < c;");
            assert_eq!(
                main_stage("x = a < f() <= c"),
                "let ref;\nlet x = a < (ref = f()) && ref <= c;"
            );
        }
    }

    mod unary {
        use super::*;

        #[test]
        fn not_pushes_into_comparisons() {
            assert_eq!(main_stage("x = not a"), "let x = !a;");
            assert_eq!(main_stage("x = not (a is b)"), "let x = (a !== b);");
            assert_eq!(main_stage("x = !!a"), "let x = !!a;");
        }

        #[test]
        fn existence_checks() {
            assert_eq!(main_stage("x = a?"), "let x = typeof a !== 'undefined' && a !== null;");
            assert_eq!(main_stage("a = 1\nx = a?"), "let a = 1;\nlet x = a != null;");
            assert_eq!(main_stage("a = 1\nx = not a?"), "let a = 1;\nlet x = a == null;");
        }

        #[test]
        fn word_operators_keep_their_spacing() {
            assert_eq!(main_stage("x = typeof a"), "let x = typeof a;");
            assert_eq!(main_stage("x = -a"), "let x = -a;");
        }
    }

    mod assignment {
        use super::*;

        #[test]
        fn logical_assignment() {
            assert_eq!(main_stage("a = 1\na or= 2"), "let a = 1;\na || (a = 2);");
            assert_eq!(main_stage("a = 1\na and= 2"), "let a = 1;\na && (a = 2);");
            let options = with(|o| o.logical_assignment = true);
            assert_eq!(main_stage_with("a = 1\na or= 2", &options).0, "let a = 1;\na ||= 2;");
        }

        #[test]
        fn floor_compound_assignment() {
            assert_eq!(main_stage("a = {}\na.b //= 2"), "let a = {};\na.b = Math.floor(a.b / 2);");
            assert_eq!(main_stage("a = 1\na %%= 2"), "let a = 1;\na = __mod__(a, 2);");
            assert_eq!(main_stage("a = 1\na += 2"), "let a = 1;\na += 2;");
        }

        #[test]
        fn existence_assignment_statement() {
            assert_eq!(main_stage("a = null\na ?= 1"), "let a = null;\nif (a == null) { a = 1; }");
            let options = with(|o| o.logical_assignment = true);
            assert_eq!(main_stage_with("a = null\na ?= 1", &options).0, "let a = null;\na ??= 1;");
        }

        #[test]
        fn existence_assignment_value() {
            assert_eq!(
                main_stage("a = null\nx = (a ?= 1)"),
                "let a = null;\nlet x = (a != null ? a : (a = 1));"
            );
        }

        #[test]
        fn sequences() {
            assert_eq!(main_stage("x = (a; b)"), "let x = (a, b);");
        }
    }
}
