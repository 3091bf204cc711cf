//! Loops and comprehensions.
//!
//! `for` headers are rebuilt as a whole: the loop variable, target, step and
//! filter are patched in place, captured, and the header is overwritten with
//! the JavaScript form built from the captured texts. Filters and value
//! bindings become statements at the top of the body.

use decaf_coffee::{NodeId, NodeKind, UnaryOperator};
use decaf_core::editor::EditMark;

use crate::error::{PatchError, PatchResult};
use crate::patcher::{Patcher, RepeatOptions, Tail};
use crate::suggestions::Suggestion;

impl Patcher<'_> {
    // ========================================================================
    // While
    // ========================================================================

    pub(crate) fn patch_while(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::While {
            condition,
            guard,
            body,
            negated,
            ..
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a while loop"));
        };
        let (condition, guard, body) = (*condition, *guard, *body);
        let tail = self.tail(id);
        let start = self.content(id).start;
        let header_end = match condition {
            Some(condition) => {
                if *negated {
                    self.overwrite(id, start, start + "until".len(), "while")?;
                    self.negate(condition);
                }
                self.patch_header_condition(id, condition)?;
                self.outer(condition).end
            }
            None => {
                let end = start + "loop".len();
                self.overwrite(id, start, end, "while (true)")?;
                end
            }
        };
        let mut prelude = Vec::new();
        if let Some(guard) = guard {
            let mark = self.mark();
            prelude.push(self.loop_filter(guard, mark)?);
            let guard_end = self.outer(guard).end;
            self.overwrite_since(id, header_end, guard_end, "", mark)?;
        }
        self.patch_loop_body(id, header_end, body, &prelude, tail)
    }

    /// `when cond` becomes `if (!cond) { continue; }`.
    fn loop_filter(&mut self, filter: NodeId, mark: EditMark) -> PatchResult<String> {
        self.negate(filter);
        self.patch_expression(filter)?;
        let text = self.capture(filter, mark)?;
        Ok(format!("if ({}) {{ continue; }}", text))
    }

    fn patch_loop_body(
        &mut self,
        id: NodeId,
        header_end: usize,
        body: Option<NodeId>,
        prelude: &[String],
        tail: Option<Tail>,
    ) -> PatchResult<()> {
        let Some(body) = body else {
            return self.insert(id, header_end, " {}");
        };
        self.open_block(id, header_end, Some(body))?;
        self.prepend_statements(id, body, prelude)?;
        self.patch_block(body, tail)?;
        self.close_block(id, Some(body), None)
    }

    // ========================================================================
    // For ... in
    // ========================================================================

    pub(crate) fn patch_for_in(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::ForIn {
            key_assignee,
            value_assignee,
            target,
            step,
            filter,
            body,
            postfix,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a for-in loop"));
        };
        if *postfix {
            return Err(PatchError::internal("postfix loop was not normalized"));
        }
        let value = value_assignee
            .ok_or_else(|| PatchError::unsupported("loop without a variable", self.content(id)))?;
        let (key, target, step, filter, body) = (*key_assignee, *target, *step, *filter, *body);
        let tail = self.tail(id);
        let for_end = self.content(id).start + "for".len();
        let header_end = self.header_end(&[Some(target), step, filter]);

        let mark = self.mark();
        let mut prelude = Vec::new();
        let header = match self.kind(target) {
            NodeKind::Range { .. } if key.is_none() => self.range_loop_header(id, value, target, step, mark)?,
            _ if key.is_none() && step.is_none() => self.for_of_array_header(id, value, target, mark)?,
            _ => self.indexed_loop_header(id, value, key, target, step, mark, &mut prelude)?,
        };
        if let Some(filter) = filter {
            prelude.push(self.loop_filter(filter, mark)?);
        }
        tracing::trace!(node = id.0, %header, "rebuilt loop header");
        self.overwrite_since(id, for_end, header_end, &format!(" ({})", header), mark)?;
        self.patch_loop_body(id, header_end, body, &prelude, tail)
    }

    fn header_end(&self, parts: &[Option<NodeId>]) -> usize {
        parts
            .iter()
            .flatten()
            .map(|&part| self.outer(part).end)
            .max()
            .unwrap_or(0)
    }

    /// `for x in xs` iterates the values: `for (let x of Array.from(xs))`.
    fn for_of_array_header(&mut self, id: NodeId, value: NodeId, target: NodeId, mark: EditMark) -> PatchResult<String> {
        let declaration = self.loop_declaration(id, value);
        self.patch_expression(value)?;
        let value_text = self.capture(value, mark)?;
        self.patch_expression(target)?;
        let target_text = self.capture(target, mark)?;
        let literal = matches!(self.kind(target), NodeKind::Array { .. } | NodeKind::Range { .. });
        let iterable = if literal || self.options.no_array_from {
            target_text
        } else {
            self.record(Suggestion::RemoveArrayFrom);
            format!("Array.from({})", target_text)
        };
        Ok(format!("{}{} of {}", declaration, value_text, iterable))
    }

    /// `for x, i in xs by 2` counts through the indices and reads the value
    /// at the top of the body.
    #[allow(clippy::too_many_arguments)]
    fn indexed_loop_header(
        &mut self,
        id: NodeId,
        value: NodeId,
        key: Option<NodeId>,
        target: NodeId,
        step: Option<NodeId>,
        mark: EditMark,
        prelude: &mut Vec<String>,
    ) -> PatchResult<String> {
        let (index, declared) = match key {
            Some(key) => {
                let NodeKind::Identifier { name } = self.kind(key) else {
                    return Err(PatchError::unsupported("loop index must be a name", self.content(key)));
                };
                (name.clone(), self.scopes.is_loop_local(id, name))
            }
            None => (self.claim_local(id, &["i"]), true),
        };
        let keyword = if declared { "let " } else { "" };
        let mut init = Vec::new();

        self.patch_expression(target)?;
        let target_text = self.capture(target, mark)?;
        let array = if self.is_repeatable(target) {
            target_text
        } else {
            let name = self.claim_temp(id, declared, "array");
            init.push(format!("{} = {}", name, target_text));
            name
        };

        let value_declaration = self.loop_declaration(id, value);
        self.patch_expression(value)?;
        let value_text = self.capture(value, mark)?;
        prelude.push(binding_statement(
            value_declaration,
            &value_text,
            &format!("{}[{}]", array, index),
            matches!(self.kind(value), NodeKind::Object { .. }),
        ));

        let length = format!("{}.length", array);
        let last = format!("{} - 1", length);
        let (start, condition, advance) = match step {
            None => ("0".to_string(), format!("{} < {}", index, length), update(&index, 1)),
            Some(step) => {
                self.patch_expression(step)?;
                let step_text = self.capture(step, mark)?;
                match self.int_literal(step) {
                    Some(n) if n < 0 => (last, format!("{} >= 0", index), update(&index, n)),
                    Some(n) => ("0".to_string(), format!("{} < {}", index, length), update(&index, n)),
                    None => {
                        let step_ref = self.stored(id, declared, "step", step, step_text, &mut init);
                        let asc = self.claim_temp(id, declared, "asc");
                        init.push(format!("{} = {} > 0", asc, step_ref));
                        (
                            format!("{} ? 0 : {}", asc, last),
                            format!("{0} ? {1} < {2} : {1} >= 0", asc, index, length),
                            format!("{} += {}", index, step_ref),
                        )
                    }
                }
            }
        };
        // The index starts after the temporaries its start depends on.
        init.push(format!("{} = {}", index, start));
        Ok(format!("{}{}; {}; {}", keyword, init.join(", "), condition, advance))
    }

    /// `for i in [a..b]` counts without building the range.
    fn range_loop_header(
        &mut self,
        id: NodeId,
        value: NodeId,
        target: NodeId,
        step: Option<NodeId>,
        mark: EditMark,
    ) -> PatchResult<String> {
        let NodeKind::Range {
            left,
            right,
            inclusive,
        } = self.kind(target)
        else {
            return Err(self.unexpected_kind(target, "a range"));
        };
        let (left, right, inclusive) = (*left, *right, *inclusive);
        let NodeKind::Identifier { name } = self.kind(value) else {
            return Err(PatchError::unsupported(
                "range loop variable must be a name",
                self.content(value),
            ));
        };
        let index = name.clone();
        let declared = self.scopes.is_loop_local(id, &index);
        let keyword = if declared { "let " } else { "" };

        self.patch_expression(left)?;
        let left_text = self.capture(left, mark)?;
        self.patch_expression(right)?;
        let right_text = self.capture(right, mark)?;
        let (ascending_op, descending_op) = if inclusive { ("<=", ">=") } else { ("<", ">") };

        let mut init = vec![format!("{} = {}", index, left_text)];
        let literal_step = match step {
            Some(step) => {
                self.patch_expression(step)?;
                let text = self.capture(step, mark)?;
                match self.int_literal(step) {
                    Some(n) => Some(n),
                    None => {
                        let end = self.stored(id, declared, "end", right, right_text, &mut init);
                        let step_ref = self.stored(id, declared, "step", step, text, &mut init);
                        let asc = self.claim_temp(id, declared, "asc");
                        init.push(format!("{} = {} > 0", asc, step_ref));
                        return Ok(format!(
                            "{0}{1}; {2} ? {3} {4} {5} : {3} {6} {5}; {3} += {7}",
                            keyword,
                            init.join(", "),
                            asc,
                            index,
                            ascending_op,
                            end,
                            descending_op,
                            step_ref
                        ));
                    }
                }
            }
            None => None,
        };

        let bounds = (self.int_literal(left), self.int_literal(right));
        let direction = match (literal_step, bounds) {
            (Some(n), _) => Some(n),
            (None, (Some(l), Some(r))) => Some(if l <= r { 1 } else { -1 }),
            (None, _) => None,
        };
        let end = self.stored(id, declared, "end", right, right_text, &mut init);
        let header = match direction {
            Some(n) => {
                let op = if n >= 0 { ascending_op } else { descending_op };
                format!(
                    "{}{}; {} {} {}; {}",
                    keyword,
                    init.join(", "),
                    index,
                    op,
                    end,
                    update(&index, n)
                )
            }
            None => {
                let asc = self.claim_temp(id, declared, "asc");
                init.push(format!("{} = {} <= {}", asc, index, end));
                format!(
                    "{0}{1}; {2} ? {3} {4} {5} : {3} {6} {5}; {2} ? {3}++ : {3}--",
                    keyword,
                    init.join(", "),
                    asc,
                    index,
                    ascending_op,
                    end,
                    descending_op
                )
            }
        };
        Ok(header)
    }

    // ========================================================================
    // For ... of
    // ========================================================================

    pub(crate) fn patch_for_of(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::ForOf {
            key_assignee,
            value_assignee,
            target,
            filter,
            body,
            own,
            postfix,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a for-of loop"));
        };
        if *postfix {
            return Err(PatchError::internal("postfix loop was not normalized"));
        }
        let (key, value, target, filter, body, own) =
            (*key_assignee, *value_assignee, *target, *filter, *body, *own);
        let tail = self.tail(id);
        let for_end = self.content(id).start + "for".len();
        let header_end = self.header_end(&[Some(target), filter]);

        let mark = self.mark();
        let mut prelude = Vec::new();
        let key_declaration = self.loop_declaration(id, key);
        self.patch_expression(key)?;
        let key_text = self.capture(key, mark)?;

        match value {
            Some(value) => {
                let object = self.patch_repeatable(target, RepeatOptions::named("obj"))?;
                let value_declaration = self.loop_declaration(id, value);
                self.patch_expression(value)?;
                let value_text = self.capture(value, mark)?;
                prelude.push(binding_statement(
                    value_declaration,
                    &value_text,
                    &format!("{}[{}]", object, key_text),
                    matches!(self.kind(value), NodeKind::Object { .. }),
                ));
            }
            None => self.patch_expression(target)?,
        }
        let target_text = self.capture(target, mark)?;
        let header = if own {
            let operand = if self.is_atomic(target) {
                target_text
            } else {
                format!("({})", target_text)
            };
            format!("{}{} of Object.keys({} || {{}})", key_declaration, key_text, operand)
        } else {
            format!("{}{} in {}", key_declaration, key_text, target_text)
        };
        if let Some(filter) = filter {
            prelude.push(self.loop_filter(filter, mark)?);
        }
        self.overwrite_since(id, for_end, header_end, &format!(" ({})", header), mark)?;
        self.patch_loop_body(id, header_end, body, &prelude, tail)
    }

    // ========================================================================
    // Comprehensions
    // ========================================================================

    /// Whether a `for ... in` used as a value can become
    /// `xs.filter(x => ...).map(x => ...)`.
    pub(crate) fn is_comprehension_candidate(&self, id: NodeId) -> bool {
        let NodeKind::ForIn {
            key_assignee: None,
            value_assignee: Some(value),
            target,
            step: None,
            body: Some(body),
            ..
        } = self.kind(id)
        else {
            return false;
        };
        let NodeKind::Identifier { name } = self.kind(*value) else {
            return false;
        };
        let target_ok = match self.kind(*target) {
            NodeKind::Array { .. } => true,
            NodeKind::Range { .. } => false,
            _ => self.options.loose_for_expressions,
        };
        let body_ok = self.single_statement(*body).is_some_and(|statement| {
            !matches!(
                self.kind(statement),
                NodeKind::Return { .. } | NodeKind::Throw { .. } | NodeKind::Break | NodeKind::Continue
            ) && self.can_be_expression(statement)
                && self.prefers_expression(statement)
        });
        target_ok
            && body_ok
            && self.scopes.is_loop_local(id, name)
            && !self.suspends(id)
            && !self.contains_comment(id)
    }

    /// `yield` or `await` inside `id`, outside nested functions.
    fn suspends(&self, id: NodeId) -> bool {
        let mut stack = self.kind(id).child_ids();
        while let Some(node) = stack.pop() {
            match self.kind(node) {
                NodeKind::Yield { .. } | NodeKind::YieldFrom { .. } | NodeKind::Await { .. } => {
                    return true
                }
                NodeKind::Function { .. } => {}
                kind => stack.extend(kind.child_ids()),
            }
        }
        false
    }

    pub(crate) fn patch_comprehension(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::ForIn {
            value_assignee: Some(value),
            target,
            filter,
            body: Some(body),
            ..
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a comprehension"));
        };
        let name = self.node_text(*value);
        let statement = self
            .single_statement(*body)
            .ok_or_else(|| PatchError::internal("comprehension body is not a single statement"))?;
        let mark = self.mark();

        self.patch_expression(*target)?;
        let mut text = self.capture(*target, mark)?;
        if !self.is_atomic(*target) {
            text = format!("({})", text);
        }
        if let Some(filter) = filter {
            self.patch_expression(*filter)?;
            let condition = self.capture(*filter, mark)?;
            text.push_str(&format!(".filter({} => {})", name, condition));
        }
        self.patch_expression(statement)?;
        let mut mapped = self.capture(statement, mark)?;
        // A literal target is already a fresh array, and `.filter` makes one.
        let copied = filter.is_some() || matches!(self.kind(*target), NodeKind::Array { .. });
        if mapped != name || !copied {
            if matches!(self.kind(statement), NodeKind::Object { .. }) && !self.is_parenthesized(statement) {
                mapped = format!("({})", mapped);
            }
            text.push_str(&format!(".map({} => {})", name, mapped));
        }
        let content = self.content(id);
        self.overwrite_since(id, content.start, content.end, &text, mark)
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// `let ` when the loop header declares every name bound by `pattern`;
    /// otherwise the names are declared at the top of the scope.
    fn loop_declaration(&mut self, id: NodeId, pattern: NodeId) -> &'static str {
        let names = self.pattern_names(pattern);
        let local: Vec<bool> = names
            .iter()
            .map(|name| self.scopes.is_loop_local(id, name))
            .collect();
        if !names.is_empty() && local.iter().all(|&l| l) {
            return "let ";
        }
        let scope = self.scopes.scope_of(self.tree, id);
        for (name, local) in names.iter().zip(local) {
            if local {
                self.scopes.hoist(scope, name);
            }
        }
        ""
    }

    /// Names bound by an assignment pattern, in source order.
    fn pattern_names(&self, pattern: NodeId) -> Vec<String> {
        match self.kind(pattern) {
            NodeKind::Identifier { name } => vec![name.clone()],
            NodeKind::Array { members } | NodeKind::Object { members, .. } => members
                .iter()
                .flat_map(|&member| self.pattern_names(member))
                .collect(),
            NodeKind::ObjectMember {
                value: Some(value), ..
            } => self.pattern_names(*value),
            NodeKind::ObjectMember { key, value: None } => self.pattern_names(*key),
            NodeKind::Spread { expression } | NodeKind::Rest { expression } => {
                self.pattern_names(*expression)
            }
            NodeKind::DefaultParam { param, .. } => self.pattern_names(*param),
            NodeKind::AssignOp { assignee, .. } => self.pattern_names(*assignee),
            _ => Vec::new(),
        }
    }

    /// A temporary declared by the loop header when it has `let`, otherwise
    /// hoisted.
    fn claim_temp(&mut self, id: NodeId, declared: bool, name: &'static str) -> String {
        if declared {
            self.claim_local(id, &[name])
        } else {
            self.claim_ref(id, &[name])
        }
    }

    /// Text reading `node`'s value: the node itself when repeatable, else a
    /// temporary initialized in `init`.
    fn stored(
        &mut self,
        id: NodeId,
        declared: bool,
        name: &'static str,
        node: NodeId,
        text: String,
        init: &mut Vec<String>,
    ) -> String {
        if self.is_repeatable(node) {
            return text;
        }
        let temp = self.claim_temp(id, declared, name);
        init.push(format!("{} = {}", temp, text));
        temp
    }

    /// Value of an integer literal, negated or not.
    pub(crate) fn int_literal(&self, id: NodeId) -> Option<i64> {
        match self.kind(id) {
            NodeKind::Int { value } => Some(*value),
            NodeKind::UnaryOp {
                op: UnaryOperator::Neg,
                expression,
                ..
            } => match self.kind(*expression) {
                NodeKind::Int { value } => Some(-value),
                _ => None,
            },
            _ => None,
        }
    }
}

/// `i++`, `i--`, `i += n` or `i -= n`.
fn update(index: &str, step: i64) -> String {
    match step {
        1 => format!("{}++", index),
        -1 => format!("{}--", index),
        n if n < 0 => format!("{} -= {}", index, -n),
        n => format!("{} += {}", index, n),
    }
}

/// `let x = value;`, or a bare assignment when `x` is declared elsewhere.
fn binding_statement(declaration: &str, pattern: &str, value: &str, object_pattern: bool) -> String {
    if declaration.is_empty() && object_pattern {
        format!("({} = {});", pattern, value)
    } else {
        format!("{}{} = {};", declaration, pattern, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConvertOptions;

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

    #[test]
    fn update_expressions() {
        assert_eq!(update("i", 1), "i++");
        assert_eq!(update("i", -1), "i--");
        assert_eq!(update("i", 3), "i += 3");
        assert_eq!(update("i", -2), "i -= 2");
    }

    mod while_loops {
        use super::*;

        #[test]
        fn until_negates() {
            assert_eq!(main_stage("until a\n  f()\n"), "while (!a) {\n  f();\n}\n");
        }

        #[test]
        fn loop_runs_forever() {
            assert_eq!(main_stage("loop\n  f()\n"), "while (true) {\n  f();\n}\n");
        }

        #[test]
        fn guards_skip_iterations() {
            assert_eq!(
                main_stage("while a when b\n  f()\n"),
                "while (a) {\n  if (!b) { continue; }\n  f();\n}\n"
            );
        }
    }

    mod for_in {
        use super::*;

        #[test]
        fn values_iterate_through_array_from() {
            let (code, codes) = main_stage_with("for x in xs\n  f(x)\n", &ConvertOptions::default());
            assert_eq!(code, "for (let x of Array.from(xs)) {\n  f(x);\n}\n");
            assert_eq!(codes, vec!["DS101"]);
        }

        #[test]
        fn array_from_can_be_skipped() {
            let options = ConvertOptions {
                no_array_from: true,
                ..ConvertOptions::default()
            };
            let (code, codes) = main_stage_with("for x in xs then f(x)", &options);
            assert_eq!(code, "for (let x of xs) { f(x); }");
            assert!(codes.is_empty());
        }

        #[test]
        fn filters_skip_iterations() {
            assert_eq!(
                main_stage("for x in [1, 2] when x > 1\n  f(x)\n"),
                "for (let x of [1, 2]) {\n  if (!(x > 1)) { continue; }\n  f(x);\n}\n"
            );
        }

        #[test]
        fn index_loops_count() {
            assert_eq!(
                main_stage("for x, i in xs\n  f(x, i)\n"),
                "for (let i = 0; i < xs.length; i++) {\n  let x = xs[i];\n  f(x, i);\n}\n"
            );
        }

        #[test]
        fn negative_steps_count_down() {
            assert_eq!(
                main_stage("for x in xs by -1\n  f(x)\n"),
                "for (let i = xs.length - 1; i >= 0; i--) {\n  let x = xs[i];\n  f(x);\n}\n"
            );
        }

        #[test]
        fn literal_ranges_count_directly() {
            assert_eq!(
                main_stage("for i in [0...3]\n  f(i)\n"),
                "for (let i = 0; i < 3; i++) {\n  f(i);\n}\n"
            );
            assert_eq!(
                main_stage("for i in [3..1]\n  f(i)\n"),
                "for (let i = 3; i >= 1; i--) {\n  f(i);\n}\n"
            );
        }

        #[test]
        fn runtime_ranges_pick_a_direction() {
            assert_eq!(
                main_stage("for i in [a..b]\n  f(i)\n"),
                "for (let i = a, asc = i <= b; asc ? i <= b : i >= b; asc ? i++ : i--) {\n  f(i);\n}\n"
            );
        }

        #[test]
        fn variables_used_after_the_loop_are_hoisted() {
            assert_eq!(
                main_stage("for x in [1, 2] then f(x)\ng(x)\n"),
                "let x;\nfor (x of [1, 2]) { f(x); }\ng(x);\n"
            );
        }
    }

    mod for_of {
        use super::*;

        #[test]
        fn keys_and_values() {
            assert_eq!(
                main_stage("for k, v of o\n  f(k, v)\n"),
                "for (let k in o) {\n  let v = o[k];\n  f(k, v);\n}\n"
            );
        }

        #[test]
        fn own_keys() {
            assert_eq!(
                main_stage("for own k of o\n  f(k)\n"),
                "for (let k of Object.keys(o || {})) {\n  f(k);\n}\n"
            );
        }
    }

    mod comprehensions {
        use super::*;

        #[test]
        fn array_literals_map() {
            assert_eq!(
                main_stage("x = (for a in [1, 2] then a * 2)"),
                "let x = ([1, 2].map(a => a * 2));"
            );
        }

        #[test]
        fn filters_without_mapping() {
            assert_eq!(
                main_stage("x = (for a in [1, 2] when a > 1 then a)"),
                "let x = ([1, 2].filter(a => a > 1));"
            );
        }

        #[test]
        fn bare_element_over_a_literal_is_the_literal() {
            assert_eq!(
                main_stage("x = (a for a in [1, 2, 3])"),
                "let x = ([1, 2, 3]);"
            );
        }

        #[test]
        fn bare_element_over_a_loose_target_still_copies() {
            let options = ConvertOptions {
                loose_for_expressions: true,
                ..ConvertOptions::default()
            };
            let (code, _) = main_stage_with("x = (a for a in xs)", &options);
            assert_eq!(code, "let x = (xs.map(a => a));");
        }

        #[test]
        fn other_targets_collect_in_an_iife() {
            let (code, codes) = main_stage_with(
                "x = (for a in xs then f(a))",
                &ConvertOptions::default(),
            );
            assert_eq!(
                code,
                "let x = ((() => { const result = []; for (let a of Array.from(xs)) { result.push(f(a)); } return result; })());"
            );
            assert_eq!(codes, vec!["DS101", "DS205"]);
        }
    }
}
