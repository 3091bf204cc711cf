//! Member access, calls, `new`, slices and soak operators.
//!
//! A chain like `a?.b.c(d)` is a left-leaning spine of links, each holding
//! its base. Plain links render in place after their base. A soaked link
//! guards its *soak container*: the longest run of plain links above it,
//! stopping at parentheses and at the next soaked link, which guards the
//! container below it in turn.
//!
//! ```text
//! a?.b.c         a != null ? a.b.c : undefined
//! f()?.b         __guard__(f(), x => x.b)
//! a.b?()         __guardMethod__(a, 'b', o => o.b())
//! f?()           typeof f === 'function' ? f() : undefined
//! ```

use decaf_coffee::{NodeId, NodeKind, TokenKind};
use decaf_core::patch::Span;

use crate::error::{PatchError, PatchResult};
use crate::helpers::Helper;
use crate::patcher::Patcher;
use crate::suggestions::Suggestion;

/// How a soaked link guards its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SoakStyle {
    /// `base != null ? ... : undefined`, for repeatable bases.
    Ternary,
    /// `__guard__(base, x => x...)`.
    Guard,
    /// `__guardMethod__(object, 'name', o => o.name(...))`.
    GuardMethod,
    /// `__guardFunc__(f, f => f(...))`.
    GuardFunc,
}

impl Patcher<'_> {
    // ========================================================================
    // Chain structure
    // ========================================================================

    /// Base of a chain link.
    pub(crate) fn chain_base(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::MemberAccess { expression, .. }
            | NodeKind::SoakedMemberAccess { expression, .. }
            | NodeKind::ProtoMemberAccess { expression }
            | NodeKind::SoakedProtoMemberAccess { expression }
            | NodeKind::DynamicMemberAccess { expression, .. }
            | NodeKind::SoakedDynamicMemberAccess { expression, .. }
            | NodeKind::Slice { expression, .. } => Some(*expression),
            NodeKind::Call { function, .. } | NodeKind::SoakedCall { function, .. } => {
                Some(*function)
            }
            _ => None,
        }
    }

    /// Whether any link of the chain ending at `id` is soaked.
    pub(crate) fn chain_has_soak(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_soaked(node) {
                return true;
            }
            current = self.chain_base(node);
        }
        false
    }

    fn is_soaked(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            NodeKind::SoakedMemberAccess { .. }
                | NodeKind::SoakedProtoMemberAccess { .. }
                | NodeKind::SoakedDynamicMemberAccess { .. }
                | NodeKind::SoakedCall { .. }
        )
    }

    /// Whether `id` is the method a soaked call guards with
    /// `__guardMethod__`; it then renders inside the guard, not on its own.
    fn is_guarded_method(&self, id: NodeId) -> bool {
        if self.options.optional_chaining || self.is_parenthesized(id) {
            return false;
        }
        let is_access = matches!(
            self.kind(id),
            NodeKind::MemberAccess { .. }
                | NodeKind::SoakedMemberAccess { .. }
                | NodeKind::DynamicMemberAccess { .. }
                | NodeKind::SoakedDynamicMemberAccess { .. }
        );
        is_access
            && self.parent(id).is_some_and(|parent| {
                matches!(self.kind(parent), NodeKind::SoakedCall { function, .. } if *function == id)
            })
    }

    /// The part of the chain skipped when the soaked link at `id` finds
    /// nothing.
    pub(crate) fn soak_container(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if self.is_parenthesized(current)
                || self.is_soaked(parent)
                || self.chain_base(parent) != Some(current)
                || self.is_guarded_method(parent)
            {
                break;
            }
            current = parent;
        }
        current
    }

    fn soak_style(&self, id: NodeId) -> SoakStyle {
        match self.kind(id) {
            NodeKind::SoakedCall { function, .. } => {
                if self.is_guarded_method(*function) {
                    SoakStyle::GuardMethod
                } else if matches!(self.kind(*function), NodeKind::Identifier { .. }) {
                    SoakStyle::Ternary
                } else {
                    SoakStyle::GuardFunc
                }
            }
            _ => match self.chain_base(id) {
                Some(base) if self.is_repeatable(base) => SoakStyle::Ternary,
                _ => SoakStyle::Guard,
            },
        }
    }

    /// Whether `id` is a soak container rendered as a ternary, which binds
    /// looser than the operators around it.
    pub(crate) fn renders_as_ternary_soak(&self, id: NodeId) -> bool {
        if self.options.optional_chaining {
            return false;
        }
        let mut current = id;
        loop {
            if self.is_soaked(current) && !self.is_guarded_method(current) {
                return self.soak_container(current) == id
                    && self.soak_style(current) == SoakStyle::Ternary;
            }
            match self.chain_base(current) {
                Some(base) => current = base,
                None => return false,
            }
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub(crate) fn render_chain(&mut self, id: NodeId) -> PatchResult<()> {
        if self.is_soaked(id) && !self.options.optional_chaining {
            return match self.kind(id) {
                NodeKind::SoakedCall { .. } => self.patch_soaked_call(id),
                _ => self.patch_soaked_access(id),
            };
        }
        let base = self
            .chain_base(id)
            .ok_or_else(|| self.unexpected_kind(id, "an access chain"))?;
        self.patch_expression(base)?;
        self.render_link(id)
    }

    /// Render the part of a chain link after its already patched base.
    pub(crate) fn render_link(&mut self, id: NodeId) -> PatchResult<()> {
        let Some(base) = self.chain_base(id) else {
            return Err(self.unexpected_kind(id, "an access chain"));
        };
        let base_end = self.outer(base).end;
        let end = self.content(id).end;
        let optional = self.options.optional_chaining;
        match self.kind(id) {
            NodeKind::MemberAccess { member_span, .. } => {
                if base_end == member_span.start {
                    self.insert(id, member_span.start, ".")?;
                }
            }
            NodeKind::SoakedMemberAccess { .. } => {
                if !optional {
                    let token = self.token_in(base_end, end, TokenKind::SoakDot, "`?.`")?;
                    self.overwrite(id, token.start, token.end, ".")?;
                }
            }
            NodeKind::ProtoMemberAccess { .. } => {
                let token = self.token_in(base_end, end, TokenKind::Proto, "`::`")?;
                self.overwrite(id, token.start, token.end, ".prototype")?;
            }
            NodeKind::SoakedProtoMemberAccess { .. } => {
                let token = self.token_in(base_end, end, TokenKind::SoakProto, "`?::`")?;
                let text = if optional { "?.prototype" } else { ".prototype" };
                self.overwrite(id, token.start, token.end, text)?;
            }
            NodeKind::DynamicMemberAccess { index, .. } => self.patch_expression(*index)?,
            NodeKind::SoakedDynamicMemberAccess { index, .. } => {
                let token = self.token_in(base_end, end, TokenKind::SoakIndexStart, "`?[`")?;
                self.overwrite(id, token.start, token.end, if optional { "?.[" } else { "[" })?;
                self.patch_expression(*index)?;
            }
            NodeKind::Call {
                function,
                arguments,
                ..
            } => {
                if matches!(self.kind(*function), NodeKind::Super) {
                    if let Some(name) = self.super_method_name(id) {
                        self.insert(id, base_end, &format!(".{}", name))?;
                    }
                }
                self.patch_arguments(id, arguments)?;
            }
            NodeKind::SoakedCall { arguments, .. } => {
                let token = self.token_in(base_end, end, TokenKind::SoakCallStart, "`?(`")?;
                self.overwrite(id, token.start, token.end, if optional { "?.(" } else { "(" })?;
                self.patch_arguments(id, arguments)?;
            }
            NodeKind::Slice {
                left,
                right,
                inclusive,
                ..
            } => self.patch_slice(id, base_end, *left, *right, *inclusive)?,
            _ => return Err(self.unexpected_kind(id, "an access chain")),
        }
        Ok(())
    }

    fn token_in(&self, from: usize, to: usize, kind: TokenKind, what: &str) -> PatchResult<Span> {
        self.tokens
            .find_in(from, to, kind)
            .map(|index| self.tokens.span(index))
            .ok_or_else(|| PatchError::internal(format!("no {} between {} and {}", what, from, to)))
    }

    /// Patch call or array elements, adding the commas CoffeeScript lets
    /// newlines stand for.
    pub(crate) fn patch_arguments(&mut self, id: NodeId, arguments: &[NodeId]) -> PatchResult<()> {
        for &argument in arguments {
            self.patch_expression(argument)?;
        }
        self.insert_missing_commas(id, arguments)
    }

    pub(crate) fn insert_missing_commas(&mut self, id: NodeId, elements: &[NodeId]) -> PatchResult<()> {
        for pair in elements.windows(2) {
            let end = self.outer(pair[0]).end;
            let next = self.outer(pair[1]).start;
            if self.tokens.find_in(end, next, TokenKind::Comma).is_none() {
                self.insert(id, end, ",")?;
            }
        }
        Ok(())
    }

    /// `a[b..c]` becomes `a.slice(b, c + 1)`.
    fn patch_slice(
        &mut self,
        id: NodeId,
        base_end: usize,
        left: Option<NodeId>,
        right: Option<NodeId>,
        inclusive: bool,
    ) -> PatchResult<()> {
        let mark = self.mark();
        let start = match left {
            Some(left) => {
                self.patch_expression(left)?;
                self.capture(left, mark)?
            }
            None => "0".to_string(),
        };
        let end = match right {
            None => None,
            Some(right) => {
                self.patch_expression(right)?;
                let text = self.capture(right, mark)?;
                if !inclusive {
                    Some(text)
                } else {
                    match self.int_literal(right) {
                        Some(-1) => None,
                        Some(n) => Some((n + 1).to_string()),
                        None if self.is_atomic(right) => Some(format!("+{} + 1 || undefined", text)),
                        None => Some(format!("+({}) + 1 || undefined", text)),
                    }
                }
            }
        };
        let arguments = match (left, end) {
            (_, Some(end)) => format!("{}, {}", start, end),
            (Some(_), None) => start,
            (None, None) => String::new(),
        };
        let end = self.content(id).end;
        self.overwrite_since(id, base_end, end, &format!(".slice({})", arguments), mark)
    }

    pub(crate) fn patch_new(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::New {
            ctor,
            arguments,
            has_arguments,
            ..
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "`new`"));
        };
        self.patch_expression(*ctor)?;
        self.patch_arguments(id, arguments)?;
        if !has_arguments {
            let end = self.outer(*ctor).end;
            self.insert(id, end, "()")?;
        }
        Ok(())
    }

    // ========================================================================
    // Soaks
    // ========================================================================

    fn check_soak_target(&self, container: NodeId) -> PatchResult<()> {
        let assigned = self.parent(container).is_some_and(|parent| {
            matches!(
                self.kind(parent),
                NodeKind::AssignOp { assignee, .. }
                | NodeKind::CompoundAssignOp { assignee, .. }
                | NodeKind::ExistsAssignOp { assignee, .. } if *assignee == container
            )
        });
        if assigned {
            return Err(PatchError::unsupported(
                "cannot assign to a soaked access",
                self.content(container),
            ));
        }
        Ok(())
    }

    /// `check ? ` prefix and ` : undefined` suffix around `container`,
    /// parenthesized where a ternary would bind to its neighbours.
    fn ternary_parts(&self, container: NodeId) -> (&'static str, &'static str) {
        if self.in_operand_position(container) && !self.is_negated(container) {
            ("(", " : undefined)")
        } else {
            ("", " : undefined")
        }
    }

    /// `a != null`, or the `typeof` form for names that may be undeclared.
    fn null_check(&mut self, base: NodeId, text: &str) -> String {
        match self.kind(base) {
            NodeKind::Identifier { name } if !self.scopes.is_bound(self.tree, base, name) => {
                self.record(Suggestion::ShorterNullChecks);
                format!("typeof {0} !== 'undefined' && {0} !== null", text)
            }
            _ => format!("{} != null", text),
        }
    }

    fn patch_soaked_access(&mut self, id: NodeId) -> PatchResult<()> {
        let base = self
            .chain_base(id)
            .ok_or_else(|| self.unexpected_kind(id, "a soaked access"))?;
        let container = self.soak_container(id);
        self.check_soak_target(container)?;
        let mark = self.mark();
        self.patch_expression(base)?;
        let base_text = self.capture(base, mark)?;
        match self.soak_style(id) {
            SoakStyle::Ternary => {
                let (open, close) = self.ternary_parts(container);
                let check = self.null_check(base, &base_text);
                self.replace_since(base, &format!("{}{} ? {}", open, check, base_text), mark)?;
                self.defer_suffix(container, close);
            }
            _ => {
                let helper = self.register_helper(Helper::Guard);
                let param = self.claim_local(id, &["x"]);
                let text = format!("{}({}, {} => {}", helper, base_text, param, param);
                self.replace_since(base, &text, mark)?;
                self.defer_suffix(container, ")");
            }
        }
        tracing::trace!(node = id.0, container = container.0, "guarded soaked access");
        self.render_link(id)
    }

    fn patch_soaked_call(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::SoakedCall { function, .. } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "a soaked call"));
        };
        let function = *function;
        let container = self.soak_container(id);
        self.check_soak_target(container)?;
        match self.soak_style(id) {
            SoakStyle::GuardMethod => {
                self.patch_guarded_method(id, function)?;
                self.defer_suffix(container, ")");
            }
            SoakStyle::Ternary => {
                let mark = self.mark();
                self.patch_expression(function)?;
                let text = self.capture(function, mark)?;
                let (open, close) = self.ternary_parts(container);
                let guarded = format!("{}typeof {1} === 'function' ? {1}", open, text);
                self.replace_since(function, &guarded, mark)?;
                self.record(Suggestion::ShorterNullChecks);
                self.defer_suffix(container, close);
            }
            SoakStyle::Guard | SoakStyle::GuardFunc => {
                let mark = self.mark();
                self.patch_expression(function)?;
                let text = self.capture(function, mark)?;
                let helper = self.register_helper(Helper::GuardFunc);
                let param = self.claim_local(id, &["f"]);
                let guarded = format!("{}({}, {} => {}", helper, text, param, param);
                self.replace_since(function, &guarded, mark)?;
                self.defer_suffix(container, ")");
            }
        }
        self.render_link(id)
    }

    /// `a.b?(c)` becomes `__guardMethod__(a, 'b', o => o.b(c))`; `a?.b?()`
    /// shares the same guard.
    fn patch_guarded_method(&mut self, call: NodeId, function: NodeId) -> PatchResult<()> {
        let helper = self.register_helper(Helper::GuardMethod);
        let mark = self.mark();
        match self.kind(function) {
            NodeKind::MemberAccess {
                expression,
                member,
                member_span,
            }
            | NodeKind::SoakedMemberAccess {
                expression,
                member,
                member_span,
            } => {
                let object = *expression;
                self.patch_expression(object)?;
                let object_text = self.capture(object, mark)?;
                let param = self.claim_local(call, &["o"]);
                let text = format!("{}({}, '{}', {} => {}", helper, object_text, member, param, param);
                self.replace_since(object, &text, mark)?;
                let object_end = self.outer(object).end;
                if object_end == member_span.start {
                    self.insert(function, member_span.start, ".")?;
                } else {
                    self.overwrite(function, object_end, member_span.start, ".")?;
                }
            }
            NodeKind::DynamicMemberAccess { expression, index }
            | NodeKind::SoakedDynamicMemberAccess { expression, index } => {
                let (object, index) = (*expression, *index);
                self.patch_expression(object)?;
                let object_text = self.capture(object, mark)?;
                self.patch_expression(index)?;
                let index_text = self.capture(index, mark)?;
                let param = self.claim_local(call, &["o"]);
                let name = self.claim_local(call, &["m"]);
                let text = format!(
                    "{}({}, {}, ({}, {}) => {}[{}]",
                    helper, object_text, index_text, param, name, param, name
                );
                let outer = self.outer(function);
                self.overwrite_since(function, outer.start, outer.end, &text, mark)?;
            }
            _ => return Err(self.unexpected_kind(function, "a method access")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::options::ConvertOptions;
    use crate::patcher::Patcher;

    fn main_stage_with(source: &str, options: &ConvertOptions) -> String {
        let parsed = decaf_coffee::parse(source).unwrap();
        let mut p = Patcher::new(source, &parsed, options);
        p.patch_program().unwrap();
        let mut out = p.render();
        if !p.helpers.is_empty() {
            out.push('\n');
            out.push_str(&p.helpers.names().join(","));
        }
        out
    }

    fn main_stage(source: &str) -> String {
        main_stage_with(source, &ConvertOptions::default())
    }

    mod plain {
        use super::*;

        #[test]
        fn this_and_prototype_members() {
            assert_eq!(main_stage("@a.b"), "this.a.b;");
            assert_eq!(main_stage("A::b"), "A.prototype.b;");
            assert_eq!(main_stage("A::"), "A.prototype;");
        }

        #[test]
        fn multi_line_arguments_get_commas() {
            assert_eq!(main_stage("f(\n  a\n  b\n)"), "f(\n  a,\n  b\n);");
        }

        #[test]
        fn new_without_arguments_is_called() {
            assert_eq!(main_stage("x = new A"), "let x = new A();");
            assert_eq!(main_stage("x = new A(1)"), "let x = new A(1);");
        }

        #[test]
        fn slices() {
            assert_eq!(main_stage("a[1..2]"), "a.slice(1, 3);");
            assert_eq!(main_stage("a[1...2]"), "a.slice(1, 2);");
            assert_eq!(main_stage("a[..n]"), "a.slice(0, +n + 1 || undefined);");
            assert_eq!(main_stage("a[1..]"), "a.slice(1);");
            assert_eq!(main_stage("a[..]"), "a.slice();");
        }
    }

    mod soaks {
        use super::*;

        #[test]
        fn undeclared_names_use_typeof() {
            assert_eq!(
                main_stage("a?.b"),
                "typeof a !== 'undefined' && a !== null ? a.b : undefined;"
            );
        }

        #[test]
        fn declared_names_compare_with_null() {
            assert_eq!(
                main_stage("a = f()\na?.b.c"),
                "let a = f();\na != null ? a.b.c : undefined;"
            );
        }

        #[test]
        fn calls_are_guarded_by_a_helper() {
            assert_eq!(main_stage("f()?.b"), "__guard__(f(), x => x.b);\n__guard__");
        }

        #[test]
        fn ternaries_in_operands_are_parenthesized() {
            assert_eq!(
                main_stage("a = 1\nx = a?.b + 1"),
                "let a = 1;\nlet x = (a != null ? a.b : undefined) + 1;"
            );
        }

        #[test]
        fn soaked_method_calls_share_one_guard() {
            assert_eq!(
                main_stage("a?.b?()"),
                "__guardMethod__(a, 'b', o => o.b());\n__guardMethod__"
            );
            assert_eq!(
                main_stage("a.b?(1)"),
                "__guardMethod__(a, 'b', o => o.b(1));\n__guardMethod__"
            );
        }

        #[test]
        fn soaked_function_calls() {
            assert_eq!(main_stage("f?()"), "typeof f === 'function' ? f() : undefined;");
            assert_eq!(
                main_stage("f()?()"),
                "__guardFunc__(f(), f2 => f2());\n__guardFunc__"
            );
        }

        #[test]
        fn optional_chaining_keeps_the_operators() {
            let options = ConvertOptions {
                optional_chaining: true,
                ..ConvertOptions::default()
            };
            assert_eq!(main_stage_with("a?.b?[c]?(d)", &options), "a?.b?.[c]?.(d);");
        }
    }
}
