//! Functions, methods, constructors and `do`.

use decaf_coffee::{FunctionFlavor, NodeId, NodeKind, TokenKind};

use crate::error::{PatchError, PatchResult};
use crate::patcher::{Patcher, Role, Tail};

/// Shape a function literal renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionForm {
    /// `function(a) {...}`
    Plain,
    /// `(a) => ...`
    Arrow,
    /// `(function*(a) {...}).bind(this)`
    BoundGenerator,
    /// `name(a) {...}` in an object or class body.
    Method,
    Constructor,
}

/// Parameter list and arrow of a function literal.
#[derive(Debug, Clone, Copy)]
struct FunctionTokens {
    /// `)` closing the parameter list, if written.
    close: Option<usize>,
    arrow: usize,
}

impl Patcher<'_> {
    pub(crate) fn patch_function(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Function {
            params,
            body,
            flavor,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a function"));
        };
        let (body, flavor) = (*body, *flavor);
        let tokens = self.function_tokens(id)?;
        let form = match self.role(id) {
            Role::Method { .. } => FunctionForm::Method,
            Role::Constructor => FunctionForm::Constructor,
            _ if flavor.bound && flavor.generator => FunctionForm::BoundGenerator,
            _ if flavor.bound => FunctionForm::Arrow,
            _ => FunctionForm::Plain,
        };
        let empty = body.is_none();
        match form {
            FunctionForm::Plain => self.patch_function_header(id, tokens, flavor, empty)?,
            FunctionForm::BoundGenerator => {
                let start = self.content(id).start;
                self.insert(id, start, "(")?;
                self.patch_function_header(id, tokens, flavor, empty)?;
            }
            FunctionForm::Method | FunctionForm::Constructor => {
                self.patch_method_header(id, tokens, flavor, empty)?
            }
            FunctionForm::Arrow => self.patch_arrow_header(id, tokens, flavor)?,
        }

        let do_function = self.role(id) == &Role::DoFunction;
        for &param in params {
            match self.kind(param) {
                NodeKind::DefaultParam { param, .. } if do_function => self.patch_expression(*param)?,
                _ => self.patch_expression(param)?,
            }
        }

        match form {
            FunctionForm::Arrow => self.patch_arrow_body(id, tokens, body),
            FunctionForm::Constructor => self.patch_function_body(id, body, None),
            FunctionForm::BoundGenerator => {
                self.patch_function_body(id, body, Some(Tail::Return))?;
                let end = self.code_end(self.content(id).end);
                self.insert(id, end, ").bind(this)")
            }
            FunctionForm::Plain | FunctionForm::Method => {
                self.patch_function_body(id, body, Some(Tail::Return))
            }
        }
    }

    fn function_tokens(&self, id: NodeId) -> PatchResult<FunctionTokens> {
        let start = self.content(id).start;
        let first = self
            .tokens
            .starting_at(start)
            .ok_or_else(|| PatchError::internal("function without a first token"))?;
        match self.tokens.kind(first) {
            Some(TokenKind::LParen) => {
                let close = self
                    .tokens
                    .matching(first)
                    .ok_or_else(|| PatchError::internal("unbalanced parameter list"))?;
                let arrow = self
                    .tokens
                    .semantic_after(self.tokens.span(close).end)
                    .ok_or_else(|| PatchError::internal("parameter list without an arrow"))?;
                Ok(FunctionTokens {
                    close: Some(close),
                    arrow,
                })
            }
            _ => Ok(FunctionTokens {
                close: None,
                arrow: first,
            }),
        }
    }

    /// `(a) ->` becomes `function(a) {`.
    fn patch_function_header(
        &mut self,
        id: NodeId,
        tokens: FunctionTokens,
        flavor: FunctionFlavor,
        empty: bool,
    ) -> PatchResult<()> {
        let keyword = match (flavor.asynchronous, flavor.generator) {
            (true, true) => "async function*",
            (true, false) => "async function",
            (false, true) => "function*",
            (false, false) => "function",
        };
        let brace = if empty { " {}" } else { " {" };
        let arrow = self.tokens.span(tokens.arrow);
        match tokens.close {
            Some(close) => {
                let start = self.content(id).start;
                self.insert(id, start, keyword)?;
                self.overwrite(id, self.tokens.span(close).end, arrow.end, brace)
            }
            None => self.overwrite(id, arrow.start, arrow.end, &format!("{}(){}", keyword, brace)),
        }
    }

    /// `m: (a) ->` becomes `m(a) {`, `@m: ->` becomes `static m() {`.
    fn patch_method_header(
        &mut self,
        id: NodeId,
        tokens: FunctionTokens,
        flavor: FunctionFlavor,
        empty: bool,
    ) -> PatchResult<()> {
        let key = self.method_key(id)?;
        let is_static = matches!(self.role(id), Role::Method { is_static: true, .. });
        self.remove(id, self.outer(key).end, self.outer(id).start)?;
        let name_start = match self.kind(key) {
            NodeKind::MemberAccess { member_span, .. } if is_static => {
                self.overwrite(id, self.content(key).start, member_span.start, "static ")?;
                member_span.start
            }
            _ => self.content(key).start,
        };
        let modifiers = match (flavor.asynchronous, flavor.generator) {
            (true, true) => "async *",
            (true, false) => "async ",
            (false, true) => "*",
            (false, false) => "",
        };
        if !modifiers.is_empty() {
            self.insert(id, name_start, modifiers)?;
        }
        let brace = if empty { " {}" } else { " {" };
        let arrow = self.tokens.span(tokens.arrow);
        match tokens.close {
            Some(close) => self.overwrite(id, self.tokens.span(close).end, arrow.end, brace),
            None => self.overwrite(id, arrow.start, arrow.end, &format!("(){}", brace)),
        }
    }

    /// Node naming a method: the member key, or the assignee of a static
    /// `@m = ->`.
    fn method_key(&self, id: NodeId) -> PatchResult<NodeId> {
        let parent = self
            .parent(id)
            .ok_or_else(|| PatchError::internal("method without a definition"))?;
        match self.kind(parent) {
            NodeKind::ObjectMember { key, .. }
            | NodeKind::ClassMember { key, .. }
            | NodeKind::Constructor { key, .. } => Ok(*key),
            NodeKind::AssignOp { assignee, .. } => Ok(*assignee),
            _ => Err(self.unexpected_kind(parent, "a method definition")),
        }
    }

    fn patch_arrow_header(
        &mut self,
        id: NodeId,
        tokens: FunctionTokens,
        flavor: FunctionFlavor,
    ) -> PatchResult<()> {
        let start = self.content(id).start;
        if flavor.asynchronous {
            self.insert(id, start, "async ")?;
        }
        if tokens.close.is_none() {
            self.insert(id, start, "() ")?;
        }
        Ok(())
    }

    /// A body that is one expression and declares nothing stays concise.
    fn patch_arrow_body(
        &mut self,
        id: NodeId,
        tokens: FunctionTokens,
        body: Option<NodeId>,
    ) -> PatchResult<()> {
        let arrow_end = self.tokens.span(tokens.arrow).end;
        let Some(body) = body else {
            return self.insert(id, arrow_end, " {}");
        };
        let Some(expression) = self.concise_body(id, body) else {
            self.insert(id, arrow_end, " {")?;
            return self.patch_function_body(id, Some(body), Some(Tail::Return));
        };

        let object = matches!(self.kind(expression), NodeKind::Object { .. })
            && !self.is_parenthesized(expression);
        if object {
            let start = self.outer(expression).start;
            self.insert(id, start, "(")?;
        }
        self.patch_expression(expression)?;
        let end = self.code_end(self.outer(expression).end);
        if object {
            self.insert(id, end, ")")?;
        }

        // Temporaries claimed by the body need a statement to be declared in.
        let temps = self
            .scopes
            .scope_for_node(id)
            .map(|scope| self.scopes.hoisted(scope))
            .unwrap_or_default();
        if !temps.is_empty() {
            let start = self.outer(expression).start;
            self.prepend(id, start, &format!("{{ let {}; return ", temps.join(", ")))?;
            self.insert(id, end, "; }")?;
        }
        Ok(())
    }

    fn concise_body(&self, id: NodeId, body: NodeId) -> Option<NodeId> {
        let statement = self.single_statement(body)?;
        let scope = self.scopes.scope_for_node(id)?;
        let expression = !matches!(
            self.kind(statement),
            NodeKind::Return { .. } | NodeKind::Throw { .. } | NodeKind::Break | NodeKind::Continue
        ) && self.can_be_expression(statement)
            && self.prefers_expression(statement);
        (expression && !self.scopes.declares_variables(scope) && !self.contains_comment(body))
            .then_some(statement)
    }

    /// Patch a braced body opened by the header, declare its variables and
    /// close it.
    fn patch_function_body(&mut self, id: NodeId, body: Option<NodeId>, tail: Option<Tail>) -> PatchResult<()> {
        let Some(body) = body else {
            return Ok(());
        };
        self.patch_block(body, tail)?;
        if self.role(id) == &Role::Constructor {
            self.check_constructor(id, body)?;
            self.bind_methods_in_constructor(id, body)?;
        }
        self.insert_declarations(id, body)?;
        self.close_block(id, Some(body), None)
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// First statement of `body` calling `super(...)`.
    pub(crate) fn super_call_statement(&self, body: NodeId) -> Option<NodeId> {
        let NodeKind::Block { statements, .. } = self.kind(body) else {
            return None;
        };
        statements.iter().copied().find(|&statement| {
            matches!(self.kind(statement), NodeKind::Call { function, .. }
                if matches!(self.kind(*function), NodeKind::Super))
        })
    }

    /// Statements up to and including the `super(...)` call, or all of them.
    fn statements_before_super(&self, body: NodeId) -> Vec<NodeId> {
        let NodeKind::Block { statements, .. } = self.kind(body) else {
            return Vec::new();
        };
        let super_call = self.super_call_statement(body);
        let mut before = Vec::new();
        for &statement in statements {
            before.push(statement);
            if Some(statement) == super_call {
                break;
            }
        }
        before
    }

    /// A derived constructor may not touch `this` before `super(...)`.
    fn check_constructor(&mut self, id: NodeId, body: NodeId) -> PatchResult<()> {
        let Some(class) = self.enclosing_class(id) else {
            return Ok(());
        };
        if !matches!(self.kind(class), NodeKind::Class { parent: Some(_), .. }) {
            return Ok(());
        }
        let uses_this = self
            .statements_before_super(body)
            .into_iter()
            .any(|statement| self.uses_this_before_super(statement));
        let unbound = self.super_call_statement(body).is_none() && !self.bound_method_names(class).is_empty();
        if !uses_this && !unbound {
            return Ok(());
        }
        if self.options.disallow_invalid_constructors {
            return Err(PatchError::unsupported(
                "derived class constructor uses `this` before calling `super`",
                self.content(id),
            ));
        }
        tracing::warn!(
            offset = self.content(id).start,
            "derived class constructor uses `this` before calling `super`"
        );
        Ok(())
    }

    /// `this` in `statement`, outside nested non-arrow functions, evaluated
    /// before any `super(...)` call in it returns.
    fn uses_this_before_super(&self, statement: NodeId) -> bool {
        let mut stack = vec![statement];
        while let Some(node) = stack.pop() {
            match self.kind(node) {
                NodeKind::This { .. } => return true,
                NodeKind::Function { flavor, .. } if !flavor.bound => continue,
                NodeKind::Call { function, arguments, .. }
                    if matches!(self.kind(*function), NodeKind::Super) =>
                {
                    stack.extend(arguments.iter().copied());
                }
                kind => stack.extend(kind.child_ids()),
            }
        }
        false
    }

    /// `this.m = this.m.bind(this);` for each bound method, after the
    /// `super(...)` call when there is one.
    fn bind_methods_in_constructor(&mut self, id: NodeId, body: NodeId) -> PatchResult<()> {
        let Some(class) = self.enclosing_class(id) else {
            return Ok(());
        };
        let lines: Vec<String> = self
            .bound_method_names(class)
            .iter()
            .map(|name| bind_statement(name))
            .collect();
        if lines.is_empty() {
            return Ok(());
        }
        match self.super_call_statement(body) {
            Some(super_call) => {
                let separator = if self.is_inline_block(body) {
                    " ".to_string()
                } else {
                    format!("\n{}", self.body_indent(body))
                };
                let end = self.code_end(self.outer(super_call).end);
                let text: String = lines.iter().map(|line| format!("{}{}", separator, line)).collect();
                self.insert(id, end, &text)
            }
            None => self.prepend_statements(id, body, &lines),
        }
    }

    pub(crate) fn enclosing_class(&self, id: NodeId) -> Option<NodeId> {
        self.tree
            .ancestors(id)
            .find(|&a| matches!(self.kind(a), NodeKind::Class { .. }))
    }

    // ========================================================================
    // Do
    // ========================================================================

    /// `do (a = 1) -> a` becomes `(function(a) { return a; })(1)`; `do f`
    /// becomes `f()`.
    pub(crate) fn patch_do(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Do { expression } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "a do"));
        };
        let expression = *expression;
        let start = self.content(id).start;
        self.remove(id, start, self.outer(expression).start)?;
        let NodeKind::Function { params, .. } = self.kind(expression) else {
            self.patch_expression(expression)?;
            let end = self.code_end(self.outer(expression).end);
            return self.insert(id, end, "()");
        };

        let mut arguments = Vec::with_capacity(params.len());
        for &param in params {
            match self.kind(param) {
                NodeKind::Identifier { name } => arguments.push(name.clone()),
                NodeKind::DefaultParam { param, default } => {
                    let mark = self.mark();
                    self.patch_expression(*default)?;
                    arguments.push(self.capture(*default, mark)?);
                    self.remove(id, self.outer(*param).end, self.outer(*default).end)?;
                }
                NodeKind::Rest { .. } => {}
                _ => arguments.push("undefined".to_string()),
            }
        }
        let function_start = self.outer(expression).start;
        self.insert(id, function_start, "(")?;
        self.patch_expression(expression)?;
        let end = self.code_end(self.outer(expression).end);
        self.insert(id, end, &format!(")({})", arguments.join(", ")))
    }
}

fn bind_statement(name: &str) -> String {
    format!("this.{0} = this.{0}.bind(this);", name)
}

#[cfg(test)]
mod tests {
    use crate::options::ConvertOptions;
    use crate::patcher::Patcher;

    fn main_stage_with(source: &str, options: &ConvertOptions) -> Result<String, crate::error::PatchError> {
        let parsed = decaf_coffee::parse(source).unwrap();
        let mut p = Patcher::new(source, &parsed, options);
        p.patch_program()?;
        Ok(p.render())
    }

    fn main_stage(source: &str) -> String {
        main_stage_with(source, &ConvertOptions::default()).unwrap()
    }

    mod plain_functions {
        use super::*;

        #[test]
        fn thin_arrows_become_function_expressions() {
            assert_eq!(main_stage("f = (a, b) -> a"), "let f = function(a, b) { return a; };");
            assert_eq!(main_stage("f = ->"), "let f = function() {};");
        }

        #[test]
        fn multi_line_bodies_close_at_the_header_indent() {
            assert_eq!(
                main_stage("f = (a) ->\n  g(a)\n  a\n"),
                "let f = function(a) {\n  g(a);\n  return a;\n};\n"
            );
        }

        #[test]
        fn rest_params_lead_with_dots() {
            assert_eq!(
                main_stage("f = (a, b...) -> b"),
                "let f = function(a, ...b) { return b; };"
            );
        }

        #[test]
        fn flavors_follow_the_body() {
            assert_eq!(main_stage("f = -> await g()"), "let f = async function() { return await g(); };");
        }
    }

    mod arrows {
        use super::*;

        #[test]
        fn single_expressions_stay_concise() {
            assert_eq!(main_stage("f = (a) => a + 1"), "let f = (a) => a + 1;");
            assert_eq!(main_stage("f = => @a"), "let f = () => this.a;");
        }

        #[test]
        fn object_bodies_get_parens() {
            assert_eq!(main_stage("f = => {a: 1}"), "let f = () => ({a: 1});");
        }

        #[test]
        fn statements_need_a_block() {
            assert_eq!(
                main_stage("f = =>\n  g()\n  h()\n"),
                "let f = () => {\n  g();\n  return h();\n};\n"
            );
        }

        #[test]
        fn bound_generators_bind_a_function() {
            assert_eq!(
                main_stage("f = => yield 1"),
                "let f = (function*() { return yield 1; }).bind(this);"
            );
        }
    }

    mod methods {
        use super::*;

        #[test]
        fn object_members_become_methods() {
            assert_eq!(
                main_stage("o = {a: (x) -> x, b: 2}"),
                "let o = {a(x) { return x; }, b: 2};"
            );
        }

        #[test]
        fn bound_object_members_stay_arrows() {
            assert_eq!(main_stage("o = {a: => 1}"), "let o = {a: () => 1};");
        }
    }

    mod do_expressions {
        use super::*;

        #[test]
        fn defaults_become_arguments() {
            assert_eq!(
                main_stage("x = do (a = 1, b) -> a + b"),
                "let x = (function(a, b) { return a + b; })(1, b);"
            );
        }

        #[test]
        fn non_functions_are_called() {
            assert_eq!(main_stage("do f"), "f();");
        }
    }
}
