//! Normalize stage: CoffeeScript to CoffeeScript.
//!
//! Makes layout the main stage would otherwise have to infer explicit:
//! implicit call parentheses and object braces are written out, `loop`
//! becomes `while true`, postfix conditionals and loops are moved into
//! prefix form, `@param` parameters become plain parameters assigned at the
//! start of the body, and bare `super` forwards `arguments`. The output is
//! still CoffeeScript and is re-parsed before the main stage.

use decaf_coffee::{NodeId, NodeKind, ParsedSource};

use crate::error::{PatchError, PatchResult};
use crate::options::ConvertOptions;
use crate::patcher::Patcher;

/// Normalize `source`, whose parse is `parsed`.
pub fn run(source: &str, parsed: &ParsedSource, options: &ConvertOptions) -> PatchResult<String> {
    let mut patcher = Patcher::new(source, parsed, options);
    let root = patcher.tree.root();
    patcher.normalize(root)?;
    let code = patcher.render();
    tracing::debug!(bytes = code.len(), "normalize stage finished");
    Ok(code)
}

impl Patcher<'_> {
    fn normalize(&mut self, id: NodeId) -> PatchResult<()> {
        self.normalize_node(id)
            .map_err(|err| err.with_span_if_missing(self.content(id)))
    }

    fn normalize_children(&mut self, id: NodeId) -> PatchResult<()> {
        for child in self.kind(id).child_ids() {
            self.normalize(child)?;
        }
        Ok(())
    }

    fn normalize_node(&mut self, id: NodeId) -> PatchResult<()> {
        match self.kind(id) {
            NodeKind::Call {
                function,
                arguments,
                implicit: true,
            } => self.normalize_implicit_call(id, *function, arguments),
            NodeKind::New {
                ctor,
                arguments,
                implicit: true,
                ..
            } => self.normalize_implicit_call(id, *ctor, arguments),
            NodeKind::Object { implicit: true, .. } => {
                let content = self.content(id);
                self.insert(id, content.start, "{")?;
                self.normalize_children(id)?;
                self.insert(id, content.end, "}")
            }
            NodeKind::While {
                condition: None, ..
            } => {
                let start = self.content(id).start;
                self.overwrite(id, start, start + "loop".len(), "while true")?;
                self.normalize_children(id)
            }
            NodeKind::Conditional {
                condition,
                consequent: Some(body),
                postfix: true,
                ..
            } => self.normalize_postfix(id, *body, &[*condition]),
            NodeKind::While {
                condition: Some(condition),
                guard,
                body: Some(body),
                postfix: true,
                ..
            } => {
                let header: Vec<NodeId> = std::iter::once(*condition).chain(*guard).collect();
                self.normalize_postfix(id, *body, &header)
            }
            NodeKind::ForIn {
                key_assignee,
                value_assignee,
                target,
                step,
                filter,
                body: Some(body),
                postfix: true,
            } => {
                let header: Vec<NodeId> = value_assignee
                    .iter()
                    .chain(key_assignee)
                    .chain(std::iter::once(target))
                    .chain(step)
                    .chain(filter)
                    .copied()
                    .collect();
                self.normalize_postfix(id, *body, &header)
            }
            NodeKind::ForOf {
                key_assignee,
                value_assignee,
                target,
                filter,
                body: Some(body),
                postfix: true,
                ..
            } => {
                let header: Vec<NodeId> = std::iter::once(key_assignee)
                    .chain(value_assignee)
                    .chain(std::iter::once(target))
                    .chain(filter)
                    .copied()
                    .collect();
                self.normalize_postfix(id, *body, &header)
            }
            NodeKind::Function { params, body, .. } => self.normalize_function(id, params, *body),
            NodeKind::Super if self.is_bare_super(id) => {
                let end = self.content(id).end;
                self.insert(id, end, "(arguments...)")
            }
            _ => self.normalize_children(id),
        }
    }

    /// `f a, b` becomes `f(a, b)`.
    fn normalize_implicit_call(&mut self, id: NodeId, callee: NodeId, arguments: &[NodeId]) -> PatchResult<()> {
        let (Some(&first), Some(&last)) = (arguments.first(), arguments.last()) else {
            return Err(PatchError::internal("implicit call without arguments"));
        };
        self.normalize(callee)?;
        let callee_end = self.outer(callee).end;
        let first_start = self.outer(first).start;
        if self.source[callee_end..first_start].contains('\n') {
            self.insert(id, callee_end, "(")?;
        } else {
            self.overwrite(id, callee_end, first_start, "(")?;
        }
        for &argument in arguments {
            self.normalize(argument)?;
        }
        let end = self.outer(last).end;
        self.insert(id, end, ")")
    }

    /// `a if b` becomes `if b then a`; loops likewise. The statement is
    /// moved behind the header before anything inside it is edited, so its
    /// own edits travel with it.
    fn normalize_postfix(&mut self, id: NodeId, body: NodeId, header: &[NodeId]) -> PatchResult<()> {
        let Some(statement) = self.single_statement(body) else {
            return Err(PatchError::internal("postfix body is not a single statement"));
        };
        let header_end = header
            .iter()
            .map(|&node| self.outer(node).end)
            .max()
            .ok_or_else(|| PatchError::internal("postfix construct without a header"))?;
        let statement_span = self.outer(statement);
        let keyword = self
            .tokens
            .first_at_or_after(statement_span.end)
            .map(|index| self.tokens.span(index).start)
            .ok_or_else(|| PatchError::internal("postfix keyword not found"))?;
        self.move_range(id, statement_span.start, statement_span.end, header_end)?;
        if keyword > statement_span.end {
            self.remove(id, statement_span.end, keyword)?;
        }
        for &node in header {
            self.normalize(node)?;
        }
        self.insert(id, header_end, " then ")?;
        self.normalize(statement)
    }

    /// `(@a) -> b` becomes `(a) -> @a = a; b`.
    fn normalize_function(&mut self, id: NodeId, params: &[NodeId], body: Option<NodeId>) -> PatchResult<()> {
        let mut assignments = Vec::new();
        for &param in params {
            let (target, default) = match self.kind(param) {
                NodeKind::DefaultParam { param, default } => (*param, Some(*default)),
                NodeKind::Rest { expression } => (*expression, None),
                _ => (param, None),
            };
            match self.this_param_name(target) {
                Some(member) => {
                    let name = self.param_local_name(id, &member);
                    let span = self.content(target);
                    self.overwrite(id, span.start, span.end, &name)?;
                    assignments.push(format!("@{} = {}", member, name));
                    if let Some(default) = default {
                        self.normalize(default)?;
                    }
                }
                None => self.normalize(param)?,
            }
        }
        let Some(body) = body else {
            if assignments.is_empty() {
                return Ok(());
            }
            // `(@a) ->` only assigns.
            let end = self.content(id).end;
            return self.insert(id, end, &format!(" {}; return", assignments.join("; ")));
        };
        if assignments.is_empty() {
            return self.normalize(body);
        }
        tracing::trace!(function = id.0, count = assignments.len(), "expanding this-parameters");
        let NodeKind::Block { statements, inline } = self.kind(body) else {
            return Err(self.unexpected_kind(body, "a block"));
        };
        // In a derived constructor the assignments go after `super(...)`.
        let after_super = statements.iter().position(|&s| match self.kind(s) {
            NodeKind::Call { function, .. } => matches!(self.kind(*function), NodeKind::Super),
            _ => false,
        });
        let first = self.outer(statements[0]).start;
        let separator = if *inline {
            "; ".to_string()
        } else {
            format!("\n{}", self.effective_indent(first))
        };
        match after_super {
            // Inserted before the body is normalized, so a postfix first
            // statement moves away from them.
            None => {
                let text: String = assignments.iter().map(|a| format!("{}{}", a, separator)).collect();
                self.insert(id, first, &text)?;
                self.normalize(body)
            }
            // Inserted after, so they follow the closing paren of an
            // implicit `super` call.
            Some(index) => {
                self.normalize(body)?;
                let end = self.outer(statements[index]).end;
                let text: String = assignments.iter().map(|a| format!("{}{}", separator, a)).collect();
                self.insert(id, end, &text)
            }
        }
    }

    /// Member name of an `@a` parameter.
    fn this_param_name(&self, param: NodeId) -> Option<String> {
        match self.kind(param) {
            NodeKind::MemberAccess {
                expression, member, ..
            } if matches!(self.kind(*expression), NodeKind::This { .. }) => Some(member.clone()),
            _ => None,
        }
    }

    /// Local name for the `@a` parameter of `function`: `a`, unless that
    /// already names a variable visible in the function.
    fn param_local_name(&mut self, function: NodeId, member: &str) -> String {
        if !self.scopes.is_bound(self.tree, function, member) {
            return member.to_string();
        }
        let scope = self.scopes.scope_of(self.tree, function);
        self.scopes.claim(scope, &[member], false)
    }

    /// `super` used as a value rather than called or accessed.
    fn is_bare_super(&self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return true;
        };
        !matches!(
            self.kind(parent),
            NodeKind::Call { function, .. } | NodeKind::SoakedCall { function, .. } if *function == id
        ) && !matches!(
            self.kind(parent),
            NodeKind::MemberAccess { expression, .. }
                | NodeKind::DynamicMemberAccess { expression, .. } if *expression == id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(source: &str) -> String {
        let parsed = decaf_coffee::parse(source).unwrap();
        run(source, &parsed, &ConvertOptions::default()).unwrap()
    }

    mod calls {
        use super::*;

        #[test]
        fn implicit_calls_get_parens() {
            assert_eq!(normalize("f a, b"), "f(a, b)");
            assert_eq!(normalize("f g a"), "f(g(a))");
            assert_eq!(normalize("new A b"), "new A(b)");
        }

        #[test]
        fn implicit_objects_get_braces() {
            assert_eq!(normalize("f a: 1, b: 2"), "f({a: 1, b: 2})");
            assert_eq!(normalize("x =\n  a: 1\n  b: 2"), "x =\n  {a: 1\n  b: 2}");
        }

        #[test]
        fn explicit_forms_are_untouched() {
            let source = "f(a, {b: 1})\nnew A\n# f a";
            assert_eq!(normalize(source), source);
        }

        #[test]
        fn bare_super_forwards_arguments() {
            assert_eq!(
                normalize("class A extends B\n  m: -> super\n"),
                "class A extends B\n  m: -> super(arguments...)\n"
            );
        }
    }

    mod postfix {
        use super::*;

        #[test]
        fn conditionals_move_to_prefix() {
            assert_eq!(normalize("a if b"), "if b then a");
            assert_eq!(normalize("f x unless g y"), "unless g(y) then f(x)");
        }

        #[test]
        fn loops_move_to_prefix() {
            assert_eq!(normalize("f x for x in xs"), "for x in xs then f(x)");
            assert_eq!(normalize("a while b when c"), "while b when c then a");
            assert_eq!(normalize("f k for own k, v of o"), "for own k, v of o then f(k)");
        }

        #[test]
        fn nested_postfix_forms() {
            assert_eq!(normalize("f x for x in xs if c"), "if c then for x in xs then f(x)");
        }

        #[test]
        fn loop_becomes_while_true() {
            assert_eq!(normalize("loop\n  f()"), "while true\n  f()");
        }
    }

    mod params {
        use super::*;

        #[test]
        fn this_params_assign_in_the_body() {
            assert_eq!(normalize("f = (@a, b) ->\n  g()"), "f = (a, b) ->\n  @a = a\n  g()");
            assert_eq!(normalize("f = (@a) -> g()"), "f = (a) -> @a = a; g()");
            assert_eq!(normalize("f = (@a = 1) ->"), "f = (a = 1) -> @a = a; return");
        }

        #[test]
        fn this_params_follow_super() {
            assert_eq!(
                normalize("class A extends B\n  constructor: (@a) ->\n    super()\n    f()\n"),
                "class A extends B\n  constructor: (a) ->\n    super()\n    @a = a\n    f()\n"
            );
        }

        #[test]
        fn this_params_avoid_visible_names() {
            assert_eq!(normalize("a = 1\nf = (@a) -> a"), "a = 1\nf = (a2) -> @a = a2; a");
        }
    }
}
