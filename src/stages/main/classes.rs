//! Classes.
//!
//! Methods keep their place in the body. Everything else a CoffeeScript
//! class body may hold (prototype properties, static assignments, plain
//! statements) runs once at definition time, so it moves into a `static`
//! block. Bound methods are bound in the constructor, which is synthesized
//! when the class has none.

use decaf_coffee::{NodeId, NodeKind};

use crate::error::{PatchError, PatchResult};
use crate::patcher::{Patcher, Role};

impl Patcher<'_> {
    pub(crate) fn patch_class(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Class { name, parent, body } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "a class"));
        };
        let (name, parent, body) = (*name, *parent, *body);
        let start = self.content(id).start;
        let mut header_end = start + "class".len();

        if let Some(name) = name {
            // `class @A` and `class a.A` define `A` and store it.
            if let NodeKind::MemberAccess {
                expression, member, ..
            } = self.kind(name)
            {
                let target = match self.kind(*expression) {
                    NodeKind::This { .. } => format!("this.{}", member),
                    _ => self.node_text(name).to_string(),
                };
                self.insert(id, start, &format!("{} = ", target))?;
                let span = self.content(name);
                self.overwrite(id, span.start, span.end, member)?;
            }
            header_end = self.outer(name).end;
        }
        if let Some(parent) = parent {
            self.patch_expression(parent)?;
            header_end = self.outer(parent).end;
        }

        let Some(body) = body else {
            return self.insert(id, header_end, " {}");
        };
        self.open_block(id, header_end, Some(body))?;
        self.synthesize_constructor(id, body, parent.is_some())?;
        let NodeKind::Block { statements, .. } = self.kind(body) else {
            return Err(self.unexpected_kind(body, "a block"));
        };
        for &statement in statements {
            self.patch_class_statement(statement)?;
        }
        self.close_block(id, Some(body), None)
    }

    fn patch_class_statement(&mut self, statement: NodeId) -> PatchResult<()> {
        match self.kind(statement) {
            NodeKind::ClassMember { value, .. } | NodeKind::Constructor { value, .. }
                if matches!(self.kind(*value), NodeKind::Function { .. }) =>
            {
                self.patch_expression(*value)
            }
            NodeKind::Constructor { .. } => Err(PatchError::unsupported(
                "class constructor must be a function",
                self.content(statement),
            )),
            NodeKind::ClassMember {
                key,
                value,
                is_static,
            } => self.patch_class_property(statement, *key, *value, *is_static),
            NodeKind::AssignOp { expression, .. } if self.role(statement) == &Role::StaticAssign => {
                self.patch_expression(*expression)
            }
            _ => {
                let start = self.outer(statement).start;
                self.insert(statement, start, "static { ")?;
                self.patch_statement(statement)?;
                self.terminate_statement(statement)?;
                let end = self.code_end(self.outer(statement).end);
                self.insert(statement, end, " }")
            }
        }
    }

    /// `x: 1` becomes `static { this.prototype.x = 1; }`; `@x: 1` becomes
    /// `static { this.x = 1; }`.
    fn patch_class_property(
        &mut self,
        member: NodeId,
        key: NodeId,
        value: NodeId,
        is_static: bool,
    ) -> PatchResult<()> {
        let owner = if is_static { "this" } else { "this.prototype" };
        let key_span = self.content(key);
        match self.kind(key) {
            NodeKind::MemberAccess { member_span, .. } => {
                self.overwrite(member, key_span.start, member_span.start, &format!("static {{ {}.", owner))?;
            }
            NodeKind::Identifier { .. } => {
                self.insert(member, key_span.start, &format!("static {{ {}.", owner))?;
            }
            _ => {
                self.insert(member, key_span.start, &format!("static {{ {}[", owner))?;
                self.insert(member, key_span.end, "]")?;
            }
        }
        self.overwrite(member, self.outer(key).end, self.outer(value).start, " = ")?;
        self.patch_expression(value)?;
        let end = self.code_end(self.outer(value).end);
        self.insert(member, end, "; }")
    }

    /// Names of the non-static `=>` methods of `class`.
    pub(crate) fn bound_method_names(&self, class: NodeId) -> Vec<String> {
        let NodeKind::Class { body: Some(body), .. } = self.kind(class) else {
            return Vec::new();
        };
        let NodeKind::Block { statements, .. } = self.kind(*body) else {
            return Vec::new();
        };
        statements
            .iter()
            .filter_map(|&statement| match self.kind(statement) {
                NodeKind::ClassMember {
                    key,
                    value,
                    is_static: false,
                } if matches!(self.kind(*value), NodeKind::Function { flavor, .. } if flavor.bound) => {
                    self.key_name(*key)
                }
                _ => None,
            })
            .collect()
    }

    /// A class with bound methods and no constructor gets one that binds
    /// them.
    fn synthesize_constructor(&mut self, class: NodeId, body: NodeId, derived: bool) -> PatchResult<()> {
        let names = self.bound_method_names(class);
        if names.is_empty() {
            return Ok(());
        }
        let NodeKind::Block { statements, inline } = self.kind(body) else {
            return Ok(());
        };
        if statements
            .iter()
            .any(|&s| matches!(self.kind(s), NodeKind::Constructor { .. }))
        {
            return Ok(());
        }
        let mut lines = Vec::new();
        if derived {
            lines.push("super(...args);".to_string());
        }
        lines.extend(names.iter().map(|name| format!("this.{0} = this.{0}.bind(this);", name)));
        let params = if derived { "...args" } else { "" };
        let text = if *inline {
            format!("constructor({}) {{ {} }} ", params, lines.join(" "))
        } else {
            let indent = self.body_indent(body);
            let inner = format!("\n{}{}", indent, self.indent_unit());
            let body_text: String = lines.iter().map(|line| format!("{}{}", inner, line)).collect();
            format!("constructor({}) {{{}\n{}}}\n{}", params, body_text, indent, indent)
        };
        tracing::debug!(class = class.0, methods = names.len(), "synthesizing constructor");
        let start = self.content(body).start;
        self.insert(class, start, &text)
    }

    /// Name of the method whose `super(...)` call is at `id`, or `None`
    /// inside a constructor.
    pub(crate) fn super_method_name(&self, id: NodeId) -> Option<String> {
        self.tree.ancestors(id).find_map(|a| match self.kind(a) {
            NodeKind::Function { flavor, .. } if !flavor.bound => match self.role(a) {
                Role::Method { name, .. } => Some(Some(name.clone())),
                _ => Some(None),
            },
            _ => None,
        })?
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PatchErrorKind;
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

    mod members {
        use super::*;

        #[test]
        fn methods_and_static_members() {
            assert_eq!(
                main_stage("class A\n  @make: -> new A\n  x: 1\n  m: (a) -> a\n"),
                "class A {\n  static make() { return new A(); }\n  static { this.prototype.x = 1; }\n  m(a) { return a; }\n}\n"
            );
        }

        #[test]
        fn static_assignments_become_static_methods() {
            assert_eq!(
                main_stage("class A\n  @b = -> 1\n  A.c = -> 2\n"),
                "class A {\n  static b() { return 1; }\n  static c() { return 2; }\n}\n"
            );
        }

        #[test]
        fn multi_line_last_method_closes_without_a_blank_line() {
            assert_eq!(
                main_stage("class A\n  m: ->\n    b\n"),
                "class A {\n  m() {\n    return b;\n  }\n}\n"
            );
        }

        #[test]
        fn empty_and_stored_classes() {
            assert_eq!(main_stage("class A"), "class A {}");
            assert_eq!(main_stage("class @A"), "this.A = class A {};");
        }
    }

    mod constructors {
        use super::*;

        #[test]
        fn bound_methods_are_bound_after_super() {
            assert_eq!(
                main_stage("class A extends B\n  constructor: (a) ->\n    super(a)\n  m: => 1\n"),
                "class A extends B {\n  constructor(a) {\n    super(a);\n    this.m = this.m.bind(this);\n  }\n  m() { return 1; }\n}\n"
            );
        }

        #[test]
        fn missing_constructor_is_synthesized() {
            assert_eq!(
                main_stage("class A extends B\n  m: => 1\n"),
                "class A extends B {\n  constructor(...args) {\n    super(...args);\n    this.m = this.m.bind(this);\n  }\n  m() { return 1; }\n}\n"
            );
        }

        #[test]
        fn super_calls_in_methods_name_the_method() {
            assert_eq!(
                main_stage("class A extends B\n  m: (a) -> super(a)\n"),
                "class A extends B {\n  m(a) { return super.m(a); }\n}\n"
            );
        }

        #[test]
        fn this_before_super_fails_when_disallowed() {
            let source = "class A extends B\n  constructor: ->\n    @a = 1\n    super()\n";
            let options = ConvertOptions {
                disallow_invalid_constructors: true,
                ..ConvertOptions::default()
            };
            let err = main_stage_with(source, &options).unwrap_err();
            assert_eq!(err.kind, PatchErrorKind::Unsupported);
            assert!(main_stage_with(source, &ConvertOptions::default()).is_ok());
        }
    }
}
