//! Lexical scopes, variable declarations and fresh names.
//!
//! CoffeeScript has no declarations: the first assignment to a name in a
//! function (or the program) creates a function-wide variable, unless an
//! enclosing scope already has one. JavaScript needs explicit `let`s, so the
//! tracker records every binding and decides where its declaration goes:
//!
//! - [`Declaration::Inline`]: `let a = ...` at the assignment statement that
//!   first writes the name, when nothing refers to it earlier.
//! - [`Declaration::LoopLocal`]: `let` in the header of the only loop that
//!   binds it, when the name is not used outside that loop.
//! - [`Declaration::Hoisted`]: `let a, b;` at the top of the scope body.
//!
//! Class bodies are scopes for lookup only: names assigned in them belong to
//! the nearest enclosing function or program.
//!
//! Writes are resolved in source order, reads after all writes are known,
//! matching how CoffeeScript decides which function owns a variable.

use std::collections::{HashMap, HashSet};

use decaf_coffee::{NodeId, NodeKind, SyntaxTree};

/// Index of a scope in its [`ScopeTracker`].
pub type ScopeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Function,
    Class,
}

/// Where a variable's `let` goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    Inline,
    LoopLocal,
    Hoisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    Param,
    Variable,
    /// Assigned by the header of this loop.
    Loop(NodeId),
    Catch,
    ClassName,
}

#[derive(Debug, Clone)]
struct Binding {
    name: String,
    kind: BindingKind,
    first_write: NodeId,
    /// A loop binding also written somewhere other than its loop header.
    written_elsewhere: bool,
}

#[derive(Debug, Clone)]
struct Scope {
    node: NodeId,
    kind: ScopeKind,
    parent: Option<ScopeId>,
    bindings: Vec<Binding>,
    by_name: HashMap<String, usize>,
    /// Names declared at the top of the body, in first-write order.
    hoisted: Vec<String>,
    /// Temporaries claimed while patching, in claim order.
    temps: Vec<String>,
}

#[derive(Debug, Clone)]
struct Occurrence {
    ident: NodeId,
    scope: ScopeId,
    name: String,
}

/// Scope chain and declaration decisions for one syntax tree.
#[derive(Debug, Clone, Default)]
pub struct ScopeTracker {
    scopes: Vec<Scope>,
    by_node: HashMap<NodeId, ScopeId>,
    /// Scope owning the variable each identifier occurrence refers to.
    resolved: HashMap<NodeId, ScopeId>,
    inline: HashSet<NodeId>,
    loop_locals: HashSet<(NodeId, String)>,
    names_in_source: HashSet<String>,
    claimed: HashSet<String>,
}

impl ScopeTracker {
    pub fn build(tree: &SyntaxTree) -> Self {
        let mut builder = Builder {
            tree,
            tracker: ScopeTracker::default(),
            reads: Vec::new(),
        };
        let root = tree.root();
        let program = builder.new_scope(root, ScopeKind::Program, None);
        builder.visit(root, program);
        let mut tracker = builder.finish();
        tracker.names_in_source = tree
            .iter()
            .filter_map(|id| match tree.kind(id) {
                NodeKind::Identifier { name } => Some(name.clone()),
                _ => None,
            })
            .collect();
        tracing::trace!(scopes = tracker.scopes.len(), "built scopes");
        tracker
    }

    /// Innermost scope containing `node` (a scope node is its own scope).
    pub fn scope_of(&self, tree: &SyntaxTree, node: NodeId) -> ScopeId {
        std::iter::once(node)
            .chain(tree.ancestors(node))
            .find_map(|id| self.by_node.get(&id).copied())
            .unwrap_or(0)
    }

    /// The scope owned by a program, function or class node.
    pub fn scope_for_node(&self, node: NodeId) -> Option<ScopeId> {
        self.by_node.get(&node).copied()
    }

    pub fn kind(&self, scope: ScopeId) -> ScopeKind {
        self.scopes[scope].kind
    }

    pub fn node(&self, scope: ScopeId) -> NodeId {
        self.scopes[scope].node
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope].parent
    }

    /// Nearest scope that can hold variables: `scope` itself unless it is a
    /// class body.
    pub fn binding_scope(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        while self.scopes[current].kind == ScopeKind::Class {
            match self.scopes[current].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Whether `name` refers to a variable visible from `node`.
    pub fn is_bound(&self, tree: &SyntaxTree, node: NodeId, name: &str) -> bool {
        let mut scope = Some(self.scope_of(tree, node));
        while let Some(s) = scope {
            if self.scopes[s].by_name.contains_key(name) {
                return true;
            }
            scope = self.scopes[s].parent;
        }
        false
    }

    /// Whether the identifier occurrence refers to a declared variable.
    pub fn is_resolved(&self, ident: NodeId) -> bool {
        self.resolved.contains_key(&ident)
    }

    /// Declaration placed at the assignment writing `ident`, if any.
    pub fn declaration(&self, ident: NodeId) -> Option<Declaration> {
        self.inline
            .contains(&ident)
            .then_some(Declaration::Inline)
    }

    /// Whether `loop_node`'s header should declare `name` with `let`.
    pub fn is_loop_local(&self, loop_node: NodeId, name: &str) -> bool {
        self.loop_locals.contains(&(loop_node, name.to_string()))
    }

    /// Whether the scope declares any variable of its own (temporaries
    /// excluded).
    pub fn declares_variables(&self, scope: ScopeId) -> bool {
        self.scopes[scope]
            .bindings
            .iter()
            .any(|b| matches!(b.kind, BindingKind::Variable | BindingKind::Loop(_)))
    }

    /// Names for the `let` list at the top of the scope body.
    pub fn hoisted(&self, scope: ScopeId) -> Vec<String> {
        let scope = &self.scopes[scope];
        scope
            .hoisted
            .iter()
            .chain(scope.temps.iter())
            .cloned()
            .collect()
    }

    /// Add `name` to the `let` list of the binding scope around `scope`.
    pub fn hoist(&mut self, scope: ScopeId, name: &str) {
        let owner = self.binding_scope(scope);
        let hoisted = &mut self.scopes[owner].hoisted;
        if !hoisted.iter().any(|n| n == name) {
            hoisted.push(name.to_string());
        }
    }

    /// Claim a name not used anywhere in the source and not claimed before.
    ///
    /// Tries `candidates` in order, then the first candidate with a numeric
    /// suffix (`ref2`, `ref3`, ...). With `hoist`, the name is added to the
    /// binding scope's `let` list.
    pub fn claim(&mut self, scope: ScopeId, candidates: &[&str], hoist: bool) -> String {
        let base = candidates.first().copied().unwrap_or("ref");
        let name = candidates
            .iter()
            .map(|c| c.to_string())
            .chain((2..).map(|n| format!("{}{}", base, n)))
            .find(|name| !self.names_in_source.contains(name) && !self.claimed.contains(name))
            .unwrap_or_else(|| base.to_string());
        self.claimed.insert(name.clone());
        if hoist {
            let owner = self.binding_scope(scope);
            self.scopes[owner].temps.push(name.clone());
        }
        tracing::trace!(%name, scope, hoist, "claimed name");
        name
    }
}

// ============================================================================
// Builder
// ============================================================================

struct Builder<'t> {
    tree: &'t SyntaxTree,
    tracker: ScopeTracker,
    reads: Vec<Occurrence>,
}

impl Builder<'_> {
    fn new_scope(&mut self, node: NodeId, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = self.tracker.scopes.len();
        self.tracker.scopes.push(Scope {
            node,
            kind,
            parent,
            bindings: Vec::new(),
            by_name: HashMap::new(),
            hoisted: Vec::new(),
            temps: Vec::new(),
        });
        self.tracker.by_node.insert(node, id);
        id
    }

    fn lookup(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, usize)> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if let Some(&index) = self.tracker.scopes[s].by_name.get(name) {
                return Some((s, index));
            }
            current = self.tracker.scopes[s].parent;
        }
        None
    }

    fn add_binding(&mut self, scope: ScopeId, name: &str, kind: BindingKind, ident: NodeId) {
        let s = &mut self.tracker.scopes[scope];
        if s.by_name.contains_key(name) {
            return;
        }
        s.by_name.insert(name.to_string(), s.bindings.len());
        s.bindings.push(Binding {
            name: name.to_string(),
            kind,
            first_write: ident,
            written_elsewhere: false,
        });
    }

    fn visit(&mut self, id: NodeId, scope: ScopeId) {
        match self.tree.kind(id).clone() {
            NodeKind::Function { params, body, .. } => {
                let inner = self.new_scope(id, ScopeKind::Function, Some(scope));
                for param in params {
                    self.write_pattern(param, inner, BindingKind::Param);
                }
                if let Some(body) = body {
                    self.visit(body, inner);
                }
            }
            NodeKind::Class { name, parent, body } => {
                if let Some(name) = name {
                    self.write_pattern(name, scope, BindingKind::ClassName);
                }
                if let Some(parent) = parent {
                    self.visit(parent, scope);
                }
                let inner = self.new_scope(id, ScopeKind::Class, Some(scope));
                if let Some(body) = body {
                    self.visit(body, inner);
                }
            }
            NodeKind::AssignOp {
                assignee,
                expression,
            } => {
                self.write_pattern(assignee, scope, BindingKind::Variable);
                self.visit(expression, scope);
            }
            NodeKind::CompoundAssignOp {
                assignee,
                expression,
                ..
            }
            | NodeKind::ExistsAssignOp {
                assignee,
                expression,
                ..
            } => {
                if let NodeKind::Identifier { name } = self.tree.kind(assignee) {
                    let name = name.clone();
                    self.write(assignee, &name, scope, BindingKind::Variable);
                } else {
                    self.visit(assignee, scope);
                }
                self.visit(expression, scope);
            }
            NodeKind::ForIn {
                key_assignee,
                value_assignee,
                target,
                step,
                filter,
                body,
                ..
            } => {
                self.visit(target, scope);
                for assignee in value_assignee.into_iter().chain(key_assignee) {
                    self.write_pattern(assignee, scope, BindingKind::Loop(id));
                }
                for child in step.into_iter().chain(filter).chain(body) {
                    self.visit(child, scope);
                }
            }
            NodeKind::ForOf {
                key_assignee,
                value_assignee,
                target,
                filter,
                body,
                ..
            } => {
                self.visit(target, scope);
                for assignee in std::iter::once(key_assignee).chain(value_assignee) {
                    self.write_pattern(assignee, scope, BindingKind::Loop(id));
                }
                for child in filter.into_iter().chain(body) {
                    self.visit(child, scope);
                }
            }
            NodeKind::Try {
                body,
                catch_assignee,
                catch_body,
                finally_body,
                ..
            } => {
                if let Some(body) = body {
                    self.visit(body, scope);
                }
                if let Some(assignee) = catch_assignee {
                    self.write_pattern(assignee, scope, BindingKind::Catch);
                }
                for child in catch_body.into_iter().chain(finally_body) {
                    self.visit(child, scope);
                }
            }
            NodeKind::Identifier { name } => self.reads.push(Occurrence {
                ident: id,
                scope,
                name,
            }),
            NodeKind::ObjectMember { key, value } => match value {
                Some(value) => self.visit(value, scope),
                None => self.visit(key, scope),
            },
            NodeKind::ClassMember { value, .. } | NodeKind::Constructor { value, .. } => {
                self.visit(value, scope)
            }
            kind => {
                for child in kind.child_ids() {
                    self.visit(child, scope);
                }
            }
        }
    }

    /// Bind every name in an assignment target.
    fn write_pattern(&mut self, id: NodeId, scope: ScopeId, kind: BindingKind) {
        match self.tree.kind(id).clone() {
            NodeKind::Identifier { name } => self.write(id, &name, scope, kind),
            NodeKind::Array { members } => {
                for member in members {
                    self.write_pattern(member, scope, kind);
                }
            }
            NodeKind::Object { members, .. } => {
                for member in members {
                    match self.tree.kind(member).clone() {
                        NodeKind::ObjectMember {
                            value: Some(value), ..
                        } => self.write_pattern(value, scope, kind),
                        NodeKind::ObjectMember { key, value: None } => {
                            self.write_pattern(key, scope, kind)
                        }
                        _ => self.visit(member, scope),
                    }
                }
            }
            NodeKind::Spread { expression } | NodeKind::Rest { expression } => {
                self.write_pattern(expression, scope, kind)
            }
            NodeKind::DefaultParam { param, default } => {
                self.write_pattern(param, scope, kind);
                self.visit(default, scope);
            }
            NodeKind::AssignOp {
                assignee,
                expression,
            } => {
                self.write_pattern(assignee, scope, kind);
                self.visit(expression, scope);
            }
            _ => self.visit(id, scope),
        }
    }

    fn write(&mut self, ident: NodeId, name: &str, scope: ScopeId, kind: BindingKind) {
        if kind == BindingKind::Param {
            self.add_binding(scope, name, kind, ident);
            self.tracker.resolved.insert(ident, scope);
            return;
        }
        match self.lookup(scope, name) {
            Some((owner, index)) => {
                self.tracker.resolved.insert(ident, owner);
                let binding = &mut self.tracker.scopes[owner].bindings[index];
                if matches!(binding.kind, BindingKind::Loop(_)) && binding.kind != kind {
                    binding.written_elsewhere = true;
                }
            }
            None => {
                let owner = self.tracker.binding_scope(scope);
                self.add_binding(owner, name, kind, ident);
                self.tracker.resolved.insert(ident, owner);
            }
        }
    }

    fn finish(mut self) -> ScopeTracker {
        for read in std::mem::take(&mut self.reads) {
            if let Some((owner, _)) = self.lookup(read.scope, &read.name) {
                self.tracker.resolved.insert(read.ident, owner);
            }
        }

        // Occurrences of each binding, by owning scope and name.
        let mut uses: HashMap<(ScopeId, String), Vec<NodeId>> = HashMap::new();
        for (&ident, &owner) in &self.tracker.resolved {
            if let NodeKind::Identifier { name } = self.tree.kind(ident) {
                uses.entry((owner, name.clone())).or_default().push(ident);
            }
        }

        for scope in 0..self.tracker.scopes.len() {
            let bindings = self.tracker.scopes[scope].bindings.clone();
            for binding in bindings {
                let occurrences = uses
                    .get(&(scope, binding.name.clone()))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                match binding.kind {
                    BindingKind::Param | BindingKind::Catch | BindingKind::ClassName => {}
                    BindingKind::Loop(loop_node)
                        if !binding.written_elsewhere
                            && self.confined_to_loop(loop_node, occurrences) =>
                    {
                        self.tracker.loop_locals.insert((loop_node, binding.name.clone()));
                    }
                    BindingKind::Variable if self.can_declare_inline(scope, &binding, occurrences) => {
                        self.tracker.inline.insert(binding.first_write);
                    }
                    _ => self.tracker.scopes[scope].hoisted.push(binding.name.clone()),
                }
            }
        }
        self.tracker
    }

    /// All occurrences sit inside the loop and outside nested functions.
    fn confined_to_loop(&self, loop_node: NodeId, occurrences: &[NodeId]) -> bool {
        let span = self.tree.span(loop_node);
        occurrences.iter().all(|&ident| {
            span.contains(&self.tree.span(ident))
                && !self
                    .tree
                    .ancestors(ident)
                    .take_while(|&a| a != loop_node)
                    .any(|a| matches!(self.tree.kind(a), NodeKind::Function { .. }))
        })
    }

    /// The first write is `name = ...` as a statement of the scope body, not
    /// its implicitly returned tail, and no other occurrence precedes the end
    /// of that statement.
    fn can_declare_inline(&self, scope: ScopeId, binding: &Binding, occurrences: &[NodeId]) -> bool {
        let tree = self.tree;
        let ident = binding.first_write;
        let Some(assign) = tree.parent(ident) else {
            return false;
        };
        if !matches!(tree.kind(assign), NodeKind::AssignOp { assignee, .. } if *assignee == ident) {
            return false;
        }
        let Some(block) = tree.parent(assign) else {
            return false;
        };
        let NodeKind::Block { statements, .. } = tree.kind(block) else {
            return false;
        };
        let scope_node = self.tracker.scopes[scope].node;
        if tree.parent(block) != Some(scope_node) {
            return false;
        }
        if self.tracker.scopes[scope].kind == ScopeKind::Function
            && statements.last() == Some(&assign)
        {
            return false;
        }
        let end = tree.span(assign).end;
        occurrences
            .iter()
            .all(|&other| other == ident || tree.span(other).start >= end)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn build(source: &str) -> (SyntaxTree, ScopeTracker) {
        let parsed = decaf_coffee::parse(source).unwrap();
        let tracker = ScopeTracker::build(&parsed.tree);
        (parsed.tree, tracker)
    }

    /// Identifier nodes named `name`, in source order.
    fn idents(tree: &SyntaxTree, name: &str) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = tree
            .iter()
            .filter(|&id| matches!(tree.kind(id), NodeKind::Identifier { name: n } if n == name))
            .collect();
        found.sort_by_key(|&id| tree.span(id).start);
        found
    }

    fn loop_node(tree: &SyntaxTree) -> NodeId {
        tree.iter()
            .find(|&id| matches!(tree.kind(id), NodeKind::ForIn { .. }))
            .unwrap()
    }

    mod declarations {
        use super::*;

        #[test]
        fn first_assignment_statements_declare_inline() {
            let (tree, scopes) = build("a = 1\nb = a\n");
            let a = idents(&tree, "a")[0];
            let b = idents(&tree, "b")[0];
            assert_eq!(scopes.declaration(a), Some(Declaration::Inline));
            assert_eq!(scopes.declaration(b), Some(Declaration::Inline));
            assert!(scopes.hoisted(0).is_empty());
        }

        #[test]
        fn earlier_reads_force_hoisting() {
            let (tree, scopes) = build("f = -> a\na = 1\n");
            let a_write = idents(&tree, "a")[1];
            assert_eq!(scopes.declaration(a_write), None);
            assert_eq!(scopes.hoisted(0), vec!["a".to_string()]);
        }

        #[test]
        fn nested_first_writes_are_hoisted() {
            let (_, scopes) = build("if x\n  a = 1\nb = a\n");
            assert_eq!(scopes.hoisted(0), vec!["a".to_string()]);
        }

        #[test]
        fn self_reference_in_the_value_forces_hoisting() {
            let (_, scopes) = build("a = a + 1\n");
            assert_eq!(scopes.hoisted(0), vec!["a".to_string()]);
        }

        #[test]
        fn function_tail_assignments_are_hoisted() {
            let (tree, scopes) = build("f = ->\n  a = 1\n  b = 2\n");
            let function = tree
                .iter()
                .find(|&id| matches!(tree.kind(id), NodeKind::Function { .. }))
                .unwrap();
            let scope = scopes.scope_for_node(function).unwrap();
            assert_eq!(scopes.declaration(idents(&tree, "a")[0]), Some(Declaration::Inline));
            assert_eq!(scopes.hoisted(scope), vec!["b".to_string()]);
        }

        #[test]
        fn params_need_no_declaration() {
            let (tree, scopes) = build("f = (a) ->\n  a = 2\n  a\n");
            let function = tree
                .iter()
                .find(|&id| matches!(tree.kind(id), NodeKind::Function { .. }))
                .unwrap();
            let scope = scopes.scope_for_node(function).unwrap();
            assert!(scopes.hoisted(scope).is_empty());
            assert!(!scopes.declares_variables(scope));
        }

        #[test]
        fn class_body_assignments_belong_to_the_enclosing_scope() {
            let (_, scopes) = build("class A\n  x = 1\n");
            assert_eq!(scopes.hoisted(0), vec!["x".to_string()]);
        }
    }

    mod loops {
        use super::*;

        #[test]
        fn loop_variables_used_only_inside_are_loop_local() {
            let (tree, scopes) = build("for x in xs\n  f(x)\n");
            assert!(scopes.is_loop_local(loop_node(&tree), "x"));
            assert!(scopes.hoisted(0).is_empty());
        }

        #[test]
        fn loop_variables_used_after_the_loop_are_hoisted() {
            let (tree, scopes) = build("for x in xs then f(x)\ng(x)\n");
            assert!(!scopes.is_loop_local(loop_node(&tree), "x"));
            assert_eq!(scopes.hoisted(0), vec!["x".to_string()]);
        }

        #[test]
        fn loop_variables_captured_by_closures_are_hoisted() {
            let (tree, scopes) = build("for x in xs\n  fs.push(-> x)\n");
            assert!(!scopes.is_loop_local(loop_node(&tree), "x"));
        }
    }

    mod lookup {
        use super::*;

        #[test]
        fn reads_resolve_through_enclosing_functions() {
            let (tree, scopes) = build("a = 1\nf = -> a\n");
            let read = idents(&tree, "a")[1];
            assert!(scopes.is_resolved(read));
            assert!(scopes.is_bound(&tree, read, "a"));
            assert!(!scopes.is_bound(&tree, read, "window"));
        }

        #[test]
        fn claimed_names_avoid_source_names_and_each_other() {
            let (_, mut scopes) = build("ref = 1\n");
            assert_eq!(scopes.claim(0, &["ref"], true), "ref2");
            assert_eq!(scopes.claim(0, &["ref"], true), "ref3");
            assert_eq!(scopes.claim(0, &["i", "j"], false), "i");
            assert_eq!(scopes.claim(0, &["i", "j"], false), "j");
            assert_eq!(
                scopes.hoisted(0),
                vec!["ref2".to_string(), "ref3".to_string()]
            );
        }
    }
}
