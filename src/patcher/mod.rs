//! The patch tree.
//!
//! A [`Patcher`] pairs an immutable syntax tree with one [`PatchNode`] per
//! syntax node and an overlay [`SourceEditor`] over the original text. Node
//! rules never rebuild text from the tree; they splice the source through
//! the editor, so everything they do not touch (comments, spacing, line
//! breaks) comes out as written.
//!
//! Patching is top-down. Before patching a child, a parent decides how the
//! child must render:
//!
//! - as a statement or as an expression ([`Patcher::patch_statement`],
//!   [`Patcher::patch_expression`])
//! - as a repeatable value, so the parent can mention it twice
//!   ([`Patcher::patch_repeatable`])
//! - negated ([`Patcher::negate`])
//! - with an implicit return obligation ([`Tail`])
//!
//! Statement-only constructs patched as expressions are wrapped in an
//! immediately invoked function (see `iife`).

mod bounds;
mod edit;
mod iife;
mod repeatable;
mod tail;

use std::collections::HashMap;

use decaf_coffee::{NodeId, NodeKind, ParsedSource, SyntaxTree};
use decaf_core::editor::SourceEditor;
use decaf_core::patch::Span;
use decaf_core::text;

use crate::error::{PatchError, PatchResult};
use crate::helpers::{Helper, HelperRegistry};
use crate::options::ConvertOptions;
use crate::scope::ScopeTracker;
use crate::suggestions::{Suggestion, SuggestionLog};
use crate::tokens::TokenIndex;

pub use bounds::Bounds;
pub use repeatable::RepeatOptions;
pub use tail::Tail;

/// How a node renders, as decided by its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Plain,
    /// Function value of an object or class member: `name(...) {...}`.
    Method { name: String, is_static: bool },
    /// Function value of a class `constructor:` member.
    Constructor,
    /// Function literal invoked by `do`.
    DoFunction,
    /// `@m = ->` or `ClassName.m = ->` in a class body: a static method.
    StaticAssign,
}

/// Per-node patch state.
#[derive(Debug, Clone)]
pub struct PatchNode {
    pub bounds: Bounds,
    pub role: Role,
    /// Must render as an expression.
    pub expression: bool,
    /// Requested repeatable rendering, pending until patched.
    pub repeat: Option<RepeatOptions>,
    /// Text naming the value once patched as repeatable.
    pub repeat_ref: Option<String>,
    pub negated: bool,
    pub tail: Option<Tail>,
    /// Closers queued by descendants, flushed at the inner end.
    pub deferred_suffix: String,
}

/// Patch tree plus editor for one pass over one source text.
pub struct Patcher<'a> {
    pub(crate) source: &'a str,
    pub(crate) tree: &'a SyntaxTree,
    pub(crate) tokens: TokenIndex<'a>,
    pub(crate) editor: SourceEditor<'a>,
    pub(crate) options: &'a ConvertOptions,
    pub(crate) scopes: ScopeTracker,
    pub(crate) helpers: HelperRegistry,
    pub(crate) suggestions: SuggestionLog,
    nodes: Vec<PatchNode>,
    indent_unit: String,
    /// Content ranges re-indented one level by a multi-line IIFE.
    iife_ranges: Vec<Span>,
    /// Node ends whose closing text went after a trailing line comment,
    /// mapped to the comment end.
    closed_after_comment: HashMap<usize, usize>,
}

impl<'a> Patcher<'a> {
    pub fn new(source: &'a str, parsed: &'a ParsedSource, options: &'a ConvertOptions) -> Self {
        let tree = &parsed.tree;
        let tokens = TokenIndex::new(source, &parsed.tokens);
        let nodes = (0..tree.len())
            .map(|index| {
                let id = NodeId(index as u32);
                PatchNode {
                    bounds: Bounds::compute(&tokens, tree.span(id)),
                    role: Role::Plain,
                    expression: false,
                    repeat: None,
                    repeat_ref: None,
                    negated: false,
                    tail: None,
                    deferred_suffix: String::new(),
                }
            })
            .collect();
        let mut patcher = Patcher {
            source,
            tree,
            tokens,
            editor: SourceEditor::new(source),
            options,
            scopes: ScopeTracker::build(tree),
            helpers: HelperRegistry::default(),
            suggestions: SuggestionLog::default(),
            nodes,
            indent_unit: text::detect_indent_unit(source),
            iife_ranges: Vec::new(),
            closed_after_comment: HashMap::new(),
        };
        patcher.assign_roles();
        tracing::debug!(nodes = tree.len(), "built patch tree");
        patcher
    }

    /// Record parent-declared renderings.
    fn assign_roles(&mut self) {
        let tree = self.tree;
        for id in tree.iter() {
            match tree.kind(id) {
                NodeKind::ObjectMember {
                    key,
                    value: Some(value),
                } => {
                    if let (Some(name), NodeKind::Function { flavor, .. }) =
                        (self.key_name(*key), tree.kind(*value))
                    {
                        if !flavor.bound {
                            self.node_mut(*value).role = Role::Method {
                                name,
                                is_static: false,
                            };
                        }
                    }
                }
                NodeKind::ClassMember {
                    key,
                    value,
                    is_static,
                } => {
                    if let (Some(name), NodeKind::Function { .. }) =
                        (self.key_name(*key), tree.kind(*value))
                    {
                        self.node_mut(*value).role = Role::Method {
                            name,
                            is_static: *is_static,
                        };
                    }
                }
                NodeKind::Constructor { value, .. } => {
                    if matches!(tree.kind(*value), NodeKind::Function { .. }) {
                        self.node_mut(*value).role = Role::Constructor;
                    }
                }
                NodeKind::Do { expression } => {
                    if matches!(tree.kind(*expression), NodeKind::Function { .. }) {
                        self.node_mut(*expression).role = Role::DoFunction;
                    }
                }
                NodeKind::Class {
                    name,
                    body: Some(body),
                    ..
                } => {
                    let class_name = name.and_then(|n| self.key_name(n));
                    let NodeKind::Block { statements, .. } = tree.kind(*body) else {
                        continue;
                    };
                    for &statement in statements {
                        if let Some(method) = self.static_assign_name(statement, class_name.as_deref()) {
                            if let NodeKind::AssignOp { expression, .. } = tree.kind(statement) {
                                self.node_mut(statement).role = Role::StaticAssign;
                                self.node_mut(*expression).role = Role::Method {
                                    name: method,
                                    is_static: true,
                                };
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Method name defined by a class-body `@m = ->` or `Name.m = ->`, where
    /// `Name` is the enclosing class's own name.
    fn static_assign_name(&self, statement: NodeId, class_name: Option<&str>) -> Option<String> {
        let tree = self.tree;
        let NodeKind::AssignOp {
            assignee,
            expression,
        } = tree.kind(statement)
        else {
            return None;
        };
        if !matches!(tree.kind(*expression), NodeKind::Function { .. }) {
            return None;
        }
        let NodeKind::MemberAccess {
            expression: base,
            member,
            ..
        } = tree.kind(*assignee)
        else {
            return None;
        };
        let on_class = match tree.kind(*base) {
            NodeKind::This { .. } => true,
            NodeKind::Identifier { name } => class_name == Some(name.as_str()),
            _ => false,
        };
        on_class.then(|| member.clone())
    }

    /// Static name of an object or class key: `a`, `'a'`, `1`, `@a`.
    pub(crate) fn key_name(&self, key: NodeId) -> Option<String> {
        match self.tree.kind(key) {
            NodeKind::Identifier { name } => Some(name.clone()),
            NodeKind::MemberAccess { member, .. } => Some(member.clone()),
            NodeKind::String | NodeKind::Int { .. } => {
                Some(self.node_text(key).to_string())
            }
            _ => None,
        }
    }

    // ========================================================================
    // Node state
    // ========================================================================

    pub fn node(&self, id: NodeId) -> &PatchNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut PatchNode {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &'a NodeKind {
        self.tree.kind(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.parent(id)
    }

    pub fn content(&self, id: NodeId) -> Span {
        self.nodes[id.index()].bounds.content
    }

    pub fn inner(&self, id: NodeId) -> Span {
        self.nodes[id.index()].bounds.inner
    }

    pub fn outer(&self, id: NodeId) -> Span {
        self.nodes[id.index()].bounds.outer
    }

    pub fn is_parenthesized(&self, id: NodeId) -> bool {
        self.nodes[id.index()].bounds.is_parenthesized()
    }

    pub fn role(&self, id: NodeId) -> &Role {
        &self.nodes[id.index()].role
    }

    /// Original text of the node's content.
    pub fn node_text(&self, id: NodeId) -> &'a str {
        let span = self.tree.span(id);
        &self.source[span.start..span.end]
    }

    /// Request that `id` render negated.
    pub fn negate(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.negated = !node.negated;
    }

    pub fn is_negated(&self, id: NodeId) -> bool {
        self.nodes[id.index()].negated
    }

    pub fn set_tail(&mut self, id: NodeId, tail: Option<Tail>) {
        self.node_mut(id).tail = tail;
    }

    pub fn tail(&self, id: NodeId) -> Option<Tail> {
        self.nodes[id.index()].tail.clone()
    }

    /// Queue `text` to be inserted at the inner end of `id` once patched.
    pub fn defer_suffix(&mut self, id: NodeId, text: &str) {
        self.node_mut(id).deferred_suffix.push_str(text);
    }

    // ========================================================================
    // Layout
    // ========================================================================

    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }

    /// Indentation that code at `offset` ends up with, including levels
    /// added by enclosing multi-line IIFEs.
    pub fn effective_indent(&self, offset: usize) -> String {
        let mut indent = text::indentation_at(self.source, offset).to_string();
        for range in &self.iife_ranges {
            if range.start <= offset && offset <= range.end {
                indent.push_str(&self.indent_unit);
            }
        }
        indent
    }

    /// Where text closing a construct ending at `end` goes: after a trailing
    /// line comment, so the comment stays with the code before it.
    pub fn closing_offset(&mut self, end: usize) -> usize {
        if let Some(&after) = self.closed_after_comment.get(&end) {
            return after;
        }
        match self.tokens.trailing_comment(end) {
            Some(comment) => {
                let after = self.tokens.span(comment).end;
                self.closed_after_comment.insert(end, after);
                after
            }
            None => end,
        }
    }

    /// End of the code of a construct ending at `end`: past a trailing
    /// comment only when a closer was already placed after it.
    pub fn code_end(&self, end: usize) -> usize {
        self.closed_after_comment.get(&end).copied().unwrap_or(end)
    }

    // ========================================================================
    // Names, helpers, suggestions
    // ========================================================================

    /// Claim a temporary declared with `let` in the scope around `id`.
    pub fn claim_ref(&mut self, id: NodeId, candidates: &[&str]) -> String {
        let scope = self.scopes.scope_of(self.tree, id);
        self.scopes.claim(scope, candidates, true)
    }

    /// Claim a name bound by generated code itself (a parameter or a loop
    /// header), so it needs no declaration.
    pub fn claim_local(&mut self, id: NodeId, candidates: &[&str]) -> String {
        let scope = self.scopes.scope_of(self.tree, id);
        self.scopes.claim(scope, candidates, false)
    }

    pub fn register_helper(&mut self, helper: Helper) -> &'static str {
        self.helpers.register(helper)
    }

    pub fn record(&mut self, suggestion: Suggestion) {
        self.suggestions.record(suggestion);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Patch `id` as decided by its state, annotating errors with its range.
    pub fn patch(&mut self, id: NodeId) -> PatchResult<()> {
        self.patch_node(id)
            .map_err(|err| err.with_span_if_missing(self.content(id)))
    }

    pub fn patch_expression(&mut self, id: NodeId) -> PatchResult<()> {
        self.node_mut(id).expression = true;
        self.patch(id)
    }

    pub fn patch_statement(&mut self, id: NodeId) -> PatchResult<()> {
        self.patch(id)
    }

    pub fn patch_opt_expression(&mut self, id: Option<NodeId>) -> PatchResult<()> {
        match id {
            Some(id) => self.patch_expression(id),
            None => Ok(()),
        }
    }

    fn patch_node(&mut self, id: NodeId) -> PatchResult<()> {
        if self.node(id).repeat.is_some() {
            self.patch_as_repeatable(id)?;
        } else if self.node(id).expression {
            if !self.can_be_expression(id) {
                return Err(PatchError::unsupported(
                    format!("{} cannot be used as a value", self.kind(id).name()),
                    self.content(id),
                ));
            }
            if self.prefers_expression(id) {
                self.patch_expression_with_negation(id)?;
            } else {
                self.patch_as_iife(id)?;
            }
        } else if self.statement_needs_parens(id) && !self.is_parenthesized(id) {
            let outer = self.outer(id);
            self.insert(id, outer.start, "(")?;
            self.render_statement(id)?;
            let end = self.outer(id).end;
            self.insert(id, end, ")")?;
        } else {
            self.render_statement(id)?;
        }
        self.flush_deferred_suffix(id)
    }

    fn patch_expression_with_negation(&mut self, id: NodeId) -> PatchResult<()> {
        if !self.is_negated(id) || self.negates_natively(id) {
            return self.render_expression(id);
        }
        let atomic = self.is_atomic(id);
        let start = self.outer(id).start;
        self.insert(id, start, if atomic { "!" } else { "!(" })?;
        self.render_expression(id)?;
        if !atomic {
            let end = self.outer(id).end;
            self.insert(id, end, ")")?;
        }
        Ok(())
    }

    fn flush_deferred_suffix(&mut self, id: NodeId) -> PatchResult<()> {
        let suffix = std::mem::take(&mut self.node_mut(id).deferred_suffix);
        if suffix.is_empty() {
            return Ok(());
        }
        let end = self.inner(id).end;
        self.insert(id, end, &suffix)
    }

    /// Finish the pass and return the patched text.
    pub fn render(&self) -> String {
        self.editor.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_patcher<R>(source: &str, f: impl FnOnce(&mut Patcher<'_>) -> R) -> R {
        let parsed = decaf_coffee::parse(source).unwrap();
        let options = ConvertOptions::default();
        let mut patcher = Patcher::new(source, &parsed, &options);
        f(&mut patcher)
    }

    fn find(patcher: &Patcher<'_>, pred: impl Fn(&NodeKind) -> bool) -> NodeId {
        patcher
            .tree
            .iter()
            .find(|&id| pred(patcher.kind(id)))
            .unwrap()
    }

    mod roles {
        use super::*;

        #[test]
        fn object_member_functions_are_methods() {
            with_patcher("o = {a: -> 1, b: => 2}", |p| {
                let functions: Vec<NodeId> = p
                    .tree
                    .iter()
                    .filter(|&id| matches!(p.kind(id), NodeKind::Function { .. }))
                    .collect();
                assert_eq!(
                    p.role(functions[0]),
                    &Role::Method {
                        name: "a".to_string(),
                        is_static: false
                    }
                );
                assert_eq!(p.role(functions[1]), &Role::Plain);
            });
        }

        #[test]
        fn class_members_and_constructors() {
            with_patcher(
                "class A\n  constructor: -> 1\n  @make: -> 2\n  A.other = -> 3\n  B.not = -> 4\n",
                |p| {
                    let roles: Vec<Role> = p
                        .tree
                        .iter()
                        .filter(|&id| matches!(p.kind(id), NodeKind::Function { .. }))
                        .map(|id| p.role(id).clone())
                        .collect();
                    assert_eq!(roles[0], Role::Constructor);
                    assert_eq!(
                        roles[1],
                        Role::Method {
                            name: "make".to_string(),
                            is_static: true
                        }
                    );
                    assert_eq!(
                        roles[2],
                        Role::Method {
                            name: "other".to_string(),
                            is_static: true
                        }
                    );
                    assert_eq!(roles[3], Role::Plain);
                },
            );
        }

        #[test]
        fn do_marks_its_function() {
            with_patcher("do (a = 1) -> a", |p| {
                let function = find(p, |k| matches!(k, NodeKind::Function { .. }));
                assert_eq!(p.role(function), &Role::DoFunction);
            });
        }
    }

    mod layout {
        use super::*;

        #[test]
        fn closing_offset_skips_trailing_comments_once_recorded() {
            with_patcher("a = 1 # one\nb = 2", |p| {
                assert_eq!(p.code_end(5), 5);
                assert_eq!(p.closing_offset(5), 11);
                assert_eq!(p.code_end(5), 11);
                assert_eq!(p.closing_offset(17), 17);
            });
        }

        #[test]
        fn effective_indent_counts_iife_levels() {
            with_patcher("f = ->\n  a\n", |p| {
                assert_eq!(p.effective_indent(9), "  ");
                p.iife_ranges.push(Span::new(7, 10));
                assert_eq!(p.effective_indent(9), "    ");
                assert_eq!(p.effective_indent(2), "");
            });
        }

        #[test]
        fn negation_toggles() {
            with_patcher("a", |p| {
                let a = find(p, |k| matches!(k, NodeKind::Identifier { .. }));
                p.negate(a);
                assert!(p.is_negated(a));
                p.negate(a);
                assert!(!p.is_negated(a));
            });
        }
    }
}
