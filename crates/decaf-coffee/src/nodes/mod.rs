//! Arena syntax tree.
//!
//! Nodes live in a single `Vec` owned by [`SyntaxTree`] and refer to each
//! other by [`NodeId`]. Every node records its parent, so consumers can walk
//! upward without reference cycles.
//!
//! Span conventions:
//! - Grouping parentheses are not part of the grouped node's span.
//! - Array, object, range and slice brackets are part of the node's span.
//! - A function's span starts at its parameter list (or arrow when there is
//!   none) and ends at the end of its body.
//! - `@x` is a `MemberAccess` whose object is a shorthand `This` spanning `@`.

mod ops;

pub use ops::{BinaryOperator, Precedence, UnaryOperator};

use decaf_core::patch::Span;

/// Index of a node in its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Modifiers of a function literal.
///
/// `generator` and `asynchronous` are inferred from `yield`/`await` in the
/// function's own body (not in nested functions).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionFlavor {
    /// `=>` rather than `->`.
    pub bound: bool,
    pub generator: bool,
    pub asynchronous: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program {
        body: Option<NodeId>,
    },
    /// A sequence of statements. `inline` blocks follow `then`, `->` or
    /// similar on the same line as their owner.
    Block {
        statements: Vec<NodeId>,
        inline: bool,
    },

    Identifier {
        name: String,
    },
    Int {
        value: i64,
    },
    Float,
    /// A quoted string without interpolation.
    String,
    /// An interpolated string. `quasis` has one more entry than
    /// `expressions`; each quasi spans the raw text between interpolations.
    TemplateLiteral {
        quasis: Vec<NodeId>,
        expressions: Vec<NodeId>,
    },
    Quasi,
    Bool {
        value: bool,
    },
    Null,
    Undefined,
    /// `this`, or `@` when `shorthand`.
    This {
        shorthand: bool,
    },
    Super,

    Array {
        members: Vec<NodeId>,
    },
    Object {
        members: Vec<NodeId>,
        /// No braces in the source.
        implicit: bool,
    },
    /// `key: value`, or shorthand `key` when `value` is `None`.
    ObjectMember {
        key: NodeId,
        value: Option<NodeId>,
    },
    /// `a...` in an array or argument list.
    Spread {
        expression: NodeId,
    },
    /// `a...` in a parameter list or destructuring pattern.
    Rest {
        expression: NodeId,
    },
    DefaultParam {
        param: NodeId,
        default: NodeId,
    },

    MemberAccess {
        expression: NodeId,
        member: String,
        member_span: Span,
    },
    SoakedMemberAccess {
        expression: NodeId,
        member: String,
        member_span: Span,
    },
    /// `a::` on its own.
    ProtoMemberAccess {
        expression: NodeId,
    },
    SoakedProtoMemberAccess {
        expression: NodeId,
    },
    DynamicMemberAccess {
        expression: NodeId,
        index: NodeId,
    },
    SoakedDynamicMemberAccess {
        expression: NodeId,
        index: NodeId,
    },

    Call {
        function: NodeId,
        arguments: Vec<NodeId>,
        /// Arguments without parentheses (`f a, b`).
        implicit: bool,
    },
    SoakedCall {
        function: NodeId,
        arguments: Vec<NodeId>,
        implicit: bool,
    },
    New {
        ctor: NodeId,
        arguments: Vec<NodeId>,
        implicit: bool,
        /// Whether any argument list was written at all.
        has_arguments: bool,
    },
    Function {
        params: Vec<NodeId>,
        body: Option<NodeId>,
        flavor: FunctionFlavor,
    },

    /// `if`/`unless`. `alternate` of `else if` is the nested conditional.
    Conditional {
        condition: NodeId,
        consequent: Option<NodeId>,
        alternate: Option<NodeId>,
        negated: bool,
        postfix: bool,
    },
    /// `while`/`until`/`loop`. `condition` is `None` for `loop`.
    While {
        condition: Option<NodeId>,
        guard: Option<NodeId>,
        body: Option<NodeId>,
        negated: bool,
        postfix: bool,
    },
    ForIn {
        key_assignee: Option<NodeId>,
        value_assignee: Option<NodeId>,
        target: NodeId,
        step: Option<NodeId>,
        filter: Option<NodeId>,
        body: Option<NodeId>,
        postfix: bool,
    },
    ForOf {
        key_assignee: NodeId,
        value_assignee: Option<NodeId>,
        target: NodeId,
        filter: Option<NodeId>,
        body: Option<NodeId>,
        own: bool,
        postfix: bool,
    },
    Switch {
        expression: Option<NodeId>,
        cases: Vec<NodeId>,
        alternate: Option<NodeId>,
    },
    SwitchCase {
        conditions: Vec<NodeId>,
        consequent: Option<NodeId>,
    },
    Try {
        body: Option<NodeId>,
        catch_assignee: Option<NodeId>,
        catch_body: Option<NodeId>,
        finally_body: Option<NodeId>,
        has_catch: bool,
        has_finally: bool,
    },
    Throw {
        expression: NodeId,
    },
    Return {
        expression: Option<NodeId>,
    },
    Break,
    Continue,
    Yield {
        expression: Option<NodeId>,
    },
    YieldFrom {
        expression: NodeId,
    },
    Await {
        expression: NodeId,
    },

    Class {
        name: Option<NodeId>,
        parent: Option<NodeId>,
        body: Option<NodeId>,
    },
    /// `key: value` in a class body. Static when the key is `@key`.
    ClassMember {
        key: NodeId,
        value: NodeId,
        is_static: bool,
    },
    Constructor {
        key: NodeId,
        value: NodeId,
    },

    AssignOp {
        assignee: NodeId,
        expression: NodeId,
    },
    /// `a += b`, `a or= b`, `a ||= b`, ...
    CompoundAssignOp {
        op: BinaryOperator,
        assignee: NodeId,
        expression: NodeId,
        op_span: Span,
    },
    /// `a ?= b`
    ExistsAssignOp {
        assignee: NodeId,
        expression: NodeId,
        op_span: Span,
    },
    BinaryOp {
        op: BinaryOperator,
        left: NodeId,
        right: NodeId,
        op_span: Span,
    },
    /// `a < b < c`; `operators[i]` sits between `operands[i]` and
    /// `operands[i + 1]`.
    ChainedComparison {
        operands: Vec<NodeId>,
        operators: Vec<(BinaryOperator, Span)>,
    },
    UnaryOp {
        op: UnaryOperator,
        expression: NodeId,
        op_span: Span,
    },
    /// Postfix `a?`.
    UnaryExists {
        expression: NodeId,
    },
    /// `[a..b]` or `[a...b]`.
    Range {
        left: NodeId,
        right: NodeId,
        inclusive: bool,
    },
    /// `a[b..c]`; either bound may be omitted.
    Slice {
        expression: NodeId,
        left: Option<NodeId>,
        right: Option<NodeId>,
        inclusive: bool,
    },
    Do {
        expression: NodeId,
    },
    /// `a; b` inside parentheses.
    Seq {
        left: NodeId,
        right: NodeId,
    },
}

impl NodeKind {
    /// Short tag used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::Block { .. } => "Block",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Int { .. } => "Int",
            NodeKind::Float => "Float",
            NodeKind::String => "String",
            NodeKind::TemplateLiteral { .. } => "TemplateLiteral",
            NodeKind::Quasi => "Quasi",
            NodeKind::Bool { .. } => "Bool",
            NodeKind::Null => "Null",
            NodeKind::Undefined => "Undefined",
            NodeKind::This { .. } => "This",
            NodeKind::Super => "Super",
            NodeKind::Array { .. } => "Array",
            NodeKind::Object { .. } => "Object",
            NodeKind::ObjectMember { .. } => "ObjectMember",
            NodeKind::Spread { .. } => "Spread",
            NodeKind::Rest { .. } => "Rest",
            NodeKind::DefaultParam { .. } => "DefaultParam",
            NodeKind::MemberAccess { .. } => "MemberAccess",
            NodeKind::SoakedMemberAccess { .. } => "SoakedMemberAccess",
            NodeKind::ProtoMemberAccess { .. } => "ProtoMemberAccess",
            NodeKind::SoakedProtoMemberAccess { .. } => "SoakedProtoMemberAccess",
            NodeKind::DynamicMemberAccess { .. } => "DynamicMemberAccess",
            NodeKind::SoakedDynamicMemberAccess { .. } => "SoakedDynamicMemberAccess",
            NodeKind::Call { .. } => "Call",
            NodeKind::SoakedCall { .. } => "SoakedCall",
            NodeKind::New { .. } => "New",
            NodeKind::Function { .. } => "Function",
            NodeKind::Conditional { .. } => "Conditional",
            NodeKind::While { .. } => "While",
            NodeKind::ForIn { .. } => "ForIn",
            NodeKind::ForOf { .. } => "ForOf",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::SwitchCase { .. } => "SwitchCase",
            NodeKind::Try { .. } => "Try",
            NodeKind::Throw { .. } => "Throw",
            NodeKind::Return { .. } => "Return",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Yield { .. } => "Yield",
            NodeKind::YieldFrom { .. } => "YieldFrom",
            NodeKind::Await { .. } => "Await",
            NodeKind::Class { .. } => "Class",
            NodeKind::ClassMember { .. } => "ClassMember",
            NodeKind::Constructor { .. } => "Constructor",
            NodeKind::AssignOp { .. } => "AssignOp",
            NodeKind::CompoundAssignOp { .. } => "CompoundAssignOp",
            NodeKind::ExistsAssignOp { .. } => "ExistsAssignOp",
            NodeKind::BinaryOp { .. } => "BinaryOp",
            NodeKind::ChainedComparison { .. } => "ChainedComparison",
            NodeKind::UnaryOp { .. } => "UnaryOp",
            NodeKind::UnaryExists { .. } => "UnaryExists",
            NodeKind::Range { .. } => "Range",
            NodeKind::Slice { .. } => "Slice",
            NodeKind::Do { .. } => "Do",
            NodeKind::Seq { .. } => "Seq",
        }
    }

    /// Direct children in field order.
    pub fn child_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut one = |id: &NodeId| out.push(*id);
        match self {
            NodeKind::Program { body } => body.iter().for_each(&mut one),
            NodeKind::Block { statements, .. } => statements.iter().for_each(&mut one),
            NodeKind::TemplateLiteral {
                quasis,
                expressions,
            } => {
                quasis.iter().for_each(&mut one);
                expressions.iter().for_each(&mut one);
            }
            NodeKind::Array { members } | NodeKind::Object { members, .. } => {
                members.iter().for_each(&mut one)
            }
            NodeKind::ObjectMember { key, value } => {
                one(key);
                value.iter().for_each(&mut one);
            }
            NodeKind::Spread { expression }
            | NodeKind::Rest { expression }
            | NodeKind::ProtoMemberAccess { expression }
            | NodeKind::SoakedProtoMemberAccess { expression }
            | NodeKind::MemberAccess { expression, .. }
            | NodeKind::SoakedMemberAccess { expression, .. }
            | NodeKind::Throw { expression }
            | NodeKind::YieldFrom { expression }
            | NodeKind::Await { expression }
            | NodeKind::UnaryOp { expression, .. }
            | NodeKind::UnaryExists { expression }
            | NodeKind::Do { expression } => one(expression),
            NodeKind::DefaultParam { param, default } => {
                one(param);
                one(default);
            }
            NodeKind::DynamicMemberAccess { expression, index }
            | NodeKind::SoakedDynamicMemberAccess { expression, index } => {
                one(expression);
                one(index);
            }
            NodeKind::Call {
                function,
                arguments,
                ..
            }
            | NodeKind::SoakedCall {
                function,
                arguments,
                ..
            } => {
                one(function);
                arguments.iter().for_each(&mut one);
            }
            NodeKind::New {
                ctor, arguments, ..
            } => {
                one(ctor);
                arguments.iter().for_each(&mut one);
            }
            NodeKind::Function { params, body, .. } => {
                params.iter().for_each(&mut one);
                body.iter().for_each(&mut one);
            }
            NodeKind::Conditional {
                condition,
                consequent,
                alternate,
                ..
            } => {
                one(condition);
                consequent.iter().for_each(&mut one);
                alternate.iter().for_each(&mut one);
            }
            NodeKind::While {
                condition,
                guard,
                body,
                ..
            } => {
                condition.iter().for_each(&mut one);
                guard.iter().for_each(&mut one);
                body.iter().for_each(&mut one);
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
                value_assignee.iter().for_each(&mut one);
                key_assignee.iter().for_each(&mut one);
                one(target);
                step.iter().for_each(&mut one);
                filter.iter().for_each(&mut one);
                body.iter().for_each(&mut one);
            }
            NodeKind::ForOf {
                key_assignee,
                value_assignee,
                target,
                filter,
                body,
                ..
            } => {
                one(key_assignee);
                value_assignee.iter().for_each(&mut one);
                one(target);
                filter.iter().for_each(&mut one);
                body.iter().for_each(&mut one);
            }
            NodeKind::Switch {
                expression,
                cases,
                alternate,
            } => {
                expression.iter().for_each(&mut one);
                cases.iter().for_each(&mut one);
                alternate.iter().for_each(&mut one);
            }
            NodeKind::SwitchCase {
                conditions,
                consequent,
            } => {
                conditions.iter().for_each(&mut one);
                consequent.iter().for_each(&mut one);
            }
            NodeKind::Try {
                body,
                catch_assignee,
                catch_body,
                finally_body,
                ..
            } => {
                body.iter().for_each(&mut one);
                catch_assignee.iter().for_each(&mut one);
                catch_body.iter().for_each(&mut one);
                finally_body.iter().for_each(&mut one);
            }
            NodeKind::Return { expression } | NodeKind::Yield { expression } => {
                expression.iter().for_each(&mut one)
            }
            NodeKind::Class { name, parent, body } => {
                name.iter().for_each(&mut one);
                parent.iter().for_each(&mut one);
                body.iter().for_each(&mut one);
            }
            NodeKind::ClassMember { key, value, .. } | NodeKind::Constructor { key, value } => {
                one(key);
                one(value);
            }
            NodeKind::AssignOp {
                assignee,
                expression,
            }
            | NodeKind::CompoundAssignOp {
                assignee,
                expression,
                ..
            }
            | NodeKind::ExistsAssignOp {
                assignee,
                expression,
                ..
            } => {
                one(assignee);
                one(expression);
            }
            NodeKind::BinaryOp { left, right, .. } | NodeKind::Seq { left, right } => {
                one(left);
                one(right);
            }
            NodeKind::ChainedComparison { operands, .. } => operands.iter().for_each(&mut one),
            NodeKind::Range { left, right, .. } => {
                one(left);
                one(right);
            }
            NodeKind::Slice {
                expression,
                left,
                right,
                ..
            } => {
                one(expression);
                left.iter().for_each(&mut one);
                right.iter().for_each(&mut one);
            }
            NodeKind::Identifier { .. }
            | NodeKind::Int { .. }
            | NodeKind::Float
            | NodeKind::String
            | NodeKind::Quasi
            | NodeKind::Bool { .. }
            | NodeKind::Null
            | NodeKind::Undefined
            | NodeKind::This { .. }
            | NodeKind::Super
            | NodeKind::Break
            | NodeKind::Continue => {}
        }
        out
    }

    /// The program, functions and class bodies each own a lexical scope.
    pub fn is_scope_boundary(&self) -> bool {
        matches!(
            self,
            NodeKind::Function { .. } | NodeKind::Program { .. } | NodeKind::Class { .. }
        )
    }
}

/// A node plus its location in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
}

/// An immutable syntax tree once parsing completes.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    root: NodeId,
}

impl SyntaxTree {
    pub(crate) fn from_parts(nodes: Vec<SyntaxNode>, root: NodeId) -> Self {
        SyntaxTree { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Children ordered by source position.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = self.kind(id).child_ids();
        children.sort_by_key(|c| (self.span(*c).start, self.span(*c).end));
        children
    }

    /// All nodes below `id` in pre-order, not including `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Node ids reachable from the root, in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.root).chain(self.descendants(self.root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: NodeKind, start: usize, end: usize, parent: u32) -> SyntaxNode {
        SyntaxNode {
            kind,
            span: Span::new(start, end),
            parent: Some(NodeId(parent)),
        }
    }

    /// `b = a` built by hand: assignee after expression in the arena.
    fn sample() -> SyntaxTree {
        let nodes = vec![
            SyntaxNode {
                kind: NodeKind::Program {
                    body: Some(NodeId(1)),
                },
                span: Span::new(0, 5),
                parent: None,
            },
            leaf(
                NodeKind::Block {
                    statements: vec![NodeId(2)],
                    inline: false,
                },
                0,
                5,
                0,
            ),
            leaf(
                NodeKind::AssignOp {
                    assignee: NodeId(4),
                    expression: NodeId(3),
                },
                0,
                5,
                1,
            ),
            leaf(
                NodeKind::Identifier {
                    name: "a".to_string(),
                },
                4,
                5,
                2,
            ),
            leaf(
                NodeKind::Identifier {
                    name: "b".to_string(),
                },
                0,
                1,
                2,
            ),
        ];
        SyntaxTree::from_parts(nodes, NodeId(0))
    }

    #[test]
    fn children_are_sorted_by_position() {
        let tree = sample();
        assert_eq!(tree.children(NodeId(2)), vec![NodeId(4), NodeId(3)]);
    }

    #[test]
    fn descendants_are_preorder() {
        let tree = sample();
        assert_eq!(
            tree.descendants(tree.root()),
            vec![NodeId(1), NodeId(2), NodeId(4), NodeId(3)]
        );
    }

    #[test]
    fn ancestors_walk_to_root() {
        let tree = sample();
        let chain: Vec<NodeId> = tree.ancestors(NodeId(3)).collect();
        assert_eq!(chain, vec![NodeId(2), NodeId(1), NodeId(0)]);
    }

    #[test]
    fn names_are_stable() {
        let tree = sample();
        assert_eq!(tree.kind(NodeId(2)).name(), "AssignOp");
        assert_eq!(tree.len(), 5);
    }
}
