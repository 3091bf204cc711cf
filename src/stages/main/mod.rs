//! Main stage: CoffeeScript to JavaScript.
//!
//! Runs on normalized input, so calls and object literals are explicit and
//! every postfix construct is already in prefix form. Node rules live in the
//! submodules by construct family; this module holds the dispatch the patch
//! tree calls into and the decisions that cut across families (whether a
//! node prefers to render as an expression, whether it negates natively,
//! whether it needs a terminating semicolon).

mod access;
mod block;
mod classes;
mod control;
mod functions;
mod literals;
mod loops;
mod operators;

use decaf_coffee::{NodeId, NodeKind, ParsedSource, TokenKind, UnaryOperator};

use super::StageOutput;
use crate::error::{PatchError, PatchResult};
use crate::options::ConvertOptions;
use crate::patcher::Patcher;
use crate::suggestions::Suggestion;

/// Convert normalized CoffeeScript to JavaScript.
pub fn run(source: &str, parsed: &ParsedSource, options: &ConvertOptions) -> PatchResult<StageOutput> {
    let mut patcher = Patcher::new(source, parsed, options);
    patcher.patch_comments()?;
    patcher.patch_program()?;
    patcher.check_top_level_this();
    let code = patcher.render();
    tracing::debug!(
        bytes = code.len(),
        helpers = patcher.helpers.names().len(),
        "main stage finished"
    );
    Ok(StageOutput {
        code,
        suggestions: std::mem::take(&mut patcher.suggestions),
        helpers: std::mem::take(&mut patcher.helpers),
    })
}

impl Patcher<'_> {
    /// `# x` becomes `// x` and `### x ###` becomes `/* x */`. A shebang
    /// line stays as written.
    fn patch_comments(&mut self) -> PatchResult<()> {
        let root = self.tree.root();
        let comments: Vec<_> = self.tokens.comments().map(|t| (t.kind, t.span)).collect();
        for (kind, span) in comments {
            match kind {
                TokenKind::Comment if span.start == 0 && self.source.starts_with("#!") => {}
                TokenKind::Comment => self.overwrite(root, span.start, span.start + 1, "//")?,
                TokenKind::HereComment if span.len() >= 6 => {
                    self.overwrite(root, span.start, span.start + 3, "/*")?;
                    self.overwrite(root, span.end - 3, span.end, "*/")?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn patch_program(&mut self) -> PatchResult<()> {
        let root = self.tree.root();
        let NodeKind::Program { body } = self.kind(root) else {
            return Err(PatchError::internal("tree root is not a program"));
        };
        if let Some(body) = *body {
            self.patch_block(body, None)?;
            self.insert_declarations(root, body)?;
        }
        Ok(())
    }

    /// `this` outside every function and class refers to the module.
    fn check_top_level_this(&mut self) {
        let tree = self.tree;
        let top_level = tree.iter().any(|id| {
            matches!(tree.kind(id), NodeKind::This { .. })
                && !tree.ancestors(id).any(|a| {
                    matches!(tree.kind(a), NodeKind::Function { .. } | NodeKind::Class { .. })
                })
        });
        if top_level {
            self.record(Suggestion::TopLevelThis);
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Render `id` as a JavaScript expression.
    pub(crate) fn render_expression(&mut self, id: NodeId) -> PatchResult<()> {
        match self.kind(id) {
            NodeKind::Identifier { .. }
            | NodeKind::Int { .. }
            | NodeKind::Float
            | NodeKind::Null
            | NodeKind::Undefined
            | NodeKind::Super => Ok(()),
            NodeKind::String => self.patch_string(id),
            NodeKind::TemplateLiteral { .. } => self.patch_template(id),
            NodeKind::Bool { .. } => self.patch_bool(id),
            NodeKind::This { .. } => self.patch_this(id),
            NodeKind::Array { .. } => self.patch_array(id),
            NodeKind::Object { .. } => self.patch_object(id),
            NodeKind::Range { .. } => self.patch_range(id),
            NodeKind::Spread { .. } | NodeKind::Rest { .. } => self.patch_spread(id),
            NodeKind::DefaultParam { param, default } => {
                self.patch_expression(*param)?;
                self.patch_expression(*default)
            }
            NodeKind::MemberAccess { .. }
            | NodeKind::SoakedMemberAccess { .. }
            | NodeKind::ProtoMemberAccess { .. }
            | NodeKind::SoakedProtoMemberAccess { .. }
            | NodeKind::DynamicMemberAccess { .. }
            | NodeKind::SoakedDynamicMemberAccess { .. }
            | NodeKind::Call { .. }
            | NodeKind::SoakedCall { .. }
            | NodeKind::Slice { .. } => self.render_chain(id),
            NodeKind::New { .. } => self.patch_new(id),
            NodeKind::Function { .. } => self.patch_function(id),
            NodeKind::Do { .. } => self.patch_do(id),
            NodeKind::Conditional { .. } => self.patch_ternary(id),
            NodeKind::While { .. } | NodeKind::ForIn { .. } | NodeKind::ForOf { .. } => {
                self.patch_comprehension(id)
            }
            NodeKind::Class { .. } => self.patch_class(id),
            NodeKind::AssignOp { .. } => self.patch_assign(id),
            NodeKind::CompoundAssignOp { .. } => self.patch_compound_assign(id),
            NodeKind::ExistsAssignOp { .. } => self.patch_exists_assign(id),
            NodeKind::BinaryOp { .. } => self.patch_binary(id),
            NodeKind::ChainedComparison { .. } => self.patch_chained_comparison(id),
            NodeKind::UnaryOp { .. } => self.patch_unary(id),
            NodeKind::UnaryExists { .. } => self.patch_unary_exists(id),
            NodeKind::Seq { .. } => self.patch_seq(id),
            NodeKind::Yield { .. } | NodeKind::YieldFrom { .. } | NodeKind::Await { .. } => {
                self.patch_suspension(id)
            }
            kind => Err(PatchError::internal(format!(
                "{} has no expression form",
                kind.name()
            ))),
        }
    }

    /// Render `id` as a JavaScript statement.
    pub(crate) fn render_statement(&mut self, id: NodeId) -> PatchResult<()> {
        match self.kind(id) {
            NodeKind::Conditional { .. } => self.patch_conditional(id),
            NodeKind::While { .. } => self.patch_while(id),
            NodeKind::ForIn { .. } => self.patch_for_in(id),
            NodeKind::ForOf { .. } => self.patch_for_of(id),
            NodeKind::Switch { .. } => self.patch_switch(id),
            NodeKind::Try { .. } => self.patch_try(id),
            NodeKind::Throw { .. } => self.patch_throw(id),
            NodeKind::Return { .. } => self.patch_return(id),
            NodeKind::Break | NodeKind::Continue => Ok(()),
            NodeKind::ExistsAssignOp { .. } => self.patch_exists_assign_statement(id),
            _ => self.render_expression(id),
        }
    }

    /// Whether `id` has a direct expression rendering, as opposed to being
    /// wrapped in an IIFE.
    pub(crate) fn prefers_expression(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Conditional { .. } => self.is_ternary_candidate(id),
            NodeKind::ForIn { .. } | NodeKind::ForOf { .. } => self.is_comprehension_candidate(id),
            NodeKind::While { .. }
            | NodeKind::Switch { .. }
            | NodeKind::Try { .. }
            | NodeKind::Throw { .. } => false,
            _ => true,
        }
    }

    /// Whether `id` can produce a value at all.
    pub(crate) fn can_be_expression(&self, id: NodeId) -> bool {
        !matches!(
            self.kind(id),
            NodeKind::Return { .. }
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Program { .. }
                | NodeKind::Block { .. }
        )
    }

    /// Whether `id` renders its own negation (`a !== b`, `a == null`)
    /// rather than needing a `!`.
    pub(crate) fn negates_natively(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::UnaryOp {
                op: UnaryOperator::Not,
                ..
            }
            | NodeKind::UnaryExists { .. } => true,
            NodeKind::BinaryOp { op, .. } => op
                .inverse(self.options.loose_comparison_negation)
                .is_some(),
            _ => false,
        }
    }

    /// Whether a prefix `!` applies to the whole rendering of `id`.
    pub(crate) fn is_atomic(&self, id: NodeId) -> bool {
        if self.is_parenthesized(id) {
            return true;
        }
        match self.kind(id) {
            NodeKind::Identifier { .. }
            | NodeKind::Int { .. }
            | NodeKind::Float
            | NodeKind::String
            | NodeKind::TemplateLiteral { .. }
            | NodeKind::Bool { .. }
            | NodeKind::Null
            | NodeKind::Undefined
            | NodeKind::This { .. }
            | NodeKind::Super
            | NodeKind::Array { .. }
            | NodeKind::Object { .. }
            | NodeKind::Range { .. }
            | NodeKind::New { .. }
            | NodeKind::Do { .. } => true,
            NodeKind::MemberAccess { .. }
            | NodeKind::SoakedMemberAccess { .. }
            | NodeKind::ProtoMemberAccess { .. }
            | NodeKind::SoakedProtoMemberAccess { .. }
            | NodeKind::DynamicMemberAccess { .. }
            | NodeKind::SoakedDynamicMemberAccess { .. }
            | NodeKind::Call { .. }
            | NodeKind::SoakedCall { .. }
            | NodeKind::Slice { .. } => !self.renders_as_ternary_soak(id),
            _ => false,
        }
    }

    /// Whether the leftmost token of a statement would start a block, a
    /// function declaration or a class declaration in JavaScript.
    pub(crate) fn statement_needs_parens(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current != id && self.is_parenthesized(current) {
                return false;
            }
            current = match self.kind(current) {
                NodeKind::Object { .. } => return true,
                NodeKind::Function { flavor, .. } => return !flavor.bound,
                NodeKind::Class { name, .. } => return name.is_none(),
                NodeKind::MemberAccess { expression, .. }
                | NodeKind::SoakedMemberAccess { expression, .. }
                | NodeKind::ProtoMemberAccess { expression }
                | NodeKind::SoakedProtoMemberAccess { expression }
                | NodeKind::DynamicMemberAccess { expression, .. }
                | NodeKind::SoakedDynamicMemberAccess { expression, .. }
                | NodeKind::Slice { expression, .. }
                | NodeKind::UnaryExists { expression } => *expression,
                NodeKind::Call { function, .. } | NodeKind::SoakedCall { function, .. } => {
                    *function
                }
                NodeKind::BinaryOp { left, .. } | NodeKind::Seq { left, .. } => *left,
                NodeKind::AssignOp { assignee, .. }
                | NodeKind::CompoundAssignOp { assignee, .. } => *assignee,
                NodeKind::UnaryOp { op, expression, .. } if op.is_postfix() => *expression,
                NodeKind::ChainedComparison { operands, .. } => match operands.first() {
                    Some(&first) => first,
                    None => return false,
                },
                _ => return false,
            };
        }
    }

    /// Whether the statement `id` ends with `;` in JavaScript.
    pub(crate) fn needs_semicolon(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Conditional { .. }
            | NodeKind::While { .. }
            | NodeKind::ForIn { .. }
            | NodeKind::ForOf { .. }
            | NodeKind::Switch { .. }
            | NodeKind::Try { .. } => false,
            NodeKind::Class { name, .. } => {
                !matches!(name.map(|n| self.kind(n)), Some(NodeKind::Identifier { .. }))
            }
            NodeKind::ExistsAssignOp { .. } => {
                self.node(id).expression || self.options.logical_assignment
            }
            _ => true,
        }
    }

    /// Whether `id` sits where a lower-precedence rendering (a ternary, an
    /// assignment, a `&&` chain) would bind to its neighbours instead.
    pub(crate) fn in_operand_position(&self, id: NodeId) -> bool {
        if self.is_parenthesized(id) {
            return false;
        }
        let Some(parent) = self.parent(id) else {
            return false;
        };
        match self.kind(parent) {
            NodeKind::BinaryOp { .. }
            | NodeKind::ChainedComparison { .. }
            | NodeKind::UnaryOp { .. }
            | NodeKind::UnaryExists { .. }
            | NodeKind::Await { .. } => true,
            NodeKind::MemberAccess { expression, .. }
            | NodeKind::SoakedMemberAccess { expression, .. }
            | NodeKind::ProtoMemberAccess { expression }
            | NodeKind::SoakedProtoMemberAccess { expression }
            | NodeKind::DynamicMemberAccess { expression, .. }
            | NodeKind::SoakedDynamicMemberAccess { expression, .. }
            | NodeKind::Slice { expression, .. } => *expression == id,
            NodeKind::Call { function, .. } | NodeKind::SoakedCall { function, .. } => {
                *function == id
            }
            NodeKind::New { ctor, .. } => *ctor == id,
            NodeKind::Conditional { condition, .. } => {
                *condition == id && self.node(parent).expression
            }
            _ => false,
        }
    }

    /// Error for a rule handed a node of the wrong kind.
    pub(crate) fn unexpected_kind(&self, id: NodeId, expected: &str) -> PatchError {
        PatchError::internal(format!(
            "expected {}, found {}",
            expected,
            self.kind(id).name()
        ))
    }

    /// The only statement of `block`.
    pub(crate) fn single_statement(&self, block: NodeId) -> Option<NodeId> {
        match self.kind(block) {
            NodeKind::Block { statements, .. } if statements.len() == 1 => Some(statements[0]),
            _ => None,
        }
    }

    /// Whether the source has a comment anywhere inside `id`.
    pub(crate) fn contains_comment(&self, id: NodeId) -> bool {
        let content = self.content(id);
        self.tokens
            .find_any_in(
                content.start,
                content.end,
                &[TokenKind::Comment, TokenKind::HereComment],
            )
            .is_some()
    }

    /// Wrap the rendering of `id` (from `mark` on) in parens when it sits in
    /// an operand position.
    pub(crate) fn parenthesize_operand(
        &mut self,
        id: NodeId,
        mark: decaf_core::editor::EditMark,
    ) -> PatchResult<()> {
        if !self.in_operand_position(id) {
            return Ok(());
        }
        let text = self.capture(id, mark)?;
        self.replace_since(id, &format!("({})", text), mark)
    }
}
