//! Blocks, braces and declarations.

use decaf_coffee::{NodeId, NodeKind, TokenKind};
use decaf_core::text;

use crate::error::PatchResult;
use crate::patcher::{Patcher, Tail};

impl Patcher<'_> {
    /// Patch every statement of `block`, handing `tail` to the last one.
    pub(crate) fn patch_block(&mut self, block: NodeId, tail: Option<Tail>) -> PatchResult<()> {
        let NodeKind::Block { statements, .. } = self.kind(block) else {
            return Err(self.unexpected_kind(block, "a block"));
        };
        let last = statements.len().checked_sub(1);
        for (i, &statement) in statements.iter().enumerate() {
            match &tail {
                Some(tail) if Some(i) == last => self.patch_tail_statement(statement, tail.clone())?,
                _ => self.patch_statement(statement)?,
            }
            self.terminate_statement(statement)?;
        }
        Ok(())
    }

    /// Add the `;` ending `statement`, unless the source already has one.
    pub(crate) fn terminate_statement(&mut self, statement: NodeId) -> PatchResult<()> {
        if !self.node(statement).expression && !self.needs_semicolon(statement) {
            return Ok(());
        }
        let outer = self.outer(statement);
        let written = self
            .tokens
            .semantic_after(outer.end)
            .is_some_and(|t| self.tokens.kind(t) == Some(TokenKind::Semicolon));
        if written {
            return Ok(());
        }
        let end = self.code_end(outer.end);
        self.insert(statement, end, ";")
    }

    /// Put `let a, b;` for the names hoisted in the scope of `scope_node` at
    /// the top of its body.
    pub(crate) fn insert_declarations(&mut self, scope_node: NodeId, block: NodeId) -> PatchResult<()> {
        let Some(scope) = self.scopes.scope_for_node(scope_node) else {
            return Ok(());
        };
        let names = self.scopes.hoisted(scope);
        if names.is_empty() {
            return Ok(());
        }
        let NodeKind::Block { statements, inline } = self.kind(block) else {
            return Ok(());
        };
        let Some(&first) = statements.first() else {
            return Ok(());
        };
        let start = self.outer(first).start;
        let separator = if *inline {
            " ".to_string()
        } else {
            format!("\n{}", self.effective_indent(start))
        };
        tracing::trace!(scope, names = ?names, "hoisting declarations");
        self.prepend(block, start, &format!("let {};{}", names.join(", "), separator))
    }

    pub(crate) fn is_inline_block(&self, block: NodeId) -> bool {
        matches!(self.kind(block), NodeKind::Block { inline: true, .. })
    }

    /// Open the braces of the body of `id`, whose header ends at
    /// `header_end`. A `then` becomes the brace.
    pub(crate) fn open_block(
        &mut self,
        id: NodeId,
        header_end: usize,
        body: Option<NodeId>,
    ) -> PatchResult<()> {
        let Some(body) = body else {
            return self.insert(id, header_end, " {}");
        };
        let body_start = self.content(body).start;
        if let Some(then) = self.tokens.find_in(header_end, body_start, TokenKind::Then) {
            let span = self.tokens.span(then);
            return self.overwrite(id, span.start, span.end, "{");
        }
        self.insert(id, header_end, " {")
    }

    /// Close the braces opened by [`Patcher::open_block`]. `next` is the
    /// start of an `else`, `catch` or `finally` continuing the construct.
    pub(crate) fn close_block(
        &mut self,
        id: NodeId,
        body: Option<NodeId>,
        next: Option<usize>,
    ) -> PatchResult<()> {
        let Some(body) = body else {
            return Ok(());
        };
        if self.is_inline_block(body) {
            let end = self.code_end(self.outer(body).end);
            return self.insert(id, end, " }");
        }
        let body_end = self.content(body).end;
        match next {
            Some(keyword) if !text::same_line(self.source, body_end, keyword) => {
                self.insert_right(id, keyword, "} ")
            }
            _ => {
                let end = self.closing_offset(body_end);
                let indent = self.effective_indent(self.content(id).start);
                self.insert(id, end, &format!("\n{}}}", indent))
            }
        }
    }

    /// Indentation of the first line of a multi-line body.
    pub(crate) fn body_indent(&self, body: NodeId) -> String {
        self.effective_indent(self.content(body).start)
    }

    /// Insert `lines` as statements at the top of `body`.
    pub(crate) fn prepend_statements(&mut self, id: NodeId, body: NodeId, lines: &[String]) -> PatchResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let start = self.content(body).start;
        let separator = if self.is_inline_block(body) {
            " ".to_string()
        } else {
            format!("\n{}", self.body_indent(body))
        };
        let mut text = String::new();
        for line in lines {
            text.push_str(line);
            text.push_str(&separator);
        }
        self.insert(id, start, &text)
    }
}

#[cfg(test)]
mod tests {
    use crate::options::ConvertOptions;
    use crate::patcher::Patcher;

    fn main_stage(source: &str) -> String {
        let parsed = decaf_coffee::parse(source).unwrap();
        let options = ConvertOptions::default();
        let mut p = Patcher::new(source, &parsed, &options);
        p.patch_program().unwrap();
        p.render()
    }

    #[test]
    fn blocks_get_braces() {
        assert_eq!(main_stage("if a\n  b\n"), "if (a) {\n  b;\n}\n");
        assert_eq!(main_stage("if a then b"), "if (a) { b; }");
    }

    #[test]
    fn else_on_its_own_line_joins_the_brace() {
        assert_eq!(
            main_stage("if a\n  b\nelse\n  c\n"),
            "if (a) {\n  b;\n} else {\n  c;\n}\n"
        );
    }

    #[test]
    fn closing_brace_follows_a_trailing_comment() {
        assert_eq!(
            main_stage("if a\n  b # note\nc"),
            "if (a) {\n  b; # note\n}\nc;"
        );
    }

    #[test]
    fn hoisted_names_lead_the_body() {
        assert_eq!(
            main_stage("f = ->\n  if a\n    b = 1\n  b\n"),
            "let f = function() {\n  let b;\n  if (a) {\n    b = 1;\n  }\n  return b;\n};\n"
        );
    }

    #[test]
    fn nested_closing_braces_share_the_last_line() {
        assert_eq!(
            main_stage("f = ->\n  if a\n    b\n"),
            "let f = function() {\n  if (a) {\n    return b;\n  }\n};\n"
        );
    }
}
