//! Statements in expression position.
//!
//! JavaScript has no conditional, loop, `switch` or `try` expressions. When
//! one of those must produce a value it is wrapped in a function invoked on
//! the spot, and its value leaves through an implicit return:
//!
//! ```text
//! x = try a() catch then b      let x = (() => { try { return a(); } catch (error) { return b; } })();
//! ```
//!
//! Loops collect their iteration values into a claimed `result` array.
//! Wrappers around `yield` or `await` become a delegating generator or an
//! awaited async arrow so the suspension still reaches the outer function.

use decaf_coffee::{NodeId, NodeKind};
use decaf_core::patch::Span;
use decaf_core::text;

use super::{Patcher, Tail};
use crate::error::PatchResult;
use crate::suggestions::Suggestion;

impl Patcher<'_> {
    pub(super) fn patch_as_iife(&mut self, id: NodeId) -> PatchResult<()> {
        self.record(Suggestion::AvoidIife);
        let content = self.content(id);
        let (open, close) = self.iife_wrapper(id);
        let multi_line = !text::same_line(self.source, content.start, content.end);
        let base = self.effective_indent(content.start);
        let (separator, closing_separator) = if multi_line {
            (format!("\n{}{}", base, self.indent_unit()), format!("\n{}", base))
        } else {
            (" ".to_string(), " ".to_string())
        };
        let result = self
            .is_loop(id)
            .then(|| self.claim_local(id, &["result"]));
        tracing::debug!(node = id.0, multi_line, "wrapping statement in an IIFE");

        let mut prefix = format!("{}{}", open, separator);
        if let Some(result) = &result {
            prefix.push_str(&format!("const {} = [];{}", result, separator));
        }
        self.insert(id, content.start, &prefix)?;
        if multi_line {
            self.indent_lines(id, content)?;
            self.iife_ranges.push(content);
        }

        match &result {
            Some(result) => {
                self.set_tail(id, Some(Tail::Push(result.clone())));
                self.render_statement(id)?;
            }
            None => {
                self.set_tail(id, Some(Tail::Return));
                self.render_statement(id)?;
                if self.needs_semicolon(id) {
                    let end = self.code_end(content.end);
                    self.insert(id, end, ";")?;
                }
            }
        }

        let mut suffix = String::new();
        if let Some(result) = &result {
            suffix.push_str(&format!("{}return {};", separator, result));
        }
        suffix.push_str(&closing_separator);
        suffix.push_str(close);
        let end = self.code_end(content.end);
        self.insert(id, end, &suffix)
    }

    pub(crate) fn is_loop(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            NodeKind::While { .. } | NodeKind::ForIn { .. } | NodeKind::ForOf { .. }
        )
    }

    /// Opening and closing text of the wrapper for `id`.
    fn iife_wrapper(&self, id: NodeId) -> (&'static str, &'static str) {
        let mut generator = false;
        let mut asynchronous = false;
        let mut arguments = false;
        self.visit_own_body(id, &mut |kind| match kind {
            NodeKind::Yield { .. } | NodeKind::YieldFrom { .. } => generator = true,
            NodeKind::Await { .. } => asynchronous = true,
            NodeKind::Identifier { name } if name == "arguments" => arguments = true,
            _ => {}
        });
        if generator {
            let close = if arguments {
                "}).apply(this, arguments)"
            } else {
                "}).call(this)"
            };
            ("yield* (function*() {", close)
        } else if asynchronous {
            ("await (async () => {", "})()")
        } else {
            ("(() => {", "})()")
        }
    }

    /// Visit `id` and its descendants, not entering nested functions.
    fn visit_own_body(&self, id: NodeId, visit: &mut impl FnMut(&NodeKind)) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let kind = self.kind(node);
            visit(kind);
            if node != id && matches!(kind, NodeKind::Function { .. }) {
                continue;
            }
            stack.extend(kind.child_ids());
        }
    }

    /// Indent every line after the first inside `range` by one level.
    fn indent_lines(&mut self, id: NodeId, range: Span) -> PatchResult<()> {
        let source = self.source;
        let unit = self.indent_unit().to_string();
        let line_starts: Vec<usize> = source[range.start..range.end]
            .match_indices('\n')
            .map(|(i, _)| range.start + i + 1)
            .filter(|&start| start < range.end)
            .filter(|&start| !matches!(source.as_bytes().get(start), Some(b'\n' | b'\r')))
            .filter(|&start| !self.tokens.inside_literal_text(start))
            .collect();
        for start in line_starts {
            self.insert_right(id, start, &unit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConvertOptions;

    fn wrapper(source: &str) -> (&'static str, &'static str) {
        let parsed = decaf_coffee::parse(source).unwrap();
        let options = ConvertOptions::default();
        let p = Patcher::new(source, &parsed, &options);
        let id = p
            .tree
            .iter()
            .find(|&id| matches!(p.kind(id), NodeKind::Try { .. }))
            .unwrap();
        p.iife_wrapper(id)
    }

    #[test]
    fn plain_wrapper_is_an_arrow() {
        assert_eq!(wrapper("x = try a"), ("(() => {", "})()"));
    }

    #[test]
    fn yield_makes_a_delegating_generator() {
        assert_eq!(
            wrapper("f = ->\n  x = try yield a\n"),
            ("yield* (function*() {", "}).call(this)")
        );
        assert_eq!(
            wrapper("f = ->\n  x = try yield arguments\n"),
            ("yield* (function*() {", "}).apply(this, arguments)")
        );
    }

    #[test]
    fn await_makes_an_awaited_async_arrow() {
        assert_eq!(
            wrapper("f = ->\n  x = try await a\n"),
            ("await (async () => {", "})()")
        );
    }

    #[test]
    fn nested_functions_do_not_count() {
        assert_eq!(wrapper("x = try -> yield a"), ("(() => {", "})()"));
    }
}
