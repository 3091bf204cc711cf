//! Repeatable values.
//!
//! Some rewrites mention a value twice (`a ? b` becomes
//! `a != null ? a : b`). When the value is a side-effect-free name or
//! access chain it is simply repeated; otherwise it is stored in a claimed
//! temporary on first use, `(ref = f()) != null ? ref : b`, and the
//! temporary is repeated instead.

use decaf_coffee::{NodeId, NodeKind};

use super::Patcher;
use crate::error::PatchResult;
use crate::suggestions::Suggestion;

/// How to make a value repeatable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatOptions {
    /// Candidate names for a temporary, tried in order.
    pub names: Vec<&'static str>,
    /// Parenthesize the `name = value` assignment.
    pub parens: bool,
    /// Store the whole value even when parts of it could be reused.
    pub whole: bool,
}

impl Default for RepeatOptions {
    fn default() -> Self {
        RepeatOptions {
            names: vec!["ref"],
            parens: true,
            whole: false,
        }
    }
}

impl RepeatOptions {
    pub fn named(name: &'static str) -> Self {
        RepeatOptions {
            names: vec![name],
            ..RepeatOptions::default()
        }
    }
}

impl Patcher<'_> {
    /// Patch `id` as an expression and return text that re-reads its value.
    pub fn patch_repeatable(&mut self, id: NodeId, options: RepeatOptions) -> PatchResult<String> {
        self.node_mut(id).expression = true;
        self.node_mut(id).repeat = Some(options);
        self.patch(id)?;
        let text = self.node_mut(id).repeat_ref.take();
        Ok(text.unwrap_or_default())
    }

    /// Whether repeating the node's text is equivalent to reading its value
    /// again: names, literals, `this`, and access chains over those.
    pub fn is_repeatable(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Identifier { .. }
            | NodeKind::Int { .. }
            | NodeKind::Float
            | NodeKind::String
            | NodeKind::Bool { .. }
            | NodeKind::Null
            | NodeKind::Undefined
            | NodeKind::This { .. }
            | NodeKind::Super => true,
            NodeKind::MemberAccess { expression, .. } | NodeKind::ProtoMemberAccess { expression } => {
                self.is_repeatable(*expression)
            }
            NodeKind::DynamicMemberAccess { expression, index } => {
                self.is_repeatable(*expression) && self.is_repeatable(*index)
            }
            _ => false,
        }
    }

    pub(super) fn patch_as_repeatable(&mut self, id: NodeId) -> PatchResult<()> {
        let options = self.node_mut(id).repeat.take().unwrap_or_default();
        // A chain holding a soak closes its guard at its own end, so it is
        // stored whole.
        let split = !options.whole && !self.chain_has_soak(id);
        let reference = if self.is_repeatable(id) {
            let mark = self.mark();
            self.render_expression(id)?;
            self.flush_deferred_suffix(id)?;
            self.capture(id, mark)?
        } else {
            match self.kind(id) {
                NodeKind::MemberAccess { expression, .. } if split => {
                    self.repeat_member_access(id, *expression)?
                }
                NodeKind::DynamicMemberAccess { expression, index } if split => {
                    self.repeat_dynamic_access(*expression, *index)?
                }
                _ => self.store_in_temporary(id, &options)?,
            }
        };
        tracing::trace!(node = id.0, %reference, "patched repeatable");
        self.node_mut(id).repeat_ref = Some(reference);
        Ok(())
    }

    /// `f().b` becomes `(base = f()).b`, re-read as `base.b`.
    fn repeat_member_access(&mut self, id: NodeId, base: NodeId) -> PatchResult<String> {
        let base_ref = self.patch_repeatable(base, RepeatOptions::named("base"))?;
        let mark = self.mark();
        self.render_link(id)?;
        self.flush_deferred_suffix(id)?;
        let base_end = self.outer(base).end;
        let end = self.outer(id).end;
        let suffix = self.slice_since(base_end, end, mark)?;
        Ok(format!("{}{}", base_ref, suffix))
    }

    /// `f()[g()]` becomes `(base = f())[(name = g())]`, re-read as
    /// `base[name]`.
    fn repeat_dynamic_access(&mut self, base: NodeId, index: NodeId) -> PatchResult<String> {
        let base_ref = self.patch_repeatable(base, RepeatOptions::named("base"))?;
        let index_ref = self.patch_repeatable(index, RepeatOptions::named("name"))?;
        Ok(format!("{}[{}]", base_ref, index_ref))
    }

    /// Wrap the patched value in an assignment to a fresh temporary.
    fn store_in_temporary(&mut self, id: NodeId, options: &RepeatOptions) -> PatchResult<String> {
        let name = self.claim_ref(id, &options.names);
        let mark = self.mark();
        self.render_expression(id)?;
        self.flush_deferred_suffix(id)?;
        let value = self.capture(id, mark)?;
        let assignment = if options.parens {
            format!("({} = {})", name, value)
        } else {
            format!("{} = {}", name, value)
        };
        self.replace_since(id, &assignment, mark)?;
        self.record(Suggestion::InlineAssignments);
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConvertOptions;
    use decaf_core::patch::Span;

    fn repeat(source: &str, pick: impl Fn(&NodeKind) -> bool) -> (String, String) {
        let parsed = decaf_coffee::parse(source).unwrap();
        let options = ConvertOptions::default();
        let mut p = Patcher::new(source, &parsed, &options);
        let id = p.tree.iter().find(|&id| pick(p.kind(id))).unwrap();
        let text = p.patch_repeatable(id, RepeatOptions::default()).unwrap();
        (text, p.render())
    }

    #[test]
    fn names_repeat_as_themselves() {
        let (text, out) = repeat("x = a", |k| matches!(k, NodeKind::Identifier { name } if name == "a"));
        assert_eq!(text, "a");
        assert_eq!(out, "x = a");
    }

    #[test]
    fn this_members_repeat_as_rendered() {
        let (text, out) = repeat("x = @a", |k| matches!(k, NodeKind::MemberAccess { .. }));
        assert_eq!(text, "this.a");
        assert_eq!(out, "x = this.a");
    }

    #[test]
    fn calls_are_stored_in_a_temporary() {
        let (text, out) = repeat("x = f()", |k| matches!(k, NodeKind::Call { .. }));
        assert_eq!(text, "ref");
        assert_eq!(out, "x = (ref = f())");
    }

    #[test]
    fn member_of_call_stores_only_the_base() {
        let (text, out) = repeat("x = f().b", |k| matches!(k, NodeKind::MemberAccess { .. }));
        assert_eq!(text, "base.b");
        assert_eq!(out, "x = (base = f()).b");
    }

    #[test]
    fn dynamic_access_stores_base_and_index() {
        let (text, out) =
            repeat("x = f()[g()]", |k| matches!(k, NodeKind::DynamicMemberAccess { .. }));
        assert_eq!(text, "base[name]");
        assert_eq!(out, "x = (base = f())[(name = g())]");
    }

    #[test]
    fn soaked_values_store_their_closed_guard() {
        let (text, out) = repeat("x = a?.b", |k| matches!(k, NodeKind::SoakedMemberAccess { .. }));
        assert_eq!(text, "ref");
        assert_eq!(
            out,
            "x = (ref = typeof a !== 'undefined' && a !== null ? a.b : undefined)"
        );
    }

    #[test]
    fn chains_over_a_soak_are_stored_whole() {
        let (text, out) = repeat("x = a?.b.c", |k| matches!(k, NodeKind::MemberAccess { .. }));
        assert_eq!(text, "ref");
        assert_eq!(
            out,
            "x = (ref = typeof a !== 'undefined' && a !== null ? a.b.c : undefined)"
        );
    }

    #[test]
    fn temporaries_avoid_source_names() {
        let (text, out) = repeat("ref = f()", |k| matches!(k, NodeKind::Call { .. }));
        assert_eq!(text, "ref2");
        assert_eq!(out, "ref = (ref2 = f())");
    }

    #[test]
    fn repeatable_text_matches_plain_patching() {
        let source = "x = @a.b[c]";
        let parsed = decaf_coffee::parse(source).unwrap();
        let options = ConvertOptions::default();
        let mut plain = Patcher::new(source, &parsed, &options);
        let access = plain
            .tree
            .iter()
            .find(|&id| matches!(plain.kind(id), NodeKind::DynamicMemberAccess { .. }))
            .unwrap();
        plain.patch_expression(access).unwrap();
        let rendered = plain.render();
        let span: Span = plain.content(access);

        let mut repeated = Patcher::new(source, &parsed, &options);
        let text = repeated
            .patch_repeatable(access, RepeatOptions::default())
            .unwrap();
        assert_eq!(text, &rendered[span.start..rendered.len()]);
        assert_eq!(repeated.render(), rendered);
    }
}
