//! Editing through the patch tree.
//!
//! Every edit names the node making it. An edit outside the node's outer
//! range widens that range, and every ancestor's, to cover it; later
//! captures of those nodes then include the edit.
//!
//! Widening is limited to the editing bounds of the node: the gaps its
//! ancestors leave between their other children. An edit landing inside a
//! node the editor neither contains nor is contained by is an internal
//! error. Method and constructor functions may also edit the rest of the
//! member that defines them, since their header absorbs its key.

use decaf_coffee::NodeId;
use decaf_core::editor::EditMark;
use decaf_core::patch::Span;

use super::{Patcher, Role};
use crate::error::{PatchError, PatchResult};

impl Patcher<'_> {
    /// Insert `text` at `offset`, after earlier inserts there.
    pub fn insert(&mut self, id: NodeId, offset: usize, text: &str) -> PatchResult<()> {
        self.ensure_editable(id, Span::empty_at(offset))?;
        self.editor.append_left(offset, text)?;
        Ok(())
    }

    /// Insert `text` at `offset`, attached to the character after it.
    pub fn insert_right(&mut self, id: NodeId, offset: usize, text: &str) -> PatchResult<()> {
        self.ensure_editable(id, Span::empty_at(offset))?;
        self.editor.append_right(offset, text)?;
        Ok(())
    }

    /// Insert `text` at `offset`, before everything inserted there so far.
    pub fn prepend(&mut self, id: NodeId, offset: usize, text: &str) -> PatchResult<()> {
        self.ensure_editable(id, Span::empty_at(offset))?;
        self.editor.prepend_left(offset, text)?;
        Ok(())
    }

    pub fn overwrite(&mut self, id: NodeId, start: usize, end: usize, text: &str) -> PatchResult<()> {
        self.ensure_editable(id, Span::new(start, end))?;
        self.editor.overwrite(start, end, text)?;
        Ok(())
    }

    /// Remove `[start, end)`; an empty range is a no-op.
    pub fn remove(&mut self, id: NodeId, start: usize, end: usize) -> PatchResult<()> {
        if start >= end {
            return Ok(());
        }
        self.ensure_editable(id, Span::new(start, end))?;
        self.editor.remove(start, end)?;
        Ok(())
    }

    /// Move `[start, end)` to `dest`.
    pub fn move_range(&mut self, id: NodeId, start: usize, end: usize, dest: usize) -> PatchResult<()> {
        self.ensure_editable(id, Span::new(start, end))?;
        self.ensure_editable(id, Span::empty_at(dest))?;
        self.editor.move_range(start, end, dest)?;
        Ok(())
    }

    pub fn mark(&self) -> EditMark {
        self.editor.mark()
    }

    /// Current rendering of `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> PatchResult<String> {
        Ok(self.editor.slice(start, end)?)
    }

    /// Current rendering of `[start, end)` including boundary inserts made
    /// since `mark`.
    pub fn slice_since(&self, start: usize, end: usize, mark: EditMark) -> PatchResult<String> {
        Ok(self.editor.slice_since(start, end, mark)?)
    }

    /// Replace everything rendered for `[start, end)` since `mark`.
    pub fn overwrite_since(
        &mut self,
        id: NodeId,
        start: usize,
        end: usize,
        text: &str,
        mark: EditMark,
    ) -> PatchResult<()> {
        self.ensure_editable(id, Span::new(start, end))?;
        self.editor.overwrite_since(start, end, text, mark)?;
        Ok(())
    }

    /// Rendering of the node's outer range since `mark`.
    pub fn capture(&self, id: NodeId, mark: EditMark) -> PatchResult<String> {
        let outer = self.outer(id);
        self.slice_since(outer.start, outer.end, mark)
    }

    /// Replace the node's outer rendering since `mark` with `text`.
    pub fn replace_since(&mut self, id: NodeId, text: &str, mark: EditMark) -> PatchResult<()> {
        let outer = self.outer(id);
        self.overwrite_since(id, outer.start, outer.end, text, mark)
    }

    /// Widen the outer range of `id` and its ancestors to cover `span`.
    pub(crate) fn ensure_editable(&mut self, id: NodeId, span: Span) -> PatchResult<()> {
        if span.end > self.source.len() {
            return Err(PatchError::internal(format!(
                "edit at {} is outside the source (length {})",
                span,
                self.source.len()
            )));
        }
        let outer = self.outer(id);
        if outer.contains(&span) {
            return Ok(());
        }
        self.check_editing_bounds(id, span)?;
        let widened = outer.cover(&span);
        tracing::trace!(node = id.0, from = %outer, to = %widened, "widening editable range");
        let mut current = Some(id);
        while let Some(node) = current {
            let bounds = &mut self.node_mut(node).bounds;
            if bounds.outer.contains(&widened) {
                break;
            }
            bounds.outer = bounds.outer.cover(&widened);
            current = self.tree.parent(node);
        }
        Ok(())
    }

    /// Reject an edit by `id` landing inside a sibling of `id` or of one of
    /// its ancestors, up to the first ancestor whose outer range holds it.
    fn check_editing_bounds(&self, id: NodeId, span: Span) -> PatchResult<()> {
        let mut from = id;
        let mut current = self.tree.parent(id);
        while let Some(ancestor) = current {
            let owns_parent = from == id && self.edits_whole_parent(id);
            if !owns_parent {
                for sibling in self.tree.children(ancestor) {
                    if sibling != from && intrudes(span, self.content(sibling)) {
                        return Err(PatchError::internal(format!(
                            "{} at {} cannot edit {}, which belongs to a {} at {}",
                            self.kind(id).name(),
                            self.content(id),
                            span,
                            self.kind(sibling).name(),
                            self.content(sibling)
                        )));
                    }
                }
            }
            if self.outer(ancestor).contains(&span) {
                break;
            }
            from = ancestor;
            current = self.tree.parent(ancestor);
        }
        Ok(())
    }

    fn edits_whole_parent(&self, id: NodeId) -> bool {
        matches!(self.role(id), Role::Method { .. } | Role::Constructor)
    }
}

/// `span` reaches into `other`: an insert strictly inside it, or a replaced
/// range sharing any byte with it.
fn intrudes(span: Span, other: Span) -> bool {
    if span.is_empty() {
        other.start < span.start && span.start < other.end
    } else {
        span.overlaps(&other)
    }
}
