//! Overlay editing of an immutable source string.
//!
//! [`SourceEditor`] records edits against *original* byte offsets and only
//! materializes text when asked (`render`, `slice`). Offsets never shift as
//! edits accumulate, so independent patchers can address the source they
//! parsed without coordinating with each other.
//!
//! # Edit Primitives
//!
//! | Primitive | Description |
//! |-----------|-------------|
//! | `append_left(o, text)` | Attach text to the end of the text before `o`, after earlier left inserts |
//! | `prepend_left(o, text)` | Attach text to the end of the text before `o`, before earlier left inserts |
//! | `append_right(o, text)` | Attach text to the start of the text at `o`, after earlier right inserts |
//! | `prepend_right(o, text)` | Attach text to the start of the text at `o`, before earlier right inserts |
//! | `overwrite(s, e, text)` | Replace `[s, e)`; interior inserts are dropped, boundary inserts survive |
//! | `remove(s, e)` | `overwrite(s, e, "")` |
//! | `move_range(s, e, dest)` | Emit `[s, e)` at `dest` instead of its original place |
//! | `overwrite_since(s, e, text, mark)` | Replace `[s, e)` and every insert a `slice_since(s, e, mark)` would return |
//!
//! At any boundary `o` the rendered order is: left inserts, content moved to
//! `o`, right inserts, then the original character at `o`.
//!
//! Inserts made at a moved range's start after the move was registered travel
//! with the moved text, so a patcher may move a node first and patch it after.
//!
//! # Example
//!
//! ```
//! use decaf_core::editor::SourceEditor;
//!
//! let mut editor = SourceEditor::new("a is b");
//! editor.overwrite(2, 4, "===").unwrap();
//! editor.append_left(6, ";").unwrap();
//! assert_eq!(editor.render(), "a === b;");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::patch::Span;

/// Which neighbouring text an insertion sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Sticks to the text ending at the offset.
    Left,
    /// Sticks to the text starting at the offset.
    Right,
}

/// Position in the edit history, used to select edits made after a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EditMark(u64);

/// Errors raised by the overlay buffer.
///
/// These indicate a patcher asked for something the buffer cannot express,
/// which is a bug in the caller rather than a property of the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("offset {offset} is outside the source (length {len})")]
    OutOfBounds { offset: usize, len: usize },

    #[error("offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },

    #[error("range [{start}, {end}) is empty or inverted")]
    InvalidRange { start: usize, end: usize },

    #[error("edit at {offset} falls inside already replaced range {existing}")]
    InsideReplaced { offset: usize, existing: Span },

    #[error("range {span} splits already replaced range {existing}")]
    SplitsReplaced { span: Span, existing: Span },

    #[error("cannot move {span} to {dest}, which lies inside it")]
    MoveIntoSelf { span: Span, dest: usize },

    #[error("range {span} conflicts with moved range {existing}")]
    ConflictsWithMove { span: Span, existing: Span },
}

/// Result type for editor operations.
pub type EditResult<T> = Result<T, EditError>;

#[derive(Debug, Clone)]
struct Insertion {
    side: Side,
    /// Sort key within a side: prepends are negative and most recent first.
    key: i64,
    seq: u64,
    text: String,
}

#[derive(Debug, Clone)]
struct Replacement {
    end: usize,
    text: String,
}

#[derive(Debug, Clone, Copy)]
struct Move {
    start: usize,
    end: usize,
    dest: usize,
    seq: u64,
}

/// Overlay editor over a borrowed source string.
#[derive(Debug, Clone)]
pub struct SourceEditor<'src> {
    source: &'src str,
    insertions: BTreeMap<usize, Vec<Insertion>>,
    replacements: BTreeMap<usize, Replacement>,
    moves: Vec<Move>,
    seq: u64,
}

impl<'src> SourceEditor<'src> {
    pub fn new(source: &'src str) -> Self {
        SourceEditor {
            source,
            insertions: BTreeMap::new(),
            replacements: BTreeMap::new(),
            moves: Vec::new(),
            seq: 0,
        }
    }

    /// The original, unedited source.
    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Mark the current point in the edit history.
    pub fn mark(&self) -> EditMark {
        EditMark(self.seq)
    }

    /// Number of edits recorded so far.
    pub fn edit_count(&self) -> u64 {
        self.seq
    }

    // ========================================================================
    // Insertions
    // ========================================================================

    /// Insert text at `offset`, after anything already attached to the left.
    ///
    /// This is the default insertion used by patchers.
    pub fn append_left(&mut self, offset: usize, text: &str) -> EditResult<()> {
        self.insert(offset, Side::Left, false, text)
    }

    pub fn prepend_left(&mut self, offset: usize, text: &str) -> EditResult<()> {
        self.insert(offset, Side::Left, true, text)
    }

    pub fn append_right(&mut self, offset: usize, text: &str) -> EditResult<()> {
        self.insert(offset, Side::Right, false, text)
    }

    pub fn prepend_right(&mut self, offset: usize, text: &str) -> EditResult<()> {
        self.insert(offset, Side::Right, true, text)
    }

    fn insert(&mut self, offset: usize, side: Side, prepend: bool, text: &str) -> EditResult<()> {
        self.check_offset(offset)?;
        if let Some(existing) = self.replaced_strictly_containing(offset) {
            return Err(EditError::InsideReplaced { offset, existing });
        }
        if text.is_empty() {
            return Ok(());
        }
        let seq = self.next_seq();
        let key = if prepend { -(seq as i64) } else { seq as i64 };
        self.insertions.entry(offset).or_default().push(Insertion {
            side,
            key,
            seq,
            text: text.to_string(),
        });
        Ok(())
    }

    // ========================================================================
    // Replacements
    // ========================================================================

    /// Replace `[start, end)` with `text`.
    ///
    /// A replacement that fully contains earlier replacements supersedes
    /// them; one that only partially overlaps an earlier replacement fails.
    pub fn overwrite(&mut self, start: usize, end: usize, text: &str) -> EditResult<()> {
        self.check_range(start, end)?;
        let span = Span::new(start, end);

        let mut superseded = Vec::new();
        for (&rs, rep) in self.replacements.range(..end) {
            let existing = Span::new(rs, rep.end);
            if !existing.overlaps(&span) {
                continue;
            }
            if span.contains(&existing) {
                superseded.push(rs);
            } else {
                return Err(EditError::SplitsReplaced { span, existing });
            }
        }
        for mv in &self.moves {
            let existing = Span::new(mv.start, mv.end);
            let dest_inside = start < mv.dest && mv.dest < end;
            if dest_inside || (existing.overlaps(&span) && !existing.contains(&span)) {
                return Err(EditError::ConflictsWithMove { span, existing });
            }
        }

        for rs in superseded {
            self.replacements.remove(&rs);
        }
        self.next_seq();
        self.replacements.insert(
            start,
            Replacement {
                end,
                text: text.to_string(),
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, start: usize, end: usize) -> EditResult<()> {
        self.overwrite(start, end, "")
    }

    /// Replace `[start, end)` together with the boundary inserts that
    /// [`slice_since`](Self::slice_since) with the same mark would include.
    ///
    /// Pairs with `slice_since` to capture a patched region and emit it again
    /// in a different shape: inserts on the inward side of either boundary
    /// and outward ones made since `since` are dropped, older outward ones
    /// are kept.
    pub fn overwrite_since(
        &mut self,
        start: usize,
        end: usize,
        text: &str,
        since: EditMark,
    ) -> EditResult<()> {
        self.overwrite(start, end, text)?;
        for (&offset, list) in self.insertions.range_mut(start..=end) {
            list.retain(|ins| {
                let recent = ins.seq >= since.0;
                if offset == start {
                    ins.side == Side::Left && !recent
                } else if offset == end {
                    ins.side == Side::Right && !recent
                } else {
                    false
                }
            });
        }
        Ok(())
    }

    // ========================================================================
    // Moves
    // ========================================================================

    /// Relocate `[start, end)` so it is emitted at `dest`.
    ///
    /// Right inserts at `start`, left inserts at `end` and left inserts at
    /// `start` made after this call travel with the moved text. At `dest` the
    /// moved text follows dest's left inserts and precedes its right inserts.
    ///
    /// A move may nest inside an earlier one (or enclose it) when the inner
    /// destination also lies inside the outer range or at its end.
    pub fn move_range(&mut self, start: usize, end: usize, dest: usize) -> EditResult<()> {
        self.check_range(start, end)?;
        self.check_offset(dest)?;
        let span = Span::new(start, end);
        if start < dest && dest < end {
            return Err(EditError::MoveIntoSelf { span, dest });
        }
        for boundary in [start, end] {
            if let Some(existing) = self.replaced_strictly_containing(boundary) {
                return Err(EditError::SplitsReplaced { span, existing });
            }
        }
        if let Some(existing) = self.replaced_strictly_containing(dest) {
            return Err(EditError::InsideReplaced {
                offset: dest,
                existing,
            });
        }
        for mv in &self.moves {
            let existing = Span::new(mv.start, mv.end);
            let nested = existing != span
                && existing.contains(&span)
                && mv.start < dest
                && dest <= mv.end;
            let encloses = existing != span
                && span.contains(&existing)
                && start < mv.dest
                && mv.dest <= end;
            if nested || encloses {
                continue;
            }
            if existing.overlaps(&span) || (mv.start < dest && dest < mv.end) {
                return Err(EditError::ConflictsWithMove { span, existing });
            }
        }
        let seq = self.next_seq();
        self.moves.push(Move {
            start,
            end,
            dest,
            seq,
        });
        Ok(())
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    /// The fully edited text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.source.len() + 64);
        self.emit_boundary(&mut out, 0);
        self.emit_span(&mut out, 0, self.source.len(), None);
        if !self.source.is_empty() {
            self.emit_boundary(&mut out, self.source.len());
        }
        out
    }

    /// Edited text of `[start, end)`: right inserts at `start`, the edited
    /// interior, and left inserts at `end`.
    pub fn slice(&self, start: usize, end: usize) -> EditResult<String> {
        self.slice_with(start, end, None)
    }

    /// Like [`slice`](Self::slice), but also includes boundary inserts on the
    /// outward side that were made at or after `since`.
    ///
    /// Used to read back exactly what a patcher produced for its own range,
    /// including prefixes it attached at its start.
    pub fn slice_since(&self, start: usize, end: usize, since: EditMark) -> EditResult<String> {
        self.slice_with(start, end, Some(since))
    }

    fn slice_with(&self, start: usize, end: usize, since: Option<EditMark>) -> EditResult<String> {
        self.check_offset(start)?;
        self.check_offset(end)?;
        if start > end {
            return Err(EditError::InvalidRange { start, end });
        }
        let recent = |ins: &Insertion| since.is_some_and(|mark| ins.seq >= mark.0);
        let mut out = String::new();
        self.emit_side(&mut out, start, Side::Left, recent);
        self.emit_side(&mut out, start, Side::Right, |_| true);
        if start < end {
            self.emit_span(&mut out, start, end, None);
            self.emit_side(&mut out, end, Side::Left, |_| true);
            self.emit_side(&mut out, end, Side::Right, recent);
        }
        Ok(out)
    }

    fn emit_side(
        &self,
        out: &mut String,
        offset: usize,
        side: Side,
        keep: impl Fn(&Insertion) -> bool,
    ) {
        let Some(list) = self.insertions.get(&offset) else {
            return;
        };
        let mut items: Vec<&Insertion> = list
            .iter()
            .filter(|ins| ins.side == side && keep(ins))
            .collect();
        items.sort_by_key(|ins| ins.key);
        for ins in items {
            out.push_str(&ins.text);
        }
    }

    /// Index of the move that carries a left insert at `offset`: the latest
    /// move starting there that was registered before the insert.
    fn carrier(&self, offset: usize, ins: &Insertion) -> Option<usize> {
        self.moves
            .iter()
            .enumerate()
            .filter(|(_, mv)| mv.start == offset && mv.seq < ins.seq)
            .max_by_key(|(_, mv)| mv.seq)
            .map(|(index, _)| index)
    }

    fn emit_boundary(&self, out: &mut String, offset: usize) {
        let move_end = self.moves.iter().any(|mv| mv.end == offset);
        let move_start = self.moves.iter().any(|mv| mv.start == offset);
        if !move_end {
            self.emit_side(out, offset, Side::Left, |ins| {
                self.carrier(offset, ins).is_none()
            });
        }
        for (index, mv) in self.moves.iter().enumerate() {
            if mv.dest == offset && self.enclosing_ending_at_dest(index).is_none() {
                self.emit_moved(out, index);
            }
        }
        if !move_start {
            self.emit_side(out, offset, Side::Right, |_| true);
        }
    }

    fn emit_moved(&self, out: &mut String, index: usize) {
        let mv = self.moves[index];
        self.emit_side(out, mv.start, Side::Left, |ins| {
            self.carrier(mv.start, ins) == Some(index)
        });
        self.emit_side(out, mv.start, Side::Right, |_| true);
        self.emit_span(out, mv.start, mv.end, Some(index));
        self.emit_side(out, mv.end, Side::Left, |_| true);
        for inner in 0..self.moves.len() {
            if self.enclosing_ending_at_dest(inner) == Some(index) {
                self.emit_moved(out, inner);
            }
        }
    }

    /// The move enclosing move `index` whose end is that move's destination.
    /// Such a nested move is emitted as the tail of the enclosing chunk.
    fn enclosing_ending_at_dest(&self, index: usize) -> Option<usize> {
        let mv = self.moves[index];
        self.moves.iter().position(|outer| {
            outer.end == mv.dest
                && outer.start <= mv.start
                && mv.end <= outer.end
                && (outer.start, outer.end) != (mv.start, mv.end)
        })
    }

    /// Emit `[from, to)` without the boundary inserts at `from` and `to`.
    ///
    /// `moving` is the move whose chunk is being emitted at its destination;
    /// every other move starting inside the range is skipped.
    fn emit_span(&self, out: &mut String, from: usize, to: usize, moving: Option<usize>) {
        let mut pos = from;
        if let Some((_, rep)) = self.replacements.range(..from).next_back() {
            if rep.end > from {
                pos = rep.end;
            }
        }
        while pos < to {
            if pos > from {
                self.emit_boundary(out, pos);
            }
            let skipped = self
                .moves
                .iter()
                .enumerate()
                .find(|(index, mv)| mv.start == pos && Some(*index) != moving && mv.end <= to);
            if let Some((_, mv)) = skipped {
                pos = mv.end;
                continue;
            }
            if let Some(rep) = self.replacements.get(&pos) {
                out.push_str(&rep.text);
                pos = rep.end;
                continue;
            }
            let next = self.next_event_after(pos).min(to);
            out.push_str(&self.source[pos..next]);
            pos = next;
        }
    }

    fn next_event_after(&self, pos: usize) -> usize {
        let mut next = self.source.len();
        if let Some((&o, _)) = self.insertions.range(pos + 1..).next() {
            next = next.min(o);
        }
        if let Some((&o, _)) = self.replacements.range(pos + 1..).next() {
            next = next.min(o);
        }
        for mv in &self.moves {
            for o in [mv.start, mv.end, mv.dest] {
                if o > pos {
                    next = next.min(o);
                }
            }
        }
        next
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn check_offset(&self, offset: usize) -> EditResult<()> {
        if offset > self.source.len() {
            return Err(EditError::OutOfBounds {
                offset,
                len: self.source.len(),
            });
        }
        if !self.source.is_char_boundary(offset) {
            return Err(EditError::NotCharBoundary { offset });
        }
        Ok(())
    }

    fn check_range(&self, start: usize, end: usize) -> EditResult<()> {
        self.check_offset(start)?;
        self.check_offset(end)?;
        if start >= end {
            return Err(EditError::InvalidRange { start, end });
        }
        Ok(())
    }

    fn replaced_strictly_containing(&self, offset: usize) -> Option<Span> {
        let (&rs, rep) = self.replacements.range(..offset).next_back()?;
        (rep.end > offset).then(|| Span::new(rs, rep.end))
    }
}

impl fmt::Display for SourceEditor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// ============================================================================
// Tests
// ============================================================================
