//! Implicit returns.
//!
//! A CoffeeScript function returns its last expression, and a loop used as
//! a value collects each iteration's last expression. Both obligations are a
//! [`Tail`] handed to the last statement of a block. Expressions take it
//! directly (`return value;`, `result.push(value);`); conditionals, `switch`
//! and `try` pass it on to each of their branches; `return`, `throw`,
//! `break` and `continue` already leave the block and ignore it.

use decaf_coffee::{NodeId, NodeKind};

use super::Patcher;
use crate::error::PatchResult;
use crate::suggestions::Suggestion;

/// Where the value of a block's last statement goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tail {
    /// `return value;`
    Return,
    /// `name.push(value);`
    Push(String),
}

impl Tail {
    /// Statement handing a missing value to this tail, for branches that
    /// would otherwise produce nothing.
    pub fn fallback(&self) -> Option<String> {
        match self {
            Tail::Return => None,
            Tail::Push(name) => Some(format!("{}.push(undefined);", name)),
        }
    }
}

impl Patcher<'_> {
    /// Patch `id`, the last statement of a block, so its value reaches
    /// `tail`.
    pub fn patch_tail_statement(&mut self, id: NodeId, tail: Tail) -> PatchResult<()> {
        match self.kind(id) {
            NodeKind::Return { .. }
            | NodeKind::Throw { .. }
            | NodeKind::Break
            | NodeKind::Continue => self.patch_statement(id),
            NodeKind::Conditional { .. } | NodeKind::Switch { .. } | NodeKind::Try { .. } => {
                self.set_tail(id, Some(tail));
                self.patch_statement(id)
            }
            NodeKind::While { .. } | NodeKind::ForIn { .. } | NodeKind::ForOf { .. } => {
                if tail == Tail::Return {
                    self.record(Suggestion::ImplicitReturns);
                }
                self.patch_tail_value(id, &tail)
            }
            _ => self.patch_tail_value(id, &tail),
        }
    }

    fn patch_tail_value(&mut self, id: NodeId, tail: &Tail) -> PatchResult<()> {
        let start = self.outer(id).start;
        match tail {
            Tail::Return => self.insert(id, start, "return ")?,
            Tail::Push(name) => self.insert(id, start, &format!("{}.push(", name))?,
        }
        self.patch_expression(id)?;
        if let Tail::Push(_) = tail {
            let end = self.code_end(self.outer(id).end);
            self.insert(id, end, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_collecting_tails_need_a_fallback() {
        assert_eq!(Tail::Return.fallback(), None);
        assert_eq!(
            Tail::Push("result".to_string()).fallback().as_deref(),
            Some("result.push(undefined);")
        );
    }
}
