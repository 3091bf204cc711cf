//! Cleanup suggestions recorded while converting.
//!
//! Patchers record a [`Suggestion`] whenever they emit a shape a person
//! would likely want to tidy by hand. The log renders as a block comment at
//! the top of the output and as a list in `--json` responses.

use std::collections::BTreeSet;

use decaf_core::output::SuggestionInfo;

/// A cleanup suggestion with a stable code.
///
/// Variants are declared in code order, so sorting suggestions sorts codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suggestion {
    /// `Array.from` wrapped around a loop target.
    RemoveArrayFrom,
    /// Code produced only because the last expression is returned.
    ImplicitReturns,
    /// A value stored in a temporary inside an expression.
    InlineAssignments,
    /// `.includes` evaluates its operands right to left.
    IncludesOrder,
    /// An immediately invoked function expression.
    AvoidIife,
    /// A long-hand null check.
    ShorterNullChecks,
    /// `this` outside any function or class.
    TopLevelThis,
}

impl Suggestion {
    pub fn code(self) -> &'static str {
        match self {
            Suggestion::RemoveArrayFrom => "DS101",
            Suggestion::ImplicitReturns => "DS102",
            Suggestion::InlineAssignments => "DS104",
            Suggestion::IncludesOrder => "DS204",
            Suggestion::AvoidIife => "DS205",
            Suggestion::ShorterNullChecks => "DS207",
            Suggestion::TopLevelThis => "DS208",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Suggestion::RemoveArrayFrom => "Remove unnecessary use of Array.from",
            Suggestion::ImplicitReturns => {
                "Remove unnecessary code created because of implicit returns"
            }
            Suggestion::InlineAssignments => "Avoid inline assignments",
            Suggestion::IncludesOrder => {
                "Change includes calls to have a more natural evaluation order"
            }
            Suggestion::AvoidIife => "Consider reworking code to avoid use of IIFEs",
            Suggestion::ShorterNullChecks => "Consider shorter variations of null checks",
            Suggestion::TopLevelThis => "Avoid top-level this",
        }
    }

    pub fn info(self) -> SuggestionInfo {
        SuggestionInfo::new(self.code(), self.message())
    }
}

/// Suggestions recorded during one conversion, each at most once.
#[derive(Debug, Clone, Default)]
pub struct SuggestionLog {
    seen: BTreeSet<Suggestion>,
}

impl SuggestionLog {
    pub fn record(&mut self, suggestion: Suggestion) {
        if self.seen.insert(suggestion) {
            tracing::debug!(code = suggestion.code(), "recorded suggestion");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Recorded suggestions sorted by code.
    pub fn iter(&self) -> impl Iterator<Item = Suggestion> + '_ {
        self.seen.iter().copied()
    }

    pub fn infos(&self) -> Vec<SuggestionInfo> {
        self.iter().map(Suggestion::info).collect()
    }

    /// The leading block comment, or an empty string when nothing was
    /// recorded.
    pub fn render_comment(&self) -> String {
        if self.seen.is_empty() {
            return String::new();
        }
        let mut out = String::from("/*\n * decaf suggestions:\n");
        for suggestion in self.iter() {
            out.push_str(&format!(
                " * {}: {}\n",
                suggestion.code(),
                suggestion.message()
            ));
        }
        out.push_str(" */\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_renders_nothing() {
        let log = SuggestionLog::default();
        assert!(log.is_empty());
        assert_eq!(log.render_comment(), "");
    }

    #[test]
    fn suggestions_are_deduplicated_and_sorted_by_code() {
        let mut log = SuggestionLog::default();
        log.record(Suggestion::AvoidIife);
        log.record(Suggestion::RemoveArrayFrom);
        log.record(Suggestion::AvoidIife);
        let codes: Vec<&str> = log.iter().map(Suggestion::code).collect();
        assert_eq!(codes, vec!["DS101", "DS205"]);
    }

    #[test]
    fn comment_lists_codes_and_messages() {
        let mut log = SuggestionLog::default();
        log.record(Suggestion::ImplicitReturns);
        assert_eq!(
            log.render_comment(),
            "/*\n * decaf suggestions:\n * DS102: Remove unnecessary code created because of implicit returns\n */\n"
        );
    }

    #[test]
    fn infos_carry_code_and_message() {
        let mut log = SuggestionLog::default();
        log.record(Suggestion::TopLevelThis);
        let infos = log.infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].code, "DS208");
        assert_eq!(infos[0].message, "Avoid top-level this");
    }
}
