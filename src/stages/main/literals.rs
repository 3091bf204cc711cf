//! Literals: strings, templates, booleans, `@`, arrays, objects, ranges and
//! spreads.

use decaf_coffee::{NodeId, NodeKind};

use crate::error::PatchResult;
use crate::helpers::Helper;
use crate::patcher::Patcher;

/// Longest range literal written out element by element.
const MAX_INLINE_RANGE: i64 = 20;

impl Patcher<'_> {
    /// A multi-line string joins its lines with a single space.
    pub(crate) fn patch_string(&mut self, id: NodeId) -> PatchResult<()> {
        let content = self.content(id);
        self.fold_lines(id, content.start + 1, content.end - 1)
    }

    /// `"a#{b}c"` becomes `` `a${b}c` ``.
    pub(crate) fn patch_template(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a string"));
        };
        let content = self.content(id);
        self.overwrite(id, content.start, content.start + 1, "`")?;
        self.overwrite(id, content.end - 1, content.end, "`")?;
        for (i, &quasi) in quasis.iter().enumerate() {
            let span = self.content(quasi);
            self.escape_template_text(id, span.start, span.end)?;
            self.fold_lines(id, span.start, span.end)?;
            if let Some(&expression) = expressions.get(i) {
                self.overwrite(id, span.end, span.end + 2, "${")?;
                self.patch_expression(expression)?;
            }
        }
        Ok(())
    }

    fn escape_template_text(&mut self, id: NodeId, start: usize, end: usize) -> PatchResult<()> {
        let source = self.source;
        let bytes = source.as_bytes();
        let mut i = start;
        while i < end {
            match bytes[i] {
                b'\\' => i += 1,
                b'`' => self.insert(id, i, "\\")?,
                b'$' if bytes.get(i + 1) == Some(&b'{') => self.insert(id, i, "\\")?,
                _ => {}
            }
            i += 1;
        }
        Ok(())
    }

    /// Replace each line break in `[start, end)`, with the indentation
    /// around it, by one space. Breaks at either end of a string vanish.
    fn fold_lines(&mut self, id: NodeId, start: usize, end: usize) -> PatchResult<()> {
        let source = self.source;
        if !source[start..end].contains('\n') {
            return Ok(());
        }
        let bytes = source.as_bytes();
        let (outer_start, outer_end) = self.string_bounds(id);
        let mut i = start;
        while i < end {
            if bytes[i] != b'\n' {
                i += 1;
                continue;
            }
            let mut from = i;
            while from > start && matches!(bytes[from - 1], b' ' | b'\t') {
                from -= 1;
            }
            let mut to = i + 1;
            while to < end && matches!(bytes[to], b' ' | b'\t' | b'\n' | b'\r') {
                to += 1;
            }
            let edge = from <= outer_start || to >= outer_end;
            self.overwrite(id, from, to, if edge { "" } else { " " })?;
            i = to;
        }
        Ok(())
    }

    /// Offsets just inside the quotes of the string literal `id`.
    fn string_bounds(&self, id: NodeId) -> (usize, usize) {
        let content = self.content(id);
        (content.start + 1, content.end - 1)
    }

    pub(crate) fn patch_bool(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Bool { value } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "a boolean"));
        };
        let text = if *value { "true" } else { "false" };
        if self.node_text(id) != text {
            let span = self.content(id);
            self.overwrite(id, span.start, span.end, text)?;
        }
        Ok(())
    }

    pub(crate) fn patch_this(&mut self, id: NodeId) -> PatchResult<()> {
        if let NodeKind::This { shorthand: true } = self.kind(id) {
            let span = self.content(id);
            self.overwrite(id, span.start, span.end, "this")?;
        }
        Ok(())
    }

    pub(crate) fn patch_array(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Array { members } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "an array"));
        };
        self.patch_arguments(id, members)
    }

    pub(crate) fn patch_object(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Object { members, implicit } = self.kind(id) else {
            return Err(self.unexpected_kind(id, "an object"));
        };
        if *implicit {
            let content = self.content(id);
            self.insert(id, content.start, "{")?;
            self.insert(id, content.end, "}")?;
        }
        for &member in members {
            self.patch_object_member(member)?;
        }
        self.insert_missing_commas(id, members)
    }

    fn patch_object_member(&mut self, member: NodeId) -> PatchResult<()> {
        let NodeKind::ObjectMember { key, value } = self.kind(member) else {
            return Err(self.unexpected_kind(member, "an object member"));
        };
        let key = *key;
        let NodeKind::MemberAccess {
            member: name,
            member_span,
            ..
        } = self.kind(key)
        else {
            return self.patch_opt_expression(*value);
        };
        let start = self.content(key).start;
        match value {
            // `{@a}`
            None => self.overwrite(member, start, member_span.end, &format!("{0}: this.{0}", name)),
            // `@a: 1`
            Some(value) => {
                self.remove(member, start, member_span.start)?;
                self.patch_expression(*value)
            }
        }
    }

    /// `[a..b]` becomes a literal array when short, `__range__(a, b, true)`
    /// otherwise.
    pub(crate) fn patch_range(&mut self, id: NodeId) -> PatchResult<()> {
        let NodeKind::Range {
            left,
            right,
            inclusive,
        } = self.kind(id)
        else {
            return Err(self.unexpected_kind(id, "a range"));
        };
        let (left, right, inclusive) = (*left, *right, *inclusive);
        let content = self.content(id);
        if let (Some(a), Some(b)) = (self.int_literal(left), self.int_literal(right)) {
            if (b - a).abs() <= MAX_INLINE_RANGE {
                let text = format!("[{}]", range_values(a, b, inclusive).join(", "));
                return self.overwrite(id, content.start, content.end, &text);
            }
        }
        let mark = self.mark();
        self.patch_expression(left)?;
        let left_text = self.capture(left, mark)?;
        self.patch_expression(right)?;
        let right_text = self.capture(right, mark)?;
        let helper = self.register_helper(Helper::Range);
        let text = format!("{}({}, {}, {})", helper, left_text, right_text, inclusive);
        self.overwrite_since(id, content.start, content.end, &text, mark)
    }

    /// `a...` becomes `...a`.
    pub(crate) fn patch_spread(&mut self, id: NodeId) -> PatchResult<()> {
        let (NodeKind::Spread { expression } | NodeKind::Rest { expression }) = self.kind(id) else {
            return Err(self.unexpected_kind(id, "a spread"));
        };
        let expression = *expression;
        let content = self.content(id);
        if !self.source[content.start..content.end].starts_with("...") {
            self.insert(id, content.start, "...")?;
            self.remove(id, content.end - 3, content.end)?;
        }
        self.patch_expression(expression)
    }
}

/// Values of a literal range, in the direction from `a` to `b`.
fn range_values(a: i64, b: i64, inclusive: bool) -> Vec<String> {
    let values: Vec<i64> = match (a <= b, inclusive) {
        (true, true) => (a..=b).collect(),
        (true, false) => (a..b).collect(),
        (false, true) => (b..=a).rev().collect(),
        (false, false) => (b + 1..=a).rev().collect(),
    };
    values.iter().map(i64::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConvertOptions;

    fn main_stage(source: &str) -> String {
        let parsed = decaf_coffee::parse(source).unwrap();
        let options = ConvertOptions::default();
        let mut p = Patcher::new(source, &parsed, &options);
        p.patch_program().unwrap();
        let code = p.render();
        if p.helpers.is_empty() {
            code
        } else {
            format!("{}\n{}", code, p.helpers.names().join(" "))
        }
    }

    mod strings {
        use super::*;

        #[test]
        fn interpolation_becomes_template() {
            assert_eq!(main_stage("x = \"a#{b}c\""), "let x = `a${b}c`;");
            assert_eq!(main_stage("x = \"`#{b}`\""), "let x = `\\`${b}\\``;");
        }

        #[test]
        fn multi_line_strings_fold() {
            assert_eq!(main_stage("x = 'a\n  b'"), "let x = 'a b';");
            assert_eq!(main_stage("x = '\n  a\n'"), "let x = 'a';");
        }

        #[test]
        fn plain_strings_are_kept() {
            assert_eq!(main_stage("x = 'a'"), "let x = 'a';");
            assert_eq!(main_stage("x = \"#a\""), "let x = \"#a\";");
        }
    }

    mod values {
        use super::*;

        #[test]
        fn boolean_aliases() {
            assert_eq!(main_stage("x = [yes, no, on, off]"), "let x = [true, false, true, false];");
        }

        #[test]
        fn this_shorthand() {
            assert_eq!(main_stage("f = -> @"), "let f = function() { return this; };");
            assert_eq!(main_stage("f = -> @a"), "let f = function() { return this.a; };");
        }

        #[test]
        fn multi_line_arrays_get_commas() {
            assert_eq!(main_stage("x = [\n  1\n  2\n]"), "let x = [\n  1,\n  2\n];");
        }

        #[test]
        fn spreads_move_their_dots() {
            assert_eq!(main_stage("f(a...)"), "f(...a);");
            assert_eq!(main_stage("f(...a)"), "f(...a);");
        }
    }

    mod objects {
        use super::*;

        #[test]
        fn this_keys_and_shorthands() {
            assert_eq!(
                main_stage("f = -> {@a, @b: 1}"),
                "let f = function() { return {a: this.a, b: 1}; };"
            );
        }

        #[test]
        fn multi_line_objects_get_commas() {
            assert_eq!(main_stage("x = {\n  a: 1\n  b: 2\n}"), "let x = {\n  a: 1,\n  b: 2\n};");
        }

        #[test]
        fn function_members_become_methods() {
            assert_eq!(main_stage("x = {a: (b) -> b}"), "let x = {a(b) { return b; }};");
        }
    }

    mod ranges {
        use super::*;

        #[test]
        fn short_literal_ranges_are_written_out() {
            assert_eq!(main_stage("x = [1..3]"), "let x = [1, 2, 3];");
            assert_eq!(main_stage("x = [1...3]"), "let x = [1, 2];");
            assert_eq!(main_stage("x = [3..1]"), "let x = [3, 2, 1];");
        }

        #[test]
        fn other_ranges_use_a_helper() {
            assert_eq!(main_stage("x = [a..b]"), "let x = __range__(a, b, true);\n__range__");
            assert_eq!(main_stage("x = [1...100]"), "let x = __range__(1, 100, false);\n__range__");
        }
    }

    #[test]
    fn descending_exclusive_range_values() {
        assert_eq!(range_values(3, 0, false), vec!["3", "2", "1"]);
        assert_eq!(range_values(0, 0, false), Vec::<String>::new());
    }
}
