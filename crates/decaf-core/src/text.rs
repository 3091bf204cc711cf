//! Text position utilities.
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count Unicode scalar values, not bytes
//!
//! The line helpers (`line_start`, `line_end`, `indentation_at`, ...) work on
//! byte offsets and are what the patching stages use to lay out inserted
//! braces and statements.

use crate::patch::Span;

// ============================================================================
// Offset <-> Position
// ============================================================================

/// Convert a byte offset to 1-indexed line and column.
///
/// If `offset` exceeds the content length, returns the position at the end
/// of the content.
pub fn byte_offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;

    for (i, ch) in content.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Convert 1-indexed line and column to a byte offset.
///
/// Line/column values of 0 are treated as 1. A column past the end of its
/// line clamps to the line end; a line past the end of the content returns
/// the content length.
pub fn position_to_byte_offset(content: &str, line: u32, col: u32) -> usize {
    let line = line.max(1);
    let col = col.max(1);

    let Some(start) = line_start_offset(content, line) else {
        return content.len();
    };
    let mut remaining = col - 1;
    for (i, ch) in content[start..].char_indices() {
        if remaining == 0 || ch == '\n' {
            return start + i;
        }
        remaining -= 1;
    }
    content.len()
}

/// Byte offset at which 1-indexed `line` begins.
pub fn line_start_offset(content: &str, line: u32) -> Option<usize> {
    if line <= 1 {
        return Some(0);
    }
    let mut current = 1u32;
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            current += 1;
            if current == line {
                return Some(i + 1);
            }
        }
    }
    None
}

/// Number of lines in the content (a trailing newline does not start a new line).
pub fn line_count(content: &str) -> u32 {
    if content.is_empty() {
        return 0;
    }
    let newlines = content.bytes().filter(|&b| b == b'\n').count() as u32;
    if content.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// 1-indexed line range covered by `span`.
pub fn span_to_line_range(content: &str, span: &Span) -> (u32, u32) {
    let (start_line, _) = byte_offset_to_position(content, span.start);
    let (end_line, _) = byte_offset_to_position(content, span.end);
    (start_line, end_line)
}

// ============================================================================
// Line Layout
// ============================================================================

/// Byte offset of the start of the line containing `offset`.
pub fn line_start(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content.as_bytes()[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0)
}

/// Byte offset of the newline ending the line containing `offset` (or the
/// content length on the last line).
pub fn line_end(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content.as_bytes()[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| offset + p)
        .unwrap_or(content.len())
}

/// Leading whitespace of the line containing `offset`.
pub fn indentation_at(content: &str, offset: usize) -> &str {
    let start = line_start(content, offset);
    let rest = &content[start..];
    let width = rest
        .bytes()
        .take_while(|&b| b == b' ' || b == b'\t')
        .count();
    &rest[..width]
}

/// True when only indentation precedes `offset` on its line.
pub fn is_first_on_line(content: &str, offset: usize) -> bool {
    let start = line_start(content, offset);
    content[start..offset.min(content.len())]
        .bytes()
        .all(|b| b == b' ' || b == b'\t')
}

/// True when `a` and `b` are on the same line.
pub fn same_line(content: &str, a: usize, b: usize) -> bool {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    !content.as_bytes()[lo.min(content.len())..hi.min(content.len())].contains(&b'\n')
}

/// The indentation step used by the content: the leading whitespace of the
/// first indented line, or two spaces when nothing is indented.
pub fn detect_indent_unit(content: &str) -> String {
    for line in content.lines() {
        let width = line
            .bytes()
            .take_while(|&b| b == b' ' || b == b'\t')
            .count();
        if width > 0 && width < line.len() {
            return line[..width].to_string();
        }
    }
    "  ".to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod positions {
        use super::*;

        #[test]
        fn offset_to_position_first_line() {
            assert_eq!(byte_offset_to_position("abc\ndef", 0), (1, 1));
            assert_eq!(byte_offset_to_position("abc\ndef", 2), (1, 3));
        }

        #[test]
        fn offset_to_position_after_newline() {
            assert_eq!(byte_offset_to_position("abc\ndef", 4), (2, 1));
            assert_eq!(byte_offset_to_position("abc\ndef", 6), (2, 3));
        }

        #[test]
        fn offset_to_position_counts_chars() {
            let content = "é = 1";
            assert_eq!(byte_offset_to_position(content, 2), (1, 2));
        }

        #[test]
        fn offset_past_end_clamps() {
            assert_eq!(byte_offset_to_position("ab", 50), (1, 3));
        }

        #[test]
        fn position_round_trip() {
            let content = "one\ntwo\nthree";
            for offset in [0, 2, 4, 7, 8, 12] {
                let (line, col) = byte_offset_to_position(content, offset);
                assert_eq!(position_to_byte_offset(content, line, col), offset);
            }
        }

        #[test]
        fn position_clamps_column_to_line_end() {
            assert_eq!(position_to_byte_offset("ab\ncd", 1, 40), 2);
            assert_eq!(position_to_byte_offset("ab\ncd", 9, 1), 5);
        }

        #[test]
        fn line_counting() {
            assert_eq!(line_count(""), 0);
            assert_eq!(line_count("a"), 1);
            assert_eq!(line_count("a\n"), 1);
            assert_eq!(line_count("a\nb"), 2);
            assert_eq!(line_start_offset("a\nbc\nd", 3), Some(5));
            assert_eq!(line_start_offset("a", 4), None);
        }

        #[test]
        fn span_lines() {
            let content = "a\nb\nc";
            assert_eq!(span_to_line_range(content, &Span::new(0, 3)), (1, 2));
        }
    }

    mod layout {
        use super::*;

        #[test]
        fn line_bounds() {
            let content = "x = 1\n  y = 2\nz";
            assert_eq!(line_start(content, 9), 6);
            assert_eq!(line_end(content, 9), 13);
            assert_eq!(line_end(content, 14), 15);
        }

        #[test]
        fn indentation_of_line() {
            let content = "if a\n    b\n";
            assert_eq!(indentation_at(content, 9), "    ");
            assert_eq!(indentation_at(content, 1), "");
        }

        #[test]
        fn first_on_line() {
            let content = "a\n  else";
            assert!(is_first_on_line(content, 4));
            assert!(!is_first_on_line(content, 5));
        }

        #[test]
        fn same_line_checks_newlines_between() {
            let content = "a b\nc";
            assert!(same_line(content, 0, 2));
            assert!(!same_line(content, 2, 4));
            assert!(!same_line(content, 4, 2));
        }

        #[test]
        fn indent_unit_detection() {
            assert_eq!(detect_indent_unit("a\n    b\n"), "    ");
            assert_eq!(detect_indent_unit("a\n\tb\n"), "\t");
            assert_eq!(detect_indent_unit("a\nb\n"), "  ");
            assert_eq!(detect_indent_unit("a\n   \nb"), "  ");
        }
    }
}
