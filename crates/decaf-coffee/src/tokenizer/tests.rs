use super::{tokenize, TokenKind};

fn kinds_and_text(source: &str) -> Vec<(TokenKind, &str)> {
    tokenize(source)
        .expect("tokenizes")
        .into_iter()
        .map(|t| (t.kind, t.text(source)))
        .collect()
}

fn kinds(source: &str) -> Vec<TokenKind> {
    kinds_and_text(source).into_iter().map(|(k, _)| k).collect()
}

#[test]
fn test_identifiers_and_numbers() {
    assert_eq!(
        kinds_and_text("a = 1.5e3"),
        vec![
            (TokenKind::Identifier, "a"),
            (TokenKind::Assign, "="),
            (TokenKind::Number, "1.5e3"),
            (TokenKind::Newline, ""),
        ]
    );
    assert_eq!(
        kinds_and_text("0xFF"),
        vec![(TokenKind::Number, "0xFF"), (TokenKind::Newline, "")]
    );
}

#[test]
fn test_range_dots_are_not_decimal_points() {
    assert_eq!(
        kinds("[1..2]"),
        vec![
            TokenKind::LBracket,
            TokenKind::Number,
            TokenKind::Range,
            TokenKind::Number,
            TokenKind::RBracket,
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_newlines_only_after_content() {
    assert_eq!(
        kinds("a\n\n  \n# note\nb\n"),
        vec![
            TokenKind::Identifier,
            TokenKind::Newline,
            TokenKind::Comment,
            TokenKind::Identifier,
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_line_continuation() {
    assert_eq!(
        kinds("a = 1 + \\\n  2"),
        vec![
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Number,
            TokenKind::Operator,
            TokenKind::Number,
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_here_comment() {
    let source = "###\nblock\n###\na";
    let tokens = kinds_and_text(source);
    assert_eq!(tokens[0], (TokenKind::HereComment, "###\nblock\n###"));
    assert_eq!(tokens[1], (TokenKind::Identifier, "a"));
}

#[test]
fn test_call_and_grouping_parens() {
    assert_eq!(
        kinds("f(a) (b)"),
        vec![
            TokenKind::Identifier,
            TokenKind::CallStart,
            TokenKind::Identifier,
            TokenKind::CallEnd,
            TokenKind::LParen,
            TokenKind::Identifier,
            TokenKind::RParen,
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_index_and_array_brackets() {
    assert_eq!(
        kinds("a[0] [1]"),
        vec![
            TokenKind::Identifier,
            TokenKind::IndexStart,
            TokenKind::Number,
            TokenKind::IndexEnd,
            TokenKind::LBracket,
            TokenKind::Number,
            TokenKind::RBracket,
            TokenKind::Newline,
        ]
    );
    assert_eq!(
        kinds("@[0]")[..2],
        [TokenKind::At, TokenKind::IndexStart]
    );
}

#[test]
fn test_soak_operators() {
    assert_eq!(
        kinds("a?.b?[c]?(d)?::e"),
        vec![
            TokenKind::Identifier,
            TokenKind::SoakDot,
            TokenKind::Identifier,
            TokenKind::SoakIndexStart,
            TokenKind::Identifier,
            TokenKind::IndexEnd,
            TokenKind::SoakCallStart,
            TokenKind::Identifier,
            TokenKind::CallEnd,
            TokenKind::SoakProto,
            TokenKind::Identifier,
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_existence_versus_binary_question() {
    assert_eq!(
        kinds("a?")[..2],
        [TokenKind::Identifier, TokenKind::Existence]
    );
    assert_eq!(
        kinds("a ? b")[..3],
        [TokenKind::Identifier, TokenKind::Question, TokenKind::Identifier]
    );
    assert_eq!(
        kinds("f(a?)")[3],
        TokenKind::Existence
    );
}

#[test]
fn test_keywords_as_property_names() {
    assert_eq!(
        kinds_and_text("a.return @if"),
        vec![
            (TokenKind::Identifier, "a"),
            (TokenKind::Dot, "."),
            (TokenKind::Identifier, "return"),
            (TokenKind::At, "@"),
            (TokenKind::Identifier, "if"),
            (TokenKind::Newline, ""),
        ]
    );
    assert_eq!(kinds("{class: 1}")[1], TokenKind::Identifier);
}

#[test]
fn test_word_operators() {
    assert_eq!(
        kinds_and_text("a and not b or= c"),
        vec![
            (TokenKind::Identifier, "a"),
            (TokenKind::Operator, "and"),
            (TokenKind::Operator, "not"),
            (TokenKind::Identifier, "b"),
            (TokenKind::CompoundAssign, "or="),
            (TokenKind::Identifier, "c"),
            (TokenKind::Newline, ""),
        ]
    );
}

#[test]
fn test_contextual_keywords() {
    assert_eq!(kinds("for own k of o")[1], TokenKind::Own);
    assert_eq!(kinds("own = 1")[0], TokenKind::Identifier);
    assert_eq!(kinds("yield from g")[1], TokenKind::From);
    assert_eq!(kinds("from = 1")[0], TokenKind::Identifier);
}

#[test]
fn test_longest_punctuation_match() {
    assert_eq!(
        kinds_and_text("a >>>= b ** c ... ->"),
        vec![
            (TokenKind::Identifier, "a"),
            (TokenKind::CompoundAssign, ">>>="),
            (TokenKind::Identifier, "b"),
            (TokenKind::Operator, "**"),
            (TokenKind::Identifier, "c"),
            (TokenKind::Ellipsis, "..."),
            (TokenKind::Function, "->"),
            (TokenKind::Newline, ""),
        ]
    );
}

mod strings {
    use super::*;

    #[test]
    fn test_plain_strings() {
        assert_eq!(
            kinds_and_text(r#"'a' "b\"c""#),
            vec![
                (TokenKind::String, "'a'"),
                (TokenKind::String, r#""b\"c""#),
                (TokenKind::Newline, ""),
            ]
        );
    }

    #[test]
    fn test_single_quotes_do_not_interpolate() {
        assert_eq!(kinds("'#{a}'")[0], TokenKind::String);
    }

    #[test]
    fn test_interpolation() {
        assert_eq!(
            kinds_and_text(r#""a#{b}c""#),
            vec![
                (TokenKind::StringStart, "\""),
                (TokenKind::StringContent, "a"),
                (TokenKind::InterpolationStart, "#{"),
                (TokenKind::Identifier, "b"),
                (TokenKind::InterpolationEnd, "}"),
                (TokenKind::StringContent, "c"),
                (TokenKind::StringEnd, "\""),
                (TokenKind::Newline, ""),
            ]
        );
    }

    #[test]
    fn test_nested_braces_inside_interpolation() {
        let tokens = kinds(r##""#{ {a: 1}.a }""##);
        assert!(tokens.contains(&TokenKind::LBrace));
        assert!(tokens.contains(&TokenKind::RBrace));
        assert_eq!(tokens[tokens.len() - 3], TokenKind::InterpolationEnd);
        assert_eq!(tokens[tokens.len() - 2], TokenKind::StringEnd);
    }

    #[test]
    fn test_string_then_call() {
        assert_eq!(kinds(r#""a"(1)"#)[1], TokenKind::CallStart);
    }
}

mod errors {
    use super::*;

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("a = 'oops").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_mismatched_bracket() {
        let err = tokenize("(a]").unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn test_unclosed_bracket() {
        let err = tokenize("f(a").unwrap_err();
        assert_eq!(err.offset, 1);
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn test_block_strings_rejected() {
        assert!(tokenize("'''a'''").is_err());
    }

    #[test]
    fn test_embedded_javascript_rejected() {
        assert!(tokenize("`a`").is_err());
    }
}
