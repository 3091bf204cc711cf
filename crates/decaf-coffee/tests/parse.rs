//! Parse-shape tests: each case renders the tree as an s-expression.

use decaf_coffee::{parse, NodeId, NodeKind, ParseError, SyntaxTree};

fn sexp(tree: &SyntaxTree, source: &str, id: NodeId) -> String {
    let node = tree.node(id);
    let label = match &node.kind {
        NodeKind::Identifier { name } => return format!("(Identifier {})", name),
        NodeKind::Int { value } => return format!("(Int {})", value),
        NodeKind::String => return format!("(String {})", &source[node.span.start..node.span.end]),
        NodeKind::MemberAccess { member, .. } => format!("MemberAccess .{}", member),
        NodeKind::SoakedMemberAccess { member, .. } => format!("SoakedMemberAccess .{}", member),
        NodeKind::BinaryOp { op, .. } => format!("BinaryOp {:?}", op),
        NodeKind::UnaryOp { op, .. } => format!("UnaryOp {:?}", op),
        NodeKind::CompoundAssignOp { op, .. } => format!("CompoundAssignOp {:?}", op),
        NodeKind::Call { implicit: true, .. } => "Call implicit".to_string(),
        NodeKind::Function { flavor, .. } => {
            let mut label = "Function".to_string();
            if flavor.bound {
                label.push_str(" bound");
            }
            if flavor.generator {
                label.push_str(" generator");
            }
            if flavor.asynchronous {
                label.push_str(" async");
            }
            label
        }
        NodeKind::Conditional { postfix: true, .. } => "Conditional postfix".to_string(),
        NodeKind::ForIn { postfix: true, .. } => "ForIn postfix".to_string(),
        NodeKind::ForOf { own: true, .. } => "ForOf own".to_string(),
        NodeKind::ClassMember {
            is_static: true, ..
        } => "ClassMember static".to_string(),
        NodeKind::Range { inclusive, .. } | NodeKind::Slice { inclusive, .. } => {
            format!("{} {}", node.kind.name(), if *inclusive { ".." } else { "..." })
        }
        NodeKind::Object { implicit: true, .. } => "Object implicit".to_string(),
        other => other.name().to_string(),
    };
    let children: Vec<String> = tree
        .children(id)
        .into_iter()
        .map(|child| sexp(tree, source, child))
        .collect();
    if children.is_empty() {
        format!("({})", label)
    } else {
        format!("({} {})", label, children.join(" "))
    }
}

/// Statements of the program body as s-expressions, one per line.
fn shape(source: &str) -> String {
    let parsed = parse(source).expect("parses");
    let tree = &parsed.tree;
    let Some(body) = tree.children(tree.root()).first().copied() else {
        return String::new();
    };
    tree.children(body)
        .into_iter()
        .map(|id| sexp(tree, source, id))
        .collect::<Vec<_>>()
        .join("\n")
}

mod expressions {
    use super::*;

    #[test]
    fn assignment() {
        assert_eq!(
            shape("a = 1\n"),
            "(AssignOp (Identifier a) (Int 1))"
        );
    }

    #[test]
    fn precedence() {
        assert_eq!(
            shape("a + b * c"),
            "(BinaryOp Add (Identifier a) (BinaryOp Mul (Identifier b) (Identifier c)))"
        );
    }

    #[test]
    fn exponent_is_right_associative() {
        assert_eq!(
            shape("a ** b ** c"),
            "(BinaryOp Exp (Identifier a) (BinaryOp Exp (Identifier b) (Identifier c)))"
        );
    }

    #[test]
    fn word_operators() {
        assert_eq!(
            shape("a is b and not c"),
            "(BinaryOp And (BinaryOp Eq (Identifier a) (Identifier b)) (UnaryOp Not (Identifier c)))"
        );
        assert_eq!(
            shape("a not in b"),
            "(BinaryOp NotIn (Identifier a) (Identifier b))"
        );
    }

    #[test]
    fn chained_comparison() {
        assert_eq!(
            shape("a < b <= c"),
            "(ChainedComparison (Identifier a) (Identifier b) (Identifier c))"
        );
    }

    #[test]
    fn parenthesized_comparison_is_not_chained() {
        assert_eq!(
            shape("(a < b) < c"),
            "(BinaryOp Lt (BinaryOp Lt (Identifier a) (Identifier b)) (Identifier c))"
        );
    }

    #[test]
    fn grouping_parens_are_outside_the_node_span() {
        let source = "x = (a + b)";
        let parsed = parse(source).unwrap();
        let tree = &parsed.tree;
        let binary = tree
            .iter()
            .find(|id| matches!(tree.kind(*id), NodeKind::BinaryOp { .. }))
            .unwrap();
        assert_eq!(&source[tree.span(binary).start..tree.span(binary).end], "a + b");
        let assign = tree
            .iter()
            .find(|id| matches!(tree.kind(*id), NodeKind::AssignOp { .. }))
            .unwrap();
        assert_eq!(tree.span(assign).end, source.len());
    }

    #[test]
    fn compound_and_existence_assignment() {
        assert_eq!(
            shape("a += 1\nb ?= 2\nc or= 3"),
            "(CompoundAssignOp Add (Identifier a) (Int 1))\n\
             (ExistsAssignOp (Identifier b) (Int 2))\n\
             (CompoundAssignOp Or (Identifier c) (Int 3))"
        );
    }

    #[test]
    fn existence_operators() {
        assert_eq!(
            shape("a ? b\nc?"),
            "(BinaryOp Exists (Identifier a) (Identifier b))\n(UnaryExists (Identifier c))"
        );
    }

    #[test]
    fn postfix_increment() {
        assert_eq!(shape("i++"), "(UnaryOp PostIncrement (Identifier i))");
    }
}

mod chains {
    use super::*;

    #[test]
    fn member_and_soaked_access() {
        assert_eq!(
            shape("a?.b.c"),
            "(MemberAccess .c (SoakedMemberAccess .b (Identifier a)))"
        );
    }

    #[test]
    fn this_shorthand_and_prototype() {
        assert_eq!(shape("@a"), "(MemberAccess .a (This))");
        assert_eq!(
            shape("A::b"),
            "(MemberAccess .b (ProtoMemberAccess (Identifier A)))"
        );
    }

    #[test]
    fn index_and_slice() {
        assert_eq!(
            shape("a[0]\nb[1...2]\nc[..3]"),
            "(DynamicMemberAccess (Identifier a) (Int 0))\n\
             (Slice ... (Identifier b) (Int 1) (Int 2))\n\
             (Slice .. (Identifier c) (Int 3))"
        );
    }

    #[test]
    fn soaked_method_call() {
        assert_eq!(
            shape("a?.b?()"),
            "(SoakedCall (SoakedMemberAccess .b (Identifier a)))"
        );
    }

    #[test]
    fn newline_continues_a_chain() {
        assert_eq!(
            shape("a\n  .b()\n  .c()"),
            "(Call (MemberAccess .c (Call (MemberAccess .b (Identifier a)))))"
        );
    }
}

mod calls {
    use super::*;

    #[test]
    fn implicit_call_with_several_arguments() {
        assert_eq!(
            shape("f a, b"),
            "(Call implicit (Identifier f) (Identifier a) (Identifier b))"
        );
    }

    #[test]
    fn nested_implicit_calls() {
        assert_eq!(
            shape("f g a"),
            "(Call implicit (Identifier f) (Call implicit (Identifier g) (Identifier a)))"
        );
    }

    #[test]
    fn minus_spacing_decides_call_or_subtraction() {
        assert_eq!(
            shape("a - b"),
            "(BinaryOp Sub (Identifier a) (Identifier b))"
        );
        assert_eq!(
            shape("a -b"),
            "(Call implicit (Identifier a) (UnaryOp Neg (Identifier b)))"
        );
    }

    #[test]
    fn implicit_object_argument() {
        assert_eq!(
            shape("f a: 1, b: 2"),
            "(Call implicit (Identifier f) (Object implicit \
             (ObjectMember (Identifier a) (Int 1)) (ObjectMember (Identifier b) (Int 2))))"
        );
    }

    #[test]
    fn multi_line_implicit_object_argument() {
        assert_eq!(
            shape("f\n  a: 1\n  b: 2\n"),
            "(Call implicit (Identifier f) (Object implicit \
             (ObjectMember (Identifier a) (Int 1)) (ObjectMember (Identifier b) (Int 2))))"
        );
    }

    #[test]
    fn spread_argument() {
        assert_eq!(
            shape("f(a...)"),
            "(Call (Identifier f) (Spread (Identifier a)))"
        );
    }

    #[test]
    fn new_with_and_without_arguments() {
        assert_eq!(
            shape("new A\nnew B(1)"),
            "(New (Identifier A))\n(New (Identifier B) (Int 1))"
        );
    }

    #[test]
    fn chain_continues_after_implicit_call_line() {
        assert_eq!(
            shape("$ 'a'\n  .b 'c'"),
            "(Call implicit (MemberAccess .b (Call implicit (Identifier $) (String 'a'))) (String 'c'))"
        );
    }
}

mod literals {
    use super::*;

    #[test]
    fn arrays_ranges_and_spreads() {
        assert_eq!(
            shape("[1, 2]\n[1..3]\n[a...b]\n[a...]"),
            "(Array (Int 1) (Int 2))\n\
             (Range .. (Int 1) (Int 3))\n\
             (Range ... (Identifier a) (Identifier b))\n\
             (Array (Spread (Identifier a)))"
        );
    }

    #[test]
    fn multi_line_array_without_commas() {
        assert_eq!(shape("[\n  1\n  2\n]"), "(Array (Int 1) (Int 2))");
    }

    #[test]
    fn explicit_object_with_shorthand() {
        assert_eq!(
            shape("{a, b: 1}"),
            "(Object (ObjectMember (Identifier a)) (ObjectMember (Identifier b) (Int 1)))"
        );
    }

    #[test]
    fn nested_implicit_objects() {
        assert_eq!(
            shape("x =\n  a:\n    b: 1\n  c: 2"),
            "(AssignOp (Identifier x) (Object implicit \
             (ObjectMember (Identifier a) (Object implicit (ObjectMember (Identifier b) (Int 1)))) \
             (ObjectMember (Identifier c) (Int 2))))"
        );
    }

    #[test]
    fn template_literal_quasis_cover_raw_text() {
        let source = "\"a#{b}c\"";
        let parsed = parse(source).unwrap();
        let tree = &parsed.tree;
        let quasis: Vec<&str> = tree
            .iter()
            .filter(|id| matches!(tree.kind(*id), NodeKind::Quasi))
            .map(|id| &source[tree.span(id).start..tree.span(id).end])
            .collect();
        assert_eq!(quasis, vec!["a", "c"]);
        assert_eq!(
            shape(source),
            "(TemplateLiteral (Quasi) (Identifier b) (Quasi))"
        );
    }

    #[test]
    fn bool_aliases() {
        let parsed = parse("yes").unwrap();
        let tree = &parsed.tree;
        assert!(tree
            .iter()
            .any(|id| matches!(tree.kind(id), NodeKind::Bool { value: true })));
    }
}

mod functions {
    use super::*;

    #[test]
    fn params_defaults_and_rest() {
        assert_eq!(
            shape("(a, b = 1, c...) -> a"),
            "(Function (Identifier a) (DefaultParam (Identifier b) (Int 1)) \
             (Rest (Identifier c)) (Block (Identifier a)))"
        );
    }

    #[test]
    fn this_params() {
        assert_eq!(
            shape("(@a) ->"),
            "(Function (MemberAccess .a (This)))"
        );
    }

    #[test]
    fn flavors_are_inferred_from_own_body() {
        assert_eq!(
            shape("-> yield 1"),
            "(Function generator (Block (Yield (Int 1))))"
        );
        assert_eq!(
            shape("=> await a"),
            "(Function bound async (Block (Await (Identifier a))))"
        );
        assert_eq!(
            shape("-> -> yield 1"),
            "(Function (Block (Function generator (Block (Yield (Int 1))))))"
        );
    }

    #[test]
    fn indented_body() {
        assert_eq!(
            shape("f = (x) ->\n  y = x\n  y\n"),
            "(AssignOp (Identifier f) (Function (Identifier x) \
             (Block (AssignOp (Identifier y) (Identifier x)) (Identifier y))))"
        );
    }

    #[test]
    fn function_span_starts_at_parameters() {
        let source = "f = (x) -> x";
        let parsed = parse(source).unwrap();
        let tree = &parsed.tree;
        let function = tree
            .iter()
            .find(|id| matches!(tree.kind(*id), NodeKind::Function { .. }))
            .unwrap();
        assert_eq!(tree.span(function).start, 4);
        assert_eq!(tree.span(function).end, source.len());
    }

    #[test]
    fn block_bodies_end_before_the_final_newline() {
        let source = "f = ->\n  g()\n";
        let parsed = parse(source).unwrap();
        let tree = &parsed.tree;
        let find = |name: &str| {
            tree.iter()
                .find(|id| tree.kind(*id).name() == name)
                .unwrap()
        };
        assert_eq!(tree.span(find("Block")).end, 12);
        assert_eq!(tree.span(find("Function")).end, 12);
        assert_eq!(tree.span(find("AssignOp")).end, 12);
    }

    #[test]
    fn nested_blocks_end_before_the_final_newline() {
        let source = "f = ->\n  if a\n    b\n";
        let parsed = parse(source).unwrap();
        let tree = &parsed.tree;
        for id in tree.iter().filter(|id| *id != tree.root()) {
            assert!(
                tree.span(id).end < source.len(),
                "{} reaches the final newline",
                tree.kind(id).name()
            );
        }
    }
}

mod control_flow {
    use super::*;

    #[test]
    fn inline_conditional() {
        assert_eq!(
            shape("if a then b else c"),
            "(Conditional (Identifier a) (Block (Identifier b)) (Block (Identifier c)))"
        );
    }

    #[test]
    fn else_if_chain() {
        assert_eq!(
            shape("if a\n  b\nelse if c\n  d\nelse\n  e\n"),
            "(Conditional (Identifier a) (Block (Identifier b)) \
             (Conditional (Identifier c) (Block (Identifier d)) (Block (Identifier e))))"
        );
    }

    #[test]
    fn postfix_conditional_wraps_statement() {
        assert_eq!(
            shape("x = y if z"),
            "(Conditional postfix (Block (AssignOp (Identifier x) (Identifier y))) (Identifier z))"
        );
    }

    #[test]
    fn loops() {
        assert_eq!(
            shape("while a\n  b\nloop\n  c"),
            "(While (Identifier a) (Block (Identifier b)))\n(While (Block (Identifier c)))"
        );
    }

    #[test]
    fn for_in_with_index_step_and_filter() {
        assert_eq!(
            shape("for x, i in xs by 2 when x\n  f x"),
            "(ForIn (Identifier x) (Identifier i) (Identifier xs) (Int 2) (Identifier x) \
             (Block (Call implicit (Identifier f) (Identifier x))))"
        );
    }

    #[test]
    fn for_own_of() {
        assert_eq!(
            shape("for own k, v of o\n  k"),
            "(ForOf own (Identifier k) (Identifier v) (Identifier o) (Block (Identifier k)))"
        );
    }

    #[test]
    fn postfix_comprehension_in_parens() {
        assert_eq!(
            shape("a = (x for x in y)"),
            "(AssignOp (Identifier a) (ForIn postfix (Block (Identifier x)) (Identifier x) (Identifier y)))"
        );
    }

    #[test]
    fn switch_with_cases_and_else() {
        assert_eq!(
            shape("switch x\n  when 1, 2 then a\n  when 3\n    b\n  else c\n"),
            "(Switch (Identifier x) \
             (SwitchCase (Int 1) (Int 2) (Block (Identifier a))) \
             (SwitchCase (Int 3) (Block (Identifier b))) \
             (Block (Identifier c)))"
        );
    }

    #[test]
    fn try_catch_finally() {
        assert_eq!(
            shape("try\n  a\ncatch e\n  b\nfinally\n  c\n"),
            "(Try (Block (Identifier a)) (Identifier e) (Block (Identifier b)) (Block (Identifier c)))"
        );
    }

    #[test]
    fn return_with_postfix_condition() {
        assert_eq!(
            shape("-> return if a"),
            "(Function (Block (Conditional postfix (Block (Return)) (Identifier a))))"
        );
    }
}

mod classes {
    use super::*;

    #[test]
    fn members_are_split_out_of_the_body_object() {
        let source = "class A extends B\n  constructor: (@x) ->\n    super()\n  m: -> @x\n  @s: -> 1\n";
        assert_eq!(
            shape(source),
            "(Class (Identifier A) (Identifier B) (Block \
             (Constructor (Identifier constructor) (Function (MemberAccess .x (This)) (Block (Call (Super))))) \
             (ClassMember (Identifier m) (Function (Block (MemberAccess .x (This))))) \
             (ClassMember static (MemberAccess .s (This)) (Function (Block (Int 1))))))"
        );
    }

    #[test]
    fn member_parents_point_at_the_body() {
        let parsed = parse("class A\n  m: ->\n").unwrap();
        let tree = &parsed.tree;
        let member = tree
            .iter()
            .find(|id| matches!(tree.kind(*id), NodeKind::ClassMember { .. }))
            .unwrap();
        let parent = tree.parent(member).unwrap();
        assert!(matches!(tree.kind(parent), NodeKind::Block { .. }));
    }
}

mod layout {
    use super::*;

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        assert_eq!(
            shape("# lead\na = 1\n\n###\nblock\n###\nb = 2 # trailing\n"),
            "(AssignOp (Identifier a) (Int 1))\n(AssignOp (Identifier b) (Int 2))"
        );
    }

    #[test]
    fn semicolons_separate_statements() {
        assert_eq!(shape("a; b"), "(Identifier a)\n(Identifier b)");
    }

    #[test]
    fn tokens_keep_comments() {
        let parsed = parse("a # c\n").unwrap();
        assert!(parsed.tokens.iter().any(|t| !t.is_semantic()));
    }
}

mod errors {
    use super::*;

    #[test]
    fn unexpected_indentation() {
        let err = parse("a\n  b").unwrap_err();
        assert_eq!(err.offset(), 4);
        assert_eq!(err.message(), "unexpected indentation");
    }

    #[test]
    fn unexpected_token() {
        let err = parse("a = ,").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { offset: 4, .. }));
    }

    #[test]
    fn tokenizer_errors_are_reported() {
        let err = parse("a = 'x").unwrap_err();
        assert!(matches!(err, ParseError::Tokenize { .. }));
    }

    #[test]
    fn own_requires_of() {
        assert!(parse("for own x in y\n  x").is_err());
    }
}
