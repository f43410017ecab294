//! パーサーテスト
//!
//! Kotoインタプリタのパーサーの統合テスト。一文ずつの解析、チェーン
//! ノードの形、リテラルキャッシュの共有、マングリングを検証する。

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use kotolang::ast::{AddOp, NodeKind, NodeRef};
use kotolang::parser::{NodeCaches, Parser};

/// ソース全体を解析して文のリストを返すヘルパー
fn parse_all(source: &str) -> Vec<NodeRef> {
    let caches = Rc::new(RefCell::new(NodeCaches::new()));
    let mut parser = Parser::new("test.koto", source, caches).expect("parser");

    let mut statements = Vec::new();
    while let Some(statement) = parser.parse_statement().expect("parse") {
        statements.push(statement);
    }
    statements
}

/// 一文だけ解析するヘルパー
fn parse_one(source: &str) -> NodeRef {
    let mut statements = parse_all(source);
    assert_eq!(statements.len(), 1);
    statements.pop().expect("statement")
}

fn parse_error(source: &str) -> kotolang::KotoError {
    let caches = Rc::new(RefCell::new(NodeCaches::new()));
    let mut parser = Parser::new("test.koto", source, caches).expect("parser");

    loop {
        match parser.parse_statement() {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("expected a parse error"),
            Err(e) => return e,
        }
    }
}

#[test]
fn test_statements_are_delivered_one_at_a_time() {
    let statements = parse_all("1; 2; 3;");
    assert_eq!(statements.len(), 3);
}

#[test]
fn test_additive_chain_keeps_all_operands_flat() {
    // '1 + 2 - 3 + 4' は二分木ではなく一つのチェーンノードになる
    let statement = parse_one("1 + 2 - 3 + 4;");

    let NodeKind::AddChain { first, rest } = &statement.kind else {
        panic!("expected an additive chain, got {:?}", statement.kind);
    };
    assert!(matches!(first.kind, NodeKind::IntegerLit(1)));
    let ops: Vec<AddOp> = rest.iter().map(|(op, _)| *op).collect();
    assert_eq!(ops, vec![AddOp::Add, AddOp::Subtract, AddOp::Add]);
}

#[test]
fn test_repeated_literals_share_one_node() {
    let statement = parse_one("1 + 1;");

    let NodeKind::AddChain { first, rest } = &statement.kind else {
        panic!("expected an additive chain");
    };
    assert!(Rc::ptr_eq(first, &rest[0].1));
}

#[test]
fn test_negative_literal_is_folded_through_the_cache() {
    let statement = parse_one("-5;");
    assert!(matches!(statement.kind, NodeKind::IntegerLit(-5)));
}

#[test]
fn test_comparison_does_not_chain() {
    // 比較演算子は連結できない
    let error = parse_error("1 < 2 < 3;");
    assert!(matches!(error, kotolang::KotoError::Parser(_)));
}

#[test]
fn test_assignment_is_right_associative() {
    let statement = parse_one("a = b = 1;");

    let NodeKind::Assign { target, value } = &statement.kind else {
        panic!("expected an assignment");
    };
    assert!(matches!(&target.kind, NodeKind::Identifier { name, .. } if name == "a"));
    assert!(matches!(value.kind, NodeKind::Assign { .. }));
}

#[test]
fn test_call_mangles_the_callee_name_with_the_arity() {
    let statement = parse_one("Println('hi');");

    let NodeKind::Call { callee, args } = &statement.kind else {
        panic!("expected a call");
    };
    assert_eq!(args.len(), 1);
    assert!(
        matches!(&callee.kind, NodeKind::Identifier { name, .. } if name == "Println_1")
    );
}

#[test]
fn test_function_declaration_mangles_with_the_parameter_count() {
    let statement = parse_one("declare function Max(a, b) return a;");

    let NodeKind::DeclareFunction { name, params, .. } = &statement.kind else {
        panic!("expected a function declaration");
    };
    assert_eq!(name, "Max_2");
    assert_eq!(params.len(), 2);
    assert!(!params[0].reference);
}

#[test]
fn test_declaration_with_initializer_becomes_an_assignment() {
    let statement = parse_one("declare integer as x = 7;");

    let NodeKind::Assign { target, .. } = &statement.kind else {
        panic!("expected an assignment wrapping the declaration");
    };
    assert!(matches!(&target.kind, NodeKind::Declare { name, .. } if name == "x"));
}

#[test]
fn test_switch_guards_of_one_case_share_the_body() {
    let statement = parse_one(
        "switch x 1, 2: Println('low'); otherwise: Println('high'); end;",
    );

    let NodeKind::Switch { cases, otherwise, .. } = &statement.kind else {
        panic!("expected a switch");
    };
    assert_eq!(cases.len(), 2);
    assert!(Rc::ptr_eq(&cases[0].body, &cases[1].body));
    assert!(otherwise.is_some());
}

#[test]
fn test_structural_equality_ignores_node_identity() {
    let left = parse_one("1 + x * 2;");
    let right = parse_one("1 + x * 2;");
    let different = parse_one("1 + x * 3;");

    assert!(left.structural_eq(&right));
    assert!(!left.structural_eq(&different));
}

#[test]
fn test_missing_semicolon_is_a_parse_error() {
    let error = parse_error("1 + 2");
    assert!(matches!(error, kotolang::KotoError::Parser(_)));
}

#[test]
fn test_accented_identifier_marks_base_only_lookup() {
    let statement = parse_one("`x;");
    assert!(
        matches!(&statement.kind, NodeKind::Identifier { name, base_only } if name == "x" && *base_only)
    );
}
