//! レキサーテスト
//!
//! Kotoインタプリタのトークナイザの統合テスト。ソーススタックを使った
//! ストリーミング字句解析と位置情報の付与を検証する。

use pretty_assertions::assert_eq;

use kotolang::lexer::{Token, Tokenizer};

/// ソースを最後まで読み、トークン列を返すヘルパー
fn drain(source: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new("test.koto", source).expect("tokenize");
    let mut tokens = vec![tokenizer.current().clone()];
    while tokenizer.current() != &Token::EndOfInput {
        tokens.push(tokenizer.advance().expect("advance").clone());
    }
    tokens.pop();
    tokens
}

#[test]
fn test_statement_tokens_in_order() {
    // 典型的な宣言文のトークン列
    let tokens = drain("declare integer as x = 1 + 2;");
    assert_eq!(
        tokens,
        vec![
            Token::Declare,
            Token::Integer,
            Token::As,
            Token::Identifier("x".to_string()),
            Token::Assign,
            Token::IntegerLit(1),
            Token::Plus,
            Token::IntegerLit(2),
            Token::Semicolon,
        ]
    );
}

#[test]
fn test_empty_source_yields_end_of_input() {
    let tokenizer = Tokenizer::new("test.koto", "# コメントだけ\n").expect("tokenize");
    assert_eq!(tokenizer.current(), &Token::EndOfInput);
}

#[test]
fn test_pushed_source_interleaves_and_resumes() {
    // import相当の動作: 積んだソースのトークンを先に返し、
    // 尽きたら外側のソースへ戻る
    let mut tokenizer = Tokenizer::new("outer.koto", "1 2").expect("tokenize");
    assert_eq!(tokenizer.current(), &Token::IntegerLit(1));

    tokenizer.push_source("inner.koto", "8 9");
    assert_eq!(tokenizer.advance().expect("advance"), &Token::IntegerLit(8));
    assert!(!tokenizer.is_entry_point());
    assert_eq!(tokenizer.advance().expect("advance"), &Token::IntegerLit(9));

    // 内側が尽きたら外側の残りが続く
    assert_eq!(tokenizer.advance().expect("advance"), &Token::IntegerLit(2));
    assert!(tokenizer.is_entry_point());
    assert_eq!(tokenizer.advance().expect("advance"), &Token::EndOfInput);
}

#[test]
fn test_locations_are_one_based_and_per_source() {
    let mut tokenizer = Tokenizer::new("main.koto", "a\n  b").expect("tokenize");

    let first = tokenizer.current_location();
    assert_eq!((first.line, first.column), (1, 1));
    assert_eq!(&*first.source, "main.koto");

    tokenizer.advance().expect("advance");
    let second = tokenizer.current_location();
    assert_eq!((second.line, second.column), (2, 3));
}

#[test]
fn test_unrecognized_token_is_a_lexer_error() {
    let mut tokenizer = Tokenizer::new("test.koto", "1 @ 2").expect("tokenize");
    assert!(tokenizer.advance().is_err());
}

#[test]
fn test_case_insensitive_keywords_mix_freely() {
    let tokens = drain("WHILE true DO Begin End;");
    assert_eq!(
        tokens,
        vec![
            Token::While,
            Token::True,
            Token::Do,
            Token::Begin,
            Token::End,
            Token::Semicolon,
        ]
    );
}
