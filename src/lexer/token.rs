//! トークン定義

use logos::{Lexer as LogosLexer, Logos};
use std::fmt;

/// Koto言語のトークン型
///
/// キーワードは大文字小文字を区別しない。`locked` は `lock` の別表記。
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")] // 空白文字をスキップ
#[logos(skip r"#[^\n]*")] // 行コメントをスキップ
pub enum Token {
    // キーワード
    #[token("and", ignore(ascii_case))]
    And,
    #[token("array", ignore(ascii_case))]
    Array,
    #[token("as", ignore(ascii_case))]
    As,
    #[token("assert", ignore(ascii_case))]
    Assert,
    #[token("begin", ignore(ascii_case))]
    Begin,
    #[token("boolean", ignore(ascii_case))]
    Boolean,
    #[token("declare", ignore(ascii_case))]
    Declare,
    #[token("dictionary", ignore(ascii_case))]
    Dictionary,
    #[token("do", ignore(ascii_case))]
    Do,
    #[token("else", ignore(ascii_case))]
    Else,
    #[token("end", ignore(ascii_case))]
    End,
    #[token("for", ignore(ascii_case))]
    For,
    #[token("foreach", ignore(ascii_case))]
    ForEach,
    #[token("function", ignore(ascii_case))]
    Function,
    #[token("if", ignore(ascii_case))]
    If,
    #[token("import", ignore(ascii_case))]
    Import,
    #[token("in", ignore(ascii_case))]
    In,
    #[token("integer", ignore(ascii_case))]
    Integer,
    #[token("lambda", ignore(ascii_case))]
    Lambda,
    #[token("lock", ignore(ascii_case))]
    #[token("locked", ignore(ascii_case))]
    Lock,
    #[token("not", ignore(ascii_case))]
    Not,
    #[token("of", ignore(ascii_case))]
    Of,
    #[token("otherwise", ignore(ascii_case))]
    Otherwise,
    #[token("or", ignore(ascii_case))]
    Or,
    #[token("real", ignore(ascii_case))]
    Real,
    #[token("reference", ignore(ascii_case))]
    Reference,
    #[token("repeat", ignore(ascii_case))]
    Repeat,
    #[token("return", ignore(ascii_case))]
    Return,
    #[token("step", ignore(ascii_case))]
    Step,
    #[token("string", ignore(ascii_case))]
    String,
    #[token("structure", ignore(ascii_case))]
    Structure,
    #[token("switch", ignore(ascii_case))]
    Switch,
    #[token("then", ignore(ascii_case))]
    Then,
    #[token("to", ignore(ascii_case))]
    To,
    #[token("type", ignore(ascii_case))]
    Type,
    #[token("until", ignore(ascii_case))]
    Until,
    #[token("while", ignore(ascii_case))]
    While,
    #[token("xor", ignore(ascii_case))]
    Xor,

    // 真偽値リテラル
    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,

    // 識別子（キーワードの後に来る必要がある）
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_owned(), priority = 1)]
    Identifier(String),

    // アクセント付き識別子（バッククォートでベーステーブルのみを参照する）
    #[regex(r"`[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_owned())]
    AccentedIdentifier(String),

    // 数値リテラル（小数部を持てばReal、なければInteger）
    #[regex(r"[0-9]+", parse_integer)]
    IntegerLit(i64),

    #[regex(r"[0-9]+\.[0-9]+", parse_real)]
    RealLit(f64),

    // 文字列リテラル（単一引用符・二重引用符の両方）
    #[regex(r#""([^"\\\n]|\\.)*""#, unescape_string)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, unescape_string)]
    StringLit(String),

    // 演算子
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("=")]
    #[token(":=")]
    Assign,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("&")]
    Ampersand,

    // 区切り記号
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    /// 入力の終端（logosではなくトークナイザが合成する）
    EndOfInput,
}

/// 整数リテラルをパースする（i64の範囲を超えるとエラートークンになる）
fn parse_integer(lex: &mut LogosLexer<Token>) -> Option<i64> {
    lex.slice().parse::<i64>().ok()
}

/// 実数リテラルをパースする
fn parse_real(lex: &mut LogosLexer<Token>) -> Option<f64> {
    lex.slice().parse::<f64>().ok()
}

/// 文字列リテラルのエスケープを解決する
fn unescape_string(lex: &mut LogosLexer<Token>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('\'') => result.push('\''),
                Some('"') => result.push('"'),
                // 未知のエスケープはエラートークンにする
                _ => return None,
            }
        } else {
            result.push(ch);
        }
    }

    Some(result)
}

impl Token {
    /// エラーメッセージ向けの名称
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(id) => format!("識別子 '{}'", id),
            Token::AccentedIdentifier(id) => format!("識別子 '`{}'", id),
            Token::IntegerLit(v) => format!("整数リテラル {}", v),
            Token::RealLit(v) => format!("実数リテラル {}", v),
            Token::StringLit(s) => format!("文字列リテラル '{}'", s),
            Token::EndOfInput => "入力の終端".to_string(),
            other => format!("'{}'", other),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::And => "and",
            Token::Array => "array",
            Token::As => "as",
            Token::Assert => "assert",
            Token::Begin => "begin",
            Token::Boolean => "boolean",
            Token::Declare => "declare",
            Token::Dictionary => "dictionary",
            Token::Do => "do",
            Token::Else => "else",
            Token::End => "end",
            Token::For => "for",
            Token::ForEach => "foreach",
            Token::Function => "function",
            Token::If => "if",
            Token::Import => "import",
            Token::In => "in",
            Token::Integer => "integer",
            Token::Lambda => "lambda",
            Token::Lock => "lock",
            Token::Not => "not",
            Token::Of => "of",
            Token::Otherwise => "otherwise",
            Token::Or => "or",
            Token::Real => "real",
            Token::Reference => "reference",
            Token::Repeat => "repeat",
            Token::Return => "return",
            Token::Step => "step",
            Token::String => "string",
            Token::Structure => "structure",
            Token::Switch => "switch",
            Token::Then => "then",
            Token::To => "to",
            Token::Type => "type",
            Token::Until => "until",
            Token::While => "while",
            Token::Xor => "xor",
            Token::True => "true",
            Token::False => "false",
            Token::Identifier(id) => return write!(f, "{}", id),
            Token::AccentedIdentifier(id) => return write!(f, "`{}", id),
            Token::IntegerLit(v) => return write!(f, "{}", v),
            Token::RealLit(v) => return write!(f, "{}", v),
            Token::StringLit(s) => return write!(f, "'{}'", s),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Caret => "^",
            Token::Assign => "=",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::Less => "<",
            Token::LessEqual => "<=",
            Token::Greater => ">",
            Token::GreaterEqual => ">=",
            Token::Ampersand => "&",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Colon => ":",
            Token::Dot => ".",
            Token::EndOfInput => "<eof>",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Token::lexer(input).map(|t| t.expect("lex error")).collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        // キーワードの大文字小文字は区別されない
        assert_eq!(lex("While WHILE while"), vec![Token::While; 3]);
        assert_eq!(lex("Declare DECLARE"), vec![Token::Declare; 2]);
    }

    #[test]
    fn test_locked_is_a_synonym_for_lock() {
        assert_eq!(lex("lock locked Locked"), vec![Token::Lock; 3]);
    }

    #[test]
    fn test_identifiers_keep_their_case() {
        assert_eq!(
            lex("foo Foo FOO_2"),
            vec![
                Token::Identifier("foo".to_string()),
                Token::Identifier("Foo".to_string()),
                Token::Identifier("FOO_2".to_string()),
            ]
        );
    }

    #[test]
    fn test_accented_identifier_strips_the_backtick() {
        assert_eq!(
            lex("`Println"),
            vec![Token::AccentedIdentifier("Println".to_string())]
        );
    }

    #[test]
    fn test_numeric_literals() {
        // 小数部を持つものだけがRealになる
        assert_eq!(
            lex("42 3.14"),
            vec![Token::IntegerLit(42), Token::RealLit(3.14)]
        );
    }

    #[test]
    fn test_string_literals_both_quote_styles() {
        assert_eq!(
            lex(r#" 'abc' "d\te" 'it\'s' "#),
            vec![
                Token::StringLit("abc".to_string()),
                Token::StringLit("d\te".to_string()),
                Token::StringLit("it's".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            lex("1 # comment to end of line\n2"),
            vec![Token::IntegerLit(1), Token::IntegerLit(2)]
        );
    }

    #[test]
    fn test_assignment_spellings() {
        assert_eq!(lex("= :="), vec![Token::Assign, Token::Assign]);
    }

    #[test]
    fn test_bang_alone_is_an_error() {
        // '!' は '!=' の一部としてのみ有効
        let results: Vec<_> = Token::lexer("a ! b").collect();
        assert!(results.iter().any(|t| t.is_err()));
        assert_eq!(lex("a != b").len(), 3);
    }

    #[test]
    fn test_minus_is_always_an_operator() {
        // 'a-1' は三つのトークンに分かれる
        assert_eq!(
            lex("a-1"),
            vec![
                Token::Identifier("a".to_string()),
                Token::Minus,
                Token::IntegerLit(1),
            ]
        );
    }
}
