//! 統一的なエラーハンドリングモジュール
//!
//! このモジュールは、Kotoインタプリタ全体で使用される統一的なエラー型と
//! エラー報告システムを提供します。実行時エラーはエラー種別（`ErrorKind`）を
//! 持ち、種別ごとのコールバックへ振り分けられます。

use std::fmt;
use std::sync::Arc;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use serde::Serialize;
use thiserror::Error;

/// ソース内のバイト範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// ソース位置（ソース名、1始まりの行・桁）
///
/// 表示形式は `<source> (Ln <line>; Col <column>)` で固定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub source: Arc<str>,
    pub line: u32,
    pub column: u32,
    pub span: Span,
}

impl Location {
    pub fn new(source: Arc<str>, line: u32, column: u32, span: Span) -> Self {
        Self {
            source,
            line,
            column,
            span,
        }
    }

    /// テスト・REPL用のダミー位置
    pub fn unknown() -> Self {
        Self {
            source: Arc::from("<unknown>"),
            line: 0,
            column: 0,
            span: Span::dummy(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Ln {}; Col {})", self.source, self.line, self.column)
    }
}

/// Kotoインタプリタの統一エラー型
#[derive(Error, Debug, Clone)]
pub enum KotoError {
    /// 字句解析エラー
    #[error("{0}")]
    Lexer(#[from] LexerError),

    /// 構文解析エラー
    #[error("{0}")]
    Parser(#[from] ParseError),

    /// 実行時エラー
    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    /// ファイルI/Oエラー
    #[error("ファイル操作エラー: {0}")]
    Io(String),
}

/// 字句解析エラーの詳細
#[derive(Error, Debug, Clone)]
pub enum LexerError {
    #[error("{location} : 認識できないトークン: '{token}'")]
    UnrecognizedToken { token: String, location: Location },

    #[error("{location} : 未終了の文字列リテラル")]
    UnterminatedString { location: Location },

    #[error("{location} : 不正な数値リテラル: {message}")]
    InvalidNumber { message: String, location: Location },

    #[error("{location} : 不正なエスケープシーケンス: '{sequence}'")]
    InvalidEscape { sequence: String, location: Location },
}

impl LexerError {
    pub fn location(&self) -> &Location {
        match self {
            LexerError::UnrecognizedToken { location, .. }
            | LexerError::UnterminatedString { location }
            | LexerError::InvalidNumber { location, .. }
            | LexerError::InvalidEscape { location, .. } => location,
        }
    }
}

/// 構文解析エラーの詳細
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("{location} : 予期しないトークン: {expected}を期待しましたが、{found}が見つかりました")]
    UnexpectedToken {
        expected: String,
        found: String,
        location: Location,
    },

    #[error("{location} : 予期しない入力の終了: {expected}を期待していました")]
    UnexpectedEof { expected: String, location: Location },

    #[error("{location} : 不正な構文: {message}")]
    InvalidSyntax { message: String, location: Location },
}

impl ParseError {
    pub fn location(&self) -> &Location {
        match self {
            ParseError::UnexpectedToken { location, .. }
            | ParseError::UnexpectedEof { location, .. }
            | ParseError::InvalidSyntax { location, .. } => location,
        }
    }
}

/// 実行時エラーの種別
///
/// コールバックレジストリはこの列挙をキーとする。`FailedAssertion` だけは
/// レジストリへ振り分けられず、常に実行を中断する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    Ok,
    Terminate,
    IllegalCast,
    ValueLocked,
    NoSuchMember,
    DuplicateSymbol,
    NoSuchSymbol,
    DivideByZero,
    DomainError,
    RangeError,
    IllegalHandle,
    IllegalValue,
    StackOverflow,
    FailedAssertion,
}

impl ErrorKind {
    /// ERR_* 定数として公開する整数コード
    pub fn code(self) -> i64 {
        match self {
            ErrorKind::Ok => 0,
            ErrorKind::Terminate => 1,
            ErrorKind::IllegalCast => 2,
            ErrorKind::ValueLocked => 3,
            ErrorKind::NoSuchMember => 4,
            ErrorKind::DuplicateSymbol => 5,
            ErrorKind::NoSuchSymbol => 6,
            ErrorKind::DivideByZero => 7,
            ErrorKind::DomainError => 8,
            ErrorKind::RangeError => 9,
            ErrorKind::IllegalHandle => 10,
            ErrorKind::IllegalValue => 11,
            ErrorKind::StackOverflow => 12,
            ErrorKind::FailedAssertion => 13,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => ErrorKind::Ok,
            1 => ErrorKind::Terminate,
            2 => ErrorKind::IllegalCast,
            3 => ErrorKind::ValueLocked,
            4 => ErrorKind::NoSuchMember,
            5 => ErrorKind::DuplicateSymbol,
            6 => ErrorKind::NoSuchSymbol,
            7 => ErrorKind::DivideByZero,
            8 => ErrorKind::DomainError,
            9 => ErrorKind::RangeError,
            10 => ErrorKind::IllegalHandle,
            11 => ErrorKind::IllegalValue,
            12 => ErrorKind::StackOverflow,
            13 => ErrorKind::FailedAssertion,
            _ => return None,
        })
    }

    /// ベーステーブルへ登録する ERR_* 定数名
    pub fn constant_name(self) -> &'static str {
        match self {
            ErrorKind::Ok => "ERR_Ok",
            ErrorKind::Terminate => "ERR_Terminate",
            ErrorKind::IllegalCast => "ERR_IllegalCast",
            ErrorKind::ValueLocked => "ERR_ValueLocked",
            ErrorKind::NoSuchMember => "ERR_NoSuchMember",
            ErrorKind::DuplicateSymbol => "ERR_DuplicateSymbol",
            ErrorKind::NoSuchSymbol => "ERR_NoSuchSymbol",
            ErrorKind::DivideByZero => "ERR_DivideByZero",
            ErrorKind::DomainError => "ERR_DomainError",
            ErrorKind::RangeError => "ERR_RangeError",
            ErrorKind::IllegalHandle => "ERR_IllegalHandle",
            ErrorKind::IllegalValue => "ERR_IllegalValue",
            ErrorKind::StackOverflow => "ERR_StackOverflow",
            ErrorKind::FailedAssertion => "ERR_FailedAssertion",
        }
    }

    /// コールバックを登録できる種別の一覧（`FailedAssertion` は除く）
    pub fn registerable() -> &'static [ErrorKind] {
        &[
            ErrorKind::Ok,
            ErrorKind::Terminate,
            ErrorKind::IllegalCast,
            ErrorKind::ValueLocked,
            ErrorKind::NoSuchMember,
            ErrorKind::DuplicateSymbol,
            ErrorKind::NoSuchSymbol,
            ErrorKind::DivideByZero,
            ErrorKind::DomainError,
            ErrorKind::RangeError,
            ErrorKind::IllegalHandle,
            ErrorKind::IllegalValue,
            ErrorKind::StackOverflow,
        ]
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Ok => "ok",
            ErrorKind::Terminate => "terminate",
            ErrorKind::IllegalCast => "illegal-cast",
            ErrorKind::ValueLocked => "value-locked",
            ErrorKind::NoSuchMember => "no-such-member",
            ErrorKind::DuplicateSymbol => "duplicate-symbol",
            ErrorKind::NoSuchSymbol => "no-such-symbol",
            ErrorKind::DivideByZero => "divide-by-zero",
            ErrorKind::DomainError => "domain-error",
            ErrorKind::RangeError => "range-error",
            ErrorKind::IllegalHandle => "illegal-handle",
            ErrorKind::IllegalValue => "illegal-value",
            ErrorKind::StackOverflow => "stack-overflow",
            ErrorKind::FailedAssertion => "failed-assertion",
        };
        f.write_str(name)
    }
}

/// 実行時エラー
#[derive(Error, Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(kind: ErrorKind, message: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Some(location),
        }
    }

    /// 位置が未設定なら補う（評価中のノードの位置が入る）
    pub fn with_location(mut self, location: &Location) -> Self {
        if self.location.is_none() {
            self.location = Some(location.clone());
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} : {}", location, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// エラー情報とソースコードの位置情報を含むエラー
#[derive(Debug, Clone)]
pub struct DiagnosticError {
    pub error: KotoError,
    pub file_id: usize,
}

impl DiagnosticError {
    pub fn new(error: KotoError, file_id: usize) -> Self {
        Self { error, file_id }
    }

    /// codespan-reportingのDiagnosticに変換
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let (message, labels) = match &self.error {
            KotoError::Lexer(e) => {
                let span = e.location().span;
                (
                    e.to_string(),
                    vec![Label::primary(self.file_id, span.start..span.end)],
                )
            }
            KotoError::Parser(e) => {
                let span = e.location().span;
                (
                    e.to_string(),
                    vec![Label::primary(self.file_id, span.start..span.end)],
                )
            }
            KotoError::Runtime(e) => {
                let labels = match &e.location {
                    Some(location) => {
                        vec![Label::primary(
                            self.file_id,
                            location.span.start..location.span.end,
                        )]
                    }
                    None => vec![],
                };
                (e.to_string(), labels)
            }
            KotoError::Io(message) => (format!("ファイル操作エラー: {}", message), vec![]),
        };

        Diagnostic::error().with_message(message).with_labels(labels)
    }
}

/// インタプリタ全体で使用されるResult型
pub type KotoResult<T> = Result<T, KotoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display_format() {
        // 位置情報の表示形式の検証
        let location = Location::new(Arc::from("script.koto"), 3, 14, Span::new(10, 12));
        assert_eq!(location.to_string(), "script.koto (Ln 3; Col 14)");
    }

    #[test]
    fn test_runtime_error_display_with_location() {
        let location = Location::new(Arc::from("a.koto"), 1, 1, Span::dummy());
        let err = RuntimeError::at(ErrorKind::DivideByZero, "ゼロによる除算です", location);
        assert_eq!(err.to_string(), "a.koto (Ln 1; Col 1) : ゼロによる除算です");
    }

    #[test]
    fn test_error_kind_code_round_trip() {
        for kind in ErrorKind::registerable() {
            assert_eq!(ErrorKind::from_code(kind.code()), Some(*kind));
        }
    }
}
