//! Tree-walking interpreter for the Koto language.
//!
//! Execution is streaming: each statement is executed as soon as the parser
//! produces it. Runtime errors are routed through the error-callback
//! registry; a handled error suppresses propagation and execution continues
//! with the next statement. `return` at the top level stops the program with
//! that value, and `Terminate` unwinds to the driver.

pub mod builtins;
pub mod callbacks;
pub mod exec;
pub mod ops;
pub mod scope;
pub mod value;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ErrorKind, KotoResult, RuntimeError};
use crate::parser::{NodeCaches, Parser};

pub use callbacks::ErrorCallbacks;
pub use scope::SymbolTable;
pub use value::{ExecKind, ExecutableValue, RangeBounds, TypeSpec, TypeTag, Value};

/// 再帰の深さの上限（超えるとスタックオーバーフローのエラーになる）
pub const MAX_SCOPE_DEPTH: usize = 2048;

/// 実行を中断して上へ運ばれる脱出
#[derive(Debug)]
pub enum Unwind {
    /// 実行時エラー。コールバックレジストリかドライバが受け止める。
    Error(RuntimeError),
    /// `return` による脱出。関数呼び出しが受け止める。
    Return(Value),
    /// `Terminate` による終了。ドライバまで届く。
    Terminate(i64),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

/// ノード実行の結果型
pub type ExecResult = Result<Value, Unwind>;

/// 実行中に共有される状態
pub struct Context {
    pub scope: SymbolTable,
    pub callbacks: ErrorCallbacks,
    pub caches: Rc<RefCell<NodeCaches>>,
    /// 現在実行中の文がエントリポイントのソース由来かどうか
    pub entry_point: bool,
}

/// プログラム一回分の実行結果
#[derive(Debug)]
pub enum RunOutcome {
    /// 最後まで実行された（最後に評価された値を持つ）
    Completed(Value),
    /// `Terminate` で明示的に終了した
    Terminated(i64),
}

impl RunOutcome {
    /// プロセスの終了ステータスとして使う値
    pub fn status(&self) -> i64 {
        match self {
            RunOutcome::Completed(_) => 0,
            RunOutcome::Terminated(status) => *status,
        }
    }
}

/// Koto言語のインタプリタ
///
/// 一つのインスタンスがシンボルテーブル・ノードキャッシュ・コールバック
/// レジストリを保持する。`run` を繰り返し呼べば同じベーステーブルの上で
/// 実行が続くので、REPLにもそのまま使える。
pub struct Interpreter {
    context: Context,
}

impl Interpreter {
    /// 組み込み関数と定数を登録済みのインタプリタを作る
    pub fn new() -> KotoResult<Self> {
        let mut scope = SymbolTable::new(MAX_SCOPE_DEPTH);
        builtins::register_base(&mut scope)?;

        Ok(Self {
            context: Context {
                scope,
                callbacks: ErrorCallbacks::new(),
                caches: Rc::new(RefCell::new(NodeCaches::new())),
                entry_point: true,
            },
        })
    }

    /// ソースを解析しながら一文ずつ実行する
    pub fn run(&mut self, name: &str, text: &str) -> KotoResult<RunOutcome> {
        let mut parser = Parser::new(name, text, Rc::clone(&self.context.caches))?;
        let mut result = Value::null();

        loop {
            let Some(statement) = parser.parse_statement()? else {
                break;
            };
            self.context.entry_point = parser.is_entry_point();

            match exec::execute(&statement, &mut self.context) {
                Ok(value) => result = value,

                // 最上位のreturnはプログラムをその値で終える
                Err(Unwind::Return(value)) => {
                    result = value;
                    break;
                }

                Err(Unwind::Terminate(status)) => {
                    self.fire_completion(ErrorKind::Terminate)?;
                    return Ok(RunOutcome::Terminated(status));
                }

                Err(Unwind::Error(error)) => {
                    let error = error.with_location(&statement.location);

                    // 失敗したアサーションはハンドラへ振り分けない
                    if error.kind == ErrorKind::FailedAssertion {
                        return Err(error.into());
                    }

                    if !self.context.callbacks.has_handler(error.kind) {
                        return Err(error.into());
                    }

                    log::debug!("エラーをハンドラへ振り分けます: {}", error);
                    match exec::invoke_error_handler(&mut self.context, &error) {
                        Ok(_) | Err(Unwind::Return(_)) => result = Value::null(),
                        Err(Unwind::Error(handler_error)) => return Err(handler_error.into()),
                        Err(Unwind::Terminate(status)) => {
                            self.fire_completion(ErrorKind::Terminate)?;
                            return Ok(RunOutcome::Terminated(status));
                        }
                    }
                }
            }
        }

        self.fire_completion(ErrorKind::Ok)?;
        Ok(RunOutcome::Completed(result))
    }

    /// 実行せずに構文・リテラルな型境界・識別子の解決可能性を検査する
    ///
    /// 宣言はプレースホルダとして記録されるだけで、シンボルテーブルには
    /// 何も残らない。
    pub fn validate(&mut self, name: &str, text: &str) -> KotoResult<()> {
        let mut parser = Parser::new(name, text, Rc::clone(&self.context.caches))?;
        let mut scope = exec::ValidationScope::new(&self.context.scope);
        while let Some(statement) = parser.parse_statement()? {
            exec::validate(&statement, &mut scope)?;
        }
        Ok(())
    }

    /// 解析だけ行い、構文木を文ごとに返す（`--dump-ast` 用)
    pub fn parse_all(&mut self, name: &str, text: &str) -> KotoResult<Vec<crate::ast::NodeRef>> {
        let mut parser = Parser::new(name, text, Rc::clone(&self.context.caches))?;
        let mut statements = Vec::new();
        while let Some(statement) = parser.parse_statement()? {
            statements.push(statement);
        }
        Ok(statements)
    }

    /// ノードキャッシュを解放し、解放した数を返す
    pub fn release_cached_nodes(&mut self) -> usize {
        self.context.caches.borrow_mut().release()
    }

    /// 名前を現在のスコープで解決する（テスト・REPL用）
    pub fn lookup(&self, name: &str) -> KotoResult<Value> {
        Ok(self.context.scope.lookup(name)?)
    }

    /// 完了時のチェーンを一度だけ起動する
    fn fire_completion(&mut self, kind: ErrorKind) -> KotoResult<()> {
        let message = match kind {
            ErrorKind::Terminate => "プログラムは明示的に終了しました",
            _ => "プログラムは正常に完了しました",
        };

        match exec::fire_completion(&mut self.context, kind, message) {
            Ok(_) => Ok(()),
            Err(Unwind::Error(error)) => Err(error.into()),
            // 完了ハンドラ内のreturn/Terminateは完了を妨げない
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (Interpreter, RunOutcome) {
        let mut interpreter = Interpreter::new().unwrap();
        let outcome = interpreter.run("test.koto", source).unwrap();
        (interpreter, outcome)
    }

    #[test]
    fn test_runs_a_simple_program() {
        let (interpreter, outcome) = run("declare integer as x = 2 + 3;");
        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(
            interpreter.lookup("x").unwrap().as_integer().unwrap(),
            5
        );
    }

    #[test]
    fn test_top_level_return_stops_the_program() {
        let (_, outcome) = run("return 42; declare integer as never;");
        let RunOutcome::Completed(value) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(value.as_integer().unwrap(), 42);
    }

    #[test]
    fn test_terminate_carries_the_status() {
        let (_, outcome) = run("Terminate(3);");
        assert!(matches!(outcome, RunOutcome::Terminated(3)));
        assert_eq!(outcome.status(), 3);
    }

    #[test]
    fn test_unhandled_error_propagates() {
        let mut interpreter = Interpreter::new().unwrap();
        let err = interpreter.run("test.koto", "1 / 0;").unwrap_err();
        match err {
            crate::error::KotoError::Runtime(e) => {
                assert_eq!(e.kind, ErrorKind::DivideByZero)
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_validate_rejects_reversed_literal_ranges() {
        let mut interpreter = Interpreter::new().unwrap();
        assert!(interpreter
            .validate("test.koto", "declare integer(10, 0) as x;")
            .is_err());
        assert!(interpreter
            .validate("test.koto", "declare integer(0, 10) as x;")
            .is_ok());
    }
}
