//! エラーコールバックレジストリ
//!
//! エラー種別ごとにハンドラのスタックを持つ。実行時エラーが起きると
//! 最後に登録されたハンドラだけが呼ばれ、呼ばれた場合はエラーの伝播が
//! 止まる。`push` / `pop` は言語側の明示的な操作であり、自動では積まれ
//! ない。

use std::collections::HashMap;

use crate::error::{ErrorKind, RuntimeError};

use super::value::Value;

/// 種別ごとのハンドラスタック
#[derive(Default)]
pub struct ErrorCallbacks {
    stacks: HashMap<ErrorKind, Vec<Value>>,
}

impl ErrorCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// ハンドラを登録する。失敗したアサーションには登録できない。
    pub fn push(&mut self, kind: ErrorKind, handler: Value) -> Result<(), RuntimeError> {
        if !ErrorKind::registerable().contains(&kind) {
            return Err(RuntimeError::new(
                ErrorKind::IllegalValue,
                format!("エラー種別 {} にはハンドラを登録できません", kind),
            ));
        }

        // 呼び出し可能な値であることの確認だけ行う
        handler.as_executable()?;

        self.stacks.entry(kind).or_default().push(handler);
        Ok(())
    }

    /// 最後に登録されたハンドラを取り除く
    pub fn pop(&mut self, kind: ErrorKind) -> Result<(), RuntimeError> {
        let popped = self.stacks.get_mut(&kind).and_then(Vec::pop);
        if popped.is_none() {
            return Err(RuntimeError::new(
                ErrorKind::IllegalHandle,
                format!("エラー種別 {} にハンドラは登録されていません", kind),
            ));
        }
        Ok(())
    }

    /// 現在有効なハンドラ（スタックの最上段）
    pub fn top(&self, kind: ErrorKind) -> Option<Value> {
        self.stacks.get(&kind).and_then(|stack| stack.last()).cloned()
    }

    pub fn has_handler(&self, kind: ErrorKind) -> bool {
        self.stacks.get(&kind).is_some_and(|stack| !stack.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::value::{ExecKind, ExecutableValue};

    fn dummy_handler() -> Value {
        Value::executable(ExecutableValue {
            params: vec![],
            kind: ExecKind::Builtin {
                name: "dummy",
                f: |_, _| Ok(Value::null()),
            },
        })
    }

    #[test]
    fn test_the_top_handler_wins() {
        let mut callbacks = ErrorCallbacks::new();
        let first = dummy_handler();
        let second = dummy_handler();

        callbacks.push(ErrorKind::DivideByZero, first.clone()).unwrap();
        callbacks.push(ErrorKind::DivideByZero, second.clone()).unwrap();

        let top = callbacks.top(ErrorKind::DivideByZero).unwrap();
        assert!(top.ptr_eq(&second));

        callbacks.pop(ErrorKind::DivideByZero).unwrap();
        let top = callbacks.top(ErrorKind::DivideByZero).unwrap();
        assert!(top.ptr_eq(&first));
    }

    #[test]
    fn test_pop_on_an_empty_stack_is_an_error() {
        let mut callbacks = ErrorCallbacks::new();
        let err = callbacks.pop(ErrorKind::RangeError).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalHandle);
    }

    #[test]
    fn test_failed_assertion_is_not_registerable() {
        let mut callbacks = ErrorCallbacks::new();
        let err = callbacks
            .push(ErrorKind::FailedAssertion, dummy_handler())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalValue);
    }

    #[test]
    fn test_non_executable_handlers_are_rejected() {
        let mut callbacks = ErrorCallbacks::new();
        let err = callbacks
            .push(ErrorKind::DivideByZero, Value::integer(1))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalHandle);
    }
}
