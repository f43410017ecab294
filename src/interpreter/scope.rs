//! スタック化されたシンボルテーブル
//!
//! 組み込み関数や定数を持つベーステーブルの上に、ブロック・関数呼び出し・
//! ループの束縛がフレームとして積まれる。ベーステーブルは `clone_minimal`
//! で作った別のテーブルとも共有される。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ErrorKind, RuntimeError};

use super::value::Value;

/// フレーム一段分の束縛
pub type Frame = HashMap<String, Value>;

/// 名前から値への解決を行うシンボルテーブル
pub struct SymbolTable {
    base: Rc<RefCell<Frame>>,
    frames: Vec<Frame>,
    max_depth: usize,
}

impl SymbolTable {
    /// 空のテーブルを作る。`max_depth` が0なら深さ制限なし。
    pub fn new(max_depth: usize) -> Self {
        Self {
            base: Rc::new(RefCell::new(Frame::new())),
            frames: Vec::new(),
            max_depth,
        }
    }

    /// 新しい空のフレームを積む
    pub fn push(&mut self) -> Result<(), RuntimeError> {
        self.push_frame(Frame::new())
    }

    /// 束縛済みのフレームを積む（関数呼び出しの引数束縛に使う）
    pub fn push_frame(&mut self, frame: Frame) -> Result<(), RuntimeError> {
        if self.max_depth > 0 && self.frames.len() >= self.max_depth {
            return Err(RuntimeError::new(
                ErrorKind::StackOverflow,
                format!("スコープの深さが上限({})を超えました", self.max_depth),
            ));
        }

        self.frames.push(frame);
        Ok(())
    }

    /// 最も内側のフレームを取り除く
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// 最も内側のフレームに名前を束縛する。フレームがなければ
    /// ベーステーブルに束縛される。同じフレーム内の重複はエラー。
    pub fn insert(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let Some(frame) = self.frames.last_mut() else {
            return self.insert_base(name, value);
        };

        if frame.contains_key(name) {
            return Err(RuntimeError::new(
                ErrorKind::DuplicateSymbol,
                format!("シンボル '{}' は既に宣言されています", name),
            ));
        }

        frame.insert(name.to_string(), value);
        Ok(())
    }

    /// ベーステーブルへ直接束縛する（組み込み関数の登録用）
    pub fn insert_base(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut base = self.base.borrow_mut();
        if base.contains_key(name) {
            return Err(RuntimeError::new(
                ErrorKind::DuplicateSymbol,
                format!("シンボル '{}' は既に宣言されています", name),
            ));
        }

        base.insert(name.to_string(), value);
        Ok(())
    }

    /// 内側のフレームから外側、最後にベーステーブルの順で名前を解決する
    pub fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Ok(value.clone());
            }
        }

        self.lookup_in_base(name)
    }

    /// フレームを無視してベーステーブルだけを検索する
    /// （アクセント付き識別子の解決に使う）
    pub fn lookup_in_base(&self, name: &str) -> Result<Value, RuntimeError> {
        self.base.borrow().get(name).cloned().ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::NoSuchSymbol,
                format!("シンボル '{}' は宣言されていません", name),
            )
        })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|frame| frame.contains_key(name))
            || self.base.borrow().contains_key(name)
    }

    /// フレームを持たない新しいテーブルを作る。ベーステーブルは共有される。
    pub fn clone_minimal(&self) -> Self {
        Self {
            base: Rc::clone(&self.base),
            frames: Vec::new(),
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_frames_shadow_outer_bindings() {
        let mut table = SymbolTable::new(0);
        table.insert_base("x", Value::integer(1)).unwrap();

        table.push().unwrap();
        table.insert("x", Value::integer(2)).unwrap();
        assert_eq!(table.lookup("x").unwrap().as_integer().unwrap(), 2);

        // ベーステーブル直接の検索は外側の束縛を見る
        assert_eq!(table.lookup_in_base("x").unwrap().as_integer().unwrap(), 1);

        table.pop();
        assert_eq!(table.lookup("x").unwrap().as_integer().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_in_the_same_frame_is_rejected() {
        let mut table = SymbolTable::new(0);
        table.push().unwrap();
        table.insert("x", Value::integer(1)).unwrap();

        let err = table.insert("x", Value::integer(2)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateSymbol);

        // 新しいフレームでは同じ名前を宣言できる
        table.push().unwrap();
        table.insert("x", Value::integer(3)).unwrap();
        assert_eq!(table.lookup("x").unwrap().as_integer().unwrap(), 3);
    }

    #[test]
    fn test_depth_limit_reports_stack_overflow() {
        let mut table = SymbolTable::new(2);
        table.push().unwrap();
        table.push().unwrap();

        let err = table.push().unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
    }

    #[test]
    fn test_clone_minimal_shares_the_base_table() {
        let mut table = SymbolTable::new(0);
        table.insert_base("shared", Value::integer(1)).unwrap();

        table.push().unwrap();
        table.insert("local", Value::integer(2)).unwrap();

        let cloned = table.clone_minimal();
        assert!(cloned.lookup("shared").is_ok());
        assert!(cloned.lookup("local").is_err());
        assert_eq!(cloned.depth(), 0);
    }

    #[test]
    fn test_missing_symbol_is_reported() {
        let table = SymbolTable::new(0);
        let err = table.lookup("nothing").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSuchSymbol);
    }
}
