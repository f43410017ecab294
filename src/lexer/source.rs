//! ソーステキストと位置変換
//!
//! 各ソースは行頭オフセットの表を持ち、バイト範囲から
//! `<source> (Ln 行; Col 桁)` 形式の位置へ変換する。

use std::rc::Rc;
use std::sync::Arc;

use crate::error::{Location, Span};

/// 字句解析対象のソース一つ分
#[derive(Debug)]
pub struct SourceText {
    name: Arc<str>,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(name: impl Into<Arc<str>>, text: impl Into<String>) -> Rc<Self> {
        let text = text.into();

        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }

        Rc::new(Self {
            name: name.into(),
            text,
            line_starts,
        })
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// バイト範囲を1始まりの行・桁位置へ変換する
    pub fn location(&self, span: Span) -> Location {
        let line_index = match self.line_starts.binary_search(&span.start) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let line_start = self.line_starts[line_index];

        // 桁は文字数で数える
        let column = self.text[line_start..span.start].chars().count() + 1;

        Location::new(
            self.name.clone(),
            (line_index + 1) as u32,
            column as u32,
            span,
        )
    }

    /// 範囲のソーステキストを取り出す（エラー分類に使用）
    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.start..span.end.min(self.text.len())]
    }
}
