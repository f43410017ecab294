//! リテラル・識別子ノードのキャッシュ
//!
//! 同じリテラルや識別子がソース上に繰り返し現れたとき、ノードを作り直さず
//! 一つのインスタンスを共有する。キャッシュは自動では破棄されず、組み込み
//! 関数 `ReleaseCachedNodes` の呼び出しで明示的に解放される。位置情報は
//! 最初に出現した場所のものを保持する。

use std::collections::HashMap;

use crate::ast::{Node, NodeKind, NodeRef};
use crate::error::Location;

/// インタプリタ一つ分のノードキャッシュ
#[derive(Default)]
pub struct NodeCaches {
    integers: HashMap<i64, NodeRef>,
    reals: HashMap<u64, NodeRef>,
    strings: HashMap<String, NodeRef>,
    identifiers: HashMap<(bool, String), NodeRef>,
}

impl NodeCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整数リテラルのノードを取得または作成する
    pub fn integer_literal(&mut self, value: i64, location: Location) -> NodeRef {
        self.integers
            .entry(value)
            .or_insert_with(|| Node::new(NodeKind::IntegerLit(value), location))
            .clone()
    }

    /// 実数リテラルのノードを取得または作成する（キーはビット表現）
    pub fn real_literal(&mut self, value: f64, location: Location) -> NodeRef {
        self.reals
            .entry(value.to_bits())
            .or_insert_with(|| Node::new(NodeKind::RealLit(value), location))
            .clone()
    }

    /// 文字列リテラルのノードを取得または作成する
    pub fn string_literal(&mut self, value: &str, location: Location) -> NodeRef {
        if let Some(node) = self.strings.get(value) {
            return node.clone();
        }

        let node = Node::new(NodeKind::StringLit(value.to_string()), location);
        self.strings.insert(value.to_string(), node.clone());
        node
    }

    /// 識別子ノードを取得または作成する
    ///
    /// アクセント付き（ベーステーブルのみを参照する）識別子は、同名の
    /// 通常識別子とは別のエントリになる。
    pub fn identifier(&mut self, name: &str, base_only: bool, location: Location) -> NodeRef {
        let key = (base_only, name.to_string());
        if let Some(node) = self.identifiers.get(&key) {
            return node.clone();
        }

        let node = Node::new(
            NodeKind::Identifier {
                name: name.to_string(),
                base_only,
            },
            location,
        );
        self.identifiers.insert(key, node.clone());
        node
    }

    /// キャッシュをすべて解放し、解放したノード数を返す
    pub fn release(&mut self) -> usize {
        let count = self.integers.len()
            + self.reals.len()
            + self.strings.len()
            + self.identifiers.len();

        self.integers.clear();
        self.reals.clear();
        self.strings.clear();
        self.identifiers.clear();

        count
    }
}
