//! Syntax tree definitions for the Koto language.
//!
//! The parser builds `Node` values that are executed directly; there is no
//! separate lowering step. Nodes are shared through `Rc` because the
//! literal/identifier cache and multi-valued switch guards deliberately
//! hand out one instance for several tree positions.

mod display;
mod equal;

use std::rc::Rc;

use serde::Serialize;

use crate::error::Location;

pub type NodeRef = Rc<Node>;

/// 構文木のノード（種別と位置）
#[derive(Debug, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub location: Location,
}

impl Node {
    pub fn new(kind: NodeKind, location: Location) -> NodeRef {
        Rc::new(Self { kind, location })
    }
}

/// 関数・ラムダの仮引数（`&` 付きは参照束縛）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub reference: bool,
}

/// switch文の分岐一つ分。複数値のガードは本体を共有する。
#[derive(Debug, Serialize)]
pub struct SwitchCase {
    pub guard: NodeRef,
    pub body: NodeRef,
}

/// 加算チェーンの演算子タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddOp {
    Add,
    Subtract,
}

/// 乗算チェーンの演算子タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MulOp {
    Multiply,
    Divide,
    Modulo,
}

/// 論理チェーンの演算子（チェーン内は単一の演算子）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

/// 比較演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
}

/// ノード種別
///
/// 文・式・型記述子をひとつの列挙で表す。チェーンノードは二分木に
/// 展開せず、先頭オペランドと（演算子タグ, オペランド）の列を保持する。
#[derive(Debug, Serialize)]
pub enum NodeKind {
    // 終端
    Null,
    BooleanLit(bool),
    IntegerLit(i64),
    RealLit(f64),
    StringLit(String),
    Identifier { name: String, base_only: bool },
    ArrayLit(Vec<NodeRef>),
    Lambda { params: Vec<Param>, body: NodeRef },

    // 演算子
    AddChain { first: NodeRef, rest: Vec<(AddOp, NodeRef)> },
    MulChain { first: NodeRef, rest: Vec<(MulOp, NodeRef)> },
    LogicChain { op: LogicOp, operands: Vec<NodeRef> },
    Compare { op: CompareOp, lhs: NodeRef, rhs: NodeRef },
    Power { base: NodeRef, exponent: NodeRef },
    Not(NodeRef),
    Negate(NodeRef),
    Assign { target: NodeRef, value: NodeRef },

    // 後置
    Member { base: NodeRef, name: String },
    Index { base: NodeRef, index: NodeRef },
    Call { callee: NodeRef, args: Vec<NodeRef> },

    // 文
    Block(Vec<NodeRef>),
    If { condition: NodeRef, then_branch: NodeRef, else_branch: Option<NodeRef> },
    While { condition: NodeRef, body: NodeRef },
    RepeatUntil { body: Vec<NodeRef>, condition: NodeRef },
    For { target: NodeRef, from: NodeRef, to: NodeRef, step: Option<NodeRef>, body: NodeRef },
    ForEach { reference: bool, id: String, collection: NodeRef, body: NodeRef },
    Declare { ty: NodeRef, name: String },
    DeclareReference { name: String, target: NodeRef },
    DeclareType { ty: NodeRef, name: String },
    DeclareFunction { name: String, params: Vec<Param>, body: NodeRef },
    LockStatement(String),
    Return(NodeRef),
    Assert { condition: NodeRef, text: String },
    Switch { scrutinee: NodeRef, cases: Vec<SwitchCase>, otherwise: Option<NodeRef> },

    // 型記述子
    BooleanType,
    IntegerType,
    RangedIntegerType { min: NodeRef, max: NodeRef, bounds: NodeRef },
    RealType,
    RangedRealType { min: NodeRef, max: NodeRef, bounds: NodeRef },
    StringType,
    ArrayType { from: NodeRef, to: NodeRef, element: NodeRef },
    DictionaryType,
    StructureType(Vec<(String, NodeRef)>),
}

impl Node {
    /// コンパイル時定数として扱えるノードかどうか
    ///
    /// 範囲付き型や配列型は、境界の式がリテラルである場合に限り
    /// リテラル扱いになる。
    pub fn is_literal(&self) -> bool {
        match &self.kind {
            NodeKind::Null
            | NodeKind::BooleanLit(_)
            | NodeKind::IntegerLit(_)
            | NodeKind::RealLit(_)
            | NodeKind::StringLit(_) => true,

            NodeKind::ArrayLit(elements) => elements.iter().all(|e| e.is_literal()),

            NodeKind::BooleanType
            | NodeKind::IntegerType
            | NodeKind::RealType
            | NodeKind::StringType
            | NodeKind::DictionaryType => true,

            NodeKind::RangedIntegerType { min, max, bounds }
            | NodeKind::RangedRealType { min, max, bounds } => {
                min.is_literal() && max.is_literal() && bounds.is_literal()
            }

            NodeKind::ArrayType { from, to, element } => {
                from.is_literal() && to.is_literal() && element.is_literal()
            }

            NodeKind::StructureType(members) => {
                members.iter().all(|(_, ty)| ty.is_literal())
            }

            _ => false,
        }
    }
}
