//! 構文木のノードの実行
//!
//! 実行は木を直接たどる再帰で、`return` と `Terminate` は `Unwind` として
//! 結果の `Err` 側を伝って上へ運ばれる。`return` は関数呼び出しが受け止め、
//! `Terminate` は最上位のドライバまで届く。

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::{CompareOp, Node, NodeKind, NodeRef};
use crate::error::{ErrorKind, Location, RuntimeError};

use super::ops;
use super::scope::{Frame, SymbolTable};
use super::value::{ExecKind, ExecutableValue, RangeBounds, TypeSpec, TypeTag, Value};
use super::{Context, ExecResult, Unwind};

/// 実行時エラーにノードの位置を補って `Unwind` にする
fn locate(error: RuntimeError, node: &Node) -> Unwind {
    Unwind::Error(error.with_location(&node.location))
}

/// フレームを積んで本体を実行し、どう抜けてもフレームを畳む
fn with_frame(
    ctx: &mut Context,
    frame: Frame,
    f: impl FnOnce(&mut Context) -> ExecResult,
) -> ExecResult {
    ctx.scope.push_frame(frame).map_err(Unwind::Error)?;
    let result = f(ctx);
    ctx.scope.pop();
    result
}

/// ノードを一つ実行する
pub fn execute(node: &Node, ctx: &mut Context) -> ExecResult {
    match &node.kind {
        NodeKind::Null => Ok(Value::null()),
        NodeKind::BooleanLit(v) => Ok(Value::boolean(*v)),
        NodeKind::IntegerLit(v) => Ok(Value::integer(*v)),
        NodeKind::RealLit(v) => Ok(Value::real(*v)),
        NodeKind::StringLit(s) => Ok(Value::string(s.clone())),

        NodeKind::Identifier { name, base_only } => {
            let result = if *base_only {
                ctx.scope.lookup_in_base(name)
            } else {
                ctx.scope.lookup(name)
            };
            result.map_err(|e| locate(e, node))
        }

        NodeKind::ArrayLit(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(execute(element, ctx)?);
            }
            Ok(Value::array(0, values))
        }

        NodeKind::Lambda { params, body } => Ok(Value::executable(ExecutableValue {
            params: params.clone(),
            kind: ExecKind::Script {
                body: NodeRef::clone(body),
            },
        })),

        // チェーンは左から畳み込む。オペランドはすべて評価される。
        NodeKind::AddChain { first, rest } => {
            let mut acc = execute(first, ctx)?;
            for (op, operand) in rest {
                let rhs = execute(operand, ctx)?;
                acc = ops::add_step(*op, &acc, &rhs).map_err(|e| locate(e, node))?;
            }
            Ok(acc)
        }

        NodeKind::MulChain { first, rest } => {
            let mut acc = execute(first, ctx)?;
            for (op, operand) in rest {
                let rhs = execute(operand, ctx)?;
                acc = ops::mul_step(*op, &acc, &rhs).map_err(|e| locate(e, node))?;
            }
            Ok(acc)
        }

        // 論理チェーンは短絡しない
        NodeKind::LogicChain { op, operands } => {
            let mut values = Vec::with_capacity(operands.len());
            for operand in operands {
                values.push(execute(operand, ctx)?);
            }

            let mut iter = values.into_iter();
            let mut acc = iter.next().unwrap_or_else(Value::null);
            for rhs in iter {
                acc = ops::logic_step(*op, &acc, &rhs).map_err(|e| locate(e, node))?;
            }
            Ok(acc)
        }

        NodeKind::Compare { op, lhs, rhs } => {
            let a = execute(lhs, ctx)?;
            let b = execute(rhs, ctx)?;
            let result = ops::compare(*op, &a, &b).map_err(|e| locate(e, node))?;
            Ok(Value::boolean(result))
        }

        NodeKind::Power { base, exponent } => {
            let a = execute(base, ctx)?;
            let b = execute(exponent, ctx)?;
            ops::op_power(&a, &b).map_err(|e| locate(e, node))
        }

        NodeKind::Not(operand) => {
            let v = execute(operand, ctx)?;
            ops::op_not(&v).map_err(|e| locate(e, node))
        }

        NodeKind::Negate(operand) => {
            let v = execute(operand, ctx)?;
            ops::op_negate(&v).map_err(|e| locate(e, node))
        }

        NodeKind::Assign { target, value } => {
            let cell = execute(target, ctx)?;
            let v = execute(value, ctx)?;
            cell.assign(&v).map_err(|e| locate(e, node))?;
            Ok(cell)
        }

        NodeKind::Member { base, name } => {
            let value = execute(base, ctx)?;
            value.member(name).map_err(|e| locate(e, node))
        }

        NodeKind::Index { base, index } => {
            let value = execute(base, ctx)?;
            let i = execute(index, ctx)?;
            value.index(&i).map_err(|e| locate(e, node))
        }

        NodeKind::Call { callee, args } => {
            // マングルされた名前が見つからなければ、素の名前に束縛された
            // 呼び出し可能な値（仮引数やラムダ変数）を探す
            let callee_value = match &callee.kind {
                NodeKind::Identifier { name, base_only } => {
                    let lookup = |ctx: &Context, name: &str| {
                        if *base_only {
                            ctx.scope.lookup_in_base(name)
                        } else {
                            ctx.scope.lookup(name)
                        }
                    };

                    match lookup(ctx, name) {
                        Ok(value) => value,
                        Err(missing) if missing.kind == ErrorKind::NoSuchSymbol => {
                            let base = name.rsplit_once('_').map(|(base, _)| base);
                            let fallback = base.and_then(|base| lookup(ctx, base).ok());
                            match fallback {
                                Some(value) => value,
                                None => return Err(locate(missing, node)),
                            }
                        }
                        Err(e) => return Err(locate(e, node)),
                    }
                }
                _ => execute(callee, ctx)?,
            };
            let exec = callee_value.as_executable().map_err(|e| locate(e, node))?;

            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                arg_values.push(execute(arg, ctx)?);
            }

            call_executable(ctx, &exec, &arg_values, &node.location)
        }

        NodeKind::Block(statements) => with_frame(ctx, Frame::new(), |ctx| {
            let mut result = Value::null();
            for statement in statements {
                result = execute(statement, ctx)?;
            }
            Ok(result)
        }),

        NodeKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let cond = execute(condition, ctx)?;
            if cond.as_boolean().map_err(|e| locate(e, node))? {
                execute(then_branch, ctx)
            } else if let Some(else_branch) = else_branch {
                execute(else_branch, ctx)
            } else {
                Ok(Value::null())
            }
        }

        NodeKind::While { condition, body } => {
            loop {
                let cond = execute(condition, ctx)?;
                if !cond.as_boolean().map_err(|e| locate(e, node))? {
                    break;
                }
                execute(body, ctx)?;
            }
            Ok(Value::null())
        }

        NodeKind::RepeatUntil { body, condition } => {
            loop {
                for statement in body {
                    execute(statement, ctx)?;
                }
                let cond = execute(condition, ctx)?;
                if cond.as_boolean().map_err(|e| locate(e, node))? {
                    break;
                }
            }
            Ok(Value::null())
        }

        // 上限は包含。ループはカーソルを別に持ち、各周回の頭で変数へ
        // 代入し直すため、本体が変数を書き換えても周回は進む。
        // 脱出判定が偽になった後、上限の値で本体がもう一度実行される。
        NodeKind::For {
            target,
            from,
            to,
            step,
            body,
        } => {
            let cell = execute(target, ctx)?;
            let mut cursor = execute(from, ctx)?;
            cell.assign(&cursor).map_err(|e| locate(e, node))?;

            loop {
                let limit = execute(to, ctx)?;
                let keep_going = ops::compare(CompareOp::NotEqual, &cell, &limit)
                    .map_err(|e| locate(e, node))?;
                if !keep_going {
                    break;
                }

                execute(body, ctx)?;

                let step_value = match step {
                    Some(step) => execute(step, ctx)?,
                    None => Value::integer(1),
                };
                cursor = ops::op_add(&cursor, &step_value).map_err(|e| locate(e, node))?;
                cell.assign(&cursor).map_err(|e| locate(e, node))?;
            }

            execute(body, ctx)?;
            Ok(Value::null())
        }

        NodeKind::ForEach {
            reference,
            id,
            collection,
            body,
        } => {
            let value = execute(collection, ctx)?;
            match value.kind() {
                TypeTag::Array => {
                    let (start, finish) = value.array_range().map_err(|e| locate(e, node))?;
                    for i in start..=finish {
                        let element = value
                            .index(&Value::integer(i))
                            .map_err(|e| locate(e, node))?;
                        let bound = if *reference {
                            element
                        } else {
                            element.deep_clone().map_err(|e| locate(e, node))?
                        };

                        let mut frame = Frame::new();
                        frame.insert(id.clone(), bound);
                        with_frame(ctx, frame, |ctx| execute(body, ctx))?;
                    }
                    Ok(Value::null())
                }

                // 辞書は {key, value} の構造体を束縛して回る
                TypeTag::Dictionary => {
                    let keys = value.dictionary_keys().map_err(|e| locate(e, node))?;
                    let (start, finish) = keys.array_range().map_err(|e| locate(e, node))?;

                    for i in start..=finish {
                        let key = keys
                            .index(&Value::integer(i))
                            .map_err(|e| locate(e, node))?;
                        let entry = value.index(&key).map_err(|e| locate(e, node))?;
                        let bound = if *reference {
                            entry
                        } else {
                            entry.deep_clone().map_err(|e| locate(e, node))?
                        };

                        let mut members = IndexMap::new();
                        members.insert("key".to_string(), key);
                        members.insert("value".to_string(), bound);

                        let mut frame = Frame::new();
                        frame.insert(id.clone(), Value::structure(members));
                        with_frame(ctx, frame, |ctx| execute(body, ctx))?;
                    }
                    Ok(Value::null())
                }

                other => Err(locate(
                    RuntimeError::new(
                        ErrorKind::IllegalCast,
                        format!("{}型の値は反復できません", other.name()),
                    ),
                    node,
                )),
            }
        }

        NodeKind::Declare { ty, name } => {
            let type_value = execute(ty, ctx)?;
            let spec = spec_of(&type_value).map_err(|e| locate(e, node))?;
            let cell = spec.instantiate();
            ctx.scope
                .insert(name, cell.clone())
                .map_err(|e| locate(e, node))?;
            Ok(cell)
        }

        NodeKind::DeclareReference { name, target } => {
            let cell = execute(target, ctx)?;
            ctx.scope
                .insert(name, cell.clone())
                .map_err(|e| locate(e, node))?;
            Ok(cell)
        }

        NodeKind::DeclareType { ty, name } => {
            let type_value = execute(ty, ctx)?;
            // 型の値であることを確認してから束縛する
            spec_of(&type_value).map_err(|e| locate(e, node))?;
            ctx.scope
                .insert(name, type_value.clone())
                .map_err(|e| locate(e, node))?;
            Ok(type_value)
        }

        NodeKind::DeclareFunction { name, params, body } => {
            let value = Value::executable(ExecutableValue {
                params: params.clone(),
                kind: ExecKind::Script {
                    body: NodeRef::clone(body),
                },
            });
            ctx.scope
                .insert(name, value.clone())
                .map_err(|e| locate(e, node))?;
            Ok(value)
        }

        NodeKind::LockStatement(name) => {
            let value = ctx.scope.lookup(name).map_err(|e| locate(e, node))?;
            value.lock();
            Ok(Value::null())
        }

        NodeKind::Return(expr) => {
            let value = execute(expr, ctx)?;
            Err(Unwind::Return(value))
        }

        NodeKind::Assert { condition, text } => {
            let value = execute(condition, ctx)?;
            if value.as_boolean().map_err(|e| locate(e, node))? {
                Ok(Value::null())
            } else {
                Err(Unwind::Error(RuntimeError::at(
                    ErrorKind::FailedAssertion,
                    format!("Assert failed: {}.", text),
                    node.location.clone(),
                )))
            }
        }

        NodeKind::Switch {
            scrutinee,
            cases,
            otherwise,
        } => {
            let value = execute(scrutinee, ctx)?;

            for case in cases {
                let guard = execute(&case.guard, ctx)?;
                let matched = ops::compare(CompareOp::Equal, &value, &guard)
                    .map_err(|e| locate(e, node))?;
                if matched {
                    return execute(&case.body, ctx);
                }
            }

            if let Some(otherwise) = otherwise {
                execute(otherwise, ctx)
            } else {
                Err(locate(
                    RuntimeError::new(
                        ErrorKind::IllegalValue,
                        "switchのどの分岐にも一致しませんでした",
                    ),
                    node,
                ))
            }
        }

        NodeKind::BooleanType
        | NodeKind::IntegerType
        | NodeKind::RangedIntegerType { .. }
        | NodeKind::RealType
        | NodeKind::RangedRealType { .. }
        | NodeKind::StringType
        | NodeKind::ArrayType { .. }
        | NodeKind::DictionaryType
        | NodeKind::StructureType(_) => {
            let spec = type_spec(node, ctx)?;
            Ok(Value::type_value(spec))
        }
    }
}

/// 型記述子のノードを評価して型記述子を作る
fn type_spec(node: &Node, ctx: &mut Context) -> Result<TypeSpec, Unwind> {
    match &node.kind {
        NodeKind::BooleanType => Ok(TypeSpec::Boolean),
        NodeKind::IntegerType => Ok(TypeSpec::Integer),
        NodeKind::RealType => Ok(TypeSpec::Real),
        NodeKind::StringType => Ok(TypeSpec::String),
        NodeKind::DictionaryType => Ok(TypeSpec::Dictionary),

        NodeKind::RangedIntegerType { min, max, bounds } => {
            let min_v = execute(min, ctx)?.as_integer().map_err(|e| locate(e, node))?;
            let max_v = execute(max, ctx)?.as_integer().map_err(|e| locate(e, node))?;
            let bounds = bounds_mode(bounds, ctx, node)?;
            check_range_order(min_v > max_v, node)?;

            Ok(TypeSpec::RangedInteger {
                min: min_v,
                max: max_v,
                bounds,
            })
        }

        NodeKind::RangedRealType { min, max, bounds } => {
            let min_v = execute(min, ctx)?.as_real().map_err(|e| locate(e, node))?;
            let max_v = execute(max, ctx)?.as_real().map_err(|e| locate(e, node))?;
            let bounds = bounds_mode(bounds, ctx, node)?;
            check_range_order(min_v > max_v, node)?;

            Ok(TypeSpec::RangedReal {
                min: min_v,
                max: max_v,
                bounds,
            })
        }

        NodeKind::ArrayType { from, to, element } => {
            let start = execute(from, ctx)?.as_integer().map_err(|e| locate(e, node))?;
            let finish = execute(to, ctx)?.as_integer().map_err(|e| locate(e, node))?;
            check_range_order(start > finish, node)?;

            let element_value = execute(element, ctx)?;
            let element = spec_of(&element_value).map_err(|e| locate(e, node))?;

            Ok(TypeSpec::Array {
                start,
                finish,
                element: std::rc::Rc::new(element),
            })
        }

        NodeKind::StructureType(members) => {
            let mut specs = Vec::with_capacity(members.len());
            for (name, ty) in members {
                let type_value = execute(ty, ctx)?;
                let spec = spec_of(&type_value).map_err(|e| locate(e, node))?;
                specs.push((name.clone(), spec));
            }
            Ok(TypeSpec::Structure(specs))
        }

        _ => {
            // declare type で束縛された名前付きの型など
            let value = execute(node, ctx)?;
            spec_of(&value).map_err(|e| locate(e, node))
        }
    }
}

fn bounds_mode(bounds: &Node, ctx: &mut Context, parent: &Node) -> Result<RangeBounds, Unwind> {
    let code = execute(bounds, ctx)?
        .as_integer()
        .map_err(|e| locate(e, parent))?;

    RangeBounds::from_code(code).ok_or_else(|| {
        locate(
            RuntimeError::new(
                ErrorKind::IllegalValue,
                format!("{}は境界動作の指定として不正です", code),
            ),
            parent,
        )
    })
}

fn check_range_order(reversed: bool, node: &Node) -> Result<(), Unwind> {
    if reversed {
        Err(locate(
            RuntimeError::new(ErrorKind::RangeError, "範囲の下限が上限を超えています"),
            node,
        ))
    } else {
        Ok(())
    }
}

/// 値から型記述子を取り出す（型の値でなければエラー）
fn spec_of(value: &Value) -> Result<TypeSpec, RuntimeError> {
    if value.kind() != TypeTag::Type {
        return Err(RuntimeError::new(
            ErrorKind::IllegalCast,
            format!("{}型の値は型として使えません", value.kind().name()),
        ));
    }
    value.type_spec()
}

/// 呼び出し可能な値を実引数で呼ぶ
///
/// 参照仮引数は呼び出し側のセルをそのまま束縛し、値仮引数は深い複製を
/// 束縛する。`return` はここで受け止められて通常の戻り値になる。
pub fn call_executable(
    ctx: &mut Context,
    exec: &ExecutableValue,
    args: &[Value],
    location: &Location,
) -> ExecResult {
    if exec.params.len() != args.len() {
        return Err(Unwind::Error(RuntimeError::at(
            ErrorKind::IllegalValue,
            format!(
                "引数の数が一致しません: {}個の仮引数に{}個の実引数が渡されました",
                exec.params.len(),
                args.len()
            ),
            location.clone(),
        )));
    }

    match &exec.kind {
        ExecKind::Builtin { f, .. } => f(ctx, args),

        ExecKind::Script { body } => {
            let mut frame = Frame::new();
            for (param, arg) in exec.params.iter().zip(args) {
                let bound = if param.reference {
                    arg.clone()
                } else {
                    arg.deep_clone()
                        .map_err(|e| Unwind::Error(e.with_location(location)))?
                };
                frame.insert(param.name.clone(), bound);
            }

            let body = NodeRef::clone(body);
            let result = with_frame(ctx, frame, |ctx| execute(&body, ctx));

            match result {
                Err(Unwind::Return(value)) => Ok(value),
                other => other,
            }
        }
    }
}

/// エラーに対応するハンドラを呼ぶ。呼ばれたかどうかを返す。
///
/// ハンドラには `{Location, Message}` のロック済み構造体が渡される。
pub fn invoke_error_handler(
    ctx: &mut Context,
    error: &RuntimeError,
) -> Result<bool, Unwind> {
    let Some(handler) = ctx.callbacks.top(error.kind) else {
        return Ok(false);
    };
    let exec = handler.as_executable().map_err(Unwind::Error)?;

    let location = error
        .location
        .clone()
        .unwrap_or_else(Location::unknown);

    let mut members = IndexMap::new();
    members.insert(
        "Location".to_string(),
        Value::string(location.to_string()),
    );
    members.insert("Message".to_string(), Value::string(error.message.clone()));

    let arg = Value::structure(members);
    arg.lock();

    call_executable(ctx, &exec, &[arg], &location)?;
    Ok(true)
}

/// 静的検査の間の名前解決の状態
///
/// 宣言はプレースホルダとしてフレームに積まれ、識別子は解決できるか
/// どうかだけを検査する。実行中のシンボルテーブル（組み込み関数や
/// REPLで定義済みの名前）も解決の対象になる。
pub struct ValidationScope<'a> {
    table: &'a SymbolTable,
    frames: Vec<HashSet<String>>,
}

impl<'a> ValidationScope<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        // 先頭のフレームがトップレベル宣言のプレースホルダを受け取る
        Self {
            table,
            frames: vec![HashSet::new()],
        }
    }

    fn push(&mut self) {
        self.frames.push(HashSet::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn declare(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string());
        }
    }

    fn resolves(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|frame| frame.contains(name)) || self.table.exists(name)
    }

    /// アクセント付き識別子の解決。トップレベルのプレースホルダは
    /// 実行時にベーステーブルへ入るので解決対象に含める。
    fn resolves_in_base(&self, name: &str) -> bool {
        self.frames.first().is_some_and(|frame| frame.contains(name))
            || self.table.lookup_in_base(name).is_ok()
    }
}

fn unresolved(name: &str, node: &Node) -> RuntimeError {
    RuntimeError::at(
        ErrorKind::NoSuchSymbol,
        format!("シンボル '{}' は宣言されていません", name),
        node.location.clone(),
    )
}

/// 実行せずに構文木を静的に検査する
///
/// 境界がリテラルで書かれた範囲付き型の上下関係を検査し、宣言を
/// プレースホルダとして記録しながら識別子が解決できるかを確かめる。
pub fn validate(node: &Node, scope: &mut ValidationScope<'_>) -> Result<(), RuntimeError> {
    match &node.kind {
        NodeKind::Identifier { name, base_only } => {
            let found = if *base_only {
                scope.resolves_in_base(name)
            } else {
                scope.resolves(name)
            };
            if found {
                Ok(())
            } else {
                Err(unresolved(name, node))
            }
        }

        NodeKind::RangedIntegerType { min, max, bounds } => {
            if let (NodeKind::IntegerLit(lo), NodeKind::IntegerLit(hi)) = (&min.kind, &max.kind) {
                if lo > hi {
                    return Err(RuntimeError::at(
                        ErrorKind::RangeError,
                        "範囲の下限が上限を超えています",
                        node.location.clone(),
                    ));
                }
            }
            validate(min, scope)?;
            validate(max, scope)?;
            validate(bounds, scope)
        }

        NodeKind::RangedRealType { min, max, bounds } => {
            if let (NodeKind::RealLit(lo), NodeKind::RealLit(hi)) = (&min.kind, &max.kind) {
                if lo > hi {
                    return Err(RuntimeError::at(
                        ErrorKind::RangeError,
                        "範囲の下限が上限を超えています",
                        node.location.clone(),
                    ));
                }
            }
            validate(min, scope)?;
            validate(max, scope)?;
            validate(bounds, scope)
        }

        NodeKind::ArrayType { from, to, element } => {
            if let (NodeKind::IntegerLit(lo), NodeKind::IntegerLit(hi)) = (&from.kind, &to.kind) {
                if lo > hi {
                    return Err(RuntimeError::at(
                        ErrorKind::RangeError,
                        "配列の添字範囲の下限が上限を超えています",
                        node.location.clone(),
                    ));
                }
            }
            validate(from, scope)?;
            validate(to, scope)?;
            validate(element, scope)
        }

        NodeKind::ArrayLit(nodes) => nodes.iter().try_for_each(|n| validate(n, scope)),

        NodeKind::Lambda { params, body } => {
            scope.push();
            for param in params {
                scope.declare(&param.name);
            }
            let result = validate(body, scope);
            scope.pop();
            result
        }

        NodeKind::AddChain { first, rest } => {
            validate(first, scope)?;
            rest.iter().try_for_each(|(_, n)| validate(n, scope))
        }
        NodeKind::MulChain { first, rest } => {
            validate(first, scope)?;
            rest.iter().try_for_each(|(_, n)| validate(n, scope))
        }
        NodeKind::LogicChain { operands, .. } => {
            operands.iter().try_for_each(|n| validate(n, scope))
        }
        NodeKind::Compare { lhs, rhs, .. } => {
            validate(lhs, scope)?;
            validate(rhs, scope)
        }
        NodeKind::Power { base, exponent } => {
            validate(base, scope)?;
            validate(exponent, scope)
        }
        NodeKind::Not(operand) | NodeKind::Negate(operand) | NodeKind::Return(operand) => {
            validate(operand, scope)
        }
        NodeKind::Assign { target, value } => {
            validate(target, scope)?;
            validate(value, scope)
        }
        NodeKind::Member { base, .. } => validate(base, scope),
        NodeKind::Index { base, index } => {
            validate(base, scope)?;
            validate(index, scope)
        }

        NodeKind::Call { callee, args } => {
            // 実行時と同じく、修飾名が無ければ元の名前でも引いてみる
            match &callee.kind {
                NodeKind::Identifier { name, base_only } => {
                    let resolves = |scope: &ValidationScope<'_>, name: &str| {
                        if *base_only {
                            scope.resolves_in_base(name)
                        } else {
                            scope.resolves(name)
                        }
                    };
                    let base = name.rsplit_once('_').map(|(base, _)| base);
                    let found = resolves(scope, name)
                        || base.is_some_and(|base| resolves(scope, base));
                    if !found {
                        return Err(unresolved(name, callee));
                    }
                }
                _ => validate(callee, scope)?,
            }
            args.iter().try_for_each(|n| validate(n, scope))
        }

        NodeKind::Block(statements) => {
            scope.push();
            let result = statements.iter().try_for_each(|n| validate(n, scope));
            scope.pop();
            result
        }

        NodeKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            validate(condition, scope)?;
            validate(then_branch, scope)?;
            else_branch.as_deref().map_or(Ok(()), |n| validate(n, scope))
        }
        NodeKind::While { condition, body } => {
            validate(condition, scope)?;
            validate(body, scope)
        }
        NodeKind::RepeatUntil { body, condition } => {
            body.iter().try_for_each(|n| validate(n, scope))?;
            validate(condition, scope)
        }
        NodeKind::For {
            target,
            from,
            to,
            step,
            body,
        } => {
            validate(target, scope)?;
            validate(from, scope)?;
            validate(to, scope)?;
            step.as_deref().map_or(Ok(()), |n| validate(n, scope))?;
            validate(body, scope)
        }
        NodeKind::ForEach {
            id,
            collection,
            body,
            ..
        } => {
            validate(collection, scope)?;
            scope.push();
            scope.declare(id);
            let result = validate(body, scope);
            scope.pop();
            result
        }

        NodeKind::Declare { ty, name } | NodeKind::DeclareType { ty, name } => {
            validate(ty, scope)?;
            scope.declare(name);
            Ok(())
        }
        NodeKind::DeclareReference { name, target } => {
            validate(target, scope)?;
            scope.declare(name);
            Ok(())
        }
        NodeKind::DeclareFunction { name, params, body } => {
            scope.declare(name);
            scope.push();
            for param in params {
                scope.declare(&param.name);
            }
            let result = validate(body, scope);
            scope.pop();
            result
        }

        NodeKind::LockStatement(name) => {
            if scope.resolves(name) {
                Ok(())
            } else {
                Err(unresolved(name, node))
            }
        }

        NodeKind::Assert { condition, .. } => validate(condition, scope),
        NodeKind::Switch {
            scrutinee,
            cases,
            otherwise,
        } => {
            validate(scrutinee, scope)?;
            for case in cases {
                validate(&case.guard, scope)?;
                validate(&case.body, scope)?;
            }
            otherwise.as_deref().map_or(Ok(()), |n| validate(n, scope))
        }
        NodeKind::StructureType(members) => {
            members.iter().try_for_each(|(_, ty)| validate(ty, scope))
        }

        NodeKind::Null
        | NodeKind::BooleanLit(_)
        | NodeKind::IntegerLit(_)
        | NodeKind::RealLit(_)
        | NodeKind::StringLit(_)
        | NodeKind::BooleanType
        | NodeKind::IntegerType
        | NodeKind::RealType
        | NodeKind::StringType
        | NodeKind::DictionaryType => Ok(()),
    }
}

/// `ErrorCallbacks` を使って完了時のチェーンを起動する補助
///
/// 正常終了では ok、明示的な終了では terminate のどちらか一方だけが
/// 呼ばれる。
pub fn fire_completion(
    ctx: &mut Context,
    kind: ErrorKind,
    message: &str,
) -> Result<bool, Unwind> {
    let error = RuntimeError::new(kind, message);
    invoke_error_handler(ctx, &error)
}
