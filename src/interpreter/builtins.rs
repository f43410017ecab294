//! 組み込み関数と定数
//!
//! 組み込み関数はスクリプトの関数と同じ名前マングリング（`名前_引数の数`）
//! でベーステーブルへ登録される。同名でも引数の数が違えば別のシンボルに
//! なる。エラー種別の整数コードは `ERR_*`、範囲付き型の境界動作は
//! `BOUNDS_*` のロック済み定数として公開される。

use std::time::Duration;

use crate::ast::Param;
use crate::error::{ErrorKind, RuntimeError};

use super::exec;
use super::ops;
use super::scope::SymbolTable;
use super::value::{BuiltinFn, ExecKind, ExecutableValue, Value};
use super::{Context, Unwind};

/// 組み込み関数と定数をベーステーブルへ登録する
pub fn register_base(scope: &mut SymbolTable) -> Result<(), RuntimeError> {
    let builtins: &[(&'static str, usize, BuiltinFn)] = &[
        ("Println_0", 0, println_0),
        ("Println_1", 1, println_1),
        ("Print_1", 1, print_1),
        ("IsExactlyEqual_2", 2, is_exactly_equal),
        ("Clone_1", 1, clone_value),
        ("Copy_1", 1, copy_value),
        ("IsLocked_1", 1, is_locked),
        ("IsNull_1", 1, is_null),
        ("TypeOf_1", 1, type_of),
        ("TypeId_1", 1, type_id),
        ("SymbolExists_1", 1, symbol_exists),
        ("IsEntryPoint_0", 0, is_entry_point),
        ("ReleaseCachedNodes_0", 0, release_cached_nodes),
        ("Terminate_0", 0, terminate_0),
        ("Terminate_1", 1, terminate_1),
        ("Sleep_1", 1, sleep),
        ("Add_2", 2, array_add_2),
        ("Add_3", 3, array_add_3),
        ("Swap_3", 3, array_swap),
        ("Keys_1", 1, dictionary_keys),
        ("OnErrorPush_2", 2, on_error_push),
        ("OnErrorPop_1", 1, on_error_pop),
        ("OnErrorInvoke_1", 1, on_error_invoke_1),
        ("OnErrorInvoke_2", 2, on_error_invoke_2),
    ];

    for (name, arity, f) in builtins.iter().copied() {
        let params = (0..arity)
            .map(|i| Param {
                name: format!("arg{}", i),
                reference: true,
            })
            .collect();

        let value = Value::executable(ExecutableValue {
            params,
            kind: ExecKind::Builtin { name, f },
        });
        value.lock();
        scope.insert_base(name, value)?;
    }

    // エラー種別の整数コード
    for kind in [
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
        ErrorKind::FailedAssertion,
    ] {
        scope.insert_base(kind.constant_name(), Value::locked_integer(kind.code()))?;
    }

    // 範囲付き型の境界動作
    scope.insert_base("BOUNDS_ERROR", Value::locked_integer(0))?;
    scope.insert_base("BOUNDS_CAP", Value::locked_integer(1))?;
    scope.insert_base("BOUNDS_ROLLOVER", Value::locked_integer(2))?;

    Ok(())
}

fn rt(error: RuntimeError) -> Unwind {
    Unwind::Error(error)
}

fn println_0(_ctx: &mut Context, _args: &[Value]) -> Result<Value, Unwind> {
    println!();
    Ok(Value::null())
}

fn println_1(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    println!("{}", args[0]);
    Ok(Value::null())
}

fn print_1(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    print!("{}", args[0]);
    Ok(Value::null())
}

fn is_exactly_equal(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    Ok(Value::boolean(ops::exact_equal(&args[0], &args[1])))
}

fn clone_value(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    args[0].deep_clone().map_err(rt)
}

fn copy_value(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    args[0].copy_unlocked().map_err(rt)
}

fn is_locked(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    Ok(Value::boolean(args[0].is_locked()))
}

fn is_null(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    Ok(Value::boolean(args[0].is_null()))
}

fn type_of(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let spec = args[0].type_spec().map_err(rt)?;
    Ok(Value::type_value(spec))
}

fn type_id(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    Ok(Value::integer(args[0].kind().code()))
}

fn symbol_exists(ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let name = args[0].as_string().map_err(rt)?;
    Ok(Value::boolean(ctx.scope.exists(&name)))
}

fn is_entry_point(ctx: &mut Context, _args: &[Value]) -> Result<Value, Unwind> {
    Ok(Value::boolean(ctx.entry_point))
}

fn release_cached_nodes(ctx: &mut Context, _args: &[Value]) -> Result<Value, Unwind> {
    let released = ctx.caches.borrow_mut().release();
    log::debug!("ノードキャッシュを{}件解放しました", released);
    Ok(Value::integer(released as i64))
}

fn terminate_0(_ctx: &mut Context, _args: &[Value]) -> Result<Value, Unwind> {
    Err(Unwind::Terminate(0))
}

fn terminate_1(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let status = args[0].as_integer().map_err(rt)?;
    Err(Unwind::Terminate(status))
}

/// 指定秒数だけ呼び出し側のスレッドをブロックする
fn sleep(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let seconds = args[0].as_real().map_err(rt)?;
    if seconds < 0.0 || !seconds.is_finite() {
        return Err(rt(RuntimeError::new(
            ErrorKind::IllegalValue,
            format!("{}秒のスリープはできません", seconds),
        )));
    }

    std::thread::sleep(Duration::from_secs_f64(seconds));
    Ok(Value::null())
}

fn array_add_2(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let index = args[0].array_add(args[1].clone(), None).map_err(rt)?;
    Ok(Value::integer(index))
}

fn array_add_3(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let position = args[2].as_integer().map_err(rt)?;
    let index = args[0]
        .array_add(args[1].clone(), Some(position))
        .map_err(rt)?;
    Ok(Value::integer(index))
}

fn array_swap(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let i = args[1].as_integer().map_err(rt)?;
    let j = args[2].as_integer().map_err(rt)?;
    args[0].array_swap(i, j).map_err(rt)?;
    Ok(Value::null())
}

fn dictionary_keys(_ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    args[0].dictionary_keys().map_err(rt)
}

fn error_kind_argument(value: &Value) -> Result<ErrorKind, Unwind> {
    let code = value.as_integer().map_err(rt)?;
    ErrorKind::from_code(code).ok_or_else(|| {
        rt(RuntimeError::new(
            ErrorKind::IllegalValue,
            format!("{}はエラー種別のコードではありません", code),
        ))
    })
}

fn on_error_push(ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let kind = error_kind_argument(&args[0])?;
    ctx.callbacks.push(kind, args[1].clone()).map_err(rt)?;
    Ok(Value::null())
}

fn on_error_pop(ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let kind = error_kind_argument(&args[0])?;
    ctx.callbacks.pop(kind).map_err(rt)?;
    Ok(Value::null())
}

fn on_error_invoke_1(ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let kind = error_kind_argument(&args[0])?;
    let error = RuntimeError::new(kind, kind.to_string());
    let invoked = exec::invoke_error_handler(ctx, &error)?;
    Ok(Value::boolean(invoked))
}

fn on_error_invoke_2(ctx: &mut Context, args: &[Value]) -> Result<Value, Unwind> {
    let kind = error_kind_argument(&args[0])?;
    let message = args[1].as_string().map_err(rt)?;
    let error = RuntimeError::new(kind, message);
    let invoked = exec::invoke_error_handler(ctx, &error)?;
    Ok(Value::boolean(invoked))
}
