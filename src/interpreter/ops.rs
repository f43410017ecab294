//! 値の二項・単項演算
//!
//! 数値演算は Boolean/Integer/Real を数値として昇格する。`+` だけは
//! どちらかのオペランドが文字列なら連結になる。比較は文字列と数値の
//! 組み合わせで文字列を数値として解釈する。順序比較と「厳密な等価」
//! （`IsExactlyEqual`）は別の仕組みで、後者は型タグの一致を要求する。

use crate::ast::{AddOp, CompareOp, LogicOp, MulOp};
use crate::error::{ErrorKind, RuntimeError};

use super::value::{TypeTag, Value, ValueData};

/// 数値として解釈したオペランド
enum Num {
    Int(i64),
    Real(f64),
}

fn numeric(value: &Value) -> Option<Num> {
    value.with_data(|data| match data {
        ValueData::Boolean(v) => Some(Num::Int(i64::from(*v))),
        ValueData::Integer(v) | ValueData::RangedInteger { value: v, .. } => Some(Num::Int(*v)),
        ValueData::Real(v) | ValueData::RangedReal { value: v, .. } => Some(Num::Real(*v)),
        _ => None,
    })
}

fn numeric_operands(a: &Value, b: &Value, op_name: &str) -> Result<(Num, Num), RuntimeError> {
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(RuntimeError::new(
            ErrorKind::IllegalCast,
            format!(
                "{}型と{}型には{}を適用できません",
                a.kind().name(),
                b.kind().name(),
                op_name
            ),
        )),
    }
}

fn overflow(op_name: &str) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::RangeError,
        format!("整数の{}がオーバーフローしました", op_name),
    )
}

/// 加算チェーンの一ステップ
pub fn add_step(op: AddOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match op {
        AddOp::Add => op_add(lhs, rhs),
        AddOp::Subtract => op_subtract(lhs, rhs),
    }
}

/// 乗算チェーンの一ステップ
pub fn mul_step(op: MulOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match op {
        MulOp::Multiply => op_multiply(lhs, rhs),
        MulOp::Divide => op_divide(lhs, rhs),
        MulOp::Modulo => op_modulo(lhs, rhs),
    }
}

/// 論理チェーンの一ステップ
pub fn logic_step(op: LogicOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    let a = lhs.as_boolean()?;
    let b = rhs.as_boolean()?;
    let result = match op {
        LogicOp::And => a && b,
        LogicOp::Or => a || b,
        LogicOp::Xor => a != b,
    };
    Ok(Value::boolean(result))
}

pub fn op_add(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    // どちらかが文字列なら連結
    if lhs.kind() == TypeTag::String || rhs.kind() == TypeTag::String {
        let mut result = lhs.as_string()?;
        result.push_str(&rhs.as_string()?);
        return Ok(Value::string(result));
    }

    match numeric_operands(lhs, rhs, "加算")? {
        (Num::Int(a), Num::Int(b)) => a
            .checked_add(b)
            .map(Value::integer)
            .ok_or_else(|| overflow("加算")),
        (a, b) => Ok(Value::real(as_real(a) + as_real(b))),
    }
}

pub fn op_subtract(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match numeric_operands(lhs, rhs, "減算")? {
        (Num::Int(a), Num::Int(b)) => a
            .checked_sub(b)
            .map(Value::integer)
            .ok_or_else(|| overflow("減算")),
        (a, b) => Ok(Value::real(as_real(a) - as_real(b))),
    }
}

pub fn op_multiply(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match numeric_operands(lhs, rhs, "乗算")? {
        (Num::Int(a), Num::Int(b)) => a
            .checked_mul(b)
            .map(Value::integer)
            .ok_or_else(|| overflow("乗算")),
        (a, b) => Ok(Value::real(as_real(a) * as_real(b))),
    }
}

pub fn op_divide(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match numeric_operands(lhs, rhs, "除算")? {
        (Num::Int(a), Num::Int(b)) => {
            if b == 0 {
                Err(divide_by_zero())
            } else {
                Ok(Value::integer(a / b))
            }
        }
        (a, b) => {
            let divisor = as_real(b);
            if divisor == 0.0 {
                Err(divide_by_zero())
            } else {
                Ok(Value::real(as_real(a) / divisor))
            }
        }
    }
}

pub fn op_modulo(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match numeric_operands(lhs, rhs, "剰余")? {
        (Num::Int(a), Num::Int(b)) => {
            if b == 0 {
                Err(divide_by_zero())
            } else {
                Ok(Value::integer(a % b))
            }
        }
        (a, b) => {
            let divisor = as_real(b);
            if divisor == 0.0 {
                Err(divide_by_zero())
            } else {
                Ok(Value::real(as_real(a) % divisor))
            }
        }
    }
}

pub fn op_power(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match numeric_operands(lhs, rhs, "冪乗")? {
        (Num::Int(a), Num::Int(b)) if b >= 0 => {
            let exponent =
                u32::try_from(b).map_err(|_| overflow("冪乗"))?;
            a.checked_pow(exponent)
                .map(Value::integer)
                .ok_or_else(|| overflow("冪乗"))
        }
        (a, b) => {
            // 0^負数はinfになるので、NaNと合わせて定義域エラーにする
            let result = as_real(a).powf(as_real(b));
            if result.is_finite() {
                Ok(Value::real(result))
            } else {
                Err(RuntimeError::new(
                    ErrorKind::DomainError,
                    "冪乗の結果が定義されません",
                ))
            }
        }
    }
}

pub fn op_negate(value: &Value) -> Result<Value, RuntimeError> {
    match numeric(value) {
        Some(Num::Int(v)) => v
            .checked_neg()
            .map(Value::integer)
            .ok_or_else(|| overflow("符号反転")),
        Some(Num::Real(v)) => Ok(Value::real(-v)),
        None => Err(RuntimeError::new(
            ErrorKind::IllegalCast,
            format!("{}型には符号反転を適用できません", value.kind().name()),
        )),
    }
}

pub fn op_not(value: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::boolean(!value.as_boolean()?))
}

fn divide_by_zero() -> RuntimeError {
    RuntimeError::new(ErrorKind::DivideByZero, "ゼロによる除算です")
}

fn as_real(n: Num) -> f64 {
    match n {
        Num::Int(v) => v as f64,
        Num::Real(v) => v,
    }
}

/// 順序比較
///
/// Null・Type・Executable・Dictionary・Structure は比較できない。
/// 配列は `==` / `!=` だけをサポートし、要素ごとに比較する。
pub fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool, RuntimeError> {
    let lt = lhs.kind();
    let rt = rhs.kind();

    if lt == TypeTag::Array || rt == TypeTag::Array {
        if lt != rt {
            return Err(incomparable(lt, rt));
        }
        let equal = arrays_compare_equal(lhs, rhs)?;
        return match op {
            CompareOp::Equal => Ok(equal),
            CompareOp::NotEqual => Ok(!equal),
            _ => Err(incomparable(lt, rt)),
        };
    }

    if lt == TypeTag::String && rt == TypeTag::String {
        let a = lhs.as_string()?;
        let b = rhs.as_string()?;
        return Ok(apply_ordering(op, a.cmp(&b)));
    }

    // 文字列と数値の組は文字列を数値として解釈する
    let a = comparable_number(lhs)?;
    let b = comparable_number(rhs)?;

    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Ok(apply_ordering(op, x.cmp(&y))),
        (x, y) => {
            let x = as_real(x);
            let y = as_real(y);
            Ok(match op {
                CompareOp::Less => x < y,
                CompareOp::LessEqual => x <= y,
                CompareOp::Equal => x == y,
                CompareOp::NotEqual => x != y,
                CompareOp::GreaterEqual => x >= y,
                CompareOp::Greater => x > y,
            })
        }
    }
}

fn comparable_number(value: &Value) -> Result<Num, RuntimeError> {
    if let Some(n) = numeric(value) {
        return Ok(n);
    }

    if value.kind() == TypeTag::String {
        let s = value.as_string()?;
        if let Ok(v) = s.trim().parse::<i64>() {
            return Ok(Num::Int(v));
        }
        if let Ok(v) = s.trim().parse::<f64>() {
            return Ok(Num::Real(v));
        }
        return Err(RuntimeError::new(
            ErrorKind::IllegalCast,
            format!("文字列'{}'を数値として比較できません", s),
        ));
    }

    Err(RuntimeError::new(
        ErrorKind::IllegalCast,
        format!("{}型の値は比較できません", value.kind().name()),
    ))
}

fn incomparable(lt: TypeTag, rt: TypeTag) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::IllegalCast,
        format!("{}型と{}型は比較できません", lt.name(), rt.name()),
    )
}

fn apply_ordering(op: CompareOp, ordering: std::cmp::Ordering) -> bool {
    match op {
        CompareOp::Less => ordering.is_lt(),
        CompareOp::LessEqual => ordering.is_le(),
        CompareOp::Equal => ordering.is_eq(),
        CompareOp::NotEqual => ordering.is_ne(),
        CompareOp::GreaterEqual => ordering.is_ge(),
        CompareOp::Greater => ordering.is_gt(),
    }
}

fn arrays_compare_equal(lhs: &Value, rhs: &Value) -> Result<bool, RuntimeError> {
    let (ls, lf) = lhs.array_range()?;
    let (rs, rf) = rhs.array_range()?;
    if ls != rs || lf != rf {
        return Ok(false);
    }

    for i in ls..=lf {
        let a = lhs.index(&Value::integer(i))?;
        let b = rhs.index(&Value::integer(i))?;
        if !compare(CompareOp::Equal, &a, &b)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// 厳密な等価（`IsExactlyEqual` 組み込み関数）
///
/// 順序比較と異なり、型タグが一致しなければ等しくない。整数の 1 と
/// 実数の 1.0 は厳密には等しくない。実行可能値は決して等しくならない。
pub fn exact_equal(lhs: &Value, rhs: &Value) -> bool {
    lhs.with_data(|a| {
        rhs.with_data(|b| match (a, b) {
            (ValueData::Null, ValueData::Null) => true,
            (ValueData::Boolean(x), ValueData::Boolean(y)) => x == y,
            (
                ValueData::Integer(x) | ValueData::RangedInteger { value: x, .. },
                ValueData::Integer(y) | ValueData::RangedInteger { value: y, .. },
            ) => x == y,
            (
                ValueData::Real(x) | ValueData::RangedReal { value: x, .. },
                ValueData::Real(y) | ValueData::RangedReal { value: y, .. },
            ) => x == y,
            (ValueData::String(x), ValueData::String(y)) => x == y,
            (ValueData::Type(x), ValueData::Type(y)) => x.to_string() == y.to_string(),

            (
                ValueData::Array {
                    start: xs,
                    elements: xe,
                },
                ValueData::Array {
                    start: ys,
                    elements: ye,
                },
            ) => {
                xs == ys
                    && xe.len() == ye.len()
                    && xe.iter().zip(ye).all(|(x, y)| exact_equal(x, y))
            }

            (ValueData::Dictionary(x), ValueData::Dictionary(y))
            | (ValueData::Structure(x), ValueData::Structure(y)) => {
                x.len() == y.len()
                    && x.iter().all(|(key, value)| {
                        y.get(key).is_some_and(|other| exact_equal(value, other))
                    })
            }

            // 実行可能値は決して厳密に等しくならない
            (ValueData::Executable(_), ValueData::Executable(_)) => false,

            _ => false,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_promotes_to_real() {
        let result = op_add(&Value::integer(1), &Value::real(0.5)).unwrap();
        assert_eq!(result.as_real().unwrap(), 1.5);
    }

    #[test]
    fn test_add_concatenates_strings() {
        let result = op_add(&Value::string("abc"), &Value::integer(1)).unwrap();
        assert_eq!(result.as_string().unwrap(), "abc1");
    }

    #[test]
    fn test_integer_division_truncates() {
        let result = op_divide(&Value::integer(7), &Value::integer(2)).unwrap();
        assert_eq!(result.as_integer().unwrap(), 3);
    }

    #[test]
    fn test_divide_by_zero_is_reported() {
        let err = op_divide(&Value::integer(1), &Value::integer(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivideByZero);

        let err = op_modulo(&Value::integer(1), &Value::integer(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivideByZero);
    }

    #[test]
    fn test_power_of_integers_stays_integer() {
        let result = op_power(&Value::integer(2), &Value::integer(10)).unwrap();
        assert_eq!(result.as_integer().unwrap(), 1024);

        // 負の指数は実数になる
        let result = op_power(&Value::integer(2), &Value::integer(-1)).unwrap();
        assert_eq!(result.as_real().unwrap(), 0.5);
    }

    #[test]
    fn test_comparison_promotes_numerically() {
        // 順序比較では 1 と 1.0 は等しい
        assert!(compare(CompareOp::Equal, &Value::integer(1), &Value::real(1.0)).unwrap());
        assert!(compare(CompareOp::Less, &Value::integer(1), &Value::real(1.5)).unwrap());
    }

    #[test]
    fn test_comparison_parses_numeric_strings() {
        assert!(compare(CompareOp::Equal, &Value::string("10"), &Value::integer(10)).unwrap());

        let err =
            compare(CompareOp::Equal, &Value::string("abc"), &Value::integer(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalCast);
    }

    #[test]
    fn test_comparison_rejects_null() {
        let err = compare(CompareOp::Equal, &Value::null(), &Value::integer(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalCast);
    }

    #[test]
    fn test_exact_equality_requires_the_same_type() {
        // 厳密な等価では 1 と 1.0 は等しくない
        assert!(!exact_equal(&Value::integer(1), &Value::real(1.0)));
        assert!(exact_equal(&Value::integer(1), &Value::integer(1)));
    }

    #[test]
    fn test_exact_equality_of_arrays() {
        let a = Value::array(0, vec![Value::integer(1), Value::string("x")]);
        let b = Value::array(0, vec![Value::integer(1), Value::string("x")]);
        let c = Value::array(1, vec![Value::integer(1), Value::string("x")]);

        assert!(exact_equal(&a, &b));
        // 添字範囲が違えば等しくない
        assert!(!exact_equal(&a, &c));
    }

    #[test]
    fn test_logic_step_has_no_short_circuit_semantics() {
        let result = logic_step(LogicOp::Xor, &Value::boolean(true), &Value::boolean(true));
        assert!(!result.unwrap().as_boolean().unwrap());
    }
}
