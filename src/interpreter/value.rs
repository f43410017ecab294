//! 実行時の値
//!
//! すべての値は共有セル（`Rc<RefCell>`）として表され、名前やコンテナの
//! スロットが同じセルを指すことでエイリアスになる。`assign` はセルの
//! 中身を置き換えるため、同じセルを見ているすべての名前が更新を観測する。
//! ロックは深く、コンテナをロックすると要素もロックされる。

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use std::cell::RefCell;

use crate::ast::{NodeRef, Param};
use crate::error::{ErrorKind, RuntimeError};
use crate::interpreter::{Context, Unwind};

/// 値の型タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Null,
    Type,
    Boolean,
    Integer,
    Real,
    String,
    Array,
    Dictionary,
    Structure,
    Executable,
}

impl TypeTag {
    /// `TypeId` 組み込み関数が返す整数コード
    pub fn code(self) -> i64 {
        match self {
            TypeTag::Null => 0,
            TypeTag::Type => 1,
            TypeTag::Boolean => 2,
            TypeTag::Integer => 3,
            TypeTag::Real => 4,
            TypeTag::String => 5,
            TypeTag::Array => 6,
            TypeTag::Dictionary => 7,
            TypeTag::Structure => 8,
            TypeTag::Executable => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Type => "type",
            TypeTag::Boolean => "boolean",
            TypeTag::Integer => "integer",
            TypeTag::Real => "real",
            TypeTag::String => "string",
            TypeTag::Array => "array",
            TypeTag::Dictionary => "dictionary",
            TypeTag::Structure => "structure",
            TypeTag::Executable => "executable",
        }
    }
}

/// 範囲付き数値型の境界動作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBounds {
    /// 範囲外への代入はエラー
    Error,
    /// 範囲外の値は境界値に丸める
    Cap,
    /// 範囲外の値は反対側の境界へ折り返す
    Rollover,
}

impl fmt::Display for RangeBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RangeBounds::Error => "BOUNDS_ERROR",
            RangeBounds::Cap => "BOUNDS_CAP",
            RangeBounds::Rollover => "BOUNDS_ROLLOVER",
        })
    }
}

impl RangeBounds {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RangeBounds::Error),
            1 => Some(RangeBounds::Cap),
            2 => Some(RangeBounds::Rollover),
            _ => None,
        }
    }
}

/// 型記述子の実行結果（型の値）
#[derive(Debug, Clone)]
pub enum TypeSpec {
    Null,
    Boolean,
    Integer,
    RangedInteger {
        min: i64,
        max: i64,
        bounds: RangeBounds,
    },
    Real,
    RangedReal {
        min: f64,
        max: f64,
        bounds: RangeBounds,
    },
    String,
    Array {
        start: i64,
        finish: i64,
        element: Rc<TypeSpec>,
    },
    Dictionary,
    Structure(Vec<(String, TypeSpec)>),
}

impl TypeSpec {
    /// この型の既定値を持つ新しい値を作る
    pub fn instantiate(&self) -> Value {
        match self {
            TypeSpec::Null => Value::null(),
            TypeSpec::Boolean => Value::boolean(false),
            TypeSpec::Integer => Value::integer(0),
            TypeSpec::RangedInteger { min, max, bounds } => Value::new(ValueData::RangedInteger {
                value: *min,
                min: *min,
                max: *max,
                bounds: *bounds,
            }),
            TypeSpec::Real => Value::real(0.0),
            TypeSpec::RangedReal { min, max, bounds } => Value::new(ValueData::RangedReal {
                value: *min,
                min: *min,
                max: *max,
                bounds: *bounds,
            }),
            TypeSpec::String => Value::string(String::new()),
            TypeSpec::Array {
                start,
                finish,
                element,
            } => {
                let count = if finish >= start {
                    (finish - start + 1) as usize
                } else {
                    0
                };
                let elements = (0..count).map(|_| element.instantiate()).collect();
                Value::array(*start, elements)
            }
            TypeSpec::Dictionary => Value::dictionary(),
            TypeSpec::Structure(members) => {
                let map = members
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.instantiate()))
                    .collect();
                Value::structure(map)
            }
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Null => f.write_str("null"),
            TypeSpec::Boolean => f.write_str("boolean"),
            TypeSpec::Integer => f.write_str("integer"),
            TypeSpec::RangedInteger { min, max, bounds } => {
                write!(f, "integer({}, {}, {})", min, max, bounds)
            }
            TypeSpec::Real => f.write_str("real"),
            TypeSpec::RangedReal { min, max, bounds } => {
                write!(f, "real({}, {}, {})", min, max, bounds)
            }
            TypeSpec::String => f.write_str("string"),
            TypeSpec::Array {
                start,
                finish,
                element,
            } => write!(f, "array [{} to {}] of {}", start, finish, element),
            TypeSpec::Dictionary => f.write_str("dictionary"),
            TypeSpec::Structure(members) => {
                f.write_str("structure ")?;
                for (name, ty) in members {
                    write!(f, "declare {} as {}; ", ty, name)?;
                }
                f.write_str("end")
            }
        }
    }
}

/// 組み込み関数の本体
pub type BuiltinFn = fn(&mut Context, &[Value]) -> Result<Value, Unwind>;

/// 呼び出し可能な値の中身
pub enum ExecKind {
    /// スクリプトで宣言された関数・ラムダ
    Script { body: NodeRef },
    /// ネイティブの組み込み関数
    Builtin { name: &'static str, f: BuiltinFn },
}

/// 呼び出し可能な値（仮引数リストと本体）
pub struct ExecutableValue {
    pub params: Vec<Param>,
    pub kind: ExecKind,
}

impl fmt::Debug for ExecutableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExecKind::Script { .. } => write!(f, "<function/{}>", self.params.len()),
            ExecKind::Builtin { name, .. } => write!(f, "<builtin {}>", name),
        }
    }
}

/// 値の中身
#[derive(Debug)]
pub enum ValueData {
    Null,
    Type(TypeSpec),
    Boolean(bool),
    Integer(i64),
    RangedInteger {
        value: i64,
        min: i64,
        max: i64,
        bounds: RangeBounds,
    },
    Real(f64),
    RangedReal {
        value: f64,
        min: f64,
        max: f64,
        bounds: RangeBounds,
    },
    String(String),
    Array {
        start: i64,
        elements: Vec<Value>,
    },
    Dictionary(IndexMap<String, Value>),
    Structure(IndexMap<String, Value>),
    Executable(Rc<ExecutableValue>),
}

#[derive(Debug)]
struct ValueCell {
    data: ValueData,
    locked: bool,
}

/// 共有セルとしての実行時の値
#[derive(Debug, Clone)]
pub struct Value(Rc<RefCell<ValueCell>>);

impl Value {
    fn new(data: ValueData) -> Self {
        Self(Rc::new(RefCell::new(ValueCell {
            data,
            locked: false,
        })))
    }

    pub fn null() -> Self {
        Self::new(ValueData::Null)
    }

    pub fn boolean(v: bool) -> Self {
        Self::new(ValueData::Boolean(v))
    }

    pub fn integer(v: i64) -> Self {
        Self::new(ValueData::Integer(v))
    }

    pub fn real(v: f64) -> Self {
        Self::new(ValueData::Real(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::new(ValueData::String(v.into()))
    }

    pub fn array(start: i64, elements: Vec<Value>) -> Self {
        Self::new(ValueData::Array { start, elements })
    }

    pub fn dictionary() -> Self {
        Self::new(ValueData::Dictionary(IndexMap::new()))
    }

    pub fn structure(members: IndexMap<String, Value>) -> Self {
        Self::new(ValueData::Structure(members))
    }

    pub fn type_value(spec: TypeSpec) -> Self {
        Self::new(ValueData::Type(spec))
    }

    pub fn executable(exec: ExecutableValue) -> Self {
        Self::new(ValueData::Executable(Rc::new(exec)))
    }

    /// ロック済みの整数定数（ERR_* などに使う）
    pub fn locked_integer(v: i64) -> Self {
        let value = Self::integer(v);
        value.lock();
        value
    }

    /// ロック済みの文字列
    pub fn locked_string(v: impl Into<String>) -> Self {
        let value = Self::string(v);
        value.lock();
        value
    }

    /// 同じセルを指しているかどうか
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn kind(&self) -> TypeTag {
        match &self.0.borrow().data {
            ValueData::Null => TypeTag::Null,
            ValueData::Type(_) => TypeTag::Type,
            ValueData::Boolean(_) => TypeTag::Boolean,
            ValueData::Integer(_) | ValueData::RangedInteger { .. } => TypeTag::Integer,
            ValueData::Real(_) | ValueData::RangedReal { .. } => TypeTag::Real,
            ValueData::String(_) => TypeTag::String,
            ValueData::Array { .. } => TypeTag::Array,
            ValueData::Dictionary(_) => TypeTag::Dictionary,
            ValueData::Structure(_) => TypeTag::Structure,
            ValueData::Executable(_) => TypeTag::Executable,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.0.borrow().locked
    }

    pub fn is_null(&self) -> bool {
        matches!(self.0.borrow().data, ValueData::Null)
    }

    /// 値をロックする。コンテナの場合は要素も再帰的にロックされる。
    pub fn lock(&self) {
        let children: Vec<Value> = {
            let mut cell = self.0.borrow_mut();
            cell.locked = true;
            match &cell.data {
                ValueData::Array { elements, .. } => elements.clone(),
                ValueData::Dictionary(map) | ValueData::Structure(map) => {
                    map.values().cloned().collect()
                }
                _ => Vec::new(),
            }
        };

        for child in children {
            child.lock();
        }
    }

    /// この値の型を表す型記述子を作る
    pub fn type_spec(&self) -> Result<TypeSpec, RuntimeError> {
        let cell = self.0.borrow();
        Ok(match &cell.data {
            ValueData::Null => TypeSpec::Null,
            ValueData::Type(spec) => spec.clone(),
            ValueData::Boolean(_) => TypeSpec::Boolean,
            ValueData::Integer(_) => TypeSpec::Integer,
            ValueData::RangedInteger {
                min, max, bounds, ..
            } => TypeSpec::RangedInteger {
                min: *min,
                max: *max,
                bounds: *bounds,
            },
            ValueData::Real(_) => TypeSpec::Real,
            ValueData::RangedReal {
                min, max, bounds, ..
            } => TypeSpec::RangedReal {
                min: *min,
                max: *max,
                bounds: *bounds,
            },
            ValueData::String(_) => TypeSpec::String,
            ValueData::Array { start, elements } => {
                let element = match elements.first() {
                    Some(first) => first.type_spec()?,
                    None => TypeSpec::Null,
                };
                TypeSpec::Array {
                    start: *start,
                    finish: *start + elements.len() as i64 - 1,
                    element: Rc::new(element),
                }
            }
            ValueData::Dictionary(_) => TypeSpec::Dictionary,
            ValueData::Structure(members) => {
                let mut specs = Vec::with_capacity(members.len());
                for (name, value) in members {
                    specs.push((name.clone(), value.type_spec()?));
                }
                TypeSpec::Structure(specs)
            }
            ValueData::Executable(_) => {
                return Err(RuntimeError::new(
                    ErrorKind::IllegalCast,
                    "実行可能値の型は取得できません",
                ))
            }
        })
    }

    // ---- 変換 ----

    pub fn as_boolean(&self) -> Result<bool, RuntimeError> {
        match &self.0.borrow().data {
            ValueData::Boolean(v) => Ok(*v),
            ValueData::Integer(v) | ValueData::RangedInteger { value: v, .. } => Ok(*v != 0),
            ValueData::Real(v) | ValueData::RangedReal { value: v, .. } => Ok(*v != 0.0),
            ValueData::String(s) => {
                if s.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(illegal_cast(TypeTag::String, TypeTag::Boolean))
                }
            }
            other => Err(illegal_cast(tag_of(other), TypeTag::Boolean)),
        }
    }

    pub fn as_integer(&self) -> Result<i64, RuntimeError> {
        match &self.0.borrow().data {
            ValueData::Boolean(v) => Ok(i64::from(*v)),
            ValueData::Integer(v) | ValueData::RangedInteger { value: v, .. } => Ok(*v),
            ValueData::Real(v) | ValueData::RangedReal { value: v, .. } => Ok(*v as i64),
            ValueData::String(s) => parse_number(s)
                .map(|n| n as i64)
                .ok_or_else(|| illegal_cast(TypeTag::String, TypeTag::Integer)),
            other => Err(illegal_cast(tag_of(other), TypeTag::Integer)),
        }
    }

    pub fn as_real(&self) -> Result<f64, RuntimeError> {
        match &self.0.borrow().data {
            ValueData::Boolean(v) => Ok(if *v { 1.0 } else { 0.0 }),
            ValueData::Integer(v) | ValueData::RangedInteger { value: v, .. } => Ok(*v as f64),
            ValueData::Real(v) | ValueData::RangedReal { value: v, .. } => Ok(*v),
            ValueData::String(s) => {
                parse_number(s).ok_or_else(|| illegal_cast(TypeTag::String, TypeTag::Real))
            }
            other => Err(illegal_cast(tag_of(other), TypeTag::Real)),
        }
    }

    pub fn as_string(&self) -> Result<String, RuntimeError> {
        match &self.0.borrow().data {
            ValueData::Boolean(v) => Ok(v.to_string()),
            ValueData::Integer(v) | ValueData::RangedInteger { value: v, .. } => Ok(v.to_string()),
            ValueData::Real(v) | ValueData::RangedReal { value: v, .. } => Ok(v.to_string()),
            ValueData::String(s) => Ok(s.clone()),
            other => Err(illegal_cast(tag_of(other), TypeTag::String)),
        }
    }

    pub fn as_executable(&self) -> Result<Rc<ExecutableValue>, RuntimeError> {
        match &self.0.borrow().data {
            ValueData::Executable(exec) => Ok(Rc::clone(exec)),
            other => Err(RuntimeError::new(
                ErrorKind::IllegalHandle,
                format!("{}型の値は呼び出せません", tag_of(other).name()),
            )),
        }
    }

    // ---- 代入と複製 ----

    /// セルの中身を置き換える。エイリアスはすべて更新を観測する。
    ///
    /// 変換規則はセルの現在の型が決める。Null のセルはコピー元の型を
    /// そのまま受け入れる。
    pub fn assign(&self, src: &Value) -> Result<(), RuntimeError> {
        if self.ptr_eq(src) {
            return Ok(());
        }
        if self.is_locked() {
            return Err(RuntimeError::new(
                ErrorKind::ValueLocked,
                "ロックされた値へは代入できません",
            ));
        }

        enum Plan {
            Replace(ValueData),
            Elementwise(Vec<(Value, Value)>),
        }

        let plan = {
            let cell = self.0.borrow();
            match &cell.data {
                ValueData::Null => Plan::Replace(src.data_copy(false)?),

                ValueData::Boolean(_) => Plan::Replace(ValueData::Boolean(src.as_boolean()?)),
                ValueData::Integer(_) => Plan::Replace(ValueData::Integer(src.as_integer()?)),
                ValueData::Real(_) => Plan::Replace(ValueData::Real(src.as_real()?)),
                ValueData::String(_) => Plan::Replace(ValueData::String(src.as_string()?)),

                ValueData::RangedInteger {
                    min, max, bounds, ..
                } => {
                    let value = apply_integer_bounds(src.as_integer()?, *min, *max, *bounds)?;
                    Plan::Replace(ValueData::RangedInteger {
                        value,
                        min: *min,
                        max: *max,
                        bounds: *bounds,
                    })
                }

                ValueData::RangedReal {
                    min, max, bounds, ..
                } => {
                    let value = apply_real_bounds(src.as_real()?, *min, *max, *bounds)?;
                    Plan::Replace(ValueData::RangedReal {
                        value,
                        min: *min,
                        max: *max,
                        bounds: *bounds,
                    })
                }

                ValueData::Array { elements, .. } => {
                    let src_cell = src.0.borrow();
                    let ValueData::Array {
                        elements: src_elements,
                        ..
                    } = &src_cell.data
                    else {
                        return Err(illegal_cast(src.kind(), TypeTag::Array));
                    };

                    if elements.len() == src_elements.len() {
                        // 長さが同じなら要素ごとに代入し、要素のエイリアスを保つ
                        Plan::Elementwise(
                            elements
                                .iter()
                                .cloned()
                                .zip(src_elements.iter().cloned())
                                .collect(),
                        )
                    } else {
                        drop(src_cell);
                        Plan::Replace(src.data_copy(false)?)
                    }
                }

                ValueData::Structure(members) => {
                    let src_cell = src.0.borrow();
                    let ValueData::Structure(src_members) = &src_cell.data else {
                        return Err(illegal_cast(src.kind(), TypeTag::Structure));
                    };

                    let mut pairs = Vec::with_capacity(members.len());
                    for (name, target) in members {
                        let Some(source) = src_members.get(name) else {
                            return Err(RuntimeError::new(
                                ErrorKind::NoSuchMember,
                                format!("代入元の構造体にメンバ '{}' がありません", name),
                            ));
                        };
                        pairs.push((target.clone(), source.clone()));
                    }
                    Plan::Elementwise(pairs)
                }

                ValueData::Dictionary(_) => {
                    if src.kind() != TypeTag::Dictionary {
                        return Err(illegal_cast(src.kind(), TypeTag::Dictionary));
                    }
                    Plan::Replace(src.data_copy(false)?)
                }

                ValueData::Type(_) => {
                    let src_cell = src.0.borrow();
                    let ValueData::Type(spec) = &src_cell.data else {
                        return Err(illegal_cast(src.kind(), TypeTag::Type));
                    };
                    Plan::Replace(ValueData::Type(spec.clone()))
                }

                ValueData::Executable(_) => {
                    let src_cell = src.0.borrow();
                    let ValueData::Executable(exec) = &src_cell.data else {
                        return Err(illegal_cast(src.kind(), TypeTag::Executable));
                    };
                    Plan::Replace(ValueData::Executable(Rc::clone(exec)))
                }
            }
        };

        match plan {
            Plan::Replace(data) => {
                self.0.borrow_mut().data = data;
                Ok(())
            }
            Plan::Elementwise(pairs) => {
                for (target, source) in pairs {
                    target.assign(&source)?;
                }
                Ok(())
            }
        }
    }

    /// 深いコピー。ロックは引き継がない（`Copy` 組み込み関数）。
    pub fn copy_unlocked(&self) -> Result<Value, RuntimeError> {
        Ok(Value::new(self.data_copy(false)?))
    }

    /// 深いコピー。ロック状態も複製する（`Clone` 組み込み関数）。
    pub fn deep_clone(&self) -> Result<Value, RuntimeError> {
        let value = Value::new(self.data_copy(true)?);
        if self.is_locked() {
            value.0.borrow_mut().locked = true;
        }
        Ok(value)
    }

    /// 中身の深いコピーを作る
    fn data_copy(&self, preserve_locks: bool) -> Result<ValueData, RuntimeError> {
        let copy_child = |child: &Value| -> Result<Value, RuntimeError> {
            if preserve_locks {
                child.deep_clone()
            } else {
                child.copy_unlocked()
            }
        };

        let cell = self.0.borrow();
        Ok(match &cell.data {
            ValueData::Null => ValueData::Null,
            ValueData::Type(spec) => ValueData::Type(spec.clone()),
            ValueData::Boolean(v) => ValueData::Boolean(*v),
            ValueData::Integer(v) => ValueData::Integer(*v),
            ValueData::RangedInteger {
                value,
                min,
                max,
                bounds,
            } => ValueData::RangedInteger {
                value: *value,
                min: *min,
                max: *max,
                bounds: *bounds,
            },
            ValueData::Real(v) => ValueData::Real(*v),
            ValueData::RangedReal {
                value,
                min,
                max,
                bounds,
            } => ValueData::RangedReal {
                value: *value,
                min: *min,
                max: *max,
                bounds: *bounds,
            },
            ValueData::String(s) => ValueData::String(s.clone()),
            ValueData::Array { start, elements } => {
                let mut copied = Vec::with_capacity(elements.len());
                for element in elements {
                    copied.push(copy_child(element)?);
                }
                ValueData::Array {
                    start: *start,
                    elements: copied,
                }
            }
            ValueData::Dictionary(map) => {
                let mut copied = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    copied.insert(key.clone(), copy_child(value)?);
                }
                ValueData::Dictionary(copied)
            }
            ValueData::Structure(map) => {
                let mut copied = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    copied.insert(key.clone(), copy_child(value)?);
                }
                ValueData::Structure(copied)
            }
            ValueData::Executable(exec) => ValueData::Executable(Rc::clone(exec)),
        })
    }

    // ---- メンバ・要素アクセス ----

    /// メンバ参照。配列の `start` / `finish` / `length` は大文字小文字を
    /// 区別しない合成メンバで、対応する整数のロック済みの値を返す。
    pub fn member(&self, name: &str) -> Result<Value, RuntimeError> {
        let cell = self.0.borrow();
        match &cell.data {
            ValueData::Array { start, elements } => {
                if name.eq_ignore_ascii_case("start") {
                    Ok(Value::locked_integer(*start))
                } else if name.eq_ignore_ascii_case("finish") {
                    Ok(Value::locked_integer(*start + elements.len() as i64 - 1))
                } else if name.eq_ignore_ascii_case("length") {
                    Ok(Value::locked_integer(elements.len() as i64))
                } else {
                    Err(no_such_member(TypeTag::Array, name))
                }
            }

            ValueData::String(s) => {
                if name.eq_ignore_ascii_case("length") {
                    Ok(Value::locked_integer(s.chars().count() as i64))
                } else {
                    Err(no_such_member(TypeTag::String, name))
                }
            }

            ValueData::Structure(members) => members
                .get(name)
                .cloned()
                .ok_or_else(|| no_such_member(TypeTag::Structure, name)),

            other => Err(no_such_member(tag_of(other), name)),
        }
    }

    /// 添字アクセス。配列は整数添字、辞書は文字列キー。
    ///
    /// 辞書に存在しないキーを引くと新しい Null のセルが挿入される
    /// （代入先として使えるように）。
    pub fn index(&self, index: &Value) -> Result<Value, RuntimeError> {
        let tag = self.kind();
        match tag {
            TypeTag::Array => {
                let i = index.as_integer()?;
                let cell = self.0.borrow();
                let ValueData::Array { start, elements } = &cell.data else {
                    unreachable!();
                };

                let offset = i - *start;
                if offset < 0 || offset >= elements.len() as i64 {
                    return Err(RuntimeError::new(
                        ErrorKind::RangeError,
                        format!(
                            "添字{}は配列の範囲[{}, {}]の外です",
                            i,
                            start,
                            *start + elements.len() as i64 - 1
                        ),
                    ));
                }
                Ok(elements[offset as usize].clone())
            }

            TypeTag::Dictionary => {
                let key = index.as_string()?;

                {
                    let cell = self.0.borrow();
                    let ValueData::Dictionary(map) = &cell.data else {
                        unreachable!();
                    };
                    if let Some(value) = map.get(&key) {
                        return Ok(value.clone());
                    }
                    if cell.locked {
                        return Err(RuntimeError::new(
                            ErrorKind::ValueLocked,
                            "ロックされた辞書へはキーを追加できません",
                        ));
                    }
                }

                let fresh = Value::null();
                let mut cell = self.0.borrow_mut();
                let ValueData::Dictionary(map) = &mut cell.data else {
                    unreachable!();
                };
                map.insert(key, fresh.clone());
                Ok(fresh)
            }

            other => Err(RuntimeError::new(
                ErrorKind::IllegalCast,
                format!("{}型の値は添字アクセスできません", other.name()),
            )),
        }
    }

    /// 配列に要素を追加し、その添字を返す
    pub fn array_add(&self, value: Value, position: Option<i64>) -> Result<i64, RuntimeError> {
        if self.is_locked() {
            return Err(RuntimeError::new(
                ErrorKind::ValueLocked,
                "ロックされた配列へは追加できません",
            ));
        }

        let mut cell = self.0.borrow_mut();
        let tag = tag_of(&cell.data);
        let ValueData::Array { start, elements } = &mut cell.data else {
            return Err(illegal_cast(tag, TypeTag::Array));
        };

        match position {
            Some(i) => {
                let offset = i - *start;
                if offset < 0 || offset > elements.len() as i64 {
                    return Err(RuntimeError::new(
                        ErrorKind::RangeError,
                        format!("挿入位置{}は配列の範囲外です", i),
                    ));
                }
                elements.insert(offset as usize, value);
                Ok(i)
            }
            None => {
                elements.push(value);
                Ok(*start + elements.len() as i64 - 1)
            }
        }
    }

    /// 配列内の二要素を入れ替える
    pub fn array_swap(&self, i: i64, j: i64) -> Result<(), RuntimeError> {
        if self.is_locked() {
            return Err(RuntimeError::new(
                ErrorKind::ValueLocked,
                "ロックされた配列の要素は入れ替えられません",
            ));
        }

        let mut cell = self.0.borrow_mut();
        let tag = tag_of(&cell.data);
        let ValueData::Array { start, elements } = &mut cell.data else {
            return Err(illegal_cast(tag, TypeTag::Array));
        };

        let a = i - *start;
        let b = j - *start;
        let len = elements.len() as i64;
        if a < 0 || a >= len || b < 0 || b >= len {
            return Err(RuntimeError::new(
                ErrorKind::RangeError,
                format!("添字({}, {})は配列の範囲外です", i, j),
            ));
        }

        elements.swap(a as usize, b as usize);
        Ok(())
    }

    /// 辞書のキーを文字列の配列として返す（添字は0始まり）
    pub fn dictionary_keys(&self) -> Result<Value, RuntimeError> {
        let cell = self.0.borrow();
        let ValueData::Dictionary(map) = &cell.data else {
            return Err(illegal_cast(self.kind(), TypeTag::Dictionary));
        };

        let keys = map.keys().map(|k| Value::string(k.clone())).collect();
        Ok(Value::array(0, keys))
    }

    /// 配列の添字範囲 `(start, finish)` を返す
    pub fn array_range(&self) -> Result<(i64, i64), RuntimeError> {
        let cell = self.0.borrow();
        let ValueData::Array { start, elements } = &cell.data else {
            return Err(illegal_cast(self.kind(), TypeTag::Array));
        };
        Ok((*start, *start + elements.len() as i64 - 1))
    }

    /// 内部実装へのアクセス（演算モジュール用）
    pub(crate) fn with_data<R>(&self, f: impl FnOnce(&ValueData) -> R) -> R {
        f(&self.0.borrow().data)
    }
}

impl fmt::Display for Value {
    /// `Print` / `Println` が使う表示形式
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.borrow().data {
            ValueData::Null => f.write_str("null"),
            ValueData::Type(spec) => write!(f, "{}", spec),
            ValueData::Boolean(v) => write!(f, "{}", v),
            ValueData::Integer(v) | ValueData::RangedInteger { value: v, .. } => {
                write!(f, "{}", v)
            }
            ValueData::Real(v) | ValueData::RangedReal { value: v, .. } => write!(f, "{}", v),
            ValueData::String(s) => f.write_str(s),
            ValueData::Array { elements, .. } => {
                f.write_str("{")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str("}")
            }
            ValueData::Dictionary(map) | ValueData::Structure(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            ValueData::Executable(exec) => write!(f, "{:?}", exec),
        }
    }
}

fn tag_of(data: &ValueData) -> TypeTag {
    match data {
        ValueData::Null => TypeTag::Null,
        ValueData::Type(_) => TypeTag::Type,
        ValueData::Boolean(_) => TypeTag::Boolean,
        ValueData::Integer(_) | ValueData::RangedInteger { .. } => TypeTag::Integer,
        ValueData::Real(_) | ValueData::RangedReal { .. } => TypeTag::Real,
        ValueData::String(_) => TypeTag::String,
        ValueData::Array { .. } => TypeTag::Array,
        ValueData::Dictionary(_) => TypeTag::Dictionary,
        ValueData::Structure(_) => TypeTag::Structure,
        ValueData::Executable(_) => TypeTag::Executable,
    }
}

fn illegal_cast(from: TypeTag, to: TypeTag) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::IllegalCast,
        format!("{}型を{}型へ変換できません", from.name(), to.name()),
    )
}

fn no_such_member(tag: TypeTag, name: &str) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::NoSuchMember,
        format!("{}型にメンバ '{}' はありません", tag.name(), name),
    )
}

/// 文字列を数値として解釈する（整数・実数のどちらでも）
fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    trimmed.parse::<f64>().ok()
}

/// 範囲付き整数の境界動作を適用する
pub fn apply_integer_bounds(
    value: i64,
    min: i64,
    max: i64,
    bounds: RangeBounds,
) -> Result<i64, RuntimeError> {
    if value >= min && value <= max {
        return Ok(value);
    }

    match bounds {
        RangeBounds::Error => Err(RuntimeError::new(
            ErrorKind::RangeError,
            format!("値{}は範囲[{}, {}]の外です", value, min, max),
        )),
        RangeBounds::Cap => Ok(value.clamp(min, max)),
        RangeBounds::Rollover => {
            let span = max - min + 1;
            Ok((value - min).rem_euclid(span) + min)
        }
    }
}

/// 範囲付き実数の境界動作を適用する（折り返しは区間幅で行う）
pub fn apply_real_bounds(
    value: f64,
    min: f64,
    max: f64,
    bounds: RangeBounds,
) -> Result<f64, RuntimeError> {
    if value >= min && value <= max {
        return Ok(value);
    }

    match bounds {
        RangeBounds::Error => Err(RuntimeError::new(
            ErrorKind::RangeError,
            format!("値{}は範囲[{}, {}]の外です", value, min, max),
        )),
        RangeBounds::Cap => Ok(value.clamp(min, max)),
        RangeBounds::Rollover => {
            let span = max - min;
            Ok((value - min).rem_euclid(span) + min)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_preserves_aliasing() {
        // 同じセルを指す二つのハンドルは代入後も同じ内容を見る
        let a = Value::integer(1);
        let b = a.clone();

        a.assign(&Value::integer(5)).unwrap();
        assert_eq!(b.as_integer().unwrap(), 5);
    }

    #[test]
    fn test_assign_converts_to_the_target_type() {
        let i = Value::integer(0);
        i.assign(&Value::real(3.9)).unwrap();
        assert_eq!(i.as_integer().unwrap(), 3);

        let s = Value::string("");
        s.assign(&Value::integer(42)).unwrap();
        assert_eq!(s.as_string().unwrap(), "42");
    }

    #[test]
    fn test_locked_value_rejects_assignment() {
        let v = Value::integer(1);
        v.lock();

        let err = v.assign(&Value::integer(2)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueLocked);
        assert_eq!(v.as_integer().unwrap(), 1);
    }

    #[test]
    fn test_lock_is_deep() {
        // 配列をロックすると要素もロックされる
        let array = Value::array(0, vec![Value::integer(1), Value::integer(2)]);
        array.lock();

        let element = array.index(&Value::integer(0)).unwrap();
        assert!(element.is_locked());
    }

    #[test]
    fn test_copy_drops_locks_but_clone_keeps_them() {
        let v = Value::integer(7);
        v.lock();

        assert!(!v.copy_unlocked().unwrap().is_locked());
        assert!(v.deep_clone().unwrap().is_locked());
    }

    #[test]
    fn test_clone_shares_no_storage() {
        let array = Value::array(0, vec![Value::integer(1)]);
        let cloned = array.deep_clone().unwrap();

        cloned
            .index(&Value::integer(0))
            .unwrap()
            .assign(&Value::integer(99))
            .unwrap();

        let original = array.index(&Value::integer(0)).unwrap();
        assert_eq!(original.as_integer().unwrap(), 1);
    }

    #[test]
    fn test_array_synthesized_members() {
        let array = Value::array(3, vec![Value::integer(0); 4]);

        assert_eq!(array.member("start").unwrap().as_integer().unwrap(), 3);
        assert_eq!(array.member("FINISH").unwrap().as_integer().unwrap(), 6);
        assert_eq!(array.member("Length").unwrap().as_integer().unwrap(), 4);
        assert!(array.member("middle").is_err());
    }

    #[test]
    fn test_array_index_respects_start() {
        let array = Value::array(10, vec![Value::integer(7)]);

        assert_eq!(
            array.index(&Value::integer(10)).unwrap().as_integer().unwrap(),
            7
        );
        let err = array.index(&Value::integer(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RangeError);
    }

    #[test]
    fn test_dictionary_index_inserts_missing_keys() {
        let dict = Value::dictionary();
        let slot = dict.index(&Value::string("answer")).unwrap();
        slot.assign(&Value::integer(42)).unwrap();

        let again = dict.index(&Value::string("answer")).unwrap();
        assert_eq!(again.as_integer().unwrap(), 42);
    }

    #[test]
    fn test_ranged_integer_bounds_modes() {
        assert!(apply_integer_bounds(11, 0, 10, RangeBounds::Error).is_err());
        assert_eq!(apply_integer_bounds(11, 0, 10, RangeBounds::Cap).unwrap(), 10);
        assert_eq!(
            apply_integer_bounds(11, 0, 10, RangeBounds::Rollover).unwrap(),
            0
        );
        assert_eq!(
            apply_integer_bounds(-1, 0, 10, RangeBounds::Rollover).unwrap(),
            10
        );
    }

    #[test]
    fn test_instantiate_array_type() {
        let spec = TypeSpec::Array {
            start: 1,
            finish: 3,
            element: Rc::new(TypeSpec::Integer),
        };
        let value = spec.instantiate();

        assert_eq!(value.member("length").unwrap().as_integer().unwrap(), 3);
        assert_eq!(value.member("start").unwrap().as_integer().unwrap(), 1);
    }
}
