//! 値システムのテスト
//!
//! 共有セルの別名付け、型を保つ代入、ロック、比較と厳密等価の
//! 統合テスト。

use pretty_assertions::assert_eq;
use test_case::test_case;

use kotolang::ast::CompareOp;
use kotolang::error::ErrorKind;
use kotolang::interpreter::ops;
use kotolang::interpreter::{RangeBounds, TypeSpec, TypeTag, Value};

#[test]
fn test_aliases_observe_assignments() {
    // 同じセルを指すハンドルは代入を共有する
    let a = Value::integer(1);
    let b = a.clone();

    b.assign(&Value::integer(9)).expect("assign");
    assert_eq!(a.as_integer().expect("integer"), 9);
}

#[test]
fn test_assignment_converts_to_the_target_type() {
    // 実数セルに整数を代入すると実数に変換される
    let target = Value::real(0.5);
    target.assign(&Value::integer(3)).expect("assign");

    assert_eq!(target.kind(), TypeTag::Real);
    assert_eq!(target.as_real().expect("real"), 3.0);
}

#[test]
fn test_null_target_adopts_the_source_type() {
    let target = Value::null();
    target.assign(&Value::string("hello")).expect("assign");

    assert_eq!(target.kind(), TypeTag::String);
    assert_eq!(target.as_string().expect("string"), "hello");
}

#[test]
fn test_locked_cell_rejects_assignment() {
    let target = Value::integer(1);
    target.lock();

    let error = target.assign(&Value::integer(2)).expect_err("locked");
    assert_eq!(error.kind, ErrorKind::ValueLocked);
    assert_eq!(target.as_integer().expect("integer"), 1);
}

#[test]
fn test_copy_drops_locks_but_clone_keeps_them() {
    let original = Value::array(0, vec![Value::integer(1), Value::integer(2)]);
    original.lock();

    let copied = original.copy_unlocked().expect("copy");
    let cloned = original.deep_clone().expect("clone");

    assert!(!copied.is_locked());
    assert!(cloned.is_locked());

    // どちらも元のセルとは別の記憶域を持つ
    assert!(!copied.ptr_eq(&original));
    assert!(!cloned.ptr_eq(&original));
}

#[test]
fn test_clone_does_not_share_element_cells() {
    let original = Value::array(0, vec![Value::integer(1)]);
    let cloned = original.deep_clone().expect("clone");

    cloned
        .index(&Value::integer(0))
        .expect("index")
        .assign(&Value::integer(99))
        .expect("assign");

    let untouched = original.index(&Value::integer(0)).expect("index");
    assert_eq!(untouched.as_integer().expect("integer"), 1);
}

#[test]
fn test_array_synthesized_members_are_case_insensitive() {
    let array = Value::array(3, vec![Value::integer(7), Value::integer(8)]);

    assert_eq!(array.member("Start").expect("start").as_integer().expect("integer"), 3);
    assert_eq!(array.member("finish").expect("finish").as_integer().expect("integer"), 4);
    assert_eq!(array.member("LENGTH").expect("length").as_integer().expect("integer"), 2);
    assert!(array.member("Start").expect("start").is_locked());
}

#[test]
fn test_dictionary_index_inserts_a_null_cell() {
    // 存在しないキーの参照は代入可能なNullセルを作る
    let dictionary = Value::dictionary();
    let slot = dictionary.index(&Value::string("k")).expect("index");

    assert!(slot.is_null());
    slot.assign(&Value::integer(5)).expect("assign");

    let read_back = dictionary.index(&Value::string("k")).expect("index");
    assert_eq!(read_back.as_integer().expect("integer"), 5);
}

#[test]
fn test_string_compares_against_numbers_by_parsing() {
    let equal = ops::compare(CompareOp::Equal, &Value::string("12"), &Value::integer(12))
        .expect("compare");
    assert!(equal);

    let error = ops::compare(CompareOp::Equal, &Value::string("twelve"), &Value::integer(12))
        .expect_err("not a number");
    assert_eq!(error.kind, ErrorKind::IllegalCast);
}

#[test]
fn test_exact_equality_distinguishes_integer_and_real() {
    // '==' では等しいが、厳密等価では型タグが一致しなければならない
    let loose = ops::compare(CompareOp::Equal, &Value::integer(1), &Value::real(1.0))
        .expect("compare");
    assert!(loose);
    assert!(!ops::exact_equal(&Value::integer(1), &Value::real(1.0)));
}

#[test]
fn test_exact_equality_round_trips_through_clone() {
    let original = Value::array(
        1,
        vec![Value::integer(1), Value::real(2.5), Value::string("x")],
    );
    let cloned = original.deep_clone().expect("clone");

    assert!(ops::exact_equal(&original, &cloned));
}

#[test_case(1, 2, 3 ; "addition")]
#[test_case(7, -2, 5 ; "negative operand")]
fn test_integer_addition(lhs: i64, rhs: i64, expected: i64) {
    let sum = ops::op_add(&Value::integer(lhs), &Value::integer(rhs)).expect("add");
    assert_eq!(sum.as_integer().expect("integer"), expected);
}

#[test]
fn test_string_concatenation_wins_over_numeric_addition() {
    let joined = ops::op_add(&Value::string("n = "), &Value::integer(3)).expect("add");
    assert_eq!(joined.as_string().expect("string"), "n = 3");
}

#[test]
fn test_integer_overflow_is_a_range_error() {
    let error =
        ops::op_add(&Value::integer(i64::MAX), &Value::integer(1)).expect_err("overflow");
    assert_eq!(error.kind, ErrorKind::RangeError);
}

#[test]
fn test_division_by_zero_for_both_numeric_types() {
    let int_error =
        ops::op_divide(&Value::integer(1), &Value::integer(0)).expect_err("int zero");
    assert_eq!(int_error.kind, ErrorKind::DivideByZero);

    let real_error =
        ops::op_divide(&Value::real(1.0), &Value::real(0.0)).expect_err("real zero");
    assert_eq!(real_error.kind, ErrorKind::DivideByZero);
}

#[test]
fn test_zero_to_a_negative_power_is_a_domain_error() {
    // 0^-1は実数経路でinfになるので、NaNと同じく定義域エラーにする
    let error = ops::op_power(&Value::integer(0), &Value::integer(-1)).expect_err("0^-1");
    assert_eq!(error.kind, ErrorKind::DomainError);

    let error =
        ops::op_power(&Value::real(-1.0), &Value::real(0.5)).expect_err("sqrt of negative");
    assert_eq!(error.kind, ErrorKind::DomainError);
}

#[test]
fn test_type_values_with_different_bounds_modes_are_not_exactly_equal() {
    let capped = Value::type_value(TypeSpec::RangedInteger {
        min: 0,
        max: 10,
        bounds: RangeBounds::Cap,
    });
    let erroring = Value::type_value(TypeSpec::RangedInteger {
        min: 0,
        max: 10,
        bounds: RangeBounds::Error,
    });

    assert!(!ops::exact_equal(&capped, &erroring));
    assert!(ops::exact_equal(&capped, &capped.deep_clone().expect("clone")));
    assert_eq!(capped.to_string(), "integer(0, 10, BOUNDS_CAP)");
}
