//! エラーハンドリングテスト
//!
//! 種別ごとのコールバックレジストリ、失敗したアサーションの特別扱い、
//! 完了チェーンの発火を検証する。

use pretty_assertions::assert_eq;

use kotolang::error::ErrorKind;
use kotolang::interpreter::{Interpreter, RunOutcome};
use kotolang::KotoError;

fn run(source: &str) -> (Interpreter, RunOutcome) {
    let mut interpreter = Interpreter::new().expect("interpreter");
    let outcome = interpreter.run("test.koto", source).expect("run");
    (interpreter, outcome)
}

fn run_error(source: &str) -> kotolang::error::RuntimeError {
    let mut interpreter = Interpreter::new().expect("interpreter");
    match interpreter.run("test.koto", source).expect_err("expected an error") {
        KotoError::Runtime(e) => e,
        other => panic!("unexpected error class: {}", other),
    }
}

fn integer_of(interpreter: &Interpreter, name: &str) -> i64 {
    interpreter
        .lookup(name)
        .expect("symbol")
        .as_integer()
        .expect("integer")
}

#[test]
fn test_handled_error_fires_once_and_execution_continues() {
    let (interpreter, _) = run(
        "declare integer as calls = 0;\n\
         OnErrorPush(ERR_DivideByZero, lambda (e) calls = calls + 1;);\n\
         declare integer as x = 1 / 0;\n\
         declare integer as after = 5;",
    );

    assert_eq!(integer_of(&interpreter, "calls"), 1);
    assert_eq!(integer_of(&interpreter, "after"), 5);
}

#[test]
fn test_handler_receives_a_locked_error_structure() {
    let (interpreter, _) = run(
        "declare string as message = '';\n\
         declare string as place = '';\n\
         OnErrorPush(ERR_DivideByZero, lambda (e) begin\n\
           message = e.Message;\n\
           place = e.Location;\n\
         end;);\n\
         1 / 0;",
    );

    let message = interpreter
        .lookup("message")
        .expect("message")
        .as_string()
        .expect("string");
    let place = interpreter
        .lookup("place")
        .expect("place")
        .as_string()
        .expect("string");
    assert!(!message.is_empty());
    assert!(place.contains("test.koto"));
}

#[test]
fn test_only_the_top_handler_fires_and_pop_restores() {
    let (interpreter, _) = run(
        "declare integer as which = 0;\n\
         OnErrorPush(ERR_DivideByZero, lambda (e) which = 1;);\n\
         OnErrorPush(ERR_DivideByZero, lambda (e) which = 2;);\n\
         1 / 0;\n\
         OnErrorPop(ERR_DivideByZero);\n\
         1 / 0;",
    );

    // 二度目のエラーでは下のハンドラに戻っている
    assert_eq!(integer_of(&interpreter, "which"), 1);
}

#[test]
fn test_popping_an_empty_chain_is_an_illegal_handle() {
    let error = run_error("OnErrorPop(ERR_DivideByZero);");
    assert_eq!(error.kind, ErrorKind::IllegalHandle);
}

#[test]
fn test_non_executable_handler_is_rejected() {
    let error = run_error("OnErrorPush(ERR_Ok, 5);");
    assert_eq!(error.kind, ErrorKind::IllegalHandle);
}

#[test]
fn test_failed_assertion_cannot_be_handled() {
    // 登録自体が不正な値として拒否される
    let error = run_error("OnErrorPush(ERR_FailedAssertion, lambda (e) 0;);");
    assert_eq!(error.kind, ErrorKind::IllegalValue);
}

#[test]
fn test_failed_assertion_always_stops_execution() {
    let error = run_error(
        "OnErrorPush(ERR_DivideByZero, lambda (e) 0;);\n\
         assert(1 == 2);\n\
         declare integer as never = 1;",
    );

    assert_eq!(error.kind, ErrorKind::FailedAssertion);
    assert!(error.message.contains("Assert failed"));
}

#[test]
fn test_unhandled_error_carries_source_location() {
    let error = run_error("declare integer as x = 0;\n1 / x;");
    assert_eq!(error.kind, ErrorKind::DivideByZero);

    let location = error.location.expect("location");
    assert_eq!(&*location.source, "test.koto");
    assert_eq!(location.line, 2);
}

#[test]
fn test_manual_invoke_reaches_the_registered_handler() {
    let (interpreter, _) = run(
        "declare string as seen = '';\n\
         OnErrorPush(ERR_RangeError, lambda (e) seen = e.Message;);\n\
         OnErrorInvoke(ERR_RangeError, 'custom message');",
    );

    let seen = interpreter
        .lookup("seen")
        .expect("seen")
        .as_string()
        .expect("string");
    assert_eq!(seen, "custom message");
}

#[test]
fn test_normal_completion_fires_the_ok_chain_only() {
    let (interpreter, outcome) = run(
        "declare integer as ok_fired = 0;\n\
         declare integer as term_fired = 0;\n\
         OnErrorPush(ERR_Ok, lambda (e) ok_fired = ok_fired + 1;);\n\
         OnErrorPush(ERR_Terminate, lambda (e) term_fired = term_fired + 1;);",
    );

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(integer_of(&interpreter, "ok_fired"), 1);
    assert_eq!(integer_of(&interpreter, "term_fired"), 0);
}

#[test]
fn test_terminate_fires_the_terminate_chain_only() {
    let (interpreter, outcome) = run(
        "declare integer as ok_fired = 0;\n\
         declare integer as term_fired = 0;\n\
         OnErrorPush(ERR_Ok, lambda (e) ok_fired = ok_fired + 1;);\n\
         OnErrorPush(ERR_Terminate, lambda (e) term_fired = term_fired + 1;);\n\
         Terminate(7);",
    );

    assert!(matches!(outcome, RunOutcome::Terminated(7)));
    assert_eq!(outcome.status(), 7);
    assert_eq!(integer_of(&interpreter, "ok_fired"), 0);
    assert_eq!(integer_of(&interpreter, "term_fired"), 1);
}

#[test]
fn test_handler_may_escalate_to_terminate() {
    let (_, outcome) = run(
        "OnErrorPush(ERR_DivideByZero, lambda (e) Terminate(2););\n\
         1 / 0;\n\
         declare integer as never = 1;",
    );
    assert!(matches!(outcome, RunOutcome::Terminated(2)));
}

#[test]
fn test_error_codes_are_exposed_as_constants() {
    let (interpreter, _) = run(
        "declare integer as zero = ERR_Ok;\n\
         declare integer as assertion = ERR_FailedAssertion;",
    );

    assert_eq!(integer_of(&interpreter, "zero"), 0);
    assert_eq!(integer_of(&interpreter, "assertion"), 13);
}
