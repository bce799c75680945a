mod common;

use common::vm::Outcome;
use common::*;
use scriptc::ast::DataType;

fn locked() -> scriptc::common::MethodContext {
    method().param("lock", DataType::object())
}

#[test]
fn test_monitor_released_when_body_throws() {
    let env = env(locked());
    let run = run_with(&env, "synchronized (lock) { Probe.hit(\"in\"); Probe.boom(); }", |vm| {
        vec![vm.object("java.lang.Object")]
    });
    assert_eq!(run.outcome, Outcome::Threw("java.lang.IllegalStateException".to_string()));
    assert_eq!(run.log, vec!["monitorenter", "in", "monitorexit"]);
    assert!(run.monitors_balanced);
}

#[test]
fn test_monitor_released_before_return() {
    let env = env(locked().returns(DataType::Int));
    let run = run_with(&env, "synchronized (lock) { return Probe.value(); }", |vm| {
        vm.value = 11;
        vec![vm.object("java.lang.Object")]
    });
    assert_eq!(returned_int(&run), 11);
    assert_eq!(run.log, vec!["monitorenter", "monitorexit"]);
    assert!(run.monitors_balanced);
}

#[test]
fn test_monitor_released_on_break() {
    let env = env(locked());
    let run = run_with(
        &env,
        "for (int i = 0; i < 5; i++) { synchronized (lock) { if (i == 1) break; } } Probe.hit(\"done\");",
        |vm| vec![vm.object("java.lang.Object")],
    );
    assert_eq!(
        run.log,
        vec!["monitorenter", "monitorexit", "monitorenter", "monitorexit", "done"]
    );
    assert!(run.monitors_balanced);
}

#[test]
fn test_null_lock_throws() {
    let env = env(locked());
    let run = run_with(&env, "synchronized (lock) { Probe.hit(\"in\"); }", |_| vec![common::vm::Value::Null]);
    assert_eq!(run.outcome, Outcome::Threw("java.lang.NullPointerException".to_string()));
    assert!(run.log.is_empty());
}

#[test]
fn test_lock_must_be_a_reference() {
    assert_eq!(
        error_codes(method(), "int n = 1; synchronized (n) { }"),
        vec!["TYPE_MISMATCH"]
    );
}

#[test]
fn test_generated_shape() {
    let compiled = compile(locked(), "synchronized (lock) { Probe.hit(1); }");
    let ops = listing(&compiled);
    assert_eq!(&ops[..4], &["aload_0", "dup", "astore_1", "monitorenter"]);
    assert_eq!(ops.iter().filter(|op| *op == "monitorexit").count(), 1);
}
