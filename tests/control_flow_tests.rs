mod common;

use common::*;
use scriptc::ast::DataType;
use scriptc::common::MethodContext;

fn int_method() -> MethodContext {
    method().returns(DataType::Int)
}

#[test]
fn test_labeled_continue_targets_the_outer_loop() {
    let run = run(
        int_method(),
        r#"
int count = 0;
outer: for (int i = 0; i < 3; i++) {
    for (int j = 0; j < 3; j++) {
        if (j == 1) continue outer;
        count++;
    }
    count += 100;
}
return count;
"#,
    );
    assert_eq!(returned_int(&run), 3);
}

#[test]
fn test_labeled_break_leaves_both_loops() {
    let run = run(
        int_method(),
        r#"
int steps = 0;
outer: while (true) {
    while (true) {
        steps++;
        if (steps == 4) break outer;
    }
}
return steps;
"#,
    );
    assert_eq!(returned_int(&run), 4);
}

#[test]
fn test_break_out_of_a_labeled_block() {
    let source = "int r = 0; done: { if (Probe.flag()) break done; r = 1; } return r;";
    let env = env(int_method());
    let skipped = run_with(&env, source, |vm| {
        vm.flag = true;
        Vec::new()
    });
    assert_eq!(returned_int(&skipped), 0);
    let taken = run_with(&env, source, |_| Vec::new());
    assert_eq!(returned_int(&taken), 1);
}

#[test]
fn test_do_while_runs_its_body_once() {
    let run = run(int_method(), "int n = 0; do { n++; } while (n < 0); return n;");
    assert_eq!(returned_int(&run), 1);
}

#[test]
fn test_conditional_expression() {
    let source = "int a = Probe.value(); return a > 5 ? a * 2 : -a;";
    let env = env(int_method());
    let high = run_with(&env, source, |vm| {
        vm.value = 7;
        Vec::new()
    });
    assert_eq!(returned_int(&high), 14);
    let low = run_with(&env, source, |vm| {
        vm.value = 3;
        Vec::new()
    });
    assert_eq!(returned_int(&low), -3);
}

#[test]
fn test_short_circuit_skips_the_right_operand() {
    let run = run(
        method(),
        r#"
if (Probe.flag() && Probe.value() > 0) Probe.hit("and");
if (!Probe.flag() || Probe.value() > 0) Probe.hit("or");
"#,
    );
    assert_eq!(run.log, vec!["or"]);
}

#[test]
fn test_statement_after_return_is_unreachable() {
    assert_eq!(error_codes(method(), "return; Probe.hit(1);"), vec!["STMT_UNREACHABLE"]);
    assert_eq!(
        error_codes(method(), "while (true) { } Probe.hit(1);"),
        vec!["STMT_UNREACHABLE"]
    );
}

#[test]
fn test_loop_with_break_completes() {
    compile(method(), "while (true) { if (Probe.flag()) break; } Probe.hit(1);");
    compile(method(), "for (;;) { break; } Probe.hit(1);");
}

#[test]
fn test_missing_return() {
    assert_eq!(error_codes(int_method(), "if (Probe.flag()) return 1;"), vec!["RETURN_MISSING"]);
    let compiled = compile(int_method(), "while (true) { if (Probe.flag()) return 1; }");
    assert!(!compiled.completes);
}

#[test]
fn test_void_method_gets_an_implied_return() {
    let compiled = compile(method(), "Probe.hit(1);");
    assert_eq!(listing(&compiled).last().map(String::as_str), Some("return"));
}

#[test]
fn test_constant_false_branch_is_not_generated() {
    let compiled = compile(method(), "if (false) { Probe.hit(\"dead\"); }");
    assert_eq!(listing(&compiled), vec!["return"]);
}

#[test]
fn test_instance_receiver_is_slot_zero() {
    let compiled = compile(
        MethodContext::new("demo.Script", "run").param("n", DataType::Int),
        "int m = n;",
    );
    assert_eq!(listing(&compiled), vec!["iload_1", "istore_2", "return"]);
}
