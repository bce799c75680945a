mod common;

use common::*;
use scriptc::ast::DataType;

const DISPATCH: &str = r#"
int r;
switch (Probe.value()) {
    case 1:
        r = 10;
        break;
    case 2:
    case 3:
        r = 20;
        break;
    case 1000:
        r = 30;
        break;
    default:
        r = -1;
}
return r;
"#;

fn dispatch(value: i32) -> i32 {
    let env = env(method().returns(DataType::Int));
    let run = run_with(&env, DISPATCH, |vm| {
        vm.value = value;
        Vec::new()
    });
    returned_int(&run)
}

#[test]
fn test_switch_dispatch() {
    assert_eq!(dispatch(1), 10);
    assert_eq!(dispatch(2), 20);
    assert_eq!(dispatch(3), 20);
    assert_eq!(dispatch(1000), 30);
    assert_eq!(dispatch(7), -1);
    assert_eq!(dispatch(-5), -1);
}

#[test]
fn test_no_match_without_default_goes_to_the_end() {
    let env = env(method().returns(DataType::Int));
    let run = run_with(&env, "int r = 0; switch (Probe.value()) { case 1: r = 1; } return r;", |vm| {
        vm.value = 5;
        Vec::new()
    });
    assert_eq!(returned_int(&run), 0);
}

#[test]
fn test_cases_fall_through() {
    let env = env(method());
    let source = r#"
switch (Probe.value()) {
    case 1: Probe.hit("one");
    case 2: Probe.hit("two"); break;
    case 3: Probe.hit("three");
}
"#;
    let run = run_with(&env, source, |vm| {
        vm.value = 1;
        Vec::new()
    });
    assert_eq!(run.log, vec!["one", "two"]);
}

#[test]
fn test_dense_and_sparse_keys() {
    let dense = compile(method(), "switch (Probe.value()) { case 1: case 2: case 3: case 4: Probe.hit(1); }");
    assert!(listing(&dense).iter().any(|op| op.starts_with("tableswitch")));
    let sparse = compile(method(), "switch (Probe.value()) { case 1: case 1000: case 100000: Probe.hit(1); }");
    assert!(listing(&sparse).iter().any(|op| op.starts_with("lookupswitch")));
}

#[test]
fn test_char_and_constant_case_labels() {
    let env = env(method().returns(DataType::Int));
    let source = r#"
final int BASE = 40;
char c = 'b';
switch (c) {
    case 'a': return 1;
    case 'b': return 2;
    case BASE + 2: return 3;
}
return 0;
"#;
    let run = run_with(&env, source, |_| Vec::new());
    assert_eq!(returned_int(&run), 2);
}

#[test]
fn test_case_errors() {
    assert_eq!(
        error_codes(method(), "switch (Probe.value()) { case 1: case 1: break; }"),
        vec!["CASE_DUPLICATE"]
    );
    assert_eq!(
        error_codes(method(), "int k = 2; switch (Probe.value()) { case k: break; }"),
        vec!["CASE_NOT_CONSTANT"]
    );
}

#[test]
fn test_definite_assignment_needs_a_default() {
    assert_eq!(
        error_codes(
            method().returns(DataType::Int),
            "int r; switch (Probe.value()) { case 1: r = 1; break; case 2: r = 2; break; } return r;"
        ),
        vec!["VAR_UNASSIGNED"]
    );
    compile(
        method().returns(DataType::Int),
        "int r; switch (Probe.value()) { case 1: r = 1; break; default: r = 2; } return r;",
    );
}
