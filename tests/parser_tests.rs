mod common;

use std::fs;

use common::*;
use scriptc::ast::{AstPrinter, StmtKind};
use scriptc::parser::parse_script;
use scriptc::{compile_script_file, Config, Error};

const LOOPS: &str = r#"
import demo.Probe;
import java.util.*;

int found = -1;
outer:
for (int i = 0; i < 4; i++) {
    for (int j = 0; j < 4; j++) {
        if (i * j == 6) {
            found = i * 10 + j;
            break outer;
        }
    }
}
Probe.hit(found);
"#;

#[test]
fn test_parse_imports_and_statements() {
    let script = parse_script(LOOPS).expect("Failed to parse");
    assert_eq!(script.imports.len(), 2);
    assert_eq!(script.imports[1].name, "java.util.*");
    assert_eq!(script.body.stmts.len(), 3);
    assert!(matches!(script.body.stmts[1].kind, StmtKind::Labeled { .. }));
}

#[test]
fn test_printer_shows_structure() {
    let script = parse_script(LOOPS).expect("Failed to parse");
    let dump = AstPrinter::new().print(&script);
    assert!(dump.contains("import demo.Probe"));
    assert!(dump.starts_with("import demo.Probe\nimport java.util.*\nBlock\n"));
    assert!(dump.contains("Label outer"));
    assert!(dump.contains("Break outer"));
}

#[test]
fn test_syntax_error_has_position() {
    match parse_script("int x = 1;\nwhile (x < ) { }") {
        Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_unrecognized_input() {
    match parse_script("int x = 1 # 2;") {
        Err(Error::Lexical { text, line, column }) => {
            assert_eq!(text, "#");
            assert_eq!((line, column), (1, 11));
        }
        other => panic!("expected a lexical error, got {:?}", other),
    }
}

#[test]
fn test_parse_errors_are_not_diagnostics() {
    let env = env(method());
    let err = compile_with(&env, "int = 3;").unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
    assert!(err.diagnostics().is_empty());
}

#[test]
fn test_compile_script_from_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("loops.jsc");
    fs::write(&path, LOOPS).expect("write script");

    let env = env(method());
    let compiled = compile_script_file(&path, &env, &Config::default()).expect("compiles");
    assert!(compiled.completes);
    assert!(compiled.dependencies.contains("demo.Probe"));

    let missing = dir.path().join("missing.jsc");
    assert!(matches!(
        compile_script_file(&missing, &env, &Config::default()),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_compiled_file_runs() {
    let env = env(method());
    let body = LOOPS.replace("import demo.Probe;\n", "");
    let run = run_with(&env, &body, |_| Vec::new());
    assert_eq!(run.log, vec!["23"]);
}

#[test]
fn test_every_syntax_error_is_reported() {
    let env = env(method());
    let source = "int a = 1;\nint b = a +;\nProbe.hit(a);\nfor (int i = 0; i < ; i++) { Probe.hit(i); }\nmissing = 2;";
    match compile_with(&env, source) {
        Err(Error::ParseErrors(list)) => {
            let lines: Vec<usize> = list
                .iter()
                .map(|e| match e {
                    Error::Parse { line, .. } => *line,
                    other => panic!("expected a parse error, got {:?}", other),
                })
                .collect();
            // two import lines precede the body
            assert_eq!(lines, vec![4, 6]);
        }
        other => panic!("expected parse errors, got {:?}", other),
    }
}

#[test]
fn test_aliased_import_in_script() {
    let env = env(method());
    let script = "import java.io.IOException as Failure;\ntry { Probe.fail(); } catch (Failure e) { Probe.hit(\"caught\"); }";
    let run = run_with(&env, script, |_| Vec::new());
    assert_eq!(run.log, vec!["caught"]);

    let dump = AstPrinter::new().print(&parse_script(script).expect("Failed to parse"));
    assert!(dump.starts_with("import java.io.IOException as Failure\n"));
}
