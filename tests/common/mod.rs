// Common test utilities
#![allow(dead_code)]

pub mod vm;

use scriptc::ast::DataType;
use scriptc::common::{ClassInfo, ClassManager, Config, FieldInfo, MethodContext, MethodInfo, ScriptEnv};
use scriptc::{compile_script, CompiledScript, Error};

use vm::{Outcome, Value, Vm};

/// Runtime classes plus `demo.Probe`, whose static methods record calls
///
/// `hit(x)` logs its argument, `flag()` and `value()` return values the test
/// sets on the VM, `fail()` throws `IOException` and `boom()` throws
/// `IllegalStateException`. `demo.Script`, the class scripts are compiled
/// into, has a `String label` field and a static `String tally`.
pub fn classes() -> ClassManager {
    let mut classes = ClassManager::with_runtime();
    classes.add(
        ClassInfo::new("demo.Probe")
            .with_method(MethodInfo::new("hit", vec![DataType::string()], DataType::Void).static_method())
            .with_method(MethodInfo::new("hit", vec![DataType::Int], DataType::Void).static_method())
            .with_method(MethodInfo::new("flag", vec![], DataType::Boolean).static_method())
            .with_method(MethodInfo::new("value", vec![], DataType::Int).static_method())
            .with_method(
                MethodInfo::new("fail", vec![], DataType::Void)
                    .static_method()
                    .throws(DataType::class("java.io.IOException")),
            )
            .with_method(MethodInfo::new("boom", vec![], DataType::Void).static_method()),
    );
    classes.add(
        ClassInfo::new("demo.Script")
            .with_field(FieldInfo::new("label", DataType::string()))
            .with_field(FieldInfo::new("tally", DataType::string()).static_field()),
    );
    classes
}

pub fn method() -> MethodContext {
    MethodContext::new("demo.Script", "run").static_method()
}

pub fn env(method: MethodContext) -> ScriptEnv {
    ScriptEnv::new(classes(), method)
}

/// Scripts see `Probe` and `IOException` without writing imports
pub fn with_imports(source: &str) -> String {
    format!("import demo.Probe;\nimport java.io.IOException;\n{}", source)
}

pub fn compile_with(env: &ScriptEnv, source: &str) -> Result<CompiledScript, Error> {
    let config = Config::default().with_debug(env.debug);
    compile_script(&with_imports(source), env, &config)
}

/// Compile a script that must be accepted
pub fn compile(method: MethodContext, source: &str) -> CompiledScript {
    let env = env(method);
    match compile_with(&env, source) {
        Ok(compiled) => compiled,
        Err(err) => panic!("script failed to compile:\n{}\n{}", source, err),
    }
}

/// Error codes reported for a script that must be rejected
pub fn error_codes(method: MethodContext, source: &str) -> Vec<&'static str> {
    let env = env(method);
    match compile_with(&env, source) {
        Ok(_) => panic!("script compiled but errors were expected:\n{}", source),
        Err(err) => err.diagnostics().iter().map(|d| d.error.code()).collect(),
    }
}

/// Op listing as printed mnemonics
pub fn listing(compiled: &CompiledScript) -> Vec<String> {
    compiled.code.ops().iter().map(|op| op.to_string()).collect()
}

/// Result of executing a script
pub struct Run {
    pub outcome: Outcome,
    pub log: Vec<String>,
    pub monitors_balanced: bool,
    pub returned_text: Option<String>,
}

/// Compile and execute a script; `setup` prepares the VM and the arguments
pub fn run_with(
    env: &ScriptEnv,
    source: &str,
    setup: impl FnOnce(&mut Vm) -> Vec<Value>,
) -> Run {
    let compiled = match compile_with(env, source) {
        Ok(compiled) => compiled,
        Err(err) => panic!("script failed to compile:\n{}\n{}", source, err),
    };
    let mut vm = Vm::new(&compiled.code, env);
    let args = setup(&mut vm);
    let outcome = vm.run(&args);
    let returned_text = match &outcome {
        Outcome::Returned(Some(value @ Value::Ref(_))) => match vm.heap(*value) {
            vm::Object::Str(text) => Some(text.clone()),
            _ => None,
        },
        _ => None,
    };
    Run {
        outcome,
        log: vm.log.clone(),
        monitors_balanced: vm.monitors.values().all(|count| *count == 0),
        returned_text,
    }
}

/// Execute a script taking no arguments
pub fn run(method: MethodContext, source: &str) -> Run {
    let env = env(method);
    run_with(&env, source, |_| Vec::new())
}

pub fn returned_int(run: &Run) -> i32 {
    match run.outcome {
        Outcome::Returned(Some(value)) => value.int(),
        ref other => panic!("expected an int result, got {:?}", other),
    }
}

/// Enable compiler logging for a test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
