//! scriptc: a compiler for method-body scripts
//!
//! A script is the body of a single method written in a Java-flavoured
//! statement language. It is compiled against a [`TypeEnv`] describing the
//! surrounding class and the runtime types it may use.
//!
//! ## Architecture
//!
//! - **parser**: lexical analysis and parsing of script source into the AST
//! - **wash**: semantic analysis (names, types, folding, definite assignment,
//!   checked exceptions, rewrites)
//! - **codegen**: stack-machine code for the analysed body
//! - **ast**: the tree shared by all phases
//! - **common**: configuration, errors, diagnostics and the type environment
//!
//! ## Compilation Flow
//!
//! ```text
//! Source → Parser → Script → precompile → Unit → compile → Code
//! ```

pub mod ast;
pub mod codegen;
pub mod common;
pub mod parser;
pub mod wash;

use std::collections::BTreeSet;
use std::path::Path;

pub use codegen::Code;
pub use common::{Config, Diagnostic, Error, ErrorList, Result, ScriptEnv, TypeEnv};

use codegen::Op;

/// Output of [`compile_script`]
#[derive(Debug)]
pub struct CompiledScript {
    pub code: Code,
    /// Classes the script was checked against or refers to at run time
    pub dependencies: BTreeSet<String>,
    pub warnings: Vec<Diagnostic>,
    /// Whether the body can complete normally
    pub completes: bool,
}

/// Parse, analyse and generate code for `source`
///
/// Diagnostics of a failed unit come back as [`Error::Diagnostics`]; code is
/// only generated for bodies that analysed cleanly.
pub fn compile_script(source: &str, env: &dyn TypeEnv, config: &Config) -> Result<CompiledScript> {
    let script = parser::parse_script(source)?;
    let mut errors = ErrorList::new(config.max_errors);
    let unit = wash::precompile(env, &script, &mut errors)?;
    if errors.has_errors() {
        log::debug!("analysis reported {} errors", errors.error_count());
        return Err(Error::Diagnostics(errors.into_vec()));
    }

    let mut code = Code::new();
    let completes = codegen::compile(env, &unit, &mut code, &mut errors)?;
    if errors.has_errors() {
        log::debug!("code generation reported {} errors", errors.error_count());
        return Err(Error::Diagnostics(errors.into_vec()));
    }

    let mut dependencies = unit.dependencies.clone();
    dependencies.extend(runtime_dependencies(&code));
    let warnings = errors.into_vec();
    log::debug!(
        "compiled script: {} ops, {} dependencies, {} warnings",
        code.ops().len(),
        dependencies.len(),
        warnings.len()
    );
    Ok(CompiledScript {
        code,
        dependencies,
        warnings,
        completes,
    })
}

/// [`compile_script`] over the contents of a file
pub fn compile_script_file(path: &Path, env: &dyn TypeEnv, config: &Config) -> Result<CompiledScript> {
    log::debug!("compiling {}", path.display());
    let source = std::fs::read_to_string(path)?;
    compile_script(&source, env, config)
}

/// Classes named by the generated instructions
fn runtime_dependencies(code: &Code) -> BTreeSet<String> {
    let mut classes = BTreeSet::new();
    for op in code.ops() {
        let class = match op {
            Op::GetStatic(field) | Op::PutStatic(field) | Op::GetField(field) | Op::PutField(field) => {
                Some(field.owner.clone())
            }
            Op::InvokeVirtual(method)
            | Op::InvokeSpecial(method)
            | Op::InvokeStatic(method)
            | Op::InvokeInterface(method) => Some(method.owner.clone()),
            Op::New(class) => Some(class.clone()),
            Op::ANewArray(ty) | Op::MultiANewArray(ty, _) | Op::CheckCast(ty) | Op::InstanceOf(ty) => {
                ty.base().class_name().map(str::to_string)
            }
            _ => None,
        };
        classes.extend(class);
    }
    for handler in code.handlers() {
        if let Some(catch) = &handler.catch_type {
            classes.insert(catch.replace('/', "."));
        }
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DataType;
    use crate::common::{ClassManager, MethodContext};

    fn env() -> ScriptEnv {
        ScriptEnv::new(
            ClassManager::with_runtime(),
            MethodContext::new("demo.Script", "run").param("s", DataType::string()),
        )
    }

    #[test]
    fn compiles_a_clean_script() {
        let compiled = compile_script("int n = s.length();", &env(), &Config::default()).unwrap();
        assert!(compiled.completes);
        assert!(compiled.warnings.is_empty());
        assert!(compiled.dependencies.contains("java.lang.String"));
    }

    #[test]
    fn analysis_errors_skip_code_generation() {
        let err = compile_script("int n = m;", &env(), &Config::default()).unwrap_err();
        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.diagnostics()[0].error.code(), "NAME_UNDEFINED");
    }

    #[test]
    fn reachability_errors_are_returned() {
        let err = compile_script("return; int n = 1;", &env(), &Config::default()).unwrap_err();
        assert!(matches!(err, Error::Diagnostics(_)));
    }

    #[test]
    fn parse_errors_are_not_diagnostics() {
        let err = compile_script("int = ;", &env(), &Config::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
