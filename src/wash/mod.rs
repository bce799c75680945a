//! Semantic analysis of a script
//!
//! One walk over the tree does what a class compiler splits into phases:
//!
//! - Enter: imports, the receiver and parameters, type names
//! - Attr: name resolution, typing, promotion and constant folding
//! - Flow: definite (un)assignment, break/continue exit sets, checked exceptions
//! - Lower: compound assignment and try/catch/finally rewrites
//!
//! Analysis threads a [`Flow`] value through every node: a node takes the
//! state before it and returns the state after it. Mistakes are logged into
//! the [`ErrorList`] and analysis carries on with `unknown` types; only an
//! overflowing error list stops it.

mod attr;
pub mod dualset;
mod enter;
mod flow;
pub mod fold;
pub mod lower;
pub mod scope;
pub mod thrown;

use std::collections::{BTreeSet, HashMap};

use crate::ast::*;
use crate::common::diag::{ErrorList, SemanticError};
use crate::common::error::Result;
use crate::common::TypeEnv;

pub use dualset::{DualSet, Flow, VarSet};
pub use scope::{Scopes, VarKind, Variable};
pub use thrown::Thrown;

/// An analysed script, ready for code generation
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub body: Block,
    pub vars: Vec<Variable>,
    /// Receiver of an instance method
    pub this_var: Option<VarId>,
    /// Parameters in declaration order
    pub params: Vec<VarId>,
    /// Classes this unit must be recompiled against when they change
    pub dependencies: BTreeSet<String>,
}

impl Unit {
    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }
}

/// Analyse a parsed script against `env`
pub fn precompile(env: &dyn TypeEnv, script: &Script, errors: &mut ErrorList) -> Result<Unit> {
    let method = env.method();
    log::debug!("analysing body of {}.{}", method.class, method.name);
    let mut analyzer = Analyzer::new(env, errors);
    let unit = analyzer.run(script.clone())?;
    log::debug!(
        "analysis finished: {} variables, {} dependencies",
        unit.vars.len(),
        unit.dependencies.len()
    );
    Ok(unit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetKind {
    Loop,
    Switch,
    Labeled,
}

/// An enclosing statement break or continue may leave through
#[derive(Debug)]
pub(crate) struct Target {
    kind: TargetKind,
    labels: Vec<String>,
    breaks: Option<Flow>,
    continues: Option<Flow>,
}

impl Target {
    fn new(kind: TargetKind, labels: Vec<String>) -> Self {
        Self {
            kind,
            labels,
            breaks: None,
            continues: None,
        }
    }

    fn add_break(&mut self, flow: Flow) {
        self.breaks = Some(match self.breaks.take() {
            Some(earlier) => earlier.join(flow),
            None => flow,
        });
    }

    fn add_continue(&mut self, flow: Flow) {
        self.continues = Some(match self.continues.take() {
            Some(earlier) => earlier.join(flow),
            None => flow,
        });
    }

    /// Union of every break's state; vacuous when nothing breaks out
    fn take_breaks(&mut self) -> Flow {
        self.breaks.take().unwrap_or_else(Flow::vacuous)
    }

    fn take_continues(&mut self) -> Flow {
        self.continues.take().unwrap_or_else(Flow::vacuous)
    }
}

/// Analysis state of one unit
pub struct Analyzer<'a> {
    env: &'a dyn TypeEnv,
    errors: &'a mut ErrorList,
    scopes: Scopes,
    targets: Vec<Target>,
    /// Labels waiting for the loop they are attached to
    pending_labels: Vec<String>,
    loop_depth: usize,
    /// Finals assigned anywhere in each enclosing try body, reached or not
    /// by normal completion
    final_writes: Vec<VarSet>,
    /// Locals declared directly in each enclosing switch block so far
    switch_decls: Vec<Vec<VarId>>,
    thrown: Thrown,
    imports: HashMap<String, String>,
    on_demand: Vec<String>,
    dependencies: BTreeSet<String>,
}

impl<'a> Analyzer<'a> {
    pub fn new(env: &'a dyn TypeEnv, errors: &'a mut ErrorList) -> Self {
        Self {
            env,
            errors,
            scopes: Scopes::new(),
            targets: Vec::new(),
            pending_labels: Vec::new(),
            loop_depth: 0,
            final_writes: Vec::new(),
            switch_decls: Vec::new(),
            thrown: Thrown::new(),
            imports: HashMap::new(),
            on_demand: Vec::new(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn run(&mut self, script: Script) -> Result<Unit> {
        for import in &script.imports {
            self.import(import)?;
        }
        let (this_var, params) = self.enter_method(script.span)?;

        let flow = Flow::new(VarSet::new(), VarSet::new());
        let (body, _) = self.block(script.body, flow)?;
        self.report_uncaught()?;

        Ok(Unit {
            body,
            vars: std::mem::take(&mut self.scopes).into_vars(),
            this_var,
            params,
            dependencies: std::mem::take(&mut self.dependencies),
        })
    }

    fn report_uncaught(&mut self) -> Result<()> {
        let env = self.env;
        let sites: Vec<(String, Span)> = thrown::uncovered(env, &self.thrown, &env.method().exceptions)
            .into_iter()
            .flat_map(|(ty, spans)| spans.iter().map(move |span| (ty.to_string(), *span)))
            .collect();
        for (ty, span) in sites {
            self.error(SemanticError::UncaughtException(ty), span)?;
        }
        Ok(())
    }

    pub(crate) fn error(&mut self, error: SemanticError, span: Span) -> Result<()> {
        self.errors.log(error, span)
    }

    pub(crate) fn depend(&mut self, class: &str) {
        if !self.dependencies.contains(class) {
            self.dependencies.insert(class.to_string());
        }
    }

    /// Implicit conversion of `expr` to the primitive type `to`
    ///
    /// Reference conversions need no instruction and leave the node as is.
    pub(crate) fn coerce(&self, expr: Expr, to: &DataType) -> Expr {
        if &expr.ty == to || to.is_unknown() || expr.ty.is_unknown() || !to.is_primitive() || !expr.ty.is_primitive() {
            return expr;
        }
        let value = expr.value.as_ref().and_then(|v| fold::cast(v, to));
        let span = expr.span;
        let mut cast = Expr::typed(
            ExprKind::Cast {
                to: None,
                operand: Box::new(expr),
            },
            to.clone(),
            span,
        );
        cast.value = value;
        cast
    }

    /// Assignment conversion, including narrowing of in-range int constants
    pub(crate) fn assign_conv(&mut self, expr: Expr, to: &DataType) -> Result<Expr> {
        if expr.ty.is_void() {
            self.error(SemanticError::VoidValue, expr.span)?;
            return Ok(expr);
        }
        if self.env.is_assignable(&expr.ty, to) {
            return Ok(self.coerce(expr, to));
        }
        let narrows = matches!(to, DataType::Byte | DataType::Short | DataType::Char)
            && expr.ty.is_int_like()
            && expr.value.as_ref().map_or(false, |v| fold::fits_narrow(v, to));
        if narrows {
            return Ok(self.coerce(expr, to));
        }
        self.error(
            SemanticError::TypeMismatch {
                expected: to.to_string(),
                found: expr.ty.to_string(),
            },
            expr.span,
        )?;
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ClassManager, MethodContext, ScriptEnv};
    use crate::parser::parse_script;

    fn analyze(source: &str) -> (Result<Unit>, Vec<&'static str>) {
        let env = ScriptEnv::new(
            ClassManager::with_runtime(),
            MethodContext::new("demo.Script", "run").param("n", DataType::Int),
        );
        let script = parse_script(source).expect("parse");
        let mut errors = ErrorList::default();
        let unit = precompile(&env, &script, &mut errors);
        let codes = errors.errors().map(|d| d.error.code()).collect();
        (unit, codes)
    }

    #[test]
    fn parameters_and_receiver_are_declared() {
        let (unit, codes) = analyze("int m = n;");
        assert!(codes.is_empty(), "{:?}", codes);
        let unit = unit.unwrap();
        assert!(unit.this_var.is_some());
        assert_eq!(unit.params.len(), 1);
        assert_eq!(unit.var(unit.params[0]).name, "n");
    }

    #[test]
    fn dependencies_are_recorded() {
        let (unit, _) = analyze("StringBuilder b = new StringBuilder();");
        assert!(unit.unwrap().dependencies.contains("java.lang.StringBuilder"));
    }

    #[test]
    fn analysis_continues_after_errors() {
        let (_, codes) = analyze("int a; int b = a; String s = 1; int c = undefined;");
        assert_eq!(codes, vec!["VAR_UNASSIGNED", "TYPE_MISMATCH", "NAME_UNDEFINED"]);
    }

    #[test]
    fn overflow_aborts_the_unit() {
        let env = ScriptEnv::new(ClassManager::with_runtime(), MethodContext::new("demo.Script", "run"));
        let script = parse_script("int a = x; int b = y; int c = z;").unwrap();
        let mut errors = ErrorList::new(2);
        let result = precompile(&env, &script, &mut errors);
        assert!(matches!(result, Err(crate::common::Error::TooManyErrors { limit: 2 })));
    }
}
