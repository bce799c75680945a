//! Code generation for analysed scripts
//!
//! Walks a [`Unit`] and appends ops to a [`Code`] buffer. Statements report
//! whether they can complete normally; that answer drives the reachability
//! errors, which this pass reports, and the method epilogue.
//!
//! Enclosing statements are kept as a stack of frames. `break`, `continue`
//! and `return` walk it outwards, calling the cleanup subroutine of every
//! guarded frame they leave (`finally` bodies and monitor release) before
//! the transfer itself.

pub mod code;
pub mod descriptor;
mod gen;
mod gen_cond;
mod gen_expr;
pub mod opcodes;
pub mod switch_optimizer;

use crate::ast::{FieldRef, VarId};
use crate::common::diag::{ErrorList, SemanticError};
use crate::common::error::{Error, Result};
use crate::common::TypeEnv;
use crate::wash::Unit;

pub use code::{Code, Handler};
pub use opcodes::{Arith, ArrayKind, Cond, Kind, Label, Op};

/// Generate code for `unit` into `code`
///
/// Returns whether the body can complete normally. Reachability problems are
/// logged into `errors`; only overflow and internal failures are `Err`.
pub fn compile(env: &dyn TypeEnv, unit: &Unit, code: &mut Code, errors: &mut ErrorList) -> Result<bool> {
    let method = env.method();
    log::debug!(
        "generating {}.{} ({} mode)",
        method.class,
        method.name,
        if env.is_debug() { "debug" } else { "optimized" }
    );
    let mut gen = Gen::new(env, unit, code, errors);
    let completes = gen.method()?;
    log::debug!(
        "generated {} ops, {} handlers, max stack {}, max locals {}",
        code.ops().len(),
        code.handlers().len(),
        code.max_stack(),
        code.max_locals()
    );
    Ok(completes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Loop { cont: Label },
    Switch,
    Labeled,
    /// Body of a try with catch clauses
    Catching,
    /// Body protected by a cleanup subroutine
    Guarded {
        subroutine: Label,
        /// Reserved slot a `return` parks its value in
        value_slot: Option<u16>,
    },
}

/// An enclosing statement control may leave through
#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    labels: Vec<String>,
    exit: Label,
    /// A break targets this statement
    completable: bool,
    /// A continue targets this loop
    continued: bool,
    /// Exit sequences inside the protected range
    gaps: Vec<(Label, Label)>,
}

impl Frame {
    fn new(kind: FrameKind, labels: Vec<String>, exit: Label) -> Self {
        Self {
            kind,
            labels,
            exit,
            completable: false,
            continued: false,
            gaps: Vec::new(),
        }
    }

    fn is_breakable(&self) -> bool {
        matches!(self.kind, FrameKind::Loop { .. } | FrameKind::Switch)
    }
}

/// How the value of the target of a compound assignment is read back
#[derive(Debug, Clone)]
enum Current {
    Local(Kind, u16),
    /// Array and index are duplicated on the stack
    Element(ArrayKind),
    /// The receiver is duplicated on the stack
    Instance(FieldRef),
    Static(FieldRef),
}

/// Generation state of one unit
pub struct Gen<'a> {
    env: &'a dyn TypeEnv,
    unit: &'a Unit,
    code: &'a mut Code,
    errors: &'a mut ErrorList,
    debug: bool,
    slots: Vec<Option<u16>>,
    frames: Vec<Frame>,
    /// Labels waiting for the loop they are attached to
    pending_labels: Vec<String>,
    current: Option<Current>,
}

impl<'a> Gen<'a> {
    pub fn new(env: &'a dyn TypeEnv, unit: &'a Unit, code: &'a mut Code, errors: &'a mut ErrorList) -> Self {
        Self {
            env,
            unit,
            code,
            errors,
            debug: env.is_debug(),
            slots: vec![None; unit.vars.len()],
            frames: Vec::new(),
            pending_labels: Vec::new(),
            current: None,
        }
    }

    /// Receiver, parameters, body and the implied `return`
    pub fn method(&mut self) -> Result<bool> {
        if let Some(this) = self.unit.this_var {
            self.slots[this.0] = Some(self.code.alloc_local(1));
        }
        for &param in &self.unit.params {
            let width = Kind::of(&self.unit.var(param).ty)?.width();
            self.slots[param.0] = Some(self.code.alloc_local(width));
        }

        let unit = self.unit;
        let completes = self.block(&unit.body)?;
        if completes {
            if self.env.method().ret.is_void() {
                self.code.emit(Op::Return(None));
            } else {
                self.error(SemanticError::MissingReturn, unit.body.span)?;
            }
        }
        self.code.finish()?;
        Ok(completes)
    }

    fn error(&mut self, error: SemanticError, span: crate::ast::Span) -> Result<()> {
        self.errors.log(error, span)
    }

    fn slot(&self, var: VarId) -> Result<u16> {
        self.slots
            .get(var.0)
            .copied()
            .flatten()
            .ok_or_else(|| Error::internal(format!("variable {} has no slot", self.unit.var(var).name)))
    }

    /// Allocate the slot of a variable entering scope
    fn declare(&mut self, var: VarId) -> Result<(Kind, u16)> {
        let kind = Kind::of(&self.unit.var(var).ty)?;
        let slot = self.code.alloc_local(kind.width());
        self.slots[var.0] = Some(slot);
        Ok((kind, slot))
    }
}
