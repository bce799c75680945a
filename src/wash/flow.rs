//! Flow: analysis of statements
//!
//! Each statement takes the state before it and returns the state after it.
//! A statement that cannot complete normally returns the vacuous state, in
//! which every variable counts as assigned. Break and continue hand their
//! state to the [`Target`] they leave through; the target joins those states
//! into the state after the loop, switch or labeled statement.

use crate::ast::*;
use crate::common::diag::SemanticError;
use crate::common::error::{Error, Result};

use super::dualset::{Flow, VarSet};
use super::scope::{VarKind, Variable};
use super::{lower, thrown, Analyzer, Target, TargetKind};

type Analyzed = (Stmt, Flow);

impl<'a> Analyzer<'a> {
    pub(crate) fn block(&mut self, block: Block, mut flow: Flow) -> Result<(Block, Flow)> {
        self.scopes.enter();
        let mut stmts = Vec::with_capacity(block.stmts.len());
        for stmt in block.stmts {
            let (stmt, next) = self.stmt(stmt, flow)?;
            flow = next;
            stmts.push(stmt);
        }
        self.scopes.exit();
        Ok((Block::new(stmts, block.span), flow))
    }

    /// A statement that is the body of another one gets its own scope
    fn nested(&mut self, stmt: Stmt, flow: Flow) -> Result<Analyzed> {
        self.scopes.enter();
        let analyzed = self.stmt(stmt, flow)?;
        self.scopes.exit();
        Ok(analyzed)
    }

    fn pop_target(&mut self) -> Result<Target> {
        self.targets.pop().ok_or_else(|| Error::internal("break target stack underflow"))
    }

    pub(crate) fn stmt(&mut self, stmt: Stmt, flow: Flow) -> Result<Analyzed> {
        let span = stmt.span;
        let (kind, flow) = match stmt.kind {
            StmtKind::Empty => (StmtKind::Empty, flow),
            StmtKind::Block(block) => {
                let (block, flow) = self.block(block, flow)?;
                (StmtKind::Block(block), flow)
            }
            StmtKind::Decl(decl) => {
                let (decl, flow) = self.decl(decl, flow)?;
                (StmtKind::Decl(decl), flow)
            }
            StmtKind::Expr(expr) => {
                let (expr, flow) = self.statement_expr(expr, flow)?;
                (StmtKind::Expr(expr), flow)
            }
            StmtKind::If { cond, then, otherwise } => self.if_stmt(cond, *then, otherwise, flow)?,
            StmtKind::While { cond, body } => self.while_stmt(cond, *body, flow)?,
            StmtKind::Do { body, cond } => self.do_stmt(*body, cond, flow)?,
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => self.for_stmt(init, cond, update, *body, flow)?,
            StmtKind::Switch { selector, items } => self.switch(selector, items, flow)?,
            StmtKind::Break(label) => {
                self.jump(label.as_deref(), false, span, flow)?;
                (StmtKind::Break(label), Flow::vacuous())
            }
            StmtKind::Continue(label) => {
                self.jump(label.as_deref(), true, span, flow)?;
                (StmtKind::Continue(label), Flow::vacuous())
            }
            StmtKind::Return(value) => {
                let value = self.return_value(value, span, flow)?;
                (StmtKind::Return(value), Flow::vacuous())
            }
            StmtKind::Throw(exception) => {
                let (exception, _) = self.operand(exception, flow)?;
                let env = self.env;
                if !env.is_throwable(&exception.ty) {
                    self.error(SemanticError::NotThrowable(exception.ty.to_string()), exception.span)?;
                } else if env.is_checked(&exception.ty) {
                    thrown::record(&mut self.thrown, exception.ty.clone(), span);
                }
                (StmtKind::Throw(exception), Flow::vacuous())
            }
            StmtKind::Try {
                body,
                catches,
                finally: Some(finally),
            } if !catches.is_empty() => {
                let nested = lower::nest_try_finally(Stmt::new(
                    StmtKind::Try {
                        body,
                        catches,
                        finally: Some(finally),
                    },
                    span,
                ));
                return self.stmt(nested, flow);
            }
            StmtKind::Try {
                body,
                finally: Some(finally),
                ..
            } => self.try_finally(body, finally, flow)?,
            StmtKind::Try { body, catches, .. } => self.try_catch(body, catches, flow)?,
            StmtKind::Synchronized { lock, body } => {
                let (lock, flow) = self.operand(lock, flow)?;
                if !lock.ty.is_reference() && !lock.ty.is_unknown() {
                    self.error(
                        SemanticError::TypeMismatch {
                            expected: "a reference type".to_string(),
                            found: lock.ty.to_string(),
                        },
                        lock.span,
                    )?;
                }
                let (body, flow) = self.block(body, flow)?;
                (StmtKind::Synchronized { lock, body }, flow)
            }
            StmtKind::Labeled { label, body } => self.labeled(label, *body, span, flow)?,
        };
        Ok((Stmt::new(kind, span), flow))
    }

    fn decl(&mut self, decl: LocalDecl, mut flow: Flow) -> Result<(LocalDecl, Flow)> {
        let base = self.resolve_type(&decl.ty)?;
        let mut vars = Vec::with_capacity(decl.vars.len());
        for mut declarator in decl.vars {
            let ty = if base.is_unknown() {
                DataType::Unknown
            } else {
                base.clone().with_dims(declarator.dims)
            };
            let var = Variable::new(declarator.name.clone(), ty.clone(), VarKind::Local, declarator.span)
                .final_var(decl.is_final)
                .at_loop_depth(self.loop_depth);
            let id = match self.scopes.declare(var.clone()) {
                Ok(id) => id,
                Err(_) => {
                    self.error(SemanticError::DuplicateVariable(declarator.name.clone()), declarator.span)?;
                    self.scopes.declare_hidden(var)
                }
            };
            // in scope, and unassigned, within its own initializer
            flow.unassigned.insert(id);

            if let Some(init) = declarator.init.take() {
                let (init, next) = match init.kind {
                    ExprKind::ArrayInit(elems) => {
                        let (elems, next) = self.array_init(elems, &ty, init.span, flow)?;
                        (Expr::typed(ExprKind::ArrayInit(elems), ty.clone(), init.span), next)
                    }
                    kind => {
                        let (value, next) = self.operand(Expr::new(kind, init.span), flow)?;
                        if ty.is_unknown() || value.ty.is_unknown() {
                            (value, next)
                        } else {
                            (self.assign_conv(value, &ty)?, next)
                        }
                    }
                };
                flow = next;
                flow.assign(id, decl.is_final);
                if decl.is_final {
                    self.scopes.var_mut(id).constant = init.value.clone().filter(|v| *v != Constant::Null);
                }
                declarator.init = Some(init);
            }
            declarator.var = Some(id);
            vars.push(declarator);
        }
        Ok((LocalDecl { vars, ..decl }, flow))
    }

    fn statement_expr(&mut self, expr: Expr, flow: Flow) -> Result<(Expr, Flow)> {
        let allowed = matches!(
            expr.kind,
            ExprKind::Assign { .. }
                | ExprKind::CompoundAssign { .. }
                | ExprKind::IncDec { .. }
                | ExprKind::Call { .. }
                | ExprKind::New { .. }
        );
        if !allowed {
            self.error(SemanticError::NotAStatement, expr.span)?;
        }
        let (mut expr, flow) = self.value(expr, flow)?;
        expr.discarded = true;
        Ok((expr, flow))
    }

    fn if_stmt(&mut self, cond: Expr, then: Stmt, otherwise: Option<Box<Stmt>>, flow: Flow) -> Result<(StmtKind, Flow)> {
        let (cond, flow) = self.cond(cond, flow)?;
        let (when_true, when_false) = flow.split();
        let (then, then_end) = self.nested(then, when_true)?;
        let (otherwise, else_end) = match otherwise {
            Some(stmt) => {
                let (stmt, end) = self.nested(*stmt, when_false)?;
                (Some(Box::new(stmt)), end)
            }
            None => (None, when_false),
        };
        Ok((
            StmtKind::If {
                cond,
                then: Box::new(then),
                otherwise,
            },
            then_end.join(else_end),
        ))
    }

    fn while_stmt(&mut self, cond: Expr, body: Stmt, flow: Flow) -> Result<(StmtKind, Flow)> {
        let labels = std::mem::take(&mut self.pending_labels);
        self.loop_depth += 1;
        let (cond, flow) = self.cond(cond, flow)?;
        let (when_true, when_false) = flow.split();
        self.targets.push(Target::new(TargetKind::Loop, labels));
        let (body, _) = self.nested(body, when_true)?;
        let mut target = self.pop_target()?;
        self.loop_depth -= 1;
        Ok((
            StmtKind::While {
                cond,
                body: Box::new(body),
            },
            when_false.join(target.take_breaks()),
        ))
    }

    fn do_stmt(&mut self, body: Stmt, cond: Expr, flow: Flow) -> Result<(StmtKind, Flow)> {
        let labels = std::mem::take(&mut self.pending_labels);
        self.loop_depth += 1;
        self.targets.push(Target::new(TargetKind::Loop, labels));
        let (body, end) = self.nested(body, flow)?;
        let mut target = self.pop_target()?;
        let (cond, flow) = self.cond(cond, end.join(target.take_continues()))?;
        self.loop_depth -= 1;
        let (_, when_false) = flow.split();
        Ok((
            StmtKind::Do {
                body: Box::new(body),
                cond,
            },
            when_false.join(target.take_breaks()),
        ))
    }

    fn for_stmt(
        &mut self,
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Stmt,
        mut flow: Flow,
    ) -> Result<(StmtKind, Flow)> {
        let labels = std::mem::take(&mut self.pending_labels);
        self.scopes.enter();
        let mut inits = Vec::with_capacity(init.len());
        for stmt in init {
            let (stmt, next) = self.stmt(stmt, flow)?;
            flow = next;
            inits.push(stmt);
        }

        self.loop_depth += 1;
        let (cond, flow) = match cond {
            Some(cond) => {
                let (cond, flow) = self.cond(cond, flow)?;
                (Some(cond), flow)
            }
            // no condition: the loop only ends through break
            None => (None, flow.constant(true)),
        };
        let (when_true, when_false) = flow.split();
        self.targets.push(Target::new(TargetKind::Loop, labels));
        let (body, end) = self.nested(body, when_true)?;
        let mut target = self.pop_target()?;

        let mut flow = end.join(target.take_continues());
        let mut updates = Vec::with_capacity(update.len());
        for expr in update {
            let (expr, next) = self.statement_expr(expr, flow)?;
            flow = next;
            updates.push(expr);
        }
        self.loop_depth -= 1;
        self.scopes.exit();

        Ok((
            StmtKind::For {
                init: inits,
                cond,
                update: updates,
                body: Box::new(body),
            },
            when_false.join(target.take_breaks()),
        ))
    }

    fn switch(&mut self, selector: Expr, items: Vec<SwitchItem>, flow: Flow) -> Result<(StmtKind, Flow)> {
        let (selector, start) = self.operand(selector, flow)?;
        let selector_ok = selector.ty.is_int_like() || selector.ty.is_unknown();
        if !selector_ok {
            self.error(
                SemanticError::TypeMismatch {
                    expected: DataType::Int.to_string(),
                    found: selector.ty.to_string(),
                },
                selector.span,
            )?;
        }

        self.scopes.enter();
        self.targets.push(Target::new(TargetKind::Switch, Vec::new()));
        self.switch_decls.push(Vec::new());
        let mut seen: Vec<i32> = Vec::new();
        let mut has_default = false;
        // statements before the first label cannot be reached
        let mut current = Flow::vacuous();
        let mut analyzed = Vec::with_capacity(items.len());
        for item in items {
            match item {
                SwitchItem::Case(label) => {
                    let (label, _) = self.operand(label, start.fork())?;
                    let label = self.case_label(label, &selector.ty, selector_ok, &mut seen)?;
                    current = current.join(self.case_entry(&start));
                    analyzed.push(SwitchItem::Case(label));
                }
                SwitchItem::Default(span) => {
                    if has_default {
                        self.error(SemanticError::DuplicateDefault, span)?;
                    }
                    has_default = true;
                    current = current.join(self.case_entry(&start));
                    analyzed.push(SwitchItem::Default(span));
                }
                SwitchItem::Stmt(stmt) => {
                    let (stmt, next) = self.stmt(stmt, current)?;
                    if let (StmtKind::Decl(decl), Some(declared)) = (&stmt.kind, self.switch_decls.last_mut()) {
                        declared.extend(decl.vars.iter().filter_map(|d| d.var));
                    }
                    current = next;
                    analyzed.push(SwitchItem::Stmt(stmt));
                }
            }
        }
        let mut target = self.pop_target()?;
        self.switch_decls.pop();
        self.scopes.exit();

        let mut after = current.join(target.take_breaks());
        if !has_default {
            after = after.join(start);
        }
        Ok((
            StmtKind::Switch {
                selector,
                items: analyzed,
            },
            after,
        ))
    }

    /// State on a jump to a label: locals declared by earlier groups are in
    /// scope but were skipped, so they are unassigned
    fn case_entry(&self, start: &Flow) -> Flow {
        let mut entry = start.fork();
        for &id in self.switch_decls.last().into_iter().flatten() {
            entry.unassigned.insert(id);
        }
        entry
    }

    fn case_label(&mut self, label: Expr, selector: &DataType, selector_ok: bool, seen: &mut Vec<i32>) -> Result<Expr> {
        if label.ty.is_unknown() {
            return Ok(label);
        }
        if label.value.is_none() {
            self.error(SemanticError::CaseNotConstant, label.span)?;
            return Ok(label);
        }
        let label = if selector_ok && !selector.is_unknown() {
            self.assign_conv(label, selector)?
        } else {
            label
        };
        if let Some(value) = label.value.as_ref().and_then(|v| v.as_i32()) {
            if seen.contains(&value) {
                self.error(SemanticError::DuplicateCase(value.to_string()), label.span)?;
            } else {
                seen.push(value);
            }
        }
        Ok(label)
    }

    /// Hand the state at a break or continue to the statement it leaves
    fn jump(&mut self, label: Option<&str>, is_continue: bool, span: Span, flow: Flow) -> Result<()> {
        let found = match label {
            None if is_continue => self.targets.iter().rposition(|t| t.kind == TargetKind::Loop),
            None => self.targets.iter().rposition(|t| t.kind != TargetKind::Labeled),
            Some(label) => self.targets.iter().rposition(|t| t.labels.iter().any(|l| l == label)),
        };
        let Some(index) = found else {
            let error = match (label, is_continue) {
                (Some(label), _) => SemanticError::UndefinedLabel(label.to_string()),
                (None, true) => SemanticError::ContinueOutsideLoop,
                (None, false) => SemanticError::BreakOutsideLoop,
            };
            return self.error(error, span);
        };
        let target = &mut self.targets[index];
        if !is_continue {
            target.add_break(flow);
        } else if target.kind == TargetKind::Loop {
            target.add_continue(flow);
        } else {
            let label = label.unwrap_or_default().to_string();
            self.error(SemanticError::NotALoopLabel(label), span)?;
        }
        Ok(())
    }

    fn return_value(&mut self, value: Option<Expr>, span: Span, flow: Flow) -> Result<Option<Expr>> {
        let env = self.env;
        let ret = &env.method().ret;
        let Some(value) = value else {
            if !ret.is_void() {
                self.error(SemanticError::ReturnValueMissing(ret.to_string()), span)?;
            }
            return Ok(None);
        };
        let (value, _) = self.operand(value, flow)?;
        if ret.is_void() {
            self.error(SemanticError::ReturnValueInVoid, value.span)?;
            return Ok(Some(value));
        }
        if value.ty.is_unknown() {
            return Ok(Some(value));
        }
        Ok(Some(self.assign_conv(value, ret)?))
    }

    fn try_catch(&mut self, body: Block, catches: Vec<CatchClause>, flow: Flow) -> Result<(StmtKind, Flow)> {
        let env = self.env;
        let start_unassigned = flow.unassigned.current();
        let outer = std::mem::take(&mut self.thrown);
        self.final_writes.push(VarSet::new());
        let (body, body_end) = self.block(body, flow)?;
        let written = self.final_writes.pop().unwrap_or_default();
        let mut inner = std::mem::replace(&mut self.thrown, outer);

        // a handler may run after any write of the body, even one followed
        // by a jump out of it
        let end_finals = &body_end.finals.current() | &written;
        let mut after = body_end;
        let mut caught: Vec<DataType> = Vec::new();
        let mut clauses = Vec::with_capacity(catches.len());
        for clause in catches {
            let class = self.resolve_type(&clause.ty)?;
            if !class.is_unknown() {
                if !env.is_throwable(&class) {
                    self.error(SemanticError::NotThrowable(class.to_string()), clause.ty.span)?;
                } else if let Some(earlier) = caught.iter().find(|earlier| env.is_assignable(&class, earlier)) {
                    let error = SemanticError::CatchUnreachable {
                        caught: class.to_string(),
                        earlier: earlier.to_string(),
                    };
                    self.error(error, clause.ty.span)?;
                } else if !thrown::always_catchable(env, &class) && !thrown::may_reach(env, &inner, &class) {
                    self.error(SemanticError::ExceptionNeverThrown(class.to_string()), clause.ty.span)?;
                }
                caught.push(class.clone());
            }

            self.scopes.enter();
            let param = Variable::new(clause.name.clone(), class.clone(), VarKind::Catch, clause.span)
                .final_var(clause.is_final)
                .at_loop_depth(self.loop_depth);
            let id = match self.scopes.declare(param.clone()) {
                Ok(id) => id,
                Err(_) => {
                    self.error(SemanticError::DuplicateVariable(clause.name.clone()), clause.span)?;
                    self.scopes.declare_hidden(param)
                }
            };
            let mut entry = Flow::new(start_unassigned.clone(), end_finals.clone());
            entry.assign(id, clause.is_final);
            let (handler, handler_end) = self.block(clause.body, entry)?;
            self.scopes.exit();

            after = after.join(handler_end);
            clauses.push(CatchClause {
                var: Some(id),
                class,
                body: handler,
                ..clause
            });
        }

        for class in &caught {
            thrown::catch(env, &mut inner, class);
        }
        thrown::absorb(&mut self.thrown, inner);
        Ok((
            StmtKind::Try {
                body,
                catches: clauses,
                finally: None,
            },
            after,
        ))
    }

    fn try_finally(&mut self, body: Block, finally: Block, flow: Flow) -> Result<(StmtKind, Flow)> {
        let start_unassigned = flow.unassigned.current();
        self.final_writes.push(VarSet::new());
        let (body, body_end) = self.block(body, flow)?;
        let written = self.final_writes.pop().unwrap_or_default();
        let body_unassigned = body_end.unassigned.merge();
        let body_finals = body_end.finals.merge();

        // the finally block may run after any prefix of the body, including
        // one that ends in a jump
        let entry = Flow::new(start_unassigned, &body_finals | &written);
        let (finally, finally_end) = self.block(finally, entry)?;
        let after = Flow::new(
            &body_unassigned & &finally_end.unassigned.current(),
            &body_finals | &finally_end.finals.current(),
        );
        Ok((
            StmtKind::Try {
                body,
                catches: Vec::new(),
                finally: Some(finally),
            },
            after,
        ))
    }

    fn labeled(&mut self, label: String, body: Stmt, span: Span, flow: Flow) -> Result<(StmtKind, Flow)> {
        let in_use = self.pending_labels.contains(&label) || self.targets.iter().any(|t| t.labels.contains(&label));
        if in_use {
            self.error(SemanticError::DuplicateLabel(label.clone()), span)?;
        }
        self.pending_labels.push(label.clone());

        // loops take the pending labels themselves
        if body.is_loop() || matches!(body.kind, StmtKind::Labeled { .. }) {
            let (body, flow) = self.stmt(body, flow)?;
            return Ok((
                StmtKind::Labeled {
                    label,
                    body: Box::new(body),
                },
                flow,
            ));
        }

        let labels = std::mem::take(&mut self.pending_labels);
        self.targets.push(Target::new(TargetKind::Labeled, labels));
        let (body, end) = self.stmt(body, flow)?;
        let mut target = self.pop_target()?;
        Ok((
            StmtKind::Labeled {
                label,
                body: Box::new(body),
            },
            end.join(target.take_breaks()),
        ))
    }
}
