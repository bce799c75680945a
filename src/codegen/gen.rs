//! Statements: control flow, frames and cleanup subroutines

use crate::ast::*;
use crate::common::diag::SemanticError;
use crate::common::error::{Error, Result};

use super::opcodes::{Kind, Label, Op};
use super::switch_optimizer::SwitchOptimizer;
use super::{Frame, FrameKind, Gen};

/// What a cleanup subroutine does
enum Cleanup<'b> {
    Finally(&'b Block),
    Release { lock: u16 },
}

impl<'a> Gen<'a> {
    pub(crate) fn block(&mut self, block: &Block) -> Result<bool> {
        let marker = self.code.begin_scope();
        let completes = self.stmts(&block.stmts, true)?;
        self.code.end_scope(marker);
        Ok(completes)
    }

    fn stmts(&mut self, stmts: &[Stmt], mut reached: bool) -> Result<bool> {
        for stmt in stmts {
            reached = self.stmt(stmt, reached)?;
        }
        Ok(reached)
    }

    /// Compile one statement; returns whether it can complete normally
    ///
    /// An unreached statement is reported and then compiled as if it were
    /// reached, so only the first of a dead sequence is flagged.
    pub(crate) fn stmt(&mut self, stmt: &Stmt, reached: bool) -> Result<bool> {
        if !reached {
            self.error(SemanticError::UnreachableStatement, stmt.span)?;
        }
        match &stmt.kind {
            StmtKind::Empty => Ok(true),
            StmtKind::Block(block) => self.block(block),
            StmtKind::Decl(decl) => {
                self.decl(decl)?;
                Ok(true)
            }
            StmtKind::Expr(expr) => {
                self.expr(expr, !expr.discarded)?;
                Ok(true)
            }
            StmtKind::If { cond, then, otherwise } => self.if_stmt(cond, then, otherwise.as_deref()),
            StmtKind::While { cond, body } => self.while_stmt(cond, body),
            StmtKind::Do { body, cond } => self.do_stmt(body, cond),
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => self.for_stmt(init, cond.as_ref(), update, body),
            StmtKind::Switch { selector, items } => self.switch(selector, items),
            StmtKind::Break(label) => {
                self.jump(label.as_deref(), false)?;
                Ok(false)
            }
            StmtKind::Continue(label) => {
                self.jump(label.as_deref(), true)?;
                Ok(false)
            }
            StmtKind::Return(value) => {
                self.return_stmt(value.as_ref())?;
                Ok(false)
            }
            StmtKind::Throw(exception) => {
                self.value(exception)?;
                self.code.emit(Op::AThrow);
                Ok(false)
            }
            StmtKind::Try {
                body,
                catches,
                finally: Some(finally),
            } => self.guarded(body, catches, Cleanup::Finally(finally)),
            StmtKind::Try { body, catches, finally: None } => self.try_catch(body, catches),
            StmtKind::Synchronized { lock, body } => self.synchronized(lock, body),
            StmtKind::Labeled { label, body } => self.labeled(label, body),
        }
    }

    fn decl(&mut self, decl: &LocalDecl) -> Result<()> {
        for declarator in &decl.vars {
            let var = declarator
                .var
                .ok_or_else(|| Error::internal(format!("declaration of {} was not analysed", declarator.name)))?;
            let (kind, slot) = self.declare(var)?;
            if let Some(init) = &declarator.init {
                self.value(init)?;
                self.code.emit(Op::Store(kind, slot));
            }
        }
        Ok(())
    }

    /// Constant truth value of a test, when dead paths may be dropped
    fn folded(&self, cond: &Expr) -> Option<bool> {
        if self.debug {
            None
        } else {
            cond.constant_bool()
        }
    }

    fn if_stmt(&mut self, cond: &Expr, then: &Stmt, otherwise: Option<&Stmt>) -> Result<bool> {
        if let Some(value) = self.folded(cond) {
            // both branches count as reachable; only the taken one is emitted
            let alive = self.code.is_alive();
            self.code.set_alive(alive && value);
            let then_completes = self.stmt(then, true)?;
            let mut end_alive = value && self.code.is_alive();
            let else_completes = match otherwise {
                Some(otherwise) => {
                    self.code.set_alive(alive && !value);
                    let completes = self.stmt(otherwise, true)?;
                    end_alive |= !value && self.code.is_alive();
                    completes
                }
                None => {
                    end_alive |= !value && alive;
                    true
                }
            };
            self.code.set_alive(end_alive);
            return Ok(then_completes || else_completes);
        }

        let otherwise_label = self.code.new_label();
        self.cond(cond, false, otherwise_label)?;
        let then_completes = self.stmt(then, true)?;
        let Some(otherwise) = otherwise else {
            self.code.bind(otherwise_label);
            return Ok(true);
        };
        let end = self.code.new_label();
        self.code.emit(Op::Goto(end));
        self.code.bind(otherwise_label);
        let else_completes = self.stmt(otherwise, true)?;
        self.code.bind(end);
        Ok(then_completes || else_completes)
    }

    fn push_frame(&mut self, kind: FrameKind, labels: Vec<String>) -> Label {
        let exit = self.code.new_label();
        self.frames.push(Frame::new(kind, labels, exit));
        exit
    }

    fn pop_frame(&mut self) -> Result<Frame> {
        self.frames
            .pop()
            .ok_or_else(|| Error::internal("statement frame stack underflow"))
    }

    /// Test-first loop shared by `while` and `for`:
    /// `goto test; start: body; cont: update; test: if cond goto start; exit:`
    fn tested_loop(&mut self, cond: Option<&Expr>, update: &[Expr], body: &Stmt) -> Result<bool> {
        let labels = std::mem::take(&mut self.pending_labels);
        // no condition means true
        let constant = cond.map_or(Some(true), Expr::constant_bool);
        let folded = match cond {
            Some(cond) => self.folded(cond),
            None => Some(true),
        };

        let start = self.code.new_label();
        let cont = self.code.new_label();
        let test = self.code.new_label();
        let reachable = self.code.is_alive();
        if folded != Some(true) {
            self.code.emit(Op::Goto(test));
        }
        self.code.bind(start);
        self.code.set_alive(reachable && folded != Some(false));

        let exit = self.push_frame(FrameKind::Loop { cont }, labels);
        self.stmt(body, constant != Some(false))?;
        let frame = self.pop_frame()?;

        self.code.bind(cont);
        for expr in update {
            self.expr(expr, !expr.discarded)?;
        }
        self.code.bind(test);
        match cond {
            Some(cond) => self.cond(cond, true, start)?,
            None => self.code.emit(Op::Goto(start)),
        }
        self.code.bind(exit);
        Ok(constant != Some(true) || frame.completable)
    }

    fn while_stmt(&mut self, cond: &Expr, body: &Stmt) -> Result<bool> {
        self.tested_loop(Some(cond), &[], body)
    }

    fn for_stmt(&mut self, init: &[Stmt], cond: Option<&Expr>, update: &[Expr], body: &Stmt) -> Result<bool> {
        let marker = self.code.begin_scope();
        let labels = std::mem::take(&mut self.pending_labels);
        for stmt in init {
            self.stmt(stmt, true)?;
        }
        self.pending_labels = labels;
        let completes = self.tested_loop(cond, update, body)?;
        self.code.end_scope(marker);
        Ok(completes)
    }

    fn do_stmt(&mut self, body: &Stmt, cond: &Expr) -> Result<bool> {
        let labels = std::mem::take(&mut self.pending_labels);
        let start = self.code.new_label();
        let cont = self.code.new_label();
        self.code.bind(start);
        let exit = self.push_frame(FrameKind::Loop { cont }, labels);
        let body_completes = self.stmt(body, true)?;
        let frame = self.pop_frame()?;
        self.code.bind(cont);
        self.cond(cond, true, start)?;
        self.code.bind(exit);
        let falls_out = (body_completes || frame.continued) && cond.constant_bool() != Some(true);
        Ok(falls_out || frame.completable)
    }

    fn switch(&mut self, selector: &Expr, items: &[SwitchItem]) -> Result<bool> {
        let marker = self.code.begin_scope();
        self.value(selector)?;

        let mut cases = Vec::new();
        let mut default = None;
        let mut targets = Vec::with_capacity(items.len());
        for item in items {
            let target = match item {
                SwitchItem::Case(label) => {
                    let key = label
                        .value
                        .as_ref()
                        .and_then(Constant::as_i32)
                        .ok_or_else(|| Error::internal("case label without a constant value"))?;
                    let target = self.code.new_label();
                    cases.push((key, target));
                    Some(target)
                }
                SwitchItem::Default(_) => {
                    let target = self.code.new_label();
                    default = Some(target);
                    Some(target)
                }
                SwitchItem::Stmt(_) => None,
            };
            targets.push(target);
        }

        let exit = self.push_frame(FrameKind::Switch, Vec::new());
        let mut dispatch = SwitchOptimizer::new(default.unwrap_or(exit));
        for (key, target) in cases {
            dispatch.add_case(key, target);
        }
        self.code.emit(dispatch.optimize());

        // statements before the first label are never reached
        let mut reached = false;
        for (item, target) in items.iter().zip(targets) {
            match (item, target) {
                (SwitchItem::Stmt(stmt), _) => reached = self.stmt(stmt, reached)?,
                (_, Some(target)) => {
                    self.code.bind(target);
                    reached = true;
                }
                _ => {}
            }
        }
        let frame = self.pop_frame()?;
        self.code.bind(exit);
        self.code.end_scope(marker);
        Ok(reached || default.is_none() || frame.completable)
    }

    fn labeled(&mut self, label: &str, body: &Stmt) -> Result<bool> {
        self.pending_labels.push(label.to_string());
        // loops take the pending labels themselves
        if body.is_loop() || matches!(body.kind, StmtKind::Labeled { .. }) {
            return self.stmt(body, true);
        }
        let labels = std::mem::take(&mut self.pending_labels);
        let exit = self.push_frame(FrameKind::Labeled, labels);
        let completes = self.stmt(body, true)?;
        let frame = self.pop_frame()?;
        self.code.bind(exit);
        Ok(completes || frame.completable)
    }

    fn target(&self, label: Option<&str>, is_continue: bool) -> Option<usize> {
        self.frames.iter().rposition(|frame| match label {
            Some(label) => frame.labels.iter().any(|l| l == label),
            None if is_continue => matches!(frame.kind, FrameKind::Loop { .. }),
            None => frame.is_breakable(),
        })
    }

    /// Call the cleanup of every guarded frame above `depth`, innermost first
    fn leave_frames(&mut self, depth: usize) {
        let subroutines: Vec<Label> = self.frames[depth..]
            .iter()
            .rev()
            .filter_map(|frame| match frame.kind {
                FrameKind::Guarded { subroutine, .. } => Some(subroutine),
                _ => None,
            })
            .collect();
        for subroutine in subroutines {
            self.code.emit(Op::Jsr(subroutine));
        }
    }

    /// Exclude an exit sequence from the handlers of the frames it leaves
    fn record_gap(&mut self, depth: usize, start: Label, end: Label) {
        for frame in &mut self.frames[depth..] {
            if matches!(frame.kind, FrameKind::Catching | FrameKind::Guarded { .. }) {
                frame.gaps.push((start, end));
            }
        }
    }

    fn jump(&mut self, label: Option<&str>, is_continue: bool) -> Result<()> {
        let index = self.target(label, is_continue).ok_or_else(|| {
            Error::internal(format!(
                "no target for {} {}",
                if is_continue { "continue" } else { "break" },
                label.unwrap_or("")
            ))
        })?;
        let destination = match (self.frames[index].kind, is_continue) {
            (FrameKind::Loop { cont }, true) => {
                self.frames[index].continued = true;
                cont
            }
            (_, true) => return Err(Error::internal("continue aimed at a statement that is not a loop")),
            (_, false) => {
                self.frames[index].completable = true;
                self.frames[index].exit
            }
        };

        let gap_start = self.code.new_label();
        self.code.bind(gap_start);
        self.leave_frames(index + 1);
        self.code.emit(Op::Goto(destination));
        let gap_end = self.code.new_label();
        self.code.bind(gap_end);
        self.record_gap(index + 1, gap_start, gap_end);
        Ok(())
    }

    fn return_stmt(&mut self, value: Option<&Expr>) -> Result<()> {
        let kind = match value {
            Some(value) => {
                self.value(value)?;
                Some(Kind::of(&self.env.method().ret)?)
            }
            None => None,
        };
        let gap_start = self.code.new_label();
        self.code.bind(gap_start);

        // the outermost reservation outlives every subroutine on the way out
        let parked = self.frames.iter().find_map(|frame| match frame.kind {
            FrameKind::Guarded { value_slot, .. } => Some(value_slot),
            _ => None,
        });
        match (parked, kind) {
            (Some(slot), Some(kind)) => {
                let slot = slot.ok_or_else(|| Error::internal("no slot reserved for the returned value"))?;
                self.code.emit(Op::Store(kind, slot));
                self.leave_frames(0);
                self.code.emit(Op::Load(kind, slot));
            }
            _ => self.leave_frames(0),
        }
        self.code.emit(Op::Return(kind));

        let gap_end = self.code.new_label();
        self.code.bind(gap_end);
        self.record_gap(0, gap_start, gap_end);
        Ok(())
    }

    fn try_catch(&mut self, body: &Block, catches: &[CatchClause]) -> Result<bool> {
        let start = self.code.new_label();
        let end = self.code.new_label();
        let after = self.code.new_label();

        self.code.bind(start);
        self.push_frame(FrameKind::Catching, Vec::new());
        let mut completes = self.block(body)?;
        let frame = self.pop_frame()?;
        self.code.bind(end);
        self.code.emit(Op::Goto(after));

        for clause in catches {
            let marker = self.code.begin_scope();
            let handler = self.code.new_label();
            let catch_type = Some(clause.class.internal_name());
            let slot = match clause.var {
                Some(var) => self.declare(var)?.1,
                None => self.code.alloc_local(1),
            };
            if self.code.add_handler(start, end, handler, catch_type, &frame.gaps)? {
                self.code.bind_handler(handler);
                self.code.emit(Op::Store(Kind::Ref, slot));
            } else {
                // nothing in the try body can throw
                self.code.set_alive(false);
            }
            completes |= self.block(&clause.body)?;
            self.code.emit(Op::Goto(after));
            self.code.end_scope(marker);
        }
        self.code.bind(after);
        Ok(completes)
    }

    fn synchronized(&mut self, lock: &Expr, body: &Block) -> Result<bool> {
        let marker = self.code.begin_scope();
        self.value(lock)?;
        self.code.emit(Op::Dup);
        let slot = self.code.alloc_local(1);
        self.code.emit(Op::Store(Kind::Ref, slot));
        self.code.emit(Op::MonitorEnter);
        let completes = self.guarded(body, &[], Cleanup::Release { lock: slot })?;
        self.code.end_scope(marker);
        Ok(completes)
    }

    /// A body whose every exit runs a cleanup subroutine
    ///
    /// ```text
    /// start:   body (or try-catch)
    /// end:     jsr sub; goto after
    /// handler: astore t; jsr sub; aload t; athrow
    /// sub:     astore r; cleanup; ret r
    /// after:
    /// ```
    fn guarded(&mut self, body: &Block, catches: &[CatchClause], cleanup: Cleanup<'_>) -> Result<bool> {
        let marker = self.code.begin_scope();
        let ret_width = self.env.method().ret.width();
        let value_slot = (ret_width > 0).then(|| self.code.alloc_local(ret_width));
        let exception = self.code.alloc_local(1);
        let return_address = self.code.alloc_local(1);

        let start = self.code.new_label();
        let end = self.code.new_label();
        let handler = self.code.new_label();
        let subroutine = self.code.new_label();
        let after = self.code.new_label();

        self.code.bind(start);
        self.push_frame(FrameKind::Guarded { subroutine, value_slot }, Vec::new());
        let body_completes = if catches.is_empty() {
            self.block(body)?
        } else {
            self.try_catch(body, catches)?
        };
        let frame = self.pop_frame()?;
        self.code.bind(end);
        self.code.emit(Op::Jsr(subroutine));
        self.code.emit(Op::Goto(after));

        if self.code.add_handler(start, end, handler, None, &frame.gaps)? {
            self.code.bind_handler(handler);
            self.code.emit(Op::Store(Kind::Ref, exception));
            self.code.emit(Op::Jsr(subroutine));
            self.code.emit(Op::Load(Kind::Ref, exception));
            self.code.emit(Op::AThrow);
        }

        self.code.bind(subroutine);
        self.code.emit(Op::Store(Kind::Ref, return_address));
        let cleanup_completes = match cleanup {
            Cleanup::Finally(block) => self.block(block)?,
            Cleanup::Release { lock } => {
                self.code.emit(Op::Load(Kind::Ref, lock));
                self.code.emit(Op::MonitorExit);
                true
            }
        };
        self.code.emit(Op::Ret(return_address));
        self.code.bind(after);
        self.code.end_scope(marker);
        Ok(body_completes && cleanup_completes)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::DataType;
    use crate::codegen::{compile, Code, Op};
    use crate::common::{ClassManager, ErrorList, MethodContext, ScriptEnv};
    use crate::parser::parse_script;
    use crate::wash::precompile;

    fn generate_in(method: MethodContext, source: &str) -> (Code, Vec<&'static str>) {
        let env = ScriptEnv::new(ClassManager::with_runtime(), method);
        let script = parse_script(source).unwrap();
        let mut errors = ErrorList::default();
        let unit = precompile(&env, &script, &mut errors).unwrap();
        assert!(!errors.has_errors(), "analysis failed for {:?}", source);
        let mut code = Code::new();
        compile(&env, &unit, &mut code, &mut errors).unwrap();
        let codes = errors.errors().map(|d| d.error.code()).collect();
        (code, codes)
    }

    fn generate(source: &str) -> (Code, Vec<&'static str>) {
        generate_in(MethodContext::new("demo.Script", "run").param("n", DataType::Int), source)
    }

    fn listing(source: &str) -> Vec<String> {
        let (code, codes) = generate(source);
        assert!(codes.is_empty(), "{:?}", codes);
        code.ops().iter().map(|op| op.to_string()).collect()
    }

    #[test]
    fn void_body_gets_an_implied_return() {
        assert_eq!(listing("int a = 1;"), vec!["iconst_1", "istore_2", "return"]);
    }

    #[test]
    fn missing_return_is_reported() {
        let method = MethodContext::new("demo.Script", "run").returns(DataType::Int);
        let (_, codes) = generate_in(method.clone(), "int a = 1;");
        assert_eq!(codes, vec!["RETURN_MISSING"]);
        let (_, codes) = generate_in(method, "while (true) { }");
        assert!(codes.is_empty());
    }

    #[test]
    fn first_unreachable_statement_is_reported() {
        let (_, codes) = generate("return; n = 1; n = 2;");
        assert_eq!(codes, vec!["STMT_UNREACHABLE"]);
        let (_, codes) = generate("while (true) { } n = 1;");
        assert_eq!(codes, vec!["STMT_UNREACHABLE"]);
        let (_, codes) = generate("while (false) { n = 1; }");
        assert_eq!(codes, vec!["STMT_UNREACHABLE"]);
    }

    #[test]
    fn constant_if_keeps_both_branches_reachable() {
        let (code, codes) = generate("if (false) { n = 1; } else { n = 2; }");
        assert!(codes.is_empty());
        let ops: Vec<String> = code.ops().iter().map(|op| op.to_string()).collect();
        assert_eq!(ops, vec!["iconst_2", "istore_1", "return"]);
    }

    #[test]
    fn break_makes_an_infinite_loop_complete() {
        let (_, codes) = generate("while (true) { if (n > 0) break; } n = 1;");
        assert!(codes.is_empty());
    }

    #[test]
    fn while_is_compiled_test_first() {
        let ops = listing("while (n > 0) n--;");
        assert_eq!(ops[0], "goto L2");
        assert_eq!(ops[1], "iinc 1 -1");
        assert!(ops[3].starts_with("ifgt"));
        assert_eq!(ops.last().map(String::as_str), Some("return"));
    }

    #[test]
    fn switch_without_default_leaves_to_the_end() {
        let (code, _) = generate("switch (n) { case 1: n = 5; break; case 2: n = 6; }");
        let dispatch = code
            .ops()
            .iter()
            .find_map(|op| match op {
                Op::TableSwitch { default, .. } => Some(*default),
                _ => None,
            })
            .unwrap();
        assert_eq!(code.label_pos(dispatch), Some(code.ops().len() - 1));
    }

    #[test]
    fn statements_before_the_first_case_are_unreachable() {
        let (_, codes) = generate("switch (n) { n = 1; case 1: break; }");
        assert_eq!(codes, vec!["STMT_UNREACHABLE"]);
    }

    #[test]
    fn finally_is_a_subroutine() {
        let (code, _) = generate("try { n = 1; } finally { n = 2; }");
        let jsrs = code.ops().iter().filter(|op| matches!(op, Op::Jsr(_))).count();
        assert_eq!(jsrs, 2);
        assert_eq!(code.ops().iter().filter(|op| matches!(op, Op::Ret(_))).count(), 1);
        assert_eq!(code.handlers().len(), 1);
        assert_eq!(code.handlers()[0].catch_type, None);
    }

    #[test]
    fn break_through_finally_calls_it_first() {
        let (code, codes) = generate("while (true) { try { break; } finally { n = 2; } }");
        assert!(codes.is_empty());
        let ops = code.ops();
        let jsr = ops.iter().position(|op| matches!(op, Op::Jsr(_))).unwrap();
        assert!(matches!(ops[jsr + 1], Op::Goto(_)));
        // the exit sequence is not guarded by the catch-all
        assert!(code.handlers().is_empty());
    }

    #[test]
    fn return_through_finally_parks_the_value() {
        let method = MethodContext::new("demo.Script", "run").returns(DataType::Int);
        let (code, codes) = generate_in(method, "try { return 7; } finally { }");
        assert!(codes.is_empty());
        let ops: Vec<String> = code.ops().iter().map(|op| op.to_string()).collect();
        assert_eq!(&ops[..5], &["bipush 7", "istore_1", "jsr L3", "iload_1", "ireturn"]);
    }

    #[test]
    fn catch_clauses_get_one_handler_each() {
        let (code, _) = generate(
            "try { n = n / 2; } catch (ArithmeticException e) { n = 0; } catch (RuntimeException e) { n = 1; }",
        );
        let types: Vec<Option<&str>> = code.handlers().iter().map(|h| h.catch_type.as_deref()).collect();
        assert_eq!(
            types,
            vec![Some("java/lang/ArithmeticException"), Some("java/lang/RuntimeException")]
        );
    }

    #[test]
    fn synchronized_releases_on_every_path() {
        let (code, _) = generate("synchronized (this) { n = 1; }");
        let exits = code.ops().iter().filter(|op| matches!(op, Op::MonitorExit)).count();
        assert_eq!(exits, 1);
        assert_eq!(code.ops().iter().filter(|op| matches!(op, Op::Jsr(_))).count(), 2);
        assert!(code.ops().contains(&Op::MonitorEnter));
    }
}
