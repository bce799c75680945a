//! Instruction buffer of one method body
//!
//! `Code` collects ops in emission order, binds labels to positions, keeps the
//! exception table and hands out local slots. Like the class compiler's code
//! buffer it tracks whether the current position is reachable: while it is
//! not, emitted ops are dropped, so provably dead regions leave no trace.
//! Binding a label that some live jump refers to makes the code alive again.

use std::fmt;

use crate::common::error::{Error, Result};

use super::opcodes::{Label, Op};

/// Exception table entry over op positions `[start, end)`
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub start: usize,
    pub end: usize,
    pub handler: Label,
    /// Internal name of the caught class; `None` catches everything
    pub catch_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct LabelInfo {
    pos: Option<usize>,
    referenced: bool,
    /// Stack depth a jump to this label arrives with
    depth: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct Code {
    ops: Vec<Op>,
    labels: Vec<LabelInfo>,
    handlers: Vec<Handler>,
    alive: bool,
    stack: u16,
    max_stack: u16,
    next_local: u16,
    max_locals: u16,
}

impl Default for Code {
    fn default() -> Self {
        Self::new()
    }
}

impl Code {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            labels: Vec::new(),
            handlers: Vec::new(),
            alive: true,
            stack: 0,
            max_stack: 0,
            next_local: 0,
            max_locals: 0,
        }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Current position, the index the next op will get
    pub fn pos(&self) -> usize {
        self.ops.len()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Force the reachability of the current position
    pub fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    pub fn emit(&mut self, op: Op) {
        if !self.alive {
            return;
        }
        let depth = self.stack as i32 + op.stack_effect();
        self.stack = depth.max(0) as u16;
        self.max_stack = self.max_stack.max(self.stack);
        for target in op.targets() {
            let arrival = match op {
                // the subroutine starts with the return address pushed
                Op::Jsr(_) => self.stack + 1,
                _ => self.stack,
            };
            self.max_stack = self.max_stack.max(arrival);
            let info = &mut self.labels[target.0];
            info.referenced = true;
            info.depth.get_or_insert(arrival);
        }
        if op.is_terminal() {
            self.alive = false;
        }
        self.ops.push(op);
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelInfo::default());
        Label(self.labels.len() - 1)
    }

    /// Place `label` at the current position
    pub fn bind(&mut self, label: Label) {
        let pos = self.ops.len();
        let info = &mut self.labels[label.0];
        info.pos = Some(pos);
        if info.referenced {
            if !self.alive {
                self.stack = info.depth.unwrap_or(0);
            }
            self.alive = true;
        }
    }

    /// Bind the entry of an exception handler: live, with the exception on the stack
    pub fn bind_handler(&mut self, label: Label) {
        self.labels[label.0].referenced = true;
        self.labels[label.0].depth = Some(1);
        self.alive = false;
        self.bind(label);
        self.max_stack = self.max_stack.max(1);
    }

    pub fn label_pos(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0).and_then(|l| l.pos)
    }

    pub fn is_referenced(&self, label: Label) -> bool {
        self.labels.get(label.0).map_or(false, |l| l.referenced)
    }

    /// Guard `[start, end)` minus the `gaps` with `handler`
    ///
    /// Returns whether any non-empty range was registered.
    pub fn add_handler(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<String>,
        gaps: &[(Label, Label)],
    ) -> Result<bool> {
        let start = self.bound(start)?;
        let end = self.bound(end)?;
        let mut gaps = gaps
            .iter()
            .map(|(from, to)| Ok((self.bound(*from)?, self.bound(*to)?)))
            .collect::<Result<Vec<_>>>()?;
        gaps.sort_unstable();

        let mut added = false;
        let mut from = start;
        for (gap_start, gap_end) in gaps.into_iter().chain(std::iter::once((end, end))) {
            let to = gap_start.min(end);
            if from < to {
                self.handlers.push(Handler {
                    start: from,
                    end: to,
                    handler,
                    catch_type: catch_type.clone(),
                });
                added = true;
            }
            from = from.max(gap_end);
        }
        Ok(added)
    }

    fn bound(&self, label: Label) -> Result<usize> {
        self.label_pos(label)
            .ok_or_else(|| Error::internal(format!("label {} used in the exception table but never bound", label)))
    }

    /// Next free slot; the marker to hand to [`end_scope`](Self::end_scope)
    pub fn begin_scope(&self) -> u16 {
        self.next_local
    }

    /// Free every slot allocated since `marker`
    pub fn end_scope(&mut self, marker: u16) {
        self.next_local = marker;
    }

    pub fn alloc_local(&mut self, width: u16) -> u16 {
        let slot = self.next_local;
        self.next_local += width;
        self.max_locals = self.max_locals.max(self.next_local);
        slot
    }

    /// Check that every referenced label was bound
    pub fn finish(&self) -> Result<()> {
        match self.labels.iter().position(|l| l.referenced && l.pos.is_none()) {
            Some(index) => Err(Error::internal(format!("jump to unbound label {}", Label(index)))),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Code {
    /// Listing with label markers and the exception table
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, op) in self.ops.iter().enumerate() {
            for (index, _) in self
                .labels
                .iter()
                .enumerate()
                .filter(|(_, l)| l.referenced && l.pos == Some(pos))
            {
                writeln!(f, "{}:", Label(index))?;
            }
            writeln!(f, "  {:4} {}", pos, op)?;
        }
        for (index, _) in self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.referenced && l.pos == Some(self.ops.len()))
        {
            writeln!(f, "{}:", Label(index))?;
        }
        for h in &self.handlers {
            let catch = h.catch_type.as_deref().unwrap_or("any");
            writeln!(f, "  [{}, {}) -> {} {}", h.start, h.end, h.handler, catch)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::opcodes::{Cond, Kind};

    #[test]
    fn dead_code_is_dropped_until_a_live_label() {
        let mut code = Code::new();
        let end = code.new_label();
        code.emit(Op::Iconst(1));
        code.emit(Op::If(Cond::Ne, end));
        code.emit(Op::Return(None));
        code.emit(Op::Nop);
        assert!(!code.is_alive());
        code.bind(end);
        assert!(code.is_alive());
        code.emit(Op::Return(None));
        assert_eq!(code.ops().len(), 4);
        assert_eq!(code.label_pos(end), Some(3));
    }

    #[test]
    fn unreferenced_label_keeps_code_dead() {
        let mut code = Code::new();
        let unused = code.new_label();
        code.emit(Op::Return(None));
        code.bind(unused);
        assert!(!code.is_alive());
    }

    #[test]
    fn stack_depth_follows_jumps() {
        let mut code = Code::new();
        let sub = code.new_label();
        code.emit(Op::Iconst(1));
        code.emit(Op::Lconst(5));
        code.emit(Op::Pop2);
        code.emit(Op::Jsr(sub));
        code.emit(Op::Return(Some(Kind::Int)));
        code.bind(sub);
        code.emit(Op::Store(Kind::Ref, 0));
        code.emit(Op::Ret(0));
        assert_eq!(code.max_stack(), 3);
        assert!(code.finish().is_ok());
    }

    #[test]
    fn handler_ranges_skip_gaps() {
        let mut code = Code::new();
        let (start, gap_start, gap_end, end, handler) = (
            code.new_label(),
            code.new_label(),
            code.new_label(),
            code.new_label(),
            code.new_label(),
        );
        code.bind(start);
        code.emit(Op::Nop);
        code.bind(gap_start);
        code.emit(Op::Nop);
        code.bind(gap_end);
        code.emit(Op::Nop);
        code.bind(end);
        assert!(code
            .add_handler(start, end, handler, None, &[(gap_start, gap_end)])
            .unwrap());
        let ranges: Vec<(usize, usize)> = code.handlers().iter().map(|h| (h.start, h.end)).collect();
        assert_eq!(ranges, vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn empty_ranges_register_nothing() {
        let mut code = Code::new();
        let (start, end, handler) = (code.new_label(), code.new_label(), code.new_label());
        code.bind(start);
        code.bind(end);
        assert!(!code.add_handler(start, end, handler, None, &[]).unwrap());
        assert!(code.handlers().is_empty());
        assert!(code.add_handler(start, handler, handler, None, &[]).is_err());
    }

    #[test]
    fn scopes_reuse_slots() {
        let mut code = Code::new();
        assert_eq!(code.alloc_local(1), 0);
        let marker = code.begin_scope();
        assert_eq!(code.alloc_local(2), 1);
        code.end_scope(marker);
        assert_eq!(code.alloc_local(1), 1);
        assert_eq!(code.max_locals(), 3);
    }

    #[test]
    fn unbound_targets_are_internal_errors() {
        let mut code = Code::new();
        let nowhere = code.new_label();
        code.emit(Op::Goto(nowhere));
        assert!(code.finish().is_err());
    }
}
