//! Expressions: values, assignments, calls and string concatenation

use crate::ast::*;
use crate::common::error::{Error, Result};

use super::descriptor::{append_for, BUILDER_INIT, BUILDER_INIT_STRING, BUILDER_TO_STRING, STRING_VALUE_OF};
use super::opcodes::{Arith, ArrayKind, Kind, Op};
use super::{Current, Gen};

fn unanalysed(expr: &Expr) -> Error {
    Error::internal(format!("unanalysed expression reached code generation at {}", expr.span))
}

fn arith(op: BinaryOp) -> Option<Arith> {
    Some(match op {
        BinaryOp::Add => Arith::Add,
        BinaryOp::Sub => Arith::Sub,
        BinaryOp::Mul => Arith::Mul,
        BinaryOp::Div => Arith::Div,
        BinaryOp::Rem => Arith::Rem,
        BinaryOp::Shl => Arith::Shl,
        BinaryOp::Shr => Arith::Shr,
        BinaryOp::UShr => Arith::UShr,
        BinaryOp::And => Arith::And,
        BinaryOp::Or => Arith::Or,
        BinaryOp::Xor => Arith::Xor,
        _ => return None,
    })
}

fn one(kind: Kind) -> Op {
    match kind {
        Kind::Long => Op::Lconst(1),
        Kind::Float => Op::Fconst(1.0),
        Kind::Double => Op::Dconst(1.0),
        _ => Op::Iconst(1),
    }
}

/// Duplicate a value of `width` words and tuck it under `under` words
fn dup(width: u16, under: u16) -> Op {
    match (width, under) {
        (2, 0) => Op::Dup2,
        (2, 1) => Op::Dup2X1,
        (2, _) => Op::Dup2X2,
        (_, 0) => Op::Dup,
        (_, 1) => Op::DupX1,
        _ => Op::DupX2,
    }
}

/// Where an assignment stores, and how many words its address takes
enum Place<'e> {
    Local(Kind, u16),
    Element(ArrayKind),
    Instance(&'e FieldRef),
    Static(&'e FieldRef),
}

impl Place<'_> {
    fn address_words(&self) -> u16 {
        match self {
            Place::Local(..) | Place::Static(_) => 0,
            Place::Instance(_) => 1,
            Place::Element(_) => 2,
        }
    }

    fn store(&self) -> Op {
        match self {
            Place::Local(kind, slot) => Op::Store(*kind, *slot),
            Place::Element(kind) => Op::ArrayStore(*kind),
            Place::Instance(field) => Op::PutField((*field).clone()),
            Place::Static(field) => Op::PutStatic((*field).clone()),
        }
    }

    fn current(&self) -> Current {
        match self {
            Place::Local(kind, slot) => Current::Local(*kind, *slot),
            Place::Element(kind) => Current::Element(*kind),
            Place::Instance(field) => Current::Instance((*field).clone()),
            Place::Static(field) => Current::Static((*field).clone()),
        }
    }
}

impl<'a> Gen<'a> {
    /// Constant to push instead of evaluating `expr`
    ///
    /// Literals always qualify; folded values only outside debug mode.
    pub(crate) fn constant_of<'e>(&self, expr: &'e Expr) -> Option<&'e Constant> {
        match &expr.kind {
            ExprKind::Literal(value) => Some(value),
            _ if self.debug => None,
            _ => expr.value.as_ref(),
        }
    }

    pub(crate) fn value(&mut self, expr: &Expr) -> Result<()> {
        self.expr(expr, true)
    }

    /// Compile `expr`, leaving its value on the stack when `keep`
    pub(crate) fn expr(&mut self, expr: &Expr, keep: bool) -> Result<()> {
        if let Some(value) = self.constant_of(expr) {
            if keep {
                self.code.emit(Op::constant(value));
            }
            return Ok(());
        }
        match &expr.kind {
            ExprKind::Call {
                target,
                args,
                method,
                super_call,
                ..
            } => return self.call(expr, target.as_deref(), args, method.as_ref(), *super_call, keep),
            ExprKind::New { args, ctor, .. } => return self.new_object(expr, args, ctor.as_ref(), keep),
            ExprKind::Assign { target, value, compound } => return self.assign(target, value, *compound, keep),
            ExprKind::IncDec { op, operand } => return self.inc_dec(*op, operand, keep),
            ExprKind::Literal(value) => self.code.emit(Op::constant(value)),
            ExprKind::Local(var) => {
                let slot = self.slot(*var)?;
                self.code.emit(Op::Load(Kind::of(&expr.ty)?, slot));
            }
            ExprKind::This => self.code.emit(Op::Load(Kind::Ref, 0)),
            ExprKind::Field { target, field } => {
                self.receiver(target.as_deref(), field.is_static)?;
                self.code.emit(if field.is_static {
                    Op::GetStatic(field.clone())
                } else {
                    Op::GetField(field.clone())
                });
            }
            ExprKind::ArrayLength(array) => {
                self.value(array)?;
                self.code.emit(Op::ArrayLength);
            }
            ExprKind::Index { array, index } => {
                self.value(array)?;
                self.value(index)?;
                self.code.emit(Op::ArrayLoad(ArrayKind::of(&expr.ty)?));
            }
            ExprKind::NewArray { dims, init, .. } => match init {
                Some(elems) => self.array_init(&expr.ty, elems)?,
                None => self.new_array(&expr.ty, dims)?,
            },
            ExprKind::ArrayInit(elems) => self.array_init(&expr.ty, elems)?,
            ExprKind::Unary { op, operand } => self.unary(expr, *op, operand)?,
            ExprKind::Binary { op, left, right } => match arith(*op) {
                Some(arith) => {
                    self.value(left)?;
                    self.value(right)?;
                    self.code.emit(Op::Arith(Kind::of(&left.ty)?, arith));
                }
                None => self.boolean_value(expr)?,
            },
            ExprKind::Concat { .. } => self.concat(expr)?,
            ExprKind::Conditional { cond, then, otherwise } => {
                let otherwise_label = self.code.new_label();
                let end = self.code.new_label();
                self.cond(cond, false, otherwise_label)?;
                self.value(then)?;
                self.code.emit(Op::Goto(end));
                self.code.bind(otherwise_label);
                self.value(otherwise)?;
                self.code.bind(end);
            }
            ExprKind::Cast { operand, .. } => {
                self.value(operand)?;
                self.convert(&operand.ty, &expr.ty)?;
            }
            ExprKind::InstanceOf { operand, class, .. } => {
                self.value(operand)?;
                self.code.emit(Op::InstanceOf(class.clone()));
            }
            ExprKind::Current => {
                let current = self.current.clone().ok_or_else(|| unanalysed(expr))?;
                self.code.emit(match current {
                    Current::Local(kind, slot) => Op::Load(kind, slot),
                    Current::Element(kind) => Op::ArrayLoad(kind),
                    Current::Instance(field) => Op::GetField(field),
                    Current::Static(field) => Op::GetStatic(field),
                });
            }
            ExprKind::Name(_) | ExprKind::Select { .. } | ExprKind::TypeName(_) | ExprKind::CompoundAssign { .. } => {
                return Err(unanalysed(expr));
            }
        }
        if !keep {
            self.pop(&expr.ty);
        }
        Ok(())
    }

    fn pop(&mut self, ty: &DataType) {
        match ty.width() {
            0 => {}
            2 => self.code.emit(Op::Pop2),
            _ => self.code.emit(Op::Pop),
        }
    }

    /// Push the receiver of a member access
    ///
    /// A static member reached through an instance still evaluates the
    /// instance for its side effects.
    fn receiver(&mut self, target: Option<&Expr>, is_static: bool) -> Result<()> {
        match target {
            Some(target) if is_static => {
                if !target.is_side_effect_free() {
                    self.value(target)?;
                    self.pop(&target.ty);
                }
                Ok(())
            }
            Some(target) => self.value(target),
            None if is_static => Ok(()),
            None => Err(Error::internal("instance member access without a receiver")),
        }
    }

    fn call(
        &mut self,
        expr: &Expr,
        target: Option<&Expr>,
        args: &[Expr],
        method: Option<&MethodRef>,
        super_call: bool,
        keep: bool,
    ) -> Result<()> {
        let method = method.ok_or_else(|| unanalysed(expr))?;
        self.receiver(target, method.is_static)?;
        for arg in args {
            self.value(arg)?;
        }
        let op = if method.is_static {
            Op::InvokeStatic(method.clone())
        } else if super_call || method.is_private {
            Op::InvokeSpecial(method.clone())
        } else if method.owner_is_interface {
            Op::InvokeInterface(method.clone())
        } else {
            Op::InvokeVirtual(method.clone())
        };
        self.code.emit(op);
        if !keep {
            self.pop(&method.ret);
        }
        Ok(())
    }

    fn new_object(&mut self, expr: &Expr, args: &[Expr], ctor: Option<&MethodRef>, keep: bool) -> Result<()> {
        let ctor = ctor.ok_or_else(|| unanalysed(expr))?;
        let class = expr.ty.class_name().ok_or_else(|| unanalysed(expr))?;
        self.code.emit(Op::New(class.to_string()));
        self.code.emit(Op::Dup);
        for arg in args {
            self.value(arg)?;
        }
        self.code.emit(Op::InvokeSpecial(ctor.clone()));
        if !keep {
            self.code.emit(Op::Pop);
        }
        Ok(())
    }

    fn new_array_of(&mut self, elem: &DataType) {
        self.code.emit(if elem.is_primitive() {
            Op::NewArray(elem.clone())
        } else {
            Op::ANewArray(elem.clone())
        });
    }

    fn new_array(&mut self, ty: &DataType, dims: &[Expr]) -> Result<()> {
        for dim in dims {
            self.value(dim)?;
        }
        match dims.len() {
            1 => {
                let elem = ty.element().ok_or_else(|| Error::internal(format!("{} is not an array type", ty)))?;
                self.new_array_of(elem);
            }
            n => {
                let n = u8::try_from(n).map_err(|_| Error::internal("too many array dimensions"))?;
                self.code.emit(Op::MultiANewArray(ty.clone(), n));
            }
        }
        Ok(())
    }

    /// `{ a, b, ... }`: allocate, then store each element in turn
    fn array_init(&mut self, ty: &DataType, elems: &[Expr]) -> Result<()> {
        let elem = ty
            .element()
            .ok_or_else(|| Error::internal(format!("array initializer for non-array type {}", ty)))?;
        let len = i32::try_from(elems.len()).map_err(|_| Error::internal("array initializer too long"))?;
        self.code.emit(Op::Iconst(len));
        self.new_array_of(elem);
        let store = ArrayKind::of(elem)?;
        for (index, value) in (0..len).zip(elems) {
            self.code.emit(Op::Dup);
            self.code.emit(Op::Iconst(index));
            self.value(value)?;
            self.code.emit(Op::ArrayStore(store));
        }
        Ok(())
    }

    fn unary(&mut self, expr: &Expr, op: UnaryOp, operand: &Expr) -> Result<()> {
        if op == UnaryOp::Not {
            return self.boolean_value(expr);
        }
        self.value(operand)?;
        let kind = Kind::of(&expr.ty)?;
        match op {
            UnaryOp::Minus => self.code.emit(Op::Neg(kind)),
            UnaryOp::BitNot => {
                self.code.emit(if kind == Kind::Long { Op::Lconst(-1) } else { Op::Iconst(-1) });
                self.code.emit(Op::Arith(kind, Arith::Xor));
            }
            _ => {}
        }
        Ok(())
    }

    /// Conversion from `from` to `to` for a cast or an implicit promotion
    pub(crate) fn convert(&mut self, from: &DataType, to: &DataType) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if from.is_primitive() && to.is_primitive() {
            let (source, target) = (Kind::of(from)?, Kind::of(to)?);
            if source != target {
                self.code.emit(Op::Convert(source, target));
            }
            self.narrow(from, to);
            return Ok(());
        }
        if to.is_reference() && !matches!(from, DataType::Null) && !self.env.is_assignable(from, to) {
            self.code.emit(Op::CheckCast(to.clone()));
        }
        Ok(())
    }

    /// Truncate an int to a byte, char or short
    fn narrow(&mut self, from: &DataType, to: &DataType) {
        let op = match to {
            DataType::Byte => Op::IntToByte,
            DataType::Char => Op::IntToChar,
            // byte widens to short without an instruction
            DataType::Short if *from != DataType::Byte => Op::IntToShort,
            _ => return,
        };
        self.code.emit(op);
    }

    /// Evaluate the address part of an assignment target
    fn place<'e>(&mut self, target: &'e Expr) -> Result<Place<'e>> {
        Ok(match &target.kind {
            ExprKind::Local(var) => Place::Local(Kind::of(&target.ty)?, self.slot(*var)?),
            ExprKind::Index { array, index } => {
                self.value(array)?;
                self.value(index)?;
                Place::Element(ArrayKind::of(&target.ty)?)
            }
            ExprKind::Field { target: receiver, field } => {
                self.receiver(receiver.as_deref(), field.is_static)?;
                if field.is_static {
                    Place::Static(field)
                } else {
                    Place::Instance(field)
                }
            }
            _ => return Err(unanalysed(target)),
        })
    }

    /// Duplicate the address so a compound assignment can read the old value
    fn dup_address(&mut self, place: &Place<'_>) {
        match place.address_words() {
            2 => self.code.emit(Op::Dup2),
            1 => self.code.emit(Op::Dup),
            _ => {}
        }
    }

    /// `i += c` and `i -= c` on an int local with a short constant
    fn increment(&self, target: &Expr, value: &Expr) -> Option<(VarId, i16)> {
        let ExprKind::Local(var) = target.kind else { return None };
        if target.ty != DataType::Int {
            return None;
        }
        let ExprKind::Cast { operand, .. } = &value.kind else { return None };
        let ExprKind::Binary { op, left, right } = &operand.kind else { return None };
        if !matches!(left.kind, ExprKind::Current) || right.ty != DataType::Int {
            return None;
        }
        let amount = self.constant_of(right)?.as_i32()?;
        let amount = match op {
            BinaryOp::Add => amount,
            BinaryOp::Sub => amount.checked_neg()?,
            _ => return None,
        };
        Some((var, i16::try_from(amount).ok()?))
    }

    fn assign(&mut self, target: &Expr, value: &Expr, compound: bool, keep: bool) -> Result<()> {
        if compound {
            if let Some((var, amount)) = self.increment(target, value) {
                let slot = self.slot(var)?;
                self.code.emit(Op::Iinc(slot, amount));
                if keep {
                    self.code.emit(Op::Load(Kind::Int, slot));
                }
                return Ok(());
            }
        }

        let place = self.place(target)?;
        let saved = if compound {
            self.dup_address(&place);
            self.current.replace(place.current())
        } else {
            self.current.clone()
        };
        let result = self.value(value);
        self.current = saved;
        result?;

        if keep {
            self.code.emit(dup(target.ty.width(), place.address_words()));
        }
        self.code.emit(place.store());
        Ok(())
    }

    fn inc_dec(&mut self, op: IncDecOp, operand: &Expr, keep: bool) -> Result<()> {
        let ty = &operand.ty;
        if let (ExprKind::Local(var), DataType::Int) = (&operand.kind, ty) {
            let slot = self.slot(*var)?;
            let by = if op.is_increment() { 1 } else { -1 };
            if keep && !op.is_prefix() {
                self.code.emit(Op::Load(Kind::Int, slot));
            }
            self.code.emit(Op::Iinc(slot, by));
            if keep && op.is_prefix() {
                self.code.emit(Op::Load(Kind::Int, slot));
            }
            return Ok(());
        }

        let place = self.place(operand)?;
        self.dup_address(&place);
        self.code.emit(match place.current() {
            Current::Local(kind, slot) => Op::Load(kind, slot),
            Current::Element(kind) => Op::ArrayLoad(kind),
            Current::Instance(field) => Op::GetField(field),
            Current::Static(field) => Op::GetStatic(field),
        });
        let (width, under) = (ty.width(), place.address_words());
        if keep && !op.is_prefix() {
            self.code.emit(dup(width, under));
        }
        let kind = Kind::of(ty)?;
        self.code.emit(one(kind));
        let arith = if op.is_increment() { Arith::Add } else { Arith::Sub };
        self.code.emit(Op::Arith(kind, arith));
        self.narrow(&DataType::Int, ty);
        if keep && op.is_prefix() {
            self.code.emit(dup(width, under));
        }
        self.code.emit(place.store());
        Ok(())
    }

    /// `a + b + ...` through a string builder
    ///
    /// The left-nested chain is flattened; the first operand seeds the
    /// builder and each following one is appended by its static type.
    fn concat(&mut self, expr: &Expr) -> Result<()> {
        let mut operands = Vec::new();
        let mut node = expr;
        loop {
            match &node.kind {
                ExprKind::Concat { left, right } if self.constant_of(node).is_none() => {
                    operands.push(right.as_ref());
                    node = left.as_ref();
                }
                _ => {
                    operands.push(node);
                    break;
                }
            }
        }
        operands.reverse();
        log::trace!("concatenation of {} operands at {}", operands.len(), expr.span);

        let (seed, rest) = operands
            .split_first()
            .ok_or_else(|| Error::internal("empty concatenation"))?;
        let addressed = matches!(self.current, Some(Current::Element(_) | Current::Instance(_)));
        if matches!(seed.kind, ExprKind::Current) && addressed {
            // the target's address is on top of the stack; read through it
            // before the builder is pushed
            self.value(seed)?;
            self.code.emit(Op::InvokeStatic(STRING_VALUE_OF.clone()));
            self.code.emit(Op::New(BUILDER_INIT_STRING.owner.clone()));
            self.code.emit(Op::DupX1);
            self.code.emit(Op::Swap);
            self.code.emit(Op::InvokeSpecial(BUILDER_INIT_STRING.clone()));
        } else {
            self.code.emit(Op::New(BUILDER_INIT.owner.clone()));
            self.code.emit(Op::Dup);
            match self.constant_of(seed) {
                Some(Constant::String(text)) => {
                    self.code.emit(Op::Ldc(text.clone()));
                    self.code.emit(Op::InvokeSpecial(BUILDER_INIT_STRING.clone()));
                }
                _ => {
                    self.code.emit(Op::InvokeSpecial(BUILDER_INIT.clone()));
                    self.append(seed)?;
                }
            }
        }
        for operand in rest {
            self.append(operand)?;
        }
        self.code.emit(Op::InvokeVirtual(BUILDER_TO_STRING.clone()));
        Ok(())
    }

    fn append(&mut self, operand: &Expr) -> Result<()> {
        self.value(operand)?;
        self.code.emit(Op::InvokeVirtual(append_for(&operand.ty).clone()));
        Ok(())
    }
}
