//! Instruction set of the target virtual machine
//!
//! Ops are kept symbolic: branch targets are [`Label`]s, member operands are
//! resolved references, and the short forms (`iconst_<n>`, `iload_<n>`, ...)
//! are chosen when a listing is printed or an opcode is asked for.

use std::fmt;

use crate::ast::{Constant, DataType, FieldRef, MethodRef};
use crate::common::error::{Error, Result};

/// A branch target inside one [`Code`](super::code::Code) buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(pub usize);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Type category of a value on the operand stack or in a local slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    Long,
    Float,
    Double,
    Ref,
}

impl Kind {
    pub fn of(ty: &DataType) -> Result<Kind> {
        Ok(match ty {
            DataType::Boolean | DataType::Byte | DataType::Char | DataType::Short | DataType::Int => Kind::Int,
            DataType::Long => Kind::Long,
            DataType::Float => Kind::Float,
            DataType::Double => Kind::Double,
            DataType::Class(_) | DataType::Array(_) | DataType::Null => Kind::Ref,
            DataType::Void | DataType::Unknown => {
                return Err(Error::internal(format!("no type category for {}", ty)));
            }
        })
    }

    /// Slots or stack words taken by a value of this kind
    pub fn width(self) -> u16 {
        match self {
            Kind::Long | Kind::Double => 2,
            _ => 1,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Kind::Int => "i",
            Kind::Long => "l",
            Kind::Float => "f",
            Kind::Double => "d",
            Kind::Ref => "a",
        }
    }

    fn index(self) -> u8 {
        match self {
            Kind::Int => 0,
            Kind::Long => 1,
            Kind::Float => 2,
            Kind::Double => 3,
            Kind::Ref => 4,
        }
    }
}

/// Element category used by array loads and stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    Int,
    Long,
    Float,
    Double,
    Ref,
    /// byte and boolean arrays
    Byte,
    Char,
    Short,
}

impl ArrayKind {
    pub fn of(elem: &DataType) -> Result<ArrayKind> {
        Ok(match elem {
            DataType::Boolean | DataType::Byte => ArrayKind::Byte,
            DataType::Char => ArrayKind::Char,
            DataType::Short => ArrayKind::Short,
            other => match Kind::of(other)? {
                Kind::Int => ArrayKind::Int,
                Kind::Long => ArrayKind::Long,
                Kind::Float => ArrayKind::Float,
                Kind::Double => ArrayKind::Double,
                Kind::Ref => ArrayKind::Ref,
            },
        })
    }

    pub fn kind(self) -> Kind {
        match self {
            ArrayKind::Long => Kind::Long,
            ArrayKind::Float => Kind::Float,
            ArrayKind::Double => Kind::Double,
            ArrayKind::Ref => Kind::Ref,
            _ => Kind::Int,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ArrayKind::Byte => "b",
            ArrayKind::Char => "c",
            ArrayKind::Short => "s",
            other => other.kind().prefix(),
        }
    }

    fn index(self) -> u8 {
        match self {
            ArrayKind::Int => 0,
            ArrayKind::Long => 1,
            ArrayKind::Float => 2,
            ArrayKind::Double => 3,
            ArrayKind::Ref => 4,
            ArrayKind::Byte => 5,
            ArrayKind::Char => 6,
            ArrayKind::Short => 7,
        }
    }
}

/// Branch condition of `if<cond>` and `if_icmp<cond>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl Cond {
    pub fn negate(self) -> Cond {
        match self {
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Lt => Cond::Ge,
            Cond::Ge => Cond::Lt,
            Cond::Gt => Cond::Le,
            Cond::Le => Cond::Gt,
        }
    }

    /// Whether the condition holds for a comparison result
    pub fn test(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Cond::Eq => ordering == Equal,
            Cond::Ne => ordering != Equal,
            Cond::Lt => ordering == Less,
            Cond::Ge => ordering != Less,
            Cond::Gt => ordering == Greater,
            Cond::Le => ordering != Greater,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Lt => "lt",
            Cond::Ge => "ge",
            Cond::Gt => "gt",
            Cond::Le => "le",
        }
    }

    fn index(self) -> u8 {
        match self {
            Cond::Eq => 0,
            Cond::Ne => 1,
            Cond::Lt => 2,
            Cond::Ge => 3,
            Cond::Gt => 4,
            Cond::Le => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    Xor,
}

impl Arith {
    fn name(self) -> &'static str {
        match self {
            Arith::Add => "add",
            Arith::Sub => "sub",
            Arith::Mul => "mul",
            Arith::Div => "div",
            Arith::Rem => "rem",
            Arith::Shl => "shl",
            Arith::Shr => "shr",
            Arith::UShr => "ushr",
            Arith::And => "and",
            Arith::Or => "or",
            Arith::Xor => "xor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Nop,
    AconstNull,
    /// Push an int; printed as `iconst_<n>`, `bipush`, `sipush` or `ldc`
    Iconst(i32),
    Lconst(i64),
    Fconst(f32),
    Dconst(f64),
    /// Push a string constant
    Ldc(String),
    Load(Kind, u16),
    Store(Kind, u16),
    Iinc(u16, i16),
    ArrayLoad(ArrayKind),
    ArrayStore(ArrayKind),
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    Arith(Kind, Arith),
    Neg(Kind),
    Convert(Kind, Kind),
    IntToByte,
    IntToChar,
    IntToShort,
    Lcmp,
    Fcmpl,
    Fcmpg,
    Dcmpl,
    Dcmpg,
    /// Compare an int with zero
    If(Cond, Label),
    IfIcmp(Cond, Label),
    /// Reference (in)equality; only `Eq` and `Ne` occur
    IfAcmp(Cond, Label),
    IfNull(Label),
    IfNonNull(Label),
    Goto(Label),
    Jsr(Label),
    Ret(u16),
    TableSwitch {
        low: i32,
        high: i32,
        default: Label,
        targets: Vec<Label>,
    },
    LookupSwitch {
        default: Label,
        pairs: Vec<(i32, Label)>,
    },
    Return(Option<Kind>),
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    InvokeVirtual(MethodRef),
    InvokeSpecial(MethodRef),
    InvokeStatic(MethodRef),
    InvokeInterface(MethodRef),
    /// Class by fully qualified name
    New(String),
    /// Array of a primitive element type
    NewArray(DataType),
    /// Array of a reference element type
    ANewArray(DataType),
    /// Array type and number of dimensions given
    MultiANewArray(DataType, u8),
    ArrayLength,
    AThrow,
    CheckCast(DataType),
    InstanceOf(DataType),
    MonitorEnter,
    MonitorExit,
}

impl Op {
    /// Push `value` with the smallest instruction that holds it
    pub fn constant(value: &Constant) -> Op {
        match value {
            Constant::Boolean(b) => Op::Iconst(*b as i32),
            Constant::Int(v) => Op::Iconst(*v),
            Constant::Char(c) => Op::Iconst(*c as i32),
            Constant::Long(v) => Op::Lconst(*v),
            Constant::Float(v) => Op::Fconst(*v),
            Constant::Double(v) => Op::Dconst(*v),
            Constant::String(s) => Op::Ldc(s.clone()),
            Constant::Null => Op::AconstNull,
        }
    }

    /// Control never falls through to the next op
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Op::Goto(_)
                | Op::Ret(_)
                | Op::Return(_)
                | Op::AThrow
                | Op::TableSwitch { .. }
                | Op::LookupSwitch { .. }
        )
    }

    /// Every label this op may transfer control to
    pub fn targets(&self) -> Vec<Label> {
        match self {
            Op::If(_, l) | Op::IfIcmp(_, l) | Op::IfAcmp(_, l) | Op::IfNull(l) | Op::IfNonNull(l) | Op::Goto(l) | Op::Jsr(l) => {
                vec![*l]
            }
            Op::TableSwitch { default, targets, .. } => std::iter::once(*default).chain(targets.iter().copied()).collect(),
            Op::LookupSwitch { default, pairs } => std::iter::once(*default).chain(pairs.iter().map(|p| p.1)).collect(),
            _ => Vec::new(),
        }
    }

    /// Net change of the operand stack depth in words
    ///
    /// A `jsr` nets zero at its fall-through point: the return address it
    /// pushes is consumed by the subroutine.
    pub fn stack_effect(&self) -> i32 {
        fn invoke(m: &MethodRef, receiver: bool) -> i32 {
            let args: i32 = m.params.iter().map(|p| p.width() as i32).sum();
            m.ret.width() as i32 - args - receiver as i32
        }
        match self {
            Op::Nop | Op::Iinc(..) | Op::Swap | Op::Neg(_) | Op::Goto(_) | Op::Jsr(_) | Op::Ret(_) => 0,
            Op::IntToByte | Op::IntToChar | Op::IntToShort | Op::NewArray(_) | Op::ANewArray(_) => 0,
            Op::ArrayLength | Op::CheckCast(_) | Op::InstanceOf(_) => 0,
            Op::AconstNull | Op::Iconst(_) | Op::Fconst(_) | Op::Ldc(_) | Op::New(_) => 1,
            Op::Lconst(_) | Op::Dconst(_) => 2,
            Op::Load(kind, _) => kind.width() as i32,
            Op::Store(kind, _) => -(kind.width() as i32),
            Op::ArrayLoad(kind) => kind.kind().width() as i32 - 2,
            Op::ArrayStore(kind) => -2 - kind.kind().width() as i32,
            Op::Pop => -1,
            Op::Pop2 => -2,
            Op::Dup | Op::DupX1 | Op::DupX2 => 1,
            Op::Dup2 | Op::Dup2X1 | Op::Dup2X2 => 2,
            // shift distances are always an int
            Op::Arith(Kind::Long, Arith::Shl | Arith::Shr | Arith::UShr) => -1,
            Op::Arith(kind, _) => -(kind.width() as i32),
            Op::Convert(from, to) => to.width() as i32 - from.width() as i32,
            Op::Lcmp | Op::Dcmpl | Op::Dcmpg => -3,
            Op::Fcmpl | Op::Fcmpg => -1,
            Op::If(..) | Op::IfNull(_) | Op::IfNonNull(_) => -1,
            Op::IfIcmp(..) | Op::IfAcmp(..) => -2,
            Op::TableSwitch { .. } | Op::LookupSwitch { .. } => -1,
            Op::Return(kind) => -(kind.map_or(0, |k| k.width() as i32)),
            Op::GetStatic(field) => field.ty.width() as i32,
            Op::PutStatic(field) => -(field.ty.width() as i32),
            Op::GetField(field) => field.ty.width() as i32 - 1,
            Op::PutField(field) => -(field.ty.width() as i32) - 1,
            Op::InvokeStatic(m) => invoke(m, false),
            Op::InvokeVirtual(m) | Op::InvokeSpecial(m) | Op::InvokeInterface(m) => invoke(m, true),
            Op::MultiANewArray(_, dims) => 1 - *dims as i32,
            Op::AThrow | Op::MonitorEnter | Op::MonitorExit => -1,
        }
    }

    /// Opcode of the instruction this op is written as
    pub fn opcode(&self) -> u8 {
        match self {
            Op::Nop => 0x00,
            Op::AconstNull => 0x01,
            Op::Iconst(v @ -1..=5) => (0x03 + v) as u8,
            Op::Iconst(v) if i8::try_from(*v).is_ok() => 0x10,
            Op::Iconst(v) if i16::try_from(*v).is_ok() => 0x11,
            Op::Iconst(_) | Op::Ldc(_) => 0x12,
            Op::Lconst(v @ 0..=1) => 0x09 + *v as u8,
            Op::Lconst(_) | Op::Dconst(_) if !self.is_short_constant() => 0x14,
            Op::Fconst(v) if self.is_short_constant() => 0x0b + *v as u8,
            Op::Fconst(_) => 0x12,
            Op::Dconst(v) => 0x0e + *v as u8,
            Op::Lconst(_) => 0x14,
            Op::Load(kind, slot) if *slot <= 3 => 0x1a + kind.index() * 4 + *slot as u8,
            Op::Load(kind, _) => 0x15 + kind.index(),
            Op::Store(kind, slot) if *slot <= 3 => 0x3b + kind.index() * 4 + *slot as u8,
            Op::Store(kind, _) => 0x36 + kind.index(),
            Op::ArrayLoad(kind) => 0x2e + kind.index(),
            Op::ArrayStore(kind) => 0x4f + kind.index(),
            Op::Pop => 0x57,
            Op::Pop2 => 0x58,
            Op::Dup => 0x59,
            Op::DupX1 => 0x5a,
            Op::DupX2 => 0x5b,
            Op::Dup2 => 0x5c,
            Op::Dup2X1 => 0x5d,
            Op::Dup2X2 => 0x5e,
            Op::Swap => 0x5f,
            Op::Arith(kind, op) => {
                // int and long only for shifts and bitwise ops
                let k = kind.index();
                match op {
                    Arith::Add => 0x60 + k,
                    Arith::Sub => 0x64 + k,
                    Arith::Mul => 0x68 + k,
                    Arith::Div => 0x6c + k,
                    Arith::Rem => 0x70 + k,
                    Arith::Shl => 0x78 + k,
                    Arith::Shr => 0x7a + k,
                    Arith::UShr => 0x7c + k,
                    Arith::And => 0x7e + k,
                    Arith::Or => 0x80 + k,
                    Arith::Xor => 0x82 + k,
                }
            }
            Op::Neg(kind) => 0x74 + kind.index(),
            Op::Iinc(..) => 0x84,
            Op::Convert(from, to) => {
                let (from, to) = (from.index(), to.index());
                // i2l = 0x85 ... d2f = 0x90, three conversions per source kind
                0x85 + from * 3 + if to < from { to } else { to - 1 }
            }
            Op::IntToByte => 0x91,
            Op::IntToChar => 0x92,
            Op::IntToShort => 0x93,
            Op::Lcmp => 0x94,
            Op::Fcmpl => 0x95,
            Op::Fcmpg => 0x96,
            Op::Dcmpl => 0x97,
            Op::Dcmpg => 0x98,
            Op::If(cond, _) => 0x99 + cond.index(),
            Op::IfIcmp(cond, _) => 0x9f + cond.index(),
            Op::IfAcmp(cond, _) => 0xa5 + cond.index(),
            Op::Goto(_) => 0xa7,
            Op::Jsr(_) => 0xa8,
            Op::Ret(_) => 0xa9,
            Op::TableSwitch { .. } => 0xaa,
            Op::LookupSwitch { .. } => 0xab,
            Op::Return(Some(kind)) => 0xac + kind.index(),
            Op::Return(None) => 0xb1,
            Op::GetStatic(_) => 0xb2,
            Op::PutStatic(_) => 0xb3,
            Op::GetField(_) => 0xb4,
            Op::PutField(_) => 0xb5,
            Op::InvokeVirtual(_) => 0xb6,
            Op::InvokeSpecial(_) => 0xb7,
            Op::InvokeStatic(_) => 0xb8,
            Op::InvokeInterface(_) => 0xb9,
            Op::New(_) => 0xbb,
            Op::NewArray(_) => 0xbc,
            Op::ANewArray(_) => 0xbd,
            Op::ArrayLength => 0xbe,
            Op::AThrow => 0xbf,
            Op::CheckCast(_) => 0xc0,
            Op::InstanceOf(_) => 0xc1,
            Op::MonitorEnter => 0xc2,
            Op::MonitorExit => 0xc3,
            Op::MultiANewArray(..) => 0xc5,
            Op::IfNull(_) => 0xc6,
            Op::IfNonNull(_) => 0xc7,
        }
    }

    /// `lconst_<n>`, `fconst_<n>` and `dconst_<n>` forms
    fn is_short_constant(&self) -> bool {
        match self {
            Op::Lconst(v) => (0..=1).contains(v),
            Op::Fconst(v) => v.to_bits() == 0.0f32.to_bits() || *v == 1.0 || *v == 2.0,
            Op::Dconst(v) => v.to_bits() == 0.0f64.to_bits() || *v == 1.0,
            _ => false,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Nop => write!(f, "nop"),
            Op::AconstNull => write!(f, "aconst_null"),
            Op::Iconst(-1) => write!(f, "iconst_m1"),
            Op::Iconst(v @ 0..=5) => write!(f, "iconst_{}", v),
            Op::Iconst(v) if i8::try_from(*v).is_ok() => write!(f, "bipush {}", v),
            Op::Iconst(v) if i16::try_from(*v).is_ok() => write!(f, "sipush {}", v),
            Op::Iconst(v) => write!(f, "ldc {}", v),
            Op::Lconst(v) if self.is_short_constant() => write!(f, "lconst_{}", v),
            Op::Lconst(v) => write!(f, "ldc2_w {}L", v),
            Op::Fconst(v) if self.is_short_constant() => write!(f, "fconst_{}", *v as i32),
            Op::Fconst(v) => write!(f, "ldc {:?}f", v),
            Op::Dconst(v) if self.is_short_constant() => write!(f, "dconst_{}", *v as i32),
            Op::Dconst(v) => write!(f, "ldc2_w {:?}", v),
            Op::Ldc(s) => write!(f, "ldc {:?}", s),
            Op::Load(kind, slot @ 0..=3) => write!(f, "{}load_{}", kind.prefix(), slot),
            Op::Load(kind, slot) => write!(f, "{}load {}", kind.prefix(), slot),
            Op::Store(kind, slot @ 0..=3) => write!(f, "{}store_{}", kind.prefix(), slot),
            Op::Store(kind, slot) => write!(f, "{}store {}", kind.prefix(), slot),
            Op::Iinc(slot, by) => write!(f, "iinc {} {}", slot, by),
            Op::ArrayLoad(kind) => write!(f, "{}aload", kind.prefix()),
            Op::ArrayStore(kind) => write!(f, "{}astore", kind.prefix()),
            Op::Pop => write!(f, "pop"),
            Op::Pop2 => write!(f, "pop2"),
            Op::Dup => write!(f, "dup"),
            Op::DupX1 => write!(f, "dup_x1"),
            Op::DupX2 => write!(f, "dup_x2"),
            Op::Dup2 => write!(f, "dup2"),
            Op::Dup2X1 => write!(f, "dup2_x1"),
            Op::Dup2X2 => write!(f, "dup2_x2"),
            Op::Swap => write!(f, "swap"),
            Op::Arith(kind, op) => write!(f, "{}{}", kind.prefix(), op.name()),
            Op::Neg(kind) => write!(f, "{}neg", kind.prefix()),
            Op::Convert(from, to) => write!(f, "{}2{}", from.prefix(), to.prefix()),
            Op::IntToByte => write!(f, "i2b"),
            Op::IntToChar => write!(f, "i2c"),
            Op::IntToShort => write!(f, "i2s"),
            Op::Lcmp => write!(f, "lcmp"),
            Op::Fcmpl => write!(f, "fcmpl"),
            Op::Fcmpg => write!(f, "fcmpg"),
            Op::Dcmpl => write!(f, "dcmpl"),
            Op::Dcmpg => write!(f, "dcmpg"),
            Op::If(cond, l) => write!(f, "if{} {}", cond.suffix(), l),
            Op::IfIcmp(cond, l) => write!(f, "if_icmp{} {}", cond.suffix(), l),
            Op::IfAcmp(cond, l) => write!(f, "if_acmp{} {}", cond.suffix(), l),
            Op::IfNull(l) => write!(f, "ifnull {}", l),
            Op::IfNonNull(l) => write!(f, "ifnonnull {}", l),
            Op::Goto(l) => write!(f, "goto {}", l),
            Op::Jsr(l) => write!(f, "jsr {}", l),
            Op::Ret(slot) => write!(f, "ret {}", slot),
            Op::TableSwitch {
                low,
                high,
                default,
                targets,
            } => {
                let targets: Vec<String> = targets.iter().map(|l| l.to_string()).collect();
                write!(f, "tableswitch {}..{} [{}] default {}", low, high, targets.join(", "), default)
            }
            Op::LookupSwitch { default, pairs } => {
                let pairs: Vec<String> = pairs.iter().map(|(k, l)| format!("{}: {}", k, l)).collect();
                write!(f, "lookupswitch [{}] default {}", pairs.join(", "), default)
            }
            Op::Return(Some(kind)) => write!(f, "{}return", kind.prefix()),
            Op::Return(None) => write!(f, "return"),
            Op::GetStatic(field) => write!(f, "getstatic {}", member(field)),
            Op::PutStatic(field) => write!(f, "putstatic {}", member(field)),
            Op::GetField(field) => write!(f, "getfield {}", member(field)),
            Op::PutField(field) => write!(f, "putfield {}", member(field)),
            Op::InvokeVirtual(m) => write!(f, "invokevirtual {}", m),
            Op::InvokeSpecial(m) => write!(f, "invokespecial {}", m),
            Op::InvokeStatic(m) => write!(f, "invokestatic {}", m),
            Op::InvokeInterface(m) => write!(f, "invokeinterface {}", m),
            Op::New(class) => write!(f, "new {}", class.replace('.', "/")),
            Op::NewArray(elem) => write!(f, "newarray {}", elem),
            Op::ANewArray(elem) => write!(f, "anewarray {}", elem.internal_name()),
            Op::MultiANewArray(ty, dims) => write!(f, "multianewarray {} {}", ty.descriptor(), dims),
            Op::ArrayLength => write!(f, "arraylength"),
            Op::AThrow => write!(f, "athrow"),
            Op::CheckCast(ty) => write!(f, "checkcast {}", ty.internal_name()),
            Op::InstanceOf(ty) => write!(f, "instanceof {}", ty.internal_name()),
            Op::MonitorEnter => write!(f, "monitorenter"),
            Op::MonitorExit => write!(f, "monitorexit"),
        }
    }
}

fn member(field: &FieldRef) -> String {
    format!("{}.{}:{}", field.owner.replace('.', "/"), field.name, field.ty.descriptor())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_constants_use_the_short_forms() {
        assert_eq!(Op::Iconst(-1).to_string(), "iconst_m1");
        assert_eq!(Op::Iconst(5).to_string(), "iconst_5");
        assert_eq!(Op::Iconst(100).to_string(), "bipush 100");
        assert_eq!(Op::Iconst(-129).to_string(), "sipush -129");
        assert_eq!(Op::Iconst(40_000).to_string(), "ldc 40000");
        assert_eq!(Op::Iconst(40_000).opcode(), 0x12);
        assert_eq!(Op::Iconst(3).opcode(), 0x06);
    }

    #[test]
    fn wide_constants() {
        assert_eq!(Op::Lconst(1).to_string(), "lconst_1");
        assert_eq!(Op::Lconst(2).opcode(), 0x14);
        assert_eq!(Op::Fconst(2.0).opcode(), 0x0d);
        assert_eq!(Op::Fconst(-0.0).opcode(), 0x12);
        assert_eq!(Op::Dconst(1.0).to_string(), "dconst_1");
    }

    #[test]
    fn typed_opcodes_follow_the_instruction_table() {
        assert_eq!(Op::Load(Kind::Ref, 0).opcode(), 0x2a);
        assert_eq!(Op::Load(Kind::Long, 7).opcode(), 0x16);
        assert_eq!(Op::Store(Kind::Double, 2).opcode(), 0x49);
        assert_eq!(Op::ArrayStore(ArrayKind::Char).opcode(), 0x55);
        assert_eq!(Op::Arith(Kind::Long, Arith::Xor).opcode(), 0x83);
        assert_eq!(Op::Arith(Kind::Int, Arith::UShr).opcode(), 0x7c);
        assert_eq!(Op::Convert(Kind::Int, Kind::Long).opcode(), 0x85);
        assert_eq!(Op::Convert(Kind::Long, Kind::Int).opcode(), 0x88);
        assert_eq!(Op::Convert(Kind::Double, Kind::Float).opcode(), 0x90);
        assert_eq!(Op::Return(Some(Kind::Ref)).opcode(), 0xb0);
        assert_eq!(Op::IfIcmp(Cond::Le, Label(0)).opcode(), 0xa4);
    }

    #[test]
    fn conditions_negate_and_test() {
        use std::cmp::Ordering;
        assert_eq!(Cond::Lt.negate(), Cond::Ge);
        assert!(Cond::Le.test(Ordering::Equal));
        assert!(!Cond::Gt.test(Ordering::Less));
    }

    #[test]
    fn array_kinds_of_element_types() {
        assert_eq!(ArrayKind::of(&DataType::Boolean).unwrap(), ArrayKind::Byte);
        assert_eq!(ArrayKind::of(&DataType::string()).unwrap(), ArrayKind::Ref);
        assert!(Kind::of(&DataType::Void).is_err());
    }
}
