//! Numeric promotion and constant folding
//!
//! Folding follows the virtual machine's arithmetic: two's complement
//! wrapping for integral types, masked shift distances, IEEE float
//! arithmetic, saturating float to integer conversion.

use crate::ast::{BinaryOp, Constant, DataType, UnaryOp};

/// byte, short and char compute as int
pub fn unary_promote(ty: &DataType) -> DataType {
    if ty.is_int_like() {
        DataType::Int
    } else {
        ty.clone()
    }
}

pub fn binary_promote(left: &DataType, right: &DataType) -> DataType {
    use DataType::*;
    match (left, right) {
        (Double, _) | (_, Double) => Double,
        (Float, _) | (_, Float) => Float,
        (Long, _) | (_, Long) => Long,
        _ => Int,
    }
}

/// Whether an int constant fits the narrow type `to` (byte, short, char)
pub fn fits_narrow(value: &Constant, to: &DataType) -> bool {
    let Some(v) = value.as_i32() else { return false };
    match to {
        DataType::Byte => i8::try_from(v).is_ok(),
        DataType::Short => i16::try_from(v).is_ok(),
        DataType::Char => u16::try_from(v).is_ok(),
        DataType::Int => true,
        _ => false,
    }
}

/// Convert a constant to a primitive type or String
pub fn cast(value: &Constant, to: &DataType) -> Option<Constant> {
    if let Constant::String(_) = value {
        return to.is_string().then(|| value.clone());
    }
    if let Constant::Boolean(_) = value {
        return to.is_boolean().then(|| value.clone());
    }
    if matches!(value, Constant::Null) {
        return None;
    }
    Some(match to {
        DataType::Byte => Constant::Int(to_i32(value)? as i8 as i32),
        DataType::Short => Constant::Int(to_i32(value)? as i16 as i32),
        DataType::Char => Constant::Char(to_i32(value)? as u16),
        DataType::Int => Constant::Int(to_i32(value)?),
        DataType::Long => Constant::Long(match value {
            Constant::Float(f) => *f as i64,
            Constant::Double(d) => *d as i64,
            other => other.as_i64()?,
        }),
        DataType::Float => Constant::Float(match value {
            Constant::Double(d) => *d as f32,
            other => other.as_f32()?,
        }),
        DataType::Double => Constant::Double(value.as_f64()?),
        _ => return None,
    })
}

fn to_i32(value: &Constant) -> Option<i32> {
    Some(match value {
        Constant::Long(v) => *v as i32,
        Constant::Float(f) => *f as i32,
        Constant::Double(d) => *d as i32,
        other => other.as_i32()?,
    })
}

pub fn unary(op: UnaryOp, value: &Constant, ty: &DataType) -> Option<Constant> {
    let value = cast(value, ty)?;
    Some(match (op, value) {
        (UnaryOp::Plus, v) => v,
        (UnaryOp::Minus, Constant::Int(v)) => Constant::Int(v.wrapping_neg()),
        (UnaryOp::Minus, Constant::Long(v)) => Constant::Long(v.wrapping_neg()),
        (UnaryOp::Minus, Constant::Float(v)) => Constant::Float(-v),
        (UnaryOp::Minus, Constant::Double(v)) => Constant::Double(-v),
        (UnaryOp::BitNot, Constant::Int(v)) => Constant::Int(!v),
        (UnaryOp::BitNot, Constant::Long(v)) => Constant::Long(!v),
        (UnaryOp::Not, Constant::Boolean(b)) => Constant::Boolean(!b),
        _ => return None,
    })
}

/// Fold `left op right` computed in `ty` (the promoted operand type)
///
/// Integral division by zero yields `None`; callers report it.
pub fn binary(op: BinaryOp, left: &Constant, right: &Constant, ty: &DataType) -> Option<Constant> {
    use BinaryOp::*;
    match ty {
        DataType::Boolean => {
            let (l, r) = (left.as_bool()?, right.as_bool()?);
            Some(Constant::Boolean(match op {
                And | LogicalAnd => l && r,
                Or | LogicalOr => l || r,
                Xor | Ne => l != r,
                Eq => l == r,
                _ => return None,
            }))
        }
        DataType::Int => {
            let l = to_i32(&cast(left, ty)?)?;
            if op.is_shift() {
                let distance = right.as_i64()? as u32 & 0x1f;
                return Some(Constant::Int(match op {
                    Shl => l.wrapping_shl(distance),
                    Shr => l.wrapping_shr(distance),
                    _ => ((l as u32) >> distance) as i32,
                }));
            }
            let r = to_i32(&cast(right, ty)?)?;
            Some(match op {
                Add => Constant::Int(l.wrapping_add(r)),
                Sub => Constant::Int(l.wrapping_sub(r)),
                Mul => Constant::Int(l.wrapping_mul(r)),
                Div => Constant::Int(l.checked_div(r).or_else(|| (r == -1).then(|| l.wrapping_neg()))?),
                Rem => Constant::Int(if r == 0 { return None } else { l.wrapping_rem(r) }),
                And => Constant::Int(l & r),
                Or => Constant::Int(l | r),
                Xor => Constant::Int(l ^ r),
                _ => compare(op, l.cmp(&r))?,
            })
        }
        DataType::Long => {
            let l = cast(left, ty)?.as_i64()?;
            if op.is_shift() {
                let distance = right.as_i64()? as u32 & 0x3f;
                return Some(Constant::Long(match op {
                    Shl => l.wrapping_shl(distance),
                    Shr => l.wrapping_shr(distance),
                    _ => ((l as u64) >> distance) as i64,
                }));
            }
            let r = cast(right, ty)?.as_i64()?;
            Some(match op {
                Add => Constant::Long(l.wrapping_add(r)),
                Sub => Constant::Long(l.wrapping_sub(r)),
                Mul => Constant::Long(l.wrapping_mul(r)),
                Div => Constant::Long(l.checked_div(r).or_else(|| (r == -1).then(|| l.wrapping_neg()))?),
                Rem => Constant::Long(if r == 0 { return None } else { l.wrapping_rem(r) }),
                And => Constant::Long(l & r),
                Or => Constant::Long(l | r),
                Xor => Constant::Long(l ^ r),
                _ => compare(op, l.cmp(&r))?,
            })
        }
        DataType::Float => {
            let (l, r) = (left.as_f32()?, right.as_f32()?);
            Some(match op {
                Add => Constant::Float(l + r),
                Sub => Constant::Float(l - r),
                Mul => Constant::Float(l * r),
                Div => Constant::Float(l / r),
                Rem => Constant::Float(l % r),
                _ => compare_floats(op, l.partial_cmp(&r))?,
            })
        }
        DataType::Double => {
            let (l, r) = (left.as_f64()?, right.as_f64()?);
            Some(match op {
                Add => Constant::Double(l + r),
                Sub => Constant::Double(l - r),
                Mul => Constant::Double(l * r),
                Div => Constant::Double(l / r),
                Rem => Constant::Double(l % r),
                _ => compare_floats(op, l.partial_cmp(&r))?,
            })
        }
        DataType::Class(_) if op.is_equality() => {
            let (l, r) = (left.as_str()?, right.as_str()?);
            Some(Constant::Boolean((l == r) == (op == Eq)))
        }
        _ => None,
    }
}

fn compare(op: BinaryOp, ordering: std::cmp::Ordering) -> Option<Constant> {
    use std::cmp::Ordering::*;
    let result = match op {
        BinaryOp::Lt => ordering == Less,
        BinaryOp::Le => ordering != Greater,
        BinaryOp::Gt => ordering == Greater,
        BinaryOp::Ge => ordering != Less,
        BinaryOp::Eq => ordering == Equal,
        BinaryOp::Ne => ordering != Equal,
        _ => return None,
    };
    Some(Constant::Boolean(result))
}

// NaN compares false with everything except `!=`
fn compare_floats(op: BinaryOp, ordering: Option<std::cmp::Ordering>) -> Option<Constant> {
    match ordering {
        Some(ordering) => compare(op, ordering),
        None if op == BinaryOp::Ne => Some(Constant::Boolean(true)),
        None if op.is_relational() || op == BinaryOp::Eq => Some(Constant::Boolean(false)),
        None => None,
    }
}

/// String conversion of two constants
pub fn concat(left: &Constant, right: &Constant) -> Option<Constant> {
    if matches!(left, Constant::Null) || matches!(right, Constant::Null) {
        return None;
    }
    Some(Constant::String(format!("{}{}", left.to_java_string(), right.to_java_string())))
}
