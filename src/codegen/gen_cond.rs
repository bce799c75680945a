//! Conditions compiled as jumps

use crate::ast::*;
use crate::common::error::Result;

use super::opcodes::{Cond, Kind, Label, Op};
use super::Gen;

fn comparison(op: BinaryOp) -> Option<Cond> {
    Some(match op {
        BinaryOp::Eq => Cond::Eq,
        BinaryOp::Ne => Cond::Ne,
        BinaryOp::Lt => Cond::Lt,
        BinaryOp::Le => Cond::Le,
        BinaryOp::Gt => Cond::Gt,
        BinaryOp::Ge => Cond::Ge,
        _ => return None,
    })
}

/// Condition with the operands exchanged: `a < b` is `b > a`
fn swapped(cond: Cond) -> Cond {
    match cond {
        Cond::Lt => Cond::Gt,
        Cond::Gt => Cond::Lt,
        Cond::Le => Cond::Ge,
        Cond::Ge => Cond::Le,
        other => other,
    }
}

impl<'a> Gen<'a> {
    /// Jump to `target` when `expr` evaluates to `jump_if`, fall through otherwise
    pub(crate) fn cond(&mut self, expr: &Expr, jump_if: bool, target: Label) -> Result<()> {
        if let Some(value) = self.constant_of(expr).and_then(Constant::as_bool) {
            if value == jump_if {
                self.code.emit(Op::Goto(target));
            }
            return Ok(());
        }

        match &expr.kind {
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.cond(operand, !jump_if, target),
            ExprKind::Binary {
                op: BinaryOp::LogicalAnd,
                left,
                right,
            } => {
                if jump_if {
                    let skip = self.code.new_label();
                    self.cond(left, false, skip)?;
                    self.cond(right, true, target)?;
                    self.code.bind(skip);
                } else {
                    self.cond(left, false, target)?;
                    self.cond(right, false, target)?;
                }
                Ok(())
            }
            ExprKind::Binary {
                op: BinaryOp::LogicalOr,
                left,
                right,
            } => {
                if jump_if {
                    self.cond(left, true, target)?;
                    self.cond(right, true, target)?;
                } else {
                    let skip = self.code.new_label();
                    self.cond(left, true, skip)?;
                    self.cond(right, false, target)?;
                    self.code.bind(skip);
                }
                Ok(())
            }
            ExprKind::Binary { op, left, right } => match comparison(*op) {
                Some(cond) => self.compare(cond, left, right, jump_if, target),
                None => self.test(expr, jump_if, target),
            },
            ExprKind::Conditional { cond, then, otherwise } => {
                let otherwise_label = self.code.new_label();
                let end = self.code.new_label();
                self.cond(cond, false, otherwise_label)?;
                self.cond(then, jump_if, target)?;
                self.code.emit(Op::Goto(end));
                self.code.bind(otherwise_label);
                self.cond(otherwise, jump_if, target)?;
                self.code.bind(end);
                Ok(())
            }
            _ => self.test(expr, jump_if, target),
        }
    }

    /// Boolean on the stack, tested against zero
    fn test(&mut self, expr: &Expr, jump_if: bool, target: Label) -> Result<()> {
        self.value(expr)?;
        self.code.emit(Op::If(if jump_if { Cond::Ne } else { Cond::Eq }, target));
        Ok(())
    }

    fn is_zero(&self, expr: &Expr) -> bool {
        matches!(self.constant_of(expr), Some(value) if value.as_i32() == Some(0))
    }

    fn compare(&mut self, cond: Cond, left: &Expr, right: &Expr, jump_if: bool, target: Label) -> Result<()> {
        // NaN must fail every ordered comparison
        let unordered_high = matches!(cond, Cond::Lt | Cond::Le);
        let cond = if jump_if { cond } else { cond.negate() };

        if left.ty.is_reference() || right.ty.is_reference() {
            let null_operand = if right.is_null_literal() {
                Some(left)
            } else if left.is_null_literal() {
                Some(right)
            } else {
                None
            };
            if let Some(operand) = null_operand {
                self.value(operand)?;
                self.code.emit(if cond == Cond::Eq {
                    Op::IfNull(target)
                } else {
                    Op::IfNonNull(target)
                });
            } else {
                self.value(left)?;
                self.value(right)?;
                self.code.emit(Op::IfAcmp(cond, target));
            }
            return Ok(());
        }

        match Kind::of(&left.ty)? {
            Kind::Int => {
                if self.is_zero(right) {
                    self.value(left)?;
                    self.code.emit(Op::If(cond, target));
                } else if self.is_zero(left) {
                    self.value(right)?;
                    self.code.emit(Op::If(swapped(cond), target));
                } else {
                    self.value(left)?;
                    self.value(right)?;
                    self.code.emit(Op::IfIcmp(cond, target));
                }
            }
            kind => {
                self.value(left)?;
                self.value(right)?;
                self.code.emit(match (kind, unordered_high) {
                    (Kind::Long, _) => Op::Lcmp,
                    (Kind::Float, true) => Op::Fcmpg,
                    (Kind::Float, false) => Op::Fcmpl,
                    (_, true) => Op::Dcmpg,
                    (_, false) => Op::Dcmpl,
                });
                self.code.emit(Op::If(cond, target));
            }
        }
        Ok(())
    }

    /// Materialize a condition as 1 or 0
    pub(crate) fn boolean_value(&mut self, expr: &Expr) -> Result<()> {
        if let Some(value) = self.constant_of(expr).and_then(Constant::as_bool) {
            self.code.emit(Op::Iconst(i32::from(value)));
            return Ok(());
        }
        let otherwise = self.code.new_label();
        let end = self.code.new_label();
        self.cond(expr, false, otherwise)?;
        self.code.emit(Op::Iconst(1));
        self.code.emit(Op::Goto(end));
        self.code.bind(otherwise);
        self.code.emit(Op::Iconst(0));
        self.code.bind(end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::DataType;
    use crate::codegen::{compile, Code};
    use crate::common::{ClassManager, ErrorList, MethodContext, ScriptEnv};
    use crate::parser::parse_script;
    use crate::wash::precompile;

    fn ops(source: &str) -> Vec<String> {
        let env = ScriptEnv::new(
            ClassManager::with_runtime(),
            MethodContext::new("demo.Script", "run")
                .static_method()
                .param("n", DataType::Int)
                .param("x", DataType::Double)
                .param("s", DataType::string()),
        );
        let mut errors = ErrorList::default();
        let unit = precompile(&env, &parse_script(source).unwrap(), &mut errors).unwrap();
        assert!(!errors.has_errors(), "analysis failed for {:?}", source);
        let mut code = Code::new();
        compile(&env, &unit, &mut code, &mut errors).unwrap();
        code.ops().iter().map(|op| op.to_string()).collect()
    }

    fn mnemonics(source: &str) -> Vec<String> {
        ops(source)
            .into_iter()
            .map(|op| op.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn comparison_with_zero_uses_the_single_operand_form() {
        assert_eq!(
            mnemonics("boolean b = n > 0;"),
            vec!["iload_0", "ifle", "iconst_1", "goto", "iconst_0", "istore", "return"]
        );
        assert_eq!(mnemonics("boolean b = 0 < n;")[..2], ["iload_0", "ifle"]);
    }

    #[test]
    fn negation_flips_the_jump() {
        assert_eq!(mnemonics("if (!(n == 1)) n = 2;")[..3], ["iload_0", "iconst_1", "if_icmpeq"]);
    }

    #[test]
    fn double_comparisons_treat_nan_as_false() {
        assert_eq!(mnemonics("boolean b = x < 1.0;")[..4], ["dload_1", "dconst_1", "dcmpg", "ifge"]);
        assert_eq!(mnemonics("boolean b = x > 1.0;")[..4], ["dload_1", "dconst_1", "dcmpl", "ifle"]);
    }

    #[test]
    fn null_tests_use_ifnull() {
        assert_eq!(mnemonics("boolean b = s == null;")[..2], ["aload_3", "ifnonnull"]);
        assert_eq!(mnemonics("boolean b = null != s;")[..2], ["aload_3", "ifnull"]);
    }

    #[test]
    fn short_circuit_operands_share_the_false_target() {
        let listing = ops("boolean b = n > 0 && s != null;");
        assert!(listing[1].starts_with("ifle "));
        assert!(listing[3].starts_with("ifnull "));
        let false_target = listing[1].split(' ').nth(1);
        assert_eq!(listing[3].split(' ').nth(1), false_target);
    }

    #[test]
    fn disjunction_skips_the_right_operand() {
        assert_eq!(mnemonics("boolean b = n < 0 || n > 9;")[..5], ["iload_0", "iflt", "iload_0", "bipush", "if_icmple"]);
    }

    #[test]
    fn constant_operands_jump_unconditionally() {
        let listing = ops("boolean b = true || n > 0;");
        assert!(listing[0].starts_with("goto "), "{:?}", listing);
        assert!(!listing.contains(&"iload_0".to_string()), "{:?}", listing);
    }
}
