//! Tree rewrites performed during analysis
//!
//! Each rewrite consumes nodes and returns the replacement; the analyser then
//! analyses the result like any other node.

use crate::ast::*;

/// `target op= value` becomes `target = (T) (current op value)`
///
/// `target` must already be analysed so its type is known. The binary node
/// reads the target through `Current`, so code generation evaluates the
/// target's subexpressions only once.
pub fn compound_assign(op: BinaryOp, target: Expr, value: Expr, span: Span) -> Expr {
    let ty = target.ty.clone();
    let current = Expr::typed(ExprKind::Current, ty.clone(), target.span);
    let binary = Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(current),
            right: Box::new(value),
        },
        span,
    );
    let cast = Expr::typed(
        ExprKind::Cast {
            to: None,
            operand: Box::new(binary),
        },
        ty,
        span,
    );
    Expr::new(
        ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(cast),
            compound: true,
        },
        span,
    )
}

/// `try B catch C finally F` becomes `try { try B catch C } finally F`
///
/// Other statements are returned unchanged.
pub fn nest_try_finally(stmt: Stmt) -> Stmt {
    let span = stmt.span;
    match stmt.kind {
        StmtKind::Try {
            body,
            catches,
            finally: Some(finally),
        } if !catches.is_empty() => {
            log::debug!("nesting try-catch inside try-finally at {}", span);
            let inner = Stmt::new(
                StmtKind::Try {
                    body,
                    catches,
                    finally: None,
                },
                span,
            );
            Stmt::new(
                StmtKind::Try {
                    body: Block::new(vec![inner], span),
                    catches: Vec::new(),
                    finally: Some(finally),
                },
                span,
            )
        }
        kind => Stmt::new(kind, span),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_local() -> Expr {
        Expr::typed(ExprKind::Local(VarId(0)), DataType::Byte, Span::default())
    }

    #[test]
    fn compound_assignment_reads_current_value() {
        let rhs = Expr::literal(Constant::Int(1), Span::default());
        let assign = compound_assign(BinaryOp::Add, byte_local(), rhs, Span::default());
        let ExprKind::Assign { value, compound: true, .. } = assign.kind else {
            panic!("expected compound assignment")
        };
        assert_eq!(value.ty, DataType::Byte);
        let ExprKind::Cast { to: None, operand } = value.kind else {
            panic!("expected implicit cast")
        };
        let ExprKind::Binary { left, .. } = operand.kind else {
            panic!("expected binary")
        };
        assert!(matches!(left.kind, ExprKind::Current));
        assert_eq!(left.ty, DataType::Byte);
    }

    #[test]
    fn try_catch_finally_is_nested() {
        let catch = CatchClause {
            is_final: false,
            ty: TypeRef {
                name: "Exception".into(),
                dims: 0,
                span: Span::default(),
            },
            name: "e".into(),
            var: None,
            class: DataType::Unknown,
            body: Block::new(vec![], Span::default()),
            span: Span::default(),
        };
        let stmt = Stmt::new(
            StmtKind::Try {
                body: Block::new(vec![], Span::default()),
                catches: vec![catch],
                finally: Some(Block::new(vec![], Span::default())),
            },
            Span::default(),
        );
        let StmtKind::Try { body, catches, finally } = nest_try_finally(stmt).kind else {
            panic!("expected try")
        };
        assert!(catches.is_empty());
        assert!(finally.is_some());
        assert!(matches!(
            body.stmts[0].kind,
            StmtKind::Try { ref catches, finally: None, .. } if catches.len() == 1
        ));
    }
}
