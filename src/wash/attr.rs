//! Attr: analysis of expressions
//!
//! Every expression is analysed from an unsplit flow. Boolean-valued
//! expressions may return a split flow (separate states for the true and
//! false outcomes); [`Analyzer::value`] commits the split when only the value
//! matters.

use crate::ast::*;
use crate::common::consts::JAVA_LANG_OBJECT;
use crate::common::diag::SemanticError;
use crate::common::env::LookupError;
use crate::common::error::{Error, Result};

use super::dualset::{cross_product, Flow, Outcome};
use super::fold::{self, binary_promote, unary_promote};
use super::scope::VarKind;
use super::{lower, thrown, Analyzer};

type Analyzed = (Expr, Flow);

/// `a.b.c` as its parts, when the chain consists of plain names only
fn dotted_parts(expr: &Expr) -> Option<Vec<String>> {
    match &expr.kind {
        ExprKind::Name(name) => Some(vec![name.clone()]),
        ExprKind::Select { target, name } => {
            let mut parts = dotted_parts(target)?;
            parts.push(name.clone());
            Some(parts)
        }
        _ => None,
    }
}

fn type_list(types: &[DataType]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

impl<'a> Analyzer<'a> {
    /// Analyse for value; the outcome split is committed
    pub(crate) fn value(&mut self, expr: Expr, flow: Flow) -> Result<Analyzed> {
        let (expr, mut flow) = self.expr(expr, flow)?;
        flow.settle();
        Ok((expr, flow))
    }

    /// Analyse a value that must not be `void`
    pub(crate) fn operand(&mut self, expr: Expr, flow: Flow) -> Result<Analyzed> {
        let (mut expr, flow) = self.value(expr, flow)?;
        if expr.ty.is_void() {
            self.error(SemanticError::VoidValue, expr.span)?;
            expr.ty = DataType::Unknown;
        }
        Ok((expr, flow))
    }

    /// Analyse a condition, keeping the true and false states apart
    pub(crate) fn cond(&mut self, expr: Expr, flow: Flow) -> Result<Analyzed> {
        let (expr, flow) = self.expr(expr, flow)?;
        if !expr.ty.is_boolean() && !expr.ty.is_unknown() {
            self.error(
                SemanticError::TypeMismatch {
                    expected: DataType::Boolean.to_string(),
                    found: expr.ty.to_string(),
                },
                expr.span,
            )?;
        }
        Ok((expr, flow))
    }

    pub(crate) fn expr(&mut self, expr: Expr, flow: Flow) -> Result<Analyzed> {
        let span = expr.span;
        let (expr, flow) = match expr.kind {
            ExprKind::Literal(_)
            | ExprKind::Local(_)
            | ExprKind::TypeName(_)
            | ExprKind::Field { .. }
            | ExprKind::ArrayLength(_)
            | ExprKind::Current => (expr, flow),
            ExprKind::Name(name) => self.name(name, span, flow, false)?,
            ExprKind::This => (self.this_expr(span)?, flow),
            ExprKind::Select { target, name } => self.select(*target, name, span, flow)?,
            ExprKind::Index { array, index } => self.index(*array, *index, span, flow)?,
            ExprKind::Call {
                target,
                name,
                args,
                super_call,
                ..
            } => self.call(target, name, args, super_call, span, flow)?,
            ExprKind::New { class, args, .. } => self.new_object(class, args, span, flow)?,
            ExprKind::NewArray {
                elem,
                dims,
                extra_dims,
                init,
            } => self.new_array(elem, dims, extra_dims, init, span, flow)?,
            ExprKind::ArrayInit(elems) => {
                self.error(
                    SemanticError::TypeMismatch {
                        expected: "an array type".to_string(),
                        found: "array initializer".to_string(),
                    },
                    span,
                )?;
                let (elems, flow) = self.array_init(elems, &DataType::Unknown, span, flow)?;
                (Expr::typed(ExprKind::ArrayInit(elems), DataType::Unknown, span), flow)
            }
            ExprKind::Unary { op, operand } => self.unary(op, *operand, span, flow)?,
            ExprKind::IncDec { op, operand } => self.inc_dec(op, *operand, span, flow)?,
            ExprKind::Binary { op, left, right } => self.binary(op, *left, *right, span, flow)?,
            ExprKind::Concat { left, right } => {
                let (left, flow) = self.operand(*left, flow)?;
                let (right, flow) = self.operand(*right, flow)?;
                (self.concat(left, right, span), flow)
            }
            ExprKind::Conditional { cond, then, otherwise } => self.conditional(*cond, *then, *otherwise, span, flow)?,
            ExprKind::Cast { to, operand } => self.cast(to, *operand, expr.ty, span, flow)?,
            ExprKind::InstanceOf { operand, target, .. } => self.instance_of(*operand, target, span, flow)?,
            ExprKind::Assign {
                target,
                value,
                compound: false,
            } => self.assign(*target, *value, span, flow)?,
            ExprKind::Assign { target, value, .. } => self.compound_value(*target, *value, span, flow)?,
            ExprKind::CompoundAssign { op, target, value } => {
                let (target, flow) = self.lvalue(*target, flow, true)?;
                let rewritten = lower::compound_assign(op, target, *value, span);
                self.expr(rewritten, flow)?
            }
        };
        let flow = match expr.constant_bool() {
            Some(value) => flow.constant(value),
            None => flow,
        };
        Ok((expr, flow))
    }

    fn this_expr(&mut self, span: Span) -> Result<Expr> {
        let env = self.env;
        let method = env.method();
        if method.is_static {
            self.error(SemanticError::ThisInStatic, span)?;
        }
        Ok(Expr::typed(ExprKind::This, DataType::Class(method.class.clone()), span))
    }

    // Names

    fn name(&mut self, name: String, span: Span, flow: Flow, allow_type: bool) -> Result<Analyzed> {
        if let Some(var) = self.scopes.lookup(&name) {
            return self.read_local(var, span, flow);
        }
        if let Some(field) = self.implicit_field(&name, span)? {
            return Ok((field, flow));
        }
        if allow_type {
            if let Some(class) = self.lookup_class(&name) {
                self.depend(&class);
                let ty = DataType::Class(class);
                return Ok((Expr::typed(ExprKind::TypeName(ty.clone()), ty, span), flow));
            }
        }
        self.error(SemanticError::UndefinedName(name.clone()), span)?;
        Ok((Expr::typed(ExprKind::Name(name), DataType::Unknown, span), flow))
    }

    fn read_local(&mut self, var: VarId, span: Span, mut flow: Flow) -> Result<Analyzed> {
        if flow.unassigned.contains(var) {
            let name = self.scopes.var(var).name.clone();
            self.error(SemanticError::VarUnassigned(name), span)?;
            // report once per path
            flow.unassigned.remove(var);
        }
        let variable = self.scopes.var(var);
        let mut expr = Expr::typed(ExprKind::Local(var), variable.ty.clone(), span);
        expr.value = variable.constant.clone();
        Ok((expr, flow))
    }

    /// A field of the current class named by its simple name
    fn implicit_field(&mut self, name: &str, span: Span) -> Result<Option<Expr>> {
        let env = self.env;
        let method = env.method();
        let Some((owner, field)) = env.find_field(&method.class, name) else {
            return Ok(None);
        };
        if !env.is_accessible(owner, field.access) {
            self.error(SemanticError::Inaccessible(format!("{}.{}", owner.name, name)), span)?;
        }
        self.depend(&owner.name);
        let target = if field.is_static {
            None
        } else {
            if method.is_static {
                self.error(SemanticError::NonStaticReference(format!("field {}", name)), span)?;
            }
            Some(Box::new(Expr::typed(
                ExprKind::This,
                DataType::Class(method.class.clone()),
                span,
            )))
        };
        let mut expr = Expr::typed(
            ExprKind::Field {
                target,
                field: env.field_ref(owner, field),
            },
            field.ty.clone(),
            span,
        );
        expr.value = field.constant.clone().filter(|_| field.is_static && field.is_final);
        Ok(Some(expr))
    }

    /// Turn a package-qualified chain `a.b.C` into `TypeName(a.b.C)`
    fn requalify(&self, expr: Expr) -> Expr {
        let Some(parts) = dotted_parts(&expr) else { return expr };
        let env = self.env;
        let first = &parts[0];
        if parts.len() < 2
            || self.scopes.lookup(first).is_some()
            || env.find_field(&env.method().class, first).is_some()
            || self.lookup_class(first).is_some()
        {
            return expr;
        }
        for i in 1..parts.len() {
            let Some(class) = env.class_info(&parts[..=i].join(".")) else { continue };
            let ty = class.data_type();
            let mut rebuilt = Expr::typed(ExprKind::TypeName(ty.clone()), ty, expr.span);
            for member in &parts[i + 1..] {
                rebuilt = Expr::new(
                    ExprKind::Select {
                        target: Box::new(rebuilt),
                        name: member.clone(),
                    },
                    expr.span,
                );
            }
            return rebuilt;
        }
        expr
    }

    /// Analyse the left side of `.`: a value or a type
    fn qualifier(&mut self, expr: Expr, flow: Flow) -> Result<Analyzed> {
        let expr = self.requalify(expr);
        match expr.kind {
            ExprKind::Name(name) => {
                let (expr, mut flow) = self.name(name, expr.span, flow, true)?;
                flow.settle();
                Ok((expr, flow))
            }
            _ => self.operand(expr, flow),
        }
    }

    fn select(&mut self, target: Expr, name: String, span: Span, flow: Flow) -> Result<Analyzed> {
        let env = self.env;
        let (target, flow) = self.qualifier(target, flow)?;
        let unresolved = |target: Expr, name: String| {
            Expr::typed(
                ExprKind::Select {
                    target: Box::new(target),
                    name,
                },
                DataType::Unknown,
                span,
            )
        };
        if target.ty.is_unknown() {
            return Ok((unresolved(target, name), flow));
        }
        if target.ty.is_array() && name == "length" {
            return Ok((Expr::typed(ExprKind::ArrayLength(Box::new(target)), DataType::Int, span), flow));
        }
        let is_type = matches!(target.kind, ExprKind::TypeName(_));
        let found = target.ty.class_name().and_then(|class| env.find_field(class, &name));
        let Some((owner, field)) = found else {
            self.error(
                SemanticError::UnknownField {
                    class: target.ty.to_string(),
                    name: name.clone(),
                },
                span,
            )?;
            return Ok((unresolved(target, name), flow));
        };
        if !env.is_accessible(owner, field.access) {
            self.error(SemanticError::Inaccessible(format!("{}.{}", owner.name, name)), span)?;
        }
        if is_type && !field.is_static {
            self.error(SemanticError::NonStaticReference(format!("field {}", name)), span)?;
        }
        self.depend(&owner.name);
        let mut expr = Expr::typed(
            ExprKind::Field {
                target: (!is_type).then(|| Box::new(target)),
                field: env.field_ref(owner, field),
            },
            field.ty.clone(),
            span,
        );
        if is_type && field.is_static && field.is_final {
            expr.value = field.constant.clone();
        }
        Ok((expr, flow))
    }

    fn index(&mut self, array: Expr, index: Expr, span: Span, flow: Flow) -> Result<Analyzed> {
        let (array, flow) = self.operand(array, flow)?;
        let (index, flow) = self.operand(index, flow)?;
        let elem = match &array.ty {
            DataType::Array(elem) => (**elem).clone(),
            DataType::Unknown => DataType::Unknown,
            other => {
                self.error(SemanticError::ArrayRequired(other.to_string()), array.span)?;
                DataType::Unknown
            }
        };
        let index = self.int_operand(index)?;
        Ok((
            Expr::typed(
                ExprKind::Index {
                    array: Box::new(array),
                    index: Box::new(index),
                },
                elem,
                span,
            ),
            flow,
        ))
    }

    /// Unary promotion to `int`, required of indexes and dimensions
    fn int_operand(&mut self, expr: Expr) -> Result<Expr> {
        let promoted = unary_promote(&expr.ty);
        if promoted != DataType::Int && !promoted.is_unknown() {
            self.error(
                SemanticError::TypeMismatch {
                    expected: DataType::Int.to_string(),
                    found: expr.ty.to_string(),
                },
                expr.span,
            )?;
            return Ok(expr);
        }
        Ok(self.coerce(expr, &DataType::Int))
    }

    // Invocation and creation

    fn args(&mut self, args: Vec<Expr>, mut flow: Flow) -> Result<(Vec<Expr>, Flow)> {
        let mut analyzed = Vec::with_capacity(args.len());
        for arg in args {
            let (arg, next) = self.operand(arg, flow)?;
            flow = next;
            analyzed.push(arg);
        }
        Ok((analyzed, flow))
    }

    fn lookup_failed(&mut self, err: LookupError, class: &DataType, name: &str, args: &[DataType], span: Span) -> Result<()> {
        let error = match err {
            LookupError::NotFound => SemanticError::UnknownMethod {
                class: class.to_string(),
                name: name.to_string(),
                args: type_list(args),
            },
            LookupError::Ambiguous => SemanticError::AmbiguousMethod {
                class: class.to_string(),
                name: name.to_string(),
            },
            LookupError::Inaccessible(member) => SemanticError::Inaccessible(member),
        };
        self.error(error, span)
    }

    fn record_exceptions(&mut self, exceptions: &[DataType], span: Span) {
        let env = self.env;
        for exception in exceptions.iter().filter(|e| env.is_checked(e)) {
            thrown::record(&mut self.thrown, exception.clone(), span);
        }
    }

    fn call(
        &mut self,
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
        super_call: bool,
        span: Span,
        flow: Flow,
    ) -> Result<Analyzed> {
        let env = self.env;
        let method = env.method();

        // receiver expression, owner type, whether only static methods qualify
        let (receiver, owner, through_type, flow) = if super_call {
            if name != method.name || method.is_static {
                self.error(SemanticError::SuperInvocation(name.clone()), span)?;
            }
            let superclass = env
                .class_info(&method.class)
                .and_then(|c| c.superclass.clone())
                .unwrap_or_else(|| JAVA_LANG_OBJECT.to_string());
            let this = Expr::typed(ExprKind::This, DataType::Class(method.class.clone()), span);
            (Some(this), DataType::Class(superclass), false, flow)
        } else {
            match target {
                None => (None, DataType::Class(method.class.clone()), false, flow),
                Some(target) => {
                    let (target, flow) = self.qualifier(*target, flow)?;
                    match &target.kind {
                        ExprKind::TypeName(ty) => (None, ty.clone(), true, flow),
                        _ => {
                            let ty = target.ty.clone();
                            (Some(target), ty, false, flow)
                        }
                    }
                }
            }
        };

        let (mut args, flow) = self.args(args, flow)?;
        let unresolved = |receiver: Option<Expr>, args: Vec<Expr>, name: String| {
            Expr::typed(
                ExprKind::Call {
                    target: receiver.map(Box::new),
                    name,
                    args,
                    method: None,
                    super_call,
                },
                DataType::Unknown,
                span,
            )
        };
        if owner.is_unknown() || args.iter().any(|a| a.ty.is_unknown()) {
            return Ok((unresolved(receiver, args, name), flow));
        }
        let arg_types: Vec<DataType> = args.iter().map(|a| a.ty.clone()).collect();
        let resolved = match env.find_method(&owner, &name, &arg_types) {
            Ok(resolved) => resolved,
            Err(err) => {
                self.lookup_failed(err, &owner, &name, &arg_types, span)?;
                return Ok((unresolved(receiver, args, name), flow));
            }
        };
        let target_method = resolved.method;

        let receiver = if target_method.is_static {
            receiver.filter(|_| !super_call)
        } else if through_type {
            self.error(SemanticError::NonStaticReference(format!("method {}", name)), span)?;
            None
        } else if receiver.is_none() {
            if method.is_static {
                self.error(SemanticError::NonStaticReference(format!("method {}", name)), span)?;
            }
            Some(Expr::typed(ExprKind::This, DataType::Class(method.class.clone()), span))
        } else {
            receiver
        };

        args = args
            .into_iter()
            .zip(&target_method.params)
            .map(|(arg, param)| self.coerce(arg, param))
            .collect();
        self.record_exceptions(&resolved.exceptions, span);
        self.depend(&target_method.owner);
        log::trace!("call {} resolved to {}", name, target_method);

        let ty = target_method.ret.clone();
        Ok((
            Expr::typed(
                ExprKind::Call {
                    target: receiver.map(Box::new),
                    name,
                    args,
                    method: Some(target_method),
                    super_call,
                },
                ty,
                span,
            ),
            flow,
        ))
    }

    fn new_object(&mut self, class: TypeRef, args: Vec<Expr>, span: Span, flow: Flow) -> Result<Analyzed> {
        let env = self.env;
        let ty = self.resolve_type(&class)?;
        let (mut args, flow) = self.args(args, flow)?;
        let unresolved = |class: TypeRef, args: Vec<Expr>| {
            Expr::typed(ExprKind::New { class, args, ctor: None }, DataType::Unknown, span)
        };
        let Some(info) = ty.class_name().and_then(|name| env.class_info(name)) else {
            return Ok((unresolved(class, args), flow));
        };
        if info.is_interface || info.is_abstract {
            self.error(SemanticError::AbstractInstantiation(info.name.clone()), span)?;
            return Ok((unresolved(class, args), flow));
        }
        if !env.is_accessible(info, info.access) {
            self.error(SemanticError::Inaccessible(info.name.clone()), span)?;
        }
        if args.iter().any(|a| a.ty.is_unknown()) {
            return Ok((unresolved(class, args), flow));
        }
        let arg_types: Vec<DataType> = args.iter().map(|a| a.ty.clone()).collect();
        let resolved = match env.find_constructor(&info.name, &arg_types) {
            Ok(resolved) => resolved,
            Err(err) => {
                let simple = info.simple_name().to_string();
                self.lookup_failed(err, &ty, &simple, &arg_types, span)?;
                return Ok((unresolved(class, args), flow));
            }
        };
        args = args
            .into_iter()
            .zip(&resolved.method.params)
            .map(|(arg, param)| self.coerce(arg, param))
            .collect();
        self.record_exceptions(&resolved.exceptions, span);
        Ok((
            Expr::typed(
                ExprKind::New {
                    class,
                    args,
                    ctor: Some(resolved.method),
                },
                ty,
                span,
            ),
            flow,
        ))
    }

    fn new_array(
        &mut self,
        elem: TypeRef,
        dims: Vec<Expr>,
        extra_dims: usize,
        init: Option<Vec<Expr>>,
        span: Span,
        mut flow: Flow,
    ) -> Result<Analyzed> {
        let base = self.resolve_type(&elem)?;
        let ty = if base.is_unknown() {
            DataType::Unknown
        } else {
            base.with_dims(dims.len() + extra_dims)
        };
        if init.is_some() && !dims.is_empty() {
            self.error(SemanticError::InitializerWithDimensions, span)?;
        }
        let mut sizes = Vec::with_capacity(dims.len());
        for dim in dims {
            let (dim, next) = self.operand(dim, flow)?;
            flow = next;
            sizes.push(self.int_operand(dim)?);
        }
        let init = match init {
            Some(elems) => {
                let (elems, next) = self.array_init(elems, &ty, span, flow)?;
                flow = next;
                Some(elems)
            }
            None => None,
        };
        Ok((
            Expr::typed(
                ExprKind::NewArray {
                    elem,
                    dims: sizes,
                    extra_dims,
                    init,
                },
                ty,
                span,
            ),
            flow,
        ))
    }

    /// Elements of `{ ... }` checked against the array type `ty`
    pub(crate) fn array_init(&mut self, elems: Vec<Expr>, ty: &DataType, span: Span, mut flow: Flow) -> Result<(Vec<Expr>, Flow)> {
        let elem_ty = match ty {
            DataType::Array(elem) => (**elem).clone(),
            DataType::Unknown => DataType::Unknown,
            other => {
                self.error(
                    SemanticError::TypeMismatch {
                        expected: other.to_string(),
                        found: "array initializer".to_string(),
                    },
                    span,
                )?;
                DataType::Unknown
            }
        };
        let mut analyzed = Vec::with_capacity(elems.len());
        for elem in elems {
            let elem_span = elem.span;
            let (elem, next) = match elem.kind {
                ExprKind::ArrayInit(inner) => {
                    let (inner, next) = self.array_init(inner, &elem_ty, elem_span, flow)?;
                    (Expr::typed(ExprKind::ArrayInit(inner), elem_ty.clone(), elem_span), next)
                }
                kind => {
                    let (value, next) = self.operand(Expr::new(kind, elem_span), flow)?;
                    if elem_ty.is_unknown() || value.ty.is_unknown() {
                        (value, next)
                    } else {
                        (self.assign_conv(value, &elem_ty)?, next)
                    }
                }
            };
            flow = next;
            analyzed.push(elem);
        }
        Ok((analyzed, flow))
    }

    // Operators

    fn unary(&mut self, op: UnaryOp, operand: Expr, span: Span, flow: Flow) -> Result<Analyzed> {
        if op == UnaryOp::Not {
            let (operand, flow) = self.cond(operand, flow)?;
            let value = operand.value.as_ref().and_then(|v| fold::unary(op, v, &DataType::Boolean));
            let mut expr = Expr::typed(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                DataType::Boolean,
                span,
            );
            expr.value = value;
            return Ok((expr, flow.negate()));
        }

        let (operand, flow) = self.operand(operand, flow)?;
        let valid = match op {
            UnaryOp::BitNot => operand.ty.is_integral(),
            _ => operand.ty.is_numeric(),
        };
        let ty = if operand.ty.is_unknown() {
            DataType::Unknown
        } else if valid {
            unary_promote(&operand.ty)
        } else {
            self.error(
                SemanticError::BadOperand {
                    op: op.symbol().to_string(),
                    found: operand.ty.to_string(),
                },
                span,
            )?;
            DataType::Unknown
        };
        let operand = self.coerce(operand, &ty);
        let value = operand.value.as_ref().and_then(|v| fold::unary(op, v, &ty));
        let mut expr = Expr::typed(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            span,
        );
        expr.value = value;
        Ok((expr, flow))
    }

    fn inc_dec(&mut self, op: IncDecOp, operand: Expr, span: Span, flow: Flow) -> Result<Analyzed> {
        let (operand, mut flow) = self.lvalue(operand, flow, true)?;
        if !operand.ty.is_numeric() && !operand.ty.is_unknown() {
            let symbol = if op.is_increment() { "++" } else { "--" };
            self.error(
                SemanticError::BadOperand {
                    op: symbol.to_string(),
                    found: operand.ty.to_string(),
                },
                span,
            )?;
        }
        if let ExprKind::Local(var) = operand.kind {
            self.assign_local(var, span, &mut flow)?;
        }
        let ty = operand.ty.clone();
        Ok((
            Expr::typed(
                ExprKind::IncDec {
                    op,
                    operand: Box::new(operand),
                },
                ty,
                span,
            ),
            flow,
        ))
    }

    fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr, span: Span, flow: Flow) -> Result<Analyzed> {
        if matches!(op, BinaryOp::LogicalAnd | BinaryOp::LogicalOr) {
            return self.logical(op, left, right, span, flow);
        }

        let (mut left, a) = self.expr(left, flow)?;
        let b_unassigned = a.unassigned.current();
        let b_finals = a.finals.current();
        let (mut right, b) = self.expr(right, a.fork())?;
        for side in [&mut left, &mut right] {
            if side.ty.is_void() {
                self.error(SemanticError::VoidValue, side.span)?;
                side.ty = DataType::Unknown;
            }
        }

        let booleans = left.ty.is_boolean() && right.ty.is_boolean();
        let flow = if booleans && (op.is_bitwise() || op.is_equality()) {
            let truth = move |x: Outcome, y: Outcome| {
                let (x, y) = (x == Outcome::True, y == Outcome::True);
                match op {
                    BinaryOp::And => x && y,
                    BinaryOp::Or => x || y,
                    BinaryOp::Eq => x == y,
                    _ => x != y,
                }
            };
            Flow {
                unassigned: cross_product(a.unassigned, &b_unassigned, b.unassigned, truth),
                finals: cross_product(a.finals, &b_finals, b.finals, truth),
            }
        } else {
            // b started from the merged state of a
            let mut a = a;
            b.resolve(&mut a);
            a.settle();
            a
        };

        if op == BinaryOp::Add && (left.ty.is_string() || right.ty.is_string()) {
            let mut flow = flow;
            flow.settle();
            return Ok((self.concat(left, right, span), flow));
        }

        let unknown = left.ty.is_unknown() || right.ty.is_unknown();
        let numeric = left.ty.is_numeric() && right.ty.is_numeric();
        let integral = left.ty.is_integral() && right.ty.is_integral();

        // (type the operands compute in, result type)
        let typing = match op {
            _ if unknown => None,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem if numeric => {
                let ty = binary_promote(&left.ty, &right.ty);
                Some((ty.clone(), ty))
            }
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr if integral => {
                let ty = unary_promote(&left.ty);
                Some((ty.clone(), ty))
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor if booleans => Some((DataType::Boolean, DataType::Boolean)),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor if integral => {
                let ty = binary_promote(&left.ty, &right.ty);
                Some((ty.clone(), ty))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge if numeric => {
                Some((binary_promote(&left.ty, &right.ty), DataType::Boolean))
            }
            BinaryOp::Eq | BinaryOp::Ne if numeric => Some((binary_promote(&left.ty, &right.ty), DataType::Boolean)),
            BinaryOp::Eq | BinaryOp::Ne if booleans => Some((DataType::Boolean, DataType::Boolean)),
            BinaryOp::Eq | BinaryOp::Ne
                if left.ty.is_reference()
                    && right.ty.is_reference()
                    && (self.env.is_castable(&left.ty, &right.ty) || self.env.is_castable(&right.ty, &left.ty)) =>
            {
                let ty = if left.ty.is_string() && right.ty.is_string() {
                    DataType::string()
                } else {
                    DataType::object()
                };
                Some((ty, DataType::Boolean))
            }
            _ => {
                self.error(
                    SemanticError::BadOperands {
                        op: op.symbol().to_string(),
                        left: left.ty.to_string(),
                        right: right.ty.to_string(),
                    },
                    span,
                )?;
                None
            }
        };

        let Some((operand_ty, ty)) = typing else {
            let ty = if op.is_relational() || op.is_equality() {
                DataType::Boolean
            } else {
                DataType::Unknown
            };
            let expr = Expr::typed(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                ty,
                span,
            );
            return Ok((expr, flow));
        };

        let (left, right) = if operand_ty.is_primitive() {
            // a shift distance is always an int, even beside a long operand
            let right_ty = if op.is_shift() {
                DataType::Int
            } else {
                operand_ty.clone()
            };
            (self.coerce(left, &operand_ty), self.coerce(right, &right_ty))
        } else {
            (left, right)
        };

        let divides_by_zero = matches!(op, BinaryOp::Div | BinaryOp::Rem)
            && operand_ty.is_integral()
            && right.value.as_ref().map_or(false, |v| v.is_zero());
        if divides_by_zero {
            self.error(SemanticError::DivideByZero, span)?;
        }
        let value = match (&left.value, &right.value) {
            (Some(l), Some(r)) if !divides_by_zero => fold::binary(op, l, r, &operand_ty),
            _ => None,
        };
        let mut expr = Expr::typed(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            span,
        );
        expr.value = value;
        Ok((expr, flow))
    }

    /// `&&` and `||`: the right operand starts from one outcome of the left
    fn logical(&mut self, op: BinaryOp, left: Expr, right: Expr, span: Span, flow: Flow) -> Result<Analyzed> {
        let (left, a) = self.cond(left, flow)?;
        let (a_true, a_false) = a.split();
        let (right, flow) = if op == BinaryOp::LogicalAnd {
            let (right, b) = self.cond(right, a_true)?;
            let (b_true, b_false) = b.split();
            (right, Flow::from_branches(b_true, a_false.join(b_false)))
        } else {
            let (right, b) = self.cond(right, a_false)?;
            let (b_true, b_false) = b.split();
            (right, Flow::from_branches(a_true.join(b_true), b_false))
        };
        let value = match (&left.value, &right.value) {
            (Some(l), Some(r)) => fold::binary(op, l, r, &DataType::Boolean),
            _ => None,
        };
        let mut expr = Expr::typed(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            DataType::Boolean,
            span,
        );
        expr.value = value;
        Ok((expr, flow))
    }

    fn concat(&mut self, left: Expr, right: Expr, span: Span) -> Expr {
        let value = match (&left.value, &right.value) {
            (Some(l), Some(r)) => fold::concat(l, r),
            _ => None,
        };
        let mut expr = Expr::typed(
            ExprKind::Concat {
                left: Box::new(left),
                right: Box::new(right),
            },
            DataType::string(),
            span,
        );
        expr.value = value;
        expr
    }

    fn conditional(&mut self, cond: Expr, then: Expr, otherwise: Expr, span: Span, flow: Flow) -> Result<Analyzed> {
        let (cond, c) = self.cond(cond, flow)?;
        let (c_true, c_false) = c.split();
        let (mut then, t) = self.expr(then, c_true)?;
        let (mut otherwise, o) = self.expr(otherwise, c_false)?;
        for arm in [&mut then, &mut otherwise] {
            if arm.ty.is_void() {
                self.error(SemanticError::VoidValue, arm.span)?;
                arm.ty = DataType::Unknown;
            }
        }
        let ty = self.conditional_type(&then, &otherwise, span)?;
        let flow = if ty.is_boolean() {
            let (t_true, t_false) = t.split();
            let (o_true, o_false) = o.split();
            Flow::from_branches(t_true.join(o_true), t_false.join(o_false))
        } else {
            t.join(o)
        };
        let then = self.coerce(then, &ty);
        let otherwise = self.coerce(otherwise, &ty);
        let value = match cond.constant_bool() {
            Some(true) if otherwise.value.is_some() => then.value.clone(),
            Some(false) if then.value.is_some() => otherwise.value.clone(),
            _ => None,
        };
        let mut expr = Expr::typed(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            ty,
            span,
        );
        expr.value = value;
        Ok((expr, flow))
    }

    fn conditional_type(&mut self, then: &Expr, otherwise: &Expr, span: Span) -> Result<DataType> {
        use DataType::*;
        let (a, b) = (&then.ty, &otherwise.ty);
        if a.is_unknown() || b.is_unknown() {
            return Ok(Unknown);
        }
        if a == b {
            return Ok(a.clone());
        }
        if a.is_numeric() && b.is_numeric() {
            if matches!((a, b), (Byte, Short) | (Short, Byte)) {
                return Ok(Short);
            }
            // an int constant that fits the other arm's narrow type
            for (narrow, other) in [(a, otherwise), (b, then)] {
                let fits = matches!(narrow, Byte | Short | Char)
                    && other.ty == Int
                    && other.value.as_ref().map_or(false, |v| fold::fits_narrow(v, narrow));
                if fits {
                    return Ok(narrow.clone());
                }
            }
            return Ok(binary_promote(a, b));
        }
        if *a == Null && b.is_reference() {
            return Ok(b.clone());
        }
        if *b == Null && a.is_reference() {
            return Ok(a.clone());
        }
        if a.is_reference() && b.is_reference() {
            if self.env.is_assignable(a, b) {
                return Ok(b.clone());
            }
            if self.env.is_assignable(b, a) {
                return Ok(a.clone());
            }
        }
        self.error(
            SemanticError::TypeMismatch {
                expected: a.to_string(),
                found: b.to_string(),
            },
            span,
        )?;
        Ok(Unknown)
    }

    /// Explicit casts, and the implicit cast of a compound assignment
    fn cast(&mut self, to: Option<TypeRef>, operand: Expr, preset: DataType, span: Span, flow: Flow) -> Result<Analyzed> {
        let target = match &to {
            Some(written) => self.resolve_type(written)?,
            None => preset,
        };
        let (operand, flow) = self.operand(operand, flow)?;
        if !self.env.is_castable(&operand.ty, &target) {
            self.error(
                SemanticError::BadCast {
                    from: operand.ty.to_string(),
                    to: target.to_string(),
                },
                span,
            )?;
        }
        let value = operand.value.as_ref().and_then(|v| fold::cast(v, &target));
        let mut expr = Expr::typed(
            ExprKind::Cast {
                to,
                operand: Box::new(operand),
            },
            target,
            span,
        );
        expr.value = value;
        Ok((expr, flow))
    }

    fn instance_of(&mut self, operand: Expr, target: TypeRef, span: Span, flow: Flow) -> Result<Analyzed> {
        let (operand, flow) = self.operand(operand, flow)?;
        let class = self.resolve_type(&target)?;
        if !operand.ty.is_reference() && !operand.ty.is_unknown() {
            self.error(
                SemanticError::BadOperand {
                    op: "instanceof".to_string(),
                    found: operand.ty.to_string(),
                },
                operand.span,
            )?;
        } else if class.is_primitive() {
            self.error(
                SemanticError::TypeMismatch {
                    expected: "a reference type".to_string(),
                    found: class.to_string(),
                },
                target.span,
            )?;
        } else if !self.env.is_castable(&operand.ty, &class) {
            self.error(
                SemanticError::BadCast {
                    from: operand.ty.to_string(),
                    to: class.to_string(),
                },
                span,
            )?;
        }
        let provably_null = operand.ty == DataType::Null;
        let mut expr = Expr::typed(
            ExprKind::InstanceOf {
                operand: Box::new(operand),
                target,
                class,
            },
            DataType::Boolean,
            span,
        );
        if provably_null {
            expr.value = Some(Constant::Boolean(false));
        }
        Ok((expr, flow))
    }

    // Assignment

    /// Analyse an assignment target; `read` when its old value is used too
    fn lvalue(&mut self, target: Expr, flow: Flow, read: bool) -> Result<Analyzed> {
        let span = target.span;
        let (target, flow) = match target.kind {
            ExprKind::Name(name) if !read => match self.scopes.lookup(&name) {
                Some(var) => {
                    let ty = self.scopes.var(var).ty.clone();
                    (Expr::typed(ExprKind::Local(var), ty, span), flow)
                }
                None => self.name(name, span, flow, false)?,
            },
            kind => self.value(Expr::new(kind, span), flow)?,
        };
        if target.ty.is_unknown() {
            return Ok((target, flow));
        }
        match &target.kind {
            ExprKind::Local(_) | ExprKind::Index { .. } => {}
            ExprKind::Field { field, .. } if field.is_final => {
                self.error(SemanticError::FinalFieldAssigned(field.name.clone()), span)?;
            }
            ExprKind::Field { .. } => {}
            ExprKind::ArrayLength(_) => {
                self.error(SemanticError::FinalFieldAssigned("length".to_string()), span)?;
            }
            _ => self.error(SemanticError::NotAssignable, span)?,
        }
        Ok((target, flow))
    }

    /// Dataflow effect of assigning the local `var`
    pub(crate) fn assign_local(&mut self, var: VarId, span: Span, flow: &mut Flow) -> Result<()> {
        let variable = self.scopes.var(var);
        let (is_final, kind, depth) = (variable.is_final, variable.kind, variable.loop_depth);
        if is_final {
            let name = variable.name.clone();
            // parameters and catch variables arrive assigned
            if flow.finals.contains(var) || matches!(kind, VarKind::Catch | VarKind::Param) {
                self.error(SemanticError::FinalReassigned(name), span)?;
            } else if depth < self.loop_depth {
                self.error(SemanticError::FinalInLoop(name), span)?;
            }
            for writes in &mut self.final_writes {
                writes.insert(var);
            }
        }
        flow.assign(var, is_final);
        Ok(())
    }

    fn assign(&mut self, target: Expr, value: Expr, span: Span, flow: Flow) -> Result<Analyzed> {
        let (target, flow) = self.lvalue(target, flow, false)?;
        let (value, mut flow) = self.operand(value, flow)?;
        let value = if target.ty.is_unknown() || value.ty.is_unknown() {
            value
        } else {
            self.assign_conv(value, &target.ty)?
        };
        if let ExprKind::Local(var) = target.kind {
            self.assign_local(var, span, &mut flow)?;
        }
        let ty = target.ty.clone();
        Ok((
            Expr::typed(
                ExprKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                    compound: false,
                },
                ty,
                span,
            ),
            flow,
        ))
    }

    /// Second half of a compound assignment: the target is analysed already
    fn compound_value(&mut self, target: Expr, value: Expr, span: Span, flow: Flow) -> Result<Analyzed> {
        if !matches!(value.kind, ExprKind::Cast { to: None, .. }) {
            return Err(Error::internal("compound assignment without implicit cast"));
        }
        let (value, mut flow) = self.value(value, flow)?;
        if let ExprKind::Local(var) = target.kind {
            self.assign_local(var, span, &mut flow)?;
        }
        let ty = target.ty.clone();
        Ok((
            Expr::typed(
                ExprKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                    compound: true,
                },
                ty,
                span,
            ),
            flow,
        ))
    }
}
