use std::fmt;

use crate::ast::types::{Constant, DataType};
use crate::parser::span::{HasSpan, Span};

/// Dense handle of a local variable within one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A parsed script: imports followed by the method body
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub imports: Vec<Import>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    /// Dotted name; ends in `*` for on-demand imports
    pub name: String,
    /// Simple name given with `as`, replacing the class's own
    pub alias: Option<String>,
    pub span: Span,
}

impl Import {
    pub fn is_on_demand(&self) -> bool {
        self.name.ends_with(".*")
    }
}

/// A type as written in source
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub dims: usize,
    pub span: Span,
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Field reference resolved by analysis
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
    pub ty: DataType,
    pub is_static: bool,
    pub is_final: bool,
}

/// Method or constructor reference resolved by analysis
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
    pub params: Vec<DataType>,
    pub ret: DataType,
    pub is_static: bool,
    pub is_private: bool,
    pub owner_is_interface: bool,
}

impl MethodRef {
    pub fn descriptor(&self) -> String {
        let params: String = self.params.iter().map(|p| p.descriptor()).collect();
        format!("({}){}", params, self.ret.descriptor())
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner.replace('.', "/"), self.name, self.descriptor())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
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
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
        }
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr)
    }

    pub fn is_relational(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl IncDecOp {
    pub fn is_increment(&self) -> bool {
        matches!(self, IncDecOp::PreInc | IncDecOp::PostInc)
    }

    pub fn is_prefix(&self) -> bool {
        matches!(self, IncDecOp::PreInc | IncDecOp::PreDec)
    }
}

/// An expression node
///
/// `ty` and `value` are filled in by analysis; `discarded` marks expressions
/// whose value is never used (statement expressions).
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: DataType,
    pub value: Option<Constant>,
    pub discarded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Constant),
    /// Simple name before resolution
    Name(String),
    /// `target.name` before resolution
    Select { target: Box<Expr>, name: String },
    Local(VarId),
    This,
    /// A type used as the qualifier of a static member
    TypeName(DataType),
    /// `target` is `None` for static fields reached through a type
    Field { target: Option<Box<Expr>>, field: FieldRef },
    ArrayLength(Box<Expr>),
    Index { array: Box<Expr>, index: Box<Expr> },
    Call {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
        method: Option<MethodRef>,
        super_call: bool,
    },
    New {
        class: TypeRef,
        args: Vec<Expr>,
        ctor: Option<MethodRef>,
    },
    NewArray {
        elem: TypeRef,
        dims: Vec<Expr>,
        extra_dims: usize,
        init: Option<Vec<Expr>>,
    },
    /// Nested `{ ... }` initializer; typed by its context
    ArrayInit(Vec<Expr>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    IncDec { op: IncDecOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// String concatenation
    Concat { left: Box<Expr>, right: Box<Expr> },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Explicit casts carry their written type; conversions inserted by
    /// analysis have `to: None` and use the node's `ty`
    Cast { to: Option<TypeRef>, operand: Box<Expr> },
    InstanceOf {
        operand: Box<Expr>,
        target: TypeRef,
        class: DataType,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        compound: bool,
    },
    /// `target op= value` as parsed; analysis rewrites it into `Assign`
    CompoundAssign {
        op: BinaryOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Current value of the target inside a compound assignment
    Current,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: DataType::Unknown,
            value: None,
            discarded: false,
        }
    }

    pub fn literal(value: Constant, span: Span) -> Self {
        let ty = value.data_type();
        Self {
            kind: ExprKind::Literal(value.clone()),
            span,
            ty,
            value: Some(value),
            discarded: false,
        }
    }

    /// Node with its type already known
    pub fn typed(kind: ExprKind, ty: DataType, span: Span) -> Self {
        Self {
            kind,
            span,
            ty,
            value: None,
            discarded: false,
        }
    }

    pub fn constant_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(Constant::as_bool)
    }

    /// Whether the node denotes a storage location
    pub fn is_assignable(&self) -> bool {
        match &self.kind {
            ExprKind::Local(_) | ExprKind::Name(_) | ExprKind::Index { .. } | ExprKind::Select { .. } => true,
            ExprKind::Field { field, .. } => !field.is_final,
            _ => false,
        }
    }

    /// Evaluating the node cannot have side effects
    pub fn is_side_effect_free(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Local(_) | ExprKind::This | ExprKind::TypeName(_) | ExprKind::Current => true,
            ExprKind::Field { target, .. } => target.as_deref().map_or(true, Expr::is_side_effect_free),
            _ => self.value.is_some(),
        }
    }

    /// Literal `null`
    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(Constant::Null))
    }
}

impl HasSpan for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self.kind, StmtKind::While { .. } | StmtKind::Do { .. } | StmtKind::For { .. })
    }
}

impl HasSpan for Stmt {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    /// Extra `[]` after the name
    pub dims: usize,
    pub init: Option<Expr>,
    pub var: Option<VarId>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub is_final: bool,
    pub ty: TypeRef,
    pub vars: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub is_final: bool,
    pub ty: TypeRef,
    pub name: String,
    pub var: Option<VarId>,
    /// Resolved exception type
    pub class: DataType,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchItem {
    Case(Expr),
    Default(Span),
    Stmt(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Empty,
    Block(Block),
    Decl(LocalDecl),
    Expr(Expr),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While { cond: Expr, body: Box<Stmt> },
    Do { body: Box<Stmt>, cond: Expr },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    Switch { selector: Expr, items: Vec<SwitchItem> },
    Break(Option<String>),
    Continue(Option<String>),
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Synchronized { lock: Expr, body: Block },
    Labeled { label: String, body: Box<Stmt> },
}
