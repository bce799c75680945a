use super::nodes::*;

/// Indented tree dump of a script, used by `scriptc parse`
pub struct AstPrinter {
    indent_level: usize,
    output: String,
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl AstPrinter {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            output: String::new(),
        }
    }

    pub fn print(&mut self, script: &Script) -> String {
        self.output.clear();
        for import in &script.imports {
            match &import.alias {
                Some(alias) => self.writeln(&format!("import {} as {}", import.name, alias)),
                None => self.writeln(&format!("import {}", import.name)),
            }
        }
        self.block(&script.body);
        std::mem::take(&mut self.output)
    }

    pub fn print_block(&mut self, block: &Block) -> String {
        self.output.clear();
        self.block(block);
        std::mem::take(&mut self.output)
    }

    fn indent(&mut self) {
        self.indent_level += 2;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(2);
    }

    fn writeln(&mut self, s: &str) {
        for _ in 0..self.indent_level {
            self.output.push(' ');
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn block(&mut self, block: &Block) {
        self.writeln("Block");
        self.indent();
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.dedent();
    }

    fn nested(&mut self, title: &str, stmt: &Stmt) {
        self.writeln(title);
        self.indent();
        self.stmt(stmt);
        self.dedent();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Empty => self.writeln("Empty"),
            StmtKind::Block(block) => self.block(block),
            StmtKind::Decl(decl) => {
                let prefix = if decl.is_final { "final " } else { "" };
                self.writeln(&format!("Decl {}{}", prefix, decl.ty));
                self.indent();
                for var in &decl.vars {
                    self.writeln(&format!("{}{}", var.name, "[]".repeat(var.dims)));
                    if let Some(init) = &var.init {
                        self.indent();
                        self.expr(init);
                        self.dedent();
                    }
                }
                self.dedent();
            }
            StmtKind::Expr(expr) => {
                self.writeln("Expr");
                self.indent();
                self.expr(expr);
                self.dedent();
            }
            StmtKind::If { cond, then, otherwise } => {
                self.writeln("If");
                self.indent();
                self.expr(cond);
                self.nested("Then", then);
                if let Some(otherwise) = otherwise {
                    self.nested("Else", otherwise);
                }
                self.dedent();
            }
            StmtKind::While { cond, body } => {
                self.writeln("While");
                self.indent();
                self.expr(cond);
                self.stmt(body);
                self.dedent();
            }
            StmtKind::Do { body, cond } => {
                self.writeln("Do");
                self.indent();
                self.stmt(body);
                self.expr(cond);
                self.dedent();
            }
            StmtKind::For { init, cond, update, body } => {
                self.writeln("For");
                self.indent();
                for s in init {
                    self.stmt(s);
                }
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                for e in update {
                    self.expr(e);
                }
                self.stmt(body);
                self.dedent();
            }
            StmtKind::Switch { selector, items } => {
                self.writeln("Switch");
                self.indent();
                self.expr(selector);
                for item in items {
                    match item {
                        SwitchItem::Case(value) => {
                            self.writeln("Case");
                            self.indent();
                            self.expr(value);
                            self.dedent();
                        }
                        SwitchItem::Default(_) => self.writeln("Default"),
                        SwitchItem::Stmt(s) => self.stmt(s),
                    }
                }
                self.dedent();
            }
            StmtKind::Break(label) => self.writeln(&format!("Break {}", label.as_deref().unwrap_or(""))),
            StmtKind::Continue(label) => self.writeln(&format!("Continue {}", label.as_deref().unwrap_or(""))),
            StmtKind::Return(value) => {
                self.writeln("Return");
                if let Some(value) = value {
                    self.indent();
                    self.expr(value);
                    self.dedent();
                }
            }
            StmtKind::Throw(value) => {
                self.writeln("Throw");
                self.indent();
                self.expr(value);
                self.dedent();
            }
            StmtKind::Try { body, catches, finally } => {
                self.writeln("Try");
                self.indent();
                self.block(body);
                for catch in catches {
                    self.writeln(&format!("Catch {} {}", catch.ty, catch.name));
                    self.indent();
                    self.block(&catch.body);
                    self.dedent();
                }
                if let Some(finally) = finally {
                    self.writeln("Finally");
                    self.indent();
                    self.block(finally);
                    self.dedent();
                }
                self.dedent();
            }
            StmtKind::Synchronized { lock, body } => {
                self.writeln("Synchronized");
                self.indent();
                self.expr(lock);
                self.block(body);
                self.dedent();
            }
            StmtKind::Labeled { label, body } => self.nested(&format!("Label {}", label), body),
        }
    }

    fn expr(&mut self, expr: &Expr) {
        let head = match &expr.kind {
            ExprKind::Literal(value) => format!("Literal {}", value),
            ExprKind::Name(name) => format!("Name {}", name),
            ExprKind::Select { name, .. } => format!("Select .{}", name),
            ExprKind::Local(var) => format!("Local {}", var),
            ExprKind::This => "This".to_string(),
            ExprKind::TypeName(ty) => format!("Type {}", ty),
            ExprKind::Field { field, .. } => format!("Field {}.{}", field.owner, field.name),
            ExprKind::ArrayLength(_) => "Length".to_string(),
            ExprKind::Index { .. } => "Index".to_string(),
            ExprKind::Call { name, super_call, .. } => {
                format!("Call {}{}", if *super_call { "super." } else { "" }, name)
            }
            ExprKind::New { class, .. } => format!("New {}", class),
            ExprKind::NewArray { elem, .. } => format!("NewArray {}", elem),
            ExprKind::ArrayInit(_) => "ArrayInit".to_string(),
            ExprKind::Unary { op, .. } => format!("Unary {}", op.symbol()),
            ExprKind::IncDec { op, .. } => format!("IncDec {:?}", op),
            ExprKind::Binary { op, .. } => format!("Binary {}", op.symbol()),
            ExprKind::Concat { .. } => "Concat".to_string(),
            ExprKind::Conditional { .. } => "Conditional".to_string(),
            ExprKind::Cast { to, .. } => match to {
                Some(to) => format!("Cast {}", to),
                None => format!("Convert {}", expr.ty),
            },
            ExprKind::InstanceOf { target, .. } => format!("InstanceOf {}", target),
            ExprKind::Assign { compound, .. } => {
                if *compound {
                    "Assign (compound)".to_string()
                } else {
                    "Assign".to_string()
                }
            }
            ExprKind::CompoundAssign { op, .. } => format!("Assign {}=", op.symbol()),
            ExprKind::Current => "Current".to_string(),
        };
        let line = if expr.ty.is_unknown() {
            head
        } else {
            format!("{} : {}", head, expr.ty)
        };
        self.writeln(&line);
        self.indent();
        for child in children(expr) {
            self.expr(child);
        }
        self.dedent();
    }
}

fn children(expr: &Expr) -> Vec<&Expr> {
    match &expr.kind {
        ExprKind::Select { target, .. } | ExprKind::ArrayLength(target) => vec![&**target],
        ExprKind::Field { target, .. } => target.iter().map(|t| &**t).collect(),
        ExprKind::Index { array, index } => vec![&**array, &**index],
        ExprKind::Call { target, args, .. } => target.iter().map(|t| &**t).chain(args.iter()).collect(),
        ExprKind::New { args, .. } => args.iter().collect(),
        ExprKind::NewArray { dims, init, .. } => dims.iter().chain(init.iter().flatten()).collect(),
        ExprKind::ArrayInit(elems) => elems.iter().collect(),
        ExprKind::Unary { operand, .. }
        | ExprKind::IncDec { operand, .. }
        | ExprKind::Cast { operand, .. }
        | ExprKind::InstanceOf { operand, .. } => vec![&**operand],
        ExprKind::Binary { left, right, .. } | ExprKind::Concat { left, right } => vec![&**left, &**right],
        ExprKind::Conditional { cond, then, otherwise } => vec![&**cond, &**then, &**otherwise],
        ExprKind::Assign { target, value, .. } | ExprKind::CompoundAssign { target, value, .. } => {
            vec![&**target, &**value]
        }
        _ => Vec::new(),
    }
}
