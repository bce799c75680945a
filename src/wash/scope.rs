//! Lexical scopes and the variable arena of a unit

use std::collections::BTreeMap;

use crate::ast::{Constant, DataType, Span, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// The receiver of an instance method
    This,
    Param,
    Local,
    /// Exception parameter of a catch clause
    Catch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: DataType,
    pub is_final: bool,
    /// Value of a final local initialized with a constant expression
    pub constant: Option<Constant>,
    pub kind: VarKind,
    pub span: Span,
    /// Number of loops enclosing the declaration
    pub loop_depth: usize,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: DataType, kind: VarKind, span: Span) -> Self {
        Self {
            name: name.into(),
            ty,
            is_final: false,
            constant: None,
            kind,
            span,
            loop_depth: 0,
        }
    }

    pub fn final_var(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub fn at_loop_depth(mut self, depth: usize) -> Self {
        self.loop_depth = depth;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    names: BTreeMap<String, VarId>,
}

/// Scope tree plus the variables declared in it
///
/// Scopes are never freed while a unit is analysed; leaving a scope only
/// moves `current` back to its parent.
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
    current: ScopeId,
    vars: Vec<Variable>,
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                parent: None,
                names: BTreeMap::new(),
            }],
            current: ScopeId(0),
            vars: Vec::new(),
        }
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn enter(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(self.current),
            names: BTreeMap::new(),
        });
        self.current = id;
        id
    }

    pub fn exit(&mut self) {
        if let Some(parent) = self.scopes[self.current.0].parent {
            self.current = parent;
        }
    }

    /// Declare in the current scope; a visible variable of the same name
    /// is returned as the error
    pub fn declare(&mut self, var: Variable) -> Result<VarId, VarId> {
        if let Some(existing) = self.lookup(&var.name) {
            return Err(existing);
        }
        let id = VarId(self.vars.len());
        self.scopes[self.current.0].names.insert(var.name.clone(), id);
        self.vars.push(var);
        Ok(id)
    }

    /// Add a variable without making it visible by name
    pub fn declare_hidden(&mut self, var: Variable) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(var);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            let s = &self.scopes[id.0];
            if let Some(var) = s.names.get(name) {
                return Some(*var);
            }
            scope = s.parent;
        }
        None
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0]
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn into_vars(self) -> Vec<Variable> {
        self.vars
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(name: &str) -> Variable {
        Variable::new(name, DataType::Int, VarKind::Local, Span::default())
    }

    #[test]
    fn lookup_walks_outward() {
        let mut scopes = Scopes::new();
        let outer = scopes.declare(local("a")).unwrap();
        scopes.enter();
        let inner = scopes.declare(local("b")).unwrap();
        assert_eq!(scopes.lookup("a"), Some(outer));
        assert_eq!(scopes.lookup("b"), Some(inner));
        scopes.exit();
        assert_eq!(scopes.lookup("b"), None);
    }

    #[test]
    fn shadowing_an_enclosing_local_is_rejected() {
        let mut scopes = Scopes::new();
        let outer = scopes.declare(local("a")).unwrap();
        scopes.enter();
        assert_eq!(scopes.declare(local("a")), Err(outer));
    }

    #[test]
    fn sibling_scopes_may_reuse_names() {
        let mut scopes = Scopes::new();
        scopes.enter();
        let first = scopes.declare(local("i")).unwrap();
        scopes.exit();
        scopes.enter();
        let second = scopes.declare(local("i")).unwrap();
        assert_ne!(first, second);
        assert_eq!(scopes.len(), 2);
    }
}
