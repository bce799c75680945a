//! Type environment consulted by analysis and code generation
//!
//! [`TypeEnv`] is the seam between the compiler and whatever knows about
//! classes. Implementors supply class lookup, the method being compiled and
//! the debug flag; subtyping, conversion rules and overload resolution are
//! provided on top of those.

use std::collections::{HashSet, VecDeque};

use crate::ast::{DataType, FieldRef, MethodRef};
use crate::common::class_manager::{package_of, Access, ClassInfo, ClassManager, FieldInfo};
use crate::common::consts::*;

/// A declared parameter of the method being compiled
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: DataType,
    pub is_final: bool,
}

/// Signature of the method a script is the body of
#[derive(Debug, Clone, PartialEq)]
pub struct MethodContext {
    pub class: String,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: DataType,
    pub is_static: bool,
    pub exceptions: Vec<DataType>,
}

impl MethodContext {
    /// Instance method returning `void` with no parameters
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            params: Vec::new(),
            ret: DataType::Void,
            is_static: false,
            exceptions: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: DataType) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
            is_final: false,
        });
        self
    }

    /// A parameter the body may not assign
    pub fn final_param(mut self, name: impl Into<String>, ty: DataType) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
            is_final: true,
        });
        self
    }

    pub fn returns(mut self, ret: DataType) -> Self {
        self.ret = ret;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn throws(mut self, exception: DataType) -> Self {
        self.exceptions.push(exception);
        self
    }
}

/// Why a member lookup failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    NotFound,
    Ambiguous,
    /// Only inaccessible candidates exist; carries a printable member name
    Inaccessible(String),
}

/// Result of overload resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMethod {
    pub method: MethodRef,
    pub exceptions: Vec<DataType>,
}

pub trait TypeEnv {
    /// Class by fully qualified name
    fn class_info(&self, name: &str) -> Option<&ClassInfo>;

    /// The method whose body is being compiled
    fn method(&self) -> &MethodContext;

    /// Line-accurate mode: code generation keeps folded expressions and dead branches
    fn is_debug(&self) -> bool;

    fn is_accessible(&self, owner: &ClassInfo, access: Access) -> bool {
        let current = &self.method().class;
        match access {
            Access::Public => true,
            Access::Private => &owner.name == current,
            Access::Package => package_of(&owner.name) == package_of(current),
            Access::Protected => {
                package_of(&owner.name) == package_of(current) || self.is_subclass(current, &owner.name)
            }
        }
    }

    /// `name` followed by all its supertypes, nearest first
    fn supertypes(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([name.to_string()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(info) = self.class_info(&next) {
                queue.extend(info.superclass.iter().cloned());
                queue.extend(info.interfaces.iter().cloned());
            }
            order.push(next);
        }
        order
    }

    fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        sub == sup || sup == JAVA_LANG_OBJECT || self.supertypes(sub).iter().any(|s| s == sup)
    }

    fn is_interface(&self, name: &str) -> bool {
        self.class_info(name).map_or(false, |c| c.is_interface)
    }

    /// Assignment conversion without the constant narrowing rule
    fn is_assignable(&self, from: &DataType, to: &DataType) -> bool {
        use DataType::*;
        if from == to || from.is_unknown() || to.is_unknown() {
            return true;
        }
        match (from, to) {
            (Byte, Short | Int | Long | Float | Double) => true,
            (Short | Char, Int | Long | Float | Double) => true,
            (Int, Long | Float | Double) => true,
            (Long, Float | Double) => true,
            (Float, Double) => true,
            (Null, Class(_) | Array(_)) => true,
            (Array(_), Class(name)) => {
                name == JAVA_LANG_OBJECT || name == JAVA_LANG_CLONEABLE || name == JAVA_IO_SERIALIZABLE
            }
            (Array(fe), Array(te)) => {
                if fe.is_primitive() || te.is_primitive() {
                    fe == te
                } else {
                    self.is_assignable(fe, te)
                }
            }
            (Class(f), Class(t)) => self.is_subclass(f, t),
            _ => false,
        }
    }

    fn is_castable(&self, from: &DataType, to: &DataType) -> bool {
        use DataType::*;
        if from == to || from.is_unknown() || to.is_unknown() {
            return true;
        }
        if from.is_numeric() && to.is_numeric() {
            return true;
        }
        if from.is_primitive() || to.is_primitive() || from.is_void() || to.is_void() {
            return false;
        }
        if self.is_assignable(from, to) || self.is_assignable(to, from) {
            return true;
        }
        match (from, to) {
            (Array(fe), Array(te)) => !fe.is_primitive() && !te.is_primitive() && self.is_castable(fe, te),
            (Class(f), Class(t)) => {
                // interface casts succeed unless a final class rules them out
                let final_class = |n: &str| self.class_info(n).map_or(false, |c| c.is_final && !c.is_interface);
                (self.is_interface(f) && !final_class(t)) || (self.is_interface(t) && !final_class(f))
            }
            _ => false,
        }
    }

    /// Checked exceptions: throwables other than `RuntimeException` and `Error` subtypes
    fn is_checked(&self, ty: &DataType) -> bool {
        match ty {
            DataType::Class(name) => {
                self.is_subclass(name, JAVA_LANG_THROWABLE)
                    && !self.is_subclass(name, JAVA_LANG_RUNTIME_EXCEPTION)
                    && !self.is_subclass(name, JAVA_LANG_ERROR)
            }
            _ => false,
        }
    }

    fn is_throwable(&self, ty: &DataType) -> bool {
        match ty {
            DataType::Class(name) => self.is_subclass(name, JAVA_LANG_THROWABLE),
            DataType::Unknown | DataType::Null => true,
            _ => false,
        }
    }

    /// Field `name` declared by `class` or inherited from a supertype
    fn find_field(&self, class: &str, name: &str) -> Option<(&ClassInfo, &FieldInfo)> {
        self.supertypes(class).iter().find_map(|owner| {
            let info = self.class_info(owner)?;
            info.fields.iter().find(|f| f.name == name).map(|f| (info, f))
        })
    }

    fn field_ref(&self, owner: &ClassInfo, field: &FieldInfo) -> FieldRef {
        FieldRef {
            owner: owner.name.clone(),
            name: field.name.clone(),
            ty: field.ty.clone(),
            is_static: field.is_static,
            is_final: field.is_final,
        }
    }

    /// Most specific accessible method `name` applicable to `args`
    fn find_method(&self, class: &DataType, name: &str, args: &[DataType]) -> Result<ResolvedMethod, LookupError> {
        let start = match class {
            DataType::Class(name) => name.clone(),
            DataType::Array(_) => JAVA_LANG_OBJECT.to_string(),
            _ => return Err(LookupError::NotFound),
        };
        let mut owners = self.supertypes(&start);
        if self.is_interface(&start) {
            owners.push(JAVA_LANG_OBJECT.to_string());
        }
        select_most_specific(self, &owners, name, args, true)
    }

    /// Constructor of exactly `class` applicable to `args`
    fn find_constructor(&self, class: &str, args: &[DataType]) -> Result<ResolvedMethod, LookupError> {
        select_most_specific(self, &[class.to_string()], CONSTRUCTOR_NAME, args, false)
    }
}

fn select_most_specific<E: TypeEnv + ?Sized>(
    env: &E,
    owners: &[String],
    name: &str,
    args: &[DataType],
    inherited: bool,
) -> Result<ResolvedMethod, LookupError> {
    let mut seen: Vec<Vec<DataType>> = Vec::new();
    let mut applicable: Vec<ResolvedMethod> = Vec::new();
    let mut hidden = None;

    for owner in owners {
        let Some(info) = env.class_info(owner) else { continue };
        for method in info.methods.iter().filter(|m| m.name == name && m.params.len() == args.len()) {
            // overridden in a subtype already seen
            if inherited && seen.contains(&method.params) {
                continue;
            }
            seen.push(method.params.clone());
            let fits = args.iter().zip(&method.params).all(|(a, p)| env.is_assignable(a, p));
            if !fits {
                continue;
            }
            if !env.is_accessible(info, method.access) {
                hidden = Some(format!("{}.{}", info.name, name));
                continue;
            }
            applicable.push(ResolvedMethod {
                method: MethodRef {
                    owner: info.name.clone(),
                    name: method.name.clone(),
                    params: method.params.clone(),
                    ret: method.ret.clone(),
                    is_static: method.is_static,
                    is_private: method.access == Access::Private,
                    owner_is_interface: info.is_interface,
                },
                exceptions: method.exceptions.clone(),
            });
        }
    }

    if let Some(exact) = applicable.iter().position(|m| m.method.params.as_slice() == args) {
        return Ok(applicable.swap_remove(exact));
    }

    let more_specific = |a: &ResolvedMethod, b: &ResolvedMethod| {
        a.method
            .params
            .iter()
            .zip(&b.method.params)
            .all(|(pa, pb)| env.is_assignable(pa, pb))
    };
    let maximal: Vec<usize> = (0..applicable.len())
        .filter(|&i| {
            (0..applicable.len()).all(|j| i == j || more_specific(&applicable[i], &applicable[j]))
        })
        .collect();

    match maximal.as_slice() {
        [one] => Ok(applicable.swap_remove(*one)),
        [] if applicable.is_empty() => Err(hidden.map_or(LookupError::NotFound, LookupError::Inaccessible)),
        _ => Err(LookupError::Ambiguous),
    }
}

/// Environment backed by a [`ClassManager`]
#[derive(Debug, Clone)]
pub struct ScriptEnv {
    pub classes: ClassManager,
    pub method: MethodContext,
    pub debug: bool,
}

impl ScriptEnv {
    pub fn new(classes: ClassManager, method: MethodContext) -> Self {
        Self {
            classes,
            method,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl TypeEnv for ScriptEnv {
    fn class_info(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    fn method(&self) -> &MethodContext {
        &self.method
    }

    fn is_debug(&self) -> bool {
        self.debug
    }
}
