//! Class descriptions the compiler resolves names against
//!
//! A [`ClassManager`] is an in-memory table of [`ClassInfo`] keyed by fully
//! qualified name. [`ClassManager::with_runtime`] seeds it with the part of
//! `java.lang` (and a few `java.io` exceptions) scripts commonly touch.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::{Constant, DataType};
use crate::common::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Access {
    Public,
    Protected,
    Package,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: DataType,
    pub access: Access,
    pub is_static: bool,
    pub is_final: bool,
    pub constant: Option<Constant>,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            ty,
            access: Access::Public,
            is_static: false,
            is_final: false,
            constant: None,
        }
    }

    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn final_field(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// `static final` field with a compile-time value
    pub fn constant(mut self, value: Constant) -> Self {
        self.is_static = true;
        self.is_final = true;
        self.constant = Some(value);
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<DataType>,
    pub ret: DataType,
    pub access: Access,
    pub is_static: bool,
    pub is_abstract: bool,
    pub exceptions: Vec<DataType>,
}

impl MethodInfo {
    pub fn new(name: impl Into<String>, params: Vec<DataType>, ret: DataType) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            access: Access::Public,
            is_static: false,
            is_abstract: false,
            exceptions: Vec::new(),
        }
    }

    pub fn constructor(params: Vec<DataType>) -> Self {
        Self::new(CONSTRUCTOR_NAME, params, DataType::Void)
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn abstract_method(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn throws(mut self, exception: DataType) -> Self {
        self.exceptions.push(exception);
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub access: Access,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
}

impl ClassInfo {
    /// Public concrete class extending `java.lang.Object`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let superclass = (name != JAVA_LANG_OBJECT).then(|| JAVA_LANG_OBJECT.to_string());
        Self {
            name,
            superclass,
            interfaces: Vec::new(),
            access: Access::Public,
            is_interface: false,
            is_abstract: false,
            is_final: false,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        let mut info = Self::new(name);
        info.superclass = None;
        info.is_interface = true;
        info.is_abstract = true;
        info
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    /// Package part of the qualified name, empty for the default package
    pub fn package(&self) -> &str {
        package_of(&self.name)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn data_type(&self) -> DataType {
        DataType::Class(self.name.clone())
    }
}

pub fn package_of(name: &str) -> &str {
    name.rfind('.').map(|i| &name[..i]).unwrap_or("")
}

/// Table of known classes
#[derive(Debug, Clone, Default)]
pub struct ClassManager {
    classes: HashMap<String, ClassInfo>,
}

impl ClassManager {
    /// Empty table; even `java.lang.Object` is unknown
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with the runtime library classes
    pub fn with_runtime() -> Self {
        let mut manager = Self::new();
        for class in RUNTIME_CLASSES.iter() {
            manager.add(class.clone());
        }
        manager
    }

    /// Register a class, replacing any earlier definition of the same name
    pub fn add(&mut self, class: ClassInfo) {
        log::trace!("class table: registering {}", class.name);
        self.classes.insert(class.name.clone(), class);
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

fn string() -> DataType {
    DataType::string()
}

fn object() -> DataType {
    DataType::object()
}

fn exception_class(name: &str, superclass: &str) -> ClassInfo {
    ClassInfo::new(name)
        .extends(superclass)
        .with_method(MethodInfo::constructor(vec![]))
        .with_method(MethodInfo::constructor(vec![string()]))
}

static RUNTIME_CLASSES: Lazy<Vec<ClassInfo>> = Lazy::new(|| {
    let builder = DataType::class(JAVA_LANG_STRING_BUILDER);
    let mut classes = vec![
        ClassInfo::new(JAVA_LANG_OBJECT)
            .with_method(MethodInfo::constructor(vec![]))
            .with_method(MethodInfo::new("toString", vec![], string()))
            .with_method(MethodInfo::new("hashCode", vec![], DataType::Int))
            .with_method(MethodInfo::new("equals", vec![object()], DataType::Boolean)),
        ClassInfo::interface(JAVA_LANG_CLONEABLE),
        ClassInfo::interface(JAVA_IO_SERIALIZABLE),
        ClassInfo::interface("java.lang.CharSequence")
            .with_method(MethodInfo::new("length", vec![], DataType::Int).abstract_method())
            .with_method(MethodInfo::new("charAt", vec![DataType::Int], DataType::Char).abstract_method()),
        ClassInfo::interface("java.lang.Comparable")
            .with_method(MethodInfo::new("compareTo", vec![object()], DataType::Int).abstract_method()),
        ClassInfo::interface("java.lang.Runnable")
            .with_method(MethodInfo::new("run", vec![], DataType::Void).abstract_method()),
        ClassInfo::new(JAVA_LANG_STRING)
            .final_class()
            .implements("java.lang.CharSequence")
            .implements("java.lang.Comparable")
            .implements(JAVA_IO_SERIALIZABLE)
            .with_method(MethodInfo::constructor(vec![]))
            .with_method(MethodInfo::constructor(vec![string()]))
            .with_method(MethodInfo::new("length", vec![], DataType::Int))
            .with_method(MethodInfo::new("charAt", vec![DataType::Int], DataType::Char))
            .with_method(MethodInfo::new("isEmpty", vec![], DataType::Boolean))
            .with_method(MethodInfo::new("concat", vec![string()], string()))
            .with_method(MethodInfo::new("indexOf", vec![string()], DataType::Int))
            .with_method(MethodInfo::new("substring", vec![DataType::Int], string()))
            .with_method(MethodInfo::new("substring", vec![DataType::Int, DataType::Int], string()))
            .with_method(MethodInfo::new("equals", vec![object()], DataType::Boolean))
            .with_method(MethodInfo::new("compareTo", vec![string()], DataType::Int))
            .with_method(MethodInfo::new("valueOf", vec![object()], string()).static_method())
            .with_method(MethodInfo::new("valueOf", vec![DataType::Boolean], string()).static_method())
            .with_method(MethodInfo::new("valueOf", vec![DataType::Char], string()).static_method())
            .with_method(MethodInfo::new("valueOf", vec![DataType::Int], string()).static_method())
            .with_method(MethodInfo::new("valueOf", vec![DataType::Long], string()).static_method())
            .with_method(MethodInfo::new("valueOf", vec![DataType::Float], string()).static_method())
            .with_method(MethodInfo::new("valueOf", vec![DataType::Double], string()).static_method()),
        ClassInfo::new(JAVA_LANG_STRING_BUILDER)
            .final_class()
            .implements("java.lang.CharSequence")
            .with_method(MethodInfo::constructor(vec![]))
            .with_method(MethodInfo::constructor(vec![string()]))
            .with_method(MethodInfo::new("append", vec![string()], builder.clone()))
            .with_method(MethodInfo::new("append", vec![object()], builder.clone()))
            .with_method(MethodInfo::new("append", vec![DataType::Boolean], builder.clone()))
            .with_method(MethodInfo::new("append", vec![DataType::Char], builder.clone()))
            .with_method(MethodInfo::new("append", vec![DataType::Int], builder.clone()))
            .with_method(MethodInfo::new("append", vec![DataType::Long], builder.clone()))
            .with_method(MethodInfo::new("append", vec![DataType::Float], builder.clone()))
            .with_method(MethodInfo::new("append", vec![DataType::Double], builder.clone()))
            .with_method(MethodInfo::new("length", vec![], DataType::Int))
            .with_method(MethodInfo::new("charAt", vec![DataType::Int], DataType::Char))
            .with_method(MethodInfo::new("toString", vec![], string())),
        ClassInfo::new("java.lang.Integer")
            .final_class()
            .with_field(FieldInfo::new("MAX_VALUE", DataType::Int).constant(Constant::Int(i32::MAX)))
            .with_field(FieldInfo::new("MIN_VALUE", DataType::Int).constant(Constant::Int(i32::MIN)))
            .with_method(MethodInfo::new("parseInt", vec![string()], DataType::Int).static_method())
            .with_method(MethodInfo::new("toString", vec![DataType::Int], string()).static_method())
            .with_method(MethodInfo::new("valueOf", vec![DataType::Int], DataType::class("java.lang.Integer")).static_method())
            .with_method(MethodInfo::new("intValue", vec![], DataType::Int)),
        ClassInfo::new("java.lang.Long")
            .final_class()
            .with_field(FieldInfo::new("MAX_VALUE", DataType::Long).constant(Constant::Long(i64::MAX)))
            .with_field(FieldInfo::new("MIN_VALUE", DataType::Long).constant(Constant::Long(i64::MIN))),
        ClassInfo::new("java.lang.Math")
            .final_class()
            .with_field(FieldInfo::new("PI", DataType::Double).constant(Constant::Double(std::f64::consts::PI)))
            .with_method(MethodInfo::new("abs", vec![DataType::Int], DataType::Int).static_method())
            .with_method(MethodInfo::new("abs", vec![DataType::Long], DataType::Long).static_method())
            .with_method(MethodInfo::new("abs", vec![DataType::Double], DataType::Double).static_method())
            .with_method(MethodInfo::new("max", vec![DataType::Int, DataType::Int], DataType::Int).static_method())
            .with_method(MethodInfo::new("max", vec![DataType::Long, DataType::Long], DataType::Long).static_method())
            .with_method(MethodInfo::new("max", vec![DataType::Double, DataType::Double], DataType::Double).static_method())
            .with_method(MethodInfo::new("min", vec![DataType::Int, DataType::Int], DataType::Int).static_method())
            .with_method(MethodInfo::new("sqrt", vec![DataType::Double], DataType::Double).static_method()),
        ClassInfo::new("java.io.PrintStream")
            .with_method(MethodInfo::new("println", vec![], DataType::Void))
            .with_method(MethodInfo::new("println", vec![string()], DataType::Void))
            .with_method(MethodInfo::new("println", vec![object()], DataType::Void))
            .with_method(MethodInfo::new("println", vec![DataType::Boolean], DataType::Void))
            .with_method(MethodInfo::new("println", vec![DataType::Char], DataType::Void))
            .with_method(MethodInfo::new("println", vec![DataType::Int], DataType::Void))
            .with_method(MethodInfo::new("println", vec![DataType::Long], DataType::Void))
            .with_method(MethodInfo::new("println", vec![DataType::Double], DataType::Void))
            .with_method(MethodInfo::new("print", vec![string()], DataType::Void)),
        ClassInfo::new("java.lang.System")
            .final_class()
            .with_field(FieldInfo::new("out", DataType::class("java.io.PrintStream")).static_field().final_field())
            .with_field(FieldInfo::new("err", DataType::class("java.io.PrintStream")).static_field().final_field())
            .with_method(MethodInfo::new("currentTimeMillis", vec![], DataType::Long).static_method()),
        ClassInfo::new(JAVA_LANG_THROWABLE)
            .implements(JAVA_IO_SERIALIZABLE)
            .with_method(MethodInfo::constructor(vec![]))
            .with_method(MethodInfo::constructor(vec![string()]))
            .with_method(MethodInfo::new("getMessage", vec![], string())),
        exception_class(JAVA_LANG_EXCEPTION, JAVA_LANG_THROWABLE),
        exception_class(JAVA_LANG_ERROR, JAVA_LANG_THROWABLE),
        exception_class(JAVA_LANG_RUNTIME_EXCEPTION, JAVA_LANG_EXCEPTION),
        exception_class("java.lang.InterruptedException", JAVA_LANG_EXCEPTION),
        exception_class("java.lang.CloneNotSupportedException", JAVA_LANG_EXCEPTION),
        exception_class("java.io.IOException", JAVA_LANG_EXCEPTION),
        exception_class("java.io.FileNotFoundException", "java.io.IOException"),
        exception_class("java.lang.AssertionError", JAVA_LANG_ERROR),
    ];
    for unchecked in [
        "java.lang.ArithmeticException",
        "java.lang.ClassCastException",
        "java.lang.IllegalArgumentException",
        "java.lang.IllegalStateException",
        "java.lang.IndexOutOfBoundsException",
        "java.lang.NullPointerException",
        "java.lang.UnsupportedOperationException",
    ] {
        classes.push(exception_class(unchecked, JAVA_LANG_RUNTIME_EXCEPTION));
    }
    classes.push(exception_class(
        "java.lang.ArrayIndexOutOfBoundsException",
        "java.lang.IndexOutOfBoundsException",
    ));
    classes
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_table_has_core_classes() {
        let classes = ClassManager::with_runtime();
        assert!(classes.contains(JAVA_LANG_OBJECT));
        assert!(classes.contains(JAVA_LANG_STRING_BUILDER));
        let io = classes.get("java.io.IOException").unwrap();
        assert_eq!(io.superclass.as_deref(), Some(JAVA_LANG_EXCEPTION));
        assert_eq!(io.package(), "java.io");
        assert_eq!(io.simple_name(), "IOException");
    }

    #[test]
    fn object_has_no_superclass() {
        let object = ClassInfo::new(JAVA_LANG_OBJECT);
        assert!(object.superclass.is_none());
        assert!(ClassInfo::interface("p.I").superclass.is_none());
    }
}
