//! Enter: imports, the method's own variables and type names

use crate::ast::*;
use crate::common::class_manager::package_of;
use crate::common::consts::JAVA_LANG_PACKAGE;
use crate::common::diag::SemanticError;
use crate::common::error::Result;

use super::scope::{VarKind, Variable};
use super::Analyzer;

impl<'a> Analyzer<'a> {
    pub(crate) fn import(&mut self, import: &Import) -> Result<()> {
        if let Some(package) = import.name.strip_suffix(".*") {
            // packages are not enumerable through the environment
            if !self.on_demand.iter().any(|p| p == package) {
                self.on_demand.push(package.to_string());
            }
            return Ok(());
        }
        let env = self.env;
        match env.class_info(&import.name) {
            Some(class) => {
                let simple = match &import.alias {
                    Some(alias) => alias.clone(),
                    None => class.simple_name().to_string(),
                };
                log::trace!("import {} as {}", class.name, simple);
                self.imports.insert(simple, class.name.clone());
                self.depend(&import.name);
            }
            None => self.error(SemanticError::UnknownImport(import.name.clone()), import.span)?,
        }
        Ok(())
    }

    /// Declare `this` and the parameters; returns their ids
    pub(crate) fn enter_method(&mut self, span: Span) -> Result<(Option<VarId>, Vec<VarId>)> {
        let env = self.env;
        let method = env.method();
        let this_var = (!method.is_static).then(|| {
            self.scopes.declare_hidden(Variable::new(
                "this",
                DataType::Class(method.class.clone()),
                VarKind::This,
                span,
            ))
        });
        let mut params = Vec::with_capacity(method.params.len());
        for param in &method.params {
            let var = Variable::new(param.name.clone(), param.ty.clone(), VarKind::Param, span)
                .final_var(param.is_final);
            match self.scopes.declare(var) {
                Ok(id) => params.push(id),
                Err(_) => self.error(SemanticError::DuplicateVariable(param.name.clone()), span)?,
            }
        }
        Ok((this_var, params))
    }

    /// Fully qualified name of the class `name` denotes, if any
    pub(crate) fn lookup_class(&self, name: &str) -> Option<String> {
        let env = self.env;
        if name.contains('.') {
            return env.class_info(name).map(|c| c.name.clone());
        }
        if let Some(full) = self.imports.get(name) {
            return Some(full.clone());
        }
        let current = package_of(&env.method().class);
        let own = if current.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", current, name)
        };
        std::iter::once(own)
            .chain(self.on_demand.iter().map(|p| format!("{}.{}", p, name)))
            .chain(std::iter::once(format!("{}.{}", JAVA_LANG_PACKAGE, name)))
            .find(|candidate| env.class_info(candidate).is_some())
    }

    /// Resolve a written type; unknown names are reported and become `unknown`
    pub(crate) fn resolve_type(&mut self, ty: &TypeRef) -> Result<DataType> {
        let base = match DataType::from_primitive_name(&ty.name) {
            Some(primitive) => primitive,
            None => match self.lookup_class(&ty.name) {
                Some(full) => {
                    self.depend(&full);
                    DataType::Class(full)
                }
                None => {
                    self.error(SemanticError::UnknownType(ty.name.clone()), ty.span)?;
                    return Ok(DataType::Unknown);
                }
            },
        };
        Ok(base.with_dims(ty.dims))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::DataType;
    use crate::common::{ClassInfo, ClassManager, ErrorList, MethodContext, ScriptEnv};
    use crate::parser::parse_script;
    use crate::wash::precompile;

    fn codes(source: &str) -> Vec<&'static str> {
        let mut classes = ClassManager::with_runtime();
        classes.add(ClassInfo::new("demo.Helper"));
        classes.add(ClassInfo::new("util.Tool"));
        let env = ScriptEnv::new(classes, MethodContext::new("demo.Script", "run"));
        let mut errors = ErrorList::default();
        let script = parse_script(source).unwrap();
        precompile(&env, &script, &mut errors).unwrap();
        errors.errors().map(|d| d.error.code()).collect()
    }

    #[test]
    fn same_package_and_java_lang_resolve() {
        assert!(codes("Helper h = null; String s = null; Object o = h;").is_empty());
    }

    #[test]
    fn imports_bring_simple_names() {
        assert_eq!(codes("Tool t = null;"), vec!["TYPE_UNKNOWN"]);
        assert!(codes("import util.Tool; Tool t = null;").is_empty());
        assert!(codes("import util.*; Tool t = null;").is_empty());
        assert!(codes("util.Tool t = null;").is_empty());
    }

    #[test]
    fn aliased_import_binds_the_alias() {
        assert!(codes("import util.Tool as Wrench; Wrench w = null;").is_empty());
        assert!(codes("import util.Tool as Wrench; util.Tool t = null; Wrench w = t;").is_empty());
        assert_eq!(codes("import util.Tool as Wrench; Tool t = null;"), vec!["TYPE_UNKNOWN"]);
    }

    #[test]
    fn final_parameter_cannot_be_assigned() {
        let env = ScriptEnv::new(
            ClassManager::with_runtime(),
            MethodContext::new("demo.Script", "run")
                .final_param("limit", DataType::Int)
                .param("n", DataType::Int),
        );
        let mut errors = ErrorList::default();
        let script = parse_script("n = limit + 1; limit = n;").unwrap();
        precompile(&env, &script, &mut errors).unwrap();
        let codes: Vec<_> = errors.errors().map(|d| d.error.code()).collect();
        assert_eq!(codes, vec!["FINAL_REASSIGN"]);
    }

    #[test]
    fn unknown_single_import_is_reported() {
        assert_eq!(codes("import util.Missing;"), vec!["IMPORT_UNKNOWN"]);
    }

    #[test]
    fn duplicate_parameter_names() {
        let env = ScriptEnv::new(
            ClassManager::with_runtime(),
            MethodContext::new("demo.Script", "run")
                .param("a", DataType::Int)
                .param("a", DataType::Long),
        );
        let mut errors = ErrorList::default();
        precompile(&env, &parse_script("").unwrap(), &mut errors).unwrap();
        assert_eq!(errors.errors().next().unwrap().error.code(), "VAR_DUPLICATE");
    }
}
