//! Checked exceptions raised inside the construct being analysed
//!
//! The map goes from exception type to every span that may raise it, so an
//! uncaught type can be reported at each throwing site.

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::{DataType, Span};
use crate::common::consts::{JAVA_LANG_EXCEPTION, JAVA_LANG_THROWABLE};
use crate::common::TypeEnv;

pub type Thrown = BTreeMap<DataType, BTreeSet<Span>>;

pub fn record(thrown: &mut Thrown, ty: DataType, span: Span) {
    thrown.entry(ty).or_default().insert(span);
}

pub fn absorb(into: &mut Thrown, from: Thrown) {
    for (ty, spans) in from {
        into.entry(ty).or_default().extend(spans);
    }
}

/// Catch clauses of these types are legal whatever the body throws
pub fn always_catchable(env: &dyn TypeEnv, caught: &DataType) -> bool {
    match caught {
        DataType::Class(name) => name == JAVA_LANG_THROWABLE || name == JAVA_LANG_EXCEPTION || !env.is_checked(caught),
        _ => true,
    }
}

/// Whether the body may throw something a handler for `caught` receives
pub fn may_reach(env: &dyn TypeEnv, thrown: &Thrown, caught: &DataType) -> bool {
    let Some(caught_name) = caught.class_name() else { return true };
    thrown.keys().filter_map(DataType::class_name).any(|name| {
        env.is_subclass(name, caught_name) || env.is_subclass(caught_name, name)
    })
}

/// Remove every type `caught` handles
pub fn catch(env: &dyn TypeEnv, thrown: &mut Thrown, caught: &DataType) {
    let Some(caught_name) = caught.class_name() else { return };
    thrown.retain(|ty, _| match ty.class_name() {
        Some(name) => !env.is_subclass(name, caught_name),
        None => true,
    });
}

/// Entries not covered by any of `declared`
pub fn uncovered<'t>(env: &dyn TypeEnv, thrown: &'t Thrown, declared: &[DataType]) -> Vec<(&'t DataType, &'t BTreeSet<Span>)> {
    thrown
        .iter()
        .filter(|(ty, _)| {
            let Some(name) = ty.class_name() else { return false };
            !declared
                .iter()
                .filter_map(DataType::class_name)
                .any(|d| env.is_subclass(name, d))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ClassManager, MethodContext, ScriptEnv};

    fn env() -> ScriptEnv {
        ScriptEnv::new(ClassManager::with_runtime(), MethodContext::new("demo.Script", "run"))
    }

    fn io() -> DataType {
        DataType::class("java.io.IOException")
    }

    fn not_found() -> DataType {
        DataType::class("java.io.FileNotFoundException")
    }

    #[test]
    fn catch_removes_subtypes() {
        let env = env();
        let mut thrown = Thrown::new();
        record(&mut thrown, not_found(), Span::default());
        record(&mut thrown, DataType::class("java.lang.InterruptedException"), Span::default());
        catch(&env, &mut thrown, &io());
        assert_eq!(thrown.len(), 1);
        assert!(thrown.contains_key(&DataType::class("java.lang.InterruptedException")));
    }

    #[test]
    fn handler_for_a_subtype_of_a_thrown_type_is_reachable() {
        let env = env();
        let mut thrown = Thrown::new();
        record(&mut thrown, io(), Span::default());
        assert!(may_reach(&env, &thrown, &not_found()));
        assert!(!may_reach(&env, &thrown, &DataType::class("java.lang.InterruptedException")));
    }

    #[test]
    fn broad_and_unchecked_handlers_are_always_legal() {
        let env = env();
        assert!(always_catchable(&env, &DataType::class(JAVA_LANG_EXCEPTION)));
        assert!(always_catchable(&env, &DataType::class("java.lang.IllegalStateException")));
        assert!(!always_catchable(&env, &io()));
    }

    #[test]
    fn declared_supertypes_cover_thrown_types() {
        let env = env();
        let mut thrown = Thrown::new();
        record(&mut thrown, not_found(), Span::default());
        assert!(uncovered(&env, &thrown, &[io()]).is_empty());
        assert_eq!(uncovered(&env, &thrown, &[]).len(), 1);
    }
}
