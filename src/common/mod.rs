//! Common utilities and definitions shared across modules
//!
//! Configuration, error and diagnostic types, well-known names, and the type
//! environment the compiler resolves classes against.

pub mod class_manager;
pub mod config;
pub mod consts;
pub mod diag;
pub mod env;
pub mod error;

pub use class_manager::{Access, ClassInfo, ClassManager, FieldInfo, MethodInfo};
pub use config::Config;
pub use diag::{Diagnostic, ErrorList, SemanticError, Severity};
pub use env::{LookupError, MethodContext, Param, ResolvedMethod, ScriptEnv, TypeEnv};
pub use error::{Error, Result};
