// Diagnostics a unit may log before it is abandoned
pub const DEFAULT_MAX_ERRORS: usize = 100;

pub const JAVA_LANG_OBJECT: &str = "java.lang.Object";
pub const JAVA_LANG_STRING: &str = "java.lang.String";
pub const JAVA_LANG_STRING_BUILDER: &str = "java.lang.StringBuilder";
pub const JAVA_LANG_THROWABLE: &str = "java.lang.Throwable";
pub const JAVA_LANG_EXCEPTION: &str = "java.lang.Exception";
pub const JAVA_LANG_RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";
pub const JAVA_LANG_ERROR: &str = "java.lang.Error";
pub const JAVA_LANG_CLONEABLE: &str = "java.lang.Cloneable";
pub const JAVA_IO_SERIALIZABLE: &str = "java.io.Serializable";

/// Package searched for simple type names after the imports
pub const JAVA_LANG_PACKAGE: &str = "java.lang";

pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Extension of script files picked up by directory walks
pub const SCRIPT_EXTENSION: &str = "jsc";
