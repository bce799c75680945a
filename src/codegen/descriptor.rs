//! Method references of the string accumulator used by concatenation

use once_cell::sync::Lazy;

use crate::ast::{DataType, MethodRef};
use crate::common::consts::{CONSTRUCTOR_NAME, JAVA_LANG_STRING, JAVA_LANG_STRING_BUILDER};

fn builder_method(name: &str, params: Vec<DataType>, ret: DataType) -> MethodRef {
    MethodRef {
        owner: JAVA_LANG_STRING_BUILDER.to_string(),
        name: name.to_string(),
        params,
        ret,
        is_static: false,
        is_private: false,
        owner_is_interface: false,
    }
}

fn builder() -> DataType {
    DataType::class(JAVA_LANG_STRING_BUILDER)
}

pub static BUILDER_INIT: Lazy<MethodRef> = Lazy::new(|| builder_method(CONSTRUCTOR_NAME, Vec::new(), DataType::Void));

pub static BUILDER_INIT_STRING: Lazy<MethodRef> =
    Lazy::new(|| builder_method(CONSTRUCTOR_NAME, vec![DataType::string()], DataType::Void));

pub static BUILDER_TO_STRING: Lazy<MethodRef> = Lazy::new(|| builder_method("toString", Vec::new(), DataType::string()));

/// `String.valueOf(Object)`, which turns `null` into `"null"`
pub static STRING_VALUE_OF: Lazy<MethodRef> = Lazy::new(|| MethodRef {
    owner: JAVA_LANG_STRING.to_string(),
    name: "valueOf".to_string(),
    params: vec![DataType::object()],
    ret: DataType::string(),
    is_static: true,
    is_private: false,
    owner_is_interface: false,
});

static APPENDS: Lazy<Vec<MethodRef>> = Lazy::new(|| {
    [
        DataType::string(),
        DataType::Boolean,
        DataType::Char,
        DataType::Int,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::object(),
    ]
    .into_iter()
    .map(|param| builder_method("append", vec![param], builder()))
    .collect()
});

/// `append` overload taking a value of static type `ty`
///
/// byte and short widen to int; references other than `String`, including
/// `null` and arrays, go through the `Object` overload.
pub fn append_for(ty: &DataType) -> &'static MethodRef {
    let index = match ty {
        DataType::Class(_) if ty.is_string() => 0,
        DataType::Boolean => 1,
        DataType::Char => 2,
        DataType::Byte | DataType::Short | DataType::Int => 3,
        DataType::Long => 4,
        DataType::Float => 5,
        DataType::Double => 6,
        _ => 7,
    };
    &APPENDS[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_are_chosen_by_static_type() {
        assert_eq!(append_for(&DataType::string()).descriptor(), "(Ljava/lang/String;)Ljava/lang/StringBuilder;");
        assert_eq!(append_for(&DataType::Short).descriptor(), "(I)Ljava/lang/StringBuilder;");
        assert_eq!(append_for(&DataType::Char).descriptor(), "(C)Ljava/lang/StringBuilder;");
        assert_eq!(append_for(&DataType::Null).params, vec![DataType::object()]);
        assert_eq!(append_for(&DataType::Int.array_of()).params, vec![DataType::object()]);
    }

    #[test]
    fn constructors_and_conversion() {
        assert_eq!(BUILDER_INIT.to_string(), "java/lang/StringBuilder.<init>:()V");
        assert_eq!(BUILDER_INIT_STRING.descriptor(), "(Ljava/lang/String;)V");
        assert_eq!(BUILDER_TO_STRING.ret, DataType::string());
    }
}
