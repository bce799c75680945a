//! Resolved types and compile-time constant values

use std::fmt;

use crate::common::consts::{JAVA_LANG_OBJECT, JAVA_LANG_STRING};

/// A resolved type
///
/// Class types carry their fully qualified, dot-separated name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    /// Type of the `null` literal
    Null,
    /// Result of an expression that failed analysis; compatible with everything
    Unknown,
    Class(String),
    Array(Box<DataType>),
}

impl DataType {
    pub fn class(name: impl Into<String>) -> Self {
        DataType::Class(name.into())
    }

    pub fn string() -> Self {
        DataType::Class(JAVA_LANG_STRING.to_string())
    }

    pub fn object() -> Self {
        DataType::Class(JAVA_LANG_OBJECT.to_string())
    }

    pub fn array_of(self) -> Self {
        DataType::Array(Box::new(self))
    }

    /// Wrap in `dims` array levels
    pub fn with_dims(self, dims: usize) -> Self {
        (0..dims).fold(self, |t, _| t.array_of())
    }

    pub fn from_primitive_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => DataType::Boolean,
            "byte" => DataType::Byte,
            "char" => DataType::Char,
            "short" => DataType::Short,
            "int" => DataType::Int,
            "long" => DataType::Long,
            "float" => DataType::Float,
            "double" => DataType::Double,
            "void" => DataType::Void,
            _ => return None,
        })
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            DataType::Boolean
                | DataType::Byte
                | DataType::Char
                | DataType::Short
                | DataType::Int
                | DataType::Long
                | DataType::Float
                | DataType::Double
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_primitive() && !self.is_boolean()
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::Char | DataType::Short | DataType::Int | DataType::Long
        )
    }

    /// byte, short, char or int: everything computed on the int stack
    pub fn is_int_like(&self) -> bool {
        matches!(self, DataType::Byte | DataType::Char | DataType::Short | DataType::Int)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, DataType::Boolean)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, DataType::Class(_) | DataType::Array(_) | DataType::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, DataType::Array(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Class(name) if name == JAVA_LANG_STRING)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DataType::Unknown)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, DataType::Void)
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            DataType::Class(name) => Some(name),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&DataType> {
        match self {
            DataType::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Innermost non-array type
    pub fn base(&self) -> &DataType {
        match self {
            DataType::Array(elem) => elem.base(),
            other => other,
        }
    }

    pub fn dims(&self) -> usize {
        match self {
            DataType::Array(elem) => 1 + elem.dims(),
            _ => 0,
        }
    }

    /// Stack words occupied by a value of this type
    pub fn width(&self) -> u16 {
        match self {
            DataType::Void => 0,
            DataType::Long | DataType::Double => 2,
            _ => 1,
        }
    }

    /// Position in the numeric promotion order byte/short/char < int < long < float < double
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            DataType::Byte => Some(1),
            DataType::Short | DataType::Char => Some(2),
            DataType::Int => Some(3),
            DataType::Long => Some(4),
            DataType::Float => Some(5),
            DataType::Double => Some(6),
            _ => None,
        }
    }

    /// Virtual machine type descriptor
    pub fn descriptor(&self) -> String {
        match self {
            DataType::Boolean => "Z".to_string(),
            DataType::Byte => "B".to_string(),
            DataType::Char => "C".to_string(),
            DataType::Short => "S".to_string(),
            DataType::Int => "I".to_string(),
            DataType::Long => "J".to_string(),
            DataType::Float => "F".to_string(),
            DataType::Double => "D".to_string(),
            DataType::Void => "V".to_string(),
            DataType::Null | DataType::Unknown => format!("L{};", JAVA_LANG_OBJECT.replace('.', "/")),
            DataType::Class(name) => format!("L{};", name.replace('.', "/")),
            DataType::Array(elem) => format!("[{}", elem.descriptor()),
        }
    }

    /// Internal (slash-separated) name used by class-valued instructions
    pub fn internal_name(&self) -> String {
        match self {
            DataType::Class(name) => name.replace('.', "/"),
            other => other.descriptor(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "boolean"),
            DataType::Byte => write!(f, "byte"),
            DataType::Char => write!(f, "char"),
            DataType::Short => write!(f, "short"),
            DataType::Int => write!(f, "int"),
            DataType::Long => write!(f, "long"),
            DataType::Float => write!(f, "float"),
            DataType::Double => write!(f, "double"),
            DataType::Void => write!(f, "void"),
            DataType::Null => write!(f, "<null>"),
            DataType::Unknown => write!(f, "<unknown>"),
            DataType::Class(name) => write!(f, "{}", name),
            DataType::Array(elem) => write!(f, "{}[]", elem),
        }
    }
}

/// A compile-time constant value
///
/// byte and short constants are stored as `Int`; the owning expression's type
/// says how wide the value really is.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(u16),
    String(String),
    Null,
}

impl Constant {
    /// Natural type of the constant
    pub fn data_type(&self) -> DataType {
        match self {
            Constant::Boolean(_) => DataType::Boolean,
            Constant::Int(_) => DataType::Int,
            Constant::Long(_) => DataType::Long,
            Constant::Float(_) => DataType::Float,
            Constant::Double(_) => DataType::Double,
            Constant::Char(_) => DataType::Char,
            Constant::String(_) => DataType::string(),
            Constant::Null => DataType::Null,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Constant::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Constant::Int(v) => Some(*v),
            Constant::Char(c) => Some(*c as i32),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Constant::Long(v) => Some(*v),
            other => other.as_i32().map(i64::from),
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Constant::Float(v) => Some(*v),
            Constant::Long(v) => Some(*v as f32),
            other => other.as_i32().map(|v| v as f32),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Constant::Double(v) => Some(*v),
            Constant::Float(v) => Some(*v as f64),
            Constant::Long(v) => Some(*v as f64),
            other => other.as_i32().map(f64::from),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Constant::Int(v) => *v == 0,
            Constant::Long(v) => *v == 0,
            Constant::Char(c) => *c == 0,
            _ => false,
        }
    }

    /// The text string conversion produces for this value
    pub fn to_java_string(&self) -> String {
        match self {
            Constant::Boolean(b) => b.to_string(),
            Constant::Int(v) => v.to_string(),
            Constant::Long(v) => v.to_string(),
            Constant::Float(v) => float_to_string(*v as f64, v.to_string(), format!("{:e}", v)),
            Constant::Double(v) => float_to_string(*v, v.to_string(), format!("{:e}", v)),
            Constant::Char(c) => char::from_u32(*c as u32)
                .map(String::from)
                .unwrap_or_else(|| char::REPLACEMENT_CHARACTER.to_string()),
            Constant::String(s) => s.clone(),
            Constant::Null => "null".to_string(),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::String(s) => write!(f, "{:?}", s),
            Constant::Char(_) => write!(f, "'{}'", self.to_java_string()),
            Constant::Long(v) => write!(f, "{}L", v),
            Constant::Float(_) => write!(f, "{}f", self.to_java_string()),
            other => write!(f, "{}", other.to_java_string()),
        }
    }
}

// Plain notation for 1e-3 <= |x| < 1e7, computerized scientific notation
// ("1.0E10") otherwise, always with at least one fraction digit.
fn float_to_string(value: f64, plain: String, scientific: String) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
        if mantissa.contains('.') {
            format!("{}E{}", mantissa, exponent)
        } else {
            format!("{}.0E{}", mantissa, exponent)
        }
    }
}
