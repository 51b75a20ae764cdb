/// Payload stored against a key.
///
/// The map accepts any variant, but `increment` and `get_int` operate on
/// `Int` entries only; addressing another variant with them surfaces a
/// `TypeMismatch` error naming the stored type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Human-readable name of the stored type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Returns the integer payload, or `None` for any other variant.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Int(1).type_name(), "integer");
        assert_eq!(Value::Float(1.5).type_name(), "float");
        assert_eq!(Value::Bool(true).type_name(), "boolean");
        assert_eq!(Value::Str("x".to_string()).type_name(), "string");
        assert_eq!(Value::Bytes(vec![1, 2]).type_name(), "bytes");
    }

    #[test]
    fn test_as_int_only_matches_integers() {
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Float(42.0).as_int(), None);
        assert_eq!(Value::Str("42".to_string()).as_int(), None);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(7i64), Value::Int(7));
        assert_eq!(Value::from(7i32), Value::Int(7));
        assert_eq!(Value::from(2.5), Value::Float(2.5));
        assert_eq!(Value::from(false), Value::Bool(false));
        assert_eq!(Value::from("banana"), Value::Str("banana".to_string()));
        assert_eq!(Value::from("owned".to_string()), Value::Str("owned".to_string()));
        assert_eq!(Value::from(vec![0u8, 1]), Value::Bytes(vec![0, 1]));
    }
}
