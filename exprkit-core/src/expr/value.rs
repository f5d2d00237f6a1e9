//! Value types for expression evaluation
//!
//! Represents bound identifier values and the result of evaluating an
//! expression, along with the coercion rules shared by operators and
//! built-in functions.

use std::fmt;

/// Integral numbers below this magnitude render without a decimal point.
const INTEGRAL_DISPLAY_LIMIT: f64 = 1e15;

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Str(String),
    Array(Vec<Value>),
    /// Produced by functions with no answer (e.g. `Split` past the end).
    /// As a binding it counts as empty, i.e. missing.
    Null,
}

impl Value {
    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view: numbers, and strings whose trimmed text is a finite number
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Str(s) => parse_number(s),
            _ => None,
        }
    }

    /// Boolean view: booleans, and the strings `true`/`false` in any case
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Str(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Text view: scalars in their canonical rendering
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Number(_) | Value::Bool(_) => Some(self.to_string()),
            Value::Array(_) | Value::Null => None,
        }
    }

    /// Equality used by `==`, `!=`, `AreEquals` and `In`. Never fails.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Array(_), _) | (_, Value::Array(_)) => false,
            (Value::Bool(_), _) | (_, Value::Bool(_)) => {
                match (self.to_bool(), other.to_bool()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => match (self.to_number(), other.to_number()) {
                (Some(a), Some(b)) => a == b,
                // a number never equals non-numeric text
                _ => match (self, other) {
                    (Value::Str(a), Value::Str(b)) => a == b,
                    _ => false,
                },
            },
        }
    }
}

/// Parse text as a finite number, ignoring surrounding whitespace
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Canonical number rendering: `14`, `-3`, `2.5`, `0.1`
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // also folds negative zero
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < INTEGRAL_DISPLAY_LIMIT {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Null => Ok(()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::Str(s) => write!(f, "{:?}", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Number(42.0).type_name(), "number");
        assert_eq!(Value::Bool(true).type_name(), "bool");
        assert_eq!(Value::from("hello").type_name(), "string");
        assert_eq!(Value::Null.type_name(), "null");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(14.0).to_string(), "14");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::from("hello").to_string(), "hello");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(
            Value::from(vec![Value::Number(1.0), Value::from("a")]).to_string(),
            "[1, \"a\"]"
        );
    }

    #[test]
    fn test_large_numbers_keep_float_rendering() {
        assert_eq!(Value::Number(1e15).to_string(), "1000000000000000");
        assert_eq!(Value::Number(999_999_999_999_999.0).to_string(), "999999999999999");
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::from(" 4 ").to_number(), Some(4.0));
        assert_eq!(Value::from("1e3").to_number(), Some(1000.0));
        assert_eq!(Value::from("abc").to_number(), None);
        assert_eq!(Value::from("inf").to_number(), None);
        assert_eq!(Value::from("NaN").to_number(), None);
        assert_eq!(Value::Bool(true).to_number(), None);
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(Value::from("TRUE").to_bool(), Some(true));
        assert_eq!(Value::from(" false ").to_bool(), Some(false));
        assert_eq!(Value::from("1").to_bool(), None);
        assert_eq!(Value::Number(1.0).to_bool(), None);
    }

    #[test]
    fn test_loose_eq() {
        assert!(Value::from("3").loose_eq(&Value::Number(3.0)));
        assert!(Value::from("03").loose_eq(&Value::from("3")));
        assert!(Value::from("abc").loose_eq(&Value::from("abc")));
        assert!(!Value::from("abc").loose_eq(&Value::Number(3.0)));
        assert!(Value::Bool(true).loose_eq(&Value::from("True")));
        assert!(!Value::Bool(true).loose_eq(&Value::Number(1.0)));
        assert!(Value::Null.loose_eq(&Value::Null));
        assert!(!Value::Null.loose_eq(&Value::from("")));
    }
}
