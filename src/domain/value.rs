use std::fmt;

/// A single cell of a [`RecordBatch`](super::RecordBatch).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the cell; text is not coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    /// Text view of the cell, rendering numbers the way they would be
    /// written to a delimited file. `None` for nulls.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) if v.is_nan() => Ok(()),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map(Value::Float).unwrap_or(Value::Null)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map(Value::Text).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendering() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(-12).to_string(), "-12");
        assert_eq!(Value::Float(41234.0).to_string(), "41234.0");
        assert_eq!(Value::Float(f64::NAN).to_string(), "");
        assert_eq!(Value::text("Active").to_string(), "Active");
        assert_eq!(Value::Int(7).to_text().as_deref(), Some("7"));
        assert_eq!(Value::Null.to_text(), None);
    }

    #[test]
    fn test_numeric_view_skips_text_and_nan() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::text("3").as_f64(), None);
        assert_eq!(Value::Float(f64::NAN).as_f64(), None);
    }
}
