/// A single typed cell of the parcel table
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl Value {
    /// Infer a typed value from one raw CSV cell.
    ///
    /// `force_string` keeps the text verbatim (codes with leading zeros such as
    /// `Код КЛАДР` or `Кадастровый квартал` must never become numbers).
    pub fn from_cell(raw: &str, force_string: bool) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if force_string {
            return Value::String(trimmed.to_string());
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int64(i);
        }
        if let Some(f) = parse_decimal(trimmed) {
            return Value::Float64(f);
        }
        Value::String(trimmed.to_string())
    }
}

/// Parse a decimal number written either with a dot or with a comma as the
/// decimal separator. Spaces and NBSP are accepted as thousands separators.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a boolean-like cell (`true/false`, `1/0`, `да/нет`, `yes/no`)
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "1.0" | "да" | "yes" => Some(true),
        "false" | "0" | "0.0" | "нет" | "no" => Some(false),
        _ => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int64(a), Value::Float64(b)) => (*a as f64).to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Int64(b)) => a.to_bits() == (*b as f64).to_bits(),
            _ => false,
        }
    }
}

/// Column data type for schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Null,
    Bool,
    Int64,
    Float64,
    String,
}

impl DataType {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => DataType::Null,
            Value::Bool(_) => DataType::Bool,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::String(_) => DataType::String,
        }
    }

    /// Determine the best type when merging two types
    pub fn merge(&self, other: &DataType) -> DataType {
        if self == other {
            return *self;
        }
        match (self, other) {
            (DataType::Null, t) | (t, DataType::Null) => *t,
            (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
                DataType::Float64
            }
            // Default to string for incompatible types
            _ => DataType::String,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Null => write!(f, "NULL"),
            DataType::Bool => write!(f, "BOOL"),
            DataType::Int64 => write!(f, "INT64"),
            DataType::Float64 => write!(f, "FLOAT64"),
            DataType::String => write!(f, "STRING"),
        }
    }
}
