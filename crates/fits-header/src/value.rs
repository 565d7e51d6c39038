use core::fmt;

use crate::keyword::ValueType;

/// A typed card value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Real(f64),
    /// FITS character string, unescaped and without the enclosing quotes.
    Literal(String),
}

impl Value {
    /// Interprets free text typed by a user.
    ///
    /// Attempts run in a fixed order and the first success wins:
    /// 1. integer,
    /// 2. real, refusing text with `d`, `D`, `f` or `F` so that `1D` stays a
    ///    string,
    /// 3. logical for exactly `T` or `F`,
    /// 4. literal, with trailing whitespace removed.
    ///
    /// Round-tripping a card through [`Value::to_string`] and back relies on
    /// this order.
    pub fn parse(text: &str) -> Value {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Integer(n);
        }
        let trimmed = text.trim();
        if !trimmed.contains(&['d', 'D', 'f', 'F'][..]) {
            if let Some(f) = parse_plain_real(trimmed) {
                return Value::Real(f);
            }
        }
        match text {
            "T" => Value::Logical(true),
            "F" => Value::Logical(false),
            _ => Value::Literal(text.trim_end().to_string()),
        }
    }

    /// The registry type this value satisfies.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Logical(_) => ValueType::Logical,
            Value::Integer(_) => ValueType::Int,
            Value::Real(_) => ValueType::Real,
            Value::Literal(_) => ValueType::Literal,
        }
    }

    /// True for integer and real values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Literal(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logical(true) => f.write_str("T"),
            Value::Logical(false) => f.write_str("F"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Real(x) => f.write_str(&format_real(*x)),
            Value::Literal(s) => f.write_str(s),
        }
    }
}

// ── Numeric fields ──

/// Parses an integer value field.
pub fn parse_int_field(field: &str) -> Option<i64> {
    field.trim().parse().ok()
}

/// Parses a real value field, handling FITS `D` exponent notation and a
/// single trailing `d`/`D`/`f`/`F` type suffix.
pub fn parse_real_field(field: &str) -> Option<f64> {
    let mut s = field.trim();
    if let Some(stripped) = s.strip_suffix(&['d', 'D', 'f', 'F'][..]) {
        if stripped.ends_with(|c: char| c.is_ascii_digit() || c == '.') {
            s = stripped;
        }
    }
    let normalized = s.replace(&['D', 'd'][..], "E");
    parse_plain_real(&normalized)
}

/// Decimal or exponent notation only; `inf` and `NaN` spellings are refused.
fn parse_plain_real(s: &str) -> Option<f64> {
    let plain = s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if plain && s.bytes().any(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Renders a real the way the header has always shown them: plain decimal
/// with at least one fraction digit in `[1e-3, 1e7)`, otherwise a mantissa
/// with at least one fraction digit followed by `E` and the exponent.
pub fn format_real(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = x.abs();
    if x == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let s = x.to_string();
        if s.contains('.') {
            s
        } else {
            format!("{s}.0")
        }
    } else {
        let s = format!("{x:E}");
        match s.split_once('E') {
            Some((mantissa, exponent)) if !mantissa.contains('.') => {
                format!("{mantissa}.0E{exponent}")
            }
            _ => s,
        }
    }
}
