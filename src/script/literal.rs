//! Literal encoding for script parameters
//!
//! Every parameter is converted into a closed `Literal` tree before it is
//! written, so the encoder is one exhaustive match with no fallback arm.
//! Values outside the closed set are stringified on the way in.

use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// A value expressible as a script literal
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    /// Kept as the decoded number so its decimal text is reproduced exactly
    Number(Number),
    String(String),
    List(Vec<Literal>),
    Map(BTreeMap<String, Literal>),
}

impl Literal {
    /// Fallback for kinds with no literal form of their own.
    pub fn stringify(value: impl std::fmt::Display) -> Self {
        Self::String(value.to_string())
    }

    /// Convert any serializable value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    /// Encode as script text.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut String) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Number(n) => out.push_str(&n.to_string()),
            Self::String(s) => encode_string(s, out),
            Self::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.encode_into(out);
                }
                out.push(']');
            }
            Self::Map(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    encode_key(key, out);
                    out.push_str(": ");
                    value.encode_into(out);
                }
                out.push('}');
            }
        }
    }
}

fn encode_string(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn encode_key(key: &str, out: &mut String) {
    if is_identifier(key) {
        out.push_str(key);
    } else {
        out.push('`');
        out.push_str(&key.replace('`', "``"));
        out.push('`');
    }
}

impl From<Value> for Literal {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for Literal {
    /// Non-finite floats have no literal form and are stringified.
    fn from(n: f64) -> Self {
        Number::from_f64(n)
            .map(Self::Number)
            .unwrap_or_else(|| Self::stringify(n))
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Literal {
    fn from(at: chrono::DateTime<chrono::Utc>) -> Self {
        Self::stringify(at.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(Literal::Null.encode(), "null");
        assert_eq!(Literal::from(true).encode(), "true");
        assert_eq!(Literal::from(42i64).encode(), "42");
        assert_eq!(Literal::from(-0.125).encode(), "-0.125");
    }

    #[test]
    fn float_text_is_exact() {
        let raw = "[123456789.123456789, 0.30000000000000001, 18446744073709551616]";
        let value: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(Literal::from(value).encode(), raw);
    }

    #[test]
    fn strings_escape_quotes_and_backslashes() {
        assert_eq!(
            Literal::from(r"it's a \path").encode(),
            r"'it\'s a \\path'"
        );
        assert_eq!(Literal::from("two\nlines").encode(), r"'two\nlines'");
    }

    #[test]
    fn nested_mixed_kinds() {
        let value = json!({
            "terms": ["a", 1, null, {"deep": [true]}],
            "weight": 0.5
        });
        assert_eq!(
            Literal::from(value).encode(),
            "{terms: ['a', 1, null, {deep: [true]}], weight: 0.5}"
        );
    }

    #[test]
    fn map_keys_quoted_only_when_needed() {
        let value = json!({"plain_key": 1, "has space": 2, "9lives": 3, "tick`": 4});
        assert_eq!(
            Literal::from(value).encode(),
            "{`9lives`: 3, `has space`: 2, plain_key: 1, `tick```: 4}"
        );
    }

    #[test]
    fn non_finite_float_falls_back_to_string() {
        assert_eq!(Literal::from(f64::NAN).encode(), "'NaN'");
        assert_eq!(Literal::from(Some(f64::INFINITY)).encode(), "'inf'");
        assert_eq!(Literal::from(None::<f64>).encode(), "null");
    }

    #[test]
    fn datetime_stringified() {
        use chrono::TimeZone;
        let at = chrono::Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(Literal::from(at).encode(), "'2026-01-05T00:00:00+00:00'");
    }
}
