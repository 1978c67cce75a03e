//! Compact JSON output
//!
//! Numbers are written so that re-parsing yields the same [`Number`] sub-kind:
//! floats always carry a decimal point and exponentials always carry an `e`.

use std::fmt::{self, Write};

use super::{Number, Object, Value};

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Negative(v) => write!(f, "{v}"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Float(v) => {
                let text = v.to_string();
                f.write_str(&text)?;
                if !text.contains('.') {
                    f.write_str(".0")?;
                }
                Ok(())
            }
            Self::Exponential(v) => write!(f, "{v:e}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(object) => fmt::Display::fmt(object, f),
            Self::Array(values) => {
                f.write_char('[')?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    fmt::Display::fmt(value, f)?;
                }
                f.write_char(']')
            }
            Self::Number(n) => fmt::Display::fmt(n, f),
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) => write_escaped(f, s),
            Self::Null => f.write_str("null"),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('{')?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write_escaped(f, key)?;
            f.write_char(':')?;
            fmt::Display::fmt(value, f)?;
        }
        f.write_char('}')
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            '\u{c}' => f.write_str("\\f")?,
            c if u32::from(c) < 0x20 => write!(f, "\\u{:04x}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_keeps_decimal_point() {
        assert_eq!(Number::Float(2.0).to_string(), "2.0");
        assert_eq!(Number::Float(-0.25).to_string(), "-0.25");
    }

    #[test]
    fn test_exponential_keeps_exponent() {
        assert_eq!(Number::Exponential(1500.0).to_string(), "1.5e3");
    }

    #[test]
    fn test_control_characters_escaped() {
        let value = Value::String("a\"b\\c\u{1}\n".to_string());
        assert_eq!(value.to_string(), r#""a\"b\\c\u0001\n""#);
    }

    #[test]
    fn test_object_written_in_key_order() {
        let object: Object = [
            ("b".to_string(), Value::Null),
            ("a".to_string(), Value::Bool(true)),
        ]
        .into_iter()
        .collect();
        assert_eq!(Value::Object(object).to_string(), r#"{"a":true,"b":null}"#);
    }
}
