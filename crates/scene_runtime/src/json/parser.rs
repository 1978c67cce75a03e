//! Recursive-descent JSON parser
//!
//! One pass over the input bytes, one function per grammar production. The
//! [`ValidationLevel`] decides how much the parser insists on:
//!
//! - `Fast` trusts the input. Missing commas and colons, trailing commas, unknown
//!   escapes and stray bytes after the document are tolerated.
//! - `Checked` rejects every structural deviation with a positioned [`JsonError`].
//!
//! Either way the parser never reads out of bounds; malformed input under `Fast`
//! yields an error or an unspecified tree, never a panic. Nesting deeper than
//! [`MAX_DEPTH`] is rejected in both tiers.

use super::{JsonError, Number, Object, Value};
use crate::config::ValidationLevel;

/// Deepest array/object nesting accepted
pub const MAX_DEPTH: usize = 128;

/// Parse a complete JSON document
pub fn parse(text: &str, validation: ValidationLevel) -> Result<Value, JsonError> {
    Parser::new(text, validation).parse_document()
}

/// Parser state over one borrowed input
struct Parser<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
    checked: bool,
}

impl<'a> Parser<'a> {
    /// Create a parser; a leading byte-order mark is skipped
    fn new(text: &'a str, validation: ValidationLevel) -> Self {
        Self {
            text: text.strip_prefix('\u{feff}').unwrap_or(text),
            pos: 0,
            depth: 0,
            checked: validation.is_checked(),
        }
    }

    /// Parse one value and, when checked, require nothing but whitespace after it
    fn parse_document(mut self) -> Result<Value, JsonError> {
        let value = self.parse_value()?;
        self.skip_whitespace();
        if self.checked && self.pos < self.text.len() {
            return Err(JsonError::TrailingContent { offset: self.pos });
        }
        Ok(value)
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn skip_digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn unexpected(&self, expected: &'static str) -> JsonError {
        match self.text.get(self.pos..).and_then(|rest| rest.chars().next()) {
            Some(found) => JsonError::UnexpectedChar {
                found,
                offset: self.pos,
                expected,
            },
            None => JsonError::UnexpectedEnd { expected },
        }
    }

    fn parse_value(&mut self) -> Result<Value, JsonError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.nested(Self::parse_object).map(Value::Object),
            Some(b'[') => self.nested(Self::parse_array).map(Value::Array),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b't') => self.parse_literal("true", Value::Bool(true)),
            Some(b'f') => self.parse_literal("false", Value::Bool(false)),
            Some(b'n') => self.parse_literal("null", Value::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number().map(Value::Number),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, JsonError>) -> Result<T, JsonError> {
        if self.depth >= MAX_DEPTH {
            return Err(JsonError::TooDeep { offset: self.pos });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_literal(&mut self, word: &'static str, value: Value) -> Result<Value, JsonError> {
        if self.text.get(self.pos..).is_some_and(|rest| rest.starts_with(word)) {
            self.pos += word.len();
            Ok(value)
        } else {
            Err(self.unexpected(word))
        }
    }

    fn parse_object(&mut self) -> Result<Object, JsonError> {
        self.pos += 1;
        let mut object = Object::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(object);
        }

        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(self.unexpected("an object key"));
            }
            let key = self.parse_string()?;

            self.skip_whitespace();
            if self.peek() == Some(b':') {
                self.pos += 1;
            } else if self.checked {
                return Err(self.unexpected("':'"));
            }

            let value = self.parse_value()?;
            object.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    if !self.checked {
                        self.skip_whitespace();
                        if self.peek() == Some(b'}') {
                            self.pos += 1;
                            return Ok(object);
                        }
                    }
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(object);
                }
                Some(_) if !self.checked => {}
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Value>, JsonError> {
        self.pos += 1;
        let mut values = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(values);
        }

        loop {
            values.push(self.parse_value()?);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    if !self.checked {
                        self.skip_whitespace();
                        if self.peek() == Some(b']') {
                            self.pos += 1;
                            return Ok(values);
                        }
                    }
                }
                Some(b']') => {
                    self.pos += 1;
                    return Ok(values);
                }
                Some(_) if !self.checked => {}
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, JsonError> {
        let start = self.pos;
        self.pos += 1;
        let mut buf = Vec::new();

        loop {
            let Some(byte) = self.peek() else {
                return Err(JsonError::UnexpectedEnd {
                    expected: "closing '\"'",
                });
            };
            match byte {
                b'"' => {
                    self.pos += 1;
                    break;
                }
                b'\\' => {
                    self.pos += 1;
                    self.parse_escape(&mut buf)?;
                }
                0x00..=0x1f if self.checked => return Err(self.unexpected("a string character")),
                _ => {
                    buf.push(byte);
                    self.pos += 1;
                }
            }
        }

        // Only ASCII bytes are consumed as syntax, so multi-byte sequences arrive whole.
        String::from_utf8(buf).map_err(|_| JsonError::InvalidUnicode { offset: start })
    }

    fn parse_escape(&mut self, buf: &mut Vec<u8>) -> Result<(), JsonError> {
        let offset = self.pos;
        let Some(byte) = self.peek() else {
            return Err(JsonError::UnexpectedEnd {
                expected: "an escape character",
            });
        };
        self.pos += 1;

        let decoded = match byte {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => self.parse_unicode_escape(offset)?,
            other if self.checked => {
                return Err(JsonError::InvalidEscape {
                    found: char::from(other),
                    offset,
                })
            }
            other => {
                buf.push(other);
                return Ok(());
            }
        };

        let mut utf8 = [0; 4];
        buf.extend_from_slice(decoded.encode_utf8(&mut utf8).as_bytes());
        Ok(())
    }

    fn read_hex4(&mut self) -> Option<u16> {
        let digits = self.bytes().get(self.pos..self.pos + 4)?;
        if !digits.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
        let code = digits
            .iter()
            .fold(0u16, |acc, &d| (acc << 4) | u16::from(hex_value(d)));
        self.pos += 4;
        Some(code)
    }

    fn parse_unicode_escape(&mut self, offset: usize) -> Result<char, JsonError> {
        let Some(high) = self.read_hex4() else {
            if self.checked {
                return Err(JsonError::InvalidUnicode { offset });
            }
            let mut skipped = 0;
            while skipped < 4 && self.peek().is_some_and(|b| b.is_ascii_alphanumeric()) {
                self.pos += 1;
                skipped += 1;
            }
            return Ok(char::REPLACEMENT_CHARACTER);
        };

        match high {
            0xD800..=0xDBFF => {
                if self.bytes().get(self.pos..self.pos + 2) == Some(b"\\u".as_slice()) {
                    let resume = self.pos;
                    self.pos += 2;
                    if let Some(low @ 0xDC00..=0xDFFF) = self.read_hex4() {
                        let code = 0x10000
                            + ((u32::from(high) - 0xD800) << 10)
                            + (u32::from(low) - 0xDC00);
                        return char::from_u32(code).ok_or(JsonError::InvalidUnicode { offset });
                    }
                    self.pos = resume;
                }
                self.lone_surrogate(offset)
            }
            0xDC00..=0xDFFF => self.lone_surrogate(offset),
            code => char::from_u32(u32::from(code)).ok_or(JsonError::InvalidUnicode { offset }),
        }
    }

    const fn lone_surrogate(&self, offset: usize) -> Result<char, JsonError> {
        if self.checked {
            Err(JsonError::InvalidUnicode { offset })
        } else {
            Ok(char::REPLACEMENT_CHARACTER)
        }
    }

    fn parse_number(&mut self) -> Result<Number, JsonError> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        let int_digits = self.skip_digits();

        let mut well_formed = int_digits > 0;
        let mut fraction = false;
        let mut exponent = false;

        if self.peek() == Some(b'.') {
            self.pos += 1;
            fraction = true;
            well_formed &= self.skip_digits() > 0;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            exponent = true;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            well_formed &= self.skip_digits() > 0;
        }
        if matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'.') {
            well_formed = false;
        }

        let text: &'a str = self.text;
        let body = text.get(start..self.pos).unwrap_or_default();
        let invalid = || JsonError::InvalidNumber {
            text: body.to_string(),
            offset: start,
        };
        if self.checked && !well_formed {
            return Err(invalid());
        }

        if exponent {
            body.parse().map(Number::Exponential).map_err(|_| invalid())
        } else if fraction {
            body.parse().map(Number::Float).map_err(|_| invalid())
        } else if negative {
            let value: i64 = body.parse().map_err(|_| invalid())?;
            Ok(if value == 0 {
                Number::Unsigned(0)
            } else {
                Number::Negative(value)
            })
        } else {
            body.parse().map(Number::Unsigned).map_err(|_| invalid())
        }
    }
}

const fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(text: &str) -> Result<Value, JsonError> {
        parse(text, ValidationLevel::Checked)
    }

    fn fast(text: &str) -> Result<Value, JsonError> {
        parse(text, ValidationLevel::Fast)
    }

    fn round_trip(text: &str) {
        let first = checked(text).unwrap();
        let written = first.to_string();
        let second = checked(&written).unwrap();
        assert_eq!(first, second, "{text} -> {written}");
    }

    #[test]
    fn test_round_trip_every_kind() {
        round_trip(r#"{"a": 1, "b": [true, false, null], "c": {"d": "e"}}"#);
        round_trip("[]");
        round_trip("{}");
        round_trip("42");
        round_trip("-17");
        round_trip("3.25");
        round_trip("-0.5");
        round_trip("1.0");
        round_trip("6.02e23");
        round_trip("-1E-3");
        round_trip("2e5");
        round_trip("true");
        round_trip("false");
        round_trip("null");
        round_trip(r#""quote \" backslash \\ slash \/ \b\f\n\r\t \u00e9 \ud83d\ude00 ü""#);
    }

    #[test]
    fn test_number_sub_kinds_survive_round_trip() {
        for (text, expected) in [
            ("7", Number::Unsigned(7)),
            ("-7", Number::Negative(-7)),
            ("7.5", Number::Float(7.5)),
            ("7.0", Number::Float(7.0)),
            ("7e2", Number::Exponential(700.0)),
        ] {
            let parsed = checked(text).unwrap();
            assert_eq!(parsed, Value::Number(expected));
            assert_eq!(checked(&parsed.to_string()).unwrap(), parsed);
        }
    }

    #[test]
    fn test_string_escapes_decoded() {
        let value = checked(r#""a\nb\u0041\u00e9""#).unwrap();
        assert_eq!(value.as_string().unwrap(), "a\nbAé");
    }

    #[test]
    fn test_surrogate_pair() {
        let value = checked(r#""\ud83d\ude00""#).unwrap();
        assert_eq!(value.as_string().unwrap(), "😀");
    }

    #[test]
    fn test_whitespace_between_tokens() {
        let value = checked(" \t\r\n[ 1 ,\n\t2 ] \n").unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_byte_order_mark_skipped() {
        assert_eq!(checked("\u{feff}null").unwrap(), Value::Null);
    }

    #[test]
    fn test_checked_rejects_missing_comma() {
        assert!(matches!(checked("[1 2]"), Err(JsonError::UnexpectedChar { found: '2', .. })));
        assert!(checked(r#"{"a": 1 "b": 2}"#).is_err());
    }

    #[test]
    fn test_checked_rejects_trailing_comma() {
        assert!(checked("[1, 2,]").is_err());
        assert!(checked(r#"{"a": 1,}"#).is_err());
    }

    #[test]
    fn test_checked_rejects_missing_colon() {
        assert!(matches!(checked(r#"{"a" 1}"#), Err(JsonError::UnexpectedChar { .. })));
    }

    #[test]
    fn test_checked_rejects_bad_escape_and_hex() {
        assert!(matches!(checked(r#""\q""#), Err(JsonError::InvalidEscape { found: 'q', .. })));
        assert!(matches!(checked(r#""\u12G4""#), Err(JsonError::InvalidUnicode { .. })));
        assert!(matches!(checked(r#""\ud800""#), Err(JsonError::InvalidUnicode { .. })));
    }

    #[test]
    fn test_checked_rejects_malformed_numbers() {
        for text in ["1.", "-", "1e", "1e+", "12a", "1.2.3", "-.5"] {
            assert!(checked(text).is_err(), "{text}");
        }
    }

    #[test]
    fn test_checked_rejects_trailing_content() {
        assert!(matches!(checked("{} x"), Err(JsonError::TrailingContent { offset: 3 })));
    }

    #[test]
    fn test_checked_rejects_unterminated() {
        assert!(matches!(checked(r#""abc"#), Err(JsonError::UnexpectedEnd { .. })));
        assert!(matches!(checked("[1, 2"), Err(JsonError::UnexpectedEnd { .. })));
    }

    #[test]
    fn test_fast_tolerates_sloppy_structure() {
        assert_eq!(fast("[1 2,]").unwrap().as_array().unwrap().len(), 2);
        let obj = fast(r#"{"a" 1, "b": 2,}"#).unwrap();
        assert_eq!(obj.as_object().unwrap().len(), 2);
        assert_eq!(fast(r#""\q""#).unwrap().as_string().unwrap(), "q");
        assert_eq!(fast("null garbage").unwrap(), Value::Null);
    }

    #[test]
    fn test_fast_never_panics_on_truncation() {
        for text in ["", "{", "[", "\"", "{\"a\"", "[1,", "tru", "\"\\u12", "-"] {
            let _ = fast(text);
        }
    }

    #[test]
    fn test_deep_nesting_rejected_in_both_tiers() {
        let deep = "[".repeat(200_000);
        assert!(matches!(checked(&deep), Err(JsonError::TooDeep { offset: MAX_DEPTH })));
        assert!(matches!(fast(&deep), Err(JsonError::TooDeep { .. })));

        let objects = r#"{"a":"#.repeat(MAX_DEPTH + 1);
        assert!(matches!(fast(&objects), Err(JsonError::TooDeep { .. })));
    }

    #[test]
    fn test_nesting_at_limit_parses() {
        let text = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        let mut value = checked(&text).unwrap();
        for _ in 1..MAX_DEPTH {
            value = value.as_array().unwrap()[0].clone();
        }
        assert!(value.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_negative_zero_reads_as_unsigned() {
        assert_eq!(checked("-0").unwrap(), Value::Number(Number::Unsigned(0)));
    }
}
