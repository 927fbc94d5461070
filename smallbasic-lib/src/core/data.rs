//! Deals with run-time data representation
//!
//! The language has four kinds of values and no runtime type errors: every value can be
//! converted into every other kind, falling back to a default when there is no sensible
//! conversion. Arrays are associative, keyed by strings that compare case-insensitively,
//! and remember the order in which their keys were first inserted.

use enum_variant_macros::FromVariants;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, FromVariants, Serialize, Deserialize)]
pub enum Value {
    Number(Decimal),
    String(String),
    Boolean(bool),
    Array(ArrayValue),
}

/// A string that keeps its original spelling, but hashes and compares ignoring ASCII case.
/// Used for array keys and all identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue(IndexMap<Key, Value>);

// ==============================================================================
// Key
// ==============================================================================
impl Key {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ==============================================================================
// Value
// ==============================================================================
impl Value {
    pub fn empty() -> Self {
        Value::String(String::new())
    }

    /// Classifies text coming from the outside world (host libraries, user input):
    /// "true"/"false" become booleans, numeric text becomes a number, everything else
    /// stays a string
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.eq_ignore_ascii_case("true") {
            Value::Boolean(true)
        } else if text.eq_ignore_ascii_case("false") {
            Value::Boolean(false)
        } else if let Some(n) = parse_number(&text) {
            Value::Number(n)
        } else {
            Value::String(text)
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            Value::Number(_) | Value::Array(_) => false,
        }
    }

    pub fn to_number(&self) -> Decimal {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s).unwrap_or(Decimal::ZERO),
            Value::Boolean(_) | Value::Array(_) => Decimal::ZERO,
        }
    }

    pub fn to_array(&self) -> ArrayValue {
        match self {
            Value::Array(a) => a.clone(),
            _ => ArrayValue::default(),
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Value::Number(n) => n.normalize().to_string(),
            Value::String(s) => s.clone(),
            Value::Boolean(true) => "True".into(),
            Value::Boolean(false) => "False".into(),
            Value::Array(a) => a.to_display_string(),
        }
    }

    /// Ordering used by the comparison operators: two numbers compare numerically,
    /// anything else compares the display strings, ignoring case
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(l), Value::Number(r)) => l.cmp(r),
            _ => {
                let l = self.to_display_string().to_lowercase();
                let r = other.to_display_string().to_lowercase();
                l.cmp(&r)
            }
        }
    }

    pub fn is_equal_to(&self, other: &Value) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

/// Parses the numeric text the language understands: an optional sign, digits, and an
/// optional fraction of at least one digit. Surrounding whitespace is ignored
pub fn parse_number(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let valid = match unsigned.split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => all_digits(unsigned),
    };
    if !valid {
        return None;
    }
    let n = Decimal::from_str(unsigned).ok()?;
    Some(if negative && !n.is_zero() { -n } else { n })
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Number(Decimal::from(x))
    }
}

impl From<usize> for Value {
    fn from(x: usize) -> Self {
        Value::Number(Decimal::from(x))
    }
}

// ==============================================================================
// ArrayValue
// ==============================================================================
impl ArrayValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(&Key::from(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(&Key::from(key))
    }

    /// Sets a value. A key that is already present keeps its original spelling and position
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = Key::new(key);
        if let Some(slot) = self.0.get_mut(&key) {
            *slot = value;
        } else {
            self.0.insert(key, value);
        }
    }

    /// the element at `key`, inserted as the empty string if it's missing
    pub fn element_mut(&mut self, key: impl Into<String>) -> &mut Value {
        self.0.entry(Key::new(key)).or_insert_with(Value::empty)
    }

    /// removes a key, keeping the order of the remaining ones
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(&Key::from(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(Key::as_str)
    }

    /// `key=value;` for every entry, `;`, `=` and `\` in values are escaped with `\`
    pub fn to_display_string(&self) -> String {
        let mut res = String::new();
        for (key, value) in self.iter() {
            res.push_str(key);
            res.push('=');
            for ch in value.to_display_string().chars() {
                if matches!(ch, ';' | '=' | '\\') {
                    res.push('\\');
                }
                res.push(ch);
            }
            res.push(';');
        }
        res
    }
}

impl FromIterator<(String, Value)> for ArrayValue {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut res = ArrayValue::new();
        for (k, v) in iter {
            res.set(k, v);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_to_number_defaults() {
        assert_eq!(Value::from("12.5").to_number(), Decimal::from_str("12.5").unwrap());
        assert_eq!(Value::from(" 7 ").to_number(), Decimal::from(7));
        assert_eq!(Value::from("abc").to_number(), Decimal::ZERO);
        assert_eq!(Value::Boolean(true).to_number(), Decimal::ZERO);
        assert_eq!(Value::Array(ArrayValue::new()).to_number(), Decimal::ZERO);
    }

    #[test]
    fn test_to_boolean_defaults() {
        assert!(Value::from("TRUE").to_boolean());
        assert!(!Value::from("yes").to_boolean());
        assert!(!num("1").to_boolean());
        assert!(Value::Boolean(true).to_boolean());
    }

    #[test]
    fn test_number_display_is_normalized() {
        assert_eq!(num("1.50").to_display_string(), "1.5");
        assert_eq!(num("3.0").to_display_string(), "3");
        assert_eq!(Value::Boolean(false).to_display_string(), "False");
    }

    #[test]
    fn test_array_display_escapes() {
        let mut arr = ArrayValue::new();
        arr.set("a", 1i64.into());
        arr.set("b", "x=y;z\\".into());
        assert_eq!(arr.to_display_string(), "a=1;b=x\\=y\\;z\\\\;");
    }

    #[test]
    fn test_nested_array_display() {
        let mut inner = ArrayValue::new();
        inner.set("k", "v".into());
        let mut outer = ArrayValue::new();
        outer.set("1", Value::Array(inner));
        assert_eq!(outer.to_display_string(), "1=k\\=v\\;;");
    }

    #[test]
    fn test_array_keys_ignore_case_and_keep_order() {
        let mut arr = ArrayValue::new();
        arr.set("Name", "first".into());
        arr.set("other", "x".into());
        arr.set("NAME", "second".into());
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get("name"), Some(&Value::from("second")));
        assert_eq!(arr.keys().collect::<Vec<_>>(), vec!["Name", "other"]);
        assert!(arr.contains_key("OTHER"));
        assert_eq!(arr.remove("Other"), Some(Value::from("x")));
        assert!(!arr.contains_key("other"));
    }

    #[test]
    fn test_compare() {
        assert_eq!(num("10").compare(&num("9")), Ordering::Greater);
        // not both numbers, so compared as text
        assert_eq!(Value::from("10").compare(&num("9")), Ordering::Less);
        assert!(Value::from("Hello").is_equal_to(&Value::from("hELLO")));
    }

    #[test]
    fn test_from_text_classifies() {
        assert_eq!(Value::from_text("True"), Value::Boolean(true));
        assert_eq!(Value::from_text("42"), num("42"));
        assert_eq!(Value::from_text("4 2"), Value::from("4 2"));
    }

    #[test]
    fn test_parse_number_accepts_only_plain_decimals() {
        assert_eq!(parse_number("-3.25"), Some(Decimal::from_str("-3.25").unwrap()));
        assert_eq!(parse_number(" +8 "), Some(Decimal::from(8)));
        assert_eq!(parse_number("-0").map(|n| n.is_sign_negative()), Some(false));
        for text in ["1_000", "1e3", "1E3", ".5", "5.", "--1", "-", "", "0x10", "1.2.3"] {
            assert_eq!(parse_number(text), None, "{:?}", text);
        }
        assert_eq!(Value::from_text("1e3"), Value::from("1e3"));
        assert_eq!(Value::from("1_0").add(&1i64.into()), Value::from("1_01"));
    }
}
