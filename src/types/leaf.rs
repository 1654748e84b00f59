use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Converts a candidate wire value into a typed value, or explains why it can't.
pub type Coercer = fn(&Value) -> Result<Value, String>;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("date regex should be valid"));
static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})[Tt ](\d{2}):(\d{2}):(\d{2})(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$")
        .expect("date-time regex should be valid")
});
static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("UUID regex should be valid")
});

/// A terminal type: the key into the [`TypeRegistry`](crate::registry::TypeRegistry)
/// and the coercer used to read wire values of that type.
///
/// Identity is the leaf name; two leaves with the same name are the same type.
///
/// ```rust
/// use brrtschema::types::Leaf;
/// use serde_json::json;
///
/// assert_eq!(Leaf::INTEGER.coerce(&json!("42")), Ok(json!(42)));
/// assert!(Leaf::INTEGER.coerce(&json!("forty-two")).is_err());
/// ```
#[derive(Clone, Copy)]
pub struct Leaf {
    name: &'static str,
    coercer: Coercer,
}

impl Leaf {
    pub const STRING: Leaf = Leaf::new("string", coerce_string);
    pub const INTEGER: Leaf = Leaf::new("integer", coerce_integer);
    pub const NUMBER: Leaf = Leaf::new("number", coerce_number);
    pub const BOOLEAN: Leaf = Leaf::new("boolean", coerce_boolean);
    pub const DATE: Leaf = Leaf::new("date", coerce_date);
    pub const DATE_TIME: Leaf = Leaf::new("date-time", coerce_date_time);
    pub const UUID: Leaf = Leaf::new("uuid", coerce_uuid);
    /// Free-form JSON, passed through untouched
    pub const ANY: Leaf = Leaf::new("any", coerce_any);
    /// The absence marker; a sum with `NULL` on one side is nullable
    pub const NULL: Leaf = Leaf::new("null", coerce_null);

    /// Every leaf seeded into [`TypeRegistry::builtin`](crate::registry::TypeRegistry::builtin).
    pub const BUILTIN: [Leaf; 9] = [
        Leaf::STRING,
        Leaf::INTEGER,
        Leaf::NUMBER,
        Leaf::BOOLEAN,
        Leaf::DATE,
        Leaf::DATE_TIME,
        Leaf::UUID,
        Leaf::ANY,
        Leaf::NULL,
    ];

    pub const fn new(name: &'static str, coercer: Coercer) -> Self {
        Leaf { name, coercer }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        (self.coercer)(value)
    }

    pub fn is_absence(&self) -> bool {
        self.name == Leaf::NULL.name
    }

    /// Leaves whose wire form is a string; an empty string is a real value for them.
    pub(crate) fn is_textual(&self) -> bool {
        self.name == Leaf::STRING.name || self.name == Leaf::ANY.name
    }
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Leaf {}

impl Hash for Leaf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Leaf({})", self.name)
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn coerce_string(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        _ => Err("must be a string".to_string()),
    }
}

fn coerce_integer(value: &Value) -> Result<Value, String> {
    const MSG: &str = "must be an integer";
    // 2^63; `i64::MAX as f64` rounds up to this, so the bound is exclusive.
    const I64_END: f64 = 9_223_372_036_854_775_808.0;
    match value {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return Ok(value.clone());
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= -I64_END && f < I64_END => {
                    Ok(Value::from(f as i64))
                }
                _ => Err(MSG.to_string()),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| MSG.to_string()),
        _ => Err(MSG.to_string()),
    }
}

fn coerce_number(value: &Value) -> Result<Value, String> {
    const MSG: &str = "must be a number";
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| MSG.to_string()),
        _ => Err(MSG.to_string()),
    }
}

fn coerce_boolean(value: &Value) -> Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "on" | "t" | "true" | "y" | "yes" => Ok(Value::Bool(true)),
            "0" | "off" | "f" | "false" | "n" | "no" => Ok(Value::Bool(false)),
            _ => Err("must be a boolean".to_string()),
        },
        _ => Err("must be a boolean".to_string()),
    }
}

fn valid_calendar_day(year: &str, month: &str, day: &str) -> bool {
    let (Ok(y), Ok(m), Ok(d)) = (year.parse::<u32>(), month.parse::<u32>(), day.parse::<u32>())
    else {
        return false;
    };
    let leap = (y % 4 == 0 && y % 100 != 0) || y % 400 == 0;
    let days = match m {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => return false,
    };
    (1..=days).contains(&d)
}

fn coerce_date(value: &Value) -> Result<Value, String> {
    let valid = value
        .as_str()
        .and_then(|s| DATE_RE.captures(s))
        .is_some_and(|c| valid_calendar_day(&c[1], &c[2], &c[3]));
    if valid {
        Ok(value.clone())
    } else {
        Err("must be a date (YYYY-MM-DD)".to_string())
    }
}

fn coerce_date_time(value: &Value) -> Result<Value, String> {
    let valid = value
        .as_str()
        .and_then(|s| DATE_TIME_RE.captures(s))
        .is_some_and(|c| {
            let clock_ok = c[4].parse::<u32>().is_ok_and(|h| h < 24)
                && c[5].parse::<u32>().is_ok_and(|m| m < 60)
                && c[6].parse::<u32>().is_ok_and(|s| s <= 60);
            clock_ok && valid_calendar_day(&c[1], &c[2], &c[3])
        });
    if valid {
        Ok(value.clone())
    } else {
        Err("must be an RFC 3339 date-time".to_string())
    }
}

fn coerce_uuid(value: &Value) -> Result<Value, String> {
    match value.as_str() {
        Some(s) if UUID_RE.is_match(s) => Ok(Value::String(s.to_ascii_lowercase())),
        _ => Err("must be a UUID".to_string()),
    }
}

fn coerce_any(value: &Value) -> Result<Value, String> {
    Ok(value.clone())
}

fn coerce_null(value: &Value) -> Result<Value, String> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(s) if s.is_empty() => Ok(Value::Null),
        _ => Err("must be null".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_from_wire_strings() {
        assert_eq!(Leaf::INTEGER.coerce(&json!("5")), Ok(json!(5)));
        assert_eq!(Leaf::INTEGER.coerce(&json!(" -12 ")), Ok(json!(-12)));
        assert_eq!(Leaf::INTEGER.coerce(&json!(3.0)), Ok(json!(3)));
        assert!(Leaf::INTEGER.coerce(&json!(3.5)).is_err());
        assert!(Leaf::INTEGER.coerce(&json!("")).is_err());
        assert!(Leaf::INTEGER.coerce(&json!(true)).is_err());
    }

    #[test]
    fn test_integer_float_range_is_exact() {
        assert!(Leaf::INTEGER.coerce(&json!(9_223_372_036_854_775_808.0_f64)).is_err());
        assert!(Leaf::INTEGER.coerce(&json!(1e19)).is_err());
        assert_eq!(
            Leaf::INTEGER.coerce(&json!(-9_223_372_036_854_775_808.0_f64)),
            Ok(json!(i64::MIN))
        );
        assert_eq!(
            Leaf::INTEGER.coerce(&json!(9_223_372_036_854_774_784.0_f64)),
            Ok(json!(9_223_372_036_854_774_784_i64))
        );
    }

    #[test]
    fn test_number_rejects_non_finite() {
        assert_eq!(Leaf::NUMBER.coerce(&json!("2.5")), Ok(json!(2.5)));
        assert!(Leaf::NUMBER.coerce(&json!("NaN")).is_err());
        assert!(Leaf::NUMBER.coerce(&json!("inf")).is_err());
    }

    #[test]
    fn test_boolean_words() {
        for yes in ["true", "TRUE", "1", "on", "yes", "t", "y"] {
            assert_eq!(Leaf::BOOLEAN.coerce(&json!(yes)), Ok(json!(true)), "{yes}");
        }
        for no in ["false", "0", "off", "no", "f", "n"] {
            assert_eq!(Leaf::BOOLEAN.coerce(&json!(no)), Ok(json!(false)), "{no}");
        }
        assert!(Leaf::BOOLEAN.coerce(&json!("maybe")).is_err());
    }

    #[test]
    fn test_dates() {
        assert!(Leaf::DATE.coerce(&json!("2024-02-29")).is_ok());
        assert!(Leaf::DATE.coerce(&json!("2023-02-29")).is_err());
        assert!(Leaf::DATE.coerce(&json!("2024-13-01")).is_err());
        assert!(Leaf::DATE_TIME.coerce(&json!("2024-05-01T12:30:00Z")).is_ok());
        assert!(Leaf::DATE_TIME.coerce(&json!("2024-05-01T12:30:00.123+02:00")).is_ok());
        assert!(Leaf::DATE_TIME.coerce(&json!("2024-05-01T25:30:00Z")).is_err());
        assert!(Leaf::DATE_TIME.coerce(&json!("2024-05-01")).is_err());
    }

    #[test]
    fn test_uuid_is_normalized() {
        assert_eq!(
            Leaf::UUID.coerce(&json!("0F8FAD5B-D9CB-469F-A165-70867728950E")),
            Ok(json!("0f8fad5b-d9cb-469f-a165-70867728950e"))
        );
        assert!(Leaf::UUID.coerce(&json!("not-a-uuid")).is_err());
    }

    #[test]
    fn test_identity_is_by_name() {
        let custom = Leaf::new("integer", coerce_any);
        assert_eq!(custom, Leaf::INTEGER);
        assert_ne!(Leaf::STRING, Leaf::INTEGER);
        assert!(Leaf::NULL.is_absence());
    }
}
