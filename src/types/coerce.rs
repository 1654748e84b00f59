use super::{upgrade, Field, TypeDescriptor};
use crate::error::Violation;
use serde_json::{Map, Value};

/// Coerce an untyped candidate into a validated value of type `ty`.
///
/// Wire strings are parsed leniently (`"10"` becomes `10` for integers). For
/// objects every missing field and every nested violation is reported, not
/// just the first one. Unknown object keys are dropped.
///
/// ```rust
/// use brrtschema::types::{coerce, TypeDescriptor};
/// use serde_json::json;
///
/// let ty = TypeDescriptor::array(TypeDescriptor::integer());
/// assert_eq!(coerce(&ty, &json!(["1", 2])), Ok(json!([1, 2])));
///
/// let errs = coerce(&ty, &json!(["x", 2, "y"])).unwrap_err();
/// assert_eq!(errs.len(), 2);
/// assert_eq!(errs[0].path, "[0]");
/// ```
pub fn coerce(ty: &TypeDescriptor, value: &Value) -> Result<Value, Vec<Violation>> {
    match ty {
        TypeDescriptor::Primitive(leaf) => leaf
            .coerce(value)
            .map_err(|message| vec![Violation::new("", message)]),
        TypeDescriptor::Optional(inner) => coerce_nullable(inner, value),
        TypeDescriptor::Default {
            inner,
            value: fallback,
        } => {
            if value.is_null() {
                Ok(fallback.clone())
            } else {
                coerce(inner, value)
            }
        }
        TypeDescriptor::Constrained { inner, constraint } => {
            let coerced = coerce(inner, value)?;
            if coerced.is_null() && !inner.is_required() {
                return Ok(coerced);
            }
            constraint
                .check(&coerced)
                .map_err(|message| vec![Violation::new("", message)])?;
            Ok(coerced)
        }
        TypeDescriptor::Sum(left, right) => match ty.nullable_inner() {
            Some(inner) => coerce_nullable(inner, value),
            None => coerce(left, value)
                .or_else(|_| coerce(right, value))
                .map_err(|_| vec![Violation::new("", "does not match any alternative")]),
        },
        TypeDescriptor::Struct(descriptor) => coerce_fields(descriptor.fields(), value),
        TypeDescriptor::Recursive(weak) => match upgrade(weak) {
            Ok(descriptor) => coerce_fields(descriptor.fields(), value),
            Err(err) => Err(vec![Violation::new("", err.to_string())]),
        },
        TypeDescriptor::Array(element) => coerce_array(element, value),
        TypeDescriptor::Map { key, value: member } => coerce_map(key, member, value),
        TypeDescriptor::Record(fields) => coerce_fields(fields, value),
    }
}

fn coerce_nullable(inner: &TypeDescriptor, value: &Value) -> Result<Value, Vec<Violation>> {
    match value {
        Value::Null => Ok(Value::Null),
        // An empty wire value for a non-text type means "no value".
        Value::String(s) if s.is_empty() && !inner.is_textual() => Ok(Value::Null),
        _ => coerce(inner, value),
    }
}

fn coerce_array(element: &TypeDescriptor, value: &Value) -> Result<Value, Vec<Violation>> {
    let Value::Array(items) = value else {
        return Err(vec![Violation::new("", "must be an array")]);
    };
    let mut out = Vec::with_capacity(items.len());
    let mut violations = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match coerce(element, item) {
            Ok(v) => out.push(v),
            Err(errs) => {
                let index = format!("[{i}]");
                violations.extend(errs.into_iter().map(|e| e.nested(&index)));
            }
        }
    }
    if violations.is_empty() {
        Ok(Value::Array(out))
    } else {
        Err(violations)
    }
}

fn coerce_map(
    key: &TypeDescriptor,
    member: &TypeDescriptor,
    value: &Value,
) -> Result<Value, Vec<Violation>> {
    let Value::Object(entries) = value else {
        return Err(vec![Violation::new("", "must be an object")]);
    };
    let mut out = Map::new();
    let mut violations = Vec::new();
    for (k, v) in entries {
        let coerced_key = match coerce(key, &Value::String(k.clone())) {
            Ok(Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(errs) => {
                violations.extend(
                    errs.into_iter()
                        .map(|e| Violation::new(k.clone(), format!("invalid key: {}", e.message))),
                );
                continue;
            }
        };
        match coerce(member, v) {
            Ok(v) => {
                out.insert(coerced_key, v);
            }
            Err(errs) => violations.extend(errs.into_iter().map(|e| e.nested(k))),
        }
    }
    if violations.is_empty() {
        Ok(Value::Object(out))
    } else {
        Err(violations)
    }
}

fn coerce_fields(fields: &[Field], value: &Value) -> Result<Value, Vec<Violation>> {
    let Value::Object(input) = value else {
        return Err(vec![Violation::new("", "must be an object")]);
    };
    let mut out = Map::new();
    let mut violations = Vec::new();
    for field in fields {
        match input.get(&field.name) {
            Some(candidate) => match coerce(&field.ty, candidate) {
                Ok(v) => {
                    out.insert(field.name.clone(), v);
                }
                Err(errs) => {
                    violations.extend(errs.into_iter().map(|e| e.nested(&field.name)));
                }
            },
            None => {
                if let Some(fallback) = field.ty.default_value() {
                    out.insert(field.name.clone(), fallback.clone());
                } else if field.is_required() {
                    violations.push(Violation::new(field.name.clone(), "is missing"));
                }
            }
        }
    }
    if violations.is_empty() {
        Ok(Value::Object(out))
    } else {
        Err(violations)
    }
}
