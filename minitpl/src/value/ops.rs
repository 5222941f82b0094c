use std::sync::Arc;

use crate::error::{Error, ErrorKind};
use crate::value::{Value, ValueRepr};

/// Converts compound values into their string form.
///
/// Primitives are returned as-is.  This is the `ToPrimitive` step that
/// JavaScript performs before arithmetic and comparisons.
pub fn to_primitive(value: &Value) -> Value {
    match value.0 {
        ValueRepr::Array(_) | ValueRepr::Object(_) | ValueRepr::Function(_) => {
            Value::from(value.to_string())
        }
        _ => value.clone(),
    }
}

/// Implements the `+` operator.
///
/// If either side is (or converts to) a string the operands are
/// concatenated, otherwise they are added as numbers.
pub fn add(lhs: &Value, rhs: &Value) -> Value {
    let lhs = to_primitive(lhs);
    let rhs = to_primitive(rhs);
    if matches!(lhs.0, ValueRepr::String(_)) || matches!(rhs.0, ValueRepr::String(_)) {
        Value::from(format!("{lhs}{rhs}"))
    } else {
        Value::from(lhs.to_number() + rhs.to_number())
    }
}

macro_rules! math_op {
    ($name:ident, $op:tt) => {
        pub fn $name(lhs: &Value, rhs: &Value) -> Value {
            Value::from(lhs.to_number() $op rhs.to_number())
        }
    };
}

math_op!(sub, -);
math_op!(mul, *);
math_op!(div, /);
math_op!(rem, %);

/// Implements the unary `-` operator.
pub fn neg(value: &Value) -> Value {
    Value::from(-value.to_number())
}

/// Implements `===`.
pub fn strict_eq(lhs: &Value, rhs: &Value) -> bool {
    match (&lhs.0, &rhs.0) {
        (ValueRepr::Undefined, ValueRepr::Undefined) | (ValueRepr::Null, ValueRepr::Null) => true,
        (ValueRepr::Bool(a), ValueRepr::Bool(b)) => a == b,
        (ValueRepr::Number(a), ValueRepr::Number(b)) => a == b,
        (ValueRepr::String(a), ValueRepr::String(b)) => a == b,
        (ValueRepr::Array(a), ValueRepr::Array(b)) => Arc::ptr_eq(a, b),
        (ValueRepr::Object(a), ValueRepr::Object(b)) => Arc::ptr_eq(a, b),
        (ValueRepr::Function(a), ValueRepr::Function(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Like [`strict_eq`] but `NaN` is considered equal to itself.
pub fn same_value_zero(lhs: &Value, rhs: &Value) -> bool {
    match (&lhs.0, &rhs.0) {
        (ValueRepr::Number(a), ValueRepr::Number(b)) if a.is_nan() && b.is_nan() => true,
        _ => strict_eq(lhs, rhs),
    }
}

/// Implements `==`.
pub fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    use ValueRepr::*;
    match (&lhs.0, &rhs.0) {
        (Undefined | Null, Undefined | Null) => true,
        (Undefined | Null, _) | (_, Undefined | Null) => false,
        _ if lhs.kind() == rhs.kind() => strict_eq(lhs, rhs),
        (Number(a), String(_)) => *a == rhs.to_number(),
        (String(_), Number(b)) => lhs.to_number() == *b,
        (Bool(_), _) => loose_eq(&Value::from(lhs.to_number()), rhs),
        (_, Bool(_)) => loose_eq(lhs, &Value::from(rhs.to_number())),
        (Array(_) | Object(_) | Function(_), Number(_) | String(_)) => {
            loose_eq(&to_primitive(lhs), rhs)
        }
        (Number(_) | String(_), Array(_) | Object(_) | Function(_)) => {
            loose_eq(lhs, &to_primitive(rhs))
        }
        _ => false,
    }
}

/// Compares two values with `<` semantics.
///
/// Returns `None` if the comparison is undefined (one side is `NaN` after
/// conversion), in which case all relational operators yield `false`.
pub fn less_than(lhs: &Value, rhs: &Value) -> Option<bool> {
    let lhs = to_primitive(lhs);
    let rhs = to_primitive(rhs);
    if let (Some(a), Some(b)) = (lhs.as_str(), rhs.as_str()) {
        return Some(a.encode_utf16().lt(b.encode_utf16()));
    }
    let (a, b) = (lhs.to_number(), rhs.to_number());
    if a.is_nan() || b.is_nan() {
        None
    } else {
        Some(a < b)
    }
}

fn array_index(name: &str) -> Option<usize> {
    let idx: usize = name.parse().ok()?;
    (idx.to_string() == name).then_some(idx)
}

/// Looks up a property by name (`value.name`).
pub fn get_attr(value: &Value, name: &str) -> Result<Value, Error> {
    Ok(match value.0 {
        ValueRepr::Undefined | ValueRepr::Null => {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("cannot read properties of {value} (reading '{name}')"),
            ))
        }
        ValueRepr::String(ref s) => {
            if name == "length" {
                Value::from(s.encode_utf16().count())
            } else {
                array_index(name)
                    .and_then(|idx| s.encode_utf16().nth(idx))
                    .map(|unit| Value::from(String::from_utf16_lossy(&[unit])))
                    .unwrap_or_default()
            }
        }
        ValueRepr::Array(ref items) => {
            if name == "length" {
                Value::from(items.len())
            } else {
                array_index(name)
                    .and_then(|idx| items.get(idx))
                    .cloned()
                    .unwrap_or_default()
            }
        }
        ValueRepr::Object(ref map) => map.get(name).cloned().unwrap_or_default(),
        _ => Value::UNDEFINED,
    })
}

/// Looks up a property by computed key (`value[key]`).
pub fn get_item(value: &Value, key: &Value) -> Result<Value, Error> {
    get_attr(value, &key.to_string())
}

/// Returns the values a `for ... of` loop walks over.
pub fn iter_values(value: &Value) -> Result<Vec<Value>, Error> {
    match value.0 {
        ValueRepr::Array(ref items) => Ok(items.to_vec()),
        ValueRepr::String(ref s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("{} is not iterable", value.kind()),
        )),
    }
}

/// Returns the keys a `for ... in` loop walks over.
///
/// Values without enumerable keys (including `null` and `undefined`)
/// produce no keys at all.
pub fn iter_keys(value: &Value) -> Vec<Value> {
    match value.0 {
        ValueRepr::Object(ref map) => map.keys().map(|k| Value::from(k.as_str())).collect(),
        ValueRepr::Array(ref items) => (0..items.len()).map(|i| Value::from(i.to_string())).collect(),
        ValueRepr::String(ref s) => (0..s.encode_utf16().count())
            .map(|i| Value::from(i.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueMap;

    use similar_asserts::assert_eq;

    #[test]
    fn test_adding() {
        assert_eq!(add(&Value::from(1), &Value::from(2)), Value::from(3));
        assert_eq!(
            add(&Value::from("foo"), &Value::from("bar")),
            Value::from("foobar")
        );
        assert_eq!(add(&Value::from("a"), &Value::from(42)), Value::from("a42"));
        assert_eq!(add(&Value::from(1), &Value::from(true)), Value::from(2));
        assert_eq!(
            add(&Value::from(vec![1, 2]), &Value::from(3)),
            Value::from("1,23")
        );
        assert!(add(&Value::from(1), &Value::UNDEFINED)
            .as_f64()
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_math() {
        assert_eq!(sub(&Value::from("5"), &Value::from(2)), Value::from(3));
        assert_eq!(mul(&Value::from(2.5), &Value::from(4)), Value::from(10));
        assert_eq!(div(&Value::from(1), &Value::from(0)), Value::from(f64::INFINITY));
        assert_eq!(rem(&Value::from(-7), &Value::from(3)), Value::from(-1));
        assert_eq!(neg(&Value::from("3")), Value::from(-3));
    }

    #[test]
    fn test_equality() {
        assert!(loose_eq(&Value::from(1), &Value::from("1")));
        assert!(!strict_eq(&Value::from(1), &Value::from("1")));
        assert!(loose_eq(&Value::NULL, &Value::UNDEFINED));
        assert!(!strict_eq(&Value::NULL, &Value::UNDEFINED));
        assert!(!loose_eq(&Value::NULL, &Value::from(0)));
        assert!(loose_eq(&Value::from(true), &Value::from("1")));
        assert!(loose_eq(&Value::from(vec![1]), &Value::from(1)));
        assert!(!loose_eq(&Value::from(f64::NAN), &Value::from(f64::NAN)));
        assert!(same_value_zero(
            &Value::from(f64::NAN),
            &Value::from(f64::NAN)
        ));

        let arr = Value::from(vec![1, 2]);
        assert!(strict_eq(&arr, &arr.clone()));
        assert!(!strict_eq(&arr, &Value::from(vec![1, 2])));
    }

    #[test]
    fn test_less_than() {
        assert_eq!(less_than(&Value::from(1), &Value::from(2)), Some(true));
        assert_eq!(less_than(&Value::from("10"), &Value::from("9")), Some(true));
        assert_eq!(less_than(&Value::from("10"), &Value::from(9)), Some(false));
        assert_eq!(less_than(&Value::from("a"), &Value::from(1)), None);
        assert_eq!(less_than(&Value::UNDEFINED, &Value::from(1)), None);
    }

    #[test]
    fn test_get_attr() {
        let mut map = ValueMap::new();
        map.insert("name".into(), Value::from("Peter"));
        let obj = Value::from(map);
        assert_eq!(get_attr(&obj, "name").unwrap(), Value::from("Peter"));
        assert!(get_attr(&obj, "missing").unwrap().is_undefined());

        let s = Value::from("héllo");
        assert_eq!(get_attr(&s, "length").unwrap(), Value::from(5));
        assert_eq!(get_item(&s, &Value::from(1)).unwrap(), Value::from("é"));

        let arr = Value::from(vec!["a", "b"]);
        assert_eq!(get_item(&arr, &Value::from(1)).unwrap(), Value::from("b"));
        assert!(get_item(&arr, &Value::from(2)).unwrap().is_undefined());
        assert!(get_item(&arr, &Value::from("01")).unwrap().is_undefined());

        let err = get_attr(&Value::UNDEFINED, "x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid operation: cannot read properties of undefined (reading 'x')"
        );
    }

    #[test]
    fn test_iteration() {
        assert_eq!(
            iter_values(&Value::from("ab")).unwrap(),
            vec![Value::from("a"), Value::from("b")]
        );
        assert_eq!(
            iter_values(&Value::NULL).unwrap_err().to_string(),
            "invalid operation: null is not iterable"
        );
        assert_eq!(
            iter_keys(&Value::from(vec![5, 6])),
            vec![Value::from("0"), Value::from("1")]
        );
        assert!(iter_keys(&Value::UNDEFINED).is_empty());
    }
}
