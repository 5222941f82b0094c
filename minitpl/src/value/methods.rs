//! Built-in methods on strings and arrays.
use crate::utils::js_trim;
use crate::value::ops::{same_value_zero, strict_eq};
use crate::value::{Value, ValueRepr};

fn arg(args: &[Value], idx: usize) -> Value {
    args.get(idx).cloned().unwrap_or_default()
}

/// Resolves a possibly negative index argument against a length.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn slice_range(len: usize, args: &[Value]) -> (usize, usize) {
    let start = relative_index(&arg(args, 0), len, 0);
    let end = relative_index(&arg(args, 1), len, len);
    (start, end.max(start))
}

fn join(items: &[Value], sep: &Value) -> String {
    let sep = if sep.is_undefined() {
        ",".to_string()
    } else {
        sep.to_string()
    };
    let mut rv = String::new();
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            rv.push_str(&sep);
        }
        if !item.is_nullish() {
            rv.push_str(&item.to_string());
        }
    }
    rv
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "toUpperCase" => Value::from(s.to_uppercase()),
        "toLowerCase" => Value::from(s.to_lowercase()),
        "trim" => Value::from(js_trim(s)),
        "toString" => Value::from(s),
        "includes" => Value::from(s.contains(arg(args, 0).to_string().as_str())),
        "startsWith" => Value::from(s.starts_with(arg(args, 0).to_string().as_str())),
        "endsWith" => Value::from(s.ends_with(arg(args, 0).to_string().as_str())),
        "indexOf" => {
            let haystack: Vec<u16> = s.encode_utf16().collect();
            let needle: Vec<u16> = arg(args, 0).to_string().encode_utf16().collect();
            let pos = if needle.is_empty() {
                Some(0)
            } else {
                haystack
                    .windows(needle.len())
                    .position(|window| window == needle.as_slice())
            };
            Value::from(pos.map_or(-1.0, |x| x as f64))
        }
        "slice" => {
            let units: Vec<u16> = s.encode_utf16().collect();
            let (start, end) = slice_range(units.len(), args);
            Value::from(String::from_utf16_lossy(&units[start..end]))
        }
        _ => return None,
    })
}

fn array_method(items: &[Value], name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "join" => Value::from(join(items, &arg(args, 0))),
        "toString" => Value::from(join(items, &Value::UNDEFINED)),
        "includes" => {
            let needle = arg(args, 0);
            Value::from(items.iter().any(|x| same_value_zero(x, &needle)))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let pos = items.iter().position(|x| strict_eq(x, &needle));
            Value::from(pos.map_or(-1.0, |x| x as f64))
        }
        "slice" => {
            let (start, end) = slice_range(items.len(), args);
            Value::from(items[start..end].to_vec())
        }
        _ => return None,
    })
}

/// Invokes a built-in method on a value.
///
/// Returns `None` if the value has no method of that name.
pub fn call_method(value: &Value, name: &str, args: &[Value]) -> Option<Value> {
    match value.0 {
        ValueRepr::String(ref s) => string_method(s, name, args),
        ValueRepr::Array(ref items) => array_method(items, name, args),
        ValueRepr::Bool(_) | ValueRepr::Number(_) if name == "toString" => {
            Some(Value::from(value.to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn call(value: impl Into<Value>, name: &str, args: &[Value]) -> Value {
        call_method(&value.into(), name, args).unwrap()
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(call("Hello", "toUpperCase", &[]), Value::from("HELLO"));
        assert_eq!(call(" x ", "trim", &[]), Value::from("x"));
        assert_eq!(
            call("hello", "indexOf", &[Value::from("l")]),
            Value::from(2)
        );
        assert_eq!(
            call("hello", "indexOf", &[Value::from("z")]),
            Value::from(-1)
        );
        assert_eq!(
            call("hello", "slice", &[Value::from(1), Value::from(-1)]),
            Value::from("ell")
        );
        assert_eq!(call("hello", "slice", &[Value::from(-2)]), Value::from("lo"));
        assert_eq!(
            call("hello", "slice", &[Value::from(4), Value::from(1)]),
            Value::from("")
        );
        assert_eq!(
            call("hello", "startsWith", &[Value::from("he")]),
            Value::from(true)
        );
        assert!(call_method(&Value::from("x"), "nope", &[]).is_none());
    }

    #[test]
    fn test_array_methods() {
        let arr = Value::from(vec![Value::from(1), Value::NULL, Value::from("a")]);
        assert_eq!(call(arr.clone(), "join", &[]), Value::from("1,,a"));
        assert_eq!(
            call(arr.clone(), "join", &[Value::from(" | ")]),
            Value::from("1 |  | a")
        );
        assert_eq!(
            call(arr.clone(), "indexOf", &[Value::from("a")]),
            Value::from(2)
        );
        assert_eq!(
            call(arr.clone(), "includes", &[Value::from(1)]),
            Value::from(true)
        );
        assert_eq!(
            call(arr, "slice", &[Value::from(1)]).to_string(),
            ",a"
        );
        assert_eq!(
            call(Value::from(vec![f64::NAN]), "includes", &[Value::from(f64::NAN)]),
            Value::from(true)
        );
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(call(2.5, "toString", &[]), Value::from("2.5"));
        assert!(call_method(&Value::from(2.5), "toFixed", &[]).is_none());
    }
}
