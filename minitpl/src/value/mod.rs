//! Provides a dynamic value type abstraction.
//!
//! This module gives access to a dynamically typed value which is used by
//! the template engine during execution.  The semantics of the value follow
//! the ones of JavaScript values closely since the expressions embedded in
//! templates are JavaScript-like: there is an `undefined` value that is
//! distinct from `null`, numbers are always IEEE-754 doubles and converting
//! a value to a string yields what `String(value)` would yield.
//!
//! # Converting Values
//!
//! Values are typically created via the [`From`] trait:
//!
//! ```
//! # use minitpl::value::Value;
//! let int_value = Value::from(42);
//! let none_value = Value::from(());
//! let true_value = Value::from(true);
//! ```
//!
//! Or via the [`FromIterator`] trait:
//!
//! ```
//! # use minitpl::value::Value;
//! // collection into a sequence
//! let value: Value = (1..10).into_iter().collect();
//! ```
//!
//! Anything that implements [`Serialize`] can be converted with
//! [`Value::from_serialize`]:
//!
//! ```
//! # use minitpl::value::Value;
//! #[derive(serde::Serialize)]
//! struct User { name: String }
//! let user = Value::from_serialize(&User { name: "Peter".into() });
//! assert_eq!(user.kind(), minitpl::value::ValueKind::Object);
//! ```
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{Error, ErrorKind};

pub(crate) mod ops;

#[cfg(feature = "builtins")]
pub(crate) mod methods;

/// The map type used for objects.
#[cfg(not(feature = "preserve_order"))]
pub type ValueMap = std::collections::BTreeMap<String, Value>;

/// The map type used for objects.
#[cfg(feature = "preserve_order")]
pub type ValueMap = indexmap::IndexMap<String, Value>;

type FunctionImpl = dyn Fn(&[Value]) -> Result<Value, Error> + Sync + Send;

/// A native function that can be called from templates.
pub(crate) struct Function {
    name: Cow<'static, str>,
    f: Box<FunctionImpl>,
}

/// Describes the kind of value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ValueKind {
    /// The value is `undefined`
    Undefined,
    /// The value is `null`
    Null,
    /// The value is a [`bool`]
    Bool,
    /// The value is a number
    Number,
    /// The value is a string.
    String,
    /// The value is an array of other values.
    Array,
    /// The value is a key/value mapping.
    Object,
    /// The value is a callable function.
    Function,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Function => "function",
        })
    }
}

#[derive(Clone)]
pub(crate) enum ValueRepr {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Object(Arc<ValueMap>),
    Function(Arc<Function>),
}

/// Represents a dynamically typed value in the template engine.
#[derive(Clone)]
pub struct Value(pub(crate) ValueRepr);

impl Default for Value {
    fn default() -> Value {
        Value::UNDEFINED
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (ValueRepr::Undefined, ValueRepr::Undefined) => true,
            (ValueRepr::Null, ValueRepr::Null) => true,
            (ValueRepr::Bool(a), ValueRepr::Bool(b)) => a == b,
            (ValueRepr::Number(a), ValueRepr::Number(b)) => a == b,
            (ValueRepr::String(a), ValueRepr::String(b)) => a == b,
            (ValueRepr::Array(a), ValueRepr::Array(b)) => a == b,
            (ValueRepr::Object(a), ValueRepr::Object(b)) => a == b,
            (ValueRepr::Function(a), ValueRepr::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ValueRepr::Undefined => f.write_str("undefined"),
            ValueRepr::Null => f.write_str("null"),
            ValueRepr::Bool(val) => fmt::Debug::fmt(&val, f),
            ValueRepr::Number(val) => f.write_str(&format_number(val)),
            ValueRepr::String(ref val) => fmt::Debug::fmt(val, f),
            ValueRepr::Array(ref val) => f.debug_list().entries(val.iter()).finish(),
            ValueRepr::Object(ref val) => f.debug_map().entries(val.iter()).finish(),
            ValueRepr::Function(ref val) => write!(f, "<function {}>", val.name),
        }
    }
}

/// Converts the value into a string the way JavaScript's `String()` does.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ValueRepr::Undefined => f.write_str("undefined"),
            ValueRepr::Null => f.write_str("null"),
            ValueRepr::Bool(val) => fmt::Display::fmt(&val, f),
            ValueRepr::Number(val) => f.write_str(&format_number(val)),
            ValueRepr::String(ref val) => f.write_str(val),
            ValueRepr::Array(ref items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        ok!(f.write_str(","));
                    }
                    if !item.is_nullish() {
                        ok!(fmt::Display::fmt(item, f));
                    }
                }
                Ok(())
            }
            ValueRepr::Object(_) => f.write_str("[object Object]"),
            ValueRepr::Function(ref func) => {
                write!(f, "function {}() {{ [native code] }}", func.name)
            }
        }
    }
}

/// Formats a number like `Number.prototype.toString` does.
pub(crate) fn format_number(num: f64) -> String {
    if num.is_nan() {
        "NaN".into()
    } else if num == 0.0 {
        // also catches negative zero
        "0".into()
    } else if num.is_infinite() {
        let rv = if num > 0.0 { "Infinity" } else { "-Infinity" };
        rv.into()
    } else if (1e-6..1e21).contains(&num.abs()) {
        num.to_string()
    } else {
        let rv = format!("{num:e}");
        match rv.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => rv,
        }
    }
}

impl Value {
    /// The `undefined` value.
    pub const UNDEFINED: Value = Value(ValueRepr::Undefined);

    /// The `null` value.
    pub const NULL: Value = Value(ValueRepr::Null);

    /// Creates a value from something that can be serialized.
    ///
    /// This is the method that the [`context!`](crate::context!) macro uses.
    /// If serialization fails the result is `undefined`; use
    /// [`try_from_serialize`](Self::try_from_serialize) to see the error.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Value {
        Value::try_from_serialize(value).unwrap_or_default()
    }

    /// Creates a value from something that can be serialized, reporting failures.
    pub fn try_from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
        serde_json::to_value(value).map(Value::from).map_err(|err| {
            Error::new(
                ErrorKind::BadSerialization,
                "unable to convert value for the template engine",
            )
            .with_source(err)
        })
    }

    /// Creates a callable value from a native function.
    ///
    /// ```
    /// # use minitpl::value::Value;
    /// let shout = Value::from_function("shout", |args: &[Value]| {
    ///     Ok(Value::from(format!("{}!", args[0])))
    /// });
    /// ```
    pub fn from_function<N, F>(name: N, f: F) -> Value
    where
        N: Into<Cow<'static, str>>,
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Value(ValueRepr::Function(Arc::new(Function {
            name: name.into(),
            f: Box::new(f),
        })))
    }

    /// Returns the kind of the value.
    pub fn kind(&self) -> ValueKind {
        match self.0 {
            ValueRepr::Undefined => ValueKind::Undefined,
            ValueRepr::Null => ValueKind::Null,
            ValueRepr::Bool(_) => ValueKind::Bool,
            ValueRepr::Number(_) => ValueKind::Number,
            ValueRepr::String(_) => ValueKind::String,
            ValueRepr::Array(_) => ValueKind::Array,
            ValueRepr::Object(_) => ValueKind::Object,
            ValueRepr::Function(_) => ValueKind::Function,
        }
    }

    /// Is this value truthy?
    ///
    /// `false`, `0`, `NaN`, the empty string, `null` and `undefined` are
    /// falsy, everything else is truthy.
    pub fn is_true(&self) -> bool {
        match self.0 {
            ValueRepr::Undefined | ValueRepr::Null => false,
            ValueRepr::Bool(val) => val,
            ValueRepr::Number(val) => val != 0.0 && !val.is_nan(),
            ValueRepr::String(ref val) => !val.is_empty(),
            ValueRepr::Array(_) | ValueRepr::Object(_) | ValueRepr::Function(_) => true,
        }
    }

    /// Is this value undefined?
    pub fn is_undefined(&self) -> bool {
        matches!(self.0, ValueRepr::Undefined)
    }

    /// Is this value `null` or `undefined`?
    pub fn is_nullish(&self) -> bool {
        matches!(self.0, ValueRepr::Undefined | ValueRepr::Null)
    }

    /// If the value is a string, return it.
    pub fn as_str(&self) -> Option<&str> {
        match self.0 {
            ValueRepr::String(ref s) => Some(s),
            _ => None,
        }
    }

    /// If the value is a number, return it.
    pub fn as_f64(&self) -> Option<f64> {
        match self.0 {
            ValueRepr::Number(n) => Some(n),
            _ => None,
        }
    }

    /// If the value is an array, return its items.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self.0 {
            ValueRepr::Array(ref items) => Some(items),
            _ => None,
        }
    }

    /// If the value is an object, return its map.
    pub fn as_object(&self) -> Option<&ValueMap> {
        match self.0 {
            ValueRepr::Object(ref map) => Some(map),
            _ => None,
        }
    }

    /// Is this value callable?
    pub fn is_callable(&self) -> bool {
        matches!(self.0, ValueRepr::Function(_))
    }

    /// Calls the value if it's a function.
    pub fn call(&self, args: &[Value]) -> Result<Value, Error> {
        match self.0 {
            ValueRepr::Function(ref func) => (func.f)(args),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("{} is not a function", self.kind()),
            )),
        }
    }

    /// Converts the value into a number like JavaScript's `Number()` does.
    pub fn to_number(&self) -> f64 {
        match self.0 {
            ValueRepr::Undefined => f64::NAN,
            ValueRepr::Null => 0.0,
            ValueRepr::Bool(val) => val as u8 as f64,
            ValueRepr::Number(val) => val,
            ValueRepr::String(ref val) => str_to_number(val),
            ValueRepr::Array(_) | ValueRepr::Object(_) | ValueRepr::Function(_) => {
                str_to_number(&self.to_string())
            }
        }
    }

    /// Returns the name `typeof` reports for this value.
    pub fn type_of(&self) -> &'static str {
        match self.0 {
            ValueRepr::Undefined => "undefined",
            ValueRepr::Bool(_) => "boolean",
            ValueRepr::Number(_) => "number",
            ValueRepr::String(_) => "string",
            ValueRepr::Null | ValueRepr::Array(_) | ValueRepr::Object(_) => "object",
            ValueRepr::Function(_) => "function",
        }
    }
}

fn str_to_number(s: &str) -> f64 {
    let s = crate::utils::js_trim(s);
    if s.is_empty() {
        return 0.0;
    }
    let radix = match s.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => 10,
    };
    if radix != 10 {
        return u64::from_str_radix(&s[2..], radix).map_or(f64::NAN, |x| x as f64);
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if s
            .bytes()
            .all(|c| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.' | b'e' | b'E')) =>
        {
            s.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

impl From<()> for Value {
    #[inline(always)]
    fn from(_: ()) -> Value {
        Value::NULL
    }
}

impl From<bool> for Value {
    #[inline(always)]
    fn from(val: bool) -> Value {
        Value(ValueRepr::Bool(val))
    }
}

macro_rules! value_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                #[inline(always)]
                fn from(val: $ty) -> Value {
                    Value(ValueRepr::Number(val as f64))
                }
            }
        )*
    };
}

value_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<'a> From<&'a str> for Value {
    #[inline(always)]
    fn from(val: &'a str) -> Value {
        Value(ValueRepr::String(Arc::from(val)))
    }
}

impl From<String> for Value {
    #[inline(always)]
    fn from(val: String) -> Value {
        Value(ValueRepr::String(Arc::from(val)))
    }
}

impl<'a> From<Cow<'a, str>> for Value {
    #[inline(always)]
    fn from(val: Cow<'a, str>) -> Value {
        match val {
            Cow::Borrowed(x) => x.into(),
            Cow::Owned(x) => x.into(),
        }
    }
}

impl From<Arc<str>> for Value {
    #[inline(always)]
    fn from(val: Arc<str>) -> Value {
        Value(ValueRepr::String(val))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Value {
        Value(ValueRepr::Array(Arc::new(
            val.into_iter().map(Into::into).collect(),
        )))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Value {
        match val {
            Some(val) => val.into(),
            None => Value::NULL,
        }
    }
}

impl From<ValueMap> for Value {
    fn from(val: ValueMap) -> Value {
        Value(ValueRepr::Object(Arc::new(val)))
    }
}

impl From<Arc<ValueMap>> for Value {
    fn from(val: Arc<ValueMap>) -> Value {
        Value(ValueRepr::Object(val))
    }
}

impl<V: Into<Value>> FromIterator<V> for Value {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        Value(ValueRepr::Array(Arc::new(
            iter.into_iter().map(Into::into).collect(),
        )))
    }
}

impl From<serde_json::Value> for Value {
    fn from(val: serde_json::Value) -> Value {
        match val {
            serde_json::Value::Null => Value::NULL,
            serde_json::Value::Bool(val) => Value::from(val),
            serde_json::Value::Number(num) => Value::from(num.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(val) => Value::from(val),
            serde_json::Value::Array(items) => items.into_iter().map(Value::from).collect(),
            serde_json::Value::Object(map) => Value::from(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<ValueMap>(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            ValueRepr::Undefined | ValueRepr::Null | ValueRepr::Function(_) => {
                serializer.serialize_unit()
            }
            ValueRepr::Bool(val) => serializer.serialize_bool(val),
            ValueRepr::Number(val) => {
                if val.fract() == 0.0 && val.abs() < 9007199254740992.0 {
                    serializer.serialize_i64(val as i64)
                } else {
                    serializer.serialize_f64(val)
                }
            }
            ValueRepr::String(ref val) => serializer.serialize_str(val),
            ValueRepr::Array(ref items) => {
                let mut seq = ok!(serializer.serialize_seq(Some(items.len())));
                for item in items.iter() {
                    ok!(seq.serialize_element(item));
                }
                seq.end()
            }
            ValueRepr::Object(ref map) => {
                let mut m = ok!(serializer.serialize_map(Some(map.len())));
                for (key, value) in map.iter() {
                    ok!(m.serialize_entry(key, value));
                }
                m.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_number_formatting() {
        assert_eq!(Value::from(5).to_string(), "5");
        assert_eq!(Value::from(-0.0).to_string(), "0");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Value::from(1e21).to_string(), "1e+21");
        assert_eq!(Value::from(1.5e-7).to_string(), "1.5e-7");
        assert_eq!(Value::from(0.000001).to_string(), "0.000001");
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::from(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn test_string_conversion() {
        let arr = Value::from(vec![Value::from(1), Value::NULL, Value::from("x")]);
        assert_eq!(arr.to_string(), "1,,x");
        let nested = Value::from(vec![Value::from(vec![1, 2]), Value::from(3)]);
        assert_eq!(nested.to_string(), "1,2,3");
        assert_eq!(Value::from(ValueMap::new()).to_string(), "[object Object]");
        assert_eq!(Value::UNDEFINED.to_string(), "undefined");
        assert_eq!(Value::from(()).to_string(), "null");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from("  42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::from("0x10").to_number(), 16.0);
        assert_eq!(Value::from("-Infinity").to_number(), f64::NEG_INFINITY);
        assert!(Value::from("inf").to_number().is_nan());
        assert!(Value::from("12px").to_number().is_nan());
        assert!(Value::UNDEFINED.to_number().is_nan());
        assert_eq!(Value::NULL.to_number(), 0.0);
        assert_eq!(Value::from(true).to_number(), 1.0);
        assert_eq!(Value::from(vec![7]).to_number(), 7.0);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::from(0).is_true());
        assert!(!Value::from(f64::NAN).is_true());
        assert!(!Value::from("").is_true());
        assert!(Value::from("0").is_true());
        assert!(Value::from(Vec::<Value>::new()).is_true());
    }

    #[test]
    fn test_from_serialize() {
        #[derive(serde::Serialize)]
        struct Item<'a> {
            name: &'a str,
            tags: Vec<&'a str>,
            price: Option<f64>,
        }

        let value = Value::from_serialize(&Item {
            name: "Widget",
            tags: vec!["a", "b"],
            price: None,
        });
        let map = value.as_object().unwrap();
        assert_eq!(map["name"], Value::from("Widget"));
        assert_eq!(map["tags"].to_string(), "a,b");
        assert_eq!(map["price"], Value::NULL);
    }

    #[test]
    fn test_serialize_roundtrip_through_json() {
        let value = Value::from_serialize(&serde_json::json!({"a": [1, 2.5, "x", null]}));
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"a":[1,2.5,"x",null]}"#
        );
    }
}
