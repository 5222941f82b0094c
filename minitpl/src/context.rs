use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::value::{Value, ValueMap};

/// The data a template is rendered against.
///
/// A context maps names to [`Value`]s.  Expressions in a template refer to
/// these names as free variables, and `this` evaluates to the whole context
/// as an object.
///
/// Rendering mutates the context: the escaper is stored under the reserved
/// key [`ESCAPER_KEY`](crate::ESCAPER_KEY), replacing whatever the caller may
/// have put there.  A context must therefore not be shared between renders
/// that run concurrently.
///
/// ```
/// # use minitpl::Context;
/// let mut ctx = Context::new();
/// ctx.insert("name", "World");
/// assert_eq!(minitpl::render("<p><% name %></p>", &mut ctx).unwrap(), "<p>World</p>");
/// assert!(ctx.contains_key("escapeHTML"));
/// ```
#[derive(Clone, Default)]
pub struct Context {
    vars: Arc<ValueMap>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.vars.iter()).finish()
    }
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Context {
        Context::default()
    }

    /// Creates a context from a serializable value.
    ///
    /// The value has to serialize into a map (a struct, a map or similar).
    /// A unit value or `None` produces an empty context.
    pub fn from_serialize<S: Serialize + ?Sized>(value: &S) -> Result<Context, Error> {
        let value = ok!(Value::try_from_serialize(value));
        if value.is_nullish() {
            return Ok(Context::new());
        }
        match value.as_object() {
            Some(map) => Ok(Context {
                vars: Arc::new(map.clone()),
            }),
            None => Err(Error::new(
                ErrorKind::BadSerialization,
                format!("context must be a map, got {}", value.kind()),
            )),
        }
    }

    /// Inserts a variable, returning the value it replaced.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        Arc::make_mut(&mut self.vars).insert(key.into(), value.into())
    }

    /// Looks up a variable.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Removes a variable, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let vars = Arc::make_mut(&mut self.vars);
        #[cfg(feature = "preserve_order")]
        {
            vars.shift_remove(key)
        }
        #[cfg(not(feature = "preserve_order"))]
        {
            vars.remove(key)
        }
    }

    /// Checks if a variable is defined.
    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Returns the number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if there are no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the context as an object value.
    ///
    /// This is what `this` evaluates to within a template.
    pub fn as_value(&self) -> Value {
        Value::from(self.vars.clone())
    }
}

impl From<ValueMap> for Context {
    fn from(vars: ValueMap) -> Context {
        Context {
            vars: Arc::new(vars),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Context::from(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<ValueMap>(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Context {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        Arc::make_mut(&mut self.vars).extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_from_serialize() {
        #[derive(serde::Serialize)]
        struct Page {
            title: &'static str,
            count: u32,
        }

        let ctx = Context::from_serialize(&Page {
            title: "Index",
            count: 3,
        })
        .unwrap();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.get("title"), Some(&Value::from("Index")));
        assert_eq!(ctx.get("count"), Some(&Value::from(3)));

        assert!(Context::from_serialize(&()).unwrap().is_empty());

        let err = Context::from_serialize(&[1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadSerialization);
        assert_eq!(
            err.to_string(),
            "could not serialize to internal format: context must be a map, got array"
        );
    }

    #[test]
    fn test_this_is_a_snapshot() {
        let mut ctx: Context = [("a", 1)].into_iter().collect();
        let this = ctx.as_value();
        ctx.insert("b", 2);
        assert_eq!(this.as_object().unwrap().len(), 1);
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.remove("a"), Some(Value::from(1)));
        assert!(!ctx.contains_key("a"));
    }
}
