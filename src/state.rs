use std::{collections::BTreeMap, fmt, ops::Index, rc::Rc};

use serde::{de::DeserializeOwned, ser::SerializeMap, Serialize};
use serde_json::{Map, Value};

use crate::{ActionError, StoreError};

#[cfg(test)]
mod tests;

/// An immutable snapshot of a store's fields.
///
/// Cloning is cheap. A commit never mutates a snapshot in place: it produces a new one in which
/// untouched fields share their `Rc` with the previous snapshot.
#[derive(Clone, Default)]
pub struct State(Rc<BTreeMap<String, Rc<Value>>>);

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from a JSON object.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(map) => Ok(map.into()),
            other => Err(StoreError::InvalidState(kind_of(&other).into())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).map(|v| &**v)
    }

    /// Returns the shared handle of a field.
    ///
    /// The handle is the same allocation in every snapshot until the field is overwritten,
    /// so [`equality::ptr_eq`](crate::equality::ptr_eq) can detect changes without comparing contents.
    pub fn field(&self, name: &str) -> Option<Rc<Value>> {
        self.0.get(name).cloned()
    }

    /// Deserializes a field. Returns `None` if the field is absent or has another shape.
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        T::deserialize(self.get(name)?).ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), &**v))
    }

    /// Returns `true` if both snapshots are the same aggregate.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }

    /// Shallow merge: every field of `patch` overwrites, every other field is kept as is.
    ///
    /// `Value::Null` in a patch is stored like any other value. Fields are never removed.
    pub fn merge(&self, patch: Patch) -> Self {
        let mut fields = (*self.0).clone();
        for (name, value) in patch.0 {
            fields.insert(name, Rc::new(value));
        }
        Self(Rc::new(fields))
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), (**v).clone()))
                .collect(),
        )
    }
}

impl Index<&str> for State {
    type Output = Value;

    /// Returns `Value::Null` for absent fields.
    fn index(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.get(name).unwrap_or(&NULL)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        State::ptr_eq(self, other) || self.0 == other.0
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Serialize for State {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl From<Map<String, Value>> for State {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for State {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(Rc::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Rc::new(v)))
                .collect(),
        ))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The fields an action changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch(BTreeMap<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, consuming and returning the patch.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Patch {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

/// Arguments passed to an action invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Deserializes the argument at `index`.
    ///
    /// Missing and `null` arguments yield `Ok(None)`, so optional arguments read as
    /// `args.get::<i64>(0)?.unwrap_or(1)`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, ActionError> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => T::deserialize(v)
                .map(Some)
                .map_err(|e| ActionError::new(format_args!("argument {index}: {e}"))),
        }
    }

    pub fn require<T: DeserializeOwned>(&self, index: usize) -> Result<T, ActionError> {
        self.get(index)?
            .ok_or_else(|| ActionError::new(format_args!("argument {index} is missing")))
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Self::new()
    }
}
impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}
impl<const N: usize> From<[Value; N]> for Args {
    fn from(values: [Value; N]) -> Self {
        Self(values.into())
    }
}
impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Builds a [`State`] from `"field" => value` pairs.
///
/// ```
/// let s = cellstore::state! { "count" => 0, "name" => "x" };
/// assert_eq!(s["count"], 0);
/// ```
#[macro_export]
macro_rules! state {
    ($($name:expr => $value:expr),* $(,)?) => {
        <$crate::State as ::std::iter::FromIterator<(::std::string::String, $crate::Value)>>::from_iter([
            $((::std::string::String::from($name), $crate::Value::from($value)),)*
        ])
    };
}

/// Builds a [`Patch`] from `"field" => value` pairs.
#[macro_export]
macro_rules! patch {
    ($($name:expr => $value:expr),* $(,)?) => {
        $crate::Patch::new()$(.with($name, $crate::Value::from($value)))*
    };
}

/// Builds [`Args`] from values convertible into [`Value`].
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        $crate::Args::from(::std::vec![$($crate::Value::from($value)),*])
    };
}
