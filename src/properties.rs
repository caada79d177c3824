//! Descriptive properties attached to every data-bearing construct
//!
//! A property describes an aspect of a construct that is independent of its
//! data, such as `standard_name`, `units` or `_FillValue`. Values are owned by
//! the container: inserting a value moves it in, so a caller that wants to
//! keep using its own copy passes a clone.

use crate::equals::{is_close, EqualsOptions};
use crate::errors::{CfError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Value of a single property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Strs(Vec<String>),
    Int(i64),
    Ints(Vec<i64>),
    Float(f64),
    Floats(Vec<f64>),
}

impl PropertyValue {
    /// Numeric elements as `f64`, or `None` for string values
    pub fn as_f64s(&self) -> Option<Vec<f64>> {
        match self {
            Self::Int(v) => Some(vec![*v as f64]),
            Self::Ints(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Self::Float(v) => Some(vec![*v]),
            Self::Floats(v) => Some(v.clone()),
            Self::Str(_) | Self::Strs(_) => None,
        }
    }

    /// First numeric element, if any
    pub fn as_f64(&self) -> Option<f64> {
        self.as_f64s().and_then(|v| v.first().copied())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Str(_) | Self::Strs(_))
    }

    /// Compare two values element-wise within tolerance, ignoring whether
    /// numbers are stored as integers or floats.
    pub fn is_close(&self, other: &Self, atol: f64, rtol: f64) -> bool {
        match (self.as_f64s(), other.as_f64s()) {
            (Some(x), Some(y)) => {
                x.len() == y.len()
                    && x.iter().zip(&y).all(|(&a, &b)| is_close(a, b, atol, rtol))
            }
            (None, None) => match (self, other) {
                (Self::Str(a), Self::Str(b)) => a == b,
                (Self::Strs(a), Self::Strs(b)) => a == b,
                (Self::Str(a), Self::Strs(b)) | (Self::Strs(b), Self::Str(a)) => {
                    b.len() == 1 && &b[0] == a
                }
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
            write!(f, "[{}]", parts.join(", "))
        }

        match self {
            Self::Str(v) => write!(f, "{v}"),
            Self::Strs(v) => list(f, v),
            Self::Int(v) => write!(f, "{v}"),
            Self::Ints(v) => list(f, v),
            Self::Float(v) => write!(f, "{v}"),
            Self::Floats(v) => list(f, v),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        Self::Strs(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(v: Vec<i64>) -> Self {
        Self::Ints(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Floats(v)
    }
}

/// Key/value store of descriptive properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    values: BTreeMap<String, PropertyValue>,
}

/// Properties listed ahead of `ncvar%` and left out of the sorted tail
const NAME_PRIORITY: [&str; 2] = ["cf_role", "long_name"];

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a property, failing if it is not set
    pub fn get_property(&self, name: &str) -> Result<&PropertyValue> {
        self.get_property_for(name, || "Properties".to_string())
    }

    /// [`get_property`](Self::get_property), naming `owner` in the error
    pub fn get_property_for(
        &self,
        name: &str,
        owner: impl FnOnce() -> String,
    ) -> Result<&PropertyValue> {
        self.values
            .get(name)
            .ok_or_else(|| CfError::PropertyNotFound {
                owner: owner(),
                name: name.to_string(),
            })
    }

    /// Return a property, or `default` if it is not set
    pub fn get_property_or<'a>(
        &'a self,
        name: &str,
        default: &'a PropertyValue,
    ) -> &'a PropertyValue {
        self.values.get(name).unwrap_or(default)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set a property, returning any value it replaces
    pub fn set_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.values.insert(name.into(), value.into())
    }

    /// Remove a property, returning its value if it was set
    pub fn del_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.values.remove(name)
    }

    /// Snapshot of all properties
    pub fn properties(&self) -> BTreeMap<String, PropertyValue> {
        self.values.clone()
    }

    /// Replace every property at once, returning the previous mapping
    pub fn replace_properties(
        &mut self,
        properties: BTreeMap<String, PropertyValue>,
    ) -> BTreeMap<String, PropertyValue> {
        std::mem::replace(&mut self.values, properties)
    }

    /// Remove every property, returning the previous mapping
    pub fn clear_properties(&mut self) -> BTreeMap<String, PropertyValue> {
        std::mem::take(&mut self.values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.values.iter()
    }

    /// All identifying names, most specific first.
    ///
    /// The order is `standard_name`, `cf_role=…`, `long_name=…`, the netCDF
    /// variable name as `ncvar%…`, then every property other than `cf_role`
    /// and `long_name` as `key=value` sorted by key. `standard_name` appears
    /// both first and in the sorted tail.
    pub fn names(&self, nc_variable: Option<&str>) -> Vec<String> {
        let mut out = Vec::with_capacity(self.values.len() + 1);

        if let Some(v) = self.values.get("standard_name") {
            out.push(v.to_string());
        }
        if let Some(v) = self.values.get("cf_role") {
            out.push(format!("cf_role={v}"));
        }
        if let Some(v) = self.values.get("long_name") {
            out.push(format!("long_name={v}"));
        }
        if let Some(ncvar) = nc_variable {
            out.push(format!("ncvar%{ncvar}"));
        }

        out.extend(
            self.values
                .iter()
                .filter(|(k, _)| !NAME_PRIORITY.contains(&k.as_str()))
                .map(|(k, v)| format!("{k}={v}")),
        );

        out
    }

    /// The most specific identifying name, or `default`
    pub fn name(&self, nc_variable: Option<&str>, default: Option<&str>) -> Option<String> {
        if let Some(v) = self.values.get("standard_name") {
            return Some(v.to_string());
        }
        if let Some(v) = self.values.get("cf_role") {
            return Some(format!("cf_role={v}"));
        }
        if let Some(v) = self.values.get("long_name") {
            return Some(format!("long_name={v}"));
        }
        nc_variable
            .map(|ncvar| format!("ncvar%{ncvar}"))
            .or_else(|| default.map(str::to_string))
    }

    /// Whether two property sets are equal.
    ///
    /// Key sets must match after removing ignored properties; numeric values
    /// are compared within tolerance regardless of their stored type.
    pub fn equals(&self, other: &Self, options: &EqualsOptions) -> bool {
        let (atol, rtol) = options.tolerances();

        let self_keys: BTreeSet<&str> = self
            .values
            .keys()
            .map(String::as_str)
            .filter(|k| !options.ignores_property(k))
            .collect();
        let other_keys: BTreeSet<&str> = other
            .values
            .keys()
            .map(String::as_str)
            .filter(|k| !options.ignores_property(k))
            .collect();

        if self_keys != other_keys {
            if options.verbose {
                for name in self_keys.symmetric_difference(&other_keys) {
                    tracing::info!("Properties: Non-common property name: {name}");
                }
            }
            return false;
        }

        for name in self_keys {
            let x = &self.values[name];
            let y = &other.values[name];
            if !x.is_close(y, atol, rtol) {
                if options.verbose {
                    tracing::info!("Properties: Different {name}: {x:?}, {y:?}");
                }
                return false;
            }
        }

        true
    }
}

impl FromIterator<(String, PropertyValue)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, PropertyValue>> for Properties {
    fn from(values: BTreeMap<String, PropertyValue>) -> Self {
        Self { values }
    }
}
