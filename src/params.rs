//! Name-keyed table of geometry constants.
//!
//! Parameters are defined once, in order, through a [`ParameterStoreBuilder`].
//! A derived parameter may only reference parameters that were defined before
//! it. Once built, the [`ParameterStore`] is immutable and is handed by
//! reference to every component that needs geometry inputs.

use polars::prelude::*;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Millimetre, the base length unit.
pub const MM: f64 = 1.0;
/// Centimetre in millimetres.
pub const CM: f64 = 10.0;
/// Metre in millimetres.
pub const M: f64 = 1000.0;
/// One degree in radians.
pub const DEG: f64 = std::f64::consts::PI / 180.0;
/// Largest value accepted by [`ParameterStore::count`]
pub const MAX_COUNT: u32 = u32::MAX;

/// Error type for parameter definition and lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter with this name was already defined
    Redefined(String),
    /// A derived parameter references a name that is not defined (yet)
    UnknownDependency {
        /// Parameter being defined
        name: String,
        /// Name it depends on
        dependency: String,
    },
    /// Lookup of a name that is not in the store
    Unknown(String),
    /// Required parameters absent after the definition pass
    Missing(Vec<String>),
    /// The value is NaN or infinite
    NonFinite(String),
    /// The value was expected to be a non-negative integer
    NotACount {
        /// Parameter name
        name: String,
        /// Offending value
        value: f64,
    },
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::Redefined(name) => write!(f, "Parameter {name} is already defined"),
            ParameterError::UnknownDependency { name, dependency } => write!(
                f,
                "Parameter {name} depends on {dependency}, which is not defined"
            ),
            ParameterError::Unknown(name) => write!(f, "Unknown parameter {name}"),
            ParameterError::Missing(names) => {
                write!(f, "Missing required parameters: {}", names.join(", "))
            }
            ParameterError::NonFinite(name) => write!(f, "Parameter {name} is not finite"),
            ParameterError::NotACount { name, value } => {
                write!(f, "Parameter {name} = {value} is not a sensor count")
            }
        }
    }
}

impl std::error::Error for ParameterError {}

/// Ordered definition pass for a [`ParameterStore`].
#[derive(Debug, Default)]
pub struct ParameterStoreBuilder {
    values: HashMap<String, f64>,
    order: Vec<String>,
}

impl ParameterStoreBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a leaf parameter.
    pub fn define(&mut self, name: &str, value: f64) -> Result<&mut Self, ParameterError> {
        if self.values.contains_key(name) {
            return Err(ParameterError::Redefined(name.to_string()));
        }
        if !value.is_finite() {
            return Err(ParameterError::NonFinite(name.to_string()));
        }
        trace!("{name} = {value}");
        self.values.insert(name.to_string(), value);
        self.order.push(name.to_string());
        Ok(self)
    }

    /// Define a parameter computed from previously defined ones.
    ///
    /// The closure receives the dependency values in the order of `deps`.
    pub fn derive<F>(&mut self, name: &str, deps: &[&str], f: F) -> Result<&mut Self, ParameterError>
    where
        F: FnOnce(&[f64]) -> f64,
    {
        let vals = deps
            .iter()
            .map(|dep| {
                self.values
                    .get(*dep)
                    .copied()
                    .ok_or_else(|| ParameterError::UnknownDependency {
                        name: name.to_string(),
                        dependency: dep.to_string(),
                    })
            })
            .collect::<Result<Vec<f64>, ParameterError>>()?;
        self.define(name, f(&vals))
    }

    /// Sum of previously defined parameters, the most common derivation.
    pub fn sum(&mut self, name: &str, deps: &[&str]) -> Result<&mut Self, ParameterError> {
        self.derive(name, deps, |v| v.iter().sum())
    }

    /// Freeze the table, checking that every `required` name was defined.
    pub fn build(self, required: &[&str]) -> Result<ParameterStore, ParameterError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !self.values.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ParameterError::Missing(missing));
        }
        Ok(ParameterStore {
            values: self.values,
            order: self.order,
        })
    }
}

/// Immutable table of geometry constants.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    values: HashMap<String, f64>,
    order: Vec<String>,
}

impl ParameterStore {
    /// Start an ordered definition pass.
    pub fn builder() -> ParameterStoreBuilder {
        ParameterStoreBuilder::new()
    }

    /// Value of a parameter.
    ///
    /// Panics if `name` was never defined: every consumer must only ask for
    /// names validated when the store was built.
    pub fn get(&self, name: &str) -> f64 {
        match self.values.get(name) {
            Some(v) => *v,
            None => panic!("Unknown geometry parameter {name}"),
        }
    }

    /// Value of a parameter, or [`ParameterError::Unknown`].
    pub fn try_get(&self, name: &str) -> Result<f64, ParameterError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| ParameterError::Unknown(name.to_string()))
    }

    /// A parameter holding a number of sensors, rows or columns.
    ///
    /// Fails unless the value is a whole number in `[0, MAX_COUNT]`.
    pub fn count(&self, name: &str) -> Result<usize, ParameterError> {
        let value = self.try_get(name)?;
        if value < 0.0 || value > MAX_COUNT as f64 || value.fract() != 0.0 {
            return Err(ParameterError::NotACount {
                name: name.to_string(),
                value,
            });
        }
        Ok(value as usize)
    }

    /// Whether `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no parameter is defined.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Parameters in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.values[name.as_str()]))
    }

    /// Copy of the store with some existing values replaced.
    ///
    /// Derived parameters are not recomputed, so overrides are meant for the
    /// leaf values the layout reads directly.
    pub fn with_overrides(&self, overrides: &[(&str, f64)]) -> Result<ParameterStore, ParameterError> {
        if let Some((name, _)) = overrides.iter().find(|(name, _)| !self.contains(name)) {
            return Err(ParameterError::Unknown(name.to_string()));
        }
        let mut store = self.clone();
        for (name, value) in overrides {
            if !value.is_finite() {
                return Err(ParameterError::NonFinite(name.to_string()));
            }
            store.values.insert(name.to_string(), *value);
        }
        Ok(store)
    }
}

/// Parameter table as a DataFrame with `name` and `value` columns.
pub fn params_to_df(store: &ParameterStore) -> DataFrame {
    df!(
        "name" => store.iter().map(|(n, _)| n.to_string()).collect::<Vec<String>>(),
        "value" => store.iter().map(|(_, v)| v).collect::<Vec<f64>>(),
    )
    .unwrap()
}
