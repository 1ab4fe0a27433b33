//! Coordinate state
//!
//! Tracks the absolute value of every axis referenced during a session and
//! the label each axis is written with.
//!
//! Keys are `x`, `y` and `z` for the three spatial roles and the label
//! itself for any other axis. A renamed role keeps accumulating under its
//! role key and, in addition, under its current label, which starts from
//! zero on every rename. Labels used before a rename keep their last value.

use crate::error::{GCodeError, Result};
use crate::request::MoveRequest;
use crate::validator;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
    Named(String),
}

impl Axis {
    pub fn named(label: impl Into<String>) -> Self {
        Axis::Named(label.into())
    }

    /// Key under which the axis is tracked regardless of its label
    pub fn key(&self) -> &str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::Named(name) => name,
        }
    }

    pub fn default_label(&self) -> &str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::Named(name) => name,
        }
    }

    pub fn is_role(&self) -> bool {
        !matches!(self, Axis::Named(_))
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default_label())
    }
}

/// Immutable snapshot of tracked positions, keyed as described above
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Position(BTreeMap<String, f64>);

impl Position {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.0
    }

    /// True when both snapshots hold the same keys with values within `tolerance`
    pub fn approx_eq(&self, other: &Position, tolerance: f64) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().all(|(key, value)| {
                other
                    .0
                    .get(key)
                    .map(|o| (o - value).abs() <= tolerance)
                    .unwrap_or(false)
            })
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Position {
    fn from(values: [(&str, f64); N]) -> Self {
        Position(values.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct CoordinateState {
    values: HashMap<String, f64>,
    labels: HashMap<Axis, String>,
    /// Named axes in first-seen order
    extras: Vec<Axis>,
}

impl Default for CoordinateState {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinateState {
    pub fn new() -> Self {
        let values = [Axis::X, Axis::Y, Axis::Z]
            .iter()
            .map(|axis| (axis.key().to_string(), 0.0))
            .collect();
        Self {
            values,
            labels: HashMap::new(),
            extras: Vec::new(),
        }
    }

    /// Label the axis is currently written with
    pub fn label<'a>(&'a self, axis: &'a Axis) -> &'a str {
        self.labels
            .get(axis)
            .map(String::as_str)
            .unwrap_or_else(|| axis.default_label())
    }

    pub fn is_renamed(&self, axis: &Axis) -> bool {
        self.labels.contains_key(axis)
    }

    /// Map a label written by the caller back to the axis it currently names
    pub fn resolve(&self, axis: &Axis) -> Axis {
        match axis {
            Axis::Named(name) => self
                .label_owner(name)
                .cloned()
                .unwrap_or_else(|| axis.clone()),
            role => role.clone(),
        }
    }

    /// Resolve every axis of `request`, rejecting two words for one axis
    pub fn resolve_request(&self, request: &MoveRequest) -> Result<Vec<(Axis, f64)>> {
        let mut resolved: Vec<(Axis, f64)> = Vec::with_capacity(request.len());
        for (axis, value) in request.axes() {
            let axis = self.resolve(axis);
            self.check(&axis)?;
            if resolved.iter().any(|(a, _)| *a == axis) {
                return Err(GCodeError::argument(format!(
                    "axis {} given twice",
                    self.label(&axis)
                )));
            }
            resolved.push((axis, value));
        }
        Ok(resolved)
    }

    /// Value under the axis key
    pub fn value(&self, axis: &Axis) -> f64 {
        self.values.get(axis.key()).copied().unwrap_or(0.0)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn is_known(&self, axis: &Axis) -> bool {
        axis.is_role() || self.extras.contains(axis)
    }

    /// Check that a named axis could be registered, without registering it
    pub fn check(&self, axis: &Axis) -> Result<()> {
        let Axis::Named(name) = axis else {
            return Ok(());
        };
        if self.extras.contains(axis) {
            return Ok(());
        }
        validator::axis_label(name)?;
        if ["x", "y", "z", "X", "Y", "Z"].contains(&name.as_str()) {
            return Err(GCodeError::argument(format!(
                "`{}` names a spatial role; use the role axis instead",
                name
            )));
        }
        if let Some(owner) = self.label_owner(name) {
            return Err(GCodeError::argument(format!(
                "axis label `{}` is already used by {}",
                name,
                owner.key()
            )));
        }
        if self.values.contains_key(name.as_str()) {
            return Err(GCodeError::argument(format!(
                "axis label `{}` was retired by a rename",
                name
            )));
        }
        Ok(())
    }

    /// Start tracking a named axis at zero
    pub fn register(&mut self, axis: &Axis) -> Result<()> {
        self.check(axis)?;
        if !self.is_known(axis) {
            self.values.insert(axis.key().to_string(), 0.0);
            self.extras.push(axis.clone());
        }
        Ok(())
    }

    /// Redirect future output of `axis` to `label`
    pub fn rename(&mut self, axis: &Axis, label: &str) -> Result<()> {
        validator::axis_label(label)?;
        if !self.is_known(axis) {
            self.register(axis)?;
        }
        if let Some(owner) = self.label_owner(label) {
            if owner != axis {
                return Err(GCodeError::argument(format!(
                    "axis label `{}` is already used by {}",
                    label,
                    owner.key()
                )));
            }
        }
        if self.extras.iter().any(|extra| extra != axis && extra.key() == label) {
            return Err(GCodeError::argument(format!(
                "axis label `{}` is the key of another axis",
                label
            )));
        }
        if ["x", "y", "z"].contains(&label) {
            return Err(GCodeError::argument(format!(
                "axis label `{}` collides with a role key",
                label
            )));
        }

        if label == axis.default_label() {
            self.labels.remove(axis);
        } else {
            self.labels.insert(axis.clone(), label.to_string());
            self.values.insert(label.to_string(), 0.0);
        }
        Ok(())
    }

    /// Add `delta` to the axis, and to its label when renamed
    pub fn offset(&mut self, axis: &Axis, delta: f64) {
        *self.values.entry(axis.key().to_string()).or_insert(0.0) += delta;
        if let Some(label) = self.labels.get(axis) {
            *self.values.entry(label.clone()).or_insert(0.0) += delta;
        }
    }

    /// Set the axis, and its label when renamed, to `value`
    pub fn assign(&mut self, axis: &Axis, value: f64) {
        self.values.insert(axis.key().to_string(), value);
        if let Some(label) = self.labels.get(axis) {
            self.values.insert(label.clone(), value);
        }
    }

    /// Canonical emission rank: x, y, z, then named axes as first seen
    pub fn rank(&self, axis: &Axis) -> usize {
        match axis {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
            named => 3 + self
                .extras
                .iter()
                .position(|a| a == named)
                .unwrap_or(self.extras.len()),
        }
    }

    pub fn snapshot(&self) -> Position {
        Position(self.values.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    fn label_owner(&self, label: &str) -> Option<&Axis> {
        static ROLES: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
        ROLES
            .iter()
            .chain(self.extras.iter())
            .find(|axis| self.label(axis) == label)
    }
}
