//! Move request
//!
//! A sparse, ordered set of (axis, value) pairs plus an optional feed
//! rate. Axes left out are not moved.

use crate::error::{GCodeError, Result};
use crate::lexer;
use crate::position::Axis;
use crate::validator;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoveRequest {
    values: Vec<(Axis, f64)>,
    feed: Option<f64>,
}

impl MoveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Self::new().x(x).y(y)
    }

    pub fn x(self, value: f64) -> Self {
        self.axis(Axis::X, value)
    }

    pub fn y(self, value: f64) -> Self {
        self.axis(Axis::Y, value)
    }

    pub fn z(self, value: f64) -> Self {
        self.axis(Axis::Z, value)
    }

    /// Shorthand for a named axis such as `A` or `E`
    pub fn named(self, label: &str, value: f64) -> Self {
        self.axis(Axis::named(label), value)
    }

    /// Set the value of an axis, replacing any previous value
    pub fn axis(mut self, axis: Axis, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    pub fn feed(mut self, rate: f64) -> Self {
        self.feed = Some(rate);
        self
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match self.values.iter_mut().find(|(a, _)| *a == axis) {
            Some(entry) => entry.1 = value,
            None => self.values.push((axis, value)),
        }
    }

    pub fn get(&self, axis: &Axis) -> Option<f64> {
        self.values.iter().find(|(a, _)| a == axis).map(|(_, v)| *v)
    }

    pub fn contains(&self, axis: &Axis) -> bool {
        self.get(axis).is_some()
    }

    pub fn feed_rate(&self) -> Option<f64> {
        self.feed
    }

    /// Axes in insertion order
    pub fn axes(&self) -> impl Iterator<Item = (&Axis, f64)> {
        self.values.iter().map(|(a, v)| (a, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no axis is present, a feed rate alone still counts as empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Finite values, a positive feed, and at least one word
    pub fn validate(&self) -> Result<()> {
        if self.values.is_empty() && self.feed.is_none() {
            return Err(GCodeError::argument("empty move request"));
        }
        for (axis, value) in &self.values {
            validator::finite(axis.key(), *value)?;
        }
        if let Some(feed) = self.feed {
            validator::positive("feed rate", feed)?;
        }
        Ok(())
    }
}

impl FromStr for MoveRequest {
    type Err = GCodeError;

    fn from_str(input: &str) -> Result<Self> {
        let mut request = MoveRequest::new();
        for (label, value) in lexer::words(input)? {
            let axis = match label.as_str() {
                "X" | "x" => Axis::X,
                "Y" | "y" => Axis::Y,
                "Z" | "z" => Axis::Z,
                "F" | "f" => {
                    if request.feed.replace(value).is_some() {
                        return Err(GCodeError::argument("feed rate given twice"));
                    }
                    continue;
                }
                _ => {
                    validator::axis_label(&label)?;
                    Axis::Named(label)
                }
            };
            if request.contains(&axis) {
                return Err(GCodeError::argument(format!("axis {} given twice", axis)));
            }
            request.set(axis, value);
        }
        request.validate()?;
        Ok(request)
    }
}
