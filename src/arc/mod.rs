//! Arc geometry
//!
//! Turns an [`ArcRequest`] into an [`ArcPlan`]: the plane, the two plane
//! axes in emission order, the signed radius and the optional helix. The
//! plan also knows how to approximate itself with chords for controllers
//! without G2/G3 support.
//!
//! All coordinates are relative to the arc start.

use crate::error::{GCodeError, Result};
use crate::modes::Plane;
use crate::position::{Axis, CoordinateState};
use crate::request::MoveRequest;
use crate::validator;
use cgmath::{Angle, InnerSpace, Rad, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Radii within this distance of half the chord still span it
const RADIUS_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[serde(alias = "cw")]
    Clockwise, // G2
    #[serde(alias = "ccw")]
    CounterClockwise, // G3
}

impl Direction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Direction::Clockwise => "G2",
            Direction::CounterClockwise => "G3",
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// Linear advance of an axis outside the arc plane
#[derive(Debug, Clone, PartialEq)]
pub struct Helix {
    pub axis: Axis,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArcRequest {
    /// Plane axis deltas and optional feed
    pub target: MoveRequest,
    pub direction: Direction,
    /// Negative radius selects the major arc
    pub radius: Option<f64>,
    pub helix: Option<Helix>,
    /// Overrides the session setting when present
    pub linearize: Option<bool>,
}

impl ArcRequest {
    pub fn new(target: MoveRequest) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Self::new(MoveRequest::xy(x, y))
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn helix(mut self, axis: Axis, distance: f64) -> Self {
        self.helix = Some(Helix { axis, distance });
        self
    }

    pub fn linearize(mut self, linearize: bool) -> Self {
        self.linearize = Some(linearize);
        self
    }

    pub fn feed(mut self, rate: f64) -> Self {
        self.target = self.target.feed(rate);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArcPlan {
    pub plane: Plane,
    pub first: (Axis, f64),
    pub second: (Axis, f64),
    /// Signed radius, as written on the arc line
    pub radius: f64,
    pub direction: Direction,
    pub helix: Option<Helix>,
    pub feed: Option<f64>,
    /// `G16` labels, present when they differ from `X Y Z`
    pub assignment: Option<[String; 3]>,
}

impl ArcPlan {
    pub fn new(request: &ArcRequest, state: &CoordinateState) -> Result<Self> {
        if request.target.is_empty() {
            return Err(GCodeError::geometry("arc needs at least one plane axis"));
        }
        request.target.validate()?;

        let mut axes = state.resolve_request(&request.target)?;
        match axes.len() {
            1 => match axes[0].0 {
                Axis::X => axes.push((Axis::Y, 0.0)),
                Axis::Y => axes.insert(0, (Axis::X, 0.0)),
                _ => {
                    return Err(GCodeError::geometry(format!(
                        "cannot imply an arc plane from {} alone",
                        axes[0].0
                    )))
                }
            },
            2 => {}
            n => {
                return Err(GCodeError::argument(format!(
                    "arc takes two plane axes, got {}",
                    n
                )))
            }
        }
        axes.sort_by_key(|(axis, _)| state.rank(axis));
        let second = axes.pop().unwrap_or((Axis::Y, 0.0));
        let first = axes.pop().unwrap_or((Axis::X, 0.0));

        let plane = match (&first.0, &second.0) {
            (Axis::X, Axis::Y) => Plane::XY,
            (Axis::X, _) => Plane::ZX,
            (Axis::Y, _) => Plane::YZ,
            (a, b) => {
                return Err(GCodeError::geometry(format!(
                    "no arc plane through {} and {}",
                    a, b
                )))
            }
        };

        if let Some(helix) = &request.helix {
            validator::finite("helix distance", helix.distance)?;
            let helix_axis = state.resolve(&helix.axis);
            if helix_axis == first.0 || helix_axis == second.0 {
                return Err(GCodeError::argument(format!(
                    "helix axis {} lies in the arc plane",
                    helix.axis
                )));
            }
            state.check(&helix_axis)?;
        }
        for (axis, _) in [&first, &second] {
            state.check(axis)?;
        }

        let chord = Vector2::new(first.1, second.1).magnitude();
        if chord == 0.0 {
            return Err(GCodeError::geometry("arc start and end coincide"));
        }
        let radius = match request.radius {
            None => chord / 2.0,
            Some(radius) => {
                validator::finite("radius", radius)?;
                if radius.abs() + RADIUS_SLACK < chord / 2.0 {
                    return Err(GCodeError::geometry(format!(
                        "radius {} cannot span a chord of {}",
                        radius.abs(),
                        chord
                    )));
                }
                radius
            }
        };

        let helix = request.helix.as_ref().map(|helix| Helix {
            axis: state.resolve(&helix.axis),
            distance: helix.distance,
        });
        let third = match (&plane, &helix) {
            (Plane::XY, Some(helix)) => state.label(&helix.axis).to_string(),
            (Plane::XY, None) => state.label(&Axis::Z).to_string(),
            _ => state.label(&second.0).to_string(),
        };
        let labels = [
            state.label(&Axis::X).to_string(),
            state.label(&Axis::Y).to_string(),
            third,
        ];
        let assignment = if labels == ["X", "Y", "Z"] {
            None
        } else {
            Some(labels)
        };

        Ok(Self {
            plane,
            first,
            second,
            radius,
            direction: request.direction,
            helix,
            feed: request.target.feed_rate(),
            assignment,
        })
    }

    /// Straight line from start to end
    pub fn chord(&self) -> Vector2<f64> {
        Vector2::new(self.first.1, self.second.1)
    }

    pub fn center(&self) -> Vector2<f64> {
        let chord = self.chord();
        let length = chord.magnitude();
        let radius = self.radius.abs();
        let offset = (radius * radius - length * length / 4.0).max(0.0).sqrt();
        let normal = Vector2::new(-chord.y, chord.x) / length;
        let mut side = match self.direction {
            Direction::Clockwise => -1.0,
            Direction::CounterClockwise => 1.0,
        };
        if self.radius < 0.0 {
            side = -side;
        }
        chord / 2.0 + normal * (offset * side)
    }

    /// Unsigned angle travelled around the center
    pub fn sweep(&self) -> Rad<f64> {
        let center = self.center();
        let start = -center;
        let end = self.chord() - center;
        let from = Rad::atan2(start.y, start.x);
        let to = Rad::atan2(end.y, end.x);
        match self.direction {
            Direction::Clockwise => (from - to).normalize(),
            Direction::CounterClockwise => (to - from).normalize(),
        }
    }

    /// Path length in the plane
    pub fn arc_length(&self) -> f64 {
        self.radius.abs() * self.sweep().0
    }

    /// Segments keeping every chord within `tolerance` of the arc
    pub fn segment_count(&self, tolerance: f64) -> Result<usize> {
        validator::positive("chord tolerance", tolerance)?;
        let radius = self.radius.abs();
        let step = if tolerance >= radius {
            FRAC_PI_2
        } else {
            2.0 * (1.0 - tolerance / radius).acos()
        };
        let count = validator::step_count("arc segments", self.sweep().0 / step)?;
        Ok(count.max(1))
    }

    /// Chord end points, relative to the arc start; the last one is the target
    pub fn linearize(&self, tolerance: f64) -> Result<Vec<Vector2<f64>>> {
        let count = self.segment_count(tolerance)?;
        let center = self.center();
        let radius = self.radius.abs();
        let start = Rad::atan2(-center.y, -center.x);
        let sweep = match self.direction {
            Direction::Clockwise => -self.sweep(),
            Direction::CounterClockwise => self.sweep(),
        };
        Ok((1..=count)
            .map(|i| {
                if i == count {
                    self.chord()
                } else {
                    let angle = start + sweep * (i as f64 / count as f64);
                    center + Vector2::new(angle.cos(), angle.sin()) * radius
                }
            })
            .collect())
    }
}
