//! Pattern generators
//!
//! Rectangles, meanders and triangular waves, built from relative moves.
//! Absolute sessions are switched to relative for the duration of the
//! pattern and switched back afterwards.
//!
//! A [`Corner`] names where the pattern starts inside its bounding box and
//! so fixes the sign of travel along each axis: starting in the lower left
//! corner moves towards +x and +y.

use crate::arc::Direction;
use crate::emitter::MotionEmitter;
use crate::error::{GCodeError, Result};
use crate::modes::DistanceMode;
use crate::position::Axis;
use crate::request::MoveRequest;
use crate::sink::LineSink;
use crate::validator;
use serde::{Deserialize, Serialize};
use tracing::warn;

const SPACING_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    #[default]
    LowerLeft,
    UpperLeft,
    UpperRight,
    LowerRight,
}

impl Corner {
    /// Direction of travel along x and y from this corner
    pub fn signs(&self) -> (f64, f64) {
        match self {
            Corner::LowerLeft => (1.0, 1.0),
            Corner::UpperLeft => (1.0, -1.0),
            Corner::UpperRight => (-1.0, -1.0),
            Corner::LowerRight => (-1.0, 1.0),
        }
    }

    /// Signs of the first triangular wave stroke along x and y
    ///
    /// Left and right are swapped relative to [`Corner::signs`]: a wave
    /// started at the upper left heads towards -x.
    pub fn wave_signs(&self) -> (f64, f64) {
        match self {
            Corner::LowerLeft => (1.0, 1.0),
            Corner::UpperLeft => (-1.0, 1.0),
            Corner::UpperRight => (-1.0, -1.0),
            Corner::LowerRight => (1.0, -1.0),
        }
    }
}

/// Axis the long strokes of a meander or wave run along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Edge {
    Right,
    Left,
    Up,
    Down,
}

/// Edge order of a closed rectangle walk
fn rect_edges(corner: Corner, direction: Direction) -> [Edge; 4] {
    use Edge::*;
    match (corner, direction) {
        (Corner::LowerLeft, Direction::Clockwise) => [Up, Right, Down, Left],
        (Corner::UpperLeft, Direction::Clockwise) => [Right, Down, Left, Up],
        (Corner::UpperRight, Direction::Clockwise) => [Down, Left, Up, Right],
        (Corner::LowerRight, Direction::Clockwise) => [Left, Up, Right, Down],
        (Corner::LowerLeft, Direction::CounterClockwise) => [Right, Up, Left, Down],
        (Corner::UpperLeft, Direction::CounterClockwise) => [Down, Right, Up, Left],
        (Corner::UpperRight, Direction::CounterClockwise) => [Left, Down, Right, Up],
        (Corner::LowerRight, Direction::CounterClockwise) => [Up, Left, Down, Right],
    }
}

/// Passes needed to cross `span` at exactly `spacing`
pub fn meander_passes(span: f64, spacing: f64) -> Result<usize> {
    let intervals =
        validator::step_count("meander passes", (span / spacing + SPACING_EPSILON).floor())?;
    Ok(intervals + 1)
}

/// Largest spacing not above `spacing` that divides `span` evenly
pub fn meander_spacing(span: f64, spacing: f64) -> Result<f64> {
    Ok(span / meander_intervals(span, spacing)? as f64)
}

fn meander_intervals(span: f64, spacing: f64) -> Result<usize> {
    validator::positive("span", span)?;
    validator::positive("spacing", spacing)?;
    let intervals = validator::step_count("meander passes", span / spacing - SPACING_EPSILON)?;
    Ok(intervals.max(1))
}

impl<S: LineSink> MotionEmitter<S> {
    /// Closed rectangle of four moves, ending where it started
    pub fn rect(&mut self, width: f64, height: f64, corner: Corner, direction: Direction) -> Result<()> {
        validator::positive("width", width)?;
        validator::positive("height", height)?;
        let moves: Vec<MoveRequest> = rect_edges(corner, direction)
            .iter()
            .map(|edge| match edge {
                Edge::Right => MoveRequest::new().x(width),
                Edge::Left => MoveRequest::new().x(-width),
                Edge::Up => MoveRequest::new().y(height),
                Edge::Down => MoveRequest::new().y(-height),
            })
            .collect();
        self.relative_pattern(None, &moves)
    }

    /// Zig-zag fill of a `width x height` box
    ///
    /// Strokes run along `orientation` and are stepped across the other
    /// axis. The spacing is reduced when it does not divide the span, which
    /// is reported with a comment line.
    pub fn meander(
        &mut self,
        width: f64,
        height: f64,
        spacing: f64,
        corner: Corner,
        orientation: Orientation,
    ) -> Result<()> {
        validator::positive("width", width)?;
        validator::positive("height", height)?;
        validator::positive("spacing", spacing)?;

        let (sx, sy) = corner.signs();
        let (major, minor, stroke, span, major_sign, minor_sign) = match orientation {
            Orientation::X => (Axis::X, Axis::Y, width, height, sx, sy),
            Orientation::Y => (Axis::Y, Axis::X, height, width, sy, sx),
        };
        let intervals = meander_intervals(span, spacing)?;
        let effective = span / intervals as f64;

        let mut moves = Vec::with_capacity(2 * intervals + 1);
        for pass in 0..=intervals {
            let direction = if pass % 2 == 0 { 1.0 } else { -1.0 };
            moves.push(MoveRequest::new().axis(major.clone(), major_sign * direction * stroke));
            if pass < intervals {
                moves.push(MoveRequest::new().axis(minor.clone(), minor_sign * effective));
            }
        }

        let note = if (effective - spacing).abs() > SPACING_EPSILON {
            let (from, to) = (self.formatter().number(spacing), self.formatter().number(effective));
            warn!("meander spacing updated from {} to {}", from, to);
            Some(format!("WARNING! meander spacing updated from {} to {}", from, to))
        } else {
            None
        };
        self.relative_pattern(note.as_deref(), &moves)
    }

    /// Diagonal zig-zag of `floor(2 * cycles)` strokes
    ///
    /// Each stroke advances `width` (x orientation) or `height` (y
    /// orientation) along the major axis while the other axis alternates.
    pub fn triangular_wave(
        &mut self,
        width: f64,
        height: f64,
        cycles: f64,
        corner: Corner,
        orientation: Orientation,
    ) -> Result<()> {
        validator::positive("width", width)?;
        validator::positive("height", height)?;
        validator::finite("cycles", cycles)?;
        let strokes =
            validator::step_count("triangular wave strokes", (2.0 * cycles).floor().max(0.0))?;
        if strokes < 1 {
            return Err(GCodeError::argument(format!(
                "a triangular wave needs at least half a cycle, got {}",
                cycles
            )));
        }

        let (sx, sy) = corner.wave_signs();
        let (major, minor, advance, amplitude, major_sign, minor_sign) = match orientation {
            Orientation::X => (Axis::X, Axis::Y, width, height, sx, sy),
            Orientation::Y => (Axis::Y, Axis::X, height, width, sy, sx),
        };
        let moves: Vec<MoveRequest> = (0..strokes)
            .map(|i| {
                let alternate = if i % 2 == 0 { 1.0 } else { -1.0 };
                MoveRequest::new()
                    .axis(major.clone(), major_sign * advance)
                    .axis(minor.clone(), minor_sign * alternate * amplitude)
            })
            .collect();
        self.relative_pattern(None, &moves)
    }

    /// Run `moves` in relative mode, switching back to absolute afterwards
    /// even when a move fails
    fn relative_pattern(&mut self, note: Option<&str>, moves: &[MoveRequest]) -> Result<()> {
        let restore = self.distance_mode() == DistanceMode::Absolute;
        if restore {
            self.set_distance_mode(DistanceMode::Relative)?;
        }
        let mut result = match note {
            Some(note) => self.comment(note),
            None => Ok(()),
        };
        if result.is_ok() {
            result = moves.iter().try_for_each(|request| self.move_by(request));
        }
        if restore {
            let restored = self.set_distance_mode(DistanceMode::Absolute);
            result?;
            return restored;
        }
        result
    }
}
