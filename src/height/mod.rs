//! Elevation sources
//!
//! The emitter only needs one number per planar position. Where it comes
//! from (a probed grid, a decoded height map, a formula) is up to the
//! caller.

use crate::emitter::MotionEmitter;
use crate::error::{GCodeError, Result};
use crate::position::Axis;
use crate::request::MoveRequest;
use crate::sink::LineSink;

pub trait HeightSource {
    /// Elevation at the absolute planar position `(x, y)`
    fn height_at(&self, x: f64, y: f64) -> f64;
}

impl<F> HeightSource for F
where
    F: Fn(f64, f64) -> f64,
{
    fn height_at(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// Same elevation everywhere
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlatSurface {
    pub height: f64,
}

impl FlatSurface {
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

impl HeightSource for FlatSurface {
    fn height_at(&self, _x: f64, _y: f64) -> f64 {
        self.height
    }
}

impl<S: LineSink> MotionEmitter<S> {
    /// Relative move whose z delta lands on the surface at the target
    pub fn move_following<H: HeightSource + ?Sized>(
        &mut self,
        request: &MoveRequest,
        source: &H,
    ) -> Result<()> {
        let coordinates = self.coordinates();
        let resolved = coordinates.resolve_request(request)?;
        if resolved.iter().any(|(axis, _)| *axis == Axis::Z) {
            return Err(GCodeError::argument(
                "z is taken from the height source and cannot be given",
            ));
        }
        request.validate()?;

        let offset = |role: Axis| {
            resolved
                .iter()
                .find(|(axis, _)| *axis == role)
                .map_or(0.0, |(_, value)| *value)
        };
        let x = coordinates.value(&Axis::X) + offset(Axis::X);
        let y = coordinates.value(&Axis::Y) + offset(Axis::Y);
        let height = source.height_at(x, y);
        if !height.is_finite() {
            return Err(GCodeError::argument(format!(
                "height source returned {} at ({}, {})",
                height, x, y
            )));
        }
        let delta = height - coordinates.value(&Axis::Z);
        let request = request.clone().axis(Axis::Z, delta);
        self.move_by(&request)
    }
}
