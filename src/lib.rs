//! gscribe: stateful G-code writer
//!
//! Tracks machine position, distance mode, axis labels and tool/coolant
//! state while writing instructions to a [`LineSink`]. Motion lives in
//! [`MotionEmitter`]; [`Machine`] wraps it with guarded mode changes.
//!
//! ```no_run
//! use gscribe::{EmitterConfig, InstructionTable, Machine, MoveRequest, SpinMode, WriterSink};
//! use std::sync::Arc;
//!
//! # fn main() -> gscribe::Result<()> {
//! let sink = WriterSink::create_file("part.gcode")?;
//! let mut machine = Machine::start(EmitterConfig::default(), Arc::new(InstructionTable::builtin()), sink)?;
//! machine.tool_on(SpinMode::Clockwise, 12000.0)?;
//! machine.motion_mut().move_by(&MoveRequest::xy(10.0, 5.0))?;
//! machine.tool_off()?;
//! machine.finish()?;
//! # Ok(())
//! # }
//! ```

pub mod arc;
pub mod codes;
pub mod config;
pub mod emitter;
pub mod error;
pub mod extrusion;
pub mod format;
pub mod height;
pub mod lexer;
pub mod machine;
pub mod modes;
pub mod patterns;
pub mod position;
pub mod request;
pub mod sink;
pub mod validator;

pub use arc::{ArcPlan, ArcRequest, Direction, Helix};
pub use codes::{GCodeEntry, InstructionTable};
pub use config::{ArcConfig, AxisNames, EmitterConfig, LineEnding};
pub use emitter::{run_session, MotionEmitter};
pub use error::{GCodeError, Result};
pub use extrusion::{CrossSection, ExtrusionConfig};
pub use format::{format_number, CommentSymbol, LineFormatter, Statement};
pub use height::{FlatSurface, HeightSource};
pub use machine::Machine;
pub use modes::*;
pub use patterns::{meander_passes, meander_spacing, Corner, Orientation};
pub use position::{Axis, CoordinateState, Position};
pub use request::MoveRequest;
pub use sink::{LineSink, MemorySink, TeeSink, Transport, TransportSink, WriterSink};

/// Log to stderr, filtered by `RUST_LOG` with `info` as the floor
pub fn init_logging() -> std::result::Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}
