//! Motion emitter
//!
//! Owns the coordinate state and the output sink of one session. Every
//! public operation validates first, writes its line(s), and only then
//! commits the new state, so a rejected call leaves no trace in either.

use crate::arc::{ArcPlan, ArcRequest};
use crate::codes::InstructionTable;
use crate::config::EmitterConfig;
use crate::error::{GCodeError, Result};
use crate::extrusion::ExtrusionConfig;
use crate::format::{LineFormatter, Statement};
use crate::modes::{DistanceMode, ModeValue, Plane};
use crate::position::{Axis, CoordinateState, Position};
use crate::request::MoveRequest;
use crate::sink::LineSink;
use crate::validator;
use std::sync::Arc;
use tracing::{debug, trace, warn};

const RAPID: &str = "G0";
const LINEAR: &str = "G1";

pub struct MotionEmitter<S: LineSink> {
    config: EmitterConfig,
    table: Arc<InstructionTable>,
    formatter: LineFormatter,
    state: CoordinateState,
    distance_mode: DistanceMode,
    /// Taken by `finish`; `Drop` closes whatever is left
    sink: Option<S>,
}

impl<S: LineSink> MotionEmitter<S> {
    /// Start a session: header block, then exactly one distance mode line
    pub fn new(config: EmitterConfig, table: Arc<InstructionTable>, sink: S) -> Result<Self> {
        let mut emitter = Self {
            formatter: config.formatter(),
            distance_mode: config.distance_mode,
            config,
            table,
            state: CoordinateState::new(),
            sink: Some(sink),
        };
        emitter.start()?;
        Ok(emitter)
    }

    fn start(&mut self) -> Result<()> {
        self.config.validate()?;
        let names: Vec<(Axis, String)> = self
            .config
            .axis_names
            .iter()
            .map(|(axis, label)| (axis, label.to_string()))
            .collect();
        for (axis, label) in names {
            self.state.rename(&axis, &label)?;
        }
        if let Some(extrusion) = &self.config.extrusion {
            self.state.register(&Axis::named(extrusion.axis.as_str()))?;
        }
        let mode = self.instruction(self.distance_mode)?;

        if let Some(header) = self.config.header.clone() {
            for line in header.lines() {
                self.write(line)?;
            }
        }
        self.emit(mode, false)?;
        debug!("session started in {:?} distance mode", self.distance_mode);
        Ok(())
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn table(&self) -> &Arc<InstructionTable> {
        &self.table
    }

    pub fn formatter(&self) -> &LineFormatter {
        &self.formatter
    }

    pub fn distance_mode(&self) -> DistanceMode {
        self.distance_mode
    }

    pub fn coordinates(&self) -> &CoordinateState {
        &self.state
    }

    /// Snapshot of every tracked axis
    pub fn position(&self) -> Position {
        self.state.snapshot()
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    pub fn sink_mut(&mut self) -> Option<&mut S> {
        self.sink.as_mut()
    }

    pub fn extrusion(&self) -> Option<&ExtrusionConfig> {
        self.config.extrusion.as_ref()
    }

    /// Turn extrusion coupling on, or change its parameters
    pub fn enable_extrusion(&mut self, extrusion: ExtrusionConfig) -> Result<()> {
        extrusion.validate()?;
        self.state.register(&Axis::named(extrusion.axis.as_str()))?;
        debug!("extrusion coupled to axis {}", extrusion.axis);
        self.config.extrusion = Some(extrusion);
        Ok(())
    }

    pub fn disable_extrusion(&mut self) {
        self.config.extrusion = None;
    }

    /// Statement for a table-driven mode, described inline
    pub fn instruction(&self, mode: impl Into<ModeValue>) -> Result<Statement> {
        let entry = self.table.lookup(mode)?;
        Ok(Statement::new(entry.instruction.as_str()).comment(entry.description.as_str()))
    }

    /// Write a verbatim line
    pub fn write(&mut self, line: &str) -> Result<()> {
        self.write_line(line, false)
    }

    /// Render and write a statement
    pub fn emit(&mut self, statement: Statement, expects_ack: bool) -> Result<()> {
        let line = self.formatter.render(&statement);
        self.write_line(&line, expects_ack)
    }

    /// Standalone comment line, written even when inline comments are off
    pub fn comment(&mut self, text: &str) -> Result<()> {
        let line = self.formatter.comment(text);
        self.write(&line)
    }

    fn write_line(&mut self, line: &str, expects_ack: bool) -> Result<()> {
        let expects_ack = expects_ack || self.config.wait_for_response;
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| GCodeError::Resource(std::io::Error::other("output sink is closed")))?;
        sink.write_line(line, expects_ack)?;
        trace!(ack = expects_ack, "{}", line);
        Ok(())
    }

    pub fn set_distance_mode(&mut self, mode: DistanceMode) -> Result<()> {
        let statement = self.instruction(mode)?;
        self.emit(statement, false)?;
        if self.distance_mode != mode {
            debug!("distance mode {:?} -> {:?}", self.distance_mode, mode);
        }
        self.distance_mode = mode;
        Ok(())
    }

    pub fn select_plane(&mut self, plane: Plane) -> Result<()> {
        let statement = self.instruction(plane)?;
        self.emit(statement, false)
    }

    /// Write future values of `axis` under `label`; emits nothing
    pub fn rename_axis(&mut self, axis: &Axis, label: &str) -> Result<()> {
        self.state.rename(axis, label)?;
        debug!("axis {} now written as {}", axis.key(), label);
        Ok(())
    }

    /// Overwrite tracked positions without emitting anything
    pub fn set_position(&mut self, request: &MoveRequest) -> Result<()> {
        request.validate()?;
        let values = self.resolve(request)?;
        self.commit_absolute(&values)
    }

    /// `G92`: tell the controller the current position is `request`
    pub fn set_axis_position(&mut self, request: &MoveRequest) -> Result<()> {
        if request.is_empty() {
            return Err(GCodeError::argument("G92 needs at least one axis"));
        }
        request.validate()?;
        let mut values = self.resolve(request)?;
        self.sort(&mut values);
        let statement = self
            .statement("G92", &values, None)
            .comment("Set axis position");
        self.emit(statement, false)?;
        self.commit_absolute(&values)
    }

    /// `G1 F<rate>`
    pub fn feed(&mut self, rate: f64) -> Result<()> {
        validator::positive("feed rate", rate)?;
        let statement = Statement::new(LINEAR).word(self.formatter.param("F", rate));
        self.emit(statement, false)
    }

    /// Linear move by relative deltas, whatever the distance mode
    pub fn move_by(&mut self, request: &MoveRequest) -> Result<()> {
        self.relative_move(LINEAR, request, true)
    }

    /// Rapid move by relative deltas; never extrudes
    pub fn rapid_by(&mut self, request: &MoveRequest) -> Result<()> {
        self.relative_move(RAPID, request, false)
    }

    /// Linear move to absolute targets, bracketed by G90/G91 in relative sessions
    pub fn move_absolute(&mut self, request: &MoveRequest) -> Result<()> {
        self.absolute_move(LINEAR, request, true)
    }

    pub fn rapid_absolute(&mut self, request: &MoveRequest) -> Result<()> {
        self.absolute_move(RAPID, request, false)
    }

    /// G2/G3 arc, or a chain of short moves when linearized
    pub fn arc(&mut self, request: &ArcRequest) -> Result<()> {
        let plan = ArcPlan::new(request, &self.state)?;
        if request.linearize.unwrap_or(self.config.arcs.linearize) {
            return self.linearized_arc(&plan);
        }

        let mut statements = Vec::with_capacity(3);
        if let Some(labels) = &plan.assignment {
            let assignment = labels
                .iter()
                .fold(Statement::new("G16"), |statement, label| statement.word(label.as_str()))
                .comment("coordinate axis assignment");
            statements.push(assignment);
        }
        statements.push(self.instruction(plan.plane)?);

        let mut arc = Statement::new(plan.direction.mnemonic());
        for (axis, value) in [&plan.first, &plan.second] {
            arc = arc.word(self.formatter.param(self.state.label(axis), *value));
        }
        arc = arc.word(self.formatter.param("R", plan.radius));
        let extruded = self.config.extrusion.as_ref().map(|extrusion| {
            let travel = match plan.plane {
                Plane::XY => plan.arc_length(),
                _ => 0.0,
            };
            (Axis::named(extrusion.axis.as_str()), extrusion.filament_length(travel))
        });
        if let Some((axis, length)) = &extruded {
            arc = arc.word(self.formatter.param(self.state.label(axis), *length));
        }
        if let Some(feed) = plan.feed {
            arc = arc.word(self.formatter.param("F", feed));
        }
        if let Some(helix) = &plan.helix {
            arc = arc
                .word(LINEAR)
                .word(self.formatter.param(self.state.label(&helix.axis), helix.distance));
        }
        statements.push(arc);

        for statement in statements {
            self.emit(statement, false)?;
        }

        let mut deltas = vec![plan.first.clone(), plan.second.clone()];
        deltas.extend(plan.helix.iter().map(|h| (h.axis.clone(), h.distance)));
        deltas.extend(extruded);
        self.commit_relative(&deltas)
    }

    fn linearized_arc(&mut self, plan: &ArcPlan) -> Result<()> {
        let points = plan.linearize(self.config.arcs.chord_tolerance)?;
        let count = points.len() as f64;
        let mut previous = cgmath::Vector2::new(0.0, 0.0);
        for (i, point) in points.into_iter().enumerate() {
            let step = point - previous;
            previous = point;
            let mut segment = MoveRequest::new()
                .axis(plan.first.0.clone(), step.x)
                .axis(plan.second.0.clone(), step.y);
            if let Some(helix) = &plan.helix {
                segment = segment.axis(helix.axis.clone(), helix.distance / count);
            }
            if let (0, Some(feed)) = (i, plan.feed) {
                segment = segment.feed(feed);
            }
            self.move_by(&segment)?;
        }
        Ok(())
    }

    /// Footer, flush and close; hands the sink back
    pub fn finish(mut self) -> Result<S> {
        if let Some(footer) = self.config.footer.clone() {
            for line in footer.lines() {
                self.write(line)?;
            }
        }
        let mut sink = self
            .sink
            .take()
            .ok_or_else(|| GCodeError::Resource(std::io::Error::other("output sink is closed")))?;
        sink.flush()?;
        sink.close()?;
        debug!("session finished");
        Ok(sink)
    }

    fn relative_move(&mut self, mnemonic: &str, request: &MoveRequest, extrude: bool) -> Result<()> {
        request.validate()?;
        let mut deltas = self.resolve(request)?;
        if extrude {
            if let Some(extrusion) = &self.config.extrusion {
                let axis = Axis::named(extrusion.axis.as_str());
                if !deltas.iter().any(|(a, _)| *a == axis) {
                    let travel = planar_distance(&deltas);
                    deltas.push((axis, extrusion.filament_length(travel)));
                }
            }
        }
        self.sort(&mut deltas);
        let statement = self.statement(mnemonic, &deltas, request.feed_rate());
        self.emit(statement, false)?;
        self.commit_relative(&deltas)
    }

    fn absolute_move(&mut self, mnemonic: &str, request: &MoveRequest, extrude: bool) -> Result<()> {
        request.validate()?;
        let mut targets = self.resolve(request)?;
        if extrude {
            if let Some(extrusion) = &self.config.extrusion {
                let axis = Axis::named(extrusion.axis.as_str());
                if !targets.iter().any(|(a, _)| *a == axis) {
                    let travel: Vec<(Axis, f64)> = targets
                        .iter()
                        .map(|(a, target)| (a.clone(), target - self.state.value(a)))
                        .collect();
                    let length = extrusion.filament_length(planar_distance(&travel));
                    let current = self.state.value(&axis);
                    targets.push((axis, current + length));
                }
            }
        }
        self.sort(&mut targets);

        let mut statements = Vec::with_capacity(3);
        let bracket = self.distance_mode == DistanceMode::Relative;
        if bracket {
            statements.push(self.instruction(DistanceMode::Absolute)?);
        }
        statements.push(self.statement(mnemonic, &targets, request.feed_rate()));
        if bracket {
            statements.push(self.instruction(DistanceMode::Relative)?);
        }
        for statement in statements {
            self.emit(statement, false)?;
        }
        self.commit_absolute(&targets)
    }

    /// Resolve labels, reject unknown or repeated axes
    fn resolve(&self, request: &MoveRequest) -> Result<Vec<(Axis, f64)>> {
        self.state.resolve_request(request)
    }

    fn sort(&self, values: &mut [(Axis, f64)]) {
        values.sort_by_key(|(axis, _)| self.state.rank(axis));
    }

    fn statement(&self, mnemonic: &str, values: &[(Axis, f64)], feed: Option<f64>) -> Statement {
        let statement = values.iter().fold(Statement::new(mnemonic), |statement, (axis, value)| {
            statement.word(self.formatter.param(self.state.label(axis), *value))
        });
        match feed {
            Some(feed) => statement.word(self.formatter.param("F", feed)),
            None => statement,
        }
    }

    fn commit_relative(&mut self, deltas: &[(Axis, f64)]) -> Result<()> {
        for (axis, delta) in deltas {
            self.state.register(axis)?;
            self.state.offset(axis, *delta);
        }
        Ok(())
    }

    fn commit_absolute(&mut self, targets: &[(Axis, f64)]) -> Result<()> {
        for (axis, value) in targets {
            self.state.register(axis)?;
            self.state.assign(axis, *value);
        }
        Ok(())
    }
}

impl<S: LineSink> Drop for MotionEmitter<S> {
    fn drop(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(err) = sink.close() {
                warn!("failed to close output sink: {}", err);
            }
        }
    }
}

/// Euclidean length of the x/y part of a move
fn planar_distance(values: &[(Axis, f64)]) -> f64 {
    let component = |role: Axis| {
        values
            .iter()
            .find(|(axis, _)| *axis == role)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    };
    component(Axis::X).hypot(component(Axis::Y))
}

/// Run `body` against a fresh session and always tear it down
///
/// On success the session is finished (footer, flush, close) and the sink
/// is returned next to the body's value. On failure the sink is closed by
/// the emitter's `Drop` and the error is returned.
pub fn run_session<S, T, F>(
    config: EmitterConfig,
    table: Arc<InstructionTable>,
    sink: S,
    body: F,
) -> Result<(T, S)>
where
    S: LineSink,
    F: FnOnce(&mut MotionEmitter<S>) -> Result<T>,
{
    let mut emitter = MotionEmitter::new(config, table, sink)?;
    let value = body(&mut emitter)?;
    let sink = emitter.finish()?;
    Ok((value, sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::Direction;
    use crate::config::AxisNames;
    use crate::sink::MemorySink;
    use pretty_assertions::assert_eq;

    fn table() -> Arc<InstructionTable> {
        Arc::new(InstructionTable::builtin())
    }

    fn session(config: EmitterConfig) -> MotionEmitter<MemorySink> {
        MotionEmitter::new(config, table(), MemorySink::new()).unwrap()
    }

    /// Lines written after the initial distance mode line
    fn body(emitter: &MotionEmitter<MemorySink>) -> Vec<&str> {
        emitter.sink().unwrap().lines()[1..].to_vec()
    }

    fn printer() -> ExtrusionConfig {
        ExtrusionConfig::new(1.75, 0.22, 0.4)
    }

    #[test]
    fn test_session_starts_with_one_mode_line() {
        let g = session(EmitterConfig::default().with_header("; hello\nG21"));
        assert_eq!(
            g.sink().unwrap().lines(),
            vec!["; hello", "G21", "G91 ; Set distance mode, relative"]
        );
    }

    #[test]
    fn test_relative_moves_accumulate() {
        let mut g = session(EmitterConfig::default());
        g.move_by(&MoveRequest::xy(10.0, 10.0)).unwrap();
        g.move_by(&MoveRequest::xy(10.0, 10.0).z(10.0)).unwrap();
        assert_eq!(body(&g), vec!["G1 X10 Y10", "G1 X10 Y10 Z10"]);
        assert_eq!(g.position(), Position::from([("x", 20.0), ("y", 20.0), ("z", 10.0)]));
    }

    #[test]
    fn test_named_axes_follow_spatial_ones() {
        let mut g = session(EmitterConfig::default());
        g.move_by(&"A50 X10 Y10".parse().unwrap()).unwrap();
        g.rapid_by(&MoveRequest::new().named("B", 1.0).named("A", 2.0).z(3.0)).unwrap();
        assert_eq!(body(&g), vec!["G1 X10 Y10 A50", "G0 Z3 A2 B1"]);
        assert_eq!(g.position().get("A"), Some(52.0));
    }

    #[test]
    fn test_absolute_move_brackets_relative_session() {
        let mut g = session(EmitterConfig::default());
        g.move_by(&MoveRequest::xy(3.0, 4.0)).unwrap();
        g.move_absolute(&MoveRequest::xy(20.0, 20.0).z(0.0)).unwrap();
        assert_eq!(
            body(&g),
            vec![
                "G1 X3 Y4",
                "G90 ; Set distance mode, absolute",
                "G1 X20 Y20 Z0",
                "G91 ; Set distance mode, relative",
            ]
        );
        assert_eq!(g.distance_mode(), DistanceMode::Relative);
        assert_eq!(g.position(), Position::from([("x", 20.0), ("y", 20.0), ("z", 0.0)]));
    }

    #[test]
    fn test_absolute_move_in_absolute_session() {
        let mut g = session(EmitterConfig::default().with_distance_mode(DistanceMode::Absolute));
        g.rapid_absolute(&MoveRequest::xy(5.0, 5.0)).unwrap();
        assert_eq!(body(&g), vec!["G0 X5 Y5"]);
        assert_eq!(g.distance_mode(), DistanceMode::Absolute);
    }

    #[test]
    fn test_extrusion_coupling() {
        let mut g = session(EmitterConfig::default().with_extrusion(printer()));
        g.move_by(&MoveRequest::new().x(10.0)).unwrap();
        g.move_by(&MoveRequest::new().z(1.0)).unwrap();
        g.move_by(&"X1 E5".parse().unwrap()).unwrap();
        g.rapid_by(&MoveRequest::new().x(10.0)).unwrap();
        assert_eq!(body(&g), vec!["G1 X10 E0.32269", "G1 Z1 E0", "G1 X1 E5", "G0 X10"]);
        let e = g.position().get("E").unwrap();
        assert!((e - 5.32269).abs() < 1e-5);
    }

    #[test]
    fn test_absolute_extrusion_is_cumulative() {
        let mut g = session(EmitterConfig::default().with_extrusion(printer()));
        g.move_absolute(&MoveRequest::xy(10.0, 10.0)).unwrap();
        assert_eq!(body(&g)[1], "G1 X10 Y10 E0.45635");
        g.move_absolute(&MoveRequest::new().z(20.0)).unwrap();
        assert_eq!(body(&g)[4], "G1 Z20 E0.45635");
    }

    #[test]
    fn test_rename_changes_label_and_tracking() {
        let mut g = session(EmitterConfig::default());
        g.rename_axis(&Axis::Z, "A").unwrap();
        g.move_by(&MoveRequest::xy(10.0, 10.0).z(10.0)).unwrap();
        g.rename_axis(&Axis::Z, "B").unwrap();
        g.move_by(&MoveRequest::new().z(5.0)).unwrap();
        assert_eq!(body(&g), vec!["G1 X10 Y10 A10", "G1 B5"]);
        assert_eq!(
            g.position(),
            Position::from([("x", 10.0), ("y", 10.0), ("z", 15.0), ("A", 10.0), ("B", 5.0)])
        );
    }

    #[test]
    fn test_initial_axis_names() {
        let names = AxisNames {
            z: "W".to_string(),
            ..AxisNames::default()
        };
        let mut g = session(EmitterConfig::default().with_axis_names(names));
        g.move_by(&MoveRequest::new().z(2.0)).unwrap();
        g.move_by(&"W1".parse().unwrap()).unwrap();
        assert_eq!(body(&g), vec!["G1 W2", "G1 W1"]);
        assert_eq!(g.position().get("z"), Some(3.0));
    }

    #[test]
    fn test_set_position_emits_nothing() {
        let mut g = session(EmitterConfig::default());
        g.set_position(&MoveRequest::xy(1.0, 2.0)).unwrap();
        g.set_axis_position(&MoveRequest::new().z(5.0)).unwrap();
        assert_eq!(body(&g), vec!["G92 Z5 ; Set axis position"]);
        assert_eq!(g.position(), Position::from([("x", 1.0), ("y", 2.0), ("z", 5.0)]));
    }

    #[test]
    fn test_feed() {
        let mut g = session(EmitterConfig::default());
        g.feed(1500.0).unwrap();
        g.move_by(&MoveRequest::new().x(1.0).feed(200.0)).unwrap();
        assert!(g.feed(0.0).is_err());
        assert_eq!(body(&g), vec!["G1 F1500", "G1 X1 F200"]);
    }

    #[test]
    fn test_rejected_move_leaves_no_trace() {
        let mut g = session(EmitterConfig::default());
        assert!(g.move_by(&MoveRequest::new()).is_err());
        assert!(g.move_by(&MoveRequest::new().x(f64::INFINITY)).is_err());
        assert!(g.move_by(&MoveRequest::new().named("G", 1.0)).is_err());
        assert!(body(&g).is_empty());
        assert_eq!(g.position(), Position::from([("x", 0.0), ("y", 0.0), ("z", 0.0)]));
    }

    #[test]
    fn test_arc_lines() {
        let mut g = session(EmitterConfig::default());
        g.arc(&ArcRequest::xy(10.0, 0.0)).unwrap();
        g.arc(&ArcRequest::new(MoveRequest::new().x(5.0).named("A", 0.0))
            .direction(Direction::CounterClockwise)
            .radius(5.0))
            .unwrap();
        g.arc(&ArcRequest::xy(0.0, 10.0).helix(Axis::named("D"), 10.0)).unwrap();
        assert_eq!(
            body(&g),
            vec![
                "G17 ; Select plane, XY",
                "G2 X10 Y0 R5",
                "G16 X Y A ; coordinate axis assignment",
                "G18 ; Select plane, ZX",
                "G3 X5 A0 R5",
                "G16 X Y D ; coordinate axis assignment",
                "G17 ; Select plane, XY",
                "G2 X0 Y10 R5 G1 D10",
            ]
        );
        assert_eq!(
            g.position(),
            Position::from([("x", 15.0), ("y", 10.0), ("z", 0.0), ("A", 0.0), ("D", 10.0)])
        );
    }

    #[test]
    fn test_arc_with_renamed_z() {
        let mut g = session(EmitterConfig::default());
        g.rename_axis(&Axis::Z, "B").unwrap();
        g.arc(&ArcRequest::new(MoveRequest::new().x(10.0).z(10.0))).unwrap();
        assert_eq!(
            body(&g),
            vec![
                "G16 X Y B ; coordinate axis assignment",
                "G18 ; Select plane, ZX",
                "G2 X10 B10 R7.07107",
            ]
        );
    }

    #[test]
    fn test_rejected_arc_writes_nothing() {
        let mut g = session(EmitterConfig::default());
        assert!(matches!(
            g.arc(&ArcRequest::xy(10.0, 10.0).radius(1.0)),
            Err(GCodeError::InvalidGeometry(_))
        ));
        assert!(body(&g).is_empty());
    }

    #[test]
    fn test_linearized_arc() {
        let mut g = session(EmitterConfig::default().with_linearized_arcs(10.0));
        g.arc(&ArcRequest::xy(10.0, 0.0)).unwrap();
        assert_eq!(body(&g), vec!["G1 X5 Y5", "G1 X5 Y-5"]);
        assert!(g.position().approx_eq(
            &Position::from([("x", 10.0), ("y", 0.0), ("z", 0.0)]),
            1e-9
        ));

        g.arc(&ArcRequest::xy(0.0, 4.0).linearize(false)).unwrap();
        assert_eq!(body(&g)[2], "G17 ; Select plane, XY");
    }

    #[test]
    fn test_linearized_arc_with_vanishing_tolerance_fails_cleanly() {
        let mut g = session(EmitterConfig::default().with_linearized_arcs(1e-17));
        let err = g.arc(&ArcRequest::xy(10.0, 0.0)).unwrap_err();
        assert!(matches!(err, GCodeError::InvalidArgument(_)));
        assert!(body(&g).is_empty());
        assert_eq!(g.position().get("x"), Some(0.0));
    }

    #[test]
    fn test_move_with_label_and_role_for_one_axis_is_rejected() {
        let mut g = session(EmitterConfig::default());
        g.rename_axis(&Axis::X, "W").unwrap();
        let request = MoveRequest::new().x(10.0).named("W", 5.0);
        assert!(g.move_by(&request).is_err());
        assert!(g.arc(&ArcRequest::new(request)).is_err());
        assert!(body(&g).is_empty());
    }

    #[test]
    fn test_comments_toggle_and_symbol() {
        let config = EmitterConfig::default()
            .with_comments(false)
            .with_comment_symbol(crate::format::CommentSymbol::Parenthesis);
        let mut g = session(config);
        g.comment("layer 1").unwrap();
        g.set_distance_mode(DistanceMode::Absolute).unwrap();
        assert_eq!(g.sink().unwrap().lines(), vec!["G91", "(layer 1)", "G90"]);
    }

    #[test]
    fn test_finish_writes_footer_and_closes() {
        let mut g = session(EmitterConfig::default().with_footer("M2"));
        g.move_by(&MoveRequest::new().x(1.0)).unwrap();
        let sink = g.finish().unwrap();
        assert_eq!(sink.lines(), vec!["G91 ; Set distance mode, relative", "G1 X1", "M2"]);
        assert!(sink.closed);
    }

    #[test]
    fn test_drop_closes_sink() {
        let mut sink = MemorySink::new();
        {
            let mut g = MotionEmitter::new(EmitterConfig::default(), table(), &mut sink).unwrap();
            g.move_by(&MoveRequest::new().y(1.0)).unwrap();
        }
        assert!(sink.closed);
        assert_eq!(sink.lines().len(), 2);
    }

    #[test]
    fn test_run_session() {
        let (position, sink) = run_session(EmitterConfig::default(), table(), MemorySink::new(), |g| {
            g.move_by(&MoveRequest::xy(1.0, 1.0))?;
            Ok(g.position())
        })
        .unwrap();
        assert_eq!(position.get("x"), Some(1.0));
        assert!(sink.closed);

        let mut failing = MemorySink::new();
        let failed = run_session(EmitterConfig::default(), table(), &mut failing, |g| {
            g.move_by(&MoveRequest::new())
        })
        .is_err();
        assert!(failed);
        assert!(failing.closed);
    }

    #[test]
    fn test_wait_for_response_flags_every_line() {
        let mut g = session(EmitterConfig::default().with_wait_for_response(true));
        g.move_by(&MoveRequest::new().x(1.0)).unwrap();
        assert_eq!(g.sink().unwrap().acks, vec![true, true]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = MotionEmitter::new(
            EmitterConfig::default().with_precision(20),
            table(),
            MemorySink::new(),
        );
        assert!(matches!(result, Err(GCodeError::InvalidArgument(_))));
    }
}
