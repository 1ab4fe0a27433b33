//! Mode state machine
//!
//! Guards the tool and coolant subsystems and writes table-driven mode
//! lines through the [`MotionEmitter`] it owns. Each subsystem is either
//! off or in exactly one active mode; moving between two active modes has
//! to go through off.

use crate::codes::InstructionTable;
use crate::config::EmitterConfig;
use crate::emitter::MotionEmitter;
use crate::error::{GCodeError, Result};
use crate::format::Statement;
use crate::modes::*;
use crate::sink::LineSink;
use crate::validator;
use std::sync::Arc;
use tracing::{debug, warn};
use uom::si::f64::Time;
use uom::si::time::{millisecond, second};

pub struct Machine<S: LineSink> {
    motion: MotionEmitter<S>,
    tool_active: bool,
    coolant_active: bool,
    current_tool: Option<u32>,
    spin_mode: SpinMode,
    power_mode: PowerMode,
    coolant_mode: CoolantMode,
}

impl<S: LineSink> Machine<S> {
    /// Wrap an emitter; every subsystem starts off
    pub fn new(motion: MotionEmitter<S>) -> Self {
        Self {
            motion,
            tool_active: false,
            coolant_active: false,
            current_tool: None,
            spin_mode: SpinMode::Off,
            power_mode: PowerMode::Off,
            coolant_mode: CoolantMode::Off,
        }
    }

    /// Open a session and wrap it
    pub fn start(config: EmitterConfig, table: Arc<InstructionTable>, sink: S) -> Result<Self> {
        Ok(Self::new(MotionEmitter::new(config, table, sink)?))
    }

    pub fn motion(&self) -> &MotionEmitter<S> {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut MotionEmitter<S> {
        &mut self.motion
    }

    pub fn into_motion(self) -> MotionEmitter<S> {
        self.motion
    }

    pub fn finish(self) -> Result<S> {
        self.motion.finish()
    }

    pub fn is_tool_active(&self) -> bool {
        self.tool_active
    }

    pub fn is_coolant_active(&self) -> bool {
        self.coolant_active
    }

    pub fn current_tool(&self) -> Option<u32> {
        self.current_tool
    }

    pub fn current_spin_mode(&self) -> SpinMode {
        self.spin_mode
    }

    pub fn current_power_mode(&self) -> PowerMode {
        self.power_mode
    }

    pub fn current_coolant_mode(&self) -> CoolantMode {
        self.coolant_mode
    }

    pub fn select_units(&mut self, units: LengthUnits) -> Result<()> {
        let statement = self.motion.instruction(units)?;
        self.motion.emit(statement, false)
    }

    pub fn select_plane(&mut self, plane: Plane) -> Result<()> {
        self.motion.select_plane(plane)
    }

    pub fn set_distance_mode(&mut self, mode: DistanceMode) -> Result<()> {
        self.motion.set_distance_mode(mode)
    }

    pub fn set_feed_mode(&mut self, mode: FeedMode) -> Result<()> {
        let statement = self.motion.instruction(mode)?;
        self.motion.emit(statement, false)
    }

    pub fn set_extrusion_mode(&mut self, mode: ExtrusionMode) -> Result<()> {
        let statement = self.motion.instruction(mode)?;
        self.motion.emit(statement, false)
    }

    /// `S<power>`: spindle speed, laser power and the like
    pub fn set_tool_power(&mut self, power: f64) -> Result<()> {
        validator::tool_power(power)?;
        let statement = Statement::new(self.motion.formatter().param("S", power));
        self.motion.emit(statement, false)
    }

    pub fn set_fan_speed(&mut self, speed: u32) -> Result<()> {
        validator::fan_speed(speed)?;
        let mode = if speed > 0 { FanMode::Cooling } else { FanMode::Off };
        let statement = self.motion.instruction(mode)?.word(format!("S{}", speed));
        self.motion.emit(statement, false)
    }

    /// Set the bed temperature and return immediately
    pub fn set_bed_temperature(&mut self, units: TemperatureUnits, temperature: f64) -> Result<()> {
        self.set_temperature(ModeValue::BedTemperature(units), units, temperature)
    }

    /// Set the hotend temperature and return immediately
    pub fn set_hotend_temperature(&mut self, units: TemperatureUnits, temperature: f64) -> Result<()> {
        self.set_temperature(ModeValue::HotendTemperature(units), units, temperature)
    }

    fn set_temperature(&mut self, key: ModeValue, units: TemperatureUnits, temperature: f64) -> Result<()> {
        validator::temperature(units, temperature)?;
        let value = self.motion.formatter().param("S", temperature);
        let statement = self.motion.instruction(key)?.word(value);
        self.motion.emit(statement, false)
    }

    /// Dwell for `seconds`, written in `units`
    pub fn sleep(&mut self, units: TimeUnits, seconds: f64) -> Result<()> {
        validator::sleep_time(seconds)?;
        let duration = Time::new::<second>(seconds);
        let value = match units {
            TimeUnits::Seconds => duration.get::<second>(),
            TimeUnits::Milliseconds => duration.get::<millisecond>(),
        };
        let value = self.motion.formatter().param("P", value);
        let statement = self.motion.instruction(units)?.word(value);
        self.motion.emit(statement, false)
    }

    /// Start the tool turning in `mode` at `power`
    pub fn tool_on(&mut self, mode: SpinMode, power: f64) -> Result<()> {
        if mode == SpinMode::Off {
            return Err(GCodeError::transition(
                ModeCategory::Spin,
                "cannot start the tool in mode Off, use tool_off",
            ));
        }
        self.ensure_tool_can_start(ModeCategory::Spin, &format!("{:?}", mode))?;
        validator::tool_power(power)?;

        let statement = self.powered(power, self.motion.instruction(mode)?);
        self.motion.emit(statement, true)?;
        self.tool_active = true;
        self.spin_mode = mode;
        debug!("tool on: {:?} at {}", mode, power);
        Ok(())
    }

    /// Laser style counterpart of [`Machine::tool_on`]
    pub fn power_on(&mut self, mode: PowerMode, power: f64) -> Result<()> {
        if mode == PowerMode::Off {
            return Err(GCodeError::transition(
                ModeCategory::Power,
                "cannot power the tool in mode Off, use tool_off",
            ));
        }
        self.ensure_tool_can_start(ModeCategory::Power, &format!("{:?}", mode))?;
        validator::tool_power(power)?;

        let statement = self.powered(power, self.motion.instruction(mode)?);
        self.motion.emit(statement, true)?;
        self.tool_active = true;
        self.power_mode = mode;
        debug!("tool powered: {:?} at {}", mode, power);
        Ok(())
    }

    /// Always legal, even when the tool is already off
    pub fn tool_off(&mut self) -> Result<()> {
        let statement = self.motion.instruction(SpinMode::Off)?;
        self.motion.emit(statement, true)?;
        self.tool_active = false;
        self.spin_mode = SpinMode::Off;
        self.power_mode = PowerMode::Off;
        debug!("tool off");
        Ok(())
    }

    pub fn coolant_on(&mut self, mode: CoolantMode) -> Result<()> {
        if mode == CoolantMode::Off {
            return Err(GCodeError::transition(
                ModeCategory::Coolant,
                "cannot start coolant in mode Off, use coolant_off",
            ));
        }
        if self.coolant_active {
            let message = if self.coolant_mode == mode {
                format!("coolant already on in mode {:?}", mode)
            } else {
                format!(
                    "cannot switch coolant from {:?} to {:?} without turning it off",
                    self.coolant_mode, mode
                )
            };
            return Err(GCodeError::transition(ModeCategory::Coolant, message));
        }

        let statement = self.motion.instruction(mode)?;
        self.motion.emit(statement, true)?;
        self.coolant_active = true;
        self.coolant_mode = mode;
        debug!("coolant on: {:?}", mode);
        Ok(())
    }

    /// Always legal, even when coolant is already off
    pub fn coolant_off(&mut self) -> Result<()> {
        let statement = self.motion.instruction(CoolantMode::Off)?;
        self.motion.emit(statement, true)?;
        self.coolant_active = false;
        self.coolant_mode = CoolantMode::Off;
        debug!("coolant off");
        Ok(())
    }

    /// `T<n> M06`, with the number zero padded to 1, 2, 4, 8... digits
    pub fn tool_change(&mut self, mode: RackMode, number: u32) -> Result<()> {
        validator::tool_number(number)?;
        self.ensure_idle("tool change")?;

        let digits = number.to_string().len().next_power_of_two();
        let statement = Statement {
            mnemonic: format!("T{:0width$}", number, width = digits),
            ..Statement::default()
        };
        let statement = Self::joined(statement, self.motion.instruction(mode)?);
        self.motion.emit(statement, true)?;
        self.current_tool = Some(number);
        debug!("tool {} selected", number);
        Ok(())
    }

    pub fn halt_program(&mut self, mode: HaltMode) -> Result<()> {
        self.halt_program_with(mode, &[])
    }

    /// Halt with extra words, e.g. `M190 S60` to wait for the bed
    pub fn halt_program_with(&mut self, mode: HaltMode, params: &[(&str, f64)]) -> Result<()> {
        self.ensure_idle("halt")?;
        for (label, value) in params {
            if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(GCodeError::argument(format!("invalid halt parameter `{}`", label)));
            }
            validator::finite(label, *value)?;
        }

        let statement = params
            .iter()
            .fold(self.motion.instruction(mode)?, |statement, (label, value)| {
                statement.word(self.motion.formatter().param(label, *value))
            });
        self.motion.emit(statement, true)?;
        debug!("program halted: {:?}", mode);
        Ok(())
    }

    /// Tool off, coolant off, a comment with `message`, then a forced pause
    pub fn emergency_halt(&mut self, message: &str) -> Result<()> {
        warn!("emergency halt: {}", message);
        self.tool_off()?;
        self.coolant_off()?;
        self.motion.comment(&format!("Emergency halt: {}", message))?;
        self.halt_program(HaltMode::Pause)
    }

    pub fn comment(&mut self, text: &str) -> Result<()> {
        self.motion.comment(text)
    }

    fn ensure_tool_can_start(&self, category: ModeCategory, requested: &str) -> Result<()> {
        if !self.tool_active {
            return Ok(());
        }
        let current = match (self.spin_mode, self.power_mode) {
            (SpinMode::Off, power) => format!("{:?}", power),
            (spin, _) => format!("{:?}", spin),
        };
        let message = if current == requested {
            format!("tool already on in mode {}", current)
        } else {
            format!(
                "cannot switch tool from {} to {} without stopping it",
                current, requested
            )
        };
        Err(GCodeError::transition(category, message))
    }

    fn ensure_idle(&self, operation: &str) -> Result<()> {
        if self.tool_active {
            return Err(GCodeError::ToolStateConflict(format!(
                "{} requested with tool on",
                operation
            )));
        }
        if self.coolant_active {
            return Err(GCodeError::CoolantStateConflict(format!(
                "{} requested with coolant on",
                operation
            )));
        }
        Ok(())
    }

    /// `S<power>` in front of a mode statement
    fn powered(&self, power: f64, statement: Statement) -> Statement {
        let prefix = Statement::new(self.motion.formatter().param("S", power));
        Self::joined(prefix, statement)
    }

    fn joined(head: Statement, tail: Statement) -> Statement {
        let mut words = head.words;
        words.push(tail.mnemonic);
        words.extend(tail.words);
        Statement {
            mnemonic: head.mnemonic,
            words,
            comment: tail.comment.or(head.comment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use pretty_assertions::assert_eq;

    fn machine() -> Machine<MemorySink> {
        Machine::start(
            EmitterConfig::default(),
            Arc::new(InstructionTable::builtin()),
            MemorySink::new(),
        )
        .unwrap()
    }

    fn body(machine: &Machine<MemorySink>) -> Vec<&str> {
        machine.motion().sink().unwrap().lines()[1..].to_vec()
    }

    #[test]
    fn test_tool_on_and_off() {
        let mut m = machine();
        m.tool_on(SpinMode::Clockwise, 1000.0).unwrap();
        assert!(m.is_tool_active());
        m.tool_off().unwrap();
        m.tool_off().unwrap();
        assert!(!m.is_tool_active());
        assert_eq!(
            body(&m),
            vec![
                "S1000 M03 ; Start tool, clockwise",
                "M05 ; Stop tool",
                "M05 ; Stop tool",
            ]
        );
        assert_eq!(m.motion().sink().unwrap().acks, vec![false, true, true, true]);
    }

    #[test]
    fn test_tool_transitions_are_guarded() {
        let mut m = machine();
        assert!(matches!(
            m.tool_on(SpinMode::Off, 100.0),
            Err(GCodeError::InvalidModeTransition { category: ModeCategory::Spin, .. })
        ));
        m.tool_on(SpinMode::Clockwise, 100.0).unwrap();
        assert!(matches!(
            m.tool_on(SpinMode::Clockwise, 100.0),
            Err(GCodeError::InvalidModeTransition { .. })
        ));
        assert!(matches!(
            m.tool_on(SpinMode::Counter, 100.0),
            Err(GCodeError::InvalidModeTransition { .. })
        ));
        assert!(matches!(
            m.power_on(PowerMode::Constant, 50.0),
            Err(GCodeError::InvalidModeTransition { category: ModeCategory::Power, .. })
        ));
        assert_eq!(body(&m).len(), 1);
        assert_eq!(m.current_spin_mode(), SpinMode::Clockwise);
    }

    #[test]
    fn test_tool_power_is_validated_before_writing() {
        let mut m = machine();
        assert!(matches!(
            m.tool_on(SpinMode::Clockwise, -1.0),
            Err(GCodeError::InvalidArgument(_))
        ));
        assert!(m.set_tool_power(-5.0).is_err());
        assert!(body(&m).is_empty());
        assert!(!m.is_tool_active());
    }

    #[test]
    fn test_power_on() {
        let mut m = machine();
        m.power_on(PowerMode::Dynamic, 80.0).unwrap();
        assert_eq!(body(&m), vec!["S80 M04 ; Start tool, dynamic power"]);
        assert_eq!(m.current_power_mode(), PowerMode::Dynamic);
    }

    #[test]
    fn test_coolant_transitions() {
        let mut m = machine();
        m.coolant_on(CoolantMode::Flood).unwrap();
        assert!(m.coolant_on(CoolantMode::Flood).is_err());
        assert!(m.coolant_on(CoolantMode::Mist).is_err());
        m.coolant_off().unwrap();
        m.coolant_on(CoolantMode::Mist).unwrap();
        assert_eq!(
            body(&m),
            vec![
                "M08 ; Turn on coolant, flood",
                "M09 ; Turn off coolant",
                "M07 ; Turn on coolant, mist",
            ]
        );
        assert_eq!(m.current_coolant_mode(), CoolantMode::Mist);
    }

    #[test]
    fn test_tool_change() {
        let mut m = machine();
        m.tool_change(RackMode::Automatic, 1).unwrap();
        m.tool_change(RackMode::Manual, 12).unwrap();
        m.tool_change(RackMode::Automatic, 123).unwrap();
        assert!(matches!(
            m.tool_change(RackMode::Automatic, 0),
            Err(GCodeError::InvalidArgument(_))
        ));
        assert_eq!(
            body(&m),
            vec![
                "T1 M06 ; Tool change, automatic",
                "T12 M06 ; Tool change, manual",
                "T0123 M06 ; Tool change, automatic",
            ]
        );
        assert_eq!(m.current_tool(), Some(123));
    }

    #[test]
    fn test_tool_change_conflicts() {
        let mut m = machine();
        m.tool_on(SpinMode::Clockwise, 1.0).unwrap();
        assert!(matches!(
            m.tool_change(RackMode::Manual, 2),
            Err(GCodeError::ToolStateConflict(_))
        ));
        m.tool_off().unwrap();
        m.coolant_on(CoolantMode::Mist).unwrap();
        assert!(matches!(
            m.tool_change(RackMode::Manual, 2),
            Err(GCodeError::CoolantStateConflict(_))
        ));
        assert!(matches!(
            m.halt_program(HaltMode::EndWithReset),
            Err(GCodeError::CoolantStateConflict(_))
        ));
        assert_eq!(m.current_tool(), None);
    }

    #[test]
    fn test_halt_with_params() {
        let mut m = machine();
        m.halt_program_with(HaltMode::WaitForBed, &[("S", 60.0)]).unwrap();
        m.halt_program(HaltMode::EndWithReset).unwrap();
        assert_eq!(
            body(&m),
            vec![
                "M190 S60 ; Wait for bed to reach temperature",
                "M30 ; End of program, stop and reset",
            ]
        );
    }

    #[test]
    fn test_emergency_halt_sequence() {
        let mut m = machine();
        m.tool_on(SpinMode::Counter, 500.0).unwrap();
        m.coolant_on(CoolantMode::Flood).unwrap();
        m.emergency_halt("spindle stalled").unwrap();
        assert_eq!(
            body(&m)[2..].to_vec(),
            vec![
                "M05 ; Stop tool",
                "M09 ; Turn off coolant",
                "; Emergency halt: spindle stalled",
                "M00 ; Pause program, forced",
            ]
        );
        assert!(!m.is_tool_active() && !m.is_coolant_active());
    }

    #[test]
    fn test_emergency_halt_from_idle() {
        let mut m = machine();
        m.emergency_halt("door open").unwrap();
        assert_eq!(body(&m).len(), 4);
    }

    #[test]
    fn test_machine_settings() {
        let mut m = machine();
        m.select_units(LengthUnits::Millimeters).unwrap();
        m.set_feed_mode(FeedMode::UnitsPerMinute).unwrap();
        m.set_extrusion_mode(ExtrusionMode::Relative).unwrap();
        m.set_tool_power(12.5).unwrap();
        m.set_fan_speed(255).unwrap();
        m.set_fan_speed(0).unwrap();
        assert!(m.set_fan_speed(256).is_err());
        m.set_bed_temperature(TemperatureUnits::Celsius, 60.0).unwrap();
        m.set_hotend_temperature(TemperatureUnits::Celsius, 210.0).unwrap();
        assert!(m.set_hotend_temperature(TemperatureUnits::Kelvin, -3.0).is_err());
        assert_eq!(
            body(&m),
            vec![
                "G21 ; Set length units, millimeters",
                "G94 ; Set feed rate mode, units per minute",
                "M83 ; Set extrusion mode, relative",
                "S12.5",
                "M106 S255 ; Set fan speed",
                "M106 S0 ; Turn off fan",
                "M140 S60 ; Set bed temperature, celsius",
                "M104 S210 ; Set hotend temperature, celsius",
            ]
        );
    }

    #[test]
    fn test_sleep_scales_units() {
        let mut m = machine();
        m.sleep(TimeUnits::Seconds, 1.5).unwrap();
        m.sleep(TimeUnits::Milliseconds, 1.5).unwrap();
        assert!(m.sleep(TimeUnits::Seconds, 0.0005).is_err());
        assert_eq!(
            body(&m),
            vec![
                "G04 P1.5 ; Sleep for a while, seconds",
                "G04 P1500 ; Sleep for a while, milliseconds",
            ]
        );
    }

    #[test]
    fn test_motion_through_machine() {
        let mut m = machine();
        m.select_plane(Plane::XY).unwrap();
        m.motion_mut().move_by(&crate::request::MoveRequest::xy(1.0, 2.0)).unwrap();
        m.set_distance_mode(DistanceMode::Absolute).unwrap();
        let sink = m.finish().unwrap();
        assert_eq!(
            sink.lines()[1..].to_vec(),
            vec!["G17 ; Select plane, XY", "G1 X1 Y2", "G90 ; Set distance mode, absolute"]
        );
    }
}
