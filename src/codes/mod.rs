//! Instruction table
//!
//! Build-once codec from [`ModeValue`] to an instruction mnemonic and a
//! human readable description. The table is populated at startup and then
//! shared read-only (usually behind an `Arc`) by the motion emitter and
//! the machine.

use crate::error::{GCodeError, Result};
use crate::modes::*;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct GCodeEntry {
    pub mode: ModeValue,
    pub instruction: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct InstructionTable {
    entries: HashMap<ModeValue, GCodeEntry>,
    order: Vec<ModeValue>,
}

impl InstructionTable {
    /// Empty table, see [`InstructionTable::builtin`] for the stock mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding every built-in mode mapping
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (mode, instruction, description) in BUILTIN {
            table.insert(*mode, *instruction, *description);
        }
        table
    }

    /// Build a table from entries, failing on the first duplicate key
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ModeValue, S, S)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (mode, instruction, description) in entries {
            table.register(mode, instruction, description)?;
        }
        Ok(table)
    }

    pub fn register(
        &mut self,
        mode: ModeValue,
        instruction: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<()> {
        if self.entries.contains_key(&mode) {
            return Err(GCodeError::TableLookupMiss(format!(
                "duplicate entry for {}",
                mode
            )));
        }
        self.insert(mode, instruction, description);
        Ok(())
    }

    pub fn lookup(&self, mode: impl Into<ModeValue>) -> Result<&GCodeEntry> {
        let mode = mode.into();
        self.entries
            .get(&mode)
            .ok_or_else(|| GCodeError::TableLookupMiss(format!("no entry for {}", mode)))
    }

    pub fn contains(&self, mode: impl Into<ModeValue>) -> bool {
        self.entries.contains_key(&mode.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &GCodeEntry> {
        self.order.iter().filter_map(|mode| self.entries.get(mode))
    }

    fn insert(&mut self, mode: ModeValue, instruction: impl Into<String>, description: impl Into<String>) {
        let entry = GCodeEntry {
            mode,
            instruction: instruction.into(),
            description: description.into(),
        };
        if self.entries.insert(mode, entry).is_none() {
            self.order.push(mode);
        }
    }
}

const BUILTIN: &[(ModeValue, &str, &str)] = &[
    // Length units
    (ModeValue::LengthUnits(LengthUnits::Inches), "G20", "Set length units, inches"),
    (ModeValue::LengthUnits(LengthUnits::Millimeters), "G21", "Set length units, millimeters"),
    // Distance
    (ModeValue::Distance(DistanceMode::Absolute), "G90", "Set distance mode, absolute"),
    (ModeValue::Distance(DistanceMode::Relative), "G91", "Set distance mode, relative"),
    // Extrusion
    (ModeValue::Extrusion(ExtrusionMode::Absolute), "M82", "Set extrusion mode, absolute"),
    (ModeValue::Extrusion(ExtrusionMode::Relative), "M83", "Set extrusion mode, relative"),
    // Feed rate
    (ModeValue::Feed(FeedMode::InverseTime), "G93", "Set feed rate mode, inverse time"),
    (ModeValue::Feed(FeedMode::UnitsPerMinute), "G94", "Set feed rate mode, units per minute"),
    (ModeValue::Feed(FeedMode::UnitsPerRevolution), "G95", "Set feed rate mode, units per revolution"),
    // Tool control
    (ModeValue::Spin(SpinMode::Clockwise), "M03", "Start tool, clockwise"),
    (ModeValue::Spin(SpinMode::Counter), "M04", "Start tool, counterclockwise"),
    (ModeValue::Spin(SpinMode::Off), "M05", "Stop tool"),
    (ModeValue::Power(PowerMode::Constant), "M03", "Start tool, constant power"),
    (ModeValue::Power(PowerMode::Dynamic), "M04", "Start tool, dynamic power"),
    (ModeValue::Power(PowerMode::Off), "M05", "Stop tool"),
    // Tool swap
    (ModeValue::Rack(RackMode::Automatic), "M06", "Tool change, automatic"),
    (ModeValue::Rack(RackMode::Manual), "M06", "Tool change, manual"),
    // Coolant
    (ModeValue::Coolant(CoolantMode::Flood), "M08", "Turn on coolant, flood"),
    (ModeValue::Coolant(CoolantMode::Mist), "M07", "Turn on coolant, mist"),
    (ModeValue::Coolant(CoolantMode::Off), "M09", "Turn off coolant"),
    // Fan
    (ModeValue::Fan(FanMode::Cooling), "M106", "Set fan speed"),
    (ModeValue::Fan(FanMode::Off), "M106", "Turn off fan"),
    // Temperature
    (ModeValue::BedTemperature(TemperatureUnits::Celsius), "M140", "Set bed temperature, celsius"),
    (ModeValue::BedTemperature(TemperatureUnits::Kelvin), "M140", "Set bed temperature, kelvin"),
    (ModeValue::HotendTemperature(TemperatureUnits::Celsius), "M104", "Set hotend temperature, celsius"),
    (ModeValue::HotendTemperature(TemperatureUnits::Kelvin), "M104", "Set hotend temperature, kelvin"),
    // Plane selection
    (ModeValue::Plane(Plane::XY), "G17", "Select plane, XY"),
    (ModeValue::Plane(Plane::YZ), "G19", "Select plane, YZ"),
    (ModeValue::Plane(Plane::ZX), "G18", "Select plane, ZX"),
    // Sleep
    (ModeValue::Sleep(TimeUnits::Seconds), "G04", "Sleep for a while, seconds"),
    (ModeValue::Sleep(TimeUnits::Milliseconds), "G04", "Sleep for a while, milliseconds"),
    // Halt
    (ModeValue::Halt(HaltMode::Pause), "M00", "Pause program, forced"),
    (ModeValue::Halt(HaltMode::OptionalPause), "M01", "Pause program, optional"),
    (ModeValue::Halt(HaltMode::EndWithoutReset), "M02", "End of program, no reset"),
    (ModeValue::Halt(HaltMode::EndWithReset), "M30", "End of program, stop and reset"),
    (ModeValue::Halt(HaltMode::PalletExchange), "M60", "Exchange pallet and end program"),
    (ModeValue::Halt(HaltMode::WaitForBed), "M190", "Wait for bed to reach temperature"),
    (ModeValue::Halt(HaltMode::WaitForHotend), "M109", "Wait for hotend to reach temperature"),
];
