//! Machine modes
//!
//! Every value here maps to exactly one instruction through the
//! instruction table. Distinct categories may share a mnemonic, so the
//! table is keyed by [`ModeValue`], which carries its category.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    Absolute, // G90
    #[default]
    Relative, // G91
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtrusionMode {
    Absolute, // M82
    Relative, // M83
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    InverseTime,        // G93
    UnitsPerMinute,     // G94
    UnitsPerRevolution, // G95
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinMode {
    #[default]
    Off, // M05
    Clockwise, // M03
    Counter,   // M04
}

/// Laser style power control, sharing the tool subsystem with [`SpinMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerMode {
    #[default]
    Off, // M05
    Constant, // M03
    Dynamic,  // M04
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RackMode {
    Automatic, // M06
    Manual,    // M06
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoolantMode {
    #[default]
    Off, // M09
    Flood, // M08
    Mist,  // M07
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanMode {
    Off,
    Cooling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltMode {
    Pause,           // M00
    OptionalPause,   // M01
    EndWithoutReset, // M02
    EndWithReset,    // M30
    PalletExchange,  // M60
    WaitForBed,      // M190
    WaitForHotend,   // M109
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plane {
    XY, // G17
    ZX, // G18
    YZ, // G19
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnits {
    Inches,      // G20
    Millimeters, // G21
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnits {
    Seconds,
    Milliseconds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnits {
    Celsius,
    Kelvin,
}

/// Category half of an instruction table key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeCategory {
    Distance,
    Extrusion,
    Feed,
    Spin,
    Power,
    Rack,
    Coolant,
    Fan,
    BedTemperature,
    HotendTemperature,
    Plane,
    Sleep,
    Halt,
    LengthUnits,
}

impl fmt::Display for ModeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeCategory::Distance => "distance mode",
            ModeCategory::Extrusion => "extrusion mode",
            ModeCategory::Feed => "feed mode",
            ModeCategory::Spin => "spin mode",
            ModeCategory::Power => "power mode",
            ModeCategory::Rack => "rack mode",
            ModeCategory::Coolant => "coolant mode",
            ModeCategory::Fan => "fan mode",
            ModeCategory::BedTemperature => "bed temperature",
            ModeCategory::HotendTemperature => "hotend temperature",
            ModeCategory::Plane => "plane",
            ModeCategory::Sleep => "sleep",
            ModeCategory::Halt => "halt mode",
            ModeCategory::LengthUnits => "length units",
        };
        write!(f, "{}", name)
    }
}

/// Compound (category, value) key of the instruction table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeValue {
    Distance(DistanceMode),
    Extrusion(ExtrusionMode),
    Feed(FeedMode),
    Spin(SpinMode),
    Power(PowerMode),
    Rack(RackMode),
    Coolant(CoolantMode),
    Fan(FanMode),
    BedTemperature(TemperatureUnits),
    HotendTemperature(TemperatureUnits),
    Plane(Plane),
    Sleep(TimeUnits),
    Halt(HaltMode),
    LengthUnits(LengthUnits),
}

impl ModeValue {
    pub fn category(&self) -> ModeCategory {
        match self {
            ModeValue::Distance(_) => ModeCategory::Distance,
            ModeValue::Extrusion(_) => ModeCategory::Extrusion,
            ModeValue::Feed(_) => ModeCategory::Feed,
            ModeValue::Spin(_) => ModeCategory::Spin,
            ModeValue::Power(_) => ModeCategory::Power,
            ModeValue::Rack(_) => ModeCategory::Rack,
            ModeValue::Coolant(_) => ModeCategory::Coolant,
            ModeValue::Fan(_) => ModeCategory::Fan,
            ModeValue::BedTemperature(_) => ModeCategory::BedTemperature,
            ModeValue::HotendTemperature(_) => ModeCategory::HotendTemperature,
            ModeValue::Plane(_) => ModeCategory::Plane,
            ModeValue::Sleep(_) => ModeCategory::Sleep,
            ModeValue::Halt(_) => ModeCategory::Halt,
            ModeValue::LengthUnits(_) => ModeCategory::LengthUnits,
        }
    }
}

impl fmt::Display for ModeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeValue::Distance(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Extrusion(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Feed(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Spin(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Power(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Rack(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Coolant(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Fan(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::BedTemperature(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::HotendTemperature(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Plane(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Sleep(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::Halt(v) => write!(f, "{}::{:?}", self.category(), v),
            ModeValue::LengthUnits(v) => write!(f, "{}::{:?}", self.category(), v),
        }
    }
}

macro_rules! mode_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ModeValue {
                fn from(value: $ty) -> Self {
                    ModeValue::$variant(value)
                }
            }
        )*
    };
}

// Temperature units are left out: bed and hotend share them.
mode_value_from! {
    DistanceMode => Distance,
    ExtrusionMode => Extrusion,
    FeedMode => Feed,
    SpinMode => Spin,
    PowerMode => Power,
    RackMode => Rack,
    CoolantMode => Coolant,
    FanMode => Fan,
    Plane => Plane,
    TimeUnits => Sleep,
    HaltMode => Halt,
    LengthUnits => LengthUnits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_differ_across_categories() {
        let spin: ModeValue = SpinMode::Clockwise.into();
        let power: ModeValue = PowerMode::Constant.into();
        assert_ne!(spin, power);
        assert_eq!(spin.category(), ModeCategory::Spin);
        assert_eq!(power.category(), ModeCategory::Power);

        let bed = ModeValue::BedTemperature(TemperatureUnits::Celsius);
        let hotend = ModeValue::HotendTemperature(TemperatureUnits::Celsius);
        assert_ne!(bed, hotend);
    }

    #[test]
    fn test_distance_mode_defaults_to_relative() {
        assert_eq!(DistanceMode::default(), DistanceMode::Relative);
        let parsed: DistanceMode = serde_json::from_str("\"absolute\"").unwrap();
        assert_eq!(parsed, DistanceMode::Absolute);
    }

    #[test]
    fn test_display_names_category_and_value() {
        let value: ModeValue = CoolantMode::Mist.into();
        assert_eq!(value.to_string(), "coolant mode::Mist");
    }
}
