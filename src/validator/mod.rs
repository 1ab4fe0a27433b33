//! Argument checks shared by the emitter and the machine
//!
//! Every check runs before anything is written for the call.

use crate::error::{GCodeError, Result};
use crate::modes::TemperatureUnits;
use uom::si::f64::ThermodynamicTemperature;
use uom::si::thermodynamic_temperature::{degree_celsius, kelvin};

/// Words an axis label may not take
const RESERVED_LABELS: &[&str] = &["F", "G", "M", "N", "T"];

pub const MAX_FAN_SPEED: u32 = 255;
pub const MIN_SLEEP_SECONDS: f64 = 0.001;
pub const MAX_PRECISION: usize = 12;
/// Upper bound on moves generated from one pattern or arc
pub const MAX_STEPS: usize = 100_000;

pub fn finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GCodeError::argument(format!("{} must be finite, got {}", name, value)))
    }
}

pub fn positive(name: &str, value: f64) -> Result<f64> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(GCodeError::argument(format!("{} must be positive, got {}", name, value)))
    }
}

pub fn axis_label(label: &str) -> Result<()> {
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(GCodeError::argument(format!(
            "invalid axis label `{}`: expected ASCII letters",
            label
        )));
    }
    if RESERVED_LABELS.contains(&label) {
        return Err(GCodeError::argument(format!("axis label `{}` is reserved", label)));
    }
    Ok(())
}

pub fn tool_number(number: u32) -> Result<u32> {
    if number < 1 {
        return Err(GCodeError::argument(format!("invalid tool number `{}`", number)));
    }
    Ok(number)
}

pub fn tool_power(power: f64) -> Result<f64> {
    if !power.is_finite() || power < 0.0 {
        return Err(GCodeError::argument(format!("invalid tool power `{}`", power)));
    }
    Ok(power)
}

pub fn fan_speed(speed: u32) -> Result<u32> {
    if speed > MAX_FAN_SPEED {
        return Err(GCodeError::argument(format!(
            "invalid fan speed `{}` (max: {})",
            speed, MAX_FAN_SPEED
        )));
    }
    Ok(speed)
}

pub fn sleep_time(seconds: f64) -> Result<f64> {
    if !seconds.is_finite() || seconds < MIN_SLEEP_SECONDS {
        return Err(GCodeError::argument(format!("invalid sleep time `{}`", seconds)));
    }
    Ok(seconds)
}

/// Rejects temperatures below absolute zero
pub fn temperature(units: TemperatureUnits, value: f64) -> Result<f64> {
    finite("temperature", value)?;
    let absolute = match units {
        TemperatureUnits::Celsius => ThermodynamicTemperature::new::<degree_celsius>(value),
        TemperatureUnits::Kelvin => ThermodynamicTemperature::new::<kelvin>(value),
    };
    if absolute.get::<kelvin>() < -1e-9 {
        return Err(GCodeError::argument(format!(
            "temperature {} {:?} is below absolute zero",
            value, units
        )));
    }
    Ok(value)
}

/// Whole step count for a generated path, rounded up
pub fn step_count(name: &str, count: f64) -> Result<usize> {
    if !count.is_finite() || count < 0.0 || count.ceil() > MAX_STEPS as f64 {
        return Err(GCodeError::argument(format!(
            "{} out of range: {} (max: {})",
            name, count, MAX_STEPS
        )));
    }
    Ok(count.ceil() as usize)
}

pub fn precision(precision: usize) -> Result<usize> {
    if precision > MAX_PRECISION {
        return Err(GCodeError::argument(format!(
            "precision {} out of range (max: {})",
            precision, MAX_PRECISION
        )));
    }
    Ok(precision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_labels() {
        assert!(axis_label("A").is_ok());
        assert!(axis_label("Bb").is_ok());
        assert!(axis_label("").is_err());
        assert!(axis_label("A1").is_err());
        assert!(axis_label("F").is_err());
    }

    #[test]
    fn test_machine_ranges() {
        assert!(tool_number(0).is_err());
        assert_eq!(tool_number(3).unwrap(), 3);
        assert!(tool_power(-1.0).is_err());
        assert!(tool_power(f64::NAN).is_err());
        assert!(fan_speed(256).is_err());
        assert_eq!(fan_speed(255).unwrap(), 255);
        assert!(sleep_time(0.0005).is_err());
        assert!(sleep_time(0.001).is_ok());
    }

    #[test]
    fn test_temperature_floor() {
        assert!(temperature(TemperatureUnits::Celsius, 60.0).is_ok());
        assert!(temperature(TemperatureUnits::Celsius, -300.0).is_err());
        assert!(temperature(TemperatureUnits::Kelvin, 0.0).is_ok());
        assert!(temperature(TemperatureUnits::Kelvin, -1.0).is_err());
    }

    #[test]
    fn test_step_count() {
        assert_eq!(step_count("passes", 2.2).unwrap(), 3);
        assert_eq!(step_count("passes", 0.0).unwrap(), 0);
        assert_eq!(step_count("passes", MAX_STEPS as f64).unwrap(), MAX_STEPS);
        assert!(step_count("passes", MAX_STEPS as f64 + 0.5).is_err());
        assert!(step_count("passes", 1e300).is_err());
        assert!(step_count("passes", f64::INFINITY).is_err());
        assert!(step_count("passes", f64::NAN).is_err());
    }

    #[test]
    fn test_positive() {
        assert!(positive("spacing", 0.0).is_err());
        assert!(positive("spacing", f64::INFINITY).is_err());
        assert_eq!(positive("spacing", 1.5).unwrap(), 1.5);
    }
}
