// Length, weight and temperature conversion plus result formatting

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ToolError;

/// Meters per unit
pub const LENGTH_FACTORS: &[(&str, f64)] = &[
    ("m", 1.0),
    ("km", 1000.0),
    ("cm", 0.01),
    ("mm", 0.001),
    ("in", 0.0254),
    ("ft", 0.3048),
    ("yd", 0.9144),
    ("mi", 1609.344),
];

/// Kilograms per unit
pub const WEIGHT_FACTORS: &[(&str, f64)] = &[
    ("kg", 1.0),
    ("g", 0.001),
    ("mg", 0.000001),
    ("lb", 0.45359237),
    ("oz", 0.028349523125),
    ("t", 1000.0),
];

pub const TEMPERATURE_UNITS: &[&str] = &["C", "F", "K"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    Length,
    Weight,
    Temperature,
}

impl UnitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitCategory::Length => "length",
            UnitCategory::Weight => "weight",
            UnitCategory::Temperature => "temperature",
        }
    }

    /// Unit symbols in display order
    pub fn units(&self) -> Vec<&'static str> {
        match self {
            UnitCategory::Length => LENGTH_FACTORS.iter().map(|(u, _)| *u).collect(),
            UnitCategory::Weight => WEIGHT_FACTORS.iter().map(|(u, _)| *u).collect(),
            UnitCategory::Temperature => TEMPERATURE_UNITS.to_vec(),
        }
    }

    fn factor(&self, unit: &str) -> Result<f64, ToolError> {
        let table = match self {
            UnitCategory::Length => LENGTH_FACTORS,
            UnitCategory::Weight => WEIGHT_FACTORS,
            UnitCategory::Temperature => &[],
        };
        table
            .iter()
            .find(|(u, _)| *u == unit)
            .map(|(_, f)| *f)
            .ok_or_else(|| self.unknown_unit(unit))
    }

    fn unknown_unit(&self, unit: &str) -> ToolError {
        ToolError::UnknownUnit {
            category: self.as_str().to_string(),
            unit: unit.to_string(),
        }
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitCategory {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "length" => Ok(UnitCategory::Length),
            "weight" => Ok(UnitCategory::Weight),
            "temperature" | "temp" => Ok(UnitCategory::Temperature),
            _ => Err(ToolError::UnknownConversionCategory(s.to_string())),
        }
    }
}

fn to_celsius(value: f64, unit: &str) -> Result<f64, ToolError> {
    match unit {
        "C" => Ok(value),
        "F" => Ok((value - 32.0) * 5.0 / 9.0),
        "K" => Ok(value - 273.15),
        _ => Err(UnitCategory::Temperature.unknown_unit(unit)),
    }
}

fn from_celsius(celsius: f64, unit: &str) -> Result<f64, ToolError> {
    match unit {
        "C" => Ok(celsius),
        "F" => Ok(celsius * 9.0 / 5.0 + 32.0),
        "K" => Ok(celsius + 273.15),
        _ => Err(UnitCategory::Temperature.unknown_unit(unit)),
    }
}

/// Convert `value` between two units of the same category
pub fn convert_value(category: UnitCategory, from: &str, to: &str, value: f64) -> Result<f64, ToolError> {
    if !value.is_finite() {
        return Err(ToolError::NonFiniteValue(value));
    }

    match category {
        UnitCategory::Temperature => {
            let celsius = to_celsius(value, from)?;
            if from == to {
                return Ok(value);
            }
            from_celsius(celsius, to)
        }
        UnitCategory::Length | UnitCategory::Weight => {
            let from_factor = category.factor(from)?;
            let to_factor = category.factor(to)?;
            if from == to {
                return Ok(value);
            }
            Ok(value * from_factor / to_factor)
        }
    }
}

/// How results are rounded for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Rounding {
    /// 4 decimals for |n| >= 1, 6 below
    #[default]
    Auto,
    Fixed { digits: u8 },
}

/// Fractional decimal places needed to write `n` out exactly
fn exact_places(n: f64) -> usize {
    let bits = n.abs().to_bits();
    let biased = (bits >> 52) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };
    if mantissa == 0 {
        return 0;
    }
    let lowest = exponent + mantissa.trailing_zeros() as i32;
    (-lowest).max(0) as usize
}

/// Fixed-point text rounded half away from zero.
///
/// The formatter rounds exact halves to even, so a value whose exact
/// expansion ends in a 5 at `digits + 1` places is moved one ulp outward first.
fn to_fixed(n: f64, digits: usize) -> String {
    let places = exact_places(n);
    let is_half = places == digits + 1 && format!("{:.places$}", n.abs()).ends_with('5');
    let n = if is_half { f64::from_bits(n.to_bits() + 1) } else { n };
    format!("{n:.digits$}")
}

/// Round for display and drop trailing zeros; empty for non-finite input
pub fn format_number(n: f64, rounding: Rounding) -> String {
    if !n.is_finite() {
        return String::new();
    }

    let digits = match rounding {
        Rounding::Fixed { digits } => digits as usize,
        Rounding::Auto if n.abs() >= 1.0 => 4,
        Rounding::Auto => 6,
    };

    let formatted = to_fixed(n, digits);
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        formatted.as_str()
    };

    match trimmed {
        "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Parse a user-entered number, rejecting anything that is not finite
pub fn parse_value(raw: &str) -> Result<f64, ToolError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ToolError::InvalidNumber(raw.to_string()))?;
    if !value.is_finite() {
        return Err(ToolError::NonFiniteValue(value));
    }
    Ok(value)
}
