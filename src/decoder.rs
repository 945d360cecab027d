//! Decoding of the 6-byte weight report defined by the *HID Point of Sale
//! Usage Tables*, version 1.02.

use derive_more::Display;

use crate::constants::WEIGH_REPORT_SIZE;
use crate::error::ScaleError;

/// Unit abbreviations as set forth by the *HID Point of Sale Usage Tables*.
/// The unit code returned by the scale is the index of its string.
pub static UNITS: [&str; 13] = [
    "units",  // unknown unit
    "mg",     // milligram
    "g",      // gram
    "kg",     // kilogram
    "cd",     // carat
    "taels",  // lian
    "gr",     // grain
    "dwt",    // pennyweight
    "tonnes", // metric tons
    "tons",   // avoir ton
    "ozt",    // troy ounce
    "oz",     // ounce
    "lbs",    // pound
];

/// Status byte of a weight report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleStatus {
    Fault,
    Zeroed,
    Weighing,
    Settled,
    UnderZero,
    OverWeight,
    CalibrationNeeded,
    RezeroNeeded,
    Unknown(u8),
}

impl ScaleStatus {
    pub fn from_byte(code: u8) -> Self {
        match code {
            0x01 => ScaleStatus::Fault,
            0x02 => ScaleStatus::Zeroed,
            0x03 => ScaleStatus::Weighing,
            0x04 => ScaleStatus::Settled,
            0x05 => ScaleStatus::UnderZero,
            0x06 => ScaleStatus::OverWeight,
            0x07 => ScaleStatus::CalibrationNeeded,
            0x08 => ScaleStatus::RezeroNeeded,
            other => ScaleStatus::Unknown(other),
        }
    }

    /// Human-readable message for the statuses we wait on. Terminal
    /// statuses carry their message through `Weight` or `ScaleError`
    /// instead.
    fn advisory(&self) -> Option<&'static str> {
        match self {
            ScaleStatus::Zeroed => Some("Scale is zero'd..."),
            ScaleStatus::Weighing => Some("Weighing..."),
            ScaleStatus::UnderZero => Some("Scale reports Under Zero"),
            ScaleStatus::OverWeight => Some("Scale reports Over Weight"),
            ScaleStatus::CalibrationNeeded => Some("Scale reports Calibration Needed"),
            ScaleStatus::RezeroNeeded => Some("Scale reports Re-zeroing Needed!"),
            _ => None,
        }
    }
}

/// A settled weight, ready to print.
#[derive(Debug, Display, Clone, Copy, PartialEq)]
#[display(fmt = "{} {}", value, unit)]
pub struct Weight {
    pub value: f64,
    pub unit: &'static str,
}

/// What one decoded report means for the read loop.
#[derive(Debug, Clone, PartialEq)]
pub enum WeighOutcome {
    /// The scale has a stable, final weight.
    Settled(Weight),
    /// Keep reading. `advisory` holds the status message to surface, or
    /// `None` when the status merely repeated the previous report.
    Retry { advisory: Option<&'static str> },
    /// The report or the scale state ends the session without a weight.
    Fatal(ScaleError),
}

/// Decode one weight report.
///
/// `prior` is the status of the previous report in this session (`None`
/// before the first decode); it only controls whether a repeated transient
/// status surfaces its advisory message again. The returned status must be
/// threaded into the next call.
pub fn decode(
    raw: &[u8; WEIGH_REPORT_SIZE],
    prior: Option<ScaleStatus>,
) -> (WeighOutcome, Option<ScaleStatus>) {
    // The report id is 0x03 for a weight report (some scales use 0x04).
    let report = raw[0];
    if report != 0x03 && report != 0x04 {
        return (
            WeighOutcome::Fatal(ScaleError::UnrecognizedReport(report)),
            prior,
        );
    }

    let status = ScaleStatus::from_byte(raw[1]);
    let unit_code = raw[2];
    // Scaling is applied to the magnitude as a signed base-ten exponent.
    let exponent = raw[3] as i8;
    let magnitude = u16::from_le_bytes([raw[4], raw[5]]) as f64;
    let weight = magnitude * 10f64.powi(exponent as i32);

    let outcome = match status {
        ScaleStatus::Fault => WeighOutcome::Fatal(ScaleError::ScaleFault),
        ScaleStatus::Unknown(code) => WeighOutcome::Fatal(ScaleError::UnknownStatus(code)),
        // Settled is the only successful terminal status; here the unit
        // code picks the label out of the UNITS table.
        ScaleStatus::Settled => match UNITS.get(unit_code as usize) {
            Some(&unit) => WeighOutcome::Settled(Weight {
                value: weight,
                unit,
            }),
            None => WeighOutcome::Fatal(ScaleError::UnknownUnit(unit_code)),
        },
        transient => WeighOutcome::Retry {
            advisory: if prior != Some(transient) {
                transient.advisory()
            } else {
                None
            },
        },
    };

    (outcome, Some(status))
}
