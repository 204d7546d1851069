//! Wavelength and wavenumber values.
//!
//! MIRcat accepts and reports tuning targets either as a wavelength in
//! micrometers or as a wavenumber in cm⁻¹. The two are reciprocal:
//! `wn = 1e4 / wl`.

use crate::error::DaqError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit of a tuning value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WwUnits {
    /// Wavelength in micrometers ("wl").
    Microns,
    /// Wavenumber in cm⁻¹ ("wn").
    Wavenumbers,
}

impl WwUnits {
    /// Short unit symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            WwUnits::Microns => "um",
            WwUnits::Wavenumbers => "cm-1",
        }
    }
}

impl fmt::Display for WwUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for WwUnits {
    type Err = DaqError;

    /// Accepts the tune/scan mode strings `"wl"` and `"wn"` plus a few
    /// spelled-out aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wl" | "um" | "micron" | "microns" => Ok(WwUnits::Microns),
            "wn" | "cm-1" | "cm1" | "wavenumber" | "wavenumbers" => Ok(WwUnits::Wavenumbers),
            other => Err(DaqError::InvalidParameter(format!(
                "unknown tuning mode '{other}' (expected 'wl' or 'wn')"
            ))),
        }
    }
}

/// Reciprocal conversion between microns and cm⁻¹. Zero stays zero.
pub fn reciprocal(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        1e4 / value
    }
}

/// A tuning value with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wavelength {
    pub value: f64,
    pub units: WwUnits,
}

impl Wavelength {
    pub fn new(value: f64, units: WwUnits) -> Self {
        Self { value, units }
    }

    pub fn microns(value: f64) -> Self {
        Self::new(value, WwUnits::Microns)
    }

    pub fn wavenumbers(value: f64) -> Self {
        Self::new(value, WwUnits::Wavenumbers)
    }

    /// Both representations of this value.
    pub fn reading(&self) -> WwReading {
        match self.units {
            WwUnits::Microns => WwReading {
                wavelength_um: self.value,
                wavenumber_cm1: reciprocal(self.value),
            },
            WwUnits::Wavenumbers => WwReading {
                wavelength_um: reciprocal(self.value),
                wavenumber_cm1: self.value,
            },
        }
    }

    pub fn as_microns(&self) -> f64 {
        self.reading().wavelength_um
    }

    pub fn as_wavenumbers(&self) -> f64 {
        self.reading().wavenumber_cm1
    }
}

impl fmt::Display for Wavelength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.units)
    }
}

/// A wavelength reading expressed in both units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WwReading {
    pub wavelength_um: f64,
    pub wavenumber_cm1: f64,
}
