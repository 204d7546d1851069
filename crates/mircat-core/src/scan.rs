//! Sweep scan requests and scan status.
//!
//! The scan itself is sequenced inside the vendor firmware. These types only
//! describe what to ask for and what the SDK reports back.

use crate::error::DaqError;
use crate::units::{WwReading, WwUnits};
use serde::{Deserialize, Serialize};

/// Parameters for `MIRcatSDK_StartSweepScan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepScan {
    pub units: WwUnits,
    /// Start of the sweep, in `units`.
    pub start: f64,
    /// End of the sweep, in `units`.
    pub end: f64,
    /// Sweep speed, in `units` per second.
    pub speed: f64,
    #[serde(default = "default_repetitions")]
    pub repetitions: u16,
    #[serde(default)]
    pub bidirectional: bool,
}

fn default_repetitions() -> u16 {
    1
}

impl SweepScan {
    /// Single unidirectional sweep.
    pub fn new(units: WwUnits, start: f64, end: f64, speed: f64) -> Self {
        Self {
            units,
            start,
            end,
            speed,
            repetitions: default_repetitions(),
            bidirectional: false,
        }
    }

    pub fn with_repetitions(mut self, repetitions: u16) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    /// Reject requests the SDK could never accept.
    ///
    /// Tuning range checks are left to the SDK, which knows the installed
    /// QCLs.
    pub fn validate(&self) -> Result<(), DaqError> {
        for (name, value) in [("start", self.start), ("end", self.end)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DaqError::InvalidParameter(format!(
                    "sweep {name} must be a positive number, got {value}"
                )));
            }
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(DaqError::InvalidParameter(format!(
                "sweep speed must be positive, got {}",
                self.speed
            )));
        }
        if self.repetitions == 0 {
            return Err(DaqError::InvalidParameter(
                "sweep repetitions must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Snapshot returned by `MIRcatSDK_GetScanStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub in_progress: bool,
    pub active: bool,
    pub paused: bool,
    pub current_repetition: u16,
    pub current_percent: u16,
    /// Current wavelength in the unit reported by the SDK.
    pub current_ww: f64,
    pub units: WwUnits,
    pub tec_in_progress: bool,
    pub motion_in_progress: bool,
    /// `current_ww` expressed in both units.
    #[serde(flatten)]
    pub reading: WwReading,
}
