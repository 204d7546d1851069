//! QCL pulse parameters.
//!
//! A MIRcat head carries up to four quantum-cascade laser chips. Each has its
//! own pulse rate, pulse width and drive current. The limits here are checked
//! before anything is sent to the SDK and are tighter than what the firmware
//! enforces.

use crate::error::DaqError;
use serde::{Deserialize, Serialize};

/// Highest QCL slot number.
pub const MAX_QCLS: u8 = 4;

/// Allowed pulse rate range in Hz.
pub const PULSE_RATE_RANGE_HZ: (f64, f64) = (10.0, 100_000.0);

/// Allowed pulse width range in ns.
pub const PULSE_WIDTH_RANGE_NS: (f64, f64) = (0.0, 100.0);

/// Allowed duty cycle range in percent.
pub const DUTY_CYCLE_RANGE_PCT: (f64, f64) = (0.0, 5.0);

/// Per-QCL current ceiling in mA, indexed by `qcl - 1`.
///
/// Factory default currents plus 10%.
pub const CURRENT_LIMITS_MA: [f64; MAX_QCLS as usize] = [800.0, 820.0, 630.0, 950.0];

/// Pulse parameters for one QCL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QclParams {
    /// QCL slot, 1-based.
    pub qcl: u8,
    pub pulse_rate_hz: f64,
    pub pulse_width_ns: f64,
    pub current_ma: f64,
}

impl QclParams {
    pub fn new(qcl: u8, pulse_rate_hz: f64, pulse_width_ns: f64, current_ma: f64) -> Self {
        Self {
            qcl,
            pulse_rate_hz,
            pulse_width_ns,
            current_ma,
        }
    }

    /// Duty cycle figure checked against [`DUTY_CYCLE_RANGE_PCT`].
    pub fn duty_cycle(&self) -> f64 {
        1e-6 * self.pulse_rate_hz * self.pulse_width_ns
    }

    /// Check all limits. The first violation wins, in this order: QCL
    /// number, pulse rate, duty cycle, pulse width, current.
    pub fn validate(&self) -> Result<(), DaqError> {
        validate_qcl_number(self.qcl)?;

        let (rate_min, rate_max) = PULSE_RATE_RANGE_HZ;
        if !(rate_min..=rate_max).contains(&self.pulse_rate_hz) {
            return Err(DaqError::InvalidParameter(format!(
                "Pulse rate limit: {rate_min} <= pulse rate <= {rate_max}"
            )));
        }

        let (duty_min, duty_max) = DUTY_CYCLE_RANGE_PCT;
        if !(duty_min..=duty_max).contains(&self.duty_cycle()) {
            return Err(DaqError::InvalidParameter(format!(
                "Duty cycle limit: {duty_min}% <= duty cycle <= {duty_max}%"
            )));
        }

        let (width_min, width_max) = PULSE_WIDTH_RANGE_NS;
        if !(width_min..=width_max).contains(&self.pulse_width_ns) {
            return Err(DaqError::InvalidParameter(format!(
                "Pulse width limit: {width_min} <= pulse width <= {width_max}"
            )));
        }

        let limit = current_limit_ma(self.qcl)?;
        if !(0.0..=limit).contains(&self.current_ma) {
            return Err(DaqError::InvalidParameter(format!(
                "Current limit: 0 <= current <= {limit}"
            )));
        }

        Ok(())
    }
}

/// Reject QCL numbers outside `1..=4`.
pub fn validate_qcl_number(qcl: u8) -> Result<(), DaqError> {
    if (1..=MAX_QCLS).contains(&qcl) {
        Ok(())
    } else {
        Err(DaqError::InvalidParameter(format!(
            "Wrong QCL number {qcl}: must be one of 1, 2, 3, 4"
        )))
    }
}

/// Current ceiling for a QCL slot.
pub fn current_limit_ma(qcl: u8) -> Result<f64, DaqError> {
    validate_qcl_number(qcl)?;
    Ok(CURRENT_LIMITS_MA[usize::from(qcl - 1)])
}
