//! Laser Capabilities
//!
//! Fine-grained capability traits for a tunable mid-IR laser. A driver
//! implements the capabilities its hardware actually supports, and callers
//! hold only the trait objects they need:
//!
//! - A pulsed QCL head implements: `Armable + WavelengthTunable +
//!   EmissionControl + SweepScannable + QclControl`
//! - A fixed-wavelength source might implement only `EmissionControl`
//!
//! # Design Philosophy
//!
//! Each capability trait:
//! - Is async (uses #[async_trait])
//! - Is thread-safe (requires Send + Sync)
//! - Uses anyhow::Result for errors
//! - Focuses on ONE thing
//!
//! Typed failures are [`DaqError`](crate::error::DaqError) values wrapped in
//! `anyhow::Error`; use `downcast_ref` to inspect them.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn tune_and_fire<L>(laser: &L, target: Wavelength) -> anyhow::Result<()>
//! where
//!     L: Armable + WavelengthTunable + EmissionControl,
//! {
//!     laser.arm().await?;
//!     laser.tune(target).await?;
//!     laser.enable_emission().await?;
//!     Ok(())
//! }
//! ```

use crate::qcl::QclParams;
use crate::scan::{ScanStatus, SweepScan};
use crate::units::{Wavelength, WwReading};
use anyhow::Result;
use async_trait::async_trait;

/// Capability: Arming
///
/// Lasers that must be armed before they can tune or emit.
///
/// # Contract
/// - `arm()` returns once the hardware reports armed
/// - `disarm()` returns once the hardware reports disarmed
///
/// # Safety
/// Arming requires the interlock and the key switch to be set. A driver must
/// surface the hardware refusal rather than retrying.
#[async_trait]
pub trait Armable: Send + Sync {
    /// Arm the laser and wait until armed.
    async fn arm(&self) -> Result<()>;

    /// Disarm the laser and wait until disarmed.
    async fn disarm(&self) -> Result<()>;

    /// Query armed state.
    async fn is_armed(&self) -> Result<bool>;
}

/// Capability: Wavelength Tuning
///
/// Devices with tunable wavelength output.
///
/// # Contract
/// - Targets carry their own unit (microns or cm⁻¹)
/// - `tune()` returns once the hardware reports tuned
/// - Range checking is done by the hardware
///
/// # Safety
/// CAUTION: Wavelength changes on high-power lasers may affect
/// beam alignment and optical safety equipment effectiveness.
#[async_trait]
pub trait WavelengthTunable: Send + Sync {
    /// Tune to `target` and wait until tuned.
    ///
    /// # Returns
    /// - Ok(()) once tuned
    /// - Err if the target is out of range, the laser is not armed, or the
    ///   wait timed out
    async fn tune(&self, target: Wavelength) -> Result<()>;

    /// Current wavelength in both units.
    async fn get_wavelength(&self) -> Result<WwReading>;

    /// Query tuned state.
    async fn is_tuned(&self) -> Result<bool>;
}

/// Capability: Emission Control
///
/// Devices with controllable emission (lasers, light sources).
///
/// # Contract
/// - `enable_emission()` activates the source
/// - `disable_emission()` deactivates the source
/// - Emission state should be queryable when possible
///
/// # Safety
/// CAUTION: Enabling emission on a high-power laser creates immediate
/// hazards. Always verify safety interlocks and shutter state first.
#[async_trait]
pub trait EmissionControl: Send + Sync {
    /// Enable emission (turn on the source)
    ///
    /// # Returns
    /// - Ok(()) if emission enabled successfully
    /// - Err if emission cannot be enabled or hardware error
    async fn enable_emission(&self) -> Result<()>;

    /// Disable emission (turn off the source)
    async fn disable_emission(&self) -> Result<()>;

    /// Query emission state
    ///
    /// # Default Implementation
    /// Returns error indicating state query is not supported.
    async fn is_emission_enabled(&self) -> Result<bool> {
        anyhow::bail!("Emission state query not supported by this device")
    }
}

/// Capability: Sweep Scanning
///
/// Devices whose firmware runs wavelength sweeps on its own. The driver only
/// starts, pauses, resumes and stops them.
#[async_trait]
pub trait SweepScannable: Send + Sync {
    /// Start a sweep. Returns as soon as the device accepted it.
    async fn start_sweep(&self, scan: SweepScan) -> Result<()>;

    async fn stop_scan(&self) -> Result<()>;

    async fn pause_scan(&self) -> Result<()>;

    async fn resume_scan(&self) -> Result<()>;

    /// Progress of the current scan.
    async fn scan_status(&self) -> Result<ScanStatus>;
}

/// Capability: QCL pulse parameters
///
/// Per-chip pulse rate, pulse width and drive current.
///
/// # Contract
/// - QCL numbers are 1-based
/// - `set_qcl_params()` validates limits before touching hardware
#[async_trait]
pub trait QclControl: Send + Sync {
    /// Number of installed QCL chips.
    async fn num_qcls(&self) -> Result<u8>;

    async fn qcl_params(&self, qcl: u8) -> Result<QclParams>;

    async fn set_qcl_params(&self, params: QclParams) -> Result<()>;
}
