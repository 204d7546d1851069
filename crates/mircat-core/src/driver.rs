//! Driver Factory and Component Types
//!
//! Drivers implement [`DriverFactory`] and hand back a [`DeviceComponents`]
//! bag holding one trait object per capability they support. Callers pick the
//! capabilities they need out of the bag instead of downcasting a single
//! driver object.
//!
//! # Example: Implementing a Driver Factory
//!
//! ```rust,ignore
//! use mircat_core::driver::{Capability, DeviceComponents, DriverFactory};
//! use futures::future::BoxFuture;
//! use std::sync::Arc;
//!
//! pub struct SimLaserFactory;
//!
//! impl DriverFactory for SimLaserFactory {
//!     fn driver_type(&self) -> &'static str { "sim_laser" }
//!     fn name(&self) -> &'static str { "Simulated laser" }
//!     fn capabilities(&self) -> &'static [Capability] { &[Capability::EmissionControl] }
//!
//!     fn validate(&self, config: &toml::Value) -> anyhow::Result<()> {
//!         config.as_table().ok_or_else(|| anyhow::anyhow!("expected table"))?;
//!         Ok(())
//!     }
//!
//!     fn build(&self, _config: toml::Value) -> BoxFuture<'static, anyhow::Result<DeviceComponents>> {
//!         Box::pin(async move {
//!             let driver = Arc::new(SimLaser::default());
//!             Ok(DeviceComponents::new().with_emission_control(driver))
//!         })
//!     }
//! }
//! ```

use crate::capabilities::{Armable, EmissionControl, QclControl, SweepScannable, WavelengthTunable};
use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Capability Enum (Runtime Introspection)
// =============================================================================

/// Runtime capability flags for device introspection.
///
/// Mirrors the traits in [`crate::capabilities`] as an enum for easy matching
/// and listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Corresponds to [`crate::capabilities::Armable`]
    Armable,

    /// Corresponds to [`crate::capabilities::WavelengthTunable`]
    WavelengthTunable,

    /// Corresponds to [`crate::capabilities::EmissionControl`]
    EmissionControl,

    /// Corresponds to [`crate::capabilities::SweepScannable`]
    SweepScannable,

    /// Corresponds to [`crate::capabilities::QclControl`]
    QclControl,
}

impl Capability {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Armable => "Armable",
            Self::WavelengthTunable => "Wavelength Tunable",
            Self::EmissionControl => "Emission Control",
            Self::SweepScannable => "Sweep Scannable",
            Self::QclControl => "QCL Control",
        }
    }
}

// =============================================================================
// Device Components (Capability Bag)
// =============================================================================

/// Container for capability trait objects returned by drivers.
///
/// ```rust,ignore
/// let driver = Arc::new(MircatDriver::new(sdk, settings));
///
/// let components = DeviceComponents::new()
///     .with_armable(driver.clone())
///     .with_wavelength_tunable(driver);
/// ```
#[derive(Default)]
pub struct DeviceComponents {
    /// Armable implementation (arm/disarm)
    pub armable: Option<Arc<dyn Armable>>,

    /// WavelengthTunable implementation (tunable wavelength)
    pub wavelength_tunable: Option<Arc<dyn WavelengthTunable>>,

    /// EmissionControl implementation (laser on/off)
    pub emission_control: Option<Arc<dyn EmissionControl>>,

    /// SweepScannable implementation (firmware-driven sweeps)
    pub sweep_scannable: Option<Arc<dyn SweepScannable>>,

    /// QclControl implementation (pulse parameters)
    pub qcl_control: Option<Arc<dyn QclControl>>,

    /// Capability-specific metadata
    pub metadata: DeviceMetadata,
}

impl DeviceComponents {
    /// Create a new empty DeviceComponents
    pub fn new() -> Self {
        Self::default()
    }

    /// Get list of capabilities this device supports
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::new();

        if self.armable.is_some() {
            caps.push(Capability::Armable);
        }
        if self.wavelength_tunable.is_some() {
            caps.push(Capability::WavelengthTunable);
        }
        if self.emission_control.is_some() {
            caps.push(Capability::EmissionControl);
        }
        if self.sweep_scannable.is_some() {
            caps.push(Capability::SweepScannable);
        }
        if self.qcl_control.is_some() {
            caps.push(Capability::QclControl);
        }

        caps
    }

    // Builder methods

    /// Set Armable implementation
    pub fn with_armable(mut self, a: Arc<dyn Armable>) -> Self {
        self.armable = Some(a);
        self
    }

    /// Set WavelengthTunable implementation
    pub fn with_wavelength_tunable(mut self, w: Arc<dyn WavelengthTunable>) -> Self {
        self.wavelength_tunable = Some(w);
        self
    }

    /// Set EmissionControl implementation
    pub fn with_emission_control(mut self, e: Arc<dyn EmissionControl>) -> Self {
        self.emission_control = Some(e);
        self
    }

    /// Set SweepScannable implementation
    pub fn with_sweep_scannable(mut self, s: Arc<dyn SweepScannable>) -> Self {
        self.sweep_scannable = Some(s);
        self
    }

    /// Set QclControl implementation
    pub fn with_qcl_control(mut self, q: Arc<dyn QclControl>) -> Self {
        self.qcl_control = Some(q);
        self
    }

    /// Set device metadata
    pub fn with_metadata(mut self, metadata: DeviceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

// =============================================================================
// Device Metadata
// =============================================================================

/// Information about a device that the trait objects do not carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    /// Backend that produced the device (e.g. "dll", "mock")
    pub backend: Option<String>,

    /// Vendor API version as `major.minor.patch`
    pub api_version: Option<String>,

    /// Number of installed QCL chips, when known at build time
    pub num_qcls: Option<u8>,

    /// Lowest tunable wavelength in microns
    pub min_wavelength_um: Option<f64>,

    /// Highest tunable wavelength in microns
    pub max_wavelength_um: Option<f64>,
}

// =============================================================================
// Driver Factory Trait
// =============================================================================

/// Trait for driver factories that create device instances.
///
/// The factory is responsible for:
///
/// 1. Declaring what driver type it handles (matching TOML `type` field)
/// 2. Validating configuration before instantiation
/// 3. Asynchronously creating the driver and returning capabilities
///
/// Factories must not hold mutable state across builds.
pub trait DriverFactory: Send + Sync + 'static {
    /// Driver type name used in TOML config `type` field.
    fn driver_type(&self) -> &'static str;

    /// Human-readable name for documentation and error messages.
    fn name(&self) -> &'static str;

    /// List of capabilities this driver type provides.
    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    /// Validate configuration without instantiating.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if configuration is valid
    /// - `Err` with descriptive message if validation fails
    fn validate(&self, config: &toml::Value) -> Result<()>;

    /// Async instantiation of the driver.
    ///
    /// Called after validation passes. Opens the hardware connection when
    /// the configuration asks for it and returns every implemented
    /// capability.
    fn build(&self, config: toml::Value) -> BoxFuture<'static, Result<DeviceComponents>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_name() {
        assert_eq!(Capability::QclControl.name(), "QCL Control");
        assert_eq!(Capability::WavelengthTunable.name(), "Wavelength Tunable");
    }

    #[test]
    fn test_device_components_builder() {
        let components = DeviceComponents::new().with_metadata(DeviceMetadata {
            backend: Some("mock".to_string()),
            num_qcls: Some(4),
            ..Default::default()
        });

        assert_eq!(components.metadata.backend.as_deref(), Some("mock"));
        assert_eq!(components.metadata.num_qcls, Some(4));
    }

    #[test]
    fn test_device_components_capabilities() {
        let empty = DeviceComponents::new();
        assert!(empty.capabilities().is_empty());
    }

    #[test]
    fn test_capability_serde() {
        let cap = Capability::SweepScannable;
        let json = serde_json::to_string(&cap).unwrap();
        assert_eq!(json, "\"sweep_scannable\"");

        let cap: Capability = serde_json::from_str("\"emission_control\"").unwrap();
        assert_eq!(cap, Capability::EmissionControl);
    }
}
