//! MIRcat driver factory.
//!
//! Builds a [`MircatDriver`] from a `toml::Value` table and hands it out as a
//! [`DeviceComponents`] bag.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mircat::factory::MircatFactory;
//! use mircat_core::driver::DriverFactory;
//!
//! let config = toml::toml! {
//!     backend = "mock"
//!     auto_connect = true
//! };
//! let components = MircatFactory.build(config.into()).await?;
//! let tunable = components.wavelength_tunable.unwrap();
//! ```

use crate::driver::{DriverSettings, MircatDriver};
use crate::mock::MockSdk;
use crate::sdk::{DllSdk, MircatSdk};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use mircat_core::driver::{Capability, DeviceComponents, DeviceMetadata, DriverFactory};
use mircat_core::error::DaqError;
use mircat_core::qcl::MAX_QCLS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{info, instrument};

/// Which [`MircatSdk`] implementation to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The vendor `MIRcatSDK.dll`.
    #[default]
    Dll,
    /// The in-process simulator.
    Mock,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dll => "dll",
            Self::Mock => "mock",
        })
    }
}

/// Configuration for the MIRcat driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MircatDriverConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Exact path of `MIRcatSDK.dll`. Overrides `sdk_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,
    /// SDK install directory holding `libs/x64` and `libs/x32`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_dir: Option<PathBuf>,
    #[serde(default = "default_preferred_qcl")]
    pub preferred_qcl: u8,
    #[serde(default = "default_connect_settle_ms")]
    pub connect_settle_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    /// Call `connect` as part of `build`.
    #[serde(default)]
    pub auto_connect: bool,
}

fn default_preferred_qcl() -> u8 {
    1
}

fn default_connect_settle_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_wait_timeout_ms() -> u64 {
    30_000
}

impl Default for MircatDriverConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            library_path: None,
            sdk_dir: None,
            preferred_qcl: default_preferred_qcl(),
            connect_settle_ms: default_connect_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            wait_timeout_ms: default_wait_timeout_ms(),
            auto_connect: false,
        }
    }
}

impl MircatDriverConfig {
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            preferred_qcl: self.preferred_qcl,
            connect_settle: Duration::from_millis(self.connect_settle_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            wait_timeout: Duration::from_millis(self.wait_timeout_ms),
        }
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_QCLS).contains(&self.preferred_qcl) {
            return Err(format!(
                "preferred_qcl {} out of range (1-{MAX_QCLS})",
                self.preferred_qcl
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }
        if self.poll_interval_ms >= self.wait_timeout_ms {
            return Err(format!(
                "poll_interval_ms ({}) must be less than wait_timeout_ms ({})",
                self.poll_interval_ms, self.wait_timeout_ms
            ));
        }
        if self.backend == Backend::Mock
            && (self.library_path.is_some() || self.sdk_dir.is_some())
        {
            return Err("library_path and sdk_dir only apply to the dll backend".to_string());
        }
        Ok(())
    }
}

/// Factory for creating MIRcat driver instances.
pub struct MircatFactory;

static MIRCAT_CAPABILITIES: &[Capability] = &[
    Capability::Armable,
    Capability::WavelengthTunable,
    Capability::EmissionControl,
    Capability::SweepScannable,
    Capability::QclControl,
];

impl MircatFactory {
    /// Open the configured backend and wrap it in a driver.
    ///
    /// Connects when `auto_connect` is set.
    #[instrument(skip(cfg), fields(backend = %cfg.backend), err)]
    pub async fn open_driver(cfg: &MircatDriverConfig) -> Result<MircatDriver> {
        cfg.validate().map_err(DaqError::Configuration)?;

        let sdk: Arc<dyn MircatSdk> = match cfg.backend {
            Backend::Mock => Arc::new(MockSdk::new()),
            Backend::Dll => {
                let library_path = cfg.library_path.clone();
                let sdk_dir = cfg.sdk_dir.clone();
                let sdk = spawn_blocking(move || {
                    DllSdk::open(library_path.as_deref(), sdk_dir.as_deref())
                })
                .await
                .context("SDK loader task failed")??;
                Arc::new(sdk)
            }
        };

        let driver = MircatDriver::new_async(sdk, cfg.driver_settings()).await?;
        if cfg.auto_connect {
            driver.connect().await?;
        }
        Ok(driver)
    }
}

impl DriverFactory for MircatFactory {
    fn driver_type(&self) -> &'static str {
        "mircat"
    }

    fn name(&self) -> &'static str {
        "Daylight Solutions MIRcat QCL Laser"
    }

    fn capabilities(&self) -> &'static [Capability] {
        MIRCAT_CAPABILITIES
    }

    fn validate(&self, config: &toml::Value) -> Result<()> {
        let cfg: MircatDriverConfig = config.clone().try_into()?;
        Ok(cfg.validate().map_err(DaqError::Configuration)?)
    }

    fn build(&self, config: toml::Value) -> BoxFuture<'static, Result<DeviceComponents>> {
        Box::pin(async move {
            let cfg: MircatDriverConfig = config.try_into().context("Invalid MIRcat config")?;
            let driver = Arc::new(Self::open_driver(&cfg).await?);

            let num_qcls = if driver.is_connected() {
                Some(driver.num_qcls().await?)
            } else {
                None
            };
            let span = driver.tuning_span_um();
            let metadata = DeviceMetadata {
                backend: Some(cfg.backend.to_string()),
                api_version: Some(driver.api_version().to_string()),
                num_qcls,
                min_wavelength_um: span.map(|(min, _)| min),
                max_wavelength_um: span.map(|(_, max)| max),
            };
            info!(backend = %cfg.backend, api_version = %driver.api_version(), "MIRcat driver built");

            Ok(DeviceComponents {
                armable: Some(driver.clone()),
                wavelength_tunable: Some(driver.clone()),
                emission_control: Some(driver.clone()),
                sweep_scannable: Some(driver.clone()),
                qcl_control: Some(driver),
                metadata,
            })
        })
    }
}
