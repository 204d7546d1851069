//! MIRcat driver façade.
//!
//! [`MircatDriver`] wraps a [`MircatSdk`] backend with:
//!
//! - a connection guard: everything except `connect`, `api_version`,
//!   `status`, `display_status` and `is_connected` fails with
//!   [`DaqError::NotConnected`] while disconnected, without calling the SDK
//! - a status cache ([`LaserStatus`]) updated by every query
//! - wait-till-settled polling after arm, disarm, tune and emission changes
//!
//! Each SDK call runs on Tokio's blocking pool.
//!
//! # Usage
//!
//! ```
//! use mircat::driver::{DriverSettings, MircatDriver};
//! use mircat::mock::MockSdk;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let settings = DriverSettings {
//!     connect_settle: Duration::ZERO,
//!     poll_interval: Duration::from_millis(1),
//!     ..Default::default()
//! };
//! let driver = MircatDriver::new_async(Arc::new(MockSdk::new()), settings).await?;
//! driver.connect().await?;
//! driver.arm_laser().await?;
//! driver.tune("wl", 7.0).await?;
//! driver.enable_emission().await?;
//! driver.display_status().await?;
//! # Ok::<(), mircat_core::DaqError>(())
//! # }).unwrap();
//! ```

use crate::sdk::{ApiVersion, MircatSdk};
use crate::status::{render_scan_status, LaserStatus};
use anyhow::Result;
use async_trait::async_trait;
use mircat_core::capabilities::{
    Armable, EmissionControl, QclControl, SweepScannable, WavelengthTunable,
};
use mircat_core::error::{AppResult, DaqError};
use mircat_core::qcl::QclParams;
use mircat_core::scan::{ScanStatus, SweepScan};
use mircat_core::units::{Wavelength, WwReading, WwUnits};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

/// Timing and tuning options for [`MircatDriver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSettings {
    /// QCL passed to `TuneToWW` as the preferred chip (1-based).
    pub preferred_qcl: u8,
    /// Pause after `Initialize` before the laser accepts commands.
    pub connect_settle: Duration,
    /// Interval between polls while waiting for a state change.
    pub poll_interval: Duration,
    /// Give up waiting for a state change after this long.
    pub wait_timeout: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            preferred_qcl: 1,
            connect_settle: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            wait_timeout: Duration::from_secs(30),
        }
    }
}

/// Call `poll` every `interval` until it yields `target`.
///
/// It runs at least once. Fails with [`DaqError::Timeout`] once
/// `timeout` has elapsed without reaching `target`; errors from `poll` are
/// returned immediately.
pub async fn wait_till<F, Fut>(
    condition: &'static str,
    target: bool,
    interval: Duration,
    timeout: Duration,
    mut poll: F,
) -> AppResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if poll().await? == target {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(DaqError::Timeout {
                condition,
                target,
                timeout,
            });
        }
        sleep(interval).await;
    }
}

/// Driver for a Daylight Solutions MIRcat laser.
pub struct MircatDriver {
    sdk: Arc<dyn MircatSdk>,
    settings: DriverSettings,
    api_version: ApiVersion,
    status: Mutex<LaserStatus>,
    scan_status: Mutex<Option<ScanStatus>>,
}

impl MircatDriver {
    /// Wrap `sdk` and read the vendor API version.
    ///
    /// Does not connect to the laser.
    pub async fn new_async(sdk: Arc<dyn MircatSdk>, settings: DriverSettings) -> AppResult<Self> {
        let sdk_handle = Arc::clone(&sdk);
        let api_version = spawn_blocking(move || sdk_handle.api_version())
            .await
            .map_err(|e| DaqError::Task(e.to_string()))??;
        info!(%api_version, "MIRcat SDK opened");

        Ok(Self {
            sdk,
            settings,
            api_version,
            status: Mutex::new(LaserStatus::default()),
            scan_status: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Vendor API version, read when the driver was created.
    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Tunable span in microns, if the backend reports one.
    pub fn tuning_span_um(&self) -> Option<(f64, f64)> {
        self.sdk.tuning_span_um()
    }

    pub fn is_connected(&self) -> bool {
        self.status.lock().connected
    }

    /// Last scan status read, if any.
    pub fn last_scan_status(&self) -> Option<ScanStatus> {
        *self.scan_status.lock()
    }

    // -------------------------------------------------------------------------
    // Plumbing
    // -------------------------------------------------------------------------

    async fn blocking<T, F>(&self, call: F) -> AppResult<T>
    where
        F: FnOnce(&dyn MircatSdk) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let sdk = Arc::clone(&self.sdk);
        spawn_blocking(move || call(&*sdk))
            .await
            .map_err(|e| DaqError::Task(e.to_string()))?
    }

    fn ensure_connected(&self) -> AppResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DaqError::NotConnected)
        }
    }

    /// Connection-guarded SDK call.
    async fn guarded<T, F>(&self, call: F) -> AppResult<T>
    where
        F: FnOnce(&dyn MircatSdk) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_connected()?;
        self.blocking(call).await
    }

    fn cache(&self, update: impl FnOnce(&mut LaserStatus)) {
        update(&mut *self.status.lock());
    }

    async fn settle<F, Fut>(&self, condition: &'static str, target: bool, poll: F) -> AppResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<bool>>,
    {
        wait_till(
            condition,
            target,
            self.settings.poll_interval,
            self.settings.wait_timeout,
            poll,
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Connection
    // -------------------------------------------------------------------------

    /// Initialize the SDK connection and wait for the laser to settle.
    pub async fn connect(&self) -> AppResult<bool> {
        self.blocking(|sdk| sdk.initialize()).await?;
        sleep(self.settings.connect_settle).await;
        self.cache(|s| s.connected = true);
        info!("Connected to MIRcat laser");
        Ok(true)
    }

    /// Close the SDK connection. Returns the new connected flag.
    pub async fn disconnect(&self) -> AppResult<bool> {
        self.guarded(|sdk| sdk.deinitialize()).await?;
        self.cache(|s| *s = LaserStatus::default());
        info!("Disconnected from MIRcat laser");
        Ok(false)
    }

    // -------------------------------------------------------------------------
    // Status
    // -------------------------------------------------------------------------

    /// Refresh every field when connected and return the cached status.
    pub async fn status(&self) -> AppResult<LaserStatus> {
        if self.is_connected() {
            self.num_qcls().await?;
            self.interlock_status().await?;
            self.key_switch_status().await?;
            self.is_armed().await?;
            self.check_laser_emission().await?;
            self.is_tuned().await?;
            self.get_ww().await?;
        }
        Ok(self.status.lock().clone())
    }

    /// Print [`Self::status`] as an aligned table.
    pub async fn display_status(&self) -> AppResult<()> {
        let status = self.status().await?;
        print!("{status}");
        Ok(())
    }

    pub async fn num_qcls(&self) -> AppResult<u8> {
        let n = self.guarded(|sdk| sdk.num_installed_qcls()).await?;
        self.cache(|s| s.num_qcls = Some(n));
        Ok(n)
    }

    pub async fn interlock_status(&self) -> AppResult<bool> {
        let set = self.guarded(|sdk| sdk.is_interlock_set()).await?;
        self.cache(|s| s.interlock_set = Some(set));
        Ok(set)
    }

    pub async fn key_switch_status(&self) -> AppResult<bool> {
        let set = self.guarded(|sdk| sdk.is_key_switch_set()).await?;
        self.cache(|s| s.key_switch_set = Some(set));
        Ok(set)
    }

    // -------------------------------------------------------------------------
    // Arming
    // -------------------------------------------------------------------------

    /// Arm the laser and wait until it reports armed.
    pub async fn arm_laser(&self) -> AppResult<()> {
        self.guarded(|sdk| sdk.arm_laser()).await?;
        self.settle("is_armed", true, || self.is_armed()).await?;
        info!("MIRcat laser armed");
        Ok(())
    }

    /// Disarm the laser and wait until it reports disarmed.
    pub async fn disarm_laser(&self) -> AppResult<()> {
        self.guarded(|sdk| sdk.disarm_laser()).await?;
        self.settle("is_armed", false, || self.is_armed()).await?;
        info!("MIRcat laser disarmed");
        Ok(())
    }

    pub async fn is_armed(&self) -> AppResult<bool> {
        let armed = self.guarded(|sdk| sdk.is_laser_armed()).await?;
        self.cache(|s| s.armed = Some(armed));
        Ok(armed)
    }

    // -------------------------------------------------------------------------
    // Tuning
    // -------------------------------------------------------------------------

    /// Tune to `value` in `mode` (`"wl"` for microns, `"wn"` for cm⁻¹) and
    /// wait until tuned.
    pub async fn tune(&self, mode: &str, value: f64) -> AppResult<()> {
        self.ensure_connected()?;
        let units: WwUnits = mode.parse()?;
        self.tune_to(Wavelength::new(value, units)).await
    }

    /// Tune to `target` and wait until tuned.
    pub async fn tune_to(&self, target: Wavelength) -> AppResult<()> {
        let qcl = self.settings.preferred_qcl;
        self.guarded(move |sdk| sdk.tune_to_ww(target, qcl)).await?;
        self.cache(|s| s.tuned = Some(false));
        self.settle("is_tuned", true, || self.is_tuned()).await?;
        info!(%target, "MIRcat laser tuned");
        Ok(())
    }

    pub async fn is_tuned(&self) -> AppResult<bool> {
        let tuned = self.guarded(|sdk| sdk.is_tuned()).await?;
        self.cache(|s| s.tuned = Some(tuned));
        Ok(tuned)
    }

    /// Current wavelength in both units.
    pub async fn get_ww(&self) -> AppResult<WwReading> {
        let actual = self.guarded(|sdk| sdk.actual_ww()).await?;
        let reading = actual.value.reading();
        debug!(
            wavelength_um = reading.wavelength_um,
            wavenumber_cm1 = reading.wavenumber_cm1,
            light_valid = actual.light_valid,
            "Actual wavelength"
        );
        self.cache(|s| {
            s.wavelength_um = Some(reading.wavelength_um);
            s.wavenumber_cm1 = Some(reading.wavenumber_cm1);
        });
        Ok(reading)
    }

    // -------------------------------------------------------------------------
    // Emission
    // -------------------------------------------------------------------------

    /// Turn emission on and wait until the laser reports emitting.
    pub async fn enable_emission(&self) -> AppResult<()> {
        self.guarded(|sdk| sdk.turn_emission_on()).await?;
        self.settle("is_emission_on", true, || self.check_laser_emission())
            .await?;
        warn!("MIRcat emission ON");
        Ok(())
    }

    /// Turn emission off and wait until the laser reports not emitting.
    pub async fn disable_emission(&self) -> AppResult<()> {
        self.guarded(|sdk| sdk.turn_emission_off()).await?;
        self.settle("is_emission_on", false, || self.check_laser_emission())
            .await?;
        info!("MIRcat emission off");
        Ok(())
    }

    pub async fn check_laser_emission(&self) -> AppResult<bool> {
        let emitting = self.guarded(|sdk| sdk.is_emission_on()).await?;
        self.cache(|s| s.emitting = Some(emitting));
        Ok(emitting)
    }

    // -------------------------------------------------------------------------
    // QCL parameters
    // -------------------------------------------------------------------------

    pub async fn qcl_pulse_rate(&self, qcl: u8) -> AppResult<f64> {
        self.guarded(move |sdk| sdk.qcl_pulse_rate(qcl)).await
    }

    pub async fn qcl_pulse_width(&self, qcl: u8) -> AppResult<f64> {
        self.guarded(move |sdk| sdk.qcl_pulse_width(qcl)).await
    }

    pub async fn qcl_current(&self, qcl: u8) -> AppResult<f64> {
        self.guarded(move |sdk| sdk.qcl_current(qcl)).await
    }

    pub async fn qcl_params(&self, qcl: u8) -> AppResult<QclParams> {
        Ok(QclParams::new(
            qcl,
            self.qcl_pulse_rate(qcl).await?,
            self.qcl_pulse_width(qcl).await?,
            self.qcl_current(qcl).await?,
        ))
    }

    /// Parameters of every installed QCL.
    pub async fn qcl_params_all(&self) -> AppResult<Vec<QclParams>> {
        let n = self.num_qcls().await?;
        let mut all = Vec::with_capacity(usize::from(n));
        for qcl in 1..=n {
            all.push(self.qcl_params(qcl).await?);
        }
        Ok(all)
    }

    /// Check the client-side limits, then send the parameters.
    pub async fn set_qcl_params(&self, params: QclParams) -> AppResult<()> {
        self.ensure_connected()?;
        if let Err(e) = params.validate() {
            warn!(error = %e, "Refusing QCL parameters");
            return Err(e);
        }
        self.guarded(move |sdk| sdk.set_qcl_params(&params)).await?;
        info!(qcl = params.qcl, "QCL parameters set");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Scans
    // -------------------------------------------------------------------------

    /// Start a firmware-driven sweep. Returns once the SDK accepted it.
    pub async fn start_sweep_scan(&self, scan: SweepScan) -> AppResult<()> {
        self.ensure_connected()?;
        scan.validate()?;
        self.guarded(move |sdk| sdk.start_sweep_scan(&scan)).await?;
        self.cache(|s| s.tuned = Some(false));
        info!(
            start = scan.start,
            end = scan.end,
            units = %scan.units,
            repetitions = scan.repetitions,
            "Sweep scan started"
        );
        Ok(())
    }

    pub async fn stop_scan(&self) -> AppResult<()> {
        self.guarded(|sdk| sdk.stop_scan()).await
    }

    pub async fn pause_scan(&self) -> AppResult<()> {
        self.guarded(|sdk| sdk.pause_scan()).await
    }

    pub async fn resume_scan(&self) -> AppResult<()> {
        self.guarded(|sdk| sdk.resume_scan()).await
    }

    pub async fn scan_status(&self) -> AppResult<ScanStatus> {
        let status = self.guarded(|sdk| sdk.scan_status()).await?;
        *self.scan_status.lock() = Some(status);
        Ok(status)
    }

    /// Print [`Self::scan_status`] as an aligned table.
    pub async fn display_scan_status(&self) -> AppResult<()> {
        let status = self.scan_status().await?;
        print!("{}", render_scan_status(&status));
        Ok(())
    }
}

impl std::fmt::Debug for MircatDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MircatDriver")
            .field("settings", &self.settings)
            .field("api_version", &self.api_version)
            .field("status", &*self.status.lock())
            .finish_non_exhaustive()
    }
}

impl Drop for MircatDriver {
    fn drop(&mut self) {
        if !self.status.get_mut().connected {
            return;
        }
        match self.sdk.deinitialize() {
            Ok(()) => info!("MIRcat connection closed on drop"),
            Err(e) => warn!(error = %e, "Failed to close MIRcat connection on drop"),
        }
    }
}

// =============================================================================
// Capability traits
// =============================================================================

#[async_trait]
impl Armable for MircatDriver {
    #[instrument(skip(self), err)]
    async fn arm(&self) -> Result<()> {
        Ok(self.arm_laser().await?)
    }

    #[instrument(skip(self), err)]
    async fn disarm(&self) -> Result<()> {
        Ok(self.disarm_laser().await?)
    }

    async fn is_armed(&self) -> Result<bool> {
        Ok(MircatDriver::is_armed(self).await?)
    }
}

#[async_trait]
impl WavelengthTunable for MircatDriver {
    #[instrument(skip(self), err)]
    async fn tune(&self, target: Wavelength) -> Result<()> {
        Ok(self.tune_to(target).await?)
    }

    #[instrument(skip(self), err)]
    async fn get_wavelength(&self) -> Result<WwReading> {
        Ok(self.get_ww().await?)
    }

    async fn is_tuned(&self) -> Result<bool> {
        Ok(MircatDriver::is_tuned(self).await?)
    }
}

#[async_trait]
impl EmissionControl for MircatDriver {
    #[instrument(skip(self), err)]
    async fn enable_emission(&self) -> Result<()> {
        Ok(MircatDriver::enable_emission(self).await?)
    }

    #[instrument(skip(self), err)]
    async fn disable_emission(&self) -> Result<()> {
        Ok(MircatDriver::disable_emission(self).await?)
    }

    #[instrument(skip(self), err)]
    async fn is_emission_enabled(&self) -> Result<bool> {
        Ok(self.check_laser_emission().await?)
    }
}

#[async_trait]
impl SweepScannable for MircatDriver {
    #[instrument(skip(self), err)]
    async fn start_sweep(&self, scan: SweepScan) -> Result<()> {
        Ok(self.start_sweep_scan(scan).await?)
    }

    async fn stop_scan(&self) -> Result<()> {
        Ok(MircatDriver::stop_scan(self).await?)
    }

    async fn pause_scan(&self) -> Result<()> {
        Ok(MircatDriver::pause_scan(self).await?)
    }

    async fn resume_scan(&self) -> Result<()> {
        Ok(MircatDriver::resume_scan(self).await?)
    }

    async fn scan_status(&self) -> Result<ScanStatus> {
        Ok(MircatDriver::scan_status(self).await?)
    }
}

#[async_trait]
impl QclControl for MircatDriver {
    async fn num_qcls(&self) -> Result<u8> {
        Ok(MircatDriver::num_qcls(self).await?)
    }

    async fn qcl_params(&self, qcl: u8) -> Result<QclParams> {
        Ok(MircatDriver::qcl_params(self, qcl).await?)
    }

    #[instrument(skip(self), err)]
    async fn set_qcl_params(&self, params: QclParams) -> Result<()> {
        Ok(MircatDriver::set_qcl_params(self, params).await?)
    }
}
