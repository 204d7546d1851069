//! Safe, synchronous interface to the MIRcat SDK.
//!
//! [`MircatSdk`] is the seam between the driver façade and the vendor
//! library. [`DllSdk`] forwards to `MIRcatSDK.dll`; the simulator in
//! [`crate::mock`] implements the same trait for hardware-free use.
//!
//! Every method is a single blocking SDK call (or a fixed group of them) and
//! turns a non-zero return code into [`DaqError::Sdk`].

use mircat_core::error::{AppResult, DaqError};
use mircat_core::qcl::QclParams;
use mircat_core::scan::{ScanStatus, SweepScan};
use mircat_core::units::{Wavelength, WwUnits};
use mircat_sys::{MircatLibrary, MIRcatSDK_RET_SUCCESS, MIRcatSDK_UNITS_CM1, MIRcatSDK_UNITS_MICRONS};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Vendor API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Reading from `MIRcatSDK_GetActualWW`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActualWw {
    pub value: Wavelength,
    /// Whether the laser reports the value as a valid light output.
    pub light_valid: bool,
}

/// [`DaqError::Sdk`] for a non-zero return code.
pub fn sdk_error(code: u32) -> DaqError {
    DaqError::sdk(code, mircat_sys::return_code_message(code))
}

/// Map a raw return code to a result.
pub fn check(code: u32) -> AppResult<()> {
    if code == MIRcatSDK_RET_SUCCESS {
        Ok(())
    } else {
        Err(sdk_error(code))
    }
}

/// SDK unit code for a unit.
pub fn units_code(units: WwUnits) -> u8 {
    match units {
        WwUnits::Microns => MIRcatSDK_UNITS_MICRONS,
        WwUnits::Wavenumbers => MIRcatSDK_UNITS_CM1,
    }
}

/// Unit for an SDK unit code. Anything other than microns is read as cm⁻¹.
pub fn units_from_code(code: u8) -> WwUnits {
    if code == MIRcatSDK_UNITS_MICRONS {
        WwUnits::Microns
    } else {
        WwUnits::Wavenumbers
    }
}

/// Blocking operations exposed by the MIRcat SDK.
///
/// Implementations must be callable from any thread; the façade runs each
/// call on Tokio's blocking pool.
pub trait MircatSdk: Send + Sync {
    /// `MIRcatSDK_GetAPIVersion`. Does not need an initialized SDK.
    fn api_version(&self) -> AppResult<ApiVersion>;

    /// `MIRcatSDK_Initialize`: open the connection to the laser.
    fn initialize(&self) -> AppResult<()>;

    /// `MIRcatSDK_DeInitialize`: close the connection.
    fn deinitialize(&self) -> AppResult<()>;

    fn num_installed_qcls(&self) -> AppResult<u8>;
    fn is_interlock_set(&self) -> AppResult<bool>;
    fn is_key_switch_set(&self) -> AppResult<bool>;

    fn arm_laser(&self) -> AppResult<()>;
    fn disarm_laser(&self) -> AppResult<()>;
    fn is_laser_armed(&self) -> AppResult<bool>;

    /// Start tuning to `target` using `preferred_qcl` (1-based).
    fn tune_to_ww(&self, target: Wavelength, preferred_qcl: u8) -> AppResult<()>;
    fn is_tuned(&self) -> AppResult<bool>;
    fn actual_ww(&self) -> AppResult<ActualWw>;

    fn turn_emission_on(&self) -> AppResult<()>;
    fn turn_emission_off(&self) -> AppResult<()>;
    fn is_emission_on(&self) -> AppResult<bool>;

    fn qcl_pulse_rate(&self, qcl: u8) -> AppResult<f64>;
    fn qcl_pulse_width(&self, qcl: u8) -> AppResult<f64>;
    fn qcl_current(&self, qcl: u8) -> AppResult<f64>;
    /// Forwarded as-is; limit checks happen in the façade.
    fn set_qcl_params(&self, params: &QclParams) -> AppResult<()>;

    fn start_sweep_scan(&self, scan: &SweepScan) -> AppResult<()>;
    fn stop_scan(&self) -> AppResult<()>;
    fn pause_scan(&self) -> AppResult<()>;
    fn resume_scan(&self) -> AppResult<()>;
    fn scan_status(&self) -> AppResult<ScanStatus>;

    /// Overall tunable span in microns, when the backend knows it without
    /// talking to the laser. The vendor SDK has no export for this.
    fn tuning_span_um(&self) -> Option<(f64, f64)> {
        None
    }
}

// =============================================================================
// DllSdk
// =============================================================================

/// [`MircatSdk`] backed by `MIRcatSDK.dll`.
///
/// All calls into the library are serialised; the vendor library is not
/// documented as thread-safe.
pub struct DllSdk {
    library: Mutex<MircatLibrary>,
}

impl DllSdk {
    /// Resolve the DLL location and load it.
    ///
    /// See [`mircat_sys::resolve_library_path`] for the lookup order.
    pub fn open(library_path: Option<&Path>, sdk_dir: Option<&Path>) -> AppResult<Self> {
        let path = mircat_sys::resolve_library_path(library_path, sdk_dir)
            .map_err(|e| DaqError::Library(e.to_string()))?;
        Self::load(path)
    }

    /// Load the DLL from an exact path.
    pub fn load(path: PathBuf) -> AppResult<Self> {
        info!(path = %path.display(), "Loading MIRcat SDK");
        // SAFETY: the path points at the vendor SDK by configuration; loading
        // it runs only the vendor's own initialisers.
        #[allow(unsafe_code)]
        let library = unsafe { MircatLibrary::load(&path) }
            .map_err(|e| DaqError::Library(e.to_string()))?;
        Ok(Self {
            library: Mutex::new(library),
        })
    }

    /// Path of the loaded library.
    pub fn path(&self) -> PathBuf {
        self.library.lock().path().to_path_buf()
    }

    fn call<T>(&self, name: &'static str, f: impl FnOnce(&MircatLibrary) -> (u32, T)) -> AppResult<T> {
        let lib = self.library.lock();
        let (code, value) = f(&lib);
        debug!(call = name, code, "MIRcat SDK call");
        check(code)?;
        Ok(value)
    }

    fn call_unit(&self, name: &'static str, f: impl FnOnce(&MircatLibrary) -> u32) -> AppResult<()> {
        self.call(name, |lib| (f(lib), ()))
    }

    fn query_bool(
        &self,
        name: &'static str,
        f: impl FnOnce(&MircatLibrary, *mut bool) -> u32,
    ) -> AppResult<bool> {
        self.call(name, |lib| {
            let mut value = false;
            let code = f(lib, &mut value);
            (code, value)
        })
    }

    fn query_qcl_f32(
        &self,
        name: &'static str,
        qcl: u8,
        f: impl FnOnce(&MircatLibrary, u8, *mut f32) -> u32,
    ) -> AppResult<f64> {
        self.call(name, |lib| {
            let mut value = 0.0f32;
            let code = f(lib, qcl, &mut value);
            (code, f64::from(value))
        })
    }
}

impl fmt::Debug for DllSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DllSdk").field("library", &*self.library.lock()).finish()
    }
}

// SAFETY (all blocks below): every export is called with the argument types
// declared in `mircat-sys`, and out-pointers refer to live locals of the
// matching type for the duration of the call.
#[allow(unsafe_code)]
impl MircatSdk for DllSdk {
    fn api_version(&self) -> AppResult<ApiVersion> {
        self.call("GetAPIVersion", |lib| {
            let mut v = ApiVersion::default();
            let code = unsafe { (lib.get_api_version)(&mut v.major, &mut v.minor, &mut v.patch) };
            (code, v)
        })
    }

    fn initialize(&self) -> AppResult<()> {
        self.call_unit("Initialize", |lib| unsafe { (lib.initialize)() })
    }

    fn deinitialize(&self) -> AppResult<()> {
        self.call_unit("DeInitialize", |lib| unsafe { (lib.deinitialize)() })
    }

    fn num_installed_qcls(&self) -> AppResult<u8> {
        self.call("GetNumInstalledQcls", |lib| {
            let mut n = 0u8;
            let code = unsafe { (lib.get_num_installed_qcls)(&mut n) };
            (code, n)
        })
    }

    fn is_interlock_set(&self) -> AppResult<bool> {
        self.query_bool("IsInterlockedStatusSet", |lib, out| unsafe {
            (lib.is_interlocked_status_set)(out)
        })
    }

    fn is_key_switch_set(&self) -> AppResult<bool> {
        self.query_bool("IsKeySwitchStatusSet", |lib, out| unsafe {
            (lib.is_key_switch_status_set)(out)
        })
    }

    fn arm_laser(&self) -> AppResult<()> {
        self.call_unit("ArmLaser", |lib| unsafe { (lib.arm_laser)() })
    }

    fn disarm_laser(&self) -> AppResult<()> {
        self.call_unit("DisarmLaser", |lib| unsafe { (lib.disarm_laser)() })
    }

    fn is_laser_armed(&self) -> AppResult<bool> {
        self.query_bool("IsLaserArmed", |lib, out| unsafe { (lib.is_laser_armed)(out) })
    }

    fn tune_to_ww(&self, target: Wavelength, preferred_qcl: u8) -> AppResult<()> {
        let units = units_code(target.units);
        // The SDK takes single precision.
        let value = target.value as f32;
        self.call_unit("TuneToWW", |lib| unsafe {
            (lib.tune_to_ww)(value, units, preferred_qcl)
        })
    }

    fn is_tuned(&self) -> AppResult<bool> {
        self.query_bool("IsTuned", |lib, out| unsafe { (lib.is_tuned)(out) })
    }

    fn actual_ww(&self) -> AppResult<ActualWw> {
        self.call("GetActualWW", |lib| {
            let mut value = 0.0f32;
            let mut units = 0u8;
            let mut light_valid = false;
            let code = unsafe { (lib.get_actual_ww)(&mut value, &mut units, &mut light_valid) };
            (
                code,
                ActualWw {
                    value: Wavelength::new(f64::from(value), units_from_code(units)),
                    light_valid,
                },
            )
        })
    }

    fn turn_emission_on(&self) -> AppResult<()> {
        self.call_unit("TurnEmissionOn", |lib| unsafe { (lib.turn_emission_on)() })
    }

    fn turn_emission_off(&self) -> AppResult<()> {
        self.call_unit("TurnEmissionOff", |lib| unsafe { (lib.turn_emission_off)() })
    }

    fn is_emission_on(&self) -> AppResult<bool> {
        self.query_bool("IsEmissionOn", |lib, out| unsafe { (lib.is_emission_on)(out) })
    }

    fn qcl_pulse_rate(&self, qcl: u8) -> AppResult<f64> {
        self.query_qcl_f32("GetQCLPulseRate", qcl, |lib, q, out| unsafe {
            (lib.get_qcl_pulse_rate)(q, out)
        })
    }

    fn qcl_pulse_width(&self, qcl: u8) -> AppResult<f64> {
        self.query_qcl_f32("GetQCLPulseWidth", qcl, |lib, q, out| unsafe {
            (lib.get_qcl_pulse_width)(q, out)
        })
    }

    fn qcl_current(&self, qcl: u8) -> AppResult<f64> {
        self.query_qcl_f32("GetQCLCurrent", qcl, |lib, q, out| unsafe {
            (lib.get_qcl_current)(q, out)
        })
    }

    fn set_qcl_params(&self, params: &QclParams) -> AppResult<()> {
        let QclParams {
            qcl,
            pulse_rate_hz,
            pulse_width_ns,
            current_ma,
        } = *params;
        self.call_unit("SetQCLParams", |lib| unsafe {
            (lib.set_qcl_params)(
                qcl,
                pulse_rate_hz as f32,
                pulse_width_ns as f32,
                current_ma as f32,
            )
        })
    }

    fn start_sweep_scan(&self, scan: &SweepScan) -> AppResult<()> {
        let units = units_code(scan.units);
        self.call_unit("StartSweepScan", |lib| unsafe {
            (lib.start_sweep_scan)(
                scan.start as f32,
                scan.end as f32,
                scan.speed as f32,
                units,
                scan.repetitions,
                scan.bidirectional,
            )
        })
    }

    fn stop_scan(&self) -> AppResult<()> {
        self.call_unit("StopScanInProgress", |lib| unsafe { (lib.stop_scan_in_progress)() })
    }

    fn pause_scan(&self) -> AppResult<()> {
        self.call_unit("PauseScanInProgress", |lib| unsafe {
            (lib.pause_scan_in_progress)()
        })
    }

    fn resume_scan(&self) -> AppResult<()> {
        self.call_unit("ResumeScanInProgress", |lib| unsafe {
            (lib.resume_scan_in_progress)()
        })
    }

    fn scan_status(&self) -> AppResult<ScanStatus> {
        self.call("GetScanStatus", |lib| {
            let mut in_progress = false;
            let mut active = false;
            let mut paused = false;
            let mut repetition = 0u16;
            let mut percent = 0u16;
            let mut current_ww = 0.0f32;
            let mut units = 0u8;
            let mut tec_in_progress = false;
            let mut motion_in_progress = false;
            let code = unsafe {
                (lib.get_scan_status)(
                    &mut in_progress,
                    &mut active,
                    &mut paused,
                    &mut repetition,
                    &mut percent,
                    &mut current_ww,
                    &mut units,
                    &mut tec_in_progress,
                    &mut motion_in_progress,
                )
            };
            let value = Wavelength::new(f64::from(current_ww), units_from_code(units));
            (
                code,
                ScanStatus {
                    in_progress,
                    active,
                    paused,
                    current_repetition: repetition,
                    current_percent: percent,
                    current_ww: value.value,
                    units: value.units,
                    tec_in_progress,
                    motion_in_progress,
                    reading: value.reading(),
                },
            )
        })
    }
}
