//! Runtime loading of `MIRcatSDK.dll`.

use libloading::Library;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the vendor library.
pub const LIBRARY_NAME: &str = "MIRcatSDK.dll";

/// Environment variable naming the SDK root (the directory holding `libs/`).
pub const SDK_DIR_ENV: &str = "MIRCAT_SDK_DIR";

/// Errors raised while locating or loading the SDK library.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no MIRcat SDK directory configured and MIRCAT_SDK_DIR is not set")]
    NoSdkDir,

    #[error("failed to load MIRcat SDK library from {}: {source}", path.display())]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("MIRcat SDK library is missing export `{symbol}`: {source}")]
    Symbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
}

/// Architecture subdirectory matching the pointer width of this build.
pub fn arch_dir() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "x64"
    } else {
        "x32"
    }
}

/// `<sdk_dir>/libs/<arch>/MIRcatSDK.dll`
pub fn library_path_in(sdk_dir: &Path) -> PathBuf {
    sdk_dir.join("libs").join(arch_dir()).join(LIBRARY_NAME)
}

/// Resolve the DLL path.
///
/// Order: `explicit`, then `sdk_dir`, then `$MIRCAT_SDK_DIR`, then the
/// directory containing the running executable.
pub fn resolve_library_path(
    explicit: Option<&Path>,
    sdk_dir: Option<&Path>,
) -> Result<PathBuf, LoadError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(dir) = sdk_dir {
        return Ok(library_path_in(dir));
    }
    if let Some(dir) = std::env::var_os(SDK_DIR_ENV) {
        return Ok(library_path_in(Path::new(&dir)));
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(library_path_in))
        .ok_or(LoadError::NoSdkDir)
}

macro_rules! sdk_exports {
    ($( $(#[$doc:meta])* $field:ident = $symbol:literal ( $($arg:ty),* ); )*) => {
        /// Resolved SDK exports.
        ///
        /// Function pointers stay valid for as long as the owning
        /// [`Library`] is alive; both are held together in this struct.
        pub struct MircatLibrary {
            path: PathBuf,
            $( $(#[$doc])* pub $field: unsafe extern "C" fn($($arg),*) -> u32, )*
            _library: Library,
        }

        /// Every export name this crate resolves.
        pub const SYMBOLS: &[&str] = &[$($symbol),*];

        impl MircatLibrary {
            fn resolve(path: PathBuf, library: Library) -> Result<Self, LoadError> {
                // SAFETY: the signatures below mirror the vendor calling
                // interface; the symbols are copied out while `library` is
                // still owned and are stored alongside it.
                unsafe {
                    Ok(Self {
                        path,
                        $(
                            $field: *library
                                .get::<unsafe extern "C" fn($($arg),*) -> u32>(
                                    concat!($symbol, "\0").as_bytes(),
                                )
                                .map_err(|source| LoadError::Symbol { symbol: $symbol, source })?,
                        )*
                        _library: library,
                    })
                }
            }
        }
    };
}

sdk_exports! {
    get_api_version = "MIRcatSDK_GetAPIVersion"(*mut u16, *mut u16, *mut u16);
    initialize = "MIRcatSDK_Initialize"();
    deinitialize = "MIRcatSDK_DeInitialize"();
    get_num_installed_qcls = "MIRcatSDK_GetNumInstalledQcls"(*mut u8);
    is_interlocked_status_set = "MIRcatSDK_IsInterlockedStatusSet"(*mut bool);
    is_key_switch_status_set = "MIRcatSDK_IsKeySwitchStatusSet"(*mut bool);
    arm_laser = "MIRcatSDK_ArmLaser"();
    disarm_laser = "MIRcatSDK_DisarmLaser"();
    is_laser_armed = "MIRcatSDK_IsLaserArmed"(*mut bool);
    /// `(target, units, preferred_qcl)`
    tune_to_ww = "MIRcatSDK_TuneToWW"(f32, u8, u8);
    is_tuned = "MIRcatSDK_IsTuned"(*mut bool);
    /// `(actual_ww, units, light_valid)`
    get_actual_ww = "MIRcatSDK_GetActualWW"(*mut f32, *mut u8, *mut bool);
    turn_emission_on = "MIRcatSDK_TurnEmissionOn"();
    turn_emission_off = "MIRcatSDK_TurnEmissionOff"();
    is_emission_on = "MIRcatSDK_IsEmissionOn"(*mut bool);
    get_qcl_pulse_rate = "MIRcatSDK_GetQCLPulseRate"(u8, *mut f32);
    get_qcl_pulse_width = "MIRcatSDK_GetQCLPulseWidth"(u8, *mut f32);
    get_qcl_current = "MIRcatSDK_GetQCLCurrent"(u8, *mut f32);
    /// `(qcl, pulse_rate, pulse_width, current)`
    set_qcl_params = "MIRcatSDK_SetQCLParams"(u8, f32, f32, f32);
    /// `(start, end, speed, units, repetitions, bidirectional)`
    start_sweep_scan = "MIRcatSDK_StartSweepScan"(f32, f32, f32, u8, u16, bool);
    stop_scan_in_progress = "MIRcatSDK_StopScanInProgress"();
    pause_scan_in_progress = "MIRcatSDK_PauseScanInProgress"();
    resume_scan_in_progress = "MIRcatSDK_ResumeScanInProgress"();
    /// `(in_progress, active, paused, repetition, percent, cur_ww, units,
    /// tec_in_progress, motion_in_progress)`
    get_scan_status = "MIRcatSDK_GetScanStatus"(
        *mut bool, *mut bool, *mut bool, *mut u16, *mut u16, *mut f32, *mut u8, *mut bool, *mut bool
    );
}

impl MircatLibrary {
    /// Load the DLL at `path` and resolve every export eagerly.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialisation routines. The caller must
    /// trust `path` to be the vendor MIRcat SDK.
    pub unsafe fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        let library = Library::new(&path).map_err(|source| LoadError::Library {
            path: path.clone(),
            source,
        })?;
        Self::resolve(path, library)
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for MircatLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MircatLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
