//! Raw FFI bindings for the Daylight Solutions MIRcat SDK.
//!
//! The vendor ships `MIRcatSDK.dll` in two builds, one per pointer width,
//! under `libs/x64/` and `libs/x32/`. There are no headers or import
//! libraries, so this crate resolves every export at runtime through
//! [`libloading`] and exposes them as a table of `extern "C"` function
//! pointers ([`MircatLibrary`]).
//!
//! Everything here is `unsafe` to call. The safe façade lives in the
//! `mircat` crate.
//!
//! # Constants
//!
//! Constant names follow the vendor header (`MIRcatSDK_RET_*`,
//! `MIRcatSDK_UNITS_*`, ...) so they can be matched against vendor
//! documentation directly.

#![allow(non_upper_case_globals)]
#![allow(unsafe_code)]

mod library;

pub use library::{
    arch_dir, library_path_in, resolve_library_path, LoadError, MircatLibrary, LIBRARY_NAME,
    SDK_DIR_ENV, SYMBOLS,
};

// =============================================================================
// Return codes
// =============================================================================

/// Success. Every SDK export returns this on success.
pub const MIRcatSDK_RET_SUCCESS: u32 = 0;

// Communication and transport
pub const MIRcatSDK_RET_UNSUPPORTED_TRANSPORT: u32 = 1;

// Initialization
pub const MIRcatSDK_RET_INITIALIZATION_FAILURE: u32 = 32;

// Operational
pub const MIRcatSDK_RET_ARMDISARM_FAILURE: u32 = 64;
pub const MIRcatSDK_RET_STARTTUNE_FAILURE: u32 = 65;
pub const MIRcatSDK_RET_INTERLOCKS_KEYSWITCH_NOTSET: u32 = 66;
pub const MIRcatSDK_RET_STOP_SCAN_FAILURE: u32 = 67;
pub const MIRcatSDK_RET_PAUSE_SCAN_FAILURE: u32 = 68;
pub const MIRcatSDK_RET_RESUME_SCAN_FAILURE: u32 = 69;
pub const MIRcatSDK_RET_MANUAL_STEP_SCAN_FAILURE: u32 = 70;
pub const MIRcatSDK_RET_START_SWEEPSCAN_FAILURE: u32 = 71;
pub const MIRcatSDK_RET_START_STEPMEASURESCAN_FAILURE: u32 = 72;
pub const MIRcatSDK_RET_INDEX_OUTOFBOUNDS: u32 = 73;
pub const MIRcatSDK_RET_START_MULTISPECTRALSCAN_FAILURE: u32 = 74;
pub const MIRcatSDK_RET_TOO_MANY_ELEMENTS: u32 = 75;
pub const MIRcatSDK_RET_NOT_ENOUGH_ELEMENTS: u32 = 76;
pub const MIRcatSDK_RET_BUFFER_TOO_SMALL: u32 = 77;
pub const MIRcatSDK_RET_FAVORITE_NAME_NOTRECOGNIZED: u32 = 78;
pub const MIRcatSDK_RET_FAVORITE_RECALL_FAILURE: u32 = 79;
pub const MIRcatSDK_RET_WW_OUTOFTUNINGRANGE: u32 = 80;
pub const MIRcatSDK_RET_NO_SCAN_INPROGRESS: u32 = 81;
pub const MIRcatSDK_RET_EMISSION_ON_FAILURE: u32 = 82;
pub const MIRcatSDK_RET_EMISSION_ALREADY_OFF: u32 = 83;
pub const MIRcatSDK_RET_EMISSION_OFF_FAILURE: u32 = 84;
pub const MIRcatSDK_RET_EMISSION_ALREADY_ON: u32 = 85;
pub const MIRcatSDK_RET_PULSERATE_OUTOFRANGE: u32 = 86;
pub const MIRcatSDK_RET_PULSEWIDTH_OUTOFRANGE: u32 = 87;
pub const MIRcatSDK_RET_CURRENT_OUTOFRANGE: u32 = 88;
pub const MIRcatSDK_RET_SAVE_SETTINGS_FAILURE: u32 = 89;
pub const MIRcatSDK_RET_QCL_NUM_OUTOFRANGE: u32 = 90;
pub const MIRcatSDK_RET_LASER_ALREADY_ARMED: u32 = 91;
pub const MIRcatSDK_RET_LASER_ALREADY_DISARMED: u32 = 92;
pub const MIRcatSDK_RET_LASER_NOT_ARMED: u32 = 93;
pub const MIRcatSDK_RET_LASER_NOT_TUNED: u32 = 94;
pub const MIRcatSDK_RET_TECS_NOT_AT_SET_TEMPERATURE: u32 = 95;
pub const MIRcatSDK_RET_CW_NOT_ALLOWED_ON_QCL: u32 = 96;
pub const MIRcatSDK_RET_INVALID_LASER_MODE: u32 = 97;
pub const MIRcatSDK_RET_TEMPERATURE_OUT_OF_RANGE: u32 = 98;
pub const MIRcatSDK_RET_LASER_POWER_OFF_ERROR: u32 = 99;
pub const MIRcatSDK_RET_COMM_ERROR: u32 = 100;
pub const MIRcatSDK_RET_NOT_INITIALIZED: u32 = 101;
pub const MIRcatSDK_RET_ALREADY_CREATED: u32 = 102;
pub const MIRcatSDK_RET_START_SWEEP_ADVANCED_SCAN_FAILURE: u32 = 103;
pub const MIRcatSDK_RET_INJECT_PROC_TRIG_ERROR: u32 = 104;

// =============================================================================
// Parameters
// =============================================================================

/// Communication via serial port.
pub const MIRcatSDK_COMM_SERIAL: u8 = 1;
/// Communication via UDP.
pub const MIRcatSDK_COMM_UDP: u8 = 2;
/// Serial is the SDK default transport.
pub const MIRcatSDK_COMM_DEFAULT: u8 = MIRcatSDK_COMM_SERIAL;

/// Automatically find the device on the serial port.
pub const MIRcatSDK_SERIAL_PORT_AUTO: u16 = 0;
pub const MIRcatSDK_SERIAL_BAUD_USE_DEFAULT: u32 = 0;
pub const MIRcatSDK_SERIAL_BAUD1: u32 = 115_200;
pub const MIRcatSDK_SERIAL_BAUD2: u32 = 921_600;

/// Wavelength in micrometers.
pub const MIRcatSDK_UNITS_MICRONS: u8 = 1;
/// Wavenumber in cm^-1.
pub const MIRcatSDK_UNITS_CM1: u8 = 2;

// Laser emission modes. Not every head supports every mode.
pub const MIRcatSDK_MODE_ERROR: u8 = 0;
pub const MIRcatSDK_MODE_PULSED: u8 = 1;
pub const MIRcatSDK_MODE_CW: u8 = 2;
pub const MIRcatSDK_MODE_CW_MOD: u8 = 3;
/// Not supported in current firmware.
pub const MIRcatSDK_MODE_CW_MR: u8 = 6;
/// Not supported in current firmware.
pub const MIRcatSDK_MODE_CW_MR_MOD: u8 = 7;
pub const MIRcatSDK_MODE_CW_FLTR1: u8 = 8;
pub const MIRcatSDK_MODE_CW_FLTR2: u8 = 9;
pub const MIRcatSDK_MODE_CW_FLTR1_MOD: u8 = 10;

// Pulse triggering modes
pub const MIRcatSDK_PULSE_MODE_INTERNAL: u8 = 1;
pub const MIRcatSDK_PULSE_MODE_EXTERNAL_TRIGGER: u8 = 2;
pub const MIRcatSDK_PULSE_MODE_EXTERNAL_PASSTHRU: u8 = 3;
pub const MIRcatSDK_PULSE_MODE_WAVELENGTH_TRIGGER: u8 = 4;

// Process triggering modes (step scans)
pub const MIRcatSDK_PROC_TRIG_MODE_INTERNAL: u8 = 1;
pub const MIRcatSDK_PROC_TRIG_MODE_EXTERNAL: u8 = 2;
pub const MIRcatSDK_PROC_TRIG_MODE_MANUAL: u8 = 3;

/// Human-readable message for an SDK return code.
///
/// Returns `None` for [`MIRcatSDK_RET_SUCCESS`] and for codes the vendor
/// does not document.
pub fn return_code_message(code: u32) -> Option<&'static str> {
    let msg = match code {
        MIRcatSDK_RET_UNSUPPORTED_TRANSPORT => "Unsupported transport type.",
        MIRcatSDK_RET_INITIALIZATION_FAILURE => "Initialization failure.",
        MIRcatSDK_RET_ARMDISARM_FAILURE => "Failed to arm/disarm the laser.",
        MIRcatSDK_RET_STARTTUNE_FAILURE => "Failed to start tuning.",
        MIRcatSDK_RET_INTERLOCKS_KEYSWITCH_NOTSET => "Interlocks or key switch not set.",
        MIRcatSDK_RET_STOP_SCAN_FAILURE => "Failed to stop the scan.",
        MIRcatSDK_RET_PAUSE_SCAN_FAILURE => "Failed to pause the scan.",
        MIRcatSDK_RET_RESUME_SCAN_FAILURE => "Failed to resume the scan.",
        MIRcatSDK_RET_MANUAL_STEP_SCAN_FAILURE => "Failed to manually step scan.",
        MIRcatSDK_RET_START_SWEEPSCAN_FAILURE => "Failed to start sweep scan.",
        MIRcatSDK_RET_START_STEPMEASURESCAN_FAILURE => "Failed to start step-measure scan.",
        MIRcatSDK_RET_INDEX_OUTOFBOUNDS => "Index out of bounds.",
        MIRcatSDK_RET_START_MULTISPECTRALSCAN_FAILURE => "Failed to start multi-spectral scan.",
        MIRcatSDK_RET_TOO_MANY_ELEMENTS => "Too many elements specified.",
        MIRcatSDK_RET_NOT_ENOUGH_ELEMENTS => "Not enough elements specified.",
        MIRcatSDK_RET_BUFFER_TOO_SMALL => "Buffer too small.",
        MIRcatSDK_RET_FAVORITE_NAME_NOTRECOGNIZED => "Favorite name not recognized.",
        MIRcatSDK_RET_FAVORITE_RECALL_FAILURE => "Failed to recall favorite.",
        MIRcatSDK_RET_WW_OUTOFTUNINGRANGE => "Wavelength out of tuning range.",
        MIRcatSDK_RET_NO_SCAN_INPROGRESS => "No scan in progress.",
        MIRcatSDK_RET_EMISSION_ON_FAILURE => "Failed to turn emission on.",
        MIRcatSDK_RET_EMISSION_ALREADY_OFF => "Emission already off.",
        MIRcatSDK_RET_EMISSION_OFF_FAILURE => "Failed to turn emission off.",
        MIRcatSDK_RET_EMISSION_ALREADY_ON => "Emission already on.",
        MIRcatSDK_RET_PULSERATE_OUTOFRANGE => "Pulse rate out of range.",
        MIRcatSDK_RET_PULSEWIDTH_OUTOFRANGE => "Pulse width out of range.",
        MIRcatSDK_RET_CURRENT_OUTOFRANGE => "Current out of range.",
        MIRcatSDK_RET_SAVE_SETTINGS_FAILURE => "Failed to save settings.",
        MIRcatSDK_RET_QCL_NUM_OUTOFRANGE => "QCL number out of range.",
        MIRcatSDK_RET_LASER_ALREADY_ARMED => "Laser already armed.",
        MIRcatSDK_RET_LASER_ALREADY_DISARMED => "Laser already disarmed.",
        MIRcatSDK_RET_LASER_NOT_ARMED => "Laser not armed.",
        MIRcatSDK_RET_LASER_NOT_TUNED => "Laser not tuned.",
        MIRcatSDK_RET_TECS_NOT_AT_SET_TEMPERATURE => "TEC not at set temperature.",
        MIRcatSDK_RET_CW_NOT_ALLOWED_ON_QCL => "CW not allowed on specified QCL.",
        MIRcatSDK_RET_INVALID_LASER_MODE => "Invalid laser mode.",
        MIRcatSDK_RET_TEMPERATURE_OUT_OF_RANGE => "Temperature out of range.",
        MIRcatSDK_RET_LASER_POWER_OFF_ERROR => "Failed to power off the laser.",
        MIRcatSDK_RET_COMM_ERROR => "Communication error.",
        MIRcatSDK_RET_NOT_INITIALIZED => "SDK not initialized.",
        MIRcatSDK_RET_ALREADY_CREATED => "Instance already created.",
        MIRcatSDK_RET_START_SWEEP_ADVANCED_SCAN_FAILURE => "Failed to start advanced sweep scan.",
        MIRcatSDK_RET_INJECT_PROC_TRIG_ERROR => "Failed to inject process trigger.",
        _ => return None,
    };
    Some(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_has_no_message() {
        assert_eq!(return_code_message(MIRcatSDK_RET_SUCCESS), None);
    }

    #[test]
    fn documented_codes_have_messages() {
        assert_eq!(
            return_code_message(MIRcatSDK_RET_WW_OUTOFTUNINGRANGE),
            Some("Wavelength out of tuning range.")
        );
        assert_eq!(
            return_code_message(MIRcatSDK_RET_INTERLOCKS_KEYSWITCH_NOTSET),
            Some("Interlocks or key switch not set.")
        );

        // The operational block is contiguous.
        for code in 64..=104 {
            assert!(
                return_code_message(code).is_some(),
                "missing message for code {code}"
            );
        }
    }

    #[test]
    fn undocumented_codes_have_no_message() {
        assert_eq!(return_code_message(2), None);
        assert_eq!(return_code_message(63), None);
        assert_eq!(return_code_message(105), None);
    }
}
