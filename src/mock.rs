//! Simulated MIRcat SDK.
//!
//! [`MockSdk`] implements [`MircatSdk`] in-process so the façade, the CLI and
//! the tests run without the vendor DLL or a laser. It reproduces the return
//! codes the real SDK gives for the common mistakes (not initialized, not
//! armed, out of tuning range, emission already on/off, no scan in progress)
//! and converges on "tuned" after a configurable number of polls.
//!
//! For tests it also records every SDK call and can fail the next call with
//! an arbitrary return code.

use crate::sdk::{check, sdk_error, ActualWw, ApiVersion, MircatSdk};
use mircat_core::error::AppResult;
use mircat_core::qcl::{QclParams, MAX_QCLS};
use mircat_core::scan::{ScanStatus, SweepScan};
use mircat_core::units::{Wavelength, WwUnits};
use mircat_sys::{
    MIRcatSDK_RET_ALREADY_CREATED, MIRcatSDK_RET_CURRENT_OUTOFRANGE,
    MIRcatSDK_RET_EMISSION_ALREADY_OFF, MIRcatSDK_RET_EMISSION_ALREADY_ON,
    MIRcatSDK_RET_INTERLOCKS_KEYSWITCH_NOTSET, MIRcatSDK_RET_LASER_ALREADY_ARMED,
    MIRcatSDK_RET_LASER_ALREADY_DISARMED, MIRcatSDK_RET_LASER_NOT_ARMED,
    MIRcatSDK_RET_LASER_NOT_TUNED, MIRcatSDK_RET_NOT_INITIALIZED,
    MIRcatSDK_RET_NO_SCAN_INPROGRESS, MIRcatSDK_RET_PAUSE_SCAN_FAILURE,
    MIRcatSDK_RET_PULSERATE_OUTOFRANGE, MIRcatSDK_RET_PULSEWIDTH_OUTOFRANGE,
    MIRcatSDK_RET_QCL_NUM_OUTOFRANGE, MIRcatSDK_RET_RESUME_SCAN_FAILURE,
    MIRcatSDK_RET_START_SWEEPSCAN_FAILURE, MIRcatSDK_RET_WW_OUTOFTUNINGRANGE,
};
use parking_lot::Mutex;
use tracing::debug;

/// Tuning range of each simulated QCL, in microns.
pub const DEFAULT_TUNING_RANGES_UM: [(f64, f64); MAX_QCLS as usize] =
    [(5.5, 6.5), (6.5, 8.0), (8.0, 9.5), (9.5, 11.0)];

/// Firmware current ceiling in the simulator. Looser than the client-side
/// per-QCL limits so those are what trips first.
const FIRMWARE_MAX_CURRENT_MA: f64 = 1000.0;

#[derive(Debug, Clone, Copy)]
struct QclState {
    pulse_rate_hz: f64,
    pulse_width_ns: f64,
    current_ma: f64,
}

const DEFAULT_QCL_STATE: [QclState; MAX_QCLS as usize] = [
    QclState {
        pulse_rate_hz: 100_000.0,
        pulse_width_ns: 40.0,
        current_ma: 720.0,
    },
    QclState {
        pulse_rate_hz: 100_000.0,
        pulse_width_ns: 40.0,
        current_ma: 740.0,
    },
    QclState {
        pulse_rate_hz: 100_000.0,
        pulse_width_ns: 40.0,
        current_ma: 570.0,
    },
    QclState {
        pulse_rate_hz: 100_000.0,
        pulse_width_ns: 40.0,
        current_ma: 860.0,
    },
];

#[derive(Debug, Clone, Copy)]
struct ActiveScan {
    scan: SweepScan,
    repetition: u16,
    percent: u16,
    paused: bool,
}

impl ActiveScan {
    fn position(&self) -> f64 {
        let reversed = self.scan.bidirectional && self.repetition % 2 == 0;
        let (from, to) = if reversed {
            (self.scan.end, self.scan.start)
        } else {
            (self.scan.start, self.scan.end)
        };
        from + (to - from) * f64::from(self.percent) / 100.0
    }
}

#[derive(Debug)]
struct MockState {
    initialized: bool,
    interlock_set: bool,
    key_switch_set: bool,
    armed: bool,
    emitting: bool,
    tuned: bool,
    polls_until_tuned: u32,
    /// Current output in microns. Zero until the first tune.
    current_um: f64,
    qcls: [QclState; MAX_QCLS as usize],
    scan: Option<ActiveScan>,
}

/// In-process MIRcat simulator.
///
/// # Example
///
/// ```
/// use mircat::mock::MockSdk;
/// use mircat::sdk::MircatSdk;
///
/// let sdk = MockSdk::new();
/// sdk.initialize().unwrap();
/// assert_eq!(sdk.num_installed_qcls().unwrap(), 4);
/// ```
#[derive(Debug)]
pub struct MockSdk {
    state: Mutex<MockState>,
    num_qcls: u8,
    tune_polls: u32,
    scan_step_percent: u16,
    api_version: ApiVersion,
    call_log: Mutex<Vec<String>>,
    next_failure: Mutex<Option<u32>>,
}

impl Default for MockSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSdk {
    /// Four QCLs, interlock and key switch set, tuned after two polls.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                initialized: false,
                interlock_set: true,
                key_switch_set: true,
                armed: false,
                emitting: false,
                tuned: false,
                polls_until_tuned: 0,
                current_um: 0.0,
                qcls: DEFAULT_QCL_STATE,
                scan: None,
            }),
            num_qcls: MAX_QCLS,
            tune_polls: 2,
            scan_step_percent: 25,
            api_version: ApiVersion {
                major: 2,
                minor: 5,
                patch: 0,
            },
            call_log: Mutex::new(Vec::new()),
            next_failure: Mutex::new(None),
        }
    }

    /// Number of installed QCLs, clamped to `1..=4`.
    pub fn with_num_qcls(mut self, num_qcls: u8) -> Self {
        self.num_qcls = num_qcls.clamp(1, MAX_QCLS);
        self
    }

    /// `IsTuned` polls needed before a tune completes. Zero tunes instantly.
    pub fn with_tune_polls(mut self, polls: u32) -> Self {
        self.tune_polls = polls;
        self
    }

    /// Percent a running sweep advances per `GetScanStatus` call.
    pub fn with_scan_step_percent(mut self, step: u16) -> Self {
        self.scan_step_percent = step.clamp(1, 100);
        self
    }

    pub fn with_interlock(self, set: bool) -> Self {
        self.state.lock().interlock_set = set;
        self
    }

    pub fn with_key_switch(self, set: bool) -> Self {
        self.state.lock().key_switch_set = set;
        self
    }

    /// Make the next SDK call return `code` without touching state.
    pub fn inject_next_failure(&self, code: u32) {
        *self.next_failure.lock() = Some(code);
    }

    /// Names of the SDK exports called so far, oldest first.
    pub fn call_log(&self) -> Vec<String> {
        self.call_log.lock().clone()
    }

    pub fn clear_log(&self) {
        self.call_log.lock().clear();
    }

    /// Tuning range of every installed QCL, in microns.
    pub fn tuning_ranges_um(&self) -> &[(f64, f64)] {
        &DEFAULT_TUNING_RANGES_UM[..usize::from(self.num_qcls)]
    }

    /// Overall tunable span in microns.
    pub fn tuning_span_um(&self) -> (f64, f64) {
        let ranges = self.tuning_ranges_um();
        let min = ranges.iter().map(|r| r.0).fold(f64::INFINITY, f64::min);
        let max = ranges.iter().map(|r| r.1).fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }

    fn in_tuning_range(&self, microns: f64) -> bool {
        self.tuning_ranges_um()
            .iter()
            .any(|(lo, hi)| (*lo..=*hi).contains(&microns))
    }

    /// Log the call and consume any injected failure.
    fn enter(&self, name: &str) -> AppResult<()> {
        debug!(call = name, "MockSdk call");
        self.call_log.lock().push(name.to_string());
        match self.next_failure.lock().take() {
            Some(code) => check(code),
            None => Ok(()),
        }
    }

    /// `enter` plus the initialized check every export except
    /// `GetAPIVersion` and `Initialize` performs.
    fn enter_initialized(&self, name: &str) -> AppResult<parking_lot::MutexGuard<'_, MockState>> {
        self.enter(name)?;
        let state = self.state.lock();
        fail_if(!state.initialized, MIRcatSDK_RET_NOT_INITIALIZED)?;
        Ok(state)
    }

    fn check_qcl(&self, qcl: u8) -> AppResult<usize> {
        if (1..=self.num_qcls).contains(&qcl) {
            Ok(usize::from(qcl - 1))
        } else {
            Err(sdk_error(MIRcatSDK_RET_QCL_NUM_OUTOFRANGE))
        }
    }
}

fn fail_if(condition: bool, code: u32) -> AppResult<()> {
    if condition {
        Err(sdk_error(code))
    } else {
        Ok(())
    }
}

impl MircatSdk for MockSdk {
    fn api_version(&self) -> AppResult<ApiVersion> {
        self.enter("GetAPIVersion")?;
        Ok(self.api_version)
    }

    fn tuning_span_um(&self) -> Option<(f64, f64)> {
        Some(MockSdk::tuning_span_um(self))
    }

    fn initialize(&self) -> AppResult<()> {
        self.enter("Initialize")?;
        let mut state = self.state.lock();
        fail_if(state.initialized, MIRcatSDK_RET_ALREADY_CREATED)?;
        state.initialized = true;
        Ok(())
    }

    fn deinitialize(&self) -> AppResult<()> {
        let mut state = self.enter_initialized("DeInitialize")?;
        state.initialized = false;
        state.emitting = false;
        state.armed = false;
        state.scan = None;
        Ok(())
    }

    fn num_installed_qcls(&self) -> AppResult<u8> {
        self.enter_initialized("GetNumInstalledQcls")?;
        Ok(self.num_qcls)
    }

    fn is_interlock_set(&self) -> AppResult<bool> {
        Ok(self.enter_initialized("IsInterlockedStatusSet")?.interlock_set)
    }

    fn is_key_switch_set(&self) -> AppResult<bool> {
        Ok(self.enter_initialized("IsKeySwitchStatusSet")?.key_switch_set)
    }

    fn arm_laser(&self) -> AppResult<()> {
        let mut state = self.enter_initialized("ArmLaser")?;
        fail_if(
            !(state.interlock_set && state.key_switch_set),
            MIRcatSDK_RET_INTERLOCKS_KEYSWITCH_NOTSET,
        )?;
        fail_if(state.armed, MIRcatSDK_RET_LASER_ALREADY_ARMED)?;
        state.armed = true;
        Ok(())
    }

    fn disarm_laser(&self) -> AppResult<()> {
        let mut state = self.enter_initialized("DisarmLaser")?;
        fail_if(!state.armed, MIRcatSDK_RET_LASER_ALREADY_DISARMED)?;
        state.armed = false;
        state.emitting = false;
        state.tuned = false;
        state.scan = None;
        Ok(())
    }

    fn is_laser_armed(&self) -> AppResult<bool> {
        Ok(self.enter_initialized("IsLaserArmed")?.armed)
    }

    fn tune_to_ww(&self, target: Wavelength, preferred_qcl: u8) -> AppResult<()> {
        let mut state = self.enter_initialized("TuneToWW")?;
        fail_if(!state.armed, MIRcatSDK_RET_LASER_NOT_ARMED)?;
        self.check_qcl(preferred_qcl)?;
        let microns = target.as_microns();
        fail_if(!self.in_tuning_range(microns), MIRcatSDK_RET_WW_OUTOFTUNINGRANGE)?;

        state.current_um = microns;
        state.polls_until_tuned = self.tune_polls;
        state.tuned = self.tune_polls == 0;
        Ok(())
    }

    fn is_tuned(&self) -> AppResult<bool> {
        let mut state = self.enter_initialized("IsTuned")?;
        if !state.tuned && state.polls_until_tuned > 0 {
            state.polls_until_tuned -= 1;
            state.tuned = state.polls_until_tuned == 0;
        }
        Ok(state.tuned)
    }

    fn actual_ww(&self) -> AppResult<ActualWw> {
        let state = self.enter_initialized("GetActualWW")?;
        Ok(ActualWw {
            value: Wavelength::microns(state.current_um),
            light_valid: state.emitting,
        })
    }

    fn turn_emission_on(&self) -> AppResult<()> {
        let mut state = self.enter_initialized("TurnEmissionOn")?;
        fail_if(!state.armed, MIRcatSDK_RET_LASER_NOT_ARMED)?;
        fail_if(state.emitting, MIRcatSDK_RET_EMISSION_ALREADY_ON)?;
        fail_if(!state.tuned, MIRcatSDK_RET_LASER_NOT_TUNED)?;
        state.emitting = true;
        Ok(())
    }

    fn turn_emission_off(&self) -> AppResult<()> {
        let mut state = self.enter_initialized("TurnEmissionOff")?;
        fail_if(!state.emitting, MIRcatSDK_RET_EMISSION_ALREADY_OFF)?;
        state.emitting = false;
        Ok(())
    }

    fn is_emission_on(&self) -> AppResult<bool> {
        Ok(self.enter_initialized("IsEmissionOn")?.emitting)
    }

    fn qcl_pulse_rate(&self, qcl: u8) -> AppResult<f64> {
        let state = self.enter_initialized("GetQCLPulseRate")?;
        Ok(state.qcls[self.check_qcl(qcl)?].pulse_rate_hz)
    }

    fn qcl_pulse_width(&self, qcl: u8) -> AppResult<f64> {
        let state = self.enter_initialized("GetQCLPulseWidth")?;
        Ok(state.qcls[self.check_qcl(qcl)?].pulse_width_ns)
    }

    fn qcl_current(&self, qcl: u8) -> AppResult<f64> {
        let state = self.enter_initialized("GetQCLCurrent")?;
        Ok(state.qcls[self.check_qcl(qcl)?].current_ma)
    }

    fn set_qcl_params(&self, params: &QclParams) -> AppResult<()> {
        let mut state = self.enter_initialized("SetQCLParams")?;
        let idx = self.check_qcl(params.qcl)?;
        fail_if(
            !(0.0..=100_000.0).contains(&params.pulse_rate_hz),
            MIRcatSDK_RET_PULSERATE_OUTOFRANGE,
        )?;
        fail_if(
            !(0.0..=1_000.0).contains(&params.pulse_width_ns),
            MIRcatSDK_RET_PULSEWIDTH_OUTOFRANGE,
        )?;
        fail_if(
            !(0.0..=FIRMWARE_MAX_CURRENT_MA).contains(&params.current_ma),
            MIRcatSDK_RET_CURRENT_OUTOFRANGE,
        )?;
        state.qcls[idx] = QclState {
            pulse_rate_hz: params.pulse_rate_hz,
            pulse_width_ns: params.pulse_width_ns,
            current_ma: params.current_ma,
        };
        Ok(())
    }

    fn start_sweep_scan(&self, scan: &SweepScan) -> AppResult<()> {
        let mut state = self.enter_initialized("StartSweepScan")?;
        fail_if(!state.armed, MIRcatSDK_RET_LASER_NOT_ARMED)?;
        fail_if(state.scan.is_some(), MIRcatSDK_RET_START_SWEEPSCAN_FAILURE)?;
        let start = Wavelength::new(scan.start, scan.units).as_microns();
        let end = Wavelength::new(scan.end, scan.units).as_microns();
        fail_if(
            !(self.in_tuning_range(start) && self.in_tuning_range(end)),
            MIRcatSDK_RET_WW_OUTOFTUNINGRANGE,
        )?;

        state.scan = Some(ActiveScan {
            scan: *scan,
            repetition: 1,
            percent: 0,
            paused: false,
        });
        state.current_um = start;
        state.tuned = false;
        Ok(())
    }

    fn stop_scan(&self) -> AppResult<()> {
        let mut state = self.enter_initialized("StopScanInProgress")?;
        fail_if(state.scan.is_none(), MIRcatSDK_RET_NO_SCAN_INPROGRESS)?;
        state.scan = None;
        Ok(())
    }

    fn pause_scan(&self) -> AppResult<()> {
        let mut state = self.enter_initialized("PauseScanInProgress")?;
        match state.scan.as_mut() {
            None => Err(sdk_error(MIRcatSDK_RET_NO_SCAN_INPROGRESS)),
            Some(active) if active.paused => Err(sdk_error(MIRcatSDK_RET_PAUSE_SCAN_FAILURE)),
            Some(active) => {
                active.paused = true;
                Ok(())
            }
        }
    }

    fn resume_scan(&self) -> AppResult<()> {
        let mut state = self.enter_initialized("ResumeScanInProgress")?;
        match state.scan.as_mut() {
            None => Err(sdk_error(MIRcatSDK_RET_NO_SCAN_INPROGRESS)),
            Some(active) if !active.paused => Err(sdk_error(MIRcatSDK_RET_RESUME_SCAN_FAILURE)),
            Some(active) => {
                active.paused = false;
                Ok(())
            }
        }
    }

    fn scan_status(&self) -> AppResult<ScanStatus> {
        let mut state = self.enter_initialized("GetScanStatus")?;
        let step = self.scan_step_percent;

        let Some(mut active) = state.scan else {
            let value = Wavelength::microns(state.current_um);
            return Ok(ScanStatus {
                in_progress: false,
                active: false,
                paused: false,
                current_repetition: 0,
                current_percent: 0,
                current_ww: value.value,
                units: WwUnits::Microns,
                tec_in_progress: false,
                motion_in_progress: false,
                reading: value.reading(),
            });
        };

        if !active.paused {
            active.percent = (active.percent + step).min(100);
        }
        let value = Wavelength::new(active.position(), active.scan.units);
        state.current_um = value.as_microns();

        let finished = active.percent >= 100 && active.repetition >= active.scan.repetitions;
        let status = ScanStatus {
            in_progress: !finished,
            active: !finished && !active.paused,
            paused: active.paused,
            current_repetition: active.repetition,
            current_percent: active.percent,
            current_ww: value.value,
            units: value.units,
            tec_in_progress: false,
            motion_in_progress: !finished && !active.paused,
            reading: value.reading(),
        };

        if finished {
            state.scan = None;
        } else {
            if active.percent >= 100 {
                active.repetition += 1;
                active.percent = 0;
            }
            state.scan = Some(active);
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mircat_core::error::DaqError;

    fn ready() -> MockSdk {
        let sdk = MockSdk::new().with_tune_polls(0);
        sdk.initialize().unwrap();
        sdk
    }

    #[test]
    fn calls_before_initialize_fail() {
        let sdk = MockSdk::new();
        assert_eq!(sdk.api_version().unwrap().to_string(), "2.5.0");
        let err = sdk.is_emission_on().unwrap_err();
        assert_eq!(err.sdk_code(), Some(MIRcatSDK_RET_NOT_INITIALIZED));
    }

    #[test]
    fn second_initialize_is_already_created() {
        let sdk = ready();
        assert_eq!(
            sdk.initialize().unwrap_err().sdk_code(),
            Some(MIRcatSDK_RET_ALREADY_CREATED)
        );
    }

    #[test]
    fn arm_requires_interlock_and_key_switch() {
        let sdk = MockSdk::new().with_key_switch(false);
        sdk.initialize().unwrap();
        let err = sdk.arm_laser().unwrap_err();
        assert_eq!(err.sdk_code(), Some(MIRcatSDK_RET_INTERLOCKS_KEYSWITCH_NOTSET));
        assert!(!sdk.is_laser_armed().unwrap());
    }

    #[test]
    fn tuning_span_follows_installed_qcls() {
        assert_eq!(MockSdk::new().tuning_span_um(), (5.5, 11.0));
        let two = MockSdk::new().with_num_qcls(2);
        assert_eq!(two.tuning_span_um(), (5.5, 8.0));
        let sdk: &dyn MircatSdk = &two;
        assert_eq!(sdk.tuning_span_um(), Some((5.5, 8.0)));
    }

    #[test]
    fn tune_requires_arm_and_range() {
        let sdk = ready();
        assert_eq!(
            sdk.tune_to_ww(Wavelength::microns(7.0), 1)
                .unwrap_err()
                .sdk_code(),
            Some(MIRcatSDK_RET_LASER_NOT_ARMED)
        );

        sdk.arm_laser().unwrap();
        assert_eq!(
            sdk.tune_to_ww(Wavelength::microns(12.5), 1)
                .unwrap_err()
                .sdk_code(),
            Some(MIRcatSDK_RET_WW_OUTOFTUNINGRANGE)
        );

        sdk.tune_to_ww(Wavelength::wavenumbers(1400.0), 1).unwrap();
        assert!(sdk.is_tuned().unwrap());
        let ww = sdk.actual_ww().unwrap();
        assert!((ww.value.as_wavenumbers() - 1400.0).abs() < 1e-9);
    }

    #[test]
    fn tune_converges_after_polls() {
        let sdk = MockSdk::new().with_tune_polls(3);
        sdk.initialize().unwrap();
        sdk.arm_laser().unwrap();
        sdk.tune_to_ww(Wavelength::microns(7.0), 1).unwrap();
        assert!(!sdk.is_tuned().unwrap());
        assert!(!sdk.is_tuned().unwrap());
        assert!(sdk.is_tuned().unwrap());
    }

    #[test]
    fn emission_already_on_and_off() {
        let sdk = ready();
        sdk.arm_laser().unwrap();
        sdk.tune_to_ww(Wavelength::microns(7.0), 1).unwrap();
        assert_eq!(
            sdk.turn_emission_off().unwrap_err().sdk_code(),
            Some(MIRcatSDK_RET_EMISSION_ALREADY_OFF)
        );
        sdk.turn_emission_on().unwrap();
        assert_eq!(
            sdk.turn_emission_on().unwrap_err().sdk_code(),
            Some(MIRcatSDK_RET_EMISSION_ALREADY_ON)
        );
        assert!(sdk.actual_ww().unwrap().light_valid);
    }

    #[test]
    fn qcl_number_checked_against_installed() {
        let sdk = MockSdk::new().with_num_qcls(2);
        sdk.initialize().unwrap();
        assert!(sdk.qcl_current(2).is_ok());
        assert_eq!(
            sdk.qcl_current(3).unwrap_err().sdk_code(),
            Some(MIRcatSDK_RET_QCL_NUM_OUTOFRANGE)
        );
    }

    #[test]
    fn sweep_runs_to_completion() {
        let sdk = ready().with_scan_step_percent(50);
        sdk.arm_laser().unwrap();
        let scan = SweepScan::new(WwUnits::Microns, 7.0, 7.5, 0.1).with_repetitions(2);
        sdk.start_sweep_scan(&scan).unwrap();

        let percents: Vec<(u16, u16, bool)> = (0..4)
            .map(|_| {
                let s = sdk.scan_status().unwrap();
                (s.current_repetition, s.current_percent, s.in_progress)
            })
            .collect();
        assert_eq!(
            percents,
            vec![(1, 50, true), (1, 100, true), (2, 50, true), (2, 100, false)]
        );
        assert!(!sdk.scan_status().unwrap().in_progress);
        assert_eq!(
            sdk.stop_scan().unwrap_err().sdk_code(),
            Some(MIRcatSDK_RET_NO_SCAN_INPROGRESS)
        );
    }

    #[test]
    fn paused_sweep_does_not_advance() {
        let sdk = ready();
        sdk.arm_laser().unwrap();
        sdk.start_sweep_scan(&SweepScan::new(WwUnits::Microns, 7.0, 7.5, 0.1))
            .unwrap();
        sdk.pause_scan().unwrap();
        let first = sdk.scan_status().unwrap();
        let second = sdk.scan_status().unwrap();
        assert!(first.paused && first.in_progress && !first.active);
        assert_eq!(first.current_percent, second.current_percent);
        assert!(sdk.pause_scan().is_err());
        sdk.resume_scan().unwrap();
        assert!(sdk.scan_status().unwrap().active);
    }

    #[test]
    fn injected_failure_applies_once() {
        let sdk = ready();
        sdk.inject_next_failure(mircat_sys::MIRcatSDK_RET_COMM_ERROR);
        let err = sdk.is_laser_armed().unwrap_err();
        assert_eq!(
            err,
            DaqError::Sdk {
                code: 100,
                message: "Communication error.".into()
            }
        );
        assert!(sdk.is_laser_armed().is_ok());
    }

    #[test]
    fn call_log_records_export_names() {
        let sdk = ready();
        sdk.clear_log();
        sdk.is_interlock_set().unwrap();
        sdk.num_installed_qcls().unwrap();
        assert_eq!(
            sdk.call_log(),
            vec!["IsInterlockedStatusSet", "GetNumInstalledQcls"]
        );
    }
}
