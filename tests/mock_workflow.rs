//! End-to-end driver tests against the simulated laser
//!
//! These walk the same sequence an operator would: connect, arm, tune,
//! enable emission, run a sweep, and shut down.

use mircat::mock::MockSdk;
use mircat::{DriverSettings, MircatDriver, MircatFactory};
use mircat_core::driver::DriverFactory;
use mircat_core::error::DaqError;
use mircat_core::qcl::QclParams;
use mircat_core::scan::SweepScan;
use mircat_core::units::{Wavelength, WwUnits};
use mircat_sys::{
    MIRcatSDK_RET_COMM_ERROR, MIRcatSDK_RET_EMISSION_ALREADY_OFF,
    MIRcatSDK_RET_LASER_NOT_ARMED, MIRcatSDK_RET_NO_SCAN_INPROGRESS,
    MIRcatSDK_RET_WW_OUTOFTUNINGRANGE,
};
use std::sync::Arc;
use std::time::Duration;

fn fast() -> DriverSettings {
    DriverSettings {
        preferred_qcl: 1,
        connect_settle: Duration::ZERO,
        poll_interval: Duration::from_millis(1),
        wait_timeout: Duration::from_millis(500),
    }
}

async fn connected(sdk: Arc<MockSdk>) -> MircatDriver {
    let driver = MircatDriver::new_async(sdk, fast()).await.unwrap();
    driver.connect().await.unwrap();
    driver
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

// =============================================================================
// Tuning
// =============================================================================

#[tokio::test]
async fn test_operator_walkthrough() {
    let sdk = Arc::new(MockSdk::new());
    let driver = connected(sdk.clone()).await;

    let status = driver.status().await.unwrap();
    assert!(status.connected);
    assert_eq!(status.num_qcls, Some(4));
    assert_eq!(status.interlock_set, Some(true));
    assert_eq!(status.key_switch_set, Some(true));
    assert_eq!(status.armed, Some(false));
    assert_eq!(status.emitting, Some(false));

    driver.arm_laser().await.unwrap();
    assert!(driver.is_armed().await.unwrap());

    driver.tune("wl", 7.0).await.unwrap();
    let reading = driver.get_ww().await.unwrap();
    assert_close(reading.wavelength_um, 7.0);
    assert_close(reading.wavenumber_cm1, 10_000.0 / 7.0);

    driver.tune("wl", 7.1).await.unwrap();
    assert_close(driver.get_ww().await.unwrap().wavelength_um, 7.1);

    driver.tune("wn", 1400.0).await.unwrap();
    let reading = driver.get_ww().await.unwrap();
    assert_close(reading.wavenumber_cm1, 1400.0);
    assert_close(reading.wavelength_um, 10_000.0 / 1400.0);

    driver.enable_emission().await.unwrap();
    let status = driver.status().await.unwrap();
    assert_eq!(status.emitting, Some(true));
    assert_eq!(status.tuned, Some(true));
    assert_eq!(status.wavenumber_cm1.map(|v| v.round()), Some(1400.0));

    driver.disable_emission().await.unwrap();
    driver.disarm_laser().await.unwrap();
    assert!(!driver.is_armed().await.unwrap());

    assert!(!driver.disconnect().await.unwrap());
    assert!(!driver.is_connected());
}

#[tokio::test]
async fn test_tune_polls_is_tuned_until_settled() {
    let sdk = Arc::new(MockSdk::new().with_tune_polls(3));
    let driver = connected(sdk.clone()).await;
    driver.arm_laser().await.unwrap();
    sdk.clear_log();

    driver.tune_to(Wavelength::microns(9.0)).await.unwrap();
    let log = sdk.call_log();
    assert_eq!(log[0], "TuneToWW");
    assert_eq!(log.iter().filter(|c| *c == "IsTuned").count(), 3);
}

#[tokio::test]
async fn test_tune_out_of_range_reports_sdk_message() {
    let driver = connected(Arc::new(MockSdk::new())).await;
    driver.arm_laser().await.unwrap();

    let err = driver.tune("wl", 12.0).await.unwrap_err();
    assert_eq!(err.sdk_code(), Some(MIRcatSDK_RET_WW_OUTOFTUNINGRANGE));
    assert_eq!(
        err.to_string(),
        "MIRcat SDK error 80: Wavelength out of tuning range."
    );
}

#[tokio::test]
async fn test_tune_without_arming_fails() {
    let driver = connected(Arc::new(MockSdk::new())).await;
    let err = driver.tune("wn", 1400.0).await.unwrap_err();
    assert_eq!(err.sdk_code(), Some(MIRcatSDK_RET_LASER_NOT_ARMED));
}

#[tokio::test]
async fn test_zero_wavelength_before_first_tune() {
    let driver = connected(Arc::new(MockSdk::new())).await;
    let reading = driver.get_ww().await.unwrap();
    assert_eq!(reading.wavelength_um, 0.0);
    assert_eq!(reading.wavenumber_cm1, 0.0);
}

// =============================================================================
// Emission and failures
// =============================================================================

#[tokio::test]
async fn test_disable_emission_when_off_is_sdk_error() {
    let driver = connected(Arc::new(MockSdk::new())).await;
    let err = driver.disable_emission().await.unwrap_err();
    assert_eq!(err.sdk_code(), Some(MIRcatSDK_RET_EMISSION_ALREADY_OFF));
}

#[tokio::test]
async fn test_injected_failure_surfaces_once() {
    let sdk = Arc::new(MockSdk::new());
    let driver = connected(sdk.clone()).await;

    sdk.inject_next_failure(MIRcatSDK_RET_COMM_ERROR);
    let err = driver.num_qcls().await.unwrap_err();
    assert_eq!(
        err,
        DaqError::Sdk {
            code: 100,
            message: "Communication error.".to_string()
        }
    );
    assert_eq!(driver.num_qcls().await.unwrap(), 4);
}

#[tokio::test]
async fn test_unknown_return_code() {
    let sdk = Arc::new(MockSdk::new());
    let driver = connected(sdk.clone()).await;

    sdk.inject_next_failure(4242);
    let err = driver.is_armed().await.unwrap_err();
    assert_eq!(err.to_string(), "MIRcat SDK error 4242: Unknown error occurred");
}

// =============================================================================
// QCL parameters
// =============================================================================

#[tokio::test]
async fn test_qcl_params_all_follows_installed_count() {
    let driver = connected(Arc::new(MockSdk::new().with_num_qcls(2))).await;
    let all = driver.qcl_params_all().await.unwrap();
    assert_eq!(all.iter().map(|p| p.qcl).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn test_set_qcl_params_round_trip() {
    let driver = connected(Arc::new(MockSdk::new())).await;
    let params = QclParams::new(2, 50_000.0, 10.0, 700.0);
    driver.set_qcl_params(params).await.unwrap();
    assert_eq!(driver.qcl_params(2).await.unwrap(), params);
}

#[tokio::test]
async fn test_set_qcl_params_refused_before_sdk() {
    let sdk = Arc::new(MockSdk::new());
    let driver = connected(sdk.clone()).await;
    sdk.clear_log();

    // 640 mA is above the 630 mA ceiling of QCL 3.
    let err = driver
        .set_qcl_params(QclParams::new(3, 10_000.0, 100.0, 640.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DaqError::InvalidParameter(msg) if msg.contains("630")));
    assert!(sdk.call_log().is_empty());
}

// =============================================================================
// Sweep scans
// =============================================================================

#[tokio::test]
async fn test_sweep_scan_runs_to_completion() {
    let sdk = Arc::new(MockSdk::new().with_scan_step_percent(50));
    let driver = connected(sdk).await;
    driver.arm_laser().await.unwrap();

    let scan = SweepScan::new(WwUnits::Wavenumbers, 1350.0, 1450.0, 10.0).with_repetitions(2);
    driver.start_sweep_scan(scan).await.unwrap();

    let mut seen = Vec::new();
    loop {
        let status = driver.scan_status().await.unwrap();
        seen.push((status.current_repetition, status.current_percent));
        if !status.in_progress {
            assert_close(status.current_ww, 1450.0);
            assert_eq!(status.units, WwUnits::Wavenumbers);
            break;
        }
    }
    assert_eq!(seen, vec![(1, 50), (1, 100), (2, 50), (2, 100)]);
    assert_eq!(driver.last_scan_status().map(|s| s.in_progress), Some(false));

    let err = driver.stop_scan().await.unwrap_err();
    assert_eq!(err.sdk_code(), Some(MIRcatSDK_RET_NO_SCAN_INPROGRESS));
}

#[tokio::test]
async fn test_pause_resume_stop() {
    let driver = connected(Arc::new(MockSdk::new())).await;
    driver.arm_laser().await.unwrap();
    driver
        .start_sweep_scan(SweepScan::new(WwUnits::Microns, 6.9, 7.4, 0.1))
        .await
        .unwrap();

    let first = driver.scan_status().await.unwrap();
    driver.pause_scan().await.unwrap();
    let paused = driver.scan_status().await.unwrap();
    assert!(paused.paused);
    assert!(!paused.active);
    assert_eq!(paused.current_percent, first.current_percent);

    driver.resume_scan().await.unwrap();
    let resumed = driver.scan_status().await.unwrap();
    assert!(resumed.active);
    assert!(resumed.current_percent > first.current_percent);

    driver.stop_scan().await.unwrap();
    assert!(!driver.scan_status().await.unwrap().in_progress);
}

#[tokio::test]
async fn test_invalid_sweep_rejected_client_side() {
    let sdk = Arc::new(MockSdk::new());
    let driver = connected(sdk.clone()).await;
    sdk.clear_log();

    let err = driver
        .start_sweep_scan(SweepScan::new(WwUnits::Wavenumbers, 1350.0, 1450.0, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DaqError::InvalidParameter(_)));
    assert!(sdk.call_log().is_empty());
}

// =============================================================================
// Factory and capability traits
// =============================================================================

#[tokio::test]
async fn test_factory_components_drive_the_laser() {
    let config: toml::Value = toml::from_str(
        r#"
backend = "mock"
connect_settle_ms = 0
poll_interval_ms = 1
wait_timeout_ms = 500
auto_connect = true
"#,
    )
    .unwrap();
    MircatFactory.validate(&config).unwrap();
    let components = MircatFactory.build(config).await.unwrap();

    let armable = components.armable.unwrap();
    let tunable = components.wavelength_tunable.unwrap();
    let emission = components.emission_control.unwrap();
    let qcl = components.qcl_control.unwrap();

    armable.arm().await.unwrap();
    tunable.tune(Wavelength::wavenumbers(1400.0)).await.unwrap();
    assert!(tunable.is_tuned().await.unwrap());
    emission.enable_emission().await.unwrap();
    assert!(emission.is_emission_enabled().await.unwrap());
    assert_eq!(qcl.num_qcls().await.unwrap(), 4);
    emission.disable_emission().await.unwrap();
    armable.disarm().await.unwrap();
}
