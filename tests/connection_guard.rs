//! Connection guard tests
//!
//! Every laser operation must fail with `NotConnected` while the driver is
//! disconnected, and must not reach the SDK.

use mircat::mock::MockSdk;
use mircat::{DriverSettings, MircatDriver};
use mircat_core::error::DaqError;
use mircat_core::qcl::QclParams;
use mircat_core::scan::SweepScan;
use mircat_core::units::{Wavelength, WwUnits};
use std::sync::Arc;
use std::time::Duration;

fn fast() -> DriverSettings {
    DriverSettings {
        preferred_qcl: 1,
        connect_settle: Duration::ZERO,
        poll_interval: Duration::from_millis(1),
        wait_timeout: Duration::from_millis(200),
    }
}

macro_rules! assert_not_connected {
    ($call:expr) => {
        match $call {
            Err(DaqError::NotConnected) => {}
            other => panic!("{} returned {:?}", stringify!($call), other),
        }
    };
}

async fn assert_all_guarded(driver: &MircatDriver) {
    assert_not_connected!(driver.disconnect().await);
    assert_not_connected!(driver.num_qcls().await);
    assert_not_connected!(driver.interlock_status().await);
    assert_not_connected!(driver.key_switch_status().await);
    assert_not_connected!(driver.arm_laser().await);
    assert_not_connected!(driver.disarm_laser().await);
    assert_not_connected!(driver.is_armed().await);
    assert_not_connected!(driver.tune("wl", 7.0).await);
    assert_not_connected!(driver.tune("bogus", 7.0).await);
    assert_not_connected!(driver.tune_to(Wavelength::wavenumbers(1400.0)).await);
    assert_not_connected!(driver.is_tuned().await);
    assert_not_connected!(driver.get_ww().await);
    assert_not_connected!(driver.enable_emission().await);
    assert_not_connected!(driver.disable_emission().await);
    assert_not_connected!(driver.check_laser_emission().await);
    assert_not_connected!(driver.qcl_pulse_rate(1).await);
    assert_not_connected!(driver.qcl_pulse_width(1).await);
    assert_not_connected!(driver.qcl_current(1).await);
    assert_not_connected!(driver.qcl_params(1).await);
    assert_not_connected!(driver.qcl_params_all().await);
    assert_not_connected!(
        driver
            .set_qcl_params(QclParams::new(9, 1.0, 1.0, 1.0))
            .await
    );
    assert_not_connected!(
        driver
            .start_sweep_scan(SweepScan::new(WwUnits::Wavenumbers, 1350.0, 1450.0, 10.0))
            .await
    );
    assert_not_connected!(driver.stop_scan().await);
    assert_not_connected!(driver.pause_scan().await);
    assert_not_connected!(driver.resume_scan().await);
    assert_not_connected!(driver.scan_status().await);
    assert_not_connected!(driver.display_scan_status().await);
}

#[tokio::test]
async fn test_operations_before_connect_make_no_sdk_calls() {
    let sdk = Arc::new(MockSdk::new());
    let driver = MircatDriver::new_async(sdk.clone(), fast()).await.unwrap();
    sdk.clear_log();

    assert_all_guarded(&driver).await;
    assert!(sdk.call_log().is_empty(), "SDK called: {:?}", sdk.call_log());
}

#[tokio::test]
async fn test_operations_after_disconnect_make_no_sdk_calls() {
    let sdk = Arc::new(MockSdk::new());
    let driver = MircatDriver::new_async(sdk.clone(), fast()).await.unwrap();
    assert!(driver.connect().await.unwrap());
    assert!(!driver.disconnect().await.unwrap());
    sdk.clear_log();

    assert_all_guarded(&driver).await;
    assert!(sdk.call_log().is_empty(), "SDK called: {:?}", sdk.call_log());
}

#[tokio::test]
async fn test_status_before_connect_is_unknown() {
    let sdk = Arc::new(MockSdk::new());
    let driver = MircatDriver::new_async(sdk.clone(), fast()).await.unwrap();
    sdk.clear_log();

    let status = driver.status().await.unwrap();
    assert!(!status.connected);
    assert_eq!(status.num_qcls, None);
    assert_eq!(status.armed, None);
    assert!(status.to_string().contains(&format!("{:<30} ?", "wavelength_um")));
    driver.display_status().await.unwrap();

    assert!(sdk.call_log().is_empty());
}

#[tokio::test]
async fn test_version_does_not_need_connection() {
    let sdk = Arc::new(MockSdk::new());
    let driver = MircatDriver::new_async(sdk, fast()).await.unwrap();
    assert_eq!(driver.api_version().to_string(), "2.5.0");
    assert!(!driver.is_connected());
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let sdk = Arc::new(MockSdk::new());
    let driver = MircatDriver::new_async(sdk.clone(), fast()).await.unwrap();
    driver.connect().await.unwrap();
    driver.disconnect().await.unwrap();
    driver.connect().await.unwrap();
    assert_eq!(driver.num_qcls().await.unwrap(), 4);
}
