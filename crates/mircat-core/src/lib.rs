//! `mircat-core`
//!
//! Core trait definitions and types for the MIRcat laser driver.
//!
//! This crate is independent of the vendor library. It defines what a
//! tunable mid-IR laser driver looks like to the rest of an application:
//!
//! - [`capabilities`]: async capability traits (tuning, emission, arming,
//!   sweep scans, QCL pulse parameters)
//! - [`driver`]: the [`DriverFactory`](driver::DriverFactory) contract and
//!   the [`DeviceComponents`](driver::DeviceComponents) capability bag
//! - [`error`]: [`DaqError`], the typed error used across the workspace
//! - [`units`]: wavelength / wavenumber values and conversion
//! - [`scan`]: sweep scan requests and scan status
//! - [`qcl`]: QCL pulse parameters and their safety limits

pub mod capabilities;
pub mod driver;
pub mod error;
pub mod qcl;
pub mod scan;
pub mod units;

pub use error::{AppResult, DaqError};
pub use qcl::QclParams;
pub use scan::{ScanStatus, SweepScan};
pub use units::{Wavelength, WwReading, WwUnits};
