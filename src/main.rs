//! CLI entry point for the MIRcat laser.
//!
//! Each invocation opens the SDK, connects, runs one command and closes the
//! connection again when the driver is dropped.
//!
//! # Usage
//!
//! ```bash
//! mircat --mock status
//! mircat tune wn 1400
//! mircat qcl set 2 50000 200 700
//! mircat scan sweep 1350 1450 --speed 10 --units wn --wait
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mircat::config::{MircatConfig, DEFAULT_CONFIG_PATH};
use mircat::status::{render_rows, render_scan_status};
use mircat::{tracing_setup, Backend, MircatDriver, MircatFactory};
use mircat_core::qcl::QclParams;
use mircat_core::scan::SweepScan;
use mircat_core::units::WwUnits;
use serde::Serialize;
use std::path::PathBuf;
use tokio::time::sleep;
use tracing::info;

#[derive(Parser)]
#[command(name = "mircat")]
#[command(about = "Control a Daylight Solutions MIRcat laser", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Use the simulated laser instead of MIRcatSDK.dll
    #[arg(long, global = true)]
    mock: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the laser status table
    Status,

    /// Show the SDK API version (does not connect)
    Version,

    /// Arm the laser
    Arm,

    /// Disarm the laser
    Disarm,

    /// Tune to a wavelength (wl, microns) or wavenumber (wn, cm-1)
    Tune {
        mode: String,
        value: f64,
    },

    /// Show the current wavelength and wavenumber
    Ww,

    /// Emission control
    Emission {
        #[command(subcommand)]
        action: EmissionAction,
    },

    /// QCL pulse parameters
    Qcl {
        #[command(subcommand)]
        command: QclCommand,
    },

    /// Sweep scans
    Scan {
        #[command(subcommand)]
        command: ScanCommand,
    },

    /// Connect, show status and tune through 7 um, 7.1 um and 1400 cm-1
    Demo,
}

#[derive(Subcommand)]
enum EmissionAction {
    On,
    Off,
    Status,
}

#[derive(Subcommand)]
enum QclCommand {
    /// Show parameters of one QCL, or all installed
    Show { qcl: Option<u8> },

    /// Set pulse rate (Hz), pulse width (ns) and current (mA)
    Set {
        qcl: u8,
        rate: f64,
        width: f64,
        current: f64,
    },
}

#[derive(Subcommand)]
enum ScanCommand {
    /// Start a sweep scan
    Sweep {
        start: f64,
        end: f64,
        /// Sweep speed in units per second
        #[arg(long)]
        speed: f64,
        /// wl (microns) or wn (cm-1)
        #[arg(long, default_value = "wn")]
        units: WwUnits,
        #[arg(long, default_value_t = 1)]
        repetitions: u16,
        #[arg(long)]
        bidirectional: bool,
        /// Poll until the scan finishes
        #[arg(long)]
        wait: bool,
    },
    Stop,
    Pause,
    Resume,
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mircat::link();

    let config = load_config(&cli)?;
    tracing_setup::init_from_config(&config).map_err(anyhow::Error::msg)?;
    info!(backend = %config.laser.backend, "mircat starting");

    let driver = MircatFactory::open_driver(&config.laser).await?;
    if !matches!(cli.command, Commands::Version) {
        driver.connect().await.context("Failed to connect to the laser")?;
    }
    run(&driver, cli.command, cli.json).await
}

fn load_config(cli: &Cli) -> Result<MircatConfig> {
    let mut config = MircatConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if cli.mock {
        config.laser.backend = Backend::Mock;
        config.laser.library_path = None;
        config.laser.sdk_dir = None;
        config.laser.connect_settle_ms = 0;
    }
    if let Some(level) = &cli.log_level {
        config.application.log_level = level.clone();
    }
    config.laser.auto_connect = false;
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

async fn run(driver: &MircatDriver, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Status => {
            let status = driver.status().await?;
            emit(json, &status, || status.to_string())
        }
        Commands::Version => {
            let version = driver.api_version();
            emit(json, &version, || format!("MIRcat SDK API {version}\n"))
        }
        Commands::Arm => {
            driver.arm_laser().await?;
            emit(json, &true, || "armed\n".to_string())
        }
        Commands::Disarm => {
            driver.disarm_laser().await?;
            emit(json, &false, || "disarmed\n".to_string())
        }
        Commands::Tune { mode, value } => {
            if !driver.is_armed().await? {
                driver.arm_laser().await?;
            }
            driver.tune(&mode, value).await?;
            show_ww(driver, json).await
        }
        Commands::Ww => show_ww(driver, json).await,
        Commands::Emission { action } => {
            match action {
                EmissionAction::On => driver.enable_emission().await?,
                EmissionAction::Off => driver.disable_emission().await?,
                EmissionAction::Status => {}
            }
            let emitting = driver.check_laser_emission().await?;
            emit(json, &emitting, || {
                render_rows(&[("emitting", emitting.to_string())])
            })
        }
        Commands::Qcl { command } => run_qcl(driver, command, json).await,
        Commands::Scan { command } => run_scan(driver, command, json).await,
        Commands::Demo => demo(driver).await,
    }
}

async fn show_ww(driver: &MircatDriver, json: bool) -> Result<()> {
    let reading = driver.get_ww().await?;
    emit(json, &reading, || {
        render_rows(&[
            ("wavelength_um", reading.wavelength_um.to_string()),
            ("wavenumber_cm1", reading.wavenumber_cm1.to_string()),
        ])
    })
}

async fn run_qcl(driver: &MircatDriver, command: QclCommand, json: bool) -> Result<()> {
    let all = match command {
        QclCommand::Show { qcl: Some(qcl) } => vec![driver.qcl_params(qcl).await?],
        QclCommand::Show { qcl: None } => driver.qcl_params_all().await?,
        QclCommand::Set {
            qcl,
            rate,
            width,
            current,
        } => {
            driver
                .set_qcl_params(QclParams::new(qcl, rate, width, current))
                .await?;
            vec![driver.qcl_params(qcl).await?]
        }
    };
    emit(json, &all, || {
        all.iter()
            .map(|p| {
                render_rows(&[
                    ("qcl", p.qcl.to_string()),
                    ("pulse_rate_hz", p.pulse_rate_hz.to_string()),
                    ("pulse_width_ns", p.pulse_width_ns.to_string()),
                    ("current_ma", p.current_ma.to_string()),
                    ("duty_cycle_pct", format!("{:.3}", p.duty_cycle())),
                ])
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

async fn run_scan(driver: &MircatDriver, command: ScanCommand, json: bool) -> Result<()> {
    match command {
        ScanCommand::Sweep {
            start,
            end,
            speed,
            units,
            repetitions,
            bidirectional,
            wait,
        } => {
            if !driver.is_armed().await? {
                driver.arm_laser().await?;
            }
            let scan = SweepScan::new(units, start, end, speed)
                .with_repetitions(repetitions)
                .with_bidirectional(bidirectional);
            driver.start_sweep_scan(scan).await?;
            if wait {
                loop {
                    let status = driver.scan_status().await?;
                    info!(
                        repetition = status.current_repetition,
                        percent = status.current_percent,
                        "Scanning"
                    );
                    if !status.in_progress {
                        break;
                    }
                    sleep(driver.settings().poll_interval).await;
                }
            }
        }
        ScanCommand::Stop => driver.stop_scan().await?,
        ScanCommand::Pause => driver.pause_scan().await?,
        ScanCommand::Resume => driver.resume_scan().await?,
        ScanCommand::Status => {}
    }
    let status = driver.scan_status().await?;
    emit(json, &status, || render_scan_status(&status))
}

async fn demo(driver: &MircatDriver) -> Result<()> {
    driver.display_status().await?;
    driver.arm_laser().await?;
    for (mode, value) in [("wl", 7.0), ("wl", 7.1), ("wn", 1400.0)] {
        println!();
        println!("tune {mode} {value}");
        driver.tune(mode, value).await?;
        driver.display_status().await?;
    }
    driver.disarm_laser().await?;
    Ok(())
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}
