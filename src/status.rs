//! Cached laser status and its text rendering.

use mircat_core::scan::ScanStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the key column in rendered tables.
pub const KEY_WIDTH: usize = 30;

/// Placeholder for values not read from the laser yet.
pub const UNKNOWN: &str = "?";

/// Last values read from the laser.
///
/// Everything except `connected` is `None` until a connected driver has
/// read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserStatus {
    pub connected: bool,
    pub num_qcls: Option<u8>,
    pub interlock_set: Option<bool>,
    pub key_switch_set: Option<bool>,
    pub emitting: Option<bool>,
    pub armed: Option<bool>,
    pub tuned: Option<bool>,
    pub wavelength_um: Option<f64>,
    pub wavenumber_cm1: Option<f64>,
}

fn show<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string())
}

impl LaserStatus {
    /// Key/value rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("connected", self.connected.to_string()),
            ("num_qcls", show(self.num_qcls)),
            ("interlock_set", show(self.interlock_set)),
            ("key_switch_set", show(self.key_switch_set)),
            ("emitting", show(self.emitting)),
            ("armed", show(self.armed)),
            ("tuned", show(self.tuned)),
            ("wavelength_um", show(self.wavelength_um)),
            ("wavenumber_cm1", show(self.wavenumber_cm1)),
        ]
    }
}

impl fmt::Display for LaserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_rows(&self.rows()))
    }
}

/// Key/value rows for a scan status, in display order.
pub fn scan_rows(status: &ScanStatus) -> Vec<(&'static str, String)> {
    vec![
        ("scan_in_progress", status.in_progress.to_string()),
        ("scan_active", status.active.to_string()),
        ("scan_paused", status.paused.to_string()),
        ("current_repetition", status.current_repetition.to_string()),
        ("current_percent", status.current_percent.to_string()),
        ("current_ww", format!("{} {}", status.current_ww, status.units)),
        ("tec_in_progress", status.tec_in_progress.to_string()),
        ("motion_in_progress", status.motion_in_progress.to_string()),
        ("wavelength_um", status.reading.wavelength_um.to_string()),
        ("wavenumber_cm1", status.reading.wavenumber_cm1.to_string()),
    ]
}

/// Render a scan status as an aligned table.
pub fn render_scan_status(status: &ScanStatus) -> String {
    render_rows(&scan_rows(status))
}

/// Render rows as `key<padding> value` lines.
pub fn render_rows(rows: &[(&str, String)]) -> String {
    rows.iter()
        .map(|(key, value)| format!("{key:<width$} {value}\n", width = KEY_WIDTH))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mircat_core::units::{Wavelength, WwUnits};

    #[test]
    fn unknown_fields_render_as_question_mark() {
        let status = LaserStatus::default();
        let text = status.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], format!("{:<30} false", "connected"));
        assert!(lines[1..].iter().all(|l| l.ends_with(" ?")));
    }

    #[test]
    fn known_fields_render_values() {
        let status = LaserStatus {
            connected: true,
            num_qcls: Some(4),
            armed: Some(true),
            wavelength_um: Some(7.0),
            ..Default::default()
        };
        let text = status.to_string();
        assert!(text.contains(&format!("{:<30} 4", "num_qcls")));
        assert!(text.contains(&format!("{:<30} true", "armed")));
        assert!(text.contains(&format!("{:<30} 7", "wavelength_um")));
        assert!(text.contains(&format!("{:<30} ?", "tuned")));
    }

    #[test]
    fn scan_table_has_both_units() {
        let value = Wavelength::wavenumbers(1400.0);
        let status = ScanStatus {
            in_progress: true,
            active: true,
            paused: false,
            current_repetition: 1,
            current_percent: 50,
            current_ww: value.value,
            units: WwUnits::Wavenumbers,
            tec_in_progress: false,
            motion_in_progress: true,
            reading: value.reading(),
        };
        let text = render_scan_status(&status);
        assert!(text.contains(&format!("{:<30} 1400 cm-1", "current_ww")));
        assert!(text.contains(&format!("{:<30} 1400", "wavenumber_cm1")));
        assert_eq!(text.lines().count(), 10);
    }

    #[test]
    fn status_serializes_unknown_as_null() {
        let json = serde_json::to_value(LaserStatus::default()).unwrap();
        assert_eq!(json["connected"], false);
        assert!(json["num_qcls"].is_null());
    }
}
