//! Error types for the MIRcat driver.
//!
//! [`DaqError`] is the single typed error shared by the FFI seam, the driver
//! façade and the factory. Capability traits return `anyhow::Result`, so a
//! `DaqError` converts with `?` and can be recovered with
//! `anyhow::Error::downcast_ref::<DaqError>()`.
//!
//! ## Error Hierarchy
//!
//! - **`Sdk`**: the vendor library returned a non-zero code.
//! - **`NotConnected`**: an operation that needs a live connection was called
//!   before `connect()` or after `disconnect()`. Nothing was sent to the SDK.
//! - **`InvalidParameter`**: rejected client-side before reaching the SDK.
//! - **`Timeout`**: a wait-till-settled poll ran out of time.
//! - **`Library`**: the DLL could not be located or loaded.
//! - **`Configuration`**: configuration parsed but is semantically wrong.
//! - **`Task`**: the blocking task running an SDK call failed.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Primary error type for the MIRcat driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DaqError {
    /// Non-zero return code from a MIRcat SDK export.
    ///
    /// **Recovery Strategy**: depends on the code. Interlock, key switch and
    /// "not armed" codes need operator action; "already on/off" codes are
    /// harmless.
    #[error("MIRcat SDK error {code}: {message}")]
    Sdk { code: u32, message: String },

    /// Operation requires an initialized SDK connection.
    #[error("Operation requires connection to MIRcat laser.")]
    NotConnected,

    /// Argument rejected before any SDK call.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mircat_core::error::DaqError;
    ///
    /// fn check_rate(rate_hz: f64) -> Result<(), DaqError> {
    ///     if !(10.0..=100_000.0).contains(&rate_hz) {
    ///         return Err(DaqError::InvalidParameter(
    ///             "Pulse rate limit: 10 <= pulse rate <= 100000".into(),
    ///         ));
    ///     }
    ///     Ok(())
    /// }
    /// ```
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Hardware did not reach the awaited state in time.
    ///
    /// **Recovery Strategy**: query status; the SDK call itself succeeded, so
    /// the laser may still converge.
    #[error("Timed out after {timeout:?} while waiting for {condition} to become {target}")]
    Timeout {
        condition: &'static str,
        target: bool,
        timeout: Duration,
    },

    /// DLL could not be located, loaded or is missing exports.
    #[error("MIRcat SDK library error: {0}")]
    Library(String),

    /// Configuration validation failed.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Blocking task hosting an SDK call panicked or was cancelled.
    #[error("SDK task failed: {0}")]
    Task(String),
}

impl DaqError {
    /// Build an [`DaqError::Sdk`] from a raw return code and its message.
    ///
    /// `message` is `None` for codes the vendor does not document.
    pub fn sdk(code: u32, message: Option<&str>) -> Self {
        DaqError::Sdk {
            code,
            message: message.unwrap_or("Unknown error occurred").to_string(),
        }
    }

    /// Raw SDK return code, if this error came from the SDK.
    pub fn sdk_code(&self) -> Option<u32> {
        match self {
            DaqError::Sdk { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether retrying after a state change could succeed.
    pub fn can_recover(&self) -> bool {
        matches!(
            self,
            DaqError::Sdk { .. }
                | DaqError::NotConnected
                | DaqError::InvalidParameter(_)
                | DaqError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdk_error_uses_given_message() {
        let err = DaqError::sdk(80, Some("Wavelength out of tuning range."));
        assert_eq!(
            err.to_string(),
            "MIRcat SDK error 80: Wavelength out of tuning range."
        );
        assert_eq!(err.sdk_code(), Some(80));
    }

    #[test]
    fn sdk_error_without_message_is_unknown() {
        let err = DaqError::sdk(4242, None);
        assert_eq!(err.to_string(), "MIRcat SDK error 4242: Unknown error occurred");
    }

    #[test]
    fn timeout_message_names_condition() {
        let err = DaqError::Timeout {
            condition: "is_tuned",
            target: true,
            timeout: Duration::from_secs(30),
        };
        let msg = err.to_string();
        assert!(msg.contains("is_tuned"));
        assert!(msg.contains("true"));
        assert!(msg.contains("30s"));
    }

    #[test]
    fn library_errors_are_not_recoverable() {
        assert!(!DaqError::Library("missing".into()).can_recover());
        assert!(DaqError::NotConnected.can_recover());
        assert_eq!(DaqError::NotConnected.sdk_code(), None);
    }
}
