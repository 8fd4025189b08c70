//! Custom error types for the library.
//!
//! This module defines the primary error type, `LltfError`. Using the `thiserror`
//! crate, it gives every failure mode of a filter session a dedicated variant so
//! callers can react to the kind of failure rather than parse messages.
//!
//! ## Error Hierarchy
//!
//! - **`Configuration`**: the calibration document is absent, malformed, or holds
//!   invalid bounds. Carries the source identifier and the offending field.
//! - **`WavelengthRange`**: no grating (or not the requested one) can serve the
//!   requested wavelength. The message lists the valid bounds.
//! - **`DeviceConnection`**: acquiring the hardware failed. The session stays
//!   uninitialized and `initialize` may be retried.
//! - **`DeviceCommand`**: a hardware call failed after the connection was made.
//! - **`State`**: an operation was invoked in a session state that does not allow it.
//! - **`InvalidParameter`**: an argument was rejected before reaching the device.
//!
//! Vendor status codes never appear here; the session translates them into a
//! human-readable description first.

use thiserror::Error;

use crate::session::SessionState;

/// Convenience alias for results using the library error type.
pub type Result<T> = std::result::Result<T, LltfError>;

/// Errors surfaced by the LLTF library.
#[derive(Error, Debug)]
pub enum LltfError {
    /// Bad or missing calibration data.
    #[error("Configuration error in '{source_id}' ({field}): {reason}")]
    Configuration {
        /// Path or identifier of the calibration document.
        source_id: String,
        /// Name of the missing or invalid field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Requested wavelength/grating combination is not supported.
    #[error("Wavelength range error: {0}")]
    WavelengthRange(String),

    /// The hardware could not be acquired.
    #[error("Device connection error: {0}")]
    DeviceConnection(String),

    /// A hardware call failed after connecting.
    #[error("Device command '{operation}' failed: {message}")]
    DeviceCommand {
        /// Session operation that issued the command.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// Operation invoked in an illegal session state.
    #[error("Cannot {operation} while {state}: {reason}")]
    State {
        /// Operation that was rejected.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
        /// Why the operation is not allowed.
        reason: String,
    },

    /// An argument was rejected before reaching the device.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl LltfError {
    pub(crate) fn configuration(
        source_id: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            source_id: source_id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn state(
        operation: &'static str,
        state: SessionState,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            operation,
            state,
            reason: reason.into(),
        }
    }
}
