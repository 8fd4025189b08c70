//! Hardware collaborator seam.
//!
//! A [`DeviceSession`](crate::session::DeviceSession) never talks to the vendor
//! library directly. It goes through two traits:
//!
//! - [`FilterDriver`] acquires the device and hands back a [`FilterHandle`].
//! - [`FilterHandle`] is the exclusively-owned open connection.
//!
//! Implementations:
//!
//! - [`PeFilterDriver`]: the PE_Filter SDK over FFI (`pe_filter_hardware` feature)
//! - [`MockFilterDriver`]: scriptable in-memory driver for tests
//!
//! Failures are reported as [`DriverFault`] and translated by the session.

pub mod mock;
pub mod pe_filter;
pub mod status;

use std::path::Path;

use thiserror::Error;

pub use mock::MockFilterDriver;
pub use pe_filter::PeFilterDriver;
pub use status::PeStatus;

/// Failure reported by a hardware collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverFault {
    /// An SDK call returned a non-success status.
    #[error("{call}: {status}")]
    Status {
        /// SDK entry point that failed
        call: &'static str,
        /// Status it returned
        status: PeStatus,
    },

    /// The collaborator cannot be used in this build or environment.
    #[error("{0}")]
    Unavailable(String),

    /// An argument could not be passed to the SDK.
    #[error("{0}")]
    InvalidArgument(String),
}

impl DriverFault {
    pub(crate) fn check(call: &'static str, code: i32) -> Result<(), DriverFault> {
        match PeStatus::from_code(code) {
            PeStatus::Success => Ok(()),
            status => Err(DriverFault::Status { call, status }),
        }
    }
}

/// Acquires a filter device.
pub trait FilterDriver: Send {
    /// Open the device described by `calibration_path`.
    ///
    /// `system_name` selects the filter system inside the calibration; when
    /// `None` the library's default system is used.
    fn connect(
        &mut self,
        calibration_path: &Path,
        system_name: Option<&str>,
    ) -> Result<Box<dyn FilterHandle>, DriverFault>;
}

/// An open connection to a filter device.
pub trait FilterHandle: Send {
    /// Tune to `wavelength_nm` using grating `grating`.
    fn set_wavelength_on_grating(
        &mut self,
        grating: usize,
        wavelength_nm: f64,
    ) -> Result<(), DriverFault>;

    /// Current central wavelength in nm.
    fn wavelength(&mut self) -> Result<f64, DriverFault>;

    /// Number of filter systems the library can see.
    fn system_count(&mut self) -> Result<u32, DriverFault>;

    /// Release the connection.
    fn close(self: Box<Self>) -> Result<(), DriverFault>;
}
