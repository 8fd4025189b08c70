//! Mock Hardware Implementation
//!
//! Provides an in-memory filter driver for exercising real-mode session paths
//! without the vendor SDK.
//!
//! `MockFilterDriver` is cheaply cloneable; all clones and every handle it
//! opens share one state, so a test can keep a clone, hand another to the
//! session, and inspect what the session did afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! let driver = MockFilterDriver::new().with_system_count(1);
//! let probe = driver.clone();
//! let mut session = DeviceSession::from_configuration(config).with_driver(Box::new(driver));
//! session.initialize(ConnectionMode::Real)?;
//! session.set_wavelength(600.0, None)?;
//! assert_eq!(probe.commands(), vec![(0, 600.0)]);
//! ```

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{DriverFault, FilterDriver, FilterHandle, PeStatus};

/// Wavelength reported before any tuning command, in nm.
pub const MOCK_INITIAL_WAVELENGTH_NM: f64 = 550.0;

#[derive(Debug)]
struct MockState {
    connect_status: PeStatus,
    command_status: PeStatus,
    query_status: PeStatus,
    close_status: PeStatus,
    system_count: u32,
    wavelength_nm: f64,
    open_handles: u32,
    connects: u32,
    closes: u32,
    commands: Vec<(usize, f64)>,
    calibration_path: Option<PathBuf>,
    system_name: Option<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            connect_status: PeStatus::Success,
            command_status: PeStatus::Success,
            query_status: PeStatus::Success,
            close_status: PeStatus::Success,
            system_count: 1,
            wavelength_nm: MOCK_INITIAL_WAVELENGTH_NM,
            open_handles: 0,
            connects: 0,
            closes: 0,
            commands: Vec::new(),
            calibration_path: None,
            system_name: None,
        }
    }
}

/// Scriptable stand-in for the PE_Filter SDK.
#[derive(Debug, Clone, Default)]
pub struct MockFilterDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockFilterDriver {
    /// Mock that succeeds at everything and reports one system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `connect` fail with `status`.
    pub fn fail_connect(self, status: PeStatus) -> Self {
        self.state.lock().connect_status = status;
        self
    }

    /// Make tuning commands fail with `status`.
    pub fn fail_commands(self, status: PeStatus) -> Self {
        self.state.lock().command_status = status;
        self
    }

    /// Make wavelength and system-count queries fail with `status`.
    pub fn fail_queries(self, status: PeStatus) -> Self {
        self.state.lock().query_status = status;
        self
    }

    /// Make `close` fail with `status`.
    pub fn fail_close(self, status: PeStatus) -> Self {
        self.state.lock().close_status = status;
        self
    }

    /// Number of systems reported by `system_count`.
    pub fn with_system_count(self, count: u32) -> Self {
        self.state.lock().system_count = count;
        self
    }

    /// Restore success for every call.
    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.connect_status = PeStatus::Success;
        state.command_status = PeStatus::Success;
        state.query_status = PeStatus::Success;
        state.close_status = PeStatus::Success;
    }

    /// Tuning commands received, in order.
    pub fn commands(&self) -> Vec<(usize, f64)> {
        self.state.lock().commands.clone()
    }

    /// Successful connections so far.
    pub fn connect_count(&self) -> u32 {
        self.state.lock().connects
    }

    /// Close calls received so far.
    pub fn close_count(&self) -> u32 {
        self.state.lock().closes
    }

    /// Handles currently open.
    pub fn open_handles(&self) -> u32 {
        self.state.lock().open_handles
    }

    /// Calibration path and system name of the last connection.
    pub fn last_connection(&self) -> (Option<PathBuf>, Option<String>) {
        let state = self.state.lock();
        (state.calibration_path.clone(), state.system_name.clone())
    }
}

impl FilterDriver for MockFilterDriver {
    fn connect(
        &mut self,
        calibration_path: &Path,
        system_name: Option<&str>,
    ) -> Result<Box<dyn FilterHandle>, DriverFault> {
        let mut state = self.state.lock();
        DriverFault::check("PE_Create", state.connect_status.code())?;

        state.connects += 1;
        state.open_handles += 1;
        state.calibration_path = Some(calibration_path.to_path_buf());
        state.system_name = system_name.map(str::to_string);

        Ok(Box::new(MockFilterHandle {
            state: Arc::clone(&self.state),
            open: true,
        }))
    }
}

struct MockFilterHandle {
    state: Arc<Mutex<MockState>>,
    open: bool,
}

impl MockFilterHandle {
    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.state.lock().open_handles -= 1;
        }
    }
}

impl FilterHandle for MockFilterHandle {
    fn set_wavelength_on_grating(
        &mut self,
        grating: usize,
        wavelength_nm: f64,
    ) -> Result<(), DriverFault> {
        let mut state = self.state.lock();
        DriverFault::check("PE_SetWavelengthOnGrating", state.command_status.code())?;
        state.commands.push((grating, wavelength_nm));
        state.wavelength_nm = wavelength_nm;
        Ok(())
    }

    fn wavelength(&mut self) -> Result<f64, DriverFault> {
        let state = self.state.lock();
        DriverFault::check("PE_GetWavelength", state.query_status.code())?;
        Ok(state.wavelength_nm)
    }

    fn system_count(&mut self) -> Result<u32, DriverFault> {
        let state = self.state.lock();
        DriverFault::check("PE_GetSystemCount", state.query_status.code())?;
        Ok(state.system_count)
    }

    fn close(mut self: Box<Self>) -> Result<(), DriverFault> {
        let status = {
            let mut state = self.state.lock();
            state.closes += 1;
            state.close_status
        };
        // Released even when the close status is a failure, like PE_Destroy
        self.release();
        DriverFault::check("PE_Close", status.code())
    }
}

impl Drop for MockFilterHandle {
    fn drop(&mut self) {
        self.release();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_commands() {
        let mut driver = MockFilterDriver::new();
        let mut handle = driver.connect(Path::new("cal.xml"), Some("SYS")).unwrap();

        assert_eq!(handle.wavelength().unwrap(), MOCK_INITIAL_WAVELENGTH_NM);
        handle.set_wavelength_on_grating(1, 720.0).unwrap();
        assert_eq!(handle.wavelength().unwrap(), 720.0);
        assert_eq!(driver.commands(), vec![(1, 720.0)]);
        assert_eq!(
            driver.last_connection(),
            (Some(PathBuf::from("cal.xml")), Some("SYS".to_string()))
        );

        handle.close().unwrap();
        assert_eq!(driver.open_handles(), 0);
        assert_eq!(driver.close_count(), 1);
    }

    #[test]
    fn test_mock_faults() {
        let mut driver = MockFilterDriver::new().fail_connect(PeStatus::NoFilterConnected);
        let err = driver.connect(Path::new("cal.xml"), None).err().unwrap();
        assert_eq!(
            err,
            DriverFault::Status {
                call: "PE_Create",
                status: PeStatus::NoFilterConnected
            }
        );
        assert_eq!(driver.connect_count(), 0);

        driver.clear_faults();
        let driver = driver.fail_commands(PeStatus::InvalidWavelength);
        let mut probe = driver.clone();
        let mut handle = probe.connect(Path::new("cal.xml"), None).unwrap();
        assert!(handle.set_wavelength_on_grating(0, 600.0).is_err());
        assert!(driver.commands().is_empty());
    }

    #[test]
    fn test_dropped_handle_is_released() {
        let mut driver = MockFilterDriver::new();
        let handle = driver.connect(Path::new("cal.xml"), None).unwrap();
        assert_eq!(driver.open_handles(), 1);
        drop(handle);
        assert_eq!(driver.open_handles(), 0);
    }
}
