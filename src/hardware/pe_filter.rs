//! PE_Filter SDK driver.
//!
//! Wraps the vendor's C library (`PE_Filter_SDK`) through the `pe-filter-sys`
//! declarations. The library is only linked with the `pe_filter_hardware`
//! feature; without it [`PeFilterDriver::connect`] reports the collaborator as
//! unavailable.
//!
//! Lifecycle of a handle:
//!
//! ```text
//! PE_Create(calibration.xml) -> PE_Open(system) -> ... -> PE_Close -> PE_Destroy
//! ```

#![cfg_attr(feature = "pe_filter_hardware", allow(unsafe_code))]

use std::path::Path;

#[cfg(feature = "pe_filter_hardware")]
use std::ffi::CString;

#[cfg(feature = "pe_filter_hardware")]
use pe_filter_sys::*;
#[cfg(feature = "pe_filter_hardware")]
use tracing::{debug, warn};

use super::{DriverFault, FilterDriver, FilterHandle};

/// Driver for filters controlled by the PE_Filter SDK.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeFilterDriver;

impl PeFilterDriver {
    /// Create the driver. No SDK call is made until [`FilterDriver::connect`].
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(feature = "pe_filter_hardware"))]
impl FilterDriver for PeFilterDriver {
    fn connect(
        &mut self,
        _calibration_path: &Path,
        _system_name: Option<&str>,
    ) -> Result<Box<dyn FilterHandle>, DriverFault> {
        Err(DriverFault::Unavailable(
            "PE_Filter SDK support not enabled. Rebuild with --features pe_filter_hardware or use simulation mode"
                .to_string(),
        ))
    }
}

#[cfg(feature = "pe_filter_hardware")]
impl FilterDriver for PeFilterDriver {
    fn connect(
        &mut self,
        calibration_path: &Path,
        system_name: Option<&str>,
    ) -> Result<Box<dyn FilterHandle>, DriverFault> {
        let path = calibration_path.to_str().ok_or_else(|| {
            DriverFault::InvalidArgument(format!(
                "Calibration path is not valid UTF-8: {}",
                calibration_path.display()
            ))
        })?;
        let path_c = CString::new(path).map_err(|_| {
            DriverFault::InvalidArgument(format!("Calibration path contains NUL: {}", path))
        })?;

        let mut raw: PE_HANDLE = std::ptr::null_mut();
        // SAFETY: path_c outlives the call and raw is a valid out-pointer.
        DriverFault::check("PE_Create", unsafe { PE_Create(path_c.as_ptr(), &mut raw) })?;
        debug!("PE_Create succeeded for {}", path);

        // Dropping the handle on an early return destroys it
        let handle = PeFilterHandle { raw: Some(raw) };

        if let Some(name) = system_name {
            let name_c = CString::new(name).map_err(|_| {
                DriverFault::InvalidArgument(format!("System name contains NUL: {}", name))
            })?;
            // SAFETY: raw came from a successful PE_Create and has not been destroyed.
            DriverFault::check("PE_Open", unsafe { PE_Open(raw, name_c.as_ptr()) })?;
            debug!("PE_Open succeeded for system {}", name);
        }

        Ok(Box::new(handle))
    }
}

/// Open PE_Filter handle. Destroyed on close or drop.
#[cfg(feature = "pe_filter_hardware")]
struct PeFilterHandle {
    raw: Option<PE_HANDLE>,
}

// SAFETY: the SDK handle is an opaque pointer owned by exactly one session;
// it is moved between threads, never shared.
#[cfg(feature = "pe_filter_hardware")]
unsafe impl Send for PeFilterHandle {}

#[cfg(feature = "pe_filter_hardware")]
impl PeFilterHandle {
    fn raw(&self) -> Result<PE_HANDLE, DriverFault> {
        self.raw.ok_or(DriverFault::Status {
            call: "PE_HANDLE",
            status: super::PeStatus::InvalidHandle,
        })
    }

    fn destroy(&mut self) {
        if let Some(raw) = self.raw.take() {
            // SAFETY: raw is destroyed exactly once; take() clears it.
            let code = unsafe { PE_Destroy(raw) };
            if let Err(fault) = DriverFault::check("PE_Destroy", code) {
                warn!("{}", fault);
            }
        }
    }
}

#[cfg(feature = "pe_filter_hardware")]
impl FilterHandle for PeFilterHandle {
    fn set_wavelength_on_grating(
        &mut self,
        grating: usize,
        wavelength_nm: f64,
    ) -> Result<(), DriverFault> {
        let raw = self.raw()?;
        let grating = std::os::raw::c_int::try_from(grating).map_err(|_| {
            DriverFault::InvalidArgument(format!("Grating index {} out of range", grating))
        })?;
        // SAFETY: raw is a live handle owned by self.
        DriverFault::check("PE_SetWavelengthOnGrating", unsafe {
            PE_SetWavelengthOnGrating(raw, grating, wavelength_nm)
        })
    }

    fn wavelength(&mut self) -> Result<f64, DriverFault> {
        let raw = self.raw()?;
        let mut wavelength: f64 = 0.0;
        // SAFETY: raw is a live handle and wavelength is a valid out-pointer.
        DriverFault::check("PE_GetWavelength", unsafe {
            PE_GetWavelength(raw, &mut wavelength)
        })?;
        Ok(wavelength)
    }

    fn system_count(&mut self) -> Result<u32, DriverFault> {
        let raw = self.raw()?;
        // SAFETY: raw is a live handle owned by self.
        let count = unsafe { PE_GetSystemCount(raw) };
        u32::try_from(count).map_err(|_| DriverFault::Status {
            call: "PE_GetSystemCount",
            status: super::PeStatus::Unknown,
        })
    }

    fn close(mut self: Box<Self>) -> Result<(), DriverFault> {
        let result = match self.raw {
            // SAFETY: raw is a live handle owned by self.
            Some(raw) => DriverFault::check("PE_Close", unsafe { PE_Close(raw) }),
            None => Ok(()),
        };
        // Destroy even when PE_Close failed
        self.destroy();
        result
    }
}

#[cfg(feature = "pe_filter_hardware")]
impl Drop for PeFilterHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}
