//! Raw FFI declarations for the PE_Filter SDK (`PE_Filter_SDK.dll`).
//!
//! Only the entry points used by the `lltf` crate are declared. The function
//! block is compiled only with the `pe-filter-sdk` feature, which also makes
//! `build.rs` emit the link directives. Status values are interpreted by the
//! `lltf` crate's `PeStatus`.

#![allow(non_camel_case_types)]

use std::os::raw::{c_int, c_void};
#[cfg(feature = "pe-filter-sdk")]
use std::os::raw::{c_char, c_double};

/// Opaque library handle created by `PE_Create`.
pub type PE_HANDLE = *mut c_void;

/// Status code returned by every SDK call.
pub type PE_STATUS = c_int;

#[cfg(feature = "pe-filter-sdk")]
extern "C" {
    /// Create a library handle from a calibration (XML) file.
    pub fn PE_Create(conffile: *const c_char, handle: *mut PE_HANDLE) -> PE_STATUS;

    /// Destroy a handle created with `PE_Create`.
    pub fn PE_Destroy(handle: PE_HANDLE) -> PE_STATUS;

    /// Open the filter system with the given name.
    pub fn PE_Open(handle: PE_HANDLE, name: *const c_char) -> PE_STATUS;

    /// Close the currently opened filter system.
    pub fn PE_Close(handle: PE_HANDLE) -> PE_STATUS;

    /// Number of filter systems described by the calibration file.
    pub fn PE_GetSystemCount(handle: PE_HANDLE) -> c_int;

    /// Read the current central wavelength in nanometres.
    pub fn PE_GetWavelength(handle: PE_HANDLE, wavelength: *mut c_double) -> PE_STATUS;

    /// Tune to a wavelength using an explicit grating.
    pub fn PE_SetWavelengthOnGrating(
        handle: PE_HANDLE,
        grating: c_int,
        wavelength: c_double,
    ) -> PE_STATUS;
}
