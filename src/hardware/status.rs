//! PE_Filter SDK status codes.

use std::fmt;

/// Status returned by every PE_Filter SDK call (`PE_STATUS`).
///
/// Codes follow the SDK header: 0 is success, 1-13 are documented failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeStatus {
    /// Call succeeded
    Success,
    /// Handle is not valid
    InvalidHandle,
    /// Instrument communication failure
    Failure,
    /// Configuration file missing
    MissingConfigFile,
    /// Configuration file corrupted
    InvalidConfiguration,
    /// Wavelength out of bounds
    InvalidWavelength,
    /// Harmonic filter missing
    MissingHarmonicFilter,
    /// Filter not valid
    InvalidFilter,
    /// Unknown SDK error
    Unknown,
    /// Grating not valid
    InvalidGrating,
    /// Buffer not valid
    InvalidBuffer,
    /// Buffer too small
    InvalidBufferSize,
    /// Configuration not supported
    UnsupportedConfiguration,
    /// No filter connected
    NoFilterConnected,
    /// Code not documented by the SDK
    Unrecognised(i32),
}

impl PeStatus {
    /// Map a raw `PE_STATUS` value.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::InvalidHandle,
            2 => Self::Failure,
            3 => Self::MissingConfigFile,
            4 => Self::InvalidConfiguration,
            5 => Self::InvalidWavelength,
            6 => Self::MissingHarmonicFilter,
            7 => Self::InvalidFilter,
            8 => Self::Unknown,
            9 => Self::InvalidGrating,
            10 => Self::InvalidBuffer,
            11 => Self::InvalidBufferSize,
            12 => Self::UnsupportedConfiguration,
            13 => Self::NoFilterConnected,
            other => Self::Unrecognised(other),
        }
    }

    /// Raw `PE_STATUS` value.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InvalidHandle => 1,
            Self::Failure => 2,
            Self::MissingConfigFile => 3,
            Self::InvalidConfiguration => 4,
            Self::InvalidWavelength => 5,
            Self::MissingHarmonicFilter => 6,
            Self::InvalidFilter => 7,
            Self::Unknown => 8,
            Self::InvalidGrating => 9,
            Self::InvalidBuffer => 10,
            Self::InvalidBufferSize => 11,
            Self::UnsupportedConfiguration => 12,
            Self::NoFilterConnected => 13,
            Self::Unrecognised(code) => code,
        }
    }

    /// Human-readable description, without the numeric code.
    pub fn description(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InvalidHandle => "invalid handle",
            Self::Failure => "instrument communication failure",
            Self::MissingConfigFile => "configuration file missing",
            Self::InvalidConfiguration => "configuration file corrupted",
            Self::InvalidWavelength => "wavelength out of bounds",
            Self::MissingHarmonicFilter => "harmonic filter missing",
            Self::InvalidFilter => "invalid filter",
            Self::Unknown => "unknown error",
            Self::InvalidGrating => "invalid grating specified",
            Self::InvalidBuffer => "invalid buffer",
            Self::InvalidBufferSize => "invalid buffer size",
            Self::UnsupportedConfiguration => "unsupported configuration",
            Self::NoFilterConnected => "no filter connected",
            Self::Unrecognised(_) => "unrecognised status",
        }
    }
}

impl fmt::Display for PeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
