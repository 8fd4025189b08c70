//! Configuration for LLTF sessions.
//!
//! Two kinds of configuration live here:
//!
//! - [`calibration`]: the vendor XML document describing the device's gratings.
//! - [`settings`]: application settings (log level, where to find calibration,
//!   simulation defaults) loaded with Figment from `lltf.toml` and `LLTF_`
//!   environment variables.

pub mod calibration;
pub mod settings;

pub use calibration::{
    discover_calibration, load, CalibrationSource, DeviceConfiguration, GratingSpec,
    WavelengthRange, DEFAULT_CALIBRATION_DIR,
};
pub use settings::{Settings, SettingsError};
