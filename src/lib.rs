//! Control library for laser line tunable filters (LLTF).
//!
//! An LLTF passes a narrow band of light centred on a commanded wavelength. It
//! reaches that wavelength through one of several diffraction gratings, each
//! covering its own band. This crate loads the device's calibration document,
//! picks the grating for every tuning request and drives either the vendor
//! library or an in-process simulation.
//!
//! - [`config`]: calibration documents and application settings
//! - [`grating`]: grating selection
//! - [`session`]: the device session and its lifecycle
//! - [`simulation`]: simulated device used when no hardware is attached
//! - [`hardware`]: the hardware collaborator seam (vendor SDK and mock)
//! - [`logging`]: tracing setup for binaries

pub mod config;
pub mod error;
pub mod grating;
pub mod hardware;
pub mod logging;
pub mod session;
pub mod simulation;

pub use config::{CalibrationSource, DeviceConfiguration, GratingSpec, WavelengthRange};
pub use error::{LltfError, Result};
pub use grating::{RangeKind, Selection};
pub use session::{ActiveSession, ConnectionKind, ConnectionMode, DeviceSession, SessionState};
pub use simulation::SimulationOptions;
