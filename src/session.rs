//! Device sessions.
//!
//! A [`DeviceSession`] is one logical connection to an LLTF, real or simulated.
//! It owns the device's calibration, selects a grating for every tuning request,
//! and routes commands either to the hardware collaborator or to a
//! [`SimulatedFilter`].
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --initialize(Real)------> Connected(Real) ------+
//!       |       --initialize(Simulated)-> Connected(Simulated) -+--close()--> Closed
//!       +----------------------------------close()--------------------------^
//! ```
//!
//! `Closed` is terminal. A failed real-mode `initialize` leaves the session
//! `Uninitialized` so it can be retried. `close()` is legal in every state and
//! idempotent.
//!
//! Sessions are single-owner and synchronous. They are `Send`, so a caller that
//! needs concurrency can move a session onto its own thread, but one session
//! must never be shared between callers.
//!
//! # Example
//!
//! ```no_run
//! use lltf::config::CalibrationSource;
//! use lltf::session::{ConnectionMode, DeviceSession};
//! use lltf::simulation::SimulationOptions;
//!
//! fn main() -> lltf::Result<()> {
//!     let mut session = DeviceSession::new(&CalibrationSource::default())?;
//!     let mut active = session.initialize_scoped(ConnectionMode::Simulated(
//!         SimulationOptions::with_uncertainty(0.1),
//!     ))?;
//!
//!     let selection = active.set_wavelength(600.0, None)?;
//!     println!("grating {} -> {:.3} nm", selection.grating, active.get_wavelength()?);
//!     Ok(())
//! } // device closed here
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::{debug, info, warn};

use crate::config::calibration::{self, CalibrationSource, DeviceConfiguration, GratingSpec};
use crate::error::{LltfError, Result};
use crate::grating::{self, Selection};
use crate::hardware::{DriverFault, FilterDriver, FilterHandle, PeFilterDriver};
use crate::simulation::{SimulatedFilter, SimulationOptions};

/// How a connected session reaches the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    /// Through the hardware collaborator
    Real,
    /// Through the simulation engine
    Simulated,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, not yet connected
    Uninitialized,
    /// Connected to a real or simulated device
    Connected(ConnectionKind),
    /// Closed; terminal
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Connected(ConnectionKind::Real) => write!(f, "connected"),
            Self::Connected(ConnectionKind::Simulated) => write!(f, "connected (simulated)"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Requested connection for [`DeviceSession::initialize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionMode {
    /// Open the physical device
    Real,
    /// Simulate the device
    Simulated(SimulationOptions),
}

enum Backend {
    Hardware(Box<dyn FilterHandle>),
    Simulated(SimulatedFilter),
}

/// One logical connection to a tunable filter.
pub struct DeviceSession {
    configuration: DeviceConfiguration,
    driver: Box<dyn FilterDriver>,
    state: SessionState,
    backend: Option<Backend>,
    active_grating: Option<usize>,
    last_wavelength_set: Option<f64>,
    simulated_offset_nm: f64,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("source", &self.configuration.source_id())
            .field("state", &self.state)
            .field("active_grating", &self.active_grating)
            .field("last_wavelength_set", &self.last_wavelength_set)
            .field("simulated_offset_nm", &self.simulated_offset_nm)
            .finish()
    }
}

impl DeviceSession {
    /// Create a session, loading its calibration from `source`.
    ///
    /// Grating ranges are available immediately; the device is not touched
    /// until [`initialize`](Self::initialize).
    pub fn new(source: &CalibrationSource) -> Result<Self> {
        Ok(Self::from_configuration(calibration::load(source)?))
    }

    /// Create a session around an already loaded configuration.
    pub fn from_configuration(configuration: DeviceConfiguration) -> Self {
        Self {
            configuration,
            driver: Box::new(PeFilterDriver::new()),
            state: SessionState::Uninitialized,
            backend: None,
            active_grating: None,
            last_wavelength_set: None,
            simulated_offset_nm: 0.0,
        }
    }

    /// Replace the hardware collaborator used for real-mode connections.
    pub fn with_driver(mut self, driver: Box<dyn FilterDriver>) -> Self {
        self.driver = driver;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Calibration this session was created with.
    pub fn configuration(&self) -> &DeviceConfiguration {
        &self.configuration
    }

    /// Grating used by the last successful `set_wavelength`.
    pub fn active_grating(&self) -> Option<usize> {
        self.active_grating
    }

    /// Wavelength of the last successful `set_wavelength`.
    pub fn last_wavelength_set(&self) -> Option<f64> {
        self.last_wavelength_set
    }

    /// Fixed read-back offset of a simulated device; 0 otherwise.
    pub fn simulated_offset_nm(&self) -> f64 {
        self.simulated_offset_nm
    }

    /// Connect to the device.
    ///
    /// Only legal while `Uninitialized`. A real-mode failure returns
    /// [`LltfError::DeviceConnection`] and leaves the session uninitialized.
    pub fn initialize(&mut self, mode: ConnectionMode) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            let reason = match self.state {
                SessionState::Closed => "session is closed; create a new session",
                _ => "session is already initialized",
            };
            return Err(LltfError::state("initialize", self.state, reason));
        }

        match mode {
            ConnectionMode::Real => {
                let handle = self.connect_hardware()?;
                self.backend = Some(Backend::Hardware(handle));
                self.state = SessionState::Connected(ConnectionKind::Real);
                info!(
                    "Connected to filter {} ({} gratings)",
                    self.configuration.system_name().unwrap_or("<unnamed>"),
                    self.configuration.grating_count()
                );
            }
            ConnectionMode::Simulated(options) => {
                let simulated = SimulatedFilter::new(options)?;
                self.simulated_offset_nm = simulated.offset_nm();
                self.backend = Some(Backend::Simulated(simulated));
                self.state = SessionState::Connected(ConnectionKind::Simulated);
                info!(
                    "Initialized in simulation mode (uncertainty {} nm)",
                    options.uncertainty_nm
                );
            }
        }

        Ok(())
    }

    /// Initialize and return a guard that closes the session when dropped.
    ///
    /// The guard closes the session on every exit path, including early returns
    /// with `?` and unwinding.
    pub fn initialize_scoped(&mut self, mode: ConnectionMode) -> Result<ActiveSession<'_>> {
        self.initialize(mode)?;
        Ok(ActiveSession { session: self })
    }

    fn connect_hardware(&mut self) -> Result<Box<dyn FilterHandle>> {
        let source_id = self.configuration.source_id().to_string();
        let path = self.configuration.path().ok_or_else(|| {
            LltfError::DeviceConnection(format!(
                "Calibration '{}' was not loaded from a file; the filter library needs a calibration path",
                source_id
            ))
        })?;

        debug!("Opening filter from calibration {}", path.display());
        self.driver
            .connect(path, self.configuration.system_name())
            .map_err(|fault| {
                LltfError::DeviceConnection(format!(
                    "Failed to open filter from '{}': {}",
                    source_id, fault
                ))
            })
    }

    /// Tune to `wavelength_nm`.
    ///
    /// With `grating = None` the grating is chosen automatically. The returned
    /// [`Selection`] reports which grating was used and whether the wavelength is
    /// only within its extended (reduced-confidence) range.
    pub fn set_wavelength(&mut self, wavelength_nm: f64, grating: Option<usize>) -> Result<Selection> {
        const OP: &str = "set_wavelength";
        if self.backend.is_none() {
            return Err(self.not_connected(OP));
        }

        let selection = grating::select(&self.configuration, wavelength_nm, grating)?;

        match self.backend.as_mut() {
            Some(Backend::Hardware(handle)) => {
                handle
                    .set_wavelength_on_grating(selection.grating, wavelength_nm)
                    .map_err(|fault| {
                        command_error(
                            OP,
                            fault,
                            format!("grating {}, {} nm", selection.grating, wavelength_nm),
                        )
                    })?;
                info!(
                    "Set wavelength to {} nm on grating {}",
                    wavelength_nm, selection.grating
                );
            }
            Some(Backend::Simulated(simulated)) => {
                simulated.set_wavelength(wavelength_nm);
                info!(
                    "Set wavelength to {} nm on grating {} (simulation)",
                    wavelength_nm, selection.grating
                );
            }
            None => return Err(self.not_connected(OP)),
        }

        self.active_grating = Some(selection.grating);
        self.last_wavelength_set = Some(wavelength_nm);
        Ok(selection)
    }

    /// Read the current wavelength in nm.
    ///
    /// A simulated device returns the last commanded wavelength plus its fixed
    /// offset, and fails with [`LltfError::State`] if nothing was set yet.
    pub fn get_wavelength(&mut self) -> Result<f64> {
        const OP: &str = "get_wavelength";
        match self.backend.as_mut() {
            Some(Backend::Hardware(handle)) => handle
                .wavelength()
                .map_err(|fault| command_error(OP, fault, "query")),
            Some(Backend::Simulated(simulated)) => simulated.wavelength(),
            None => Err(self.not_connected(OP)),
        }
    }

    /// Wavelength ranges of every grating, in index order.
    pub fn get_grating_ranges(&self) -> &[GratingSpec] {
        self.configuration.gratings()
    }

    /// Number of filter systems visible to the hardware library.
    ///
    /// Always 0 for a simulated session.
    pub fn get_connected_device_count(&mut self) -> Result<u32> {
        const OP: &str = "get_connected_device_count";
        match self.backend.as_mut() {
            Some(Backend::Hardware(handle)) => handle
                .system_count()
                .map_err(|fault| command_error(OP, fault, "query")),
            Some(Backend::Simulated(_)) => Ok(0),
            None => Err(self.not_connected(OP)),
        }
    }

    /// Release the device and move to `Closed`.
    ///
    /// Never fails. A hardware error while closing is logged and cleanup continues.
    pub fn close(&mut self) {
        match self.backend.take() {
            Some(Backend::Hardware(handle)) => {
                if let Err(fault) = handle.close() {
                    warn!("Error while closing filter (ignored): {}", fault);
                }
                info!("Closed filter connection");
            }
            Some(Backend::Simulated(_)) => info!("Closed simulated filter"),
            None => {}
        }
        self.state = SessionState::Closed;
    }

    fn not_connected(&self, operation: &'static str) -> LltfError {
        let reason = match self.state {
            SessionState::Uninitialized => "device not initialized; call initialize() first",
            SessionState::Closed => "session is closed",
            SessionState::Connected(_) => "device connection is missing",
        };
        LltfError::state(operation, self.state, reason)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if self.backend.is_some() {
            self.close();
        }
    }
}

fn command_error(operation: &'static str, fault: DriverFault, context: impl fmt::Display) -> LltfError {
    LltfError::DeviceCommand {
        operation,
        message: format!("{} ({})", fault, context),
    }
}

/// An initialized session that is closed when dropped.
///
/// Returned by [`DeviceSession::initialize_scoped`]. Derefs to the session, which
/// stays owned by the caller and is `Closed` once the guard goes out of scope.
#[derive(Debug)]
pub struct ActiveSession<'a> {
    session: &'a mut DeviceSession,
}

impl Deref for ActiveSession<'_> {
    type Target = DeviceSession;

    fn deref(&self) -> &DeviceSession {
        self.session
    }
}

impl DerefMut for ActiveSession<'_> {
    fn deref_mut(&mut self) -> &mut DeviceSession {
        self.session
    }
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        self.session.close();
    }
}
