//! Simulated filter.
//!
//! Stands in for the hardware when a session is initialized in simulation
//! mode. The simulated device remembers the last wavelength it was tuned to and
//! reports it back with a fixed offset that models the calibration error of a
//! real unit: `offset ~ Normal(0.5 nm, uncertainty_nm)`, drawn once per device.
//!
//! With `uncertainty_nm == 0` no offset is applied and readback is exact.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::error::{LltfError, Result};
use crate::session::{ConnectionKind, SessionState};

/// Mean of the simulated read-back offset, in nm.
pub const SIMULATED_OFFSET_MEAN_NM: f64 = 0.5;

/// Parameters of a simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimulationOptions {
    /// Standard deviation of the offset draw in nm. Zero disables the offset.
    pub uncertainty_nm: f64,
    /// Seed for the offset draw. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl SimulationOptions {
    /// Simulation with the given uncertainty and a random seed.
    pub fn with_uncertainty(uncertainty_nm: f64) -> Self {
        Self {
            uncertainty_nm,
            seed: None,
        }
    }
}

/// Software stand-in for a connected filter.
#[derive(Debug, Clone)]
pub struct SimulatedFilter {
    offset_nm: f64,
    last_wavelength_nm: Option<f64>,
}

impl SimulatedFilter {
    /// Create a simulated device, drawing its offset.
    pub fn new(options: SimulationOptions) -> Result<Self> {
        let sigma = options.uncertainty_nm;
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(LltfError::InvalidParameter {
                name: "uncertainty_nm",
                reason: format!("must be a finite value >= 0, got {}", sigma),
            });
        }

        let offset_nm = if sigma > 0.0 {
            let normal = Normal::new(SIMULATED_OFFSET_MEAN_NM, sigma).map_err(|e| {
                LltfError::InvalidParameter {
                    name: "uncertainty_nm",
                    reason: e.to_string(),
                }
            })?;
            let mut rng = match options.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            normal.sample(&mut rng)
        } else {
            0.0
        };

        debug!("Simulated filter offset: {:.4} nm (sigma {} nm)", offset_nm, sigma);

        Ok(Self {
            offset_nm,
            last_wavelength_nm: None,
        })
    }

    /// Fixed offset applied to every readback.
    pub fn offset_nm(&self) -> f64 {
        self.offset_nm
    }

    /// Record a tuning command.
    pub fn set_wavelength(&mut self, wavelength_nm: f64) {
        self.last_wavelength_nm = Some(wavelength_nm);
    }

    /// Simulated readback: last commanded wavelength plus the fixed offset.
    pub fn wavelength(&self) -> Result<f64> {
        self.last_wavelength_nm
            .map(|wl| wl + self.offset_nm)
            .ok_or_else(|| {
                LltfError::state(
                    "get_wavelength",
                    SessionState::Connected(ConnectionKind::Simulated),
                    "no wavelength has been set yet",
                )
            })
    }
}
