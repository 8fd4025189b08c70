//! `lltf` command-line tool.
//!
//! Loads settings and calibration, opens a (real or simulated) filter session
//! and runs one command against it. The session is always closed before exit.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use lltf::config::Settings;
use lltf::logging;
use lltf::session::{ConnectionMode, DeviceSession};
use lltf::Selection;

#[derive(Parser)]
#[command(
    name = "lltf",
    version,
    about = "Control a laser line tunable filter"
)]
struct Args {
    /// Settings file (defaults to lltf.toml in the working directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Calibration XML document; overrides discovery
    #[arg(long, global = true)]
    calibration: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Run without hardware
    #[arg(long, global = true)]
    simulate: bool,

    /// Simulated read-back uncertainty in nm (implies --simulate)
    #[arg(long, global = true)]
    uncertainty: Option<f64>,

    /// Seed for the simulated offset
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the wavelength ranges of every grating
    Ranges {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Tune to a single wavelength and read it back
    Tune {
        /// Target wavelength in nm
        wavelength: f64,
        /// Force a grating instead of selecting automatically
        #[arg(short, long)]
        grating: Option<usize>,
    },
    /// Step through a wavelength range, reading back at each point
    Sweep {
        /// First wavelength in nm
        start: f64,
        /// Last wavelength in nm (inclusive)
        stop: f64,
        /// Step in nm
        step: f64,
        /// Force a grating instead of selecting automatically
        #[arg(short, long)]
        grating: Option<usize>,
    },
    /// Report how many filter systems the library can see
    Devices,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = load_settings(&args)?;

    logging::init_from_settings(&settings)?;
    debug!(?settings, "Settings loaded");

    let mut session = DeviceSession::new(&settings.calibration_source())
        .context("Failed to load filter calibration")?;

    match args.command {
        Command::Ranges { json } => print_ranges(&session, json),
        Command::Tune {
            wavelength,
            grating,
        } => {
            let mut active = session
                .initialize_scoped(settings.connection_mode())
                .context("Failed to initialize filter")?;
            let selection = active.set_wavelength(wavelength, grating)?;
            let readback = active.get_wavelength()?;
            print_selection(&selection, readback);
            Ok(())
        }
        Command::Sweep {
            start,
            stop,
            step,
            grating,
        } => {
            let points = sweep_points(start, stop, step)?;
            let mut active = session
                .initialize_scoped(settings.connection_mode())
                .context("Failed to initialize filter")?;
            for wavelength in points {
                let selection = active
                    .set_wavelength(wavelength, grating)
                    .with_context(|| format!("Sweep stopped at {} nm", wavelength))?;
                let readback = active.get_wavelength()?;
                print_selection(&selection, readback);
            }
            Ok(())
        }
        Command::Devices => {
            let mode = settings.connection_mode();
            if matches!(mode, ConnectionMode::Simulated(_)) {
                warn!("Simulated sessions report no connected devices");
            }
            let mut active = session
                .initialize_scoped(mode)
                .context("Failed to initialize filter")?;
            println!("{}", active.get_connected_device_count()?);
            Ok(())
        }
    }
}

/// Merge file/environment settings with command-line overrides.
fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load().context("Failed to load settings")?,
    };

    if let Some(path) = &args.calibration {
        settings.calibration.path = Some(path.clone());
    }
    if let Some(level) = &args.log_level {
        settings.log_level = level.to_lowercase();
    }
    if args.simulate || args.uncertainty.is_some() {
        settings.simulation.enabled = true;
    }
    if let Some(uncertainty) = args.uncertainty {
        settings.simulation.uncertainty_nm = uncertainty;
    }
    if args.seed.is_some() {
        settings.simulation.seed = args.seed;
    }

    settings.validate()?;
    Ok(settings)
}

fn print_ranges(session: &DeviceSession, json: bool) -> Result<()> {
    let gratings = session.get_grating_ranges();
    if json {
        println!("{}", serde_json::to_string_pretty(gratings)?);
        return Ok(());
    }

    if let Some(name) = session.configuration().system_name() {
        println!("System {}", name);
    }
    println!("{:<8} {:<24} {:<24}", "Grating", "Regular", "Extended");
    for grating in gratings {
        println!(
            "{:<8} {:<24} {:<24}",
            grating.index,
            grating.regular_range.to_string(),
            grating.extended_range.to_string()
        );
    }
    Ok(())
}

fn print_selection(selection: &Selection, readback_nm: f64) {
    println!(
        "{:.3} nm -> grating {} ({}), read back {:.3} nm",
        selection.wavelength_nm, selection.grating, selection.range_kind, readback_nm
    );
    if let Some(advisory) = selection.advisory() {
        println!("  warning: {}", advisory);
    }
}

/// Upper bound on the number of points in one sweep.
const MAX_SWEEP_POINTS: usize = 1_000_000;

/// Wavelengths from `start` to `stop` inclusive, `step` apart.
fn sweep_points(start: f64, stop: f64, step: f64) -> Result<Vec<f64>> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
        bail!("Sweep bounds and step must be finite");
    }
    if step <= 0.0 {
        bail!("Sweep step must be positive, got {}", step);
    }
    if stop < start {
        bail!("Sweep stop {} is below start {}", stop, start);
    }

    // Index-based to avoid accumulating rounding error
    let intervals = ((stop - start) / step + 1e-9).floor();
    if !intervals.is_finite() || intervals >= MAX_SWEEP_POINTS as f64 {
        bail!(
            "Sweep from {} to {} in steps of {} exceeds {} points",
            start,
            stop,
            step,
            MAX_SWEEP_POINTS
        );
    }
    let count = (intervals as usize)
        .checked_add(1)
        .context("Sweep point count overflows")?;
    Ok((0..count).map(|i| start + step * i as f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_points_inclusive() {
        assert_eq!(
            sweep_points(500.0, 520.0, 10.0).unwrap(),
            vec![500.0, 510.0, 520.0]
        );
        assert_eq!(sweep_points(500.0, 525.0, 10.0).unwrap().len(), 3);
        assert_eq!(sweep_points(600.0, 600.0, 1.0).unwrap(), vec![600.0]);
    }

    #[test]
    fn test_sweep_points_rejects_bad_step() {
        assert!(sweep_points(500.0, 520.0, 0.0).is_err());
        assert!(sweep_points(500.0, 520.0, -1.0).is_err());
        assert!(sweep_points(520.0, 500.0, 1.0).is_err());
    }

    #[test]
    fn test_sweep_points_rejects_oversized_sweeps() {
        assert!(sweep_points(0.0, 1e300, 1e-300).is_err());
        assert!(sweep_points(0.0, 1e12, 1e-3).is_err());

        let points = sweep_points(0.0, 999_999.0, 1.0).unwrap();
        assert_eq!(points.len(), MAX_SWEEP_POINTS);
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "lltf", "tune", "600", "--grating", "1", "--simulate", "--seed", "7",
        ])
        .unwrap();
        assert!(args.simulate);
        assert_eq!(args.seed, Some(7));
        assert!(matches!(
            args.command,
            Command::Tune {
                wavelength,
                grating: Some(1)
            } if wavelength == 600.0
        ));
    }
}
