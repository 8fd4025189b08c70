//! Grating selection.
//!
//! Each grating of an LLTF covers a band of wavelengths. A wavelength inside a
//! grating's *regular* range is served with the manufacturer's accuracy
//! guarantee; inside only the *extended* range it is usable with reduced
//! confidence.
//!
//! [`find_candidate_gratings`] lists every grating that can serve a wavelength,
//! regular matches first. [`select`] narrows that to exactly one grating,
//! honouring an explicit caller choice.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::calibration::DeviceConfiguration;
use crate::error::{LltfError, Result};

/// Which of a grating's ranges matched a wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    /// Manufacturer-guaranteed band
    Regular,
    /// Wider band with reduced accuracy
    Extended,
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular => write!(f, "regular"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// Grating chosen for a wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Selection {
    /// Grating index
    pub grating: usize,
    /// Range that matched
    pub range_kind: RangeKind,
    /// Requested wavelength
    pub wavelength_nm: f64,
}

impl Selection {
    /// True when the wavelength is only inside the extended range.
    pub fn is_reduced_confidence(&self) -> bool {
        self.range_kind == RangeKind::Extended
    }

    /// Human-readable advisory for reduced-confidence selections.
    pub fn advisory(&self) -> Option<String> {
        self.is_reduced_confidence().then(|| {
            format!(
                "Wavelength {} nm is in the extended range of grating {}; accuracy is not guaranteed",
                self.wavelength_nm, self.grating
            )
        })
    }
}

/// All gratings able to serve `wavelength_nm`, in index order.
///
/// Regular-range matches are returned if there are any; extended-range matches
/// are only considered when no grating matches on its regular range. An empty
/// result means the wavelength is outside every extended range.
pub fn find_candidate_gratings(
    configuration: &DeviceConfiguration,
    wavelength_nm: f64,
) -> Vec<(usize, RangeKind)> {
    let regular: Vec<_> = configuration
        .gratings()
        .iter()
        .filter(|g| g.regular_range.contains(wavelength_nm))
        .map(|g| (g.index, RangeKind::Regular))
        .collect();

    if !regular.is_empty() {
        return regular;
    }

    configuration
        .gratings()
        .iter()
        .filter(|g| g.extended_range.contains(wavelength_nm))
        .map(|g| (g.index, RangeKind::Extended))
        .collect()
}

/// Choose exactly one grating for `wavelength_nm`.
///
/// With `requested_grating`, that grating is validated and used. Without it,
/// the lowest-index candidate from [`find_candidate_gratings`] wins.
/// Extended-range selections succeed but are logged at warn level and flagged
/// on the returned [`Selection`].
pub fn select(
    configuration: &DeviceConfiguration,
    wavelength_nm: f64,
    requested_grating: Option<usize>,
) -> Result<Selection> {
    let selection = match requested_grating {
        Some(index) => select_requested(configuration, wavelength_nm, index)?,
        None => select_automatic(configuration, wavelength_nm)?,
    };

    if let Some(advisory) = selection.advisory() {
        warn!("{}", advisory);
    } else {
        debug!(
            "Selected grating {} ({} range) for {} nm",
            selection.grating, selection.range_kind, wavelength_nm
        );
    }

    Ok(selection)
}

fn select_requested(
    configuration: &DeviceConfiguration,
    wavelength_nm: f64,
    index: usize,
) -> Result<Selection> {
    let grating = configuration.grating(index).ok_or_else(|| {
        LltfError::WavelengthRange(format!(
            "Grating {} requested for {} nm does not exist; valid gratings are 0..={}",
            index,
            wavelength_nm,
            configuration.grating_count().saturating_sub(1)
        ))
    })?;

    let range_kind = if grating.regular_range.contains(wavelength_nm) {
        RangeKind::Regular
    } else if grating.extended_range.contains(wavelength_nm) {
        RangeKind::Extended
    } else {
        return Err(LltfError::WavelengthRange(format!(
            "Wavelength {} nm is not supported by requested grating {} (regular {}, extended {})",
            wavelength_nm, index, grating.regular_range, grating.extended_range
        )));
    };

    Ok(Selection {
        grating: index,
        range_kind,
        wavelength_nm,
    })
}

fn select_automatic(configuration: &DeviceConfiguration, wavelength_nm: f64) -> Result<Selection> {
    match find_candidate_gratings(configuration, wavelength_nm).first() {
        Some(&(grating, range_kind)) => Ok(Selection {
            grating,
            range_kind,
            wavelength_nm,
        }),
        None => {
            let ranges: Vec<String> = configuration
                .gratings()
                .iter()
                .map(|g| {
                    format!(
                        "grating {}: regular {}, extended {}",
                        g.index, g.regular_range, g.extended_range
                    )
                })
                .collect();
            Err(LltfError::WavelengthRange(format!(
                "Wavelength {} nm not supported. Available ranges: {}",
                wavelength_nm,
                ranges.join("; ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::calibration::{GratingSpec, WavelengthRange};
    use tracing_test::traced_test;

    fn grating(reg: (f64, f64), ext: (f64, f64)) -> GratingSpec {
        GratingSpec {
            index: 0,
            regular_range: WavelengthRange::new(reg.0, reg.1),
            extended_range: WavelengthRange::new(ext.0, ext.1),
        }
    }

    fn two_gratings() -> DeviceConfiguration {
        DeviceConfiguration::new(
            vec![
                grating((400.0, 650.0), (350.0, 700.0)),
                grating((650.0, 1000.0), (550.0, 1100.0)),
            ],
            "two-gratings",
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_regular_match() {
        let cfg = two_gratings();
        let selection = select(&cfg, 600.0, None).unwrap();
        assert_eq!(selection.grating, 0);
        assert_eq!(selection.range_kind, RangeKind::Regular);
        assert!(selection.advisory().is_none());
    }

    #[test]
    fn test_shared_boundary_returns_both_in_index_order() {
        let cfg = two_gratings();
        assert_eq!(
            find_candidate_gratings(&cfg, 650.0),
            vec![(0, RangeKind::Regular), (1, RangeKind::Regular)]
        );
        assert_eq!(select(&cfg, 650.0, None).unwrap().grating, 0);
    }

    #[test]
    fn test_regular_matches_hide_extended_ones() {
        // 680 is regular for grating 1 and extended for grating 0
        let cfg = two_gratings();
        assert_eq!(
            find_candidate_gratings(&cfg, 680.0),
            vec![(1, RangeKind::Regular)]
        );
    }

    #[test]
    fn test_extended_only_candidates() {
        let cfg = two_gratings();
        assert_eq!(
            find_candidate_gratings(&cfg, 1050.0),
            vec![(1, RangeKind::Extended)]
        );
        assert_eq!(
            find_candidate_gratings(&cfg, 370.0),
            vec![(0, RangeKind::Extended)]
        );
    }

    #[test]
    #[traced_test]
    fn test_requested_grating_in_extended_range() {
        let cfg = two_gratings();
        let selection = select(&cfg, 660.0, Some(0)).unwrap();
        assert_eq!(selection.grating, 0);
        assert_eq!(selection.range_kind, RangeKind::Extended);
        assert!(selection.is_reduced_confidence());
        assert!(logs_contain("extended range of grating 0"));
    }

    #[test]
    fn test_requested_grating_out_of_range() {
        let cfg = two_gratings();
        let err = select(&cfg, 900.0, Some(0)).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, LltfError::WavelengthRange(_)));
        assert!(msg.contains("grating 0"));
        assert!(msg.contains("900"));
        assert!(msg.contains("350-700 nm"));
    }

    #[test]
    fn test_requested_grating_does_not_exist() {
        let cfg = two_gratings();
        let err = select(&cfg, 600.0, Some(2)).unwrap_err();
        assert!(matches!(err, LltfError::WavelengthRange(_)));
        assert!(err.to_string().contains("Grating 2"));
    }

    #[test]
    fn test_unsupported_wavelength_lists_all_ranges() {
        let cfg = two_gratings();
        assert!(find_candidate_gratings(&cfg, 1200.0).is_empty());

        let msg = select(&cfg, 1200.0, None).unwrap_err().to_string();
        assert!(msg.contains("400-650 nm"));
        assert!(msg.contains("350-700 nm"));
        assert!(msg.contains("650-1000 nm"));
        assert!(msg.contains("550-1100 nm"));
    }

    #[test]
    fn test_nan_is_rejected() {
        let cfg = two_gratings();
        assert!(select(&cfg, f64::NAN, None).is_err());
        assert!(select(&cfg, f64::NAN, Some(0)).is_err());
    }

    #[test]
    fn test_every_interior_wavelength_selects_its_grating() {
        let cfg = DeviceConfiguration::new(
            vec![
                grating((400.0, 649.0), (350.0, 700.0)),
                grating((650.0, 1000.0), (550.0, 1100.0)),
            ],
            "disjoint",
            None,
        )
        .unwrap();

        let mut wl = 400.5;
        while wl < 1000.0 {
            let expected = if wl <= 649.0 { 0 } else { 1 };
            let selection = select(&cfg, wl, None).unwrap();
            assert_eq!(selection.grating, expected, "wavelength {}", wl);
            assert_eq!(selection.range_kind, RangeKind::Regular);
            wl += 7.25;
        }
    }
}
