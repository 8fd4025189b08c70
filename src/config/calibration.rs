//! Vendor calibration documents.
//!
//! Every LLTF ships with an XML file that describes the filter system and the
//! wavelength coverage of each of its gratings. This module turns that file into
//! a validated, immutable [`DeviceConfiguration`].
//!
//! # Document Layout
//!
//! Only a small part of the vendor schema is read:
//!
//! ```text
//! <Component Type="Filter" Id="M000010263">   system name (optional)
//!   ...
//!   <Grating>                                  one per grating, index = order
//!     <Range>
//!       <RegLower>400</RegLower>               regular range, nm
//!       <RegUpper>650</RegUpper>
//!       <ExtLower>350</ExtLower>               extended range, nm
//!       <ExtUpper>700</ExtUpper>
//!     </Range>
//!   </Grating>
//! ```
//!
//! Everything else in the document is ignored.
//!
//! # Discovery
//!
//! When no explicit file is given, [`CalibrationSource::Discover`] scans a
//! directory for `*.xml` files and takes the lexicographically first one,
//! warning about the others.

use std::fmt;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{LltfError, Result};

/// Directory searched for calibration documents when none is given.
pub const DEFAULT_CALIBRATION_DIR: &str = "xml_files";

const REG_LOWER: &str = "RegLower";
const REG_UPPER: &str = "RegUpper";
const EXT_LOWER: &str = "ExtLower";
const EXT_UPPER: &str = "ExtUpper";

// =============================================================================
// Ranges and Gratings
// =============================================================================

/// Closed wavelength interval in nanometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WavelengthRange {
    /// Lower bound (inclusive)
    pub min_nm: f64,
    /// Upper bound (inclusive)
    pub max_nm: f64,
}

impl WavelengthRange {
    /// Create a range. Callers are expected to pass `min_nm <= max_nm`.
    pub fn new(min_nm: f64, max_nm: f64) -> Self {
        Self { min_nm, max_nm }
    }

    /// Inclusive membership test. NaN is never contained.
    pub fn contains(&self, wavelength_nm: f64) -> bool {
        self.min_nm <= wavelength_nm && wavelength_nm <= self.max_nm
    }

    /// Whether `other` lies entirely inside this range.
    pub fn encloses(&self, other: &WavelengthRange) -> bool {
        self.min_nm <= other.min_nm && other.max_nm <= self.max_nm
    }
}

impl fmt::Display for WavelengthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} nm", self.min_nm, self.max_nm)
    }
}

/// Capabilities of one physical grating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GratingSpec {
    /// Position of the grating in the calibration document (0-based).
    pub index: usize,
    /// Manufacturer-guaranteed operating band.
    pub regular_range: WavelengthRange,
    /// Wider band usable with reduced accuracy. Always encloses `regular_range`.
    pub extended_range: WavelengthRange,
}

// =============================================================================
// Device Configuration
// =============================================================================

/// Parsed calibration data for one physical device.
///
/// Gratings are stored in index order and indices are contiguous from 0.
/// The configuration is immutable once loaded.
#[derive(Debug, Clone)]
pub struct DeviceConfiguration {
    gratings: Vec<GratingSpec>,
    source_id: String,
    system_name: Option<String>,
    path: Option<PathBuf>,
}

impl DeviceConfiguration {
    /// Load and validate a calibration document from disk.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source_id = path.display().to_string();

        if !path.exists() {
            return Err(LltfError::configuration(
                source_id,
                "path",
                "calibration file not found",
            ));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            LltfError::configuration(
                source_id.clone(),
                "path",
                format!("failed to read calibration file: {}", e),
            )
        })?;

        let mut config = Self::from_xml_str(&contents, &source_id)?;
        config.path = Some(path.to_path_buf());

        info!(
            "Loaded calibration from {}: {} gratings, system {}",
            path.display(),
            config.gratings.len(),
            config.system_name.as_deref().unwrap_or("<unnamed>")
        );
        Ok(config)
    }

    /// Parse a calibration document held in memory.
    ///
    /// `source_id` is only used in diagnostics. Configurations built this way
    /// have no [`path`](Self::path), so they cannot open real hardware.
    pub fn from_xml_str(xml: &str, source_id: &str) -> Result<Self> {
        let parsed = parse_document(xml, source_id)?;

        if parsed.system_name.is_none() {
            warn!(
                "Calibration '{}' has no <Component Type=\"Filter\"> element; system name unknown",
                source_id
            );
        }

        Self::new(parsed.gratings, source_id, parsed.system_name)
    }

    /// Build a configuration from already-parsed gratings.
    ///
    /// Indices are reassigned from the slice order.
    pub fn new(
        gratings: Vec<GratingSpec>,
        source_id: &str,
        system_name: Option<String>,
    ) -> Result<Self> {
        if gratings.is_empty() {
            return Err(LltfError::configuration(
                source_id,
                "Grating",
                "document describes no gratings",
            ));
        }

        let gratings = gratings
            .into_iter()
            .enumerate()
            .map(|(index, grating)| {
                validate_ranges(source_id, index, &grating.regular_range, &grating.extended_range)?;
                Ok(GratingSpec { index, ..grating })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            gratings,
            source_id: source_id.to_string(),
            system_name,
            path: None,
        })
    }

    /// All gratings in index order.
    pub fn gratings(&self) -> &[GratingSpec] {
        &self.gratings
    }

    /// Look up one grating by index.
    pub fn grating(&self, index: usize) -> Option<&GratingSpec> {
        self.gratings.get(index)
    }

    /// Number of gratings.
    pub fn grating_count(&self) -> usize {
        self.gratings.len()
    }

    /// Identifier of the document this configuration came from.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Filter system name (`Id` of the filter component), if the document has one.
    pub fn system_name(&self) -> Option<&str> {
        self.system_name.as_deref()
    }

    /// Filesystem path of the document, when it was loaded from a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn validate_ranges(
    source_id: &str,
    index: usize,
    regular: &WavelengthRange,
    extended: &WavelengthRange,
) -> Result<()> {
    let field = |name: &str| format!("Grating[{}]/Range/{}", index, name);

    for (lower, upper, range) in [(REG_LOWER, REG_UPPER, regular), (EXT_LOWER, EXT_UPPER, extended)] {
        if !range.min_nm.is_finite() {
            return Err(LltfError::configuration(source_id, field(lower), "bound is not finite"));
        }
        if !range.max_nm.is_finite() {
            return Err(LltfError::configuration(source_id, field(upper), "bound is not finite"));
        }
        if range.min_nm > range.max_nm {
            return Err(LltfError::configuration(
                source_id,
                field(lower),
                format!("{} exceeds {} ({} > {})", lower, upper, range.min_nm, range.max_nm),
            ));
        }
    }

    if extended.min_nm > regular.min_nm {
        return Err(LltfError::configuration(
            source_id,
            field(EXT_LOWER),
            format!(
                "extended lower bound {} is above regular lower bound {}",
                extended.min_nm, regular.min_nm
            ),
        ));
    }
    if extended.max_nm < regular.max_nm {
        return Err(LltfError::configuration(
            source_id,
            field(EXT_UPPER),
            format!(
                "extended upper bound {} is below regular upper bound {}",
                extended.max_nm, regular.max_nm
            ),
        ));
    }

    Ok(())
}

// =============================================================================
// XML Parsing
// =============================================================================

struct ParsedDocument {
    gratings: Vec<GratingSpec>,
    system_name: Option<String>,
}

/// Raw text of one `<Grating>` element while it is being read.
#[derive(Debug, Default)]
struct GratingDraft {
    has_range: bool,
    reg_lower: Option<String>,
    reg_upper: Option<String>,
    ext_lower: Option<String>,
    ext_upper: Option<String>,
}

impl GratingDraft {
    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            REG_LOWER => Some(&mut self.reg_lower),
            REG_UPPER => Some(&mut self.reg_upper),
            EXT_LOWER => Some(&mut self.ext_lower),
            EXT_UPPER => Some(&mut self.ext_upper),
            _ => None,
        }
    }

    fn finish(self, index: usize, source_id: &str) -> Result<GratingSpec> {
        if !self.has_range {
            return Err(LltfError::configuration(
                source_id,
                format!("Grating[{}]/Range", index),
                "missing required element",
            ));
        }

        let bound = |name: &str, text: Option<String>| -> Result<f64> {
            let field = format!("Grating[{}]/Range/{}", index, name);
            let text = text.ok_or_else(|| {
                LltfError::configuration(source_id, field.clone(), "missing required element")
            })?;
            text.trim().parse::<f64>().map_err(|_| {
                LltfError::configuration(source_id, field, format!("'{}' is not a number", text.trim()))
            })
        };

        Ok(GratingSpec {
            index,
            regular_range: WavelengthRange::new(
                bound(REG_LOWER, self.reg_lower)?,
                bound(REG_UPPER, self.reg_upper)?,
            ),
            extended_range: WavelengthRange::new(
                bound(EXT_LOWER, self.ext_lower)?,
                bound(EXT_UPPER, self.ext_upper)?,
            ),
        })
    }
}

fn malformed(source_id: &str, reason: impl fmt::Display) -> LltfError {
    LltfError::configuration(source_id, "document", format!("malformed XML: {}", reason))
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn filter_component_id(e: &BytesStart<'_>, source_id: &str) -> Result<Option<String>> {
    let is_filter = match e.try_get_attribute("Type").map_err(|err| malformed(source_id, err))? {
        Some(attr) => attr.unescape_value().map_err(|err| malformed(source_id, err))? == "Filter",
        None => false,
    };
    if !is_filter {
        return Ok(None);
    }

    match e.try_get_attribute("Id").map_err(|err| malformed(source_id, err))? {
        Some(attr) => Ok(Some(
            attr.unescape_value()
                .map_err(|err| malformed(source_id, err))?
                .to_string(),
        )),
        None => Ok(None),
    }
}

fn parse_document(xml: &str, source_id: &str) -> Result<ParsedDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut gratings = Vec::new();
    let mut system_name = None;
    let mut draft: Option<GratingDraft> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = element_name(e);
                match name.as_str() {
                    "Component" if system_name.is_none() => {
                        system_name = filter_component_id(e, source_id)?;
                    }
                    "Grating" if draft.is_none() => draft = Some(GratingDraft::default()),
                    "Range" if stack.last().map(String::as_str) == Some("Grating") => {
                        if let Some(d) = draft.as_mut() {
                            d.has_range = true;
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = element_name(e);
                match name.as_str() {
                    "Component" if system_name.is_none() => {
                        system_name = filter_component_id(e, source_id)?;
                    }
                    // <Grating/> has no range; report it like any other missing element
                    "Grating" if draft.is_none() => {
                        gratings.push(GratingDraft::default().finish(gratings.len(), source_id)?);
                    }
                    "Range" if stack.last().map(String::as_str) == Some("Grating") => {
                        if let Some(d) = draft.as_mut() {
                            d.has_range = true;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                let depth = stack.len();
                if depth >= 3 && stack[depth - 2] == "Range" && stack[depth - 3] == "Grating" {
                    if let Some(slot) = draft.as_mut().and_then(|d| d.slot(&stack[depth - 1])) {
                        let text = e.unescape().map_err(|err| malformed(source_id, err))?;
                        *slot = Some(text.to_string());
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.pop();
                if name == "Grating" && !stack.iter().any(|n| n == "Grating") {
                    if let Some(d) = draft.take() {
                        let grating = d.finish(gratings.len(), source_id)?;
                        debug!(
                            "Grating {}: regular {}, extended {}",
                            grating.index, grating.regular_range, grating.extended_range
                        );
                        gratings.push(grating);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(malformed(
                    source_id,
                    format!("{} at byte {}", e, reader.buffer_position()),
                ))
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(source_id, format!("unclosed element <{}>", open)));
    }

    Ok(ParsedDocument {
        gratings,
        system_name,
    })
}

// =============================================================================
// Sources and Discovery
// =============================================================================

/// Where a session's calibration document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationSource {
    /// An explicit document.
    File(PathBuf),
    /// Search a directory for `*.xml` documents.
    Discover(PathBuf),
}

impl Default for CalibrationSource {
    fn default() -> Self {
        Self::Discover(PathBuf::from(DEFAULT_CALIBRATION_DIR))
    }
}

impl CalibrationSource {
    /// Resolve the source to a single document path.
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            Self::File(path) => Ok(path.clone()),
            Self::Discover(dir) => discover_calibration(dir),
        }
    }
}

/// Load a configuration from the given source.
pub fn load(source: &CalibrationSource) -> Result<DeviceConfiguration> {
    DeviceConfiguration::load_file(source.resolve()?)
}

/// Pick the calibration document to use from a directory.
///
/// Candidates are `*.xml` files (extension compared case-insensitively) sorted
/// by file name. The first one wins; any others are reported at warn level.
pub fn discover_calibration(dir: &Path) -> Result<PathBuf> {
    let source_id = dir.display().to_string();

    let entries = std::fs::read_dir(dir).map_err(|e| {
        LltfError::configuration(
            source_id.clone(),
            "search_dir",
            format!("cannot read calibration directory: {}", e),
        )
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("xml"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();

    let mut candidates = candidates.into_iter();
    let chosen = candidates.next().ok_or_else(|| {
        LltfError::configuration(
            source_id.clone(),
            "search_dir",
            "no XML calibration documents found; pass an explicit calibration path",
        )
    })?;

    let ignored: Vec<String> = candidates.map(|p| p.display().to_string()).collect();
    if !ignored.is_empty() {
        warn!(
            "Multiple calibration documents in {}: using {}, ignoring {}",
            source_id,
            chosen.display(),
            ignored.join(", ")
        );
    }

    Ok(chosen)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GRATINGS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<System>
  <Component Type="Filter" Id="M000010263">
    <Gratings>
      <Grating>
        <Name>VIS</Name>
        <Range>
          <RegLower>400</RegLower>
          <RegUpper>650</RegUpper>
          <ExtLower>350</ExtLower>
          <ExtUpper>700</ExtUpper>
        </Range>
      </Grating>
      <Grating>
        <Name>NIR</Name>
        <Range>
          <RegLower>650.0</RegLower>
          <RegUpper>1000.0</RegUpper>
          <ExtLower>550.0</ExtLower>
          <ExtUpper>1100.0</ExtUpper>
        </Range>
      </Grating>
    </Gratings>
  </Component>
</System>"#;

    fn expect_config_error(xml: &str) -> (String, String) {
        match DeviceConfiguration::from_xml_str(xml, "test.xml") {
            Err(LltfError::Configuration {
                source_id, field, ..
            }) => (source_id, field),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_two_gratings() {
        let config = DeviceConfiguration::from_xml_str(TWO_GRATINGS, "test.xml").unwrap();

        assert_eq!(config.grating_count(), 2);
        assert_eq!(config.system_name(), Some("M000010263"));
        assert_eq!(config.source_id(), "test.xml");
        assert!(config.path().is_none());

        let g1 = config.grating(1).unwrap();
        assert_eq!(g1.index, 1);
        assert_eq!(g1.regular_range, WavelengthRange::new(650.0, 1000.0));
        assert_eq!(g1.extended_range, WavelengthRange::new(550.0, 1100.0));
    }

    #[test]
    fn test_missing_filter_component_is_not_an_error() {
        let xml = r#"<Root><Grating><Range>
            <RegLower>1</RegLower><RegUpper>2</RegUpper>
            <ExtLower>0</ExtLower><ExtUpper>3</ExtUpper>
        </Range></Grating></Root>"#;
        let config = DeviceConfiguration::from_xml_str(xml, "bare.xml").unwrap();
        assert_eq!(config.system_name(), None);
        assert_eq!(config.grating_count(), 1);
    }

    #[test]
    fn test_missing_bound_names_field() {
        let xml = TWO_GRATINGS.replace("<ExtUpper>1100.0</ExtUpper>", "");
        let (source_id, field) = expect_config_error(&xml);
        assert_eq!(source_id, "test.xml");
        assert_eq!(field, "Grating[1]/Range/ExtUpper");
    }

    #[test]
    fn test_non_numeric_bound() {
        let xml = TWO_GRATINGS.replace("<RegLower>400</RegLower>", "<RegLower>four hundred</RegLower>");
        let (_, field) = expect_config_error(&xml);
        assert_eq!(field, "Grating[0]/Range/RegLower");
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let xml = TWO_GRATINGS.replace("<RegUpper>650</RegUpper>", "<RegUpper>300</RegUpper>");
        let (_, field) = expect_config_error(&xml);
        assert_eq!(field, "Grating[0]/Range/RegLower");
    }

    #[test]
    fn test_non_finite_bounds_rejected() {
        let xml = TWO_GRATINGS.replace("<RegLower>400</RegLower>", "<RegLower>NaN</RegLower>");
        let (_, field) = expect_config_error(&xml);
        assert_eq!(field, "Grating[0]/Range/RegLower");

        let xml = TWO_GRATINGS.replace("<ExtUpper>700</ExtUpper>", "<ExtUpper>inf</ExtUpper>");
        let (_, field) = expect_config_error(&xml);
        assert_eq!(field, "Grating[0]/Range/ExtUpper");
    }

    #[test]
    fn test_extended_must_enclose_regular() {
        let xml = TWO_GRATINGS.replace("<ExtUpper>700</ExtUpper>", "<ExtUpper>600</ExtUpper>");
        let (_, field) = expect_config_error(&xml);
        assert_eq!(field, "Grating[0]/Range/ExtUpper");
    }

    #[test]
    fn test_grating_without_range() {
        let xml = r#"<Root><Component Type="Filter" Id="X"/><Grating><Name>A</Name></Grating></Root>"#;
        let (_, field) = expect_config_error(xml);
        assert_eq!(field, "Grating[0]/Range");
    }

    #[test]
    fn test_no_gratings() {
        let (_, field) = expect_config_error(r#"<Root><Component Type="Filter" Id="X"/></Root>"#);
        assert_eq!(field, "Grating");
    }

    #[test]
    fn test_malformed_document() {
        let (_, field) = expect_config_error("<Root><Grating><Range></Grating></Root>");
        assert_eq!(field, "document");

        let (_, field) = expect_config_error("<Root><Grating>");
        assert_eq!(field, "document");
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = WavelengthRange::new(400.0, 650.0);
        assert!(range.contains(400.0));
        assert!(range.contains(650.0));
        assert!(!range.contains(650.0001));
        assert!(!range.contains(f64::NAN));
    }
}
