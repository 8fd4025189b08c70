//! Calibration document discovery and settings-driven loading

use std::fs;
use std::path::Path;

use lltf::config::{discover_calibration, CalibrationSource, Settings};
use lltf::{DeviceSession, LltfError};
use tempfile::TempDir;
use tracing_test::traced_test;

const FIXTURE: &str = include_str!("fixtures/two_gratings.xml");

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
#[traced_test]
fn test_first_document_wins_and_others_are_reported() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "M000020000.xml", FIXTURE);
    write(dir.path(), "M000010263.xml", FIXTURE);
    write(dir.path(), "notes.txt", "not a calibration");

    let chosen = discover_calibration(dir.path()).unwrap();
    assert_eq!(chosen, dir.path().join("M000010263.xml"));
    assert!(logs_contain("Multiple calibration documents"));
    assert!(logs_contain("M000020000.xml"));
}

#[test]
#[traced_test]
fn test_single_document_is_silent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "only.xml", FIXTURE);

    let chosen = discover_calibration(dir.path()).unwrap();
    assert_eq!(chosen, dir.path().join("only.xml"));
    assert!(!logs_contain("Multiple calibration documents"));
}

#[test]
fn test_extension_match_is_case_insensitive() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "UPPER.XML", FIXTURE);

    let chosen = discover_calibration(dir.path()).unwrap();
    assert_eq!(chosen, dir.path().join("UPPER.XML"));
}

#[test]
fn test_empty_directory_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "readme.md", "nothing here");

    match discover_calibration(dir.path()) {
        Err(LltfError::Configuration { field, .. }) => assert_eq!(field, "search_dir"),
        other => panic!("expected configuration error, got {:?}", other),
    }
}

#[test]
fn test_missing_directory_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("xml_files");
    assert!(matches!(
        DeviceSession::new(&CalibrationSource::Discover(missing)),
        Err(LltfError::Configuration { .. })
    ));
}

#[test]
fn test_session_from_discovered_document() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "M000010263.xml", FIXTURE);

    let session = DeviceSession::new(&CalibrationSource::Discover(dir.path().to_path_buf())).unwrap();
    assert_eq!(session.configuration().grating_count(), 2);
    assert_eq!(
        session.configuration().path(),
        Some(dir.path().join("M000010263.xml").as_path())
    );
}

#[test]
fn test_settings_file_selects_calibration() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "cal.xml", FIXTURE);
    let settings_path = dir.path().join("lltf.toml");
    write(
        dir.path(),
        "lltf.toml",
        &format!(
            "[calibration]\npath = {:?}\n\n[simulation]\nenabled = true\nseed = 1\n",
            dir.path().join("cal.xml").display().to_string()
        ),
    );

    let settings = Settings::load_from(&settings_path).unwrap();
    let mut session = DeviceSession::new(&settings.calibration_source()).unwrap();
    session.initialize(settings.connection_mode()).unwrap();
    session.set_wavelength(600.0, None).unwrap();
    assert_eq!(session.get_wavelength().unwrap(), 600.0);
}
