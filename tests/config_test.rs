//! Integration tests for configuration loading

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use gpx_enrich::DistanceMode;
use gpx_enrich::config::Config;
use gpx_enrich::elevation::DEFAULT_ENDPOINT;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[storage]
upload_dir = "/srv/gpx"

[elevation]
endpoint = "http://dem.local/elevation"
timeout_ms = 2500

[pipeline]
strip_extensions = false
distance_mode = "continuous"

[pipeline.extension_namespaces]
ns3 = "http://www.garmin.com/xmlschemas/TrackPointExtension/v1"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.upload_dir(), Path::new("/srv/gpx"));
    assert_eq!(config.elevation_endpoint(), "http://dem.local/elevation");
    assert_eq!(config.elevation_timeout(), Duration::from_millis(2500));
    assert!(!config.pipeline().strip_extensions);
    assert!(config.pipeline().resolve_elevation);
    assert_eq!(config.pipeline().distance_mode, DistanceMode::Continuous);
    // a configured table replaces the default prefixes
    assert!(config.pipeline().extension_namespaces.contains_key("ns3"));
    assert!(!config.pipeline().extension_namespaces.contains_key("gpxtpx"));
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_empty_file_uses_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.upload_dir(), Path::new("uploads"));
    assert_eq!(config.elevation_endpoint(), DEFAULT_ENDPOINT);
    assert_eq!(config.elevation_timeout(), Duration::from_secs(10));
    assert!(config.pipeline().normalize_namespaces);
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/gpx-enrich.toml").unwrap();
    assert_eq!(config.upload_dir(), Path::new("uploads"));
    assert_eq!(config.config_file(), "default");
    assert_eq!(config.pipeline().distance_mode, DistanceMode::PerSegment);
}

#[test]
fn test_malformed_file_is_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[elevation\ntimeout_ms = ").unwrap();
    temp_file.flush().unwrap();

    let path = temp_file.path().display().to_string();
    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_resolve_config_path_prefers_argument() {
    assert_eq!(
        Config::resolve_config_path(Some("custom.toml")),
        "custom.toml"
    );
}

#[test]
fn test_offline_override() {
    let mut config = Config::default();
    config.disable_elevation();
    config.set_upload_dir("/tmp/out");
    assert!(!config.pipeline().resolve_elevation);
    assert_eq!(config.upload_dir(), Path::new("/tmp/out"));
}
