//! Default locations for tandem settings and property files.
//!
//! This module provides centralized default paths used by the library and
//! the CLI, ensuring consistency and avoiding duplication.

use std::env;
use std::path::PathBuf;

/// Environment variable naming the settings file.
pub const SETTINGS_ENV: &str = "TANDEM_CONFIG";

/// Settings file name looked for in the current directory.
pub const SETTINGS_FILE: &str = "tandem.yaml";

/// Returns the settings file path.
///
/// `TANDEM_CONFIG` wins when set; otherwise `tandem.yaml` in the current
/// directory.
pub fn default_settings_path() -> PathBuf {
    env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
}

/// Returns the user's properties file.
///
/// Uses the platform-appropriate configuration directory:
/// - Linux: `~/.config/tandem/tandem.properties` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/tandem/tandem.properties`
/// - Windows: `{FOLDERID_RoamingAppData}\tandem\tandem.properties`
///
/// Falls back to `.tandem/tandem.properties` in the current directory if the
/// platform directory cannot be determined.
pub fn default_properties_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("tandem"))
        .unwrap_or_else(|| PathBuf::from(".tandem"))
        .join("tandem.properties")
}

/// Returns the Gradle properties file: `$GRADLE_USER_HOME/gradle.properties`
/// if that variable is set, otherwise `~/.gradle/gradle.properties`.
pub fn gradle_properties_path() -> PathBuf {
    match env::var_os("GRADLE_USER_HOME") {
        Some(home) => PathBuf::from(home).join("gradle.properties"),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gradle")
            .join("gradle.properties"),
    }
}
