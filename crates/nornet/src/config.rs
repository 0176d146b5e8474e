//! Configuration file loading

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use nornet_core::Settings;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "NORNET_CONFIG";

/// Settings together with where they came from
#[derive(Debug)]
pub struct LoadedSettings {
    /// Parsed settings
    pub settings: Settings,
    /// File the settings were read from; `None` for built-in defaults
    pub source: Option<PathBuf>,
}

/// Load settings from a file
///
/// # Errors
/// Returns error if file cannot be read or parsed
pub fn load(path: &Path) -> eyre::Result<Settings> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let settings: Settings =
        toml::from_str(&content).wrap_err_with(|| format!("failed to parse {}", path.display()))?;
    Ok(settings)
}

/// Candidate paths, most specific first
fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("nornet.toml"),
        PathBuf::from("/etc/nornet/nornet.toml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("nornet/nornet.toml"));
    }
    paths
}

/// Load from an explicit path, the environment, or the default paths
///
/// Falls back to built-in defaults when no file exists.
///
/// # Errors
/// Returns error if a selected file cannot be read or parsed
pub fn load_settings(explicit: Option<&Path>) -> eyre::Result<LoadedSettings> {
    let selected = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    if let Some(path) = selected {
        return Ok(LoadedSettings {
            settings: load(&path)?,
            source: Some(path),
        });
    }

    for path in search_paths() {
        if path.exists() {
            return Ok(LoadedSettings {
                settings: load(&path)?,
                source: Some(path),
            });
        }
    }

    Ok(LoadedSettings {
        settings: Settings::default(),
        source: None,
    })
}
