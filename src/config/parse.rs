//! Configuration file discovery and loading

use crate::error::{ConfigError, ConfigResult};
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Default configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["kick.yml", "kick.yaml"];

const SAMPLE_CONFIG: &str = r#"global:
  environment:
    BINARY: "my_binary"

main:
  files: [src/*.rs, Cargo.toml]
  run:
    - "cargo build"
    - "cp target/debug/$BINARY ./bin/$BINARY"
"#;

/// Find the configuration file in `dir`
pub fn find_config_file_from(dir: &Path) -> ConfigResult<PathBuf> {
    let mut searched_paths = Vec::new();

    for file_name in CONFIG_FILE_NAMES {
        let config_path = dir.join(file_name);
        if config_path.is_file() {
            return Ok(config_path);
        }
        searched_paths.push(config_path.display().to_string());
    }

    Err(ConfigError::NotFound(searched_paths.join(", ")))
}

/// Read the raw document text
pub fn read_config(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|error| ConfigError::Unreadable {
        path: path.to_path_buf(),
        error,
    })
}

/// Derive the project identity from a working directory
pub fn project_key(dir: &Path) -> String {
    dir.to_string_lossy().replace(MAIN_SEPARATOR, "-")
}

/// Write a sample kick.yml into `dir`
pub fn init_config(dir: &Path) -> ConfigResult<PathBuf> {
    if let Ok(existing) = find_config_file_from(dir) {
        let name = existing
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(ConfigError::AlreadyInitialized(name));
    }

    let path = dir.join(CONFIG_FILE_NAMES[0]);
    fs::write(&path, SAMPLE_CONFIG).map_err(|error| ConfigError::Unreadable {
        path: path.clone(),
        error,
    })?;

    Ok(path)
}
