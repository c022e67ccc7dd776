//! Where linkpetd keeps its files.
//!
//! - Linux: ~/.local/share/linkpet/
//! - Windows: %APPDATA%\linkpet\
//! - MacOS: ~/Library/Application Support/linkpet/
//!
//! `LINKPET_HOME` overrides the OS default.

use std::fs;
use std::path::{Path, PathBuf};

const HOME_ENV: &str = "LINKPET_HOME";

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, String> {
        let data_dir = match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::data_dir()
                .ok_or("Could not determine data directory")?
                .join("linkpet"),
        };
        Self::at(data_dir)
    }

    /// Uses `dir` as the data directory, creating it if needed.
    pub fn at(dir: impl AsRef<Path>) -> Result<Self, String> {
        let data_dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)
            .map_err(|e| format!("Failed to create data directory {:?}: {}", data_dir, e))?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}
