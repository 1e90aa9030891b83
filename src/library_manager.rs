//! # Library Manager Module
//!
//! ## Purpose
//! Centralizes the locations of the laboratory JSON documents and the behavior
//! flags of the inventory pipeline, so that no file path is hardcoded in the
//! rest of the crate.
//!
//! ## Architecture
//! - **LabConfig**: serializable configuration structure
//! - **LibraryManager**: loads, validates, updates and persists the configuration
//! - **Configuration File**: JSON document (`lab_config.json` by default)
//!
//! The manager is an ordinary value: `main` builds one and hands its config to
//! [`crate::laboratory::Laboratory`]. There is no global instance.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "reagents_file": "data/reactivos.json",
//!   "experiments_file": "data/experimentos.json",
//!   "recipes_file": "data/recetas.json",
//!   "results_file": "data/resultados.json",
//!   "strict_stock": false,
//!   "reconciled_execution": false,
//!   "atomic_writes": true,
//!   "log_level": "info"
//! }
//! ```
//!
//! ## Usage
//! ```rust, ignore
//! use SapuLab::library_manager::LibraryManager;
//!
//! let mut manager = LibraryManager::with_config_file("lab_config.json");
//! manager.set_reagents_file("inventory/reactivos.json")?;
//! manager.set_strict_stock(true)?;
//! ```

use crate::lab_error::LabError;
use log::{LevelFilter, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "lab_config.json";

/// Internal keys of the four data files, in menu order.
pub const DATA_FILE_KEYS: [&str; 4] = [
    "reagents_file",
    "experiments_file",
    "recipes_file",
    "results_file",
];

/// Configuration of data file paths and pipeline behavior.
///
/// # Fields
/// * `reagents_file` - inventory of reagents (`reactivos.json`)
/// * `experiments_file` - registered experiments (`experimentos.json`)
/// * `recipes_file` - recipe catalogue (`recetas.json`)
/// * `results_file` - evaluation log (`resultados.json`)
/// * `strict_stock` - reject debits that would leave negative stock
/// * `reconciled_execution` - validate nominal plus loss before debiting
/// * `atomic_writes` - write through a temp file and rename
/// * `log_level` - `simplelog` level name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub reagents_file: String,
    pub experiments_file: String,
    pub recipes_file: String,
    pub results_file: String,
    pub strict_stock: bool,
    pub reconciled_execution: bool,
    pub atomic_writes: bool,
    pub log_level: String,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            reagents_file: "data/reactivos.json".to_string(),
            experiments_file: "data/experimentos.json".to_string(),
            recipes_file: "data/recetas.json".to_string(),
            results_file: "data/resultados.json".to_string(),
            strict_stock: false,
            reconciled_execution: false,
            atomic_writes: true,
            log_level: "info".to_string(),
        }
    }
}

impl LabConfig {
    /// Configuration with every data file placed inside `dir`.
    pub fn in_directory(dir: &Path) -> Self {
        let file = |name: &str| dir.join(name).to_string_lossy().into_owned();
        Self {
            reagents_file: file("reactivos.json"),
            experiments_file: file("experimentos.json"),
            recipes_file: file("recetas.json"),
            results_file: file("resultados.json"),
            ..Self::default()
        }
    }

    /// Parsed log level, `Info` when the stored name is not a level.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn data_file(&self, key: &str) -> Option<&str> {
        match key {
            "reagents_file" => Some(&self.reagents_file),
            "experiments_file" => Some(&self.experiments_file),
            "recipes_file" => Some(&self.recipes_file),
            "results_file" => Some(&self.results_file),
            _ => None,
        }
    }

    fn data_file_mut(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "reagents_file" => Some(&mut self.reagents_file),
            "experiments_file" => Some(&mut self.experiments_file),
            "recipes_file" => Some(&mut self.recipes_file),
            "results_file" => Some(&mut self.results_file),
            _ => None,
        }
    }
}

/// Loads, updates and persists a [`LabConfig`].
#[derive(Debug, Clone)]
pub struct LibraryManager {
    config: LabConfig,
    config_file: String,
}

impl LibraryManager {
    /// Manager backed by `lab_config.json` in the working directory.
    pub fn new() -> Self {
        Self::with_config_file(DEFAULT_CONFIG_FILE)
    }

    /// Manager backed by a custom configuration file.
    ///
    /// A missing or unreadable file yields the default configuration.
    pub fn with_config_file(config_file: &str) -> Self {
        let config = match Self::load_config(config_file) {
            Ok(config) => config,
            Err(e) => {
                warn!("could not read {}: {}, using defaults", config_file, e);
                LabConfig::default()
            }
        };
        Self {
            config,
            config_file: config_file.to_string(),
        }
    }

    fn load_config(config_file: &str) -> Result<LabConfig, LabError> {
        if Path::new(config_file).exists() {
            let content = fs::read_to_string(config_file)?;
            let config: LabConfig = serde_json::from_str(&content)?;
            info!("configuration loaded from {}", config_file);
            Ok(config)
        } else {
            Ok(LabConfig::default())
        }
    }

    pub fn save_config(&self) -> Result<(), LabError> {
        let content = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    pub fn get_config(&self) -> &LabConfig {
        &self.config
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn set_reagents_file(&mut self, path: &str) -> Result<(), LabError> {
        self.set_data_file("reagents_file", path)
    }

    pub fn set_experiments_file(&mut self, path: &str) -> Result<(), LabError> {
        self.set_data_file("experiments_file", path)
    }

    pub fn set_recipes_file(&mut self, path: &str) -> Result<(), LabError> {
        self.set_data_file("recipes_file", path)
    }

    pub fn set_results_file(&mut self, path: &str) -> Result<(), LabError> {
        self.set_data_file("results_file", path)
    }

    /// Points one data file at a new path and saves the configuration.
    ///
    /// The file itself need not exist yet (a missing data file reads as an
    /// empty collection), but the path must name a `.json` file.
    pub fn set_data_file(&mut self, key: &str, path: &str) -> Result<(), LabError> {
        validate_json_path(path)?;
        let slot = self
            .config
            .data_file_mut(key)
            .ok_or_else(|| LabError::invalid_input("data file key", key))?;
        *slot = path.to_string();
        self.save_config()
    }

    /// Updates several data file paths at once. Every key and path is
    /// validated before any of them is applied.
    pub fn update_libraries(&mut self, updates: HashMap<&str, &str>) -> Result<(), LabError> {
        for (key, path) in &updates {
            if !DATA_FILE_KEYS.contains(key) {
                return Err(LabError::invalid_input("data file key", *key));
            }
            validate_json_path(path)?;
        }
        for (key, path) in updates {
            if let Some(slot) = self.config.data_file_mut(key) {
                *slot = path.to_string();
            }
        }
        self.save_config()
    }

    pub fn set_strict_stock(&mut self, enabled: bool) -> Result<(), LabError> {
        self.config.strict_stock = enabled;
        self.save_config()
    }

    pub fn set_reconciled_execution(&mut self, enabled: bool) -> Result<(), LabError> {
        self.config.reconciled_execution = enabled;
        self.save_config()
    }

    pub fn set_atomic_writes(&mut self, enabled: bool) -> Result<(), LabError> {
        self.config.atomic_writes = enabled;
        self.save_config()
    }

    pub fn set_log_level(&mut self, level: &str) -> Result<(), LabError> {
        LevelFilter::from_str(level).map_err(|_| LabError::invalid_input("log level", level))?;
        self.config.log_level = level.to_lowercase();
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), LabError> {
        self.config = LabConfig::default();
        self.save_config()
    }
}

impl Default for LibraryManager {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_json_path(path: &str) -> Result<(), LabError> {
    let trimmed = path.trim();
    if trimmed.is_empty() || !trimmed.to_lowercase().ends_with(".json") {
        return Err(LabError::invalid_input("data file path", path));
    }
    Ok(())
}
