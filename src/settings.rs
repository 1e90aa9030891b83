//! # Settings Module
//!
//! ## Purpose
//! Menu-friendly wrapper around [`LibraryManager`]: maps display names to the
//! internal configuration keys and returns string errors ready to print.
//!
//! ## Data File Mappings
//! | Display Name | Internal Key | Default File |
//! |--------------|--------------|-------------|
//! | "Reagents" | "reagents_file" | data/reactivos.json |
//! | "Experiments" | "experiments_file" | data/experimentos.json |
//! | "Recipes" | "recipes_file" | data/recetas.json |
//! | "Results" | "results_file" | data/resultados.json |

use crate::library_manager::{DATA_FILE_KEYS, LibraryManager};
use std::collections::HashMap;

pub const DISPLAY_NAMES: [&str; 4] = ["Reagents", "Experiments", "Recipes", "Results"];

fn internal_key(display_name: &str) -> Option<&'static str> {
    DISPLAY_NAMES
        .iter()
        .position(|name| *name == display_name)
        .map(|i| DATA_FILE_KEYS[i])
}

/// Display-name view of the data file configuration.
#[derive(Debug)]
pub struct Settings<'a> {
    manager: &'a mut LibraryManager,
    /// "Reagents" -> "data/reactivos.json", etc.
    pub file_versions: HashMap<String, String>,
}

impl<'a> Settings<'a> {
    pub fn new(manager: &'a mut LibraryManager) -> Self {
        let mut settings = Self {
            manager,
            file_versions: HashMap::new(),
        };
        settings.sync();
        settings
    }

    fn sync(&mut self) {
        let config = self.manager.get_config();
        self.file_versions.clear();
        for (display, key) in DISPLAY_NAMES.iter().zip(DATA_FILE_KEYS.iter()) {
            if let Some(path) = config.data_file(key) {
                self.file_versions
                    .insert(display.to_string(), path.to_string());
            }
        }
    }

    pub fn get_file(&self, display_name: &str) -> Option<&String> {
        self.file_versions.get(display_name)
    }

    pub fn set_file(&mut self, display_name: &str, path: &str) -> Result<(), String> {
        let key = internal_key(display_name)
            .ok_or_else(|| format!("Unknown data file: {}", display_name))?;
        self.manager
            .set_data_file(key, path)
            .map_err(|e| e.to_string())?;
        self.file_versions
            .insert(display_name.to_string(), path.to_string());
        Ok(())
    }

    /// Updates several files at once; nothing changes if any name or path is invalid.
    pub fn update_multiple_files(&mut self, updates: HashMap<&str, &str>) -> Result<(), String> {
        let mut internal_updates = HashMap::new();
        for (display_name, path) in &updates {
            let key = internal_key(display_name)
                .ok_or_else(|| format!("Unknown data file: {}", display_name))?;
            internal_updates.insert(key, *path);
        }
        self.manager
            .update_libraries(internal_updates)
            .map_err(|e| e.to_string())?;
        self.sync();
        Ok(())
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), String> {
        self.manager.reset_to_defaults().map_err(|e| e.to_string())?;
        self.sync();
        Ok(())
    }
}
