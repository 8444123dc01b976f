// FILE: src/cli/config.rs

use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Path of a `.toml` or `.json` bindings file
    pub bindings: Option<String>,
    pub max_nesting_depth: Option<usize>,
    pub max_source_size: Option<usize>,
    pub output_directory: Option<String>,
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = fs::read_to_string(config_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("Config file {}: {}", config_path, e),
    })?;

    let config = if config_path.ends_with(".json") {
        serde_json::from_str(&config_content)
            .map_err(|e| CompilerError::invalid_format(format!("Invalid JSON config: {}", e)))?
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content)
            .map_err(|e| CompilerError::invalid_format(format!("Invalid TOML config: {}", e)))?
    } else {
        return Err(CompilerError::invalid_format("Config file must be .json or .toml format"));
    };

    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}
