//! Host-supplied name tables for resources and bound properties

use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Name to numeric id lookup, supplied fresh for each compilation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingTable {
    entries: HashMap<String, u32>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: u32) -> Option<u32> {
        self.entries.insert(name.into(), id)
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a `NAME=ID` definition as given on the command line
    pub fn insert_definition(&mut self, definition: &str) -> Result<()> {
        let (name, id) = definition.split_once('=').ok_or_else(|| {
            CompilerError::invalid_format(format!(
                "Invalid binding definition: {}. Use NAME=ID format.",
                definition
            ))
        })?;
        let id = id.trim().parse::<u32>().map_err(|e| {
            CompilerError::invalid_format(format!("Invalid id in binding '{}': {}", definition, e))
        })?;
        self.insert(name.trim(), id);
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for BindingTable {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(name, id)| (name.into(), id)).collect(),
        }
    }
}

/// The resource and property tables of one compilation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    #[serde(default)]
    pub resources: BindingTable,
    #[serde(default)]
    pub properties: BindingTable,
}

impl Bindings {
    pub fn new(resources: BindingTable, properties: BindingTable) -> Self {
        Self { resources, properties }
    }

    /// Loads tables from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CompilerError::FileNotFound {
            path: format!("Bindings file {}: {}", path.display(), e),
        })?;

        let bindings: Bindings = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                CompilerError::invalid_format(format!("Invalid JSON bindings: {}", e))
            })?,
            Some("toml") => toml::from_str(&content).map_err(|e| {
                CompilerError::invalid_format(format!("Invalid TOML bindings: {}", e))
            })?,
            _ => {
                return Err(CompilerError::invalid_format(
                    "Bindings file must be .json or .toml format",
                ))
            }
        };

        log::info!(
            "Loaded {} resources and {} properties from {}",
            bindings.resources.len(),
            bindings.properties.len(),
            path.display()
        );
        Ok(bindings)
    }

    /// Adds every entry of `other`, replacing entries with the same name
    pub fn merge(&mut self, other: Bindings) {
        self.resources.entries.extend(other.resources.entries);
        self.properties.entries.extend(other.properties.entries);
    }
}
