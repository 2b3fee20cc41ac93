//! Archetype data loader
//!
//! Loads archetype definitions from an external RON file, with fallback
//! to the built-in set.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use super::archetypes::{default_archetypes, ArchetypeDef};

/// Errors raised while loading external archetype data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read archetype file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse archetype file: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("archetype `{0}` is defined twice")]
    DuplicateArchetype(String),
}

/// Lookup table of every known archetype, keyed by id.
pub struct ArchetypeLibrary {
    defs: HashMap<String, ArchetypeDef>,
}

impl ArchetypeLibrary {
    /// Library holding only the built-in archetypes.
    pub fn builtin() -> Self {
        let mut defs = HashMap::new();
        for def in default_archetypes() {
            defs.insert(def.id.clone(), def);
        }
        Self { defs }
    }

    /// Load a library from a RON file, falling back to the built-in set
    /// when the file is absent or malformed.
    pub fn load_or_builtin(path: &Path) -> Self {
        if !path.exists() {
            return Self::builtin();
        }
        match Self::from_ron_file(path) {
            Ok(library) => {
                log::info!("loaded {} archetype(s) from {}", library.len(), path.display());
                library
            }
            Err(e) => {
                log::warn!("failed to load archetypes from {}: {e}; using defaults", path.display());
                Self::builtin()
            }
        }
    }

    /// Parse a library from a RON file.
    pub fn from_ron_file(path: &Path) -> Result<Self, DataError> {
        let text = fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Parse a library from RON text (a sequence of `ArchetypeDef`).
    pub fn from_ron_str(text: &str) -> Result<Self, DataError> {
        let list: Vec<ArchetypeDef> = ron::from_str(text)?;
        let mut defs = HashMap::new();
        for def in list {
            if defs.insert(def.id.clone(), def.clone()).is_some() {
                return Err(DataError::DuplicateArchetype(def.id));
            }
        }
        Ok(Self { defs })
    }

    pub fn get(&self, id: &str) -> Option<&ArchetypeDef> {
        self.defs.get(id)
    }

    /// Add or replace a definition. Integrators use this to register
    /// game-specific archetypes without a data file.
    pub fn insert(&mut self, def: ArchetypeDef) {
        self.defs.insert(def.id.clone(), def);
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl Default for ArchetypeLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}
