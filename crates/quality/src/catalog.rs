//! RuleSpec catalog: the registry of data types.

use std::collections::HashMap;
use std::path::Path;

use portdq_core::DataTypeConfig;
use regex::Regex;
use serde::Serialize;

use crate::error::{QualityError, Result};

const BUILTIN_CATALOG: &str = include_str!("../catalog.json");

/// Data type ids double as storage path segments.
const ID_PATTERN: &str = r"^[a-z][a-z0-9_]*$";

/// Errors raised while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Catalog JSON could not be parsed
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Catalog file could not be read
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Two entries share an id
    #[error("duplicate data type id '{0}'")]
    DuplicateId(String),

    /// Id is not a lowercase identifier
    #[error("invalid data type id '{0}'")]
    InvalidId(String),

    /// Id pattern failed to compile
    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// Data types sharing a category, in first-seen order.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogGroup<'a> {
    /// Category name
    pub category: &'a str,
    /// Entries in that category
    pub data_types: Vec<&'a DataTypeConfig>,
}

/// Immutable registry of data types, indexed by id.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<DataTypeConfig>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting malformed or duplicate ids.
    pub fn new(entries: Vec<DataTypeConfig>) -> std::result::Result<Self, CatalogError> {
        let id_pattern = Regex::new(ID_PATTERN)?;
        let mut by_id = HashMap::with_capacity(entries.len());

        for (idx, entry) in entries.iter().enumerate() {
            if !id_pattern.is_match(&entry.id) {
                return Err(CatalogError::InvalidId(entry.id.clone()));
            }
            if by_id.insert(entry.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateId(entry.id.clone()));
            }
        }

        Ok(Self { entries, by_id })
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> std::result::Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Parse a JSON array of data type entries.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, CatalogError> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Load a catalog file.
    pub async fn from_path(path: &Path) -> std::result::Result<Self, CatalogError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&json)
    }

    /// Look up a data type.
    pub fn get(&self, id: &str) -> Option<&DataTypeConfig> {
        self.by_id.get(id).map(|&idx| &self.entries[idx])
    }

    /// Look up a data type, signalling `NotFound` for unknown ids.
    pub fn get_by_id(&self, id: &str) -> Result<&DataTypeConfig> {
        self.get(id)
            .ok_or_else(|| QualityError::NotFound(format!("data type '{id}'")))
    }

    /// All entries in load order.
    pub fn list(&self) -> &[DataTypeConfig] {
        &self.entries
    }

    /// Entries grouped by category.
    pub fn list_by_category(&self) -> Vec<CatalogGroup<'_>> {
        let mut groups: Vec<CatalogGroup<'_>> = Vec::new();
        for entry in &self.entries {
            match groups.iter_mut().find(|g| g.category == entry.category) {
                Some(group) => group.data_types.push(entry),
                None => groups.push(CatalogGroup {
                    category: &entry.category,
                    data_types: vec![entry],
                }),
            }
        }
        groups
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
