use crate::errors::{QueryError, Result};
use crate::model::{FieldName, SortDirection, SortKey};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine-specific names the assembler writes into every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssemblerConfig {
    /// Match-all query placed in `q`.
    pub base_query: String,
    /// Appended to every sort unless the caller already sorts on its field.
    pub default_sort: SortKey,
    /// Field that must be populated when attachment-less documents are suppressed.
    pub attachment_field: FieldName,
    /// Field whose filter is escaped and also declared as a facet.
    pub path_field: FieldName,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            base_query: "*:*".to_string(),
            default_sort: SortKey::new("sent_on_dt", SortDirection::Desc),
            attachment_field: "subject_s".to_string(),
            path_field: "path_s".to_string(),
        }
    }
}

impl AssemblerConfig {
    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(data).map_err(|e| QueryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&data)
    }

    fn validate(&self) -> Result<()> {
        if self.base_query.trim().is_empty() {
            return Err(QueryError::Config("baseQuery must not be empty".into()));
        }
        if self.default_sort.field.is_empty() {
            return Err(QueryError::Config("defaultSort.field must not be empty".into()));
        }
        Ok(())
    }
}
