use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::SyncError;

/// Placeholder used in the lookup table for codes with no canonical
/// counterpart in the registry.
pub const NOT_APPLICABLE: &str = "#N/A";

const LOCAL_CODE_COLUMN: usize = 0;
const CANONICAL_CODE_COLUMN: usize = 6;

/// Mapping from a provider-local institution code to the canonical registry
/// code. Built once at startup and shared read-only from then on.
#[derive(Debug, Default)]
pub struct InstitutionTable {
    mappings: HashMap<String, String>,
}

impl InstitutionTable {
    /// Loads the lookup CSV. The table is required: a missing file is fatal.
    ///
    /// Duplicate local codes keep the first real mapping seen; a `#N/A`
    /// placeholder is replaced by a later real value but never the reverse.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            return Err(SyncError::MissingInstitutionTable(path.to_path_buf()));
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|err| SyncError::InstitutionTableRead(err.to_string()))?;

        let mut mappings = HashMap::new();
        for row in reader.records() {
            let row = row.map_err(|err| SyncError::InstitutionTableRead(err.to_string()))?;
            let Some(local) = row.get(LOCAL_CODE_COLUMN) else {
                continue;
            };
            let Some(canonical) = row.get(CANONICAL_CODE_COLUMN) else {
                continue;
            };
            match mappings.get(local) {
                Some(existing) if existing != NOT_APPLICABLE => {}
                _ => {
                    mappings.insert(local.to_string(), canonical.to_string());
                }
            }
        }
        debug!(entries = mappings.len(), "institution table loaded");
        Ok(Self { mappings })
    }

    pub fn from_mappings(mappings: HashMap<String, String>) -> Self {
        Self { mappings }
    }

    /// Canonical code for a local code. Unknown codes and codes mapped to the
    /// `#N/A` placeholder translate to `None`; this never errors.
    pub fn translate(&self, local_code: &str) -> Option<&str> {
        match self.mappings.get(local_code) {
            Some(canonical) if canonical != NOT_APPLICABLE && !canonical.is_empty() => {
                Some(canonical.as_str())
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
