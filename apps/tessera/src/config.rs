//! # Configuration
//!
//! `tessera.toml`: where models are stored, the background schema, and the
//! annotation corpora used for model generation.
//!
//! ```toml
//! [store]
//! path = "tessera.db"
//!
//! [schema]
//! namespace = "http://purl.obolibrary.org/obo/"
//! classes = [{ id = "GO:0008150", label = "biological_process" }]
//! relations = [{ id = "BFO:0000050", label = "part of", alias = "part_of" }]
//!
//! [[corpus]]
//! name = "fb"
//! annotations = [{ gene = "FB:FBgn0000001", class = "GO:0008150" }]
//! ```
//!
//! A missing file, or a file without `[schema]`, uses the built-in schema.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tessera_core::{
    CorpusDefinition, ModelRegistry, RedbStore, Schema, SchemaDefinition, StaticCorpus,
    TesseraError,
};

/// Default database file.
pub const DEFAULT_STORE_PATH: &str = "tessera.db";

/// Maximum configuration file size (10 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// redb database holding persisted models.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    pub store: StoreConfig,
    pub schema: SchemaDefinition,
    pub corpus: Vec<CorpusDefinition>,
}

impl Default for TesseraConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            schema: SchemaDefinition::builtin(),
            corpus: Vec::new(),
        }
    }
}

impl TesseraConfig {
    /// Parse configuration text.
    pub fn from_toml(text: &str) -> Result<Self, TesseraError> {
        toml::from_str(text).map_err(|e| TesseraError::InvalidConfig(e.to_string()))
    }

    /// Load configuration from `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, TesseraError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| TesseraError::IoError(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(TesseraError::InvalidConfig(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| TesseraError::IoError(format!("Read config: {}", e)))?;
        Self::from_toml(&text)
    }

    /// Override the store path (the `--database` flag).
    #[must_use]
    pub fn with_store_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.store.path = path;
        }
        self
    }

    /// Resolve the schema, failing on invalid definitions.
    pub fn schema(&self) -> Result<Schema, TesseraError> {
        Schema::from_definition(&self.schema)
    }

    /// Build a registry over the configured redb store and corpora.
    pub fn build_registry(&self) -> Result<ModelRegistry, TesseraError> {
        let schema = Arc::new(self.schema()?);
        let store = RedbStore::open(&self.store.path)?;
        let corpus = StaticCorpus::from_definitions(&self.corpus);

        tracing::info!(
            store = %self.store.path.display(),
            corpora = self.corpus.len(),
            "model registry ready"
        );

        Ok(ModelRegistry::new(schema)
            .with_store(Arc::new(store))
            .with_corpus(Arc::new(corpus)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_uses_builtin_schema() {
        let config = TesseraConfig::from_toml("").expect("parse");
        assert_eq!(config, TesseraConfig::default());
        assert_eq!(config.schema, SchemaDefinition::builtin());
    }

    #[test]
    fn store_override_applies() {
        let config = TesseraConfig::default().with_store_path(Some(PathBuf::from("other.db")));
        assert_eq!(config.store.path, PathBuf::from("other.db"));

        let config = TesseraConfig::default().with_store_path(None);
        assert_eq!(config.store.path, PathBuf::from(DEFAULT_STORE_PATH));
    }

    #[test]
    fn malformed_text_is_invalid_config() {
        assert!(matches!(
            TesseraConfig::from_toml("[store\npath = 1"),
            Err(TesseraError::InvalidConfig(_))
        ));
    }
}
