use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{ConfsyncError, ConfsyncResult};

/// Parsed content of a watched configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigContent {
    /// JSON document
    Json(Value),
    /// YAML document, normalized to a JSON value tree
    Yaml(Value),
    /// Anything else, kept as opaque text
    Text(String),
}

impl ConfigContent {
    /// Parse raw file contents according to the path's extension
    pub fn parse(path: &Path, raw: &str) -> ConfsyncResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let value = serde_json::from_str(raw)
                    .map_err(|e| ConfsyncError::parse(format!("{}: {}", path.display(), e)))?;
                Ok(ConfigContent::Json(value))
            }
            Some("yaml") | Some("yml") => {
                let value: serde_yaml::Value = serde_yaml::from_str(raw)
                    .map_err(|e| ConfsyncError::parse(format!("{}: {}", path.display(), e)))?;
                // Documents that do not normalize (non-string keys) are parse failures
                let value = serde_json::to_value(value)
                    .map_err(|e| ConfsyncError::parse(format!("{}: {}", path.display(), e)))?;
                Ok(ConfigContent::Yaml(value))
            }
            _ => Ok(ConfigContent::Text(raw.to_string())),
        }
    }

    /// Canonical byte form used for hashing: compact JSON with ordered map
    /// keys for structured content, raw bytes for opaque text
    pub fn canonical_bytes(&self) -> ConfsyncResult<Vec<u8>> {
        match self {
            ConfigContent::Json(value) | ConfigContent::Yaml(value) => {
                Ok(serde_json::to_vec(value)?)
            }
            ConfigContent::Text(text) => Ok(text.as_bytes().to_vec()),
        }
    }

    /// Content digest over the canonical serialization
    pub fn digest(&self) -> ConfsyncResult<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes()?);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Render the content in its on-disk format
    pub fn to_file_string(&self) -> ConfsyncResult<String> {
        match self {
            ConfigContent::Json(value) => {
                let mut rendered = serde_json::to_string_pretty(value)?;
                rendered.push('\n');
                Ok(rendered)
            }
            ConfigContent::Yaml(value) => Ok(serde_yaml::to_string(value)?),
            ConfigContent::Text(text) => Ok(text.clone()),
        }
    }

    /// Object view for structured content
    pub fn as_object(&self) -> Option<&serde_json::Map<String, Value>> {
        match self {
            ConfigContent::Json(value) | ConfigContent::Yaml(value) => value.as_object(),
            ConfigContent::Text(_) => None,
        }
    }

    fn with_value(&self, value: Value) -> ConfigContent {
        match self {
            ConfigContent::Json(_) => ConfigContent::Json(value),
            ConfigContent::Yaml(_) => ConfigContent::Yaml(value),
            ConfigContent::Text(_) => ConfigContent::Text(value.to_string()),
        }
    }
}

/// Shallow key union of local and remote content, remote winning overlaps
/// and local-only keys retained.
///
/// Non-object and opaque content cannot union; those fall back to the
/// remote value outright, and the fallback is logged.
pub fn merge_shallow(local: Option<&ConfigContent>, remote: &ConfigContent) -> ConfigContent {
    if let (Some(local), Some(remote_obj)) = (local, remote.as_object()) {
        if let Some(local_obj) = local.as_object() {
            let mut merged = local_obj.clone();
            for (key, value) in remote_obj {
                merged.insert(key.clone(), value.clone());
            }
            return local.with_value(Value::Object(merged));
        }
    }
    warn!("content is not object-like on both sides, falling back to remote value");
    remote.clone()
}
