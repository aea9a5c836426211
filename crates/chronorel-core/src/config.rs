//! Configuration for the backing store and per-field associations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ChronoRelError, ChronoRelResult};

/// Default store tag used when none is configured.
pub const DEFAULT_STORE_TAG: &str = "default";

/// Configuration of the backing SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file; `:memory:` for an in-memory store.
    pub db_path: PathBuf,
    /// Identity of this store, checked against store-bound member references.
    pub store_tag: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(":memory:"),
            store_tag: DEFAULT_STORE_TAG.to_string(),
        }
    }
}

/// Configuration of one temporal association field on an owner entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Association field name; discriminates multiple associations per owner.
    pub field_name: String,
    /// Expected member entity kind; typed member references must match.
    /// `None` disables the kind check.
    pub member_kind: Option<String>,
    /// Record a version snapshot on every effective mutation.
    pub versions: bool,
    /// Mirror every open/close to the reverse direction (self-referential
    /// relations such as "friends of").
    pub symmetrical: bool,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            field_name: String::new(),
            member_kind: None,
            versions: false,
            symmetrical: false,
        }
    }
}

impl AssociationConfig {
    /// Create a configuration for the given field with everything else off.
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Default::default()
        }
    }

    /// Builder: set the expected member entity kind.
    pub fn member_kind(mut self, kind: impl Into<String>) -> Self {
        self.member_kind = Some(kind.into());
        self
    }

    /// Builder: enable version snapshots.
    pub fn with_versions(mut self) -> Self {
        self.versions = true;
        self
    }

    /// Builder: mark the association as symmetrical.
    pub fn symmetrical(mut self) -> Self {
        self.symmetrical = true;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ChronoRelResult<()> {
        if self.field_name.is_empty() {
            return Err(ChronoRelError::Configuration(
                "association field_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_store_config() {
        let config = StoreConfig::default();
        assert_eq!(config.db_path, PathBuf::from(":memory:"));
        assert_eq!(config.store_tag, DEFAULT_STORE_TAG);
    }

    #[test]
    fn test_association_config_builder() {
        let config = AssociationConfig::new("friends")
            .member_kind("user")
            .with_versions()
            .symmetrical();
        assert_eq!(config.field_name, "friends");
        assert_eq!(config.member_kind.as_deref(), Some("user"));
        assert!(config.versions);
        assert!(config.symmetrical);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_field_name_rejected() {
        let config = AssociationConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_json() {
        let config: AssociationConfig =
            serde_json::from_str(r#"{"field_name": "publications", "versions": true}"#).unwrap();
        assert_eq!(config.field_name, "publications");
        assert!(config.versions);
        assert!(!config.symmetrical);
    }
}
