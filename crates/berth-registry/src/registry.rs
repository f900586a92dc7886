use crate::{DependencyRef, DirectDependencies, LookupError, MetadataLookup};
use async_trait::async_trait;
use berth_schema::RepositoryKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// File-backed repository metadata: each known repository revision and its
/// direct dependencies.
///
/// ```json
/// {
///   "repositories": {
///     "shed.example.org/repos/iuc/bwa/0a1b2c": [
///       { "key": "shed.example.org/repos/iuc/package_zlib/9f8e7d", "prior_installation_required": true }
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    #[serde(default)]
    pub repositories: BTreeMap<RepositoryKey, Vec<DependencyRef>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, LookupError> {
        serde_json::from_slice(data)
            .map_err(|e| LookupError::Malformed(format!("invalid registry: {e}")))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LookupError> {
        serde_json::to_vec_pretty(self).map_err(|e| LookupError::Malformed(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Insert or replace the dependency list of `key`.
    pub fn publish(&mut self, key: RepositoryKey, dependencies: Vec<DependencyRef>) {
        self.repositories.insert(key, dependencies);
    }

    pub fn lookup(&self, key: &RepositoryKey) -> Option<&[DependencyRef]> {
        self.repositories.get(key).map(Vec::as_slice)
    }
}

#[async_trait]
impl MetadataLookup for Registry {
    async fn get_direct_dependencies(
        &self,
        key: &RepositoryKey,
    ) -> Result<DirectDependencies, LookupError> {
        self.lookup(key)
            .map(|deps| DirectDependencies::new(deps.to_vec()))
            .ok_or_else(|| LookupError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> RepositoryKey {
        RepositoryKey::new("shed.example.org", "iuc", name, "abc123").unwrap()
    }

    fn sample() -> Registry {
        let mut reg = Registry::new();
        reg.publish(
            key("bwa"),
            vec![DependencyRef::new(key("package_zlib")).prior()],
        );
        reg.publish(key("package_zlib"), vec![]);
        reg
    }

    #[test]
    fn registry_roundtrip() {
        let reg = sample();
        let bytes = reg.to_bytes().unwrap();
        let loaded = Registry::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, reg);
    }

    #[test]
    fn registry_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, sample().to_bytes().unwrap()).unwrap();
        assert_eq!(Registry::load(&path).unwrap(), sample());
    }

    #[test]
    fn registry_lookup() {
        let reg = sample();
        assert_eq!(reg.lookup(&key("bwa")).map(<[_]>::len), Some(1));
        assert_eq!(reg.lookup(&key("package_zlib")).map(<[_]>::len), Some(0));
        assert!(reg.lookup(&key("nonexistent")).is_none());
    }

    #[test]
    fn rejects_invalid_keys() {
        let data = br#"{"repositories": {"not-a-key": []}}"#;
        assert!(matches!(
            Registry::from_bytes(data),
            Err(LookupError::Malformed(_))
        ));
    }

    #[test]
    fn empty_registry_roundtrip() {
        let reg = Registry::new();
        let bytes = reg.to_bytes().unwrap();
        let loaded = Registry::from_bytes(&bytes).unwrap();
        assert!(loaded.repositories.is_empty());
    }

    #[tokio::test]
    async fn lookup_trait_reports_missing_keys() {
        let reg = sample();
        let deps = reg.get_direct_dependencies(&key("bwa")).await.unwrap();
        assert_eq!(deps.dependencies[0].key, key("package_zlib"));
        assert!(deps.dependencies[0].prior_installation_required);

        let err = reg
            .get_direct_dependencies(&key("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::NotFound(_)));
    }
}
