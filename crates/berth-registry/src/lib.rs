//! Repository dependency metadata for Berth installation plans.
//!
//! This crate provides the `MetadataLookup` interface the plan builder uses to
//! discover a repository's direct dependencies, a JSON file-backed registry of
//! repository metadata, an HTTP client for tool shed dependency endpoints, and
//! configuration for the remote endpoint with optional authentication.

pub mod config;
pub mod http;
pub mod registry;

pub use config::LookupConfig;
pub use http::HttpLookup;
pub use registry::Registry;

use async_trait::async_trait;
use berth_schema::RepositoryKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no metadata for repository '{0}'")]
    NotFound(String),
    #[error("metadata source unreachable: {0}")]
    Unreachable(String),
    #[error("malformed metadata: {0}")]
    Malformed(String),
    #[error("metadata I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One declared dependency of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub key: RepositoryKey,
    /// The dependency must be installed before its dependent.
    #[serde(default)]
    pub prior_installation_required: bool,
}

impl DependencyRef {
    pub fn new(key: RepositoryKey) -> Self {
        Self {
            key,
            prior_installation_required: false,
        }
    }

    #[must_use]
    pub fn prior(mut self) -> Self {
        self.prior_installation_required = true;
        self
    }
}

/// Direct dependencies of one repository, in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectDependencies {
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
}

impl DirectDependencies {
    pub fn new(dependencies: Vec<DependencyRef>) -> Self {
        Self { dependencies }
    }
}

/// Source of repository dependency metadata.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn get_direct_dependencies(
        &self,
        key: &RepositoryKey,
    ) -> Result<DirectDependencies, LookupError>;
}

#[async_trait]
impl<T: MetadataLookup + ?Sized> MetadataLookup for Arc<T> {
    async fn get_direct_dependencies(
        &self,
        key: &RepositoryKey,
    ) -> Result<DirectDependencies, LookupError> {
        (**self).get_direct_dependencies(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_ref_defaults_to_not_prior() {
        let json = r#"{"key": "shed/repos/iuc/bwa/abc"}"#;
        let dep: DependencyRef = serde_json::from_str(json).unwrap();
        assert!(!dep.prior_installation_required);
        assert!(DependencyRef::new(dep.key.clone()).prior().prior_installation_required);
    }

    #[test]
    fn direct_dependencies_default_to_empty() {
        let deps: DirectDependencies = serde_json::from_str("{}").unwrap();
        assert!(deps.dependencies.is_empty());
    }
}
