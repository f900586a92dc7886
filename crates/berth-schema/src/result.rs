use crate::container::ContainerDescription;
use crate::requirement::Requirement;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A native dependency found on disk (a conda environment or a tool package directory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    /// Resolver type that produced the descriptor, e.g. `conda` or `packages`.
    pub dependency_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub path: PathBuf,
    /// False when a versioned requirement was satisfied by a versionless install.
    pub exact: bool,
    /// Script that activates the dependency, if the install ships one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_script: Option<PathBuf>,
}

/// What a resolver produced for a satisfied requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Dependency(DependencyDescriptor),
    Container(ContainerDescription),
}

/// Outcome of resolving one requirement against a resolver chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub requirement: Requirement,
    pub satisfied: bool,
    /// Display name of the resolver that satisfied the requirement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<DependencyDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolutionResult {
    pub fn satisfied(requirement: Requirement, resolver_name: &str, resolution: Resolution) -> Self {
        let (dependency, container) = match resolution {
            Resolution::Dependency(d) => (Some(d), None),
            Resolution::Container(c) => (None, Some(c)),
        };
        Self {
            requirement,
            satisfied: true,
            resolver_name: Some(resolver_name.to_owned()),
            dependency,
            container,
            error: None,
        }
    }

    pub fn unsatisfied(requirement: Requirement) -> Self {
        Self {
            requirement,
            satisfied: false,
            resolver_name: None,
            dependency: None,
            container: None,
            error: None,
        }
    }

    pub fn failed(requirement: Requirement, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::unsatisfied(requirement)
        }
    }

    /// Short human-readable form of what the requirement resolved to.
    pub fn summary(&self) -> String {
        if let Some(c) = &self.container {
            let state = if c.resolved { "" } else { " (unverified)" };
            return format!("{}{state}", c.identifier);
        }
        if let Some(d) = &self.dependency {
            let exact = if d.exact { "" } else { " (inexact)" };
            return format!("{}{exact}", d.path.display());
        }
        match &self.error {
            Some(e) => format!("error: {e}"),
            None => "unsatisfied".to_owned(),
        }
    }
}
