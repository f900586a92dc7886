use crate::types::ImageIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown container type '{0}', expected 'docker' or 'singularity'")]
pub struct UnknownContainerType(pub String);

/// Container technology an image identifier is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    Docker,
    Singularity,
}

impl ContainerType {
    pub const ALL: [ContainerType; 2] = [ContainerType::Docker, ContainerType::Singularity];

    pub fn as_str(self) -> &'static str {
        match self {
            ContainerType::Docker => "docker",
            ContainerType::Singularity => "singularity",
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerType {
    type Err = UnknownContainerType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docker" => Ok(ContainerType::Docker),
            "singularity" => Ok(ContainerType::Singularity),
            other => Err(UnknownContainerType(other.to_owned())),
        }
    }
}

/// A container image that satisfies a tool's container requirement.
///
/// `resolved` is true when the identifier names an image known to exist
/// (declared by the tool, mapped by configuration, or found in an image index).
/// A computed identifier that was not checked against anything stays unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescription {
    pub identifier: ImageIdentifier,
    pub container_type: ContainerType,
    pub resolved: bool,
    /// Mulled image name the identifier was derived from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl ContainerDescription {
    pub fn new(identifier: impl Into<ImageIdentifier>, container_type: ContainerType) -> Self {
        Self {
            identifier: identifier.into(),
            container_type,
            resolved: false,
            hash: None,
        }
    }

    #[must_use]
    pub fn resolved(mut self) -> Self {
        self.resolved = true;
        self
    }

    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }
}
