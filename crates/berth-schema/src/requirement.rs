use crate::container::ContainerType;
use crate::types::ToolId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequirementError {
    #[error("failed to read tool requirements: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tool requirements: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("tool id must not be empty")]
    EmptyToolId,
    #[error("{0} requirement name must not be empty")]
    EmptyName(RequirementKind),
    #[error("container requirement '{0}' does not declare a container_type")]
    MissingContainerType(String),
    #[error("requirement '{0}' declares a container_type but is not a container requirement")]
    UnexpectedContainerType(String),
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    #[default]
    Package,
    SetEnvironment,
    Container,
}

impl RequirementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequirementKind::Package => "package",
            RequirementKind::SetEnvironment => "set_environment",
            RequirementKind::Container => "container",
        }
    }
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single requirement declared by a tool.
///
/// For container requirements `name` is the image identifier the tool declared
/// and may be empty, meaning "any image of `container_type` for this tool".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requirement {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: RequirementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_type: Option<ContainerType>,
}

impl Requirement {
    pub fn package(name: &str, version: Option<&str>) -> Self {
        Self {
            name: name.trim().to_owned(),
            version: clean_version(version),
            kind: RequirementKind::Package,
            container_type: None,
        }
    }

    pub fn set_environment(name: &str) -> Self {
        Self {
            name: name.trim().to_owned(),
            version: None,
            kind: RequirementKind::SetEnvironment,
            container_type: None,
        }
    }

    /// A container requirement; pass an empty identifier to ask for any image.
    pub fn container(container_type: ContainerType, identifier: &str) -> Self {
        Self {
            name: identifier.trim().to_owned(),
            version: None,
            kind: RequirementKind::Container,
            container_type: Some(container_type),
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind == RequirementKind::Container
    }

    /// Trim whitespace and drop empty versions, leaving the requirement canonical.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            version: clean_version(self.version.as_deref()),
            kind: self.kind,
            container_type: self.container_type,
        }
    }

    pub fn validate(&self) -> Result<(), RequirementError> {
        match self.kind {
            RequirementKind::Container => {
                if self.container_type.is_none() {
                    return Err(RequirementError::MissingContainerType(self.name.clone()));
                }
            }
            kind => {
                if self.name.trim().is_empty() {
                    return Err(RequirementError::EmptyName(kind));
                }
                if self.container_type.is_some() {
                    return Err(RequirementError::UnexpectedContainerType(self.name.clone()));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.container_type) {
            (RequirementKind::Container, Some(ct)) if self.name.is_empty() => {
                write!(f, "{ct} container")
            }
            (RequirementKind::Container, Some(ct)) => write!(f, "{ct} container {}", self.name),
            _ => match &self.version {
                Some(v) => write!(f, "{}@{v} ({})", self.name, self.kind),
                None => write!(f, "{} ({})", self.name, self.kind),
            },
        }
    }
}

fn clean_version(version: Option<&str>) -> Option<String> {
    version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// The ordered requirement list of one tool, as produced by tool metadata parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolRequirements {
    pub id: ToolId,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl ToolRequirements {
    /// Normalize and validate every requirement, preserving declaration order.
    pub fn normalize(&self) -> Result<ToolRequirements, RequirementError> {
        if self.id.trim().is_empty() {
            return Err(RequirementError::EmptyToolId);
        }
        let requirements = self
            .requirements
            .iter()
            .map(|r| {
                let r = r.normalized();
                r.validate().map(|()| r)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ToolRequirements {
            id: ToolId::new(self.id.trim()),
            requirements,
        })
    }

    pub fn packages(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements
            .iter()
            .filter(|r| r.kind == RequirementKind::Package)
    }

    pub fn declares_container(&self, container_type: ContainerType) -> bool {
        self.requirements
            .iter()
            .any(|r| r.is_container() && r.container_type == Some(container_type))
    }
}

pub fn parse_tool_str(input: &str) -> Result<ToolRequirements, RequirementError> {
    let tool: ToolRequirements = toml::from_str(input)?;
    tool.normalize()
}

pub fn parse_tool_file(path: impl AsRef<Path>) -> Result<ToolRequirements, RequirementError> {
    let content = fs::read_to_string(path)?;
    parse_tool_str(&content)
}
