//! Requirement model, mulled image names, repository keys and configuration for Berth.
//!
//! This crate defines the schema layer: tool requirement parsing
//! (`ToolRequirements`), container descriptions, deterministic mulled image
//! identifiers (`compute_identifier`), repository keys and installation plans
//! (`InstallationPlan`), resolution results, resolver chain configuration
//! (`ResolverSpec`), and built-in chain presets.

pub mod config;
pub mod container;
pub mod mulled;
pub mod normalize;
pub mod plan;
pub mod preset;
pub mod repository;
pub mod requirement;
pub mod result;
pub mod types;

pub use config::{
    default_config_path, ConfigError, MappingEntry, MulledSettings, ResolverConfig, ResolverEntry,
    ResolverKind, ResolverSpec, CONFIG_ENV,
};
pub use container::{ContainerDescription, ContainerType, UnknownContainerType};
pub use mulled::{
    compute_identifier, image_name, parse_image_name, verify_identifier, HashVersion, ImageName,
    MulledError,
};
pub use normalize::{normalize_targets, targets_from_requirements, PackageTarget};
pub use plan::{InstallationPlan, PlanFileError, PlanStep, RepositoryDependencyNode};
pub use preset::{get_preset, list_presets, Preset, BUILTIN_PRESETS, DEFAULT_PRESET};
pub use repository::{
    normalize_tool_shed_url, validate_repository_name, RepositoryError, RepositoryKey,
};
pub use requirement::{
    parse_tool_file, parse_tool_str, Requirement, RequirementError, RequirementKind,
    ToolRequirements,
};
pub use result::{DependencyDescriptor, Resolution, ResolutionResult};
pub use types::{ImageIdentifier, ToolId};
