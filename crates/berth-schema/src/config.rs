//! Resolver chain configuration.
//!
//! A configuration file lists resolvers in priority order:
//!
//! ```toml
//! [[resolvers]]
//! type = "mapping"
//! mappings_file = "container_mappings.toml"
//!
//! [[resolvers]]
//! type = "mulled"
//! namespace = "biocontainers"
//! ```
//!
//! The list may instead live in a separate file named by `resolvers_file`.
//! Files ending in `.json` are read as JSON with the same schema. Relative
//! paths are resolved against the directory of the file that declares them.

use crate::container::ContainerType;
use crate::mulled::HashVersion;
use crate::preset;
use crate::types::{ImageIdentifier, ToolId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the default configuration path.
pub const CONFIG_ENV: &str = "BERTH_CONFIG";

pub const DEFAULT_NAMESPACE: &str = "biocontainers";
pub const DEFAULT_REGISTRY: &str = "quay.io";
const DEFAULT_CACHE_DIRECTORY: &str = "container_cache";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    Syntax(String),
    #[error("resolver #{index} has unknown type '{resolver_type}'")]
    UnknownType { index: usize, resolver_type: String },
    #[error("resolver #{index} ({resolver_type}): {message}")]
    Invalid {
        index: usize,
        resolver_type: String,
        message: String,
    },
    #[error("duplicate mapping for tool '{tool_id}' and container type {container_type}")]
    DuplicateMapping {
        tool_id: String,
        container_type: ContainerType,
    },
    #[error("configuration sets both 'resolvers' and 'resolvers_file'")]
    AmbiguousSource,
    #[error("{} sets 'resolvers_file'; nested resolver files are not supported", path.display())]
    NestedResolversFile { path: PathBuf },
    #[error("configuration declares no resolvers")]
    NoResolvers,
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("HOME is not set")]
    HomeNotSet,
}

/// One `[[resolvers]]` entry as written: a type plus free-form parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverEntry {
    #[serde(rename = "type")]
    pub resolver_type: String,
    #[serde(flatten)]
    pub parameters: toml::Table,
}

impl ResolverEntry {
    pub fn new(resolver_type: &str) -> Self {
        Self {
            resolver_type: resolver_type.to_owned(),
            parameters: toml::Table::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.parameters.insert(key.to_owned(), value.into());
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    resolvers: Vec<ResolverEntry>,
    #[serde(default)]
    resolvers_file: Option<PathBuf>,
}

/// A `(tool_id, container_type)` override pointing at a literal image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingEntry {
    pub container_type: ContainerType,
    pub tool_id: ToolId,
    pub identifier: ImageIdentifier,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingFile {
    #[serde(default)]
    mappings: Vec<MappingEntry>,
}

/// How mulled image names are computed and where the images live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MulledSettings {
    pub hash_version: HashVersion,
    pub image_build: Option<String>,
    pub namespace: String,
    pub registry: String,
    pub container_type: ContainerType,
    /// Root of the local Singularity image cache.
    pub cache_directory: PathBuf,
}

impl Default for MulledSettings {
    fn default() -> Self {
        Self {
            hash_version: HashVersion::default(),
            image_build: None,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            registry: DEFAULT_REGISTRY.to_owned(),
            container_type: ContainerType::Docker,
            cache_directory: PathBuf::from(DEFAULT_CACHE_DIRECTORY),
        }
    }
}

/// Validated configuration of one resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverConfig {
    /// Display name, defaults to the resolver type.
    pub name: String,
    #[serde(flatten)]
    pub kind: ResolverKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverKind {
    Mapping {
        mappings: Vec<MappingEntry>,
    },
    Explicit {
        container_type: Option<ContainerType>,
    },
    Mulled(MulledSettings),
    CachedMulled {
        #[serde(flatten)]
        settings: MulledSettings,
        images: Vec<String>,
    },
    Fallback {
        identifier: ImageIdentifier,
        container_type: ContainerType,
    },
    FallbackNoRequirements {
        identifier: ImageIdentifier,
        container_type: ContainerType,
    },
    Conda {
        prefix: PathBuf,
        versionless: bool,
    },
    Packages {
        base_path: PathBuf,
    },
}

impl ResolverKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ResolverKind::Mapping { .. } => "mapping",
            ResolverKind::Explicit { .. } => "explicit",
            ResolverKind::Mulled(_) => "mulled",
            ResolverKind::CachedMulled { .. } => "cached_mulled",
            ResolverKind::Fallback { .. } => "fallback",
            ResolverKind::FallbackNoRequirements { .. } => "fallback_no_requirements",
            ResolverKind::Conda { .. } => "conda",
            ResolverKind::Packages { .. } => "packages",
        }
    }
}

// Per-type parameter tables. `name` is accepted by every type.

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingParams {
    name: Option<String>,
    mappings: Option<Vec<MappingEntry>>,
    mappings_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExplicitParams {
    name: Option<String>,
    container_type: Option<ContainerType>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MulledParams {
    name: Option<String>,
    #[serde(default)]
    hash_version: HashVersion,
    image_build: Option<toml::Value>,
    namespace: Option<String>,
    registry: Option<String>,
    container_type: Option<ContainerType>,
    cache_directory: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CachedMulledParams {
    name: Option<String>,
    #[serde(default)]
    hash_version: HashVersion,
    image_build: Option<toml::Value>,
    namespace: Option<String>,
    registry: Option<String>,
    container_type: Option<ContainerType>,
    cache_directory: Option<PathBuf>,
    #[serde(default)]
    images: Vec<String>,
    index_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FallbackParams {
    name: Option<String>,
    identifier: String,
    container_type: Option<ContainerType>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CondaParams {
    name: Option<String>,
    prefix: PathBuf,
    #[serde(default)]
    versionless: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackagesParams {
    name: Option<String>,
    base_path: PathBuf,
}

/// An ordered, validated resolver chain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverSpec {
    pub resolvers: Vec<ResolverConfig>,
    /// File the configuration was loaded from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl ResolverSpec {
    /// Validate raw entries. Relative paths are resolved against `base_dir`.
    pub fn from_entries(
        entries: &[ResolverEntry],
        base_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::NoResolvers);
        }
        let resolvers = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| validate_entry(index, entry, base_dir))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            resolvers,
            source: None,
        })
    }

    pub fn from_toml_str(input: &str, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(input).map_err(|e| ConfigError::Syntax(e.to_string()))?;
        Self::from_config_file(file, base_dir)
    }

    pub fn from_json_str(input: &str, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            serde_json::from_str(input).map_err(|e| ConfigError::Syntax(e.to_string()))?;
        Self::from_config_file(file, base_dir)
    }

    /// Build from an already-parsed structured value, e.g. a table embedded in
    /// a larger configuration document.
    pub fn from_value(value: toml::Value, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let file: ConfigFile = value
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Syntax(e.to_string()))?;
        Self::from_config_file(file, base_dir)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file: ConfigFile = read_structured(path)?;
        let mut spec = Self::from_config_file(file, path.parent())?;
        spec.source = Some(path.to_path_buf());
        Ok(spec)
    }

    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let preset =
            preset::get_preset(name).ok_or_else(|| ConfigError::UnknownPreset(name.to_owned()))?;
        Self::from_toml_str(preset.config, None)
    }

    /// Load the configuration named by `BERTH_CONFIG`, else
    /// `~/.config/berth/berth.toml`, else fall back to the default chain.
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(path);
        }
        let path = default_config_path()?;
        if path.is_file() {
            return Self::load(&path);
        }
        let mappings = path.with_file_name("container_mappings.toml");
        Self::default_chain(Some(&mappings).filter(|p| p.is_file()).map(PathBuf::as_path))
    }

    /// The `default` preset, with a mapping resolver in front when a mapping
    /// table is supplied.
    pub fn default_chain(mappings_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut spec = Self::preset(preset::DEFAULT_PRESET)?;
        if let Some(file) = mappings_file {
            let entry = ResolverEntry::new("mapping")
                .with("mappings_file", file.to_string_lossy().into_owned());
            let mapping = validate_entry(0, &entry, None)?;
            spec.resolvers.insert(0, mapping);
        }
        Ok(spec)
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    fn from_config_file(file: ConfigFile, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        match file.resolvers_file {
            Some(_) if !file.resolvers.is_empty() => Err(ConfigError::AmbiguousSource),
            Some(relative) => {
                let path = resolve_path(base_dir, relative);
                let nested: ConfigFile = read_structured(&path)?;
                if nested.resolvers_file.is_some() {
                    return Err(ConfigError::NestedResolversFile { path });
                }
                Self::from_entries(&nested.resolvers, path.parent())
            }
            None => Self::from_entries(&file.resolvers, base_dir),
        }
    }
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME").map_err(|_| ConfigError::HomeNotSet)?;
    Ok(PathBuf::from(home).join(".config/berth/berth.toml"))
}

/// Read a TOML file, or JSON when the extension is `.json`.
fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };
    if is_json(path) {
        serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))
    } else {
        toml::from_str(&content).map_err(|e| parse_err(e.to_string()))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn resolve_path(base_dir: Option<&Path>, path: PathBuf) -> PathBuf {
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    }
}

fn validate_entry(
    index: usize,
    entry: &ResolverEntry,
    base_dir: Option<&Path>,
) -> Result<ResolverConfig, ConfigError> {
    let resolver_type = entry.resolver_type.trim();
    let invalid = |message: String| ConfigError::Invalid {
        index,
        resolver_type: resolver_type.to_owned(),
        message,
    };
    let params = toml::Value::Table(entry.parameters.clone());

    let (name, kind) = match resolver_type {
        "mapping" => {
            let p: MappingParams = params.try_into().map_err(|e| invalid(e.to_string()))?;
            if p.mappings.is_none() && p.mappings_file.is_none() {
                return Err(invalid(
                    "either 'mappings' or 'mappings_file' is required".to_owned(),
                ));
            }
            let mut mappings = p.mappings.unwrap_or_default();
            if let Some(file) = p.mappings_file {
                let file: MappingFile = read_structured(&resolve_path(base_dir, file))?;
                mappings.extend(file.mappings);
            }
            if let Some(pos) = mappings
                .iter()
                .position(|m| m.tool_id.trim().is_empty() || m.identifier.trim().is_empty())
            {
                return Err(invalid(format!(
                    "mapping {pos} needs a non-empty 'tool_id' and 'identifier'"
                )));
            }
            check_duplicate_mappings(&mappings)?;
            (p.name, ResolverKind::Mapping { mappings })
        }
        "explicit" => {
            let p: ExplicitParams = params.try_into().map_err(|e| invalid(e.to_string()))?;
            (
                p.name,
                ResolverKind::Explicit {
                    container_type: p.container_type,
                },
            )
        }
        "mulled" => {
            let p: MulledParams = params.try_into().map_err(|e| invalid(e.to_string()))?;
            let settings = mulled_settings(
                p.hash_version,
                p.image_build,
                p.namespace,
                p.registry,
                p.container_type,
                p.cache_directory,
                base_dir,
            )
            .map_err(invalid)?;
            (p.name, ResolverKind::Mulled(settings))
        }
        "cached_mulled" => {
            let p: CachedMulledParams = params.try_into().map_err(|e| invalid(e.to_string()))?;
            let settings = mulled_settings(
                p.hash_version,
                p.image_build,
                p.namespace,
                p.registry,
                p.container_type,
                p.cache_directory,
                base_dir,
            )
            .map_err(invalid)?;
            let mut images = p.images;
            if let Some(file) = p.index_file {
                let path = resolve_path(base_dir, file);
                let content = fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                images.extend(parse_image_index(&content));
            }
            (p.name, ResolverKind::CachedMulled { settings, images })
        }
        "fallback" | "fallback_no_requirements" => {
            let p: FallbackParams = params.try_into().map_err(|e| invalid(e.to_string()))?;
            if p.identifier.trim().is_empty() {
                return Err(invalid("'identifier' must not be empty".to_owned()));
            }
            let identifier = ImageIdentifier::new(p.identifier.trim());
            let container_type = p.container_type.unwrap_or(ContainerType::Docker);
            let kind = if resolver_type == "fallback" {
                ResolverKind::Fallback {
                    identifier,
                    container_type,
                }
            } else {
                ResolverKind::FallbackNoRequirements {
                    identifier,
                    container_type,
                }
            };
            (p.name, kind)
        }
        "conda" => {
            let p: CondaParams = params.try_into().map_err(|e| invalid(e.to_string()))?;
            (
                p.name,
                ResolverKind::Conda {
                    prefix: resolve_path(base_dir, p.prefix),
                    versionless: p.versionless,
                },
            )
        }
        "packages" => {
            let p: PackagesParams = params.try_into().map_err(|e| invalid(e.to_string()))?;
            (
                p.name,
                ResolverKind::Packages {
                    base_path: resolve_path(base_dir, p.base_path),
                },
            )
        }
        other => {
            return Err(ConfigError::UnknownType {
                index,
                resolver_type: other.to_owned(),
            })
        }
    };

    let name = name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| kind.type_name().to_owned());
    Ok(ResolverConfig { name, kind })
}

fn mulled_settings(
    hash_version: HashVersion,
    image_build: Option<toml::Value>,
    namespace: Option<String>,
    registry: Option<String>,
    container_type: Option<ContainerType>,
    cache_directory: Option<PathBuf>,
    base_dir: Option<&Path>,
) -> Result<MulledSettings, String> {
    let defaults = MulledSettings::default();
    // Builds are commonly written as bare integers.
    let image_build = match image_build {
        None => None,
        Some(toml::Value::String(s)) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Some(toml::Value::Integer(n)) if n >= 0 => Some(n.to_string()),
        Some(other) => return Err(format!("invalid image_build '{other}'")),
    };
    let namespace = namespace.map_or(defaults.namespace, |n| n.trim().trim_matches('/').to_owned());
    if namespace.is_empty() {
        return Err("'namespace' must not be empty".to_owned());
    }
    let registry = registry.map_or(defaults.registry, |r| r.trim().trim_end_matches('/').to_owned());
    Ok(MulledSettings {
        hash_version,
        image_build,
        namespace,
        registry,
        container_type: container_type.unwrap_or(defaults.container_type),
        cache_directory: resolve_path(
            base_dir,
            cache_directory.unwrap_or(defaults.cache_directory),
        ),
    })
}

fn check_duplicate_mappings(mappings: &[MappingEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for m in mappings {
        if !seen.insert((m.tool_id.as_str(), m.container_type)) {
            return Err(ConfigError::DuplicateMapping {
                tool_id: m.tool_id.to_string(),
                container_type: m.container_type,
            });
        }
    }
    Ok(())
}

/// One image reference per line; blank lines and `#` comments are ignored.
pub fn parse_image_index(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_owned)
        .collect()
}
