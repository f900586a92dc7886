use crate::ResolverError;
use berth_schema::{
    targets_from_requirements, PackageTarget, Requirement, Resolution, ResolverConfig,
    ResolverKind, ToolId, ToolRequirements,
};

/// What a resolver made of one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The resolver does not handle this kind of requirement.
    Inapplicable,
    /// The resolver handles it but found nothing.
    Unsatisfied,
    Satisfied(Resolution),
}

impl Outcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Outcome::Satisfied(_))
    }
}

/// Per-tool facts a resolver may need beyond the requirement itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub tool_id: ToolId,
    /// The tool's package requirements, the input of mulled image names.
    pub packages: Vec<Requirement>,
}

impl ResolutionContext {
    pub fn new(tool_id: impl Into<ToolId>) -> Self {
        Self {
            tool_id: tool_id.into(),
            packages: Vec::new(),
        }
    }

    pub fn for_tool(tool: &ToolRequirements) -> Self {
        Self {
            tool_id: tool.id.clone(),
            packages: tool.packages().cloned().collect(),
        }
    }

    #[must_use]
    pub fn with_packages(mut self, packages: Vec<Requirement>) -> Self {
        self.packages = packages;
        self
    }

    pub fn targets(&self) -> Vec<PackageTarget> {
        targets_from_requirements(&self.packages)
    }
}

/// A single strategy for satisfying requirements.
///
/// Resolvers hold only immutable state and may be shared across threads.
pub trait Resolver: Send + Sync {
    /// Display name; defaults to the resolver type.
    fn name(&self) -> &str;

    fn resolver_type(&self) -> &'static str;

    /// Whether the resolver's backing data (directory, index) is present.
    fn available(&self) -> bool {
        true
    }

    fn try_resolve(
        &self,
        requirement: &Requirement,
        ctx: &ResolutionContext,
    ) -> Result<Outcome, ResolverError>;
}

pub fn select_resolver(config: &ResolverConfig) -> Box<dyn Resolver> {
    let name = config.name.clone();
    match &config.kind {
        ResolverKind::Mapping { mappings } => {
            Box::new(crate::mapping::MappingResolver::new(name, mappings))
        }
        ResolverKind::Explicit { container_type } => Box::new(
            crate::explicit::ExplicitResolver::new(name, *container_type),
        ),
        ResolverKind::Mulled(settings) => {
            Box::new(crate::mulled::MulledResolver::new(name, settings.clone()))
        }
        ResolverKind::CachedMulled { settings, images } => Box::new(
            crate::mulled::CachedMulledResolver::new(name, settings.clone(), images.clone()),
        ),
        ResolverKind::Fallback {
            identifier,
            container_type,
        } => Box::new(crate::fallback::FallbackResolver::new(
            name,
            identifier.clone(),
            *container_type,
        )),
        ResolverKind::FallbackNoRequirements {
            identifier,
            container_type,
        } => Box::new(crate::fallback::FallbackResolver::no_requirements(
            name,
            identifier.clone(),
            *container_type,
        )),
        ResolverKind::Conda {
            prefix,
            versionless,
        } => Box::new(crate::conda::CondaResolver::new(
            name,
            prefix.clone(),
            *versionless,
        )),
        ResolverKind::Packages { base_path } => Box::new(
            crate::packages::PackagesResolver::new(name, base_path.clone()),
        ),
    }
}
