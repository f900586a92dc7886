//! Resolvers that name containers after the tool's package set.

use crate::resolver::{Outcome, ResolutionContext, Resolver};
use crate::ResolverError;
use berth_schema::mulled::{image_name, parse_image_name, verify_identifier};
use berth_schema::{
    ContainerDescription, ContainerType, MulledSettings, PackageTarget, Requirement, Resolution,
};
use tracing::debug;

/// Full image reference for a mulled image name under `settings`.
pub fn image_reference(settings: &MulledSettings, name: &str) -> String {
    match settings.container_type {
        ContainerType::Docker if settings.registry.is_empty() => {
            format!("{}/{name}", settings.namespace)
        }
        ContainerType::Docker => format!("{}/{}/{name}", settings.registry, settings.namespace),
        ContainerType::Singularity => settings
            .cache_directory
            .join("singularity")
            .join("mulled")
            .join(name)
            .to_string_lossy()
            .into_owned(),
    }
}

/// The container type this resolver should answer for, if any.
fn applicable_type(settings: &MulledSettings, requirement: &Requirement) -> Option<ContainerType> {
    requirement
        .container_type
        .filter(|ct| requirement.is_container() && *ct == settings.container_type)
}

/// Computes the mulled image name and reports it without checking that the
/// image exists.
pub struct MulledResolver {
    name: String,
    settings: MulledSettings,
}

impl MulledResolver {
    pub fn new(name: String, settings: MulledSettings) -> Self {
        Self { name, settings }
    }
}

impl Resolver for MulledResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolver_type(&self) -> &'static str {
        "mulled"
    }

    fn try_resolve(
        &self,
        requirement: &Requirement,
        ctx: &ResolutionContext,
    ) -> Result<Outcome, ResolverError> {
        let Some(container_type) = applicable_type(&self.settings, requirement) else {
            return Ok(Outcome::Inapplicable);
        };
        let targets = ctx.targets();
        if targets.is_empty() {
            return Ok(Outcome::Unsatisfied);
        }
        let name = image_name(
            &targets,
            self.settings.hash_version,
            self.settings.image_build.as_deref(),
        )?;
        debug!("tool {} maps to mulled image {name}", ctx.tool_id);
        Ok(Outcome::Satisfied(Resolution::Container(
            ContainerDescription::new(image_reference(&self.settings, &name), container_type)
                .with_hash(name),
        )))
    }
}

/// Like [`MulledResolver`], but only answers when an image index lists a
/// matching image.
pub struct CachedMulledResolver {
    name: String,
    settings: MulledSettings,
    images: Vec<String>,
}

impl CachedMulledResolver {
    pub fn new(name: String, settings: MulledSettings, images: Vec<String>) -> Self {
        Self {
            name,
            settings,
            images,
        }
    }

    /// First index entry for `targets`, preferring the configured image build.
    fn find_cached(&self, targets: &[PackageTarget]) -> Result<Option<&str>, ResolverError> {
        let mut first = None;
        for image in &self.images {
            if !verify_identifier(image, targets)? {
                continue;
            }
            let wanted = self.settings.image_build.as_deref();
            let build = parse_image_name(image).and_then(|n| n.build().map(str::to_owned));
            if wanted.is_none() || build.as_deref() == wanted {
                return Ok(Some(image.as_str()));
            }
            first.get_or_insert(image.as_str());
        }
        Ok(first)
    }
}

impl Resolver for CachedMulledResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolver_type(&self) -> &'static str {
        "cached_mulled"
    }

    fn available(&self) -> bool {
        !self.images.is_empty()
    }

    fn try_resolve(
        &self,
        requirement: &Requirement,
        ctx: &ResolutionContext,
    ) -> Result<Outcome, ResolverError> {
        let Some(container_type) = applicable_type(&self.settings, requirement) else {
            return Ok(Outcome::Inapplicable);
        };
        let targets = ctx.targets();
        if targets.is_empty() {
            return Ok(Outcome::Unsatisfied);
        }
        let name = image_name(&targets, self.settings.hash_version, None)?;
        let Some(image) = self.find_cached(&targets)? else {
            debug!("mulled image {name} for tool {} is not cached", ctx.tool_id);
            return Ok(Outcome::Unsatisfied);
        };
        Ok(Outcome::Satisfied(Resolution::Container(
            ContainerDescription::new(image, container_type)
                .resolved()
                .with_hash(name),
        )))
    }
}
