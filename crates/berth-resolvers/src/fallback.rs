use crate::resolver::{Outcome, ResolutionContext, Resolver};
use crate::ResolverError;
use berth_schema::{ContainerDescription, ContainerType, ImageIdentifier, Requirement, Resolution};

/// Answers every container request of one type with a fixed image.
pub struct FallbackResolver {
    name: String,
    identifier: ImageIdentifier,
    container_type: ContainerType,
    only_without_packages: bool,
}

impl FallbackResolver {
    pub fn new(name: String, identifier: ImageIdentifier, container_type: ContainerType) -> Self {
        Self {
            name,
            identifier,
            container_type,
            only_without_packages: false,
        }
    }

    /// Only answers for tools that declare no package requirements.
    pub fn no_requirements(
        name: String,
        identifier: ImageIdentifier,
        container_type: ContainerType,
    ) -> Self {
        Self {
            only_without_packages: true,
            ..Self::new(name, identifier, container_type)
        }
    }
}

impl Resolver for FallbackResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolver_type(&self) -> &'static str {
        if self.only_without_packages {
            "fallback_no_requirements"
        } else {
            "fallback"
        }
    }

    fn try_resolve(
        &self,
        requirement: &Requirement,
        ctx: &ResolutionContext,
    ) -> Result<Outcome, ResolverError> {
        if !requirement.is_container() || requirement.container_type != Some(self.container_type) {
            return Ok(Outcome::Inapplicable);
        }
        if self.only_without_packages && !ctx.packages.is_empty() {
            return Ok(Outcome::Inapplicable);
        }
        Ok(Outcome::Satisfied(Resolution::Container(
            ContainerDescription::new(self.identifier.clone(), self.container_type).resolved(),
        )))
    }
}
