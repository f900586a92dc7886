use crate::resolver::{Outcome, ResolutionContext, Resolver};
use crate::ResolverError;
use berth_schema::{ContainerDescription, ContainerType, Requirement, Resolution};

/// Uses the image the tool declared in its own container requirement.
pub struct ExplicitResolver {
    name: String,
    container_type: Option<ContainerType>,
}

impl ExplicitResolver {
    pub fn new(name: String, container_type: Option<ContainerType>) -> Self {
        Self {
            name,
            container_type,
        }
    }
}

/// Singularity pulls registry images through `docker://`; local image paths
/// and URIs with a scheme are passed through untouched.
fn singularity_identifier(identifier: &str) -> String {
    let is_local = identifier.starts_with('/') || identifier.starts_with('.');
    if is_local || identifier.contains("://") {
        identifier.to_owned()
    } else {
        format!("docker://{identifier}")
    }
}

impl Resolver for ExplicitResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolver_type(&self) -> &'static str {
        "explicit"
    }

    fn try_resolve(
        &self,
        requirement: &Requirement,
        _ctx: &ResolutionContext,
    ) -> Result<Outcome, ResolverError> {
        let Some(container_type) = requirement.container_type.filter(|_| requirement.is_container())
        else {
            return Ok(Outcome::Inapplicable);
        };
        if self.container_type.is_some_and(|ct| ct != container_type) {
            return Ok(Outcome::Inapplicable);
        }
        if requirement.name.is_empty() {
            return Ok(Outcome::Unsatisfied);
        }
        let identifier = match container_type {
            ContainerType::Docker => requirement.name.clone(),
            ContainerType::Singularity => singularity_identifier(&requirement.name),
        };
        Ok(Outcome::Satisfied(Resolution::Container(
            ContainerDescription::new(identifier, container_type).resolved(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(resolver: &ExplicitResolver, req: &Requirement) -> Outcome {
        resolver
            .try_resolve(req, &ResolutionContext::new("t"))
            .unwrap()
    }

    #[test]
    fn declared_docker_image_is_used_verbatim() {
        let r = ExplicitResolver::new("explicit".to_owned(), None);
        let req = Requirement::container(ContainerType::Docker, "quay.io/biocontainers/bwa:0.7.15--0");
        let Outcome::Satisfied(Resolution::Container(desc)) = resolve(&r, &req) else {
            panic!("expected a container");
        };
        assert_eq!(desc.identifier.as_str(), "quay.io/biocontainers/bwa:0.7.15--0");
        assert!(desc.resolved);
    }

    #[test]
    fn singularity_gets_docker_scheme_for_registry_images() {
        let r = ExplicitResolver::new("explicit".to_owned(), None);
        let registry = Requirement::container(ContainerType::Singularity, "busybox:1.36");
        let local = Requirement::container(ContainerType::Singularity, "/images/busybox.sif");
        let shub = Requirement::container(ContainerType::Singularity, "shub://org/img");

        let id = |o: Outcome| match o {
            Outcome::Satisfied(Resolution::Container(d)) => d.identifier.into_inner(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(id(resolve(&r, &registry)), "docker://busybox:1.36");
        assert_eq!(id(resolve(&r, &local)), "/images/busybox.sif");
        assert_eq!(id(resolve(&r, &shub)), "shub://org/img");
    }

    #[test]
    fn container_type_filter() {
        let r = ExplicitResolver::new("explicit_singularity".to_owned(), Some(ContainerType::Singularity));
        let req = Requirement::container(ContainerType::Docker, "busybox");
        assert_eq!(resolve(&r, &req), Outcome::Inapplicable);
    }

    #[test]
    fn undeclared_image_is_unsatisfied() {
        let r = ExplicitResolver::new("explicit".to_owned(), None);
        assert_eq!(
            resolve(&r, &Requirement::container(ContainerType::Docker, "")),
            Outcome::Unsatisfied
        );
        assert_eq!(
            resolve(&r, &Requirement::package("bwa", None)),
            Outcome::Inapplicable
        );
    }
}
