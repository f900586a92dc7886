use crate::resolver::{Outcome, ResolutionContext, Resolver};
use crate::ResolverError;
use berth_schema::{DependencyDescriptor, Requirement, RequirementKind, Resolution};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Marker used in place of a version for environments built without one.
pub const UNVERSIONED: &str = "_uv_";

/// Finds per-package environments under `<prefix>/envs/__<name>@<version>`.
pub struct CondaResolver {
    name: String,
    prefix: PathBuf,
    versionless: bool,
}

impl CondaResolver {
    pub fn new(name: String, prefix: PathBuf, versionless: bool) -> Self {
        Self {
            name,
            prefix,
            versionless,
        }
    }

    pub fn env_path(&self, package: &str, version: Option<&str>) -> PathBuf {
        self.prefix
            .join("envs")
            .join(format!("__{package}@{}", version.unwrap_or(UNVERSIONED)))
    }

    fn descriptor(&self, requirement: &Requirement, path: &Path, exact: bool) -> DependencyDescriptor {
        DependencyDescriptor {
            dependency_type: "conda".to_owned(),
            name: requirement.name.clone(),
            version: requirement.version.clone(),
            path: path.to_path_buf(),
            exact,
            environment_script: None,
        }
    }
}

impl Resolver for CondaResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolver_type(&self) -> &'static str {
        "conda"
    }

    fn available(&self) -> bool {
        self.prefix.is_dir()
    }

    fn try_resolve(
        &self,
        requirement: &Requirement,
        _ctx: &ResolutionContext,
    ) -> Result<Outcome, ResolverError> {
        if requirement.kind != RequirementKind::Package {
            return Ok(Outcome::Inapplicable);
        }

        if let Some(version) = requirement.version.as_deref() {
            let exact = self.env_path(&requirement.name, Some(version));
            if exact.is_dir() {
                return Ok(Outcome::Satisfied(Resolution::Dependency(
                    self.descriptor(requirement, &exact, true),
                )));
            }
        }
        if !self.versionless {
            debug!("no conda environment for {requirement}");
            return Ok(Outcome::Unsatisfied);
        }

        let unversioned = self.env_path(&requirement.name, None);
        if unversioned.is_dir() {
            let exact = requirement.version.is_none();
            return Ok(Outcome::Satisfied(Resolution::Dependency(
                self.descriptor(requirement, &unversioned, exact),
            )));
        }
        Ok(Outcome::Unsatisfied)
    }
}
