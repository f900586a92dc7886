use crate::resolver::{Outcome, ResolutionContext, Resolver};
use crate::ResolverError;
use berth_schema::{DependencyDescriptor, Requirement, RequirementKind, Resolution};
use std::path::{Path, PathBuf};

const ENV_SCRIPT: &str = "env.sh";
const DEFAULT_VERSION: &str = "default";
const ENVIRONMENT_SETTINGS: &str = "environment_settings";

/// Tool package directories laid out as `<base_path>/<name>/<version>`.
pub struct PackagesResolver {
    name: String,
    base_path: PathBuf,
}

impl PackagesResolver {
    pub fn new(name: String, base_path: PathBuf) -> Self {
        Self { name, base_path }
    }

    fn descriptor(
        &self,
        requirement: &Requirement,
        path: PathBuf,
        exact: bool,
    ) -> DependencyDescriptor {
        let script = path.join(ENV_SCRIPT);
        DependencyDescriptor {
            dependency_type: "packages".to_owned(),
            name: requirement.name.clone(),
            version: requirement.version.clone(),
            environment_script: script.is_file().then_some(script),
            path,
            exact,
        }
    }

    fn resolve_package(&self, requirement: &Requirement) -> Outcome {
        let package_dir = self.base_path.join(&requirement.name);
        if let Some(version) = requirement.version.as_deref() {
            let dir = package_dir.join(version);
            if is_installed(&dir) {
                return Outcome::Satisfied(Resolution::Dependency(
                    self.descriptor(requirement, dir, true),
                ));
            }
        }
        let default = package_dir.join(DEFAULT_VERSION);
        if is_installed(&default) {
            let exact = requirement.version.is_none();
            return Outcome::Satisfied(Resolution::Dependency(
                self.descriptor(requirement, default, exact),
            ));
        }
        Outcome::Unsatisfied
    }

    fn resolve_environment(&self, requirement: &Requirement) -> Outcome {
        let dir = self
            .base_path
            .join(ENVIRONMENT_SETTINGS)
            .join(&requirement.name);
        if dir.join(ENV_SCRIPT).is_file() {
            Outcome::Satisfied(Resolution::Dependency(self.descriptor(requirement, dir, true)))
        } else {
            Outcome::Unsatisfied
        }
    }
}

/// An install directory counts once it has an activation script or binaries.
fn is_installed(dir: &Path) -> bool {
    dir.join(ENV_SCRIPT).is_file() || dir.join("bin").is_dir()
}

impl Resolver for PackagesResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolver_type(&self) -> &'static str {
        "packages"
    }

    fn available(&self) -> bool {
        self.base_path.is_dir()
    }

    fn try_resolve(
        &self,
        requirement: &Requirement,
        _ctx: &ResolutionContext,
    ) -> Result<Outcome, ResolverError> {
        // Name and version are joined onto the base path.
        let escapes = |part: &str| part.contains(['/', '\\']) || part.starts_with('.');
        if escapes(&requirement.name) || requirement.version.as_deref().is_some_and(escapes) {
            return Ok(Outcome::Unsatisfied);
        }
        Ok(match requirement.kind {
            RequirementKind::Package => self.resolve_package(requirement),
            RequirementKind::SetEnvironment => self.resolve_environment(requirement),
            RequirementKind::Container => Outcome::Inapplicable,
        })
    }
}
