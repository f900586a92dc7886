use crate::repository::RepositoryKey;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub const PLAN_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PlanFileError {
    #[error("plan file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("plan file parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("plan file serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("unsupported plan_version {0}, expected {PLAN_VERSION}")]
    UnsupportedVersion(u32),
    #[error("plan has no steps")]
    Empty,
    #[error("plan root '{root}' is not the last step")]
    RootNotLast { root: String },
    #[error("step '{0}' appears more than once")]
    DuplicateStep(String),
    #[error("step '{step}' depends on '{dependency}', which is not installed before it")]
    OutOfOrder { step: String, dependency: String },
}

/// One repository in a dependency tree.
///
/// Children keep the order the repository declared them in. A subtree that
/// appears under several parents is the same `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryDependencyNode {
    pub key: RepositoryKey,
    pub prior_installation_required: bool,
    /// Why the metadata of this repository could not be fetched. Only set on
    /// leaves of partial plans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Arc<RepositoryDependencyNode>>,
}

impl RepositoryDependencyNode {
    pub fn leaf(key: RepositoryKey, prior_installation_required: bool) -> Self {
        Self {
            key,
            prior_installation_required,
            failure: None,
            children: Vec::new(),
        }
    }

    pub fn failed(key: RepositoryKey, prior_installation_required: bool, reason: String) -> Self {
        Self {
            failure: Some(reason),
            ..Self::leaf(key, prior_installation_required)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub key: RepositoryKey,
    #[serde(default)]
    pub prior_installation_required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<RepositoryKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Ordered installation steps for one root repository.
///
/// Steps are in post-order: every repository comes after all of its
/// dependencies, each repository appears once, and the root is last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationPlan {
    pub plan_version: u32,
    pub root: RepositoryKey,
    pub steps: Vec<PlanStep>,
}

impl InstallationPlan {
    /// Flatten a dependency tree into post-order steps, first occurrence wins.
    pub fn from_tree(root: &Arc<RepositoryDependencyNode>) -> Self {
        let mut steps = Vec::new();
        let mut emitted: HashSet<&RepositoryKey> = HashSet::new();
        // (node, index of the next child to descend into)
        let mut stack: Vec<(&RepositoryDependencyNode, usize)> = vec![(root.as_ref(), 0)];

        while let Some((node, next)) = stack.pop() {
            if let Some(child) = node.children.get(next) {
                stack.push((node, next + 1));
                if !emitted.contains(&child.key) {
                    stack.push((child.as_ref(), 0));
                }
                continue;
            }
            if emitted.insert(&node.key) {
                steps.push(PlanStep {
                    key: node.key.clone(),
                    prior_installation_required: node.prior_installation_required,
                    depends_on: node.children.iter().map(|c| c.key.clone()).collect(),
                    failure: node.failure.clone(),
                });
            }
        }

        Self {
            plan_version: PLAN_VERSION,
            root: root.key.clone(),
            steps,
        }
    }

    /// Rebuild the dependency tree the steps were flattened from.
    pub fn tree(&self) -> Result<Arc<RepositoryDependencyNode>, PlanFileError> {
        self.validate()?;
        let mut built: HashMap<&RepositoryKey, Arc<RepositoryDependencyNode>> = HashMap::new();
        for step in &self.steps {
            let children = step
                .depends_on
                .iter()
                .map(|dep| {
                    built.get(dep).cloned().ok_or_else(|| PlanFileError::OutOfOrder {
                        step: step.key.to_string(),
                        dependency: dep.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let node = Arc::new(RepositoryDependencyNode {
                key: step.key.clone(),
                prior_installation_required: step.prior_installation_required,
                failure: step.failure.clone(),
                children,
            });
            built.insert(&step.key, node);
        }
        built.remove(&self.root).ok_or(PlanFileError::Empty)
    }

    pub fn validate(&self) -> Result<(), PlanFileError> {
        if self.plan_version != PLAN_VERSION {
            return Err(PlanFileError::UnsupportedVersion(self.plan_version));
        }
        let last = self.steps.last().ok_or(PlanFileError::Empty)?;
        if last.key != self.root {
            return Err(PlanFileError::RootNotLast {
                root: self.root.to_string(),
            });
        }
        let mut seen: HashSet<&RepositoryKey> = HashSet::new();
        for step in &self.steps {
            for dep in &step.depends_on {
                if !seen.contains(dep) {
                    return Err(PlanFileError::OutOfOrder {
                        step: step.key.to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
            if !seen.insert(&step.key) {
                return Err(PlanFileError::DuplicateStep(step.key.to_string()));
            }
        }
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &RepositoryKey> {
        self.steps.iter().map(|s| &s.key)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(|s| s.failure.is_some())
    }

    pub fn is_partial(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn to_toml(&self) -> Result<String, PlanFileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), PlanFileError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| PlanFileError::Io(e.error))?;
        if let Ok(f) = fs::File::open(dir) {
            let _ = f.sync_all();
        }
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, PlanFileError> {
        let content = fs::read_to_string(path)?;
        let plan: InstallationPlan = toml::from_str(&content)?;
        plan.validate()?;
        Ok(plan)
    }
}
