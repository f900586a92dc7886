//! Installation plans for repository dependency graphs.
//!
//! Planning runs in two phases. Discovery fetches metadata level by level,
//! with up to `concurrency` lookups in flight and results merged in declared
//! order, so the plan never depends on which lookup finished first. Assembly
//! then walks the fetched graph depth-first with an explicit stack, detecting
//! cycles and sharing subtrees that are reached more than once.

use berth_registry::{DependencyRef, LookupError, MetadataLookup};
use berth_schema::{InstallationPlan, RepositoryDependencyNode, RepositoryKey};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("cyclic repository dependency: {}", format_path(path))]
    CyclicDependency {
        key: RepositoryKey,
        path: Vec<RepositoryKey>,
    },
    #[error("cannot look up dependencies of '{key}': {source}")]
    UnresolvableMetadataLookup {
        key: RepositoryKey,
        source: LookupError,
    },
    #[error("plan construction was cancelled")]
    Cancelled,
    #[error("lookup concurrency must be at least 1")]
    InvalidConcurrency,
}

fn format_path(path: &[RepositoryKey]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Maximum number of metadata lookups in flight.
    pub concurrency: usize,
    /// Keep repositories whose lookup failed as marked leaves instead of
    /// failing the whole plan.
    pub allow_partial: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            allow_partial: false,
        }
    }
}

enum Fetched {
    Dependencies(Vec<DependencyRef>),
    Failed(String),
}

/// Expand `root` into a post-order installation plan.
///
/// Every repository is looked up at most once. When `cancel` fires, pending
/// lookups are dropped and no plan is returned.
pub async fn build_plan(
    root: &RepositoryKey,
    lookup: &dyn MetadataLookup,
    options: PlanOptions,
    cancel: &CancellationToken,
) -> Result<InstallationPlan, PlanError> {
    if options.concurrency == 0 {
        return Err(PlanError::InvalidConcurrency);
    }
    let fetched = discover(root, lookup, options, cancel).await?;
    let tree = assemble(root, &fetched)?;
    let plan = InstallationPlan::from_tree(&tree);
    info!(
        "planned {} repositories for {root} ({} failed)",
        plan.steps.len(),
        plan.failures().count()
    );
    Ok(plan)
}

async fn discover(
    root: &RepositoryKey,
    lookup: &dyn MetadataLookup,
    options: PlanOptions,
    cancel: &CancellationToken,
) -> Result<HashMap<RepositoryKey, Fetched>, PlanError> {
    let mut fetched = HashMap::new();
    let mut seen: HashSet<RepositoryKey> = HashSet::from([root.clone()]);
    let mut level = vec![root.clone()];
    let mut depth = 0usize;

    while !level.is_empty() {
        if cancel.is_cancelled() {
            return Err(PlanError::Cancelled);
        }
        debug!("looking up {} repositories at depth {depth}", level.len());

        let lookups = stream::iter(&level)
            .map(|key| async move { (key, lookup.get_direct_dependencies(key).await) })
            .buffered(options.concurrency)
            .collect::<Vec<_>>();
        let results = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PlanError::Cancelled),
            results = lookups => results,
        };

        let mut next = Vec::new();
        for (key, result) in results {
            match result {
                Ok(direct) => {
                    let dependencies = dedup_dependencies(direct.dependencies);
                    for dep in &dependencies {
                        if seen.insert(dep.key.clone()) {
                            next.push(dep.key.clone());
                        }
                    }
                    fetched.insert(key.clone(), Fetched::Dependencies(dependencies));
                }
                Err(source) if options.allow_partial => {
                    warn!("dependencies of {key} are unknown, keeping it as a leaf: {source}");
                    fetched.insert(key.clone(), Fetched::Failed(source.to_string()));
                }
                Err(source) => {
                    return Err(PlanError::UnresolvableMetadataLookup {
                        key: key.clone(),
                        source,
                    });
                }
            }
        }
        level = next;
        depth += 1;
    }
    Ok(fetched)
}

/// Keep the first entry for each repository, in declared order.
fn dedup_dependencies(dependencies: Vec<DependencyRef>) -> Vec<DependencyRef> {
    let mut seen = HashSet::new();
    dependencies
        .into_iter()
        .filter(|d| seen.insert(d.key.clone()))
        .collect()
}

/// A repository whose children are being assembled.
struct Frame<'a> {
    key: &'a RepositoryKey,
    prior_installation_required: bool,
    failure: Option<&'a str>,
    dependencies: &'a [DependencyRef],
    next: usize,
    children: Vec<Arc<RepositoryDependencyNode>>,
}

impl<'a> Frame<'a> {
    fn open(
        key: &'a RepositoryKey,
        prior_installation_required: bool,
        fetched: &'a HashMap<RepositoryKey, Fetched>,
    ) -> Self {
        let (dependencies, failure) = match fetched.get(key) {
            Some(Fetched::Dependencies(deps)) => (deps.as_slice(), None),
            Some(Fetched::Failed(reason)) => (&[][..], Some(reason.as_str())),
            None => (&[][..], None),
        };
        Self {
            key,
            prior_installation_required,
            failure,
            dependencies,
            next: 0,
            children: Vec::new(),
        }
    }

    fn next_dependency(&mut self) -> Option<&'a DependencyRef> {
        let dependencies = self.dependencies;
        let dep = dependencies.get(self.next)?;
        self.next += 1;
        Some(dep)
    }

    fn close(self) -> Arc<RepositoryDependencyNode> {
        Arc::new(RepositoryDependencyNode {
            key: self.key.clone(),
            prior_installation_required: self.prior_installation_required,
            failure: self.failure.map(str::to_owned),
            children: self.children,
        })
    }
}

fn assemble<'a>(
    root: &'a RepositoryKey,
    fetched: &'a HashMap<RepositoryKey, Fetched>,
) -> Result<Arc<RepositoryDependencyNode>, PlanError> {
    let mut done: HashMap<&'a RepositoryKey, Arc<RepositoryDependencyNode>> = HashMap::new();
    let mut on_path: HashSet<&'a RepositoryKey> = HashSet::from([root]);
    // Ancestors of `current`, outermost first.
    let mut ancestors: Vec<Frame<'a>> = Vec::new();
    let mut current = Frame::open(root, false, fetched);

    loop {
        if let Some(dep) = current.next_dependency() {
            if let Some(node) = done.get(&dep.key) {
                current.children.push(Arc::clone(node));
                continue;
            }
            if on_path.contains(&dep.key) {
                let mut path: Vec<RepositoryKey> = ancestors
                    .iter()
                    .map(|f| f.key)
                    .chain(std::iter::once(current.key))
                    .skip_while(|k| *k != &dep.key)
                    .cloned()
                    .collect();
                path.push(dep.key.clone());
                return Err(PlanError::CyclicDependency {
                    key: dep.key.clone(),
                    path,
                });
            }
            on_path.insert(&dep.key);
            let child = Frame::open(&dep.key, dep.prior_installation_required, fetched);
            ancestors.push(std::mem::replace(&mut current, child));
            continue;
        }

        let key = current.key;
        on_path.remove(key);
        let node = current.close();
        match ancestors.pop() {
            Some(parent) => {
                current = parent;
                current.children.push(Arc::clone(&node));
                done.insert(key, node);
            }
            None => return Ok(node),
        }
    }
}
