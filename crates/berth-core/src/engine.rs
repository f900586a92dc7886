use crate::chain::ResolverChain;
use crate::CoreError;
use arc_swap::ArcSwap;
use berth_resolvers::ResolutionContext;
use berth_schema::{ContainerType, Requirement, ResolutionResult, ResolverSpec, ToolRequirements};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Availability of one configured resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverStatus {
    pub name: String,
    pub resolver_type: String,
    pub available: bool,
}

/// Shared entry point for requirement resolution.
///
/// The active chain sits behind an atomic pointer: readers take a snapshot
/// per call, and [`ResolutionEngine::reload`] swaps in a fully built chain.
/// An in-flight call keeps resolving against the chain it started with.
pub struct ResolutionEngine {
    chain: ArcSwap<ResolverChain>,
}

impl ResolutionEngine {
    pub fn new(spec: &ResolverSpec) -> Self {
        Self::from_chain(ResolverChain::from_spec(spec))
    }

    pub fn from_chain(chain: ResolverChain) -> Self {
        Self {
            chain: ArcSwap::from_pointee(chain),
        }
    }

    /// Engine for the user's configuration, see [`ResolverSpec::load_default`].
    pub fn load_default() -> Result<Self, CoreError> {
        Ok(Self::new(&ResolverSpec::load_default()?))
    }

    pub fn snapshot(&self) -> Arc<ResolverChain> {
        self.chain.load_full()
    }

    pub fn reload(&self, spec: &ResolverSpec) {
        let chain = ResolverChain::from_spec(spec);
        info!("resolver chain reloaded with {} resolvers", chain.len());
        self.chain.store(Arc::new(chain));
    }

    /// Load and validate a configuration file, then swap it in. On error the
    /// current chain stays active.
    pub fn reload_from_path(&self, path: &Path) -> Result<(), CoreError> {
        let spec = ResolverSpec::load(path)?;
        self.reload(&spec);
        Ok(())
    }

    pub fn resolve(&self, requirement: &Requirement, ctx: &ResolutionContext) -> ResolutionResult {
        self.chain.load().resolve(requirement, ctx)
    }

    /// Resolve every requirement against one chain snapshot.
    pub fn resolve_all(
        &self,
        requirements: &[Requirement],
        ctx: &ResolutionContext,
    ) -> Vec<ResolutionResult> {
        self.snapshot().resolve_all(requirements, ctx)
    }

    /// Resolve a tool's declared requirements, plus one container request per
    /// entry of `container_types` the tool does not already declare.
    pub fn resolve_tool(
        &self,
        tool: &ToolRequirements,
        container_types: &[ContainerType],
    ) -> Result<Vec<ResolutionResult>, CoreError> {
        let tool = tool.normalize()?;
        let ctx = ResolutionContext::for_tool(&tool);
        let mut requirements = tool.requirements.clone();
        for &ct in container_types {
            let requested = requirements
                .iter()
                .any(|r| r.is_container() && r.container_type == Some(ct));
            if !requested {
                requirements.push(Requirement::container(ct, ""));
            }
        }
        Ok(self.resolve_all(&requirements, &ctx))
    }

    pub fn status(&self) -> Vec<ResolverStatus> {
        self.chain
            .load()
            .resolvers()
            .map(|r| ResolverStatus {
                name: r.name().to_owned(),
                resolver_type: r.resolver_type().to_owned(),
                available: r.available(),
            })
            .collect()
    }
}
