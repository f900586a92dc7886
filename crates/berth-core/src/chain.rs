use berth_resolvers::{select_resolver, Outcome, ResolutionContext, Resolver};
use berth_schema::{Requirement, ResolutionResult, ResolverSpec};
use tracing::{debug, warn};

/// Resolvers in priority order. The first one that satisfies a requirement wins.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    pub fn from_spec(spec: &ResolverSpec) -> Self {
        Self::new(spec.resolvers.iter().map(select_resolver).collect())
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn resolvers(&self) -> impl Iterator<Item = &dyn Resolver> {
        self.resolvers.iter().map(|r| &**r)
    }

    /// Resolve one requirement.
    ///
    /// Nothing satisfying the requirement is not an error: the result is
    /// simply unsatisfied. A resolver error ends the walk for this
    /// requirement only and is reported in the result.
    pub fn resolve(&self, requirement: &Requirement, ctx: &ResolutionContext) -> ResolutionResult {
        let requirement = requirement.normalized();
        if let Err(e) = requirement.validate() {
            return ResolutionResult::failed(requirement, e);
        }

        for resolver in &self.resolvers {
            match resolver.try_resolve(&requirement, ctx) {
                Ok(Outcome::Satisfied(resolution)) => {
                    debug!(
                        "{requirement} for tool {} satisfied by {}",
                        ctx.tool_id,
                        resolver.name()
                    );
                    return ResolutionResult::satisfied(requirement, resolver.name(), resolution);
                }
                Ok(Outcome::Unsatisfied) => {
                    debug!("{} could not satisfy {requirement}", resolver.name());
                }
                Ok(Outcome::Inapplicable) => {}
                Err(e) => {
                    warn!("{} failed on {requirement}: {e}", resolver.name());
                    return ResolutionResult::failed(requirement, e);
                }
            }
        }

        debug!("no resolver satisfied {requirement} for tool {}", ctx.tool_id);
        ResolutionResult::unsatisfied(requirement)
    }

    /// One result per requirement, in input order.
    pub fn resolve_all(
        &self,
        requirements: &[Requirement],
        ctx: &ResolutionContext,
    ) -> Vec<ResolutionResult> {
        requirements.iter().map(|r| self.resolve(r, ctx)).collect()
    }
}
