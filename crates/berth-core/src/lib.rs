//! Requirement resolution and repository installation planning for Berth.
//!
//! [`ResolverChain`] walks configured resolvers in priority order;
//! [`ResolutionEngine`] shares one chain across threads and swaps it on reload.
//! [`build_plan`] expands a repository's dependency graph into an ordered
//! [`berth_schema::InstallationPlan`].

pub mod chain;
pub mod concurrency;
pub mod engine;
pub mod plan;

pub use chain::ResolverChain;
pub use concurrency::install_signal_handler;
pub use engine::{ResolutionEngine, ResolverStatus};
pub use plan::{build_plan, PlanError, PlanOptions, DEFAULT_CONCURRENCY};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] berth_schema::ConfigError),
    #[error("requirement error: {0}")]
    Requirement(#[from] berth_schema::RequirementError),
    #[error("resolver error: {0}")]
    Resolver(#[from] berth_resolvers::ResolverError),
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("lookup error: {0}")]
    Lookup(#[from] berth_registry::LookupError),
    #[error("plan file error: {0}")]
    PlanFile(#[from] berth_schema::PlanFileError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
