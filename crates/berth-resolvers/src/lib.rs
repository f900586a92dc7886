//! Resolvers that turn tool requirements into dependencies or container images.
//!
//! This crate implements the strategy layer: the `Resolver` trait, one
//! implementation per configured resolver type (mapping overrides, declared
//! images, mulled images with and without an image index, fallback images,
//! conda environments, tool package directories), the `select_resolver`
//! factory, and host availability checks.

pub mod availability;
pub mod conda;
pub mod explicit;
pub mod fallback;
pub mod mapping;
pub mod mulled;
pub mod packages;
pub mod resolver;

pub use availability::{check_container_runtimes, format_missing, HostTool};
pub use resolver::{select_resolver, Outcome, ResolutionContext, Resolver};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("cannot compute image name: {0}")]
    Mulled(#[from] berth_schema::MulledError),
}
