//! Content-addressed ("mulled") container image names.
//!
//! A set of packages maps to exactly one image name:
//!
//! - one package: `name[:version[--build]]`, the plain single-package image
//! - several packages, v1: `mulled-v1-<hash>[:build]`
//! - several packages, v2: `mulled-v2-<package hash>[:<version hash>][-build]`
//!
//! Hashes are BLAKE3 digests of newline-joined, sorted input lines, truncated
//! to [`HASH_LEN`] hex characters. A package without a version contributes an
//! empty line to the version hash. The shape alone tells a consumer whether a
//! name covers one package or a package set.

use crate::normalize::{normalize_targets, PackageTarget};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MULLED_V1_PREFIX: &str = "mulled-v1-";
pub const MULLED_V2_PREFIX: &str = "mulled-v2-";
pub const HASH_LEN: usize = 40;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MulledError {
    #[error("package name must not be empty")]
    MissingName,
    #[error("no packages to derive an image name from")]
    NoTargets,
    #[error("invalid package spec '{0}', expected name[=version[=build]]")]
    InvalidSpec(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashVersion {
    V1,
    #[default]
    V2,
}

impl fmt::Display for HashVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashVersion::V1 => f.write_str("v1"),
            HashVersion::V2 => f.write_str("v2"),
        }
    }
}

/// Compute the image identifier for a set of (name, version) pairs.
///
/// Equivalent to [`v2_image_name`] without an image build.
pub fn compute_identifier<'a, I>(packages: I) -> Result<String, MulledError>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let targets: Vec<PackageTarget> = packages
        .into_iter()
        .map(|(name, version)| PackageTarget::new(name, version))
        .collect();
    v2_image_name(&targets, None)
}

pub fn image_name(
    targets: &[PackageTarget],
    version: HashVersion,
    image_build: Option<&str>,
) -> Result<String, MulledError> {
    match version {
        HashVersion::V1 => v1_image_name(targets, image_build),
        HashVersion::V2 => v2_image_name(targets, image_build),
    }
}

pub fn v1_image_name(
    targets: &[PackageTarget],
    image_build: Option<&str>,
) -> Result<String, MulledError> {
    let targets = normalize_targets(targets)?;
    match targets.as_slice() {
        [] => Err(MulledError::NoTargets),
        [single] => Ok(simple_image_name(single, image_build)),
        many => {
            let buffer = many
                .iter()
                .map(PackageTarget::conda_spec)
                .collect::<Vec<_>>()
                .join("\n");
            let suffix = image_build
                .filter(|b| !b.is_empty())
                .map(|b| format!(":{b}"))
                .unwrap_or_default();
            Ok(format!("{MULLED_V1_PREFIX}{}{suffix}", digest(&buffer)))
        }
    }
}

pub fn v2_image_name(
    targets: &[PackageTarget],
    image_build: Option<&str>,
) -> Result<String, MulledError> {
    let targets = normalize_targets(targets)?;
    match targets.as_slice() {
        [] => Err(MulledError::NoTargets),
        [single] => Ok(simple_image_name(single, image_build)),
        many => {
            let names = many
                .iter()
                .map(|t| t.package.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let package_hash = digest(&names);

            let version_hash = many.iter().any(|t| t.version.is_some()).then(|| {
                let versions = many
                    .iter()
                    .map(|t| t.version.as_deref().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\n");
                digest(&versions)
            });

            let build = image_build.filter(|b| !b.is_empty());
            let tag = match (version_hash, build) {
                (Some(v), Some(b)) => format!(":{v}-{b}"),
                (Some(v), None) => format!(":{v}"),
                (None, Some(b)) => format!(":{b}"),
                (None, None) => String::new(),
            };
            Ok(format!("{MULLED_V2_PREFIX}{package_hash}{tag}"))
        }
    }
}

fn simple_image_name(target: &PackageTarget, image_build: Option<&str>) -> String {
    let build = image_build
        .filter(|b| !b.is_empty())
        .or(target.build.as_deref());
    match (&target.version, build) {
        (Some(v), Some(b)) => format!("{}:{v}--{b}", target.package),
        (Some(v), None) => format!("{}:{v}", target.package),
        (None, _) => target.package.clone(),
    }
}

fn digest(buffer: &str) -> String {
    let hex = blake3::hash(buffer.as_bytes()).to_hex();
    hex.as_str()[..HASH_LEN].to_owned()
}

/// Structure of an image name, recovered by [`parse_image_name`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ImageName {
    Single {
        package: String,
        version: Option<String>,
        build: Option<String>,
    },
    V1 {
        hash: String,
        build: Option<String>,
    },
    V2 {
        package_hash: String,
        version_hash: Option<String>,
        build: Option<String>,
    },
}

impl ImageName {
    pub fn is_multi_package(&self) -> bool {
        !matches!(self, ImageName::Single { .. })
    }

    pub fn hash_version(&self) -> Option<HashVersion> {
        match self {
            ImageName::Single { .. } => None,
            ImageName::V1 { .. } => Some(HashVersion::V1),
            ImageName::V2 { .. } => Some(HashVersion::V2),
        }
    }

    pub fn build(&self) -> Option<&str> {
        match self {
            ImageName::Single { build, .. }
            | ImageName::V1 { build, .. }
            | ImageName::V2 { build, .. } => build.as_deref(),
        }
    }

    /// The same name with any image build removed.
    #[must_use]
    pub fn without_build(&self) -> ImageName {
        match self.clone() {
            ImageName::Single {
                package, version, ..
            } => ImageName::Single {
                package,
                version,
                build: None,
            },
            ImageName::V1 { hash, .. } => ImageName::V1 { hash, build: None },
            ImageName::V2 {
                package_hash,
                version_hash,
                ..
            } => ImageName::V2 {
                package_hash,
                version_hash,
                build: None,
            },
        }
    }
}

/// Recognise the shape of an image identifier.
///
/// Any registry, namespace or directory prefix is ignored; only the final
/// path segment is inspected. Returns `None` for an empty segment.
pub fn parse_image_name(identifier: &str) -> Option<ImageName> {
    let segment = identifier.trim().rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }

    if let Some(rest) = segment.strip_prefix(MULLED_V2_PREFIX) {
        let (package_hash, tag) = split_tag(rest);
        let (version_hash, build) = match tag {
            None => (None, None),
            Some(tag) if is_hash(tag.get(..HASH_LEN).unwrap_or_default()) => {
                let build = tag[HASH_LEN..]
                    .strip_prefix('-')
                    .filter(|b| !b.is_empty())
                    .map(str::to_owned);
                (Some(tag[..HASH_LEN].to_owned()), build)
            }
            Some(tag) => (None, Some(tag.to_owned())),
        };
        return Some(ImageName::V2 {
            package_hash: package_hash.to_owned(),
            version_hash,
            build,
        });
    }

    if let Some(rest) = segment.strip_prefix(MULLED_V1_PREFIX) {
        let (hash, build) = split_tag(rest);
        return Some(ImageName::V1 {
            hash: hash.to_owned(),
            build: build.map(str::to_owned),
        });
    }

    let (package, tag) = split_tag(segment);
    let (version, build) = match tag {
        None => (None, None),
        Some(tag) => match tag.split_once("--") {
            Some((v, b)) => (Some(v.to_owned()), Some(b.to_owned())),
            None => (Some(tag.to_owned()), None),
        },
    };
    Some(ImageName::Single {
        package: package.to_owned(),
        version,
        build,
    })
}

fn split_tag(segment: &str) -> (&str, Option<&str>) {
    match segment.split_once(':') {
        Some((name, tag)) if !tag.is_empty() => (name, Some(tag)),
        Some((name, _)) => (name, None),
        None => (segment, None),
    }
}

fn is_hash(s: &str) -> bool {
    s.len() == HASH_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Check that `identifier` names the image for `targets`, ignoring image builds.
pub fn verify_identifier(identifier: &str, targets: &[PackageTarget]) -> Result<bool, MulledError> {
    let Some(found) = parse_image_name(identifier) else {
        return Ok(false);
    };
    let version = found.hash_version().unwrap_or_default();
    let expected_name = image_name(targets, version, None)?;
    let expected = parse_image_name(&expected_name).ok_or(MulledError::NoTargets)?;
    Ok(found.without_build() == expected.without_build())
}
