use crate::mulled::MulledError;
use crate::requirement::{Requirement, RequirementKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A package (and optional version/build) that goes into a mulled image.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageTarget {
    pub package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

impl PackageTarget {
    pub fn new(package: &str, version: Option<&str>) -> Self {
        Self {
            package: package.to_owned(),
            version: version.map(str::to_owned),
            build: None,
        }
    }

    #[must_use]
    pub fn with_build(mut self, build: &str) -> Self {
        self.build = Some(build.to_owned());
        self
    }

    /// Canonical form: lower-case name, trimmed version with any build
    /// metadata (`1.3.1=py_1`, `1.3.1--py_1`) split off into `build`.
    ///
    /// Names may not contain whitespace, control characters, `=`, `:` or
    /// `--`. Versions and builds may not contain whitespace, control
    /// characters or `=` once the build is split off.
    pub fn normalize(&self) -> Result<PackageTarget, MulledError> {
        let package = self.package.trim().to_lowercase();
        if package.is_empty() {
            return Err(MulledError::MissingName);
        }
        if has_reserved_chars(&package, &['=', ':']) || package.contains("--") {
            return Err(MulledError::InvalidSpec(self.package.clone()));
        }

        let mut build = self
            .build
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_owned);

        let version = match self.version.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let (version, suffix) = split_build(raw);
                if build.is_none() {
                    build = suffix.map(str::to_owned);
                }
                Some(version.to_owned()).filter(|v| !v.is_empty())
            }
        };

        let target = PackageTarget {
            package,
            version,
            build,
        };
        let bad_field = [target.version.as_deref(), target.build.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| has_reserved_chars(field, &['=']));
        if bad_field {
            return Err(MulledError::InvalidSpec(self.to_string()));
        }
        Ok(target)
    }

    /// Conda-style spec: `name`, `name=version` or `name=version=build`.
    pub fn conda_spec(&self) -> String {
        match (&self.version, &self.build) {
            (Some(v), Some(b)) => format!("{}={v}={b}", self.package),
            (Some(v), None) => format!("{}={v}", self.package),
            (None, _) => self.package.clone(),
        }
    }
}

impl fmt::Display for PackageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.conda_spec())
    }
}

impl FromStr for PackageTarget {
    type Err = MulledError;

    /// Parse a conda-style spec (see [`PackageTarget::conda_spec`]).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '=');
        let package = parts.next().unwrap_or_default();
        let version = parts.next();
        let build = parts.next();
        if package.trim().is_empty() || version.is_some_and(|v| v.trim().is_empty()) {
            return Err(MulledError::InvalidSpec(s.to_owned()));
        }
        let mut target = PackageTarget::new(package, version);
        if let Some(b) = build {
            target = target.with_build(b);
        }
        target.normalize()
    }
}

fn has_reserved_chars(field: &str, separators: &[char]) -> bool {
    field
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || separators.contains(&c))
}

fn split_build(version: &str) -> (&str, Option<&str>) {
    if let Some((v, b)) = version.split_once("--") {
        return (v, Some(b).filter(|b| !b.is_empty()));
    }
    if let Some((v, b)) = version.split_once('=') {
        return (v, Some(b).filter(|b| !b.is_empty()));
    }
    (version, None)
}

/// Normalize, sort and drop repeated (name, version) pairs.
///
/// When a pair appears with several builds the smallest build is kept, so the
/// result does not depend on input order. Distinct versions of the same
/// package stay distinct.
pub fn normalize_targets(targets: &[PackageTarget]) -> Result<Vec<PackageTarget>, MulledError> {
    let mut out = targets
        .iter()
        .map(PackageTarget::normalize)
        .collect::<Result<Vec<_>, _>>()?;
    out.sort();
    out.dedup_by(|later, earlier| later.package == earlier.package && later.version == earlier.version);
    Ok(out)
}

/// Package targets for the package requirements of a tool, in declared order.
pub fn targets_from_requirements<'a>(
    requirements: impl IntoIterator<Item = &'a Requirement>,
) -> Vec<PackageTarget> {
    requirements
        .into_iter()
        .filter(|r| r.kind == RequirementKind::Package)
        .map(|r| PackageTarget::new(&r.name, r.version.as_deref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_sorts_deterministically() {
        let targets = vec![
            PackageTarget::new("Samtools", Some(" 1.3.1 ")),
            PackageTarget::new("bwa", Some("0.7.15")),
            PackageTarget::new("samtools", Some("1.3.1")),
        ];
        let normalized = normalize_targets(&targets).unwrap();
        assert_eq!(
            normalized,
            vec![
                PackageTarget::new("bwa", Some("0.7.15")),
                PackageTarget::new("samtools", Some("1.3.1")),
            ]
        );
    }

    #[test]
    fn splits_build_metadata_off_the_version() {
        let conda = PackageTarget::new("samtools", Some("1.3.1=py_1"))
            .normalize()
            .unwrap();
        assert_eq!(conda.version.as_deref(), Some("1.3.1"));
        assert_eq!(conda.build.as_deref(), Some("py_1"));

        let tagged = PackageTarget::new("samtools", Some("1.3.1--0"))
            .normalize()
            .unwrap();
        assert_eq!(tagged.version.as_deref(), Some("1.3.1"));
        assert_eq!(tagged.build.as_deref(), Some("0"));
    }

    #[test]
    fn explicit_build_wins_over_version_suffix() {
        let t = PackageTarget::new("bwa", Some("0.7.15--1"))
            .with_build("3")
            .normalize()
            .unwrap();
        assert_eq!(t.build.as_deref(), Some("3"));
        assert_eq!(t.version.as_deref(), Some("0.7.15"));
    }

    #[test]
    fn keeps_distinct_versions_of_one_package() {
        let targets = vec![
            PackageTarget::new("python", Some("3.9")),
            PackageTarget::new("python", Some("2.7")),
        ];
        let normalized = normalize_targets(&targets).unwrap();
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].version.as_deref(), Some("2.7"));
    }

    #[test]
    fn rejects_missing_name() {
        let targets = vec![PackageTarget::new("  ", Some("1.0"))];
        assert!(matches!(
            normalize_targets(&targets),
            Err(MulledError::MissingName)
        ));
    }

    #[test]
    fn repeated_pair_keeps_the_same_build_in_any_order() {
        let a = PackageTarget::new("samtools", Some("1.3=a"));
        let b = PackageTarget::new("samtools", Some("1.3=b"));
        let forward = normalize_targets(&[a.clone(), b.clone()]).unwrap();
        let reversed = normalize_targets(&[b, a]).unwrap();
        assert_eq!(forward, reversed);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].build.as_deref(), Some("a"));
    }

    #[test]
    fn rejects_separators_and_whitespace_in_names() {
        for name in ["a\nb", "a b", "a=1", "bwa:0.7", "a--b", "tab\tname"] {
            assert!(
                matches!(
                    PackageTarget::new(name, None).normalize(),
                    Err(MulledError::InvalidSpec(_))
                ),
                "{name:?} should be rejected"
            );
        }
        assert!(PackageTarget::new("  Samtools ", None).normalize().is_ok());
    }

    #[test]
    fn rejects_separators_and_whitespace_in_versions_and_builds() {
        assert!(PackageTarget::new("bwa", Some("0.7 15")).normalize().is_err());
        assert!(PackageTarget::new("bwa", Some("0.7=1=2")).normalize().is_err());
        assert!(PackageTarget::new("bwa", Some("0.7=1--2")).normalize().is_err());
        assert!(PackageTarget::new("bwa", Some("0.7\n1")).normalize().is_err());
        assert!(PackageTarget::new("bwa", Some("0.7"))
            .with_build("py 1")
            .normalize()
            .is_err());
        assert!(PackageTarget::new("bwa", Some("0.7.15--py_1")).normalize().is_ok());
    }

    #[test]
    fn parses_conda_specs() {
        let t: PackageTarget = "samtools=1.3.1=py_1".parse().unwrap();
        assert_eq!(t.conda_spec(), "samtools=1.3.1=py_1");
        let bare: PackageTarget = "BWA".parse().unwrap();
        assert_eq!(bare.conda_spec(), "bwa");
        assert!("=1.0".parse::<PackageTarget>().is_err());
        assert!("bwa=".parse::<PackageTarget>().is_err());
    }

    #[test]
    fn only_package_requirements_become_targets() {
        let reqs = vec![
            Requirement::package("bwa", Some("0.7.15")),
            Requirement::set_environment("JAVA_HOME"),
            Requirement::container(crate::ContainerType::Docker, "busybox"),
        ];
        let targets = targets_from_requirements(&reqs);
        assert_eq!(targets, vec![PackageTarget::new("bwa", Some("0.7.15"))]);
    }
}
