use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("repository {0} must not be empty")]
    EmptyField(&'static str),
    #[error("repository name '{0}' may only contain lower-case letters, digits and '_'")]
    InvalidName(String),
    #[error("repository owner '{0}' must not contain '/'")]
    InvalidOwner(String),
    #[error("changeset revision '{0}' must be alphanumeric")]
    InvalidChangeset(String),
    #[error("invalid repository key '{0}', expected <tool_shed>/repos/<owner>/<name>/<changeset_revision>")]
    InvalidKey(String),
    #[error("'{0}' is a reserved word and cannot be used as a repository name")]
    ReservedName(String),
    #[error("repository names must be between 2 and 80 characters long (got {0})")]
    NameLength(usize),
}

/// Fully qualified repository revision: `(tool_shed, owner, name, changeset_revision)`.
///
/// The tool shed URL is stored without protocol, credentials or trailing
/// slashes, so `https://shed.example.org/` and `shed.example.org` are the
/// same key. The textual form doubles as the installation directory layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryKey {
    tool_shed: String,
    owner: String,
    name: String,
    changeset_revision: String,
}

impl RepositoryKey {
    pub fn new(
        tool_shed: &str,
        owner: &str,
        name: &str,
        changeset_revision: &str,
    ) -> Result<Self, RepositoryError> {
        let tool_shed = normalize_tool_shed_url(tool_shed);
        let owner = owner.trim();
        let name = name.trim();
        let changeset_revision = changeset_revision.trim();

        if tool_shed.is_empty() {
            return Err(RepositoryError::EmptyField("tool shed"));
        }
        if owner.is_empty() {
            return Err(RepositoryError::EmptyField("owner"));
        }
        if name.is_empty() {
            return Err(RepositoryError::EmptyField("name"));
        }
        if changeset_revision.is_empty() {
            return Err(RepositoryError::EmptyField("changeset revision"));
        }
        if owner.contains('/') {
            return Err(RepositoryError::InvalidOwner(owner.to_owned()));
        }
        if !name.chars().all(is_name_char) {
            return Err(RepositoryError::InvalidName(name.to_owned()));
        }
        if !changeset_revision.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RepositoryError::InvalidChangeset(
                changeset_revision.to_owned(),
            ));
        }

        Ok(Self {
            tool_shed,
            owner: owner.to_owned(),
            name: name.to_owned(),
            changeset_revision: changeset_revision.to_owned(),
        })
    }

    pub fn tool_shed(&self) -> &str {
        &self.tool_shed
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn changeset_revision(&self) -> &str {
        &self.changeset_revision
    }
}

impl fmt::Display for RepositoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/repos/{}/{}/{}",
            self.tool_shed, self.owner, self.name, self.changeset_revision
        )
    }
}

impl FromStr for RepositoryKey {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || RepositoryError::InvalidKey(s.to_owned());
        let (tool_shed, rest) = s
            .rfind("/repos/")
            .map(|idx| (&s[..idx], &s[idx + "/repos/".len()..]))
            .ok_or_else(invalid)?;
        let parts: Vec<&str> = rest.split('/').collect();
        let [owner, name, changeset_revision] = parts.as_slice() else {
            return Err(invalid());
        };
        RepositoryKey::new(tool_shed, owner, name, changeset_revision)
    }
}

impl TryFrom<String> for RepositoryKey {
    type Error = RepositoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepositoryKey> for String {
    fn from(key: RepositoryKey) -> Self {
        key.to_string()
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// Strip protocol, credentials and trailing slashes from a tool shed URL.
pub fn normalize_tool_shed_url(url: &str) -> String {
    let url = url.trim();
    let without_protocol = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest);
    let without_user = without_protocol
        .split_once('@')
        .filter(|(user, _)| !user.contains('/'))
        .map_or(without_protocol, |(_, rest)| rest);
    without_user.trim_end_matches('/').to_owned()
}

/// Check whether `name` qualifies as the name of a new repository.
pub fn validate_repository_name(name: &str) -> Result<(), RepositoryError> {
    if name.is_empty() || name == "None" {
        return Err(RepositoryError::EmptyField("name"));
    }
    if name == "repos" {
        return Err(RepositoryError::ReservedName(name.to_owned()));
    }
    let len = name.chars().count();
    if !(2..=80).contains(&len) {
        return Err(RepositoryError::NameLength(len));
    }
    if !name.chars().all(is_name_char) {
        return Err(RepositoryError::InvalidName(name.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_tool_shed_url() {
        let a = RepositoryKey::new("https://toolshed.example.org/", "iuc", "bwa", "abc123").unwrap();
        let b = RepositoryKey::new("toolshed.example.org", "iuc", "bwa", "abc123").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.tool_shed(), "toolshed.example.org");
        assert_eq!(
            normalize_tool_shed_url("http://user@shed.local:9009//"),
            "shed.local:9009"
        );
    }

    #[test]
    fn display_and_parse_roundtrip() {
        let key = RepositoryKey::new("shed.local:9009", "devteam", "package_samtools_1_2", "f5eb2a1c0e8d")
            .unwrap();
        let text = key.to_string();
        assert_eq!(text, "shed.local:9009/repos/devteam/package_samtools_1_2/f5eb2a1c0e8d");
        assert_eq!(text.parse::<RepositoryKey>().unwrap(), key);
    }

    #[test]
    fn parses_tool_shed_with_path() {
        let key: RepositoryKey = "https://example.org/shed/repos/iuc/bwa/0a1b2c".parse().unwrap();
        assert_eq!(key.tool_shed(), "example.org/shed");
        assert_eq!(key.owner(), "iuc");
        assert_eq!(key.name(), "bwa");
        assert_eq!(key.changeset_revision(), "0a1b2c");
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!("shed/iuc/bwa/abc".parse::<RepositoryKey>().is_err());
        assert!("shed/repos/iuc/bwa".parse::<RepositoryKey>().is_err());
        assert!("shed/repos/iuc/bwa/abc/extra".parse::<RepositoryKey>().is_err());
        assert!(matches!(
            RepositoryKey::new("shed", "iuc", "BWA", "abc"),
            Err(RepositoryError::InvalidName(_))
        ));
        assert!(matches!(
            RepositoryKey::new("shed", "iuc", "bwa", "ab-c"),
            Err(RepositoryError::InvalidChangeset(_))
        ));
        assert!(matches!(
            RepositoryKey::new("https://", "iuc", "bwa", "abc"),
            Err(RepositoryError::EmptyField("tool shed"))
        ));
    }

    #[test]
    fn serializes_as_string() {
        let key = RepositoryKey::new("shed", "iuc", "bwa", "abc").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"shed/repos/iuc/bwa/abc\"");
        let back: RepositoryKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<RepositoryKey>("\"not a key\"").is_err());
    }

    #[test]
    fn validates_new_repository_names() {
        assert!(validate_repository_name("column_maker").is_ok());
        assert_eq!(
            validate_repository_name("repos"),
            Err(RepositoryError::ReservedName("repos".to_owned()))
        );
        assert_eq!(validate_repository_name("a"), Err(RepositoryError::NameLength(1)));
        assert_eq!(
            validate_repository_name(&"x".repeat(81)),
            Err(RepositoryError::NameLength(81))
        );
        assert!(matches!(
            validate_repository_name("Column-Maker"),
            Err(RepositoryError::InvalidName(_))
        ));
        assert!(validate_repository_name("").is_err());
    }
}
