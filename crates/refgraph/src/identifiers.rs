//! Newtype domain identifiers.
//!
//! Repository coordinates and graph node keys are distinct newtypes so that an
//! owner can never be passed where a repository name is expected, and a node
//! key is always produced by [`NodeKey::new`] rather than ad-hoc formatting.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Repository coordinates
// ---------------------------------------------------------------------------

string_id! {
    /// The account or organisation that owns a repository (e.g. `"octo"`).
    RepositoryOwner
}

string_id! {
    /// The repository name without its owner (e.g. `"hello"`).
    RepositoryName
}

/// A repository on the forge, identified by `owner/name`.
///
/// Every forge client and every crawl is scoped to exactly one repository;
/// references to other repositories are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Owning account or organisation.
    pub owner: RepositoryOwner,
    /// Repository name.
    pub name: RepositoryName,
}

impl RepositoryRef {
    /// Creates a [`RepositoryRef`], returning `None` if either part is empty.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Option<Self> {
        Some(Self {
            owner: RepositoryOwner::new(owner)?,
            name: RepositoryName::new(name)?,
        })
    }

    /// Returns `true` if `owner` and `name` are exactly this repository.
    pub fn matches(&self, owner: &str, name: &str) -> bool {
        self.owner.as_str() == owner && self.name.as_str() == name
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Error returned when parsing a repository slug that is not `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid repository '{0}': expected 'owner/name'")]
pub struct InvalidRepository(pub String);

impl FromStr for RepositoryRef {
    type Err = InvalidRepository;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| InvalidRepository(s.to_string()))?;
        if name.contains('/') {
            return Err(InvalidRepository(s.to_string()));
        }
        Self::new(owner, name).ok_or_else(|| InvalidRepository(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Graph identity
// ---------------------------------------------------------------------------

/// Whether a graph node is a plain issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A plain issue.
    Issue,
    /// A pull request.
    Pr,
}

impl NodeKind {
    /// The prefix used in [`NodeKey`] strings.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Issue => "issue",
            NodeKind::Pr => "pr",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable string identity of a graph node: `"<kind>:<owner>/<repo>#<number>"`.
///
/// Two nodes with the same kind, repository and number always produce the
/// same key, so the key is used directly as the node map index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Builds the key for `kind` number `number` in `repo`.
    pub fn new(kind: NodeKind, repo: &RepositoryRef, number: u64) -> Self {
        Self(format!("{}:{}/{}#{}", kind, repo.owner, repo.name, number))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Run identifiers
// ---------------------------------------------------------------------------

/// Identifies a single graph-build invocation.
///
/// Generated fresh for every crawl and attached to its tracing span so all
/// forge activity from one crawl can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrawlRunId(Uuid);

impl CrawlRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for CrawlRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_ref_parses_owner_and_name() {
        let repo: RepositoryRef = "octo/hello".parse().unwrap();
        assert_eq!(repo.owner.as_str(), "octo");
        assert_eq!(repo.name.as_str(), "hello");
        assert_eq!(repo.to_string(), "octo/hello");
    }

    #[test]
    fn test_repository_ref_rejects_malformed_slugs() {
        assert!("octo".parse::<RepositoryRef>().is_err());
        assert!("/hello".parse::<RepositoryRef>().is_err());
        assert!("octo/".parse::<RepositoryRef>().is_err());
        assert!("a/b/c".parse::<RepositoryRef>().is_err());
    }

    #[test]
    fn test_node_key_format() {
        let repo = RepositoryRef::new("octo", "hello").unwrap();
        assert_eq!(NodeKey::new(NodeKind::Pr, &repo, 7).as_str(), "pr:octo/hello#7");
        assert_eq!(
            NodeKey::new(NodeKind::Issue, &repo, 12).as_str(),
            "issue:octo/hello#12"
        );
    }
}
