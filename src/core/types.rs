//! core::types
//!
//! Strong types for the commit graph.
//!
//! # Types
//!
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefName`] - Validated Git reference name
//!
//! # Validation
//!
//! These types enforce validity at construction time. An `Oid` that made it
//! into the graph is always a well-formed hex id, so adjacency maps never
//! have to deal with malformed keys.
//!
//! # Examples
//!
//! ```
//! use lanegraph::core::types::{Oid, RefName};
//!
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let refname = RefName::new("refs/heads/main").unwrap();
//! assert_eq!(refname.short_name(), "main");
//!
//! assert!(RefName::new("refs/heads/bad..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! # let _ = oid;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase, and order lexicographically. The
/// ordering is what breaks timestamp ties when commits are sorted.
///
/// # Example
///
/// ```
/// use lanegraph::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64
    /// character hex id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters, or the full OID if `len` exceeds it.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name.
///
/// Covers full names (`refs/heads/main`, `refs/tags/v1.0`,
/// `refs/remotes/origin/main`) as well as the bare `HEAD` used for a
/// detached head.
///
/// # Example
///
/// ```
/// use lanegraph::core::types::RefName;
///
/// let tag = RefName::new("refs/tags/v1.0").unwrap();
/// assert!(tag.is_tag());
/// assert_eq!(tag.short_name(), "v1.0");
///
/// let remote = RefName::new("refs/remotes/origin/main").unwrap();
/// assert_eq!(remote.short_name(), "origin/main");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// The stash pseudo-reference. Never part of the reference snapshot.
    pub const STASH: &'static str = "refs/stash";

    /// Name used for a detached HEAD.
    pub const HEAD: &'static str = "HEAD";

    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// The name with its namespace removed (`refs/heads/`, `refs/tags/`,
    /// `refs/remotes/`). Other names are returned unchanged.
    pub fn short_name(&self) -> &str {
        ["refs/heads/", "refs/tags/", "refs/remotes/"]
            .iter()
            .find_map(|prefix| self.0.strip_prefix(prefix))
            .unwrap_or(&self.0)
    }

    /// Check if this ref is a local branch.
    pub fn is_branch(&self) -> bool {
        self.0.starts_with("refs/heads/")
    }

    /// Check if this ref is a remote-tracking branch.
    pub fn is_remote(&self) -> bool {
        self.0.starts_with("refs/remotes/")
    }

    /// Check if this ref is a tag.
    pub fn is_tag(&self) -> bool {
        self.0.starts_with("refs/tags/")
    }

    /// Check if this is the stash pseudo-reference.
    pub fn is_stash(&self) -> bool {
        self.0 == Self::STASH
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let fail = |msg: &str| Err(TypeError::InvalidRefName(msg.to_string()));

        if name.is_empty() {
            return fail("ref name cannot be empty");
        }
        if name.starts_with('/') || name.ends_with('/') {
            return fail("ref name cannot start or end with '/'");
        }
        if name.ends_with(".lock") {
            return fail("ref name cannot end with '.lock'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidRefName(format!(
                    "ref name cannot contain '{bad}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidRefName(format!(
                "ref name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return fail("ref name cannot contain control characters");
        }
        if name
            .split('/')
            .any(|component| component.starts_with('.') || component.ends_with(".lock"))
        {
            return fail("path component cannot start with '.' or end with '.lock'");
        }

        Ok(())
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod oid {
        use super::*;

        #[test]
        fn sha1_and_sha256_accepted() {
            assert!(Oid::new("a".repeat(40)).is_ok());
            assert!(Oid::new("0".repeat(64)).is_ok());
        }

        #[test]
        fn wrong_length_rejected() {
            assert!(Oid::new("abc").is_err());
            assert!(Oid::new("a".repeat(41)).is_err());
        }

        #[test]
        fn non_hex_rejected() {
            assert!(Oid::new("g".repeat(40)).is_err());
        }

        #[test]
        fn normalized_to_lowercase() {
            let oid = Oid::new("ABCDEF".repeat(6) + "ABCD").unwrap();
            assert_eq!(oid.as_str(), "abcdef".repeat(6) + "abcd");
        }

        #[test]
        fn short_clamps_to_length() {
            let oid = Oid::new("1234567890".repeat(4)).unwrap();
            assert_eq!(oid.short(6), "123456");
            assert_eq!(oid.short(100).len(), 40);
        }

        #[test]
        fn orders_lexicographically() {
            let low = Oid::new("0".repeat(40)).unwrap();
            let high = Oid::new("f".repeat(40)).unwrap();
            assert!(low < high);
        }
    }

    mod ref_name {
        use super::*;

        #[test]
        fn common_names_accepted() {
            assert!(RefName::new("refs/heads/main").is_ok());
            assert!(RefName::new("refs/remotes/origin/feature/x").is_ok());
            assert!(RefName::new("refs/tags/v1.2.3").is_ok());
            assert!(RefName::new("HEAD").is_ok());
        }

        #[test]
        fn malformed_names_rejected() {
            assert!(RefName::new("").is_err());
            assert!(RefName::new("refs/heads/a..b").is_err());
            assert!(RefName::new("refs/heads/").is_err());
            assert!(RefName::new("refs/heads/x.lock").is_err());
            assert!(RefName::new("refs/heads/has space").is_err());
            assert!(RefName::new("refs/heads/.hidden").is_err());
        }

        #[test]
        fn short_name_strips_namespace() {
            let branch = RefName::new("refs/heads/feature/a").unwrap();
            assert_eq!(branch.short_name(), "feature/a");
            let head = RefName::new("HEAD").unwrap();
            assert_eq!(head.short_name(), "HEAD");
        }

        #[test]
        fn classification() {
            assert!(RefName::new("refs/heads/main").unwrap().is_branch());
            assert!(RefName::new("refs/remotes/origin/main").unwrap().is_remote());
            assert!(RefName::new("refs/tags/v1").unwrap().is_tag());
            assert!(RefName::new(RefName::STASH).unwrap().is_stash());
        }
    }
}
