//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to the object store. All
//! repository reads flow through this interface, which returns strong types
//! and normalizes errors into typed failure categories.
//!
//! # Architecture
//!
//! The `Git` struct is the only way to interact with a Git repository.
//! No other module should import `git2` directly. Everything here is
//! read-only: the graph observes a repository, it never mutates one.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::ObjectNotFound`]: An id does not resolve to a commit
//! - [`GitError::Internal`]: Anything else libgit2 reports
//!
//! # Example
//!
//! ```ignore
//! use lanegraph::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! for entry in git.list_references()? {
//!     println!("{} -> {}", entry.name, entry.oid.short(7));
//! }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::graph::Commit;
use crate::core::types::{Oid, RefName, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) => GitError::InvalidRefName { message: msg },
        }
    }
}

/// A ref with its name and the commit it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    /// The full ref name
    pub name: RefName,
    /// The commit the ref peels to
    pub oid: Oid,
}

/// A stash entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashEntry {
    /// Position in the stash list (0 = most recent)
    pub index: usize,
    /// The stash commit
    pub oid: Oid,
}

/// Where HEAD points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadState {
    /// The branch HEAD is attached to (`None` when detached or unborn)
    pub branch: Option<RefName>,
    /// The commit HEAD resolves to (`None` when unborn)
    pub oid: Option<Oid>,
}

impl HeadState {
    /// Check if HEAD names a commit directly rather than through a branch.
    pub fn is_detached(&self) -> bool {
        self.branch.is_none() && self.oid.is_some()
    }
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. All repository
/// reads flow through this interface. No other module should import `git2`
/// directly.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository. Bare
    /// repositories are fine: the graph never needs a working tree.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// Path to the .git directory.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Path to the git directory shared by every worktree.
    ///
    /// Same as [`Git::git_dir`] except inside a linked worktree, where it is
    /// the main repository's git directory.
    pub fn common_dir(&self) -> &Path {
        self.repo.commondir()
    }

    /// Path to the working directory, if the repository has one.
    pub fn work_dir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    // =========================================================================
    // HEAD and Refs
    // =========================================================================

    /// Resolve HEAD.
    ///
    /// An unborn HEAD (fresh repository) resolves to an empty [`HeadState`].
    pub fn head(&self) -> Result<HeadState, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                return Ok(HeadState::default())
            }
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };

        let oid = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?
            .id();
        let branch = if head.is_branch() {
            head.name().map(RefName::new).transpose()?
        } else {
            None
        };

        Ok(HeadState {
            branch,
            oid: Some(Oid::new(oid.to_string())?),
        })
    }

    /// List every direct reference that peels to a commit.
    ///
    /// Annotated tags are peeled to the commit they name. Symbolic refs and
    /// the stash pseudo-reference are skipped; a detached HEAD is reported
    /// as a reference named `HEAD`.
    pub fn list_references(&self) -> Result<Vec<RefEntry>, GitError> {
        let refs = self.repo.references()?;

        let mut entries = Vec::new();
        for reference in refs {
            let reference = reference?;
            if reference.kind() != Some(git2::ReferenceType::Direct) {
                continue;
            }
            // Skip refs with non-UTF8 names
            let Some(name) = reference.name() else {
                continue;
            };
            if name == RefName::STASH {
                continue;
            }
            let Ok(ref_name) = RefName::new(name) else {
                continue;
            };
            // Tags on trees or blobs have no place in a commit graph
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };

            entries.push(RefEntry {
                name: ref_name,
                oid: Oid::new(commit.id().to_string())?,
            });
        }

        let head = self.head()?;
        if let (true, Some(oid)) = (head.is_detached(), head.oid) {
            entries.push(RefEntry {
                name: RefName::new(RefName::HEAD)?,
                oid,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// List stash entries, most recent first.
    ///
    /// Reads the reflog of `refs/stash`, which is where git keeps the stack.
    pub fn list_stashes(&self) -> Result<Vec<StashEntry>, GitError> {
        if self.repo.find_reference(RefName::STASH).is_err() {
            return Ok(Vec::new());
        }
        let reflog = self
            .repo
            .reflog(RefName::STASH)
            .map_err(|e| GitError::from_git2(e, RefName::STASH))?;

        reflog
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                Ok(StashEntry {
                    index,
                    oid: Oid::new(entry.id_new().to_string())?,
                })
            })
            .collect()
    }

    // =========================================================================
    // Commits
    // =========================================================================

    /// Read a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the id does not resolve to a commit
    pub fn commit(&self, oid: &Oid) -> Result<Commit, GitError> {
        let git_oid =
            git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        let commit = self
            .repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let author_time = chrono::DateTime::from_timestamp(commit.author().when().seconds(), 0)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH);
        let parents = commit
            .parent_ids()
            .map(|p| Oid::new(p.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Commit {
            oid: oid.clone(),
            parents,
            author_time,
            summary: commit.summary().unwrap_or("").to_string(),
        })
    }

    /// Walk history from `start`, leaving out everything reachable from `hide`.
    ///
    /// Hide ids that no longer resolve are skipped rather than failing the
    /// walk; start ids must all resolve. A start id that is also hidden
    /// yields nothing, as with `git rev-list`.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if a start id does not resolve
    pub fn walk(&self, start: &[Oid], hide: &[Oid]) -> Result<Vec<Oid>, GitError> {
        let mut revwalk = self.repo.revwalk()?;

        let mut pushed = 0;
        for oid in start {
            let git_oid = git2::Oid::from_str(oid.as_str())
                .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
            revwalk
                .push(git_oid)
                .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
            pushed += 1;
        }
        if pushed == 0 {
            return Ok(Vec::new());
        }

        for oid in hide {
            let Ok(git_oid) = git2::Oid::from_str(oid.as_str()) else {
                continue;
            };
            if self.repo.find_commit(git_oid).is_ok() {
                revwalk.hide(git_oid)?;
            }
        }

        revwalk
            .map(|id| {
                let id = id?;
                Ok(Oid::new(id.to_string())?)
            })
            .collect()
    }
}
