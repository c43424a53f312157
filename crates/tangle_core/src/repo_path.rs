//! Working-copy-relative logical paths (`@/dir/file`).

use crate::error::{Result, TangleError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Component, Path, PathBuf};

const ROOT: &str = "@";

/// A path inside the working copy, rooted at `@`.
///
/// ```
/// use tangle_core::RepoPath;
///
/// let path = RepoPath::parse("@/src/main.rs").unwrap();
/// assert_eq!(path.file_name(), Some("main.rs"));
/// assert_eq!(path.parent().unwrap().as_str(), "@/src");
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoPath(String);

impl RepoPath {
    /// The working-copy root.
    pub fn root() -> Self {
        Self(ROOT.to_string())
    }

    /// Parses `@`, `@/a/b` or `@/a/b/` (trailing slash dropped).
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| TangleError::InvalidRepoPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        if s == ROOT || s == "@/" {
            return Ok(Self::root());
        }
        let rest = s
            .strip_prefix("@/")
            .ok_or_else(|| invalid("must start with '@/'"))?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let mut path = Self::root();
        for part in rest.split('/') {
            path = path.join(part).map_err(|_| invalid("bad component"))?;
        }
        Ok(path)
    }

    /// Builds a repo path from a filesystem path below `top`.
    pub fn from_fs_path(top: &Path, path: &Path) -> Result<Self> {
        let relative = path
            .strip_prefix(top)
            .map_err(|_| TangleError::InvalidRepoPath {
                path: path.display().to_string(),
                reason: format!("outside working copy {}", top.display()),
            })?;

        let mut repo_path = Self::root();
        for component in relative.components() {
            match component {
                Component::Normal(name) => {
                    let name = name.to_str().ok_or_else(|| TangleError::InvalidRepoPath {
                        path: path.display().to_string(),
                        reason: "not valid UTF-8".to_string(),
                    })?;
                    repo_path = repo_path.join(name)?;
                }
                Component::CurDir => {}
                _ => {
                    return Err(TangleError::InvalidRepoPath {
                        path: path.display().to_string(),
                        reason: "not normalized".to_string(),
                    })
                }
            }
        }
        Ok(repo_path)
    }

    /// Appends one entry name.
    pub fn join(&self, name: &str) -> Result<Self> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(TangleError::InvalidRepoPath {
                path: format!("{}/{}", self.0, name),
                reason: format!("invalid entry name '{}'", name),
            });
        }
        Ok(Self(format!("{}/{}", self.0, name)))
    }

    /// Returns true for `@`.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT
    }

    /// Returns the containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let idx = self.0.rfind('/')?;
        Some(Self(self.0[..idx].to_string()))
    }

    /// Returns the last component, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Iterates entry names from the root downward.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').skip(1)
    }

    /// Maps this path onto the filesystem below `top`.
    pub fn to_fs_path(&self, top: &Path) -> PathBuf {
        let mut path = top.to_path_buf();
        for name in self.components() {
            path.push(name);
        }
        path
    }

    /// Returns the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoPath({})", self.0)
    }
}

impl Serialize for RepoPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RepoPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RepoPath::parse(&s).map_err(serde::de::Error::custom)
    }
}
