//! Permission-attribute bits and extended-attribute sets.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// An extended-attribute set: attribute name to raw value.
pub type XattrSet = BTreeMap<String, Vec<u8>>;

/// Versioned permission bits of an entry.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(u32);

impl Attrs {
    /// No attribute bits.
    pub const NONE: Self = Self(0);
    /// The entry is executable.
    pub const EXECUTABLE: Self = Self(0x1);

    /// Builds attrs from raw bits.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Debug for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attrs({:#x})", self.0)
    }
}

impl fmt::Display for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::EXECUTABLE) {
            f.write_str("+x")
        } else {
            f.write_str("-x")
        }
    }
}

/// Applies attribute bits to a regular file. Directories and symlinks are
/// left alone.
pub fn apply_attrs(path: &Path, attrs: Attrs) -> Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.file_type().is_file() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = metadata.permissions().mode();
        let new_mode = if attrs.contains(Attrs::EXECUTABLE) {
            mode | ((mode & 0o444) >> 2)
        } else {
            mode & !0o111
        };
        if new_mode != mode {
            fs::set_permissions(path, fs::Permissions::from_mode(new_mode))?;
        }
    }

    #[cfg(not(unix))]
    let _ = attrs;

    Ok(())
}

/// Result of applying an extended-attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XattrOutcome {
    /// The on-disk set now equals the requested set.
    Applied,
    /// The platform or filesystem cannot store extended attributes.
    Unsupported,
}

/// Makes the `user.` extended attributes of `path` equal to `set`.
///
/// Names outside the `user.` namespace are never removed.
pub fn apply_xattrs(path: &Path, set: &XattrSet) -> Result<XattrOutcome> {
    platform::apply(path, set)
}

#[cfg(unix)]
mod platform {
    use super::{XattrOutcome, XattrSet};
    use crate::error::Result;
    use std::io;
    use std::path::Path;

    // The xattr calls below act on a symlink itself, never its target.
    pub(super) fn apply(path: &Path, set: &XattrSet) -> Result<XattrOutcome> {
        let existing = match xattr::list(path) {
            Ok(names) => names,
            Err(e) if is_unsupported(&e) => {
                return Ok(if set.is_empty() {
                    XattrOutcome::Applied
                } else {
                    XattrOutcome::Unsupported
                });
            }
            Err(e) => return Err(e.into()),
        };

        for name in existing {
            let stale = name
                .to_str()
                .is_some_and(|n| n.starts_with("user.") && !set.contains_key(n));
            if stale {
                xattr::remove(path, &name)?;
            }
        }

        for (name, value) in set {
            match xattr::set(path, name, value) {
                Ok(()) => {}
                Err(e) if is_unsupported(&e) => return Ok(XattrOutcome::Unsupported),
                Err(e) => return Err(e.into()),
            }
        }

        Ok(XattrOutcome::Applied)
    }

    fn is_unsupported(err: &io::Error) -> bool {
        err.raw_os_error() == Some(libc::ENOTSUP)
    }
}

#[cfg(not(unix))]
mod platform {
    use super::{XattrOutcome, XattrSet};
    use crate::error::Result;
    use std::path::Path;

    pub(super) fn apply(_path: &Path, set: &XattrSet) -> Result<XattrOutcome> {
        if set.is_empty() {
            Ok(XattrOutcome::Applied)
        } else {
            Ok(XattrOutcome::Unsupported)
        }
    }
}
