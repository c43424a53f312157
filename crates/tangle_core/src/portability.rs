//! Cross-platform entry-name hazards.
//!
//! A name that is fine on the local filesystem may be unusable on another
//! platform that shares the repository. These checks never fail an
//! operation; hazards are collected and reported afterwards.

use crate::flags::flag_set;
use crate::repo_path::RepoPath;

flag_set! {
    /// Portability hazards found in an entry name.
    pub struct PortabilityFlags {
        /// Contains a character some platforms reject, or a control character.
        const INVALID_CHAR = 0x1, "invalid character";
        /// A reserved device name on Windows.
        const RESERVED_NAME = 0x2, "reserved name";
        /// Ends with a dot or a space.
        const TRAILING_DOT_OR_SPACE = 0x4, "trailing dot or space";
        /// Differs from a sibling only by letter case.
        const CASE_COLLISION = 0x8, "case-insensitive collision";
        /// Extended attributes could not be stored on this platform.
        const XATTRS_UNSUPPORTED = 0x10, "extended attributes unsupported";
    }
}

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &["CON", "PRN", "AUX", "NUL"];

/// A hazard found while applying a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortabilityWarning {
    /// The affected entry.
    pub path: RepoPath,
    /// What is wrong with it.
    pub flags: PortabilityFlags,
}

impl std::fmt::Display for PortabilityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.flags.names().join(", "))
    }
}

/// Checks one entry name against the names already present beside it.
pub fn check_name<'a>(name: &str, siblings: impl IntoIterator<Item = &'a str>) -> PortabilityFlags {
    let mut flags = PortabilityFlags::empty();

    if name.chars().any(|c| INVALID_CHARS.contains(&c) || c.is_control()) {
        flags.insert(PortabilityFlags::INVALID_CHAR);
    }
    if is_reserved(name) {
        flags.insert(PortabilityFlags::RESERVED_NAME);
    }
    if name.ends_with('.') || name.ends_with(' ') {
        flags.insert(PortabilityFlags::TRAILING_DOT_OR_SPACE);
    }

    let folded = name.to_lowercase();
    if siblings
        .into_iter()
        .any(|sibling| sibling != name && sibling.to_lowercase() == folded)
    {
        flags.insert(PortabilityFlags::CASE_COLLISION);
    }

    flags
}

fn is_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).to_ascii_uppercase();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        return true;
    }
    match stem.strip_prefix("COM").or_else(|| stem.strip_prefix("LPT")) {
        Some(digit) => digit.len() == 1 && matches!(digit.as_bytes()[0], b'1'..=b'9'),
        None => false,
    }
}
