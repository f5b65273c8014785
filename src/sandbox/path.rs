use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a user-supplied path cannot be staged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("absolute paths are not allowed: {0}")]
    Absolute(String),
    #[error("path escapes the staging root: {0}")]
    Escapes(String),
    #[error("path contains a NUL byte: {0:?}")]
    Nul(String),
}

/// A normalized path that is guaranteed to resolve inside the staging root.
///
/// Segments are joined with `/` regardless of host platform. `.` segments
/// and empty segments are dropped, `..` pops the previous segment and may
/// never climb above the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StagedPath(String);

impl StagedPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.trim().is_empty() {
            return Err(PathError::Empty);
        }
        if raw.contains('\0') {
            return Err(PathError::Nul(raw.to_string()));
        }
        if raw.starts_with('/') || raw.starts_with('\\') || has_drive_prefix(raw) {
            return Err(PathError::Absolute(raw.to_string()));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(PathError::Escapes(raw.to_string()));
                    }
                }
                name => segments.push(name),
            }
        }

        if segments.is_empty() {
            // "a/.." and friends resolve to the root itself, which is not a file.
            return Err(PathError::Escapes(raw.to_string()));
        }
        Ok(Self(segments.join("/")))
    }

    /// The staging root. Only valid as a directory.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parent directory; the root for top-level entries, `None` for the root.
    pub fn parent(&self) -> Option<StagedPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rsplit_once('/') {
            Some((dir, _)) => Some(Self(dir.to_string())),
            None => Some(Self::root()),
        }
    }

    pub fn file_name(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.0,
        }
    }

    /// Resolve a reference written relative to this path's directory.
    pub fn sibling(&self, relative: &str) -> Result<StagedPath, PathError> {
        match self.parent() {
            Some(dir) if !dir.is_root() => StagedPath::parse(&format!("{}/{relative}", dir.0)),
            _ => StagedPath::parse(relative),
        }
    }

    /// Every directory from the first segment down to `self`, root excluded.
    pub fn ancestors_inclusive(&self) -> Vec<StagedPath> {
        if self.is_root() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut end = 0;
        for (idx, ch) in self.0.char_indices() {
            if ch == '/' {
                out.push(Self(self.0[..idx].to_string()));
            }
            end = idx + ch.len_utf8();
        }
        out.push(Self(self.0[..end].to_string()));
        out
    }
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for StagedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl TryFrom<String> for StagedPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StagedPath::parse(&value)
    }
}

impl From<StagedPath> for String {
    fn from(value: StagedPath) -> Self {
        value.0
    }
}
