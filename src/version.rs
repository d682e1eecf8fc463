use crate::error::{PublishError, Result};
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Version used when the service has no usable project metadata.
pub const DEFAULT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BumpMode {
    #[default]
    Patch,
    Minor,
    Major,
}

impl fmt::Display for BumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BumpMode::Patch => "patch",
            BumpMode::Minor => "minor",
            BumpMode::Major => "major",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Next version for `mode`; fails if the bumped component would overflow.
    pub fn bump(self, mode: BumpMode) -> Result<Self> {
        let overflow = || PublishError::VersionOverflow {
            version: self.to_string(),
            mode: mode.to_string(),
        };
        Ok(match mode {
            BumpMode::Patch => Self::new(
                self.major,
                self.minor,
                self.patch.checked_add(1).ok_or_else(overflow)?,
            ),
            BumpMode::Minor => {
                Self::new(self.major, self.minor.checked_add(1).ok_or_else(overflow)?, 0)
            }
            BumpMode::Major => Self::new(self.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
        })
    }
}

impl FromStr for Version {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || PublishError::MalformedVersion {
            value: s.to_string(),
        };

        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(malformed());
        }

        let mut nums = [0u64; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            *slot = part.parse().map_err(|_| malformed())?;
        }
        Ok(Self::new(nums[0], nums[1], nums[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Outcome of version resolution for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Bumped from the project metadata.
    Bumped { previous: Version, next: Version },
    /// No metadata file, or no version field in it.
    Default,
}

impl Resolved {
    pub fn version(&self) -> String {
        match self {
            Resolved::Bumped { next, .. } => next.to_string(),
            Resolved::Default => DEFAULT_VERSION.to_string(),
        }
    }
}

/// Read the metadata file, bump its version and (when `persist`) write it
/// back atomically. Absent file or field resolves to [`DEFAULT_VERSION`]
/// and leaves the filesystem untouched.
pub fn resolve(metadata: &Path, mode: BumpMode, persist: bool) -> Result<Resolved> {
    if !metadata.is_file() {
        tracing::info!(version = DEFAULT_VERSION, "no project metadata, using default version");
        return Ok(Resolved::Default);
    }

    let raw = std::fs::read_to_string(metadata).map_err(|e| PublishError::io(metadata, e))?;
    let mut doc: Value = serde_json::from_str(&raw).map_err(|source| PublishError::MetadataParse {
        path: metadata.to_path_buf(),
        source,
    })?;

    let current = match doc.get("version") {
        None => {
            tracing::warn!(
                path = %metadata.display(),
                version = DEFAULT_VERSION,
                "project metadata has no version field, using default version"
            );
            return Ok(Resolved::Default);
        }
        Some(Value::String(v)) => v.parse::<Version>()?,
        Some(other) => {
            return Err(PublishError::MalformedVersion {
                value: other.to_string(),
            })
        }
    };

    let next = current.bump(mode)?;
    tracing::info!(from = %current, to = %next, mode = %mode, "bumped project version");

    if persist {
        if let Some(obj) = doc.as_object_mut() {
            obj.insert("version".to_string(), Value::String(next.to_string()));
        }
        let mut out = serde_json::to_string_pretty(&doc).map_err(|source| {
            PublishError::MetadataParse {
                path: metadata.to_path_buf(),
                source,
            }
        })?;
        if raw.ends_with('\n') {
            out.push('\n');
        }
        write_atomic(metadata, out.as_bytes())?;
    }

    Ok(Resolved::Bumped {
        previous: current,
        next,
    })
}

/// Replace `path` with `contents` via a sibling temp file and a rename, so
/// readers never observe a partial write. An existing file keeps its
/// permissions.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PublishError::io(dir, e))?;
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| PublishError::io(tmp.path(), e))?;
    }
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| PublishError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| PublishError::io(path, e.error))?;
    Ok(())
}
