//! Path-addressed resources and the file systems backing them.
//!
//! The build core never touches the disk directly. Every artifact is a
//! [`Resource`], a cheap handle pairing a normalized path with the
//! [`FileSystem`] it lives on. Paths are relative to the root of that file
//! system and always use `/` as the separator, which makes them stable keys
//! for the signature state and for matching one task's outputs against
//! another task's inputs.

mod disk;
mod memory;

use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::core::Signature;
use crate::error::ResourceError;

pub use disk::DiskFileSystem;
pub use memory::MemoryFileSystem;

/// Storage backend consulted by the build core.
///
/// Only existence, content and content fingerprints matter to the
/// scheduler; permissions and timestamps are never looked at.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Utf8Path) -> bool;

    fn read(&self, path: &Utf8Path) -> Result<Vec<u8>, ResourceError>;

    /// Replace the content at `path`, creating it (and any parent
    /// directories) if needed.
    fn write(&self, path: &Utf8Path, data: &[u8]) -> Result<(), ResourceError>;

    /// Remove `path`. Removing a missing resource is not an error.
    fn remove(&self, path: &Utf8Path) -> Result<(), ResourceError>;

    /// List every file below `root`, as normalized paths.
    fn walk(&self, root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ResourceError>;

    /// Content fingerprint of `path`.
    #[inline]
    fn hash(&self, path: &Utf8Path) -> Result<Signature, ResourceError> {
        Ok(Signature::hash(self.read(path)?))
    }
}

/// Normalize a path into the canonical form used as a resource key.
///
/// Backslashes become `/`, empty and `.` segments are dropped and `..` pops
/// the previous segment. Leading slashes are stripped, since every path is
/// relative to the root of its file system.
pub fn normalize(path: impl AsRef<str>) -> Utf8PathBuf {
    let mut parts: Vec<&str> = Vec::new();

    for part in path.as_ref().split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }

    Utf8PathBuf::from(parts.join("/"))
}

/// Extension of the file name with its leading `.`: everything after the
/// last `.`, so a dotfile like `.gitignore` has the extension `.gitignore`.
/// A file name without a `.`, or ending in one, has no extension.
pub(crate) fn extension_of(path: &Utf8Path) -> Option<String> {
    let (_, ext) = path.file_name()?.rsplit_once('.')?;
    (!ext.is_empty()).then(|| format!(".{ext}"))
}

/// Handle to a path-addressed artifact.
///
/// Two resources are equal when their paths are equal, regardless of the
/// file system handle they carry.
#[derive(Clone)]
pub struct Resource {
    path: Utf8PathBuf,
    build_dir: Arc<Utf8PathBuf>,
    fs: Arc<dyn FileSystem>,
}

impl Resource {
    pub(crate) fn new(
        fs: Arc<dyn FileSystem>,
        build_dir: Arc<Utf8PathBuf>,
        path: impl AsRef<str>,
    ) -> Self {
        Self {
            path: normalize(path),
            build_dir,
            fs,
        }
    }

    /// The normalized path of this resource.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// File extension including the leading `.`, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }

    pub fn exists(&self) -> bool {
        self.fs.exists(&self.path)
    }

    pub fn content(&self) -> Result<Vec<u8>, ResourceError> {
        self.fs.read(&self.path)
    }

    pub fn set_content(&self, data: impl AsRef<[u8]>) -> Result<(), ResourceError> {
        self.fs.write(&self.path, data.as_ref())
    }

    pub fn remove(&self) -> Result<(), ResourceError> {
        self.fs.remove(&self.path)
    }

    /// Fingerprint of the current content, or `None` when the resource is
    /// missing.
    pub fn signature(&self) -> Result<Option<Signature>, ResourceError> {
        if !self.exists() {
            return Ok(None);
        }

        match self.fs.hash(&self.path) {
            Ok(hash) => Ok(Some(hash)),
            Err(ResourceError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Sibling resource with the extension replaced. The extension may be
    /// given with or without the leading `.`.
    pub fn change_ext(&self, ext: &str) -> Resource {
        Resource {
            path: self.path.with_extension(ext.trim_start_matches('.')),
            build_dir: self.build_dir.clone(),
            fs: self.fs.clone(),
        }
    }

    /// The same relative path inside the build directory. Resources already
    /// living in the build directory map to themselves.
    pub fn output(&self) -> Resource {
        if self.is_output() {
            return self.clone();
        }

        Resource {
            path: self.build_dir.join(&self.path),
            build_dir: self.build_dir.clone(),
            fs: self.fs.clone(),
        }
    }

    /// Whether this resource lives in the build directory.
    pub fn is_output(&self) -> bool {
        self.path.starts_with(self.build_dir.as_path())
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Resource({})", self.path)
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.path, f)
    }
}
