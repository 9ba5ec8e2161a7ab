use std::collections::BTreeMap;
use std::sync::RwLock;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ResourceError;
use crate::fs::{FileSystem, normalize};

/// File system kept entirely in memory.
///
/// Useful for driving builds whose inputs come from somewhere other than the
/// disk, and for tests.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<Utf8PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<P, D>(files: impl IntoIterator<Item = (P, D)>) -> Self
    where
        P: AsRef<str>,
        D: Into<Vec<u8>>,
    {
        let files = files
            .into_iter()
            .map(|(path, data)| (normalize(path), data.into()))
            .collect();

        Self {
            files: RwLock::new(files),
        }
    }

    pub fn insert(&self, path: impl AsRef<str>, data: impl Into<Vec<u8>>) {
        self.files
            .write()
            .unwrap()
            .insert(normalize(path), data.into());
    }

    pub fn get(&self, path: impl AsRef<str>) -> Option<Vec<u8>> {
        self.files.read().unwrap().get(&normalize(path)).cloned()
    }

    pub fn paths(&self) -> Vec<Utf8PathBuf> {
        self.files.read().unwrap().keys().cloned().collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Utf8Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn read(&self, path: &Utf8Path) -> Result<Vec<u8>, ResourceError> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_owned()))
    }

    fn write(&self, path: &Utf8Path, data: &[u8]) -> Result<(), ResourceError> {
        self.files
            .write()
            .unwrap()
            .insert(normalize(path), data.to_vec());
        Ok(())
    }

    fn remove(&self, path: &Utf8Path) -> Result<(), ResourceError> {
        self.files.write().unwrap().remove(path);
        Ok(())
    }

    fn walk(&self, root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ResourceError> {
        let root = normalize(root);

        Ok(self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|path| root.as_str().is_empty() || path.starts_with(&root))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_read() {
        let fs = MemoryFileSystem::new();
        fs.insert("./a/b.txt", "hello");

        assert!(fs.exists(Utf8Path::new("a/b.txt")));
        assert_eq!(fs.read(Utf8Path::new("a/b.txt")).unwrap(), b"hello");
        assert_eq!(fs.get("a/b.txt").as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_paths_sorted() {
        let fs = MemoryFileSystem::with_files([("b.txt", "b"), ("a/c.txt", "c")]);
        let paths = fs.paths();
        let paths: Vec<_> = paths.iter().map(|p| p.as_str()).collect();
        assert_eq!(paths, ["a/c.txt", "b.txt"]);

        fs.remove(Utf8Path::new("b.txt")).unwrap();
        assert_eq!(fs.paths().len(), 1);
    }

    #[test]
    fn test_walk_prefix() {
        let fs = MemoryFileSystem::with_files([
            ("src/a.txt", "a"),
            ("src/sub/b.txt", "b"),
            ("srcx/c.txt", "c"),
        ]);

        let paths = fs.walk(Utf8Path::new("src")).unwrap();
        let paths: Vec<_> = paths.iter().map(|p| p.as_str()).collect();
        assert_eq!(paths, ["src/a.txt", "src/sub/b.txt"]);

        assert_eq!(fs.walk(Utf8Path::new(".")).unwrap().len(), 3);
    }

    #[test]
    fn test_missing() {
        let fs = MemoryFileSystem::new();
        assert!(matches!(
            fs.read(Utf8Path::new("x")),
            Err(ResourceError::NotFound(_))
        ));
        fs.remove(Utf8Path::new("x")).unwrap();
    }
}
