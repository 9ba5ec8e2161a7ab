use std::fs;
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;

use crate::core::Signature;
use crate::error::ResourceError;
use crate::fs::{FileSystem, normalize};

/// File system backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
    root: Utf8PathBuf,
}

impl DiskFileSystem {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn full(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.root.join(path)
    }
}

fn io_error(path: &Utf8Path, err: std::io::Error) -> ResourceError {
    match err.kind() {
        ErrorKind::NotFound => ResourceError::NotFound(path.to_owned()),
        _ => ResourceError::Io(path.to_owned(), err),
    }
}

impl FileSystem for DiskFileSystem {
    fn exists(&self, path: &Utf8Path) -> bool {
        self.full(path).is_file()
    }

    fn read(&self, path: &Utf8Path) -> Result<Vec<u8>, ResourceError> {
        fs::read(self.full(path)).map_err(|err| io_error(path, err))
    }

    fn write(&self, path: &Utf8Path, data: &[u8]) -> Result<(), ResourceError> {
        let full = self.full(path);

        if let Some(dir) = full.parent() {
            fs::create_dir_all(dir).map_err(|err| io_error(path, err))?;
        }

        // write next to the target, then rename over it
        let name = full.file_name().unwrap_or("resource");
        let temp = full.with_file_name(format!(".{name}.tmp"));

        fs::write(&temp, data).map_err(|err| io_error(path, err))?;

        if let Err(err) = fs::rename(&temp, &full) {
            let _ = fs::remove_file(&temp);
            return Err(io_error(path, err));
        }

        Ok(())
    }

    fn remove(&self, path: &Utf8Path) -> Result<(), ResourceError> {
        match fs::remove_file(self.full(path)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(path, err)),
        }
    }

    fn walk(&self, root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ResourceError> {
        let base = self.full(root);
        let pattern = format!("{}/**/*", Pattern::escape(base.as_str()));

        let mut paths = Vec::new();
        for entry in glob::glob(&pattern)? {
            let entry = Utf8PathBuf::try_from(entry?)?;

            if !entry.is_file() {
                continue;
            }

            let relative = entry.strip_prefix(&self.root).unwrap_or(&entry);
            paths.push(normalize(relative));
        }

        paths.sort();
        Ok(paths)
    }

    fn hash(&self, path: &Utf8Path) -> Result<Signature, ResourceError> {
        Signature::hash_file(self.full(path)).map_err(|err| io_error(path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, DiskFileSystem) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, DiskFileSystem::new(root))
    }

    #[test]
    fn test_write_read() {
        let (_dir, fs) = setup();
        let path = Utf8Path::new("a/b/c.txt");

        assert!(!fs.exists(path));
        fs.write(path, b"hello").unwrap();
        assert!(fs.exists(path));
        assert_eq!(fs.read(path).unwrap(), b"hello");

        // overwrite in place, no temp file left behind
        fs.write(path, b"world").unwrap();
        assert_eq!(fs.read(path).unwrap(), b"world");
        assert_eq!(fs.walk(Utf8Path::new("a")).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_rename_removes_temp() {
        let (dir, fs) = setup();
        // a directory in the way makes the final rename fail
        std::fs::create_dir(dir.path().join("out")).unwrap();

        assert!(fs.write(Utf8Path::new("out"), b"x").is_err());
        assert!(!dir.path().join(".out.tmp").exists());
    }

    #[test]
    fn test_read_missing() {
        let (_dir, fs) = setup();
        let err = fs.read(Utf8Path::new("nope.txt")).unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }

    #[test]
    fn test_remove() {
        let (_dir, fs) = setup();
        let path = Utf8Path::new("x.txt");

        fs.write(path, b"x").unwrap();
        fs.remove(path).unwrap();
        assert!(!fs.exists(path));

        // idempotent
        fs.remove(path).unwrap();
    }

    #[test]
    fn test_walk() {
        let (_dir, fs) = setup();
        fs.write(Utf8Path::new("src/b.txt"), b"").unwrap();
        fs.write(Utf8Path::new("src/a.txt"), b"").unwrap();
        fs.write(Utf8Path::new("src/sub/c.txt"), b"").unwrap();
        fs.write(Utf8Path::new("other/d.txt"), b"").unwrap();

        let paths = fs.walk(Utf8Path::new("src")).unwrap();
        let paths: Vec<_> = paths.iter().map(|p| p.as_str()).collect();
        assert_eq!(paths, ["src/a.txt", "src/b.txt", "src/sub/c.txt"]);
    }

    #[test]
    fn test_hash_matches_content() {
        let (_dir, fs) = setup();
        let path = Utf8Path::new("h.bin");
        fs.write(path, b"some content").unwrap();

        assert_eq!(fs.hash(path).unwrap(), Signature::hash(b"some content"));
    }
}
