use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Signature;
use crate::error::StateError;
use crate::fs::Resource;

/// Persisted mapping from output path to the signature of the task that last
/// produced it.
///
/// The state is loaded before scheduling and saved after a successful build.
/// Entries for outputs which were not touched in a session are carried over
/// untouched, so partial rebuilds across sessions keep working. A path with
/// no entry has never been built.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    signatures: BTreeMap<String, Signature>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the state stored in `resource`. A missing resource yields an
    /// empty state, which is what the very first build sees.
    pub fn load(resource: &Resource) -> Result<Self, StateError> {
        if !resource.exists() {
            debug!(path = %resource, "no signature state found, starting fresh");
            return Ok(Self::default());
        }

        let bytes = resource.content()?;
        let state: State = ciborium::from_reader(bytes.as_slice())?;

        debug!(path = %resource, entries = state.len(), "loaded signature state");
        Ok(state)
    }

    /// Encode the whole state into `resource`, replacing what was there.
    pub fn save(&self, resource: &Resource) -> Result<(), StateError> {
        let mut buffer = Vec::new();
        ciborium::into_writer(self, &mut buffer)?;
        resource.set_content(buffer)?;

        debug!(path = %resource, entries = self.len(), "saved signature state");
        Ok(())
    }

    pub fn signature(&self, path: impl AsRef<Utf8Path>) -> Option<&Signature> {
        self.signatures.get(path.as_ref().as_str())
    }

    pub fn put_signature(&mut self, path: impl AsRef<Utf8Path>, signature: Signature) {
        self.signatures
            .insert(path.as_ref().as_str().to_owned(), signature);
    }

    pub fn remove_signature(&mut self, path: impl AsRef<Utf8Path>) -> Option<Signature> {
        self.signatures.remove(path.as_ref().as_str())
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Signature)> {
        self.signatures.iter().map(|(path, sig)| (path.as_str(), sig))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use camino::Utf8PathBuf;

    use super::*;
    use crate::fs::MemoryFileSystem;

    fn resource(fs: &Arc<MemoryFileSystem>, path: &str) -> Resource {
        Resource::new(fs.clone(), Arc::new(Utf8PathBuf::from("build")), path)
    }

    #[test]
    fn test_load_missing_is_empty() {
        let fs = Arc::new(MemoryFileSystem::new());
        let state = State::load(&resource(&fs, "build/state")).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let fs = Arc::new(MemoryFileSystem::new());
        let res = resource(&fs, "build/state");

        let mut state = State::new();
        state.put_signature("build/a.out", Signature::hash("a"));
        state.put_signature("build/b.out", Signature::hash("b"));
        state.save(&res).unwrap();

        let loaded = State::load(&res).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(
            loaded.signature("build/a.out"),
            Some(&Signature::hash("a"))
        );
        assert_eq!(loaded.signature("build/c.out"), None);

        let paths: Vec<_> = loaded.iter().map(|(path, _)| path).collect();
        assert_eq!(paths, ["build/a.out", "build/b.out"]);
    }

    #[test]
    fn test_load_garbage() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("build/state", vec![0xff, 0x00, 0x13]);

        let err = State::load(&resource(&fs, "build/state")).unwrap_err();
        assert!(matches!(err, StateError::Decode(_)));
    }

    #[test]
    fn test_rejects_short_signature() {
        struct Bytes(Vec<u8>);

        impl Serialize for Bytes {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_bytes(&self.0)
            }
        }

        #[derive(Serialize)]
        struct Raw {
            signatures: BTreeMap<String, Bytes>,
        }

        let raw = Raw {
            signatures: BTreeMap::from([("build/a.out".to_string(), Bytes(vec![1, 2, 3]))]),
        };

        let mut buffer = Vec::new();
        ciborium::into_writer(&raw, &mut buffer).unwrap();

        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("build/state", buffer);

        let err = State::load(&resource(&fs, "build/state")).unwrap_err();
        assert!(matches!(err, StateError::Decode(_)));
    }
}
