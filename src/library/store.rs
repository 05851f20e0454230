//! Whole-file JSON persistence for the library.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{Library, Track};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read library file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write library file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Library file {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize library: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A library file on disk. Every save rewrites the whole file.
#[derive(Debug, Clone)]
pub struct LibraryStore {
    path: PathBuf,
}

impl LibraryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the library. A missing file is an empty library; a malformed one
    /// is an error so it never gets overwritten by an empty save.
    pub fn load(&self) -> Result<Library, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No library at {}, starting empty", self.path.display());
                return Ok(Library::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let tracks: Vec<Track> =
            serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let library = Library::from_tracks(tracks);
        tracing::info!(
            "Loaded {} tracks from {}",
            library.len(),
            self.path.display()
        );
        Ok(library)
    }

    /// Serialize the whole library and overwrite the file.
    pub fn save(&self, library: &Library) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(library.tracks())?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        std::fs::write(&self.path, contents).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!("Saved {} tracks to {}", library.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_library() {
        let dir = tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("library.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_order_and_fields() {
        let dir = tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("nested").join("library.json"));

        let mut first = Track::from_path("/music/b.mp3");
        first.artist = Some(String::from("Artist"));
        first.album = Some(String::from("Album"));
        first.cover = Some(String::from("http://x/img.jpg"));
        first.metadata_cached = true;

        let mut second = Track::from_path("/music/a.mp3");
        second.add_image("/pics/a.png");
        second.add_image("https://example.com/a.jpg");

        let third = Track::from_path("/music/c.flac");

        let library = Library::from_tracks(vec![first, second, third]);
        store.save(&library).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, library);
        assert_eq!(loaded.tracks()[0].title, "b");
    }

    #[test]
    fn test_malformed_file_fails_loudly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = LibraryStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_saved_file_uses_desktop_keys() {
        let dir = tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("library.json"));

        let mut library = Library::new();
        library.add_file("song.mp3");
        store.save(&library).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let record = &raw[0];
        assert_eq!(record["Title"], "song");
        assert_eq!(record["FilePath"], "song.mp3");
        assert_eq!(record["IsMetadataLoaded"], false);
        assert!(record["ImageUrl"].is_null());
    }
}
