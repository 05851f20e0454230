//! Local song library: tracks, persistence and directory scanning.

use std::path::{Path, PathBuf};

pub mod scan;
pub mod store;
pub mod track;

pub use store::{LibraryStore, StoreError};
pub use track::Track;

/// Ordered collection of tracks, unique by file path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    tracks: Vec<Track>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from tracks, keeping the first of any duplicate paths.
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut library = Self::new();
        library.merge(tracks);
        library
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.position(path).is_some()
    }

    pub fn position(&self, path: &Path) -> Option<usize> {
        self.tracks.iter().position(|t| t.file_path == path)
    }

    pub fn get(&self, path: &Path) -> Option<&Track> {
        self.tracks.iter().find(|t| t.file_path == path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.file_path == path)
    }

    /// Add a track unless its path is already present.
    pub fn add(&mut self, track: Track) -> bool {
        if self.contains(&track.file_path) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    /// Add a file with a filename-derived title.
    pub fn add_file(&mut self, path: impl Into<PathBuf>) -> bool {
        self.add(Track::from_path(path))
    }

    /// Add many tracks, skipping known paths. Returns how many were added.
    pub fn merge(&mut self, tracks: impl IntoIterator<Item = Track>) -> usize {
        let mut added = 0;
        for track in tracks {
            if self.add(track) {
                added += 1;
            }
        }
        added
    }

    pub fn remove(&mut self, path: &Path) -> Option<Track> {
        let idx = self.position(path)?;
        Some(self.tracks.remove(idx))
    }
}
