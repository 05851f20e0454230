use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::TrackMetadata;

/// One library entry.
///
/// Serialized with PascalCase keys, the on-disk library format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Track {
    pub title: String,

    /// Unique key within the library
    pub file_path: PathBuf,

    #[serde(default)]
    pub artist: Option<String>,

    #[serde(default)]
    pub album: Option<String>,

    /// Cover image reference (URL or local path)
    #[serde(default, rename = "ImageUrl")]
    pub cover: Option<String>,

    /// User supplied image references, in display order
    #[serde(default)]
    pub user_images: Vec<String>,

    /// Set only after a successful lookup (or when loaded from disk)
    #[serde(default, rename = "IsMetadataLoaded")]
    pub metadata_cached: bool,
}

impl Track {
    /// Create a track for a file, titled after the file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let file_path = path.into();
        Self {
            title: file_stem(&file_path),
            file_path,
            artist: None,
            album: None,
            cover: None,
            user_images: Vec::new(),
            metadata_cached: false,
        }
    }

    /// Title derived from the file name, used when metadata is missing.
    pub fn fallback_title(&self) -> String {
        file_stem(&self.file_path)
    }

    /// Overwrite artist, album and cover with a lookup result and mark the
    /// track as cached.
    pub fn apply_metadata(&mut self, metadata: TrackMetadata) {
        self.artist = metadata.artist;
        self.album = metadata.album;
        self.cover = metadata.artwork_url;
        self.metadata_cached = true;
    }

    /// Rename the track. Blank titles are rejected.
    pub fn rename(&mut self, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        self.title = title.to_string();
        true
    }

    /// Append a user image reference. Blank references are ignored.
    pub fn add_image(&mut self, reference: &str) -> bool {
        let reference = reference.trim();
        if reference.is_empty() {
            return false;
        }
        self.user_images.push(reference.to_string());
        true
    }

    /// Remove the first user image matching `reference`.
    pub fn remove_image(&mut self, reference: &str) -> bool {
        match self.user_images.iter().position(|r| r == reference) {
            Some(idx) => {
                self.user_images.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Images for the slideshow: cover first, then user images.
    pub fn slideshow_images(&self) -> Vec<String> {
        let mut images = Vec::with_capacity(self.user_images.len() + 1);
        if let Some(cover) = self.cover.as_deref().filter(|c| !c.is_empty()) {
            images.push(cover.to_string());
        }
        for image in &self.user_images {
            if self.cover.as_deref() != Some(image.as_str()) {
                images.push(image.clone());
            }
        }
        images
    }

    pub fn display_artist(&self) -> &str {
        self.artist.as_deref().unwrap_or("-")
    }

    pub fn display_album(&self) -> &str {
        self.album.as_deref().unwrap_or("-")
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
