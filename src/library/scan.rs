//! Directory scanning for audio files.

use std::path::Path;

use walkdir::WalkDir;

use super::Track;

fn is_audio_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.'))
                .any(|e| e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Collect audio files under `dir` as fresh tracks, sorted by path.
pub fn scan(dir: &Path, extensions: &[String], recursive: bool) -> Vec<Track> {
    let mut walker = WalkDir::new(dir).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut tracks: Vec<Track> = walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry during scan: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_audio_file(e.path(), extensions))
        .map(|e| Track::from_path(e.into_path()))
        .collect();

    tracks.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    tracing::info!("Scan of {} found {} tracks", dir.display(), tracks.len());
    tracks
}
