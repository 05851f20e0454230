//! Resolving image references (URLs or local paths) to image bytes.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("Empty image reference")]
    Empty,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Image request returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where an image reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote(String),
    Local(PathBuf),
}

impl ImageSource {
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(Self::Remote(reference.to_string()))
        } else if let Some(path) = reference.strip_prefix("file://") {
            Some(Self::Local(PathBuf::from(path)))
        } else {
            Some(Self::Local(PathBuf::from(reference)))
        }
    }
}

/// Fetch the bytes behind an image reference.
pub async fn fetch(client: &reqwest::Client, reference: &str) -> Result<Vec<u8>, ArtworkError> {
    match ImageSource::parse(reference).ok_or(ArtworkError::Empty)? {
        ImageSource::Remote(url) => {
            let response = client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(ArtworkError::Status(response.status()));
            }
            Ok(response.bytes().await?.to_vec())
        }
        ImageSource::Local(path) => tokio::fs::read(&path)
            .await
            .map_err(|source| ArtworkError::Read { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_sources() {
        assert_eq!(ImageSource::parse("   "), None);
        assert_eq!(
            ImageSource::parse("HTTPS://example.com/a.jpg"),
            Some(ImageSource::Remote(String::from("HTTPS://example.com/a.jpg")))
        );
        assert_eq!(
            ImageSource::parse("file:///pics/a.png"),
            Some(ImageSource::Local(PathBuf::from("/pics/a.png")))
        );
        assert_eq!(
            ImageSource::parse("C:\\pics\\a.png"),
            Some(ImageSource::Local(PathBuf::from("C:\\pics\\a.png")))
        );
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let client = reqwest::Client::new();
        let bytes = fetch(&client, path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let client = reqwest::Client::new();
        let missing = dir.path().join("gone.png");
        assert!(matches!(
            fetch(&client, missing.to_str().unwrap()).await,
            Err(ArtworkError::Read { .. })
        ));
        assert!(matches!(fetch(&client, "").await, Err(ArtworkError::Empty)));
    }
}
