//! iTunes Search API client implementation.

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::models::*;

/// Default search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://itunes.apple.com/search";

/// Lookup errors. Callers only ever see these folded into `LookupOutcome::NotFound`.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Search endpoint returned status {0}")]
    Status(StatusCode),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Something that can look up metadata for a track title.
pub trait MetadataLookup: Send + Sync {
    /// Search for a title, returning the first match if any.
    fn search<'a>(
        &'a self,
        title: &'a str,
    ) -> BoxFuture<'a, Result<Option<TrackMetadata>, LookupError>>;
}

/// Client for the public iTunes Search API.
#[derive(Debug, Clone)]
pub struct ItunesClient {
    /// HTTP client
    client: Client,

    /// Search endpoint URL
    endpoint: String,

    /// Media type filter
    media: String,
}

impl ItunesClient {
    /// Create a new client for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            media: String::from("music"),
        }
    }

    /// Build the search URL for a title.
    pub fn build_url(&self, title: &str) -> String {
        format!(
            "{}?term={}&media={}&limit=1",
            self.endpoint,
            urlencoding::encode(title),
            self.media
        )
    }

    async fn fetch(&self, title: &str) -> Result<Option<TrackMetadata>, LookupError> {
        let url = self.build_url(title);
        tracing::debug!("Looking up metadata: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let text = response.text().await?;
        parse_response(&text)
    }
}

impl MetadataLookup for ItunesClient {
    fn search<'a>(
        &'a self,
        title: &'a str,
    ) -> BoxFuture<'a, Result<Option<TrackMetadata>, LookupError>> {
        Box::pin(self.fetch(title))
    }
}

/// Parse a search response body into its first result.
pub fn parse_response(body: &str) -> Result<Option<TrackMetadata>, LookupError> {
    let parsed: SearchResponse = serde_json::from_str(body).map_err(|e| {
        LookupError::InvalidResponse(format!(
            "Failed to parse response: {}. Body: {}",
            e,
            body.chars().take(200).collect::<String>()
        ))
    })?;

    Ok(parsed.into_first())
}

/// Run one lookup, racing it against a cancellation token.
///
/// Cancellation wins ties. Errors are logged and reported as `NotFound`.
pub async fn lookup<L>(client: &L, title: &str, cancel: &CancellationToken) -> LookupOutcome
where
    L: MetadataLookup + ?Sized,
{
    tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            tracing::debug!("Lookup for '{}' cancelled", title);
            LookupOutcome::Cancelled
        }
        result = client.search(title) => match result {
            Ok(Some(metadata)) => LookupOutcome::Found(metadata),
            Ok(None) => {
                tracing::info!("No metadata match for '{}'", title);
                LookupOutcome::NotFound
            }
            Err(e) => {
                tracing::warn!("Metadata lookup for '{}' failed: {}", title, e);
                LookupOutcome::NotFound
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<TrackMetadata>);

    impl MetadataLookup for Fixed {
        fn search<'a>(
            &'a self,
            _title: &'a str,
        ) -> BoxFuture<'a, Result<Option<TrackMetadata>, LookupError>> {
            Box::pin(async move { Ok(self.0.clone()) })
        }
    }

    struct Broken;

    impl MetadataLookup for Broken {
        fn search<'a>(
            &'a self,
            _title: &'a str,
        ) -> BoxFuture<'a, Result<Option<TrackMetadata>, LookupError>> {
            Box::pin(async { Err(LookupError::InvalidResponse(String::from("boom"))) })
        }
    }

    struct Hangs;

    impl MetadataLookup for Hangs {
        fn search<'a>(
            &'a self,
            _title: &'a str,
        ) -> BoxFuture<'a, Result<Option<TrackMetadata>, LookupError>> {
            Box::pin(futures::future::pending())
        }
    }

    #[test]
    fn test_build_url_encodes_title() {
        let client = ItunesClient::new("https://itunes.apple.com/search/");
        assert_eq!(
            client.build_url("Rock & Roll/Part 2"),
            "https://itunes.apple.com/search?term=Rock%20%26%20Roll%2FPart%202&media=music&limit=1"
        );
    }

    #[test]
    fn test_parse_malformed_is_error() {
        assert!(matches!(
            parse_response("<html>rate limited</html>"),
            Err(LookupError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_no_results() {
        assert_eq!(
            parse_response(r#"{"resultCount":0,"results":[]}"#).unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let meta = TrackMetadata {
            artist: Some(String::from("A")),
            ..Default::default()
        };
        let outcome = lookup(&Fixed(Some(meta.clone())), "x", &CancellationToken::new()).await;
        assert_eq!(outcome, LookupOutcome::Found(meta));
    }

    #[tokio::test]
    async fn test_lookup_errors_fold_into_not_found() {
        let token = CancellationToken::new();
        assert_eq!(lookup(&Broken, "x", &token).await, LookupOutcome::NotFound);
        assert_eq!(lookup(&Fixed(None), "x", &token).await, LookupOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_lookup_cancelled_is_distinct() {
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(lookup(&Hangs, "x", &token).await, LookupOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_wins_over_ready_result() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = lookup(&Fixed(Some(TrackMetadata::default())), "x", &token).await;
        assert_eq!(outcome, LookupOutcome::Cancelled);
    }
}
