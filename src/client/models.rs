//! iTunes Search API response models.

use serde::Deserialize;

/// Root object returned by the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub result_count: u32,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// A single search hit.
///
/// The endpoint returns many more fields (ids, prices, preview URLs);
/// only the ones used to enrich a track are kept.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub collection_name: Option<String>,
    pub artwork_url100: Option<String>,
}

/// Metadata extracted from a lookup, in track terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Track name as the service knows it (informational only)
    pub track_name: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// 100px artwork URL
    pub artwork_url: Option<String>,
}

impl From<SearchResult> for TrackMetadata {
    fn from(result: SearchResult) -> Self {
        Self {
            track_name: result.track_name,
            artist: result.artist_name,
            album: result.collection_name,
            artwork_url: result.artwork_url100,
        }
    }
}

impl SearchResponse {
    /// Take the first result, if any.
    pub fn into_first(self) -> Option<TrackMetadata> {
        self.results.into_iter().next().map(TrackMetadata::from)
    }
}

/// Outcome of a single lookup as seen by the caller.
///
/// Transport and parse failures are folded into `NotFound`; only
/// cancellation is reported separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(TrackMetadata),
    NotFound,
    Cancelled,
}
