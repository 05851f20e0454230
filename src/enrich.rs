//! Fetch-and-cache metadata enrichment for the active track.
//!
//! Every activation goes through [`transition`], a pure function over
//! [`FetchState`]. [`Enricher`] carries out the resulting [`Step`]: it owns
//! the single in-flight cancellation token, spawns lookups and applies their
//! results to the library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::{lookup, LookupOutcome, MetadataLookup, TrackMetadata};
use crate::library::{Library, LibraryStore, StoreError, Track};

/// Identifies one lookup. Strictly increasing per enricher.
pub type RequestId = u64;

/// Enrichment state of the active track.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    DisplayingCached {
        path: PathBuf,
    },
    Searching {
        path: PathBuf,
        request: RequestId,
    },
    Resolved {
        path: PathBuf,
    },
    NotFound {
        path: PathBuf,
    },
    Cancelled {
        path: PathBuf,
    },
}

impl FetchState {
    /// Path of the track this state refers to.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Idle => None,
            Self::DisplayingCached { path }
            | Self::Searching { path, .. }
            | Self::Resolved { path }
            | Self::NotFound { path }
            | Self::Cancelled { path } => Some(path),
        }
    }

    /// Request currently in flight, if any.
    pub fn pending_request(&self) -> Option<RequestId> {
        match self {
            Self::Searching { request, .. } => Some(*request),
            _ => None,
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// A track was selected or started playing. `request` is the id to use
    /// if a lookup has to start.
    Activated {
        path: PathBuf,
        cached: bool,
        request: RequestId,
    },
    /// A lookup task reported back.
    LookupFinished {
        request: RequestId,
        outcome: LookupOutcome,
    },
    /// The active lookup is no longer wanted and nothing replaces it.
    Abandon,
}

/// What the driver has to do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Render the stored metadata; no network call.
    ShowCached,
    /// Spawn a lookup for the activated track.
    StartLookup,
    /// Write the metadata into the track and persist the library.
    Apply(TrackMetadata),
    /// Show the "not found" fallback; leave the track untouched.
    ShowNotFound,
    /// The event was for a superseded request.
    Discard,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: FetchState,
    /// Request whose token must be cancelled before anything else happens
    pub cancel: Option<RequestId>,
    pub effect: Effect,
}

/// Compute the next state for an event.
pub fn transition(state: &FetchState, event: FetchEvent) -> Step {
    let pending = state.pending_request();

    match event {
        FetchEvent::Activated { path, cached, .. } if cached => Step {
            next: FetchState::DisplayingCached { path },
            cancel: pending,
            effect: Effect::ShowCached,
        },
        // Already looking this track up; keep the request that is in flight
        FetchEvent::Activated { path, .. }
            if matches!(state, FetchState::Searching { path: current, .. } if *current == path) =>
        {
            Step {
                next: state.clone(),
                cancel: None,
                effect: Effect::None,
            }
        }
        FetchEvent::Activated { path, request, .. } => Step {
            next: FetchState::Searching { path, request },
            cancel: pending,
            effect: Effect::StartLookup,
        },
        FetchEvent::LookupFinished { request, outcome } => match state {
            FetchState::Searching {
                path,
                request: current,
            } if *current == request => {
                let path = path.clone();
                match outcome {
                    LookupOutcome::Found(metadata) => Step {
                        next: FetchState::Resolved { path },
                        cancel: None,
                        effect: Effect::Apply(metadata),
                    },
                    LookupOutcome::NotFound => Step {
                        next: FetchState::NotFound { path },
                        cancel: None,
                        effect: Effect::ShowNotFound,
                    },
                    LookupOutcome::Cancelled => Step {
                        next: FetchState::Cancelled { path },
                        cancel: None,
                        effect: Effect::None,
                    },
                }
            }
            _ => Step {
                next: state.clone(),
                cancel: None,
                effect: Effect::Discard,
            },
        },
        FetchEvent::Abandon => match state {
            FetchState::Searching { path, request } => Step {
                next: FetchState::Cancelled { path: path.clone() },
                cancel: Some(*request),
                effect: Effect::None,
            },
            _ => Step {
                next: state.clone(),
                cancel: None,
                effect: Effect::None,
            },
        },
    }
}

/// A lookup task's report back to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupCompletion {
    pub request: RequestId,
    pub outcome: LookupOutcome,
}

/// What an activation led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Track already had metadata
    Cached,
    /// A lookup was started
    Searching,
}

/// What a completion led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Metadata written to the track and the library saved
    Applied(PathBuf),
    /// No match (or the lookup failed); track untouched
    NotFound(PathBuf),
    /// Lookup was cancelled
    Cancelled,
    /// Completion for a superseded request, dropped
    Stale,
}

struct InFlight {
    request: RequestId,
    token: CancellationToken,
}

/// Drives [`transition`] for the active track.
///
/// Completions are sent as `T` so the event loop can wrap them in its own
/// message type.
pub struct Enricher<L: ?Sized, T = LookupCompletion> {
    lookup: Arc<L>,
    state: FetchState,
    in_flight: Option<InFlight>,
    next_request: RequestId,
    completions: mpsc::UnboundedSender<T>,
}

impl<L, T> Enricher<L, T>
where
    L: MetadataLookup + ?Sized + 'static,
    T: From<LookupCompletion> + Send + 'static,
{
    pub fn new(lookup: Arc<L>, completions: mpsc::UnboundedSender<T>) -> Self {
        Self {
            lookup,
            state: FetchState::Idle,
            in_flight: None,
            next_request: 1,
            completions,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Whether a lookup is currently outstanding.
    #[cfg(test)]
    pub fn is_searching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Activate a track: show cached metadata or start a lookup for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate(&mut self, track: &Track) -> Activation {
        let request = self.next_request;
        let step = transition(
            &self.state,
            FetchEvent::Activated {
                path: track.file_path.clone(),
                cached: track.metadata_cached,
                request,
            },
        );
        self.cancel_request(step.cancel);
        self.state = step.next;

        match step.effect {
            Effect::StartLookup => {
                self.next_request += 1;
                self.spawn_lookup(request, track.title.clone());
                Activation::Searching
            }
            Effect::None => Activation::Searching,
            _ => Activation::Cached,
        }
    }

    /// Abandon the active lookup, if any (track removed, shutting down).
    pub fn abandon(&mut self) {
        let step = transition(&self.state, FetchEvent::Abandon);
        self.cancel_request(step.cancel);
        self.state = step.next;
    }

    /// Apply a lookup report. Successful results are written into the track
    /// and the whole library is saved.
    pub fn complete(
        &mut self,
        completion: LookupCompletion,
        library: &mut Library,
        store: &LibraryStore,
    ) -> Result<Resolution, StoreError> {
        let step = transition(
            &self.state,
            FetchEvent::LookupFinished {
                request: completion.request,
                outcome: completion.outcome,
            },
        );

        if step.effect == Effect::Discard {
            tracing::debug!("Dropping stale lookup result #{}", completion.request);
            return Ok(Resolution::Stale);
        }

        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.request == completion.request)
        {
            self.in_flight = None;
        }
        self.state = step.next;

        match step.effect {
            Effect::Apply(metadata) => {
                let Some(path) = self.state.path().map(Path::to_path_buf) else {
                    return Ok(Resolution::Stale);
                };
                let Some(track) = library.get_mut(&path) else {
                    tracing::debug!("Track {} left the library mid-lookup", path.display());
                    return Ok(Resolution::Stale);
                };
                track.apply_metadata(metadata);
                tracing::info!(
                    "Cached metadata for '{}': {} / {}",
                    track.title,
                    track.display_artist(),
                    track.display_album()
                );
                store.save(library)?;
                Ok(Resolution::Applied(path))
            }
            Effect::ShowNotFound => Ok(self
                .state
                .path()
                .map(|p| Resolution::NotFound(p.to_path_buf()))
                .unwrap_or(Resolution::Stale)),
            _ => Ok(Resolution::Cancelled),
        }
    }

    /// Cancel `request` if it is the one in flight.
    fn cancel_request(&mut self, request: Option<RequestId>) {
        let Some(request) = request else {
            return;
        };
        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.request == request)
        {
            if let Some(previous) = self.in_flight.take() {
                tracing::debug!("Cancelling lookup #{}", previous.request);
                previous.token.cancel();
            }
        }
    }

    fn spawn_lookup(&mut self, request: RequestId, title: String) {
        let token = CancellationToken::new();
        if let Some(previous) = self.in_flight.replace(InFlight {
            request,
            token: token.clone(),
        }) {
            previous.token.cancel();
        }

        let client = Arc::clone(&self.lookup);
        let tx = self.completions.clone();
        tracing::info!("Looking up metadata for '{}' (#{})", title, request);

        tokio::spawn(async move {
            let outcome = lookup(client.as_ref(), &title, &token).await;
            let _ = tx.send(T::from(LookupCompletion { request, outcome }));
        });
    }
}

impl<L: ?Sized, T> Drop for Enricher<L, T> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use futures::future::BoxFuture;
    use tempfile::tempdir;

    use super::*;
    use crate::client::api::LookupError;

    fn meta(artist: &str, album: &str, art: &str) -> TrackMetadata {
        TrackMetadata {
            track_name: None,
            artist: Some(artist.to_string()),
            album: Some(album.to_string()),
            artwork_url: Some(art.to_string()),
        }
    }

    /// Answers from a table; titles listed in `hang` never answer.
    #[derive(Default)]
    struct ScriptedLookup {
        answers: HashMap<String, TrackMetadata>,
        hang: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        fn answering(title: &str, metadata: TrackMetadata) -> Self {
            let mut answers = HashMap::new();
            answers.insert(title.to_string(), metadata);
            Self {
                answers,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MetadataLookup for ScriptedLookup {
        fn search<'a>(
            &'a self,
            title: &'a str,
        ) -> BoxFuture<'a, Result<Option<TrackMetadata>, LookupError>> {
            self.calls.lock().unwrap().push(title.to_string());
            Box::pin(async move {
                if self.hang.iter().any(|t| t == title) {
                    futures::future::pending::<()>().await;
                }
                Ok(self.answers.get(title).cloned())
            })
        }
    }

    fn setup(
        lookup: ScriptedLookup,
    ) -> (
        Arc<ScriptedLookup>,
        Enricher<ScriptedLookup>,
        mpsc::UnboundedReceiver<LookupCompletion>,
    ) {
        let lookup = Arc::new(lookup);
        let (tx, rx) = mpsc::unbounded_channel();
        let enricher = Enricher::new(Arc::clone(&lookup), tx);
        (lookup, enricher, rx)
    }

    fn path(p: &str) -> PathBuf {
        PathBuf::from(p)
    }

    #[test]
    fn test_transition_cached_skips_lookup() {
        let step = transition(
            &FetchState::Idle,
            FetchEvent::Activated {
                path: path("a.mp3"),
                cached: true,
                request: 1,
            },
        );
        assert_eq!(
            step.next,
            FetchState::DisplayingCached {
                path: path("a.mp3")
            }
        );
        assert_eq!(step.effect, Effect::ShowCached);
        assert_eq!(step.cancel, None);
    }

    #[test]
    fn test_transition_supersedes_pending_request() {
        let searching = FetchState::Searching {
            path: path("a.mp3"),
            request: 1,
        };

        let step = transition(
            &searching,
            FetchEvent::Activated {
                path: path("b.mp3"),
                cached: false,
                request: 2,
            },
        );
        assert_eq!(step.cancel, Some(1));
        assert_eq!(step.effect, Effect::StartLookup);
        assert_eq!(
            step.next,
            FetchState::Searching {
                path: path("b.mp3"),
                request: 2
            }
        );

        // Switching to a cached track also cancels.
        let step = transition(
            &searching,
            FetchEvent::Activated {
                path: path("c.mp3"),
                cached: true,
                request: 2,
            },
        );
        assert_eq!(step.cancel, Some(1));
    }

    #[test]
    fn test_transition_results() {
        let searching = FetchState::Searching {
            path: path("a.mp3"),
            request: 7,
        };
        let m = meta("A", "B", "http://x/img.jpg");

        let step = transition(
            &searching,
            FetchEvent::LookupFinished {
                request: 7,
                outcome: LookupOutcome::Found(m.clone()),
            },
        );
        assert_eq!(step.next, FetchState::Resolved { path: path("a.mp3") });
        assert_eq!(step.effect, Effect::Apply(m.clone()));

        let step = transition(
            &searching,
            FetchEvent::LookupFinished {
                request: 7,
                outcome: LookupOutcome::NotFound,
            },
        );
        assert_eq!(step.next, FetchState::NotFound { path: path("a.mp3") });
        assert_eq!(step.effect, Effect::ShowNotFound);

        let step = transition(
            &searching,
            FetchEvent::LookupFinished {
                request: 7,
                outcome: LookupOutcome::Cancelled,
            },
        );
        assert_eq!(step.next, FetchState::Cancelled { path: path("a.mp3") });
        assert_eq!(step.effect, Effect::None);

        // Stale request ids never change state.
        let step = transition(
            &searching,
            FetchEvent::LookupFinished {
                request: 6,
                outcome: LookupOutcome::Found(m),
            },
        );
        assert_eq!(step.next, searching);
        assert_eq!(step.effect, Effect::Discard);
    }

    #[test]
    fn test_transition_same_track_keeps_pending_request() {
        let searching = FetchState::Searching {
            path: path("a.mp3"),
            request: 4,
        };

        let step = transition(
            &searching,
            FetchEvent::Activated {
                path: path("a.mp3"),
                cached: false,
                request: 5,
            },
        );
        assert_eq!(step.next, searching);
        assert_eq!(step.cancel, None);
        assert_eq!(step.effect, Effect::None);
    }

    #[test]
    fn test_transition_abandon() {
        let step = transition(
            &FetchState::Searching {
                path: path("a.mp3"),
                request: 3,
            },
            FetchEvent::Abandon,
        );
        assert_eq!(step.next, FetchState::Cancelled { path: path("a.mp3") });
        assert_eq!(step.cancel, Some(3));

        let idle = transition(&FetchState::Idle, FetchEvent::Abandon);
        assert_eq!(idle.next, FetchState::Idle);
        assert_eq!(idle.cancel, None);
    }

    #[tokio::test]
    async fn test_scenario_lookup_then_cache_hit() {
        let dir = tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("library.json"));
        let mut library = Library::new();
        library.add_file("song.mp3");

        let (lookup, mut enricher, mut rx) = setup(ScriptedLookup::answering(
            "song",
            meta("A", "B", "http://x/img.jpg"),
        ));

        let track = library.tracks()[0].clone();
        assert!(!track.metadata_cached);
        assert_eq!(enricher.activate(&track), Activation::Searching);

        let completion = rx.recv().await.unwrap();
        let resolution = enricher
            .complete(completion, &mut library, &store)
            .unwrap();
        assert_eq!(resolution, Resolution::Applied(path("song.mp3")));
        assert!(!enricher.is_searching());

        let track = &library.tracks()[0];
        assert_eq!(track.title, "song");
        assert_eq!(track.artist.as_deref(), Some("A"));
        assert_eq!(track.album.as_deref(), Some("B"));
        assert_eq!(track.cover.as_deref(), Some("http://x/img.jpg"));
        assert!(track.metadata_cached);

        let persisted = store.load().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(&persisted.tracks()[0], track);

        // Second activation is served from the cache.
        let track = track.clone();
        assert_eq!(enricher.activate(&track), Activation::Cached);
        assert_eq!(lookup.calls(), vec!["song"]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cached_track_never_looks_up() {
        let (lookup, mut enricher, _rx) = setup(ScriptedLookup::default());

        let mut track = Track::from_path("cached.mp3");
        track.metadata_cached = true;

        for _ in 0..3 {
            assert_eq!(enricher.activate(&track), Activation::Cached);
        }
        tokio::task::yield_now().await;
        assert!(lookup.calls().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_is_retried_on_next_activation() {
        let dir = tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("library.json"));
        let mut library = Library::new();
        library.add_file("unknown.mp3");
        let track = library.tracks()[0].clone();

        let (lookup, mut enricher, mut rx) = setup(ScriptedLookup::default());

        enricher.activate(&track);
        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.outcome, LookupOutcome::NotFound);
        let resolution = enricher
            .complete(completion, &mut library, &store)
            .unwrap();
        assert_eq!(resolution, Resolution::NotFound(path("unknown.mp3")));

        // Nothing persisted, nothing cached.
        assert!(!library.tracks()[0].metadata_cached);
        assert!(!store.path().exists());

        // No negative cache: the next activation asks again.
        assert_eq!(enricher.activate(&track), Activation::Searching);
        rx.recv().await.unwrap();
        assert_eq!(lookup.calls(), vec!["unknown", "unknown"]);
    }

    #[tokio::test]
    async fn test_superseded_lookup_is_cancelled_and_ignored() {
        let dir = tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("library.json"));
        let mut library = Library::new();
        library.add_file("slow.mp3");
        library.add_file("fast.mp3");
        let slow = library.tracks()[0].clone();
        let fast = library.tracks()[1].clone();

        let mut scripted = ScriptedLookup::answering("fast", meta("F", "Fast", "f.jpg"));
        scripted
            .answers
            .insert(String::from("slow"), meta("S", "Slow", "s.jpg"));
        scripted.hang.push(String::from("slow"));
        let (lookup, mut enricher, mut rx) = setup(scripted);

        enricher.activate(&slow);
        enricher.activate(&fast);

        let mut completions = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        completions.sort_by_key(|c| c.request);

        assert_eq!(completions[0].outcome, LookupOutcome::Cancelled);
        assert!(matches!(completions[1].outcome, LookupOutcome::Found(_)));

        let mut resolutions = Vec::new();
        for completion in completions {
            resolutions.push(enricher.complete(completion, &mut library, &store).unwrap());
        }
        assert_eq!(
            resolutions,
            vec![Resolution::Stale, Resolution::Applied(path("fast.mp3"))]
        );

        assert!(!library.get(&slow.file_path).unwrap().metadata_cached);
        assert!(library.get(&fast.file_path).unwrap().metadata_cached);
        let mut calls = lookup.calls();
        calls.sort();
        assert_eq!(calls, vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_late_response_after_cancel_is_discarded() {
        let dir = tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("library.json"));
        let mut library = Library::new();
        library.add_file("a.mp3");
        library.add_file("b.mp3");
        let a = library.tracks()[0].clone();
        let b = library.tracks()[1].clone();

        let mut scripted = ScriptedLookup::default();
        scripted.hang.push(String::from("a"));
        scripted.hang.push(String::from("b"));
        let (_lookup, mut enricher, _rx) = setup(scripted);

        enricher.activate(&a);
        enricher.activate(&b);

        // A response for the first request that slipped past its cancellation.
        let late = LookupCompletion {
            request: 1,
            outcome: LookupOutcome::Found(meta("Late", "Late", "late.jpg")),
        };
        let resolution = enricher.complete(late, &mut library, &store).unwrap();
        assert_eq!(resolution, Resolution::Stale);
        assert_eq!(library.get(&a.file_path).unwrap(), &a);
        assert!(enricher.is_searching());
        assert_eq!(
            enricher.state(),
            &FetchState::Searching {
                path: b.file_path.clone(),
                request: 2
            }
        );
    }

    #[tokio::test]
    async fn test_select_then_play_sends_one_request() {
        let dir = tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("library.json"));
        let mut library = Library::new();
        library.add_file("song.mp3");
        let track = library.tracks()[0].clone();

        let (lookup, mut enricher, mut rx) = setup(ScriptedLookup::answering(
            "song",
            meta("A", "B", "http://x/img.jpg"),
        ));

        assert_eq!(enricher.activate(&track), Activation::Searching);
        assert_eq!(enricher.activate(&track), Activation::Searching);
        assert_eq!(
            enricher.state(),
            &FetchState::Searching {
                path: path("song.mp3"),
                request: 1
            }
        );

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.request, 1);
        let resolution = enricher
            .complete(completion, &mut library, &store)
            .unwrap();
        assert_eq!(resolution, Resolution::Applied(path("song.mp3")));
        assert_eq!(lookup.calls(), vec!["song"]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_abandon_cancels_in_flight() {
        let mut scripted = ScriptedLookup::default();
        scripted.hang.push(String::from("a"));
        let (_lookup, mut enricher, mut rx) = setup(scripted);

        enricher.activate(&Track::from_path("a.mp3"));
        enricher.abandon();

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.outcome, LookupOutcome::Cancelled);
        assert!(!enricher.is_searching());
        assert_eq!(
            enricher.state(),
            &FetchState::Cancelled {
                path: path("a.mp3")
            }
        );
    }
}
