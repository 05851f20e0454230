//! Main application state and logic.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::Result;
use ratatui_image::picker::Picker;
use tokio::sync::mpsc;

use crate::action::{Action, PlayerState, PromptKind};
use crate::artwork;
use crate::client::MetadataLookup;
use crate::config::Config;
use crate::enrich::{Activation, Enricher, LookupCompletion, Resolution};
use crate::library::{scan, Library, LibraryStore, Track};
use crate::player::{Player, PlayerEvent};
use crate::ui::{EditorState, LibraryState, NowPlayingState, PromptState};

/// What triggered an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Select,
    Play,
}

/// Main application state.
pub struct App {
    /// Whether the app should quit
    pub should_quit: bool,

    /// Configuration
    pub config: Config,

    /// Song library
    pub library: Library,

    /// Library file
    store: LibraryStore,

    /// Metadata fetch-and-cache driver
    enricher: Enricher<dyn MetadataLookup, Action>,

    /// HTTP client for cover images
    http: reqwest::Client,

    /// Audio player
    pub player: Option<Player>,

    /// Library table state
    pub library_view: LibraryState,

    /// Now playing state
    pub now_playing: NowPlayingState,

    /// Text prompt
    pub prompt: PromptState,

    /// Track editor
    pub editor: EditorState,

    /// Help overlay visible
    pub show_help: bool,

    /// Error message to display
    pub error_message: Option<String>,

    /// Transient status line
    pub status: String,

    /// Action sender for async operations
    pub action_tx: mpsc::UnboundedSender<Action>,

    /// Last tick, for the slideshow timer
    last_tick: Instant,
}

impl App {
    /// Create a new application instance.
    pub fn new(
        config: Config,
        library: Library,
        store: LibraryStore,
        lookup: Arc<dyn MetadataLookup>,
        action_tx: mpsc::UnboundedSender<Action>,
        picker: Option<Picker>,
    ) -> Self {
        let mut now_playing = NowPlayingState::new(config.slideshow_interval(), picker);
        now_playing.volume = config.player.volume;

        let mut library_view = LibraryState::new();
        library_view.clamp(library.len());

        Self {
            should_quit: false,
            enricher: Enricher::new(lookup, action_tx.clone()),
            http: reqwest::Client::new(),
            config,
            library,
            store,
            player: None,
            library_view,
            now_playing,
            prompt: PromptState::new(),
            editor: EditorState::new(),
            show_help: false,
            error_message: None,
            status: String::new(),
            action_tx,
            last_tick: Instant::now(),
        }
    }

    /// Initialize the audio player.
    pub fn init(&mut self) -> Result<()> {
        match Player::new() {
            Ok(player) => {
                player.set_volume(self.config.player.volume as f32 / 100.0)?;
                self.player = Some(player);
            }
            Err(e) => {
                tracing::error!("Failed to initialize audio player: {}", e);
                self.error_message = Some(format!("Audio player error: {}", e));
            }
        }

        Ok(())
    }

    /// Handle an action and update state.
    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.enricher.abandon();
                if let Some(player) = &self.player {
                    let _ = player.stop();
                }
                self.should_quit = true;
            }

            Action::Tick => self.on_tick()?,

            Action::NavigateUp => {
                if let Some(track) = self.editor_track() {
                    let len = track.user_images.len();
                    self.editor.select_previous(len);
                } else {
                    self.library_view.select_previous(self.library.len());
                    self.on_selection_changed()?;
                }
            }
            Action::NavigateDown => {
                if let Some(track) = self.editor_track() {
                    let len = track.user_images.len();
                    self.editor.select_next(len);
                } else {
                    self.library_view.select_next(self.library.len());
                    self.on_selection_changed()?;
                }
            }
            Action::JumpToTop => {
                self.library_view.jump_to_top(self.library.len());
                self.on_selection_changed()?;
            }
            Action::JumpToBottom => {
                self.library_view.jump_to_bottom(self.library.len());
                self.on_selection_changed()?;
            }

            Action::PlaySelected => self.play_selected()?,
            Action::PlayPause => match self.now_playing.state {
                PlayerState::Playing => {
                    if let Some(player) = &self.player {
                        player.pause()?;
                    }
                }
                PlayerState::Paused => {
                    if let Some(player) = &self.player {
                        player.resume()?;
                    }
                }
                PlayerState::Stopped => self.play_selected()?,
            },
            Action::Stop => {
                if let Some(player) = &self.player {
                    player.stop()?;
                }
                self.now_playing.slideshow.stop();
                self.sync_artwork();
            }
            Action::SeekForward => self.seek_relative(self.config.player.seek_step as i64)?,
            Action::SeekBackward => self.seek_relative(-(self.config.player.seek_step as i64))?,
            Action::VolumeUp => self.set_volume(self.now_playing.volume.saturating_add(5))?,
            Action::VolumeDown => self.set_volume(self.now_playing.volume.saturating_sub(5))?,

            Action::OpenPrompt(kind) => {
                let initial = match kind {
                    PromptKind::RenameTrack => self
                        .editor_track()
                        .map(|t| t.title.clone())
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                self.prompt.open(kind, &initial);
            }
            Action::PromptInput(c) => self.prompt.push(c),
            Action::PromptBackspace => self.prompt.backspace(),
            Action::PromptCancel => self.prompt.cancel(),
            Action::PromptSubmit => {
                if let Some((kind, input)) = self.prompt.take() {
                    self.submit_prompt(kind, input.trim())?;
                }
            }

            Action::RemoveSelected => self.remove_selected()?,

            Action::OpenEditor => {
                if let Some(track) = self.selected_track().cloned() {
                    self.editor.open(&track);
                }
            }
            Action::CloseEditor => self.editor.close(),
            Action::EditorRemoveImage => {
                let Some(path) = self.editor.path.clone() else {
                    return Ok(());
                };
                let Some(track) = self.library.get(&path) else {
                    return Ok(());
                };
                if let Some(image) = self.editor.selected_image(track).map(str::to_string) {
                    if let Some(track) = self.library.get_mut(&path) {
                        track.remove_image(&image);
                        self.editor.clamp(track.user_images.len());
                    }
                    self.after_edit(&path);
                }
            }

            Action::LookupCompleted(completion) => self.on_lookup_completed(completion),

            Action::ArtworkLoaded(reference, bytes) => {
                // Only the image currently due on screen is shown
                if self.now_playing.slideshow.current() == Some(reference.as_str()) {
                    self.now_playing.set_album_art(&bytes);
                }
            }

            Action::ShowHelp => self.show_help = true,
            Action::HideHelp => self.show_help = false,

            Action::ClearError => self.error_message = None,

            Action::None => {}
        }

        Ok(())
    }

    /// Currently selected track.
    pub fn selected_track(&self) -> Option<&Track> {
        self.library_view
            .selected()
            .and_then(|i| self.library.tracks().get(i))
    }

    /// Track open in the editor.
    pub fn editor_track(&self) -> Option<&Track> {
        self.editor.path.as_deref().and_then(|p| self.library.get(p))
    }

    fn on_tick(&mut self) -> Result<()> {
        // Collect events first to avoid borrow issues
        let events: Vec<_> = if let Some(player) = &mut self.player {
            let mut events = Vec::new();
            while let Some(event) = player.try_recv_event() {
                events.push(event);
            }
            events
        } else {
            Vec::new()
        };

        for event in events {
            self.handle_player_event(event);
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;

        if let Some(reference) = self.now_playing.slideshow.advance(elapsed) {
            let reference = reference.to_string();
            self.request_artwork(reference);
        }

        Ok(())
    }

    fn handle_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::StateChanged(state) => {
                self.now_playing.state = state;
                if state == PlayerState::Stopped {
                    self.now_playing.position = 0;
                    self.now_playing.playing = None;
                }
            }
            PlayerEvent::Progress { position, duration } => {
                self.now_playing.position = position.as_secs() as u32;
                self.now_playing.duration = duration.as_secs() as u32;
            }
            PlayerEvent::TrackEnded => {
                self.now_playing.state = PlayerState::Stopped;
                self.now_playing.position = 0;
                self.now_playing.playing = None;
                self.now_playing.slideshow.stop();
                self.sync_artwork();
            }
            PlayerEvent::Error(msg) => {
                self.error_message = Some(msg);
            }
        }
    }

    fn on_selection_changed(&mut self) -> Result<()> {
        if let Some(track) = self.selected_track().cloned() {
            self.activate(&track, Trigger::Select);
        }
        Ok(())
    }

    fn play_selected(&mut self) -> Result<()> {
        let Some(track) = self.selected_track().cloned() else {
            return Ok(());
        };

        if let Some(player) = &self.player {
            player.play(track.file_path.clone())?;
        }
        self.now_playing.playing = Some(track.file_path.clone());
        self.now_playing.position = 0;
        self.status = track.file_path.display().to_string();
        self.activate(&track, Trigger::Play);
        Ok(())
    }

    /// Show a track's metadata, looking it up first if needed.
    fn activate(&mut self, track: &Track, trigger: Trigger) {
        if trigger == Trigger::Select && !self.config.lookup.on_select && !track.metadata_cached {
            self.now_playing.show_hint(track);
            self.sync_artwork();
            return;
        }

        match self.enricher.activate(track) {
            Activation::Cached => self.now_playing.show_track(track),
            Activation::Searching => self.now_playing.show_searching(track),
        }
        self.sync_artwork();
    }

    fn on_lookup_completed(&mut self, completion: LookupCompletion) {
        match self
            .enricher
            .complete(completion, &mut self.library, &self.store)
        {
            Ok(Resolution::Applied(path)) => {
                if let Some(track) = self.library.get(&path).cloned() {
                    if self.now_playing.is_showing(&track) {
                        self.now_playing.show_track(&track);
                        self.sync_artwork();
                    }
                }
            }
            Ok(Resolution::NotFound(path)) => {
                if let Some(track) = self.library.get(&path).cloned() {
                    if self.now_playing.is_showing(&track) {
                        self.now_playing.show_not_found(&track);
                        self.sync_artwork();
                    }
                }
            }
            Ok(Resolution::Cancelled) | Ok(Resolution::Stale) => {}
            Err(e) => {
                tracing::error!("Failed to save library: {}", e);
                self.error_message = Some(e.to_string());
            }
        }
    }

    fn submit_prompt(&mut self, kind: PromptKind, input: &str) -> Result<()> {
        if input.is_empty() {
            return Ok(());
        }

        match kind {
            PromptKind::AddFile => {
                let path = PathBuf::from(input);
                if !path.is_file() {
                    self.error_message = Some(format!("File not found: {}", input));
                    return Ok(());
                }
                if self.library.add_file(path.clone()) {
                    self.save_library();
                    self.library_view.select(self.library.position(&path));
                    self.status = format!("Added {}", path.display());
                } else {
                    self.status = String::from("Already in library");
                }
            }
            PromptKind::ScanDirectory => {
                let dir = PathBuf::from(input);
                if !dir.is_dir() {
                    self.error_message = Some(format!("Not a directory: {}", input));
                    return Ok(());
                }
                let found = scan::scan(
                    &dir,
                    &self.config.library.extensions,
                    self.config.library.recursive,
                );
                let added = self.library.merge(found);
                if added > 0 {
                    self.save_library();
                }
                self.library_view.clamp(self.library.len());
                self.status = format!("Scan added {} tracks", added);
            }
            PromptKind::RenameTrack => {
                if let Some(path) = self.editor.path.clone() {
                    if let Some(track) = self.library.get_mut(&path) {
                        track.rename(input);
                    }
                    self.after_edit(&path);
                }
            }
            PromptKind::AddImage => {
                if let Some(path) = self.editor.path.clone() {
                    if let Some(track) = self.library.get_mut(&path) {
                        track.add_image(input);
                        self.editor.clamp(track.user_images.len());
                    }
                    self.after_edit(&path);
                }
            }
        }

        Ok(())
    }

    fn remove_selected(&mut self) -> Result<()> {
        let Some(path) = self.selected_track().map(|t| t.file_path.clone()) else {
            return Ok(());
        };

        if self.now_playing.path.as_deref() == Some(path.as_path()) {
            self.enricher.abandon();
            self.now_playing.clear();
        }
        if self.now_playing.playing.as_deref() == Some(path.as_path()) {
            if let Some(player) = &self.player {
                player.stop()?;
            }
        }
        if self.editor.path.as_deref() == Some(path.as_path()) {
            self.editor.close();
        }

        if self.library.remove(&path).is_some() {
            self.save_library();
            self.library_view.clamp(self.library.len());
            self.status = format!("Removed {}", path.display());
            self.on_selection_changed()?;
        }
        Ok(())
    }

    /// Persist and refresh the panel after a manual edit.
    fn after_edit(&mut self, path: &Path) {
        self.save_library();
        if let Some(track) = self.library.get(path).cloned() {
            if self.now_playing.is_showing(&track) {
                let details = self.now_playing.details.clone();
                self.now_playing.show_track(&track);
                if !track.metadata_cached {
                    self.now_playing.details = details;
                }
                self.sync_artwork();
            }
        }
    }

    fn save_library(&mut self) {
        if let Err(e) = self.store.save(&self.library) {
            tracing::error!("Failed to save library: {}", e);
            self.error_message = Some(e.to_string());
        }
    }

    /// Load the image the slideshow is on, or blank the cover if there is none.
    fn sync_artwork(&mut self) {
        match self.now_playing.slideshow.current() {
            Some(reference) => {
                let reference = reference.to_string();
                self.request_artwork(reference);
            }
            None => self.now_playing.clear_album_art(),
        }
    }

    fn request_artwork(&self, reference: String) {
        if !self.config.ui.show_album_art || self.now_playing.picker.is_none() {
            return;
        }

        let client = self.http.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match artwork::fetch(&client, &reference).await {
                Ok(bytes) => {
                    let _ = tx.send(Action::ArtworkLoaded(reference, bytes));
                }
                Err(e) => tracing::debug!("Cover image {} unavailable: {}", reference, e),
            }
        });
    }

    fn seek_relative(&mut self, delta_secs: i64) -> Result<()> {
        if self.now_playing.playing.is_none() {
            return Ok(());
        }

        let current = self.now_playing.position as i64;
        let mut target = (current + delta_secs).max(0);
        if self.now_playing.duration > 0 {
            target = target.min(self.now_playing.duration as i64);
        }
        self.now_playing.position = target as u32;

        if let Some(player) = &self.player {
            player.seek(Duration::from_secs(target as u64))?;
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        let volume = volume.min(100);
        self.now_playing.volume = volume;
        if let Some(player) = &self.player {
            player.set_volume(volume as f32 / 100.0)?;
        }
        Ok(())
    }
}
