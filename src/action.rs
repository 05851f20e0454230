//! Application actions/events that drive state changes.

use crate::enrich::LookupCompletion;

/// Actions that can be dispatched to update application state.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Application lifecycle
    Quit,
    Tick,

    // Navigation
    NavigateUp,
    NavigateDown,
    JumpToTop,
    JumpToBottom,

    // Playback controls
    PlaySelected,
    PlayPause,
    Stop,
    SeekForward,
    SeekBackward,
    VolumeUp,
    VolumeDown,

    // Library management
    OpenPrompt(PromptKind),
    RemoveSelected,

    // Text prompt
    PromptInput(char),
    PromptBackspace,
    PromptSubmit,
    PromptCancel,

    // Track editor
    OpenEditor,
    CloseEditor,
    EditorRemoveImage,

    // Metadata enrichment
    LookupCompleted(LookupCompletion),

    // Artwork
    ArtworkLoaded(String, Vec<u8>),

    // Overlays
    ShowHelp,
    HideHelp,

    // Errors
    ClearError,

    // No-op
    None,
}

impl From<LookupCompletion> for Action {
    fn from(completion: LookupCompletion) -> Self {
        Action::LookupCompleted(completion)
    }
}

/// What a text prompt collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Path of an audio file to add
    AddFile,
    /// Directory to scan for audio files
    ScanDirectory,
    /// New title for the track in the editor
    RenameTrack,
    /// Image path or URL for the track in the editor
    AddImage,
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::AddFile => "Add file",
            Self::ScanDirectory => "Scan directory",
            Self::RenameTrack => "Rename track",
            Self::AddImage => "Add image (path or URL)",
        }
    }
}

/// Current playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Stopped,
    Playing,
    Paused,
}
