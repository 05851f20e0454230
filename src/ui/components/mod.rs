//! UI components module.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub mod editor;
pub mod library;
pub mod now_playing;
pub mod prompt;

pub use editor::{render_editor, EditorState};
pub use library::{render_library, LibraryState};
pub use now_playing::{render_now_playing, Details, NowPlayingState};
pub use prompt::{render_prompt, PromptState};

/// Create a centered rectangle.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
