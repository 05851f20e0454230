//! Track editor popup: title and image list.

use std::path::PathBuf;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::centered_rect;
use crate::library::Track;

/// Editor state.
#[derive(Debug, Default)]
pub struct EditorState {
    /// Track being edited
    pub path: Option<PathBuf>,

    /// Selected image in the track's user image list
    pub images_state: ListState,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.path.is_some()
    }

    pub fn open(&mut self, track: &Track) {
        self.path = Some(track.file_path.clone());
        self.images_state
            .select(if track.user_images.is_empty() { None } else { Some(0) });
    }

    pub fn close(&mut self) {
        self.path = None;
        self.images_state.select(None);
    }

    pub fn select_next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.images_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.images_state.select(Some(i));
    }

    pub fn select_previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.images_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => (i - 1).min(len - 1),
        };
        self.images_state.select(Some(i));
    }

    /// Selected image reference of `track`.
    pub fn selected_image<'a>(&self, track: &'a Track) -> Option<&'a str> {
        self.images_state
            .selected()
            .and_then(|i| track.user_images.get(i))
            .map(String::as_str)
    }

    /// Keep the selection valid after the image list changed.
    pub fn clamp(&mut self, len: usize) {
        match self.images_state.selected() {
            _ if len == 0 => self.images_state.select(None),
            Some(i) if i >= len => self.images_state.select(Some(len - 1)),
            None => self.images_state.select(Some(0)),
            _ => {}
        }
    }
}

/// Render the editor popup.
pub fn render_editor(frame: &mut Frame, area: Rect, track: &Track, state: &mut EditorState) {
    let popup_area = centered_rect(70, 60, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Edit Track")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Fields
            Constraint::Min(3),    // Images
            Constraint::Length(1), // Hints
        ])
        .split(inner);

    let field = |name: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<8}", name), Style::default().fg(Color::Cyan)),
            Span::raw(value),
        ])
    };
    let fields = vec![
        field("Title", track.title.clone()),
        field("Artist", track.display_artist().to_string()),
        field("Album", track.display_album().to_string()),
        field(
            "Cover",
            track.cover.clone().unwrap_or_else(|| String::from("-")),
        ),
    ];
    frame.render_widget(Paragraph::new(fields), chunks[0]);

    let items: Vec<ListItem> = track
        .user_images
        .iter()
        .map(|image| ListItem::new(image.as_str()))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .title(format!("Images ({})", track.user_images.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[1], &mut state.images_state);

    let hints = Paragraph::new("t rename  a add image  d remove image  j/k move  Esc close")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hints, chunks[2]);
}
