//! Library table component.

use std::path::Path;

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::library::Track;

/// Library view state.
#[derive(Debug, Default)]
pub struct LibraryState {
    /// Selected row
    pub table_state: TableState,
}

impl LibraryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.table_state.selected()
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.table_state.select(index);
    }

    /// Move selection up, wrapping to the bottom.
    pub fn select_previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }

        let i = match self.selected() {
            Some(0) => len - 1,
            Some(i) => (i - 1).min(len - 1),
            None => 0,
        };
        self.select(Some(i));
    }

    /// Move selection down, wrapping to the top.
    pub fn select_next(&mut self, len: usize) {
        if len == 0 {
            return;
        }

        let i = match self.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.select(Some(i));
    }

    pub fn jump_to_top(&mut self, len: usize) {
        if len > 0 {
            self.select(Some(0));
        }
    }

    pub fn jump_to_bottom(&mut self, len: usize) {
        if len > 0 {
            self.select(Some(len - 1));
        }
    }

    /// Keep the selection inside a list that may have shrunk.
    pub fn clamp(&mut self, len: usize) {
        match (self.selected(), len) {
            (_, 0) => self.select(None),
            (Some(i), len) if i >= len => self.select(Some(len - 1)),
            (None, _) => self.select(Some(0)),
            _ => {}
        }
    }
}

/// Render the library table.
pub fn render_library(
    frame: &mut Frame,
    area: Rect,
    tracks: &[Track],
    state: &mut LibraryState,
    playing: Option<&Path>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Library ({})", tracks.len()))
        .border_style(Style::default().fg(Color::Cyan));

    if tracks.is_empty() {
        let hint = Paragraph::new("Library is empty. Press 'a' to add a file or 'o' to scan a directory.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let selected_idx = state.selected();

    let rows: Vec<Row> = tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let is_selected = selected_idx == Some(i);
            let is_playing = playing == Some(track.file_path.as_path());

            let marker = if is_playing {
                "▶"
            } else if track.metadata_cached {
                "✓"
            } else {
                " "
            };

            let title_style = if is_selected {
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else if is_playing {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            };

            Row::new(vec![
                Cell::from(marker).style(Style::default().fg(Color::Green)),
                Cell::from(track.title.clone()).style(title_style),
                Cell::from(track.display_artist().to_string())
                    .style(Style::default().fg(Color::Cyan)),
                Cell::from(track.display_album().to_string())
                    .style(Style::default().fg(Color::Yellow)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),      // Marker
            Constraint::Percentage(44), // Title
            Constraint::Percentage(28), // Artist
            Constraint::Percentage(28), // Album
        ],
    )
    .header(
        Row::new(vec!["", "Title", "Artist", "Album"])
            .style(Style::default().fg(Color::DarkGray)),
    )
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray));

    frame.render_stateful_widget(table, area, &mut state.table_state);
}
