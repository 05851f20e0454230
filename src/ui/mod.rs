//! Main UI layout and rendering.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

pub mod components;

pub use components::*;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Main layout: [library] [now playing] [status]
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),    // Library
            Constraint::Length(8), // Now playing
            Constraint::Length(1), // Status
        ])
        .split(area);

    render_library(
        frame,
        main_chunks[0],
        app.library.tracks(),
        &mut app.library_view,
        app.now_playing.playing.as_deref(),
    );
    render_now_playing(frame, main_chunks[1], &mut app.now_playing);
    render_status(frame, main_chunks[2], &app.status);

    if let Some(path) = app.editor.path.clone() {
        if let Some(track) = app.library.get(&path) {
            render_editor(frame, area, track, &mut app.editor);
        }
    }

    if app.prompt.is_active() {
        render_prompt(frame, area, &app.prompt);
    }

    if app.show_help {
        render_help(frame, area);
    }

    if let Some(error) = &app.error_message {
        render_error(frame, area, error);
    }
}

/// Render the bottom status line.
fn render_status(frame: &mut Frame, area: Rect, status: &str) {
    let line = Line::from(vec![
        Span::styled(
            " trackshelf ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(status, Style::default().fg(Color::DarkGray)),
        Span::styled("   ? help  q quit", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn section(title: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        title,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Render the help overlay.
fn render_help(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 80, area);
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        section("Library"),
        Line::from("  j/k or ↑/↓    Move up/down"),
        Line::from("  g/G           Jump to top/bottom"),
        Line::from("  a             Add a file"),
        Line::from("  o             Scan a directory"),
        Line::from("  d/Delete      Remove selected track"),
        Line::from("  e             Edit selected track"),
        Line::from(""),
        section("Playback"),
        Line::from("  Enter         Play selected"),
        Line::from("  Space         Pause/Resume"),
        Line::from("  s             Stop"),
        Line::from("  ,/.           Seek backward/forward"),
        Line::from("  +/-           Volume up/down"),
        Line::from(""),
        section("Editor"),
        Line::from("  t             Rename track"),
        Line::from("  a             Add image"),
        Line::from("  d             Remove selected image"),
        Line::from("  Esc           Close editor"),
        Line::from(""),
        section("Other"),
        Line::from("  ?             Show this help"),
        Line::from("  x             Clear error message"),
        Line::from("  q             Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or ? to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}

/// Render an error message overlay.
fn render_error(frame: &mut Frame, area: Rect, message: &str) {
    let popup_area = centered_rect(60, 20, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Error (x to dismiss)")
        .border_style(Style::default().fg(Color::Red));

    let paragraph = Paragraph::new(message)
        .style(Style::default().fg(Color::Red))
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, popup_area);
}
