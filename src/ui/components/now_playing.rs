//! Now playing panel: active track details, cover slideshow and progress.

use std::path::PathBuf;
use std::time::Duration;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};
use ratatui_image::{picker::Picker, protocol::StatefulProtocol, StatefulImage};
use unicode_width::UnicodeWidthStr;

use crate::action::PlayerState;
use crate::library::Track;
use crate::slideshow::Slideshow;

/// What the details line shows for the active track.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Details {
    #[default]
    Empty,
    /// Uncached track, lookups only run on play
    PlayToSearch,
    Searching,
    NotFound,
    Known {
        artist: Option<String>,
        album: Option<String>,
    },
}

impl Details {
    pub fn label(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::PlayToSearch => String::from("Play to search details"),
            Self::Searching => String::from("Searching iTunes..."),
            Self::NotFound => String::from("Metadata not found"),
            Self::Known { artist, album } => match (artist, album) {
                (Some(artist), Some(album)) => format!("{} • {}", artist, album),
                (Some(artist), None) => artist.clone(),
                (None, Some(album)) => album.clone(),
                (None, None) => String::from("Unknown artist"),
            },
        }
    }
}

/// Now playing state.
pub struct NowPlayingState {
    /// Track shown in the panel
    pub path: Option<PathBuf>,

    /// Track currently loaded in the player
    pub playing: Option<PathBuf>,

    /// Displayed title
    pub title: String,

    /// Details line
    pub details: Details,

    /// Player state
    pub state: PlayerState,

    /// Current position in seconds
    pub position: u32,

    /// Total duration in seconds
    pub duration: u32,

    /// Volume (0-100)
    pub volume: u8,

    /// Cover and user images
    pub slideshow: Slideshow,

    /// Cover image protocol (for Sixel/Kitty/etc.)
    pub album_art: Option<StatefulProtocol>,

    /// Image picker for terminal graphics
    pub picker: Option<Picker>,
}

impl NowPlayingState {
    pub fn new(slideshow_interval: Duration, picker: Option<Picker>) -> Self {
        Self {
            path: None,
            playing: None,
            title: String::new(),
            details: Details::Empty,
            state: PlayerState::default(),
            position: 0,
            duration: 0,
            volume: 80,
            slideshow: Slideshow::new(slideshow_interval),
            album_art: None,
            picker,
        }
    }

    /// Whether `track` is the one in the panel.
    pub fn is_showing(&self, track: &Track) -> bool {
        self.path.as_deref() == Some(track.file_path.as_path())
    }

    /// Show stored metadata and restart the slideshow.
    pub fn show_track(&mut self, track: &Track) {
        self.path = Some(track.file_path.clone());
        self.title = track.title.clone();
        self.details = if track.metadata_cached || track.artist.is_some() || track.album.is_some()
        {
            Details::Known {
                artist: track.artist.clone(),
                album: track.album.clone(),
            }
        } else {
            Details::Empty
        };
        self.slideshow.load(track.slideshow_images());
    }

    /// Show a track whose lookup is in flight.
    pub fn show_searching(&mut self, track: &Track) {
        self.show_track(track);
        self.details = Details::Searching;
    }

    /// Show the fallback for a track whose lookup found nothing.
    pub fn show_not_found(&mut self, track: &Track) {
        self.show_track(track);
        self.title = track.fallback_title();
        self.details = Details::NotFound;
    }

    /// Show an uncached track without looking it up.
    pub fn show_hint(&mut self, track: &Track) {
        self.path = Some(track.file_path.clone());
        self.title = track.title.clone();
        self.details = Details::PlayToSearch;
        self.slideshow.clear();
    }

    /// Set the cover image from encoded bytes. Undecodable data is ignored.
    pub fn set_album_art(&mut self, image_data: &[u8]) {
        if let Some(picker) = &mut self.picker {
            match image::load_from_memory(image_data) {
                Ok(dyn_image) => self.album_art = Some(picker.new_resize_protocol(dyn_image)),
                Err(e) => tracing::debug!("Ignoring undecodable image: {}", e),
            }
        }
    }

    pub fn clear_album_art(&mut self) {
        self.album_art = None;
    }

    /// Clear the panel.
    pub fn clear(&mut self) {
        self.path = None;
        self.title.clear();
        self.details = Details::Empty;
        self.slideshow.clear();
        self.album_art = None;
    }

    /// Get progress as a ratio (0.0 to 1.0).
    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            0.0
        } else {
            (self.position as f64 / self.duration as f64).min(1.0)
        }
    }

    /// Format position as MM:SS.
    pub fn position_string(&self) -> String {
        format_time(self.position)
    }

    /// Format duration as MM:SS.
    pub fn duration_string(&self) -> String {
        format_time(self.duration)
    }

    /// Get play/pause symbol.
    pub fn state_symbol(&self) -> &'static str {
        match self.state {
            PlayerState::Playing => "▶ ",
            PlayerState::Paused => "⏸ ",
            PlayerState::Stopped => "■ ",
        }
    }
}

fn format_time(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Truncate to a display width, appending an ellipsis when cut.
fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        if out.width() + 2 > width {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}

/// Render the now playing panel.
pub fn render_now_playing(frame: &mut Frame, area: Rect, state: &mut NowPlayingState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Now Playing")
        .border_style(Style::default().fg(Color::Magenta));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 3 {
        return;
    }

    // Layout: [cover art] [info + progress]
    let has_album_art = state.album_art.is_some() && state.picker.is_some();
    let art_width = if has_album_art { inner.height * 2 } else { 0 };

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(if has_album_art {
            vec![Constraint::Length(art_width), Constraint::Min(20)]
        } else {
            vec![Constraint::Min(20)]
        })
        .split(inner);

    let info_area = if has_album_art {
        main_chunks[1]
    } else {
        main_chunks[0]
    };

    if has_album_art {
        if let Some(ref mut protocol) = state.album_art {
            let image = StatefulImage::default();
            frame.render_stateful_widget(image, main_chunks[0], protocol);
        }
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(1), // Details
            Constraint::Length(1), // Slideshow position
            Constraint::Min(0),    // Spacer
            Constraint::Length(1), // Progress
        ])
        .split(info_area);

    let width = info_area.width as usize;

    let title_line = if state.title.is_empty() {
        Line::from(Span::styled(
            "Nothing selected",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(vec![
            Span::styled(state.state_symbol(), Style::default().fg(Color::Green)),
            Span::styled(
                truncate(&state.title, width.saturating_sub(2)),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ])
    };
    frame.render_widget(Paragraph::new(title_line), chunks[0]);

    let details_style = match state.details {
        Details::Searching => Style::default().fg(Color::Yellow),
        Details::NotFound => Style::default().fg(Color::Red),
        Details::PlayToSearch => Style::default().fg(Color::DarkGray),
        _ => Style::default().fg(Color::Cyan),
    };
    frame.render_widget(
        Paragraph::new(truncate(&state.details.label(), width)).style(details_style),
        chunks[1],
    );

    if let Some(current) = state.slideshow.current() {
        let caption = format!(
            "{}[{}/{}] {}",
            if state.slideshow.is_running() { "↻ " } else { "" },
            state.slideshow.index() + 1,
            state.slideshow.len(),
            current
        );
        frame.render_widget(
            Paragraph::new(truncate(&caption, width)).style(Style::default().fg(Color::DarkGray)),
            chunks[2],
        );
    }

    let progress_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(24), // Time + volume
        ])
        .split(chunks[4]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::DarkGray))
        .ratio(state.progress())
        .label("");
    frame.render_widget(gauge, progress_chunks[0]);

    let time = Paragraph::new(format!(
        " {} / {}  vol {:>3}%",
        state.position_string(),
        state.duration_string(),
        state.volume
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(time, progress_chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TrackMetadata;

    fn state() -> NowPlayingState {
        NowPlayingState::new(Duration::from_secs(3), None)
    }

    #[test]
    fn test_details_labels() {
        assert_eq!(Details::Searching.label(), "Searching iTunes...");
        assert_eq!(Details::NotFound.label(), "Metadata not found");
        assert_eq!(
            Details::Known {
                artist: Some(String::from("A")),
                album: Some(String::from("B"))
            }
            .label(),
            "A • B"
        );
    }

    #[test]
    fn test_show_track_loads_slideshow() {
        let mut track = Track::from_path("/music/song.mp3");
        track.apply_metadata(TrackMetadata {
            artist: Some(String::from("A")),
            album: Some(String::from("B")),
            artwork_url: Some(String::from("http://x/img.jpg")),
            ..Default::default()
        });
        track.add_image("/pics/extra.png");

        let mut np = state();
        np.show_track(&track);
        assert!(np.is_showing(&track));
        assert_eq!(np.slideshow.current(), Some("http://x/img.jpg"));
        assert!(np.slideshow.is_running());
        assert_eq!(np.details.label(), "A • B");
    }

    #[test]
    fn test_not_found_uses_file_name() {
        let mut track = Track::from_path("/music/song.mp3");
        track.rename("Custom");

        let mut np = state();
        np.show_not_found(&track);
        assert_eq!(np.title, "song");
        assert_eq!(np.details, Details::NotFound);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long title", 6), "a lon…");
    }

    #[test]
    fn test_progress_and_time() {
        let mut np = state();
        assert_eq!(np.progress(), 0.0);
        np.position = 75;
        np.duration = 150;
        assert_eq!(np.progress(), 0.5);
        assert_eq!(np.position_string(), "1:15");
        assert_eq!(np.duration_string(), "2:30");
    }
}
