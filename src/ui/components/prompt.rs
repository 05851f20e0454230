//! Single-line text prompt.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::centered_rect;
use crate::action::PromptKind;

/// Prompt state.
#[derive(Debug, Default)]
pub struct PromptState {
    /// What the prompt collects; `None` when closed
    pub kind: Option<PromptKind>,

    /// Current input
    pub input: String,
}

impl PromptState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.kind.is_some()
    }

    pub fn open(&mut self, kind: PromptKind, initial: &str) {
        self.kind = Some(kind);
        self.input = initial.to_string();
    }

    pub fn push(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn cancel(&mut self) {
        self.kind = None;
        self.input.clear();
    }

    /// Close the prompt and hand back what was typed.
    pub fn take(&mut self) -> Option<(PromptKind, String)> {
        let kind = self.kind.take()?;
        Some((kind, std::mem::take(&mut self.input)))
    }
}

/// Render the prompt popup.
pub fn render_prompt(frame: &mut Frame, area: Rect, state: &PromptState) {
    let Some(kind) = state.kind else {
        return;
    };

    let popup = centered_rect(60, 20, area);
    let popup = Rect {
        height: popup.height.min(3),
        ..popup
    };
    frame.render_widget(Clear, popup);

    let input = Paragraph::new(format!("{}▏", state.input))
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} (Enter to confirm, Esc to cancel)", kind.title()))
                .border_style(Style::default().fg(Color::Yellow)),
        );
    frame.render_widget(input, popup);
}
