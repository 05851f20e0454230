//! Terminal setup and teardown.

use std::io::{stdout, Stdout};

use color_eyre::Result;
use crossterm::{
    cursor,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;

/// The terminal type used by the player UI.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Raw-mode terminal that is restored when dropped.
pub struct TerminalGuard {
    terminal: Tui,
}

impl TerminalGuard {
    /// Switch to the alternate screen in raw mode.
    pub fn enter() -> Result<Self> {
        stdout().execute(EnterAlternateScreen)?;
        stdout().execute(cursor::Hide)?;
        enable_raw_mode()?;

        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        terminal.clear()?;

        Ok(Self { terminal })
    }

    pub fn terminal(&mut self) -> &mut Tui {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = restore() {
            tracing::warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Leave raw mode and the alternate screen.
pub fn restore() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(cursor::Show)?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

/// Install panic and error hooks that restore the terminal before reporting.
pub fn install_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .into_hooks();

    let panic_hook = panic_hook.into_panic_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        panic_hook(panic_info);
    }));

    let eyre_hook = eyre_hook.into_eyre_hook();
    color_eyre::eyre::set_hook(Box::new(move |error| {
        let _ = restore();
        eyre_hook(error)
    }))?;

    Ok(())
}
