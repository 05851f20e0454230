//! trackshelf - A terminal music player for a local song library.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui_image::picker::Picker;
use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;

mod action;
mod app;
mod artwork;
mod client;
mod config;
mod enrich;
mod library;
mod player;
mod slideshow;
mod tui;
mod ui;

use action::{Action, PromptKind};
use app::App;
use client::{ItunesClient, MetadataLookup};
use config::Config;
use enrich::{Activation, Enricher, LookupCompletion, Resolution};
use library::{scan, Library, LibraryStore};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "trackshelf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Library file (overrides config)
    #[arg(short, long, global = true)]
    library: Option<PathBuf>,

    /// Metadata search endpoint (overrides config)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add audio files to the library
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove a track from the library
    Remove { file: PathBuf },
    /// Print the library
    List,
    /// Add every audio file under a directory
    Scan { dir: PathBuf },
    /// Fetch and cache metadata for one track
    Lookup { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tui::install_hooks()?;

    let args = Args::parse();
    init_logging()?;

    let config_file = match args.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    if !config_file.exists() {
        match Config::default().save_to(&config_file) {
            Ok(()) => tracing::info!("Wrote default config to {}", config_file.display()),
            Err(e) => tracing::warn!("Could not write default config: {}", e),
        }
    }
    let mut config = Config::load_from(&config_file).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable config {}: {}", config_file.display(), e);
        Config::default()
    });

    // Apply command-line overrides
    if let Some(library) = args.library {
        config.library.path = Some(library);
    }
    if let Some(endpoint) = args.endpoint {
        config.lookup.endpoint = endpoint;
    }

    let store = LibraryStore::new(config.library_path());
    let library = store.load()?;
    let lookup: Arc<dyn MetadataLookup> = Arc::new(ItunesClient::new(&config.lookup.endpoint));

    match args.command {
        None => run_tui(config, library, store, lookup).await,
        Some(Command::Add { files }) => add_files(library, &store, &files),
        Some(Command::Remove { file }) => remove_file(library, &store, &file),
        Some(Command::List) => {
            list(&library);
            Ok(())
        }
        Some(Command::Scan { dir }) => scan_dir(library, &store, &config, &dir),
        Some(Command::Lookup { file }) => lookup_file(library, &store, lookup, &file).await,
    }
}

/// Log to a file; the terminal UI owns stdout.
fn init_logging() -> Result<()> {
    let log_file = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trackshelf")
        .join("trackshelf.log");

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::fs::File::create(&log_file)?)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with(file_layer)
        .try_init()
        .ok();

    Ok(())
}

async fn run_tui(
    config: Config,
    library: Library,
    store: LibraryStore,
    lookup: Arc<dyn MetadataLookup>,
) -> Result<()> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut guard = tui::TerminalGuard::enter()?;

    let picker = if config.ui.show_album_art {
        Picker::from_query_stdio().ok()
    } else {
        None
    };

    let mut app = App::new(config, library, store, lookup, action_tx.clone(), picker);
    app.init()?;

    // Main event loop
    let tick_rate = Duration::from_millis(100);

    loop {
        guard
            .terminal()
            .draw(|frame| ui::render(frame, &mut app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let action = handle_key_event(key.code, key.modifiers, &app);
                    if action != Action::None {
                        action_tx.send(action)?;
                    }
                }
            }
        }

        action_tx.send(Action::Tick)?;

        // Process all pending actions
        while let Ok(action) = action_rx.try_recv() {
            app.handle_action(action)?;
        }

        if app.should_quit {
            break;
        }
    }

    drop(guard);
    Ok(())
}

/// Map key events to actions.
fn handle_key_event(code: KeyCode, modifiers: KeyModifiers, app: &App) -> Action {
    if app.prompt.is_active() {
        return match code {
            KeyCode::Esc => Action::PromptCancel,
            KeyCode::Enter => Action::PromptSubmit,
            KeyCode::Backspace => Action::PromptBackspace,
            KeyCode::Char(c) => Action::PromptInput(c),
            _ => Action::None,
        };
    }

    if app.show_help {
        return match code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => Action::HideHelp,
            _ => Action::None,
        };
    }

    if app.error_message.is_some() {
        if let KeyCode::Char('x') | KeyCode::Esc = code {
            return Action::ClearError;
        }
    }

    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    if app.editor.is_open() {
        return match code {
            KeyCode::Esc | KeyCode::Char('e') => Action::CloseEditor,
            KeyCode::Up | KeyCode::Char('k') => Action::NavigateUp,
            KeyCode::Down | KeyCode::Char('j') => Action::NavigateDown,
            KeyCode::Char('t') => Action::OpenPrompt(PromptKind::RenameTrack),
            KeyCode::Char('a') => Action::OpenPrompt(PromptKind::AddImage),
            KeyCode::Char('d') | KeyCode::Delete => Action::EditorRemoveImage,
            KeyCode::Char(' ') => Action::PlayPause,
            KeyCode::Char('q') => Action::Quit,
            _ => Action::None,
        };
    }

    match code {
        // Navigation
        KeyCode::Up | KeyCode::Char('k') => Action::NavigateUp,
        KeyCode::Down | KeyCode::Char('j') => Action::NavigateDown,
        KeyCode::Char('g') => Action::JumpToTop,
        KeyCode::Char('G') => Action::JumpToBottom,

        // Playback
        KeyCode::Enter => Action::PlaySelected,
        KeyCode::Char(' ') => Action::PlayPause,
        KeyCode::Char('s') => Action::Stop,
        KeyCode::Char('.') | KeyCode::Char('>') => Action::SeekForward,
        KeyCode::Char(',') | KeyCode::Char('<') => Action::SeekBackward,

        // Volume
        KeyCode::Char('+') | KeyCode::Char('=') => Action::VolumeUp,
        KeyCode::Char('-') => Action::VolumeDown,

        // Library
        KeyCode::Char('a') => Action::OpenPrompt(PromptKind::AddFile),
        KeyCode::Char('o') => Action::OpenPrompt(PromptKind::ScanDirectory),
        KeyCode::Char('d') | KeyCode::Delete => Action::RemoveSelected,
        KeyCode::Char('e') => Action::OpenEditor,

        KeyCode::Char('?') => Action::ShowHelp,
        KeyCode::Char('x') => Action::ClearError,
        KeyCode::Char('q') => Action::Quit,

        _ => Action::None,
    }
}

/// Find the library key for a path given on the command line.
fn resolve(library: &Library, file: &Path) -> Option<PathBuf> {
    if library.contains(file) {
        return Some(file.to_path_buf());
    }
    std::fs::canonicalize(file)
        .ok()
        .filter(|p| library.contains(p))
}

fn add_files(mut library: Library, store: &LibraryStore, files: &[PathBuf]) -> Result<()> {
    let mut added = 0;
    for file in files {
        let path = match std::fs::canonicalize(file) {
            Ok(path) if path.is_file() => path,
            _ => {
                eprintln!("Skipping {}: not a file", file.display());
                continue;
            }
        };
        if library.add_file(path) {
            added += 1;
        }
    }

    if added > 0 {
        store.save(&library)?;
    }
    println!("Added {} new track(s), library has {}", added, library.len());
    Ok(())
}

fn remove_file(mut library: Library, store: &LibraryStore, file: &Path) -> Result<()> {
    let Some(path) = resolve(&library, file) else {
        bail!("{} is not in the library", file.display());
    };

    library.remove(&path);
    store.save(&library)?;
    println!("Removed {}", path.display());
    Ok(())
}

fn list(library: &Library) {
    for track in library.tracks() {
        let marker = if track.metadata_cached { "✓" } else { " " };
        println!(
            "{} {}\t{}\t{}\t{}",
            marker,
            track.title,
            track.display_artist(),
            track.display_album(),
            track.file_path.display()
        );
    }
}

fn scan_dir(mut library: Library, store: &LibraryStore, config: &Config, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let dir = std::fs::canonicalize(dir)?;
    let found = scan::scan(&dir, &config.library.extensions, config.library.recursive);
    let total = found.len();
    let added = library.merge(found);
    if added > 0 {
        store.save(&library)?;
    }
    println!("Found {} audio file(s), {} new", total, added);
    Ok(())
}

async fn lookup_file(
    mut library: Library,
    store: &LibraryStore,
    lookup: Arc<dyn MetadataLookup>,
    file: &Path,
) -> Result<()> {
    let Some(track) = resolve(&library, file).and_then(|p| library.get(&p).cloned()) else {
        bail!("{} is not in the library", file.display());
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<LookupCompletion>();
    let mut enricher = Enricher::new(lookup, tx);

    if enricher.activate(&track) == Activation::Cached {
        println!(
            "{} (cached): {} / {}",
            track.title,
            track.display_artist(),
            track.display_album()
        );
        return Ok(());
    }

    println!("Searching iTunes for '{}'...", track.title);
    let completion = rx
        .recv()
        .await
        .ok_or_else(|| eyre!("lookup task ended without reporting"))?;

    match enricher.complete(completion, &mut library, store)? {
        Resolution::Applied(path) => {
            if let Some(track) = library.get(&path) {
                println!(
                    "{}: {} / {}",
                    track.title,
                    track.display_artist(),
                    track.display_album()
                );
                if let Some(cover) = &track.cover {
                    println!("Cover: {}", cover);
                }
            }
        }
        Resolution::NotFound(_) => println!("Metadata not found"),
        Resolution::Cancelled | Resolution::Stale => println!("Lookup cancelled"),
    }
    Ok(())
}
