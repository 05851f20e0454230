//! Audio playback backend using rodio.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use rodio::{Decoder, OutputStream, Sink, Source};
use tokio::sync::mpsc;

use crate::action::PlayerState;

/// Messages sent to the player thread.
#[derive(Debug)]
pub enum PlayerCommand {
    Play(PathBuf),
    Pause,
    Resume,
    Stop,
    SetVolume(f32),
    Seek(Duration),
}

/// Messages sent from the player thread.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    StateChanged(PlayerState),
    Progress {
        position: Duration,
        duration: Duration,
    },
    TrackEnded,
    Error(String),
}

/// Audio player that runs in a separate thread.
pub struct Player {
    command_tx: mpsc::UnboundedSender<PlayerCommand>,
    event_rx: mpsc::UnboundedReceiver<PlayerEvent>,
}

impl Player {
    /// Create a new audio player.
    pub fn new() -> Result<Self> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name(String::from("trackshelf-player"))
            .spawn(move || {
                if let Err(e) = run_player_thread(command_rx, event_tx.clone()) {
                    tracing::error!("Player thread error: {}", e);
                    let _ = event_tx.send(PlayerEvent::Error(e.to_string()));
                }
            })?;

        Ok(Self {
            command_tx,
            event_rx,
        })
    }

    /// Play a local audio file.
    pub fn play(&self, path: PathBuf) -> Result<()> {
        self.command_tx.send(PlayerCommand::Play(path))?;
        Ok(())
    }

    /// Pause playback.
    pub fn pause(&self) -> Result<()> {
        self.command_tx.send(PlayerCommand::Pause)?;
        Ok(())
    }

    /// Resume playback.
    pub fn resume(&self) -> Result<()> {
        self.command_tx.send(PlayerCommand::Resume)?;
        Ok(())
    }

    /// Stop playback.
    pub fn stop(&self) -> Result<()> {
        self.command_tx.send(PlayerCommand::Stop)?;
        Ok(())
    }

    /// Set volume (0.0 to 1.0).
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.command_tx
            .send(PlayerCommand::SetVolume(volume.clamp(0.0, 1.0)))?;
        Ok(())
    }

    /// Seek to a position.
    pub fn seek(&self, position: Duration) -> Result<()> {
        self.command_tx.send(PlayerCommand::Seek(position))?;
        Ok(())
    }

    /// Try to receive a player event (non-blocking).
    pub fn try_recv_event(&mut self) -> Option<PlayerEvent> {
        self.event_rx.try_recv().ok()
    }
}

/// Currently loaded file.
struct Loaded {
    path: PathBuf,
    duration: Option<Duration>,
}

/// Run the player thread.
fn run_player_thread(
    mut command_rx: mpsc::UnboundedReceiver<PlayerCommand>,
    event_tx: mpsc::UnboundedSender<PlayerEvent>,
) -> Result<()> {
    // Initialize audio output
    let (_stream, stream_handle) = OutputStream::try_default()?;
    let mut sink = Sink::try_new(&stream_handle)?;

    let mut loaded: Option<Loaded> = None;
    let mut current_volume: f32 = 0.8;
    let mut playing = false;
    let mut position = Duration::ZERO;
    let tick = Duration::from_millis(100);

    loop {
        // Check for commands (non-blocking)
        match command_rx.try_recv() {
            Ok(cmd) => match cmd {
                PlayerCommand::Play(path) => {
                    sink.stop();
                    sink = Sink::try_new(&stream_handle)?;
                    loaded = None;

                    match start_file(&path, &sink, current_volume, Duration::ZERO, false) {
                        Ok(duration) => {
                            tracing::info!("Playing {}", path.display());
                            loaded = Some(Loaded { path, duration });
                            playing = true;
                            position = Duration::ZERO;
                            let _ = event_tx.send(PlayerEvent::StateChanged(PlayerState::Playing));
                        }
                        Err(e) => {
                            tracing::warn!("Cannot play {}: {}", path.display(), e);
                            playing = false;
                            let _ = event_tx.send(PlayerEvent::Error(format!(
                                "Cannot play {}: {}",
                                path.display(),
                                e
                            )));
                        }
                    }
                }
                PlayerCommand::Pause => {
                    sink.pause();
                    playing = false;
                    let _ = event_tx.send(PlayerEvent::StateChanged(PlayerState::Paused));
                }
                PlayerCommand::Resume => {
                    if loaded.is_some() {
                        sink.play();
                        playing = true;
                        let _ = event_tx.send(PlayerEvent::StateChanged(PlayerState::Playing));
                    }
                }
                PlayerCommand::Stop => {
                    sink.stop();
                    sink = Sink::try_new(&stream_handle)?;
                    loaded = None;
                    playing = false;
                    position = Duration::ZERO;
                    let _ = event_tx.send(PlayerEvent::StateChanged(PlayerState::Stopped));
                }
                PlayerCommand::SetVolume(vol) => {
                    current_volume = vol;
                    sink.set_volume(vol);
                }
                PlayerCommand::Seek(target) => {
                    // Seek by reopening the file and skipping ahead
                    if let Some(current) = &loaded {
                        sink.stop();
                        sink = Sink::try_new(&stream_handle)?;

                        // A paused track stays paused at the new position
                        let paused = !playing;
                        let target = current.duration.map_or(target, |d| target.min(d));
                        if let Err(e) =
                            start_file(&current.path, &sink, current_volume, target, paused)
                        {
                            let _ =
                                event_tx.send(PlayerEvent::Error(format!("Seek failed: {}", e)));
                        } else {
                            position = target;
                            playing = !paused;
                            let state = if paused {
                                PlayerState::Paused
                            } else {
                                PlayerState::Playing
                            };
                            let _ = event_tx.send(PlayerEvent::StateChanged(state));
                        }
                    }
                }
            },
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {
                // Channel closed, exit thread
                break;
            }
        }

        // Check if track ended
        if sink.empty() && playing {
            playing = false;
            loaded = None;
            let _ = event_tx.send(PlayerEvent::TrackEnded);
        }

        // Update progress (approximate based on time elapsed)
        if playing {
            position += tick;

            let duration = loaded
                .as_ref()
                .and_then(|l| l.duration)
                .unwrap_or(Duration::ZERO);
            let _ = event_tx.send(PlayerEvent::Progress {
                position,
                duration,
            });
        }

        // Sleep to avoid busy waiting
        std::thread::sleep(tick);
    }

    Ok(())
}

/// Decode a file into the sink, starting at `skip`, and leave the sink
/// paused if `paused` is set. Returns the total duration when the decoder
/// knows it.
fn start_file(
    path: &Path,
    sink: &Sink,
    volume: f32,
    skip: Duration,
    paused: bool,
) -> Result<Option<Duration>> {
    let file = File::open(path)?;
    let source = Decoder::new(BufReader::new(file))?;
    let duration = source.total_duration();

    if skip > Duration::ZERO {
        sink.append(source.skip_duration(skip));
    } else {
        sink.append(source);
    }
    sink.set_volume(volume);
    if paused {
        sink.pause();
    } else {
        sink.play();
    }

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_start_file_rejects_missing_and_undecodable() {
        let (sink, _queue) = Sink::new_idle();
        assert!(
            start_file(Path::new("/no/such/file.mp3"), &sink, 0.5, Duration::ZERO, false).is_err()
        );

        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(start_file(&path, &sink, 0.5, Duration::ZERO, false).is_err());
        assert!(sink.empty());
    }

    /// One second of 8 kHz mono 16-bit silence as a WAV file.
    fn silent_wav() -> Vec<u8> {
        let samples = 8000u32;
        let data_len = samples * 2;
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&1u16.to_le_bytes()); // mono
        wav.extend_from_slice(&8000u32.to_le_bytes());
        wav.extend_from_slice(&16000u32.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        wav.resize(wav.len() + data_len as usize, 0);
        wav
    }

    #[test]
    fn test_start_file_keeps_pause_when_asked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        std::fs::write(&path, silent_wav()).unwrap();

        let (sink, _queue) = Sink::new_idle();
        start_file(&path, &sink, 0.5, Duration::from_millis(500), true).unwrap();
        assert!(sink.is_paused());
        assert!(!sink.empty());

        let (sink, _queue) = Sink::new_idle();
        start_file(&path, &sink, 0.5, Duration::ZERO, false).unwrap();
        assert!(!sink.is_paused());
    }
}
