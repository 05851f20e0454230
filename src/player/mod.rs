//! Local file playback.

mod backend;

pub use backend::{Player, PlayerEvent};
