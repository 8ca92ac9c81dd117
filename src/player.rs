use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the next track is chosen during playlist playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    ListLoop,
    Random,
    SingleLoop,
}

impl PlaybackMode {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackMode::ListLoop => "List loop",
            PlaybackMode::Random => "Shuffle",
            PlaybackMode::SingleLoop => "Single loop",
        }
    }

    /// The mode the toggle button cycles to
    pub fn next(&self) -> Self {
        match self {
            PlaybackMode::ListLoop => PlaybackMode::Random,
            PlaybackMode::Random => PlaybackMode::SingleLoop,
            PlaybackMode::SingleLoop => PlaybackMode::ListLoop,
        }
    }
}

/// What the shell should do when the current track finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEndAction {
    Restart,
    Advance,
    Stop,
}

/// Playback-queue state. Track selection only; decoding and output belong
/// to the embedding shell's media framework.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub mode: PlaybackMode,
    pub from_playlist: bool,
    pub current_row: Option<usize>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::ListLoop,
            from_playlist: false,
            current_row: None,
        }
    }
}

impl PlaybackState {
    /// Row to play next, or None when not in playlist playback or the
    /// playlist is empty.
    pub fn next_row(&self, playlist_len: usize) -> Option<usize> {
        self.next_row_with(playlist_len, &mut rand::thread_rng())
    }

    fn next_row_with(&self, playlist_len: usize, rng: &mut impl Rng) -> Option<usize> {
        if !self.from_playlist || playlist_len == 0 {
            return None;
        }
        let current = self.current_row.unwrap_or(0);
        match self.mode {
            PlaybackMode::ListLoop => Some((current + 1) % playlist_len),
            PlaybackMode::Random => Some(rng.gen_range(0..playlist_len)),
            PlaybackMode::SingleLoop => Some(current.min(playlist_len - 1)),
        }
    }

    pub fn previous_row(&self, playlist_len: usize) -> Option<usize> {
        if !self.from_playlist || playlist_len == 0 {
            return None;
        }
        let current = self.current_row.unwrap_or(0);
        Some((current + playlist_len - 1) % playlist_len)
    }

    pub fn on_media_end(&self) -> MediaEndAction {
        if self.mode == PlaybackMode::SingleLoop {
            MediaEndAction::Restart
        } else if self.from_playlist {
            MediaEndAction::Advance
        } else {
            MediaEndAction::Stop
        }
    }
}

/// The small fixed set of player error codes the shell reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerError {
    Resource,
    Format,
    Network,
    AccessDenied,
}

impl PlayerError {
    pub fn message(&self) -> &'static str {
        match self {
            PlayerError::Resource => "Media resource error: the stream may be broken or unreachable",
            PlayerError::Format => "Unsupported media format",
            PlayerError::Network => "Network error: check the connection",
            PlayerError::AccessDenied => "Access denied while opening the media",
        }
    }

    /// During playlist playback, transient errors skip to the next track
    /// instead of stopping; single-loop would retry the same broken stream
    /// forever, so it stops.
    pub fn should_advance(&self, state: &PlaybackState) -> bool {
        matches!(self, PlayerError::Network | PlayerError::Resource)
            && state.from_playlist
            && state.mode != PlaybackMode::SingleLoop
    }
}
