pub mod client;

pub use client::ApiClient;

use serde::{Deserialize, Serialize};

/// Placeholder for missing vendor fields
pub const UNKNOWN: &str = "Unknown";

/// Minimal identifying tuple for a catalog entry, produced by search and
/// stored in playlists. `n` is the vendor's result index for the original
/// `query`; re-resolving a playable URL later goes through
/// [`ApiClient::song_details_robust`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongRef {
    pub n: u64,
    pub raw_title: String,
    pub title: String,
    pub singer: String,
    pub query: String,
}

/// Full details for one song. Ephemeral: fetched per play/download, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SongDetails {
    pub title: String,
    pub singer: String,
    pub album: String,
    pub url: Option<String>,
    pub cover: Option<String>,
    pub lyric: Option<String>,
}

/// One entry of a remote (vendor-hosted) playlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteTrack {
    pub title: String,
    pub singer: String,
}
