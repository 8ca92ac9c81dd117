//! Application core for a desktop music downloader.
//!
//! Search a third-party catalog, preview tracks, keep named playlists, and
//! batch-download audio with embedded metadata, lyrics and cover art. A
//! desktop shell owns the widgets and the media player; it drives this crate
//! through [`App`] and consumes [`AppEvent`] notifications on its UI thread.

pub mod api;
pub mod app;
pub mod config;
pub mod downloader;
pub mod errors;
pub mod importer;
pub mod lyrics;
pub mod metadata;
pub mod player;
pub mod playlist;
pub mod utils;

pub use api::{ApiClient, RemoteTrack, SongDetails, SongRef};
pub use app::{looks_like_playlist_id, App, AppEvent};
pub use config::AppConfig;
pub use downloader::{DownloadOutcome, DownloadPipeline, DownloadStatus, DownloadTask};
pub use errors::{AppError, Result};
pub use player::{MediaEndAction, PlaybackMode, PlaybackState, PlayerError};
pub use playlist::{PlaylistStore, DEFAULT_PLAYLIST};

/// Initializes env_logger for shells that have no logging setup of their
/// own. Call once at startup.
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
