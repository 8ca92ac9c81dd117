use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use crate::api::{ApiClient, SongDetails, SongRef};
use crate::config::AppConfig;
use crate::downloader::{DownloadPipeline, DownloadStatus, DownloadTask};
use crate::errors::Result;
use crate::importer;
use crate::playlist::PlaylistStore;
use crate::utils::generate_operation_id;

/// Notifications emitted by background workers, consumed on the shell's UI
/// thread. Each carries the id returned by the `spawn_*` call that started
/// the operation.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Human-readable status line for the shell's status bar
    Status(String),
    SearchFinished {
        operation: String,
        songs: Vec<SongRef>,
    },
    DetailsReady {
        operation: String,
        song: SongRef,
        details: Option<SongDetails>,
    },
    DownloadProgress {
        operation: String,
        percent: u8,
    },
    DownloadFinished {
        operation: String,
        success: bool,
        message: String,
        path: Option<PathBuf>,
    },
    BatchProgress {
        operation: String,
        current: usize,
        total: usize,
    },
    BatchSongFinished {
        operation: String,
        title: String,
    },
    BatchFinished {
        operation: String,
        tasks: Vec<DownloadTask>,
    },
    ImportProgress {
        operation: String,
        current: usize,
        total: usize,
    },
    ImportFinished {
        operation: String,
        success: bool,
        target: String,
        matched: Vec<SongRef>,
    },
}

/// True when a search-box entry denotes a remote playlist id rather than a
/// keyword query.
pub fn looks_like_playlist_id(query: &str) -> bool {
    !query.is_empty() && query.chars().all(|c| c.is_ascii_digit())
}

/// The application core a desktop shell embeds.
///
/// Long-running operations each get a dedicated worker task and report back
/// through the event channel; playlist and config mutations are direct
/// calls made from the UI thread.
pub struct App {
    config: Arc<Mutex<AppConfig>>,
    playlists: Arc<Mutex<PlaylistStore>>,
    api: Arc<ApiClient>,
    pipeline: Arc<DownloadPipeline>,
    events: UnboundedSender<AppEvent>,
    interrupted: Arc<AtomicBool>,
}

impl App {
    pub fn new() -> Result<(Self, UnboundedReceiver<AppEvent>)> {
        let config = AppConfig::load();
        info!("Configuration loaded");
        let playlists = PlaylistStore::load_default();
        let api = ApiClient::new()?;
        Self::with_components(config, playlists, api)
    }

    /// Assembles the core from explicit parts (custom store locations or
    /// alternate endpoints).
    pub fn with_components(
        config: AppConfig,
        playlists: PlaylistStore,
        api: ApiClient,
    ) -> Result<(Self, UnboundedReceiver<AppEvent>)> {
        let pipeline = Arc::new(DownloadPipeline::new(api.http().clone()));
        let (events, receiver) = mpsc::unbounded_channel();

        Ok((
            Self {
                config: Arc::new(Mutex::new(config)),
                playlists: Arc::new(Mutex::new(playlists)),
                api: Arc::new(api),
                pipeline,
                events,
                interrupted: Arc::new(AtomicBool::new(false)),
            },
            receiver,
        ))
    }

    /// Best-effort interruption of batch work, honored between songs.
    pub fn request_interruption(&self) {
        self.interrupted.store(true, Ordering::Relaxed);
    }

    // ---- config ----

    pub async fn quality(&self) -> u8 {
        self.config.lock().await.quality()
    }

    pub async fn set_quality(&self, quality: u8) -> Result<()> {
        self.config.lock().await.set_quality(quality)
    }

    pub async fn download_dir(&self) -> PathBuf {
        self.config.lock().await.last_download_dir.clone()
    }

    pub async fn set_download_dir(&self, dir: PathBuf) -> Result<()> {
        self.config.lock().await.set_last_download_dir(dir)
    }

    // ---- playlists ----

    pub async fn playlist_names(&self) -> Vec<String> {
        self.playlists.lock().await.names()
    }

    pub async fn playlist_songs(&self, name: &str) -> Vec<SongRef> {
        self.playlists.lock().await.songs(name).to_vec()
    }

    pub async fn create_playlist(&self, name: &str) -> Result<()> {
        self.playlists.lock().await.create(name)
    }

    pub async fn delete_playlist(&self, name: &str) -> Result<()> {
        self.playlists.lock().await.delete(name)
    }

    pub async fn rename_playlist(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.playlists.lock().await.rename(old_name, new_name)
    }

    pub async fn add_song_to_playlist(&self, name: &str, song: &SongRef) -> Result<bool> {
        self.playlists.lock().await.add_song(name, song)
    }

    pub async fn remove_song_from_playlist(&self, name: &str, index: usize) -> Result<()> {
        self.playlists.lock().await.remove_song(name, index)
    }

    /// Adds import-matched songs to the target playlist, returning how many
    /// were new. Called from the UI thread after `ImportFinished`.
    pub async fn add_matched_songs(&self, target: &str, songs: &[SongRef]) -> Result<usize> {
        let mut playlists = self.playlists.lock().await;
        let mut added = 0;
        for song in songs {
            if playlists.add_song(target, song)? {
                added += 1;
            }
        }
        Ok(added)
    }

    // ---- background operations ----

    /// Searches the catalog on a worker task. A failure surfaces as a
    /// status event plus an empty result.
    pub fn spawn_search(&self, query: String) -> String {
        let operation = generate_operation_id();
        let op = operation.clone();
        let api = self.api.clone();
        let tx = self.events.clone();

        tokio::spawn(async move {
            match api.search(&query).await {
                Ok(songs) => {
                    let _ = tx.send(AppEvent::Status(format!("Found {} songs", songs.len())));
                    let _ = tx.send(AppEvent::SearchFinished { operation: op, songs });
                }
                Err(e) => {
                    let _ = tx.send(AppEvent::Status(format!("Search failed: {}", e)));
                    let _ = tx.send(AppEvent::SearchFinished {
                        operation: op,
                        songs: Vec::new(),
                    });
                }
            }
        });

        operation
    }

    /// Resolves a song's playable URL and lyrics for preview.
    pub fn spawn_song_details(&self, song: SongRef) -> String {
        let operation = generate_operation_id();
        let op = operation.clone();
        let api = self.api.clone();
        let tx = self.events.clone();

        tokio::spawn(async move {
            let details = match api.song_details_robust(&song).await {
                Ok(details) => details,
                Err(e) => {
                    let _ = tx.send(AppEvent::Status(format!("Detail fetch failed: {}", e)));
                    None
                }
            };
            let _ = tx.send(AppEvent::DetailsReady {
                operation: op,
                song,
                details,
            });
        });

        operation
    }

    /// Downloads a single song into the configured directory.
    pub fn spawn_download(&self, song: SongRef) -> String {
        let operation = generate_operation_id();
        let op = operation.clone();
        let api = self.api.clone();
        let pipeline = self.pipeline.clone();
        let config = self.config.clone();
        let tx = self.events.clone();

        tokio::spawn(async move {
            let _ = tx.send(AppEvent::Status(format!("Resolving '{}'...", song.title)));

            let details = match api.song_details_robust(&song).await {
                Ok(Some(details)) => details,
                Ok(None) => {
                    let message = format!("Could not fetch details for '{}'", song.title);
                    let _ = tx.send(AppEvent::Status(message.clone()));
                    let _ = tx.send(AppEvent::DownloadFinished {
                        operation: op,
                        success: false,
                        message,
                        path: None,
                    });
                    return;
                }
                Err(e) => {
                    let _ = tx.send(AppEvent::Status(format!("Detail fetch failed: {}", e)));
                    let _ = tx.send(AppEvent::DownloadFinished {
                        operation: op,
                        success: false,
                        message: format!("Could not fetch details for '{}'", song.title),
                        path: None,
                    });
                    return;
                }
            };

            let download_dir = config.lock().await.last_download_dir.clone();

            let progress_tx = tx.clone();
            let progress_op = op.clone();
            let mut last_percent = 0u8;
            let result = pipeline
                .process_song(&details, &download_dir, move |_, _, percent| {
                    let percent = percent.clamp(0.0, 100.0) as u8;
                    if percent != last_percent {
                        last_percent = percent;
                        let _ = progress_tx.send(AppEvent::DownloadProgress {
                            operation: progress_op.clone(),
                            percent,
                        });
                    }
                })
                .await;

            match result {
                Ok(outcome) => {
                    let path = outcome.path().to_path_buf();
                    let _ = tx.send(AppEvent::Status(format!(
                        "Download complete: {}",
                        path.display()
                    )));
                    let _ = tx.send(AppEvent::DownloadFinished {
                        operation: op,
                        success: true,
                        message: path.display().to_string(),
                        path: Some(path),
                    });
                }
                Err(e) => {
                    let _ = tx.send(AppEvent::Status(e.to_string()));
                    let _ = tx.send(AppEvent::DownloadFinished {
                        operation: op,
                        success: false,
                        message: format!("Download of '{}' failed", song.title),
                        path: None,
                    });
                }
            }
        });

        operation
    }

    /// Downloads every song of a playlist sequentially, reporting per-song
    /// progress and a final per-task report.
    pub fn spawn_batch_download(&self, playlist_name: String) -> String {
        let operation = generate_operation_id();
        let op = operation.clone();
        let api = self.api.clone();
        let pipeline = self.pipeline.clone();
        let config = self.config.clone();
        let playlists = self.playlists.clone();
        let tx = self.events.clone();
        let interrupted = self.interrupted.clone();

        tokio::spawn(async move {
            let songs = playlists.lock().await.songs(&playlist_name).to_vec();
            if songs.is_empty() {
                let _ = tx.send(AppEvent::Status(format!(
                    "Playlist '{}' is empty",
                    playlist_name
                )));
                let _ = tx.send(AppEvent::BatchFinished {
                    operation: op,
                    tasks: Vec::new(),
                });
                return;
            }

            let download_dir = config.lock().await.last_download_dir.clone();
            let total = songs.len();
            let mut tasks: Vec<DownloadTask> = songs
                .iter()
                .enumerate()
                .map(|(i, song)| DownloadTask::new(song, (i + 1) as u32))
                .collect();

            for (i, song) in songs.iter().enumerate() {
                if interrupted.load(Ordering::Relaxed) {
                    warn!("Batch download interrupted with {} songs left", total - i);
                    for task in &mut tasks[i..] {
                        task.status = DownloadStatus::Cancelled;
                    }
                    break;
                }

                let _ = tx.send(AppEvent::BatchProgress {
                    operation: op.clone(),
                    current: i + 1,
                    total,
                });
                tasks[i].status = DownloadStatus::Downloading;
                tasks[i].started_at = Some(chrono::Utc::now());

                let details = match api.song_details_robust(song).await {
                    Ok(Some(details)) => details,
                    Ok(None) => {
                        let _ = tx.send(AppEvent::Status(format!(
                            "Could not fetch details for '{}', skipping",
                            song.title
                        )));
                        tasks[i].status = DownloadStatus::Failed;
                        tasks[i].error = Some("no details available".to_string());
                        continue;
                    }
                    Err(e) => {
                        let _ = tx.send(AppEvent::Status(format!(
                            "Could not fetch details for '{}', skipping",
                            song.title
                        )));
                        tasks[i].status = DownloadStatus::Failed;
                        tasks[i].error = Some(e.to_string());
                        continue;
                    }
                };

                match pipeline.process_song(&details, &download_dir, |_, _, _| {}).await {
                    Ok(outcome) => {
                        tasks[i].status = DownloadStatus::Completed;
                        tasks[i].output_path = Some(outcome.path().to_path_buf());
                        tasks[i].completed_at = Some(chrono::Utc::now());
                        let _ = tx.send(AppEvent::BatchSongFinished {
                            operation: op.clone(),
                            title: song.title.clone(),
                        });
                    }
                    Err(e) => {
                        let _ = tx.send(AppEvent::Status(e.to_string()));
                        tasks[i].status = DownloadStatus::Failed;
                        tasks[i].error = Some(e.to_string());
                    }
                }
            }

            let _ = tx.send(AppEvent::Status("Batch download complete".to_string()));
            let _ = tx.send(AppEvent::BatchFinished {
                operation: op,
                tasks,
            });
        });

        operation
    }

    /// Imports a remote playlist into `target`, de-duplicated and matched
    /// against the catalog. The matched songs come back in `ImportFinished`
    /// for the UI thread to add via [`App::add_matched_songs`].
    pub fn spawn_import(&self, playlist_id: String, target: String) -> String {
        let operation = generate_operation_id();
        let op = operation.clone();
        let api = self.api.clone();
        let playlists = self.playlists.clone();
        let tx = self.events.clone();

        tokio::spawn(async move {
            let existing = playlists.lock().await.songs(&target).to_vec();

            let status_tx = tx.clone();
            let progress_tx = tx.clone();
            let progress_op = op.clone();
            let result = importer::import_remote_playlist(
                &api,
                &playlist_id,
                &existing,
                move |message| {
                    let _ = status_tx.send(AppEvent::Status(message));
                },
                move |current, total| {
                    let _ = progress_tx.send(AppEvent::ImportProgress {
                        operation: progress_op.clone(),
                        current,
                        total,
                    });
                },
            )
            .await;

            match result {
                Ok(matched) => {
                    let _ = tx.send(AppEvent::ImportFinished {
                        operation: op,
                        success: true,
                        target,
                        matched,
                    });
                }
                Err(e) => {
                    let _ = tx.send(AppEvent::Status(format!("Playlist import failed: {}", e)));
                    let _ = tx.send(AppEvent::ImportFinished {
                        operation: op,
                        success: false,
                        target,
                        matched: Vec::new(),
                    });
                }
            }
        });

        operation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::DEFAULT_PLAYLIST;

    #[test]
    fn test_looks_like_playlist_id() {
        assert!(looks_like_playlist_id("9521850610"));
        assert!(!looks_like_playlist_id("hello world"));
        assert!(!looks_like_playlist_id("123 456"));
        assert!(!looks_like_playlist_id(""));
    }

    fn test_app() -> (App, UnboundedReceiver<AppEvent>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path().join("config.json"));
        let playlists = PlaylistStore::load_from(dir.path().join("playlists.json"));
        // Unreachable endpoints keep workers off the network
        let api = ApiClient::with_endpoints("http://127.0.0.1:9/api", "http://127.0.0.1:9/list")
            .unwrap();
        let (app, rx) = App::with_components(config, playlists, api).unwrap();
        (app, rx, dir)
    }

    #[tokio::test]
    async fn test_playlist_facade_enforces_invariants() {
        let (app, _rx, _dir) = test_app();

        assert_eq!(app.playlist_names().await, vec![DEFAULT_PLAYLIST.to_string()]);
        assert!(app.delete_playlist(DEFAULT_PLAYLIST).await.is_err());

        app.create_playlist("Trip").await.unwrap();
        assert!(app.create_playlist("Trip").await.is_err());
        assert!(app.rename_playlist("Trip", DEFAULT_PLAYLIST).await.is_err());

        app.delete_playlist("Trip").await.unwrap();
        assert_eq!(app.playlist_names().await.len(), 1);
    }

    #[tokio::test]
    async fn test_config_facade_roundtrip() {
        let (app, _rx, _dir) = test_app();
        app.set_quality(12).await.unwrap();
        assert_eq!(app.quality().await, 12);
    }

    #[tokio::test]
    async fn test_failed_search_reports_status_and_empty_result() {
        let (app, mut rx, _dir) = test_app();
        let op = app.spawn_search("some song".to_string());

        let mut saw_status = false;
        loop {
            match rx.recv().await.expect("worker should emit events") {
                AppEvent::Status(_) => saw_status = true,
                AppEvent::SearchFinished { operation, songs } => {
                    assert_eq!(operation, op);
                    assert!(songs.is_empty());
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_status);
    }
}
