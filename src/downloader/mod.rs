pub mod pipeline;

pub use pipeline::DownloadPipeline;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::SongRef;
use crate::utils::generate_operation_id;

/// Per-song record kept during a batch download for shell-side reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: String,
    pub title: String,
    pub singer: String,
    pub status: DownloadStatus,
    pub error: Option<String>,
    pub output_path: Option<PathBuf>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub order: u32,
}

impl DownloadTask {
    pub fn new(song: &SongRef, order: u32) -> Self {
        Self {
            id: generate_operation_id(),
            title: song.title.clone(),
            singer: song.singer.clone(),
            status: DownloadStatus::Pending,
            error: None,
            output_path: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            order,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

/// Result of the single-song pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Freshly downloaded and moved into place
    Downloaded(PathBuf),
    /// The destination already existed; nothing was fetched
    AlreadyExists(PathBuf),
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DownloadOutcome::Downloaded(path) | DownloadOutcome::AlreadyExists(path) => path,
        }
    }
}
