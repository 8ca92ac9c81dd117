use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use log::{info, warn};
use reqwest::Client;

use crate::api::{SongDetails, UNKNOWN};
use crate::downloader::DownloadOutcome;
use crate::errors::{AppError, Result};
use crate::metadata::{embedder, CoverArt};
use crate::utils::{clean_title, ensure_dir_exists, sanitize_track_filename};

const HEAD_TIMEOUT: Duration = Duration::from_secs(5);

const KNOWN_AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "m4a", "flac", "wav", "ogg", "aac"];

/// Downloads one resolved song: stream the audio to a temp file, fetch the
/// cover, embed tags, then rename into place. Temp files are cleaned up on
/// every exit path (delete-on-drop).
pub struct DownloadPipeline {
    client: Client,
}

impl DownloadPipeline {
    /// Takes a clone of the process-wide pooled client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn process_song<F>(
        &self,
        details: &SongDetails,
        download_dir: &Path,
        mut progress: F,
    ) -> Result<DownloadOutcome>
    where
        F: FnMut(u64, u64, f32) + Send,
    {
        let url = details.url.as_deref().ok_or_else(|| {
            AppError::Download(format!("'{}' has no playable URL", details.title))
        })?;

        ensure_dir_exists(download_dir).await?;

        let title = {
            let cleaned = clean_title(&details.title);
            if cleaned.is_empty() {
                UNKNOWN.to_string()
            } else {
                cleaned
            }
        };
        let singer = if details.singer.is_empty() {
            UNKNOWN.to_string()
        } else {
            details.singer.clone()
        };

        let ext = self.resolve_extension(url).await;
        let final_path = download_dir.join(format!(
            "{}.{}",
            sanitize_track_filename(&title, &singer),
            ext
        ));

        if final_path.exists() {
            info!("File already exists, skipping: {:?}", final_path);
            return Ok(DownloadOutcome::AlreadyExists(final_path));
        }

        info!("Downloading: {}", title);
        let mut temp = tempfile::Builder::new()
            .prefix("temp_")
            .suffix(&format!(".{}", ext))
            .tempfile_in(download_dir)?;
        self.stream_to_file(url, temp.as_file_mut(), &mut progress)
            .await?;

        let cover = match details.cover.as_deref() {
            Some(cover_url) => match self.fetch_bytes(cover_url).await {
                Ok(bytes) => Some(CoverArt::from_bytes(bytes)),
                Err(e) => {
                    warn!("Cover download failed for '{}': {}", title, e);
                    None
                }
            },
            None => None,
        };

        // lofty does blocking file IO
        let temp_path = temp.path().to_path_buf();
        let embed_details = details.clone();
        let embed_result = tokio::task::spawn_blocking(move || {
            embedder::embed_tags(&temp_path, &embed_details, cover.as_ref())
        })
        .await;
        match embed_result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to embed metadata for '{}': {}", title, e),
            Err(e) => warn!("Tag embedding task panicked for '{}': {}", title, e),
        }

        temp.persist(&final_path).map_err(|e| {
            AppError::Download(format!("Failed to move download into place: {}", e))
        })?;

        info!("Download complete: {:?}", final_path);
        Ok(DownloadOutcome::Downloaded(final_path))
    }

    /// Streams a response body to a file with progress callbacks
    /// (downloaded bytes, total bytes, percent).
    async fn stream_to_file<F>(
        &self,
        url: &str,
        file: &mut std::fs::File,
        progress: &mut F,
    ) -> Result<()>
    where
        F: FnMut(u64, u64, f32) + Send,
    {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Download(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;

            let percent = if total_size > 0 {
                (downloaded as f32 / total_size as f32) * 100.0
            } else {
                0.0
            };
            progress(downloaded, total_size, percent);
        }

        file.flush()?;
        Ok(())
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Download(format!(
                "HTTP error: {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// File extension from a HEAD request's Content-Type, falling back to
    /// the URL path extension, then mp3.
    async fn resolve_extension(&self, url: &str) -> String {
        let head = self
            .client
            .head(url)
            .timeout(HEAD_TIMEOUT)
            .send()
            .await;

        if let Ok(response) = head {
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if let Some(ext) = extension_for_content_type(content_type) {
                return ext.to_string();
            }
        }

        extension_from_url(url).unwrap_or_else(|| "mp3".to_string())
    }
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some("m4a"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/ogg" | "application/ogg" => Some("ogg"),
        "audio/aac" => Some("aac"),
        _ => None,
    }
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let ext = Path::new(parsed.path())
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    KNOWN_AUDIO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(title: &str, singer: &str, url: Option<&str>) -> SongDetails {
        SongDetails {
            title: title.to_string(),
            singer: singer.to_string(),
            album: String::new(),
            url: url.map(str::to_string),
            cover: None,
            lyric: None,
        }
    }

    // An unroutable local endpoint: any fetch attempt fails fast.
    const DEAD_URL: &str = "http://127.0.0.1:9/track.mp3";

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for_content_type("audio/mpeg"), Some("mp3"));
        assert_eq!(extension_for_content_type("audio/FLAC; charset=binary"), Some("flac"));
        assert_eq!(extension_for_content_type("text/html"), None);
        assert_eq!(extension_for_content_type(""), None);
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("http://cdn.example/a/b/song.m4a?sig=x"),
            Some("m4a".to_string())
        );
        assert_eq!(extension_from_url("http://cdn.example/stream"), None);
        assert_eq!(extension_from_url("http://cdn.example/page.html"), None);
    }

    #[tokio::test]
    async fn test_missing_url_is_an_error() {
        let pipeline = DownloadPipeline::new(Client::new());
        let dir = tempfile::tempdir().unwrap();
        let result = pipeline
            .process_song(&details("Song", "Artist", None), dir.path(), |_, _, _| {})
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_existing_destination_short_circuits() {
        let pipeline = DownloadPipeline::new(Client::new());
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Song - Artist.mp3");
        std::fs::write(&existing, b"audio").unwrap();

        // The audio URL is unreachable; success proves nothing was fetched.
        let outcome = pipeline
            .process_song(&details("Song", "Artist", Some(DEAD_URL)), dir.path(), |_, _, _| {})
            .await
            .unwrap();
        assert_eq!(outcome, DownloadOutcome::AlreadyExists(existing));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_temp_files() {
        let pipeline = DownloadPipeline::new(Client::new());
        let dir = tempfile::tempdir().unwrap();

        let result = pipeline
            .process_song(&details("Song", "Artist", Some(DEAD_URL)), dir.path(), |_, _, _| {})
            .await;
        assert!(result.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_cleaned_title_in_destination_name() {
        let pipeline = DownloadPipeline::new(Client::new());
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Song - Artist.mp3");
        std::fs::write(&existing, b"audio").unwrap();

        let outcome = pipeline
            .process_song(
                &details("Song [Live]", "Artist", Some(DEAD_URL)),
                dir.path(),
                |_, _, _| {},
            )
            .await
            .unwrap();
        assert_eq!(outcome.path(), existing.as_path());
    }
}
