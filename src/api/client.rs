use std::time::Duration;

use log::{debug, error, warn};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::Value;

use crate::api::{RemoteTrack, SongDetails, SongRef, UNKNOWN};
use crate::errors::{AppError, Result};
use crate::utils::clean_title;

/// Aggregate search/detail endpoint. Vendor endpoints rotate; the embedding
/// shell can point elsewhere via [`ApiClient::with_endpoints`].
pub const SEARCH_ENDPOINT: &str = "https://www.hhlqilongzhu.cn/api/joox/juhe_music.php";
/// Remote playlist listing endpoint
pub const PLAYLIST_ENDPOINT: &str =
    "https://c.y.qq.com/qzone/fcg-bin/fcg_ucc_getcdinfo_byids_cp.fcg";

const PLAYLIST_REFERER: &str = "https://y.qq.com/";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Catalog client: one reusable pooled connection for the whole process.
pub struct ApiClient {
    client: Client,
    search_url: String,
    playlist_url: String,
}

impl ApiClient {
    pub fn new() -> Result<Self> {
        Self::with_endpoints(SEARCH_ENDPOINT, PLAYLIST_ENDPOINT)
    }

    pub fn with_endpoints(search_url: &str, playlist_url: &str) -> Result<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .timeout(Duration::from_secs(20))
            .connect_timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .gzip(true)
            .brotli(true)
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            client,
            search_url: search_url.to_string(),
            playlist_url: playlist_url.to_string(),
        })
    }

    /// The underlying pooled HTTP client, shared with the download pipeline.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Searches the catalog by keyword. Vendor entries missing an index are
    /// dropped; a non-list response yields an empty result.
    pub async fn search(&self, query: &str) -> Result<Vec<SongRef>> {
        let url = format!(
            "{}?msg={}&type=json",
            self.search_url,
            urlencoding::encode(query)
        );
        let data = self.get_json(&url, None).await?;
        Ok(parse_search_results(&data, query))
    }

    /// Fetches details for the `n`-th result of `query`. Accepted only when
    /// the vendor envelope carries `data.code == 200`.
    pub async fn song_details(&self, query: &str, n: u64) -> Result<Option<SongDetails>> {
        let url = format!(
            "{}?msg={}&n={}&type=json",
            self.search_url,
            urlencoding::encode(query),
            n
        );
        let data = self.get_json(&url, None).await?;
        Ok(parse_song_details(&data))
    }

    /// Two-tier detail resolution.
    ///
    /// Primary: re-search "title singer" and fetch details for the first
    /// result whose raw title and singer match exactly. Fallback: fetch by
    /// the original (query, n) pair. Primary-tier failures are swallowed.
    pub async fn song_details_robust(&self, song: &SongRef) -> Result<Option<SongDetails>> {
        let requery = format!("{} {}", song.title, song.singer);
        match self.search(&requery).await {
            Ok(results) => {
                for result in results {
                    if result.raw_title == song.raw_title && result.singer == song.singer {
                        match self.song_details(&requery, result.n).await {
                            Ok(Some(details)) => return Ok(Some(details)),
                            Ok(None) => continue,
                            Err(e) => {
                                debug!("Primary detail fetch failed for '{}': {}", song.title, e);
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                debug!("Primary re-search failed for '{}': {}", song.title, e);
            }
        }

        self.song_details(&song.query, song.n).await
    }

    /// Fetches a remote playlist's track list. Entries missing a title or
    /// singer are dropped.
    pub async fn fetch_remote_playlist(&self, playlist_id: &str) -> Result<Vec<RemoteTrack>> {
        let url = format!(
            "{}?disstid={}&type=1&json=1&utf8=1&onlysong=0&format=json",
            self.playlist_url,
            urlencoding::encode(playlist_id)
        );
        let data = self.get_json(&url, Some(PLAYLIST_REFERER)).await?;
        Ok(parse_remote_playlist(&data))
    }

    /// GET returning JSON, with a fixed retry count on transport errors and
    /// on 429/5xx responses.
    async fn get_json(&self, url: &str, referer: Option<&str>) -> Result<Value> {
        let mut last_error = AppError::Api("no attempts made".to_string());

        for attempt in 1..=MAX_RETRIES {
            let mut request = self.client.get(url);
            if let Some(referer) = referer {
                request = request.header("Referer", referer);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.json::<Value>().await?);
                    }
                    if !is_retryable(status) {
                        return Err(AppError::Api(format!("HTTP error: {}", status)));
                    }
                    warn!("Attempt {} of {} got {} for {}", attempt, MAX_RETRIES, status, url);
                    last_error = AppError::Api(format!("HTTP error: {}", status));
                }
                Err(e) => {
                    warn!("Attempt {} of {} failed for {}: {}", attempt, MAX_RETRIES, url, e);
                    last_error = AppError::Http(e);
                }
            }

            if attempt < MAX_RETRIES {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        error!("All {} attempts failed for {}", MAX_RETRIES, url);
        Err(last_error)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn parse_search_results(data: &Value, query: &str) -> Vec<SongRef> {
    let Some(items) = data.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let n = item.get("n").and_then(Value::as_u64)?;
            let raw_title = item
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN)
                .to_string();
            let singer = item
                .get("singer")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN)
                .to_string();

            Some(SongRef {
                n,
                title: clean_title(&raw_title),
                raw_title,
                singer,
                query: query.to_string(),
            })
        })
        .collect()
}

fn parse_song_details(data: &Value) -> Option<SongDetails> {
    let details = data.get("data")?;
    if details.get("code").and_then(Value::as_i64) != Some(200) {
        return None;
    }

    let text = |key: &str| {
        details
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let optional = |key: &str| {
        details
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(SongDetails {
        title: text("title"),
        singer: text("singer"),
        album: text("album"),
        url: optional("url"),
        cover: optional("cover"),
        lyric: optional("lyric"),
    })
}

fn parse_remote_playlist(data: &Value) -> Vec<RemoteTrack> {
    let songs = data
        .get("cdlist")
        .and_then(Value::as_array)
        .and_then(|lists| lists.first())
        .and_then(|list| list.get("songlist"))
        .and_then(Value::as_array);

    let Some(songs) = songs else {
        return Vec::new();
    };

    songs
        .iter()
        .filter_map(|item| {
            let title = item.get("songname").and_then(Value::as_str).unwrap_or_default();
            let singer = item
                .get("singer")
                .and_then(Value::as_array)
                .map(|singers| {
                    singers
                        .iter()
                        .filter_map(|s| s.get("name").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join(" / ")
                })
                .unwrap_or_default();

            if title.is_empty() || singer.is_empty() {
                return None;
            }
            Some(RemoteTrack {
                title: title.to_string(),
                singer,
            })
        })
        .collect()
}
