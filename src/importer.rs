use std::collections::HashSet;

use log::warn;

use crate::api::{ApiClient, RemoteTrack, SongRef};
use crate::errors::{AppError, Result};
use crate::utils::match_key;

/// Imports a remote playlist: fetch its track list, drop tracks already in
/// the target playlist, then match each remaining track against a fresh
/// catalog search, accepting the first hit. Sequential and best-effort; a
/// track with no hits is skipped.
///
/// Returns the matched songs for the caller to add to the target playlist.
pub async fn import_remote_playlist<S, P>(
    api: &ApiClient,
    playlist_id: &str,
    existing: &[SongRef],
    mut status: S,
    mut progress: P,
) -> Result<Vec<SongRef>>
where
    S: FnMut(String),
    P: FnMut(usize, usize),
{
    status("Fetching remote playlist...".to_string());
    let raw_tracks = api.fetch_remote_playlist(playlist_id).await?;
    if raw_tracks.is_empty() {
        return Err(AppError::Api(
            "Remote playlist is empty or unavailable".to_string(),
        ));
    }

    status("Checking for duplicate songs...".to_string());
    let new_tracks = filter_new_tracks(&raw_tracks, existing);
    if new_tracks.is_empty() {
        status("Every song is already in the target playlist".to_string());
        return Ok(Vec::new());
    }

    let mut matched = Vec::new();
    let total = new_tracks.len();
    for (i, track) in new_tracks.iter().enumerate() {
        status(format!("Matching: {} ({}/{})", track.title, i + 1, total));

        let query = format!("{} {}", track.title, track.singer);
        match api.search(&query).await {
            Ok(results) => {
                // First result of a "title singer" query is taken as the match
                if let Some(first) = results.into_iter().next() {
                    matched.insert(0, first);
                }
            }
            Err(e) => {
                warn!("Match search failed for '{}': {}", track.title, e);
            }
        }
        progress(i + 1, total);
    }

    Ok(matched)
}

/// Drops remote tracks already present in the target playlist, comparing
/// normalized (title, singer) keys. Kept tracks are head-inserted, so the
/// result is in reverse remote order.
pub fn filter_new_tracks(raw_tracks: &[RemoteTrack], existing: &[SongRef]) -> Vec<RemoteTrack> {
    let existing_keys: HashSet<(String, String)> = existing
        .iter()
        .map(|song| match_key(&song.title, &song.singer))
        .collect();

    let mut new_tracks = Vec::new();
    for track in raw_tracks {
        if !existing_keys.contains(&match_key(&track.title, &track.singer)) {
            new_tracks.insert(0, track.clone());
        }
    }
    new_tracks
}
