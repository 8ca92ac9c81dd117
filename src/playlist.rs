use std::collections::BTreeMap;
use std::path::PathBuf;

use log::warn;

use crate::api::SongRef;
use crate::errors::{AppError, Result};

pub const DEFAULT_PLAYLIST: &str = "Default";

/// Named, ordered playlists persisted as one human-readable JSON document
/// (`{playlist_name: [song, ...]}`), rewritten wholesale after every
/// mutation. At least one playlist always exists.
pub struct PlaylistStore {
    path: PathBuf,
    playlists: BTreeMap<String, Vec<SongRef>>,
}

impl PlaylistStore {
    pub fn load_default() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Loads the playlist document; a missing or corrupt file starts over
    /// with a single empty default playlist.
    pub fn load_from(path: PathBuf) -> Self {
        let playlists = if path.exists() {
            match std::fs::read_to_string(&path)
                .map_err(AppError::from)
                .and_then(|content| Ok(serde_json::from_str(&content)?))
            {
                Ok(playlists) => playlists,
                Err(e) => {
                    warn!("Failed to load playlists, starting fresh: {}", e);
                    Self::initial_playlists()
                }
            }
        } else {
            Self::initial_playlists()
        };

        let mut store = Self { path, playlists };
        if store.playlists.is_empty() {
            store.playlists = Self::initial_playlists();
        }
        store
    }

    fn initial_playlists() -> BTreeMap<String, Vec<SongRef>> {
        BTreeMap::from([(DEFAULT_PLAYLIST.to_string(), Vec::new())])
    }

    fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tunegrab")
            .join("playlists.json")
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.playlists)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    // Mutations persist synchronously; a failed write is reported but the
    // in-memory change stands.
    fn save_after_mutation(&self) {
        if let Err(e) = self.save() {
            warn!("Failed to save playlists: {}", e);
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.playlists.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.playlists.contains_key(name)
    }

    pub fn songs(&self, name: &str) -> &[SongRef] {
        self.playlists.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        if self.playlists.contains_key(name) {
            return Err(AppError::Playlist(format!(
                "A playlist named '{}' already exists",
                name
            )));
        }
        self.playlists.insert(name.to_string(), Vec::new());
        self.save_after_mutation();
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        if !self.playlists.contains_key(name) {
            return Err(AppError::NotFound(format!("No playlist named '{}'", name)));
        }
        if self.playlists.len() == 1 {
            return Err(AppError::Playlist(
                "Cannot delete the last remaining playlist".to_string(),
            ));
        }
        self.playlists.remove(name);
        self.save_after_mutation();
        Ok(())
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if !self.playlists.contains_key(old_name) {
            return Err(AppError::NotFound(format!("No playlist named '{}'", old_name)));
        }
        if self.playlists.contains_key(new_name) {
            return Err(AppError::Playlist(format!(
                "A playlist named '{}' already exists",
                new_name
            )));
        }
        if let Some(songs) = self.playlists.remove(old_name) {
            self.playlists.insert(new_name.to_string(), songs);
        }
        self.save_after_mutation();
        Ok(())
    }

    /// Adds a song at the head of a playlist. Returns false when an entry
    /// with the same raw title and singer is already present.
    pub fn add_song(&mut self, playlist_name: &str, song: &SongRef) -> Result<bool> {
        let playlist = self
            .playlists
            .get_mut(playlist_name)
            .ok_or_else(|| AppError::NotFound(format!("No playlist named '{}'", playlist_name)))?;

        let duplicate = playlist
            .iter()
            .any(|s| s.raw_title == song.raw_title && s.singer == song.singer);
        if duplicate {
            return Ok(false);
        }

        playlist.insert(0, song.clone());
        self.save_after_mutation();
        Ok(true)
    }

    pub fn remove_song(&mut self, playlist_name: &str, index: usize) -> Result<()> {
        let playlist = self
            .playlists
            .get_mut(playlist_name)
            .ok_or_else(|| AppError::NotFound(format!("No playlist named '{}'", playlist_name)))?;

        if index >= playlist.len() {
            return Err(AppError::InvalidInput(format!(
                "Song index {} out of range for '{}'",
                index, playlist_name
            )));
        }
        playlist.remove(index);
        self.save_after_mutation();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str, singer: &str) -> SongRef {
        SongRef {
            n: 1,
            raw_title: title.to_string(),
            title: crate::utils::clean_title(title),
            singer: singer.to_string(),
            query: title.to_string(),
        }
    }

    fn store() -> PlaylistStore {
        let dir = tempfile::tempdir().unwrap();
        // Keep the tempdir alive for the test's duration by leaking it;
        // each test works in its own unique directory.
        let path = dir.into_path().join("playlists.json");
        PlaylistStore::load_from(path)
    }

    #[test]
    fn test_starts_with_default_playlist() {
        let store = store();
        assert_eq!(store.names(), vec![DEFAULT_PLAYLIST.to_string()]);
    }

    #[test]
    fn test_create_duplicate_rejected() {
        let mut store = store();
        store.create("Road Trip").unwrap();
        assert!(store.create("Road Trip").is_err());
    }

    #[test]
    fn test_delete_last_playlist_rejected() {
        let mut store = store();
        assert!(store.delete(DEFAULT_PLAYLIST).is_err());

        store.create("Other").unwrap();
        store.delete(DEFAULT_PLAYLIST).unwrap();
        assert!(store.delete("Other").is_err());
    }

    #[test]
    fn test_rename_to_existing_rejected() {
        let mut store = store();
        store.create("A").unwrap();
        assert!(store.rename("A", DEFAULT_PLAYLIST).is_err());
        assert!(store.rename("missing", "B").is_err());
        store.rename("A", "B").unwrap();
        assert!(store.contains("B"));
        assert!(!store.contains("A"));
    }

    #[test]
    fn test_add_song_deduplicates_and_inserts_at_head() {
        let mut store = store();
        assert!(store.add_song(DEFAULT_PLAYLIST, &song("First", "A")).unwrap());
        assert!(store.add_song(DEFAULT_PLAYLIST, &song("Second", "A")).unwrap());
        assert!(!store.add_song(DEFAULT_PLAYLIST, &song("First", "A")).unwrap());

        let songs = store.songs(DEFAULT_PLAYLIST);
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].raw_title, "Second");
    }

    #[test]
    fn test_remove_song_by_index() {
        let mut store = store();
        store.add_song(DEFAULT_PLAYLIST, &song("One", "A")).unwrap();
        assert!(store.remove_song(DEFAULT_PLAYLIST, 5).is_err());
        store.remove_song(DEFAULT_PLAYLIST, 0).unwrap();
        assert!(store.songs(DEFAULT_PLAYLIST).is_empty());
    }

    #[test]
    fn test_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlists.json");

        let mut store = PlaylistStore::load_from(path.clone());
        store.create("Keep").unwrap();
        store.add_song("Keep", &song("Song [Live]", "A")).unwrap();

        let reloaded = PlaylistStore::load_from(path);
        assert!(reloaded.contains("Keep"));
        assert_eq!(reloaded.songs("Keep")[0].title, "Song");
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlists.json");
        std::fs::write(&path, "oops").unwrap();

        let store = PlaylistStore::load_from(path);
        assert_eq!(store.names(), vec![DEFAULT_PLAYLIST.to_string()]);
    }
}
