use log::info;

/// Sanitizes a filename by removing invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Sanitizes a track filename in "Title - Singer" format
pub fn sanitize_track_filename(title: &str, singer: &str) -> String {
    format!("{} - {}", sanitize_filename(title), sanitize_filename(singer))
}

/// Removes a trailing `[bracketed]` segment from a raw catalog title.
///
/// Vendors decorate titles with suffixes like `Song [Live]` or `Song [HQ]`;
/// the cleaned form is used for filenames, tags and duplicate matching.
pub fn clean_title(raw: &str) -> String {
    if raw.contains('[') && raw.contains(']') {
        if let Some(pos) = raw.rfind('[') {
            return raw[..pos].trim().to_string();
        }
    }
    raw.to_string()
}

/// Normalized (title, singer) key used for duplicate detection when
/// importing remote playlists: bracket suffix stripped, spaces removed,
/// lowercased, `/` folded to `&` (vendors disagree on artist separators).
pub fn match_key(title: &str, singer: &str) -> (String, String) {
    fn normalize(s: &str) -> String {
        s.replace(' ', "").to_lowercase().replace('/', "&")
    }
    let cleaned = clean_title(title.trim());
    (normalize(&cleaned), normalize(singer))
}

/// Creates a directory if it doesn't exist
pub async fn ensure_dir_exists(path: &std::path::Path) -> crate::errors::Result<()> {
    if !path.exists() {
        tokio::fs::create_dir_all(path).await?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

/// Generates a unique ID for background operations
pub fn generate_operation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_replaces_invalid_chars() {
        assert_eq!(sanitize_filename("a/b:c*d"), "a_b_c_d");
        assert_eq!(sanitize_filename("plain name"), "plain name");
    }

    #[test]
    fn test_clean_title_strips_trailing_bracket_segment() {
        assert_eq!(clean_title("Song [Live]"), "Song");
        assert_eq!(clean_title("Song [feat. X] [Remix]"), "Song [feat. X]");
        assert_eq!(clean_title("Song"), "Song");
        // Only cleans when both brackets are present
        assert_eq!(clean_title("Song [Live"), "Song [Live");
    }

    #[test]
    fn test_match_key_normalizes() {
        assert_eq!(match_key("Song [Live]", "A"), match_key("Song", "A"));
        assert_eq!(match_key("My Song", "Artist One"), match_key("mysong", "artistone"));
        assert_eq!(match_key("Duet", "A / B"), match_key("Duet", "a&b"));
        assert_ne!(match_key("Song", "A"), match_key("Song", "B"));
    }
}
