//! Tag embedding backed by `lofty`.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{Picture, PictureType};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag, TagType};
use log::debug;

use crate::api::SongDetails;
use crate::errors::Result;
use crate::lyrics::strip_timestamps;
use crate::metadata::CoverArt;
use crate::utils::clean_title;

/// Embeds title/artist/album, plain lyrics and front-cover art into an
/// audio file, choosing the tag format by container: ID3v2 for MP3, MP4
/// ilst for M4A, Vorbis comments for FLAC, and the file's primary tag type
/// for anything else.
pub fn embed_tags(path: &Path, details: &SongDetails, cover: Option<&CoverArt>) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp3") => write_tags(path, Some(TagType::Id3v2), details, cover),
        Some("m4a") | Some("mp4") | Some("aac") => {
            write_tags(path, Some(TagType::Mp4Ilst), details, cover)
        }
        Some("flac") => write_tags(path, Some(TagType::VorbisComments), details, cover),
        _ => write_tags(path, None, details, cover),
    }
}

fn write_tags(
    path: &Path,
    tag_type: Option<TagType>,
    details: &SongDetails,
    cover: Option<&CoverArt>,
) -> Result<()> {
    let mut tagged_file = read_from_path(path)?;
    let tag_type = tag_type.unwrap_or_else(|| tagged_file.primary_tag_type());
    debug!("Embedding {:?} tags into {:?}", tag_type, path);

    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| crate::errors::AppError::Metadata(format!(
            "No writable {:?} tag for {:?}",
            tag_type, path
        )))?;

    tag.set_title(clean_title(&details.title));
    tag.set_artist(details.singer.clone());
    if !details.album.is_empty() {
        tag.set_album(details.album.clone());
    }

    if let Some(lyric) = details.lyric.as_deref() {
        let plain = strip_timestamps(lyric);
        if !plain.is_empty() {
            tag.insert_text(ItemKey::Lyrics, plain);
        }
    }

    if let Some(cover) = cover {
        let picture = Picture::new_unchecked(
            PictureType::CoverFront,
            Some(cover.mime_type.clone()),
            Some("Cover".to_string()),
            cover.data.clone(),
        );
        tag.push_picture(picture);
    }

    tagged_file.save_to_path(path, WriteOptions::default())?;
    Ok(())
}
