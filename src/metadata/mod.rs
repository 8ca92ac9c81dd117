pub mod embedder;

use lofty::picture::MimeType;

/// Cover-art bytes fetched alongside a download
#[derive(Debug, Clone)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime_type: MimeType,
}

impl CoverArt {
    /// Wraps raw image bytes, sniffing PNG by signature and assuming JPEG
    /// otherwise (the vendor serves covers as one of the two).
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime_type = if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            MimeType::Png
        } else {
            MimeType::Jpeg
        };
        Self { data, mime_type }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_mime_sniffing() {
        let png = CoverArt::from_bytes(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]);
        assert_eq!(png.mime_type, MimeType::Png);

        let jpeg = CoverArt::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(jpeg.mime_type, MimeType::Jpeg);
    }
}
