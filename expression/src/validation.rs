//! Checks run on a user supplied image URL and the image behind it.

use crate::{
    error::{ExpressionErr, Result},
    fetch::{ImageFetcher, Url},
};

/// Splits an URL into its domain (with port, if any) and its path.
pub fn split_url(url: &str) -> Option<(String, String)> {
    let url = Url::parse(url)?;
    Some((url.authority(), url.path))
}

/// Whether an image is reachable at `domain` + `path`.
///
/// Fetch failures count as a missing image, they are only logged.
pub async fn image_exists(fetcher: &dyn ImageFetcher, domain: &str, path: &str) -> bool {
    let Some(url) = Url::parse(&format!("http://{domain}{path}")) else {
        return false;
    };

    match fetcher.head(&url).await {
        Ok(status) => status == 200,
        Err(e) => {
            log::warn!("HEAD {url} failed: {e}");
            false
        }
    }
}

/// Downloads an image, reading at most one byte past `max_bytes` so oversized
/// images can still be told apart.
pub async fn retrieve_image(
    fetcher: &dyn ImageFetcher,
    url: &str,
    max_bytes: usize,
) -> Result<Vec<u8>> {
    let parsed = Url::parse(url).ok_or_else(|| ExpressionErr::Fetch {
        url: url.to_string(),
        msg: "not an absolute url".into(),
    })?;

    fetcher.get(&parsed, max_bytes.saturating_add(1)).await
}

/// The image format detected from the leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
    Tiff,
}

impl ImageKind {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xff, 0xd8, 0xff, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'B', b'M', ..] if bytes.len() >= 26 => Some(Self::Bmp),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            [b'I', b'I', 0x2a, 0x00, ..] | [b'M', b'M', 0x00, 0x2a, ..] => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Webp => "webp",
            Self::Tiff => "tiff",
        }
    }
}

/// Whether the downloaded bytes are an image in a known format.
pub fn valid_image_mimetype(bytes: &[u8]) -> bool {
    ImageKind::sniff(bytes).is_some()
}

/// Checks the image against the size limit.
///
/// # Returns
/// Whether the image fits, along with its size in bytes.
pub fn valid_image_size(bytes: &[u8], max_bytes: usize) -> (bool, usize) {
    (bytes.len() <= max_bytes, bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_url_keeps_port_and_query() {
        assert_eq!(
            split_url("http://example.com:8080/faces/1.jpg?s=2"),
            Some(("example.com:8080".into(), "/faces/1.jpg?s=2".into()))
        );
        assert_eq!(
            split_url("http://example.com"),
            Some(("example.com".into(), "/".into()))
        );
        assert_eq!(split_url("not a url"), None);
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(ImageKind::sniff(b"\xff\xd8\xff\xe0\0\x10JFIF"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(b"\x89PNG\r\n\x1a\n\0\0"), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"<html><body>"), None);
        assert!(!valid_image_mimetype(b""));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let bytes = vec![0; 10];
        assert_eq!(valid_image_size(&bytes, 10), (true, 10));
        assert_eq!(valid_image_size(&bytes, 9), (false, 10));
    }
}
