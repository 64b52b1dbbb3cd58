use std::{
    io,
    path::{Component, Path, PathBuf},
};

use tokio::fs;

use crate::error::Result;

const TMP_DIR: &str = "tmp_img";
const IMAGES_DIR: &str = "images";

/// File storage under the media root, served back under `/media/`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn random_name(ext: &str) -> String {
        format!("{:016x}.{ext}", rand::random::<u64>())
    }

    /// Writes a downloaded image to a fresh temporary file.
    ///
    /// # Returns
    /// The path of the new file.
    pub async fn save_temp(&self, bytes: &[u8], ext: &str) -> Result<PathBuf> {
        let dir = self.root.join(TMP_DIR);
        fs::create_dir_all(&dir).await?;

        let path = dir.join(Self::random_name(ext));
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Copies a classified image into the permanent images directory.
    ///
    /// # Returns
    /// The URL the image is served at.
    pub async fn persist(&self, temp: &Path) -> Result<String> {
        let dir = self.root.join(IMAGES_DIR);
        fs::create_dir_all(&dir).await?;

        let ext = temp.extension().and_then(|e| e.to_str()).unwrap_or("img");
        let name = Self::random_name(ext);
        fs::copy(temp, dir.join(&name)).await?;

        Ok(format!("/media/{IMAGES_DIR}/{name}"))
    }

    /// Removes a file, a missing file is not an error.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Joins a request path below `root`, refusing anything that could escape it.
pub fn resolve_below(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative.trim_start_matches('/'));
    let mut path = root.to_path_buf();
    let mut depth = 0;

    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }

    (depth > 0).then_some(path)
}

/// Guesses a content type from a file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
