// utils/image_utils.rs
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

const FOLDER: &str = "properties";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{field}: file is empty")]
    Empty { field: String },

    #[error("{field}: file exceeds the {max_mb} MB limit")]
    TooLarge { field: String, max_mb: usize },

    #[error("{field}: upload a valid image. The file you uploaded was either not an image or a corrupted image")]
    NotAnImage { field: String },

    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Local-disk storage for listing photos. Files land under
/// `<media_root>/properties/` and are served back under `<media_url>`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
    max_size_mb: usize,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>, max_size_mb: usize) -> Self {
        MediaStorage {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_size_mb,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        MediaStorage::new(&config.media_root, &config.media_url, config.max_upload_mb)
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_mb * 1024 * 1024
    }

    /// Checks size and sniffs the format from the bytes themselves, ignoring
    /// whatever content type the client claimed. Returns the file extension.
    pub fn validate_image(&self, field: &str, data: &[u8]) -> Result<&'static str, ImageError> {
        if data.is_empty() {
            return Err(ImageError::Empty { field: field.to_string() });
        }

        if !validate_image_size(data.len(), self.max_size_mb) {
            return Err(ImageError::TooLarge {
                field: field.to_string(),
                max_mb: self.max_size_mb,
            });
        }

        let format = image::guess_format(data)
            .map_err(|_| ImageError::NotAnImage { field: field.to_string() })?;

        format
            .extensions_str()
            .first()
            .copied()
            .ok_or_else(|| ImageError::NotAnImage { field: field.to_string() })
    }

    /// Writes the image and returns its public URL.
    pub async fn save_image(&self, field: &str, data: &[u8]) -> Result<String, ImageError> {
        let extension = self.validate_image(field, data)?;

        let folder = self.root.join(FOLDER);
        tokio::fs::create_dir_all(&folder).await?;

        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(folder.join(&filename), data).await?;

        Ok(format!("{}/{}/{}", self.base_url, FOLDER, filename))
    }
}

pub fn validate_image_size(size_in_bytes: usize, max_size_mb: usize) -> bool {
    size_in_bytes <= max_size_mb * 1024 * 1024
}

#[cfg(test)]
pub(crate) const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_is_inclusive() {
        assert!(validate_image_size(1024 * 1024, 1));
        assert!(!validate_image_size(1024 * 1024 + 1, 1));
    }

    #[test]
    fn rejects_non_images() {
        let storage = MediaStorage::new("unused", "/media", 1);
        let err = storage.validate_image("photo1", b"definitely not a picture").unwrap_err();
        assert!(matches!(err, ImageError::NotAnImage { .. }));
        assert!(err.to_string().starts_with("photo1:"));
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        let storage = MediaStorage::new("unused", "/media", 1);
        assert!(matches!(storage.validate_image("cover_photo", &[]), Err(ImageError::Empty { .. })));

        let mut big = PNG_BYTES.to_vec();
        big.resize(1024 * 1024 + 1, 0);
        assert!(matches!(storage.validate_image("cover_photo", &big), Err(ImageError::TooLarge { .. })));
    }

    #[tokio::test]
    async fn saves_png_under_media_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media/", 1);

        let url = storage.save_image("cover_photo", PNG_BYTES).await.unwrap();
        assert!(url.starts_with("/media/properties/"));
        assert!(url.ends_with(".png"));

        let filename = url.rsplit('/').next().unwrap();
        let stored = std::fs::read(dir.path().join("properties").join(filename)).unwrap();
        assert_eq!(stored, PNG_BYTES);
    }
}
