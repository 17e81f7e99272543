use std::path::{Path, PathBuf};

use base64::Engine;

use crate::{constants::IMAGE_EXTENSIONS, error::MediaError};

/// A decoded `data:image/<ext>;base64,<payload>` upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl TryFrom<&str> for ImageUpload {
    type Error = MediaError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (format, payload) = value
            .strip_prefix("data:image/")
            .and_then(|rest| rest.split_once(";base64,"))
            .ok_or_else(|| MediaError::new("Expected a base64 encoded image"))?;

        let extension = format.to_lowercase();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(MediaError::new("Unsupported image format"));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|_| MediaError::new("Invalid base64 payload"))?;
        if bytes.is_empty() {
            return Err(MediaError::new("Empty image"));
        }

        Ok(Self { extension, bytes })
    }
}

impl ImageUpload {
    /// Relative path the upload is stored under, unique per call.
    pub fn file_ref(&self, folder: &str) -> String {
        format!("{folder}/{}.{}", uuid::Uuid::new_v4(), self.extension)
    }
}

/// Writes the upload below `media_root` and returns its relative ref.
pub async fn store_image(
    media_root: &Path,
    folder: &str,
    upload: &ImageUpload,
) -> Result<String, MediaError> {
    let file_ref = upload.file_ref(folder);
    let path: PathBuf = media_root.join(&file_ref);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &upload.bytes).await?;
    log::info!("Stored image {file_ref} ({} bytes)", upload.bytes.len());

    Ok(file_ref)
}

/// Missing files are not an error.
pub async fn remove_image(media_root: &Path, file_ref: &str) -> Result<(), MediaError> {
    match tokio::fs::remove_file(media_root.join(file_ref)).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Removes a file whose row is already gone or replaced. Failures are logged only.
pub async fn discard_image(media_root: &Path, file_ref: &str) {
    if let Err(e) = remove_image(media_root, file_ref).await {
        log::error!("Failed to remove image {file_ref}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent png
    const PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    #[test]
    fn data_uri_is_decoded() {
        let upload = ImageUpload::try_from(format!("data:image/png;base64,{PNG}").as_str()).unwrap();

        assert_eq!(upload.extension, "png");
        assert_eq!(&upload.bytes[1..4], b"PNG");
    }

    #[test]
    fn non_image_data_is_rejected() {
        assert!(ImageUpload::try_from("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(ImageUpload::try_from("recipes/images/cake.png").is_err());
        assert!(ImageUpload::try_from("data:image/exe;base64,aGVsbG8=").is_err());
        assert!(ImageUpload::try_from("data:image/png;base64,@@@").is_err());
        assert!(ImageUpload::try_from("data:image/png;base64,").is_err());
    }

    #[test]
    fn file_refs_are_unique() {
        let upload = ImageUpload {
            extension: "jpg".into(),
            bytes: vec![1],
        };
        let a = upload.file_ref("recipes/images");
        let b = upload.file_ref("recipes/images");

        assert!(a.starts_with("recipes/images/") && a.ends_with(".jpg"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn images_are_stored_and_removed() {
        let root = std::env::temp_dir().join(format!("foodgram-media-{}", uuid::Uuid::new_v4()));
        let upload = ImageUpload {
            extension: "png".into(),
            bytes: vec![1, 2, 3],
        };

        let file_ref = store_image(&root, "users/avatars", &upload).await.unwrap();
        assert_eq!(tokio::fs::read(root.join(&file_ref)).await.unwrap(), vec![1, 2, 3]);

        remove_image(&root, &file_ref).await.unwrap();
        remove_image(&root, &file_ref).await.unwrap();
        assert!(!root.join(&file_ref).exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn discarding_an_unremovable_file_does_not_fail() {
        let root = std::env::temp_dir().join(format!("foodgram-media-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(root.join("users/stuck.png")).await.unwrap();

        assert!(remove_image(&root, "users/stuck.png").await.is_err());
        discard_image(&root, "users/stuck.png").await;
        discard_image(&root, "users/missing.png").await;
        assert!(root.join("users/stuck.png").exists());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
