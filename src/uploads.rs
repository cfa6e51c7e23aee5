// ABOUTME: Image upload validation and durable storage for checkup updates
// ABOUTME: Parses the multipart update form, enforces type/size/count limits, and writes files to disk

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use uuid::Uuid;

use crate::entities::checkup::{ImageAttachment, ImageList};
use crate::error::{AppError, Result};

pub const MAX_IMAGES_PER_UPDATE: usize = 5;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024; // 5 MiB

/// URL prefix under which stored images are served.
pub const PUBLIC_PREFIX: &str = "uploads";

const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png"];
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

/// An accepted image held in memory until it is written.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// The parsed body of a checkup update.
#[derive(Debug, Default)]
pub struct UpdateForm {
    pub notes: Option<String>,
    pub images: Vec<PendingImage>,
    pub descriptions: Vec<String>,
}

/// Checks both the extension and the declared content type; returns the normalized extension.
pub fn check_image_type(file_name: &str, content_type: Option<&str>) -> Result<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let content_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str())
        && ALLOWED_CONTENT_TYPES.contains(&content_type.as_str())
    {
        Ok(extension)
    } else {
        Err(AppError::Validation(format!(
            "Only images are allowed (jpeg, jpg, png); got {:?} as {:?}",
            file_name, content_type
        )))
    }
}

/// Reads the update form, rejecting the first field that breaks a limit.
pub async fn read_update_form(multipart: &mut Multipart) -> Result<UpdateForm> {
    let mut form = UpdateForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "notes" => {
                let notes = field.text().await?;
                // Blank notes leave the stored notes untouched
                if !notes.trim().is_empty() {
                    form.notes = Some(notes);
                }
            }
            "descriptions" | "descriptions[]" => {
                form.descriptions.push(field.text().await?);
            }
            "images" | "images[]" => {
                if form.images.len() >= MAX_IMAGES_PER_UPDATE {
                    return Err(AppError::Validation(format!(
                        "Too many files: at most {} images per update",
                        MAX_IMAGES_PER_UPDATE
                    )));
                }

                let file_name = field.file_name().unwrap_or_default().to_string();
                let extension = check_image_type(&file_name, field.content_type())?;

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
                        return Err(AppError::Validation(format!(
                            "File {:?} exceeds the {} byte limit",
                            file_name, MAX_IMAGE_BYTES
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }

                form.images.push(PendingImage { extension, bytes });
            }
            other => {
                tracing::debug!("Ignoring unexpected multipart field {:?}", other);
            }
        }
    }

    Ok(form)
}

/// Writes accepted images under generated names inside the upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Persists every image, pairing image i with description i (missing ones become empty).
    ///
    /// Either all files are written or none remain on disk.
    pub async fn save_all(
        &self,
        images: Vec<PendingImage>,
        descriptions: Vec<String>,
    ) -> Result<ImageList> {
        let mut descriptions = descriptions.into_iter();
        let mut saved = Vec::with_capacity(images.len());

        for image in images {
            let description = descriptions.next().unwrap_or_default();
            let file_name = generate_file_name(&image.extension);

            if let Err(err) = tokio::fs::write(self.dir.join(&file_name), &image.bytes).await {
                self.remove_all(&saved).await;
                return Err(err.into());
            }

            saved.push(ImageAttachment {
                path: format!("{}/{}", PUBLIC_PREFIX, file_name),
                description,
            });
        }

        Ok(ImageList(saved))
    }

    /// Best-effort cleanup of files written for an update that did not commit.
    pub async fn remove_all(&self, attachments: &[ImageAttachment]) {
        for attachment in attachments {
            let Some(file_name) = attachment.path.rsplit('/').next() else {
                continue;
            };
            if let Err(err) = tokio::fs::remove_file(self.dir.join(file_name)).await {
                tracing::warn!("Failed to remove orphaned upload {}: {}", attachment.path, err);
            }
        }
    }
}

fn generate_file_name(extension: &str) -> String {
    format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_accepts_supported_images() {
        assert_eq!(check_image_type("x.png", Some("image/png")).unwrap(), "png");
        assert_eq!(check_image_type("X.JPG", Some("image/jpeg")).unwrap(), "jpg");
        assert_eq!(check_image_type("a.jpeg", Some("image/jpeg")).unwrap(), "jpeg");
    }

    #[test]
    fn test_rejects_non_images() {
        assert!(check_image_type("notes.pdf", Some("application/pdf")).is_err());
        assert!(check_image_type("scan.gif", Some("image/gif")).is_err());
        assert!(check_image_type("noext", Some("image/png")).is_err());
    }

    #[test]
    fn test_requires_both_extension_and_content_type() {
        // Renamed executable claiming to be a png
        assert!(check_image_type("payload.png", Some("application/octet-stream")).is_err());
        // Correct content type with the wrong extension
        assert!(check_image_type("photo.exe", Some("image/png")).is_err());
        assert!(check_image_type("photo.png", None).is_err());
    }

    #[test]
    fn test_generated_names_are_unique() {
        let a = generate_file_name("png");
        let b = generate_file_name("png");
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_save_all_pairs_descriptions() {
        let temp_dir = TempDir::new().unwrap();
        let store = UploadStore::new(temp_dir.path());

        let images = vec![
            PendingImage { extension: "png".into(), bytes: vec![1, 2, 3] },
            PendingImage { extension: "jpg".into(), bytes: vec![4, 5] },
        ];
        let saved = store
            .save_all(images, vec!["upper left molar".into()])
            .await
            .unwrap();

        assert_eq!(saved.len(), 2);
        assert_eq!(saved.0[0].description, "upper left molar");
        assert_eq!(saved.0[1].description, "");
        for attachment in &saved.0 {
            assert!(attachment.path.starts_with("uploads/"));
            let file_name = attachment.path.trim_start_matches("uploads/");
            assert!(temp_dir.path().join(file_name).exists());
        }

        store.remove_all(&saved.0).await;
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_save_all_cleans_up_on_failure() {
        let temp_dir = TempDir::new().unwrap();
        // Directory that does not exist, so every write fails
        let store = UploadStore::new(temp_dir.path().join("missing"));

        let images = vec![PendingImage { extension: "png".into(), bytes: vec![1] }];
        assert!(matches!(
            store.save_all(images, vec![]).await,
            Err(AppError::Io(_))
        ));
    }
}
