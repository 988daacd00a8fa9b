use crate::error::AppError;
use crate::store::BlobStore;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

pub const SUBJECT_IMAGES: &str = "subjects";
pub const GRADE_IMAGES: &str = "grades";

/// A local file picked in the UI, handed over by path.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUpload {
    pub path: PathBuf,
}

/// Uploads the file to `<folder>/<file name>` and returns its public URL.
pub fn upload_image(
    blobs: &dyn BlobStore,
    folder: &str,
    image: &ImageUpload,
) -> Result<String, AppError> {
    let Some(file_name) = image.path.file_name().and_then(|s| s.to_str()) else {
        return Err(AppError::invalid("image", "image path has no file name"));
    };
    if !image.path.is_file() {
        return Err(AppError::invalid(
            "image",
            format!("image file not found: {}", image.path.to_string_lossy()),
        ));
    }
    let bytes = std::fs::read(&image.path)?;
    let blob = blobs.upload(&format!("{}/{}", folder, file_name), &bytes)?;
    let url = blobs.download_url(&blob)?;
    info!(path = %blob.path, size = bytes.len(), "image uploaded");
    Ok(url)
}
