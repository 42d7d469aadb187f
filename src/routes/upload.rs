use std::collections::HashMap;

use axum::{body::Bytes, extract::Multipart};

use crate::error::{AppError, Result};
use crate::storage::{image_extension, upload_name, FileStorage};

/// An uploaded file held in memory
#[derive(Debug)]
pub struct UploadedFile {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Text fields of a multipart form plus its one file field
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl UploadForm {
    /// Read every part of the form, keeping `file_field` as the file
    pub async fn read(mut multipart: Multipart, file_field: &str, max_bytes: usize) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == file_field {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if bytes.len() > max_bytes {
                    return Err(AppError::PayloadTooLarge);
                }
                if !bytes.is_empty() {
                    form.file = Some(UploadedFile { content_type, bytes });
                }
            } else {
                let text = field.text().await?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// A required text field, trimmed
    pub fn text(&self, name: &str) -> Result<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::InvalidInput(format!("Field '{}' is required", name)))
    }
}

/// Store an uploaded image under `folder` and return its storage name
pub async fn store_image(
    storage: &dyn FileStorage,
    folder: &str,
    file: Option<UploadedFile>,
) -> Result<String> {
    let file = file.ok_or_else(|| AppError::InvalidInput("An image file is required".to_string()))?;

    let extension = file
        .content_type
        .as_deref()
        .and_then(image_extension)
        .ok_or_else(|| {
            AppError::InvalidInput("Only PNG, JPEG, WEBP, GIF or HEIC images are accepted".to_string())
        })?;

    let name = upload_name(folder, extension);
    storage.save(&name, &file.bytes).await
}
