//! Podcast listing and multipart upload.

use crate::clients::ObjectStorage;
use crate::db::PodcastRepo;
use crate::error::{AppError, Result};
use crate::services::upload::{UploadForm, UploadedFile};
use crate::services::UploadService;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use sqlx::PgPool;
use std::sync::Arc;

// Guardrails for a single multipart part.
const MAX_FILE_BYTES: usize = 100 * 1024 * 1024;
const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;

fn push_capped(buf: &mut Vec<u8>, chunk: &[u8], cap: usize, what: &str) -> Result<()> {
    if buf.len() + chunk.len() > cap {
        return Err(AppError::Validation(format!("{what} is too large")));
    }
    buf.extend_from_slice(chunk);
    Ok(())
}

/// GET /podcasts — all podcasts, newest first.
pub async fn list_podcasts(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let podcasts = PodcastRepo::new(pool.get_ref().clone()).list_newest().await?;
    Ok(HttpResponse::Ok().json(podcasts))
}

async fn read_file_field(field: &mut actix_multipart::Field, filename: String) -> Result<UploadedFile> {
    let content_type = field
        .content_type()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk =
            chunk.map_err(|e| AppError::Validation(format!("Malformed upload stream: {e}")))?;
        push_capped(&mut bytes, &chunk, MAX_FILE_BYTES, "Uploaded file")?;
    }

    Ok(UploadedFile { filename, content_type, bytes })
}

async fn read_text_field(field: &mut actix_multipart::Field) -> Result<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk =
            chunk.map_err(|e| AppError::Validation(format!("Malformed upload stream: {e}")))?;
        push_capped(&mut buf, &chunk, MAX_TEXT_FIELD_BYTES, "Form field")?;
    }

    String::from_utf8(buf)
        .map_err(|_| AppError::Validation("Form fields must be UTF-8".to_string()))
}

/// POST /upload — multipart: `file` (audio, required), `screenshot`
/// (optional image), plus the podcast metadata text fields.
pub async fn upload_podcast(
    pool: web::Data<PgPool>,
    storage: web::Data<Arc<ObjectStorage>>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let mut audio: Option<UploadedFile> = None;
    let mut image: Option<UploadedFile> = None;
    let mut form = UploadForm::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::Validation(format!("Malformed multipart payload: {e}")))?;

        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().map(str::to_string),
                cd.get_filename().map(str::to_string),
            ),
            None => (None, None),
        };

        match name.as_deref() {
            Some("file") => {
                let filename = filename.unwrap_or_else(|| "audio".to_string());
                audio = Some(read_file_field(&mut field, filename).await?);
            }
            Some("screenshot") => {
                let filename = filename.unwrap_or_else(|| "screenshot".to_string());
                image = Some(read_file_field(&mut field, filename).await?);
            }
            Some("title") => form.title = read_text_field(&mut field).await?,
            Some("description") => form.description = read_text_field(&mut field).await?,
            Some("duration") => form.duration = read_text_field(&mut field).await?,
            Some("genre") => form.genre = Some(read_text_field(&mut field).await?),
            Some("tags") => form.tags = read_text_field(&mut field).await?,
            Some("creator_pi_username") => {
                form.creator_pi_username = read_text_field(&mut field).await?
            }
            _ => {
                // Drain unknown fields so the stream keeps moving.
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| {
                        AppError::Validation(format!("Malformed upload stream: {e}"))
                    })?;
                }
            }
        }
    }

    let service = UploadService::new(storage.get_ref().clone(), pool.get_ref().clone());
    let podcast = service.upload(audio, image, form).await?;

    Ok(HttpResponse::Created().json(podcast))
}

/// DELETE /admin/podcasts — bulk clear of the catalog.
pub async fn clear_podcasts(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let deleted = PodcastRepo::new(pool.get_ref().clone()).clear_all().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_fields_are_capped() {
        let mut buf = vec![0u8; MAX_TEXT_FIELD_BYTES - 1];
        assert!(push_capped(&mut buf, b"x", MAX_TEXT_FIELD_BYTES, "Form field").is_ok());

        let err = push_capped(&mut buf, b"x", MAX_TEXT_FIELD_BYTES, "Form field").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        // The buffer stops growing once the cap is hit.
        assert_eq!(buf.len(), MAX_TEXT_FIELD_BYTES);
    }

    #[test]
    fn file_cap_rejects_the_overflowing_chunk() {
        let mut buf = Vec::new();
        assert!(push_capped(&mut buf, &[0u8; 8], 8, "Uploaded file").is_ok());
        assert!(push_capped(&mut buf, &[0u8; 1], 8, "Uploaded file").is_err());
    }
}
