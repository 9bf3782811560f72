//! Podcast media ingestion: multipart payloads to S3, metadata to Postgres.

use crate::clients::ObjectStorage;
use crate::db::{NewPodcast, PodcastRepo};
use crate::error::{AppError, Result};
use crate::models::Podcast;
use sqlx::PgPool;
use std::sync::Arc;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// One file pulled out of the multipart body.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields accompanying an upload, as received.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub genre: Option<String>,
    pub tags: String,
    pub creator_pi_username: String,
}

/// Strips diacritics (NFD, combining marks dropped) and replaces anything
/// outside `[A-Za-z0-9._-]` with an underscore.
pub fn sanitize_filename(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Splits a comma-delimited tag string into a trimmed, deduplicated list,
/// preserving first-occurrence order.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',') {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Object keys are namespaced by a millisecond timestamp to avoid
/// collisions between same-named uploads.
pub fn object_key(timestamp_millis: i64, filename: &str) -> String {
    format!("uploads/{}-{}", timestamp_millis, sanitize_filename(filename))
}

pub struct UploadService {
    storage: Arc<ObjectStorage>,
    podcasts: PodcastRepo,
}

impl UploadService {
    pub fn new(storage: Arc<ObjectStorage>, pool: PgPool) -> Self {
        Self { storage, podcasts: PodcastRepo::new(pool) }
    }

    pub async fn upload(
        &self,
        audio: Option<UploadedFile>,
        image: Option<UploadedFile>,
        form: UploadForm,
    ) -> Result<Podcast> {
        let audio = audio.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

        if form.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }
        if form.creator_pi_username.trim().is_empty() {
            return Err(AppError::Validation("creator_pi_username is required".to_string()));
        }

        // Each file gets its own timestamp so same-named files within one
        // request cannot share a key.
        let audio_url = self
            .storage
            .upload(
                &object_key(chrono::Utc::now().timestamp_millis(), &audio.filename),
                audio.bytes,
                &audio.content_type,
            )
            .await?;

        let image_url = match image {
            Some(image) => Some(
                self.storage
                    .upload(
                        &object_key(chrono::Utc::now().timestamp_millis(), &image.filename),
                        image.bytes,
                        &image.content_type,
                    )
                    .await?,
            ),
            None => None,
        };

        self.podcasts
            .insert(NewPodcast {
                title: form.title.trim().to_string(),
                description: form.description,
                duration: form.duration,
                audio_url,
                image_url,
                genre: form.genre.filter(|g| !g.trim().is_empty()),
                tags: normalize_tags(&form.tags),
                creator_pi_username: form.creator_pi_username.trim().to_string(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_diacritics_and_specials() {
        assert_eq!(sanitize_filename("épisode finale.mp3"), "episode_finale.mp3");
        assert_eq!(sanitize_filename("Señor Pódcast #1!.wav"), "Senor_Podcast__1_.wav");
        assert_eq!(sanitize_filename("clean-name_01.mp3"), "clean-name_01.mp3");
    }

    #[test]
    fn object_keys_are_timestamp_namespaced() {
        assert_eq!(
            object_key(1700000000000, "my épisode.mp3"),
            "uploads/1700000000000-my_episode.mp3"
        );
    }

    #[test]
    fn same_named_files_get_distinct_keys_across_timestamps() {
        assert_ne!(
            object_key(1700000000000, "cover.png"),
            object_key(1700000000001, "cover.png")
        );
    }

    #[test]
    fn tags_are_trimmed_deduped_and_ordered() {
        assert_eq!(
            normalize_tags("comedy, tech ,comedy,, news , tech"),
            vec!["comedy", "tech", "news"]
        );
        assert!(normalize_tags("").is_empty());
        assert!(normalize_tags(" , ,").is_empty());
    }
}
