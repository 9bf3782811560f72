use crate::error::Result;
use crate::models::Podcast;
use sqlx::PgPool;

const PODCAST_COLUMNS: &str = "id, title, description, duration, audio_url, image_url, genre, \
     tags, creator_pi_username, uploaded_at, flag_count, hidden, creator_banned";

/// Metadata accompanying an upload, already validated and normalized.
#[derive(Debug, Clone)]
pub struct NewPodcast {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub audio_url: String,
    pub image_url: Option<String>,
    pub genre: Option<String>,
    pub tags: Vec<String>,
    pub creator_pi_username: String,
}

pub struct PodcastRepo {
    pool: PgPool,
}

impl PodcastRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: NewPodcast) -> Result<Podcast> {
        let podcast = sqlx::query_as::<_, Podcast>(&format!(
            r#"
            INSERT INTO podcasts (title, description, duration, audio_url, image_url,
                                  genre, tags, creator_pi_username)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PODCAST_COLUMNS}
            "#,
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.duration)
        .bind(&new.audio_url)
        .bind(&new.image_url)
        .bind(&new.genre)
        .bind(&new.tags)
        .bind(&new.creator_pi_username)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            podcast_id = podcast.id,
            creator = %podcast.creator_pi_username,
            "Podcast stored"
        );

        Ok(podcast)
    }

    /// All podcasts, newest first. Hidden and banned rows are included; the
    /// client filters on the moderation flags.
    pub async fn list_newest(&self) -> Result<Vec<Podcast>> {
        let podcasts = sqlx::query_as::<_, Podcast>(&format!(
            "SELECT {PODCAST_COLUMNS} FROM podcasts ORDER BY uploaded_at DESC",
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(podcasts)
    }

    /// Admin-only bulk clear of the catalog and its flags.
    pub async fn clear_all(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM flags").execute(&mut *tx).await?;
        let deleted = sqlx::query("DELETE FROM podcasts")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        tracing::warn!(deleted, "Podcast catalog cleared by admin");
        Ok(deleted)
    }
}
