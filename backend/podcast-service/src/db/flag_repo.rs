use crate::error::{AppError, Result};
use sqlx::PgConnection;

/// Flag storage and the podcast-side moderation counters.
///
/// Every method runs on a caller-supplied connection so the report workflow
/// can keep the insert, the counter bump, and the escalation updates in one
/// transaction.
pub struct FlagRepo;

impl FlagRepo {
    /// Inserts a flag. The `(podcast_id, flagged_by)` uniqueness constraint
    /// is the duplicate check; a violation comes back as `Conflict`.
    pub async fn insert(
        conn: &mut PgConnection,
        podcast_id: i32,
        flagged_by: &str,
    ) -> Result<()> {
        sqlx::query("INSERT INTO flags (podcast_id, flagged_by) VALUES ($1, $2)")
            .bind(podcast_id)
            .bind(flagged_by)
            .execute(conn)
            .await
            .map_err(|e| AppError::conflict_on_unique(e, "You have already flagged this podcast"))?;

        Ok(())
    }

    /// Bumps the podcast's flag count, returning the new count plus the
    /// creator and current moderation flags. `None` when the podcast is gone.
    pub async fn increment_flag_count(
        conn: &mut PgConnection,
        podcast_id: i32,
    ) -> Result<Option<(i32, String, bool, bool)>> {
        let row = sqlx::query_as::<_, (i32, String, bool, bool)>(
            r#"
            UPDATE podcasts
            SET flag_count = flag_count + 1
            WHERE id = $1
            RETURNING flag_count, creator_pi_username, hidden, creator_banned
            "#,
        )
        .bind(podcast_id)
        .fetch_optional(conn)
        .await?;

        Ok(row)
    }

    pub async fn hide_podcast(conn: &mut PgConnection, podcast_id: i32) -> Result<()> {
        sqlx::query("UPDATE podcasts SET hidden = TRUE WHERE id = $1")
            .bind(podcast_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn hidden_count_for_creator(
        conn: &mut PgConnection,
        creator: &str,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM podcasts WHERE creator_pi_username = $1 AND hidden",
        )
        .bind(creator)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Banning is recorded on the creator's podcast rows, not a separate
    /// user-status table.
    pub async fn ban_creator(conn: &mut PgConnection, creator: &str) -> Result<()> {
        sqlx::query("UPDATE podcasts SET creator_banned = TRUE WHERE creator_pi_username = $1")
            .bind(creator)
            .execute(conn)
            .await?;

        Ok(())
    }
}
