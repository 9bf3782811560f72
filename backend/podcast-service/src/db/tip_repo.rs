use crate::error::Result;
use crate::models::Tip;
use sqlx::{PgConnection, PgPool};

const TIP_COLUMNS: &str =
    "id, podcast_id, tipper_username, recipient_username, amount, paid, created_at";

/// A tip included in a payout aggregation snapshot.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnpaidTip {
    pub id: i32,
    pub amount: f64,
}

pub struct TipRepo {
    pool: PgPool,
}

impl TipRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        podcast_id: i32,
        tipper: &str,
        recipient: &str,
        amount: f64,
    ) -> Result<Tip> {
        let tip = sqlx::query_as::<_, Tip>(&format!(
            r#"
            INSERT INTO tips (podcast_id, tipper_username, recipient_username, amount)
            VALUES ($1, $2, $3, $4)
            RETURNING {TIP_COLUMNS}
            "#,
        ))
        .bind(podcast_id)
        .bind(tipper)
        .bind(recipient)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            tip_id = tip.id,
            podcast_id,
            tipper = %tipper,
            recipient = %recipient,
            amount,
            "Tip recorded"
        );

        Ok(tip)
    }

    pub async fn list_for_recipient(&self, username: &str) -> Result<Vec<Tip>> {
        let tips = sqlx::query_as::<_, Tip>(&format!(
            "SELECT {TIP_COLUMNS} FROM tips WHERE recipient_username = $1 ORDER BY created_at DESC",
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(tips)
    }

    pub async fn total_for_recipient(&self, username: &str) -> Result<f64> {
        let total: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM tips WHERE recipient_username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Tips received after the creator's most recent payout; everything when
    /// no payout exists yet.
    pub async fn since_last_payout(&self, username: &str) -> Result<Vec<Tip>> {
        let tips = sqlx::query_as::<_, Tip>(&format!(
            r#"
            SELECT {TIP_COLUMNS} FROM tips
            WHERE recipient_username = $1
              AND created_at > COALESCE(
                  (SELECT MAX(payout_date) FROM payouts WHERE creator_username = $1),
                  'epoch'::timestamptz)
            ORDER BY created_at DESC
            "#,
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(tips)
    }

    pub async fn unpaid_total(&self, username: &str) -> Result<f64> {
        let total: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM tips WHERE recipient_username = $1 AND NOT paid",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Snapshot of the unpaid tips that a payout will settle. Runs on the
    /// workflow's dedicated connection while the per-creator advisory lock
    /// is held.
    pub async fn snapshot_unpaid(
        conn: &mut PgConnection,
        username: &str,
    ) -> Result<Vec<UnpaidTip>> {
        let tips = sqlx::query_as::<_, UnpaidTip>(
            "SELECT id, amount FROM tips WHERE recipient_username = $1 AND NOT paid ORDER BY id",
        )
        .bind(username)
        .fetch_all(conn)
        .await?;

        Ok(tips)
    }

    /// Marks exactly the snapshot tips paid. Tips created after the snapshot
    /// are untouched and roll into the next payout.
    pub async fn mark_paid(conn: &mut PgConnection, tip_ids: &[i32]) -> Result<u64> {
        let updated = sqlx::query("UPDATE tips SET paid = TRUE WHERE id = ANY($1)")
            .bind(tip_ids)
            .execute(conn)
            .await?
            .rows_affected();

        Ok(updated)
    }
}
