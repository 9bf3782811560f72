use crate::error::{AppError, Result};
use crate::models::{Payout, PayoutRequest};
use sqlx::{PgConnection, PgPool};

const PAYOUT_COLUMNS: &str = "id, creator_username, amount, platform_fee, amount_paid, paid_to, \
     payment_id, txid, status, is_manual, reason, payout_date";

pub struct PayoutRepo {
    pool: PgPool,
}

impl PayoutRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Durable marker that funds moved at the gateway while the tip ledger
    /// is still pending. Written as a single statement right after gateway
    /// success so a crash before the ledger commit is recoverable.
    pub async fn insert_settling(
        conn: &mut PgConnection,
        creator: &str,
        gross: f64,
        fee: f64,
        net: f64,
        wallet: &str,
        payment_id: &str,
        txid: &str,
    ) -> Result<i32> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO payouts (creator_username, amount, platform_fee, amount_paid,
                                 paid_to, payment_id, txid, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'settling')
            RETURNING id
            "#,
        )
        .bind(creator)
        .bind(gross)
        .bind(fee)
        .bind(net)
        .bind(wallet)
        .bind(payment_id)
        .bind(txid)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    pub async fn mark_completed(conn: &mut PgConnection, payout_id: i32) -> Result<()> {
        sqlx::query("UPDATE payouts SET status = 'completed' WHERE id = $1")
            .bind(payout_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Payout>> {
        let payouts = sqlx::query_as::<_, Payout>(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts ORDER BY payout_date DESC",
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(payouts)
    }

    /// Records an operator-initiated payout; no funds move through here.
    pub async fn insert_manual(
        &self,
        creator: &str,
        gross: f64,
        fee: f64,
        net: f64,
        wallet: &str,
        reason: Option<&str>,
    ) -> Result<Payout> {
        let payout = sqlx::query_as::<_, Payout>(&format!(
            r#"
            INSERT INTO payouts (creator_username, amount, platform_fee, amount_paid,
                                 paid_to, status, is_manual, reason)
            VALUES ($1, $2, $3, $4, $5, 'completed', TRUE, $6)
            RETURNING {PAYOUT_COLUMNS}
            "#,
        ))
        .bind(creator)
        .bind(gross)
        .bind(fee)
        .bind(net)
        .bind(wallet)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(payout_id = payout.id, creator = %creator, "Manual payout recorded");
        Ok(payout)
    }

    /// Recording the external transaction id moves the payout to fulfilled.
    pub async fn set_txid(&self, payout_id: i32, txid: &str) -> Result<Payout> {
        let payout = sqlx::query_as::<_, Payout>(&format!(
            r#"
            UPDATE payouts SET txid = $2, status = 'fulfilled'
            WHERE id = $1
            RETURNING {PAYOUT_COLUMNS}
            "#,
        ))
        .bind(payout_id)
        .bind(txid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payout {} not found", payout_id)))?;

        Ok(payout)
    }

    pub async fn fulfill(&self, payout_id: i32) -> Result<Payout> {
        let payout = sqlx::query_as::<_, Payout>(&format!(
            "UPDATE payouts SET status = 'fulfilled' WHERE id = $1 RETURNING {PAYOUT_COLUMNS}",
        ))
        .bind(payout_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payout {} not found", payout_id)))?;

        Ok(payout)
    }

    /// The partial unique index on open requests turns a second open request
    /// into a conflict.
    pub async fn insert_request(&self, username: &str) -> Result<PayoutRequest> {
        let request = sqlx::query_as::<_, PayoutRequest>(
            r#"
            INSERT INTO payout_requests (username)
            VALUES ($1)
            RETURNING id, username, requested_at, fulfilled
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::conflict_on_unique(e, "A payout request is already pending for this user")
        })?;

        tracing::info!(username = %username, "Manual payout request queued");
        Ok(request)
    }

    pub async fn list_open_requests(&self) -> Result<Vec<PayoutRequest>> {
        let requests = sqlx::query_as::<_, PayoutRequest>(
            r#"
            SELECT id, username, requested_at, fulfilled
            FROM payout_requests
            WHERE NOT fulfilled
            ORDER BY requested_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    pub async fn fulfill_request(&self, username: &str) -> Result<PayoutRequest> {
        let request = sqlx::query_as::<_, PayoutRequest>(
            r#"
            UPDATE payout_requests SET fulfilled = TRUE
            WHERE username = $1 AND NOT fulfilled
            RETURNING id, username, requested_at, fulfilled
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No open payout request for {}", username))
        })?;

        Ok(request)
    }
}
