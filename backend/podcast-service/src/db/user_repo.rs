use crate::error::Result;
use sqlx::PgPool;

pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creators are created implicitly on their first wallet write.
    pub async fn upsert_wallet(&self, username: &str, wallet_address: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (creator_pi_username, wallet_address)
            VALUES ($1, $2)
            ON CONFLICT (creator_pi_username)
            DO UPDATE SET wallet_address = EXCLUDED.wallet_address
            "#,
        )
        .bind(username)
        .bind(wallet_address)
        .execute(&self.pool)
        .await?;

        tracing::info!(username = %username, "Wallet address saved");
        Ok(())
    }

    /// `None` when the creator is unknown or has no wallet on file.
    pub async fn wallet_for(&self, username: &str) -> Result<Option<String>> {
        let wallet: Option<Option<String>> = sqlx::query_scalar(
            "SELECT wallet_address FROM users WHERE creator_pi_username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet.flatten())
    }
}
