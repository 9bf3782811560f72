//! Creator wallet-address management.

use crate::db::UserRepo;
use crate::error::{AppError, Result};
use crate::services::payout::MIN_WALLET_LEN;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBody {
    pub username: String,
    pub wallet_address: String,
}

/// POST /wallet-address
pub async fn save_wallet_address(
    pool: web::Data<PgPool>,
    req: web::Json<WalletBody>,
) -> Result<HttpResponse> {
    if req.username.trim().is_empty() {
        return Err(AppError::Validation("username is required".to_string()));
    }

    let wallet = req.wallet_address.trim();
    if wallet.len() < MIN_WALLET_LEN {
        return Err(AppError::Validation("walletAddress is too short".to_string()));
    }

    UserRepo::new(pool.get_ref().clone())
        .upsert_wallet(&req.username, wallet)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// GET /wallet-address/{username}
pub async fn get_wallet_address(
    pool: web::Data<PgPool>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let wallet = UserRepo::new(pool.get_ref().clone())
        .wallet_for(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No wallet on file for {}", username)))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "username": username.as_str(),
        "walletAddress": wallet,
    })))
}
