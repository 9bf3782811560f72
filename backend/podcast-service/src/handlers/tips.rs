//! Tip recording and per-creator tip queries.

use crate::db::TipRepo;
use crate::error::{AppError, Result};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipRequest {
    pub podcast_id: i32,
    pub tipper: String,
    pub recipient: String,
    pub amount: f64,
}

/// POST /tip
pub async fn create_tip(
    pool: web::Data<PgPool>,
    req: web::Json<TipRequest>,
) -> Result<HttpResponse> {
    if req.tipper.trim().is_empty() || req.recipient.trim().is_empty() {
        return Err(AppError::Validation("tipper and recipient are required".to_string()));
    }
    if req.amount <= 0.0 || !req.amount.is_finite() {
        return Err(AppError::Validation("amount must be a positive number".to_string()));
    }

    let tip = TipRepo::new(pool.get_ref().clone())
        .insert(req.podcast_id, &req.tipper, &req.recipient, req.amount)
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "success": true, "tip": tip })))
}

/// GET /tips/{username}
pub async fn list_tips(
    pool: web::Data<PgPool>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let tips = TipRepo::new(pool.get_ref().clone())
        .list_for_recipient(&username)
        .await?;

    Ok(HttpResponse::Ok().json(tips))
}

/// GET /total-tips/{username}
pub async fn total_tips(
    pool: web::Data<PgPool>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let total = TipRepo::new(pool.get_ref().clone())
        .total_for_recipient(&username)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "username": username.as_str(),
        "total": total,
    })))
}

/// GET /tips-since-last-payout/{username}
pub async fn tips_since_last_payout(
    pool: web::Data<PgPool>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let tips = TipRepo::new(pool.get_ref().clone())
        .since_last_payout(&username)
        .await?;

    let total: f64 = tips.iter().map(|t| t.amount).sum();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "username": username.as_str(),
        "total": total,
        "tips": tips,
    })))
}
