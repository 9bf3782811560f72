//! Operator endpoints for payout bookkeeping.

use crate::db::{PayoutRepo, UserRepo};
use crate::error::{AppError, Result};
use crate::services::payout::{compute_fees, round6};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

/// GET /admin/payout-requests
pub async fn list_payout_requests(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let requests = PayoutRepo::new(pool.get_ref().clone()).list_open_requests().await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// PATCH /admin/payout-requests/{username}/fulfill
pub async fn fulfill_payout_request(
    pool: web::Data<PgPool>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let request = PayoutRepo::new(pool.get_ref().clone())
        .fulfill_request(&username)
        .await?;

    Ok(HttpResponse::Ok().json(request))
}

/// GET /admin/payouts
pub async fn list_payouts(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let payouts = PayoutRepo::new(pool.get_ref().clone()).list_all().await?;
    Ok(HttpResponse::Ok().json(payouts))
}

#[derive(Debug, Deserialize)]
pub struct ManualPayoutBody {
    pub username: String,
    pub amount: f64,
    pub reason: Option<String>,
}

/// POST /admin/manual-payout — records an out-of-band disbursement in the
/// ledger; the operator has already moved the funds.
pub async fn record_manual_payout(
    pool: web::Data<PgPool>,
    req: web::Json<ManualPayoutBody>,
) -> Result<HttpResponse> {
    if req.username.trim().is_empty() {
        return Err(AppError::Validation("username is required".to_string()));
    }
    if req.amount <= 0.0 || !req.amount.is_finite() {
        return Err(AppError::Validation("amount must be a positive number".to_string()));
    }

    let wallet = UserRepo::new(pool.get_ref().clone())
        .wallet_for(&req.username)
        .await?
        .ok_or(AppError::NoWallet)?;

    let gross = round6(req.amount);
    let (fee, net) = compute_fees(gross);

    let payout = PayoutRepo::new(pool.get_ref().clone())
        .insert_manual(&req.username, gross, fee, net, &wallet, req.reason.as_deref())
        .await?;

    Ok(HttpResponse::Created().json(payout))
}

#[derive(Debug, Deserialize)]
pub struct TxidBody {
    pub txid: String,
}

/// PATCH /admin/payouts/{id}/txid — recording the blockchain transaction id
/// fulfills the payout.
pub async fn set_payout_txid(
    pool: web::Data<PgPool>,
    payout_id: web::Path<i32>,
    req: web::Json<TxidBody>,
) -> Result<HttpResponse> {
    if req.txid.trim().is_empty() {
        return Err(AppError::Validation("txid is required".to_string()));
    }

    let payout = PayoutRepo::new(pool.get_ref().clone())
        .set_txid(*payout_id, &req.txid)
        .await?;

    Ok(HttpResponse::Ok().json(payout))
}

/// PATCH /admin/payouts/{id}/fulfill
pub async fn fulfill_payout(
    pool: web::Data<PgPool>,
    payout_id: web::Path<i32>,
) -> Result<HttpResponse> {
    let payout = PayoutRepo::new(pool.get_ref().clone()).fulfill(*payout_id).await?;
    Ok(HttpResponse::Ok().json(payout))
}
