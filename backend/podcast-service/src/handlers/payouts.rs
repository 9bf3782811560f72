//! Payout settlement and the user-to-app payment callbacks.

use crate::clients::{Mailer, PaymentGateway};
use crate::error::{AppError, Result};
use crate::services::PayoutService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PayoutRequestBody {
    pub username: String,
    #[serde(default)]
    pub uid: String,
}

/// POST /request-payout — aggregates unpaid tips and settles them through
/// the gateway.
pub async fn request_payout(
    pool: web::Data<PgPool>,
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    mailer: web::Data<Arc<Mailer>>,
    req: web::Json<PayoutRequestBody>,
) -> Result<HttpResponse> {
    let service = PayoutService::new(
        pool.get_ref().clone(),
        gateway.get_ref().clone(),
        mailer.get_ref().clone(),
    );

    let receipt = service.request_payout(&req.username, &req.uid).await?;
    Ok(HttpResponse::Ok().json(receipt))
}

#[derive(Debug, Deserialize)]
pub struct ManualPayoutRequestBody {
    pub username: String,
}

/// POST /request-manual-payout — queues an operator-fulfilled request.
pub async fn request_manual_payout(
    pool: web::Data<PgPool>,
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    mailer: web::Data<Arc<Mailer>>,
    req: web::Json<ManualPayoutRequestBody>,
) -> Result<HttpResponse> {
    let service = PayoutService::new(
        pool.get_ref().clone(),
        gateway.get_ref().clone(),
        mailer.get_ref().clone(),
    );

    let request = service.request_manual_payout(&req.username).await?;
    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "success": true,
        "request": request,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePaymentRequest {
    pub payment_id: String,
}

/// POST /approve-payment — user-to-app payment callback from the frontend
/// SDK. Approves the payment unless the gateway already settled or
/// cancelled it.
pub async fn approve_payment(
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    req: web::Json<ApprovePaymentRequest>,
) -> Result<HttpResponse> {
    if req.payment_id.trim().is_empty() {
        return Err(AppError::Validation("paymentId is required".to_string()));
    }

    let status = gateway.fetch_payment(&req.payment_id).await?;
    if status.developer_approved || status.cancelled {
        return Err(AppError::Conflict(
            "Payment already approved or cancelled".to_string(),
        ));
    }

    gateway.approve(&req.payment_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePaymentRequest {
    pub payment_id: String,
    pub txid: String,
}

/// POST /complete-payment — user-to-app completion callback.
pub async fn complete_payment(
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    req: web::Json<CompletePaymentRequest>,
) -> Result<HttpResponse> {
    if req.payment_id.trim().is_empty() || req.txid.trim().is_empty() {
        return Err(AppError::Validation("paymentId and txid are required".to_string()));
    }

    gateway.complete(&req.payment_id, &req.txid).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}
