//! Login verification endpoint.

use crate::error::{AppError, Result};
use crate::services::LoginVerifier;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct VerifyLoginRequest {
    pub user: Option<Value>,
    pub jwt: Option<String>,
    pub signature: Option<String>,
}

/// POST /verify-login — checks the SDK-signed payload and returns the
/// asserted identity.
pub async fn verify_login(
    verifier: web::Data<Arc<LoginVerifier>>,
    req: web::Json<VerifyLoginRequest>,
) -> Result<HttpResponse> {
    let (user, jwt, signature) = match (&req.user, &req.jwt, &req.signature) {
        (Some(user), Some(jwt), Some(signature)) => (user, jwt, signature),
        _ => return Err(AppError::Validation("Missing login data".to_string())),
    };

    let identity = verifier.verify(user, jwt, signature)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "username": identity.username,
        "uid": identity.uid,
    })))
}
