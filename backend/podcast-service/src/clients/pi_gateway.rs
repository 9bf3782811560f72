//! Pi Network payment gateway client.
//!
//! Wraps the three-phase payment protocol: create -> approve -> complete.
//! Every phase is a separate network call and any non-2xx response is a
//! terminal failure of that phase; the caller must not proceed past it.

use crate::config::GatewayConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Gateway-side state of a payment, as reported by a fetch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentStatus {
    #[serde(default)]
    pub developer_approved: bool,
    #[serde(default)]
    pub cancelled: bool,
}

/// The payment-settlement operations the workflows depend on. Injected so
/// tests substitute a fake for the real gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates an app-to-user payment, returning the gateway payment id.
    async fn create_payment(
        &self,
        amount: f64,
        memo: &str,
        metadata: Value,
        uid: &str,
    ) -> Result<String>;

    async fn approve(&self, payment_id: &str) -> Result<()>;

    /// Completes the payment against an external transaction reference. The
    /// gateway offers no idempotency key; callers must not re-issue this
    /// after a confirmed success.
    async fn complete(&self, payment_id: &str, txid: &str) -> Result<()>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentStatus>;
}

pub struct PiGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl PiGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn auth_header(&self) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Internal("PI_API_KEY is not configured".to_string()))?;

        Ok(format!("Key {key}"))
    }

    /// Turns a gateway response into a phase error. The response body is
    /// forwarded truncated; credentials never appear in it.
    async fn phase_error(phase: &str, response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();

        AppError::Upstream {
            service: "pi-gateway",
            message: format!("{phase} failed with status {status}: {snippet}"),
        }
    }

    fn transport_error(phase: &str, err: reqwest::Error) -> AppError {
        let message = if err.is_timeout() {
            format!("{phase} timed out")
        } else {
            format!("{phase} transport failure: {err}")
        };

        AppError::Upstream { service: "pi-gateway", message }
    }
}

#[async_trait]
impl PaymentGateway for PiGateway {
    async fn create_payment(
        &self,
        amount: f64,
        memo: &str,
        metadata: Value,
        uid: &str,
    ) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/payments", self.base_url))
            .header("Authorization", self.auth_header()?)
            .json(&serde_json::json!({
                "payment": {
                    "amount": amount,
                    "memo": memo,
                    "metadata": metadata,
                    "uid": uid,
                }
            }))
            .send()
            .await
            .map_err(|e| Self::transport_error("create", e))?;

        if !response.status().is_success() {
            return Err(Self::phase_error("create", response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Self::transport_error("create", e))?;

        let payment_id = body
            .get("identifier")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Upstream {
                service: "pi-gateway",
                message: "create response carried no payment identifier".to_string(),
            })?;

        tracing::info!(payment_id = %payment_id, amount, "Gateway payment created");
        Ok(payment_id.to_string())
    }

    async fn approve(&self, payment_id: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/payments/{}/approve", self.base_url, payment_id))
            .header("Authorization", self.auth_header()?)
            .send()
            .await
            .map_err(|e| Self::transport_error("approve", e))?;

        if !response.status().is_success() {
            return Err(Self::phase_error("approve", response).await);
        }

        tracing::info!(payment_id = %payment_id, "Gateway payment approved");
        Ok(())
    }

    async fn complete(&self, payment_id: &str, txid: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/payments/{}/complete", self.base_url, payment_id))
            .header("Authorization", self.auth_header()?)
            .json(&serde_json::json!({ "txid": txid }))
            .send()
            .await
            .map_err(|e| Self::transport_error("complete", e))?;

        if !response.status().is_success() {
            return Err(Self::phase_error("complete", response).await);
        }

        tracing::info!(payment_id = %payment_id, txid = %txid, "Gateway payment completed");
        Ok(())
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentStatus> {
        let response = self
            .http
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .header("Authorization", self.auth_header()?)
            .send()
            .await
            .map_err(|e| Self::transport_error("fetch", e))?;

        if !response.status().is_success() {
            return Err(Self::phase_error("fetch", response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Self::transport_error("fetch", e))?;

        let status = body
            .get("status")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AppError::Upstream {
                service: "pi-gateway",
                message: format!("malformed payment status: {e}"),
            })?
            .unwrap_or_default();

        Ok(status)
    }
}
