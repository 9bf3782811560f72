//! Tip aggregation and creator payout settlement.
//!
//! The settlement path crosses a process boundary that cannot be rolled
//! back: once the gateway confirms a payment, funds have moved. The workflow
//! therefore writes a durable `settling` payout row immediately after
//! gateway success, then commits the tip ledger, and surfaces any failure in
//! between as `Reconciliation`, never retrying the gateway call.

use crate::clients::{Mailer, PaymentGateway};
use crate::db::{PayoutRepo, TipRepo, UnpaidTip, UserRepo};
use crate::error::{AppError, Result};
use crate::models::{PayoutReceipt, PayoutRequest};
use async_trait::async_trait;
use sqlx::{Acquire, PgPool};
use std::sync::Arc;
use uuid::Uuid;

/// Platform fee withheld from every payout.
pub const FEE_RATE: f64 = 0.10;

/// Minimum unpaid-tip total before a payout can be requested.
pub const MIN_PAYOUT: f64 = 3.0;

/// Sanity floor for wallet addresses; anything shorter is treated as absent.
pub const MIN_WALLET_LEN: usize = 10;

/// Monetary rounding to the currency's 6-decimal precision.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Fee and net for a gross tip total. `fee + net == gross` at 6 decimals.
pub fn compute_fees(total: f64) -> (f64, f64) {
    let fee = round6(total * FEE_RATE);
    let net = round6(total - fee);
    (fee, net)
}

fn validate_wallet(wallet: Option<String>) -> Result<String> {
    match wallet {
        Some(w) if w.trim().len() >= MIN_WALLET_LEN => Ok(w),
        _ => Err(AppError::NoWallet),
    }
}

fn ensure_minimum(total: f64) -> Result<()> {
    if total < MIN_PAYOUT {
        return Err(AppError::BelowMinimum { total, minimum: MIN_PAYOUT });
    }
    Ok(())
}

/// Runs the gateway's three-phase protocol for a net disbursement, returning
/// the payment id and the generated transaction reference. Each phase fails
/// fast; a failed phase is never followed by the next one, and `complete` is
/// issued exactly once.
async fn settle_with_gateway(
    gateway: &dyn PaymentGateway,
    username: &str,
    net: f64,
    uid: &str,
) -> Result<(String, String)> {
    let memo = format!("Creator payout for {username}");
    let metadata = serde_json::json!({
        "creator": username,
        "type": "creator_payout",
    });

    let payment_id = gateway.create_payment(net, &memo, metadata, uid).await?;
    gateway.approve(&payment_id).await?;

    let txid = Uuid::new_v4().to_string();
    gateway.complete(&payment_id, &txid).await?;

    Ok((payment_id, txid))
}

/// The durable writes a settlement depends on, split from the pool-bound
/// repositories so the post-gateway failure handling can be exercised
/// against a fake.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait SettlementLedger: Send {
    /// Records the settling payout row right after gateway success.
    async fn record_settling(
        &mut self,
        creator: &str,
        gross: f64,
        fee: f64,
        net: f64,
        wallet: &str,
        payment_id: &str,
        txid: &str,
    ) -> Result<i32>;

    /// Marks the snapshot tips paid and flips the payout to completed, in
    /// one transaction.
    async fn commit_ledger(&mut self, payout_id: i32, tip_ids: &[i32]) -> Result<()>;
}

struct PgSettlementLedger<'a> {
    conn: &'a mut sqlx::pool::PoolConnection<sqlx::Postgres>,
}

#[async_trait]
impl SettlementLedger for PgSettlementLedger<'_> {
    async fn record_settling(
        &mut self,
        creator: &str,
        gross: f64,
        fee: f64,
        net: f64,
        wallet: &str,
        payment_id: &str,
        txid: &str,
    ) -> Result<i32> {
        PayoutRepo::insert_settling(self.conn, creator, gross, fee, net, wallet, payment_id, txid)
            .await
    }

    async fn commit_ledger(&mut self, payout_id: i32, tip_ids: &[i32]) -> Result<()> {
        let mut tx = self.conn.begin().await?;
        TipRepo::mark_paid(&mut tx, tip_ids).await?;
        PayoutRepo::mark_completed(&mut tx, payout_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Settlement pipeline for a snapshot of unpaid tips: minimum gating, fee
/// computation, the gateway protocol, then the ledger writes. Any failure
/// after the gateway confirmed the payment surfaces as `Reconciliation` so
/// it is never retried.
async fn settle(
    gateway: &dyn PaymentGateway,
    ledger: &mut dyn SettlementLedger,
    username: &str,
    uid: &str,
    wallet: &str,
    tips: &[UnpaidTip],
) -> Result<PayoutReceipt> {
    let tip_ids: Vec<i32> = tips.iter().map(|t| t.id).collect();
    let total = round6(tips.iter().map(|t| t.amount).sum());

    ensure_minimum(total)?;
    let (fee, net) = compute_fees(total);

    tracing::info!(
        username = %username,
        tips = tip_ids.len(),
        total,
        fee,
        net,
        "Starting payout settlement"
    );

    // Point of no return: after this call funds have moved.
    let (payment_id, txid) = settle_with_gateway(gateway, username, net, uid).await?;

    let payout_id = ledger
        .record_settling(username, total, fee, net, wallet, &payment_id, &txid)
        .await
        .map_err(|e| AppError::Reconciliation {
            payment_id: payment_id.clone(),
            message: format!("failed to record settling payout: {e}"),
        })?;

    ledger
        .commit_ledger(payout_id, &tip_ids)
        .await
        .map_err(|e| AppError::Reconciliation {
            payment_id: payment_id.clone(),
            message: format!("payout {payout_id} recorded but ledger commit failed: {e}"),
        })?;

    tracing::info!(
        username = %username,
        payout_id,
        payment_id = %payment_id,
        "Payout settled"
    );

    Ok(PayoutReceipt {
        payout_id,
        amount: total,
        fee,
        net_amount: net,
        gateway_payment_id: payment_id,
        txid,
    })
}

pub struct PayoutService {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    mailer: Arc<Mailer>,
}

impl PayoutService {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, mailer: Arc<Mailer>) -> Self {
        Self { pool, gateway, mailer }
    }

    /// Settles all unpaid tips for a creator through the gateway.
    ///
    /// The whole workflow runs on a dedicated connection holding a
    /// per-creator advisory lock, so concurrent requests for the same
    /// creator serialize and cannot double-count the same tips.
    pub async fn request_payout(&self, username: &str, uid: &str) -> Result<PayoutReceipt> {
        if username.trim().is_empty() {
            return Err(AppError::Validation("username is required".to_string()));
        }

        let wallet = validate_wallet(UserRepo::new(self.pool.clone()).wallet_for(username).await?)?;

        let mut conn = self.pool.acquire().await?;

        sqlx::query("SELECT pg_advisory_lock(hashtext($1))")
            .bind(username)
            .execute(&mut *conn)
            .await?;

        let result = self
            .settle_locked(&mut conn, username, uid, &wallet)
            .await;

        if let Err(e) = sqlx::query("SELECT pg_advisory_unlock(hashtext($1))")
            .bind(username)
            .execute(&mut *conn)
            .await
        {
            // The lock is session-scoped; dropping the connection releases it.
            tracing::warn!(username = %username, "Failed to release payout lock: {}", e);
        }

        result
    }

    async fn settle_locked(
        &self,
        conn: &mut sqlx::pool::PoolConnection<sqlx::Postgres>,
        username: &str,
        uid: &str,
        wallet: &str,
    ) -> Result<PayoutReceipt> {
        let tips = TipRepo::snapshot_unpaid(conn, username).await?;
        let mut ledger = PgSettlementLedger { conn };
        settle(self.gateway.as_ref(), &mut ledger, username, uid, wallet, &tips).await
    }

    /// Queues a manual payout request for operator fulfillment; no funds
    /// move. The same wallet and minimum gates as the settled path apply,
    /// and a second open request for the same creator is a conflict.
    pub async fn request_manual_payout(&self, username: &str) -> Result<PayoutRequest> {
        if username.trim().is_empty() {
            return Err(AppError::Validation("username is required".to_string()));
        }

        let wallet = validate_wallet(UserRepo::new(self.pool.clone()).wallet_for(username).await?)?;
        let amount = round6(TipRepo::new(self.pool.clone()).unpaid_total(username).await?);
        ensure_minimum(amount)?;

        let request = PayoutRepo::new(self.pool.clone()).insert_request(username).await?;

        // The queued request is the durable fact; a notification failure is
        // logged and does not fail the call.
        if let Err(e) = self.mailer.send_payout_request(username, &wallet, amount) {
            tracing::error!(username = %username, "Payout request notification failed: {}", e);
        }

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockPaymentGateway;
    use mockall::predicate::*;
    use mockall::Sequence;

    #[test]
    fn fee_plus_net_equals_gross() {
        for total in [3.0, 5.0, 7.77, 10.123456, 1234.5] {
            let (fee, net) = compute_fees(total);
            assert_eq!(round6(fee + net), round6(total));
            assert_eq!(fee, round6(total * 0.10));
        }
    }

    #[test]
    fn five_units_yield_half_unit_fee() {
        let (fee, net) = compute_fees(5.0);
        assert_eq!(fee, 0.5);
        assert_eq!(net, 4.5);
    }

    #[test]
    fn below_minimum_is_rejected() {
        assert!(matches!(
            ensure_minimum(0.0),
            Err(AppError::BelowMinimum { .. })
        ));
        assert!(matches!(
            ensure_minimum(2.999999),
            Err(AppError::BelowMinimum { .. })
        ));
        assert!(ensure_minimum(3.0).is_ok());
    }

    #[test]
    fn missing_or_short_wallet_is_rejected() {
        assert!(matches!(validate_wallet(None), Err(AppError::NoWallet)));
        assert!(matches!(
            validate_wallet(Some("short".to_string())),
            Err(AppError::NoWallet)
        ));
        assert!(validate_wallet(Some("GA7F3K9QXEXAMPLEWALLET".to_string())).is_ok());
    }

    #[tokio::test]
    async fn settlement_runs_create_approve_complete_in_order() {
        let mut gateway = MockPaymentGateway::new();
        let mut seq = Sequence::new();

        gateway
            .expect_create_payment()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|amount, _, metadata, uid| {
                *amount == 4.5 && metadata["creator"] == "creator_b" && uid == "uid-1"
            })
            .returning(|_, _, _, _| Ok("pay_1".to_string()));
        gateway
            .expect_approve()
            .times(1)
            .in_sequence(&mut seq)
            .with(eq("pay_1"))
            .returning(|_| Ok(()));
        gateway
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|id, txid| id == "pay_1" && !txid.is_empty())
            .returning(|_, _| Ok(()));

        let (payment_id, txid) = settle_with_gateway(&gateway, "creator_b", 4.5, "uid-1")
            .await
            .unwrap();
        assert_eq!(payment_id, "pay_1");
        assert!(!txid.is_empty());
    }

    fn unpaid(amounts: &[f64]) -> Vec<UnpaidTip> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| UnpaidTip { id: i as i32 + 1, amount })
            .collect()
    }

    #[tokio::test]
    async fn below_minimum_never_reaches_the_gateway() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_payment().times(0);
        gateway.expect_approve().times(0);
        gateway.expect_complete().times(0);

        let mut ledger = MockSettlementLedger::new();
        ledger.expect_record_settling().times(0);

        let err = settle(
            &gateway,
            &mut ledger,
            "creator_b",
            "uid-1",
            "GA7F3K9QXEXAMPLEWALLET",
            &unpaid(&[1.0, 1.5]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BelowMinimum { .. }));
    }

    #[tokio::test]
    async fn failed_complete_is_terminal_and_not_retried() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_payment()
            .times(1)
            .returning(|_, _, _, _| Ok("pay_3".to_string()));
        gateway.expect_approve().times(1).returning(|_| Ok(()));
        gateway.expect_complete().times(1).returning(|_, _| {
            Err(AppError::Upstream {
                service: "pi-gateway",
                message: "complete timed out".to_string(),
            })
        });

        let err = settle_with_gateway(&gateway, "creator_b", 4.5, "uid-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
    }

    #[tokio::test]
    async fn ledger_failure_after_gateway_success_requires_reconciliation() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_payment()
            .times(1)
            .returning(|_, _, _, _| Ok("pay_9".to_string()));
        gateway.expect_approve().times(1).returning(|_| Ok(()));
        gateway.expect_complete().times(1).returning(|_, _| Ok(()));

        let mut ledger = MockSettlementLedger::new();
        ledger
            .expect_record_settling()
            .times(1)
            .returning(|_, _, _, _, _, _, _| {
                Err(AppError::Internal("insert failed".to_string()))
            });
        ledger.expect_commit_ledger().times(0);

        let err = settle(
            &gateway,
            &mut ledger,
            "creator_b",
            "uid-1",
            "GA7F3K9QXEXAMPLEWALLET",
            &unpaid(&[2.0, 3.0]),
        )
        .await
        .unwrap_err();

        match err {
            AppError::Reconciliation { payment_id, .. } => assert_eq!(payment_id, "pay_9"),
            other => panic!("expected a reconciliation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn commit_failure_after_settling_row_requires_reconciliation() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_payment()
            .times(1)
            .returning(|_, _, _, _| Ok("pay_10".to_string()));
        gateway.expect_approve().times(1).returning(|_| Ok(()));
        gateway.expect_complete().times(1).returning(|_, _| Ok(()));

        let mut ledger = MockSettlementLedger::new();
        ledger
            .expect_record_settling()
            .times(1)
            .returning(|_, _, _, _, _, _, _| Ok(41));
        ledger
            .expect_commit_ledger()
            .times(1)
            .returning(|_, _| Err(AppError::Internal("tips update failed".to_string())));

        let err = settle(
            &gateway,
            &mut ledger,
            "creator_b",
            "uid-1",
            "GA7F3K9QXEXAMPLEWALLET",
            &unpaid(&[5.0]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Reconciliation { .. }));
    }

    #[tokio::test]
    async fn successful_settlement_returns_a_receipt() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_payment()
            .times(1)
            .withf(|amount, _, _, _| *amount == 4.5)
            .returning(|_, _, _, _| Ok("pay_5".to_string()));
        gateway.expect_approve().times(1).returning(|_| Ok(()));
        gateway.expect_complete().times(1).returning(|_, _| Ok(()));

        let mut ledger = MockSettlementLedger::new();
        ledger
            .expect_record_settling()
            .times(1)
            .withf(|_, gross, fee, net, _, _, _| *gross == 5.0 && *fee == 0.5 && *net == 4.5)
            .returning(|_, _, _, _, _, _, _| Ok(7));
        ledger
            .expect_commit_ledger()
            .times(1)
            .withf(|payout_id, tip_ids| *payout_id == 7 && tip_ids == [1, 2].as_slice())
            .returning(|_, _| Ok(()));

        let receipt = settle(
            &gateway,
            &mut ledger,
            "creator_b",
            "uid-1",
            "GA7F3K9QXEXAMPLEWALLET",
            &unpaid(&[2.5, 2.5]),
        )
        .await
        .unwrap();

        assert_eq!(receipt.payout_id, 7);
        assert_eq!(receipt.amount, 5.0);
        assert_eq!(receipt.fee, 0.5);
        assert_eq!(receipt.net_amount, 4.5);
        assert_eq!(receipt.gateway_payment_id, "pay_5");
    }

    #[tokio::test]
    async fn failed_create_aborts_before_approve() {
        let mut gateway = MockPaymentGateway::new();

        gateway.expect_create_payment().times(1).returning(|_, _, _, _| {
            Err(AppError::Upstream {
                service: "pi-gateway",
                message: "create failed with status 500".to_string(),
            })
        });
        gateway.expect_approve().times(0);
        gateway.expect_complete().times(0);

        let err = settle_with_gateway(&gateway, "creator_b", 4.5, "uid-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
    }

    #[tokio::test]
    async fn failed_approve_aborts_before_complete() {
        let mut gateway = MockPaymentGateway::new();

        gateway
            .expect_create_payment()
            .times(1)
            .returning(|_, _, _, _| Ok("pay_2".to_string()));
        gateway.expect_approve().times(1).returning(|_| {
            Err(AppError::Upstream {
                service: "pi-gateway",
                message: "approve failed with status 400".to_string(),
            })
        });
        gateway.expect_complete().times(0);

        let err = settle_with_gateway(&gateway, "creator_b", 4.5, "uid-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
    }
}
