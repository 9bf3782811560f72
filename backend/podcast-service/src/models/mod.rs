//! Persistent entities and API response shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Podcast {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub audio_url: String,
    pub image_url: Option<String>,
    pub genre: Option<String>,
    pub tags: Vec<String>,
    pub creator_pi_username: String,
    pub uploaded_at: DateTime<Utc>,
    pub flag_count: i32,
    pub hidden: bool,
    pub creator_banned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tip {
    pub id: i32,
    pub podcast_id: i32,
    pub tipper_username: String,
    pub recipient_username: String,
    pub amount: f64,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payout {
    pub id: i32,
    pub creator_username: String,
    /// Gross amount of the aggregated tips
    pub amount: f64,
    pub platform_fee: f64,
    /// Net amount disbursed to the creator's wallet
    pub amount_paid: f64,
    pub paid_to: String,
    pub payment_id: Option<String>,
    pub txid: Option<String>,
    pub status: String,
    pub is_manual: bool,
    pub reason: Option<String>,
    pub payout_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayoutRequest {
    pub id: i32,
    pub username: String,
    pub requested_at: DateTime<Utc>,
    pub fulfilled: bool,
}

/// Result of a settled payout, returned to the requesting creator.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutReceipt {
    pub payout_id: i32,
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
    pub gateway_payment_id: String,
    pub txid: String,
}

/// Moderation state of a podcast together with its creator standing.
///
/// Stored as the `hidden` / `creator_banned` booleans on podcast rows; this
/// enum makes the progression explicit. Transitions only move forward and
/// only happen through the moderation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Visible,
    Hidden,
    Banned,
}

impl ModerationStatus {
    pub fn from_row_flags(hidden: bool, creator_banned: bool) -> Self {
        match (creator_banned, hidden) {
            (true, _) => ModerationStatus::Banned,
            (false, true) => ModerationStatus::Hidden,
            (false, false) => ModerationStatus::Visible,
        }
    }
}
