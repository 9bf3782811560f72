//! Community flagging and threshold-based escalation.
//!
//! A podcast is hidden once it accumulates `HIDE_THRESHOLD` flags; a creator
//! whose hidden-podcast count reaches `BAN_THRESHOLD` is banned across their
//! catalog. Escalation never reverses: there is no un-flag and no appeal.

use crate::db::FlagRepo;
use crate::error::{AppError, Result};
use crate::models::ModerationStatus;
use sqlx::PgPool;

/// Flags required before a podcast is hidden.
pub const HIDE_THRESHOLD: i32 = 5;

/// Hidden podcasts required before the creator is banned.
pub const BAN_THRESHOLD: i64 = 3;

/// The escalation transition. Pure; the workflow feeds it the
/// post-increment flag count and the creator's hidden-podcast count, and
/// persists whatever state comes out. Forward-only by construction.
pub fn escalate(
    current: ModerationStatus,
    flag_count: i32,
    creator_hidden_count: i64,
) -> ModerationStatus {
    let hidden = current != ModerationStatus::Visible || flag_count >= HIDE_THRESHOLD;
    let banned =
        current == ModerationStatus::Banned || (hidden && creator_hidden_count >= BAN_THRESHOLD);

    match (banned, hidden) {
        (true, _) => ModerationStatus::Banned,
        (false, true) => ModerationStatus::Hidden,
        (false, false) => ModerationStatus::Visible,
    }
}

pub struct ModerationService {
    pool: PgPool,
}

impl ModerationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a report and applies any escalation it triggers, all in one
    /// transaction so listing reads observe the new state immediately.
    ///
    /// A repeat report by the same user is rejected by the flags uniqueness
    /// constraint and surfaces as `Conflict`; the flag count is untouched.
    pub async fn report(&self, podcast_id: i32, reporter: &str) -> Result<ModerationStatus> {
        if reporter.trim().is_empty() {
            return Err(AppError::Validation("flagger is required".to_string()));
        }
        if podcast_id <= 0 {
            return Err(AppError::Validation("podcastId is required".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        FlagRepo::insert(&mut tx, podcast_id, reporter).await?;

        let (flag_count, creator, was_hidden, was_banned) =
            FlagRepo::increment_flag_count(&mut tx, podcast_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Podcast {} not found", podcast_id)))?;

        let current = ModerationStatus::from_row_flags(was_hidden, was_banned);

        let mut status = current;
        if current == ModerationStatus::Visible && flag_count >= HIDE_THRESHOLD {
            FlagRepo::hide_podcast(&mut tx, podcast_id).await?;
            status = ModerationStatus::Hidden;

            tracing::warn!(
                podcast_id,
                flag_count,
                creator = %creator,
                "Podcast hidden after reaching flag threshold"
            );
        }

        if status != ModerationStatus::Visible {
            let hidden_count = FlagRepo::hidden_count_for_creator(&mut tx, &creator).await?;
            status = escalate(status, flag_count, hidden_count);

            if status == ModerationStatus::Banned && !was_banned {
                FlagRepo::ban_creator(&mut tx, &creator).await?;

                tracing::warn!(
                    creator = %creator,
                    hidden_count,
                    "Creator banned after reaching hidden-podcast threshold"
                );
            }
        }

        tx.commit().await?;

        tracing::info!(podcast_id, reporter = %reporter, flag_count, "Report recorded");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModerationStatus::{Banned, Hidden, Visible};

    #[test]
    fn stays_visible_below_hide_threshold() {
        for count in 0..HIDE_THRESHOLD {
            assert_eq!(escalate(Visible, count, 0), Visible);
        }
    }

    #[test]
    fn hides_at_threshold() {
        assert_eq!(escalate(Visible, HIDE_THRESHOLD, 1), Hidden);
        assert_eq!(escalate(Visible, HIDE_THRESHOLD + 10, 1), Hidden);
    }

    #[test]
    fn bans_creator_at_hidden_threshold() {
        assert_eq!(escalate(Visible, HIDE_THRESHOLD, BAN_THRESHOLD), Banned);
        assert_eq!(escalate(Hidden, HIDE_THRESHOLD, BAN_THRESHOLD), Banned);
    }

    #[test]
    fn hidden_never_reverts() {
        // Flag counts only grow, but even a nonsensical lower input must not
        // resurface a hidden podcast.
        assert_eq!(escalate(Hidden, 0, 1), Hidden);
        assert_eq!(escalate(Banned, 0, 0), Banned);
    }

    #[test]
    fn hidden_count_below_ban_threshold_only_hides() {
        assert_eq!(
            escalate(Visible, HIDE_THRESHOLD, BAN_THRESHOLD - 1),
            Hidden
        );
    }
}
