//! Database access, one repository per aggregate.

mod flag_repo;
mod payout_repo;
mod podcast_repo;
mod tip_repo;
mod user_repo;

pub use flag_repo::FlagRepo;
pub use payout_repo::PayoutRepo;
pub use podcast_repo::{NewPodcast, PodcastRepo};
pub use tip_repo::{TipRepo, UnpaidTip};
pub use user_repo::UserRepo;
