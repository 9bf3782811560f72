//! Business workflows wired between the HTTP surface and the repositories.

pub mod auth;
pub mod moderation;
pub mod payout;
pub mod upload;

pub use auth::{LoginIdentity, LoginVerifier};
pub use moderation::ModerationService;
pub use payout::PayoutService;
pub use upload::UploadService;
