//! HTTP handlers: input validation, workflow invocation, response shaping.

pub mod admin;
pub mod auth;
pub mod moderation;
pub mod payouts;
pub mod podcasts;
pub mod tips;
pub mod wallet;
