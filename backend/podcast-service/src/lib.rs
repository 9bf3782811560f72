//! Podcast hosting and micro-tipping backend.
//!
//! Thin HTTP handlers over a Postgres store plus three external surfaces:
//! the Pi Network payment gateway (create/approve/complete), S3 object
//! storage for uploaded media, and an SMTP mailbox for operator
//! notifications.

pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
