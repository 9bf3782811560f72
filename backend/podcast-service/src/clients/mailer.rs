//! SMTP notifications to the operations mailbox.

use crate::config::SmtpConfig;
use crate::error::{AppError, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::SmtpTransport;
use lettre::{Message, Transport};

pub struct Mailer {
    config: SmtpConfig,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        let mailer = SmtpTransport::starttls_relay(&self.config.host)
            .map_err(|e| AppError::Upstream {
                service: "smtp",
                message: format!("Failed to build SMTP transport: {e}"),
            })?
            .port(self.config.port)
            .credentials(creds)
            .build();

        Ok(mailer)
    }

    /// Notifies operators that a creator asked for a manual payout.
    pub fn send_payout_request(&self, username: &str, wallet: &str, amount: f64) -> Result<()> {
        let body = format!(
            "A user has requested a payout.\n\n\
             Username: {username}\n\
             Amount: {amount} Pi\n\
             Wallet Address: {wallet}\n\n\
             Please review and process this payout from the admin dashboard.\n"
        );

        let message = Message::builder()
            .from(self.config.username.parse().map_err(|e| AppError::Upstream {
                service: "smtp",
                message: format!("Invalid sender address: {e}"),
            })?)
            .to(self.config.notify_to.parse().map_err(|e| AppError::Upstream {
                service: "smtp",
                message: format!("Invalid operations address: {e}"),
            })?)
            .subject(format!("Payout request from {username}"))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Upstream {
                service: "smtp",
                message: format!("Failed to build message: {e}"),
            })?;

        self.transport()?
            .send(&message)
            .map_err(|e| AppError::Upstream {
                service: "smtp",
                message: format!("Failed to send payout-request email: {e}"),
            })?;

        tracing::info!(username = %username, "Payout request email sent");
        Ok(())
    }
}
