//! Clients for the external surfaces: payment gateway, object storage, SMTP.

mod mailer;
mod pi_gateway;
mod storage;

pub use mailer::Mailer;
#[cfg(test)]
pub use pi_gateway::MockPaymentGateway;
pub use pi_gateway::{PaymentGateway, PaymentStatus, PiGateway};
pub use storage::ObjectStorage;
