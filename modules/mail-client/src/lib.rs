pub mod error;
pub mod models;

pub use error::{MailError, Result};
pub use models::OutgoingMail;

use std::time::Duration;

use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// TLS from the first byte (SMTPS, usually port 465).
    ImplicitTls { port: u16 },
    /// Plaintext connection upgraded with STARTTLS (usually port 587).
    StartTls { port: u16 },
}

impl TransportMode {
    pub fn port(&self) -> u16 {
        match self {
            TransportMode::ImplicitTls { port } | TransportMode::StartTls { port } => *port,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpOptions {
    pub host: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SmtpMailer {
    options: SmtpOptions,
}

impl SmtpMailer {
    pub fn new(options: SmtpOptions) -> Self {
        Self { options }
    }

    pub fn host(&self) -> &str {
        &self.options.host
    }

    fn transport(&self, mode: TransportMode) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = match mode {
            TransportMode::ImplicitTls { .. } => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&self.options.host)?
            }
            TransportMode::StartTls { .. } => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.options.host)?
            }
        };

        Ok(builder
            .port(mode.port())
            .credentials(Credentials::new(
                self.options.username.clone(),
                self.options.password.clone(),
            ))
            .timeout(Some(self.options.timeout))
            .build())
    }

    /// Log in and send one message over the given transport.
    pub async fn send(&self, mode: TransportMode, mail: &OutgoingMail) -> Result<()> {
        let message = mail.build_message()?;
        let transport = self.transport(mode)?;

        tracing::debug!(
            host = %self.options.host,
            port = mode.port(),
            recipients = mail.to.len(),
            "Sending mail"
        );

        transport.send(message).await?;
        Ok(())
    }
}
