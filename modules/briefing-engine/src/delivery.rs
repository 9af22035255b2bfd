use std::sync::Arc;
use std::time::Duration;

use ai_client::strip_code_fences;
use mail_client::{OutgoingMail, TransportMode};
use pulldown_cmark::{html, Options, Parser};
use tracing::{info, warn};

use briefing_common::file_config::DeliveryConfig;
use briefing_common::{DeliveryResult, TransportUsed};

use crate::traits::MailTransport;

/// Resolve the recipient list. Splits on `,` and `，`, trims, drops empties;
/// with nothing configured the sender mails themselves.
pub fn parse_recipients(raw: Option<&str>, sender: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split([',', '，'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if parsed.is_empty() {
        sender.map(|s| vec![s.trim().to_string()]).unwrap_or_default()
    } else {
        parsed
    }
}

/// Render the generated report as a styled HTML document.
pub fn render_html(report: &str, stylesheet: &str) -> String {
    let cleaned = strip_code_fences(report);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut body = String::with_capacity(cleaned.len() * 2);
    html::push_html(&mut body, Parser::new_ext(&cleaned, options));

    format!(
        "<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{stylesheet}\n</style>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

/// `NotSent -> A -> Sent | B -> Sent | Failed`. No attempts beyond B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    NotSent,
    Sent(TransportUsed),
    Failed,
}

impl From<&DeliveryResult> for DeliveryState {
    fn from(result: &DeliveryResult) -> Self {
        match result.transport_used {
            Some(t) if result.succeeded => DeliveryState::Sent(t),
            Some(_) => DeliveryState::Failed,
            None => DeliveryState::NotSent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub sender: Option<String>,
    pub display_name: String,
    pub stylesheet: String,
    pub primary: TransportMode,
    pub fallback: TransportMode,
    pub retry_delay: Duration,
}

impl DeliverySettings {
    pub fn from_config(config: &DeliveryConfig, sender: Option<String>) -> Self {
        Self {
            sender,
            display_name: config.display_name.clone(),
            stylesheet: config.stylesheet.clone(),
            primary: TransportMode::ImplicitTls {
                port: config.implicit_tls_port,
            },
            fallback: TransportMode::StartTls {
                port: config.starttls_port,
            },
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// Sends one report, implicit TLS first and STARTTLS once on failure.
///
/// No deduplication: each `deliver` call sends another email.
pub struct DeliveryAgent {
    /// `None` when the sender or password is not configured.
    transport: Option<Arc<dyn MailTransport>>,
    settings: DeliverySettings,
}

impl DeliveryAgent {
    pub fn new(transport: Option<Arc<dyn MailTransport>>, settings: DeliverySettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub async fn deliver(&self, recipients: &[String], subject: &str, report: &str) -> DeliveryResult {
        let (Some(transport), Some(sender)) = (&self.transport, &self.settings.sender) else {
            warn!("Mail sender or password not configured, skipping delivery");
            return DeliveryResult::failed(None, "missing credentials");
        };

        let mail = OutgoingMail {
            from_name: self.settings.display_name.clone(),
            from_address: sender.clone(),
            to: recipients.to_vec(),
            subject: subject.to_string(),
            html_body: render_html(report, &self.settings.stylesheet),
        };

        match transport.send(self.settings.primary, &mail).await {
            Ok(()) => {
                info!(transport = ?self.settings.primary, recipients = recipients.len(), "Briefing sent");
                return DeliveryResult::sent(TransportUsed::Primary);
            }
            Err(e) => {
                warn!(
                    transport = ?self.settings.primary,
                    error = %e,
                    "Primary transport failed, retrying with fallback"
                );
            }
        }

        tokio::time::sleep(self.settings.retry_delay).await;

        match transport.send(self.settings.fallback, &mail).await {
            Ok(()) => {
                info!(transport = ?self.settings.fallback, recipients = recipients.len(), "Briefing sent");
                DeliveryResult::sent(TransportUsed::Fallback)
            }
            Err(e) => {
                warn!(transport = ?self.settings.fallback, error = %e, "Fallback transport failed");
                DeliveryResult::failed(Some(TransportUsed::Fallback), e.to_string())
            }
        }
    }
}
