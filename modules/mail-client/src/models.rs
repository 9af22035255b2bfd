use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::Message;

use crate::error::{MailError, Result};

/// A fully rendered email ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from_name: String,
    pub from_address: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingMail {
    /// Multipart message with a single `text/html; charset=utf-8` part.
    /// All recipients share one `To` header.
    pub fn build_message(&self) -> Result<Message> {
        if self.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let from = Mailbox::new(Some(self.from_name.clone()), self.from_address.parse()?);
        let mut builder = Message::builder().from(from).subject(self.subject.clone());
        for recipient in &self.to {
            builder = builder.to(Mailbox::new(None, recipient.parse()?));
        }

        let body = MultiPart::mixed().singlepart(SinglePart::html(self.html_body.clone()));
        Ok(builder.multipart(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: Vec<&str>) -> OutgoingMail {
        OutgoingMail {
            from_name: "Weihai Business Briefing".to_string(),
            from_address: "sender@example.com".to_string(),
            to: to.into_iter().map(String::from).collect(),
            subject: "Weekly briefing 2026-10-19".to_string(),
            html_body: "<html><body><h1>Report</h1></body></html>".to_string(),
        }
    }

    #[test]
    fn builds_html_message_with_all_recipients() {
        let message = mail(vec!["a@x.com", "b@x.com"]).build_message().unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Weekly briefing 2026-10-19"));
        assert!(raw.contains("Weihai Business Briefing"));
        assert!(raw.contains("sender@example.com"));
        assert!(raw.contains("a@x.com"));
        assert!(raw.contains("b@x.com"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("<h1>Report</h1>"));

        let to_lines = raw.lines().filter(|l| l.starts_with("To:")).count();
        assert_eq!(to_lines, 1);
    }

    #[test]
    fn envelope_lists_every_recipient() {
        let message = mail(vec!["a@x.com", "b@x.com", "c@x.com"]).build_message().unwrap();
        assert_eq!(message.envelope().to().len(), 3);
    }

    #[test]
    fn rejects_empty_recipient_list() {
        assert!(matches!(mail(vec![]).build_message(), Err(MailError::NoRecipients)));
    }

    #[test]
    fn rejects_malformed_address() {
        assert!(matches!(
            mail(vec!["not-an-address"]).build_message(),
            Err(MailError::Address(_))
        ));
    }
}
