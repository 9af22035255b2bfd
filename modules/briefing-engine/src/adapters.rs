// Production implementations of the trait seams.
//
// TavilyClient -> WebSearcher
// OpenAi       -> TextGenerator (Unconfigured when the provider is incomplete)
// SmtpMailer   -> MailTransport

use std::sync::Arc;
use std::time::Duration;

use ai_client::{Agent, OpenAi, PromptBuilder};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mail_client::{OutgoingMail, SmtpMailer, SmtpOptions, TransportMode};
use tavily_client::{SearchParams, TavilyClient};

use briefing_common::{AppConfig, GenerationProvider, ProviderKind};

use crate::traits::{MailTransport, RawHit, SearchQuery, TextGenerator, WebSearcher};

/// Low variance; the report should read the same given the same material.
const GENERATION_TEMPERATURE: f32 = 0.1;
const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
impl WebSearcher for TavilyClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawHit>> {
        let params = SearchParams::new(query.text.as_str())
            .days(query.window_days)
            .max_results(query.max_results)
            .include_domains(query.include_domains.clone());

        let response = TavilyClient::search(self, &params).await?;
        Ok(response
            .results
            .into_iter()
            .map(|r| RawHit {
                content: r.content,
                url: r.url,
                published_date: r.published_date,
            })
            .collect())
    }
}

#[async_trait]
impl TextGenerator for OpenAi {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        self.clone()
            .with_model(model)
            .prompt(prompt)
            .temperature(GENERATION_TEMPERATURE)
            .send()
            .await
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mode: TransportMode, mail: &OutgoingMail) -> Result<()> {
        SmtpMailer::send(self, mode, mail).await?;
        Ok(())
    }
}

/// Stands in for a provider missing required settings. Every call fails.
pub struct Unconfigured {
    reason: String,
}

#[async_trait]
impl TextGenerator for Unconfigured {
    async fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
        Err(anyhow!("generation provider not configured: {}", self.reason))
    }
}

/// Generator for the configured provider.
pub fn build_generator(provider: &GenerationProvider) -> Arc<dyn TextGenerator> {
    match provider.unusable_reason() {
        Some(reason) => Arc::new(Unconfigured { reason }),
        None => Arc::new(chat_agent(provider)),
    }
}

fn chat_agent(provider: &GenerationProvider) -> OpenAi {
    let agent = match (provider.kind, provider.base_url.as_deref()) {
        (ProviderKind::Custom, Some(url)) => {
            OpenAi::new(provider.api_key.as_str(), provider.model.as_str()).with_base_url(url)
        }
        _ => OpenAi::gemini(provider.api_key.as_str(), provider.model.as_str()),
    };
    agent.with_timeout(GENERATION_TIMEOUT)
}

/// SMTP mailer, or `None` when the sender or password is missing.
pub fn build_mailer(config: &AppConfig, timeout: Duration) -> Option<SmtpMailer> {
    let sender = config.email_sender.as_ref()?;
    let password = config.email_password.as_ref()?;
    Some(SmtpMailer::new(SmtpOptions {
        host: config.smtp_server.clone(),
        username: sender.clone(),
        password: password.clone(),
        timeout,
    }))
}
