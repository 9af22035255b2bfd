// Trait seams for the three external collaborators.
//
// WebSearcher: search provider (Tavily in production)
// TextGenerator: OpenAI-compatible chat completion (Gemini or custom endpoint)
// MailTransport: SMTP, addressed by transport mode
//
// Production impls live in `adapters`; `testing` has in-memory mocks.

use anyhow::Result;
use async_trait::async_trait;
use mail_client::{OutgoingMail, TransportMode};

/// One query against the search provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// Recency window the provider is asked to enforce.
    pub window_days: u32,
    pub max_results: u32,
    /// Empty = no domain restriction.
    pub include_domains: Vec<String>,
}

/// A provider hit before normalization. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHit {
    pub content: Option<String>,
    pub url: Option<String>,
    pub published_date: Option<String>,
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawHit>>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate one text blob for `prompt` with the given model.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mode: TransportMode, mail: &OutgoingMail) -> Result<()>;
}
