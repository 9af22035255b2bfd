// Test mocks for the briefing pipeline.
//
// Three mocks matching the three trait boundaries:
// - MockSearcher (WebSearcher): query text to canned hits, optional failures
// - MockGenerator (TextGenerator): model name to canned text, records calls
// - MockTransport (MailTransport): records sent mail, fails on chosen ports
//
// Plus `default_config()` for the shipped deployment file.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use briefing_common::FileConfig;
use mail_client::{OutgoingMail, TransportMode};

use crate::traits::{MailTransport, RawHit, SearchQuery, TextGenerator, WebSearcher};

/// The shipped `config/briefing.toml`, parsed and validated.
pub fn default_config() -> FileConfig {
    FileConfig::from_toml_str(include_str!("../../../config/briefing.toml"))
        .expect("shipped config must be valid")
}

/// A hit with content and URL set.
pub fn hit(content: &str, url: &str) -> RawHit {
    RawHit {
        content: Some(content.to_string()),
        url: Some(url.to_string()),
        published_date: None,
    }
}

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

/// Query-text keyed search results. Unregistered queries get the default
/// (empty unless set with `with_default`).
pub struct MockSearcher {
    results: HashMap<String, Vec<RawHit>>,
    default: Vec<RawHit>,
    failing: HashSet<String>,
    queries: Mutex<Vec<SearchQuery>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            default: Vec::new(),
            failing: HashSet::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn on_query(mut self, text: &str, hits: Vec<RawHit>) -> Self {
        self.results.insert(text.to_string(), hits);
        self
    }

    pub fn with_default(mut self, hits: Vec<RawHit>) -> Self {
        self.default = hits;
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Every query received, in call order.
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawHit>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.failing.contains(&query.text) {
            bail!("MockSearcher: simulated failure for {}", query.text);
        }
        Ok(self
            .results
            .get(&query.text)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

/// Model-keyed generator. Unregistered models return `Err`.
pub struct MockGenerator {
    responses: HashMap<String, String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_model(mut self, model: &str, text: &str) -> Self {
        self.responses.insert(model.to_string(), text.to_string());
        self
    }

    pub fn failing_model(mut self, model: &str) -> Self {
        self.failing.insert(model.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        if self.failing.contains(model) {
            bail!("MockGenerator: simulated 429 for {model}");
        }
        self.responses
            .get(model)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockGenerator: no response registered for {model}"))
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Records every send attempt; fails attempts on registered ports.
pub struct MockTransport {
    failing_ports: HashSet<u16>,
    attempts: Mutex<Vec<TransportMode>>,
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            failing_ports: HashSet::new(),
            attempts: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_port(mut self, port: u16) -> Self {
        self.failing_ports.insert(port);
        self
    }

    /// Transport modes attempted, in order, successful or not.
    pub fn modes(&self) -> Vec<TransportMode> {
        self.attempts.lock().unwrap().clone()
    }

    /// Mail accepted by a transport.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, mode: TransportMode, mail: &OutgoingMail) -> Result<()> {
        self.attempts.lock().unwrap().push(mode);
        if self.failing_ports.contains(&mode.port()) {
            bail!("MockTransport: connection refused on port {}", mode.port());
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}
