use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::file_config::IdentityConfig;
use crate::lists::split_list;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_DELAY_SECS: f64 = 3.0;
const DEFAULT_SMTP_SERVER: &str = "smtp.qq.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Gemini through its OpenAI-compatible endpoint. Rate-limits aggressively.
    Gemini,
    /// Any OpenAI-compatible endpoint given by `CUSTOM_BASE_URL`.
    Custom,
}

/// Which text-generation endpoint to call and how.
#[derive(Debug, Clone)]
pub struct GenerationProvider {
    pub kind: ProviderKind,
    pub api_key: String,
    pub base_url: Option<String>,
    /// Empty when a custom provider was configured without `CUSTOM_MODEL`.
    pub model: String,
    pub fallback_model: Option<String>,
    /// Cooperative throttle slept before every call.
    pub request_delay: Duration,
}

impl GenerationProvider {
    /// Why this provider cannot be called, if it cannot. Surfaces as a
    /// generation failure rather than a startup error.
    pub fn unusable_reason(&self) -> Option<String> {
        if self.kind != ProviderKind::Custom {
            return None;
        }
        let mut missing = Vec::new();
        if self.base_url.is_none() {
            missing.push("CUSTOM_BASE_URL");
        }
        if self.model.is_empty() {
            missing.push("CUSTOM_MODEL");
        }
        (!missing.is_empty())
            .then(|| format!("{} required with CUSTOM_API_KEY", missing.join(" and ")))
    }
}

/// Application configuration loaded from environment variables.
/// Contains secrets and per-deployment overrides; report shape lives in
/// the TOML `FileConfig`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Search
    pub search_api_key: String,

    // Generation
    pub generation: GenerationProvider,

    // Tracked entities (empty = use the deployment defaults)
    pub target_companies: Vec<String>,
    pub target_industries: Vec<String>,

    // Mail
    pub email_sender: Option<String>,
    pub email_password: Option<String>,
    pub email_receivers: Option<String>,
    pub smtp_server: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let generation = match var("CUSTOM_API_KEY") {
            Some(api_key) => GenerationProvider {
                kind: ProviderKind::Custom,
                api_key,
                base_url: var("CUSTOM_BASE_URL"),
                model: var("CUSTOM_MODEL").unwrap_or_default(),
                fallback_model: var("CUSTOM_FALLBACK_MODEL"),
                request_delay: Duration::ZERO,
            },
            None => {
                let delay_secs = match var("GEMINI_REQUEST_DELAY") {
                    Some(raw) => raw
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| anyhow!("GEMINI_REQUEST_DELAY must be a number, got {raw}"))?,
                    None => DEFAULT_GEMINI_DELAY_SECS,
                };
                if !delay_secs.is_finite() || delay_secs < 0.0 {
                    return Err(anyhow!("GEMINI_REQUEST_DELAY must be non-negative"));
                }
                GenerationProvider {
                    kind: ProviderKind::Gemini,
                    api_key: var("GEMINI_API_KEY").unwrap_or_default(),
                    base_url: None,
                    model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                    fallback_model: var("GEMINI_FALLBACK_MODEL"),
                    request_delay: Duration::try_from_secs_f64(delay_secs)
                        .map_err(|e| anyhow!("GEMINI_REQUEST_DELAY out of range: {e}"))?,
                }
            }
        };

        Ok(Self {
            search_api_key: var("SEARCH_API_KEY").unwrap_or_default(),
            generation,
            target_companies: var("TARGET_COMPANIES")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            target_industries: var("TARGET_INDUSTRY")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            email_sender: var("EMAIL_SENDER"),
            email_password: var("EMAIL_PASSWORD"),
            email_receivers: var("EMAIL_RECEIVERS"),
            smtp_server: var("SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
        })
    }

    /// Configured companies, or the deployment's defaults.
    pub fn companies(&self, identity: &IdentityConfig) -> Vec<String> {
        if self.target_companies.is_empty() {
            identity.default_companies.clone()
        } else {
            self.target_companies.clone()
        }
    }

    /// Configured industries, or the deployment's defaults.
    pub fn industries(&self, identity: &IdentityConfig) -> Vec<String> {
        if self.target_industries.is_empty() {
            identity.default_industries.clone()
        } else {
            self.target_industries.clone()
        }
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            if val.is_empty() {
                return "<not set>".to_string();
            }
            let n = val.char_indices().nth(5).map(|(i, _)| i).unwrap_or(val.len());
            format!("{}...({} chars)", &val[..n], val.chars().count())
        }
        fn preview_opt(val: &Option<String>) -> String {
            preview(val.as_deref().unwrap_or_default())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  SEARCH_API_KEY: {}", preview(&self.search_api_key));
        tracing::info!(
            "  generation: {:?} model={} fallback={:?} delay={:?}",
            self.generation.kind,
            self.generation.model,
            self.generation.fallback_model,
            self.generation.request_delay
        );
        tracing::info!("  generation key: {}", preview(&self.generation.api_key));
        if let Some(reason) = self.generation.unusable_reason() {
            tracing::warn!("  generation provider incomplete: {reason}");
        }
        tracing::info!("  EMAIL_SENDER: {}", preview_opt(&self.email_sender));
        tracing::info!("  EMAIL_PASSWORD: {}", preview_opt(&self.email_password));
        tracing::info!("  SMTP_SERVER: {}", self.smtp_server);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_gemini_with_throttle() {
        let config = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "g-key")])).unwrap();
        assert_eq!(config.generation.kind, ProviderKind::Gemini);
        assert_eq!(config.generation.model, "gemini-2.5-flash");
        assert_eq!(config.generation.request_delay, Duration::from_secs(3));
        assert_eq!(config.smtp_server, "smtp.qq.com");
        assert!(config.target_companies.is_empty());
    }

    #[test]
    fn custom_provider_wins_and_skips_throttle() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "g-key"),
            ("CUSTOM_API_KEY", "c-key"),
            ("CUSTOM_BASE_URL", "https://llm.example.com/v1"),
            ("CUSTOM_MODEL", "deepseek-chat"),
            ("CUSTOM_FALLBACK_MODEL", "deepseek-reasoner"),
        ]))
        .unwrap();
        assert_eq!(config.generation.kind, ProviderKind::Custom);
        assert_eq!(config.generation.api_key, "c-key");
        assert_eq!(config.generation.fallback_model.as_deref(), Some("deepseek-reasoner"));
        assert_eq!(config.generation.request_delay, Duration::ZERO);
    }

    #[test]
    fn incomplete_custom_provider_loads_but_is_unusable() {
        let config = AppConfig::from_lookup(lookup(&[("CUSTOM_API_KEY", "c-key")])).unwrap();
        assert_eq!(config.generation.kind, ProviderKind::Custom);
        assert_eq!(
            config.generation.unusable_reason().as_deref(),
            Some("CUSTOM_BASE_URL and CUSTOM_MODEL required with CUSTOM_API_KEY")
        );

        let config = AppConfig::from_lookup(lookup(&[
            ("CUSTOM_API_KEY", "c-key"),
            ("CUSTOM_BASE_URL", "https://llm.example.com/v1"),
        ]))
        .unwrap();
        assert_eq!(
            config.generation.unusable_reason().as_deref(),
            Some("CUSTOM_MODEL required with CUSTOM_API_KEY")
        );
    }

    #[test]
    fn complete_providers_are_usable() {
        let gemini = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert!(gemini.generation.unusable_reason().is_none());

        let custom = AppConfig::from_lookup(lookup(&[
            ("CUSTOM_API_KEY", "c-key"),
            ("CUSTOM_BASE_URL", "https://llm.example.com/v1"),
            ("CUSTOM_MODEL", "deepseek-chat"),
        ]))
        .unwrap();
        assert!(custom.generation.unusable_reason().is_none());
    }

    #[test]
    fn parses_lists_and_fractional_delay() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TARGET_COMPANIES", "威海广泰、迪尚集团"),
            ("TARGET_INDUSTRY", "工程承包，机器人"),
            ("GEMINI_REQUEST_DELAY", "1.5"),
        ]))
        .unwrap();
        assert_eq!(config.target_companies, vec!["威海广泰", "迪尚集团"]);
        assert_eq!(config.target_industries, vec!["工程承包", "机器人"]);
        assert_eq!(config.generation.request_delay, Duration::from_millis(1500));
    }

    #[test]
    fn rejects_bad_delay() {
        assert!(AppConfig::from_lookup(lookup(&[("GEMINI_REQUEST_DELAY", "soon")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("GEMINI_REQUEST_DELAY", "-1")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("GEMINI_REQUEST_DELAY", "1e30")])).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = AppConfig::from_lookup(lookup(&[("EMAIL_SENDER", "  "), ("CUSTOM_API_KEY", "")]))
            .unwrap();
        assert!(config.email_sender.is_none());
        assert_eq!(config.generation.kind, ProviderKind::Gemini);
    }
}
