use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use briefing_common::ModelPath;

use crate::traits::TextGenerator;

/// A successful generation and the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub text: String,
    pub model: String,
    pub path: ModelPath,
}

/// Both the primary and (if configured) the fallback model failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("generation failed: primary: {primary_error}{}", fallback_suffix(.fallback_error))]
pub struct GenerationFailure {
    pub primary_error: String,
    /// `None` when no fallback model was configured.
    pub fallback_error: Option<String>,
}

fn fallback_suffix(fallback_error: &Option<String>) -> String {
    match fallback_error {
        Some(e) => format!("; fallback: {e}"),
        None => String::new(),
    }
}

/// Primary-then-fallback generation with a cooperative pre-call throttle.
pub struct GenerationClient {
    generator: Arc<dyn TextGenerator>,
    throttle: Duration,
}

impl GenerationClient {
    pub fn new(generator: Arc<dyn TextGenerator>, throttle: Duration) -> Self {
        Self {
            generator,
            throttle,
        }
    }

    /// Try `primary`, then `fallback` once. Never panics or propagates; a
    /// double failure comes back as `GenerationFailure`.
    pub async fn generate(
        &self,
        instruction: &str,
        primary: &str,
        fallback: Option<&str>,
    ) -> Result<GenerationOutcome, GenerationFailure> {
        let primary_error = match self.attempt(instruction, primary).await {
            Ok(text) => {
                return Ok(GenerationOutcome {
                    text,
                    model: primary.to_string(),
                    path: ModelPath::Primary,
                })
            }
            Err(e) => e,
        };
        warn!(model = %primary, error = %primary_error, "Primary model failed");

        let Some(fallback) = fallback else {
            return Err(GenerationFailure {
                primary_error,
                fallback_error: None,
            });
        };

        info!(model = %fallback, "Retrying with fallback model");
        match self.attempt(instruction, fallback).await {
            Ok(text) => Ok(GenerationOutcome {
                text,
                model: fallback.to_string(),
                path: ModelPath::Fallback,
            }),
            Err(fallback_error) => {
                warn!(model = %fallback, error = %fallback_error, "Fallback model failed");
                Err(GenerationFailure {
                    primary_error,
                    fallback_error: Some(fallback_error),
                })
            }
        }
    }

    async fn attempt(&self, instruction: &str, model: &str) -> Result<String, String> {
        if !self.throttle.is_zero() {
            tokio::time::sleep(self.throttle).await;
        }

        let started = std::time::Instant::now();
        let text = self
            .generator
            .generate(model, instruction)
            .await
            .map_err(|e| e.to_string())?;

        if text.trim().is_empty() {
            return Err("provider returned empty text".to_string());
        }

        info!(
            model = %model,
            chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let mock = Arc::new(MockGenerator::new().on_model("primary", "report"));
        let client = GenerationClient::new(mock.clone(), Duration::ZERO);

        let outcome = client.generate("prompt", "primary", Some("backup")).await.unwrap();
        assert_eq!(outcome.text, "report");
        assert_eq!(outcome.path, ModelPath::Primary);
        assert_eq!(mock.models_called(), vec!["primary"]);
    }

    #[tokio::test]
    async fn falls_back_once_when_primary_raises() {
        let mock = Arc::new(
            MockGenerator::new()
                .failing_model("primary")
                .on_model("backup", "OK"),
        );
        let client = GenerationClient::new(mock.clone(), Duration::ZERO);

        let outcome = client.generate("prompt", "primary", Some("backup")).await.unwrap();
        assert_eq!(outcome.text, "OK");
        assert_eq!(outcome.model, "backup");
        assert_eq!(outcome.path, ModelPath::Fallback);
        assert_eq!(mock.models_called(), vec!["primary", "backup"]);
    }

    #[tokio::test]
    async fn empty_text_counts_as_failure() {
        let mock = Arc::new(MockGenerator::new().on_model("primary", "  \n"));
        let client = GenerationClient::new(mock, Duration::ZERO);

        let failure = client.generate("prompt", "primary", None).await.unwrap_err();
        assert!(failure.primary_error.contains("empty"));
        assert_eq!(failure.fallback_error, None);
    }

    #[tokio::test]
    async fn double_failure_is_typed() {
        let mock = Arc::new(
            MockGenerator::new()
                .failing_model("primary")
                .failing_model("backup"),
        );
        let client = GenerationClient::new(mock, Duration::ZERO);

        let failure = client.generate("prompt", "primary", Some("backup")).await.unwrap_err();
        assert!(failure.fallback_error.is_some());
        assert!(failure.to_string().starts_with("generation failed: primary:"));
        assert!(failure.to_string().contains("; fallback:"));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_precedes_every_call() {
        let mock = Arc::new(
            MockGenerator::new()
                .failing_model("primary")
                .on_model("backup", "OK"),
        );
        let client = GenerationClient::new(mock.clone(), Duration::from_secs(3));

        let start = tokio::time::Instant::now();
        client.generate("prompt", "primary", Some("backup")).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(6));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn instruction_is_passed_through_unchanged() {
        let mock = Arc::new(MockGenerator::new().on_model("m", "x"));
        let client = GenerationClient::new(mock.clone(), Duration::ZERO);
        client.generate("原始指令\n", "m", None).await.unwrap();
        assert_eq!(mock.prompts(), vec!["原始指令\n"]);
    }
}
