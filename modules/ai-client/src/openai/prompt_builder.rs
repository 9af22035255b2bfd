use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::traits::PromptBuilder;

use super::types::*;
use super::OpenAi;

pub struct OpenAiPromptBuilder {
    agent: OpenAi,
    input: String,
    temperature: Option<f32>,
}

impl OpenAiPromptBuilder {
    pub(crate) fn new(agent: OpenAi, input: String) -> Self {
        Self {
            agent,
            input,
            temperature: None,
        }
    }

    pub(crate) fn request(&self) -> ChatRequest {
        let request =
            ChatRequest::new(&self.agent.model).messages(vec![WireMessage::user(&self.input)]);
        match self.temperature {
            Some(temp) => request.temperature(temp),
            None => request,
        }
    }
}

#[async_trait]
impl PromptBuilder for OpenAiPromptBuilder {
    fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    async fn send(self) -> Result<String> {
        let client = self.agent.client()?;
        let response = client.chat(&self.request()).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No choices in response"))?
            .message
            .content
            .unwrap_or_default();

        debug!(model = %self.agent.model, chars = content.len(), "Chat completion received");

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Agent;

    #[test]
    fn request_is_one_user_message() {
        let request = OpenAi::new("sk-test", "m")
            .prompt("write the report")
            .temperature(0.1)
            .request();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "m");
        assert_eq!(
            body["messages"],
            serde_json::json!([{ "role": "user", "content": "write the report" }])
        );
        let temperature = body["temperature"].as_f64().unwrap();
        assert!((temperature - 0.1).abs() < 1e-6);
    }

    #[test]
    fn temperature_is_omitted_when_unset() {
        let request = OpenAi::new("sk-test", "m").prompt("hi").request();
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("temperature").is_none());
    }
}
