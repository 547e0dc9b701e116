use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

/// Fixed system instruction prepended to every prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    // None serializes as null; the API falls back to its own default model.
    model: Option<String>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

pub struct LlmClient {
    client: reqwest::Client,
    config: Config,
}

impl LlmClient {
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// One completion round-trip: the fixed system instruction plus
    /// `prompt`, one POST, joined answer text. The answer may be empty
    /// when the API returns no choices.
    pub async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model_id.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        };

        let url = self.config.completion_url();

        debug!("Sending completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion API error ({}): {}", status, error_body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        debug!("Completion response: {:?}", chat_response);

        Ok(join_choices(&chat_response.choices))
    }
}

/// Assistant content is relayed verbatim; any other role is prefixed so it
/// stays attributable in the reply.
fn join_choices(choices: &[Choice]) -> String {
    choices
        .iter()
        .map(|choice| {
            let message = &choice.message;
            if message.role == "assistant" {
                message.content.clone()
            } else {
                format!("{}: {}", message.role, message.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(role: &str, content: &str) -> Choice {
        Choice {
            message: ChatMessage {
                role: role.to_string(),
                content: content.to_string(),
            },
        }
    }

    fn config_for(api_base: &str) -> Config {
        Config {
            model_id: Some("test-model".to_string()),
            bot_token: "123:abc".to_string(),
            api_key: "sk-test".to_string(),
            api_base: api_base.to_string(),
        }
    }

    #[test]
    fn test_assistant_choice_relayed_verbatim() {
        assert_eq!(join_choices(&[choice("assistant", "hi")]), "hi");
    }

    #[test]
    fn test_other_roles_are_prefixed() {
        assert_eq!(join_choices(&[choice("system", "note")]), "system: note");
    }

    #[test]
    fn test_choices_join_with_newlines_in_order() {
        let joined = join_choices(&[
            choice("assistant", "first"),
            choice("system", "second"),
            choice("assistant", "third"),
        ]);
        assert_eq!(joined, "first\nsystem: second\nthird");
    }

    #[test]
    fn test_empty_choices_yield_empty_answer() {
        assert_eq!(join_choices(&[]), "");
    }

    #[test]
    fn test_absent_model_serializes_as_null() {
        let request = ChatRequest {
            model: None,
            messages: vec![],
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body["model"].is_null());
    }

    #[tokio::test]
    async fn test_invoke_posts_once_with_system_then_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "model": "test-model",
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": "ping" },
                ],
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let llm = LlmClient::new(config_for(&server.url()));
        let answer = llm.invoke("ping").await.unwrap();

        assert_eq!(answer, "hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invoke_returns_empty_string_for_no_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let llm = LlmClient::new(config_for(&server.url()));
        let answer = llm.invoke("ping").await.unwrap();

        assert_eq!(answer, "");
    }

    #[tokio::test]
    async fn test_api_error_carries_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let llm = LlmClient::new(config_for(&server.url()));
        let err = llm.invoke("ping").await.unwrap_err();

        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_body_without_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"unexpected": true}"#)
            .create_async()
            .await;

        let llm = LlmClient::new(config_for(&server.url()));
        let err = llm.invoke("ping").await.unwrap_err();

        assert!(err.to_string().contains("parse"));
    }
}
