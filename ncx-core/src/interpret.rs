// ncx-core/src/interpret.rs

//! Client for the reasoning backend that explains a transcript.
//!
//! The backend is any OpenAI-compatible chat completion endpoint. One request
//! is made per run; failures are returned to the caller, which reports them
//! without affecting the proxied exit code.

use crate::config::{API_KEY_ENV_VAR, BackendConfig};
use crate::errors::InterpretError;
use crate::models::chat::{ApiResponse, ChatMessage, ChatRequest};
use crate::transcript::Transcript;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

pub const SYSTEM_PROMPT: &str = "You are a senior network analyst. Given raw netcat (nc) output, provide a concise,
useful explanation for a technical user. Focus on:
- What the output implies (e.g., service banners, protocol hints, open/closed behavior).
- Likely service and version (with uncertainty clearly stated).
- Common next steps to validate (safe/legit methods; no illegal activity).
- If output is empty or ambiguous, explain likely reasons (e.g., -z scans, filtered ports, TLS needed).
Keep it practical and brief unless details are significant.";

const CLOSING_REQUEST: &str = "Please explain what this likely means, including probable service/protocol inferences,
and recommended next steps to validate safely.";

const TEMPERATURE: f64 = 0.2;

/// Turns a transcript into a natural-language explanation.
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn explain(&self, transcript: &Transcript) -> Result<String>;

    /// Shown in the banner above the explanation.
    fn name(&self) -> &str;
}

pub struct OpenAiInterpreter {
    http_client: Client,
    config: BackendConfig,
}

impl OpenAiInterpreter {
    pub fn new(config: BackendConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http_client: Client, config: BackendConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn build_request(&self, transcript: &Transcript) -> ChatRequest {
        ChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!("{}\n\n{}", transcript, CLOSING_REQUEST)),
            ],
            temperature: TEMPERATURE,
        }
    }
}

#[async_trait]
impl Interpreter for OpenAiInterpreter {
    async fn explain(&self, transcript: &Transcript) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| InterpretError::MissingApiKey(API_KEY_ENV_VAR.to_string()))?;

        let endpoint = self.config.endpoint()?;
        let request = self.build_request(transcript);
        debug!(
            "Request URL: {}\nRequest JSON: {}",
            endpoint,
            serde_json::to_string_pretty(&request)?
        );

        let response = self
            .http_client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(InterpretError::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(InterpretError::Http)?;
        if !status.is_success() {
            debug!("API request failed. Status: {}, Body: {}", status, body);
            return Err(InterpretError::Status { status, body }.into());
        }

        let parsed: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| InterpretError::MalformedResponse(format!("{}: {}", e, body)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                InterpretError::MalformedResponse("response contained no message content".to_string())
            })?;

        info!(
            response_id = parsed.id.as_deref().unwrap_or("<none>"),
            chars = content.len(),
            "Received explanation"
        );
        Ok(content)
    }

    fn name(&self) -> &str {
        &self.config.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::CapturedRun;
    use httpmock::prelude::*;
    use serde_json::json;

    const TEST_ENDPOINT_PATH: &str = "/v1/chat/completions";

    fn test_config(base_url: &str, api_key: Option<&str>) -> BackendConfig {
        BackendConfig {
            api_key: api_key.map(str::to_string),
            model_name: "gpt-4o-mini".to_string(),
            base_url: format!("{}/v1", base_url),
        }
    }

    fn sample_transcript() -> Transcript {
        let run = CapturedRun {
            exit_code: 0,
            stdout: b"SSH-2.0-OpenSSH_9.6\r\n".to_vec(),
            stderr: Vec::new(),
        };
        Transcript::assemble("/usr/bin/nc example.com 22".to_string(), &run)
    }

    #[test]
    fn test_build_request_renders_transcript() {
        let interpreter = OpenAiInterpreter::new(test_config("http://localhost", Some("k")));
        let request = interpreter.build_request(&sample_transcript());

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[0].content.as_deref(), Some(SYSTEM_PROMPT));
        let user = request.messages[1].content.as_deref().unwrap();
        assert!(user.contains("/usr/bin/nc example.com 22"));
        assert!(user.contains("SSH-2.0-OpenSSH_9.6"));
        assert!(user.contains("stderr:\n```\n(empty)\n```"));
        assert!(user.ends_with(CLOSING_REQUEST));
    }

    #[tokio::test]
    async fn test_explain_success() -> Result<()> {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(TEST_ENDPOINT_PATH)
                    .header("Authorization", "Bearer sk-test")
                    .json_body_partial(r#"{"model": "gpt-4o-mini", "temperature": 0.2}"#);
                then.status(200).json_body(json!({
                    "id": "chatcmpl-1",
                    "choices": [{
                        "index": 0,
                        "message": { "role": "assistant", "content": "An OpenSSH server is listening." },
                        "finish_reason": "stop"
                    }]
                }));
            })
            .await;

        let interpreter = OpenAiInterpreter::new(test_config(&server.base_url(), Some("sk-test")));
        let explanation = interpreter.explain(&sample_transcript()).await?;

        api_mock.assert_hits(1);
        assert_eq!(explanation, "An OpenSSH server is listening.");
        assert_eq!(interpreter.name(), "gpt-4o-mini");
        Ok(())
    }

    #[tokio::test]
    async fn test_explain_reports_http_status() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST).path(TEST_ENDPOINT_PATH);
                then.status(500).body("upstream exploded");
            })
            .await;

        let interpreter = OpenAiInterpreter::new(test_config(&server.base_url(), Some("sk-test")));
        let err = interpreter.explain(&sample_transcript()).await.unwrap_err();

        // No retries.
        api_mock.assert_hits(1);
        match err.downcast_ref::<InterpretError>() {
            Some(InterpretError::Status { status, body }) => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_explain_rejects_empty_choices() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(TEST_ENDPOINT_PATH);
                then.status(200).json_body(json!({ "id": "x", "choices": [] }));
            })
            .await;

        let interpreter = OpenAiInterpreter::new(test_config(&server.base_url(), Some("sk-test")));
        let err = interpreter.explain(&sample_transcript()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InterpretError>(),
            Some(InterpretError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_explain_with_invalid_base_url() {
        let mut config = test_config("http://localhost", Some("sk-test"));
        config.base_url = "not a url".to_string();
        let interpreter = OpenAiInterpreter::new(config);
        let err = interpreter.explain(&sample_transcript()).await.unwrap_err();
        assert!(err.to_string().contains("OPENAI_BASE_URL"), "got: {}", err);
    }

    #[tokio::test]
    async fn test_explain_without_api_key_makes_no_request() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST).path(TEST_ENDPOINT_PATH);
                then.status(200);
            })
            .await;

        let interpreter = OpenAiInterpreter::new(test_config(&server.base_url(), None));
        let err = interpreter.explain(&sample_transcript()).await.unwrap_err();

        api_mock.assert_hits(0);
        assert!(err.to_string().contains(API_KEY_ENV_VAR));
    }
}
