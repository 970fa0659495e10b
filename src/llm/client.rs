use crate::config::Config;
use crate::util::truncate;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// OpenRouter direct API URL (BYOK mode)
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model used for generation and correction.
const MODEL_ID: &str = "openai/gpt-4o";

const MAX_TOKENS: u32 = 4096;

/// Attempt budget for one completion request.
const MAX_ATTEMPTS: u32 = 3;

/// Check if the model service is reachable in principle (a key is configured).
pub fn is_available() -> bool {
    Config::load().get_api_key().is_some()
}

/// How a completion request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A usable completion came back.
    None,
    /// The key was rejected (401/403). Never retried.
    Auth,
    /// Transport-level failure that survived the whole attempt budget.
    Transient,
    /// The service answered 2xx but the completion had no usable content.
    MalformedOutput,
}

impl FailureKind {
    pub fn is_failure(&self) -> bool {
        !matches!(self, FailureKind::None)
    }
}

/// One request/response pair against the model service.
///
/// On success `raw_response` holds the model's reply text; on failure it
/// holds the raw diagnostic text for the debug pane (empty for a malformed
/// completion, which has nothing to show).
#[derive(Debug, Clone)]
pub struct ModelExchange {
    pub prompt_sent: String,
    pub raw_response: String,
    pub attempt: u32,
    pub failure: FailureKind,
}

impl ModelExchange {
    /// User-facing message for a failed exchange.
    pub fn failure_message(&self) -> String {
        match self.failure {
            FailureKind::None => String::new(),
            FailureKind::Auth => {
                "Authentication failed: the API key is invalid or has expired.".to_string()
            }
            FailureKind::Transient => format!(
                "The model service could not be reached after {} attempts: {}",
                self.attempt,
                truncate(&self.raw_response, 200)
            ),
            FailureKind::MalformedOutput => {
                "The model returned an empty or malformed completion.".to_string()
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: String,
}

/// Sleep duration before retry `attempt + 1`: 1s after the first failure,
/// 2s after the second.
fn backoff_delay(attempt: u32) -> std::time::Duration {
    std::time::Duration::from_secs(1u64 << (attempt.saturating_sub(1).min(8)))
}

/// Key rejections are terminal: retrying a rejected key wastes the attempt
/// budget and delays feedback.
fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Pull the first choice's content out of a 2xx response body.
///
/// `Ok(None)` means the body parsed but carried no usable content, which the
/// caller classifies as a malformed completion rather than a transport error.
fn content_from_body(body: &str) -> Result<Option<String>, serde_json::Error> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default();
    if content.is_empty() {
        Ok(None)
    } else {
        Ok(Some(content))
    }
}

enum AttemptOutcome {
    Content(String),
    Empty,
    AuthRejected(String),
}

async fn send_once(
    client: &reqwest::Client,
    api_key: &str,
    request: &ChatRequest,
) -> anyhow::Result<AttemptOutcome> {
    let response = client
        .post(OPENROUTER_URL)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", api_key))
        .json(request)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if is_auth_status(status) {
        return Ok(AttemptOutcome::AuthRejected(format!(
            "API error {}: {}",
            status,
            truncate(&text, 200)
        )));
    }

    if !status.is_success() {
        anyhow::bail!("API error {}: {}", status, truncate(&text, 200));
    }

    match content_from_body(&text) {
        Ok(Some(content)) => Ok(AttemptOutcome::Content(content)),
        Ok(None) => Ok(AttemptOutcome::Empty),
        Err(e) => anyhow::bail!("Failed to parse model response: {}\n{}", e, truncate(&text, 200)),
    }
}

/// Request one completion, retrying transport failures up to the attempt
/// budget with a short linear-doubling backoff (1s, then 2s).
///
/// Never panics and never returns a Rust error: every outcome is classified
/// into the exchange's `failure` field so the caller can report it.
pub async fn complete(api_key: &str, system: &str, user: &str) -> ModelExchange {
    let request = ChatRequest {
        model: MODEL_ID.to_string(),
        messages: vec![
            Message {
                role: "system".to_string(),
                content: system.to_string(),
            },
            Message {
                role: "user".to_string(),
                content: user.to_string(),
            },
        ],
        max_tokens: MAX_TOKENS,
        stream: false,
    };

    let client = reqwest::Client::new();
    let mut attempt = 1u32;

    loop {
        match send_once(&client, api_key, &request).await {
            Ok(AttemptOutcome::Content(content)) => {
                return ModelExchange {
                    prompt_sent: user.to_string(),
                    raw_response: content,
                    attempt,
                    failure: FailureKind::None,
                };
            }
            Ok(AttemptOutcome::Empty) => {
                return ModelExchange {
                    prompt_sent: user.to_string(),
                    raw_response: String::new(),
                    attempt,
                    failure: FailureKind::MalformedOutput,
                };
            }
            Ok(AttemptOutcome::AuthRejected(text)) => {
                return ModelExchange {
                    prompt_sent: user.to_string(),
                    raw_response: text,
                    attempt,
                    failure: FailureKind::Auth,
                };
            }
            Err(_) if attempt < MAX_ATTEMPTS => {
                tokio::time::sleep(backoff_delay(attempt)).await;
                attempt += 1;
            }
            Err(err) => {
                return ModelExchange {
                    prompt_sent: user.to_string(),
                    raw_response: err.to_string(),
                    attempt,
                    failure: FailureKind::Transient,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_delay(1).as_secs(), 1);
        assert_eq!(backoff_delay(2).as_secs(), 2);
    }

    #[test]
    fn test_auth_statuses_are_terminal() {
        assert!(is_auth_status(StatusCode::UNAUTHORIZED));
        assert!(is_auth_status(StatusCode::FORBIDDEN));
        assert!(!is_auth_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_auth_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_content_from_well_formed_body() {
        let body = r#"{"choices":[{"message":{"content":"hello"}}]}"#;
        assert_eq!(content_from_body(body).unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn test_empty_choices_is_malformed_not_error() {
        let body = r#"{"choices":[]}"#;
        assert_eq!(content_from_body(body).unwrap(), None);
    }

    #[test]
    fn test_empty_content_is_malformed() {
        let body = r#"{"choices":[{"message":{"content":""}}]}"#;
        assert_eq!(content_from_body(body).unwrap(), None);
    }

    #[test]
    fn test_missing_content_field_is_malformed() {
        let body = r#"{"choices":[{"message":{}}]}"#;
        assert_eq!(content_from_body(body).unwrap(), None);
    }

    #[test]
    fn test_unparseable_body_is_error() {
        assert!(content_from_body("not json").is_err());
    }

    #[test]
    fn test_failure_message_for_malformed() {
        let exchange = ModelExchange {
            prompt_sent: "p".to_string(),
            raw_response: String::new(),
            attempt: 1,
            failure: FailureKind::MalformedOutput,
        };
        assert!(exchange.failure_message().contains("empty or malformed"));
    }
}
