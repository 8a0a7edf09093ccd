use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const CHATBOT_PATH: &str = "/chatbot";

#[derive(Debug, Error)]
pub enum ChatbotError {
    #[error("chatbot request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("chatbot returned {status}")]
    Status { status: StatusCode },
    #[error("chatbot response is not valid JSON: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct ChatbotRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatbotResponse {
    #[serde(default)]
    pub reply: Option<String>,
}

pub fn build_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CHATBOT_PATH)
}

/// Posts one user message. `Ok` carries the parsed body even when it has no
/// `reply`; callers decide what to show for that.
pub async fn send_message(
    client: &reqwest::Client,
    base_url: &str,
    message: &str,
) -> Result<ChatbotResponse, ChatbotError> {
    let endpoint = build_endpoint(base_url);
    debug!(%endpoint, len = message.len(), "posting chat message");

    let resp = client
        .post(&endpoint)
        .header(CONTENT_TYPE, "application/json")
        .json(&ChatbotRequest { message })
        .send()
        .await
        .map_err(ChatbotError::Transport)?;

    if !resp.status().is_success() {
        return Err(ChatbotError::Status { status: resp.status() });
    }

    resp.json::<ChatbotResponse>().await.map_err(ChatbotError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_endpoint_trims_slash() {
        assert_eq!(build_endpoint("http://localhost:5000/"), "http://localhost:5000/chatbot");
        assert_eq!(build_endpoint("http://localhost:5000"), "http://localhost:5000/chatbot");
    }
}
