use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::message::Content;
use crate::InferenceEndpoint;

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
}

/// HTTP client for the `POST {base_url}/chat` inference endpoint
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    pub async fn query(&self, prompt: &str) -> Result<Content, ChatError> {
        let url = self.endpoint_url();
        debug!(%url, prompt_chars = prompt.chars().count(), "chat request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&ChatRequest { prompt })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "chat request rejected");
            return Err(ChatError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_reply(&body)
    }
}

#[async_trait]
impl InferenceEndpoint for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<Content, ChatError> {
        self.query(prompt).await
    }
}

/// Pull the `response` field out of a reply body
fn parse_reply(body: &str) -> Result<Content, ChatError> {
    let mut value: Value =
        serde_json::from_str(body).map_err(|e| ChatError::InvalidBody(e.to_string()))?;

    let reply = value
        .get_mut("response")
        .map(Value::take)
        .ok_or(ChatError::MissingResponse)?;

    Ok(Content::from_json(reply))
}
