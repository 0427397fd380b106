use serde::{Deserialize, Serialize};
use log::{debug, trace, error};
use std::time::Duration;

use crate::request::{CompletionRequest, Message};

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub system: String
  , pub max_tokens: u32
  , pub temperature: f32
}

impl From<&CompletionRequest> for MessagesRequest
{   fn from(req: &CompletionRequest) -> Self
    {   MessagesRequest
        {   model: req.model.clone()
          , messages: vec![
              ChatMessage
              {   role: "user".to_string()
                , content: req.user_message.clone()
              }
            ]
          , system: req.system_instruction.clone()
          , max_tokens: req.max_output_tokens
          , temperature: req.temperature
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody
{   pub error: ErrorDetail
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail
{   #[serde(rename = "type", default)]
    pub kind: String
  , pub message: String
}

/// Provider message from a non-2xx body, or the raw body text
pub fn error_message(body: &str) -> String
{   match serde_json::from_str::<ErrorBody>(body)
    {   Ok(parsed) => parsed.error.message
      , Err(_) if body.trim().is_empty() => "Unknown error".to_string()
      , Err(_) => body.to_string()
    }
}

// ===== Anthropic Client =====

/// HTTP client for the Messages endpoint.
/// Construction does no I/O; a bad key shows up on first use.
pub struct AnthropicClient
{   api_key: String
  , config: crate::config::ProviderConfig
  , http_client: reqwest::Client
}

impl std::fmt::Debug for AnthropicClient
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.debug_struct("AnthropicClient")
          .field("api_base", &self.config.api_base)
          .finish_non_exhaustive()
    }
}

impl AnthropicClient
{   pub fn new(
      api_key: String
    , config: crate::config::ProviderConfig
    ) -> Self
    {   debug!("Creating AnthropicClient for {}", config.api_base);
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build()
          .unwrap_or_else(|e| {
            error!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
          });
        AnthropicClient
        {   api_key
          , config
          , http_client
        }
    }

    pub async fn create_message(
      &self
    , req: &CompletionRequest
    ) -> Result<Message, crate::error::Error>
    {   debug!("Sending completion request for: {}", req.model);

        let body = MessagesRequest::from(req);
        trace!("Anthropic request: {:?}", body);

        let response = self.http_client
          .post(format!("{}/messages", self.config.api_base))
          .header("x-api-key", &self.api_key)
          .header("anthropic-version", &self.config.api_version)
          .header("content-type", "application/json")
          .json(&body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            crate::error::Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Anthropic response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_default();
            let message = error_message(&error_text);
            error!("Anthropic API error {}: {}", status, message);
            return Err(crate::error::Error::ApiError
            {   status: status.as_u16()
              , message
            });
        }

        response.json::<Message>().await.map_err(|e| {
          error!("Parse error: {}", e);
          crate::error::Error::ParseError(e.to_string())
        })
    }
}
