//! Completion client seam and the factory that builds it from a credential

use std::sync::Arc;
use async_trait::async_trait;
use log::debug;

use crate::request::{CompletionRequest, Message};

/// Anything that can turn a request into a completion message
#[async_trait]
pub trait CompletionClient: Send + Sync
{   async fn complete(
      &self
    , req: &CompletionRequest
    ) -> Result<Message, crate::error::Error>;
}

#[async_trait]
impl CompletionClient for crate::providers::AnthropicClient
{   async fn complete(
      &self
    , req: &CompletionRequest
    ) -> Result<Message, crate::error::Error>
    {   self.create_message(req).await
    }
}

/// A built client plus the identity token that goes into request keys
#[derive(Clone)]
pub struct ClientHandle
{   identity: String
  , client: Arc<dyn CompletionClient>
}

impl ClientHandle
{   pub fn new(
      identity: impl Into<String>
    , client: Arc<dyn CompletionClient>
    ) -> Self
    {   ClientHandle
        {   identity: identity.into()
          , client
        }
    }

    pub fn identity(&self) -> &str
    {   &self.identity
    }

    pub fn client(&self) -> Arc<dyn CompletionClient>
    {   Arc::clone(&self.client)
    }
}

impl std::fmt::Debug for ClientHandle
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str("ClientHandle(..)")
    }
}

/// Builds a client from a credential; `None` for an empty credential.
/// Building performs no I/O and cannot fail.
pub trait ClientFactory
{   fn build(&self, credential: &str) -> Option<ClientHandle>;
}

/// Factory for the hosted Anthropic endpoint
#[derive(Debug, Clone, Default)]
pub struct AnthropicFactory
{   config: crate::config::ProviderConfig
}

impl AnthropicFactory
{   pub fn new(config: crate::config::ProviderConfig) -> Self
    {   AnthropicFactory { config }
    }
}

impl ClientFactory for AnthropicFactory
{   fn build(&self, credential: &str) -> Option<ClientHandle>
    {   if credential.is_empty()
        {   debug!("No credential, no client");
            return None;
        }
        let client = crate::providers::AnthropicClient::new(
          credential.to_string(),
          self.config.clone()
        );
        Some(ClientHandle::new(credential, Arc::new(client)))
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn empty_credential_builds_nothing()
    {   let factory = AnthropicFactory::default();
        assert!(factory.build("").is_none());
    }

    #[test]
    fn handle_identity_tracks_credential()
    {   let factory = AnthropicFactory::default();
        let handle = factory.build("sk-test").unwrap();
        assert_eq!(handle.identity(), "sk-test");
        assert_eq!(format!("{:?}", handle), "ClientHandle(..)");
    }
}
