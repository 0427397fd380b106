//! Keyed request cache and fetch orchestration.
//!
//! Every distinct [`RequestKey`] is fetched at most once. Fetches run as
//! spawned tasks and report back over a channel; only the owner of the
//! [`Orchestrator`] ever mutates the cache, so results are applied in
//! completion order without locking. While the current key is pending the
//! last successful response stays visible, tagged stale.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use log::{debug, trace, info, warn};

use crate::client::ClientHandle;
use crate::form::Form;
use crate::request::{CompletionRequest, Message};

/// Composite identity of one submitted request
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RequestKey
{   identity: Option<String>
  , prompt: String
  , system: String
  , model: String
  , max_tokens: u32
  , temperature_bits: u32
  , nonce: u64
}

impl RequestKey
{   pub fn new(
      identity: Option<&str>
    , req: &CompletionRequest
    , nonce: u64
    ) -> Self
    {   RequestKey
        {   identity: identity.map(str::to_string)
          , prompt: req.user_message.clone()
          , system: req.system_instruction.clone()
          , model: req.model.clone()
          , max_tokens: req.max_output_tokens
          , temperature_bits: req.temperature.to_bits()
          , nonce
        }
    }

    /// Key for the committed state of `form` under `client`
    pub fn from_form(client: Option<&ClientHandle>, form: &Form) -> Self
    {   RequestKey::new(
          client.map(ClientHandle::identity),
          &form.committed_request(),
          form.nonce()
        )
    }

    pub fn request(&self) -> CompletionRequest
    {   CompletionRequest
        {   user_message: self.prompt.clone()
          , system_instruction: self.system.clone()
          , model: self.model.clone()
          , max_output_tokens: self.max_tokens
          , temperature: f32::from_bits(self.temperature_bits)
        }
    }

    /// Nothing to fetch: no client, or a required field is empty
    fn is_inert(&self) -> bool
    {   self.identity.is_none()
          || self.prompt.is_empty()
          || self.system.is_empty()
    }
}

impl std::fmt::Debug for RequestKey
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.debug_struct("RequestKey")
          .field("identity", &self.identity.as_ref().map(|_| "<redacted>"))
          .field("prompt", &self.prompt)
          .field("system", &self.system)
          .field("model", &self.model)
          .field("max_tokens", &self.max_tokens)
          .field("temperature", &f32::from_bits(self.temperature_bits))
          .field("nonce", &self.nonce)
          .finish()
    }
}

/// Cache slot for one key
#[derive(Debug, Clone, PartialEq)]
pub enum Slot
{   Pending
  , Success(Arc<Message>)
  , Error(crate::error::Error)
}

/// What `resolve` did for a key
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome
{   /// No client or missing field; nothing fetched or cached
    Inert
  , /// Counter still at its initial value; canned example served
    Placeholder
  , /// Terminal result already cached
    Cached
  , /// A fetch for this key is already in flight
    InFlight
  , /// A new network request was issued
    Fetching
}

/// Snapshot for the presentation layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct View
{   pub is_pending: bool
  , pub is_stale: bool
  , pub is_error: bool
  , pub data: Option<Arc<Message>>
  , pub error: Option<crate::error::Error>
}

type Completion = (RequestKey, Result<Message, crate::error::Error>);

pub struct Orchestrator
{   cache: HashMap<RequestKey, Slot>
  , current: Option<RequestKey>
  , current_inert: bool
  , last_success: Option<Arc<Message>>
  , example_on_first_load: bool
  , network_calls: usize
  , done_tx: mpsc::UnboundedSender<Completion>
  , done_rx: mpsc::UnboundedReceiver<Completion>
}

impl Orchestrator
{   pub fn new(example_on_first_load: bool) -> Self
    {   let (done_tx, done_rx) = mpsc::unbounded_channel();
        Orchestrator
        {   cache: HashMap::new()
          , current: None
          , current_inert: false
          , last_success: None
          , example_on_first_load
          , network_calls: 0
          , done_tx
          , done_rx
        }
    }

    /// Make `key` current and fetch it if nothing is cached for it.
    /// Must run inside a tokio runtime when a fetch is issued.
    pub fn resolve(
      &mut self
    , key: RequestKey
    , client: Option<&ClientHandle>
    ) -> Outcome
    {   self.current = Some(key.clone());
        self.current_inert = false;

        if self.example_on_first_load && key.nonce == 0
        {   debug!("First load, serving example response");
            let example = Arc::new(Message::example());
            self.last_success = Some(Arc::clone(&example));
            self.cache.insert(key, Slot::Success(example));
            return Outcome::Placeholder;
        }

        let client = match client
        {   Some(client) if !key.is_inert() => client
          , _ => {
              debug!("Nothing to fetch for {:?}", key);
              self.current_inert = true;
              return Outcome::Inert;
            }
        };

        match self.cache.get(&key)
        {   Some(Slot::Pending) => {
              trace!("Already in flight: {:?}", key);
              return Outcome::InFlight;
            }
          , Some(Slot::Success(msg)) => {
              trace!("Cache hit: {:?}", key);
              self.last_success = Some(Arc::clone(msg));
              return Outcome::Cached;
            }
          , Some(Slot::Error(_)) => {
              trace!("Cached error: {:?}", key);
              return Outcome::Cached;
            }
          , None => {}
        }

        info!("Fetching completion for {:?}", key);
        self.cache.insert(key.clone(), Slot::Pending);
        self.network_calls += 1;

        let req = key.request();
        let client = client.client();
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
          let result = client.complete(&req).await;
          if done_tx.send((key, result)).is_err()
          {   warn!("Orchestrator dropped before fetch completed");
          }
        });
        Outcome::Fetching
    }

    fn apply(&mut self, key: RequestKey, result: Result<Message, crate::error::Error>)
    {   let slot = match result
        {   Ok(msg) => {
              debug!("Fetch succeeded for {:?}", key);
              Slot::Success(Arc::new(msg))
            }
          , Err(e) => {
              warn!("Fetch failed for {:?}: {}", key, e);
              Slot::Error(e)
            }
        };
        if self.current.as_ref() == Some(&key)
        {   if let Slot::Success(msg) = &slot
            {   self.last_success = Some(Arc::clone(msg));
            }
        } else
        {   trace!("Superseded key completed: {:?}", key);
        }
        self.cache.insert(key, slot);
    }

    /// Apply every completion that has already arrived; returns how many
    pub fn drain(&mut self) -> usize
    {   let mut applied = 0;
        while let Ok((key, result)) = self.done_rx.try_recv()
        {   self.apply(key, result);
            applied += 1;
        }
        applied
    }

    /// Wait for the next completion and apply it.
    /// Returns false when nothing is in flight.
    pub async fn settle(&mut self) -> bool
    {   if self.in_flight() == 0
        {   return false;
        }
        match self.done_rx.recv().await
        {   Some((key, result)) => {
              self.apply(key, result);
              true
            }
          , None => false
        }
    }

    /// Wait until the current key is no longer pending
    pub async fn settle_current(&mut self)
    {   while self.current_slot() == Some(&Slot::Pending)
        {   if !self.settle().await
            {   break;
            }
        }
    }

    pub fn in_flight(&self) -> usize
    {   self.cache.values()
          .filter(|slot| matches!(slot, Slot::Pending))
          .count()
    }

    /// Network requests issued so far
    pub fn network_calls(&self) -> usize
    {   self.network_calls
    }

    pub fn slot(&self, key: &RequestKey) -> Option<&Slot>
    {   self.cache.get(key)
    }

    pub fn current(&self) -> Option<&RequestKey>
    {   self.current.as_ref()
    }

    fn current_slot(&self) -> Option<&Slot>
    {   self.current.as_ref().and_then(|k| self.cache.get(k))
    }

    /// State of the current key, with stale data while it is pending
    pub fn view(&self) -> View
    {   if self.current_inert
        {   return View::default();
        }
        match self.current_slot()
        {   Some(Slot::Pending) => View
            {   is_pending: true
              , is_stale: self.last_success.is_some()
              , data: self.last_success.clone()
              , ..View::default()
            }
          , Some(Slot::Success(msg)) => View
            {   data: Some(Arc::clone(msg))
              , ..View::default()
            }
          , Some(Slot::Error(e)) => View
            {   is_error: true
              , error: Some(e.clone())
              , ..View::default()
            }
          , None => View::default()
        }
    }
}
