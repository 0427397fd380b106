//! Form fields with separate draft and committed values

use std::str::FromStr;
use log::{debug, trace, warn};

use crate::store::FieldStore;
use crate::request::CompletionRequest;

/// A value that can live in the field store.
/// Stored text is JSON, matching what earlier sessions wrote.
pub trait FieldValue: Sized + Clone + PartialEq
{   fn encode(&self) -> String;
    fn decode(stored: &str) -> Option<Self>;
    /// Parse what the user typed
    fn parse_input(text: &str) -> Option<Self>;
}

impl FieldValue for String
{   fn encode(&self) -> String
    {   serde_json::Value::String(self.clone()).to_string()
    }

    fn decode(stored: &str) -> Option<Self>
    {   serde_json::from_str(stored).ok()
    }

    fn parse_input(text: &str) -> Option<Self>
    {   Some(text.to_string())
    }
}

impl FieldValue for u32
{   fn encode(&self) -> String
    {   self.to_string()
    }

    fn decode(stored: &str) -> Option<Self>
    {   serde_json::from_str(stored).ok()
    }

    fn parse_input(text: &str) -> Option<Self>
    {   text.trim().parse().ok()
    }
}

impl FieldValue for f32
{   fn encode(&self) -> String
    {   serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    fn decode(stored: &str) -> Option<Self>
    {   serde_json::from_str::<f32>(stored).ok()
          .filter(|v| v.is_finite())
    }

    fn parse_input(text: &str) -> Option<Self>
    {   text.trim().parse::<f32>().ok()
          .filter(|v| v.is_finite())
    }
}

/// The six persisted form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey
{   Credential
  , Prompt
  , SystemPrompt
  , Model
  , MaxTokens
  , Temperature
}

impl FieldKey
{   pub const ALL: [FieldKey; 6] = [
      FieldKey::Credential
    , FieldKey::Prompt
    , FieldKey::SystemPrompt
    , FieldKey::Model
    , FieldKey::MaxTokens
    , FieldKey::Temperature
    ];

    /// Fixed key in the field store
    pub fn storage_key(self) -> &'static str
    {   match self
        {   FieldKey::Credential => crate::TOKEN_KEY
          , FieldKey::Prompt => crate::PROMPT_KEY
          , FieldKey::SystemPrompt => crate::SYSTEM_PROMPT_KEY
          , FieldKey::Model => crate::MODEL_KEY
          , FieldKey::MaxTokens => crate::MAX_TOKENS_KEY
          , FieldKey::Temperature => crate::TEMPERATURE_KEY
        }
    }

    /// Short name used by the front end
    pub fn name(self) -> &'static str
    {   match self
        {   FieldKey::Credential => "token"
          , FieldKey::Prompt => "prompt"
          , FieldKey::SystemPrompt => "system"
          , FieldKey::Model => "model"
          , FieldKey::MaxTokens => "max-tokens"
          , FieldKey::Temperature => "temperature"
        }
    }
}

impl FromStr for FieldKey
{   type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   FieldKey::ALL.iter()
          .copied()
          .find(|k| k.name() == s)
          .ok_or_else(|| {
            crate::error::Error::Other(format!("Unknown field: {}", s))
          })
    }
}

/// Draft value plus the value as of the last submission
#[derive(Debug, Clone, PartialEq)]
pub struct Input<T>
{   key: &'static str
  , draft: T
  , committed: T
}

impl<T: FieldValue> Input<T>
{   /// Read the persisted draft (or `default`); committed starts equal to it
    pub fn load(
      store: &dyn FieldStore
    , key: &'static str
    , default: T
    ) -> Self
    {   let value = match store.get(key)
        {   Some(stored) => T::decode(&stored).unwrap_or_else(|| {
              warn!("Ignoring undecodable value stored under {}", key);
              default
            })
          , None => default
        };
        Input
        {   key
          , draft: value.clone()
          , committed: value
        }
    }

    pub fn draft(&self) -> &T
    {   &self.draft
    }

    pub fn committed(&self) -> &T
    {   &self.committed
    }

    /// Edit the draft and persist it; committed is left alone.
    /// A failed write keeps the edit in memory.
    pub fn set_draft(
      &mut self
    , store: &mut dyn FieldStore
    , value: T
    )
    {   trace!("Draft edit for {}", self.key);
        persist(store, self.key, value.encode());
        self.draft = value;
    }

    pub fn set_committed(&mut self, value: T)
    {   self.committed = value;
    }

    /// Copy draft into committed; true when the committed value changed
    pub fn commit(&mut self) -> bool
    {   if self.committed == self.draft
        {   return false;
        }
        debug!("Committing {}", self.key);
        self.committed = self.draft.clone();
        true
    }

    fn map_draft(mut self, f: impl Fn(T) -> T) -> Self
    {   self.draft = f(self.draft);
        self.committed = self.draft.clone();
        self
    }
}

fn persist(store: &mut dyn FieldStore, key: &str, encoded: String)
{   if let Err(e) = store.set(key, encoded)
    {   warn!("Keeping {} in memory only: {}", key, e);
    }
}

/// Clamp a stored temperature into the range the form accepts
pub fn clamp_temperature(t: f32) -> f32
{   t.clamp(crate::MIN_TEMPERATURE, crate::MAX_TEMPERATURE)
}

/// All form state: persisted credential, draft/committed inputs, submission counter
#[derive(Debug, Clone, PartialEq)]
pub struct Form
{   credential: String
  , pub prompt: Input<String>
  , pub system: Input<String>
  , pub model: Input<String>
  , pub max_tokens: Input<u32>
  , pub temperature: Input<f32>
  , nonce: u64
}

impl Form
{   /// Initialise every field from the store, falling back to defaults
    pub fn load(store: &dyn FieldStore) -> Self
    {   let credential = Input::load(store, crate::TOKEN_KEY, String::new());
        Form
        {   credential: credential.draft
          , prompt: Input::load(
              store, crate::PROMPT_KEY, crate::DEFAULT_PROMPT.to_string()
            )
          , system: Input::load(
              store,
              crate::SYSTEM_PROMPT_KEY,
              crate::DEFAULT_SYSTEM_PROMPT.to_string()
            )
          , model: Input::load(
              store, crate::MODEL_KEY, crate::DEFAULT_MODEL.to_string()
            )
          , max_tokens: Input::load(
              store, crate::MAX_TOKENS_KEY, crate::DEFAULT_MAX_TOKENS
            )
          , temperature: Input::load(
              store, crate::TEMPERATURE_KEY, crate::DEFAULT_TEMPERATURE
            ).map_draft(clamp_temperature)
          , nonce: 0
        }
    }

    pub fn credential(&self) -> &str
    {   &self.credential
    }

    /// Submission counter; 0 until the first submission
    pub fn nonce(&self) -> u64
    {   self.nonce
    }

    /// Apply a user edit given as text.
    /// A credential change also bumps the counter so the next key is fresh.
    /// Only unparsable numbers are rejected; storage failures are logged.
    pub fn edit(
      &mut self
    , store: &mut dyn FieldStore
    , field: FieldKey
    , text: &str
    ) -> Result<(), crate::error::Error>
    {   let invalid = || crate::error::Error::InvalidField
        {   field: field.name().to_string()
          , value: text.to_string()
        };
        match field
        {   FieldKey::Credential => {
              persist(store, field.storage_key(), text.to_string().encode());
              if self.credential != text
              {   self.credential = text.to_string();
                  self.nonce += 1;
              }
            }
          , FieldKey::Prompt => {
              self.prompt.set_draft(store, text.to_string())
            }
          , FieldKey::SystemPrompt => {
              self.system.set_draft(store, text.to_string())
            }
          , FieldKey::Model => {
              self.model.set_draft(store, text.to_string())
            }
          , FieldKey::MaxTokens => {
              let v = u32::parse_input(text).ok_or_else(invalid)?;
              self.max_tokens.set_draft(store, v)
            }
          , FieldKey::Temperature => {
              let v = f32::parse_input(text).ok_or_else(invalid)?;
              self.temperature.set_draft(store, clamp_temperature(v))
            }
        }
        Ok(())
    }

    /// Current draft text of a field, as the front end shows it
    pub fn draft_text(&self, field: FieldKey) -> String
    {   match field
        {   FieldKey::Credential => self.credential.clone()
          , FieldKey::Prompt => self.prompt.draft().clone()
          , FieldKey::SystemPrompt => self.system.draft().clone()
          , FieldKey::Model => self.model.draft().clone()
          , FieldKey::MaxTokens => self.max_tokens.draft().to_string()
          , FieldKey::Temperature => self.temperature.draft().to_string()
        }
    }

    /// Submit gating: credential, draft prompt and draft system prompt present
    pub fn submit_enabled(&self) -> bool
    {   !self.credential.is_empty()
          && !self.prompt.draft().is_empty()
          && !self.system.draft().is_empty()
    }

    /// Commit every field and bump the counter exactly once
    pub fn submit(&mut self)
    {   let changed = [
          self.prompt.commit()
        , self.system.commit()
        , self.model.commit()
        , self.max_tokens.commit()
        , self.temperature.commit()
        ].iter().filter(|c| **c).count();
        self.nonce += 1;
        debug!("Submitted: {} field(s) changed, nonce {}", changed, self.nonce);
    }

    /// The request the committed values describe
    pub fn committed_request(&self) -> CompletionRequest
    {   CompletionRequest
        {   user_message: self.prompt.committed().clone()
          , system_instruction: self.system.committed().clone()
          , model: self.model.committed().clone()
          , max_output_tokens: *self.max_tokens.committed()
          , temperature: *self.temperature.committed()
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn defaults_when_store_is_empty()
    {   let form = Form::load(&MemoryStore::new());
        assert_eq!(form.credential(), "");
        assert_eq!(form.prompt.committed(), "What is a Claude?");
        assert_eq!(form.system.committed(), "Respond only with a haiku");
        assert_eq!(form.model.committed(), "claude-3-5-sonnet-20240620");
        assert_eq!(*form.max_tokens.committed(), 100);
        assert_eq!(*form.temperature.committed(), 1.0);
        assert_eq!(form.nonce(), 0);
    }

    #[test]
    fn editing_never_touches_committed()
    {   let mut store = MemoryStore::new();
        let mut form = Form::load(&store);
        form.edit(&mut store, FieldKey::Prompt, "Why?").unwrap();
        form.edit(&mut store, FieldKey::MaxTokens, "250").unwrap();
        assert_eq!(form.prompt.draft(), "Why?");
        assert_eq!(form.prompt.committed(), "What is a Claude?");
        assert_eq!(*form.max_tokens.committed(), 100);

        form.submit();
        assert_eq!(form.prompt.committed(), "Why?");
        assert_eq!(*form.max_tokens.committed(), 250);
        assert_eq!(form.nonce(), 1);
    }

    #[test]
    fn drafts_persist_across_sessions()
    {   let mut store = MemoryStore::new();
        let mut form = Form::load(&store);
        form.edit(&mut store, FieldKey::SystemPrompt, "Be terse").unwrap();
        form.edit(&mut store, FieldKey::Credential, "sk-test").unwrap();

        let reloaded = Form::load(&store);
        assert_eq!(reloaded.system.draft(), "Be terse");
        assert_eq!(reloaded.system.committed(), "Be terse");
        assert_eq!(reloaded.credential(), "sk-test");
    }

    #[test]
    fn resubmitting_unchanged_values_still_counts()
    {   let mut form = Form::load(&MemoryStore::new());
        form.submit();
        let first = form.committed_request();
        form.submit();
        assert_eq!(form.committed_request(), first);
        assert_eq!(form.nonce(), 2);
    }

    #[test]
    fn commit_reports_change_only_once()
    {   let mut store = MemoryStore::new();
        let mut input = Input::load(&store, "k", "a".to_string());
        assert!(!input.commit());
        input.set_draft(&mut store, "b".to_string());
        assert!(input.commit());
        assert!(!input.commit());
        input.set_committed("z".to_string());
        assert_eq!(input.committed(), "z");
        assert_eq!(input.draft(), "b");
        assert!(input.commit());
    }

    #[test]
    fn credential_change_bumps_nonce()
    {   let mut store = MemoryStore::new();
        let mut form = Form::load(&store);
        form.edit(&mut store, FieldKey::Credential, "sk-a").unwrap();
        assert_eq!(form.nonce(), 1);
        form.edit(&mut store, FieldKey::Credential, "sk-a").unwrap();
        assert_eq!(form.nonce(), 1);
    }

    #[test]
    fn submit_gating_uses_drafts_and_credential()
    {   let mut store = MemoryStore::new();
        let mut form = Form::load(&store);
        assert!(!form.submit_enabled());
        form.edit(&mut store, FieldKey::Credential, "sk-test").unwrap();
        assert!(form.submit_enabled());
        form.edit(&mut store, FieldKey::SystemPrompt, "").unwrap();
        assert!(!form.submit_enabled());
    }

    #[test]
    fn bad_numbers_are_rejected_and_temperature_clamped()
    {   let mut store = MemoryStore::new();
        let mut form = Form::load(&store);
        assert!(matches!(
          form.edit(&mut store, FieldKey::MaxTokens, "lots"),
          Err(crate::error::Error::InvalidField { .. })
        ));
        form.edit(&mut store, FieldKey::Temperature, "3.5").unwrap();
        assert_eq!(*form.temperature.draft(), 1.0);

        store.set(crate::TEMPERATURE_KEY, "-7".to_string()).unwrap();
        store.set(crate::MAX_TOKENS_KEY, "\"oops\"".to_string()).unwrap();
        let reloaded = Form::load(&store);
        assert_eq!(*reloaded.temperature.committed(), -1.0);
        assert_eq!(*reloaded.max_tokens.committed(), 100);
    }

    #[test]
    fn unwritable_store_keeps_edit_in_memory()
    {   let dir = std::env::temp_dir()
          .join(format!("claude-client-unwritable-{}", std::process::id()));
        let sub = dir.join("sub");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&sub).unwrap();
        let mut store = crate::store::JsonFileStore::open(sub.join("fields.json"))
          .unwrap();
        let mut form = Form::load(&store);

        // a plain file where the store directory should be
        std::fs::remove_dir_all(&sub).unwrap();
        std::fs::write(&sub, "blocker").unwrap();

        form.edit(&mut store, FieldKey::Prompt, "new prompt").unwrap();
        assert_eq!(form.prompt.draft(), "new prompt");
        assert_eq!(
          store.get(crate::PROMPT_KEY).as_deref(),
          Some("\"new prompt\"")
        );

        form.edit(&mut store, FieldKey::Credential, "sk-test").unwrap();
        assert_eq!(form.credential(), "sk-test");
        assert_eq!(form.nonce(), 1);
        assert!(form.submit_enabled());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn field_names_round_trip()
    {   for key in FieldKey::ALL
        {   assert_eq!(key.name().parse::<FieldKey>().unwrap(), key);
        }
        assert!("colour".parse::<FieldKey>().is_err());
    }
}
