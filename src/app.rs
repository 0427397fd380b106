//! Controller tying the field store, form, client factory and
//! orchestrator together, plus the plain-text renderer.

use log::{debug, info};

use crate::client::{ClientFactory, ClientHandle};
use crate::form::{FieldKey, Form};
use crate::orchestrator::{Orchestrator, Outcome, RequestKey, View};
use crate::request::{DisplayBlock, Message};
use crate::store::FieldStore;

pub struct App<S, F>
{   store: S
  , factory: F
  , form: Form
  , client: Option<ClientHandle>
  , orchestrator: Orchestrator
}

impl<S: FieldStore, F: ClientFactory> App<S, F>
{   /// Load the form, build the client and resolve the startup key
    pub fn new(
      store: S
    , factory: F
    , example_on_first_load: bool
    ) -> Self
    {   let form = Form::load(&store);
        let client = factory.build(form.credential());
        let mut app = App
        {   store
          , factory
          , form
          , client
          , orchestrator: Orchestrator::new(example_on_first_load)
        };
        app.refresh();
        app
    }

    pub fn form(&self) -> &Form
    {   &self.form
    }

    pub fn orchestrator(&self) -> &Orchestrator
    {   &self.orchestrator
    }

    pub fn has_client(&self) -> bool
    {   self.client.is_some()
    }

    pub fn submit_enabled(&self) -> bool
    {   self.form.submit_enabled()
    }

    /// Apply a user edit. Only a credential change can start a fetch.
    pub fn edit_field(
      &mut self
    , field: FieldKey
    , text: &str
    ) -> Result<(), crate::error::Error>
    {   let before = self.form.nonce();
        self.form.edit(&mut self.store, field, text)?;
        if field == FieldKey::Credential && self.form.nonce() != before
        {   info!("Credential changed, rebuilding client");
            self.client = self.factory.build(self.form.credential());
            self.refresh();
        }
        Ok(())
    }

    /// Commit drafts and resolve the new key; `None` when gated off
    pub fn submit(&mut self) -> Option<Outcome>
    {   if !self.form.submit_enabled()
        {   debug!("Submit ignored: token, prompt and system prompt required");
            return None;
        }
        self.form.submit();
        Some(self.refresh())
    }

    fn refresh(&mut self) -> Outcome
    {   let key = RequestKey::from_form(self.client.as_ref(), &self.form);
        self.orchestrator.resolve(key, self.client.as_ref())
    }

    pub fn view(&self) -> View
    {   self.orchestrator.view()
    }

    /// Apply completions that already arrived
    pub fn poll(&mut self) -> usize
    {   self.orchestrator.drain()
    }

    /// Wait until the current request is resolved
    pub async fn settle(&mut self)
    {   self.orchestrator.settle_current().await
    }
}

/// Render a view as text; `full` appends the whole message as JSON
pub fn render(view: &View, full: bool) -> String
{   let mut out = String::new();
    match (view, &view.data)
    {   (View { is_pending: true, data: None, .. }, _) => {
          out.push_str("Loading...\n");
        }
      , (View { is_error: true, error: Some(e), .. }, _) => {
          out.push_str(&format!("Error: {}\n", e.message()));
        }
      , (_, Some(msg)) => {
          render_message(&mut out, msg, view.is_stale, full);
        }
      , _ => {}
    }
    out
}

fn render_message(out: &mut String, msg: &Message, stale: bool, full: bool)
{   if stale
    {   out.push_str("Response (stale, loading):\n");
    } else
    {   out.push_str("Response:\n");
    }
    for block in &msg.content
    {   match block.display()
        {   DisplayBlock::Lines(lines) => {
              for line in lines
              {   out.push_str("  ");
                  out.push_str(line);
                  out.push('\n');
              }
            }
          , DisplayBlock::Verbatim(json) => {
              out.push_str(&json);
              out.push('\n');
            }
        }
    }
    if full
    {   out.push_str("Full response:\n");
        out.push_str(
          &serde_json::to_string_pretty(msg)
            .unwrap_or_else(|e| format!("<{}>", e))
        );
        out.push('\n');
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::sync::Arc;

    #[test]
    fn render_states()
    {   assert_eq!(render(&View::default(), false), "");

        let loading = View { is_pending: true, ..View::default() };
        assert_eq!(render(&loading, false), "Loading...\n");

        let failed = View
        {   is_error: true
          , error: Some(crate::error::Error::ApiError
            {   status: 401
              , message: "invalid x-api-key".to_string()
            })
          , ..View::default()
        };
        assert_eq!(render(&failed, false), "Error: invalid x-api-key\n");

        let stale = View
        {   is_pending: true
          , is_stale: true
          , data: Some(Arc::new(Message::example()))
          , ..View::default()
        };
        let text = render(&stale, false);
        assert!(text.starts_with("Response (stale, loading):\n"));
        assert!(text.contains("  Silicon dreams, language's dance\n"));
    }

    #[test]
    fn startup_without_token_settles_immediately()
    {   let mut app = App::new(
          crate::store::MemoryStore::new(),
          crate::client::AnthropicFactory::default(),
          true
        );
        tokio_test::block_on(app.settle());
        assert!(!app.has_client());
        assert_eq!(app.poll(), 0);
        assert_eq!(app.view().data.as_deref(), Some(&Message::example()));
    }

    #[test]
    fn full_response_includes_usage()
    {   let view = View
        {   data: Some(Arc::new(Message::example()))
          , ..View::default()
        };
        let text = render(&view, true);
        assert!(text.contains("Full response:"));
        assert!(text.contains("\"output_tokens\": 18"));
    }
}
