//! claude-client: a prompt form for a hosted completion endpoint.
//!
//! Form fields persist between sessions; edits stay in a draft until
//! submitted. Each submission produces a [`orchestrator::RequestKey`] that
//! is fetched at most once and cached, and the previous response stays on
//! screen (stale) while the next one loads.

pub mod error;
pub mod config;
pub mod store;
pub mod form;
pub mod request;
pub mod providers;
pub mod client;
pub mod orchestrator;
pub mod app;

pub use app::App;
pub use client::{ClientFactory, ClientHandle, CompletionClient};
pub use error::Error;
pub use form::{FieldKey, Form};
pub use orchestrator::{Orchestrator, Outcome, RequestKey, View};
pub use request::{CompletionRequest, ContentBlock, Message};
pub use store::{FieldStore, JsonFileStore, MemoryStore};

// ===== Field store keys =====

pub const TOKEN_KEY: &str = "anthropic-token";
pub const PROMPT_KEY: &str = "anthropic-prompt";
pub const SYSTEM_PROMPT_KEY: &str = "anthropic-system-prompt";
pub const MODEL_KEY: &str = "anthropic-model";
pub const MAX_TOKENS_KEY: &str = "anthropic-max-tokens";
pub const TEMPERATURE_KEY: &str = "anthropic-temperature";

// ===== Defaults =====

pub const DEFAULT_PROMPT: &str = "What is a Claude?";
pub const DEFAULT_SYSTEM_PROMPT: &str = "Respond only with a haiku";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_MAX_TOKENS: u32 = 100;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// Temperature range accepted by the form
pub const MIN_TEMPERATURE: f32 = -1.0;
pub const MAX_TEMPERATURE: f32 = 1.0;
