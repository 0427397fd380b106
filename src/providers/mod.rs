//! Completion provider implementations

pub mod anthropic;

// Re-export for convenience
pub use anthropic::AnthropicClient;
