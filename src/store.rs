//! Persisted form field storage, addressed by fixed string keys

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use log::{debug, trace, warn};

/// Key to string mapping that survives between sessions.
/// A `set` must be visible to the next `get` on the same store.
pub trait FieldStore
{   fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String)
      -> Result<(), crate::error::Error>;

    /// Stored value, or `default` when nothing was stored
    fn get_or(&self, key: &str, default: &str) -> String
    {   self.get(key).unwrap_or_else(|| default.to_string())
    }
}

/// Ephemeral store; nothing outlives the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStore
{   values: BTreeMap<String, String>
}

impl MemoryStore
{   pub fn new() -> Self
    {   MemoryStore::default()
    }
}

impl FieldStore for MemoryStore
{   fn get(&self, key: &str) -> Option<String>
    {   self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String)
      -> Result<(), crate::error::Error>
    {   trace!("MemoryStore set {}", key);
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Write-through store backed by a single JSON object file.
/// Reads are served from memory, so writes are visible immediately.
#[derive(Debug)]
pub struct JsonFileStore
{   path: PathBuf
  , values: BTreeMap<String, String>
}

impl JsonFileStore
{   /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl AsRef<Path>)
      -> Result<Self, crate::error::Error>
    {   let path = path.as_ref().to_path_buf();
        debug!("Opening field store at {}", path.display());

        let values = match std::fs::read_to_string(&path)
        {   Ok(text) => {
              serde_json::from_str(&text).map_err(|e| {
                crate::error::Error::Storage(
                  format!("{}: {}", path.display(), e)
                )
              })?
            }
          , Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
              debug!("No field store yet, starting empty");
              BTreeMap::new()
            }
          , Err(e) => return Err(e.into())
        };

        Ok(JsonFileStore { path, values })
    }

    fn flush(&self) -> Result<(), crate::error::Error>
    {   if let Some(parent) = self.path.parent()
        {   std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.values)
          .map_err(|e| {
            crate::error::Error::Storage(e.to_string())
          })?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl FieldStore for JsonFileStore
{   fn get(&self, key: &str) -> Option<String>
    {   self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String)
      -> Result<(), crate::error::Error>
    {   trace!("JsonFileStore set {}", key);
        self.values.insert(key.to_string(), value);
        self.flush().map_err(|e| {
          warn!("Failed to persist {}: {}", key, e);
          e
        })
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    fn scratch_path(name: &str) -> PathBuf
    {   std::env::temp_dir()
          .join(format!("claude-client-{}-{}", name, std::process::id()))
          .join("fields.json")
    }

    #[test]
    fn memory_store_falls_back_to_default()
    {   let mut store = MemoryStore::new();
        assert_eq!(store.get_or("anthropic-model", "m"), "m");
        store.set("anthropic-model", "x".to_string()).unwrap();
        assert_eq!(store.get_or("anthropic-model", "m"), "x");
    }

    #[test]
    fn file_store_survives_reopen()
    {   let path = scratch_path("reopen");
        let _ = std::fs::remove_file(&path);
        {   let mut store = JsonFileStore::open(&path).unwrap();
            assert!(store.get("anthropic-prompt").is_none());
            store.set("anthropic-prompt", "\"hi\"".to_string()).unwrap();
            assert_eq!(
              store.get("anthropic-prompt").as_deref(),
              Some("\"hi\"")
            );
        }
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("anthropic-prompt").as_deref(), Some("\"hi\""));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_is_a_storage_error()
    {   let path = scratch_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        match JsonFileStore::open(&path)
        {   Err(crate::error::Error::Storage(_)) => {}
          , other => panic!("expected storage error, got {:?}", other)
        }
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
