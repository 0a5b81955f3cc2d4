use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Persisted mapping of canonical speaker identifiers to registered names,
/// maintained outside this crate. Keys use either `HABLANTE_<id>` or
/// `HABLANTE <id>` form.
#[derive(Debug, Clone, Default)]
pub struct SpeakerRegistry {
    entries: HashMap<String, Value>,
}

impl SpeakerRegistry {
    /// Load the registry; a missing file is an empty registry
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read speaker registry: {:?}", path))?;
        let entries = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse speaker registry: {:?}", path))?;
        Ok(Self { entries })
    }

    /// Whether a global speaker id has a usable registration
    pub fn is_registered(&self, id: u32) -> bool {
        let keys = [format!("HABLANTE_{}", id), format!("HABLANTE {}", id)];
        keys.iter().any(|key| {
            self.entries
                .get(key)
                .is_some_and(|value| match value {
                    Value::Null => false,
                    Value::Bool(b) => *b,
                    Value::String(s) => !s.is_empty(),
                    _ => true,
                })
        })
    }

    /// True when every observed speaker id is registered; downstream
    /// document rendering only proceeds on true
    pub fn all_registered(&self, ids: &[u32]) -> bool {
        ids.iter().all(|&id| self.is_registered(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_registry() {
        let registry = SpeakerRegistry::load(Path::new("/nonexistent/hablantes.json")).unwrap();
        assert!(!registry.is_registered(1));
        assert!(registry.all_registered(&[]));
    }

    #[test]
    fn test_accepts_both_key_forms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hablantes.json");
        std::fs::write(
            &path,
            r#"{"HABLANTE_1": "Ana Díaz", "HABLANTE 2": "Luis Gómez", "HABLANTE_3": ""}"#,
        )
        .unwrap();

        let registry = SpeakerRegistry::load(&path).unwrap();

        assert!(registry.is_registered(1));
        assert!(registry.is_registered(2));
        // Empty name does not count as registered
        assert!(!registry.is_registered(3));
        assert!(registry.all_registered(&[1, 2]));
        assert!(!registry.all_registered(&[1, 2, 3]));
    }

    #[test]
    fn test_corrupt_registry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hablantes.json");
        std::fs::write(&path, "no es json").unwrap();

        assert!(SpeakerRegistry::load(&path).is_err());
    }
}
