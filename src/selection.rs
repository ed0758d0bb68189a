//! Model selection policy and the process-lifetime selection cache.

use std::sync::RwLock;

use crate::models::gemini::{strip_models_prefix, ModelDescriptor};

/// Pick a model from the catalog.
///
/// Precedence:
/// 1. `preferred`, if listed and generation-capable
/// 2. first generation-capable name containing "flash" (case-insensitive)
/// 3. first generation-capable name containing "pro" (case-insensitive)
/// 4. first generation-capable model in listing order
///
/// Returns `None` when no entry supports generation.
pub fn select_model(catalog: &[ModelDescriptor], preferred: Option<&str>) -> Option<String> {
    let usable: Vec<&ModelDescriptor> = catalog.iter().filter(|m| m.supports_generation).collect();

    if let Some(want) = preferred
        .map(|p| strip_models_prefix(p.trim()))
        .filter(|p| !p.is_empty())
    {
        if usable.iter().any(|m| m.name == want) {
            return Some(want.to_string());
        }
    }

    ["flash", "pro"]
        .iter()
        .find_map(|token| usable.iter().find(|m| name_contains(&m.name, token)))
        .or_else(|| usable.first())
        .map(|m| m.name.clone())
}

fn name_contains(name: &str, token: &str) -> bool {
    name.to_ascii_lowercase().contains(token)
}

/// Last selected model, shared by all concurrent invocations.
///
/// Reads and writes are independent short critical sections; concurrent
/// requests may both resolve and the last write wins.
#[derive(Debug, Default)]
pub struct ModelCache {
    selected: RwLock<Option<String>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        match self.selected.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, model: impl Into<String>) {
        let model = model.into();
        match self.selected.write() {
            Ok(mut guard) => *guard = Some(model),
            Err(poisoned) => *poisoned.into_inner() = Some(model),
        }
    }

    /// Clear the cache if it still holds `model`. Returns whether it was cleared.
    pub fn invalidate(&self, model: &str) -> bool {
        let mut guard = match self.selected.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.as_deref() == Some(model) {
            *guard = None;
            true
        } else {
            false
        }
    }
}
