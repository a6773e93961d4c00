//! In-memory host for tests and embedding

use super::Host;
use crate::error::PersistResult;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Host whose inputs, variables, state and outputs live in maps
#[derive(Debug, Default)]
pub struct MemoryHost {
    inputs: Mutex<HashMap<String, String>>,
    vars: Mutex<HashMap<String, String>>,
    state: Mutex<HashMap<String, String>>,
    outputs: Mutex<HashMap<String, String>>,
    warnings: Mutex<Vec<String>>,
}

fn lock<T>(value: &Mutex<T>) -> MutexGuard<'_, T> {
    value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(self, name: &str, value: &str) -> Self {
        self.set_input(name, value);
        self
    }

    pub fn with_var(self, name: &str, value: &str) -> Self {
        lock(&self.vars).insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_input(&self, name: &str, value: &str) {
        lock(&self.inputs).insert(name.to_string(), value.to_string());
    }

    /// Snapshot of everything saved so far
    pub fn saved_state(&self) -> HashMap<String, String> {
        lock(&self.state).clone()
    }

    pub fn output(&self, key: &str) -> Option<String> {
        lock(&self.outputs).get(key).cloned()
    }

    /// Warnings reported so far, in order
    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }
}

impl Host for MemoryHost {
    fn input(&self, name: &str) -> Option<String> {
        lock(&self.inputs)
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn state(&self, key: &str) -> Option<String> {
        lock(&self.state).get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn save_state(&self, key: &str, value: &str) -> PersistResult<()> {
        lock(&self.state).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_output(&self, key: &str, value: &str) -> PersistResult<()> {
        lock(&self.outputs).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn var(&self, name: &str) -> Option<String> {
        lock(&self.vars).get(name).cloned()
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
        lock(&self.warnings).push(message.to_string());
    }
}
