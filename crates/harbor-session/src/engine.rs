//! Engine collaborator
//!
//! The engine owns the per-session state blob (history, scroll position, form data).
//! Nothing outside the engine looks inside an [`EngineSessionState`].

use serde_json::Value;

use crate::error::EngineError;

/// Opaque per-session state produced and consumed by an [`Engine`]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSessionState(Value);

impl EngineSessionState {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }
}

pub trait Engine: Send + Sync {
    /// Identifying name, used to pick the storage file
    fn name(&self) -> &str;

    /// Turn an engine state into its persisted form
    fn write_session_state(&self, state: &EngineSessionState) -> Result<Value, EngineError>;

    /// Rebuild an engine state from its persisted form
    fn read_session_state(&self, json: Value) -> Result<EngineSessionState, EngineError>;
}

/// Engine that persists its state blob as-is.
///
/// State blobs must be JSON objects.
#[derive(Debug, Clone)]
pub struct BasicEngine {
    name: String,
}

impl BasicEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Engine for BasicEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_session_state(&self, state: &EngineSessionState) -> Result<Value, EngineError> {
        let value = state.as_json();
        if value.is_object() {
            Ok(value.clone())
        } else {
            Err(EngineError::Unsupported(format!(
                "expected an object, got {}",
                value
            )))
        }
    }

    fn read_session_state(&self, json: Value) -> Result<EngineSessionState, EngineError> {
        if json.is_object() {
            Ok(EngineSessionState::new(json))
        } else {
            Err(EngineError::Unsupported(format!(
                "expected an object, got {}",
                json
            )))
        }
    }
}
