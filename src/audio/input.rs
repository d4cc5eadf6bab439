use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::CaptureBackend;
use crate::error::SelectionError;

/// Physical placement of a capture input on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Top,
    Bottom,
    Front,
    Back,
    Left,
    Right,
    Unknown,
}

/// A capture input. The name is both its stable identifier and display name;
/// equality and hashing use the name only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Input {
    pub name: String,
    pub location: Location,
}

impl Input {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    /// The "no input chosen" sentinel
    pub fn unselected() -> Self {
        Self::new("", Location::Unknown)
    }

    pub fn is_unselected(&self) -> bool {
        self.name.is_empty()
    }
}

impl PartialEq for Input {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Input {}

impl Hash for Input {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({:?})", self.name, self.location)
    }
}

/// Enumerates and selects capture inputs.
///
/// Device lists are volatile (headsets come and go), so nothing is cached:
/// the selection is kept only as a preferred name and re-validated on use.
pub struct InputRegistry {
    backend: Arc<dyn CaptureBackend>,
    preferred: Option<String>,
}

impl InputRegistry {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            preferred: None,
        }
    }

    /// Query the backend for the inputs present right now
    pub fn available_inputs(&self) -> Vec<Input> {
        match self.backend.available_inputs() {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!("Failed to enumerate inputs on {}: {}", self.backend.name(), e);
                Vec::new()
            }
        }
    }

    /// Select an input. Selecting the unselected sentinel clears the preference.
    pub fn select_input(&mut self, input: &Input) -> Result<(), SelectionError> {
        if input.is_unselected() {
            self.preferred = None;
            return Ok(());
        }

        if !self.available_inputs().contains(input) {
            return Err(SelectionError::NoSuchPort(input.name.clone()));
        }

        self.backend
            .select_input(&input.name)
            .map_err(|source| SelectionError::BackendRejected {
                name: input.name.clone(),
                source,
            })?;

        info!("Selected input {}", input);
        self.preferred = Some(input.name.clone());
        Ok(())
    }

    /// Name remembered by the last successful selection
    pub fn preferred_name(&self) -> Option<&str> {
        self.preferred.as_deref()
    }

    /// The preferred input, if it is still present
    pub fn preferred_input(&self) -> Option<Input> {
        let name = self.preferred.as_deref()?;
        self.available_inputs().into_iter().find(|input| input.name == name)
    }
}
