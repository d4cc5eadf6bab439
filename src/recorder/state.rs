use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransitionError;

/// Recorder lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Inited,
    Prepared,
    Recording,
    Paused,
    Stopped,
}

impl RecorderState {
    /// States reachable in one step from `self`
    pub fn routes(self) -> &'static [RecorderState] {
        use RecorderState::*;
        match self {
            Inited => &[Prepared],
            Prepared => &[Recording],
            Recording => &[Paused, Stopped],
            Paused => &[Recording, Stopped],
            Stopped => &[Prepared],
        }
    }

    pub fn can_transition_to(self, next: RecorderState) -> bool {
        self.routes().contains(&next)
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecorderState::Inited => "inited",
            RecorderState::Prepared => "prepared",
            RecorderState::Recording => "recording",
            RecorderState::Paused => "paused",
            RecorderState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Holds the recorder state and validates every change against the route table.
///
/// Purely in-memory: callers start and stop the backend around transitions.
#[derive(Debug, Clone)]
pub struct RecorderStateMachine {
    state: RecorderState,
}

impl RecorderStateMachine {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Inited,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Check a transition without performing it
    pub fn check(&self, next: RecorderState) -> Result<(), TransitionError> {
        if self.state.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError::Illegal {
                from: self.state,
                to: next,
            })
        }
    }

    /// Move to `next`. On an illegal transition the state is left unchanged.
    pub fn transition(&mut self, next: RecorderState) -> Result<RecorderState, TransitionError> {
        self.check(next)?;
        debug!("Recorder state: {} -> {}", self.state, next);
        self.state = next;
        Ok(self.state)
    }
}

impl Default for RecorderStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
