//! Pipeline State Machine
//!
//! Explicit stages of one `produce` run. Legal transitions:
//!
//! ```text
//! LoadingVoice ──> LoadingBackground ──> Composing ──> Encoding ──> Done
//!      │                  │                  │             │
//!      ├──> Done          └──> Done          └──> Done     └──> Done
//!      └──> Failed
//! ```
//!
//! Every `Done` edge out of a stage other than `Encoding` is a voice-only
//! fallback; an encode failure also falls back to the narration. `Failed` is
//! only reachable while the mandatory narration loads.

use std::fmt;

use tracing::debug;

use crate::error::{ReverieError, Result};

/// Stage of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineState {
    /// Fetching and decoding the narration (mandatory)
    #[default]
    LoadingVoice,
    /// Fetching and decoding the ambient background (optional)
    LoadingBackground,
    /// Mixing narration and background
    Composing,
    /// Writing the mix as a WAV file
    Encoding,
    /// A reference was produced
    Done,
    /// No usable audio could be produced
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::LoadingVoice => write!(f, "LoadingVoice"),
            PipelineState::LoadingBackground => write!(f, "LoadingBackground"),
            PipelineState::Composing => write!(f, "Composing"),
            PipelineState::Encoding => write!(f, "Encoding"),
            PipelineState::Done => write!(f, "Done"),
            PipelineState::Failed => write!(f, "Failed"),
        }
    }
}

impl PipelineState {
    /// Whether `next` may follow this state
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        matches!(
            (self, next),
            (LoadingVoice, LoadingBackground)
                | (LoadingVoice, Done)
                | (LoadingVoice, Failed)
                | (LoadingBackground, Composing)
                | (LoadingBackground, Done)
                | (Composing, Encoding)
                | (Composing, Done)
                | (Encoding, Done)
        )
    }

    /// `Done` and `Failed` end a run
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// Tracks one run through the state machine and remembers its path
#[derive(Debug, Clone)]
pub struct PipelineRun {
    state: PipelineState,
    trace: Vec<PipelineState>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    /// Start a run in `LoadingVoice`
    pub fn new() -> Self {
        Self {
            state: PipelineState::LoadingVoice,
            trace: vec![PipelineState::LoadingVoice],
        }
    }

    /// Move to `next`
    ///
    /// # Errors
    /// * `InvalidTransition` - `next` is not reachable from the current state
    pub fn advance(&mut self, next: PipelineState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(ReverieError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        debug!(from = %self.state, to = %next, "[PIPELINE] transition");
        self.state = next;
        self.trace.push(next);
        Ok(())
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state visited, in order, starting with `LoadingVoice`
    pub fn trace(&self) -> &[PipelineState] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<PipelineState> {
        self.trace
    }
}
