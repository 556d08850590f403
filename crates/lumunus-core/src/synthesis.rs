//! Invitation synthesis.
//!
//! When the prep dialogue first reaches [`PrepPhase::Ready`](crate::session::PrepPhase)
//! the facilitator replies with a synthesis of the discussion instead of a
//! canned response, and the summary becomes the invitation text shown to the
//! user. Producing that text is delegated to an [`InvitationSynthesizer`].

use crate::session::PrepMessage;
use serde::{Deserialize, Serialize};

/// Text produced by the one-time synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Synthesis {
    /// The facilitator message appended to the transcript.
    pub message: String,
    /// Invitation summary shown in the preview.
    pub summary: String,
}

impl Default for Synthesis {
    fn default() -> Self {
        crate::presets::get_default_synthesis()
    }
}

pub trait InvitationSynthesizer: Send + Sync {
    fn synthesize(&self, transcript: &[PrepMessage]) -> Synthesis;
}

/// Returns the same configured synthesis regardless of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSynthesizer {
    synthesis: Synthesis,
}

impl FixedSynthesizer {
    pub fn new(synthesis: Synthesis) -> Self {
        Self { synthesis }
    }
}

impl InvitationSynthesizer for FixedSynthesizer {
    fn synthesize(&self, _transcript: &[PrepMessage]) -> Synthesis {
        self.synthesis.clone()
    }
}
