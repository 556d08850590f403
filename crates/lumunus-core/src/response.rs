//! Canned response selection.
//!
//! Responses are pre-authored strings. A [`ResponseList`] is guaranteed to be
//! non-empty once constructed, so selection itself can never fail.
//!
//! Two policies exist:
//! - [`SelectionPolicy::Cyclic`]: `index = cursor mod len`, the caller advances
//!   the cursor after each produced response.
//! - [`SelectionPolicy::Random`]: uniform pick in `[0, len)`, no cursor mutation.
//!
//! The facilitated three-party conversation uses the cyclic policy while the
//! prep dialogue uses the random one. Both engines take the policy from
//! configuration, so unifying them is an explicit configuration change.

use crate::error::{LumunusError, Result};
use crate::session::{PrepPhase, Role};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the next response is picked from a [`ResponseList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SelectionPolicy {
    /// Deterministic rotation driven by a [`ResponseCursor`].
    Cyclic,
    /// Uniform random pick.
    Random,
}

/// Per-speaker or per-phase counter for the cyclic policy.
///
/// Starts at 0 and only ever moves forward by one. It is reset only by
/// replacing the owning session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCursor(u64);

impl ResponseCursor {
    pub fn new() -> Self {
        Self(0)
    }

    /// Number of responses produced so far.
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 += 1;
    }

    /// Index into a list of `len` entries.
    pub fn position(&self, len: usize) -> usize {
        (self.0 % len as u64) as usize
    }
}

/// A named, non-empty, ordered list of canned responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseList {
    name: String,
    entries: Vec<String>,
}

impl ResponseList {
    /// Creates a list, rejecting empty input.
    ///
    /// # Errors
    ///
    /// Returns [`LumunusError::EmptyResponseList`] when `entries` is empty, and
    /// a config error when any entry is blank.
    pub fn new(name: impl Into<String>, entries: Vec<String>) -> Result<Self> {
        let name = name.into();
        if entries.is_empty() {
            return Err(LumunusError::empty_response_list(name));
        }
        if let Some(index) = entries.iter().position(|e| e.trim().is_empty()) {
            return Err(LumunusError::config(format!("{name}[{index}] must not be blank")));
        }
        Ok(Self { name, entries })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Entry at `cursor mod len`. Does not advance the cursor.
    pub fn cyclic(&self, cursor: &ResponseCursor) -> &str {
        &self.entries[cursor.position(self.entries.len())]
    }

    /// Uniformly random entry.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.entries[rng.gen_range(0..self.entries.len())]
    }

    /// Picks according to `policy`, advancing `cursor` only for the cyclic policy.
    pub fn select<R: Rng + ?Sized>(
        &self,
        policy: SelectionPolicy,
        cursor: &mut ResponseCursor,
        rng: &mut R,
    ) -> &str {
        match policy {
            SelectionPolicy::Cyclic => {
                let index = cursor.position(self.entries.len());
                cursor.advance();
                &self.entries[index]
            }
            SelectionPolicy::Random => self.random(rng),
        }
    }
}

/// Response lists for the simulated speakers of the three-party conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResponses {
    other: ResponseList,
    ai: ResponseList,
}

impl TurnResponses {
    pub fn new(other: Vec<String>, ai: Vec<String>) -> Result<Self> {
        Ok(Self {
            other: ResponseList::new("turn.responses.other", other)?,
            ai: ResponseList::new("turn.responses.ai", ai)?,
        })
    }

    /// The list for a simulated speaker. The user never gets canned text.
    pub fn for_role(&self, role: Role) -> Option<&ResponseList> {
        match role {
            Role::User => None,
            Role::Other => Some(&self.other),
            Role::Ai => Some(&self.ai),
        }
    }
}

/// Response lists for the facilitator of the prep dialogue, one per phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepResponses {
    understanding: ResponseList,
    framing: ResponseList,
    ready: ResponseList,
}

impl PrepResponses {
    pub fn new(
        understanding: Vec<String>,
        framing: Vec<String>,
        ready: Vec<String>,
    ) -> Result<Self> {
        Ok(Self {
            understanding: ResponseList::new("prep.responses.understanding", understanding)?,
            framing: ResponseList::new("prep.responses.framing", framing)?,
            ready: ResponseList::new("prep.responses.ready", ready)?,
        })
    }

    pub fn for_phase(&self, phase: PrepPhase) -> &ResponseList {
        match phase {
            PrepPhase::Understanding => &self.understanding,
            PrepPhase::Framing => &self.framing,
            PrepPhase::Ready => &self.ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn list(entries: &[&str]) -> ResponseList {
        ResponseList::new("test", entries.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_blank_entry_rejected() {
        let entries = vec!["Sounds good".to_string(), "   ".to_string()];
        let err = ResponseList::new("turn.responses.ai", entries).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("turn.responses.ai[1]"));
    }

    #[test]
    fn test_empty_list_rejected() {
        let err = ResponseList::new("turn.responses.other", Vec::new()).unwrap_err();
        assert_eq!(
            err,
            LumunusError::EmptyResponseList {
                list: "turn.responses.other".to_string()
            }
        );
    }

    #[test]
    fn test_cyclic_wraps_modulo_length() {
        let responses = list(&["a", "b", "c"]);
        let mut cursor = ResponseCursor::new();
        let mut rng = StdRng::seed_from_u64(7);

        let picked: Vec<String> = (0..7)
            .map(|_| {
                responses
                    .select(SelectionPolicy::Cyclic, &mut cursor, &mut rng)
                    .to_string()
            })
            .collect();

        assert_eq!(picked, vec!["a", "b", "c", "a", "b", "c", "a"]);
        assert_eq!(cursor.value(), 7);
        assert_eq!(cursor.position(responses.len()), 1);
    }

    #[test]
    fn test_cyclic_read_does_not_advance() {
        let responses = list(&["a", "b"]);
        let cursor = ResponseCursor::new();
        assert_eq!(responses.cyclic(&cursor), "a");
        assert_eq!(responses.cyclic(&cursor), "a");
        assert_eq!(cursor.value(), 0);
    }

    #[test]
    fn test_random_stays_in_list_and_leaves_cursor() {
        let responses = list(&["x", "y", "z"]);
        let mut cursor = ResponseCursor::new();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let picked = responses.select(SelectionPolicy::Random, &mut cursor, &mut rng);
            assert!(responses.entries().iter().any(|e| e == picked));
        }
        assert_eq!(cursor.value(), 0);
    }

    #[test]
    fn test_turn_responses_have_no_user_list() {
        let responses = TurnResponses::new(vec!["o".into()], vec!["a".into()]).unwrap();
        assert!(responses.for_role(Role::User).is_none());
        assert_eq!(responses.for_role(Role::Other).unwrap().entries(), ["o"]);
        assert_eq!(responses.for_role(Role::Ai).unwrap().name(), "turn.responses.ai");
    }

    #[test]
    fn test_prep_responses_reject_empty_phase() {
        let err = PrepResponses::new(vec!["u".into()], Vec::new(), vec!["r".into()]).unwrap_err();
        assert!(err.to_string().contains("prep.responses.framing"));
    }
}
