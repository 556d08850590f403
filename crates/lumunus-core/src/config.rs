//! Configuration for both engines.
//!
//! Loaded from `~/.config/lumunus/config.toml` when present. Every field has a
//! default, so a partial file only overrides what it names:
//!
//! ```toml
//! [turn]
//! policy = "cyclic"
//!
//! [turn.delays]
//! other_thinking_ms = 500
//!
//! [prep]
//! policy = "random"
//! seed = 42
//!
//! [prep.thresholds]
//! framing_at = 2
//! ready_at = 4
//! ```

use crate::error::{LumunusError, Result};
use crate::participant::ParticipantTable;
use crate::presets;
use crate::response::{PrepResponses, SelectionPolicy, TurnResponses};
use crate::session::{PhaseThresholds, Role};
use crate::synthesis::{FixedSynthesizer, Synthesis};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = "lumunus";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LumunusConfig {
    pub turn: TurnConfig,
    pub prep: PrepConfig,
}

/// Three-party conversation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    pub policy: SelectionPolicy,
    /// Seed for the random policy. `None` seeds from OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub delays: TurnDelays,
    pub participants: ParticipantTable,
    pub responses: TurnResponseConfig,
    pub seed_messages: Vec<SeedMessage>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::Cyclic,
            seed: None,
            delays: TurnDelays::default(),
            participants: ParticipantTable::default(),
            responses: TurnResponseConfig::default(),
            seed_messages: presets::get_default_seed_messages(),
        }
    }
}

/// Delays between choreography steps, in milliseconds.
///
/// Only the order of the steps is a contract; these values just pace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnDelays {
    /// User message → `other` starts thinking.
    pub other_thinking_ms: u64,
    /// `other` thinking → `other` message.
    pub other_reply_ms: u64,
    /// AI takeover → AI message.
    pub ai_reply_ms: u64,
    /// AI message → turn returns to the user.
    pub ai_release_ms: u64,
    /// Pass → `other` message.
    pub pass_reply_ms: u64,
    /// `other` message after a pass → turn returns to the user.
    pub pass_release_ms: u64,
}

impl TurnDelays {
    /// All delays zero. Useful for tests that only care about ordering.
    pub fn immediate() -> Self {
        Self {
            other_thinking_ms: 0,
            other_reply_ms: 0,
            ai_reply_ms: 0,
            ai_release_ms: 0,
            pass_reply_ms: 0,
            pass_release_ms: 0,
        }
    }

    pub fn other_thinking(&self) -> Duration {
        Duration::from_millis(self.other_thinking_ms)
    }

    pub fn other_reply(&self) -> Duration {
        Duration::from_millis(self.other_reply_ms)
    }

    pub fn ai_reply(&self) -> Duration {
        Duration::from_millis(self.ai_reply_ms)
    }

    pub fn ai_release(&self) -> Duration {
        Duration::from_millis(self.ai_release_ms)
    }

    pub fn pass_reply(&self) -> Duration {
        Duration::from_millis(self.pass_reply_ms)
    }

    pub fn pass_release(&self) -> Duration {
        Duration::from_millis(self.pass_release_ms)
    }
}

impl Default for TurnDelays {
    fn default() -> Self {
        Self {
            other_thinking_ms: 1000,
            other_reply_ms: 2000,
            ai_reply_ms: 2500,
            ai_release_ms: 1000,
            pass_reply_ms: 2000,
            pass_release_ms: 1000,
        }
    }
}

/// Canned lines for the simulated speakers. A list left out of the file keeps
/// the built-in catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnResponseConfig {
    pub other: Vec<String>,
    pub ai: Vec<String>,
}

impl Default for TurnResponseConfig {
    fn default() -> Self {
        presets::get_default_turn_responses()
    }
}

/// A message the conversation transcript starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMessage {
    pub sender: Role,
    pub content: String,
    /// How long before session start the message is dated.
    #[serde(default)]
    pub offset_secs: u64,
}

impl SeedMessage {
    /// `started_at` minus `offset_secs`, or `None` when that falls outside
    /// the representable range.
    pub fn dated_before(&self, started_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.offset_secs).ok()?;
        started_at.checked_sub_signed(TimeDelta::try_seconds(secs)?)
    }
}

/// Prep dialogue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    pub policy: SelectionPolicy,
    /// Seed for the random policy. `None` seeds from OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub delays: PrepDelays,
    pub thresholds: PhaseThresholds,
    pub greeting: String,
    pub responses: PrepResponseConfig,
    pub synthesis: Synthesis,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::Random,
            seed: None,
            delays: PrepDelays::default(),
            thresholds: PhaseThresholds::default(),
            greeting: presets::get_default_prep_greeting(),
            responses: PrepResponseConfig::default(),
            synthesis: Synthesis::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepDelays {
    /// User message → facilitator starts thinking.
    pub thinking_ms: u64,
    /// Thinking → facilitator reply.
    pub reply_ms: u64,
}

impl PrepDelays {
    pub fn immediate() -> Self {
        Self {
            thinking_ms: 0,
            reply_ms: 0,
        }
    }

    pub fn thinking(&self) -> Duration {
        Duration::from_millis(self.thinking_ms)
    }

    pub fn reply(&self) -> Duration {
        Duration::from_millis(self.reply_ms)
    }
}

impl Default for PrepDelays {
    fn default() -> Self {
        Self {
            thinking_ms: 1000,
            reply_ms: 2500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepResponseConfig {
    pub understanding: Vec<String>,
    pub framing: Vec<String>,
    pub ready: Vec<String>,
}

impl Default for PrepResponseConfig {
    fn default() -> Self {
        presets::get_default_prep_responses()
    }
}

impl TurnConfig {
    /// Validated response lists.
    ///
    /// # Errors
    ///
    /// Returns [`LumunusError::EmptyResponseList`] if either list is empty.
    pub fn responses(&self) -> Result<TurnResponses> {
        TurnResponses::new(self.responses.other.clone(), self.responses.ai.clone())
    }

    /// Checks the seed transcript.
    pub fn validate(&self) -> Result<()> {
        let now = Utc::now();
        for (index, seed) in self.seed_messages.iter().enumerate() {
            if seed.content.trim().is_empty() {
                return Err(LumunusError::config(format!(
                    "turn.seed_messages[{index}].content must not be empty"
                )));
            }
            if seed.dated_before(now).is_none() {
                return Err(LumunusError::config(format!(
                    "turn.seed_messages[{index}].offset_secs ({}) is out of range",
                    seed.offset_secs
                )));
            }
        }
        Ok(())
    }
}

impl PrepConfig {
    /// Validated response lists.
    ///
    /// # Errors
    ///
    /// Returns [`LumunusError::EmptyResponseList`] if any phase has no entries.
    pub fn responses(&self) -> Result<PrepResponses> {
        PrepResponses::new(
            self.responses.understanding.clone(),
            self.responses.framing.clone(),
            self.responses.ready.clone(),
        )
    }

    pub fn synthesizer(&self) -> FixedSynthesizer {
        FixedSynthesizer::new(self.synthesis.clone())
    }

    /// Checks thresholds, greeting and synthesis text.
    pub fn validate(&self) -> Result<()> {
        let PhaseThresholds {
            framing_at,
            ready_at,
        } = self.thresholds;
        if framing_at == 0 {
            return Err(LumunusError::config(
                "prep.thresholds.framing_at must be at least 1",
            ));
        }
        if framing_at > ready_at {
            return Err(LumunusError::config(format!(
                "prep.thresholds.framing_at ({framing_at}) must not exceed ready_at ({ready_at})"
            )));
        }
        if self.greeting.trim().is_empty() {
            return Err(LumunusError::config("prep.greeting must not be empty"));
        }
        if self.synthesis.message.trim().is_empty() {
            return Err(LumunusError::config("prep.synthesis.message must not be empty"));
        }
        if self.synthesis.summary.trim().is_empty() {
            return Err(LumunusError::config("prep.synthesis.summary must not be empty"));
        }
        Ok(())
    }
}

impl LumunusConfig {
    /// Parses a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or fails
    /// [`LumunusConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// `<config_dir>/lumunus/config.toml`, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads the file at [`LumunusConfig::default_path`], or defaults when absent.
    ///
    /// A file that exists but is invalid is still an error.
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Validates every section, reporting the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.turn.responses()?;
        self.turn.validate()?;
        self.prep.responses()?;
        self.prep.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = LumunusConfig::default();
        config.validate().unwrap();
        assert_eq!(config.turn.policy, SelectionPolicy::Cyclic);
        assert_eq!(config.prep.policy, SelectionPolicy::Random);
        assert_eq!(config.turn.seed_messages.len(), 3);
    }

    #[test]
    fn test_partial_toml_overrides_only_named_fields() {
        let config = LumunusConfig::from_toml_str(
            r#"
            [turn.delays]
            other_thinking_ms = 10

            [prep]
            seed = 7

            [prep.thresholds]
            framing_at = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.turn.delays.other_thinking_ms, 10);
        assert_eq!(config.turn.delays.ai_reply_ms, 2500);
        assert_eq!(config.prep.seed, Some(7));
        assert_eq!(config.prep.thresholds.framing_at, 2);
        assert_eq!(config.prep.thresholds.ready_at, 5);
        assert_eq!(config.prep.responses.ready.len(), 3);
    }

    #[test]
    fn test_empty_response_list_fails_validation() {
        let config = LumunusConfig::from_toml_str(
            r#"
            [turn.responses]
            ai = []
            "#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("turn.responses.ai"));
    }

    #[test]
    fn test_partial_turn_responses_keep_other_defaults() {
        let config = LumunusConfig::from_toml_str(
            r#"
            [turn.responses]
            other = ["x"]
            "#,
        )
        .unwrap();

        assert_eq!(config.turn.responses.other, vec!["x".to_string()]);
        assert_eq!(
            config.turn.responses.ai,
            presets::get_default_turn_responses().ai
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_prep_responses_keep_other_phases() {
        let config = LumunusConfig::from_toml_str(
            r#"
            [prep.responses]
            framing = ["What would help?"]
            "#,
        )
        .unwrap();

        let defaults = presets::get_default_prep_responses();
        assert_eq!(config.prep.responses.framing.len(), 1);
        assert_eq!(config.prep.responses.understanding, defaults.understanding);
        assert_eq!(config.prep.responses.ready, defaults.ready);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_synthesis_keeps_default_message() {
        let config = LumunusConfig::from_toml_str(
            r#"
            [prep.synthesis]
            summary = "You want a quiet week."
            "#,
        )
        .unwrap();

        assert_eq!(config.prep.synthesis.summary, "You want a quiet week.");
        assert_eq!(
            config.prep.synthesis.message,
            presets::get_default_synthesis().message
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_blank_text_fails_validation() {
        let config = LumunusConfig::from_toml_str(
            r#"
            [turn.responses]
            other = ["   "]
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("turn.responses.other[0]"));

        let mut config = LumunusConfig::default();
        config.prep.synthesis.message = " \n".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("prep.synthesis.message"));

        let mut config = LumunusConfig::default();
        config.turn.seed_messages[1].content = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("turn.seed_messages[1].content"));
    }

    #[test]
    fn test_out_of_range_seed_offset_fails_validation() {
        let mut config = LumunusConfig::default();
        config.turn.seed_messages[0].offset_secs = 100_000_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("turn.seed_messages[0].offset_secs"));

        config.turn.seed_messages[0].offset_secs = u64::MAX;
        assert!(config.turn.validate().is_err());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = LumunusConfig::default();
        config.prep.thresholds = PhaseThresholds {
            framing_at: 6,
            ready_at: 5,
        };
        assert!(config.validate().unwrap_err().is_config());

        config.prep.thresholds = PhaseThresholds {
            framing_at: 0,
            ready_at: 5,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = LumunusConfig::default();
        config.prep.seed = Some(99);
        config.turn.participants.other.name = "Sam".to_string();
        config.save(&path).unwrap();

        let loaded = LumunusConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = LumunusConfig::load(&temp_dir.path().join("absent.toml")).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_seed_message_sender_parsed() {
        let config = LumunusConfig::from_toml_str(
            r#"
            [[turn.seed_messages]]
            sender = "other"
            content = "Hi there"
            "#,
        )
        .unwrap();
        assert_eq!(config.turn.seed_messages.len(), 1);
        assert_eq!(config.turn.seed_messages[0].sender, Role::Other);
        assert_eq!(config.turn.seed_messages[0].offset_secs, 0);
    }
}
