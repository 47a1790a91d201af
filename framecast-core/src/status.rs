//! Status normalization
//!
//! Every provider reports job progress in its own vocabulary ("Success",
//! "completed", "SUCCEEDED", ...). Each provider owns a [`StatusVocabulary`]
//! table, and [`normalize`] maps a raw value onto a [`CanonicalState`].
//!
//! Unrecognized values map to [`CanonicalState::Unknown`], which is not
//! terminal by itself. Whether repeated unknown statuses end a job is a
//! poller policy, not a normalizer decision.

use serde::{Deserialize, Serialize};

use crate::domain::provider::ProviderKind;

/// Provider-independent lifecycle stage reported by a status query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalState {
    Queued,
    Preparing,
    Processing,
    Succeeded,
    Failed,
    Unknown,
}

impl CanonicalState {
    /// Whether the remote job will not change state any more
    pub fn is_terminal(&self) -> bool {
        matches!(self, CanonicalState::Succeeded | CanonicalState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalState::Queued => "queued",
            CanonicalState::Preparing => "preparing",
            CanonicalState::Processing => "processing",
            CanonicalState::Succeeded => "succeeded",
            CanonicalState::Failed => "failed",
            CanonicalState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CanonicalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mapping table from one provider's raw status strings to canonical states
#[derive(Debug)]
pub struct StatusVocabulary {
    entries: &'static [(&'static str, CanonicalState)],
    case_sensitive: bool,
}

impl StatusVocabulary {
    pub const fn new(
        entries: &'static [(&'static str, CanonicalState)],
        case_sensitive: bool,
    ) -> Self {
        Self {
            entries,
            case_sensitive,
        }
    }

    /// Looks up a raw status, ignoring surrounding whitespace
    pub fn lookup(&self, raw: &str) -> CanonicalState {
        let raw = raw.trim();

        self.entries
            .iter()
            .find(|(known, _)| {
                if self.case_sensitive {
                    *known == raw
                } else {
                    known.eq_ignore_ascii_case(raw)
                }
            })
            .map(|(_, state)| *state)
            .unwrap_or(CanonicalState::Unknown)
    }

    /// The documented raw values, in table order
    pub fn entries(&self) -> &'static [(&'static str, CanonicalState)] {
        self.entries
    }
}

// MiniMax reports CamelCase words and is matched exactly. Its "Unknown" value
// is deliberately absent so that it normalizes to CanonicalState::Unknown.
static MINIMAX: StatusVocabulary = StatusVocabulary::new(
    &[
        ("Queueing", CanonicalState::Queued),
        ("Preparing", CanonicalState::Preparing),
        ("Processing", CanonicalState::Processing),
        ("Success", CanonicalState::Succeeded),
        ("Fail", CanonicalState::Failed),
    ],
    true,
);

static PIAPI_KLING: StatusVocabulary = StatusVocabulary::new(
    &[
        ("pending", CanonicalState::Queued),
        ("staged", CanonicalState::Queued),
        ("processing", CanonicalState::Processing),
        ("completed", CanonicalState::Succeeded),
        ("failed", CanonicalState::Failed),
    ],
    false,
);

static RUNWAY: StatusVocabulary = StatusVocabulary::new(
    &[
        ("PENDING", CanonicalState::Queued),
        ("THROTTLED", CanonicalState::Queued),
        ("RUNNING", CanonicalState::Processing),
        ("SUCCEEDED", CanonicalState::Succeeded),
        ("FAILED", CanonicalState::Failed),
        ("CANCELLED", CanonicalState::Failed),
    ],
    true,
);

/// Returns the status vocabulary of a provider
pub fn vocabulary(provider: ProviderKind) -> &'static StatusVocabulary {
    match provider {
        ProviderKind::MiniMax => &MINIMAX,
        ProviderKind::PiApiKling => &PIAPI_KLING,
        ProviderKind::Runway => &RUNWAY,
    }
}

/// Maps a provider's raw status value onto the canonical model
pub fn normalize(provider: ProviderKind, raw: &str) -> CanonicalState {
    vocabulary(provider).lookup(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimax_vocabulary() {
        let p = ProviderKind::MiniMax;
        assert_eq!(normalize(p, "Queueing"), CanonicalState::Queued);
        assert_eq!(normalize(p, "Preparing"), CanonicalState::Preparing);
        assert_eq!(normalize(p, "Processing"), CanonicalState::Processing);
        assert_eq!(normalize(p, "Success"), CanonicalState::Succeeded);
        assert_eq!(normalize(p, "Fail"), CanonicalState::Failed);
    }

    #[test]
    fn test_minimax_unknown_is_not_failure() {
        assert_eq!(
            normalize(ProviderKind::MiniMax, "Unknown"),
            CanonicalState::Unknown
        );
        // exact match only
        assert_eq!(
            normalize(ProviderKind::MiniMax, "success"),
            CanonicalState::Unknown
        );
    }

    #[test]
    fn test_piapi_vocabulary_ignores_case() {
        let p = ProviderKind::PiApiKling;
        assert_eq!(normalize(p, "pending"), CanonicalState::Queued);
        assert_eq!(normalize(p, "Staged"), CanonicalState::Queued);
        assert_eq!(normalize(p, "Processing"), CanonicalState::Processing);
        assert_eq!(normalize(p, "completed"), CanonicalState::Succeeded);
        assert_eq!(normalize(p, "Completed"), CanonicalState::Succeeded);
        assert_eq!(normalize(p, "FAILED"), CanonicalState::Failed);
    }

    #[test]
    fn test_runway_vocabulary() {
        let p = ProviderKind::Runway;
        assert_eq!(normalize(p, "PENDING"), CanonicalState::Queued);
        assert_eq!(normalize(p, "THROTTLED"), CanonicalState::Queued);
        assert_eq!(normalize(p, "RUNNING"), CanonicalState::Processing);
        assert_eq!(normalize(p, "SUCCEEDED"), CanonicalState::Succeeded);
        assert_eq!(normalize(p, "FAILED"), CanonicalState::Failed);
        assert_eq!(normalize(p, "CANCELLED"), CanonicalState::Failed);
    }

    #[test]
    fn test_unrecognized_values_are_unknown() {
        for provider in [
            ProviderKind::MiniMax,
            ProviderKind::PiApiKling,
            ProviderKind::Runway,
        ] {
            assert_eq!(normalize(provider, ""), CanonicalState::Unknown);
            assert_eq!(normalize(provider, "exploded"), CanonicalState::Unknown);
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(
            normalize(ProviderKind::Runway, " RUNNING\n"),
            CanonicalState::Processing
        );
    }

    #[test]
    fn test_every_table_entry_round_trips() {
        for provider in [
            ProviderKind::MiniMax,
            ProviderKind::PiApiKling,
            ProviderKind::Runway,
        ] {
            for (raw, state) in vocabulary(provider).entries() {
                assert_eq!(normalize(provider, raw), *state, "{provider}: {raw}");
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(CanonicalState::Succeeded.is_terminal());
        assert!(CanonicalState::Failed.is_terminal());
        assert!(!CanonicalState::Unknown.is_terminal());
        assert!(!CanonicalState::Processing.is_terminal());
    }
}
