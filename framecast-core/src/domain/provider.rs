//! Provider domain model
//!
//! Identifies which third-party generation service owns a job.

use serde::{Deserialize, Serialize};

/// A supported image-to-video provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// MiniMax Hailuo video generation API
    MiniMax,

    /// Kling models served through PiAPI
    PiApiKling,

    /// Runway image-to-video task API
    Runway,
}

impl ProviderKind {
    /// Short machine-friendly name, used in filenames and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::MiniMax => "minimax",
            ProviderKind::PiApiKling => "kling",
            ProviderKind::Runway => "runway",
        }
    }

    /// Human-readable provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::MiniMax => "MiniMax Hailuo",
            ProviderKind::PiApiKling => "PiAPI Kling",
            ProviderKind::Runway => "Runway",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
