//! Engine configuration.

use log::warn;
use serde::Deserialize;

const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 5;
const DEFAULT_MAX_REPLAY_ROUND: u32 = 3;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Read-modify-write attempts before a conflict is reported to the caller.
    pub max_commit_attempts: u32,
    /// Last round at which a fully tied preliminary group is replayed.
    pub max_replay_round: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            max_replay_round: DEFAULT_MAX_REPLAY_ROUND,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON object such as `{"maxCommitAttempts": 8}`; missing keys keep
    /// their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(raw)?;
        Ok(config.sanitized())
    }

    /// `KENDO_ENGINE_CONFIG` (JSON) when set, then per-key overrides from
    /// `KENDO_MAX_COMMIT_ATTEMPTS` / `KENDO_MAX_REPLAY_ROUND`.
    pub fn from_env() -> Self {
        let base = match std::env::var("KENDO_ENGINE_CONFIG") {
            Ok(raw) => Self::from_json(&raw).unwrap_or_else(|e| {
                warn!("Ignoring invalid KENDO_ENGINE_CONFIG: {e}");
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        Self {
            max_commit_attempts: env_u32("KENDO_MAX_COMMIT_ATTEMPTS")
                .unwrap_or(base.max_commit_attempts),
            max_replay_round: env_u32("KENDO_MAX_REPLAY_ROUND").unwrap_or(base.max_replay_round),
        }
        .sanitized()
    }

    /// At least one commit attempt is always made.
    fn sanitized(mut self) -> Self {
        if self.max_commit_attempts == 0 {
            self.max_commit_attempts = DEFAULT_MAX_COMMIT_ATTEMPTS;
        }
        self
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
