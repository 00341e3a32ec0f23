//! Orchestrator timing and recognition settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for node handlers and gateway calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Pause after a prompt is submitted before auto-advancing
    #[serde(default = "default_say_grace", with = "duration_ms")]
    pub say_grace: Duration,

    /// Pause after a decision node before auto-advancing
    #[serde(default = "default_decision_pause", with = "duration_ms")]
    pub decision_pause: Duration,

    /// Time left for the final prompt before hanging up
    #[serde(default = "default_end_grace", with = "duration_ms")]
    pub end_grace: Duration,

    /// Upper bound for every gateway call
    #[serde(default = "default_gateway_timeout", with = "duration_ms")]
    pub gateway_timeout: Duration,

    /// Language passed when arming recognition
    #[serde(default = "default_language")]
    pub recognition_language: String,

    /// Ask the recognizer for interim results
    #[serde(default = "default_interim_results")]
    pub interim_results: bool,
}

fn default_say_grace() -> Duration {
    Duration::from_secs(2)
}

fn default_decision_pause() -> Duration {
    Duration::from_millis(500)
}

fn default_end_grace() -> Duration {
    Duration::from_secs(3)
}

fn default_gateway_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_interim_results() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            say_grace: default_say_grace(),
            decision_pause: default_decision_pause(),
            end_grace: default_end_grace(),
            gateway_timeout: default_gateway_timeout(),
            recognition_language: default_language(),
            interim_results: default_interim_results(),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
