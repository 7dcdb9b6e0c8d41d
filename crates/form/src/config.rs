//! Binding configuration

use serde::{Deserialize, Serialize};

/// How passes of one binding interact when they overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassPolicy {
    /// Passes run independently. A whole-model pass and a field pass on the
    /// same field race, and whichever commits last wins.
    #[default]
    Concurrent,
    /// Passes run one at a time, in the order they were dispatched.
    Serialized,
    /// Passes run independently but a pass does not commit once a newer
    /// pass covering the same fields has committed.
    LatestWins,
}

/// Configuration for a form validation binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormValidationConfig {
    /// Overlap policy for passes
    pub pass_policy: PassPolicy,
    /// Consult fallback discovery when the registry has no validator
    pub fallback_discovery: bool,
    /// Emit "validation state changed" after a failed pass as well
    pub notify_on_failure: bool,
}

impl Default for FormValidationConfig {
    fn default() -> Self {
        Self {
            pass_policy: PassPolicy::Concurrent,
            fallback_discovery: true,
            notify_on_failure: false,
        }
    }
}

impl FormValidationConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized passes, registry-only resolution.
    pub fn strict() -> Self {
        Self {
            pass_policy: PassPolicy::Serialized,
            fallback_discovery: false,
            notify_on_failure: false,
        }
    }

    /// Set the pass policy
    #[must_use = "builder methods must be chained or built"]
    pub fn with_pass_policy(mut self, policy: PassPolicy) -> Self {
        self.pass_policy = policy;
        self
    }

    /// Enable or disable fallback discovery
    #[must_use = "builder methods must be chained or built"]
    pub fn with_fallback_discovery(mut self, enabled: bool) -> Self {
        self.fallback_discovery = enabled;
        self
    }

    /// Enable or disable the signal after failed passes
    #[must_use = "builder methods must be chained or built"]
    pub fn with_notify_on_failure(mut self, enabled: bool) -> Self {
        self.notify_on_failure = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_keys_take_defaults() {
        let config: FormValidationConfig =
            serde_json::from_str(r#"{ "pass_policy": "latest_wins" }"#).unwrap();

        assert_eq!(
            config,
            FormValidationConfig::new().with_pass_policy(PassPolicy::LatestWins)
        );
    }

    #[test]
    fn strict_preset() {
        let config = FormValidationConfig::strict();
        assert_eq!(config.pass_policy, PassPolicy::Serialized);
        assert!(!config.fallback_discovery);
    }

    #[test]
    fn serializes_policy_in_snake_case() {
        let json = serde_json::to_value(FormValidationConfig::default()).unwrap();
        assert_eq!(json["pass_policy"], "concurrent");
    }
}
