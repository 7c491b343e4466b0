//! Sensitivity-aware request policy
//!
//! A [`RequestPolicy`] is derived exactly once per inbound request from the
//! sensitivity signal supplied by the classifier (or a request flag) plus
//! the static [`SensitivityConfig`]. Caching, tool-result persistence and
//! redaction all read its projections; none of them re-derive the decision.

use serde::{Deserialize, Serialize};

/// How a sensitive request's artefacts are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlingMode {
    /// Persist, but with sensitive values redacted
    #[default]
    Redact,
    /// Persist only metadata about the artefact
    MetadataOnly,
    /// Persist nothing
    DisablePersistence,
}

/// Static defaults governing sensitive requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Mode used when the signal carries none
    pub handling_mode: HandlingMode,
    /// Skip the semantic cache for sensitive requests
    pub disable_caching_when_sensitive: bool,
    /// Skip tool-result persistence for sensitive requests
    pub disable_tool_result_persistence_when_sensitive: bool,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            handling_mode: HandlingMode::Redact,
            disable_caching_when_sensitive: true,
            disable_tool_result_persistence_when_sensitive: true,
        }
    }
}

/// Classification result handed to the core by an external classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivitySignal {
    /// Whether the request carries PII or secrets
    pub contains_sensitive: bool,
    /// Per-request override of the configured handling mode
    pub handling_mode: Option<HandlingMode>,
}

impl SensitivitySignal {
    /// A signal for a request without sensitive content.
    pub fn clean() -> Self {
        Self::default()
    }

    /// A signal for a sensitive request using the configured mode.
    pub fn sensitive() -> Self {
        Self {
            contains_sensitive: true,
            handling_mode: None,
        }
    }

    /// Override the handling mode.
    #[must_use]
    pub fn with_mode(mut self, mode: HandlingMode) -> Self {
        self.handling_mode = Some(mode);
        self
    }
}

/// What may be written to the tool-result store for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceDecision {
    /// Store the result as returned
    Full,
    /// Store the result with sensitive values redacted
    Redacted,
    /// Store only metadata (tool, size, timing)
    MetadataOnly,
    /// Store nothing
    Skip,
}

/// Immutable per-request policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPolicy {
    contains_sensitive: bool,
    handling_mode: HandlingMode,
    disable_caching_when_sensitive: bool,
    disable_tool_result_persistence_when_sensitive: bool,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self::derive(SensitivitySignal::clean(), &SensitivityConfig::default())
    }
}

impl RequestPolicy {
    /// Policy with the default configuration.
    pub fn new(contains_sensitive: bool, handling_mode: HandlingMode) -> Self {
        Self::derive(
            SensitivitySignal {
                contains_sensitive,
                handling_mode: Some(handling_mode),
            },
            &SensitivityConfig::default(),
        )
    }

    /// Derive the policy for one request.
    pub fn derive(signal: SensitivitySignal, config: &SensitivityConfig) -> Self {
        Self {
            contains_sensitive: signal.contains_sensitive,
            handling_mode: signal.handling_mode.unwrap_or(config.handling_mode),
            disable_caching_when_sensitive: config.disable_caching_when_sensitive,
            disable_tool_result_persistence_when_sensitive: config
                .disable_tool_result_persistence_when_sensitive,
        }
    }

    pub fn contains_sensitive(&self) -> bool {
        self.contains_sensitive
    }

    pub fn handling_mode(&self) -> HandlingMode {
        self.handling_mode
    }

    pub fn disable_caching_when_sensitive(&self) -> bool {
        self.disable_caching_when_sensitive
    }

    pub fn disable_tool_result_persistence_when_sensitive(&self) -> bool {
        self.disable_tool_result_persistence_when_sensitive
    }

    /// The semantic cache must be neither read nor written.
    pub fn should_bypass_cache(&self) -> bool {
        self.contains_sensitive && self.disable_caching_when_sensitive
    }

    pub fn should_disable_tool_result_persistence(&self) -> bool {
        self.contains_sensitive && self.disable_tool_result_persistence_when_sensitive
    }

    pub fn should_redact(&self) -> bool {
        self.contains_sensitive && self.handling_mode == HandlingMode::Redact
    }

    pub fn is_metadata_only(&self) -> bool {
        self.contains_sensitive && self.handling_mode == HandlingMode::MetadataOnly
    }

    pub fn disable_persistence(&self) -> bool {
        self.contains_sensitive && self.handling_mode == HandlingMode::DisablePersistence
    }

    /// Project the policy onto tool-result storage.
    ///
    /// The most restrictive projection wins: an explicit persistence switch
    /// or `DisablePersistence` mode skips storage, then metadata-only, then
    /// redaction.
    pub fn persistence_decision(&self) -> PersistenceDecision {
        if self.should_disable_tool_result_persistence() || self.disable_persistence() {
            PersistenceDecision::Skip
        } else if self.is_metadata_only() {
            PersistenceDecision::MetadataOnly
        } else if self.should_redact() {
            PersistenceDecision::Redacted
        } else {
            PersistenceDecision::Full
        }
    }
}
