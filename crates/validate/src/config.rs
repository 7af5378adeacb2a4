//! Validator configuration, read from `PHASEGATE_*` environment variables by binaries.

use std::time::Duration;

/// Field manager used for dry-run server-side apply unless overridden.
pub const DEFAULT_FIELD_MANAGER: &str = "phasegate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// SSA field manager identity for dry-run patches.
    pub field_manager: String,
    /// Deadline for a single dry-run round trip (apply plus optional create fallback).
    pub dry_run_timeout: Option<Duration>,
    /// Cluster-wide mode: objects may target namespaces other than the owner's.
    pub allow_namespace_escalation: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { field_manager: DEFAULT_FIELD_MANAGER.to_string(), dry_run_timeout: None, allow_namespace_escalation: false }
    }
}

impl ValidatorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let field_manager = get("PHASEGATE_FIELD_MANAGER")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FIELD_MANAGER.to_string());
        let dry_run_timeout = get("PHASEGATE_DRY_RUN_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        let allow_namespace_escalation = get("PHASEGATE_ALLOW_NS_ESCALATION")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self { field_manager, dry_run_timeout, allow_namespace_escalation }
    }

    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = field_manager.into();
        self
    }

    pub fn with_dry_run_timeout(mut self, timeout: Duration) -> Self {
        self.dry_run_timeout = Some(timeout);
        self
    }

    pub fn with_namespace_escalation(mut self, allow: bool) -> Self {
        self.allow_namespace_escalation = allow;
        self
    }
}
