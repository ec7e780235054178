//! Per-channel failure reporter (log-flood guard).
//!
//! Wraps [`ReportState`] behind its own lock and emits `tracing` events.
//! A target that stays broken logs once, not on every scrape.

use std::sync::Mutex;

use scrapebridge_core::{BridgeError, ReportState};

#[derive(Debug)]
pub struct FailureReporter {
    label: String,
    state: Mutex<ReportState>,
}

impl FailureReporter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(ReportState::default()),
        }
    }

    /// Log `error` unless this failure run was already reported.
    /// Returns whether anything was emitted.
    ///
    /// Exactly one event per failure run; it says that repeats are muted.
    pub fn failure(&self, stage: &str, error: &BridgeError, detail: Option<&str>) -> bool {
        if !self.with_state(ReportState::record_failure) {
            return false;
        }
        match detail {
            Some(detail) => tracing::warn!(
                channel = %self.label,
                stage,
                kind = error.kind(),
                error = %error,
                detail,
                "channel query failed; further failures suppressed until success"
            ),
            None => tracing::warn!(
                channel = %self.label,
                stage,
                kind = error.kind(),
                error = %error,
                "channel query failed; further failures suppressed until success"
            ),
        }
        true
    }

    /// Clear the suppression flag. Returns whether this ended a reported run.
    pub fn success(&self) -> bool {
        let recovered = self.with_state(ReportState::record_success);
        if recovered {
            tracing::debug!(channel = %self.label, "channel recovered");
        }
        recovered
    }

    pub fn is_reported(&self) -> bool {
        self.with_state(|s| s.is_reported())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ReportState) -> T) -> T {
        // The flag is valid even if a holder panicked.
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut *guard)
    }
}
