//! Failure-suppression state machine.
//!
//! One instance per target. Decides whether a failure is worth logging; the
//! log sink itself lives with the caller.

/// Whether the current run of failures has already been reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportState {
    /// Next failure is reported.
    #[default]
    NotReported,
    /// A failure was reported; further ones are suppressed until a success.
    Reported,
}

impl ReportState {
    /// Record a failure. Returns `true` if this failure should be emitted.
    pub fn record_failure(&mut self) -> bool {
        match self {
            ReportState::NotReported => {
                *self = ReportState::Reported;
                true
            }
            ReportState::Reported => false,
        }
    }

    /// Record a success. Returns `true` if it ends a reported failure run.
    pub fn record_success(&mut self) -> bool {
        std::mem::take(self) == ReportState::Reported
    }

    pub fn is_reported(self) -> bool {
        self == ReportState::Reported
    }
}
