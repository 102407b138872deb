use std::fmt;

use serde::{Deserialize, Serialize};

/// The machine-readable reason carried on an `ErrorRaised` message (§7).
///
/// These are kinds, not Rust exception types: every one of them is
/// reified into a message rather than unwound past the engine's
/// boundary, so a caller never sees this type in a `Result::Err` from
/// [`crate::Execution::complete`] — it only ever appears as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// Response without a matching request; shape mismatch between a
    /// logged request and the call it's supposed to stand in for; extra
    /// logged interactions beyond what replay produced; a snapshot for
    /// an identity the engine wasn't tracking.
    LogInconsistency,
    /// The replayed method diverged from the log: a different
    /// interaction, different arguments, or a different order than what
    /// was already recorded.
    NonDeterminism,
    /// The entity method itself terminated abnormally.
    DomainFailure,
    /// The input stream itself is malformed: offsets not strictly
    /// increasing, more than one top-level request, or a missing
    /// top-level request when method progress is expected.
    ContractViolation,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogInconsistency => write!(f, "log inconsistency"),
            Self::NonDeterminism => write!(f, "non-determinism"),
            Self::DomainFailure => write!(f, "domain failure"),
            Self::ContractViolation => write!(f, "contract violation"),
        }
    }
}

/// An engine-detected fault, carrying the taxonomy kind plus a
/// human-readable detail string. Never propagated as a Rust error past
/// [`crate::Execution::complete`] — always converted into an
/// `ErrorRaised` message before it crosses that boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: FaultKind,
    pub detail: String,
}

impl Fault {
    pub fn new(kind: FaultKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn log_inconsistency(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::LogInconsistency, detail)
    }

    pub fn non_determinism(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::NonDeterminism, detail)
    }

    pub fn contract_violation(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::ContractViolation, detail)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_display_includes_kind_and_detail() {
        let fault = Fault::non_determinism("expected Article.add_comment, got Article.delete");
        assert_eq!(
            fault.to_string(),
            "non-determinism: expected Article.add_comment, got Article.delete"
        );
    }
}
