pub mod api;
pub mod browser;
pub mod guard;

use async_trait::async_trait;

use crate::advisor::{Advice, Advisor};
use crate::error::{AppError, Result};
use crate::workflow::types::{AcceptanceOutcome, AcceptanceTarget, InvitationCandidate};

/// Something that can perform the side-effecting accept action.
#[async_trait]
pub trait AcceptanceSink: Send + Sync {
    fn name(&self) -> &str;

    /// Accept one invitation. `Ok(())` only when acceptance was confirmed.
    async fn accept(&self, candidate: &InvitationCandidate) -> Result<()>;
}

/// Sink for sources whose candidates never need accepting.
pub struct NoAcceptance;

#[async_trait]
impl AcceptanceSink for NoAcceptance {
    fn name(&self) -> &str {
        "none"
    }

    async fn accept(&self, candidate: &InvitationCandidate) -> Result<()> {
        Err(AppError::Internal(format!(
            "no acceptance mechanism configured for {}",
            candidate.acceptance
        )))
    }
}

/// Decide and, if allowed, perform the acceptance of one candidate.
///
/// Order: placeholder guard, then "nothing to accept", then the advisor,
/// then exactly one sink call. Never retries.
pub async fn accept_candidate(
    sink: &dyn AcceptanceSink,
    advisor: Option<&dyn Advisor>,
    candidate: &InvitationCandidate,
) -> AcceptanceOutcome {
    if let Some(reason) = guard::rejection_reason(candidate) {
        tracing::warn!(repo = %candidate.repo_full_name, reason = %reason, "Skipping invitation");
        return AcceptanceOutcome::skipped(candidate, format!("Skipped: {reason}"));
    }

    if candidate.acceptance == AcceptanceTarget::NotRequired {
        return AcceptanceOutcome::accepted(candidate, "No invitation required");
    }

    if let Some(advisor) = advisor {
        match advisor.review(candidate).await {
            Ok(Advice::Accept) => {
                tracing::debug!(repo = %candidate.repo_full_name, "Advisor approved invitation");
            }
            Ok(Advice::Skip { reason }) => {
                tracing::info!(repo = %candidate.repo_full_name, reason = %reason, "Advisor declined invitation");
                return AcceptanceOutcome::skipped(candidate, format!("Skipped by advisor: {reason}"));
            }
            Err(e) => {
                tracing::warn!(
                    repo = %candidate.repo_full_name,
                    error = %e,
                    "Advisor failed, falling back to direct execution"
                );
            }
        }
    }

    tracing::info!(
        repo = %candidate.repo_full_name,
        sink = sink.name(),
        target = %candidate.acceptance,
        "Accepting invitation"
    );

    match sink.accept(candidate).await {
        Ok(()) => {
            tracing::info!(repo = %candidate.repo_full_name, "Invitation accepted");
            AcceptanceOutcome::accepted(candidate, "Invitation accepted successfully")
        }
        Err(AppError::Timeout(msg)) => {
            tracing::error!(repo = %candidate.repo_full_name, error = %msg, "Acceptance timed out");
            AcceptanceOutcome::error(candidate, format!("Acceptance timed out: {msg}"))
        }
        Err(e) => {
            tracing::error!(repo = %candidate.repo_full_name, error = %e, "Acceptance failed");
            AcceptanceOutcome::error(candidate, e.to_string())
        }
    }
}

/// Run every candidate through [`accept_candidate`] in discovery order.
/// Outcomes are pushed as they complete so an interrupted run keeps them.
pub async fn accept_all(
    sink: &dyn AcceptanceSink,
    advisor: Option<&dyn Advisor>,
    candidates: &[InvitationCandidate],
    outcomes: &mut Vec<AcceptanceOutcome>,
) {
    for candidate in candidates {
        outcomes.push(accept_candidate(sink, advisor, candidate).await);
    }
}
