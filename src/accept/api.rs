use std::sync::Arc;

use async_trait::async_trait;

use crate::accept::AcceptanceSink;
use crate::error::{AppError, Result};
use crate::platform::Platform;
use crate::workflow::types::{AcceptanceTarget, InvitationCandidate};

/// Accepts invitations by ID through the platform's REST API.
pub struct ApiAcceptor {
    platform: Arc<dyn Platform>,
}

impl ApiAcceptor {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl AcceptanceSink for ApiAcceptor {
    fn name(&self) -> &str {
        "api"
    }

    async fn accept(&self, candidate: &InvitationCandidate) -> Result<()> {
        let AcceptanceTarget::Id(id) = candidate.acceptance else {
            return Err(AppError::Internal(format!(
                "API acceptance needs an invitation ID, got {}",
                candidate.acceptance
            )));
        };

        self.platform.accept_repository_invitation(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accept::accept_candidate;
    use crate::accept::tests::candidate;
    use crate::discovery::github::tests::FakePlatform;
    use crate::workflow::types::AcceptanceStatus;

    #[tokio::test]
    async fn test_accepts_by_id() {
        let platform = Arc::new(FakePlatform {
            accept_status_ok: true,
            ..Default::default()
        });
        let acceptor = ApiAcceptor::new(platform.clone());

        let outcome =
            accept_candidate(&acceptor, None, &candidate("octo/widgets", AcceptanceTarget::Id(42))).await;

        assert_eq!(outcome.status, AcceptanceStatus::Accepted);
        assert_eq!(*platform.accepted.lock().unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn test_non_204_is_an_error() {
        let platform = Arc::new(FakePlatform::default());
        let acceptor = ApiAcceptor::new(platform.clone());

        let outcome =
            accept_candidate(&acceptor, None, &candidate("octo/widgets", AcceptanceTarget::Id(42))).await;

        assert_eq!(outcome.status, AcceptanceStatus::Error);
        assert!(outcome.message.contains("404"));
    }

    #[tokio::test]
    async fn test_url_target_is_refused() {
        let platform = Arc::new(FakePlatform {
            accept_status_ok: true,
            ..Default::default()
        });
        let acceptor = ApiAcceptor::new(platform.clone());
        let c = candidate(
            "octo/widgets",
            AcceptanceTarget::Url("https://github.com/octo/widgets/invitations".to_string()),
        );

        assert!(acceptor.accept(&c).await.is_err());
        assert!(platform.accepted.lock().unwrap().is_empty());
    }
}
