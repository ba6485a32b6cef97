//! Document verification port.

use std::sync::Arc;

use async_trait::async_trait;
use domain::Order;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("verification service unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a verification pass over the customer's documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every required document is present and verified.
    Verified,

    /// Something is missing or rejected; the order must not proceed.
    Incomplete { reason: String },
}

/// Port to the document verification service.
#[async_trait]
pub trait DocumentVerification: Send + Sync {
    async fn verify(&self, order: &Order) -> Result<Verdict, VerificationError>;
}

#[derive(Default)]
struct VerifierState {
    unavailable: Option<String>,
    verdict: Option<Verdict>,
}

/// In-memory verifier for tests and the demo server. Verifies everything
/// unless told otherwise.
#[derive(Clone, Default)]
pub struct InMemoryVerifier {
    state: Arc<RwLock<VerifierState>>,
}

impl InMemoryVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail as if the service were down.
    pub async fn set_unavailable(&self, message: impl Into<String>) {
        self.state.write().await.unavailable = Some(message.into());
    }

    /// Makes subsequent calls return an incomplete verdict.
    pub async fn set_incomplete(&self, reason: impl Into<String>) {
        self.state.write().await.verdict = Some(Verdict::Incomplete {
            reason: reason.into(),
        });
    }
}

#[async_trait]
impl DocumentVerification for InMemoryVerifier {
    async fn verify(&self, _order: &Order) -> Result<Verdict, VerificationError> {
        let state = self.state.read().await;
        if let Some(message) = &state.unavailable {
            return Err(VerificationError::Unavailable(message.clone()));
        }
        Ok(state.verdict.clone().unwrap_or(Verdict::Verified))
    }
}
