//! Officer-facing review gateway.
//!
//! Thin, stateless orchestration: confirm the reviewer carries the Officer
//! capability, then hand the decision to the lifecycle manager and surface
//! the combined approval + seat outcome.

use std::sync::Arc;

use super::applications::domain::{ApplicationNumber, ReviewDecision};
use super::applications::repository::ApplicationRepository;
use super::applications::service::{
    ApplicationService, ApplicationServiceError, ReviewOutcome,
};
use super::catalog::CourseCatalog;
use super::identity::{Capability, Identity};
use super::seats::SeatLedger;

pub struct ReviewGateway<R, C, L> {
    applications: Arc<ApplicationService<R, C, L>>,
}

impl<R, C, L> ReviewGateway<R, C, L>
where
    R: ApplicationRepository,
    C: CourseCatalog,
    L: SeatLedger,
{
    pub fn new(applications: Arc<ApplicationService<R, C, L>>) -> Self {
        Self { applications }
    }

    pub fn review(
        &self,
        reviewer: &Identity,
        number: &ApplicationNumber,
        decision: ReviewDecision,
        notes: String,
    ) -> Result<ReviewOutcome, ReviewGatewayError> {
        if !reviewer.has(Capability::Officer) {
            return Err(ReviewGatewayError::Forbidden);
        }
        Ok(self
            .applications
            .review(number, &reviewer.id, decision, notes)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewGatewayError {
    #[error("officer capability required")]
    Forbidden,
    #[error(transparent)]
    Application(#[from] ApplicationServiceError),
}
