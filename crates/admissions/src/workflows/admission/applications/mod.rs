//! Application lifecycle manager: intake validation, creation caps,
//! eligibility, numbering, submission, and officer review.

pub mod domain;
pub mod intake;
pub mod numbering;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationDetails, ApplicationNumber, ApplicationStatus, ApplicationView,
    Eligibility, ReviewDecision, ReviewRecord, StudentId, TransitionError,
};
pub use intake::{ApplicationIntake, IntakeError};
pub use numbering::ApplicationNumberSequence;
pub use repository::{ApplicationRepository, RepositoryError};
pub use router::{admission_router, AdmissionState};
pub use service::{
    ApplicationService, ApplicationServiceError, ReviewOutcome, SeatOutcome, SubmitOutcome,
};
