use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::domain::{
    Application, ApplicationDetails, ApplicationNumber, ApplicationStatus, Eligibility,
    ReviewDecision, ReviewRecord, StudentId, TransitionError,
};
use super::numbering::ApplicationNumberSequence;
use super::repository::{ApplicationRepository, RepositoryError};
use crate::config::AdmissionPolicy;
use crate::workflows::admission::catalog::{CatalogError, CourseCatalog, CourseCode};
use crate::workflows::admission::seats::{
    SeatAllocation, SeatAllocationError, SeatAllocationService, SeatLedger,
};

/// Owns the application state machine: creation caps, eligibility, numbering,
/// submission, and officer review.
pub struct ApplicationService<R, C, L> {
    repository: Arc<R>,
    catalog: Arc<C>,
    seats: SeatAllocationService<L, C>,
    numbers: Arc<ApplicationNumberSequence>,
    policy: AdmissionPolicy,
}

/// Result of a submission attempt. Submitting an already-submitted
/// application is a warning, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(Application),
    AlreadySubmitted(Application),
}

impl SubmitOutcome {
    pub fn application(&self) -> &Application {
        match self {
            SubmitOutcome::Submitted(application)
            | SubmitOutcome::AlreadySubmitted(application) => application,
        }
    }
}

/// What happened on the seat side of a review decision. Approval stands on
/// its own; a denied seat is reported, never rolled back.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatOutcome {
    Allocated(SeatAllocation),
    NoCapacity,
    AlreadySeated,
    NotRequested,
}

impl SeatOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            SeatOutcome::Allocated(_) => "allocated",
            SeatOutcome::NoCapacity => "no_capacity",
            SeatOutcome::AlreadySeated => "already_seated",
            SeatOutcome::NotRequested => "not_requested",
        }
    }
}

/// Combined review result surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub application: Application,
    pub seat: SeatOutcome,
}

impl<R, C, L> ApplicationService<R, C, L>
where
    R: ApplicationRepository,
    C: CourseCatalog,
    L: SeatLedger,
{
    pub fn new(
        repository: Arc<R>,
        catalog: Arc<C>,
        ledger: Arc<L>,
        policy: AdmissionPolicy,
    ) -> Self {
        Self::with_sequence(
            repository,
            catalog,
            ledger,
            Arc::new(ApplicationNumberSequence::new()),
            policy,
        )
    }

    /// Build the service around an existing number sequence, e.g. one resumed
    /// above the numbers already present in storage.
    pub fn with_sequence(
        repository: Arc<R>,
        catalog: Arc<C>,
        ledger: Arc<L>,
        numbers: Arc<ApplicationNumberSequence>,
        policy: AdmissionPolicy,
    ) -> Self {
        let seats = SeatAllocationService::new(
            ledger,
            Arc::clone(&catalog),
            policy.confirmation_window_days,
        );
        Self {
            repository,
            catalog,
            seats,
            numbers,
            policy,
        }
    }

    /// Create a draft application for `student` against `course_code`.
    ///
    /// The duplicate-pair and active-cap checks run here for early feedback,
    /// but the repository's unique constraints are what actually close the
    /// race between concurrent creations.
    pub fn create(
        &self,
        student: &StudentId,
        course_code: &CourseCode,
        details: ApplicationDetails,
    ) -> Result<Application, ApplicationServiceError> {
        let course = self.catalog.get(course_code)?;

        if self.repository.exists_for(student, course_code)? {
            return Err(ApplicationServiceError::DuplicateApplication);
        }

        let active = self.repository.active_count(student)?;
        if active >= self.policy.max_active_applications {
            return Err(ApplicationServiceError::LimitExceeded {
                active,
                limit: self.policy.max_active_applications,
            });
        }

        let eligibility = Eligibility::evaluate(details.percentage_obtained, &course);
        let created_at = Utc::now();
        let application = Application {
            application_number: self.numbers.next(created_at.year()),
            student: student.clone(),
            course: course.code.clone(),
            details,
            eligibility,
            status: ApplicationStatus::Draft,
            submission_date: None,
            review: None,
            created_at,
        };

        let stored = self.repository.insert(application).map_err(|err| match err {
            RepositoryError::DuplicatePair => ApplicationServiceError::DuplicateApplication,
            other => ApplicationServiceError::Repository(other),
        })?;

        info!(
            application = %stored.application_number,
            course = %stored.course,
            eligible = stored.eligibility.eligible,
            "application created"
        );
        Ok(stored)
    }

    /// Move the student's draft to Submitted, stamping the submission time.
    ///
    /// The owner check mirrors an object-level lookup scoped to the student:
    /// someone else's application is simply not found.
    pub fn submit(
        &self,
        student: &StudentId,
        number: &ApplicationNumber,
    ) -> Result<SubmitOutcome, ApplicationServiceError> {
        let mut application = self.owned_application(student, number)?;

        match application.status {
            ApplicationStatus::Draft => {
                application
                    .transition(ApplicationStatus::Submitted)
                    .map_err(ApplicationServiceError::from)?;
                application.submission_date = Some(Utc::now());
                self.repository.update(application.clone())?;
                info!(application = %application.application_number, "application submitted");
                Ok(SubmitOutcome::Submitted(application))
            }
            ApplicationStatus::Submitted => {
                warn!(
                    application = %application.application_number,
                    "application was already submitted"
                );
                Ok(SubmitOutcome::AlreadySubmitted(application))
            }
            other => Err(ApplicationServiceError::InvalidTransition {
                from: other,
                to: ApplicationStatus::Submitted,
            }),
        }
    }

    /// Apply an officer decision to an application in a reviewable state.
    ///
    /// Review metadata is stamped for every decision. `ApproveWithSeat`
    /// persists the approval first and then attempts the seat: a full course
    /// leaves the application approved but unseated.
    pub fn review(
        &self,
        number: &ApplicationNumber,
        reviewed_by: &str,
        decision: ReviewDecision,
        notes: String,
    ) -> Result<ReviewOutcome, ApplicationServiceError> {
        let mut application = self
            .repository
            .fetch(number)?
            .ok_or_else(|| ApplicationServiceError::NotFound(number.clone()))?;

        let target = decision.target_status(application.status);
        if !application.status.is_reviewable() {
            return Err(ApplicationServiceError::InvalidTransition {
                from: application.status,
                to: target,
            });
        }

        application.review = Some(ReviewRecord {
            reviewed_by: reviewed_by.to_string(),
            review_date: Utc::now(),
            notes,
        });

        if target != application.status {
            application
                .transition(target)
                .map_err(ApplicationServiceError::from)?;
        }
        self.repository.update(application.clone())?;

        let seat = match decision {
            ReviewDecision::ApproveWithSeat => match self.seats.allocate(&application, reviewed_by)
            {
                Ok(allocation) => SeatOutcome::Allocated(allocation),
                Err(SeatAllocationError::NoCapacity(code)) => {
                    warn!(
                        application = %application.application_number,
                        course = %code,
                        "application approved but no seats available"
                    );
                    SeatOutcome::NoCapacity
                }
                Err(SeatAllocationError::AlreadySeated) => {
                    warn!(
                        application = %application.application_number,
                        "application approved but the student already holds a seat"
                    );
                    SeatOutcome::AlreadySeated
                }
                Err(err) => return Err(ApplicationServiceError::Seats(err)),
            },
            _ => SeatOutcome::NotRequested,
        };

        info!(
            application = %application.application_number,
            status = %application.status,
            seat = seat.label(),
            "review recorded"
        );
        Ok(ReviewOutcome { application, seat })
    }

    /// UX hint: may this student open an application for this course?
    pub fn can_apply(
        &self,
        student: &StudentId,
        course_code: &CourseCode,
    ) -> Result<bool, ApplicationServiceError> {
        if self.repository.exists_for(student, course_code)? {
            return Ok(false);
        }
        Ok(self.repository.active_count(student)? < self.policy.max_active_applications)
    }

    pub fn active_count(&self, student: &StudentId) -> Result<usize, ApplicationServiceError> {
        Ok(self.repository.active_count(student)?)
    }

    pub fn remaining_slots(&self, student: &StudentId) -> Result<usize, ApplicationServiceError> {
        let active = self.repository.active_count(student)?;
        Ok(self.policy.max_active_applications.saturating_sub(active))
    }

    pub fn get(
        &self,
        number: &ApplicationNumber,
    ) -> Result<Application, ApplicationServiceError> {
        self.repository
            .fetch(number)?
            .ok_or_else(|| ApplicationServiceError::NotFound(number.clone()))
    }

    pub fn for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Application>, ApplicationServiceError> {
        Ok(self.repository.for_student(student)?)
    }

    pub fn pending(&self, limit: usize) -> Result<Vec<Application>, ApplicationServiceError> {
        Ok(self.repository.pending(limit)?)
    }

    pub fn seats(&self) -> &SeatAllocationService<L, C> {
        &self.seats
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    fn owned_application(
        &self,
        student: &StudentId,
        number: &ApplicationNumber,
    ) -> Result<Application, ApplicationServiceError> {
        let application = self
            .repository
            .fetch(number)?
            .ok_or_else(|| ApplicationServiceError::NotFound(number.clone()))?;
        if &application.student != student {
            return Err(ApplicationServiceError::NotFound(number.clone()));
        }
        Ok(application)
    }
}

/// Recoverable, user-facing failures of the lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("student has already applied to this course")]
    DuplicateApplication,
    #[error("student already has {active} active applications (limit {limit})")]
    LimitExceeded { active: usize, limit: usize },
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("application {0} not found")]
    NotFound(ApplicationNumber),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Seats(SeatAllocationError),
}

impl From<TransitionError> for ApplicationServiceError {
    fn from(err: TransitionError) -> Self {
        ApplicationServiceError::InvalidTransition {
            from: err.from,
            to: err.to,
        }
    }
}
