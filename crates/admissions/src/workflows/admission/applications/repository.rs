use super::domain::{Application, ApplicationNumber, StudentId};
use crate::workflows::admission::catalog::CourseCode;

/// Storage abstraction for applications.
///
/// The uniqueness rules live here, not in pre-checks: `insert` must reject a
/// second application for the same (student, course) pair and a reissued
/// application number even when callers raced past the service-level checks.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;

    fn update(&self, application: Application) -> Result<(), RepositoryError>;

    fn fetch(&self, number: &ApplicationNumber) -> Result<Option<Application>, RepositoryError>;

    fn for_student(&self, student: &StudentId) -> Result<Vec<Application>, RepositoryError>;

    /// Count of the student's applications in Draft, Submitted, or
    /// UnderReview, used by the creation cap.
    fn active_count(&self, student: &StudentId) -> Result<usize, RepositoryError>;

    fn exists_for(
        &self,
        student: &StudentId,
        course: &CourseCode,
    ) -> Result<bool, RepositoryError>;

    /// Submitted applications awaiting an officer, oldest submission first.
    fn pending(&self, limit: usize) -> Result<Vec<Application>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("an application for this student and course already exists")]
    DuplicatePair,
    #[error("application number {0} has already been issued")]
    NumberTaken(ApplicationNumber),
    #[error("application not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
