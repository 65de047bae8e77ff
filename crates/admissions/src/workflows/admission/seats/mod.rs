//! Seat allocation: one seat per student, never past course capacity.
//!
//! The two contended checks ("does this student already hold a seat" and
//! "does the course still have room") are each delegated to an atomic store
//! primitive ([`SeatLedger::reserve`] and
//! [`crate::workflows::admission::catalog::CourseCatalog::claim_seat`]).
//! [`SeatAllocationService::allocate`] sequences them so that a failure at
//! any step restores the state touched so far.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::applications::domain::{Application, ApplicationNumber, StudentId};
use super::catalog::{CatalogError, CourseCatalog, CourseCode};

/// Record confirming a student has been granted one of a course's seats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatAllocation {
    pub application_number: ApplicationNumber,
    pub student: StudentId,
    pub course: CourseCode,
    pub allocated_by: String,
    pub allocation_date: DateTime<Utc>,
    pub is_confirmed: bool,
    /// Advisory only; nothing in the system acts when it passes.
    pub confirmation_deadline: NaiveDate,
    pub notes: String,
}

/// Storage abstraction tracking which students hold seats.
///
/// `reserve` is the serialization point for the one-seat-per-student
/// invariant: an atomic insert-if-absent on the student key. Two concurrent
/// reservations for the same student must yield one success.
pub trait SeatLedger: Send + Sync {
    fn reserve(&self, student: &StudentId) -> Result<(), SeatLedgerError>;

    fn commit(&self, allocation: SeatAllocation) -> Result<SeatAllocation, SeatLedgerError>;

    /// Drop a reservation whose downstream steps failed. Unwind only; a
    /// committed allocation is never released.
    fn release(&self, student: &StudentId) -> Result<(), SeatLedgerError>;

    fn for_student(&self, student: &StudentId) -> Result<Option<SeatAllocation>, SeatLedgerError>;

    fn all(&self) -> Result<Vec<SeatAllocation>, SeatLedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SeatLedgerError {
    #[error("student already holds an allocated seat")]
    AlreadySeated,
    #[error("seat ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SeatAllocationError {
    #[error("student already holds an allocated seat")]
    AlreadySeated,
    #[error("course {0} has no open seats")]
    NoCapacity(CourseCode),
    #[error(transparent)]
    Ledger(SeatLedgerError),
    #[error(transparent)]
    Catalog(CatalogError),
}

/// Grants seats against the catalog's inventory.
pub struct SeatAllocationService<L, C> {
    ledger: Arc<L>,
    catalog: Arc<C>,
    confirmation_window_days: i64,
}

impl<L, C> SeatAllocationService<L, C>
where
    L: SeatLedger,
    C: CourseCatalog,
{
    pub fn new(ledger: Arc<L>, catalog: Arc<C>, confirmation_window_days: i64) -> Self {
        Self {
            ledger,
            catalog,
            confirmation_window_days,
        }
    }

    /// Allocate a seat to an approved application.
    ///
    /// Order matters: the student reservation is taken first so a student
    /// approved concurrently on two applications cannot end up with two
    /// seats, then the capacity-guarded claim runs against the course. When
    /// the claim fails the reservation is released, leaving state exactly as
    /// it was.
    pub fn allocate(
        &self,
        application: &Application,
        allocated_by: &str,
    ) -> Result<SeatAllocation, SeatAllocationError> {
        match self.ledger.reserve(&application.student) {
            Ok(()) => {}
            Err(SeatLedgerError::AlreadySeated) => {
                return Err(SeatAllocationError::AlreadySeated)
            }
            Err(err) => return Err(SeatAllocationError::Ledger(err)),
        }

        let course = match self.catalog.claim_seat(&application.course) {
            Ok(course) => course,
            Err(err) => {
                self.unwind_reservation(&application.student);
                return Err(match err {
                    CatalogError::CapacityExceeded(code) => SeatAllocationError::NoCapacity(code),
                    other => SeatAllocationError::Catalog(other),
                });
            }
        };

        let allocation_date = Utc::now();
        let allocation = SeatAllocation {
            application_number: application.application_number.clone(),
            student: application.student.clone(),
            course: course.code.clone(),
            allocated_by: allocated_by.to_string(),
            allocation_date,
            is_confirmed: false,
            confirmation_deadline: allocation_date.date_naive()
                + Duration::days(self.confirmation_window_days),
            notes: String::new(),
        };

        match self.ledger.commit(allocation) {
            Ok(allocation) => {
                info!(
                    application = %allocation.application_number,
                    course = %allocation.course,
                    remaining = course.available_seats(),
                    "seat allocated"
                );
                Ok(allocation)
            }
            Err(err) => {
                if let Err(release_err) = self.catalog.release_seat(&course.code) {
                    warn!(course = %course.code, error = %release_err, "failed to unwind seat claim");
                }
                self.unwind_reservation(&application.student);
                Err(SeatAllocationError::Ledger(err))
            }
        }
    }

    pub fn for_student(
        &self,
        student: &StudentId,
    ) -> Result<Option<SeatAllocation>, SeatLedgerError> {
        self.ledger.for_student(student)
    }

    pub fn all(&self) -> Result<Vec<SeatAllocation>, SeatLedgerError> {
        self.ledger.all()
    }

    fn unwind_reservation(&self, student: &StudentId) {
        if let Err(err) = self.ledger.release(student) {
            warn!(%student, error = %err, "failed to release seat reservation");
        }
    }
}
