//! Course catalog: capacity and eligibility thresholds per course.
//!
//! The catalog owns the only contended counter in the system,
//! `filled_seats`. Implementations must make [`CourseCatalog::claim_seat`] an
//! atomic capacity-guarded increment so that concurrent approvals can never
//! push `filled_seats` past `total_seats`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique course code, e.g. `CS101`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseCode(pub String);

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Undergraduate,
    Postgraduate,
    Diploma,
}

impl CourseLevel {
    pub const fn label(self) -> &'static str {
        match self {
            CourseLevel::Undergraduate => "undergraduate",
            CourseLevel::Postgraduate => "postgraduate",
            CourseLevel::Diploma => "diploma",
        }
    }
}

/// A course offering with a fixed seat inventory.
///
/// Invariant: `filled_seats <= total_seats`. Only the seat allocation path
/// mutates `filled_seats`; administrators create and edit everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub code: CourseCode,
    pub name: String,
    pub department: String,
    pub level: CourseLevel,
    pub duration_years: u8,
    pub total_seats: u32,
    pub filled_seats: u32,
    pub min_percentage: f64,
}

impl Course {
    /// Computed, never stored; saturates so a violated invariant can never
    /// surface as a negative count.
    pub fn available_seats(&self) -> u32 {
        self.total_seats.saturating_sub(self.filled_seats)
    }

    pub fn has_capacity(&self) -> bool {
        self.filled_seats < self.total_seats
    }

    pub fn seat_percentage(&self) -> f64 {
        if self.total_seats == 0 {
            return 0.0;
        }
        f64::from(self.filled_seats) / f64::from(self.total_seats) * 100.0
    }
}

/// Aggregate seat inventory across the catalog, for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatStatistics {
    pub total_seats: u32,
    pub filled_seats: u32,
    pub available_seats: u32,
}

/// Storage abstraction over the course inventory.
pub trait CourseCatalog: Send + Sync {
    fn get(&self, code: &CourseCode) -> Result<Course, CatalogError>;

    /// Create or replace a course definition. Seat accounting on a live
    /// course belongs to `claim_seat` alone.
    fn upsert(&self, course: Course) -> Result<(), CatalogError>;

    fn list(&self) -> Result<Vec<Course>, CatalogError>;

    /// Atomically increment `filled_seats` iff capacity remains, returning
    /// the updated course. The guard and the increment are one isolated
    /// step: two racing claims on a single open seat must produce exactly
    /// one success and one `CapacityExceeded`.
    fn claim_seat(&self, code: &CourseCode) -> Result<Course, CatalogError>;

    /// Undo a claim that could not be committed downstream. This is an
    /// internal unwind step, not a seat-release feature; no public operation
    /// deallocates a granted seat.
    fn release_seat(&self, code: &CourseCode) -> Result<(), CatalogError>;

    fn stats(&self) -> Result<SeatStatistics, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("course {0} not found")]
    NotFound(CourseCode),
    #[error("course {0} has no open seats")]
    CapacityExceeded(CourseCode),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}
