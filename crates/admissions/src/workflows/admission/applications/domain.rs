use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflows::admission::catalog::{Course, CourseCode};

/// Identifier of the student who owns an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generated, immutable application number in the `APP<year><5-digit sequence>` format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationNumber(pub String);

impl fmt::Display for ApplicationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Finite states an application can occupy.
///
/// `Shortlisted` is reachable only through an administrative collaborator; no
/// operation in this crate produces it, but the transition table admits it
/// from `UnderReview` so externally shortlisted records stay representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Shortlisted,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Active applications count against the per-student creation cap.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Draft | ApplicationStatus::Submitted | ApplicationStatus::UnderReview
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }

    /// An officer may act on the application only while it sits in one of
    /// these states. Terminal applications are never re-reviewed.
    pub const fn is_reviewable(self) -> bool {
        matches!(self, ApplicationStatus::Submitted | ApplicationStatus::UnderReview)
    }

    /// Single transition table for the whole crate; every status mutation
    /// funnels through [`Application::transition`] and this check.
    pub const fn permits(self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (ApplicationStatus::Draft, ApplicationStatus::Submitted)
                | (ApplicationStatus::Submitted, ApplicationStatus::UnderReview)
                | (ApplicationStatus::Submitted, ApplicationStatus::Approved)
                | (ApplicationStatus::Submitted, ApplicationStatus::Rejected)
                | (ApplicationStatus::UnderReview, ApplicationStatus::Shortlisted)
                | (ApplicationStatus::UnderReview, ApplicationStatus::Approved)
                | (ApplicationStatus::UnderReview, ApplicationStatus::Rejected)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejected status mutation, carrying both endpoints for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid status transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

/// Academic and contact details supplied by the student at intake.
///
/// Field-level validation (ranges, plausibility, phone format) happens at the
/// intake boundary before a value of this type exists; see `intake`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDetails {
    pub previous_school: String,
    pub previous_qualification: String,
    pub percentage_obtained: f64,
    pub year_of_passing: i32,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub phone: String,
    pub emergency_contact: String,
}

/// Eligibility verdict fixed at creation time. Later changes to a course's
/// threshold never retroactively alter an existing application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub rationale: String,
}

impl Eligibility {
    /// Pure rule: eligible iff the obtained percentage meets the course
    /// threshold. Equality counts as eligible.
    pub fn evaluate(percentage_obtained: f64, course: &Course) -> Self {
        if percentage_obtained >= course.min_percentage {
            Self {
                eligible: true,
                rationale: format!(
                    "eligible: {percentage_obtained:.1}% >= {:.1}% required for {}",
                    course.min_percentage, course.code
                ),
            }
        } else {
            Self {
                eligible: false,
                rationale: format!(
                    "not eligible: {percentage_obtained:.1}% < {:.1}% required for {}",
                    course.min_percentage, course.code
                ),
            }
        }
    }
}

/// Action an officer selects when closing out a review pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    ApproveWithSeat,
    ApproveOnly,
    Reject,
    SaveNotes,
}

impl ReviewDecision {
    /// Status the application lands in once the decision is applied.
    /// `SaveNotes` records metadata without moving the state machine.
    pub const fn target_status(self, current: ApplicationStatus) -> ApplicationStatus {
        match self {
            ReviewDecision::ApproveWithSeat | ReviewDecision::ApproveOnly => {
                ApplicationStatus::Approved
            }
            ReviewDecision::Reject => ApplicationStatus::Rejected,
            ReviewDecision::SaveNotes => current,
        }
    }
}

/// Reviewer metadata stamped on every review pass regardless of decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub reviewed_by: String,
    pub review_date: DateTime<Utc>,
    pub notes: String,
}

/// A student's request to enroll in one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub application_number: ApplicationNumber,
    pub student: StudentId,
    pub course: CourseCode,
    pub details: ApplicationDetails,
    pub eligibility: Eligibility,
    pub status: ApplicationStatus,
    pub submission_date: Option<DateTime<Utc>>,
    pub review: Option<ReviewRecord>,
    pub created_at: DateTime<Utc>,
}

impl Application {
    /// The one sanctioned way to move the state machine.
    pub fn transition(&mut self, next: ApplicationStatus) -> Result<(), TransitionError> {
        if !self.status.permits(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Flattened snapshot for the presentation layer.
    pub fn status_view(&self) -> ApplicationView {
        ApplicationView {
            application_number: self.application_number.clone(),
            course: self.course.clone(),
            status: self.status.label(),
            eligible: self.eligibility.eligible,
            eligibility_rationale: self.eligibility.rationale.clone(),
            submission_date: self.submission_date,
            reviewed_by: self
                .review
                .as_ref()
                .map(|review| review.reviewed_by.clone()),
        }
    }
}

/// Sanitized representation of an application exposed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub application_number: ApplicationNumber,
    pub course: CourseCode,
    pub status: &'static str,
    pub eligible: bool,
    pub eligibility_rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(min_percentage: f64) -> Course {
        Course {
            code: CourseCode("CS101".to_string()),
            name: "Computer Science".to_string(),
            department: "Engineering".to_string(),
            level: crate::workflows::admission::catalog::CourseLevel::Undergraduate,
            duration_years: 4,
            total_seats: 60,
            filled_seats: 0,
            min_percentage,
        }
    }

    #[test]
    fn draft_submits_but_never_approves_directly() {
        assert!(ApplicationStatus::Draft.permits(ApplicationStatus::Submitted));
        assert!(!ApplicationStatus::Draft.permits(ApplicationStatus::Approved));
        assert!(!ApplicationStatus::Draft.permits(ApplicationStatus::Rejected));
    }

    #[test]
    fn terminal_states_permit_nothing() {
        for terminal in [ApplicationStatus::Approved, ApplicationStatus::Rejected] {
            for next in [
                ApplicationStatus::Draft,
                ApplicationStatus::Submitted,
                ApplicationStatus::UnderReview,
                ApplicationStatus::Shortlisted,
                ApplicationStatus::Approved,
                ApplicationStatus::Rejected,
            ] {
                assert!(!terminal.permits(next), "{terminal} -> {next} should be blocked");
            }
            assert!(terminal.is_terminal());
            assert!(!terminal.is_reviewable());
        }
    }

    #[test]
    fn under_review_can_shortlist() {
        assert!(ApplicationStatus::UnderReview.permits(ApplicationStatus::Shortlisted));
        assert!(!ApplicationStatus::Submitted.permits(ApplicationStatus::Shortlisted));
    }

    #[test]
    fn eligibility_threshold_is_inclusive() {
        let course = course(75.0);
        assert!(Eligibility::evaluate(75.0, &course).eligible);
        assert!(!Eligibility::evaluate(74.9, &course).eligible);

        let rationale = Eligibility::evaluate(80.0, &course).rationale;
        assert!(rationale.contains("80.0%"));
        assert!(rationale.contains("75.0%"));
    }

    #[test]
    fn save_notes_keeps_the_current_status() {
        assert_eq!(
            ReviewDecision::SaveNotes.target_status(ApplicationStatus::UnderReview),
            ApplicationStatus::UnderReview
        );
        assert_eq!(
            ReviewDecision::ApproveWithSeat.target_status(ApplicationStatus::Submitted),
            ApplicationStatus::Approved
        );
        assert_eq!(
            ReviewDecision::Reject.target_status(ApplicationStatus::Submitted),
            ApplicationStatus::Rejected
        );
    }
}
