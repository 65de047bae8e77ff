use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::ApplicationDetails;

const MINIMUM_APPLICANT_AGE: i32 = 16;
const PHONE_DIGITS: usize = 10;

/// Raw application form fields as received from the presentation layer.
///
/// Nothing in the core accepts this type directly; [`ApplicationIntake::validated`]
/// is the only way to obtain an [`ApplicationDetails`], so range and format
/// problems are settled before the lifecycle manager is ever invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationIntake {
    pub previous_school: String,
    pub previous_qualification: String,
    pub percentage_obtained: f64,
    pub year_of_passing: i32,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub phone: String,
    pub emergency_contact: String,
}

impl ApplicationIntake {
    pub fn validated(self) -> Result<ApplicationDetails, IntakeError> {
        let today = Utc::now().date_naive();
        self.validated_as_of(today)
    }

    /// Validation pinned to a reference date so tests stay deterministic.
    pub fn validated_as_of(self, today: NaiveDate) -> Result<ApplicationDetails, IntakeError> {
        if !(0.0..=100.0).contains(&self.percentage_obtained) {
            return Err(IntakeError::PercentageOutOfRange(self.percentage_obtained));
        }

        let current_year = today.year();
        if self.year_of_passing < 1900 || self.year_of_passing > current_year {
            return Err(IntakeError::ImplausibleYearOfPassing {
                year: self.year_of_passing,
                current_year,
            });
        }

        if self.date_of_birth > today {
            return Err(IntakeError::BirthDateInFuture(self.date_of_birth));
        }
        let age = age_on(self.date_of_birth, today);
        if age < MINIMUM_APPLICANT_AGE {
            return Err(IntakeError::UnderMinimumAge { age });
        }

        check_phone("phone", &self.phone)?;
        check_phone("emergency_contact", &self.emergency_contact)?;

        Ok(ApplicationDetails {
            previous_school: self.previous_school,
            previous_qualification: self.previous_qualification,
            percentage_obtained: self.percentage_obtained,
            year_of_passing: self.year_of_passing,
            date_of_birth: self.date_of_birth,
            address: self.address,
            phone: self.phone,
            emergency_contact: self.emergency_contact,
        })
    }
}

fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

fn check_phone(field: &'static str, value: &str) -> Result<(), IntakeError> {
    if value.len() != PHONE_DIGITS || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(IntakeError::InvalidPhone { field });
    }
    Ok(())
}

/// Form-level rejections; a shallower taxonomy than the lifecycle errors and
/// handled entirely at this boundary.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("percentage must be between 0 and 100, got {0}")]
    PercentageOutOfRange(f64),
    #[error("year of passing {year} must be between 1900 and {current_year}")]
    ImplausibleYearOfPassing { year: i32, current_year: i32 },
    #[error("date of birth {0} is in the future")]
    BirthDateInFuture(NaiveDate),
    #[error("applicants must be at least 16 years old, got {age}")]
    UnderMinimumAge { age: i32 },
    #[error("{field} must be exactly 10 digits")]
    InvalidPhone { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).expect("valid date")
    }

    fn intake() -> ApplicationIntake {
        ApplicationIntake {
            previous_school: "Central High".to_string(),
            previous_qualification: "12th".to_string(),
            percentage_obtained: 82.5,
            year_of_passing: 2025,
            date_of_birth: NaiveDate::from_ymd_opt(2007, 3, 14).expect("valid date"),
            address: "12 College Road".to_string(),
            phone: "9876543210".to_string(),
            emergency_contact: "9123456780".to_string(),
        }
    }

    #[test]
    fn well_formed_intake_passes() {
        let details = intake().validated_as_of(reference_date()).expect("valid form");
        assert_eq!(details.percentage_obtained, 82.5);
    }

    #[test]
    fn percentage_must_sit_in_range() {
        let mut form = intake();
        form.percentage_obtained = 101.0;
        assert!(matches!(
            form.validated_as_of(reference_date()),
            Err(IntakeError::PercentageOutOfRange(_))
        ));

        let mut form = intake();
        form.percentage_obtained = -0.5;
        assert!(matches!(
            form.validated_as_of(reference_date()),
            Err(IntakeError::PercentageOutOfRange(_))
        ));
    }

    #[test]
    fn sixteenth_birthday_is_the_cutoff() {
        let mut form = intake();
        // Turns 16 exactly on the reference date.
        form.date_of_birth = NaiveDate::from_ymd_opt(2010, 8, 23).expect("valid date");
        assert!(form.clone().validated_as_of(reference_date()).is_ok());

        // One day short of 16.
        form.date_of_birth = NaiveDate::from_ymd_opt(2010, 8, 24).expect("valid date");
        assert!(matches!(
            form.validated_as_of(reference_date()),
            Err(IntakeError::UnderMinimumAge { age: 15 })
        ));
    }

    #[test]
    fn future_birth_dates_are_rejected() {
        let mut form = intake();
        form.date_of_birth = NaiveDate::from_ymd_opt(2027, 1, 1).expect("valid date");
        assert!(matches!(
            form.validated_as_of(reference_date()),
            Err(IntakeError::BirthDateInFuture(_))
        ));
    }

    #[test]
    fn phone_fields_require_ten_digits() {
        let mut form = intake();
        form.phone = "98765".to_string();
        assert!(matches!(
            form.validated_as_of(reference_date()),
            Err(IntakeError::InvalidPhone { field: "phone" })
        ));

        let mut form = intake();
        form.emergency_contact = "987654321x".to_string();
        assert!(matches!(
            form.validated_as_of(reference_date()),
            Err(IntakeError::InvalidPhone {
                field: "emergency_contact"
            })
        ));
    }

    #[test]
    fn year_of_passing_cannot_postdate_today() {
        let mut form = intake();
        form.year_of_passing = 2027;
        assert!(matches!(
            form.validated_as_of(reference_date()),
            Err(IntakeError::ImplausibleYearOfPassing { .. })
        ));
    }
}
