use chrono::NaiveDate;
use clap::Args;
use std::sync::Arc;

use crate::infra::{seeded_catalog, InMemoryApplicationStore, InMemorySeatLedger};
use admissions::config::AdmissionPolicy;
use admissions::error::AppError;
use admissions::workflows::admission::applications::{
    ApplicationDetails, ApplicationService, ReviewDecision, SeatOutcome, StudentId, SubmitOutcome,
};
use admissions::workflows::admission::applications::ApplicationServiceError;
use admissions::workflows::admission::catalog::{CatalogError, CourseCatalog, CourseCode};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Course code the demo student applies to (defaults to CS101)
    #[arg(long)]
    pub(crate) course: Option<String>,
    /// Academic percentage of the demo student
    #[arg(long, default_value_t = 82.5)]
    pub(crate) percentage: f64,
    /// Stop after submission, before the officer review
    #[arg(long)]
    pub(crate) skip_review: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        course,
        percentage,
        skip_review,
    } = args;

    let course = CourseCode(course.unwrap_or_else(|| "CS101".to_string()));

    println!("Admissions workflow demo");

    let repository = Arc::new(InMemoryApplicationStore::default());
    let catalog = Arc::new(seeded_catalog());
    let ledger = Arc::new(InMemorySeatLedger::default());
    let service = ApplicationService::new(
        repository,
        catalog.clone(),
        ledger,
        AdmissionPolicy::default(),
    );

    println!("\nCourse catalog");
    for entry in catalog.list().map_err(workflow_unavailable)? {
        println!(
            "- {} | {} | {} seats | min {:.1}%",
            entry.code,
            entry.name,
            entry.available_seats(),
            entry.min_percentage
        );
    }

    let student = StudentId("student-1".to_string());
    let application = match service.create(&student, &course, demo_details(percentage)) {
        Ok(application) => application,
        Err(err) => {
            println!("\nApplication rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "\nCreated application {} -> status {}",
        application.application_number, application.status
    );
    println!("Eligibility: {}", application.eligibility.rationale);

    let outcome = match service.submit(&student, &application.application_number) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("Submission rejected: {err}");
            return Ok(());
        }
    };
    match &outcome {
        SubmitOutcome::Submitted(application) => {
            println!(
                "Submitted {} at {}",
                application.application_number,
                application
                    .submission_date
                    .map(|date| date.to_rfc3339())
                    .unwrap_or_default()
            );
        }
        SubmitOutcome::AlreadySubmitted(application) => {
            println!("{} was already submitted", application.application_number);
        }
    }

    if skip_review {
        return Ok(());
    }

    let review = match service.review(
        &application.application_number,
        "officer-1",
        ReviewDecision::ApproveWithSeat,
        "demo approval".to_string(),
    ) {
        Ok(review) => review,
        Err(err) => {
            println!("Review failed: {err}");
            return Ok(());
        }
    };
    println!(
        "\nReview outcome: status {}, seat {}",
        review.application.status,
        review.seat.label()
    );
    if let SeatOutcome::Allocated(allocation) = &review.seat {
        println!(
            "Seat in {} allocated by {}, confirm by {}",
            allocation.course, allocation.allocated_by, allocation.confirmation_deadline
        );
    }

    match serde_json::to_string_pretty(&review.application.status_view()) {
        Ok(json) => println!("\nPublic status payload:\n{json}"),
        Err(err) => println!("\nPublic status payload unavailable: {err}"),
    }

    let stats = catalog.stats().map_err(workflow_unavailable)?;
    println!(
        "\nSeat report: {}/{} filled, {} available",
        stats.filled_seats, stats.total_seats, stats.available_seats
    );

    Ok(())
}

fn demo_details(percentage_obtained: f64) -> ApplicationDetails {
    ApplicationDetails {
        previous_school: "Central Public School".to_string(),
        previous_qualification: "Higher Secondary".to_string(),
        percentage_obtained,
        year_of_passing: 2025,
        date_of_birth: NaiveDate::from_ymd_opt(2007, 3, 14).unwrap_or_default(),
        address: "12 College Road".to_string(),
        phone: "9876543210".to_string(),
        emergency_contact: "9123456780".to_string(),
    }
}

fn workflow_unavailable(err: CatalogError) -> AppError {
    AppError::Workflow(ApplicationServiceError::from(err))
}
