use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::config::AdmissionPolicy;
use crate::workflows::admission::applications::domain::{
    Application, ApplicationDetails, ApplicationNumber, StudentId,
};
use crate::workflows::admission::applications::repository::{
    ApplicationRepository, RepositoryError,
};
use crate::workflows::admission::applications::router::{admission_router, AdmissionState};
use crate::workflows::admission::applications::service::ApplicationService;
use crate::workflows::admission::catalog::{
    CatalogError, Course, CourseCatalog, CourseCode, CourseLevel, SeatStatistics,
};
use crate::workflows::admission::identity::{
    Capability, Identity, IdentityError, IdentityProvider,
};
use crate::workflows::admission::review::ReviewGateway;
use crate::workflows::admission::seats::{SeatAllocation, SeatLedger, SeatLedgerError};

pub(super) fn details() -> ApplicationDetails {
    ApplicationDetails {
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

pub(super) fn details_with_percentage(percentage_obtained: f64) -> ApplicationDetails {
    ApplicationDetails {
        percentage_obtained,
        ..details()
    }
}

pub(super) fn course(code: &str, total_seats: u32, min_percentage: f64) -> Course {
    Course {
        code: CourseCode(code.to_string()),
        name: format!("Course {code}"),
        department: "Engineering".to_string(),
        level: CourseLevel::Undergraduate,
        duration_years: 4,
        total_seats,
        filled_seats: 0,
        min_percentage,
    }
}

pub(super) fn student(id: &str) -> StudentId {
    StudentId(id.to_string())
}

pub(super) fn code(value: &str) -> CourseCode {
    CourseCode(value.to_string())
}

pub(super) type TestService = ApplicationService<MemoryRepository, MemoryCatalog, MemoryLedger>;

pub(super) struct Fixture {
    pub(super) service: Arc<TestService>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) catalog: Arc<MemoryCatalog>,
    pub(super) ledger: Arc<MemoryLedger>,
}

pub(super) fn build_service() -> Fixture {
    build_service_with_policy(AdmissionPolicy::default())
}

pub(super) fn build_service_with_policy(policy: AdmissionPolicy) -> Fixture {
    let repository = Arc::new(MemoryRepository::default());
    let catalog = Arc::new(MemoryCatalog::default());
    let ledger = Arc::new(MemoryLedger::default());
    let service = Arc::new(ApplicationService::new(
        repository.clone(),
        catalog.clone(),
        ledger.clone(),
        policy,
    ));
    Fixture {
        service,
        repository,
        catalog,
        ledger,
    }
}

pub(super) fn admission_state(
    fixture: &Fixture,
) -> AdmissionState<MemoryRepository, MemoryCatalog, MemoryLedger, StaticIdentityProvider> {
    AdmissionState {
        applications: fixture.service.clone(),
        gateway: Arc::new(ReviewGateway::new(fixture.service.clone())),
        catalog: fixture.catalog.clone(),
        identity: Arc::new(StaticIdentityProvider::with_defaults()),
    }
}

pub(super) fn test_router(fixture: &Fixture) -> axum::Router {
    admission_router(admission_state(fixture))
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<ApplicationNumber, Application>>,
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut records = self.records.lock().expect("repository mutex poisoned");
        if records.contains_key(&application.application_number) {
            return Err(RepositoryError::NumberTaken(
                application.application_number.clone(),
            ));
        }
        if records
            .values()
            .any(|existing| existing.student == application.student && existing.course == application.course)
        {
            return Err(RepositoryError::DuplicatePair);
        }
        records.insert(application.application_number.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().expect("repository mutex poisoned");
        if !records.contains_key(&application.application_number) {
            return Err(RepositoryError::NotFound);
        }
        records.insert(application.application_number.clone(), application);
        Ok(())
    }

    fn fetch(&self, number: &ApplicationNumber) -> Result<Option<Application>, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        Ok(records.get(number).cloned())
    }

    fn for_student(&self, student: &StudentId) -> Result<Vec<Application>, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        let mut applications: Vec<_> = records
            .values()
            .filter(|application| &application.student == student)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    fn active_count(&self, student: &StudentId) -> Result<usize, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        Ok(records
            .values()
            .filter(|application| &application.student == student && application.status.is_active())
            .count())
    }

    fn exists_for(
        &self,
        student: &StudentId,
        course: &CourseCode,
    ) -> Result<bool, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        Ok(records
            .values()
            .any(|application| &application.student == student && &application.course == course))
    }

    fn pending(&self, limit: usize) -> Result<Vec<Application>, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        let mut pending: Vec<_> = records
            .values()
            .filter(|application| {
                application.status == crate::workflows::admission::applications::domain::ApplicationStatus::Submitted
            })
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.submission_date.cmp(&b.submission_date));
        pending.truncate(limit);
        Ok(pending)
    }
}

#[derive(Default)]
pub(super) struct MemoryCatalog {
    courses: Mutex<BTreeMap<CourseCode, Course>>,
}

impl CourseCatalog for MemoryCatalog {
    fn get(&self, code: &CourseCode) -> Result<Course, CatalogError> {
        let courses = self.courses.lock().expect("catalog mutex poisoned");
        courses
            .get(code)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(code.clone()))
    }

    fn upsert(&self, course: Course) -> Result<(), CatalogError> {
        let mut courses = self.courses.lock().expect("catalog mutex poisoned");
        courses.insert(course.code.clone(), course);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Course>, CatalogError> {
        let courses = self.courses.lock().expect("catalog mutex poisoned");
        Ok(courses.values().cloned().collect())
    }

    fn claim_seat(&self, code: &CourseCode) -> Result<Course, CatalogError> {
        let mut courses = self.courses.lock().expect("catalog mutex poisoned");
        let course = courses
            .get_mut(code)
            .ok_or_else(|| CatalogError::NotFound(code.clone()))?;
        if !course.has_capacity() {
            return Err(CatalogError::CapacityExceeded(code.clone()));
        }
        course.filled_seats += 1;
        Ok(course.clone())
    }

    fn release_seat(&self, code: &CourseCode) -> Result<(), CatalogError> {
        let mut courses = self.courses.lock().expect("catalog mutex poisoned");
        let course = courses
            .get_mut(code)
            .ok_or_else(|| CatalogError::NotFound(code.clone()))?;
        course.filled_seats = course.filled_seats.saturating_sub(1);
        Ok(())
    }

    fn stats(&self) -> Result<SeatStatistics, CatalogError> {
        let courses = self.courses.lock().expect("catalog mutex poisoned");
        let total_seats: u32 = courses.values().map(|course| course.total_seats).sum();
        let filled_seats: u32 = courses.values().map(|course| course.filled_seats).sum();
        Ok(SeatStatistics {
            total_seats,
            filled_seats,
            available_seats: total_seats.saturating_sub(filled_seats),
        })
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    seats: Mutex<HashMap<StudentId, Option<SeatAllocation>>>,
}

impl SeatLedger for MemoryLedger {
    fn reserve(&self, student: &StudentId) -> Result<(), SeatLedgerError> {
        let mut seats = self.seats.lock().expect("ledger mutex poisoned");
        if seats.contains_key(student) {
            return Err(SeatLedgerError::AlreadySeated);
        }
        seats.insert(student.clone(), None);
        Ok(())
    }

    fn commit(&self, allocation: SeatAllocation) -> Result<SeatAllocation, SeatLedgerError> {
        let mut seats = self.seats.lock().expect("ledger mutex poisoned");
        seats.insert(allocation.student.clone(), Some(allocation.clone()));
        Ok(allocation)
    }

    fn release(&self, student: &StudentId) -> Result<(), SeatLedgerError> {
        let mut seats = self.seats.lock().expect("ledger mutex poisoned");
        seats.remove(student);
        Ok(())
    }

    fn for_student(
        &self,
        student: &StudentId,
    ) -> Result<Option<SeatAllocation>, SeatLedgerError> {
        let seats = self.seats.lock().expect("ledger mutex poisoned");
        Ok(seats.get(student).cloned().flatten())
    }

    fn all(&self) -> Result<Vec<SeatAllocation>, SeatLedgerError> {
        let seats = self.seats.lock().expect("ledger mutex poisoned");
        Ok(seats.values().flatten().cloned().collect())
    }
}

pub(super) struct StaticIdentityProvider {
    identities: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    pub(super) fn with_defaults() -> Self {
        let mut identities = HashMap::new();
        for id in ["student-1", "student-2", "student-3"] {
            identities.insert(id.to_string(), Identity::new(id, [Capability::Student]));
        }
        identities.insert(
            "officer-1".to_string(),
            Identity::new("officer-1", [Capability::Officer]),
        );
        identities.insert(
            "admin-1".to_string(),
            Identity::new("admin-1", [Capability::Officer, Capability::Admin]),
        );
        Self { identities }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn identify(&self, actor: &str) -> Result<Identity, IdentityError> {
        self.identities
            .get(actor)
            .cloned()
            .ok_or_else(|| IdentityError::Unknown(actor.to_string()))
    }
}
