use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use admissions::workflows::admission::applications::{
    Application, ApplicationNumber, ApplicationRepository, ApplicationStatus, RepositoryError,
    StudentId,
};
use admissions::workflows::admission::catalog::{
    CatalogError, Course, CourseCatalog, CourseCode, CourseLevel, SeatStatistics,
};
use admissions::workflows::admission::identity::{
    Capability, Identity, IdentityError, IdentityProvider,
};
use admissions::workflows::admission::seats::{SeatAllocation, SeatLedger, SeatLedgerError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryApplicationStore {
    records: Mutex<HashMap<ApplicationNumber, Application>>,
}

impl ApplicationRepository for InMemoryApplicationStore {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.application_number) {
            return Err(RepositoryError::NumberTaken(
                application.application_number.clone(),
            ));
        }
        let duplicate = guard
            .values()
            .any(|existing| {
                existing.student == application.student && existing.course == application.course
            });
        if duplicate {
            return Err(RepositoryError::DuplicatePair);
        }
        guard.insert(application.application_number.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&application.application_number) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(application.application_number.clone(), application);
        Ok(())
    }

    fn fetch(&self, number: &ApplicationNumber) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(number).cloned())
    }

    fn for_student(&self, student: &StudentId) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut applications: Vec<_> = guard
            .values()
            .filter(|application| &application.student == student)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    fn active_count(&self, student: &StudentId) -> Result<usize, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| {
                &application.student == student && application.status.is_active()
            })
            .count())
    }

    fn exists_for(
        &self,
        student: &StudentId,
        course: &CourseCode,
    ) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .any(|application| &application.student == student && &application.course == course))
    }

    fn pending(&self, limit: usize) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut pending: Vec<_> = guard
            .values()
            .filter(|application| application.status == ApplicationStatus::Submitted)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.submission_date.cmp(&b.submission_date));
        pending.truncate(limit);
        Ok(pending)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryCourseCatalog {
    courses: Mutex<BTreeMap<CourseCode, Course>>,
}

impl CourseCatalog for InMemoryCourseCatalog {
    fn get(&self, code: &CourseCode) -> Result<Course, CatalogError> {
        let guard = self.courses.lock().expect("catalog mutex poisoned");
        guard
            .get(code)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(code.clone()))
    }

    fn upsert(&self, course: Course) -> Result<(), CatalogError> {
        let mut guard = self.courses.lock().expect("catalog mutex poisoned");
        guard.insert(course.code.clone(), course);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Course>, CatalogError> {
        let guard = self.courses.lock().expect("catalog mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn claim_seat(&self, code: &CourseCode) -> Result<Course, CatalogError> {
        let mut guard = self.courses.lock().expect("catalog mutex poisoned");
        let course = guard
            .get_mut(code)
            .ok_or_else(|| CatalogError::NotFound(code.clone()))?;
        if !course.has_capacity() {
            return Err(CatalogError::CapacityExceeded(code.clone()));
        }
        course.filled_seats += 1;
        Ok(course.clone())
    }

    fn release_seat(&self, code: &CourseCode) -> Result<(), CatalogError> {
        let mut guard = self.courses.lock().expect("catalog mutex poisoned");
        let course = guard
            .get_mut(code)
            .ok_or_else(|| CatalogError::NotFound(code.clone()))?;
        course.filled_seats = course.filled_seats.saturating_sub(1);
        Ok(())
    }

    fn stats(&self) -> Result<SeatStatistics, CatalogError> {
        let guard = self.courses.lock().expect("catalog mutex poisoned");
        let total_seats: u32 = guard.values().map(|course| course.total_seats).sum();
        let filled_seats: u32 = guard.values().map(|course| course.filled_seats).sum();
        Ok(SeatStatistics {
            total_seats,
            filled_seats,
            available_seats: total_seats.saturating_sub(filled_seats),
        })
    }
}

#[derive(Default)]
pub(crate) struct InMemorySeatLedger {
    seats: Mutex<HashMap<StudentId, Option<SeatAllocation>>>,
}

impl SeatLedger for InMemorySeatLedger {
    fn reserve(&self, student: &StudentId) -> Result<(), SeatLedgerError> {
        let mut guard = self.seats.lock().expect("ledger mutex poisoned");
        if guard.contains_key(student) {
            return Err(SeatLedgerError::AlreadySeated);
        }
        guard.insert(student.clone(), None);
        Ok(())
    }

    fn commit(&self, allocation: SeatAllocation) -> Result<SeatAllocation, SeatLedgerError> {
        let mut guard = self.seats.lock().expect("ledger mutex poisoned");
        guard.insert(allocation.student.clone(), Some(allocation.clone()));
        Ok(allocation)
    }

    fn release(&self, student: &StudentId) -> Result<(), SeatLedgerError> {
        let mut guard = self.seats.lock().expect("ledger mutex poisoned");
        guard.remove(student);
        Ok(())
    }

    fn for_student(
        &self,
        student: &StudentId,
    ) -> Result<Option<SeatAllocation>, SeatLedgerError> {
        let guard = self.seats.lock().expect("ledger mutex poisoned");
        Ok(guard.get(student).cloned().flatten())
    }

    fn all(&self) -> Result<Vec<SeatAllocation>, SeatLedgerError> {
        let guard = self.seats.lock().expect("ledger mutex poisoned");
        Ok(guard.values().flatten().cloned().collect())
    }
}

/// Directory of known actors, keyed by the `x-actor-id` header value.
///
/// Stands in for an external identity service. Capability grants are fixed
/// at construction.
#[derive(Default)]
pub(crate) struct StaticDirectory {
    identities: HashMap<String, Identity>,
}

impl StaticDirectory {
    pub(crate) fn grant(
        mut self,
        id: &str,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        self.identities
            .insert(id.to_string(), Identity::new(id, capabilities));
        self
    }
}

impl IdentityProvider for StaticDirectory {
    fn identify(&self, actor: &str) -> Result<Identity, IdentityError> {
        self.identities
            .get(actor)
            .cloned()
            .ok_or_else(|| IdentityError::Unknown(actor.to_string()))
    }
}

pub(crate) fn seeded_directory() -> StaticDirectory {
    StaticDirectory::default()
        .grant("student-1", [Capability::Student])
        .grant("student-2", [Capability::Student])
        .grant("student-3", [Capability::Student])
        .grant("officer-1", [Capability::Officer])
        .grant("admin-1", [Capability::Officer, Capability::Admin])
}

pub(crate) fn seeded_catalog() -> InMemoryCourseCatalog {
    let catalog = InMemoryCourseCatalog::default();
    for course in default_courses() {
        catalog.upsert(course).expect("in-memory upsert cannot fail");
    }
    catalog
}

fn default_courses() -> Vec<Course> {
    vec![
        Course {
            code: CourseCode("CS101".to_string()),
            name: "Computer Science & Engineering".to_string(),
            department: "Engineering".to_string(),
            level: CourseLevel::Undergraduate,
            duration_years: 4,
            total_seats: 60,
            filled_seats: 0,
            min_percentage: 75.0,
        },
        Course {
            code: CourseCode("ME201".to_string()),
            name: "Mechanical Engineering".to_string(),
            department: "Engineering".to_string(),
            level: CourseLevel::Undergraduate,
            duration_years: 4,
            total_seats: 45,
            filled_seats: 0,
            min_percentage: 65.0,
        },
        Course {
            code: CourseCode("BBA301".to_string()),
            name: "Business Administration".to_string(),
            department: "Management".to_string(),
            level: CourseLevel::Undergraduate,
            duration_years: 3,
            total_seats: 80,
            filled_seats: 0,
            min_percentage: 55.0,
        },
        Course {
            code: CourseCode("MCA501".to_string()),
            name: "Master of Computer Applications".to_string(),
            department: "Computer Applications".to_string(),
            level: CourseLevel::Postgraduate,
            duration_years: 2,
            total_seats: 40,
            filled_seats: 0,
            min_percentage: 60.0,
        },
        Course {
            code: CourseCode("DME101".to_string()),
            name: "Diploma in Mechanical Engineering".to_string(),
            department: "Engineering".to_string(),
            level: CourseLevel::Diploma,
            duration_years: 3,
            total_seats: 30,
            filled_seats: 0,
            min_percentage: 45.0,
        },
    ]
}
