use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationNumber, ReviewDecision, StudentId};
use super::intake::ApplicationIntake;
use super::repository::ApplicationRepository;
use super::service::{ApplicationService, ApplicationServiceError, SeatOutcome, SubmitOutcome};
use crate::workflows::admission::catalog::{CatalogError, CourseCatalog, CourseCode};
use crate::workflows::admission::identity::{Capability, Identity, IdentityProvider};
use crate::workflows::admission::review::{ReviewGateway, ReviewGatewayError};
use crate::workflows::admission::seats::SeatLedger;

/// Shared state behind the admissions endpoints.
pub struct AdmissionState<R, C, L, I> {
    pub applications: Arc<ApplicationService<R, C, L>>,
    pub gateway: Arc<ReviewGateway<R, C, L>>,
    pub catalog: Arc<C>,
    pub identity: Arc<I>,
}

impl<R, C, L, I> Clone for AdmissionState<R, C, L, I> {
    fn clone(&self) -> Self {
        Self {
            applications: Arc::clone(&self.applications),
            gateway: Arc::clone(&self.gateway),
            catalog: Arc::clone(&self.catalog),
            identity: Arc::clone(&self.identity),
        }
    }
}

/// Router builder exposing the application lifecycle over HTTP.
///
/// The actor is taken from the `x-actor-id` header and resolved through the
/// identity provider; capability checks happen per endpoint.
pub fn admission_router<R, C, L, I>(state: AdmissionState<R, C, L, I>) -> Router
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route(
            "/api/v1/admissions/applications",
            post(create_handler::<R, C, L, I>).get(list_handler::<R, C, L, I>),
        )
        .route(
            "/api/v1/admissions/applications/:number",
            get(status_handler::<R, C, L, I>),
        )
        .route(
            "/api/v1/admissions/applications/:number/submit",
            post(submit_handler::<R, C, L, I>),
        )
        .route(
            "/api/v1/admissions/applications/:number/review",
            post(review_handler::<R, C, L, I>),
        )
        .route(
            "/api/v1/admissions/courses",
            get(courses_handler::<R, C, L, I>),
        )
        .route(
            "/api/v1/admissions/courses/:code/can-apply",
            get(can_apply_handler::<R, C, L, I>),
        )
        .route(
            "/api/v1/admissions/seats",
            get(seats_handler::<R, C, L, I>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateApplicationRequest {
    pub(crate) course: String,
    #[serde(flatten)]
    pub(crate) intake: ApplicationIntake,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) decision: ReviewDecision,
    #[serde(default)]
    pub(crate) notes: String,
}

pub(crate) async fn create_handler<R, C, L, I>(
    State(state): State<AdmissionState<R, C, L, I>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<CreateApplicationRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match authenticate(&state, &headers, Capability::Student) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let details = match request.intake.validated() {
        Ok(details) => details,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    let student = StudentId(actor.id.clone());
    let course = CourseCode(request.course);
    match state.applications.create(&student, &course, details) {
        Ok(application) => {
            (StatusCode::CREATED, axum::Json(application.status_view())).into_response()
        }
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn submit_handler<R, C, L, I>(
    State(state): State<AdmissionState<R, C, L, I>>,
    Path(number): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match authenticate(&state, &headers, Capability::Student) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let student = StudentId(actor.id);
    let number = ApplicationNumber(number);
    match state.applications.submit(&student, &number) {
        Ok(SubmitOutcome::Submitted(application)) => {
            let mut body =
                serde_json::to_value(application.status_view()).unwrap_or_else(|_| json!({}));
            body["message"] = json!("application submitted successfully");
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Ok(SubmitOutcome::AlreadySubmitted(application)) => {
            let mut body =
                serde_json::to_value(application.status_view()).unwrap_or_else(|_| json!({}));
            body["message"] = json!("application has already been submitted");
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn review_handler<R, C, L, I>(
    State(state): State<AdmissionState<R, C, L, I>>,
    Path(number): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    let reviewer = match resolve_actor(&state, &headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let number = ApplicationNumber(number);
    match state
        .gateway
        .review(&reviewer, &number, request.decision, request.notes)
    {
        Ok(outcome) => {
            let seat = match &outcome.seat {
                SeatOutcome::Allocated(allocation) => json!({
                    "outcome": outcome.seat.label(),
                    "course": allocation.course.0,
                    "confirmation_deadline": allocation.confirmation_deadline,
                }),
                other => json!({ "outcome": other.label() }),
            };
            let payload = json!({
                "application": outcome.application.status_view(),
                "seat": seat,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(ReviewGatewayError::Forbidden) => {
            let payload = json!({ "error": "officer capability required" });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        Err(ReviewGatewayError::Application(err)) => workflow_error_response(err),
    }
}

pub(crate) async fn status_handler<R, C, L, I>(
    State(state): State<AdmissionState<R, C, L, I>>,
    Path(number): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let number = ApplicationNumber(number);
    match state.applications.get(&number) {
        Ok(application) => {
            let owns = application.student.0 == actor.id;
            if !owns && !actor.has(Capability::Officer) && !actor.has(Capability::Admin) {
                return not_found(&number);
            }
            (StatusCode::OK, axum::Json(application.status_view())).into_response()
        }
        Err(ApplicationServiceError::NotFound(number)) => not_found(&number),
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn list_handler<R, C, L, I>(
    State(state): State<AdmissionState<R, C, L, I>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match authenticate(&state, &headers, Capability::Student) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let student = StudentId(actor.id);
    let applications = match state.applications.for_student(&student) {
        Ok(applications) => applications,
        Err(err) => return workflow_error_response(err),
    };
    let active = applications.iter().filter(|a| a.status.is_active()).count();
    let max = state.applications.policy().max_active_applications;

    let payload = json!({
        "applications": applications
            .iter()
            .map(|application| application.status_view())
            .collect::<Vec<_>>(),
        "active_count": active,
        "remaining": max.saturating_sub(active),
        "max_applications": max,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn courses_handler<R, C, L, I>(
    State(state): State<AdmissionState<R, C, L, I>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    match state.catalog.list() {
        Ok(courses) => {
            let payload = json!({
                "courses": courses
                    .iter()
                    .map(|course| {
                        json!({
                            "code": course.code.0,
                            "name": course.name,
                            "department": course.department,
                            "level": course.level.label(),
                            "duration_years": course.duration_years,
                            "min_percentage": course.min_percentage,
                            "total_seats": course.total_seats,
                            "available_seats": course.available_seats(),
                        })
                    })
                    .collect::<Vec<_>>(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => internal_error(err),
    }
}

pub(crate) async fn can_apply_handler<R, C, L, I>(
    State(state): State<AdmissionState<R, C, L, I>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match authenticate(&state, &headers, Capability::Student) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let student = StudentId(actor.id);
    let course = CourseCode(code);
    if let Err(err) = state.catalog.get(&course) {
        return match err {
            CatalogError::NotFound(code) => {
                let payload = json!({ "error": format!("course {code} not found") });
                (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
            }
            other => internal_error(other),
        };
    }

    match state.applications.can_apply(&student, &course) {
        Ok(can_apply) => {
            let remaining = state
                .applications
                .remaining_slots(&student)
                .unwrap_or_default();
            let payload = json!({
                "course": course.0,
                "can_apply": can_apply,
                "remaining": remaining,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn seats_handler<R, C, L, I>(
    State(state): State<AdmissionState<R, C, L, I>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    if !actor.has(Capability::Admin) {
        let payload = json!({ "error": "admin capability required" });
        return (StatusCode::FORBIDDEN, axum::Json(payload)).into_response();
    }

    let stats = match state.catalog.stats() {
        Ok(stats) => stats,
        Err(err) => return internal_error(err),
    };
    let allocations = match state.applications.seats().all() {
        Ok(allocations) => allocations,
        Err(err) => return internal_error(err),
    };

    let payload = json!({
        "total_seats": stats.total_seats,
        "filled_seats": stats.filled_seats,
        "available_seats": stats.available_seats,
        "allocations": allocations
            .iter()
            .map(|allocation| {
                json!({
                    "application_number": allocation.application_number.0,
                    "course": allocation.course.0,
                    "allocated_by": allocation.allocated_by,
                    "is_confirmed": allocation.is_confirmed,
                    "confirmation_deadline": allocation.confirmation_deadline,
                })
            })
            .collect::<Vec<_>>(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn resolve_actor<R, C, L, I>(
    state: &AdmissionState<R, C, L, I>,
    headers: &HeaderMap,
) -> Result<Identity, Response>
where
    I: IdentityProvider,
{
    let actor = headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            let payload = json!({ "error": "missing x-actor-id header" });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        })?;

    state.identity.identify(actor).map_err(|err| {
        let payload = json!({ "error": err.to_string() });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    })
}

fn authenticate<R, C, L, I>(
    state: &AdmissionState<R, C, L, I>,
    headers: &HeaderMap,
    required: Capability,
) -> Result<Identity, Response>
where
    I: IdentityProvider,
{
    let identity = resolve_actor(state, headers)?;
    if !identity.has(required) {
        let payload =
            json!({ "error": format!("{required:?} capability required").to_lowercase() });
        return Err((StatusCode::FORBIDDEN, axum::Json(payload)).into_response());
    }
    Ok(identity)
}

fn workflow_error_response(err: ApplicationServiceError) -> Response {
    let status = match &err {
        ApplicationServiceError::DuplicateApplication
        | ApplicationServiceError::InvalidTransition { .. } => StatusCode::CONFLICT,
        ApplicationServiceError::LimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ApplicationServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ApplicationServiceError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn not_found(number: &ApplicationNumber) -> Response {
    let payload = json!({ "error": format!("application {number} not found") });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    let payload = json!({ "error": err.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
