//! HTTP routes and handlers

use crate::auth::gate::{enforce, GateChain, RouteGate};
use crate::auth::{Identity, LoginOutcome, Role, TokenCodec};
use crate::records::{ClinicalPatch, Page, PageRequest, Patient, PatientPatch};
use crate::server::error::ApiError;
use crate::server::AppState;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{middleware, Extension, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Query string for list and search routes. Values are parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<String>,
    pub q: Option<String>,
}

impl ListParams {
    fn page_request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref(), self.page_size.as_deref())
    }
}

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    let codec = state.codec.clone();

    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/login", post(login_handler));

    let me = gated(
        Router::new().route("/api/v1/me", get(me_handler)),
        &codec,
        GateChain::authenticated(),
    );

    let front_desk = gated(
        Router::new()
            .route("/api/v1/patients", post(create_patient).get(list_patients))
            .route("/api/v1/patients/search", get(search_patients))
            .route(
                "/api/v1/patients/{id}",
                get(get_patient).put(update_patient).delete(delete_patient),
            ),
        &codec,
        GateChain::role(Role::FrontDesk),
    );

    let clinician = gated(
        Router::new()
            .route("/api/v1/doctor/patients", get(list_patients))
            .route("/api/v1/doctor/patients/{id}", get(get_patient))
            .route("/api/v1/doctor/patients/{id}/medical", put(update_medical)),
        &codec,
        GateChain::role(Role::Clinician),
    );

    Router::new()
        .merge(public)
        .merge(me)
        .merge(front_desk)
        .merge(clinician)
        .fallback(not_found_handler)
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Open CORS policy. Preflight requests are answered here, before any gate.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };
    allow_cross_origin(response.headers_mut());
    response
}

fn allow_cross_origin(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

fn gated(
    router: Router<AppState>,
    codec: &Arc<TokenCodec>,
    chain: GateChain,
) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(
        RouteGate::new(codec.clone(), chain),
        enforce,
    ))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}

async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginOutcome>, ApiError> {
    let Json(request) = payload?;
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::MalformedRequest(
            "email and password are required".to_string(),
        ));
    }
    let outcome = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(outcome))
}

async fn me_handler(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

async fn create_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<PatientPatch>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(patch) = payload?;
    let patient = state.patients.create(&identity, patch).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn list_patients(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<Patient>>, ApiError> {
    let Query(params) = params?;
    let page = state.patients.list(&identity, params.page_request()).await?;
    Ok(Json(page))
}

async fn search_patients(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<Patient>>, ApiError> {
    let Query(params) = params?;
    let term = params.q.as_deref().unwrap_or_default();
    let page = state
        .patients
        .search(&identity, term, params.page_request())
        .await?;
    Ok(Json(page))
}

async fn get_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Patient>, ApiError> {
    let Path(id) = id?;
    let patient = state.patients.get(&identity, id).await?;
    Ok(Json(patient))
}

async fn update_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PatientPatch>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let patient = state.patients.update(&identity, id, patch).await?;
    Ok(Json(patient))
}

async fn update_medical(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ClinicalPatch>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let Path(id) = id?;
    let Json(clinical) = payload?;
    let patient = state
        .patients
        .update(&identity, id, PatientPatch::clinical(clinical))
        .await?;
    Ok(Json(patient))
}

async fn delete_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.patients.delete(&identity, id).await?;
    debug!(patient_id = id, "Delete request completed");
    Ok(StatusCode::NO_CONTENT)
}
