use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::{
    AlignmentReview, AverageVelocity, Capability, CapacityResult, PlanningSettings,
    PlanningWorkbook, PortfolioError, RoleRelevanceMap, RosterError, TeamCapacitySummary,
    TeamMember, TeamPiRecord, VelocityError, WorkbookError,
};

#[derive(Clone)]
pub struct AppState {
    workbook: Arc<RwLock<PlanningWorkbook>>,
}

impl AppState {
    pub fn new(workbook: PlanningWorkbook) -> Self {
        Self {
            workbook: Arc::new(RwLock::new(workbook)),
        }
    }

    pub fn with_shared(workbook: Arc<RwLock<PlanningWorkbook>>) -> Self {
        Self { workbook }
    }

    fn workbook(&self) -> Arc<RwLock<PlanningWorkbook>> {
        self.workbook.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<WorkbookError> for ApiError {
    fn from(value: WorkbookError) -> Self {
        let message = value.to_string();
        match value {
            WorkbookError::NoMembers { .. }
            | WorkbookError::Velocity(VelocityError::NoData(_))
            | WorkbookError::Portfolio(PortfolioError::NotFound(_))
            | WorkbookError::Roster(RosterError::MemberNotFound { .. })
            | WorkbookError::Roster(RosterError::EmptySource { .. }) => ApiError::NotFound(message),
            WorkbookError::Roster(RosterError::TargetNotEmpty { .. }) => {
                ApiError::Conflict(message)
            }
            WorkbookError::Polars(_)
            | WorkbookError::Roster(RosterError::Polars(_))
            | WorkbookError::Roster(RosterError::MalformedRow { .. }) => {
                error!(%message, "workbook storage failure");
                ApiError::Internal(message)
            }
            _ => ApiError::Invalid(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/settings", get(get_settings).put(update_settings))
        .route(
            "/teams/:team/pis/:pi/members",
            get(list_members).post(upsert_member),
        )
        .route(
            "/teams/:team/pis/:pi/members/:name",
            delete(delete_member),
        )
        .route("/teams/:team/pis/:pi/roles", get(get_roles).put(replace_roles))
        .route("/teams/:team/pis/:pi/record", get(get_record).put(save_record))
        .route("/teams/:team/pis/:pi/velocity", get(suggest_velocity))
        .route("/teams/:team/pis/:pi/capacity", get(team_capacity))
        .route("/teams/:team/pis/:pi/copy", post(copy_pi))
        .route("/pis/:pi/overview", get(pi_overview))
        .route("/capabilities", get(list_capabilities))
        .route("/capabilities/alignment", get(review_alignment))
        .route("/capabilities/:id/allocations", put(set_allocation))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, workbook: PlanningWorkbook) -> std::io::Result<()> {
    let state = AppState::new(workbook);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "capacity planner HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_settings(State(state): State<AppState>) -> Json<PlanningSettings> {
    let workbook = state.workbook();
    let settings = workbook.read().settings().clone();
    Json(settings)
}

async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<PlanningSettings>,
) -> Result<Json<PlanningSettings>, ApiError> {
    let workbook = state.workbook();
    let mut guard = workbook.write();
    guard.set_settings(settings)?;
    Ok(Json(guard.settings().clone()))
}

async fn list_members(
    State(state): State<AppState>,
    Path((team, pi)): Path<(String, String)>,
) -> Result<Json<Vec<TeamMember>>, ApiError> {
    let workbook = state.workbook();
    let members = workbook.read().members(&team, &pi)?;
    Ok(Json(members))
}

async fn upsert_member(
    State(state): State<AppState>,
    Path((team, pi)): Path<(String, String)>,
    Json(member): Json<TeamMember>,
) -> Result<(StatusCode, Json<TeamMember>), ApiError> {
    let workbook = state.workbook();
    let mut guard = workbook.write();
    let existed = guard
        .roster()
        .member(&team, &pi, &member.name)
        .map_err(WorkbookError::from)?
        .is_some();
    guard.upsert_member(&team, &pi, member.clone())?;
    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(member)))
}

async fn delete_member(
    State(state): State<AppState>,
    Path((team, pi, name)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let workbook = state.workbook();
    workbook.write().delete_member(&team, &pi, &name)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_roles(
    State(state): State<AppState>,
    Path((team, pi)): Path<(String, String)>,
) -> Json<RoleRelevanceMap> {
    let workbook = state.workbook();
    let roles = workbook.read().roles(&team, &pi);
    Json(roles)
}

async fn replace_roles(
    State(state): State<AppState>,
    Path((team, pi)): Path<(String, String)>,
    Json(roles): Json<RoleRelevanceMap>,
) -> Json<RoleRelevanceMap> {
    let workbook = state.workbook();
    let mut guard = workbook.write();
    guard.replace_roles(&team, &pi, roles);
    Json(guard.roles(&team, &pi))
}

async fn get_record(
    State(state): State<AppState>,
    Path((team, pi)): Path<(String, String)>,
) -> Result<Json<TeamPiRecord>, ApiError> {
    let workbook = state.workbook();
    let guard = workbook.read();
    guard
        .team_record(&team, &pi)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no record for team '{team}' in PI {pi}")))
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedRecord {
    record: TeamPiRecord,
    members_updated: usize,
}

async fn save_record(
    State(state): State<AppState>,
    Path((team, pi)): Path<(String, String)>,
    Json(record): Json<TeamPiRecord>,
) -> Result<Json<SavedRecord>, ApiError> {
    if record.team != team || record.pi != pi {
        return Err(ApiError::invalid(
            "team or PI in payload does not match path parameters",
        ));
    }
    let workbook = state.workbook();
    let members_updated = workbook.write().upsert_team_record(record.clone())?;
    Ok(Json(SavedRecord {
        record,
        members_updated,
    }))
}

#[derive(Debug, Deserialize)]
struct VelocityQuery {
    members: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VelocitySuggestion {
    record: TeamPiRecord,
    baseline: AverageVelocity,
    summary: String,
}

async fn suggest_velocity(
    State(state): State<AppState>,
    Path((team, pi)): Path<(String, String)>,
    Query(query): Query<VelocityQuery>,
) -> Result<Json<VelocitySuggestion>, ApiError> {
    let workbook = state.workbook();
    let (record, baseline) = workbook
        .read()
        .suggest_velocity_record(&team, &pi, query.members)?;
    let summary = baseline.summary();
    Ok(Json(VelocitySuggestion {
        record,
        baseline,
        summary,
    }))
}

async fn team_capacity(
    State(state): State<AppState>,
    Path((team, pi)): Path<(String, String)>,
) -> Result<Json<CapacityResult>, ApiError> {
    let workbook = state.workbook();
    let result = workbook.read().team_capacity(&team, &pi)?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct CopyPayload {
    target_pi: String,
    #[serde(default)]
    overwrite: bool,
}

async fn copy_pi(
    State(state): State<AppState>,
    Path((team, pi)): Path<(String, String)>,
    Json(payload): Json<CopyPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if payload.target_pi == pi {
        return Err(ApiError::invalid("target PI must differ from source PI"));
    }
    let workbook = state.workbook();
    let copied = workbook
        .write()
        .copy_pi(&team, &pi, &payload.target_pi, payload.overwrite)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "team": team, "target_pi": payload.target_pi, "copied": copied })),
    ))
}

async fn pi_overview(
    State(state): State<AppState>,
    Path(pi): Path<String>,
) -> Result<Json<Vec<TeamCapacitySummary>>, ApiError> {
    let workbook = state.workbook();
    let overview = workbook.read().pi_overview(&pi)?;
    Ok(Json(overview))
}

#[derive(Debug, Deserialize)]
struct CapabilityQuery {
    #[serde(default)]
    pi: String,
    #[serde(default)]
    area: String,
}

async fn list_capabilities(
    State(state): State<AppState>,
    Query(query): Query<CapabilityQuery>,
) -> Json<Vec<Capability>> {
    let workbook = state.workbook();
    let guard = workbook.read();
    let selected = guard
        .capabilities_for(&query.pi, &query.area)
        .into_iter()
        .cloned()
        .collect();
    Json(selected)
}

async fn review_alignment(
    State(state): State<AppState>,
    Query(query): Query<CapabilityQuery>,
) -> Json<AlignmentReview> {
    let workbook = state.workbook();
    let review = workbook.read().review_alignment(&query.pi, &query.area);
    Json(review)
}

#[derive(Debug, Deserialize)]
struct AllocationPayload {
    pi: String,
    sp: f64,
}

async fn set_allocation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AllocationPayload>,
) -> Result<Json<Capability>, ApiError> {
    let workbook = state.workbook();
    let mut guard = workbook.write();
    guard.set_allocation(&id, &payload.pi, payload.sp)?;
    guard
        .capabilities()
        .iter()
        .find(|capability| capability.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::Internal("capability not found after update".into()))
}
