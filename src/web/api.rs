use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    routing::post,
    Router,
};
use geodraw::{Coordinate, DrawingMode, DrawingSession, Geometry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::app_metrics::AppMetrics;
use crate::db::MissionDatabase;
use crate::location::LocationSample;
use crate::mission::{Mission, PhotoCapture, ProjectSummary};
use crate::mission_tracker::{
    MissionSummary, MissionTracker, StartMission, TrackerError, TrackerState, TrackerStatus,
};
use crate::store::StoreError;
use crate::utilities::SystemClock;

pub type SharedTracker = Arc<Mutex<MissionTracker<MissionDatabase, SystemClock>>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<MissionDatabase>,
    pub tracker: SharedTracker,
    pub lifecycle: LifecycleGate,
    pub metrics: Arc<std::sync::Mutex<AppMetrics>>,
}

impl AppState {
    pub fn new(db: Arc<MissionDatabase>, tracker: SharedTracker, metrics: Arc<std::sync::Mutex<AppMetrics>>) -> Self {
        Self {
            db,
            tracker,
            lifecycle: LifecycleGate::default(),
            metrics,
        }
    }

    fn count(&self, update: impl FnOnce(&mut AppMetrics)) {
        count(&self.metrics, update);
    }

    fn tracker_failed(&self, operation: &str, e: &TrackerError) {
        match e {
            TrackerError::Store(_) => {
                error!(error = %e, "Failed to {} mission", operation);
                self.count(|m| m.store_errors += 1);
            }
            TrackerError::InvalidTransition { .. }
            | TrackerError::MissionMismatch { .. }
            | TrackerError::InvalidSample { .. } => warn!(error = %e, "Rejected {} request", operation),
        }
    }
}

/// Held for the whole of a start, end, cancel or photo call.
///
/// A second lifecycle call is refused while one is in flight, never queued.
#[derive(Clone, Default)]
pub struct LifecycleGate(Arc<Mutex<()>>);

impl LifecycleGate {
    pub fn try_enter(&self) -> Option<MutexGuard<'_, ()>> {
        self.0.try_lock().ok()
    }
}

fn count(metrics: &std::sync::Mutex<AppMetrics>, update: impl FnOnce(&mut AppMetrics)) {
    if let Ok(mut metrics) = metrics.lock() {
        update(&mut metrics);
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(message),
        }
    }
}

fn busy<T>(metrics: &std::sync::Mutex<AppMetrics>, operation: &str) -> Json<ApiResponse<T>> {
    warn!("Rejected {} request: another mission operation is in progress", operation);
    count(metrics, |m| m.busy_rejections += 1);
    Json(ApiResponse::error(format!(
        "Cannot {} mission: another mission operation is in progress",
        operation
    )))
}

/// Run a blocking read against the database off the async workers
async fn with_db<T, F>(db: &Arc<MissionDatabase>, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&MissionDatabase) -> Result<T, StoreError> + Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || op(&db)).await?
}

// Query parameters
#[derive(Debug, Deserialize)]
pub struct PropertyQuery {
    pub property_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MissionIdQuery {
    pub id: i64,
}

/// Body of end and cancel
#[derive(Debug, Deserialize)]
pub struct MissionRef {
    pub mission_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TrackPointsRequest {
    pub mission_id: i64,
    pub points: Vec<LocationSample>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoRequest {
    pub mission_id: i64,
    #[serde(flatten)]
    pub capture: PhotoCapture,
}

#[derive(Debug, Deserialize)]
pub struct ProjectAreaRequest {
    pub project_id: String,
    pub mode: DrawingMode,
    /// Taps in the order they were placed, each `[longitude, latitude]`
    pub points: Vec<Coordinate>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub database: bool,
    pub tracker: TrackerState,
}

#[derive(Debug, Serialize)]
pub struct TrackPointsAccepted {
    pub accepted: usize,
    pub point_count: usize,
    pub distance_meters: f64,
}

/// A batch is applied only when every sample is a usable WGS84 position
pub fn check_samples(samples: &[LocationSample]) -> Result<(), String> {
    match samples.iter().position(|s| !s.is_valid()) {
        Some(index) => Err(format!(
            "Invalid location sample at index {}: lat={}, lon={}",
            index, samples[index].latitude, samples[index].longitude
        )),
        None => Ok(()),
    }
}

/// Replay the taps through a drawing session and return the finished, valid geometry
pub fn drawn_geometry(mode: DrawingMode, points: Vec<Coordinate>) -> Result<Geometry, String> {
    if let Some(bad) = points.iter().find(|c| !c.is_valid()) {
        return Err(format!("Invalid coordinate: {}", bad));
    }

    let mut session = DrawingSession::replay(mode, points);
    let geometry = match session.geometry() {
        Some(geometry) => geometry.clone(),
        None => session.finish().ok_or_else(|| {
            format!(
                "A {} needs at least {} points, got {}",
                mode,
                mode.required_points(),
                session.points().len()
            )
        })?,
    };

    geometry.validate().map_err(|e| e.to_string())?;
    Ok(geometry)
}

pub async fn get_health(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthStatus>>, StatusCode> {
    let database = match with_db(&state.db, |db| db.health_check()).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            false
        }
    };
    let tracker = state.tracker.lock().await.state();
    Ok(Json(ApiResponse::ok(HealthStatus { database, tracker })))
}

pub async fn get_missions(
    State(state): State<AppState>,
    Query(params): Query<PropertyQuery>,
) -> Result<Json<ApiResponse<Vec<Mission>>>, StatusCode> {
    info!(?params, "GET /api/missions called");
    match with_db(&state.db, move |db| db.fetch_missions(&params.property_id)).await {
        Ok(missions) => Ok(Json(ApiResponse::ok(missions))),
        Err(e) => {
            error!(error = %e, "Failed to fetch missions");
            Ok(Json(ApiResponse::error(e.to_string())))
        }
    }
}

pub async fn get_mission(
    State(state): State<AppState>,
    Query(params): Query<MissionIdQuery>,
) -> Result<Json<ApiResponse<Mission>>, StatusCode> {
    info!(?params, "GET /api/mission called");
    let id = params.id;
    match with_db(&state.db, move |db| db.fetch_mission(id)).await {
        Ok(Some(mission)) => Ok(Json(ApiResponse::ok(mission))),
        Ok(None) => {
            error!(mission_id = id, "Mission not found");
            Ok(Json(ApiResponse::error(StoreError::MissionNotFound(id).to_string())))
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch mission");
            Ok(Json(ApiResponse::error(e.to_string())))
        }
    }
}

pub async fn get_projects(
    State(state): State<AppState>,
    Query(params): Query<PropertyQuery>,
) -> Result<Json<ApiResponse<Vec<ProjectSummary>>>, StatusCode> {
    info!(?params, "GET /api/projects called");
    match with_db(&state.db, move |db| db.fetch_projects(&params.property_id)).await {
        Ok(projects) => Ok(Json(ApiResponse::ok(projects))),
        Err(e) => {
            error!(error = %e, "Failed to fetch projects");
            Ok(Json(ApiResponse::error(e.to_string())))
        }
    }
}

pub async fn get_active_mission(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Option<TrackerStatus>>>, StatusCode> {
    let status = state.tracker.lock().await.status();
    Ok(Json(ApiResponse::ok(status)))
}

pub async fn start_mission(
    State(state): State<AppState>,
    Json(params): Json<StartMission>,
) -> Result<Json<ApiResponse<i64>>, StatusCode> {
    info!(?params, "POST /api/mission/start called");
    let Some(_gate) = state.lifecycle.try_enter() else {
        return Ok(busy(&state.metrics, "start"));
    };

    let mut tracker = state.tracker.lock().await;
    match tracker.start(params).await {
        Ok(mission_id) => {
            state.count(|m| m.missions_started += 1);
            Ok(Json(ApiResponse::ok(mission_id)))
        }
        Err(e) => {
            state.tracker_failed("start", &e);
            Ok(Json(ApiResponse::error(e.to_string())))
        }
    }
}

pub async fn add_track_points(
    State(state): State<AppState>,
    Json(request): Json<TrackPointsRequest>,
) -> Result<Json<ApiResponse<TrackPointsAccepted>>, StatusCode> {
    if let Err(message) = check_samples(&request.points) {
        warn!(mission_id = request.mission_id, "Rejected track points: {}", message);
        return Ok(Json(ApiResponse::error(message)));
    }

    let mut tracker = state.tracker.lock().await;
    if let Err(e) = tracker.ensure_mission(request.mission_id, "add track points") {
        state.tracker_failed("add track points", &e);
        return Ok(Json(ApiResponse::error(e.to_string())));
    }

    let mut accepted = 0;
    for sample in request.points {
        if let Err(e) = tracker.add_track_point(sample) {
            state.tracker_failed("record track point for", &e);
            return Ok(Json(ApiResponse::error(e.to_string())));
        }
        accepted += 1;
    }
    state.count(|m| m.track_points += accepted as u64);

    Ok(Json(ApiResponse::ok(TrackPointsAccepted {
        accepted,
        point_count: tracker.point_count(),
        distance_meters: tracker.distance_m(),
    })))
}

pub async fn end_mission(
    State(state): State<AppState>,
    Json(params): Json<MissionRef>,
) -> Result<Json<ApiResponse<MissionSummary>>, StatusCode> {
    info!(?params, "POST /api/mission/end called");
    let Some(_gate) = state.lifecycle.try_enter() else {
        return Ok(busy(&state.metrics, "end"));
    };

    let mut tracker = state.tracker.lock().await;
    if let Err(e) = tracker.ensure_mission(params.mission_id, "end") {
        state.tracker_failed("end", &e);
        return Ok(Json(ApiResponse::error(e.to_string())));
    }
    match tracker.end().await {
        Ok(summary) => {
            state.count(|m| m.missions_completed += 1);
            Ok(Json(ApiResponse::ok(summary)))
        }
        Err(e) => {
            state.tracker_failed("end", &e);
            Ok(Json(ApiResponse::error(e.to_string())))
        }
    }
}

pub async fn cancel_mission(
    State(state): State<AppState>,
    Json(params): Json<MissionRef>,
) -> Result<Json<ApiResponse<i64>>, StatusCode> {
    info!(?params, "POST /api/mission/cancel called");
    let Some(_gate) = state.lifecycle.try_enter() else {
        return Ok(busy(&state.metrics, "cancel"));
    };

    let mut tracker = state.tracker.lock().await;
    if let Err(e) = tracker.ensure_mission(params.mission_id, "cancel") {
        state.tracker_failed("cancel", &e);
        return Ok(Json(ApiResponse::error(e.to_string())));
    }
    match tracker.cancel().await {
        Ok(mission_id) => {
            state.count(|m| m.missions_cancelled += 1);
            Ok(Json(ApiResponse::ok(mission_id)))
        }
        Err(e) => {
            state.tracker_failed("cancel", &e);
            Ok(Json(ApiResponse::error(e.to_string())))
        }
    }
}

pub async fn attach_photo(
    State(state): State<AppState>,
    Json(params): Json<PhotoRequest>,
) -> Result<Json<ApiResponse<i64>>, StatusCode> {
    info!(?params, "POST /api/mission/photo called");
    let Some(_gate) = state.lifecycle.try_enter() else {
        return Ok(busy(&state.metrics, "attach photo to"));
    };

    let mut tracker = state.tracker.lock().await;
    if let Err(e) = tracker.ensure_mission(params.mission_id, "attach photo") {
        state.tracker_failed("attach photo to", &e);
        return Ok(Json(ApiResponse::error(e.to_string())));
    }
    match tracker.attach_photo(params.capture).await {
        Ok(photo_id) => {
            state.count(|m| m.photos += 1);
            Ok(Json(ApiResponse::ok(photo_id)))
        }
        Err(e) => {
            state.tracker_failed("attach photo to", &e);
            Ok(Json(ApiResponse::error(e.to_string())))
        }
    }
}

pub async fn update_project_area(
    State(state): State<AppState>,
    Json(params): Json<ProjectAreaRequest>,
) -> Result<Json<ApiResponse<Geometry>>, StatusCode> {
    info!(project_id = %params.project_id, mode = %params.mode, points = params.points.len(), "POST /api/project/area called");

    let geometry = match drawn_geometry(params.mode, params.points) {
        Ok(geometry) => geometry,
        Err(message) => {
            warn!(project_id = %params.project_id, "Rejected drawing: {}", message);
            return Ok(Json(ApiResponse::error(message)));
        }
    };

    let project_id = params.project_id;
    let stored = geometry.clone();
    match with_db(&state.db, move |db| db.update_project_geometry(&project_id, &stored)).await {
        Ok(()) => Ok(Json(ApiResponse::ok(geometry))),
        Err(e) => {
            error!(error = %e, "Failed to update project area");
            Ok(Json(ApiResponse::error(e.to_string())))
        }
    }
}

pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/missions", get(get_missions))
        .route("/mission", get(get_mission))
        .route("/projects", get(get_projects))
        .route("/mission/active", get(get_active_mission))
        .route("/mission/start", post(start_mission))
        .route("/mission/track_points", post(add_track_points))
        .route("/mission/end", post(end_mission))
        .route("/mission/cancel", post(cancel_mission))
        .route("/mission/photo", post(attach_photo))
        .route("/project/area", post(update_project_area))
        .with_state(state)
}
