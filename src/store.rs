use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::mission::{MissionCompletion, NewMission, NewPhoto};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mysql::Error),

    #[error("Database URL error: {0}")]
    Url(#[from] mysql::UrlError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Mission not found: {0}")]
    MissionNotFound(i64),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("User {user_id} already has active mission {mission_id} on property {property_id}")]
    ActiveMissionExists {
        mission_id: i64,
        user_id: String,
        property_id: String,
    },

    #[error("Stored geometry is not valid GeoJSON: {0}")]
    Geometry(#[from] serde_json::Error),

    #[error("Invalid timestamp in database: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Unknown mission status: {0}")]
    UnknownStatus(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence contract the mission tracker relies on.
///
/// Every call may fail; the tracker keeps its in-memory state untouched when
/// one does so the caller can retry.
pub trait MissionStore: Send + Sync {
    /// Open a mission record with status `active` and return its identifier
    fn create_mission(&self, mission: NewMission) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Store the track and summary and mark the record `completed`
    fn complete_mission(&self, completion: MissionCompletion) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Mark the record `cancelled`, leaving track, distance and duration unset
    fn cancel_mission(
        &self,
        mission_id: i64,
        ended_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Record an uploaded photo and return its identifier
    fn add_photo(&self, photo: NewPhoto) -> impl Future<Output = Result<i64, StoreError>> + Send;
}
