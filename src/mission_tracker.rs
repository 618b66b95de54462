use std::fmt;

use chrono::{DateTime, Utc};
use geodraw::{Coordinate, Geometry};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::location::LocationSample;
use crate::mission::{MissionCompletion, NewMission, NewPhoto, PhotoCapture};
use crate::store::{MissionStore, StoreError};
use crate::utilities::{elapsed_whole_seconds, format_distance, format_duration, millis_to_datetime, Clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerState {
    Idle,
    Active,
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerState::Idle => write!(f, "idle"),
            TrackerState::Active => write!(f, "active"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: TrackerState,
    },

    #[error("Cannot {operation}: mission {requested} is not the active mission {active}")]
    MissionMismatch {
        operation: &'static str,
        requested: i64,
        active: i64,
    },

    #[error("Invalid location sample: lat={latitude}, lon={longitude}")]
    InvalidSample { latitude: f64, longitude: f64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartMission {
    pub property_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub user_id: String,
}

/// Live view of the running mission
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub mission_id: i64,
    pub property_id: String,
    pub project_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub distance_meters: f64,
    pub point_count: usize,
    pub photo_count: u32,
    pub last_position: Option<Coordinate>,
    pub elapsed_display: String,
    pub distance_display: String,
}

/// What `end` reports back once the mission is stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionSummary {
    pub mission_id: i64,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub point_count: usize,
}

#[derive(Debug, Clone)]
struct ActiveMission {
    mission_id: i64,
    property_id: String,
    project_id: Option<String>,
    started_at_ms: i64,
    trail: Vec<LocationSample>,
    distance_m: f64,
    elapsed_seconds: u64,
    photo_count: u32,
}

impl ActiveMission {
    fn track_geometry(&self) -> Option<Geometry> {
        if self.trail.len() < 2 {
            return None;
        }
        Some(Geometry::LineString(self.trail.iter().map(LocationSample::coordinate).collect()))
    }
}

/// Owns the one running mission of this process.
///
/// Location samples and clock ticks mutate it synchronously. Start, end,
/// cancel and photo attachment await the store, and leave the tracker exactly
/// as it was when the store reports a failure. The one exception is a store
/// reporting the mission as no longer active on end or cancel: the session is
/// closed locally, since no retry can succeed.
pub struct MissionTracker<S, C> {
    store: S,
    clock: C,
    active: Option<ActiveMission>,
}

impl<S: MissionStore, C: Clock> MissionTracker<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            active: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        if self.active.is_some() {
            TrackerState::Active
        } else {
            TrackerState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn mission_id(&self) -> Option<i64> {
        self.active.as_ref().map(|m| m.mission_id)
    }

    pub fn trail(&self) -> &[LocationSample] {
        self.active.as_ref().map(|m| m.trail.as_slice()).unwrap_or(&[])
    }

    pub fn distance_m(&self) -> f64 {
        self.active.as_ref().map(|m| m.distance_m).unwrap_or(0.0)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.active.as_ref().map(|m| m.elapsed_seconds).unwrap_or(0)
    }

    pub fn point_count(&self) -> usize {
        self.trail().len()
    }

    pub fn photo_count(&self) -> u32 {
        self.active.as_ref().map(|m| m.photo_count).unwrap_or(0)
    }

    /// The trail so far as a line; `None` until two samples exist
    pub fn track_geometry(&self) -> Option<Geometry> {
        self.active.as_ref().and_then(ActiveMission::track_geometry)
    }

    pub fn status(&self) -> Option<TrackerStatus> {
        let mission = self.active.as_ref()?;
        Some(TrackerStatus {
            mission_id: mission.mission_id,
            property_id: mission.property_id.clone(),
            project_id: mission.project_id.clone(),
            started_at: millis_to_datetime(mission.started_at_ms),
            elapsed_seconds: mission.elapsed_seconds,
            distance_meters: mission.distance_m,
            point_count: mission.trail.len(),
            photo_count: mission.photo_count,
            last_position: mission.trail.last().map(LocationSample::coordinate),
            elapsed_display: format_duration(mission.elapsed_seconds),
            distance_display: format_distance(mission.distance_m),
        })
    }

    fn require_active(&self, operation: &'static str) -> Result<&ActiveMission, TrackerError> {
        self.active.as_ref().ok_or(TrackerError::InvalidTransition {
            operation,
            state: TrackerState::Idle,
        })
    }

    fn require_active_mut(&mut self, operation: &'static str) -> Result<&mut ActiveMission, TrackerError> {
        self.active.as_mut().ok_or(TrackerError::InvalidTransition {
            operation,
            state: TrackerState::Idle,
        })
    }

    /// Check that a request addressed to `mission_id` targets the running mission
    pub fn ensure_mission(&self, mission_id: i64, operation: &'static str) -> Result<(), TrackerError> {
        let active = self.require_active(operation)?.mission_id;
        if active != mission_id {
            return Err(TrackerError::MissionMismatch {
                operation,
                requested: mission_id,
                active,
            });
        }
        Ok(())
    }

    /// Open a mission record and begin accepting samples.
    pub async fn start(&mut self, request: StartMission) -> Result<i64, TrackerError> {
        if let Some(mission) = &self.active {
            warn!("Refusing to start a mission while mission {} is active", mission.mission_id);
            return Err(TrackerError::InvalidTransition {
                operation: "start",
                state: TrackerState::Active,
            });
        }

        let now_ms = self.clock.now_ms();
        let new_mission = NewMission {
            property_id: request.property_id.clone(),
            project_id: request.project_id.clone(),
            user_id: request.user_id.clone(),
            started_at: millis_to_datetime(now_ms),
        };

        let mission_id = match self.store.create_mission(new_mission).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to create mission for property {}: {}", request.property_id, e);
                return Err(e.into());
            }
        };

        info!(
            "Mission {} started (property {}, project {})",
            mission_id,
            request.property_id,
            request.project_id.as_deref().unwrap_or("none")
        );
        self.active = Some(ActiveMission {
            mission_id,
            property_id: request.property_id,
            project_id: request.project_id,
            started_at_ms: now_ms,
            trail: Vec::new(),
            distance_m: 0.0,
            elapsed_seconds: 0,
            photo_count: 0,
        });
        Ok(mission_id)
    }

    /// Append a sample to the trail and extend the running distance.
    ///
    /// Samples are taken in delivery order, unfiltered; the leg from the
    /// previous sample is always added. Positions outside WGS84 are refused.
    pub fn add_track_point(&mut self, sample: LocationSample) -> Result<(), TrackerError> {
        let mission = self.require_active_mut("add track point")?;
        if !sample.is_valid() {
            return Err(TrackerError::InvalidSample {
                latitude: sample.latitude,
                longitude: sample.longitude,
            });
        }

        if let Some(last) = mission.trail.last() {
            mission.distance_m += last.distance_to(&sample);
        }
        mission.trail.push(sample);

        debug!(
            "Mission {} point {}: lat={:.6}, lon={:.6}, distance={:.1} m",
            mission.mission_id,
            mission.trail.len(),
            sample.latitude,
            sample.longitude,
            mission.distance_m
        );
        Ok(())
    }

    /// Recompute elapsed time from the start timestamp. Returns the new value.
    pub fn tick(&mut self, now_ms: i64) -> Result<u64, TrackerError> {
        let mission = self.require_active_mut("tick")?;
        mission.elapsed_seconds = elapsed_whole_seconds(mission.started_at_ms, now_ms);
        Ok(mission.elapsed_seconds)
    }

    /// Store the trail and summary, then return to idle.
    pub async fn end(&mut self) -> Result<MissionSummary, TrackerError> {
        let now_ms = self.clock.now_ms();
        let mission = self.require_active("end")?;

        let duration_seconds = mission
            .elapsed_seconds
            .max(elapsed_whole_seconds(mission.started_at_ms, now_ms));
        let completion = MissionCompletion {
            mission_id: mission.mission_id,
            track: mission.track_geometry(),
            distance_meters: mission.distance_m,
            duration_seconds,
            ended_at: millis_to_datetime(now_ms),
            points: mission.trail.clone(),
        };
        let summary = MissionSummary {
            mission_id: mission.mission_id,
            distance_meters: mission.distance_m,
            duration_seconds,
            point_count: mission.trail.len(),
        };

        match self.store.complete_mission(completion).await {
            Ok(()) => {}
            Err(e @ StoreError::MissionNotFound(_)) => {
                warn!("Mission {} is no longer active in the store, closing it locally", summary.mission_id);
                self.active = None;
                return Err(e.into());
            }
            Err(e) => {
                warn!("Failed to complete mission {}, keeping it active: {}", summary.mission_id, e);
                return Err(e.into());
            }
        }

        self.active = None;
        info!(
            "Mission {} completed: {} points, {:.1} m, {} s",
            summary.mission_id, summary.point_count, summary.distance_meters, summary.duration_seconds
        );
        Ok(summary)
    }

    /// Mark the mission cancelled and discard the trail. Returns the mission id.
    pub async fn cancel(&mut self) -> Result<i64, TrackerError> {
        let now_ms = self.clock.now_ms();
        let mission_id = self.require_active("cancel")?.mission_id;

        match self.store.cancel_mission(mission_id, millis_to_datetime(now_ms)).await {
            Ok(()) => {}
            Err(e @ StoreError::MissionNotFound(_)) => {
                warn!("Mission {} is no longer active in the store, closing it locally", mission_id);
                self.active = None;
                return Err(e.into());
            }
            Err(e) => {
                warn!("Failed to cancel mission {}, keeping it active: {}", mission_id, e);
                return Err(e.into());
            }
        }

        if let Some(mission) = self.active.take() {
            info!("Mission {} cancelled, {} points discarded", mission_id, mission.trail.len());
        }
        Ok(mission_id)
    }

    /// Record a photo taken during the mission. Returns the photo id.
    pub async fn attach_photo(&mut self, capture: PhotoCapture) -> Result<i64, TrackerError> {
        let now_ms = self.clock.now_ms();
        let mission_id = self.require_active("attach photo")?.mission_id;

        let photo = NewPhoto::during_mission(mission_id, capture, millis_to_datetime(now_ms));
        let photo_id = match self.store.add_photo(photo).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to record photo for mission {}: {}", mission_id, e);
                return Err(e.into());
            }
        };

        if let Some(mission) = self.active.as_mut() {
            mission.photo_count += 1;
        }
        debug!("Photo {} attached to mission {}", photo_id, mission_id);
        Ok(photo_id)
    }
}
