use chrono::{DateTime, Utc};
use geodraw::{Coordinate, Geometry};
use serde::{Deserialize, Serialize};

use crate::location::LocationSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Active,
    Completed,
    Cancelled,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Active => "active",
            MissionStatus::Completed => "completed",
            MissionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(MissionStatus::Active),
            "completed" => Some(MissionStatus::Completed),
            "cancelled" => Some(MissionStatus::Cancelled),
            _ => None,
        }
    }
}

/// A tracked work session as stored by the persistence layer
#[derive(Debug, Clone, Serialize)]
pub struct Mission {
    pub id: i64,
    pub property_id: String,
    pub project_id: Option<String>,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub track: Option<Geometry>,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<u64>,
    pub status: MissionStatus,
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<Photo>,
}

/// Everything needed to open a mission record
#[derive(Debug, Clone, PartialEq)]
pub struct NewMission {
    pub property_id: String,
    pub project_id: Option<String>,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
}

/// Summary written when a mission ends successfully
#[derive(Debug, Clone, PartialEq)]
pub struct MissionCompletion {
    pub mission_id: i64,
    /// `None` when fewer than two samples were recorded
    pub track: Option<Geometry>,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub ended_at: DateTime<Utc>,
    /// The raw trail, kept as per-point history
    pub points: Vec<LocationSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoType {
    Before,
    During,
    After,
    General,
}

impl PhotoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoType::Before => "before",
            PhotoType::During => "during",
            PhotoType::After => "after",
            PhotoType::General => "general",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "before" => Some(PhotoType::Before),
            "during" => Some(PhotoType::During),
            "after" => Some(PhotoType::After),
            "general" => Some(PhotoType::General),
            _ => None,
        }
    }
}

/// A photo already uploaded by the capture layer, ready to be recorded
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhotoCapture {
    pub storage_path: String,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    /// Geotag as `[longitude, latitude]`
    #[serde(default)]
    pub location: Option<Coordinate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub mission_id: Option<i64>,
    pub project_id: Option<String>,
    pub storage_path: String,
    pub thumbnail_path: Option<String>,
    pub location: Option<Geometry>,
    pub photo_type: PhotoType,
    pub notes: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl NewPhoto {
    /// A photo taken while a mission is running
    pub fn during_mission(mission_id: i64, capture: PhotoCapture, captured_at: DateTime<Utc>) -> Self {
        Self {
            mission_id: Some(mission_id),
            project_id: None,
            storage_path: capture.storage_path,
            thumbnail_path: capture.thumbnail_path,
            location: capture.location.map(Geometry::Point),
            photo_type: PhotoType::During,
            notes: capture.notes,
            captured_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Photo {
    pub id: i64,
    pub mission_id: Option<i64>,
    pub project_id: Option<String>,
    pub storage_path: String,
    pub thumbnail_path: Option<String>,
    pub location: Option<Geometry>,
    pub photo_type: PhotoType,
    pub notes: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// Project row as listed for a property
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub property_id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub location: Option<Geometry>,
    pub area: Option<Geometry>,
    pub due_date: Option<String>,
}
