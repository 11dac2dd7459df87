use crate::errors::BusNetError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type StopId = u32;
pub type RouteId = u32;
pub type DriverId = u32;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub current_density: f64,
    pub last_updated: DateTime<Utc>,
}

impl Stop {
    /// Rejects coordinates outside the WGS84 range.
    pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), BusNetError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(BusNetError::InvalidStop(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(BusNetError::InvalidStop(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    /// Stop ids in traversal order.
    pub stops: Vec<StopId>,
    pub is_active: bool,
    /// Kilometres, summed over consecutive stops.
    pub total_distance: f64,
    /// Minutes.
    pub estimated_time: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    #[default]
    OffDuty,
    Active,
    OnBreak,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreakSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BreakSlot {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub status: DriverStatus,
    pub current_route_id: Option<RouteId>,
    pub hours_today: f64,
    /// Chronological, non-overlapping.
    pub break_slots: Vec<BreakSlot>,
    pub next_break: Option<DateTime<Utc>>,
}

impl Driver {
    pub fn new(id: DriverId, name: String) -> Self {
        Driver {
            id,
            name,
            status: DriverStatus::OffDuty,
            current_route_id: None,
            hours_today: 0.0,
            break_slots: Vec::new(),
            next_break: None,
        }
    }
}

// Request bodies for records created through the API.

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewStop {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub current_density: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewRoute {
    pub name: String,
    pub stops: Vec<StopId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub estimated_time: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewDriver {
    pub name: String,
}

fn default_true() -> bool {
    true
}
