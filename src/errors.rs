use crate::models::StopId;
use thiserror::Error;

/// Every recoverable failure the core can report to a caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusNetError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    #[error("no route found from stop {from} to stop {to}")]
    NoRouteFound { from: StopId, to: StopId },
    #[error("invalid density {0}: density must be a finite value >= 0")]
    InvalidDensity(f64),
    #[error("invalid hour {0}: expected 0-23")]
    InvalidHour(u32),
    #[error("invalid value {value} for parameter {name}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("invalid stop: {0}")]
    InvalidStop(String),
    #[error("network engine is no longer running")]
    EngineUnavailable,
    #[error("configuration error: {0}")]
    Config(String),
}

impl BusNetError {
    pub fn stop_not_found(id: StopId) -> Self {
        BusNetError::NotFound {
            kind: "stop",
            id: id as u64,
        }
    }

    pub fn route_not_found(id: u32) -> Self {
        BusNetError::NotFound {
            kind: "route",
            id: id as u64,
        }
    }

    pub fn driver_not_found(id: u32) -> Self {
        BusNetError::NotFound {
            kind: "driver",
            id: id as u64,
        }
    }

    /// Stable machine-readable name, used as the `error` field of API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            BusNetError::NotFound { .. } => "NotFound",
            BusNetError::InvalidTopology(_) => "InvalidTopology",
            BusNetError::NoRouteFound { .. } => "NoRouteFound",
            BusNetError::InvalidDensity(_) => "InvalidDensity",
            BusNetError::InvalidHour(_) => "InvalidHour",
            BusNetError::InvalidParameter { .. } => "InvalidParameter",
            BusNetError::InvalidStop(_) => "InvalidStop",
            BusNetError::EngineUnavailable => "EngineUnavailable",
            BusNetError::Config(_) => "Config",
        }
    }
}
