use crate::errors::BusNetError;
use crate::models::{Driver, DriverId, Route, RouteId, Stop, StopId};
use crate::network::NetworkModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk description of a network: the JSON document read at start-up.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct NetworkSeed {
    pub stops: Vec<StopSeed>,
    #[serde(default)]
    pub routes: Vec<RouteSeed>,
    #[serde(default)]
    pub drivers: Vec<DriverSeed>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StopSeed {
    pub id: StopId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub current_density: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteSeed {
    pub id: RouteId,
    pub name: String,
    pub stops: Vec<StopId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Minutes. Derived from distance and average speed when absent.
    #[serde(default)]
    pub estimated_time: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverSeed {
    pub id: DriverId,
    pub name: String,
    #[serde(default)]
    pub hours_today: f64,
}

fn default_active() -> bool {
    true
}

impl NetworkSeed {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BusNetError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BusNetError::Config(format!("failure reading {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            BusNetError::Config(format!("failure decoding {}: {}", path.display(), e))
        })
    }

    /// Builds the network model and the initial (off duty) driver roster.
    pub fn into_parts(
        self,
        now: DateTime<Utc>,
        average_speed_kmh: f64,
    ) -> Result<(NetworkModel, Vec<Driver>), BusNetError> {
        let stops = self
            .stops
            .into_iter()
            .map(|s| Stop {
                id: s.id,
                name: s.name,
                latitude: s.latitude,
                longitude: s.longitude,
                current_density: s.current_density,
                last_updated: now,
            })
            .collect();

        let routes = self
            .routes
            .into_iter()
            .map(|r| Route {
                id: r.id,
                name: r.name,
                stops: r.stops,
                is_active: r.is_active,
                total_distance: 0.0,
                estimated_time: r.estimated_time.unwrap_or(0.0),
            })
            .collect();

        let model = NetworkModel::new(stops, routes, average_speed_kmh)?;

        let mut drivers = Vec::with_capacity(self.drivers.len());
        for d in self.drivers {
            if !d.hours_today.is_finite() || d.hours_today < 0.0 {
                return Err(BusNetError::Config(format!(
                    "driver {} has invalid hours_today {}",
                    d.id, d.hours_today
                )));
            }
            if drivers.iter().any(|existing: &Driver| existing.id == d.id) {
                return Err(BusNetError::Config(format!("duplicate driver id {}", d.id)));
            }
            let mut driver = Driver::new(d.id, d.name);
            driver.hours_today = d.hours_today;
            drivers.push(driver);
        }
        drivers.sort_by_key(|d| d.id);

        Ok((model, drivers))
    }

    /// Ten stops around Pune, five drivers, and one route per consecutive
    /// triplet of stops.
    pub fn pune_default() -> Self {
        let stops = [
            ("Swargate Bus Terminal", 18.5204, 73.8567),
            ("Pune Station Bus Stand", 18.5314, 73.8446),
            ("Kharadi Bus Stand", 18.5525, 73.9375),
            ("Hadapsar Bus Stand", 18.5177, 73.9252),
            ("Katraj Bus Stand", 18.4568, 73.8665),
            ("Bund Garden Bus Stand", 18.5362, 73.8931),
            ("Koregaon Park Bus Stand", 18.5362, 73.8931),
            ("Aundh Bus Stand", 18.5590, 73.8077),
            ("Baner Bus Stand", 18.5590, 73.7867),
            ("Wakad Bus Stand", 18.5833, 73.7667),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (name, latitude, longitude))| StopSeed {
            id: i as StopId + 1,
            name: name.to_string(),
            latitude,
            longitude,
            current_density: 0.0,
        })
        .collect::<Vec<_>>();

        let routes = stops
            .chunks_exact(3)
            .enumerate()
            .map(|(i, chunk)| RouteSeed {
                id: i as RouteId + 1,
                name: format!("Route {}", i + 1),
                stops: chunk.iter().map(|s| s.id).collect(),
                is_active: true,
                estimated_time: None,
            })
            .collect();

        let drivers = [
            "Rajesh Kumar",
            "Suresh Patel",
            "Amit Singh",
            "Priya Sharma",
            "Vikram Desai",
        ]
        .into_iter()
        .enumerate()
        .map(|(i, name)| DriverSeed {
            id: i as DriverId + 1,
            name: name.to_string(),
            hours_today: 0.0,
        })
        .collect();

        NetworkSeed {
            stops,
            routes,
            drivers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pune_default_builds() {
        let (model, drivers) = NetworkSeed::pune_default()
            .into_parts(Utc::now(), 20.0)
            .unwrap();

        assert_eq!(model.stops().count(), 10);
        assert_eq!(model.routes().count(), 3);
        assert_eq!(drivers.len(), 5);

        let route_1 = model.get_route(1).unwrap();
        assert_eq!(route_1.stops, vec![1, 2, 3]);
        assert!(route_1.total_distance > 0.0);
        assert!(route_1.estimated_time > 0.0);
    }

    #[test]
    fn test_seed_parses_with_defaults() {
        let json = r#"{
            "stops": [
                {"id": 1, "name": "A", "latitude": 0.0, "longitude": 0.0},
                {"id": 2, "name": "B", "latitude": 0.0, "longitude": 0.01}
            ],
            "routes": [{"id": 7, "name": "Shuttle", "stops": [1, 2], "estimated_time": 12.0}]
        }"#;

        let seed: NetworkSeed = serde_json::from_str(json).unwrap();
        let (model, drivers) = seed.into_parts(Utc::now(), 20.0).unwrap();

        assert!(drivers.is_empty());
        let route = model.get_route(7).unwrap();
        assert!(route.is_active);
        assert_eq!(route.estimated_time, 12.0);
    }

    #[test]
    fn test_seed_rejects_duplicate_driver() {
        let mut seed = NetworkSeed::pune_default();
        seed.drivers.push(DriverSeed {
            id: 1,
            name: String::from("Clone"),
            hours_today: 0.0,
        });

        assert!(matches!(
            seed.into_parts(Utc::now(), 20.0),
            Err(BusNetError::Config(_))
        ));
    }
}
