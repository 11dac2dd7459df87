use crate::density::{DEFAULT_BASE_DENSITY, DEFAULT_TIME_MULTIPLIER, SimulationParameters};
use crate::duty::{DEFAULT_BREAK_INTERVAL_HOURS, DEFAULT_BREAK_MINUTES, DutyConfig};
use crate::engine::EngineConfig;
use crate::errors::BusNetError;
use crate::models::Driver;
use crate::network::seed::NetworkSeed;
use crate::network::{DEFAULT_AVERAGE_SPEED_KMH, NetworkModel};
use crate::planner::PlannerConfig;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_PREFIX: &str = "BUSNET_";

/// Process settings, read from `BUSNET_*` environment variables.
///
/// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
#[derive(Clone, Debug, PartialEq)]
pub struct BusNetConfig {
    pub address: String,
    pub port: u16,
    pub workers: usize,
    /// JSON network seed. The built-in Pune network is used when unset.
    pub network_file: Option<PathBuf>,
    pub tick_seconds: f64,
    pub base_density: f64,
    pub time_multiplier: f64,
    pub congestion_k: f64,
    pub average_speed_kmh: f64,
    pub break_interval_hours: f64,
    pub break_minutes: i64,
    pub log_level: String,
    pub autostart_simulation: bool,
}

impl Default for BusNetConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1"),
            port: 8000,
            workers: 4,
            network_file: None,
            tick_seconds: 5.0,
            base_density: DEFAULT_BASE_DENSITY,
            time_multiplier: DEFAULT_TIME_MULTIPLIER,
            congestion_k: 0.0,
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            break_interval_hours: DEFAULT_BREAK_INTERVAL_HOURS,
            break_minutes: DEFAULT_BREAK_MINUTES,
            log_level: String::from("info"),
            autostart_simulation: true,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, BusNetError>
where
    T::Err: std::fmt::Display,
{
    let key = format!("{}{}", ENV_PREFIX, name);
    match lookup(&key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| BusNetError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

impl BusNetConfig {
    pub fn from_env() -> Result<Self, BusNetError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BusNetConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BusNetError> {
        let d = Self::default();

        let config = Self {
            address: parse_var(&lookup, "ADDRESS", d.address)?,
            port: parse_var(&lookup, "PORT", d.port)?,
            workers: parse_var(&lookup, "WORKERS", d.workers)?,
            network_file: lookup(&format!("{}NETWORK_FILE", ENV_PREFIX))
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            tick_seconds: parse_var(&lookup, "TICK_SECONDS", d.tick_seconds)?,
            base_density: parse_var(&lookup, "BASE_DENSITY", d.base_density)?,
            time_multiplier: parse_var(&lookup, "TIME_MULTIPLIER", d.time_multiplier)?,
            congestion_k: parse_var(&lookup, "CONGESTION_K", d.congestion_k)?,
            average_speed_kmh: parse_var(&lookup, "AVERAGE_SPEED_KMH", d.average_speed_kmh)?,
            break_interval_hours: parse_var(
                &lookup,
                "BREAK_INTERVAL_HOURS",
                d.break_interval_hours,
            )?,
            break_minutes: parse_var(&lookup, "BREAK_MINUTES", d.break_minutes)?,
            log_level: parse_var(&lookup, "LOG_LEVEL", d.log_level)?,
            autostart_simulation: parse_var(
                &lookup,
                "AUTOSTART_SIMULATION",
                d.autostart_simulation,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BusNetError> {
        if self.workers == 0 {
            return Err(BusNetError::Config(String::from(
                "worker count must be at least 1",
            )));
        }
        self.engine_config()?;
        self.log_level()?;
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.address.clone(), self.port)
    }

    pub fn log_level(&self) -> Result<tracing::Level, BusNetError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| BusNetError::Config(format!("unknown log level {:?}", self.log_level)))
    }

    pub fn planner_config(&self) -> Result<PlannerConfig, BusNetError> {
        let planner = PlannerConfig {
            congestion_k: self.congestion_k,
            average_speed_kmh: self.average_speed_kmh,
        };
        planner.validate()?;
        Ok(planner)
    }

    pub fn simulation_parameters(&self) -> Result<SimulationParameters, BusNetError> {
        let parameters = SimulationParameters {
            base_density: self.base_density,
            time_multiplier: self.time_multiplier,
        };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn duty_config(&self) -> Result<DutyConfig, BusNetError> {
        DutyConfig::from_hours_and_minutes(self.break_interval_hours, self.break_minutes)
    }

    pub fn tick_interval(&self) -> Result<Duration, BusNetError> {
        if !self.tick_seconds.is_finite() || self.tick_seconds <= 0.0 {
            return Err(BusNetError::InvalidParameter {
                name: "tick_seconds",
                value: self.tick_seconds,
            });
        }
        Ok(Duration::from_secs_f64(self.tick_seconds))
    }

    pub fn engine_config(&self) -> Result<EngineConfig, BusNetError> {
        Ok(EngineConfig {
            planner: self.planner_config()?,
            simulation: self.simulation_parameters()?,
            duty: self.duty_config()?,
            tick_interval: self.tick_interval()?,
        })
    }

    pub fn load_seed(&self) -> Result<NetworkSeed, BusNetError> {
        match &self.network_file {
            Some(path) => NetworkSeed::from_json_file(path),
            None => Ok(NetworkSeed::pune_default()),
        }
    }

    /// Reads the seed and builds the validated model and driver roster.
    pub fn load_network(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(NetworkModel, Vec<Driver>), BusNetError> {
        self.load_seed()?.into_parts(now, self.average_speed_kmh)
    }
}
