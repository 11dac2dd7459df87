use crate::errors::BusNetError;
use crate::models::{Stop, StopId};
use crate::network::NetworkModel;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Crowd factor for each hour of the day, indexed by hour (0-23).
pub const TIME_FACTORS: [f64; 24] = [
    0.3, 0.2, 0.1, 0.1, 0.2, 0.4, 0.6, 0.8, 1.0, 0.9, 0.7, 0.8, // 00-11
    0.9, 0.8, 0.7, 0.8, 0.9, 1.0, 0.9, 0.8, 0.6, 0.5, 0.4, 0.3, // 12-23
];

pub const MAX_TIME_FACTOR: f64 = 1.0;
pub const JITTER_MIN: f64 = 0.8;
pub const JITTER_MAX: f64 = 1.2;

pub const DEFAULT_BASE_DENSITY: f64 = 100.0;
pub const DEFAULT_TIME_MULTIPLIER: f64 = 1.0;
const TIME_MULTIPLIER_MIN_EXCLUSIVE: f64 = 0.1;
const TIME_MULTIPLIER_MAX: f64 = 3.0;

pub fn time_factor(hour: u32) -> Result<f64, BusNetError> {
    TIME_FACTORS
        .get(hour as usize)
        .copied()
        .ok_or(BusNetError::InvalidHour(hour))
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub base_density: f64,
    pub time_multiplier: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            base_density: DEFAULT_BASE_DENSITY,
            time_multiplier: DEFAULT_TIME_MULTIPLIER,
        }
    }
}

impl SimulationParameters {
    /// `base_density >= 0`, `time_multiplier` in (0.1, 3.0].
    pub fn validate(&self) -> Result<(), BusNetError> {
        if !self.base_density.is_finite() || self.base_density < 0.0 {
            return Err(BusNetError::InvalidParameter {
                name: "base_density",
                value: self.base_density,
            });
        }
        if !self.time_multiplier.is_finite()
            || self.time_multiplier <= TIME_MULTIPLIER_MIN_EXCLUSIVE
            || self.time_multiplier > TIME_MULTIPLIER_MAX
        {
            return Err(BusNetError::InvalidParameter {
                name: "time_multiplier",
                value: self.time_multiplier,
            });
        }
        Ok(())
    }

    /// Highest density a tick can produce with these parameters.
    pub fn density_ceiling(&self) -> f64 {
        self.base_density * self.time_multiplier * JITTER_MAX * MAX_TIME_FACTOR
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub hour: u32,
    pub stops_updated: usize,
    pub mean_density: f64,
}

/// Time-of-day crowd model for every stop of a [`NetworkModel`].
pub struct DensitySimulator<R: Rng = StdRng> {
    parameters: SimulationParameters,
    rng: R,
    ticks: u64,
}

impl DensitySimulator<StdRng> {
    pub fn new(parameters: SimulationParameters) -> Result<Self, BusNetError> {
        Self::with_rng(parameters, StdRng::from_os_rng())
    }
}

impl<R: Rng> DensitySimulator<R> {
    pub fn with_rng(parameters: SimulationParameters, rng: R) -> Result<Self, BusNetError> {
        parameters.validate()?;
        Ok(Self {
            parameters,
            rng,
            ticks: 0,
        })
    }

    pub fn parameters(&self) -> SimulationParameters {
        self.parameters
    }

    pub fn set_parameters(&mut self, parameters: SimulationParameters) -> Result<(), BusNetError> {
        parameters.validate()?;
        self.parameters = parameters;
        Ok(())
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Redraws the density of every stop for the given hour of day.
    ///
    /// Nothing is written when `hour` is out of range.
    pub fn tick(
        &mut self,
        model: &mut NetworkModel,
        hour: u32,
        now: DateTime<Utc>,
    ) -> Result<TickSummary, BusNetError> {
        let factor = time_factor(hour)?;
        let scale = self.parameters.base_density * factor * self.parameters.time_multiplier;

        let mut stops_updated = 0;
        let mut total = 0.0;

        for stop in model.stops_mut() {
            let jitter = self.rng.random_range(JITTER_MIN..=JITTER_MAX);
            stop.current_density = (scale * jitter).max(0.0);
            stop.last_updated = now;
            stops_updated += 1;
            total += stop.current_density;
        }

        self.ticks += 1;

        let summary = TickSummary {
            hour,
            stops_updated,
            mean_density: if stops_updated > 0 {
                total / stops_updated as f64
            } else {
                0.0
            },
        };

        debug!(
            "density tick {} at hour {}: {} stops, mean {:.2}",
            self.ticks, hour, summary.stops_updated, summary.mean_density
        );

        Ok(summary)
    }

    /// External override of a single stop's density.
    pub fn set_density(
        &self,
        model: &mut NetworkModel,
        stop_id: StopId,
        value: f64,
        now: DateTime<Utc>,
    ) -> Result<Stop, BusNetError> {
        let stop = model.stop_mut(stop_id)?;

        if !value.is_finite() || value < 0.0 {
            return Err(BusNetError::InvalidDensity(value));
        }

        stop.current_density = value;
        stop.last_updated = now;
        Ok(stop.clone())
    }
}
