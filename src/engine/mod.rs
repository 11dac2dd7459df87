//! Single owner of all mutable network state.
//!
//! Stops, routes, drivers, the density simulator and the duty scheduler live
//! inside one task. Everything else talks to it through an [`EngineHandle`],
//! one message per operation, so each tick, override or assignment pass is
//! applied in full before the next message is looked at. Route planning only
//! borrows an immutable snapshot and runs on the caller's task.

mod cadence;
mod owner;


use crate::density::{DensitySimulator, SimulationParameters, TickSummary};
use crate::duty::{DutyConfig, DutyTransitions};
use crate::errors::BusNetError;
use crate::models::{Driver, NewDriver, NewRoute, NewStop, Route, RouteId, Stop, StopId};
use crate::network::NetworkModel;
use crate::network::ordering::RouteOrdering;
use crate::planner::{PlannedRoute, PlannerConfig, PlanningSnapshot, RoutePlanner};
use chrono::{DateTime, Local, Timelike, Utc};
use owner::EngineState;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

pub const DEFAULT_TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
const COMMAND_BUFFER: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    pub planner: PlannerConfig,
    pub simulation: SimulationParameters,
    pub duty: DutyConfig,
    pub tick_interval: std::time::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            simulation: SimulationParameters::default(),
            duty: DutyConfig::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatus {
    pub running: bool,
    pub parameters: SimulationParameters,
    pub tick_interval_secs: f64,
    pub ticks: u64,
}

type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Command {
    ListStops(Reply<Vec<Stop>>),
    ListRoutes(Reply<Vec<Route>>),
    ListDrivers(Reply<Vec<Driver>>),
    GetStop(StopId, Reply<Result<Stop, BusNetError>>),
    GetRoute(RouteId, Reply<Result<Route, BusNetError>>),
    Snapshot(Reply<Result<PlanningSnapshot, BusNetError>>),
    AddStop(NewStop, DateTime<Utc>, Reply<Result<Stop, BusNetError>>),
    AddRoute(NewRoute, Reply<Result<Route, BusNetError>>),
    AddDriver(NewDriver, Reply<Driver>),
    OptimizeRoute {
        route_id: RouteId,
        apply: bool,
        reply: Reply<Result<RouteOrdering, BusNetError>>,
    },
    SetDensity {
        stop_id: StopId,
        value: f64,
        now: DateTime<Utc>,
        reply: Reply<Result<Stop, BusNetError>>,
    },
    Tick {
        hour: u32,
        now: DateTime<Utc>,
        reply: Option<Reply<Result<TickSummary, BusNetError>>>,
    },
    AdvanceDuty {
        now: DateTime<Utc>,
        reply: Option<Reply<DutyTransitions>>,
    },
    AssignDrivers {
        now: DateTime<Utc>,
        reply: Reply<Vec<Driver>>,
    },
    SetParameters(SimulationParameters, Reply<Result<SimulationStatus, BusNetError>>),
    StartSimulation(Reply<SimulationStatus>),
    StopSimulation(Reply<SimulationStatus>),
    Status(Reply<SimulationStatus>),
}

/// Cloneable client of the engine task. The task exits once every handle is dropped.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    planner: PlannerConfig,
}

impl EngineHandle {
    /// Starts the owner task on the current tokio runtime. The density
    /// cadence is not started; call [`EngineHandle::start_simulation`].
    pub fn spawn(
        model: NetworkModel,
        drivers: Vec<Driver>,
        config: EngineConfig,
    ) -> Result<Self, BusNetError> {
        let simulator = DensitySimulator::new(config.simulation)?;
        Self::spawn_with_simulator(model, drivers, config, simulator)
    }

    pub fn spawn_with_simulator<R>(
        model: NetworkModel,
        drivers: Vec<Driver>,
        config: EngineConfig,
        simulator: DensitySimulator<R>,
    ) -> Result<Self, BusNetError>
    where
        R: Rng + Send + 'static,
    {
        config.planner.validate()?;
        if config.tick_interval.is_zero() {
            return Err(BusNetError::InvalidParameter {
                name: "tick_interval",
                value: 0.0,
            });
        }

        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let state = EngineState::new(
            model,
            drivers,
            config,
            simulator,
            commands.downgrade(),
        )?;

        info!(
            "network engine starting with {} stops, {} routes",
            state.stop_count(),
            state.route_count()
        );
        tokio::spawn(state.run(receiver));

        Ok(Self {
            commands,
            planner: config.planner,
        })
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, BusNetError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| BusNetError::EngineUnavailable)?;
        response.await.map_err(|_| BusNetError::EngineUnavailable)
    }

    pub async fn list_stops(&self) -> Result<Vec<Stop>, BusNetError> {
        self.request(Command::ListStops).await
    }

    pub async fn list_routes(&self) -> Result<Vec<Route>, BusNetError> {
        self.request(Command::ListRoutes).await
    }

    pub async fn list_drivers(&self) -> Result<Vec<Driver>, BusNetError> {
        self.request(Command::ListDrivers).await
    }

    pub async fn get_stop(&self, id: StopId) -> Result<Stop, BusNetError> {
        self.request(|reply| Command::GetStop(id, reply)).await?
    }

    pub async fn get_route(&self, id: RouteId) -> Result<Route, BusNetError> {
        self.request(|reply| Command::GetRoute(id, reply)).await?
    }

    pub async fn snapshot(&self) -> Result<PlanningSnapshot, BusNetError> {
        self.request(Command::Snapshot).await?
    }

    /// Plans on a snapshot, off the owner task.
    pub async fn plan_route(&self, from: StopId, to: StopId) -> Result<PlannedRoute, BusNetError> {
        let snapshot = self.snapshot().await?;
        RoutePlanner::new(&snapshot, self.planner).find_route(from, to)
    }

    pub async fn add_stop(&self, stop: NewStop) -> Result<Stop, BusNetError> {
        self.request(|reply| Command::AddStop(stop, Utc::now(), reply))
            .await?
    }

    pub async fn add_route(&self, route: NewRoute) -> Result<Route, BusNetError> {
        self.request(|reply| Command::AddRoute(route, reply)).await?
    }

    pub async fn add_driver(&self, driver: NewDriver) -> Result<Driver, BusNetError> {
        self.request(|reply| Command::AddDriver(driver, reply)).await
    }

    /// Demand-weighted stop order for a route; `apply` also rewrites the route.
    pub async fn optimize_route(
        &self,
        route_id: RouteId,
        apply: bool,
    ) -> Result<RouteOrdering, BusNetError> {
        self.request(|reply| Command::OptimizeRoute {
            route_id,
            apply,
            reply,
        })
        .await?
    }

    pub async fn set_density(&self, stop_id: StopId, value: f64) -> Result<Stop, BusNetError> {
        self.request(|reply| Command::SetDensity {
            stop_id,
            value,
            now: Utc::now(),
            reply,
        })
        .await?
    }

    pub async fn tick(&self, hour: u32) -> Result<TickSummary, BusNetError> {
        self.request(|reply| Command::Tick {
            hour,
            now: Utc::now(),
            reply: Some(reply),
        })
        .await?
    }

    /// One tick at the current local wall-clock hour.
    pub async fn tick_now(&self) -> Result<TickSummary, BusNetError> {
        self.tick(Local::now().hour()).await
    }

    pub async fn advance_duty(&self, now: DateTime<Utc>) -> Result<DutyTransitions, BusNetError> {
        self.request(|reply| Command::AdvanceDuty {
            now,
            reply: Some(reply),
        })
        .await
    }

    pub async fn assign_drivers(&self, now: DateTime<Utc>) -> Result<Vec<Driver>, BusNetError> {
        self.request(|reply| Command::AssignDrivers { now, reply })
            .await
    }

    pub async fn simulation_status(&self) -> Result<SimulationStatus, BusNetError> {
        self.request(Command::Status).await
    }

    pub async fn set_parameters(
        &self,
        parameters: SimulationParameters,
    ) -> Result<SimulationStatus, BusNetError> {
        self.request(|reply| Command::SetParameters(parameters, reply))
            .await?
    }

    pub async fn start_simulation(&self) -> Result<SimulationStatus, BusNetError> {
        self.request(Command::StartSimulation).await
    }

    pub async fn stop_simulation(&self) -> Result<SimulationStatus, BusNetError> {
        self.request(Command::StopSimulation).await
    }
}
