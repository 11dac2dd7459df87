use super::cadence::run_cadence;
use super::{Command, EngineConfig, SimulationStatus};
use crate::density::DensitySimulator;
use crate::duty::DutyScheduler;
use crate::errors::BusNetError;
use crate::models::{Driver, Route, RouteId, Stop};
use crate::network::NetworkModel;
use crate::network::ordering::RouteOrdering;
use crate::network::transit_graph::TransitGraph;
use crate::planner::PlanningSnapshot;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub(super) struct EngineState<R: Rng> {
    model: NetworkModel,
    graph: Arc<TransitGraph>,
    /// Cached planning view; dropped whenever stops or routes change.
    snapshot: Option<PlanningSnapshot>,
    simulator: DensitySimulator<R>,
    scheduler: DutyScheduler,
    tick_interval: std::time::Duration,
    cadence: Option<JoinHandle<()>>,
    commands: mpsc::WeakSender<Command>,
}

impl<R: Rng + Send + 'static> EngineState<R> {
    pub(super) fn new(
        model: NetworkModel,
        drivers: Vec<Driver>,
        config: EngineConfig,
        simulator: DensitySimulator<R>,
        commands: mpsc::WeakSender<Command>,
    ) -> Result<Self, BusNetError> {
        let graph = Arc::new(model.build_graph()?);

        Ok(Self {
            model,
            graph,
            snapshot: None,
            simulator,
            scheduler: DutyScheduler::new(config.duty, drivers),
            tick_interval: config.tick_interval,
            cadence: None,
            commands,
        })
    }

    pub(super) fn stop_count(&self) -> usize {
        self.graph.node_count()
    }

    pub(super) fn route_count(&self) -> usize {
        self.model.routes().count()
    }

    pub(super) async fn run(mut self, mut receiver: mpsc::Receiver<Command>) {
        while let Some(command) = receiver.recv().await {
            self.handle(command);
        }

        self.stop_cadence();
        info!("network engine stopped: no handles left");
    }

    fn handle(&mut self, command: Command) {
        // a dropped receiver only means the caller gave up waiting;
        // the operation itself has already been applied
        match command {
            Command::ListStops(reply) => {
                let _ = reply.send(self.model.stops().cloned().collect::<Vec<Stop>>());
            }
            Command::ListRoutes(reply) => {
                let _ = reply.send(self.model.routes().cloned().collect::<Vec<Route>>());
            }
            Command::ListDrivers(reply) => {
                let _ = reply.send(self.scheduler.drivers());
            }
            Command::GetStop(id, reply) => {
                let _ = reply.send(self.model.get_stop(id).cloned());
            }
            Command::GetRoute(id, reply) => {
                let _ = reply.send(self.model.get_route(id).cloned());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::AddStop(new_stop, now, reply) => {
                let result = self.model.add_stop(new_stop, now);
                if let Ok(stop) = &result {
                    info!("added stop {} ({})", stop.id, stop.name);
                    self.rebuild_graph();
                }
                let _ = reply.send(result);
            }
            Command::AddRoute(new_route, reply) => {
                let result = self.model.add_route(new_route);
                if let Ok(route) = &result {
                    info!("added route {} ({}) over {} stops", route.id, route.name, route.stops.len());
                    self.rebuild_graph();
                }
                let _ = reply.send(result);
            }
            Command::AddDriver(new_driver, reply) => {
                let driver = self.scheduler.add_driver(new_driver);
                info!("added driver {} ({})", driver.id, driver.name);
                let _ = reply.send(driver);
            }
            Command::OptimizeRoute {
                route_id,
                apply,
                reply,
            } => {
                let _ = reply.send(self.optimize_route(route_id, apply));
            }
            Command::SetDensity {
                stop_id,
                value,
                now,
                reply,
            } => {
                let result = self.simulator.set_density(&mut self.model, stop_id, value, now);
                if result.is_ok() {
                    info!("density of stop {} overridden to {}", stop_id, value);
                    self.snapshot = None;
                }
                let _ = reply.send(result);
            }
            Command::Tick { hour, now, reply } => {
                let result = self.simulator.tick(&mut self.model, hour, now);
                match &result {
                    Ok(_) => self.snapshot = None,
                    Err(e) => warn!("density tick rejected: {}", e),
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Command::AdvanceDuty { now, reply } => {
                let transitions = self.scheduler.advance(now);
                if !transitions.started_break.is_empty() || !transitions.finished_break.is_empty() {
                    debug!(
                        "duty advance: {:?} on break, {:?} back from break",
                        transitions.started_break, transitions.finished_break
                    );
                }
                if let Some(reply) = reply {
                    let _ = reply.send(transitions);
                }
            }
            Command::AssignDrivers { now, reply } => {
                self.scheduler.assign_drivers(&self.model, now);
                let _ = reply.send(self.scheduler.drivers());
            }
            Command::SetParameters(parameters, reply) => {
                let result = self.simulator.set_parameters(parameters).map(|_| {
                    info!(
                        "simulation parameters set: base density {}, time multiplier {}",
                        parameters.base_density, parameters.time_multiplier
                    );
                    self.status()
                });
                let _ = reply.send(result);
            }
            Command::StartSimulation(reply) => {
                self.start_cadence();
                let _ = reply.send(self.status());
            }
            Command::StopSimulation(reply) => {
                self.stop_cadence();
                let _ = reply.send(self.status());
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn snapshot(&mut self) -> Result<PlanningSnapshot, BusNetError> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(snapshot.clone());
        }

        let snapshot = PlanningSnapshot::new(Arc::clone(&self.graph), &self.model)?;
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn optimize_route(
        &mut self,
        route_id: RouteId,
        apply: bool,
    ) -> Result<RouteOrdering, BusNetError> {
        let mut ordering = self.model.optimize_route_order(route_id)?;

        if apply && ordering.optimized_stops != ordering.current_stops {
            let route = self.model.reorder_route(route_id, &ordering.optimized_stops)?;
            info!(
                "route {} reordered to {:?} ({:.2} km)",
                route.id, route.stops, route.total_distance
            );
            self.rebuild_graph();
        }
        ordering.applied = apply;

        Ok(ordering)
    }

    fn rebuild_graph(&mut self) {
        // records were validated on insert, so a failure here means the model is corrupt
        match self.model.build_graph() {
            Ok(graph) => {
                self.graph = Arc::new(graph);
                self.snapshot = None;
            }
            Err(e) => warn!("keeping previous transit graph, rebuild failed: {}", e),
        }
    }

    fn is_running(&self) -> bool {
        self.cadence.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn start_cadence(&mut self) {
        if self.is_running() {
            return;
        }

        info!("starting density cadence every {:?}", self.tick_interval);
        self.cadence = Some(tokio::spawn(run_cadence(
            self.commands.clone(),
            self.tick_interval,
        )));
    }

    fn stop_cadence(&mut self) {
        if let Some(handle) = self.cadence.take() {
            handle.abort();
            info!("density cadence stopped");
        }
    }

    fn status(&self) -> SimulationStatus {
        SimulationStatus {
            running: self.is_running(),
            parameters: self.simulator.parameters(),
            tick_interval_secs: self.tick_interval.as_secs_f64(),
            ticks: self.simulator.ticks(),
        }
    }
}
