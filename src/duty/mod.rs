//! Driver roster and the route assignment / break state machine.
//!
//! Drivers move `off_duty -> active` when paired with a route,
//! `active -> on_break` once their `next_break` passes (releasing the route),
//! and `on_break -> active` when the break window ends, at which point they
//! are idle and can be paired again. Ending a shift happens outside the core.

pub mod breaks;


use crate::errors::BusNetError;
use crate::models::{Driver, DriverId, DriverStatus, NewDriver, Route, RouteId};
use crate::network::NetworkModel;
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

pub const DEFAULT_BREAK_INTERVAL_HOURS: f64 = 4.0;
pub const DEFAULT_BREAK_MINUTES: i64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DutyConfig {
    /// Continuous driving time before a break is due.
    pub break_interval: Duration,
    pub break_duration: Duration,
}

impl Default for DutyConfig {
    fn default() -> Self {
        Self {
            break_interval: Duration::minutes((DEFAULT_BREAK_INTERVAL_HOURS * 60.0) as i64),
            break_duration: Duration::minutes(DEFAULT_BREAK_MINUTES),
        }
    }
}

impl DutyConfig {
    pub fn from_hours_and_minutes(
        break_interval_hours: f64,
        break_minutes: i64,
    ) -> Result<Self, BusNetError> {
        if !break_interval_hours.is_finite() || break_interval_hours <= 0.0 {
            return Err(BusNetError::InvalidParameter {
                name: "break_interval_hours",
                value: break_interval_hours,
            });
        }
        if break_minutes <= 0 {
            return Err(BusNetError::InvalidParameter {
                name: "break_minutes",
                value: break_minutes as f64,
            });
        }
        Ok(Self {
            break_interval: Duration::seconds((break_interval_hours * 3600.0).round() as i64),
            break_duration: Duration::minutes(break_minutes),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub driver_id: DriverId,
    pub route_id: RouteId,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentReport {
    pub assignments: Vec<Assignment>,
    /// Active routes still without a driver after this pass.
    pub unassigned_routes: Vec<RouteId>,
    /// Drivers whose route reference was found stale and cleared.
    pub released_drivers: Vec<DriverId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DutyTransitions {
    pub started_break: Vec<DriverId>,
    pub finished_break: Vec<DriverId>,
}

#[derive(Clone, Debug)]
pub struct DutyScheduler {
    config: DutyConfig,
    drivers: BTreeMap<DriverId, Driver>,
    /// Last time driving hours were credited, for drivers holding a route.
    duty_marks: BTreeMap<DriverId, DateTime<Utc>>,
}

impl DutyScheduler {
    pub fn new(config: DutyConfig, drivers: Vec<Driver>) -> Self {
        Self {
            config,
            drivers: drivers.into_iter().map(|d| (d.id, d)).collect(),
            duty_marks: BTreeMap::new(),
        }
    }

    /// All drivers in ascending id order.
    pub fn drivers(&self) -> Vec<Driver> {
        self.drivers.values().cloned().collect()
    }

    pub fn get_driver(&self, id: DriverId) -> Result<&Driver, BusNetError> {
        self.drivers
            .get(&id)
            .ok_or_else(|| BusNetError::driver_not_found(id))
    }

    pub fn add_driver(&mut self, new_driver: NewDriver) -> Driver {
        let id = self.drivers.keys().next_back().map_or(1, |last| last + 1);
        let driver = Driver::new(id, new_driver.name);
        self.drivers.insert(id, driver.clone());
        driver
    }

    /// Pairs idle drivers with unstaffed active routes.
    ///
    /// Routes are staffed busiest first (mean stop density, then route id);
    /// drivers are taken least worked first (hours today, then driver id).
    /// Running out of either side leaves the rest untouched.
    pub fn assign_drivers(&mut self, network: &NetworkModel, now: DateTime<Utc>) -> AssignmentReport {
        let mut report = AssignmentReport::default();

        let excluded = self.release_stale_routes(network, &mut report);

        let held: BTreeSet<RouteId> = self
            .drivers
            .values()
            .filter_map(|d| d.current_route_id)
            .collect();

        let routes = network
            .routes()
            .filter(|r| r.is_active && !held.contains(&r.id))
            .map(|r| (OrderedFloat(route_priority(network, r)), r.id))
            .sorted_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, id)| id)
            .collect::<Vec<_>>();

        let drivers = self
            .drivers
            .values()
            .filter(|d| !excluded.contains(&d.id) && is_available(d))
            .map(|d| (OrderedFloat(d.hours_today), d.id))
            .sorted()
            .map(|(_, id)| id)
            .collect::<Vec<_>>();

        for (&route_id, &driver_id) in routes.iter().zip(drivers.iter()) {
            let Some(driver) = self.drivers.get_mut(&driver_id) else {
                continue;
            };

            driver.status = DriverStatus::Active;
            driver.current_route_id = Some(route_id);

            // a projected break that never started belongs to the previous assignment
            driver.break_slots.retain(|slot| slot.start <= now);
            let slot = breaks::schedule_break(
                &driver.break_slots,
                now + self.config.break_interval,
                self.config.break_duration,
            );
            driver.next_break = Some(slot.start);
            driver.break_slots.push(slot);

            self.duty_marks.insert(driver_id, now);

            report.assignments.push(Assignment {
                driver_id,
                route_id,
            });
        }

        report.unassigned_routes = routes.into_iter().skip(report.assignments.len()).collect();

        if !report.assignments.is_empty() {
            info!(
                "assigned {} driver(s), {} active route(s) left unstaffed",
                report.assignments.len(),
                report.unassigned_routes.len()
            );
        }

        report
    }

    /// Credits driving hours and moves drivers in and out of their breaks.
    pub fn advance(&mut self, now: DateTime<Utc>) -> DutyTransitions {
        let mut transitions = DutyTransitions::default();

        for driver in self.drivers.values_mut() {
            if driver.status == DriverStatus::Active && driver.current_route_id.is_some() {
                // driving stops at the break, however late this advance runs
                let driven_until = match driver.next_break {
                    Some(next) if next < now => next,
                    _ => now,
                };

                if let Some(mark) = self.duty_marks.get_mut(&driver.id) {
                    if driven_until > *mark {
                        driver.hours_today +=
                            (driven_until - *mark).num_milliseconds() as f64 / 3_600_000.0;
                        *mark = driven_until;
                    }
                } else {
                    self.duty_marks.insert(driver.id, driven_until);
                }
            }

            if driver.status == DriverStatus::Active
                && driver.next_break.is_some_and(|next| next <= now)
            {
                driver.status = DriverStatus::OnBreak;
                if let Some(route_id) = driver.current_route_id.take() {
                    info!("driver {} going on break, releasing route {}", driver.id, route_id);
                }
                self.duty_marks.remove(&driver.id);
                transitions.started_break.push(driver.id);
            }

            if driver.status == DriverStatus::OnBreak {
                let break_end = driver.next_break.and_then(|start| {
                    driver
                        .break_slots
                        .iter()
                        .find(|slot| slot.start == start)
                        .map(|slot| slot.end)
                });

                // no matching slot means the break can't be tracked; end it now
                if break_end.is_none_or(|end| end <= now) {
                    driver.status = DriverStatus::Active;
                    driver.current_route_id = None;
                    driver.next_break = None;
                    transitions.finished_break.push(driver.id);
                }
            }
        }

        transitions
    }

    /// Clears route references that point at missing or inactive routes, or
    /// at a route another driver already holds. The affected drivers sit out
    /// the current pass.
    fn release_stale_routes(
        &mut self,
        network: &NetworkModel,
        report: &mut AssignmentReport,
    ) -> BTreeSet<DriverId> {
        let mut excluded = BTreeSet::new();
        let mut holders: BTreeSet<RouteId> = BTreeSet::new();

        for driver in self.drivers.values_mut() {
            let Some(route_id) = driver.current_route_id else {
                continue;
            };

            let reason = match network.get_route(route_id) {
                Err(_) => Some("no longer exists"),
                Ok(route) if !route.is_active => Some("is inactive"),
                Ok(_) if driver.status != DriverStatus::Active => Some("is held by an idle driver"),
                Ok(_) if !holders.insert(route_id) => Some("is already held by another driver"),
                Ok(_) => None,
            };

            if let Some(reason) = reason {
                warn!(
                    "driver {} held route {} which {}; releasing it",
                    driver.id, route_id, reason
                );
                driver.current_route_id = None;
                self.duty_marks.remove(&driver.id);
                excluded.insert(driver.id);
                report.released_drivers.push(driver.id);
            }
        }

        excluded
    }
}

fn is_available(driver: &Driver) -> bool {
    match driver.status {
        DriverStatus::OffDuty => true,
        DriverStatus::Active => driver.current_route_id.is_none(),
        DriverStatus::OnBreak => false,
    }
}

/// Mean current density over the stops of a route.
pub fn route_priority(network: &NetworkModel, route: &Route) -> f64 {
    let densities = route
        .stops
        .iter()
        .filter_map(|id| network.get_stop(*id).ok())
        .map(|stop| stop.current_density)
        .collect::<Vec<_>>();

    if densities.is_empty() {
        0.0
    } else {
        densities.iter().sum::<f64>() / densities.len() as f64
    }
}
