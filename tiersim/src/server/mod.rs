/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Resource-bounded placement targets and their admission model.
//!
//! A [`Server`] tracks `allocated ≤ capacity` in every [`Dimension`].  The
//! only way to grow `allocated` is [`Server::allocate`], which re-runs the
//! admission check and refuses (without touching state) if the task does not
//! fit.  Capacity comes back through [`Server::release`] /
//! [`Server::release_due`] according to the lease's release round.
//!
//! Servers hold no scheduling logic; tier and position are read by metrics
//! and strategies.

pub mod error;

pub use error::{AdmissionReason, ServerError};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::{self, Utilization};
use crate::mobility::geometry::Position;
use crate::task::{Dimension, Resources, Task, TaskId};

// ── Identity ──────────────────────────────────────────────────────────────────

/// Index of a server in the simulator's server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerId(pub u32);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute tier.  Ordered from closest/smallest to farthest/largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Edge,
    Regional,
    Cloud,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Edge, Tier::Regional, Tier::Cloud];

    pub fn label(self) -> &'static str {
        match self {
            Tier::Edge => "Edge",
            Tier::Regional => "Regional",
            Tier::Cloud => "Cloud",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Tier profile ──────────────────────────────────────────────────────────────

/// Latency, cost and energy characteristics shared by all servers of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierProfile {
    /// Fixed processing delay per task, in milliseconds.
    pub latency_ms: f64,
    /// Monetary cost per CPU unit.
    pub cost_per_unit: f64,
    /// Monetary cost per KB transmitted.
    pub tx_cost_per_kb: f64,
    /// Nominal backhaul distance to the tier, in metres.
    pub backhaul_m: f64,
    /// Link bandwidth in kbps.
    pub bandwidth_kbps: f64,
    /// Energy per KB before the distance term.
    pub energy_per_kb: f64,
}

impl TierProfile {
    /// Defaults of the reference three-tier topology.
    pub fn default_for(tier: Tier) -> Self {
        match tier {
            Tier::Edge => TierProfile {
                latency_ms: 5.0,
                cost_per_unit: 0.000_05,
                tx_cost_per_kb: 0.000_02,
                backhaul_m: 2_000.0,
                bandwidth_kbps: 164_000.0,
                energy_per_kb: 0.000_001_5,
            },
            Tier::Regional => TierProfile {
                latency_ms: 50.0,
                cost_per_unit: 0.000_1,
                tx_cost_per_kb: 0.000_005,
                backhaul_m: 200_000.0,
                bandwidth_kbps: 800_000.0,
                energy_per_kb: 0.000_003,
            },
            Tier::Cloud => TierProfile {
                latency_ms: 300.0,
                cost_per_unit: 0.000_2,
                tx_cost_per_kb: 0.000_005,
                backhaul_m: 2_000_000.0,
                bandwidth_kbps: 1_050_000.0,
                energy_per_kb: 0.000_005,
            },
        }
    }
}

// ── Lease ─────────────────────────────────────────────────────────────────────

/// Resources held on behalf of one task until `release_round`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lease {
    pub demand: Resources,
    pub release_round: u64,
}

// ── Server ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    pub tier: Tier,
    pub profile: TierProfile,
    capacity: Resources,
    allocated: Resources,
    position: Position,
    leases: BTreeMap<TaskId, Lease>,
    data_transferred_kb: f64,
    accrued_cost: f64,
}

impl Server {
    pub fn new(
        id: ServerId,
        name: impl Into<String>,
        tier: Tier,
        capacity: Resources,
        profile: TierProfile,
        position: Position,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            tier,
            profile,
            capacity,
            allocated: Resources::ZERO,
            position,
            leases: BTreeMap::new(),
            data_transferred_kb: 0.0,
            accrued_cost: 0.0,
        }
    }

    pub fn capacity(&self) -> Resources {
        self.capacity
    }

    pub fn allocated(&self) -> Resources {
        self.allocated
    }

    /// `capacity - allocated`.
    pub fn available(&self) -> Resources {
        self.capacity.saturating_sub(&self.allocated)
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Only the mobility manager moves servers.
    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn active_leases(&self) -> usize {
        self.leases.len()
    }

    pub fn data_transferred_kb(&self) -> f64 {
        self.data_transferred_kb
    }

    pub fn accrued_cost(&self) -> f64 {
        self.accrued_cost
    }

    // ── Admission ─────────────────────────────────────────────────────────────

    /// Admission gate: `Ok(())` iff every dimension of `task.demand` fits in
    /// the remaining capacity.  Never mutates.
    pub fn check_admission(&self, task: &Task) -> Result<(), AdmissionReason> {
        if self.leases.contains_key(&task.id) {
            return Err(AdmissionReason::AlreadyHosted);
        }
        let available = self.available();
        match task.demand.first_exceeding(&available) {
            None => Ok(()),
            Some(dimension) => Err(AdmissionReason::InsufficientCapacity {
                dimension,
                requested: task.demand.get(dimension),
                available: available.get(dimension),
            }),
        }
    }

    pub fn can_allocate(&self, task: &Task) -> bool {
        self.check_admission(task).is_ok()
    }

    /// Reserve `task.demand` until `release_round`.
    ///
    /// # Errors
    /// [`ServerError::ResourceExceeded`] if admission fails; state is left
    /// untouched.
    pub fn allocate(&mut self, task: &Task, release_round: u64) -> Result<(), ServerError> {
        self.check_admission(task)
            .map_err(|reason| ServerError::ResourceExceeded {
                server: self.id,
                task: task.id,
                reason,
            })?;

        self.allocated = self.allocated.saturating_add(&task.demand);
        self.leases.insert(
            task.id,
            Lease {
                demand: task.demand,
                release_round,
            },
        );
        self.data_transferred_kb += task.data_size_kb;
        self.accrued_cost += metrics::task_cost(task, &self.profile);

        debug!(
            server = %self.name,
            task   = %task.id,
            cpu    = self.allocated.cpu,
            cpu_capacity = self.capacity.cpu,
            release_round,
            "allocated"
        );
        Ok(())
    }

    /// Return the resources held for `task_id`.  `None` if no lease exists.
    pub fn release(&mut self, task_id: TaskId) -> Option<Resources> {
        let lease = self.leases.remove(&task_id)?;
        self.allocated = self.allocated.saturating_sub(&lease.demand);
        Some(lease.demand)
    }

    /// Release every lease whose `release_round ≤ current_round`.
    pub fn release_due(&mut self, current_round: u64) -> Vec<TaskId> {
        let due: Vec<TaskId> = self
            .leases
            .iter()
            .filter(|(_, lease)| lease.release_round <= current_round)
            .map(|(&id, _)| id)
            .collect();
        for id in &due {
            self.release(*id);
        }
        if !due.is_empty() {
            debug!(server = %self.name, released = due.len(), round = current_round, "leases released");
        }
        due
    }

    // ── Observation ───────────────────────────────────────────────────────────

    pub fn utilization(&self) -> Utilization {
        metrics::utilization(&self.allocated, &self.capacity)
    }

    /// Cumulative data over link bandwidth, in percent.
    pub fn congestion_pct(&self) -> f64 {
        metrics::congestion_pct(self.data_transferred_kb, self.profile.bandwidth_kbps)
    }

    /// The core invariant: `allocated ≤ capacity` in every dimension.
    pub fn is_within_capacity(&self) -> bool {
        Dimension::ALL
            .into_iter()
            .all(|d| self.allocated.get(d) <= self.capacity.get(d))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DeviceId;

    fn edge(cpu: u64) -> Server {
        Server::new(
            ServerId(0),
            "Edge_1",
            Tier::Edge,
            Resources::cpu(cpu),
            TierProfile::default_for(Tier::Edge),
            Position::new(0.0, 0.0),
        )
    }

    fn task(id: u64, cpu: u64) -> Task {
        Task::new(TaskId(id), DeviceId(0), 0, Resources::cpu(cpu)).with_data_size(10.0)
    }

    #[test]
    fn exact_fit_is_admitted() {
        let s = edge(4);
        assert!(s.can_allocate(&task(1, 4)));
        assert!(!s.can_allocate(&task(2, 5)));
    }

    #[test]
    fn can_allocate_is_idempotent() {
        let s = edge(4);
        let before = s.clone();
        let t = task(1, 3);
        for _ in 0..100 {
            assert!(s.can_allocate(&t));
        }
        assert_eq!(s, before);
    }

    #[test]
    fn allocate_updates_load_and_accounting() {
        let mut s = edge(4);
        s.allocate(&task(1, 3), 1).unwrap();
        assert_eq!(s.allocated().cpu, 3);
        assert_eq!(s.available().cpu, 1);
        assert_eq!(s.active_leases(), 1);
        assert!((s.data_transferred_kb() - 10.0).abs() < 1e-12);
        // 3 × 0.00005 + 10 × 0.00002
        assert!((s.accrued_cost() - 0.000_35).abs() < 1e-12);
    }

    #[test]
    fn allocate_over_capacity_is_rejected_without_mutation() {
        let mut s = edge(4);
        s.allocate(&task(1, 3), 1).unwrap();
        let before = s.clone();
        let err = s.allocate(&task(2, 3), 1).unwrap_err();
        match err {
            ServerError::ResourceExceeded { task, reason, .. } => {
                assert_eq!(task, TaskId(2));
                assert_eq!(
                    reason,
                    AdmissionReason::InsufficientCapacity {
                        dimension: Dimension::Cpu,
                        requested: 3,
                        available: 1,
                    }
                );
            }
        }
        assert_eq!(s, before);
        assert!(s.is_within_capacity());
    }

    #[test]
    fn same_task_cannot_hold_two_leases() {
        let mut s = edge(10);
        let t = task(1, 2);
        s.allocate(&t, 1).unwrap();
        assert_eq!(s.check_admission(&t), Err(AdmissionReason::AlreadyHosted));
    }

    #[test]
    fn release_due_frees_only_expired_leases() {
        let mut s = edge(10);
        s.allocate(&task(1, 2), 1).unwrap();
        s.allocate(&task(2, 3), 3).unwrap();

        assert!(s.release_due(0).is_empty());
        assert_eq!(s.release_due(1), vec![TaskId(1)]);
        assert_eq!(s.allocated().cpu, 3);
        assert_eq!(s.release_due(5), vec![TaskId(2)]);
        assert_eq!(s.allocated(), Resources::ZERO);
    }

    #[test]
    fn release_unknown_task_is_noop() {
        let mut s = edge(4);
        assert_eq!(s.release(TaskId(99)), None);
        assert_eq!(s.allocated(), Resources::ZERO);
    }

    #[test]
    fn utilization_reports_percent() {
        let mut s = edge(4);
        s.allocate(&task(1, 1), 1).unwrap();
        assert!((s.utilization().cpu_pct - 25.0).abs() < 1e-12);
        // zero-capacity dimensions report 0 %
        assert_eq!(s.utilization().memory_pct, 0.0);
    }

    #[test]
    fn tier_defaults_are_ordered_by_cost_and_latency() {
        let e = TierProfile::default_for(Tier::Edge);
        let r = TierProfile::default_for(Tier::Regional);
        let c = TierProfile::default_for(Tier::Cloud);
        assert!(e.cost_per_unit < r.cost_per_unit && r.cost_per_unit < c.cost_per_unit);
        assert!(e.latency_ms < r.latency_ms && r.latency_ms < c.latency_ms);
    }
}
