/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The round-synchronous simulation driver.
//!
//! [`Simulator`] owns the servers, the pending task set and the mobility
//! manager, and is the only writer of any of them.  One call to
//! [`Simulator::step`] runs one round:
//!
//! 1. release leases due this round
//! 2. admit the workload's batch (duplicate ids are dropped)
//! 3. expire pending tasks whose deadline has passed
//! 4. move devices and evaluate handover (when mobility is enabled)
//! 5. ask the scheduler for proposals over the pending tasks
//! 6. apply each proposal in order after re-checking it
//! 7. build the [`RoundReport`]
//!
//! A placed task runs to completion inside its assignment round; its
//! resources stay leased until the [`ResidencyPolicy`] releases them.
//! A proposal that names an unknown or already placed task, an unknown
//! server, or a server without room is skipped and the task stays pending.

pub mod error;

pub use error::SimulationError;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ResidencyPolicy, SimConfig};
use crate::metrics;
use crate::mobility::MobilityManager;
use crate::report::{MobilitySnapshot, Reporter, RoundReport, ServerSnapshot, TaskRecord};
use crate::scheduler::{Assignment, ScheduleContext, Scheduler, SchedulerRegistry};
use crate::server::{Server, Tier};
use crate::task::{DeviceId, Task, TaskId};
use crate::workload::{RampWorkload, Workload};

// ── Run summary ───────────────────────────────────────────────────────────────

/// Whole-run aggregates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub scheduler: String,
    pub rounds: u64,
    pub total_tasks: usize,
    pub completed: usize,
    pub expired: usize,
    /// Still pending when the run stopped.
    pub unscheduled: usize,
    pub skipped_proposals: usize,
    pub completed_by_tier: BTreeMap<Tier, usize>,
    pub total_cost: f64,
    pub avg_delay_ms: f64,
    pub total_energy: f64,
    pub avg_wait_rounds: f64,
    pub handovers: u64,
    pub handover_delay_ms: f64,
    /// `(expired + unscheduled) / total_tasks`, in percent.
    pub failure_rate_pct: f64,
}

#[derive(Debug, Default)]
struct Totals {
    arrived: usize,
    completed: usize,
    expired: usize,
    skipped: usize,
    completed_by_tier: BTreeMap<Tier, usize>,
    cost: f64,
    delay_ms: f64,
    energy: f64,
    wait_rounds: u64,
}

// ── Simulator ─────────────────────────────────────────────────────────────────

pub struct Simulator {
    servers: Vec<Server>,
    /// Pending tasks in arrival order.
    pending: Vec<Task>,
    /// Every id ever admitted, for duplicate detection.
    seen: HashSet<TaskId>,
    /// Completed and expired tasks, kept only when requested.
    history: Option<BTreeMap<TaskId, Task>>,
    mobility: MobilityManager,
    mobility_enabled: bool,
    handover_latency_ms: f64,
    scheduler: Box<dyn Scheduler>,
    workload: Box<dyn Workload>,
    residency: ResidencyPolicy,
    round_budget: u64,
    current_time: u64,
    next_round: u64,
    totals: Totals,
}

impl Simulator {
    /// Build a simulator over `config`'s topology.
    ///
    /// # Errors
    /// [`SimulationError::EmptyTopology`] when no server is defined,
    /// [`SimulationError::InvalidConfig`] when validation fails.
    pub fn new(
        config: &SimConfig,
        scheduler: Box<dyn Scheduler>,
        workload: Box<dyn Workload>,
    ) -> Result<Self, SimulationError> {
        if config.topology.server_count() == 0 {
            return Err(SimulationError::EmptyTopology);
        }
        config
            .validate()
            .map_err(|e| SimulationError::InvalidConfig(format!("{e:#}")))?;

        let servers = config.topology.build_servers();
        let mobility = MobilityManager::new(
            &config.mobility,
            &servers,
            workload.device_count(),
            config.simulation.seed,
        );

        info!(
            scheduler = scheduler.name(),
            servers = servers.len(),
            devices = mobility.devices().len(),
            rounds = config.rounds(),
            residency = ?config.simulation.residency,
            "simulator ready"
        );

        Ok(Self {
            servers,
            pending: Vec::new(),
            seen: HashSet::new(),
            history: None,
            mobility,
            mobility_enabled: config.mobility.enabled,
            handover_latency_ms: config.mobility.handover_latency_ms,
            scheduler,
            workload,
            residency: config.simulation.residency,
            round_budget: config.rounds(),
            current_time: 0,
            next_round: 0,
            totals: Totals::default(),
        })
    }

    /// Simulator with a registry strategy and the configured device ramp.
    pub fn from_config(
        config: &SimConfig,
        registry: &SchedulerRegistry,
        scheduler: &str,
    ) -> Result<Self, SimulationError> {
        let scheduler = registry.create(scheduler, config)?;
        let workload = RampWorkload::new(&config.workload, config.simulation.seed);
        Self::new(config, scheduler, Box::new(workload))
    }

    /// Keep finished tasks so [`task`](Self::task) can return them.
    pub fn with_task_history(mut self) -> Self {
        self.history = Some(BTreeMap::new());
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    pub fn rounds_run(&self) -> u64 {
        self.next_round
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn pending(&self) -> &[Task] {
        &self.pending
    }

    pub fn mobility(&self) -> &MobilityManager {
        &self.mobility
    }

    #[cfg(test)]
    pub(crate) fn mobility_mut(&mut self) -> &mut MobilityManager {
        &mut self.mobility
    }

    /// A pending task, or a finished one when history is kept.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.pending
            .iter()
            .find(|t| t.id == id)
            .or_else(|| self.history.as_ref()?.get(&id))
    }

    /// Round budget reached, or nothing left to do.
    pub fn is_finished(&self) -> bool {
        self.next_round >= self.round_budget
            || (self.pending.is_empty() && self.workload.is_exhausted(self.next_round))
    }

    // ── Driving ───────────────────────────────────────────────────────────────

    /// Run rounds until [`is_finished`](Self::is_finished), reporting each.
    pub fn run(&mut self, reporter: &mut dyn Reporter) -> Result<RunSummary, SimulationError> {
        while !self.is_finished() {
            let report = self.step()?;
            reporter.report(&report)?;
        }
        let summary = self.summary();
        info!(
            scheduler = %summary.scheduler,
            rounds = summary.rounds,
            completed = summary.completed,
            expired = summary.expired,
            unscheduled = summary.unscheduled,
            failure_rate_pct = summary.failure_rate_pct,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Execute one round.
    pub fn step(&mut self) -> Result<RoundReport, SimulationError> {
        let t = self.next_round;
        self.current_time = t;

        // ── 1. Residency ──────────────────────────────────────────────────────
        for server in &mut self.servers {
            server.release_due(t);
        }

        // ── 2. Arrivals ───────────────────────────────────────────────────────
        let mut arrived = 0usize;
        for task in self.workload.next_batch(t) {
            if !task.is_pending() {
                warn!(task = %task.id, state = %task.state(), round = t, "non-pending arrival dropped");
                continue;
            }
            if !self.seen.insert(task.id) {
                warn!(task = %task.id, round = t, "duplicate task id dropped");
                continue;
            }
            self.pending.push(task);
            arrived += 1;
        }

        // ── 3. Deadlines ──────────────────────────────────────────────────────
        let mut expired = Vec::new();
        let mut waiting = Vec::with_capacity(self.pending.len());
        for mut task in std::mem::take(&mut self.pending) {
            if task.deadline_passed(t) {
                task.expire(t)?;
                debug!(task = %task.id, deadline = ?task.deadline, round = t, "expired");
                expired.push(task.id);
                self.archive(task);
            } else {
                waiting.push(task);
            }
        }
        self.pending = waiting;

        // ── 4. Mobility ───────────────────────────────────────────────────────
        let handovers = if self.mobility_enabled {
            self.mobility.step(&mut self.servers, t)
        } else {
            Vec::new()
        };
        let handed_over: BTreeSet<DeviceId> = handovers.iter().map(|h| h.device).collect();

        // ── 5. Schedule ───────────────────────────────────────────────────────
        let proposals = {
            let refs: Vec<&Task> = self.pending.iter().collect();
            let ctx = ScheduleContext {
                tasks: &refs,
                servers: &self.servers,
                devices: self.mobility.devices(),
                current_time: t,
            };
            self.scheduler.schedule(&ctx)
        };

        // ── 6. Apply ──────────────────────────────────────────────────────────
        let (completed, skipped) = self.apply(&proposals, &handed_over, t)?;

        // ── 7. Report ─────────────────────────────────────────────────────────
        self.totals.arrived += arrived;
        self.totals.expired += expired.len();
        self.totals.skipped += skipped;
        for record in &completed {
            self.totals.completed += 1;
            *self.totals.completed_by_tier.entry(record.tier).or_default() += 1;
            self.totals.cost += record.metrics.cost;
            self.totals.delay_ms += record.metrics.delay_ms;
            self.totals.energy += record.metrics.energy;
            self.totals.wait_rounds += record.wait_rounds();
        }

        let report = RoundReport {
            round: t,
            arrived,
            completed,
            expired,
            skipped,
            pending: self.pending.len(),
            handovers,
            servers: self.servers.iter().map(ServerSnapshot::from).collect(),
            mobility: MobilitySnapshot {
                total_handovers: self.mobility.total_handovers(),
                handover_delay_ms: self.mobility.handover_delay_ms(),
                dispersion_m: self.mobility.dispersion_m(),
            },
        };

        info!(
            round = t,
            arrived,
            completed = report.completed.len(),
            expired = report.expired.len(),
            skipped,
            pending = report.pending,
            handovers = report.handovers.len(),
            "round complete"
        );

        self.next_round = t + 1;
        Ok(report)
    }

    /// Re-validate and apply proposals in order.  Returns the completion
    /// records and the number of skipped proposals.
    fn apply(
        &mut self,
        proposals: &[Assignment],
        handed_over: &BTreeSet<DeviceId>,
        t: u64,
    ) -> Result<(Vec<TaskRecord>, usize), SimulationError> {
        let index: HashMap<TaskId, usize> = self
            .pending
            .iter()
            .enumerate()
            .map(|(i, task)| (task.id, i))
            .collect();
        let mut slots: Vec<Option<Task>> = std::mem::take(&mut self.pending)
            .into_iter()
            .map(Some)
            .collect();

        let mut completed = Vec::new();
        let mut skipped = 0usize;
        let release_round = self.residency.release_round(t);

        for proposal in proposals {
            let Some(slot) = index.get(&proposal.task).and_then(|&i| slots.get_mut(i)) else {
                warn!(task = %proposal.task, round = t, "proposal for unknown or finished task skipped");
                skipped += 1;
                continue;
            };
            let Some(task) = slot.as_mut() else {
                debug!(task = %proposal.task, round = t, "task already placed this round, proposal skipped");
                skipped += 1;
                continue;
            };
            let Some(server) = self.servers.iter_mut().find(|s| s.id == proposal.server) else {
                warn!(task = %proposal.task, server = %proposal.server, round = t, "proposal for unknown server skipped");
                skipped += 1;
                continue;
            };
            if let Err(reason) = server.check_admission(task) {
                debug!(task = %task.id, server = %server.name, %reason, "admission failed, task stays pending");
                skipped += 1;
                continue;
            }

            server.allocate(task, release_round)?;
            task.assign(server.id, t)?;
            task.complete(t)?;

            let device = self
                .mobility
                .device_position(task.device)
                .unwrap_or_else(|| server.position());
            let mut task_metrics = metrics::evaluate(task, server, &device);
            let handover_penalty_ms = if handed_over.contains(&task.device) {
                self.handover_latency_ms
            } else {
                0.0
            };
            task_metrics.delay_ms += handover_penalty_ms;

            completed.push(TaskRecord {
                task: task.id,
                device: task.device,
                server: server.id,
                tier: server.tier,
                priority: task.priority,
                created_round: task.created_round,
                completed_round: t,
                metrics: task_metrics,
                handover_penalty_ms,
                signal_db: metrics::signal_strength_db(device.distance_to(&server.position())),
            });

            if let Some(done) = slot.take() {
                self.archive(done);
            }
        }

        self.pending = slots.into_iter().flatten().collect();
        Ok((completed, skipped))
    }

    fn archive(&mut self, task: Task) {
        if let Some(history) = &mut self.history {
            history.insert(task.id, task);
        }
    }

    pub fn summary(&self) -> RunSummary {
        let t = &self.totals;
        let unscheduled = self.pending.len();
        let avg = |sum: f64| if t.completed == 0 { 0.0 } else { sum / t.completed as f64 };
        RunSummary {
            scheduler: self.scheduler.name().to_string(),
            rounds: self.next_round,
            total_tasks: t.arrived,
            completed: t.completed,
            expired: t.expired,
            unscheduled,
            skipped_proposals: t.skipped,
            completed_by_tier: t.completed_by_tier.clone(),
            total_cost: t.cost,
            avg_delay_ms: avg(t.delay_ms),
            total_energy: t.energy,
            avg_wait_rounds: avg(t.wait_rounds as f64),
            handovers: self.mobility.total_handovers(),
            handover_delay_ms: self.mobility.handover_delay_ms(),
            failure_rate_pct: metrics::failure_rate_pct(t.arrived, t.expired + unscheduled),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
