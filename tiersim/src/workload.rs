/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Task sources.
//!
//! The simulator pulls one batch per round through the [`Workload`] trait.
//! Two sources ship with the crate:
//!
//! * [`RampWorkload`]: a growing device population, one task per active
//!   device per round, seeded for reproducibility.
//! * [`ScriptedWorkload`]: replays an explicit task list, grouped by each
//!   task's `created_round`.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::debug;

use crate::config::WorkloadConfig;
use crate::task::{DeviceId, Resources, Task, TaskId};

pub trait Workload {
    /// Tasks arriving at `round`.  Called once per round, in round order.
    fn next_batch(&mut self, round: u64) -> Vec<Task>;

    /// `true` once no batch at or after `round` can contain tasks.
    fn is_exhausted(&self, round: u64) -> bool;

    /// Number of distinct devices this source can emit tasks for.
    fn device_count(&self) -> usize;
}

// ── RampWorkload ──────────────────────────────────────────────────────────────

/// `start_devices + round × increment` active devices (capped at
/// `max_devices`), each emitting one task per round.
///
/// Every task demands `data_per_device_kb` in each resource dimension and
/// carries a random priority in `1..=3`.
pub struct RampWorkload {
    config: WorkloadConfig,
    rng: Pcg64,
    next_id: u64,
    round_limit: Option<u64>,
}

impl RampWorkload {
    pub fn new(config: &WorkloadConfig, seed: u64) -> Self {
        Self {
            config: config.clone(),
            rng: Pcg64::seed_from_u64(seed),
            next_id: 0,
            round_limit: None,
        }
    }

    /// Stop emitting at `rounds` (exclusive).  Without a limit the ramp
    /// holds at `max_devices` forever.
    pub fn with_round_limit(mut self, rounds: u64) -> Self {
        self.round_limit = Some(rounds);
        self
    }

    /// Devices active at `round`.
    pub fn active_devices(&self, round: u64) -> usize {
        let grown = (round as usize)
            .saturating_mul(self.config.increment)
            .saturating_add(self.config.start_devices);
        grown.min(self.config.max_devices)
    }
}

impl Workload for RampWorkload {
    fn next_batch(&mut self, round: u64) -> Vec<Task> {
        if self.is_exhausted(round) {
            return Vec::new();
        }
        let active = self.active_devices(round);
        let data = self.config.data_per_device_kb;
        let demand = Resources::uniform(data);

        let batch: Vec<Task> = (0..active)
            .map(|device| {
                let id = TaskId(self.next_id);
                self.next_id += 1;
                let mut task = Task::new(id, DeviceId(device), round, demand)
                    .with_data_size(data as f64)
                    .with_priority(self.rng.gen_range(1..=3));
                if let Some(d) = self.config.deadline_rounds {
                    task = task.with_deadline(round.saturating_add(d));
                }
                task
            })
            .collect();

        debug!(round, tasks = batch.len(), "ramp batch generated");
        batch
    }

    fn is_exhausted(&self, round: u64) -> bool {
        self.round_limit.is_some_and(|limit| round >= limit)
    }

    fn device_count(&self) -> usize {
        self.config.max_devices
    }
}

// ── ScriptedWorkload ──────────────────────────────────────────────────────────

/// Replays a fixed list of tasks, each released at its `created_round`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedWorkload {
    by_round: BTreeMap<u64, Vec<Task>>,
    devices: usize,
}

impl ScriptedWorkload {
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut by_round: BTreeMap<u64, Vec<Task>> = BTreeMap::new();
        let mut devices = 0;
        for task in tasks {
            devices = devices.max(task.device.0 + 1);
            by_round.entry(task.created_round).or_default().push(task);
        }
        Self { by_round, devices }
    }

    /// Tasks not yet handed out.
    pub fn remaining(&self) -> usize {
        self.by_round.values().map(Vec::len).sum()
    }
}

impl Workload for ScriptedWorkload {
    fn next_batch(&mut self, round: u64) -> Vec<Task> {
        self.by_round.remove(&round).unwrap_or_default()
    }

    fn is_exhausted(&self, round: u64) -> bool {
        self.by_round.range(round..).next().is_none()
    }

    fn device_count(&self) -> usize {
        self.devices
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
