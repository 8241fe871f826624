/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures for the tiersim round loop.
//!
//! ```text
//! Workload ──(Task, Pending)──►  Simulator  ──(Scheduler proposal)──►  Server
//!                                    │                                   │
//!                                    └── assign → complete ◄── admission ┘
//! ```
//!
//! # Ownership model
//! `Task` is **owned** by the `Simulator` from the moment a workload hands it
//! over.  Schedulers only ever see `&Task`; the simulator is the sole caller
//! of the lifecycle methods ([`Task::assign`], [`Task::complete`],
//! [`Task::expire`]), which enforce the state machine:
//!
//! ```text
//! Pending ──assign──► Assigned ──complete──► Completed
//!    │
//!    └──expire──► Expired
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::ServerId;

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Unique task identifier within one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Identifier of the mobile device that originated a task.
///
/// Doubles as the index into the mobility manager's device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

// ── Resources ─────────────────────────────────────────────────────────────────

/// One resource dimension tracked by the admission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Cpu,
    Memory,
    Storage,
    Bandwidth,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Cpu,
        Dimension::Memory,
        Dimension::Storage,
        Dimension::Bandwidth,
    ];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dimension::Cpu => "cpu",
            Dimension::Memory => "memory",
            Dimension::Storage => "storage",
            Dimension::Bandwidth => "bandwidth",
        };
        f.write_str(s)
    }
}

/// Integer resource vector used for server capacity, server allocation and
/// task demand alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: u64,
    pub memory: u64,
    pub storage: u64,
    pub bandwidth: u64,
}

impl Resources {
    pub const ZERO: Resources = Resources {
        cpu: 0,
        memory: 0,
        storage: 0,
        bandwidth: 0,
    };

    pub fn new(cpu: u64, memory: u64, storage: u64, bandwidth: u64) -> Self {
        Self {
            cpu,
            memory,
            storage,
            bandwidth,
        }
    }

    /// A demand (or capacity) that only has a CPU component.
    pub fn cpu(cpu: u64) -> Self {
        Self {
            cpu,
            ..Self::ZERO
        }
    }

    /// The same amount in every dimension (the original workload model).
    pub fn uniform(amount: u64) -> Self {
        Self::new(amount, amount, amount, amount)
    }

    pub fn get(&self, dim: Dimension) -> u64 {
        match dim {
            Dimension::Cpu => self.cpu,
            Dimension::Memory => self.memory,
            Dimension::Storage => self.storage,
            Dimension::Bandwidth => self.bandwidth,
        }
    }

    /// First dimension in which `self` does not fit inside `available`.
    pub fn first_exceeding(&self, available: &Resources) -> Option<Dimension> {
        Dimension::ALL
            .into_iter()
            .find(|&d| self.get(d) > available.get(d))
    }

    /// Returns `true` if every dimension of `self` is ≤ the matching
    /// dimension of `available`.
    pub fn fits_within(&self, available: &Resources) -> bool {
        self.first_exceeding(available).is_none()
    }

    pub fn saturating_add(&self, other: &Resources) -> Resources {
        Resources {
            cpu: self.cpu.saturating_add(other.cpu),
            memory: self.memory.saturating_add(other.memory),
            storage: self.storage.saturating_add(other.storage),
            bandwidth: self.bandwidth.saturating_add(other.bandwidth),
        }
    }

    pub fn saturating_sub(&self, other: &Resources) -> Resources {
        Resources {
            cpu: self.cpu.saturating_sub(other.cpu),
            memory: self.memory.saturating_sub(other.memory),
            storage: self.storage.saturating_sub(other.storage),
            bandwidth: self.bandwidth.saturating_sub(other.bandwidth),
        }
    }

    /// Sum of all dimensions.  Only meaningful as a coarse tie-breaker.
    pub fn total(&self) -> u64 {
        self.cpu
            .saturating_add(self.memory)
            .saturating_add(self.storage)
            .saturating_add(self.bandwidth)
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for a scheduler proposal that passes admission.
    #[default]
    Pending,
    /// Placed on a server during the current round.
    Assigned,
    /// Execution finished (atomic within the assignment round).
    Completed,
    /// Deadline elapsed before the task was ever assigned.
    Expired,
}

impl TaskState {
    /// `Completed` and `Expired` never leave their state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Expired)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Assigned => "assigned",
            TaskState::Completed => "completed",
            TaskState::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("{task}: invalid transition {from} → {to}")]
    InvalidTransition {
        task: TaskId,
        from: TaskState,
        to: TaskState,
    },

    #[error("{task} is already assigned to server {server}")]
    AlreadyAssigned { task: TaskId, server: ServerId },
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A unit of work produced by a device.
///
/// Construct with [`Task::new`] and the `with_*` builders; all assignment
/// fields start empty and are only written through the lifecycle methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    // ── Identity ──────────────────────────────────────────────────────────────
    pub id: TaskId,
    pub device: DeviceId,
    pub created_round: u64,

    // ── Demand ────────────────────────────────────────────────────────────────
    pub demand: Resources,

    /// Payload shipped to the server, used for transmission delay, cost and
    /// energy.
    pub data_size_kb: f64,

    /// Last round in which the task may still be assigned.
    pub deadline: Option<u64>,

    /// 1 = high, 3 = low.
    pub priority: u8,

    // ── Lifecycle (written by the simulator only) ─────────────────────────────
    state: TaskState,
    assigned_server: Option<ServerId>,
    assigned_round: Option<u64>,
    completion_round: Option<u64>,
    expired_round: Option<u64>,
}

impl Task {
    pub fn new(id: TaskId, device: DeviceId, created_round: u64, demand: Resources) -> Self {
        Self {
            id,
            device,
            created_round,
            demand,
            data_size_kb: 0.0,
            deadline: None,
            priority: 1,
            state: TaskState::Pending,
            assigned_server: None,
            assigned_round: None,
            completion_round: None,
            expired_round: None,
        }
    }

    pub fn with_data_size(mut self, data_size_kb: f64) -> Self {
        self.data_size_kb = data_size_kb;
        self
    }

    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == TaskState::Pending
    }

    pub fn assigned_server(&self) -> Option<ServerId> {
        self.assigned_server
    }

    pub fn assigned_round(&self) -> Option<u64> {
        self.assigned_round
    }

    pub fn completion_round(&self) -> Option<u64> {
        self.completion_round
    }

    pub fn expired_round(&self) -> Option<u64> {
        self.expired_round
    }

    /// Returns `true` once `round` is past the deadline.
    pub fn deadline_passed(&self, round: u64) -> bool {
        self.deadline.is_some_and(|d| d < round)
    }

    /// Rounds spent waiting between arrival and assignment.
    pub fn wait_rounds(&self) -> Option<u64> {
        self.assigned_round
            .map(|r| r.saturating_sub(self.created_round))
    }

    /// `Pending → Assigned`.
    pub fn assign(&mut self, server: ServerId, round: u64) -> Result<(), TaskError> {
        if let Some(existing) = self.assigned_server {
            return Err(TaskError::AlreadyAssigned {
                task: self.id,
                server: existing,
            });
        }
        self.transition(TaskState::Pending, TaskState::Assigned)?;
        self.assigned_server = Some(server);
        self.assigned_round = Some(round);
        Ok(())
    }

    /// `Assigned → Completed`.
    pub fn complete(&mut self, round: u64) -> Result<(), TaskError> {
        self.transition(TaskState::Assigned, TaskState::Completed)?;
        self.completion_round = Some(round);
        Ok(())
    }

    /// `Pending → Expired`.  Has no resource effect.
    pub fn expire(&mut self, round: u64) -> Result<(), TaskError> {
        self.transition(TaskState::Pending, TaskState::Expired)?;
        self.expired_round = Some(round);
        Ok(())
    }

    fn transition(&mut self, expected: TaskState, next: TaskState) -> Result<(), TaskError> {
        if self.state != expected {
            return Err(TaskError::InvalidTransition {
                task: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
