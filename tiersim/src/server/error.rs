/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for server admission.
//!
//! * [`AdmissionReason`]: why a single task does not fit a specific server
//!   right now (carries exact resource values).
//! * [`ServerError`]: returned from [`Server::allocate`](super::Server::allocate)
//!   when it is called without a passing admission check.  The simulator
//!   always checks first, so this error reaching the round loop means the
//!   loop itself is broken; it is propagated as fatal, never absorbed.

use thiserror::Error;

use super::ServerId;
use crate::task::{Dimension, TaskId};

// ── Admission control ─────────────────────────────────────────────────────────

/// Detailed reason why a task does not fit on a server.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionReason {
    /// `demand > capacity - allocated` in `dimension`.
    InsufficientCapacity {
        dimension: Dimension,
        requested: u64,
        available: u64,
    },

    /// The server already holds a lease for this task id.
    AlreadyHosted,
}

impl std::fmt::Display for AdmissionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionReason::InsufficientCapacity {
                dimension,
                requested,
                available,
            } => write!(
                f,
                "{} demand {} exceeds available {}",
                dimension, requested, available
            ),
            AdmissionReason::AlreadyHosted => write!(f, "task already holds a lease here"),
        }
    }
}

// ── Server errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ServerError {
    /// `allocate` was called although admission fails.
    #[error("{task} exceeds resources of server {server}: {reason}")]
    ResourceExceeded {
        server: ServerId,
        task: TaskId,
        reason: AdmissionReason,
    },
}
