/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Top-level failure of a simulation run.
//!
//! Everything here aborts the run.  Recoverable conditions (bad proposals,
//! tasks that never fit, duplicate arrivals) are logged and counted in the
//! round report instead.

use thiserror::Error;

use crate::report::ReportError;
use crate::scheduler::SchedulerError;
use crate::server::ServerError;
use crate::task::TaskError;

#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The topology produced no servers.
    #[error("topology defines no servers")]
    EmptyTopology,

    /// A server refused an allocation that passed admission.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// A task lifecycle transition was out of order.
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
