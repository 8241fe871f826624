/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Errors raised while resolving scheduling strategies.
//!
//! Strategies themselves never fail: a proposal that cannot be honoured is
//! simply skipped by the simulator.  Only the name → strategy lookup in
//! [`SchedulerRegistry`](super::SchedulerRegistry) can go wrong.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// No factory is registered under `name`.
    #[error("unknown scheduler: '{name}' (valid: {})", .valid.join(", "))]
    UnknownScheduler { name: String, valid: Vec<String> },

    /// A factory with this name already exists.
    #[error("scheduler '{0}' is already registered")]
    DuplicateScheduler(String),
}
