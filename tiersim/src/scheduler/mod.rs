/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pluggable placement strategies.
//!
//! Each round the simulator hands a [`Scheduler`] a read-only
//! [`ScheduleContext`] and receives a list of `(task, server)` proposals.
//! Proposals are advisory: the simulator re-checks every one against the
//! real server state before applying it, so a buggy strategy can waste a
//! round but never break the capacity invariant.
//!
//! Strategies are looked up by name through a [`SchedulerRegistry`].
//!
//! | Name | Rule |
//! |---|---|
//! | `tier_priority` | Edge → Regional → Cloud; least remaining CPU within a tier |
//! | `least_loaded` | lowest CPU utilisation |
//! | `best_fit_decreasing` | largest CPU demand first; highest post-placement utilisation |
//! | `nearest` | shortest device → server path |
//!
//! Every built-in breaks ties by the lower server id.

pub mod error;
pub mod ledger;
pub mod policies;

pub use error::SchedulerError;
pub use ledger::CapacityLedger;
pub use policies::{BestFitDecreasing, LeastLoaded, Nearest, TierPriority};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::mobility::geometry::Position;
use crate::mobility::Device;
use crate::server::{Server, ServerId};
use crate::task::{DeviceId, Task, TaskId};

// ── Contract ──────────────────────────────────────────────────────────────────

/// One placement proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task: TaskId,
    pub server: ServerId,
}

impl Assignment {
    pub fn new(task: TaskId, server: ServerId) -> Self {
        Self { task, server }
    }
}

/// Read-only view of the world for one `schedule` call.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleContext<'a> {
    /// Pending tasks in arrival order.
    pub tasks: &'a [&'a Task],
    pub servers: &'a [Server],
    pub devices: &'a [Device],
    pub current_time: u64,
}

impl<'a> ScheduleContext<'a> {
    pub fn device_position(&self, id: DeviceId) -> Option<Position> {
        self.devices
            .get(id.0)
            .filter(|d| d.id == id)
            .map(Device::position)
    }
}

pub trait Scheduler {
    fn name(&self) -> &str;

    /// Propose placements for some or all of `ctx.tasks`.
    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Vec<Assignment>;
}

// ── Registry ──────────────────────────────────────────────────────────────────

pub type SchedulerFactory = Box<dyn Fn(&SimConfig) -> Box<dyn Scheduler>>;

/// Name → factory table.
///
/// `BTreeMap` so [`names`](Self::names) comes back sorted.
pub struct SchedulerRegistry {
    factories: BTreeMap<String, SchedulerFactory>,
}

impl SchedulerRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding the four built-in strategies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.insert(TierPriority::NAME, |_| Box::new(TierPriority));
        registry.insert(LeastLoaded::NAME, |_| Box::new(LeastLoaded));
        registry.insert(BestFitDecreasing::NAME, |_| Box::new(BestFitDecreasing));
        registry.insert(Nearest::NAME, |_| Box::new(Nearest));
        registry
    }

    /// # Errors
    /// [`SchedulerError::DuplicateScheduler`] if `name` is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), SchedulerError>
    where
        F: Fn(&SimConfig) -> Box<dyn Scheduler> + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(SchedulerError::DuplicateScheduler(name));
        }
        self.insert(name, factory);
        Ok(())
    }

    fn insert<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&SimConfig) -> Box<dyn Scheduler> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// # Errors
    /// [`SchedulerError::UnknownScheduler`] listing every valid name.
    pub fn create(&self, name: &str, config: &SimConfig) -> Result<Box<dyn Scheduler>, SchedulerError> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory(config)),
            None => Err(SchedulerError::UnknownScheduler {
                name: name.to_string(),
                valid: self.names(),
            }),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for SchedulerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl Scheduler for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn schedule(&mut self, _ctx: &ScheduleContext<'_>) -> Vec<Assignment> {
            Vec::new()
        }
    }

    #[test]
    fn builtins_are_listed_sorted() {
        let r = SchedulerRegistry::with_builtins();
        assert_eq!(
            r.names(),
            vec!["best_fit_decreasing", "least_loaded", "nearest", "tier_priority"]
        );
    }

    #[test]
    fn create_returns_named_strategy() {
        let r = SchedulerRegistry::with_builtins();
        let cfg = SimConfig::default();
        for name in r.names() {
            assert_eq!(r.create(&name, &cfg).unwrap().name(), name);
        }
    }

    #[test]
    fn unknown_name_lists_valid_choices() {
        let r = SchedulerRegistry::with_builtins();
        let err = r.create("round_robin", &SimConfig::default()).err().unwrap();
        match &err {
            SchedulerError::UnknownScheduler { name, valid } => {
                assert_eq!(name, "round_robin");
                assert_eq!(valid.len(), 4);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("tier_priority"));
    }

    #[test]
    fn register_custom_and_reject_duplicates() {
        let mut r = SchedulerRegistry::with_builtins();
        r.register("idle", |_| Box::new(Idle)).unwrap();
        assert!(r.contains("idle"));
        assert_eq!(
            r.register("idle", |_| Box::new(Idle)).unwrap_err(),
            SchedulerError::DuplicateScheduler("idle".into())
        );
        assert_eq!(
            r.register("nearest", |_| Box::new(Idle)).unwrap_err(),
            SchedulerError::DuplicateScheduler("nearest".into())
        );
    }

    #[test]
    fn context_device_lookup_checks_id() {
        let ctx = ScheduleContext {
            tasks: &[],
            servers: &[],
            devices: &[],
            current_time: 0,
        };
        assert_eq!(ctx.device_position(DeviceId(0)), None);
    }
}
