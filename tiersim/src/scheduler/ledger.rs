/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-call tentative capacity tracking.
//!
//! Servers are read-only to strategies, so a strategy that places several
//! tasks in one call needs its own view of what it has already promised.
//! A [`CapacityLedger`] starts from each server's `available()` and shrinks
//! as the strategy reserves.  It is built inside `schedule()` and dropped at
//! the end of the call.
//!
//! `BTreeMap` keyed by [`ServerId`] so iteration is always in id order and
//! ties resolve to the lower id.

use std::collections::BTreeMap;

use crate::metrics;
use crate::server::{Server, ServerId};
use crate::task::Resources;

#[derive(Debug, Clone)]
struct Entry {
    capacity: Resources,
    remaining: Resources,
}

#[derive(Debug, Clone, Default)]
pub struct CapacityLedger {
    entries: BTreeMap<ServerId, Entry>,
}

impl CapacityLedger {
    pub fn from_servers(servers: &[Server]) -> Self {
        let entries = servers
            .iter()
            .map(|s| {
                (
                    s.id,
                    Entry {
                        capacity: s.capacity(),
                        remaining: s.available(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Server ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ServerId> + '_ {
        self.entries.keys().copied()
    }

    pub fn remaining(&self, server: ServerId) -> Option<Resources> {
        self.entries.get(&server).map(|e| e.remaining)
    }

    pub fn fits(&self, server: ServerId, demand: &Resources) -> bool {
        self.entries
            .get(&server)
            .is_some_and(|e| demand.fits_within(&e.remaining))
    }

    /// Take `demand` from `server`.  Returns `false` (and changes nothing)
    /// if it does not fit.
    pub fn reserve(&mut self, server: ServerId, demand: &Resources) -> bool {
        match self.entries.get_mut(&server) {
            Some(e) if demand.fits_within(&e.remaining) => {
                e.remaining = e.remaining.saturating_sub(demand);
                true
            }
            _ => false,
        }
    }

    /// CPU utilisation in percent including tentative reservations.
    pub fn cpu_utilization(&self, server: ServerId) -> f64 {
        self.cpu_utilization_with(server, 0)
    }

    /// CPU utilisation in percent if `extra_cpu` more were reserved.
    pub fn cpu_utilization_with(&self, server: ServerId, extra_cpu: u64) -> f64 {
        self.entries.get(&server).map_or(0.0, |e| {
            let used = e.capacity.cpu.saturating_sub(e.remaining.cpu).saturating_add(extra_cpu);
            metrics::percent(used as f64, e.capacity.cpu as f64)
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
