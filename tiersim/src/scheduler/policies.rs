/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Built-in rule-based strategies.
//!
//! All four follow the same shape: walk the pending tasks in some order,
//! pick a server that still fits in a per-call [`CapacityLedger`], reserve
//! it there, and emit the pair.  Only the pick rule differs.

use std::cmp::Ordering;

use tracing::debug;

use super::{Assignment, CapacityLedger, ScheduleContext, Scheduler};
use crate::metrics;
use crate::server::{Server, ServerId, Tier};
use crate::task::Task;

/// Place `tasks` in order using `pick`, reserving each placement in a fresh
/// ledger so one call never over-commits a server.
fn place_each<'t, I, F>(ctx: &ScheduleContext<'_>, strategy: &str, tasks: I, mut pick: F) -> Vec<Assignment>
where
    I: IntoIterator<Item = &'t Task>,
    F: FnMut(&CapacityLedger, &Task) -> Option<ServerId>,
{
    let mut ledger = CapacityLedger::from_servers(ctx.servers);
    let mut out = Vec::new();

    for task in tasks {
        let Some(server) = pick(&ledger, task) else {
            debug!(strategy, task = %task.id, "no server fits");
            continue;
        };
        if ledger.reserve(server, &task.demand) {
            debug!(strategy, task = %task.id, server = %server, "proposed");
            out.push(Assignment::new(task.id, server));
        }
    }

    debug!(
        strategy,
        round = ctx.current_time,
        proposed = out.len(),
        pending = ctx.tasks.len(),
        "schedule done"
    );
    out
}

/// Servers the ledger can still fit `task` on.
fn eligible<'s>(
    servers: &'s [Server],
    ledger: &'s CapacityLedger,
    task: &'s Task,
) -> impl Iterator<Item = &'s Server> + 's {
    servers.iter().filter(move |s| ledger.fits(s.id, &task.demand))
}

/// Lowest `key`, then lowest id.
fn min_by_score<'s, I>(candidates: I, mut key: impl FnMut(&Server) -> f64) -> Option<ServerId>
where
    I: Iterator<Item = &'s Server>,
{
    candidates
        .map(|s| (key(s), s.id))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, id)| id)
}

// ─────────────────────────────────────────────────────────────────────────────
// tier_priority
// ─────────────────────────────────────────────────────────────────────────────

/// Edge first, then Regional, then Cloud.  Inside a tier the server with the
/// least remaining CPU that still fits wins, packing the nearest tier
/// tightly before spilling outward.
#[derive(Debug, Default, Clone, Copy)]
pub struct TierPriority;

impl TierPriority {
    pub const NAME: &'static str = "tier_priority";
}

impl Scheduler for TierPriority {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Vec<Assignment> {
        place_each(ctx, Self::NAME, ctx.tasks.iter().copied(), |ledger, task| {
            Tier::ALL.into_iter().find_map(|tier| {
                eligible(ctx.servers, ledger, task)
                    .filter(|s| s.tier == tier)
                    .map(|s| {
                        let remaining = ledger.remaining(s.id).map_or(0, |r| r.cpu);
                        (remaining, s.id)
                    })
                    .min()
                    .map(|(_, id)| id)
            })
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// least_loaded
// ─────────────────────────────────────────────────────────────────────────────

/// Lowest current CPU utilisation, counting this call's own proposals.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeastLoaded;

impl LeastLoaded {
    pub const NAME: &'static str = "least_loaded";
}

impl Scheduler for LeastLoaded {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Vec<Assignment> {
        place_each(ctx, Self::NAME, ctx.tasks.iter().copied(), |ledger, task| {
            min_by_score(eligible(ctx.servers, ledger, task), |s| {
                ledger.cpu_utilization(s.id)
            })
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// best_fit_decreasing
// ─────────────────────────────────────────────────────────────────────────────

/// Largest CPU demand first; each task goes where it leaves the server most
/// tightly packed.
#[derive(Debug, Default, Clone, Copy)]
pub struct BestFitDecreasing;

impl BestFitDecreasing {
    pub const NAME: &'static str = "best_fit_decreasing";
}

impl Scheduler for BestFitDecreasing {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Vec<Assignment> {
        // Stable sort: equal demands keep arrival order.
        let mut order: Vec<&Task> = ctx.tasks.to_vec();
        order.sort_by(|a, b| b.demand.cpu.cmp(&a.demand.cpu));

        place_each(ctx, Self::NAME, order, |ledger, task| {
            eligible(ctx.servers, ledger, task)
                .map(|s| (ledger.cpu_utilization_with(s.id, task.demand.cpu), s.id))
                .max_by(|a, b| match a.0.total_cmp(&b.0) {
                    // max_by keeps the last maximum; prefer the lower id.
                    Ordering::Equal => b.1.cmp(&a.1),
                    other => other,
                })
                .map(|(_, id)| id)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// nearest
// ─────────────────────────────────────────────────────────────────────────────

/// Shortest path from the task's device to the server (distance plus tier
/// backhaul).  A device the context does not know is treated as sitting on
/// each candidate, which reduces the rule to "smallest backhaul".
#[derive(Debug, Default, Clone, Copy)]
pub struct Nearest;

impl Nearest {
    pub const NAME: &'static str = "nearest";
}

impl Scheduler for Nearest {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Vec<Assignment> {
        place_each(ctx, Self::NAME, ctx.tasks.iter().copied(), |ledger, task| {
            let device = ctx.device_position(task.device);
            min_by_score(eligible(ctx.servers, ledger, task), |s| {
                metrics::path_length_m(s, &device.unwrap_or_else(|| s.position()))
            })
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MobilityConfig;
    use crate::mobility::geometry::Position;
    use crate::mobility::MobilityManager;
    use crate::server::TierProfile;
    use crate::task::{DeviceId, Resources, TaskId};

    fn server(id: u32, tier: Tier, cpu: u64, x: f64) -> Server {
        Server::new(
            ServerId(id),
            format!("{}_{}", tier, id + 1),
            tier,
            Resources::cpu(cpu),
            TierProfile::default_for(tier),
            Position::new(x, 0.0),
        )
    }

    fn task(id: u64, device: usize, cpu: u64) -> Task {
        Task::new(TaskId(id), DeviceId(device), 0, Resources::cpu(cpu))
    }

    fn run(s: &mut dyn Scheduler, tasks: &[Task], servers: &[Server]) -> Vec<(u64, u32)> {
        let refs: Vec<&Task> = tasks.iter().collect();
        let ctx = ScheduleContext {
            tasks: &refs,
            servers,
            devices: &[],
            current_time: 0,
        };
        s.schedule(&ctx)
            .into_iter()
            .map(|a| (a.task.0, a.server.0))
            .collect()
    }

    fn topology() -> Vec<Server> {
        vec![
            server(0, Tier::Edge, 4, 0.0),
            server(1, Tier::Edge, 8, 1_000.0),
            server(2, Tier::Regional, 100, 500.0),
            server(3, Tier::Cloud, 1_000, 500.0),
        ]
    }

    #[test]
    fn tier_priority_fills_edge_tightest_first_then_spills() {
        let tasks: Vec<Task> = (1..=4).map(|i| task(i, 0, 3)).collect();
        let got = run(&mut TierPriority, &tasks, &topology());
        assert_eq!(got, vec![(1, 0), (2, 1), (3, 1), (4, 2)]);
    }

    #[test]
    fn tier_priority_falls_through_to_cloud() {
        let tasks = vec![task(1, 0, 500)];
        assert_eq!(run(&mut TierPriority, &tasks, &topology()), vec![(1, 3)]);
    }

    #[test]
    fn oversized_task_gets_no_proposal() {
        let tasks = vec![task(1, 0, 5_000), task(2, 0, 1)];
        for s in [
            &mut TierPriority as &mut dyn Scheduler,
            &mut LeastLoaded,
            &mut BestFitDecreasing,
            &mut Nearest,
        ] {
            let got = run(s, &tasks, &topology());
            assert_eq!(got.len(), 1, "{}", s.name());
            assert_eq!(got[0].0, 2);
        }
    }

    #[test]
    fn least_loaded_counts_its_own_proposals() {
        let mut servers = vec![
            server(0, Tier::Edge, 10, 0.0),
            server(1, Tier::Edge, 10, 0.0),
        ];
        servers[0].allocate(&task(99, 0, 5), 1).unwrap();
        let tasks: Vec<Task> = (1..=4).map(|i| task(i, 0, 2)).collect();
        // s1 climbs 0 → 20 → 40 → 60 %; the fourth task sees s0 at 50 % as lighter
        assert_eq!(
            run(&mut LeastLoaded, &tasks, &servers),
            vec![(1, 1), (2, 1), (3, 1), (4, 0)]
        );
    }

    #[test]
    fn least_loaded_ties_go_to_lower_id() {
        let servers = vec![server(0, Tier::Edge, 10, 0.0), server(1, Tier::Edge, 10, 0.0)];
        assert_eq!(run(&mut LeastLoaded, &[task(1, 0, 1)], &servers), vec![(1, 0)]);
    }

    #[test]
    fn best_fit_decreasing_sorts_and_packs() {
        let servers = vec![server(0, Tier::Edge, 4, 0.0), server(1, Tier::Edge, 8, 0.0)];
        let tasks = vec![task(1, 0, 1), task(2, 0, 4), task(3, 0, 3)];
        assert_eq!(
            run(&mut BestFitDecreasing, &tasks, &servers),
            vec![(2, 0), (3, 1), (1, 1)]
        );
    }

    #[test]
    fn best_fit_decreasing_ties_go_to_lower_id() {
        let servers = vec![server(0, Tier::Edge, 8, 0.0), server(1, Tier::Edge, 8, 0.0)];
        assert_eq!(run(&mut BestFitDecreasing, &[task(1, 0, 2)], &servers), vec![(1, 0)]);
    }

    #[test]
    fn nearest_follows_the_device() {
        let servers = vec![
            server(0, Tier::Edge, 1, 0.0),
            server(1, Tier::Edge, 10, 1_000.0),
            server(2, Tier::Regional, 100, 500.0),
        ];
        let cfg = MobilityConfig {
            pause_range: (1e9, 1e9),
            ..MobilityConfig::default()
        };
        // device 0 on server 0, device 1 on server 1, device 2 on server 2
        let mobility = MobilityManager::new(&cfg, &servers, 3, 1);
        let tasks = vec![task(1, 1, 1), task(2, 0, 1), task(3, 0, 1), task(4, 7, 1)];
        let refs: Vec<&Task> = tasks.iter().collect();
        let ctx = ScheduleContext {
            tasks: &refs,
            servers: &servers,
            devices: mobility.devices(),
            current_time: 0,
        };
        let got: Vec<(u64, u32)> = Nearest
            .schedule(&ctx)
            .into_iter()
            .map(|a| (a.task.0, a.server.0))
            .collect();
        // task 3 finds server 0 full and takes the next-shortest path; the
        // unknown device 7 picks the smallest backhaul (an edge server).
        assert_eq!(got, vec![(1, 1), (2, 0), (3, 1), (4, 1)]);
    }
}
