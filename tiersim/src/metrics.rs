/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Stateless cost, delay, energy and utilisation computations.
//!
//! Every function here is pure: it reads a task / server / position snapshot
//! and returns a number.  The simulator uses them to build round reports;
//! strategies may call them to score candidate placements.
//!
//! | Figure | Formula |
//! |---|---|
//! | cost | `cpu × cost_per_unit + data_kb × tx_cost_per_kb` |
//! | transmission delay | `data_kb × 8 / bandwidth_kbps × 1000` ms |
//! | propagation delay | `distance_m / 2·10⁸ × 1000` ms |
//! | task delay | transmission + propagation + tier latency |
//! | energy | `data_kb × (energy_per_kb + distance_m × 10⁻⁹)` |
//! | utilisation | `allocated / capacity × 100` per dimension |
//!
//! The distance used for propagation and energy is the device–server
//! distance plus the tier's nominal backhaul, so moving devices change the
//! figures of their next task.

use serde::{Deserialize, Serialize};

use crate::mobility::geometry::Position;
use crate::server::{Server, TierProfile};
use crate::task::{Resources, Task};

/// Signal propagation speed, metres per second.
pub const PROPAGATION_SPEED_MPS: f64 = 2.0e8;

/// Energy per KB per metre travelled.
pub const ENERGY_PER_KB_METRE: f64 = 1.0e-9;

// ── Cost ──────────────────────────────────────────────────────────────────────

pub fn processing_cost(cpu_demand: u64, cost_per_unit: f64) -> f64 {
    cpu_demand as f64 * cost_per_unit
}

pub fn transmission_cost(data_kb: f64, tx_cost_per_kb: f64) -> f64 {
    data_kb * tx_cost_per_kb
}

/// Processing plus transmission cost of running `task` on a tier.
pub fn task_cost(task: &Task, profile: &TierProfile) -> f64 {
    processing_cost(task.demand.cpu, profile.cost_per_unit)
        + transmission_cost(task.data_size_kb, profile.tx_cost_per_kb)
}

// ── Delay ─────────────────────────────────────────────────────────────────────

/// `0.0` for a zero-bandwidth link rather than infinity.
pub fn transmission_delay_ms(data_kb: f64, bandwidth_kbps: f64) -> f64 {
    if bandwidth_kbps <= 0.0 {
        return 0.0;
    }
    data_kb * 8.0 / bandwidth_kbps * 1_000.0
}

pub fn propagation_delay_ms(distance_m: f64) -> f64 {
    distance_m / PROPAGATION_SPEED_MPS * 1_000.0
}

/// Device-to-server distance plus the tier's backhaul.
pub fn path_length_m(server: &Server, device: &Position) -> f64 {
    device.distance_to(&server.position()) + server.profile.backhaul_m
}

pub fn task_delay_ms(task: &Task, server: &Server, device: &Position) -> f64 {
    transmission_delay_ms(task.data_size_kb, server.profile.bandwidth_kbps)
        + propagation_delay_ms(path_length_m(server, device))
        + server.profile.latency_ms
}

// ── Energy ────────────────────────────────────────────────────────────────────

pub fn energy(data_kb: f64, distance_m: f64, energy_per_kb: f64) -> f64 {
    data_kb * (energy_per_kb + distance_m * ENERGY_PER_KB_METRE)
}

pub fn task_energy(task: &Task, server: &Server, device: &Position) -> f64 {
    energy(
        task.data_size_kb,
        path_length_m(server, device),
        server.profile.energy_per_kb,
    )
}

// ── Per-task bundle ───────────────────────────────────────────────────────────

/// Per-task figures.  `cost` and `delay_ms` are the totals; the other
/// fields break them down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub cost: f64,
    pub processing_cost: f64,
    pub transmission_cost: f64,
    pub delay_ms: f64,
    pub transmission_delay_ms: f64,
    pub propagation_delay_ms: f64,
    pub energy: f64,
}

/// Cost, delay and energy of placing `task` on `server` for a device at
/// `device`.
pub fn evaluate(task: &Task, server: &Server, device: &Position) -> TaskMetrics {
    let profile = &server.profile;
    let processing_cost = processing_cost(task.demand.cpu, profile.cost_per_unit);
    let transmission_cost = transmission_cost(task.data_size_kb, profile.tx_cost_per_kb);
    let transmission_delay_ms = transmission_delay_ms(task.data_size_kb, profile.bandwidth_kbps);
    let propagation_delay_ms = propagation_delay_ms(path_length_m(server, device));
    TaskMetrics {
        cost: processing_cost + transmission_cost,
        processing_cost,
        transmission_cost,
        delay_ms: transmission_delay_ms + propagation_delay_ms + profile.latency_ms,
        transmission_delay_ms,
        propagation_delay_ms,
        energy: task_energy(task, server, device),
    }
}

// ── Utilisation ───────────────────────────────────────────────────────────────

/// Per-dimension utilisation in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Utilization {
    pub cpu_pct: f64,
    pub memory_pct: f64,
    pub storage_pct: f64,
    pub bandwidth_pct: f64,
}

/// `used / total × 100`, or `0.0` when `total` is zero.
pub fn percent(used: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        used / total * 100.0
    }
}

pub fn utilization(allocated: &Resources, capacity: &Resources) -> Utilization {
    Utilization {
        cpu_pct: percent(allocated.cpu as f64, capacity.cpu as f64),
        memory_pct: percent(allocated.memory as f64, capacity.memory as f64),
        storage_pct: percent(allocated.storage as f64, capacity.storage as f64),
        bandwidth_pct: percent(allocated.bandwidth as f64, capacity.bandwidth as f64),
    }
}

pub fn congestion_pct(total_data_kb: f64, bandwidth_kbps: f64) -> f64 {
    percent(total_data_kb, bandwidth_kbps)
}

pub fn failure_rate_pct(total: usize, failed: usize) -> f64 {
    percent(failed as f64, total as f64)
}

// ── Radio ─────────────────────────────────────────────────────────────────────

/// Free-space style path loss: `-20 · log10(max(distance, 1))` dB.
pub fn signal_strength_db(distance_m: f64) -> f64 {
    -20.0 * distance_m.max(1.0).log10()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{ServerId, Tier};
    use crate::task::{DeviceId, TaskId};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn edge_at(x: f64, y: f64) -> Server {
        Server::new(
            ServerId(0),
            "Edge_1",
            Tier::Edge,
            Resources::uniform(100),
            TierProfile::default_for(Tier::Edge),
            Position::new(x, y),
        )
    }

    fn task() -> Task {
        Task::new(TaskId(1), DeviceId(0), 0, Resources::uniform(10)).with_data_size(10.0)
    }

    #[test]
    fn transmission_delay_matches_formula() {
        // 10 KB over 164 000 kbps → 80 / 164 000 s → ≈ 0.4878 ms
        assert!(close(transmission_delay_ms(10.0, 164_000.0), 80.0 / 164.0));
        assert_eq!(transmission_delay_ms(10.0, 0.0), 0.0);
    }

    #[test]
    fn propagation_delay_matches_formula() {
        // 2 km at 2e8 m/s = 0.01 ms
        assert!(close(propagation_delay_ms(2_000.0), 0.01));
    }

    #[test]
    fn task_cost_sums_processing_and_transmission() {
        let profile = TierProfile::default_for(Tier::Edge);
        // 10 × 0.00005 + 10 × 0.00002
        assert!(close(task_cost(&task(), &profile), 0.000_7));
    }

    #[test]
    fn energy_grows_with_distance() {
        let server = edge_at(0.0, 0.0);
        let near = task_energy(&task(), &server, &Position::new(0.0, 0.0));
        let far = task_energy(&task(), &server, &Position::new(1_000.0, 0.0));
        assert!(far > near);
        // 10 × (1.5e-6 + 2000 × 1e-9)
        assert!(close(near, 10.0 * (1.5e-6 + 2e-6)));
    }

    #[test]
    fn delay_reflects_device_distance() {
        let server = edge_at(0.0, 0.0);
        let near = task_delay_ms(&task(), &server, &Position::new(0.0, 0.0));
        let far = task_delay_ms(&task(), &server, &Position::new(0.0, 4_000.0));
        assert!(close(far - near, propagation_delay_ms(4_000.0)));
        assert!(near > server.profile.latency_ms);
    }

    #[test]
    fn evaluate_is_pure() {
        let server = edge_at(3.0, 4.0);
        let t = task();
        let p = Position::new(0.0, 0.0);
        let a = evaluate(&t, &server, &p);
        let b = evaluate(&t, &server, &p);
        assert_eq!(a, b);
        assert_eq!(server.allocated(), Resources::ZERO);
    }

    #[test]
    fn evaluate_breaks_down_cost_and_delay() {
        let server = edge_at(0.0, 0.0);
        let t = task();
        let device = Position::new(0.0, 1_000.0);
        let m = evaluate(&t, &server, &device);

        assert!(close(m.cost, task_cost(&t, &server.profile)));
        assert!(close(m.processing_cost, 10.0 * 0.000_05));
        assert!(close(m.transmission_cost, 10.0 * 0.000_02));
        assert!(close(m.cost, m.processing_cost + m.transmission_cost));

        assert!(close(m.delay_ms, task_delay_ms(&t, &server, &device)));
        assert!(close(m.transmission_delay_ms, 80.0 / 164.0));
        assert!(close(m.propagation_delay_ms, propagation_delay_ms(3_000.0)));
        assert!(close(
            m.delay_ms,
            m.transmission_delay_ms + m.propagation_delay_ms + server.profile.latency_ms
        ));
    }

    #[test]
    fn utilization_handles_zero_capacity() {
        let u = utilization(&Resources::new(2, 0, 0, 0), &Resources::new(8, 0, 0, 0));
        assert!(close(u.cpu_pct, 25.0));
        assert_eq!(u.memory_pct, 0.0);
    }

    #[test]
    fn failure_rate_of_empty_run_is_zero() {
        assert_eq!(failure_rate_pct(0, 0), 0.0);
        assert!(close(failure_rate_pct(4, 1), 25.0));
    }

    #[test]
    fn signal_strength_is_clamped_at_one_metre() {
        assert_eq!(signal_strength_db(0.0), 0.0);
        assert!(close(signal_strength_db(100.0), -40.0));
        assert!(signal_strength_db(10.0) > signal_strength_db(20.0));
    }
}
