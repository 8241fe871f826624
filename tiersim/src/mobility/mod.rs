/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Device (and optional server) movement plus signal-based handover.
//!
//! Each round the simulator calls [`MobilityManager::step`] once.  All
//! entities advance by one `time_step_ms` of random-waypoint motion, then
//! every device re-evaluates which server serves it:
//!
//! 1. If the device is within `handover_distance_m` of its serving server
//!    nothing happens.
//! 2. Otherwise the strongest-signal server (the nearest one, lower id on a
//!    tie) is picked.
//! 3. The device switches only if that server differs and its signal beats
//!    the serving one by at least `handover_threshold_db`.
//!
//! Crossing the distance threshold alone emits nothing.  A
//! [`HandoverEvent`] means the device switched, so a device alone with one
//! server, or one with no clearly stronger alternative, can drift far past
//! the threshold without an event.  The dB margin is the signal-strength
//! hysteresis that keeps devices from flapping between two servers at
//! similar range.
//!
//! Handover changes which server is "serving" a device and therefore the
//! delay/energy figures of that device's next tasks.  It never moves or
//! reassigns tasks that already completed.

pub mod geometry;
pub mod waypoint;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MobilityConfig;
use crate::metrics::signal_strength_db;
use crate::server::{Server, ServerId};
use crate::task::DeviceId;

use geometry::{dispersion, Position};
use waypoint::{RandomWaypoint, WaypointParams};

// ── Device ────────────────────────────────────────────────────────────────────

/// A mobile task source.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    serving: ServerId,
    motion: RandomWaypoint,
}

impl Device {
    pub fn position(&self) -> Position {
        self.motion.position()
    }

    pub fn serving(&self) -> ServerId {
        self.serving
    }

    pub fn motion(&self) -> &RandomWaypoint {
        &self.motion
    }
}

/// A device switched serving server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandoverEvent {
    pub device: DeviceId,
    pub from: ServerId,
    pub to: ServerId,
    pub round: u64,
    /// Distance to the previous serving server that triggered the handover.
    pub distance_m: f64,
}

// ── MobilityManager ───────────────────────────────────────────────────────────

pub struct MobilityManager {
    params: WaypointParams,
    time_step_s: f64,
    handover_distance_m: f64,
    handover_threshold_db: f64,
    handover_latency_ms: f64,
    rng: Pcg64,
    devices: Vec<Device>,
    /// One controller per server when servers move too.
    server_motion: Option<Vec<RandomWaypoint>>,
    total_handovers: u64,
}

impl MobilityManager {
    /// Create `device_count` devices.  Device `i` starts on the position of
    /// server `i % servers.len()` and is served by it.
    pub fn new(config: &MobilityConfig, servers: &[Server], device_count: usize, seed: u64) -> Self {
        let params = config.waypoint_params();
        let mut rng = Pcg64::seed_from_u64(seed);

        let devices = if servers.is_empty() {
            Vec::new()
        } else {
            (0..device_count)
                .map(|i| {
                    let home = &servers[i % servers.len()];
                    Device {
                        id: DeviceId(i),
                        serving: home.id,
                        motion: RandomWaypoint::new(home.position(), &params, &mut rng),
                    }
                })
                .collect()
        };

        let server_motion = config.apply_to_servers.then(|| {
            servers
                .iter()
                .map(|s| RandomWaypoint::new(s.position(), &params, &mut rng))
                .collect()
        });

        debug!(
            devices = devices.len(),
            moving_servers = config.apply_to_servers,
            seed,
            "mobility manager initialised"
        );

        Self {
            params,
            time_step_s: config.time_step_s(),
            handover_distance_m: config.handover_distance_m,
            handover_threshold_db: config.handover_threshold_db,
            handover_latency_ms: config.handover_latency_ms,
            rng,
            devices,
            server_motion,
            total_handovers: 0,
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id.0)
    }

    pub fn device_position(&self, id: DeviceId) -> Option<Position> {
        self.device(id).map(Device::position)
    }

    /// Teleport a device; used to stage handover situations.
    #[cfg(test)]
    pub(crate) fn place_device(&mut self, id: DeviceId, position: Position) {
        if let Some(d) = self.devices.get_mut(id.0) {
            d.motion.set_position(self.params.area.clamp(position));
        }
    }

    pub fn total_handovers(&self) -> u64 {
        self.total_handovers
    }

    /// Cumulative handover latency charged so far.
    pub fn handover_delay_ms(&self) -> f64 {
        self.total_handovers as f64 * self.handover_latency_ms
    }

    pub fn handover_latency_ms(&self) -> f64 {
        self.handover_latency_ms
    }

    /// Mean device distance from the device centroid.
    pub fn dispersion_m(&self) -> f64 {
        let positions: Vec<Position> = self.devices.iter().map(Device::position).collect();
        dispersion(&positions)
    }

    /// Advance every entity by one time step, then evaluate handover.
    ///
    /// Returns the handovers of this step in device order.
    pub fn step(&mut self, servers: &mut [Server], round: u64) -> Vec<HandoverEvent> {
        for device in &mut self.devices {
            device.motion.step(self.time_step_s, &self.params, &mut self.rng);
        }

        if let Some(walkers) = &mut self.server_motion {
            for (walker, server) in walkers.iter_mut().zip(servers.iter_mut()) {
                let pos = walker.step(self.time_step_s, &self.params, &mut self.rng);
                server.set_position(pos);
            }
        }

        let mut events = Vec::new();
        for device in &mut self.devices {
            if let Some(ev) = evaluate_handover(
                device,
                servers,
                self.handover_distance_m,
                self.handover_threshold_db,
                round,
            ) {
                device.serving = ev.to;
                events.push(ev);
            }
        }

        if !events.is_empty() {
            self.total_handovers += events.len() as u64;
            debug!(round, handovers = events.len(), "handovers this step");
        }
        events
    }
}

/// The handover a device would perform right now, if any.
fn evaluate_handover(
    device: &Device,
    servers: &[Server],
    distance_threshold_m: f64,
    threshold_db: f64,
    round: u64,
) -> Option<HandoverEvent> {
    let pos = device.position();
    let current_d = servers
        .iter()
        .find(|s| s.id == device.serving)
        .map(|s| pos.distance_to(&s.position()));

    if let Some(d) = current_d {
        if d <= distance_threshold_m {
            return None;
        }
    }

    // min_by keeps the first of equal elements, i.e. the lower id.
    let (best, best_d) = servers
        .iter()
        .map(|s| (s, pos.distance_to(&s.position())))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    if best.id == device.serving {
        return None;
    }
    // A serving server that vanished from the list is always replaced.
    if let Some(d) = current_d {
        if signal_strength_db(best_d) - signal_strength_db(d) < threshold_db {
            return None;
        }
    }

    Some(HandoverEvent {
        device: device.id,
        from: device.serving,
        to: best.id,
        round,
        distance_m: current_d.unwrap_or(f64::INFINITY),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics;
    use crate::mobility::geometry::Area;
    use crate::server::{Tier, TierProfile};
    use crate::task::{Resources, Task, TaskId};

    fn server(id: u32, x: f64, y: f64) -> Server {
        Server::new(
            ServerId(id),
            format!("Edge_{}", id + 1),
            Tier::Edge,
            Resources::uniform(100),
            TierProfile::default_for(Tier::Edge),
            Position::new(x, y),
        )
    }

    /// Devices that never leave their pause.
    fn frozen() -> MobilityConfig {
        MobilityConfig {
            pause_range: (1e9, 1e9),
            area: Area::new(0.0, 1_000.0, 0.0, 1_000.0),
            ..MobilityConfig::default()
        }
    }

    #[test]
    fn devices_start_on_their_home_server() {
        let servers = vec![server(0, 0.0, 0.0), server(1, 1_000.0, 0.0)];
        let m = MobilityManager::new(&frozen(), &servers, 3, 1);
        assert_eq!(m.devices().len(), 3);
        assert_eq!(m.devices()[0].serving(), ServerId(0));
        assert_eq!(m.devices()[1].serving(), ServerId(1));
        assert_eq!(m.devices()[2].serving(), ServerId(0));
        assert_eq!(m.device_position(DeviceId(1)), Some(Position::new(1_000.0, 0.0)));
        assert_eq!(m.device_position(DeviceId(9)), None);
    }

    #[test]
    fn paused_devices_do_not_hand_over() {
        let mut servers = vec![server(0, 0.0, 0.0), server(1, 1_000.0, 0.0)];
        let mut m = MobilityManager::new(&frozen(), &servers, 4, 1);
        for round in 0..10 {
            assert!(m.step(&mut servers, round).is_empty());
        }
        assert_eq!(m.total_handovers(), 0);
    }

    // A device drifting toward another server hands over and its next task
    // reflects the new distance.
    #[test]
    fn moving_away_triggers_handover_and_changes_delay() {
        let mut servers = vec![server(0, 0.0, 0.0), server(1, 1_000.0, 0.0)];
        let mut m = MobilityManager::new(&frozen(), &servers, 1, 1);
        let task = Task::new(TaskId(1), DeviceId(0), 0, Resources::uniform(1)).with_data_size(10.0);

        let before_pos = m.device_position(DeviceId(0)).unwrap();
        let before = metrics::task_delay_ms(&task, &servers[0], &before_pos);

        m.place_device(DeviceId(0), Position::new(900.0, 0.0));
        let events = m.step(&mut servers, 5);

        assert_eq!(events.len(), 1);
        let ev = events[0];
        assert_eq!((ev.from, ev.to, ev.round), (ServerId(0), ServerId(1), 5));
        assert!((ev.distance_m - 900.0).abs() < 1e-9);
        assert_eq!(m.devices()[0].serving(), ServerId(1));
        assert_eq!(m.total_handovers(), 1);
        assert!((m.handover_delay_ms() - 20.0).abs() < 1e-12);

        let after_pos = m.device_position(DeviceId(0)).unwrap();
        let on_old = metrics::task_delay_ms(&task, &servers[0], &after_pos);
        assert!(on_old > before, "moving away from the old server costs delay");
        let on_new = metrics::task_delay_ms(&task, &servers[1], &after_pos);
        assert!(on_new < on_old);
    }

    #[test]
    fn small_signal_gain_is_ignored() {
        // 480 m vs 520 m: about 0.7 dB, below the 3 dB threshold.
        let mut servers = vec![server(0, 0.0, 0.0), server(1, 1_000.0, 0.0)];
        let mut m = MobilityManager::new(&frozen(), &servers, 1, 1);
        m.place_device(DeviceId(0), Position::new(520.0, 0.0));
        assert!(m.step(&mut servers, 0).is_empty());
        assert_eq!(m.devices()[0].serving(), ServerId(0));
    }

    #[test]
    fn lone_server_never_hands_over() {
        let mut servers = vec![server(0, 0.0, 0.0)];
        let mut m = MobilityManager::new(&frozen(), &servers, 1, 1);
        m.place_device(DeviceId(0), Position::new(1_000.0, 1_000.0));
        assert!(m.step(&mut servers, 0).is_empty());
        assert_eq!(m.devices()[0].serving(), ServerId(0));
        assert_eq!(m.total_handovers(), 0);
    }

    #[test]
    fn within_distance_threshold_keeps_serving_server() {
        let mut servers = vec![server(0, 0.0, 0.0), server(1, 60.0, 0.0)];
        let mut m = MobilityManager::new(&frozen(), &servers, 1, 1);
        // 59 m from server 0, 1 m from server 1, but inside the 100 m radius
        m.place_device(DeviceId(0), Position::new(59.0, 0.0));
        assert!(m.step(&mut servers, 0).is_empty());
    }

    #[test]
    fn servers_stay_put_unless_configured() {
        let mut servers = vec![server(0, 10.0, 10.0)];
        let cfg = MobilityConfig {
            pause_range: (0.0, 0.0),
            ..MobilityConfig::default()
        };
        let mut m = MobilityManager::new(&cfg, &servers, 2, 3);
        for round in 0..50 {
            m.step(&mut servers, round);
        }
        assert_eq!(servers[0].position(), Position::new(10.0, 10.0));

        let cfg = MobilityConfig {
            apply_to_servers: true,
            ..cfg
        };
        let mut m = MobilityManager::new(&cfg, &servers, 2, 3);
        for round in 0..50 {
            m.step(&mut servers, round);
        }
        assert_ne!(servers[0].position(), Position::new(10.0, 10.0));
        assert!(cfg.area.contains(&servers[0].position()));
    }

    #[test]
    fn same_seed_same_positions() {
        let cfg = MobilityConfig {
            pause_range: (0.0, 0.5),
            speed_range: (20.0, 40.0),
            ..MobilityConfig::default()
        };
        let run = || {
            let mut servers = vec![server(0, 100.0, 100.0), server(1, 900.0, 900.0)];
            let mut m = MobilityManager::new(&cfg, &servers, 5, 11);
            let mut events = Vec::new();
            for round in 0..200 {
                events.extend(m.step(&mut servers, round));
            }
            let positions: Vec<Position> = m.devices().iter().map(Device::position).collect();
            (positions, events)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn dispersion_of_devices_on_two_servers() {
        let servers = vec![server(0, 0.0, 0.0), server(1, 100.0, 0.0)];
        let m = MobilityManager::new(&frozen(), &servers, 2, 1);
        assert!((m.dispersion_m() - 50.0).abs() < 1e-9);
    }
}
