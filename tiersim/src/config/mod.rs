/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulation configuration loading and validation.
//!
//! A run is fully described by one immutable [`SimConfig`] value handed to
//! the simulator's constructor, so several independent runs can coexist in
//! one process.  Every section and field is optional; anything left out
//! falls back to the reference three-tier setup ([`SimConfig::default`]).
//!
//! The expected YAML structure is:
//! ```yaml
//! topology:
//!   edge:
//!     count: 3
//!     cpu: 280000
//!     memory: 300000
//!     storage: 800000
//!     bandwidth: 164000
//!     latency_ms: 5
//!     cost: 0.00005
//!     tx_cost: 0.00002
//!     distance_m: 2000
//!     positions: [[100, 200], [400, 800], [900, 100]]
//!   cloud:
//!     count: 1
//! mobility:
//!   enabled: true
//!   apply_to_servers: false
//!   time_step_ms: 100
//!   handover_latency_ms: 20
//!   handover_threshold_db: 3
//!   handover_distance_m: 100
//!   area: { xmin: 0, xmax: 1000, ymin: 0, ymax: 1000 }
//!   speed_range: [1.0, 5.0]
//!   pause_range: [0.0, 2.0]
//! workload:
//!   start_devices: 100
//!   max_devices: 6000
//!   increment: 10
//!   data_per_device_kb: 10
//!   deadline_rounds: 3
//! simulation:
//!   rounds: 50
//!   seed: 42
//!   residency_rounds: 1
//! ```
//!
//! When a `topology` section is present only the tiers it lists are built.
//!
//! Defaults follow the reference setup with one exception: servers stay
//! fixed (`apply_to_servers: false`) so the topology in the file is the
//! topology the run measures.  Set it to `true` to let every server roam
//! with the same random-waypoint parameters as the devices.

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::mobility::geometry::{Area, Position};
use crate::mobility::waypoint::WaypointParams;
use crate::server::{Server, ServerId, Tier, TierProfile};
use crate::task::Resources;

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    topology: Option<TopologyFile>,
    #[serde(default)]
    mobility: MobilityFile,
    #[serde(default)]
    workload: WorkloadFile,
    #[serde(default)]
    simulation: SimulationFile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TopologyFile {
    edge: Option<TierEntry>,
    regional: Option<TierEntry>,
    cloud: Option<TierEntry>,
}

/// Per-tier fields as they appear in the YAML file.  Missing values fall
/// back to the tier's defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TierEntry {
    count: Option<usize>,
    cpu: Option<u64>,
    memory: Option<u64>,
    storage: Option<u64>,
    bandwidth: Option<u64>,
    latency_ms: Option<f64>,
    cost: Option<f64>,
    tx_cost: Option<f64>,
    distance_m: Option<f64>,
    energy_per_kb: Option<f64>,
    positions: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MobilityFile {
    enabled: Option<bool>,
    apply_to_servers: Option<bool>,
    time_step_ms: Option<f64>,
    handover_latency_ms: Option<f64>,
    handover_threshold_db: Option<f64>,
    handover_distance_m: Option<f64>,
    area: Option<Area>,
    speed_range: Option<(f64, f64)>,
    pause_range: Option<(f64, f64)>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkloadFile {
    start_devices: Option<usize>,
    max_devices: Option<usize>,
    increment: Option<usize>,
    data_per_device_kb: Option<u64>,
    deadline_rounds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimulationFile {
    rounds: Option<u64>,
    seed: Option<u64>,
    residency_rounds: Option<u64>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Servers of one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierSpec {
    pub tier: Tier,
    pub count: usize,
    pub capacity: Resources,
    pub profile: TierProfile,
    /// One position per server, in order.
    pub positions: Vec<Position>,
}

impl TierSpec {
    /// Reference capacities and positions for `tier`.
    pub fn default_for(tier: Tier) -> Self {
        let (count, capacity, positions): (usize, Resources, Vec<[f64; 2]>) = match tier {
            Tier::Edge => (
                3,
                Resources::new(280_000, 300_000, 800_000, 164_000),
                vec![[100.0, 200.0], [400.0, 800.0], [900.0, 100.0]],
            ),
            Tier::Regional => (
                2,
                Resources::new(6_400_000, 10_240_000, 40_000_000, 800_000),
                vec![[250.0, 250.0], [750.0, 750.0]],
            ),
            Tier::Cloud => (
                1,
                Resources::new(100_800_000, 80_640_000, 1_512_000_000, 1_050_000),
                vec![[500.0, 500.0]],
            ),
        };
        Self {
            tier,
            count,
            capacity,
            profile: TierProfile::default_for(tier),
            positions: positions.into_iter().map(Position::from).collect(),
        }
    }

    /// `count` servers of `tier` with `capacity`, all at the origin and with
    /// the tier's default profile.
    pub fn uniform(tier: Tier, count: usize, capacity: Resources) -> Self {
        Self {
            tier,
            count,
            capacity,
            profile: TierProfile::default_for(tier),
            positions: vec![Position::default(); count],
        }
    }

    pub fn at(mut self, positions: Vec<Position>) -> Self {
        self.positions = positions;
        self
    }

    fn from_entry(tier: Tier, entry: TierEntry) -> Self {
        let base = Self::default_for(tier);
        let bandwidth = entry.bandwidth.unwrap_or(base.capacity.bandwidth);
        Self {
            tier,
            count: entry.count.unwrap_or(base.count),
            capacity: Resources::new(
                entry.cpu.unwrap_or(base.capacity.cpu),
                entry.memory.unwrap_or(base.capacity.memory),
                entry.storage.unwrap_or(base.capacity.storage),
                bandwidth,
            ),
            profile: TierProfile {
                latency_ms: entry.latency_ms.unwrap_or(base.profile.latency_ms),
                cost_per_unit: entry.cost.unwrap_or(base.profile.cost_per_unit),
                tx_cost_per_kb: entry.tx_cost.unwrap_or(base.profile.tx_cost_per_kb),
                backhaul_m: entry.distance_m.unwrap_or(base.profile.backhaul_m),
                bandwidth_kbps: bandwidth as f64,
                energy_per_kb: entry.energy_per_kb.unwrap_or(base.profile.energy_per_kb),
            },
            positions: entry
                .positions
                .map(|ps| ps.into_iter().map(Position::from).collect())
                .unwrap_or(base.positions),
        }
    }
}

/// Ordered list of tiers; server ids are assigned in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyConfig {
    pub tiers: Vec<TierSpec>,
}

impl TopologyConfig {
    pub fn server_count(&self) -> usize {
        self.tiers.iter().map(|t| t.count).sum()
    }

    /// Instantiate servers named `<Tier>_<n>` (1-based within the tier).
    ///
    /// Assumes [`SimConfig::validate`] passed (enough positions per tier).
    pub fn build_servers(&self) -> Vec<Server> {
        let mut servers = Vec::with_capacity(self.server_count());
        for spec in &self.tiers {
            for i in 0..spec.count {
                let id = ServerId(servers.len() as u32);
                let position = spec.positions.get(i).copied().unwrap_or_default();
                servers.push(Server::new(
                    id,
                    format!("{}_{}", spec.tier.label(), i + 1),
                    spec.tier,
                    spec.capacity,
                    spec.profile,
                    position,
                ));
            }
        }
        servers
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            tiers: Tier::ALL.into_iter().map(TierSpec::default_for).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MobilityConfig {
    pub enabled: bool,
    pub apply_to_servers: bool,
    pub time_step_ms: f64,
    /// Extra delay charged to a task whose device handed over this round.
    pub handover_latency_ms: f64,
    /// Minimum signal improvement (dB) required to switch serving server.
    pub handover_threshold_db: f64,
    /// Distance from the serving server beyond which handover is evaluated.
    pub handover_distance_m: f64,
    pub area: Area,
    pub speed_range: (f64, f64),
    pub pause_range: (f64, f64),
}

impl MobilityConfig {
    pub fn waypoint_params(&self) -> WaypointParams {
        WaypointParams {
            area: self.area,
            speed_range: self.speed_range,
            pause_range: self.pause_range,
        }
    }

    pub fn time_step_s(&self) -> f64 {
        self.time_step_ms / 1_000.0
    }
}

impl Default for MobilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            apply_to_servers: false,
            time_step_ms: 100.0,
            handover_latency_ms: 20.0,
            handover_threshold_db: 3.0,
            handover_distance_m: 100.0,
            area: Area::default(),
            speed_range: (1.0, 5.0),
            pause_range: (0.0, 2.0),
        }
    }
}

/// Device ramp: `start_devices + round × increment`, capped at `max_devices`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    pub start_devices: usize,
    pub max_devices: usize,
    pub increment: usize,
    pub data_per_device_kb: u64,
    /// Rounds a task may wait before it expires.  `None` = never.
    pub deadline_rounds: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            start_devices: 100,
            max_devices: 6_000,
            increment: 10,
            data_per_device_kb: 10,
            deadline_rounds: None,
        }
    }
}

/// How long a completed task keeps its server resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResidencyPolicy {
    /// Released at the start of the round after allocation.
    #[default]
    SingleRound,
    /// Released `n` rounds after allocation.
    Rounds(u64),
}

impl ResidencyPolicy {
    /// `1` is single-round occupancy.
    pub fn from_rounds(n: u64) -> Self {
        if n == 1 {
            ResidencyPolicy::SingleRound
        } else {
            ResidencyPolicy::Rounds(n)
        }
    }

    pub fn release_round(&self, allocated_round: u64) -> u64 {
        match *self {
            ResidencyPolicy::SingleRound => allocated_round + 1,
            ResidencyPolicy::Rounds(n) => allocated_round.saturating_add(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// `None` derives the budget from the workload ramp.
    pub rounds: Option<u64>,
    pub seed: u64,
    pub residency: ResidencyPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rounds: None,
            seed: 42,
            residency: ResidencyPolicy::SingleRound,
        }
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Complete, immutable description of one simulation run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimConfig {
    pub topology: TopologyConfig,
    pub mobility: MobilityConfig,
    pub workload: WorkloadConfig,
    pub simulation: SimulationConfig,
}

impl SimConfig {
    /// Parse and validate the YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or [`validate`](Self::validate) rejects the result.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading simulation configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };
        let config = Self::from_file(file);
        config.validate()?;

        info!(
            servers = config.topology.server_count(),
            rounds = config.rounds(),
            seed = config.simulation.seed,
            mobility = config.mobility.enabled,
            "Configuration loaded"
        );
        for spec in &config.topology.tiers {
            debug!(
                "  Tier: {} | count: {} | CPU: {} | latency: {}ms | cost: {}",
                spec.tier, spec.count, spec.capacity.cpu, spec.profile.latency_ms, spec.profile.cost_per_unit,
            );
        }
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Self {
        let topology = match file.topology {
            None => TopologyConfig::default(),
            Some(t) => {
                let tiers = [
                    (Tier::Edge, t.edge),
                    (Tier::Regional, t.regional),
                    (Tier::Cloud, t.cloud),
                ]
                .into_iter()
                .filter_map(|(tier, entry)| entry.map(|e| TierSpec::from_entry(tier, e)))
                .collect();
                TopologyConfig { tiers }
            }
        };

        let m = MobilityConfig::default();
        let mobility = MobilityConfig {
            enabled: file.mobility.enabled.unwrap_or(m.enabled),
            apply_to_servers: file.mobility.apply_to_servers.unwrap_or(m.apply_to_servers),
            time_step_ms: file.mobility.time_step_ms.unwrap_or(m.time_step_ms),
            handover_latency_ms: file.mobility.handover_latency_ms.unwrap_or(m.handover_latency_ms),
            handover_threshold_db: file
                .mobility
                .handover_threshold_db
                .unwrap_or(m.handover_threshold_db),
            handover_distance_m: file.mobility.handover_distance_m.unwrap_or(m.handover_distance_m),
            area: file.mobility.area.unwrap_or(m.area),
            speed_range: file.mobility.speed_range.unwrap_or(m.speed_range),
            pause_range: file.mobility.pause_range.unwrap_or(m.pause_range),
        };

        let w = WorkloadConfig::default();
        let workload = WorkloadConfig {
            start_devices: file.workload.start_devices.unwrap_or(w.start_devices),
            max_devices: file.workload.max_devices.unwrap_or(w.max_devices),
            increment: file.workload.increment.unwrap_or(w.increment),
            data_per_device_kb: file.workload.data_per_device_kb.unwrap_or(w.data_per_device_kb),
            deadline_rounds: file.workload.deadline_rounds.or(w.deadline_rounds),
        };

        let s = SimulationConfig::default();
        let simulation = SimulationConfig {
            rounds: file.simulation.rounds.or(s.rounds),
            seed: file.simulation.seed.unwrap_or(s.seed),
            residency: file
                .simulation
                .residency_rounds
                .map(ResidencyPolicy::from_rounds)
                .unwrap_or(s.residency),
        };

        SimConfig {
            topology,
            mobility,
            workload,
            simulation,
        }
    }

    /// Round budget: the explicit value, or enough rounds for the device ramp
    /// to reach `max_devices`.
    pub fn rounds(&self) -> u64 {
        self.simulation.rounds.unwrap_or_else(|| {
            let w = &self.workload;
            let span = w.max_devices.saturating_sub(w.start_devices);
            match w.increment {
                0 => 1,
                inc => (span / inc) as u64 + 1,
            }
        })
    }

    /// Reject configurations the simulator cannot run.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.topology.server_count() > 0,
            "topology defines no servers"
        );
        for spec in &self.topology.tiers {
            if spec.positions.len() < spec.count {
                bail!(
                    "tier {} has {} server(s) but only {} position(s)",
                    spec.tier,
                    spec.count,
                    spec.positions.len()
                );
            }
        }

        let m = &self.mobility;
        ensure!(m.area.is_valid(), "mobility area is empty or not finite");
        ensure!(
            m.time_step_ms.is_finite() && m.time_step_ms > 0.0,
            "time_step_ms must be positive, got {}",
            m.time_step_ms
        );
        ensure!(
            is_finite_range(m.speed_range),
            "speed_range must be finite with 0 <= min <= max, got {:?}",
            m.speed_range
        );
        ensure!(
            is_finite_range(m.pause_range),
            "pause_range must be finite with 0 <= min <= max, got {:?}",
            m.pause_range
        );
        ensure!(
            m.handover_distance_m >= 0.0,
            "handover_distance_m must not be negative"
        );

        let w = &self.workload;
        ensure!(
            w.start_devices <= w.max_devices,
            "start_devices ({}) exceeds max_devices ({})",
            w.start_devices,
            w.max_devices
        );

        if let ResidencyPolicy::Rounds(0) = self.simulation.residency {
            bail!("residency_rounds must be at least 1");
        }
        Ok(())
    }
}

fn is_finite_range((min, max): (f64, f64)) -> bool {
    min.is_finite() && max.is_finite() && 0.0 <= min && min <= max
}

// ── Tests ─────────────────────────────────────────────────────────────────────
