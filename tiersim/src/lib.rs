/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! tiersim – discrete-round Edge / Regional / Cloud task placement simulator
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/         – YAML run configuration (topology, mobility, workload)
//! ├── task.rs         – tasks, resource vectors, lifecycle
//! ├── server/         – tiered servers and admission control
//! ├── mobility/       – random waypoint motion and handover
//! ├── metrics.rs      – cost / delay / energy / utilisation formulas
//! ├── scheduler/      – strategy trait, registry, built-in strategies
//! ├── workload.rs     – task sources
//! ├── report.rs       – per-round reports and sinks
//! └── simulator/      – the round loop
//! ```

pub mod config;
pub mod metrics;
pub mod mobility;
pub mod report;
pub mod scheduler;
pub mod server;
pub mod simulator;
pub mod task;
pub mod workload;
