/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-round reports and the sinks that receive them.
//!
//! The simulator builds one [`RoundReport`] at the end of every round and
//! hands it to a [`Reporter`].  Reports are plain data (`Serialize`), so a
//! sink can keep them ([`MetricsLog`]), stream them as JSON lines
//! ([`JsonLinesReporter`]) or drop them ([`Discard`]).

use std::io::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::{TaskMetrics, Utilization};
use crate::mobility::geometry::Position;
use crate::mobility::HandoverEvent;
use crate::server::{Server, ServerId, Tier};
use crate::task::{DeviceId, Resources, TaskId};

// ── Report data ───────────────────────────────────────────────────────────────

/// One task placed and completed this round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task: TaskId,
    pub device: DeviceId,
    pub server: ServerId,
    pub tier: Tier,
    pub priority: u8,
    pub created_round: u64,
    pub completed_round: u64,
    /// Includes the handover penalty when the device handed over this round.
    pub metrics: TaskMetrics,
    pub handover_penalty_ms: f64,
    /// Device-to-server signal strength at placement time.
    pub signal_db: f64,
}

impl TaskRecord {
    pub fn wait_rounds(&self) -> u64 {
        self.completed_round.saturating_sub(self.created_round)
    }
}

/// A server's state after this round's allocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub id: ServerId,
    pub name: String,
    pub tier: Tier,
    pub capacity: Resources,
    pub allocated: Resources,
    pub utilization: Utilization,
    pub active_leases: usize,
    pub position: Position,
    pub congestion_pct: f64,
}

impl From<&Server> for ServerSnapshot {
    fn from(s: &Server) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            tier: s.tier,
            capacity: s.capacity(),
            allocated: s.allocated(),
            utilization: s.utilization(),
            active_leases: s.active_leases(),
            position: s.position(),
            congestion_pct: s.congestion_pct(),
        }
    }
}

/// Cumulative mobility figures at the end of the round.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MobilitySnapshot {
    pub total_handovers: u64,
    pub handover_delay_ms: f64,
    pub dispersion_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u64,
    /// Tasks that entered the pending set this round.
    pub arrived: usize,
    pub completed: Vec<TaskRecord>,
    pub expired: Vec<TaskId>,
    /// Proposals the simulator refused.
    pub skipped: usize,
    /// Tasks still pending after this round.
    pub pending: usize,
    pub handovers: Vec<HandoverEvent>,
    pub servers: Vec<ServerSnapshot>,
    pub mobility: MobilitySnapshot,
}

impl RoundReport {
    pub fn total_cost(&self) -> f64 {
        self.completed.iter().map(|r| r.metrics.cost).sum()
    }

    pub fn total_energy(&self) -> f64 {
        self.completed.iter().map(|r| r.metrics.energy).sum()
    }

    /// Mean delay of this round's completions; `0.0` when none completed.
    pub fn avg_delay_ms(&self) -> f64 {
        if self.completed.is_empty() {
            return 0.0;
        }
        self.completed.iter().map(|r| r.metrics.delay_ms).sum::<f64>() / self.completed.len() as f64
    }

    pub fn completed_on(&self, tier: Tier) -> usize {
        self.completed.iter().filter(|r| r.tier == tier).count()
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialise report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait Reporter {
    fn report(&mut self, report: &RoundReport) -> Result<(), ReportError>;
}

/// Keeps every report in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsLog {
    reports: Vec<RoundReport>,
}

impl MetricsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[RoundReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<RoundReport> {
        self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl Reporter for MetricsLog {
    fn report(&mut self, report: &RoundReport) -> Result<(), ReportError> {
        self.reports.push(report.clone());
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesReporter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Reporter for JsonLinesReporter<W> {
    fn report(&mut self, report: &RoundReport) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Drops every report; for runs where only the summary matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Reporter for Discard {
    fn report(&mut self, _report: &RoundReport) -> Result<(), ReportError> {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
