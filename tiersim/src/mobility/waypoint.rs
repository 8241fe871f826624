/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Random-waypoint motion for a single entity.
//!
//! ```text
//!            pause elapsed: pick target + speed
//!   Paused ─────────────────────────────────────► Moving
//!     ▲                                              │
//!     └──────── arrived: pick new pause ─────────────┘
//! ```
//!
//! The controller owns no RNG; the [`MobilityManager`](super::MobilityManager)
//! passes its seeded generator into every [`RandomWaypoint::step`] call so a
//! whole run draws from one deterministic stream.

use rand::Rng;

use super::geometry::{sample_range, Area, Position};

/// Model parameters shared by every entity of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointParams {
    pub area: Area,
    /// `(min, max)` speed in metres per second.
    pub speed_range: (f64, f64),
    /// `(min, max)` pause on arrival, in seconds.
    pub pause_range: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Paused { remaining_s: f64 },
    Moving { target: Position, speed: f64 },
}

/// Per-entity random-waypoint state.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomWaypoint {
    position: Position,
    phase: Phase,
}

impl RandomWaypoint {
    /// Start at `position` (clamped into the area) with a freshly sampled
    /// pause.
    pub fn new<R: Rng + ?Sized>(position: Position, params: &WaypointParams, rng: &mut R) -> Self {
        let remaining_s = sample_range(rng, params.pause_range.0, params.pause_range.1);
        Self {
            position: params.area.clamp(position),
            phase: Phase::Paused { remaining_s },
        }
    }

    /// Build a controller in an explicit phase.
    pub fn with_phase(position: Position, phase: Phase) -> Self {
        Self { position, phase }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Advance by `dt_s` seconds and return the new position.
    ///
    /// A pause that runs out mid-step hands over to movement on the next
    /// step; a move that arrives mid-step stops on the target.
    pub fn step<R: Rng + ?Sized>(&mut self, dt_s: f64, params: &WaypointParams, rng: &mut R) -> Position {
        match self.phase {
            Phase::Paused { remaining_s } => {
                let left = remaining_s - dt_s;
                if left > 0.0 {
                    self.phase = Phase::Paused { remaining_s: left };
                } else {
                    let target = params.area.sample(rng);
                    let speed = sample_range(rng, params.speed_range.0, params.speed_range.1);
                    self.phase = Phase::Moving { target, speed };
                }
            }
            Phase::Moving { target, speed } => {
                let (next, arrived) = self.position.advance_toward(&target, speed * dt_s);
                self.position = next;
                if arrived {
                    let remaining_s =
                        sample_range(rng, params.pause_range.0, params.pause_range.1);
                    self.phase = Phase::Paused { remaining_s };
                }
            }
        }

        // Targets are sampled inside the area, but the start position or a
        // reconfigured area may not be.
        self.position = params.area.clamp(self.position);
        self.position
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn params() -> WaypointParams {
        WaypointParams {
            area: Area::new(0.0, 100.0, 0.0, 100.0),
            speed_range: (5.0, 10.0),
            pause_range: (0.0, 1.0),
        }
    }

    #[test]
    fn pause_counts_down_before_moving() {
        let mut rng = Pcg64::seed_from_u64(1);
        let mut wp = RandomWaypoint::with_phase(
            Position::new(50.0, 50.0),
            Phase::Paused { remaining_s: 1.0 },
        );
        wp.step(0.4, &params(), &mut rng);
        assert!(matches!(wp.phase(), Phase::Paused { remaining_s } if (remaining_s - 0.6).abs() < 1e-12));
        assert_eq!(wp.position(), Position::new(50.0, 50.0));
        wp.step(0.6, &params(), &mut rng);
        assert!(matches!(wp.phase(), Phase::Moving { .. }));
    }

    #[test]
    fn moving_entity_arrives_and_pauses() {
        let mut rng = Pcg64::seed_from_u64(2);
        let target = Position::new(10.0, 0.0);
        let mut wp = RandomWaypoint::with_phase(
            Position::new(0.0, 0.0),
            Phase::Moving { target, speed: 4.0 },
        );
        wp.step(1.0, &params(), &mut rng);
        assert!((wp.position().x - 4.0).abs() < 1e-12);
        wp.step(1.0, &params(), &mut rng);
        wp.step(1.0, &params(), &mut rng);
        assert_eq!(wp.position(), target);
        assert!(matches!(wp.phase(), Phase::Paused { .. }));
    }

    #[test]
    fn chosen_speed_is_within_range() {
        let mut rng = Pcg64::seed_from_u64(3);
        for _ in 0..200 {
            let mut wp = RandomWaypoint::with_phase(
                Position::new(1.0, 1.0),
                Phase::Paused { remaining_s: 0.0 },
            );
            wp.step(0.1, &params(), &mut rng);
            match wp.phase() {
                Phase::Moving { speed, target } => {
                    assert!((5.0..=10.0).contains(&speed));
                    assert!(params().area.contains(&target));
                }
                other => panic!("expected Moving, got {other:?}"),
            }
        }
    }

    #[test]
    fn long_run_never_leaves_the_area() {
        let mut rng = Pcg64::seed_from_u64(4);
        let p = params();
        let mut wp = RandomWaypoint::new(Position::new(500.0, -30.0), &p, &mut rng);
        assert!(p.area.contains(&wp.position()), "start is clamped");
        for _ in 0..10_000 {
            let pos = wp.step(0.5, &p, &mut rng);
            assert!(p.area.contains(&pos), "{pos:?} escaped the area");
        }
    }

    #[test]
    fn same_seed_same_trajectory() {
        let p = params();
        let run = |seed| {
            let mut rng = Pcg64::seed_from_u64(seed);
            let mut wp = RandomWaypoint::new(Position::new(50.0, 50.0), &p, &mut rng);
            (0..500).map(|_| wp.step(0.25, &p, &mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
    }
}
