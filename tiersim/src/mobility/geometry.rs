/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Planar geometry helpers: positions and the bounded movement area.
//!
//! Kept free of any mobility state so metrics and schedulers can use them
//! without pulling in the waypoint model.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A point on the simulation plane, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance.
    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Move up to `step` metres toward `target`.
    ///
    /// Returns the new position and `true` if the target was reached (the
    /// step never overshoots).
    pub fn advance_toward(&self, target: &Position, step: f64) -> (Position, bool) {
        let remaining = self.distance_to(target);
        if remaining <= step || remaining == 0.0 {
            return (*target, true);
        }
        let ratio = step / remaining;
        (
            Position::new(
                self.x + (target.x - self.x) * ratio,
                self.y + (target.y - self.y) * ratio,
            ),
            false,
        )
    }
}

impl From<[f64; 2]> for Position {
    fn from(p: [f64; 2]) -> Self {
        Position::new(p[0], p[1])
    }
}

/// Axis-aligned rectangle that bounds every mobile entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Area {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Non-empty, with finite bounds and a finite width and height.
    pub fn is_valid(&self) -> bool {
        [self.xmin, self.xmax, self.ymin, self.ymax]
            .iter()
            .all(|v| v.is_finite())
            && self.xmin <= self.xmax
            && self.ymin <= self.ymax
            && (self.xmax - self.xmin).is_finite()
            && (self.ymax - self.ymin).is_finite()
    }

    pub fn contains(&self, p: &Position) -> bool {
        (self.xmin..=self.xmax).contains(&p.x) && (self.ymin..=self.ymax).contains(&p.y)
    }

    pub fn clamp(&self, p: Position) -> Position {
        Position::new(p.x.clamp(self.xmin, self.xmax), p.y.clamp(self.ymin, self.ymax))
    }

    /// Uniformly random point inside the area.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        Position::new(
            sample_range(rng, self.xmin, self.xmax),
            sample_range(rng, self.ymin, self.ymax),
        )
    }
}

impl Default for Area {
    fn default() -> Self {
        Area::new(0.0, 1_000.0, 0.0, 1_000.0)
    }
}

/// Uniform sample in `[lo, hi]`; a degenerate range returns `lo`.
pub fn sample_range<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Mean distance of `positions` from their centroid.  `0.0` when empty.
pub fn dispersion(positions: &[Position]) -> f64 {
    if positions.is_empty() {
        return 0.0;
    }
    let n = positions.len() as f64;
    let cx = positions.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = positions.iter().map(|p| p.y).sum::<f64>() / n;
    let centroid = Position::new(cx, cy);
    positions.iter().map(|p| p.distance_to(&centroid)).sum::<f64>() / n
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn advance_toward_stops_exactly_on_target() {
        let a = Position::new(0.0, 0.0);
        let target = Position::new(10.0, 0.0);
        let (p, arrived) = a.advance_toward(&target, 4.0);
        assert!(!arrived);
        assert!((p.x - 4.0).abs() < 1e-12);
        let (p, arrived) = p.advance_toward(&target, 100.0);
        assert!(arrived);
        assert_eq!(p, target);
    }

    #[test]
    fn clamp_pulls_points_back_inside() {
        let area = Area::new(0.0, 10.0, 0.0, 10.0);
        assert_eq!(area.clamp(Position::new(-5.0, 20.0)), Position::new(0.0, 10.0));
        assert!(area.contains(&area.clamp(Position::new(1e9, -1e9))));
    }

    #[test]
    fn samples_stay_inside_area() {
        let area = Area::new(-50.0, 50.0, 100.0, 200.0);
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..1_000 {
            assert!(area.contains(&area.sample(&mut rng)));
        }
    }

    #[test]
    fn degenerate_area_is_valid_and_samples_its_point() {
        let area = Area::new(5.0, 5.0, 5.0, 5.0);
        let mut rng = Pcg64::seed_from_u64(1);
        assert!(area.is_valid());
        assert_eq!(area.sample(&mut rng), Position::new(5.0, 5.0));
        assert!(!Area::new(1.0, 0.0, 0.0, 1.0).is_valid());
    }

    #[test]
    fn area_wider_than_f64_is_invalid() {
        assert!(!Area::new(-1e308, 1e308, 0.0, 1.0).is_valid());
        assert!(!Area::new(0.0, 1.0, -1e308, 1e308).is_valid());
        assert!(Area::new(-1e300, 1e300, 0.0, 1.0).is_valid());
    }

    #[test]
    fn dispersion_of_symmetric_points() {
        let pts = [Position::new(-1.0, 0.0), Position::new(1.0, 0.0)];
        assert!((dispersion(&pts) - 1.0).abs() < 1e-12);
        assert_eq!(dispersion(&[]), 0.0);
    }
}
