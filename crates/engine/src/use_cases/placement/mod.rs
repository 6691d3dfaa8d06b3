//! Actor placement around an encounter anchor.
//!
//! Primary pass: probe the preferred point and a fixed set of neighbors.
//! Retry pass: for actors that found nothing, probe around a random spot
//! where a sibling from the same stage already landed.

use std::f64::consts::PI;
use std::sync::Arc;

use cometwave_domain::{Rotation, Vec3};

use crate::infrastructure::ports::{BoundingBox, CollisionQuery, RandomPort};

/// Probe order: the point itself, 4 cardinal, 4 diagonal, then one up.
pub const PROBE_OFFSETS: [(f64, f64, f64); 10] = [
    (0.0, 0.0, 0.0),
    (1.0, 0.0, 0.0),
    (-1.0, 0.0, 0.0),
    (0.0, 0.0, 1.0),
    (0.0, 0.0, -1.0),
    (1.0, 0.0, 1.0),
    (-1.0, 0.0, 1.0),
    (1.0, 0.0, -1.0),
    (-1.0, 0.0, -1.0),
    (0.0, 1.0, 0.0),
];

pub const MAX_PROBES: usize = 11;

/// Offset of the second boss from the anchor center.
pub const SECOND_BOSS_OFFSET_X: f64 = 1.5;

pub struct SpatialPlacement {
    collision: Arc<dyn CollisionQuery>,
    random: Arc<dyn RandomPort>,
}

impl SpatialPlacement {
    pub fn new(collision: Arc<dyn CollisionQuery>, random: Arc<dyn RandomPort>) -> Self {
        Self { collision, random }
    }

    /// First probe point an actor fits at, or `None` when every probe is blocked.
    pub async fn place(&self, preferred: Vec3, max_probes: usize) -> Option<Vec3> {
        let probes = max_probes.min(PROBE_OFFSETS.len());
        for (dx, dy, dz) in PROBE_OFFSETS.iter().take(probes) {
            let candidate = preferred.offset(*dx, *dy, *dz);
            if self.collision.can_occupy(candidate, BoundingBox::ACTOR).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Second chance for actors that failed `place`.
    ///
    /// Each one picks a random entry of `successes`, jitters it horizontally
    /// and probes again. New placements are appended to `successes` so later
    /// retries can use them. Actors that still fail are dropped.
    pub async fn retry_near_success<T>(
        &self,
        failed: Vec<T>,
        successes: &mut Vec<Vec3>,
        max_probes: usize,
    ) -> Vec<(T, Vec3)> {
        let mut placed = Vec::new();
        if successes.is_empty() {
            return placed;
        }

        for item in failed {
            let max_index = i32::try_from(successes.len() - 1).unwrap_or(i32::MAX);
            let index = usize::try_from(self.random.gen_range(0, max_index))
                .unwrap_or(0)
                .min(successes.len() - 1);
            let base = successes[index];
            let jittered = base.offset(self.jitter(), 0.0, self.jitter());

            if let Some(position) = self.place(jittered, max_probes).await {
                successes.push(position);
                placed.push((item, position));
            }
        }
        placed
    }

    /// Point `index` of `count` on a ring around `center`, facing inward.
    pub fn ring_position(
        &self,
        center: Vec3,
        index: usize,
        count: usize,
        min_radius: f64,
        max_radius: f64,
    ) -> (Vec3, Rotation) {
        let angle = 2.0 * PI * index as f64 / count.max(1) as f64;
        let radius = min_radius + self.random.gen_unit() * (max_radius - min_radius).max(0.0);
        let position = center.offset(angle.cos() * radius, 0.0, angle.sin() * radius);
        (position, Rotation::yaw(angle + PI))
    }

    /// Bosses stand on the anchor; a second boss steps aside.
    pub fn boss_position(center: Vec3, index: usize) -> (Vec3, Rotation) {
        let dx = if index == 0 {
            0.0
        } else {
            SECOND_BOSS_OFFSET_X * index as f64
        };
        (center.offset(dx, 0.0, 0.0), Rotation::yaw(0.0))
    }

    // +-(0.5 + u), u in [0, 1)
    fn jitter(&self) -> f64 {
        let magnitude = 0.5 + self.random.gen_unit();
        if self.random.gen_range(0, 1) == 0 {
            -magnitude
        } else {
            magnitude
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::infrastructure::clock::FixedRandom;
    use crate::infrastructure::ports::MockCollisionQuery;

    /// Collision stub with a predicate and a record of every probe.
    struct ProbeLog<F: Fn(Vec3) -> bool + Send + Sync> {
        open: F,
        probes: Mutex<Vec<Vec3>>,
    }

    #[async_trait]
    impl<F: Fn(Vec3) -> bool + Send + Sync> CollisionQuery for ProbeLog<F> {
        async fn can_occupy(&self, position: Vec3, _bounds: BoundingBox) -> bool {
            self.probes.lock().unwrap().push(position);
            (self.open)(position)
        }
    }

    fn origin() -> Vec3 {
        Vec3::new(0.5, 65.0, 0.5)
    }

    #[tokio::test]
    async fn when_preferred_is_free_then_it_is_used() {
        let mut collision = MockCollisionQuery::new();
        collision.expect_can_occupy().times(1).returning(|_, _| true);
        let placement = SpatialPlacement::new(Arc::new(collision), Arc::new(FixedRandom::new(0, 0.0)));

        assert_eq!(placement.place(origin(), MAX_PROBES).await, Some(origin()));
    }

    #[tokio::test]
    async fn when_everything_is_blocked_then_ten_probes_then_none() {
        let log = Arc::new(ProbeLog {
            open: |_: Vec3| false,
            probes: Mutex::new(Vec::new()),
        });
        let placement = SpatialPlacement::new(log.clone(), Arc::new(FixedRandom::new(0, 0.0)));

        assert!(placement.place(origin(), MAX_PROBES).await.is_none());
        let probes = log.probes.lock().unwrap();
        assert_eq!(probes.len(), PROBE_OFFSETS.len());
        assert_eq!(probes[9], origin().offset(0.0, 1.0, 0.0));
    }

    #[tokio::test]
    async fn when_only_a_diagonal_is_free_then_probing_stops_there() {
        let target = origin().offset(-1.0, 0.0, 1.0);
        let log = Arc::new(ProbeLog {
            open: move |p: Vec3| p == target,
            probes: Mutex::new(Vec::new()),
        });
        let placement = SpatialPlacement::new(log.clone(), Arc::new(FixedRandom::new(0, 0.0)));

        assert_eq!(placement.place(origin(), MAX_PROBES).await, Some(target));
        assert_eq!(log.probes.lock().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn when_retrying_then_probes_start_near_an_earlier_success() {
        let success = Vec3::new(10.0, 65.0, 10.0);
        let log = Arc::new(ProbeLog {
            open: |p: Vec3| (p.x - 10.0).abs() < 3.0 && (p.z - 10.0).abs() < 3.0,
            probes: Mutex::new(Vec::new()),
        });
        let placement = SpatialPlacement::new(log.clone(), Arc::new(FixedRandom::new(1, 0.25)));
        let mut successes = vec![success];

        let placed = placement
            .retry_near_success(vec!["a", "b"], &mut successes, MAX_PROBES)
            .await;

        assert_eq!(placed.len(), 2);
        // gen_range clamps to 1 for the sign roll, so jitter is +0.75 on both axes
        assert_eq!(placed[0].1, Vec3::new(10.75, 65.0, 10.75));
        assert_eq!(successes.len(), 3);
    }

    #[tokio::test]
    async fn when_no_success_exists_then_retry_places_nothing() {
        let mut collision = MockCollisionQuery::new();
        collision.expect_can_occupy().never();
        let placement = SpatialPlacement::new(Arc::new(collision), Arc::new(FixedRandom::new(0, 0.0)));
        let mut successes = Vec::new();

        let placed = placement
            .retry_near_success(vec![1, 2, 3], &mut successes, MAX_PROBES)
            .await;

        assert!(placed.is_empty());
    }

    #[test]
    fn when_computing_ring_then_radius_stays_in_band_and_actor_faces_center() {
        let placement = SpatialPlacement::new(
            Arc::new(MockCollisionQuery::new()),
            Arc::new(FixedRandom::new(0, 0.5)),
        );
        let center = origin();

        let (position, rotation) = placement.ring_position(center, 1, 4, 3.0, 5.0);

        let dx = position.x - center.x;
        let dz = position.z - center.z;
        let radius = (dx * dx + dz * dz).sqrt();
        assert!((radius - 4.0).abs() < 1e-9);
        assert!(dx.abs() < 1e-9 && dz > 0.0);
        assert!((rotation.yaw - (PI / 2.0 + PI)).abs() < 1e-9);
    }

    #[test]
    fn when_placing_bosses_then_second_is_offset_on_x() {
        let center = origin();
        assert_eq!(SpatialPlacement::boss_position(center, 0).0, center);
        assert_eq!(
            SpatialPlacement::boss_position(center, 1).0,
            center.offset(1.5, 0.0, 0.0)
        );
    }
}
