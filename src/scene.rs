use crate::math::{heading_vector, Vector2d};
use crate::obstacle::Obstacle;
use crate::simulator::{TickSnapshot, VehicleId, VehicleSnapshot};

/// The vehicles of one tick, viewed as obstacles that can be projected
/// to any future tick offset.
///
/// Built fresh from each [TickSnapshot]; nothing carries over between ticks.
#[derive(Clone, Debug)]
pub struct Scene<'a> {
    snapshot: &'a TickSnapshot,
    /// Per-vehicle displacement per tick, aligned with `snapshot.vehicles`.
    velocities: Vec<Vector2d>,
}

impl<'a> Scene<'a> {
    /// Creates a scene from a tick snapshot.
    pub fn new(snapshot: &'a TickSnapshot) -> Self {
        let velocities = snapshot.vehicles.iter().map(velocity).collect();
        Self {
            snapshot,
            velocities,
        }
    }

    /// The snapshot this scene was built from.
    pub fn snapshot(&self) -> &'a TickSnapshot {
        self.snapshot
    }

    /// The tick the scene describes.
    pub fn tick(&self) -> usize {
        self.snapshot.tick
    }

    /// The obstacles around `subject`, resolved to `offset` ticks after the snapshot.
    /// The subject vehicle never obstructs itself.
    pub fn obstacles_at<'s>(
        &'s self,
        offset: f64,
        subject: &'s VehicleId,
    ) -> impl Iterator<Item = Obstacle> + 's {
        self.snapshot
            .vehicles
            .iter()
            .zip(&self.velocities)
            .filter(move |(vehicle, _)| vehicle.id != *subject)
            .map(move |(vehicle, vel)| Obstacle {
                position: vehicle.position + offset * vel,
                ..vehicle.as_obstacle()
            })
    }
}

/// Vehicles with invalid kinematics are treated as stationary obstacles.
fn velocity(vehicle: &VehicleSnapshot) -> Vector2d {
    match vehicle.kinematics() {
        Ok(kin) => kin.speed * heading_vector(kin.heading),
        Err(_) => Vector2d::new(0.0, 0.0),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point2d;
    use assert_approx_eq::assert_approx_eq;

    fn positions(scene: &Scene, offset: f64, subject: &VehicleId) -> Vec<Point2d> {
        scene
            .obstacles_at(offset, subject)
            .map(|obstacle| obstacle.position)
            .collect()
    }

    fn snapshot() -> TickSnapshot {
        let vehicle = |id: &str, x: f64, speed: f64, heading: f64| VehicleSnapshot {
            id: id.into(),
            position: Point2d::new(x, 0.0),
            speed,
            heading,
            length: 4.0,
            width: 2.0,
        };
        TickSnapshot {
            tick: 3,
            vehicles: vec![
                vehicle("a", 0.0, 10.0, 0.0),
                vehicle("b", 50.0, 5.0, 90.0),
                vehicle("c", 80.0, f64::NAN, 0.0),
            ],
        }
    }

    #[test]
    fn excludes_subject() {
        let snapshot = snapshot();
        let scene = Scene::new(&snapshot);
        assert_eq!(scene.obstacles_at(0.0, &"a".into()).count(), 2);
        assert_eq!(scene.obstacles_at(0.0, &"z".into()).count(), 3);
    }

    #[test]
    fn projects_obstacles() {
        let snapshot = snapshot();
        let scene = Scene::new(&snapshot);
        let at_two = positions(&scene, 2.0, &"a".into());
        assert_approx_eq!(at_two[0].x, 50.0);
        assert_approx_eq!(at_two[0].y, 10.0);
        // Invalid kinematics stay put
        assert_approx_eq!(at_two[1].x, 80.0);
        assert_approx_eq!(at_two[1].y, 0.0);
    }

    #[test]
    fn keeps_extents() {
        let snapshot = snapshot();
        let scene = Scene::new(&snapshot);
        let obstacle = scene.obstacles_at(1.0, &"a".into()).next().unwrap();
        assert_eq!(obstacle.effective_size(), 4.0);
    }
}
