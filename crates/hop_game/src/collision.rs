//! Stateless collision queries over an obstacle set and a sensor rig, plus
//! the horizontal snap-out rule.
//!
//! Every function takes the obstacle set explicitly; there is no registry to
//! consult behind the caller's back, which is what makes the resolver
//! testable with nothing but a hand-built level.

use crate::geometry::Rect;
use crate::level::ObstacleSet;
use crate::sensors::SensorRig;

pub fn touching_ground(obstacles: &ObstacleSet, rig: &SensorRig) -> bool {
    obstacles.any_intersects(&rig.ground)
}

pub fn touching_ceiling(obstacles: &ObstacleSet, rig: &SensorRig) -> bool {
    obstacles.any_intersects(&rig.ceiling)
}

/// Contact on EITHER side vetoes all horizontal movement this step. This is
/// an all-or-nothing gate, not a per-direction clamp: touching a wall on the
/// right also blocks leftward motion. That is the shipped contract, asymmetric
/// as it looks.
pub fn blocked_horizontally(obstacles: &ObstacleSet, rig: &SensorRig) -> bool {
    obstacles.any_intersects(&rig.left) || obstacles.any_intersects(&rig.right)
}

/// Push the body out of any wall a side probe is overlapping: right-probe
/// contact snaps the body's right edge to the obstacle's left edge, left-probe
/// contact snaps the body's left edge to the obstacle's right edge. Runs every
/// step regardless of speed, so the body cannot stay tunneled into geometry it
/// already overlaps. Returns whether a snap moved the body.
pub fn correct_horizontal_penetration(
    obstacles: &ObstacleSet,
    rig: &SensorRig,
    body: &mut Rect,
) -> bool {
    let mut corrected = false;
    if let Some(obstacle) = obstacles.first_intersecting(&rig.right) {
        body.set_right(obstacle.left());
        corrected = true;
    }
    if let Some(obstacle) = obstacles.first_intersecting(&rig.left) {
        body.set_left(obstacle.right());
        corrected = true;
    }
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelFile;

    fn build_level(rows: &[&str]) -> ObstacleSet {
        let file = LevelFile {
            version: "0.1".to_string(),
            level_id: "test".to_string(),
            cell_size: 40,
            rows: rows.iter().map(|r| r.to_string()).collect(),
        };
        ObstacleSet::build(&file).expect("test level should build").0
    }

    // Flat floor at row 4 (y 160), walls at columns 0 and 5.
    fn walled_room() -> ObstacleSet {
        build_level(&[
            "X----X",
            "X-P--X",
            "X----X",
            "X----X",
            "XXXXXX",
        ])
    }

    #[test]
    fn resting_on_floor_touches_ground() {
        let obstacles = walled_room();
        // Body bottom exactly on the floor boundary at y 160.
        let body = Rect::new(80.0, 80.0, 40.0, 80.0);
        let rig = SensorRig::from_body(&body);
        assert!(touching_ground(&obstacles, &rig));
        assert!(!touching_ceiling(&obstacles, &rig));
        assert!(!blocked_horizontally(&obstacles, &rig));
    }

    #[test]
    fn airborne_body_touches_nothing() {
        let obstacles = walled_room();
        let body = Rect::new(80.0, 60.0, 40.0, 80.0);
        let rig = SensorRig::from_body(&body);
        assert!(!touching_ground(&obstacles, &rig));
        assert!(!touching_ceiling(&obstacles, &rig));
    }

    #[test]
    fn either_side_contact_blocks_horizontally() {
        let obstacles = walled_room();
        // Overlapping the left wall (column 0 spans x 0..39).
        let against_left = SensorRig::from_body(&Rect::new(38.0, 80.0, 40.0, 80.0));
        assert!(blocked_horizontally(&obstacles, &against_left));
        // Overlapping the right wall (column 5 starts at x 200).
        let against_right = SensorRig::from_body(&Rect::new(162.0, 80.0, 40.0, 80.0));
        assert!(blocked_horizontally(&obstacles, &against_right));
    }

    #[test]
    fn right_snap_leaves_no_residual_penetration() {
        let obstacles = walled_room();
        // Body overlapping the right wall by 2 units.
        let mut body = Rect::new(162.0, 80.0, 40.0, 80.0);
        let rig = SensorRig::from_body(&body);
        assert!(correct_horizontal_penetration(&obstacles, &rig, &mut body));
        assert!((body.right() - 200.0).abs() < f32::EPSILON);
        let wall = Rect::new(200.0, 80.0, 39.0, 39.0);
        assert!(!body.intersects(&wall));
    }

    #[test]
    fn left_snap_leaves_no_residual_penetration() {
        let obstacles = walled_room();
        let mut body = Rect::new(36.0, 80.0, 40.0, 80.0);
        let rig = SensorRig::from_body(&body);
        assert!(correct_horizontal_penetration(&obstacles, &rig, &mut body));
        assert!((body.left() - 39.0).abs() < f32::EPSILON);
    }

    #[test]
    fn correction_is_a_no_op_when_clear() {
        let obstacles = walled_room();
        let mut body = Rect::new(80.0, 80.0, 40.0, 80.0);
        let before = body;
        let rig = SensorRig::from_body(&body);
        assert!(!correct_horizontal_penetration(&obstacles, &rig, &mut body));
        assert_eq!(body, before);
    }

    #[test]
    fn floor_under_feet_is_not_a_wall() {
        let obstacles = walled_room();
        // Standing on the floor: the ground probe overlaps it, the shortened
        // side probes must not.
        let body = Rect::new(80.0, 80.0, 40.0, 80.0);
        let rig = SensorRig::from_body(&body);
        assert!(touching_ground(&obstacles, &rig));
        assert!(!blocked_horizontally(&obstacles, &rig));
    }
}
