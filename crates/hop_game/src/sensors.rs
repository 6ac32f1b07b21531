//! Probe rectangles hugging each edge of the actor's body.
//!
//! The rig is a pure function of the body rectangle: it owns no state of its
//! own and is recomputed after every position change, so collision queries
//! never see probes left behind by an earlier move. Probe sizing is
//! deliberate:
//!
//!  - Side probes are shorter than the body, so the floor the actor stands on
//!    never reads as a wall, and a tile clipped at a diagonal corner does not
//!    produce a false side hit.
//!  - The ceiling and ground probes are narrower than the body for the same
//!    corner reason.
//!  - The ground probe reaches one unit below the body's bottom edge.
//!    Obstacles are inset by one unit and the overlap test is strict, so a
//!    body resting exactly on a cell boundary only registers contact through
//!    that reach.

use crate::geometry::Rect;

pub const SIDE_PROBE_WIDTH: f32 = 5.0;
pub const SIDE_PROBE_HEIGHT: f32 = 70.0;
pub const CAP_PROBE_WIDTH: f32 = 30.0;
pub const CAP_PROBE_HEIGHT: f32 = 5.0;
pub const GROUND_PROBE_REACH: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRig {
    pub left: Rect,
    pub right: Rect,
    pub ceiling: Rect,
    pub ground: Rect,
}

impl SensorRig {
    pub fn from_body(body: &Rect) -> Self {
        let side_y = body.y + (body.h - SIDE_PROBE_HEIGHT) / 2.0;
        let cap_x = body.x + (body.w - CAP_PROBE_WIDTH) / 2.0;

        Self {
            left: Rect::new(body.x, side_y, SIDE_PROBE_WIDTH, SIDE_PROBE_HEIGHT),
            right: Rect::new(
                body.right() - SIDE_PROBE_WIDTH,
                side_y,
                SIDE_PROBE_WIDTH,
                SIDE_PROBE_HEIGHT,
            ),
            ceiling: Rect::new(cap_x, body.y, CAP_PROBE_WIDTH, CAP_PROBE_HEIGHT),
            ground: Rect::new(
                cap_x,
                body.bottom() + GROUND_PROBE_REACH - CAP_PROBE_HEIGHT,
                CAP_PROBE_WIDTH,
                CAP_PROBE_HEIGHT,
            ),
        }
    }
}
