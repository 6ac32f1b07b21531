//! The actor's per-step motion state machine.
//!
//! One `step()` call per fixed timestep: apply queued input deltas, move
//! horizontally unless a wall vetoes it, clamp to the viewport, respawn if
//! fallen out of the world, snap out of any overlapped wall, then run gravity
//! and the jump phase machine. Horizontal speed and the gravity/jump amounts
//! are in units per step; only the hover gate is expressed in elapsed real
//! time, so it stays correct when the driver changes its step rate.
//!
//! The actor owns its body and sensor rectangles exclusively. Sensors are
//! resynced after every position mutation inside the step, so no collision
//! query in the same step ever sees stale probes.

use glam::Vec2;

use crate::collision;
use crate::geometry::Rect;
use crate::level::ObstacleSet;
use crate::sensors::SensorRig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPhase {
    /// Resting state; the only state a jump can start from.
    Grounded,
    /// Moving up, one fixed increment per step, for a bounded number of steps.
    Ascending,
    /// Post-ascent pause: gravity stays gated until the hover delay elapses.
    Hovering,
}

impl JumpPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Grounded => "Grounded",
            Self::Ascending => "Ascending",
            Self::Hovering => "Hovering",
        }
    }
}

impl std::fmt::Display for JumpPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKey {
    Left,
    Right,
    Jump,
}

/// Discrete input deltas. The actor never polls key state; the driver hands
/// it transitions and the speed accumulator does the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(ActionKey),
    KeyUp(ActionKey),
}

#[derive(Debug, Clone, Copy)]
pub struct ActorConfig {
    /// Speed delta per direction press/release, units per step.
    pub mod_speed: f32,
    /// Fall amount per step once gravity applies.
    pub gravity: f32,
    /// Ascent amount per step while jumping.
    pub jump_speed: f32,
    /// Ascent budget; at 60 steps/s, 30 steps is half a second of rise.
    pub max_jump_frames: u32,
    /// Seconds of hang time after the ascent ends before gravity resumes.
    pub hover_duration: f32,
    /// Horizontal world bounds the body is clamped into.
    pub world_width: f32,
    /// Falling past this y teleports the actor back to its spawn point.
    pub fall_out_y: f32,
    pub body_width: f32,
    pub body_height: f32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mod_speed: 4.0,
            gravity: 4.0,
            jump_speed: 4.0,
            max_jump_frames: 30,
            hover_duration: 0.1,
            world_width: 800.0,
            fall_out_y: 800.0,
            body_width: 40.0,
            body_height: 80.0,
        }
    }
}

/// Sensor readings from the end of the last step, for the driver and the
/// debug overlay to read without re-querying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactState {
    pub on_ground: bool,
    pub on_ceiling: bool,
    pub blocked_side: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Actor {
    body: Rect,
    sensors: SensorRig,
    speed: f32,
    phase: JumpPhase,
    jump_frames: u32,
    /// Seconds since the last phase transition; gates gravity during hover.
    phase_timer: f32,
    spawn: Vec2,
    contacts: ContactState,
    pub config: ActorConfig,
}

impl Actor {
    pub fn spawn_at(spawn: Vec2) -> Self {
        Self::with_config(spawn, ActorConfig::default())
    }

    pub fn with_config(spawn: Vec2, config: ActorConfig) -> Self {
        let body = Rect::new(spawn.x, spawn.y, config.body_width, config.body_height);
        Self {
            body,
            sensors: SensorRig::from_body(&body),
            speed: 0.0,
            phase: JumpPhase::Grounded,
            jump_frames: 0,
            phase_timer: 0.0,
            spawn,
            contacts: ContactState::default(),
            config,
        }
    }

    pub fn body(&self) -> &Rect {
        &self.body
    }

    pub fn sensors(&self) -> &SensorRig {
        &self.sensors
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn phase(&self) -> JumpPhase {
        self.phase
    }

    pub fn contacts(&self) -> ContactState {
        self.contacts
    }

    #[allow(dead_code)]
    pub fn spawn_point(&self) -> Vec2 {
        self.spawn
    }

    /// Repoint future respawns, e.g. after a level reload. The body stays
    /// where it is.
    pub fn set_spawn_point(&mut self, spawn: Vec2) {
        self.spawn = spawn;
    }

    /// Teleport back to the spawn point and rest. The speed accumulator is
    /// deliberately untouched: direction keys are still held and releasing
    /// them must balance the ledger.
    pub fn respawn(&mut self) {
        self.body.x = self.spawn.x;
        self.body.y = self.spawn.y;
        self.jump_frames = 0;
        self.set_phase(JumpPhase::Grounded);
        self.sync_sensors();
    }

    fn set_phase(&mut self, phase: JumpPhase) {
        self.phase = phase;
        self.phase_timer = 0.0;
    }

    fn sync_sensors(&mut self) {
        self.sensors = SensorRig::from_body(&self.body);
    }

    /// Advance one fixed step. `events` carries this step's discrete input
    /// transitions (usually empty; held keys live in the accumulator).
    pub fn step(&mut self, dt: f32, events: &[InputEvent], obstacles: &ObstacleSet) {
        self.phase_timer += dt;

        // Input deltas. Press and release are symmetric, so opposite
        // directions cancel and releasing always restores balance.
        let mut jump_requested = false;
        for event in events {
            match event {
                InputEvent::KeyDown(ActionKey::Right) => self.speed += self.config.mod_speed,
                InputEvent::KeyUp(ActionKey::Right) => self.speed -= self.config.mod_speed,
                InputEvent::KeyDown(ActionKey::Left) => self.speed -= self.config.mod_speed,
                InputEvent::KeyUp(ActionKey::Left) => self.speed += self.config.mod_speed,
                InputEvent::KeyDown(ActionKey::Jump) => jump_requested = true,
                InputEvent::KeyUp(ActionKey::Jump) => {}
            }
        }

        // Horizontal movement, vetoed entirely while either side probe
        // touches a wall.
        self.sync_sensors();
        if !collision::blocked_horizontally(obstacles, &self.sensors) {
            self.body.x += self.speed;
        }

        // Keep the body inside the viewport's horizontal bounds.
        if self.body.left() < 0.0 {
            self.body.set_left(0.0);
        }
        if self.body.right() > self.config.world_width {
            self.body.set_right(self.config.world_width);
        }

        // Fell out of the world.
        if self.body.y > self.config.fall_out_y {
            self.respawn();
        }

        // Fresh probes for the rest of the step, then push out of any wall
        // the body already overlaps.
        self.sync_sensors();
        if collision::correct_horizontal_penetration(obstacles, &self.sensors, &mut self.body) {
            self.sync_sensors();
        }

        // Gravity: gated by ground contact, an active ascent, and the hover
        // delay after the last phase transition.
        if !collision::touching_ground(obstacles, &self.sensors)
            && self.phase != JumpPhase::Ascending
            && self.phase_timer >= self.config.hover_duration
        {
            self.body.y += self.config.gravity;
            self.sync_sensors();
        }

        // Jump phase machine.
        if jump_requested
            && self.phase == JumpPhase::Grounded
            && collision::touching_ground(obstacles, &self.sensors)
        {
            self.jump_frames = 0;
            self.set_phase(JumpPhase::Ascending);
        }
        if self.phase == JumpPhase::Ascending {
            if self.jump_frames >= self.config.max_jump_frames {
                // Hover starts here; its timer is what gates gravity above.
                self.set_phase(JumpPhase::Hovering);
            } else if collision::touching_ceiling(obstacles, &self.sensors) {
                // Cut the jump short: spend the whole budget so the next
                // step transitions to Hovering without moving up.
                self.jump_frames = self.config.max_jump_frames;
            } else {
                self.body.y -= self.config.jump_speed;
                self.jump_frames += 1;
                self.sync_sensors();
            }
        }

        // Landing is an explicit transition; hovering is otherwise only a
        // gravity gate, never a mutator.
        if self.phase == JumpPhase::Hovering
            && collision::touching_ground(obstacles, &self.sensors)
        {
            self.set_phase(JumpPhase::Grounded);
        }

        self.contacts = ContactState {
            on_ground: collision::touching_ground(obstacles, &self.sensors),
            on_ceiling: collision::touching_ceiling(obstacles, &self.sensors),
            blocked_side: collision::blocked_horizontally(obstacles, &self.sensors),
        };
    }
}
