//! Scripted input sequences for simulation tests. A replay file is a list of
//! frames; each frame fires its input transitions on its first repeat and
//! then holds (no events) for the remainder, which is exactly how a human
//! press-and-hold reaches the actor's accumulator.

use crate::actor::{ActionKey, InputEvent};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub events: Vec<ReplayEvent>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplayEvent {
    PressLeft,
    ReleaseLeft,
    PressRight,
    ReleaseRight,
    PressJump,
}

impl ReplayEvent {
    fn to_input(self) -> InputEvent {
        match self {
            Self::PressLeft => InputEvent::KeyDown(ActionKey::Left),
            Self::ReleaseLeft => InputEvent::KeyUp(ActionKey::Left),
            Self::PressRight => InputEvent::KeyDown(ActionKey::Right),
            Self::ReleaseRight => InputEvent::KeyUp(ActionKey::Right),
            Self::PressJump => InputEvent::KeyDown(ActionKey::Jump),
        }
    }
}

impl ReplaySequence {
    /// One event batch per fixed step; transitions land on the first step of
    /// their frame, the held remainder gets empty batches.
    pub fn expanded_inputs(&self) -> Vec<Vec<InputEvent>> {
        let mut out = Vec::new();
        for frame in &self.frames {
            out.push(frame.events.iter().map(|e| e.to_input()).collect());
            for _ in 1..frame.repeat.max(1) {
                out.push(Vec::new());
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, JumpPhase};
    use crate::level::{LevelFile, ObstacleSet};
    use glam::Vec2;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "hop_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn sample_level() -> (ObstacleSet, Vec2) {
        let file = LevelFile {
            version: "0.1".to_string(),
            level_id: "replay".to_string(),
            cell_size: 40,
            rows: vec![
                "--------------------".to_string(),
                "--P-----------------".to_string(),
                "--------------------".to_string(),
                "XXXXXXXXXXXXXXXXXXXX".to_string(),
            ],
        };
        ObstacleSet::build(&file).expect("sample level should build")
    }

    fn run(replay: &ReplaySequence, obstacles: &ObstacleSet, spawn: Vec2) -> Actor {
        let mut actor = Actor::spawn_at(spawn);
        for batch in replay.expanded_inputs() {
            actor.step(replay.fixed_dt, &batch, obstacles);
        }
        actor
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "events": ["press_right"], "repeat": 3 },
                { "events": ["release_right", "press_jump"] }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 4);
        assert_eq!(
            expanded[0],
            vec![InputEvent::KeyDown(ActionKey::Right)]
        );
        assert!(expanded[1].is_empty());
        assert_eq!(expanded[3].len(), 2);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_rejects_empty_frames() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{"fixed_dt": 0.016666667, "frames": []}"#)
            .expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_rejects_non_positive_dt() {
        let path = temp_file_path("bad_dt");
        fs::write(
            &path,
            r#"{"fixed_dt": 0.0, "frames": [{ "events": ["press_jump"] }]}"#,
        )
        .expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("zero dt should fail");
        assert!(err.contains("fixed_dt must be > 0"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = temp_file_path("deterministic");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "events": ["press_right"], "repeat": 60 },
                { "events": ["press_jump"], "repeat": 45 },
                { "events": ["release_right"], "repeat": 30 },
                { "events": ["press_left"], "repeat": 90 },
                { "events": ["release_left"], "repeat": 30 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let (obstacles, spawn) = sample_level();

        let run_a = run(&replay, &obstacles, spawn);
        let run_b = run(&replay, &obstacles, spawn);

        assert_eq!(run_a.body(), run_b.body());
        assert!((run_a.speed() - run_b.speed()).abs() < f32::EPSILON);
        assert_eq!(run_a.phase(), run_b.phase());
        assert_eq!(run_a.contacts(), run_b.contacts());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn walk_and_return_lands_back_at_rest() {
        // Walk right for a second, walk back for a second, stop: the actor
        // should end grounded with a balanced speed accumulator.
        let replay = ReplaySequence {
            fixed_dt: 1.0 / 60.0,
            frames: vec![
                ReplayFrame {
                    events: vec![ReplayEvent::PressRight],
                    repeat: 60,
                },
                ReplayFrame {
                    events: vec![ReplayEvent::ReleaseRight, ReplayEvent::PressLeft],
                    repeat: 60,
                },
                ReplayFrame {
                    events: vec![ReplayEvent::ReleaseLeft],
                    repeat: 10,
                },
            ],
        };
        let (obstacles, spawn) = sample_level();
        let actor = run(&replay, &obstacles, spawn);

        assert!((actor.speed() - 0.0).abs() < f32::EPSILON);
        assert_eq!(actor.phase(), JumpPhase::Grounded);
        assert!(actor.contacts().on_ground);
        assert!((actor.body().x - spawn.x).abs() < f32::EPSILON);
    }
}
