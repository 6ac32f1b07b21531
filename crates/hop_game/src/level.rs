//! Level loading: a JSON document whose rows of symbols become the static
//! obstacle set plus the actor spawn point.
//!
//! Symbols: `X` solid tile, `-` air, `P` spawn (exactly one). Each solid cell
//! emits one rectangle at `(col * cell_size, row * cell_size)` with sides
//! `cell_size - 1`. The one-unit inset keeps adjacent tiles from fusing at
//! shared edges; wall sliding depends on it, so it is not cosmetic.
//!
//! Validation is strict and load-time only: a malformed level must keep the
//! process from starting. Once built, the obstacle set never changes for the
//! lifetime of the level.

use glam::Vec2;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::geometry::Rect;

#[derive(Debug, Deserialize, Clone)]
pub struct LevelFile {
    pub version: String,
    pub level_id: String,
    #[serde(default = "default_cell_size")]
    pub cell_size: i32,
    pub rows: Vec<String>,
}

const fn default_cell_size() -> i32 {
    40
}

#[derive(Debug, Error)]
pub enum LevelFormatError {
    #[error("failed to read level file {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse level JSON {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("level grid is empty")]
    EmptyGrid,
    #[error("level row {row} has {got} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("level cell_size must be > 0 (got {0})")]
    BadCellSize(i32),
    #[error("unknown level symbol '{symbol}' at row {row}, column {col}")]
    UnknownSymbol { row: usize, col: usize, symbol: char },
    #[error("level has no spawn marker 'P'")]
    MissingSpawn,
    #[error("level has more than one spawn marker 'P' (rows {first} and {second})")]
    DuplicateSpawn { first: usize, second: usize },
}

/// Static collision geometry, immutable once built. Every query walks the
/// obstacle list in grid scan order (top-to-bottom, left-to-right), which
/// keeps `first_intersecting` deterministic.
#[derive(Debug, Clone)]
pub struct ObstacleSet {
    obstacles: Vec<Rect>,
}

impl ObstacleSet {
    /// Scan the grid into obstacles and the single spawn coordinate.
    pub fn build(file: &LevelFile) -> Result<(ObstacleSet, Vec2), LevelFormatError> {
        if file.cell_size <= 0 {
            return Err(LevelFormatError::BadCellSize(file.cell_size));
        }
        if file.rows.is_empty() || file.rows[0].is_empty() {
            return Err(LevelFormatError::EmptyGrid);
        }

        let cell = file.cell_size as f32;
        let expected = file.rows[0].chars().count();
        let mut obstacles = Vec::new();
        let mut spawn: Option<(usize, Vec2)> = None;

        for (row, line) in file.rows.iter().enumerate() {
            let got = line.chars().count();
            if got != expected {
                return Err(LevelFormatError::RaggedRow { row, expected, got });
            }
            for (col, symbol) in line.chars().enumerate() {
                let x = col as f32 * cell;
                let y = row as f32 * cell;
                match symbol {
                    'X' => obstacles.push(Rect::new(x, y, cell - 1.0, cell - 1.0)),
                    'P' => {
                        if let Some((first, _)) = spawn {
                            return Err(LevelFormatError::DuplicateSpawn { first, second: row });
                        }
                        spawn = Some((row, Vec2::new(x, y)));
                    }
                    '-' => {}
                    other => {
                        return Err(LevelFormatError::UnknownSymbol {
                            row,
                            col,
                            symbol: other,
                        })
                    }
                }
            }
        }

        let (_, spawn) = spawn.ok_or(LevelFormatError::MissingSpawn)?;
        Ok((ObstacleSet { obstacles }, spawn))
    }

    pub fn any_intersects(&self, probe: &Rect) -> bool {
        self.obstacles.iter().any(|o| o.intersects(probe))
    }

    pub fn first_intersecting(&self, probe: &Rect) -> Option<&Rect> {
        self.obstacles.iter().find(|o| o.intersects(probe))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

pub fn load_level_from_path(path: &Path) -> Result<LevelFile, LevelFormatError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelFormatError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    let level: LevelFile = serde_json::from_str(&raw).map_err(|source| LevelFormatError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(level)
}

/// Polls the level file's mtime so edits on disk can be picked up at fixed-step
/// boundaries without any platform file-watching machinery.
pub struct LevelWatcher {
    level_path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl LevelWatcher {
    pub fn new(level_path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&level_path);
        Self {
            level_path,
            last_seen_modified,
        }
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.level_path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "hop_level_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn level_from_rows(rows: &[&str]) -> LevelFile {
        LevelFile {
            version: "0.1".to_string(),
            level_id: "test".to_string(),
            cell_size: 40,
            rows: rows.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn load_level_valid_file_parses() {
        let path = temp_file_path("valid");
        fs::write(
            &path,
            r#"{
              "version":"0.1",
              "level_id":"test",
              "cell_size":40,
              "rows":["X-P-X","XXXXX"]
            }"#,
        )
        .expect("write temp file");

        let level = load_level_from_path(&path).expect("valid level should load");
        assert_eq!(level.cell_size, 40);
        assert_eq!(level.rows.len(), 2);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_level_missing_file_is_unreadable() {
        let path = temp_file_path("missing");
        let err = load_level_from_path(&path).expect_err("missing file should fail");
        assert!(matches!(err, LevelFormatError::Unreadable { .. }));
    }

    #[test]
    fn load_level_rejects_malformed_json() {
        let path = temp_file_path("garbled");
        fs::write(&path, "{ not json").expect("write temp file");
        let err = load_level_from_path(&path).expect_err("garbled JSON should fail");
        assert!(matches!(err, LevelFormatError::Parse { .. }));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn cell_size_defaults_to_forty() {
        let path = temp_file_path("default_cell");
        fs::write(
            &path,
            r#"{"version":"0.1","level_id":"test","rows":["P"]}"#,
        )
        .expect("write temp file");
        let level = load_level_from_path(&path).expect("level should load");
        assert_eq!(level.cell_size, 40);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn build_emits_inset_obstacles_in_scan_order() {
        let (set, spawn) = ObstacleSet::build(&level_from_rows(&["X-P-X", "XXXXX"]))
            .expect("scenario grid should build");

        let obstacles: Vec<_> = set.iter().copied().collect();
        let expected = [
            Rect::new(0.0, 0.0, 39.0, 39.0),
            Rect::new(160.0, 0.0, 39.0, 39.0),
            Rect::new(0.0, 40.0, 39.0, 39.0),
            Rect::new(40.0, 40.0, 39.0, 39.0),
            Rect::new(80.0, 40.0, 39.0, 39.0),
            Rect::new(120.0, 40.0, 39.0, 39.0),
            Rect::new(160.0, 40.0, 39.0, 39.0),
        ];
        assert_eq!(obstacles, expected);
        assert_eq!(spawn, Vec2::new(80.0, 0.0));
    }

    #[test]
    fn build_rejects_empty_grid() {
        let err = ObstacleSet::build(&level_from_rows(&[])).expect_err("empty grid should fail");
        assert!(matches!(err, LevelFormatError::EmptyGrid));
    }

    #[test]
    fn build_rejects_ragged_rows() {
        let err = ObstacleSet::build(&level_from_rows(&["XXXX", "XX", "P---"]))
            .expect_err("ragged rows should fail");
        assert!(matches!(
            err,
            LevelFormatError::RaggedRow {
                row: 1,
                expected: 4,
                got: 2
            }
        ));
    }

    #[test]
    fn build_rejects_missing_spawn() {
        let err = ObstacleSet::build(&level_from_rows(&["X--X", "XXXX"]))
            .expect_err("spawnless level should fail");
        assert!(matches!(err, LevelFormatError::MissingSpawn));
    }

    #[test]
    fn build_rejects_duplicate_spawn() {
        let err = ObstacleSet::build(&level_from_rows(&["P---", "---P"]))
            .expect_err("two spawns should fail");
        assert!(matches!(
            err,
            LevelFormatError::DuplicateSpawn {
                first: 0,
                second: 1
            }
        ));
    }

    #[test]
    fn build_rejects_unknown_symbol() {
        let err = ObstacleSet::build(&level_from_rows(&["P--?"]))
            .expect_err("unknown symbol should fail");
        assert!(matches!(
            err,
            LevelFormatError::UnknownSymbol {
                row: 0,
                col: 3,
                symbol: '?'
            }
        ));
    }

    #[test]
    fn build_rejects_non_positive_cell_size() {
        let mut file = level_from_rows(&["P"]);
        file.cell_size = 0;
        let err = ObstacleSet::build(&file).expect_err("zero cell size should fail");
        assert!(matches!(err, LevelFormatError::BadCellSize(0)));
    }

    #[test]
    fn queries_respect_the_one_unit_inset() {
        let (set, _) = ObstacleSet::build(&level_from_rows(&["P-", "XX"])).expect("build");
        // Probe sitting exactly in the seam between the two inset tiles.
        let seam = Rect::new(39.0, 40.0, 1.0, 39.0);
        assert!(!set.any_intersects(&seam));
        // Nudged into the second tile, it hits.
        let inside = Rect::new(39.5, 40.0, 1.0, 39.0);
        assert!(set.any_intersects(&inside));
        assert_eq!(
            set.first_intersecting(&inside),
            Some(&Rect::new(40.0, 40.0, 39.0, 39.0))
        );
    }

    #[test]
    fn watcher_detects_file_change() {
        let path = temp_file_path("watcher");
        let mut watcher = LevelWatcher::new(path.clone());
        assert!(!watcher.should_reload(), "missing file should not reload");

        fs::write(
            &path,
            r#"{"version":"0.1","level_id":"watcher","rows":["P"]}"#,
        )
        .expect("write temp file");

        assert!(
            watcher.should_reload(),
            "creating file should trigger reload once"
        );
        assert!(
            !watcher.should_reload(),
            "without changes, second poll should not reload"
        );

        let _ = fs::remove_file(path);
    }
}
