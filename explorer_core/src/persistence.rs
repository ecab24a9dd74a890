// persistence.rs - JSON snapshot document for a maze and its exploration forest

use crate::error_handling::{ExplorerError, Result};
use crate::forest::{Exploration, ExplorationForest};
use crate::grid::Grid;
use crate::types::Position;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestMetadata {
    pub width: usize,
    pub height: usize,
    pub start: Position,
    pub goal: Position,
    pub goal_found: bool,
    pub winning_segment: Option<String>,
    /// Cells stepped onto after each exploration's first cell. Derived, not restored.
    #[serde(default)]
    pub total_steps: usize,
    #[serde(default)]
    pub max_concurrent_segments: usize,
    /// Color counter: the next exploration created takes `next_id % PALETTE_SIZE`.
    pub next_id: usize,
}

/// On-disk form of one maze instance: grid, explorations and visitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestDocument {
    pub metadata: ForestMetadata,
    pub maze: Vec<Vec<u8>>,
    pub segments: BTreeMap<String, Exploration>,
    pub global_visited_positions: Vec<Position>,
}

impl ForestDocument {
    pub fn capture(forest: &ExplorationForest) -> Self {
        let grid = forest.grid();
        let mut visited: Vec<Position> = forest.visited().iter().copied().collect();
        visited.sort_unstable_by_key(|p| (p.y, p.x));

        let segments = forest.explorations().clone();
        let total_steps = segments.values().map(|e| e.path.len().saturating_sub(1)).sum();

        Self {
            metadata: ForestMetadata {
                width: grid.width(),
                height: grid.height(),
                start: grid.start(),
                goal: grid.goal(),
                goal_found: forest.goal_found(),
                winning_segment: forest.winning_id().map(str::to_string),
                total_steps,
                max_concurrent_segments: forest.max_concurrent(),
                next_id: forest.next_color(),
            },
            maze: grid.to_codes(),
            segments,
            global_visited_positions: visited,
        }
    }

    /// Validate the document and rebuild the forest it describes.
    pub fn into_forest(self) -> Result<ExplorationForest> {
        let grid = Grid::from_codes(&self.maze)?;
        let meta = &self.metadata;
        if (meta.width, meta.height) != (grid.width(), grid.height()) {
            return Err(ExplorerError::invalid_snapshot(format!(
                "metadata says {}x{} but maze is {}x{}",
                meta.width,
                meta.height,
                grid.width(),
                grid.height()
            )));
        }
        if meta.start != grid.start() || meta.goal != grid.goal() {
            return Err(ExplorerError::invalid_snapshot("start/goal disagree with maze cells"));
        }

        validate_segments(&grid, &self.segments)?;

        if let Some(winner) = meta.winning_segment.as_deref() {
            if !meta.goal_found || !self.segments.contains_key(winner) {
                return Err(ExplorerError::invalid_snapshot(format!(
                    "winning segment '{winner}' is inconsistent"
                )));
            }
        }

        let mut visited = HashSet::with_capacity(self.global_visited_positions.len());
        for pos in self.global_visited_positions {
            if !grid.is_walkable(pos) {
                return Err(ExplorerError::invalid_snapshot(format!("visited position {pos} is not walkable")));
            }
            visited.insert(pos);
        }
        for segment in self.segments.values() {
            if let Some(pos) = segment.path.iter().find(|pos| !visited.contains(*pos)) {
                return Err(ExplorerError::invalid_snapshot(format!(
                    "segment '{}' walked {pos} but it is not marked visited",
                    segment.id
                )));
            }
        }

        Ok(ExplorationForest::from_parts(
            Arc::new(grid),
            self.segments,
            visited,
            self.metadata.winning_segment,
            self.metadata.goal_found,
            self.metadata.next_id,
            self.metadata.max_concurrent_segments,
        ))
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        log::info!(
            "Saved {} explorations to {}",
            self.segments.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = Self::read_from(BufReader::new(File::open(path)?))?;
        log::info!(
            "Loaded {}x{} maze with {} explorations from {}",
            document.metadata.width,
            document.metadata.height,
            document.segments.len(),
            path.display()
        );
        Ok(document)
    }
}

fn validate_segments(grid: &Grid, segments: &BTreeMap<String, Exploration>) -> Result<()> {
    for (key, exploration) in segments {
        if key != &exploration.id {
            return Err(ExplorerError::invalid_snapshot(format!(
                "segment keyed '{key}' has id '{}'",
                exploration.id
            )));
        }
        if exploration.path.last() != Some(&exploration.current_position)
            || exploration.path.first() != Some(&exploration.start_position)
        {
            return Err(ExplorerError::invalid_snapshot(format!(
                "path of '{key}' does not run from start to current position"
            )));
        }
        if let Some(pos) = exploration.path.iter().find(|p| !grid.is_walkable(**p)) {
            return Err(ExplorerError::invalid_snapshot(format!("path of '{key}' crosses wall at {pos}")));
        }
        if let Some(parent) = exploration.parent_id.as_deref() {
            if !segments.contains_key(parent) {
                return Err(ExplorerError::invalid_snapshot(format!("'{key}' names missing parent '{parent}'")));
            }
        }
        for child in &exploration.child_ids {
            let linked = segments
                .get(child)
                .is_some_and(|c| c.parent_id.as_deref() == Some(key.as_str()));
            if !linked {
                return Err(ExplorerError::invalid_snapshot(format!(
                    "child '{child}' of '{key}' does not point back to it"
                )));
            }
        }
    }

    // Every parent chain must reach a root within `segments.len()` hops.
    for exploration in segments.values() {
        let mut current = exploration;
        let mut hops = 0;
        while let Some(parent) = current.parent_id.as_deref().and_then(|p| segments.get(p)) {
            hops += 1;
            if hops > segments.len() {
                return Err(ExplorerError::invalid_snapshot(format!(
                    "lineage of '{}' is cyclic",
                    exploration.id
                )));
            }
            current = parent;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explored_forest() -> ExplorationForest {
        let grid = Grid::parse_ascii(&["#######", "#S    #", "### # #", "### #G#", "### ###", "#######"]).unwrap();
        let mut forest = ExplorationForest::new(Arc::new(grid));
        for x in 1..=3 {
            forest.move_exploration("root", Position::new(x, 1)).unwrap();
        }
        forest.branch("root", "root_a", Position::new(3, 2)).unwrap();
        forest.branch("root", "root_b", Position::new(4, 1)).unwrap();
        for y in 1..=3 {
            forest.move_exploration("root_b", Position::new(5, y)).unwrap();
        }
        forest
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let forest = explored_forest();
        let document = ForestDocument::capture(&forest);
        assert_eq!(document.metadata.winning_segment.as_deref(), Some("root_b"));
        assert_eq!(document.metadata.next_id, 3);
        assert_eq!(document.metadata.total_steps, 2 + 1 + 4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.json");
        document.save(&path).unwrap();

        let loaded = ForestDocument::load(&path).unwrap();
        assert_eq!(loaded, document);

        let restored = loaded.into_forest().unwrap();
        assert_eq!(restored.snapshot(), forest.snapshot());
        assert_eq!(restored.grid().as_ref(), forest.grid().as_ref());
        assert_eq!(ForestDocument::capture(&restored), document);
    }

    #[test]
    fn test_document_uses_wire_field_names() {
        let document = ForestDocument::capture(&explored_forest());
        let value = serde_json::to_value(&document).unwrap();
        let segment = &value["segments"]["root_a"];
        assert_eq!(segment["parent_id"], "root");
        assert_eq!(segment["fixed_color_index"], 1);
        assert_eq!(segment["path_positions"][0]["x"], 3);
        assert_eq!(value["maze"][1][1], 2);
        assert!(value["metadata"]["goal_found"].as_bool().unwrap());
    }

    #[test]
    fn test_restored_forest_keeps_enforcing_collisions() {
        let document = ForestDocument::capture(&explored_forest());
        let mut restored = document.into_forest().unwrap();
        let outcome = restored.move_exploration("late", Position::new(3, 2)).unwrap();
        assert_eq!(outcome.status, crate::forest::MoveStatus::Collision);
        let fresh = restored.move_exploration("late", Position::new(3, 3)).unwrap();
        assert!(fresh.success);
        assert_eq!(restored.exploration("late").unwrap().color_slot, 3);
    }

    #[test]
    fn test_load_rejects_inconsistent_documents() {
        let base = ForestDocument::capture(&explored_forest());

        let mut dangling = base.clone();
        dangling.segments.get_mut("root_a").unwrap().parent_id = Some("ghost".into());
        assert!(matches!(dangling.into_forest(), Err(ExplorerError::InvalidSnapshot { .. })));

        let mut cyclic = base.clone();
        cyclic.segments.get_mut("root").unwrap().parent_id = Some("root_a".into());
        assert!(matches!(cyclic.into_forest(), Err(ExplorerError::InvalidSnapshot { .. })));

        let mut resized = base.clone();
        resized.metadata.width = 9;
        assert!(matches!(resized.into_forest(), Err(ExplorerError::InvalidSnapshot { .. })));

        let mut walled = base.clone();
        walled.global_visited_positions.push(Position::new(0, 0));
        assert!(matches!(walled.into_forest(), Err(ExplorerError::InvalidSnapshot { .. })));

        let mut unvisited = base.clone();
        unvisited.global_visited_positions.retain(|pos| *pos != Position::new(3, 2));
        assert!(matches!(unvisited.into_forest(), Err(ExplorerError::InvalidSnapshot { .. })));

        let mut bad_winner = base;
        bad_winner.metadata.winning_segment = Some("nobody".into());
        assert!(matches!(bad_winner.into_forest(), Err(ExplorerError::InvalidSnapshot { .. })));
    }

    #[test]
    fn test_load_reports_missing_file_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ForestDocument::load(dir.path().join("absent.json")),
            Err(ExplorerError::Io(_))
        ));
        assert!(matches!(
            ForestDocument::read_from("{ not json".as_bytes()),
            Err(ExplorerError::Serialization(_))
        ));
    }
}
