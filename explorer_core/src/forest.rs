// forest.rs - Exploration records, global visitation and the move state machine
//
// `ExplorationForest` is single-threaded; `MazeEngine` owns one behind a lock.
// Every mutation here assumes the caller holds exclusive access.

use crate::classify::PALETTE_SIZE;
use crate::error_handling::{ExplorerError, Result};
use crate::grid::Grid;
use crate::types::{AvailableMove, Direction, Position};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// One branch's journey through the maze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exploration {
    pub id: String,
    pub start_position: Position,
    pub current_position: Position,
    #[serde(rename = "path_positions")]
    pub path: Vec<Position>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    pub is_active: bool,
    pub is_complete: bool,
    pub is_dead: bool,
    pub found_goal: bool,
    pub generation: u32,
    /// Stable palette identity, independent of tree position.
    #[serde(rename = "fixed_color_index")]
    pub color_slot: usize,
}

impl Exploration {
    fn root(id: &str, at: Position, color_slot: usize) -> Self {
        Self {
            id: id.to_string(),
            start_position: at,
            current_position: at,
            path: vec![at],
            parent_id: None,
            child_ids: Vec::new(),
            is_active: true,
            is_complete: false,
            is_dead: false,
            found_goal: false,
            generation: 0,
            color_slot,
        }
    }

    fn child_of(parent: &Exploration, id: &str, at: Position) -> Self {
        Self {
            id: id.to_string(),
            start_position: parent.current_position,
            current_position: at,
            path: vec![parent.current_position, at],
            parent_id: Some(parent.id.clone()),
            child_ids: Vec::new(),
            is_active: true,
            is_complete: false,
            is_dead: false,
            found_goal: false,
            generation: parent.generation + 1,
            color_slot: 0,
        }
    }

    /// A root that has not moved past its first cell being re-sent there.
    fn is_restart_of_root(&self, target: Position) -> bool {
        self.parent_id.is_none() && self.path.len() == 1 && self.start_position == target
    }

    fn mark_goal(&mut self) {
        self.found_goal = true;
        self.is_complete = true;
        self.is_active = false;
    }

    fn mark_dead(&mut self) {
        self.is_dead = true;
        self.is_complete = true;
        self.is_active = false;
    }
}

/// Result tag of a move. Only `Blocked` and `Collision` leave state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStatus {
    Continue,
    Junction,
    DeadEnd,
    GoalReached,
    Blocked,
    Collision,
}

impl MoveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MoveStatus::Continue => "continue",
            MoveStatus::Junction => "junction",
            MoveStatus::DeadEnd => "dead_end",
            MoveStatus::GoalReached => "goal_reached",
            MoveStatus::Blocked => "blocked",
            MoveStatus::Collision => "collision",
        }
    }

    pub fn is_success(self) -> bool {
        !matches!(self, MoveStatus::Blocked | MoveStatus::Collision)
    }
}

impl fmt::Display for MoveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub success: bool,
    pub message: String,
    #[serde(rename = "new_status")]
    pub status: MoveStatus,
}

impl MoveOutcome {
    fn new(status: MoveStatus, message: impl Into<String>) -> Self {
        Self {
            success: status.is_success(),
            message: message.into(),
            status,
        }
    }
}

/// What a position looks like to an explorer standing on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub is_explored: bool,
    pub is_junction: bool,
    pub available_moves: Vec<AvailableMove>,
    pub is_goal: bool,
    pub goal_reached_by_any: bool,
}

impl StatusReport {
    pub fn available_directions(&self) -> Vec<Direction> {
        self.available_moves.iter().map(|m| m.direction).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestStats {
    pub total_explorations: usize,
    pub active_explorations: usize,
    pub complete_explorations: usize,
    pub dead_explorations: usize,
    pub successful_explorations: usize,
    pub goal_found: bool,
    pub winning_id: Option<String>,
    #[serde(rename = "visited_positions_count")]
    pub visited_positions: usize,
    pub max_concurrent: usize,
}

/// Read-only copy of the forest taken under a single lock acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSnapshot {
    pub explorations: BTreeMap<String, Exploration>,
    pub global_stats: ForestStats,
}

/// Arrival classification for a freshly visited cell.
enum Arrival {
    Goal,
    DeadEnd,
    Junction,
    Corridor,
}

pub struct ExplorationForest {
    grid: Arc<Grid>,
    explorations: BTreeMap<String, Exploration>,
    visited: HashSet<Position>,
    goal_found: bool,
    winning_id: Option<String>,
    next_color: usize,
    max_concurrent: usize,
}

impl ExplorationForest {
    pub fn new(grid: Arc<Grid>) -> Self {
        Self {
            grid,
            explorations: BTreeMap::new(),
            visited: HashSet::new(),
            goal_found: false,
            winning_id: None,
            next_color: 0,
            max_concurrent: 0,
        }
    }

    pub(crate) fn from_parts(
        grid: Arc<Grid>,
        explorations: BTreeMap<String, Exploration>,
        visited: HashSet<Position>,
        winning_id: Option<String>,
        goal_found: bool,
        next_color: usize,
        max_concurrent: usize,
    ) -> Self {
        Self {
            grid,
            explorations,
            visited,
            goal_found,
            winning_id,
            next_color,
            max_concurrent,
        }
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn exploration(&self, id: &str) -> Option<&Exploration> {
        self.explorations.get(id)
    }

    pub fn explorations(&self) -> &BTreeMap<String, Exploration> {
        &self.explorations
    }

    pub fn is_visited(&self, pos: Position) -> bool {
        self.visited.contains(&pos)
    }

    pub(crate) fn visited(&self) -> &HashSet<Position> {
        &self.visited
    }

    pub fn goal_found(&self) -> bool {
        self.goal_found
    }

    pub fn winning_id(&self) -> Option<&str> {
        self.winning_id.as_deref()
    }

    pub(crate) fn next_color(&self) -> usize {
        self.next_color
    }

    pub(crate) fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Walkable, unvisited neighbors of `pos` in Up, Down, Left, Right order.
    pub fn available_moves(&self, pos: Position) -> Vec<AvailableMove> {
        Direction::ALL
            .iter()
            .map(|&direction| AvailableMove {
                direction,
                target_position: pos.step(direction),
            })
            .filter(|m| self.grid.is_walkable(m.target_position) && !self.visited.contains(&m.target_position))
            .collect()
    }

    /// Side-effect free status of an in-bounds position.
    pub fn query_status(&self, pos: Position) -> Result<StatusReport> {
        if !self.grid.in_bounds(pos) {
            return Err(ExplorerError::OutOfBounds(pos));
        }
        let available_moves = self.available_moves(pos);
        Ok(StatusReport {
            is_explored: self.visited.contains(&pos),
            is_junction: available_moves.len() > 1,
            available_moves,
            is_goal: self.grid.is_goal(pos),
            goal_reached_by_any: self.goal_found,
        })
    }

    /// Status at the exploration's current position.
    pub fn exploration_status(&self, id: &str) -> Result<StatusReport> {
        let exploration = self
            .explorations
            .get(id)
            .ok_or_else(|| ExplorerError::ExplorationNotFound(id.to_string()))?;
        self.query_status(exploration.current_position)
    }

    /// Blocked and collision checks shared by `move_exploration` and `branch`.
    fn reject_target(&self, target: Position) -> Option<MoveOutcome> {
        if !self.grid.is_walkable(target) {
            return Some(MoveOutcome::new(MoveStatus::Blocked, "Position is not walkable"));
        }
        if self.visited.contains(&target) {
            return Some(MoveOutcome::new(
                MoveStatus::Collision,
                "Position already explored (collision)",
            ));
        }
        None
    }

    /// Move `id` onto `target`, creating a root exploration when `id` is new.
    pub fn move_exploration(&mut self, id: &str, target: Position) -> Result<MoveOutcome> {
        if let Some(rejected) = self.reject_target(target) {
            log::debug!("{} -> {}: {}", id, target, rejected.status);
            return Ok(rejected);
        }

        let Some(exploration) = self.explorations.get(id) else {
            return Ok(self.start_root(id, target));
        };

        if exploration.is_restart_of_root(target) {
            self.visited.insert(target);
            return Ok(MoveOutcome::new(
                MoveStatus::Continue,
                format!("Exploration '{id}' already started at {target}"),
            ));
        }

        if exploration.is_complete {
            log::warn!("Rejected move of completed exploration '{}' to {}", id, target);
            return Err(ExplorerError::ExplorationComplete(id.to_string()));
        }

        if let Some(exploration) = self.explorations.get_mut(id) {
            exploration.current_position = target;
            exploration.path.push(target);
        }
        Ok(self.arrive(id, target))
    }

    /// Spawn `child_id` from `parent_id`'s current cell onto the adjacent
    /// `target`. The parent hands off and becomes complete; the lineage link
    /// is set here and never changes.
    pub fn branch(&mut self, parent_id: &str, child_id: &str, target: Position) -> Result<MoveOutcome> {
        let parent = self
            .explorations
            .get(parent_id)
            .ok_or_else(|| ExplorerError::ExplorationNotFound(parent_id.to_string()))?;
        if self.explorations.contains_key(child_id) {
            log::warn!("Rejected branch '{}' -> '{}': child id exists", parent_id, child_id);
            return Err(ExplorerError::DuplicateExploration(child_id.to_string()));
        }
        if parent.found_goal || parent.is_dead {
            log::warn!("Rejected branch from finished exploration '{}'", parent_id);
            return Err(ExplorerError::ExplorationComplete(parent_id.to_string()));
        }
        if !self.grid.in_bounds(target) {
            return Err(ExplorerError::OutOfBounds(target));
        }
        if !parent.current_position.is_adjacent(target) {
            return Err(ExplorerError::NotOnFrontier {
                parent: parent_id.to_string(),
                position: target,
            });
        }
        if let Some(rejected) = self.reject_target(target) {
            log::debug!("branch {} -> {} at {}: {}", parent_id, child_id, target, rejected.status);
            return Ok(rejected);
        }

        let mut child = Exploration::child_of(parent, child_id, target);
        child.color_slot = self.take_color_slot();
        if let Some(parent) = self.explorations.get_mut(parent_id) {
            parent.child_ids.push(child_id.to_string());
            parent.is_active = false;
            parent.is_complete = true;
        }
        self.explorations.insert(child_id.to_string(), child);
        self.track_concurrency();

        Ok(self.arrive(child_id, target))
    }

    fn start_root(&mut self, id: &str, target: Position) -> MoveOutcome {
        let slot = self.take_color_slot();
        let mut exploration = Exploration::root(id, target, slot);
        self.visited.insert(target);

        let outcome = if self.grid.is_goal(target) {
            exploration.mark_goal();
            self.record_winner(id);
            MoveOutcome::new(MoveStatus::GoalReached, format!("Goal reached by {id}!"))
        } else {
            MoveOutcome::new(
                MoveStatus::Continue,
                format!("Exploration '{id}' started at {target}"),
            )
        };

        self.explorations.insert(id.to_string(), exploration);
        self.track_concurrency();
        log::debug!("{} created at {}: {}", id, target, outcome.status);
        outcome
    }

    /// Mark `target` visited and settle the exploration that just landed there.
    fn arrive(&mut self, id: &str, target: Position) -> MoveOutcome {
        self.visited.insert(target);

        let arrival = if self.grid.is_goal(target) {
            Arrival::Goal
        } else {
            match self.available_moves(target).len() {
                0 => Arrival::DeadEnd,
                1 => Arrival::Corridor,
                _ => Arrival::Junction,
            }
        };

        let outcome = match arrival {
            Arrival::Goal => {
                if let Some(exploration) = self.explorations.get_mut(id) {
                    exploration.mark_goal();
                }
                self.record_winner(id);
                MoveOutcome::new(MoveStatus::GoalReached, format!("Goal reached by {id}!"))
            }
            Arrival::DeadEnd => {
                if let Some(exploration) = self.explorations.get_mut(id) {
                    exploration.mark_dead();
                }
                MoveOutcome::new(MoveStatus::DeadEnd, "Dead end reached")
            }
            Arrival::Junction => MoveOutcome::new(MoveStatus::Junction, "Junction reached - can branch explorations"),
            Arrival::Corridor => MoveOutcome::new(MoveStatus::Continue, "Moved successfully"),
        };

        log::debug!("{} -> {}: {}", id, target, outcome.status);
        outcome
    }

    fn record_winner(&mut self, id: &str) {
        self.goal_found = true;
        self.winning_id = Some(id.to_string());
        log::info!("Goal {} reached by '{}'", self.grid.goal(), id);
    }

    fn take_color_slot(&mut self) -> usize {
        let slot = self.next_color % PALETTE_SIZE;
        self.next_color += 1;
        slot
    }

    fn active_count(&self) -> usize {
        self.explorations.values().filter(|e| e.is_active).count()
    }

    fn track_concurrency(&mut self) {
        self.max_concurrent = self.max_concurrent.max(self.active_count());
    }

    /// Ids from the root of the spawn tree down to `id`.
    pub fn lineage(&self, id: &str) -> Result<Vec<String>> {
        let mut current = self
            .explorations
            .get(id)
            .ok_or_else(|| ExplorerError::ExplorationNotFound(id.to_string()))?;
        let mut chain = vec![current.id.clone()];

        while let Some(parent_id) = current.parent_id.as_deref() {
            let Some(parent) = self.explorations.get(parent_id) else {
                break;
            };
            if chain.len() > self.explorations.len() {
                return Err(ExplorerError::invalid_snapshot(format!("lineage of '{id}' is cyclic")));
            }
            chain.push(parent.id.clone());
            current = parent;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Cells walked from the winner's root to the goal, junction cells listed
    /// once. `None` until the goal has been found.
    pub fn winning_path(&self) -> Option<Vec<Position>> {
        let winner = self.winning_id.as_deref()?;
        let lineage = self.lineage(winner).ok()?;

        let mut path: Vec<Position> = Vec::new();
        for id in &lineage {
            let exploration = self.explorations.get(id)?;
            let skip = usize::from(path.last() == exploration.path.first());
            path.extend(exploration.path.iter().skip(skip));
        }
        Some(path)
    }

    pub fn stats(&self) -> ForestStats {
        let mut stats = ForestStats {
            total_explorations: self.explorations.len(),
            goal_found: self.goal_found,
            winning_id: self.winning_id.clone(),
            visited_positions: self.visited.len(),
            max_concurrent: self.max_concurrent,
            ..ForestStats::default()
        };
        for exploration in self.explorations.values() {
            stats.active_explorations += usize::from(exploration.is_active);
            stats.complete_explorations += usize::from(exploration.is_complete);
            stats.dead_explorations += usize::from(exploration.is_dead);
            stats.successful_explorations += usize::from(exploration.found_goal);
        }
        stats
    }

    pub fn snapshot(&self) -> ForestSnapshot {
        ForestSnapshot {
            explorations: self.explorations.clone(),
            global_stats: self.stats(),
        }
    }

    /// Forget every exploration and visited cell; the grid is kept.
    pub fn reset(&mut self) {
        let dropped = self.explorations.len();
        self.explorations.clear();
        self.visited.clear();
        self.goal_found = false;
        self.winning_id = None;
        self.next_color = 0;
        self.max_concurrent = 0;
        log::info!("Forest reset ({} explorations dropped)", dropped);
    }
}
