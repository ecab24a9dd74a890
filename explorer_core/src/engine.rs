// engine.rs - Thread-safe handle over one maze and its exploration forest
//
// Every mutation takes the write lock for its whole check-then-act sequence,
// so two callers racing for the same cell cannot both claim it. Queries share
// the read lock and always see a fully applied move.

use crate::classify::{Classifier, DisplayStyle};
use crate::config::ExplorerConfig;
use crate::error_handling::{ExplorerError, Result};
use crate::forest::{ExplorationForest, ForestSnapshot, ForestStats, MoveOutcome, StatusReport};
use crate::generator;
use crate::grid::Grid;
use crate::persistence::ForestDocument;
use crate::types::Position;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct MazeEngine {
    grid: Arc<Grid>,
    forest: RwLock<ExplorationForest>,
}

impl MazeEngine {
    pub fn new(grid: Grid) -> Self {
        let grid = Arc::new(grid);
        Self {
            forest: RwLock::new(ExplorationForest::new(Arc::clone(&grid))),
            grid,
        }
    }

    pub fn generate(width: usize, height: usize, seed: u64) -> Result<Self> {
        Ok(Self::new(generator::generate(width, height, seed)?))
    }

    pub fn from_config(config: &ExplorerConfig) -> Result<Self> {
        Self::generate(config.width, config.height, config.seed)
    }

    fn from_forest(forest: ExplorationForest) -> Self {
        Self {
            grid: Arc::clone(forest.grid()),
            forest: RwLock::new(forest),
        }
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ExplorationForest>> {
        self.forest.read().map_err(|_| ExplorerError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ExplorationForest>> {
        self.forest.write().map_err(|_| ExplorerError::LockPoisoned)
    }

    pub fn query_status(&self, pos: Position) -> Result<StatusReport> {
        self.read()?.query_status(pos)
    }

    pub fn exploration_status(&self, id: &str) -> Result<StatusReport> {
        self.read()?.exploration_status(id)
    }

    pub fn move_exploration(&self, id: &str, target: Position) -> Result<MoveOutcome> {
        self.write()?.move_exploration(id, target)
    }

    pub fn branch(&self, parent_id: &str, child_id: &str, target: Position) -> Result<MoveOutcome> {
        self.write()?.branch(parent_id, child_id, target)
    }

    pub fn reset(&self) -> Result<()> {
        self.write()?.reset();
        Ok(())
    }

    pub fn snapshot(&self) -> Result<ForestSnapshot> {
        Ok(self.read()?.snapshot())
    }

    pub fn stats(&self) -> Result<ForestStats> {
        Ok(self.read()?.stats())
    }

    pub fn lineage(&self, id: &str) -> Result<Vec<String>> {
        self.read()?.lineage(id)
    }

    pub fn winning_path(&self) -> Result<Option<Vec<Position>>> {
        Ok(self.read()?.winning_path())
    }

    pub fn classify(&self, id: &str) -> Result<DisplayStyle> {
        let forest = self.read()?;
        let style = Classifier::new(forest.explorations()).style(id);
        style.ok_or_else(|| ExplorerError::ExplorationNotFound(id.to_string()))
    }

    /// Styles for every exploration, resolved against one consistent view.
    pub fn classify_all(&self) -> Result<BTreeMap<String, DisplayStyle>> {
        let forest = self.read()?;
        let styles = Classifier::new(forest.explorations()).classify_all();
        Ok(styles)
    }

    pub fn to_document(&self) -> Result<ForestDocument> {
        Ok(ForestDocument::capture(&*self.read()?))
    }

    pub fn from_document(document: ForestDocument) -> Result<Self> {
        Ok(Self::from_forest(document.into_forest()?))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_document()?.save(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_document(ForestDocument::load(path)?)
    }
}
