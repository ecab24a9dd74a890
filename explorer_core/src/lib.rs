// lib.rs - Library exports for maze-explorer-core
// Seeded maze generation, the shared exploration forest and its display classifier

pub mod classify;
pub mod config;
pub mod engine;
pub mod error_handling;
pub mod forest;
pub mod generator;
pub mod grid;
pub mod persistence;
pub mod types;

// Re-export commonly used types
pub use classify::{classify, Classifier, DisplayClass, DisplayStyle, Rgb, PALETTE_SIZE};
pub use config::ExplorerConfig;
pub use engine::MazeEngine;
pub use error_handling::{ExplorerError, Result};
pub use forest::{
    Exploration, ExplorationForest, ForestSnapshot, ForestStats, MoveOutcome, MoveStatus, StatusReport,
};
pub use generator::{generate, generate_with_rng};
pub use grid::Grid;
pub use persistence::{ForestDocument, ForestMetadata};
pub use types::{AvailableMove, Cell, Direction, Position};
