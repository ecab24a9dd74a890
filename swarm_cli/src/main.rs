// main.rs - maze-swarm: generate mazes, race explorer swarms through them and
// inspect the resulting exploration trees.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use maze_explorer::{ExplorerConfig, MazeEngine, Position};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod report;
mod swarm;

use crate::swarm::{Swarm, SwarmSettings};

/// CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a maze and print it
    Generate {
        #[command(flatten)]
        maze: MazeArgs,

        /// Write an empty snapshot of the maze here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a swarm of explorers through a maze
    Explore(ExploreArgs),

    /// Print the exploration tree stored in a snapshot
    Tree {
        snapshot: PathBuf,

        /// Only show the winner's lineage
        #[arg(long)]
        winner_only: bool,

        /// Print the snapshot view and display styles as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query one position of a saved snapshot
    Status {
        snapshot: PathBuf,

        #[arg(short, allow_negative_numbers = true)]
        x: i32,

        #[arg(short, allow_negative_numbers = true)]
        y: i32,

        /// Print the status record as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct MazeArgs {
    /// Maze width, rounded up to odd (default: MAZE_WIDTH or 31)
    #[arg(short = 'W', long)]
    width: Option<usize>,

    /// Maze height, rounded up to odd (default: MAZE_HEIGHT or 31)
    #[arg(short = 'H', long)]
    height: Option<usize>,

    /// Generation seed (default: MAZE_SEED or 42)
    #[arg(short, long)]
    seed: Option<u64>,
}

impl MazeArgs {
    fn config(&self) -> ExplorerConfig {
        let env = ExplorerConfig::from_env();
        ExplorerConfig {
            width: self.width.unwrap_or(env.width),
            height: self.height.unwrap_or(env.height),
            seed: self.seed.unwrap_or(env.seed),
        }
    }
}

#[derive(Args, Debug)]
struct ExploreArgs {
    #[command(flatten)]
    maze: MazeArgs,

    /// Continue a saved snapshot instead of generating a maze
    #[arg(short, long, conflicts_with_all = ["width", "height", "seed"])]
    resume: Option<PathBuf>,

    /// Worker tasks (default: SWARM_WORKERS or the number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Keep exploring after the goal is found
    #[arg(long)]
    exhaustive: bool,

    /// Pause between steps of one explorer, in milliseconds
    #[arg(long, default_value = "0")]
    step_delay_ms: u64,

    /// Save the final snapshot here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the exploration tree when done
    #[arg(long)]
    tree: bool,
}

fn default_workers() -> usize {
    std::env::var("SWARM_WORKERS")
        .unwrap_or_else(|_| num_cpus::get().to_string())
        .parse()
        .unwrap_or_else(|_| num_cpus::get())
}

fn load_engine(path: &Path) -> Result<MazeEngine> {
    MazeEngine::load(path).with_context(|| format!("loading snapshot {}", path.display()))
}

fn run_generate(maze: &MazeArgs, output: Option<&Path>) -> Result<()> {
    let config = maze.config();
    let engine = MazeEngine::from_config(&config).context("generating maze")?;
    let grid = engine.grid();
    println!("{grid}");
    println!(
        "{}x{} seed {}: start {}, goal {}",
        grid.width(),
        grid.height(),
        config.seed,
        grid.start(),
        grid.goal()
    );

    if let Some(path) = output {
        engine
            .save(path)
            .with_context(|| format!("saving snapshot {}", path.display()))?;
    }
    Ok(())
}

async fn run_explore(args: ExploreArgs) -> Result<()> {
    let engine = match &args.resume {
        Some(path) => load_engine(path)?,
        None => MazeEngine::from_config(&args.maze.config()).context("generating maze")?,
    };
    let engine = Arc::new(engine);

    let settings = SwarmSettings {
        workers: args.workers.unwrap_or_else(default_workers),
        exhaustive: args.exhaustive,
        step_delay: Duration::from_millis(args.step_delay_ms),
    };
    info!(
        "Exploring {}x{} maze with {} workers",
        engine.grid().width(),
        engine.grid().height(),
        settings.workers
    );

    let report = Swarm::start(Arc::clone(&engine), settings)?.wait().await;
    print!("{}", report::render_swarm(&report));
    print!("{}", report::render_stats(&engine.stats()?));

    let path = engine.winning_path()?.unwrap_or_default();
    if !path.is_empty() {
        println!("Winning path: {} cells", path.len());
    }
    print!("{}", report::render_maze(engine.grid(), &path));

    if args.tree {
        let snapshot = engine.snapshot()?;
        print!("{}", report::render_tree(&snapshot, &engine.classify_all()?, None));
    }

    if let Some(path) = &args.output {
        engine
            .save(path)
            .with_context(|| format!("saving snapshot {}", path.display()))?;
    }
    Ok(())
}

fn run_tree(path: &Path, winner_only: bool, json: bool) -> Result<()> {
    let engine = load_engine(path)?;
    let snapshot = engine.snapshot()?;
    let styles = engine.classify_all()?;

    if json {
        let body = serde_json::json!({ "tree": snapshot, "styles": styles });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let lineage: Option<HashSet<String>> = match (winner_only, snapshot.global_stats.winning_id.as_deref()) {
        (false, _) => None,
        (true, Some(winner)) => Some(engine.lineage(winner)?.into_iter().collect()),
        (true, None) => {
            println!("Goal not reached yet; showing every exploration");
            None
        }
    };
    print!("{}", report::render_tree(&snapshot, &styles, lineage.as_ref()));
    Ok(())
}

fn run_status(path: &Path, pos: Position, json: bool) -> Result<()> {
    let engine = load_engine(path)?;
    let status = engine
        .query_status(pos)
        .with_context(|| format!("querying {pos}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", report::render_status(pos, &status));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    info!("Starting with {cli:?}");

    match cli.command {
        Command::Generate { maze, output } => run_generate(&maze, output.as_deref()),
        Command::Explore(args) => run_explore(args).await,
        Command::Tree {
            snapshot,
            winner_only,
            json,
        } => run_tree(&snapshot, winner_only, json),
        Command::Status { snapshot, x, y, json } => run_status(&snapshot, Position::new(x, y), json),
    }
}
