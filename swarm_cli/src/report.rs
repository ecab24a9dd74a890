// report.rs - Text output for the exploration tree, stats and solved maze

use crate::swarm::SwarmReport;
use maze_explorer::{DisplayStyle, Exploration, ForestSnapshot, ForestStats, Grid, Position, StatusReport};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

fn state_label(exploration: &Exploration) -> &'static str {
    if exploration.found_goal {
        "GOAL"
    } else if exploration.is_dead {
        "DEAD"
    } else if exploration.is_active {
        "ACTIVE"
    } else if exploration.is_complete {
        "COMPLETE"
    } else {
        "UNKNOWN"
    }
}

/// Indented spawn tree, children in creation order. With `only` set, nodes
/// outside that id set are skipped.
pub fn render_tree(
    snapshot: &ForestSnapshot,
    styles: &BTreeMap<String, DisplayStyle>,
    only: Option<&HashSet<String>>,
) -> String {
    let stats = &snapshot.global_stats;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Exploration tree: {} total, {} active, goal {}, {} cells visited",
        stats.total_explorations,
        stats.active_explorations,
        if stats.goal_found { "found" } else { "not found" },
        stats.visited_positions
    );
    if snapshot.explorations.is_empty() {
        out.push_str("  (no explorations yet)\n");
        return out;
    }

    let explorations = &snapshot.explorations;
    let is_root = |e: &Exploration| {
        e.parent_id
            .as_deref()
            .map_or(true, |parent| !explorations.contains_key(parent))
    };

    let mut stack: Vec<(&Exploration, usize)> = explorations
        .values()
        .filter(|e| is_root(*e))
        .rev()
        .map(|e| (e, 0))
        .collect();
    let mut printed: HashSet<&str> = HashSet::new();

    while let Some((exploration, depth)) = stack.pop() {
        if !printed.insert(exploration.id.as_str()) {
            continue;
        }
        if only.map_or(true, |ids| ids.contains(&exploration.id)) {
            let class = styles
                .get(&exploration.id)
                .map(|s| format!("{} {}", s.class, s.color().hex()))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{:indent$}{} [{}] gen {} | {} | {} cells, now at {}",
                "",
                exploration.id,
                state_label(exploration),
                exploration.generation,
                class,
                exploration.path.len(),
                exploration.current_position,
                indent = 2 + depth * 2
            );
        }
        for child in exploration.child_ids.iter().rev() {
            if let Some(child) = explorations.get(child) {
                stack.push((child, depth + 1));
            }
        }
    }
    out
}

pub fn render_stats(stats: &ForestStats) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Explorations: {} total, {} active, {} complete, {} dead, {} successful",
        stats.total_explorations,
        stats.active_explorations,
        stats.complete_explorations,
        stats.dead_explorations,
        stats.successful_explorations
    );
    let _ = writeln!(
        out,
        "Visited cells: {}, peak concurrency: {}",
        stats.visited_positions, stats.max_concurrent
    );
    match &stats.winning_id {
        Some(id) => {
            let _ = writeln!(out, "Goal reached by {id}");
        }
        None => out.push_str("Goal not reached\n"),
    }
    out
}

pub fn render_swarm(report: &SwarmReport) -> String {
    format!(
        "Swarm: {} tasks, {} moves, {} branches, {} collisions, {} stalled in {:.2?}\n",
        report.tasks, report.moves, report.branches, report.collisions, report.stalled, report.elapsed
    )
}

/// The maze with `path` overlaid as `*`; start and goal keep their glyphs.
pub fn render_maze(grid: &Grid, path: &[Position]) -> String {
    let on_path: HashSet<Position> = path.iter().copied().collect();
    let mut out = String::with_capacity((grid.width() + 1) * grid.height());
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let pos = Position::new(x, y);
            let glyph = grid.cell(pos).map_or('?', |c| c.glyph());
            out.push(if glyph == ' ' && on_path.contains(&pos) { '*' } else { glyph });
        }
        out.push('\n');
    }
    out
}

pub fn render_status(pos: Position, status: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Status at {pos}:");
    let _ = writeln!(out, "  explored: {}", status.is_explored);
    let _ = writeln!(out, "  junction: {}", status.is_junction);
    let _ = writeln!(out, "  goal: {}", status.is_goal);
    let _ = writeln!(out, "  goal reached by any: {}", status.goal_reached_by_any);
    if status.available_moves.is_empty() {
        out.push_str("  no moves available\n");
    }
    for m in &status.available_moves {
        let _ = writeln!(out, "  {} -> {}", m.direction, m.target_position);
    }
    out
}
