// generate.rs - Generation and classification throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maze_explorer::{generate, Classifier, MazeEngine, MoveStatus};

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for size in [31usize, 101, 301] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| generate(black_box(size), black_box(size), 42))
        });
    }
    group.finish();
}

/// Flood the maze with one exploration per branch so the forest has depth.
fn explored_engine(size: usize) -> MazeEngine {
    let engine = MazeEngine::generate(size, size, 7).expect("valid dimensions");
    let start = engine.grid().start();
    engine.move_exploration("e0", start).expect("fresh engine");

    let mut frontier = vec!["e0".to_string()];
    let mut next_id = 1;
    while let Some(id) = frontier.pop() {
        loop {
            let status = engine.exploration_status(&id).expect("known id");
            if status.available_moves.is_empty() {
                break;
            }
            if status.available_moves.len() == 1 {
                let outcome = engine
                    .move_exploration(&id, status.available_moves[0].target_position)
                    .expect("active exploration");
                if outcome.status != MoveStatus::Continue && outcome.status != MoveStatus::Junction {
                    break;
                }
                continue;
            }
            for m in &status.available_moves {
                let child = format!("e{next_id}");
                next_id += 1;
                let outcome = engine.branch(&id, &child, m.target_position).expect("valid branch");
                if matches!(outcome.status, MoveStatus::Continue | MoveStatus::Junction) {
                    frontier.push(child);
                }
            }
            break;
        }
    }
    engine
}

fn bench_classify(c: &mut Criterion) {
    let engine = explored_engine(101);
    let snapshot = engine.snapshot().expect("snapshot");
    c.bench_function("classify_all_101", |b| {
        b.iter(|| Classifier::new(black_box(&snapshot.explorations)).classify_all())
    });
}

criterion_group!(benches, bench_generate, bench_classify);
criterion_main!(benches);
