// swarm.rs - Concurrent explorer swarm over one shared maze engine
//
// Each task walks a single exploration until it dies, wins, stalls or forks.
// Forks enqueue one task per child, so the pool fans out as the maze opens up.

use anyhow::{anyhow, Result};
use maze_explorer::{ExplorerError, MazeEngine, MoveStatus};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

pub const ROOT_ID: &str = "root";

#[derive(Debug, Clone)]
pub struct ExploreTask {
    pub exploration_id: String,
    pub enqueued_at: Instant,
}

impl ExploreTask {
    pub fn new(exploration_id: impl Into<String>) -> Self {
        Self {
            exploration_id: exploration_id.into(),
            enqueued_at: Instant::now(),
        }
    }
}

/// Work queue that closes itself once nothing is queued or in flight.
pub struct ExploreQueue {
    sender: std::sync::Mutex<Option<mpsc::UnboundedSender<ExploreTask>>>,
    receiver: Mutex<mpsc::UnboundedReceiver<ExploreTask>>,
    outstanding: AtomicUsize,
}

impl ExploreQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender: std::sync::Mutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
            outstanding: AtomicUsize::new(0),
        }
    }

    pub fn enqueue(&self, task: ExploreTask) -> Result<()> {
        let guard = self.sender.lock().map_err(|_| anyhow!("queue lock poisoned"))?;
        let sender = guard.as_ref().ok_or_else(|| anyhow!("queue closed"))?;
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        if sender.send(task).is_err() {
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
            return Err(anyhow!("queue closed"));
        }
        Ok(())
    }

    pub async fn dequeue(&self) -> Option<ExploreTask> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }

    /// Mark one dequeued task finished. The last one closes the queue, which
    /// lets every idle worker fall out of `dequeue`.
    pub fn complete(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.close();
        }
    }

    pub fn close(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct SwarmSettings {
    pub workers: usize,
    /// Keep exploring after the goal has been found.
    pub exhaustive: bool,
    pub step_delay: Duration,
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            exhaustive: false,
            step_delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
pub struct SwarmStats {
    tasks: AtomicU64,
    moves: AtomicU64,
    branches: AtomicU64,
    collisions: AtomicU64,
    stalled: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwarmReport {
    pub tasks: u64,
    pub moves: u64,
    pub branches: u64,
    pub collisions: u64,
    pub stalled: u64,
    pub elapsed: Duration,
}

impl SwarmStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn report(&self, elapsed: Duration) -> SwarmReport {
        SwarmReport {
            tasks: self.tasks.load(Ordering::Acquire),
            moves: self.moves.load(Ordering::Acquire),
            branches: self.branches.load(Ordering::Acquire),
            collisions: self.collisions.load(Ordering::Acquire),
            stalled: self.stalled.load(Ordering::Acquire),
            elapsed,
        }
    }
}

struct SwarmShared {
    engine: Arc<MazeEngine>,
    queue: ExploreQueue,
    stats: SwarmStats,
    settings: SwarmSettings,
    next_child: AtomicUsize,
}

impl SwarmShared {
    fn child_id(&self) -> String {
        format!("s{}", self.next_child.fetch_add(1, Ordering::Relaxed))
    }

    /// Walk `id` forward until it can no longer make progress on its own.
    async fn walk(&self, id: &str) -> Result<()> {
        loop {
            let status = self.engine.exploration_status(id)?;
            if status.goal_reached_by_any && !self.settings.exhaustive {
                return Ok(());
            }

            match status.available_moves.as_slice() {
                [] => {
                    SwarmStats::bump(&self.stats.stalled);
                    log::debug!("'{}' boxed in by other explorers", id);
                    return Ok(());
                }
                [only] => {
                    let outcome = match self.engine.move_exploration(id, only.target_position) {
                        Ok(outcome) => outcome,
                        Err(ExplorerError::ExplorationComplete(_)) => return Ok(()),
                        Err(e) => return Err(e.into()),
                    };
                    match outcome.status {
                        MoveStatus::Continue | MoveStatus::Junction => SwarmStats::bump(&self.stats.moves),
                        MoveStatus::DeadEnd | MoveStatus::GoalReached => {
                            SwarmStats::bump(&self.stats.moves);
                            return Ok(());
                        }
                        MoveStatus::Blocked | MoveStatus::Collision => SwarmStats::bump(&self.stats.collisions),
                    }
                }
                options => {
                    if self.fork(id, options)? > 0 {
                        return Ok(());
                    }
                }
            }

            if self.settings.step_delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.settings.step_delay).await;
            }
        }
    }

    /// Branch one child per open direction. Returns how many were created.
    fn fork(&self, parent: &str, options: &[maze_explorer::AvailableMove]) -> Result<usize> {
        let mut spawned = 0;
        for option in options {
            let outcome = loop {
                let child = self.child_id();
                match self.engine.branch(parent, &child, option.target_position) {
                    Ok(outcome) => break Some((child, outcome)),
                    Err(ExplorerError::DuplicateExploration(_)) => continue,
                    Err(ExplorerError::ExplorationNotFound(_)) => break None,
                    Err(e) => return Err(e.into()),
                }
            };
            let Some((child, outcome)) = outcome else {
                break;
            };

            match outcome.status {
                MoveStatus::Continue | MoveStatus::Junction => {
                    spawned += 1;
                    SwarmStats::bump(&self.stats.branches);
                    self.queue.enqueue(ExploreTask::new(child))?;
                }
                MoveStatus::DeadEnd | MoveStatus::GoalReached => {
                    spawned += 1;
                    SwarmStats::bump(&self.stats.branches);
                }
                MoveStatus::Blocked | MoveStatus::Collision => SwarmStats::bump(&self.stats.collisions),
            }
        }
        if spawned > 0 {
            log::debug!("'{}' forked into {} explorations", parent, spawned);
        }
        Ok(spawned)
    }
}

/// Worker pool racing explorers through one engine.
pub struct Swarm {
    shared: Arc<SwarmShared>,
    workers: Vec<tokio::task::JoinHandle<()>>,
    started: Instant,
}

impl Swarm {
    /// Seed the queue and start the workers. A fresh engine gets a root at
    /// the maze start; a restored one resumes every still-active exploration.
    pub fn start(engine: Arc<MazeEngine>, settings: SwarmSettings) -> Result<Self> {
        let snapshot = engine.snapshot()?;
        let mut seeds: Vec<String> = snapshot
            .explorations
            .values()
            .filter(|e| e.is_active)
            .map(|e| e.id.clone())
            .collect();

        if snapshot.explorations.is_empty() {
            let outcome = engine.move_exploration(ROOT_ID, engine.grid().start())?;
            log::info!("{}: {}", ROOT_ID, outcome.message);
            if matches!(outcome.status, MoveStatus::Continue | MoveStatus::Junction) {
                seeds.push(ROOT_ID.to_string());
            }
        }

        let shared = Arc::new(SwarmShared {
            engine,
            queue: ExploreQueue::new(),
            stats: SwarmStats::default(),
            next_child: AtomicUsize::new(snapshot.explorations.len() + 1),
            settings,
        });

        for id in &seeds {
            shared.queue.enqueue(ExploreTask::new(id.as_str()))?;
        }
        if seeds.is_empty() {
            log::info!("Nothing left to explore");
            shared.queue.close();
        }

        let mut swarm = Self {
            shared,
            workers: Vec::new(),
            started: Instant::now(),
        };
        swarm.start_workers();
        Ok(swarm)
    }

    fn start_workers(&mut self) {
        let count = self.shared.settings.workers.max(1);
        for worker_id in 0..count {
            let shared = Arc::clone(&self.shared);

            let handle = tokio::spawn(async move {
                log::info!("Worker {} started", worker_id);

                while let Some(task) = shared.queue.dequeue().await {
                    log::debug!(
                        "Worker {} walking '{}' (queued {:?})",
                        worker_id,
                        task.exploration_id,
                        task.enqueued_at.elapsed()
                    );
                    SwarmStats::bump(&shared.stats.tasks);
                    if let Err(e) = shared.walk(&task.exploration_id).await {
                        log::error!("Worker {} failed on '{}': {}", worker_id, task.exploration_id, e);
                    }
                    shared.queue.complete();
                }

                log::info!("Worker {} shutting down", worker_id);
            });

            self.workers.push(handle);
        }
    }

    /// Wait for the queue to drain and every worker to exit.
    pub async fn wait(mut self) -> SwarmReport {
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                log::error!("Worker task aborted: {}", e);
            }
        }
        log::debug!("Swarm drained, {} tasks outstanding", self.shared.queue.outstanding());
        self.shared.stats.report(self.started.elapsed())
    }
}
