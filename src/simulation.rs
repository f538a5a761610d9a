use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::automaton::{Board, DEAD, NEWBORN, advance, set_cell};
use crate::mapper::{SonificationMapper, TickReport};

/// Read-only view of the simulation published after every change.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub board: Arc<Board>,
    pub generation: u64,
    pub running: bool,
    pub root: usize,
    pub active: usize,
}

/// Board plus generation counter. Every change replaces the board with a new
/// immutable snapshot.
pub struct Simulation {
    board: Arc<Board>,
    generation: u64,
    running: bool,
    density: f64,
    rng: StdRng,
}

impl Simulation {
    pub fn new(rows: usize, cols: usize, density: f64, mut rng: StdRng) -> Self {
        let board = Board::initialize(rows, cols, true, density, &mut rng);
        Self {
            board: Arc::new(board),
            generation: 0,
            running: true,
            density,
            rng,
        }
    }

    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn step(&mut self) -> u64 {
        self.board = Arc::new(advance(&self.board));
        self.generation += 1;
        self.generation
    }

    pub fn reinitialize(&mut self, randomize: bool) {
        let board = Board::initialize(
            self.board.rows(),
            self.board.cols(),
            randomize,
            self.density,
            &mut self.rng,
        );
        self.board = Arc::new(board);
        self.generation = 0;
        debug!(randomize, "board reinitialized");
    }

    pub fn set_cell(&mut self, row: usize, col: usize, alive: bool) {
        let age = if alive { NEWBORN } else { DEAD };
        self.board = Arc::new(set_cell(&self.board, row, col, age));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimControl {
    Start,
    Pause,
    Toggle,
    Step,
    Reinitialize { randomize: bool },
    SetCell { row: usize, col: usize, alive: bool },
}

/// Simulation and sonification driven together: every board change is
/// followed by one mapper pass over the new snapshot.
pub struct Session {
    simulation: Simulation,
    mapper: SonificationMapper,
    last_report: TickReport,
}

impl Session {
    pub fn new(simulation: Simulation, mapper: SonificationMapper) -> Self {
        let mut session = Self {
            simulation,
            mapper,
            last_report: TickReport::default(),
        };
        session.sonify();
        session
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn mapper(&self) -> &SonificationMapper {
        &self.mapper
    }

    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    /// Clock tick: advances only while running. Returns whether it did.
    pub fn tick(&mut self) -> bool {
        if !self.simulation.is_running() {
            return false;
        }
        self.simulation.step();
        self.sonify();
        true
    }

    pub fn apply(&mut self, control: SimControl) {
        match control {
            SimControl::Start => self.simulation.start(),
            SimControl::Pause => self.simulation.pause(),
            SimControl::Toggle => {
                if self.simulation.is_running() {
                    self.simulation.pause();
                } else {
                    self.simulation.start();
                }
            }
            SimControl::Step => {
                self.simulation.step();
                self.sonify();
            }
            SimControl::Reinitialize { randomize } => {
                self.simulation.reinitialize(randomize);
                self.sonify();
            }
            SimControl::SetCell { row, col, alive } => {
                self.simulation.set_cell(row, col, alive);
                self.sonify();
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: Arc::clone(self.simulation.board()),
            generation: self.simulation.generation(),
            running: self.simulation.is_running(),
            root: self.mapper.root(),
            active: self.last_report.active,
        }
    }

    fn sonify(&mut self) {
        self.last_report = self
            .mapper
            .step(self.simulation.board(), self.simulation.generation());
    }
}

pub struct ClockHandle {
    pub control: mpsc::UnboundedSender<SimControl>,
    pub snapshots: watch::Receiver<Snapshot>,
    pub task: JoinHandle<()>,
}

/// Runs `session` on a fixed tick on `runtime`. The task ends once every
/// control sender is dropped.
pub fn spawn_clock(runtime: &Runtime, session: Session, tick: Duration) -> ClockHandle {
    let (control_tx, mut control_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
    let mut session = session;

    let task = runtime.spawn(async move {
        info!(tick_ms = tick.as_millis() as u64, "simulation clock started");
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !session.tick() {
                        continue;
                    }
                }
                control = control_rx.recv() => match control {
                    Some(control) => session.apply(control),
                    None => break,
                },
            }
            snapshot_tx.send_replace(session.snapshot());
        }
        info!("simulation clock stopped");
    });

    ClockHandle {
        control: control_tx,
        snapshots: snapshot_rx,
        task,
    }
}
