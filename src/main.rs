use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use life_synth::{
    cli::Args,
    config::AppConfig,
    make_rng,
    mapper::SonificationMapper,
    mixer::Mixer,
    output::{AudioEngine, SynthPipeline},
    simulation::{ClockHandle, Session, SimControl, Simulation, Snapshot, spawn_clock},
};
use macroquad::{prelude::*, text::measure_text};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SCREEN_WIDTH: f32 = 1280.0;
const SCREEN_HEIGHT: f32 = 720.0;
const HEADER_HEIGHT: f32 = 64.0;
const MARGIN: f32 = 24.0;
const CELL_GAP: f32 = 1.0;
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const AMBER: Color = Color {
    r: 0.98,
    g: 0.66,
    b: 0.12,
    a: 1.0,
};
const AMBER_DIM: Color = Color {
    r: 0.78,
    g: 0.52,
    b: 0.08,
    a: 0.4,
};
const BACKGROUND: Color = Color {
    r: 0.02,
    g: 0.02,
    b: 0.02,
    a: 1.0,
};
const DEAD_CELL: Color = Color {
    r: 0.06,
    g: 0.05,
    b: 0.04,
    a: 1.0,
};

#[macroquad::main(window_conf)]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = AppConfig::load_or_default(&args.config);
    info!(
        rows = config.board.rows,
        cols = config.board.cols,
        tick_ms = config.simulation.tick_ms,
        "starting life synth"
    );

    let runtime = Runtime::new().expect("tokio runtime");
    let (mapper, bank) = SonificationMapper::new(
        config.schedule.clone(),
        config.scales,
        &config.voices,
        make_rng(args.seed.map(|seed| seed.wrapping_add(1))),
    );

    let _audio = if args.mute {
        // Closing the queue makes every voice command a no-op.
        drop(bank);
        info!("audio muted");
        None
    } else {
        let pipeline = Arc::new(Mutex::new(SynthPipeline::new(
            bank,
            Mixer::new(config.audio.master_volume),
        )));
        match AudioEngine::start(pipeline) {
            Ok(engine) => Some(engine),
            Err(err) => {
                error!("audio output unavailable, continuing silently: {err:#}");
                None
            }
        }
    };

    let mut simulation = Simulation::new(
        config.board.rows,
        config.board.cols,
        config.board.density,
        make_rng(args.seed),
    );
    if !config.simulation.start_running {
        simulation.pause();
    }
    let session = Session::new(simulation, mapper);
    let ClockHandle {
        control,
        mut snapshots,
        task: _clock,
    } = spawn_clock(
        &runtime,
        session,
        Duration::from_millis(config.simulation.tick_ms),
    );

    let mut snapshot = snapshots.borrow().clone();
    let mut painter = CellPainter::default();
    loop {
        if snapshots.has_changed().unwrap_or(false) {
            snapshot = snapshots.borrow_and_update().clone();
        }
        let layout = BoardLayout::fit(&snapshot);
        handle_keys(&control);
        painter.update(&layout, &control);
        draw_scene(&snapshot, &layout);
        next_frame().await;
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Life Synth".into(),
        fullscreen: false,
        sample_count: 1,
        window_width: SCREEN_WIDTH as i32,
        window_height: SCREEN_HEIGHT as i32,
        high_dpi: false,
        ..Default::default()
    }
}

struct BoardLayout {
    origin: Vec2,
    cell: f32,
    rows: usize,
    cols: usize,
}

impl BoardLayout {
    fn fit(snapshot: &Snapshot) -> Self {
        let rows = snapshot.board.rows();
        let cols = snapshot.board.cols();
        let avail_w = SCREEN_WIDTH - MARGIN * 2.0;
        let avail_h = SCREEN_HEIGHT - HEADER_HEIGHT - MARGIN * 2.0;
        let cell = (avail_w / cols as f32).min(avail_h / rows as f32).floor().max(2.0);
        let board_w = cell * cols as f32;
        let origin = vec2(
            (SCREEN_WIDTH - board_w) * 0.5,
            HEADER_HEIGHT + MARGIN,
        );
        Self {
            origin,
            cell,
            rows,
            cols,
        }
    }

    fn cell_rect(&self, row: usize, col: usize) -> Rect {
        Rect::new(
            self.origin.x + col as f32 * self.cell,
            self.origin.y + row as f32 * self.cell,
            self.cell - CELL_GAP,
            self.cell - CELL_GAP,
        )
    }

    fn hit_test(&self, point: Vec2) -> Option<(usize, usize)> {
        let local = point - self.origin;
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let row = (local.y / self.cell) as usize;
        let col = (local.x / self.cell) as usize;
        (row < self.rows && col < self.cols).then_some((row, col))
    }
}

// Left button paints live cells, right button clears them. Each cell is sent
// once per stroke.
#[derive(Default)]
struct CellPainter {
    last: Option<(usize, usize, bool)>,
}

impl CellPainter {
    fn update(&mut self, layout: &BoardLayout, control: &UnboundedSender<SimControl>) {
        let alive = if is_mouse_button_down(MouseButton::Left) {
            true
        } else if is_mouse_button_down(MouseButton::Right) {
            false
        } else {
            self.last = None;
            return;
        };
        let (x, y) = mouse_position();
        let Some((row, col)) = layout.hit_test(vec2(x, y)) else {
            return;
        };
        if self.last == Some((row, col, alive)) {
            return;
        }
        self.last = Some((row, col, alive));
        let _ = control.send(SimControl::SetCell { row, col, alive });
    }
}

fn handle_keys(control: &UnboundedSender<SimControl>) {
    let command = if is_key_pressed(KeyCode::Space) {
        Some(SimControl::Toggle)
    } else if is_key_pressed(KeyCode::S) || is_key_pressed(KeyCode::Right) {
        Some(SimControl::Step)
    } else if is_key_pressed(KeyCode::R) {
        Some(SimControl::Reinitialize { randomize: true })
    } else if is_key_pressed(KeyCode::C) {
        Some(SimControl::Reinitialize { randomize: false })
    } else {
        None
    };
    if let Some(command) = command {
        let _ = control.send(command);
    }
}

fn draw_scene(snapshot: &Snapshot, layout: &BoardLayout) {
    clear_background(BACKGROUND);
    draw_header(snapshot);
    for (row, ages) in snapshot.board.iter_rows().enumerate() {
        for (col, age) in ages.iter().enumerate() {
            let rect = layout.cell_rect(row, col);
            draw_rectangle(rect.x, rect.y, rect.w, rect.h, age_color(*age));
        }
    }
    let frame = Rect::new(
        layout.origin.x - 2.0,
        layout.origin.y - 2.0,
        layout.cell * layout.cols as f32 + 3.0,
        layout.cell * layout.rows as f32 + 3.0,
    );
    draw_rectangle_lines(frame.x, frame.y, frame.w, frame.h, 1.0, AMBER_DIM);
}

fn draw_header(snapshot: &Snapshot) {
    let status = if snapshot.running { "RUNNING" } else { "PAUSED" };
    let text = format!(
        "GENERATION {}   KEY {}   ACTIVE {}   {}",
        snapshot.generation,
        NOTE_NAMES[snapshot.root % NOTE_NAMES.len()],
        snapshot.active,
        status
    );
    draw_centered_text(&text, Rect::new(0.0, 8.0, SCREEN_WIDTH, 28.0), 28);
    draw_centered_text(
        "SPACE start/pause   S step   R randomize   C clear   LMB/RMB paint",
        Rect::new(0.0, 36.0, SCREEN_WIDTH, 20.0),
        18,
    );
}

fn age_color(age: u8) -> Color {
    match age {
        0 => DEAD_CELL,
        7 => AMBER_DIM,
        age => {
            // Newborn cells are brightest, fading as they age.
            let t = 1.0 - (age as f32 - 1.0) / 6.0;
            Color::new(AMBER.r, AMBER.g * (0.5 + 0.5 * t), AMBER.b, 0.45 + 0.55 * t)
        }
    }
}

fn draw_centered_text(text: &str, rect: Rect, size: u16) {
    let measure = measure_text(text, None, size, 1.0);
    let x = rect.x + rect.w * 0.5 - measure.width * 0.5;
    let y = rect.y + rect.h * 0.5 + measure.height * 0.5;
    draw_text_ex(
        text,
        x,
        y,
        TextParams {
            font_size: size,
            color: AMBER,
            ..Default::default()
        },
    );
}
