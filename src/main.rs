//! Kunai Simulation Runner
//!
//! Runs a scripted session headless, then replays the recording on a fresh
//! simulation and checks that both runs end on the same state hash.
//!
//! Usage: `kunai-sim [config.json] [script.json]`

use anyhow::{Context, Result};
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kunai::{
    Event, InputFrame, InputRecording, InputScript, Listener, SimConfig, Simulation, TICK_RATE, VERSION,
    game::{
        bus::EventQueue,
        events::Facing,
        input::Command,
        level::Layout,
        tick::verify_replay,
    },
};

/// Demo level size in tiles.
const DEMO_WIDTH: usize = 200;
const DEMO_HEIGHT: usize = 60;

/// Length of the built-in session.
const DEMO_TICKS: u32 = 600;

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Kunai Simulation v{}", VERSION);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::from_file(&path).with_context(|| format!("loading config {path}"))?,
        None => SimConfig::default(),
    };
    let recording = match args.next() {
        Some(path) => InputScript::from_file(&path)
            .and_then(|script| script.to_recording())
            .with_context(|| format!("loading script {path}"))?,
        None => demo_recording(&config),
    };

    info!("Tick Rate: {} Hz (default {})", config.tick_rate, TICK_RATE);
    info!("Session: {} ticks, {} input changes", recording.tick_count(), recording.deltas().len());

    let layout = demo_layout().context("building demo level")?;

    // Recorded run, with an event log attached
    let mut sim = Simulation::new(config.clone());
    sim.load_level(layout.clone(), Vec::new());
    sim.register_listener(Box::new(EventLog::default()));
    let expected = run_session(&mut sim, &recording);

    // Round-trip the recording and replay it on a fresh simulation
    let bytes = recording.to_bytes().context("encoding recording")?;
    let decoded = InputRecording::from_bytes(&bytes).context("decoding recording")?;
    info!("Recording: {} bytes, digest {}", bytes.len(), hex::encode(decoded.digest()));

    let mut fresh = Simulation::new(config);
    fresh.load_level(layout, Vec::new());
    match verify_replay(&mut fresh, &decoded, &expected) {
        Ok(()) => info!("Replay verified: {}", hex::encode(expected)),
        Err(e) => {
            warn!("Replay failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

/// Play a recording tick by tick, reporting progress once per second.
fn run_session(sim: &mut Simulation, recording: &InputRecording) -> kunai::core::StateHash {
    let ticks = recording.tick_count();
    let report_every = sim.config().tick_rate.max(1);
    let mut dispatched = 0;

    for t in 0..ticks {
        for command in recording.commands_at(t) {
            sim.post(command.to_event());
        }
        let result = sim.step(&recording.frame_at(t));
        dispatched += result.dispatched;

        if result.tick % report_every == 0 {
            for character in sim.characters() {
                info!(
                    "Tick {}: character {} at ({:.1}, {:.1}) {:?}",
                    result.tick, character.id, character.pos.x, character.pos.y, character.state
                );
            }
        }
    }

    let hash = sim.compute_hash();
    info!("=== Session Complete ===");
    info!("Ticks: {}, events dispatched: {}", sim.tick_count(), dispatched);
    info!("State hash: {}", hex::encode(hash));
    hash
}

/// Floor, a raised platform run, a step ledge and a wall on the right.
fn demo_layout() -> Result<Layout, kunai::game::level::LevelError> {
    let mut text = String::with_capacity((DEMO_WIDTH + 1) * DEMO_HEIGHT);
    for y in 0..DEMO_HEIGHT {
        for x in 0..DEMO_WIDTH {
            let c = match (x, y) {
                (_, 50..) => '#',
                (180.., _) => '#',
                (60..=90, 40) => '=',
                (120..=140, 44) => '^',
                _ => '.',
            };
            text.push(c);
        }
        text.push('\n');
    }
    Layout::from_ascii(&text)
}

/// Join, spawn, start, then walk, jump and use every ability.
fn demo_recording(config: &SimConfig) -> InputRecording {
    let mut recording = InputRecording::new();
    recording.record_command(0, Command::Join { name: config.player_name_for(1) });
    recording.record_command(1, Command::Spawn { pos: config.spawn });
    recording.record(2, InputFrame::new().with(InputFrame::FLAG_START));

    for t in 3..DEMO_TICKS {
        let frame = match t {
            3..=89 => InputFrame::new(),
            90..=179 => InputFrame::walking(Facing::Right),
            180 => InputFrame::walking(Facing::Right).with(InputFrame::FLAG_JUMP),
            200 => InputFrame::walking(Facing::Right).with(InputFrame::FLAG_JUMP),
            181..=259 => InputFrame::walking(Facing::Right),
            260 => InputFrame::new().with(InputFrame::FLAG_THROW_KNIFE),
            300 => InputFrame::new().with(InputFrame::FLAG_PUNCH),
            330..=399 => InputFrame::walking(Facing::Left),
            400 => InputFrame::walking(Facing::Left).with(InputFrame::FLAG_DASH),
            460 => InputFrame::new().with(InputFrame::FLAG_POUNCE),
            540 => InputFrame::new().with(InputFrame::FLAG_DROP),
            _ => InputFrame::new(),
        };
        recording.record(t, frame);
    }

    recording
}

/// Logs every event whose kind is marked for logging, plus the sprite cell
/// a renderer would draw for each character.
#[derive(Default)]
struct EventLog {
    seen: u64,
}

impl Listener for EventLog {
    fn notify(&mut self, event: &Event, _queue: &mut EventQueue) {
        self.seen += 1;
        if let Event::CharacterSetImage { character, animation, facing, frame } = event {
            trace!(%character, cell = animation.cell_name(*facing), frame, "sprite");
        }
        if event.kind().should_log() {
            debug!(seen = self.seen, "event {}", event.kind());
        }
    }
}
