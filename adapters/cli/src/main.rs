#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the stabilise-the-signal minigames.

mod config;
mod session;

use std::{
    io::{self, Stdout},
    path::PathBuf,
    sync::mpsc::{self, Receiver, TryRecvError},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use session::{EventSink, GameKind, Session};
use stabilize_core::{CompletionNotice, ThreadScheduler, COMPLETION_GRACE};
use stabilize_rendering::{
    palette, FrameControl, FrameInput, Presentation, RenderingBackend, Scene,
};
use stabilize_rendering_macroquad::{MacroquadBackend, OverlayAtlas};

/// How long headless runs wait past the grace delay before giving up on the callback.
const COMPLETION_SLACK: Duration = Duration::from_secs(5);

/// Runs one of the stabilisation minigames.
#[derive(Debug, Parser)]
#[command(name = "stabilize", version, about)]
struct CliArgs {
    /// Minigame to run.
    #[arg(value_enum)]
    game: GameKind,
    /// Seed for the simulation's random source. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML file with `[containment]` and `[suppression]` tuning overrides.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Overlay asset manifest.
    #[arg(long, value_name = "PATH")]
    assets: Option<PathBuf>,
    /// Step the simulation without opening a window.
    #[arg(long)]
    headless: bool,
    /// Fixed step used by headless runs, in milliseconds.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    dt_ms: u64,
    /// Synchronise presentation with the display refresh rate.
    #[arg(long, overrides_with = "no_vsync")]
    vsync: bool,
    /// Render as fast as possible.
    #[arg(long = "no-vsync", overrides_with = "vsync")]
    no_vsync: bool,
    /// Log frame timing once per second.
    #[arg(long)]
    show_fps: bool,
    /// Print every engine event to stdout as a JSON line.
    #[arg(long)]
    events_json: bool,
}

impl CliArgs {
    fn vsync(&self) -> Option<bool> {
        match (self.vsync, self.no_vsync) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Entry point for the stabilisation command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("starting {:?} with seed {seed}", args.game);

    let (completed_sender, completed) = mpsc::channel();
    let completion = CompletionNotice::new(ThreadScheduler, move || {
        let _ = completed_sender.send(());
    });
    let session = Session::new(args.game, &config, seed, completion)?;
    let sink = EventSink::new(args.events_json.then(io::stdout));

    if args.headless {
        run_headless(session, sink, Duration::from_millis(args.dt_ms), &completed)
    } else {
        run_windowed(&args, session, sink, completed)
    }
}

fn run_headless(
    mut session: Session,
    mut sink: EventSink<Stdout>,
    dt: Duration,
    completed: &Receiver<()>,
) -> Result<()> {
    let mut events = Vec::new();
    while !session.is_ended() {
        session.update(dt, &mut events);
        sink.drain(session.elapsed(), &mut events)?;
    }

    completed
        .recv_timeout(COMPLETION_GRACE + COMPLETION_SLACK)
        .context("completion callback never fired")?;
    log::info!("run complete after {:.2}s", session.elapsed());
    Ok(())
}

fn run_windowed(
    args: &CliArgs,
    mut session: Session,
    mut sink: EventSink<Stdout>,
    completed: Receiver<()>,
) -> Result<()> {
    let manifest = args
        .assets
        .clone()
        .unwrap_or_else(OverlayAtlas::default_manifest_path);
    let mut backend = MacroquadBackend::new()
        .with_show_fps(args.show_fps)
        .with_overlay_manifest(Some(manifest));
    if let Some(enabled) = args.vsync() {
        backend = backend.with_vsync(enabled);
    }

    let presentation = Presentation::new(session.window_title(), palette::BACKGROUND, Scene::new());
    let mut events = Vec::new();

    backend.run(
        presentation,
        move |dt, input: FrameInput, scene: &mut Scene| {
            if let Some(point) = input.pointer_down {
                session.pointer_down(point, input.surface, &mut events);
            }
            if let Some(point) = input.pointer_up {
                session.pointer_up(point, &mut events);
            }
            session.update(dt, &mut events);
            if let Err(error) = sink.drain(session.elapsed(), &mut events) {
                log::error!("{error:#}");
                return FrameControl::Exit;
            }

            session.build_scene(input.surface, input.overlays, scene);

            match completed.try_recv() {
                Ok(()) => {
                    log::info!("run complete");
                    FrameControl::Exit
                }
                Err(TryRecvError::Empty) => FrameControl::Continue,
                Err(TryRecvError::Disconnected) => FrameControl::Exit,
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn vsync_flags_resolve_to_the_last_one_given() {
        let args = CliArgs::parse_from(["stabilize", "containment", "--vsync", "--no-vsync"]);
        assert_eq!(args.vsync(), Some(false));
        let args = CliArgs::parse_from(["stabilize", "suppression", "--no-vsync", "--vsync"]);
        assert_eq!(args.vsync(), Some(true));
        let args = CliArgs::parse_from(["stabilize", "suppression"]);
        assert_eq!(args.vsync(), None);
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(CliArgs::try_parse_from(["stabilize", "containment", "--dt-ms", "0"]).is_err());
        let args = CliArgs::parse_from(["stabilize", "containment", "--headless"]);
        assert_eq!(args.dt_ms, 16);
        assert!(args.headless);
    }
}
