use std::{io::Write, time::Duration};

use anyhow::{Context, Result};
use clap::ValueEnum;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use stabilize_core::{CompletionNotice, Event, Point, SurfaceSize};
use stabilize_rendering::{OverlaySet, Scene};
use stabilize_system_containment::Containment;
use stabilize_system_suppression::Suppression;

use crate::config::Config;

/// Minigames the CLI can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum GameKind {
    /// Keep several rising lanes contained with calm windows.
    Containment,
    /// Spend focus in short bursts to suppress noise.
    Suppression,
}

/// One running minigame together with the state its visuals need.
#[derive(Debug)]
pub(crate) enum Session {
    Containment(Containment),
    Suppression {
        engine: Suppression,
        /// Drives the cosmetic waveform so drawing never touches simulation state.
        waveform_rng: ChaCha8Rng,
    },
}

impl Session {
    /// Builds the engine selected by `kind` from the matching config table.
    pub(crate) fn new(
        kind: GameKind,
        config: &Config,
        seed: u64,
        completion: CompletionNotice,
    ) -> Result<Self> {
        let session = match kind {
            GameKind::Containment => Self::Containment(
                Containment::with_seed(config.containment.clone(), seed, completion)
                    .context("invalid containment tuning")?,
            ),
            GameKind::Suppression => Self::Suppression {
                engine: Suppression::new(config.suppression.clone(), completion)
                    .context("invalid suppression tuning")?,
                waveform_rng: ChaCha8Rng::seed_from_u64(seed),
            },
        };
        Ok(session)
    }

    pub(crate) fn window_title(&self) -> &'static str {
        match self {
            Self::Containment(_) => "Stabilize: containment",
            Self::Suppression { .. } => "Stabilize: suppression",
        }
    }

    pub(crate) fn pointer_down(
        &mut self,
        point: Point,
        surface: SurfaceSize,
        out: &mut Vec<Event>,
    ) {
        match self {
            Self::Containment(engine) => {
                let _ = engine.pointer_down(point, surface, out);
            }
            Self::Suppression { engine, .. } => {
                let _ = engine.pointer_down(point, surface, out);
            }
        }
    }

    pub(crate) fn pointer_up(&mut self, point: Point, out: &mut Vec<Event>) {
        if let Self::Suppression { engine, .. } = self {
            engine.pointer_up(point, out);
        }
    }

    pub(crate) fn update(&mut self, dt: Duration, out: &mut Vec<Event>) {
        match self {
            Self::Containment(engine) => engine.update(dt, out),
            Self::Suppression { engine, .. } => engine.update(dt, out),
        }
    }

    pub(crate) fn is_ended(&self) -> bool {
        match self {
            Self::Containment(engine) => engine.is_ended(),
            Self::Suppression { engine, .. } => engine.is_ended(),
        }
    }

    /// Simulated seconds since the run started.
    pub(crate) fn elapsed(&self) -> f32 {
        match self {
            Self::Containment(engine) => engine.elapsed(),
            Self::Suppression { engine, .. } => engine.elapsed(),
        }
    }

    pub(crate) fn build_scene(
        &mut self,
        surface: SurfaceSize,
        overlays: OverlaySet,
        scene: &mut Scene,
    ) {
        match self {
            Self::Containment(engine) => {
                stabilize_rendering::containment::build_scene(engine, surface, overlays, scene);
            }
            Self::Suppression {
                engine,
                waveform_rng,
            } => stabilize_rendering::suppression::build_scene(
                engine,
                surface,
                overlays,
                waveform_rng,
                scene,
            ),
        }
    }
}

/// Reports engine events to the log and, optionally, as JSON lines.
#[derive(Debug)]
pub(crate) struct EventSink<W> {
    json: Option<W>,
}

impl<W: Write> EventSink<W> {
    /// Creates a sink that also writes one JSON object per event to `json`.
    pub(crate) fn new(json: Option<W>) -> Self {
        Self { json }
    }

    /// Reports and removes every event in `events`.
    pub(crate) fn drain(&mut self, elapsed: f32, events: &mut Vec<Event>) -> Result<()> {
        for event in events.drain(..) {
            log::info!("t={elapsed:.3}s {event:?}");
            if let Some(writer) = self.json.as_mut() {
                serde_json::to_writer(&mut *writer, &event)
                    .context("failed to serialise event")?;
                writer.write_all(b"\n").context("failed to write event")?;
            }
        }
        if let Some(writer) = self.json.as_mut() {
            writer.flush().context("failed to flush events")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(kind: GameKind) -> Session {
        Session::new(kind, &Config::default(), 9, CompletionNotice::silent())
            .expect("default tuning is valid")
    }

    #[test]
    fn sink_writes_one_json_object_per_line() {
        let mut sink = EventSink::new(Some(Vec::new()));
        let mut events = vec![Event::CalmWindowOpened { channel: 1 }, Event::Ended];
        sink.drain(3.0, &mut events).expect("in-memory writes succeed");

        assert!(events.is_empty());
        let written = String::from_utf8(sink.json.expect("writer kept")).expect("utf-8");
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"event":"calm_window_opened","channel":1}"#,
                r#"{"event":"ended"}"#
            ]
        );
    }

    #[test]
    fn invalid_tuning_is_reported_with_the_game() {
        let mut config = Config::default();
        config.containment.lanes = 0;
        let error = Session::new(
            GameKind::Containment,
            &config,
            0,
            CompletionNotice::silent(),
        )
        .expect_err("zero lanes");
        assert!(format!("{error:#}").starts_with("invalid containment tuning"));
    }

    #[test]
    fn suppression_releases_follow_presses() {
        let mut session = session(GameKind::Suppression);
        let surface = SurfaceSize::new(800.0, 600.0);
        let mut events = Vec::new();
        session.pointer_down(Point::new(400.0, 590.0), surface, &mut events);
        session.pointer_up(Point::new(10.0, 10.0), &mut events);
        assert_eq!(events, vec![Event::HoldStarted, Event::HoldReleased]);
    }

    #[test]
    fn sessions_run_to_their_configured_duration() {
        for kind in [GameKind::Containment, GameKind::Suppression] {
            let mut session = session(kind);
            let mut events = Vec::new();
            let mut steps = 0;
            while !session.is_ended() {
                session.update(Duration::from_millis(125), &mut events);
                steps += 1;
            }
            assert_eq!(steps, 160);
            assert_eq!(events.last(), Some(&Event::Ended));
        }
    }

    #[test]
    fn scenes_show_the_current_headline() {
        let surface = SurfaceSize::new(1024.0, 768.0);
        let mut scene = Scene::new();
        let mut containment = session(GameKind::Containment);
        containment.build_scene(surface, OverlaySet::empty(), &mut scene);
        assert_eq!(scene.texts().next(), Some("Slow what's rising."));

        let mut suppression = session(GameKind::Suppression);
        suppression.build_scene(surface, OverlaySet::empty(), &mut scene);
        assert_eq!(scene.texts().next(), Some("Slow the noise."));
    }
}
