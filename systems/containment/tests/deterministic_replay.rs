use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use stabilize_core::{CompletionNotice, Event, Point, SurfaceSize};
use stabilize_system_containment::{Containment, ContainmentTuning};

#[test]
fn deterministic_replay_produces_identical_trajectories() {
    let first = replay(42);
    let second = replay(42);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first.events.contains(&Event::Ended));
}

#[test]
fn different_seeds_diverge() {
    let first = replay(1);
    let second = replay(2);
    assert_ne!(first.fingerprint(), second.fingerprint());
}

fn replay(seed: u64) -> ReplayOutcome {
    let surface = SurfaceSize::new(960.0, 640.0);
    let mut engine = Containment::with_seed(
        ContainmentTuning::default(),
        seed,
        CompletionNotice::silent(),
    )
    .expect("valid tuning");
    let mut events = Vec::new();
    let mut samples = Vec::new();

    for frame in 0..1_500u32 {
        if frame % 90 == 0 {
            let x = 120.0 + (frame / 90 % 3) as f32 * 300.0;
            let _ = engine.pointer_down(Point::new(x, 320.0), surface, &mut events);
        }
        engine.update(Duration::from_millis(16), &mut events);
        samples.push(
            engine
                .channels()
                .iter()
                .map(|channel| channel.amplitude().to_bits())
                .collect(),
        );
    }

    ReplayOutcome { samples, events }
}

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    samples: Vec<Vec<u32>>,
    events: Vec<Event>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.samples.hash(&mut hasher);
        for event in &self.events {
            format!("{event:?}").hash(&mut hasher);
        }
        hasher.finish()
    }
}
