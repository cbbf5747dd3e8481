//! Headless rotation on a virtual clock, using `SilentSound`.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::scheduler::{PlaylistScheduler, Rotation, Settings};
use crate::sound::SilentSound;
use crate::track::TrackId;
use serde::Serialize;
use std::time::{Duration, Instant};

/// A rotation and the virtual time at which it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedRotation {
    pub at_secs: f64,
    pub added: TrackId,
    pub evicted: Option<TrackId>,
    pub play_heads: Vec<TrackId>,
}

pub struct Simulation {
    scheduler: PlaylistScheduler<SilentSound>,
    origin: Instant,
    now: Instant,
    step: Duration,
}

impl Simulation {
    /// `step` is the virtual tick length; fades and rotations resolve to it.
    pub fn new(
        catalog: &Catalog,
        settings: Settings,
        seed: Option<u64>,
        step: Duration,
    ) -> Result<Self> {
        let sounds = SilentSound::many(catalog.len());
        let mut scheduler = PlaylistScheduler::new(catalog, sounds, settings)?;
        if let Some(seed) = seed {
            scheduler = scheduler.with_seed(seed);
        }
        let origin = Instant::now();
        Ok(Simulation {
            scheduler,
            origin,
            now: origin,
            step: step.max(Duration::from_millis(1)),
        })
    }

    pub fn start(&mut self) -> Vec<TrackId> {
        self.scheduler.start(self.now)
    }

    pub fn stop(&mut self) {
        self.scheduler.stop(self.now);
    }

    pub fn toggle(&mut self, id: TrackId) {
        self.scheduler.toggle(id, self.now);
    }

    /// Step the clock forward by `duration`, collecting rotations.
    pub fn advance(&mut self, duration: Duration) -> Vec<TimedRotation> {
        let end = self.now + duration;
        let mut rotations = Vec::new();
        while self.now < end {
            self.now = (self.now + self.step).min(end);
            if let Some(rotation) = self.scheduler.tick(self.now) {
                rotations.push(self.timed(rotation));
            }
        }
        rotations
    }

    /// Run until `cycles` rotations have happened. Returns nothing if the
    /// scheduler is not running.
    pub fn run_cycles(&mut self, cycles: usize) -> Vec<TimedRotation> {
        let mut rotations = Vec::with_capacity(cycles);
        while rotations.len() < cycles && self.scheduler.is_running() {
            self.now += self.step;
            if let Some(rotation) = self.scheduler.tick(self.now) {
                rotations.push(self.timed(rotation));
            }
        }
        rotations
    }

    pub fn elapsed(&self) -> Duration {
        self.now - self.origin
    }

    pub fn scheduler(&self) -> &PlaylistScheduler<SilentSound> {
        &self.scheduler
    }

    fn timed(&self, rotation: Rotation) -> TimedRotation {
        TimedRotation {
            at_secs: self.elapsed().as_secs_f64(),
            added: rotation.added,
            evicted: rotation.evicted,
            play_heads: self.scheduler.play_heads(),
        }
    }
}
