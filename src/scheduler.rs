//! Playlist rotation and crossfade scheduling.
//!
//! A fixed set of `voices` tracks is audible at a time. On every rotation a
//! new random track fades in and the longest-resident one fades out, so two
//! rotations never leave the soundscape silent. All time-dependent calls take
//! `now`, which lets the same scheduler run on the wall clock or on a virtual
//! one.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::fade::{FadeToken, Ramp};
use crate::sound::Sound;
use crate::timer::Timer;
use crate::track::{FadeState, Track, TrackId, TrackStatus};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, Level, Span};

pub const FADE_IN: Duration = Duration::from_secs(10);
pub const FADE_OUT: Duration = Duration::from_secs(5);
pub const MAX_VOLUME: f32 = 0.8;
pub const ROTATION_INTERVAL: Duration = Duration::from_secs(22);
pub const VOICES: usize = 2;

/// Timing and level parameters for a scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub fade_in: Duration,
    pub fade_out: Duration,
    /// Volume a fade-in ramps up to. Volumes never exceed this.
    pub max_volume: f32,
    pub rotation_interval: Duration,
    /// How many tracks are audible between rotations.
    pub voices: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fade_in: FADE_IN,
            fade_out: FADE_OUT,
            max_volume: MAX_VOLUME,
            rotation_interval: ROTATION_INTERVAL,
            voices: VOICES,
        }
    }
}

impl Settings {
    /// `max_volume` must lie in `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_volume > 0.0 && self.max_volume <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "max_volume must be in (0, 1], got {}",
                self.max_volume
            )));
        }
        Ok(())
    }
}

/// Outcome of one rotation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation {
    pub added: TrackId,
    pub evicted: Option<TrackId>,
}

pub struct PlaylistScheduler<S> {
    tracks: Vec<Track<S>>,
    /// Active tracks in activation order; the front is the oldest.
    play_heads: VecDeque<TrackId>,
    settings: Settings,
    rotation: Timer,
    rng: fastrand::Rng,
    span: Span,
}

impl<S: Sound> PlaylistScheduler<S> {
    /// Pair each catalog entry with its sound.
    ///
    /// The catalog must hold more tracks than `settings.voices`, otherwise
    /// a rotation could never find an unused track.
    pub fn new(catalog: &Catalog, sounds: Vec<S>, settings: Settings) -> Result<Self> {
        settings.validate()?;
        if sounds.len() != catalog.len() {
            return Err(Error::SoundCountMismatch {
                catalog: catalog.len(),
                sounds: sounds.len(),
            });
        }
        if catalog.len() <= settings.voices {
            return Err(Error::CatalogTooSmall {
                len: catalog.len(),
                voices: settings.voices,
            });
        }

        let tracks = sounds
            .into_iter()
            .zip(catalog.files.iter())
            .enumerate()
            .map(|(id, (mut sound, name))| {
                sound.set_volume(0.0);
                Track::new(id, name.clone(), sound)
            })
            .collect();

        Ok(PlaylistScheduler {
            tracks,
            play_heads: VecDeque::with_capacity(settings.voices + 1),
            settings,
            rotation: Timer::new(settings.rotation_interval),
            rng: fastrand::Rng::new(),
            span: span!(Level::INFO, "scheduler"),
        })
    }

    /// Use a deterministic random sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Uniformly pick a track id that is not currently in the play heads.
    pub fn pick_random_unused_track(&mut self) -> TrackId {
        loop {
            let picked = self.rng.usize(..self.tracks.len());
            if !self.play_heads.contains(&picked) {
                return picked;
            }
        }
    }

    /// Begin a fresh rotation with `voices` random tracks fading in.
    ///
    /// Tracks left over from a previous run are faded out unless they get
    /// picked again.
    pub fn start(&mut self, now: Instant) -> Vec<TrackId> {
        let span = self.span.clone();
        let _enter = span.enter();

        let previous: Vec<TrackId> = self.play_heads.drain(..).collect();
        for id in previous {
            self.fade_out(id, now);
        }

        for _ in 0..self.settings.voices {
            let id = self.pick_random_unused_track();
            self.play_heads.push_back(id);
        }
        let heads = self.play_heads();
        for &id in &heads {
            self.fade_in(id, now);
        }
        self.rotation.rearm(now);

        info!(tracks = ?heads, "Started rotation.");
        heads
    }

    /// Fade out everything audible and stop rotating.
    pub fn stop(&mut self, now: Instant) {
        let span = self.span.clone();
        let _enter = span.enter();

        for id in 0..self.tracks.len() {
            if self.tracks[id].is_audible() {
                self.fade_out(id, now);
            }
        }
        self.play_heads.clear();
        self.rotation.disarm();

        info!("Stopped rotation.");
    }

    /// Flip a single track between fading in and fading out.
    ///
    /// This bypasses the play heads, like a per-track button would.
    pub fn toggle(&mut self, id: TrackId, now: Instant) -> FadeState {
        if self.tracks[id].is_audible() {
            self.fade_out(id, now);
        } else {
            self.fade_in(id, now);
        }
        self.tracks[id].state
    }

    /// Bring in one new track and retire the oldest active one.
    pub fn continue_rotation(&mut self, now: Instant) -> Rotation {
        let span = self.span.clone();
        let _enter = span.enter();

        let added = self.pick_random_unused_track();
        self.play_heads.push_back(added);
        self.fade_in(added, now);

        let evicted = if self.play_heads.len() > self.settings.voices {
            self.play_heads.pop_front()
        } else {
            None
        };
        if let Some(old) = evicted {
            self.fade_out(old, now);
        }

        self.rotation.rearm(now);

        info!(
            added,
            added_name = %self.tracks[added].name,
            evicted = ?evicted,
            "Rotated play heads."
        );
        Rotation { added, evicted }
    }

    /// Ramp a track up to the maximum volume, starting playback if needed.
    /// Any fade already running on the track is superseded.
    pub fn fade_in(&mut self, id: TrackId, now: Instant) -> FadeToken {
        let max = self.settings.max_volume;
        let duration = self.settings.fade_in;
        let track = &mut self.tracks[id];

        if !track.sound.is_playing() {
            track.sound.play();
        }
        track.state = FadeState::FadingIn;
        let from = track.sound.volume().clamp(0.0, max);
        let token = track.fader.begin(Ramp::new(from, max, now, duration));

        debug!(track = id, name = %track.name, from, "Fading in.");
        token
    }

    /// Ramp a track down to silence; it pauses once the ramp completes.
    /// Any fade already running on the track is superseded.
    pub fn fade_out(&mut self, id: TrackId, now: Instant) -> FadeToken {
        let max = self.settings.max_volume;
        let duration = self.settings.fade_out;
        let track = &mut self.tracks[id];

        track.state = FadeState::FadingOut;
        let from = track.sound.volume().clamp(0.0, max);
        let token = track.fader.begin(Ramp::new(from, 0.0, now, duration));

        debug!(track = id, name = %track.name, from, "Fading out.");
        token
    }

    /// Apply the completion of a fade.
    ///
    /// Completions from a fade that has since been superseded are ignored.
    /// Returns whether the completion was applied.
    pub fn complete_fade(&mut self, id: TrackId, token: FadeToken) -> bool {
        let track = &mut self.tracks[id];
        if token != track.fader.token() {
            debug!(track = id, "Ignoring stale fade completion.");
            return false;
        }

        if let Some(ramp) = track.fader.finish() {
            track.sound.set_volume(ramp.to);
        }
        match track.state {
            FadeState::FadingIn => {
                track.state = FadeState::Idle;
                debug!(track = id, "Fade-in complete.");
            }
            FadeState::FadingOut => {
                track.sound.pause();
                track.state = FadeState::Idle;
                debug!(track = id, "Fade-out complete, paused.");
            }
            FadeState::Idle => {}
        }
        true
    }

    /// Advance every running fade to `now` and fire the rotation timer if due.
    pub fn tick(&mut self, now: Instant) -> Option<Rotation> {
        for id in 0..self.tracks.len() {
            let track = &mut self.tracks[id];
            let finished = match track.fader.advance(now) {
                Some((volume, done)) => {
                    track.sound.set_volume(volume);
                    done
                }
                None => None,
            };
            if let Some(token) = finished {
                self.complete_fade(id, token);
            }
        }

        if self.rotation.is_due(now) {
            Some(self.continue_rotation(now))
        } else {
            None
        }
    }

    pub fn play_heads(&self) -> Vec<TrackId> {
        self.play_heads.iter().copied().collect()
    }

    pub fn track(&self, id: TrackId) -> &Track<S> {
        &self.tracks[id]
    }

    pub fn tracks(&self) -> &[Track<S>] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// True between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.rotation.is_armed()
    }

    pub fn next_rotation_at(&self) -> Option<Instant> {
        self.rotation.deadline()
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.tracks.iter().map(|t| t.volume()).collect()
    }

    pub fn snapshot(&self) -> Vec<TrackStatus> {
        self.tracks.iter().map(|t| t.status()).collect()
    }
}
