//! Linear volume ramps and the tokens that tie a completion to its fade.

use std::time::{Duration, Instant};

/// Identifies one fade attempt on one track.
///
/// Each new fade on a track bumps its token; a completion carrying an older
/// token belongs to a superseded fade and must be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FadeToken(u64);

impl FadeToken {
    pub fn next(self) -> FadeToken {
        FadeToken(self.0.wrapping_add(1))
    }
}

/// A timed linear volume ramp between two levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub from: f32,
    pub to: f32,
    pub started: Instant,
    pub duration: Duration,
}

impl Ramp {
    pub fn new(from: f32, to: f32, started: Instant, duration: Duration) -> Self {
        Ramp {
            from,
            to,
            started,
            duration,
        }
    }

    /// Progress through the ramp in `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// Volume at `now`. Never overshoots either endpoint.
    pub fn volume_at(&self, now: Instant) -> f32 {
        let t = self.progress(now);
        if t >= 1.0 {
            return self.to;
        }
        let (lo, hi) = if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        };
        (self.from + (self.to - self.from) * t).clamp(lo, hi)
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

/// The fade currently applied to a track, if any.
#[derive(Debug, Clone, Default)]
pub struct Fader {
    token: FadeToken,
    ramp: Option<Ramp>,
}

impl Fader {
    /// Replace any running ramp with a new one. Returns the token the
    /// completion of this fade will carry.
    pub fn begin(&mut self, ramp: Ramp) -> FadeToken {
        self.token = self.token.next();
        self.ramp = Some(ramp);
        self.token
    }

    /// Remove the running ramp without invalidating its token.
    pub fn finish(&mut self) -> Option<Ramp> {
        self.ramp.take()
    }

    pub fn token(&self) -> FadeToken {
        self.token
    }

    pub fn is_active(&self) -> bool {
        self.ramp.is_some()
    }

    /// Evaluate the ramp at `now`.
    ///
    /// Returns the volume to apply and, when the ramp has reached its
    /// target, the token of the finished fade. A finished ramp is removed.
    pub fn advance(&mut self, now: Instant) -> Option<(f32, Option<FadeToken>)> {
        let ramp = self.ramp?;
        let volume = ramp.volume_at(now);
        if ramp.is_finished(now) {
            self.ramp = None;
            Some((volume, Some(self.token)))
        } else {
            Some((volume, None))
        }
    }
}
