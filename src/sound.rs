//! The playback capability the scheduler drives, one instance per track.
//!
//! The scheduler never touches decode or output internals. It only starts,
//! pauses and sets the volume of each sound; fades are ramps computed by the
//! scheduler and written through `set_volume`.

/// A looping audio clip that can be started, paused and attenuated.
pub trait Sound {
    /// Start (or resume) playback.
    fn play(&mut self);

    /// Pause playback, keeping the position.
    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Current linear volume.
    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);
}

/// A sound with no audio behind it. Tracks play state and volume only.
///
/// Used for headless simulation and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SilentSound {
    playing: bool,
    volume: f32,
    plays: u32,
    pauses: u32,
}

impl SilentSound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build `count` silent sounds, one per catalog entry.
    pub fn many(count: usize) -> Vec<SilentSound> {
        vec![SilentSound::new(); count]
    }

    /// Number of times playback was started.
    pub fn plays(&self) -> u32 {
        self.plays
    }

    /// Number of times playback was paused.
    pub fn pauses(&self) -> u32 {
        self.pauses
    }
}

impl Sound for SilentSound {
    fn play(&mut self) {
        self.playing = true;
        self.plays += 1;
    }

    fn pause(&mut self) {
        self.playing = false;
        self.pauses += 1;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}
