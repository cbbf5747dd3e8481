use crate::fade::Fader;
use crate::sound::Sound;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into the catalog.
pub type TrackId = usize;

/// Which way a track's volume is currently moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadeState {
    /// Not fading: either holding at full volume or fully faded out.
    #[default]
    Idle,
    FadingIn,
    FadingOut,
}

impl fmt::Display for FadeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FadeState::Idle => write!(f, "idle"),
            FadeState::FadingIn => write!(f, "fading-in"),
            FadeState::FadingOut => write!(f, "fading-out"),
        }
    }
}

/// One catalog entry together with its sound and fade bookkeeping.
#[derive(Debug)]
pub struct Track<S> {
    pub id: TrackId,
    pub name: String,
    pub(crate) sound: S,
    pub(crate) state: FadeState,
    pub(crate) fader: Fader,
}

impl<S: Sound> Track<S> {
    pub fn new(id: TrackId, name: String, sound: S) -> Self {
        Track {
            id,
            name,
            sound,
            state: FadeState::Idle,
            fader: Fader::default(),
        }
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    pub fn is_fading_in(&self) -> bool {
        self.state == FadeState::FadingIn
    }

    pub fn is_fading_out(&self) -> bool {
        self.state == FadeState::FadingOut
    }

    pub fn is_playing(&self) -> bool {
        self.sound.is_playing()
    }

    pub fn volume(&self) -> f32 {
        self.sound.volume()
    }

    pub fn sound(&self) -> &S {
        &self.sound
    }

    /// Playing or on its way up: the state in which a toggle fades out.
    pub fn is_audible(&self) -> bool {
        self.sound.is_playing() || self.is_fading_in()
    }

    /// Readout for UIs and the CLI.
    pub fn status(&self) -> TrackStatus {
        TrackStatus {
            id: self.id,
            name: self.name.clone(),
            playing: self.sound.is_playing(),
            volume: self.sound.volume(),
            state: self.state,
        }
    }
}

/// Serializable snapshot of one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackStatus {
    pub id: TrackId,
    pub name: String,
    pub playing: bool,
    pub volume: f32,
    pub state: FadeState,
}

impl TrackStatus {
    /// Volume as a 20-column bar, e.g. `[#####               ]`.
    pub fn volume_bar(&self) -> String {
        const WIDTH: usize = 20;
        let filled = ((self.volume.clamp(0.0, 1.0) * WIDTH as f32).round() as usize).min(WIDTH);
        format!("[{}{}]", "#".repeat(filled), " ".repeat(WIDTH - filled))
    }
}
