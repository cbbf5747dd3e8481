use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::sound::Sound;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// Audio output wrapping rodio. Not `Send`: create it on the thread that
/// will drive the sounds.
pub struct AudioOutput {
    stream: Rc<OutputStream>,
    handle: OutputStreamHandle,
}

impl AudioOutput {
    /// Open the default output device.
    pub fn open() -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| Error::AudioOutput(e.to_string()))?;
        Ok(AudioOutput {
            stream: Rc::new(stream),
            handle,
        })
    }

    /// Decode a clip into its own sink, looped, paused and muted.
    pub fn load_sound(&self, path: &Path) -> Result<RodioSound> {
        let file = File::open(path)?;
        let source = Decoder::new_looped(BufReader::new(file)).map_err(|e| Error::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let sink = Sink::try_new(&self.handle).map_err(|e| Error::AudioOutput(e.to_string()))?;
        sink.set_volume(0.0);
        sink.pause();
        sink.append(source);
        debug!(path = %path.display(), "Loaded clip.");
        Ok(RodioSound {
            sink,
            _stream: Rc::clone(&self.stream),
        })
    }

    /// Load every clip of the catalog, in catalog order.
    pub fn load_catalog(&self, catalog: &Catalog) -> Result<Vec<RodioSound>> {
        (0..catalog.len())
            .filter_map(|id| catalog.path(id))
            .map(|path| self.load_sound(&path))
            .collect()
    }
}

/// One looping clip on its own rodio sink.
pub struct RodioSound {
    sink: Sink,
    _stream: Rc<OutputStream>,
}

impl Sound for RodioSound {
    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_playing(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }

    fn volume(&self) -> f32 {
        self.sink.volume()
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
    }
}
