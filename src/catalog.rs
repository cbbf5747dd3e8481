use crate::error::Result;
use crate::track::TrackId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Audio extensions picked up when scanning a directory.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "aac", "m4a"];

/// The looped clips shipped with the soundscape.
pub const DEFAULT_CLIPS: &[&str] = &[
    "001-beginning-looped.mp3",
    "002-white-mountain-looped.mp3",
    "003-dusk-looped.mp3",
    "004-salmacis-looped.mp3",
    "005-suppers-ready-looped.mp3",
    "006-wardrobe-looped.mp3",
    "007-fly-looped.mp3",
    "008-waiting-room-looped.mp3",
    "009-slippermen-looped.mp3",
    "010-ravine-looped.mp3",
    "011-ripples-looped.mp3",
    "012-unquiet-slumbers-looped.mp3",
    "013-down-and-out-looped.mp3",
    "014-duchess-looped.mp3",
    "moonlight-knight-outro.mp3",
];

/// Ordered list of clip references. Position in the list is the `TrackId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub dir: PathBuf,
    pub files: Vec<String>,
}

impl Catalog {
    pub fn new(dir: impl Into<PathBuf>, files: Vec<String>) -> Self {
        Catalog {
            dir: dir.into(),
            files,
        }
    }

    /// The built-in clip list, resolved against `dir`.
    pub fn default_clips(dir: impl Into<PathBuf>) -> Self {
        Catalog::new(dir, DEFAULT_CLIPS.iter().map(|s| s.to_string()).collect())
    }

    /// Every audio file directly inside `dir`, sorted by file name.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let ext = match path.extension() {
                Some(e) => e.to_string_lossy().to_lowercase(),
                None => continue,
            };
            if !AUDIO_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }
            if let Some(name) = path.file_name() {
                files.push(name.to_string_lossy().to_string());
            }
        }
        files.sort();
        Ok(Catalog::new(dir, files))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Full path of a clip.
    pub fn path(&self, id: TrackId) -> Option<PathBuf> {
        self.files.get(id).map(|f| self.dir.join(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrackId, &str)> {
        self.files.iter().enumerate().map(|(i, f)| (i, f.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_catalog_has_fifteen_clips() {
        let cat = Catalog::default_clips("audio");
        assert_eq!(cat.len(), 15);
        assert_eq!(cat.files[0], "001-beginning-looped.mp3");
        assert_eq!(cat.files[14], "moonlight-knight-outro.mp3");
        assert!(cat.path(15).is_none());
    }

    #[test]
    fn path_joins_directory() {
        let cat = Catalog::default_clips("audio");
        assert_eq!(
            cat.path(2),
            Some(PathBuf::from("audio").join("003-dusk-looped.mp3"))
        );
    }

    #[test]
    fn scan_keeps_only_audio_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ogg"), b"").unwrap();
        fs::write(dir.path().join("a.MP3"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(dir.path().join("noext"), b"").unwrap();
        fs::create_dir(dir.path().join("sub.mp3")).unwrap();

        let cat = Catalog::scan(dir.path()).unwrap();
        assert_eq!(cat.files, vec!["a.MP3".to_string(), "b.ogg".to_string()]);
    }

    #[test]
    fn scan_missing_dir_errors() {
        assert!(Catalog::scan(Path::new("__no_such_audio_dir__")).is_err());
    }

    #[test]
    fn iter_yields_ids_in_order() {
        let cat = Catalog::new("x", vec!["a.mp3".into(), "b.mp3".into()]);
        let ids: Vec<TrackId> = cat.iter().map(|(i, _)| i).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
