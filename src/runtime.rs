//! Runtime — dedicated thread that owns the scheduler and its sounds.
//!
//! Sounds are built on the runtime thread itself (rodio output streams are
//! not `Send`), so every scheduler mutation happens on one thread. Other
//! threads talk to it through `RuntimeHandle`, which wraps an
//! `mpsc::Sender<RuntimeCmd>`. Fades and the rotation timer advance on every
//! `recv_timeout` wake-up; a separate sync timer reports volumes.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::scheduler::{PlaylistScheduler, Rotation, Settings};
use crate::sound::Sound;
use crate::timer::Timer;
use crate::track::{FadeState, TrackId, TrackStatus};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{error, info};

// ── Commands & Events ────────────────────────────────────────────────────────

/// Commands sent to the runtime thread.
pub enum RuntimeCmd {
    Start,
    Stop,
    Toggle(TrackId),
    Snapshot(mpsc::Sender<Vec<TrackStatus>>),
    Shutdown,
}

/// Events emitted by the runtime thread.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    /// Sounds are loaded and the scheduler is ready for commands.
    Ready { tracks: usize },
    Started(Vec<TrackId>),
    Stopped,
    Rotated(Rotation),
    Toggled { track: TrackId, state: FadeState },
    /// Current volume of every track, in catalog order.
    Volumes(Vec<f32>),
    Error(String),
}

/// Timing for the runtime loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeOptions {
    pub settings: Settings,
    /// How often fades are advanced.
    pub tick: Duration,
    /// How often `RuntimeEvent::Volumes` is emitted.
    pub sync_interval: Duration,
    /// Fixed RNG seed, for reproducible sessions.
    pub seed: Option<u64>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        RuntimeOptions {
            settings: Settings::default(),
            tick: Duration::from_millis(50),
            sync_interval: Duration::from_millis(100),
            seed: None,
        }
    }
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Thread-safe handle for sending commands to the runtime.
#[derive(Clone)]
pub struct RuntimeHandle {
    tx: mpsc::Sender<RuntimeCmd>,
}

impl RuntimeHandle {
    fn send(&self, cmd: RuntimeCmd) -> Result<()> {
        self.tx.send(cmd).map_err(|_| Error::RuntimeGone)
    }

    pub fn start(&self) -> Result<()> {
        self.send(RuntimeCmd::Start)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(RuntimeCmd::Stop)
    }

    pub fn toggle(&self, track: TrackId) -> Result<()> {
        self.send(RuntimeCmd::Toggle(track))
    }

    /// Ask the runtime for the state of every track.
    pub fn snapshot(&self) -> Result<Vec<TrackStatus>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(RuntimeCmd::Snapshot(reply_tx))?;
        reply_rx
            .recv_timeout(Duration::from_secs(1))
            .map_err(|_| Error::RuntimeGone)
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(RuntimeCmd::Shutdown);
    }
}

// ── Runtime ──────────────────────────────────────────────────────────────────

/// Spawn the runtime on a dedicated thread.
///
/// `build_sounds` runs on the new thread and must return one sound per
/// catalog entry. `on_event` is called from the runtime thread.
pub fn spawn_runtime<S, B, F>(
    catalog: Catalog,
    options: RuntimeOptions,
    build_sounds: B,
    on_event: F,
) -> Result<RuntimeHandle>
where
    S: Sound + 'static,
    B: FnOnce(&Catalog) -> Result<Vec<S>> + Send + 'static,
    F: Fn(RuntimeEvent) + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<RuntimeCmd>();

    std::thread::Builder::new()
        .name("soundscape-runtime".into())
        .spawn(move || {
            let sounds = match build_sounds(&catalog) {
                Ok(sounds) => sounds,
                Err(e) => {
                    error!(error = %e, "Failed to load sounds.");
                    on_event(RuntimeEvent::Error(e.to_string()));
                    return;
                }
            };
            let scheduler = match PlaylistScheduler::new(&catalog, sounds, options.settings) {
                Ok(s) => match options.seed {
                    Some(seed) => s.with_seed(seed),
                    None => s,
                },
                Err(e) => {
                    error!(error = %e, "Failed to build scheduler.");
                    on_event(RuntimeEvent::Error(e.to_string()));
                    return;
                }
            };
            runtime_loop(rx, scheduler, &options, on_event);
        })?;

    Ok(RuntimeHandle { tx })
}

/// Main loop for the runtime thread. Owns the scheduler.
fn runtime_loop<S, F>(
    rx: mpsc::Receiver<RuntimeCmd>,
    mut scheduler: PlaylistScheduler<S>,
    options: &RuntimeOptions,
    on_event: F,
) where
    S: Sound,
    F: Fn(RuntimeEvent),
{
    let mut sync = Timer::new(options.sync_interval);
    sync.start(Instant::now());

    info!(tracks = scheduler.len(), "Runtime ready.");
    on_event(RuntimeEvent::Ready {
        tracks: scheduler.len(),
    });

    loop {
        match rx.recv_timeout(options.tick) {
            Ok(cmd) => {
                let now = Instant::now();
                match cmd {
                    RuntimeCmd::Start => {
                        let heads = scheduler.start(now);
                        on_event(RuntimeEvent::Started(heads));
                    }

                    RuntimeCmd::Stop => {
                        scheduler.stop(now);
                        on_event(RuntimeEvent::Stopped);
                    }

                    RuntimeCmd::Toggle(track) => {
                        if track >= scheduler.len() {
                            let e = Error::TrackOutOfRange {
                                track,
                                len: scheduler.len(),
                            };
                            on_event(RuntimeEvent::Error(e.to_string()));
                        } else {
                            let state = scheduler.toggle(track, now);
                            on_event(RuntimeEvent::Toggled { track, state });
                        }
                    }

                    RuntimeCmd::Snapshot(reply) => {
                        let _ = reply.send(scheduler.snapshot());
                    }

                    RuntimeCmd::Shutdown => {
                        scheduler.stop(now);
                        info!("Runtime shutting down.");
                        break;
                    }
                }
            }

            Err(mpsc::RecvTimeoutError::Timeout) => {}

            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // All handles dropped
                break;
            }
        }

        let now = Instant::now();
        if let Some(rotation) = scheduler.tick(now) {
            on_event(RuntimeEvent::Rotated(rotation));
        }
        if sync.fire_if_due(now) {
            on_event(RuntimeEvent::Volumes(scheduler.volumes()));
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::SilentSound;

    fn fast_options() -> RuntimeOptions {
        RuntimeOptions {
            settings: Settings {
                fade_in: Duration::from_millis(40),
                fade_out: Duration::from_millis(20),
                max_volume: 0.8,
                rotation_interval: Duration::from_millis(150),
                voices: 2,
            },
            tick: Duration::from_millis(5),
            sync_interval: Duration::from_millis(20),
            seed: Some(42),
        }
    }

    fn spawn_silent(n: usize) -> (RuntimeHandle, mpsc::Receiver<RuntimeEvent>) {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_runtime(
            Catalog::default_clips("audio"),
            fast_options(),
            move |_| Ok(SilentSound::many(n)),
            move |evt| {
                let _ = tx.send(evt);
            },
        )
        .unwrap();
        (handle, rx)
    }

    /// Wait for the first event matching `pred`.
    fn wait_for(
        rx: &mpsc::Receiver<RuntimeEvent>,
        pred: impl Fn(&RuntimeEvent) -> bool,
    ) -> Option<RuntimeEvent> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_millis(50)) {
                Ok(evt) if pred(&evt) => return Some(evt),
                Ok(_) => {}
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    #[test]
    fn handle_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuntimeHandle>();
    }

    #[test]
    fn emits_ready_then_started() {
        let (handle, rx) = spawn_silent(15);
        assert_eq!(
            wait_for(&rx, |e| matches!(e, RuntimeEvent::Ready { .. })),
            Some(RuntimeEvent::Ready { tracks: 15 })
        );
        handle.start().unwrap();
        match wait_for(&rx, |e| matches!(e, RuntimeEvent::Started(_))) {
            Some(RuntimeEvent::Started(heads)) => {
                assert_eq!(heads.len(), 2);
                assert_ne!(heads[0], heads[1]);
            }
            other => panic!("expected Started, got {:?}", other),
        }
        handle.shutdown();
    }

    #[test]
    fn rotates_on_timer() {
        let (handle, rx) = spawn_silent(15);
        handle.start().unwrap();
        let started = match wait_for(&rx, |e| matches!(e, RuntimeEvent::Started(_))) {
            Some(RuntimeEvent::Started(heads)) => heads,
            other => panic!("expected Started, got {:?}", other),
        };
        match wait_for(&rx, |e| matches!(e, RuntimeEvent::Rotated(_))) {
            Some(RuntimeEvent::Rotated(rot)) => {
                assert_eq!(rot.evicted, Some(started[0]));
                assert!(!started.contains(&rot.added));
            }
            other => panic!("expected Rotated, got {:?}", other),
        }
        handle.shutdown();
    }

    #[test]
    fn no_rotation_after_stop() {
        let (handle, rx) = spawn_silent(15);
        handle.start().unwrap();
        handle.stop().unwrap();
        assert!(wait_for(&rx, |e| matches!(e, RuntimeEvent::Stopped)).is_some());

        std::thread::sleep(Duration::from_millis(400));
        let rotated = rx
            .try_iter()
            .any(|e| matches!(e, RuntimeEvent::Rotated(_)));
        assert!(!rotated);

        let snapshot = handle.snapshot().unwrap();
        assert!(snapshot.iter().all(|t| !t.playing && t.volume == 0.0));
        handle.shutdown();
    }

    #[test]
    fn toggle_out_of_range_reports_error() {
        let (handle, rx) = spawn_silent(15);
        handle.toggle(99).unwrap();
        match wait_for(&rx, |e| matches!(e, RuntimeEvent::Error(_))) {
            Some(RuntimeEvent::Error(msg)) => assert!(msg.contains("99")),
            other => panic!("expected Error, got {:?}", other),
        }
        handle.shutdown();
    }

    #[test]
    fn toggle_reports_new_state() {
        let (handle, rx) = spawn_silent(15);
        handle.toggle(3).unwrap();
        assert_eq!(
            wait_for(&rx, |e| matches!(e, RuntimeEvent::Toggled { .. })),
            Some(RuntimeEvent::Toggled {
                track: 3,
                state: FadeState::FadingIn
            })
        );
        handle.shutdown();
    }

    #[test]
    fn volume_sync_reports_every_track() {
        let (handle, rx) = spawn_silent(15);
        handle.start().unwrap();
        match wait_for(&rx, |e| matches!(e, RuntimeEvent::Volumes(_))) {
            Some(RuntimeEvent::Volumes(v)) => {
                assert_eq!(v.len(), 15);
                assert!(v.iter().all(|&x| (0.0..=0.8).contains(&x)));
            }
            other => panic!("expected Volumes, got {:?}", other),
        }
        handle.shutdown();
    }

    #[test]
    fn sound_build_failure_is_reported() {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_runtime(
            Catalog::default_clips("audio"),
            fast_options(),
            |_| -> Result<Vec<SilentSound>> { Err(Error::AudioOutput("no device".into())) },
            move |evt| {
                let _ = tx.send(evt);
            },
        )
        .unwrap();
        match wait_for(&rx, |e| matches!(e, RuntimeEvent::Error(_))) {
            Some(RuntimeEvent::Error(msg)) => assert!(msg.contains("no device")),
            other => panic!("expected Error, got {:?}", other),
        }
        std::thread::sleep(Duration::from_millis(50));
        assert!(matches!(handle.snapshot(), Err(Error::RuntimeGone)));
    }

    #[test]
    fn catalog_too_small_is_reported() {
        let (tx, rx) = mpsc::channel();
        let _handle = spawn_runtime(
            Catalog::new("audio", vec!["a.mp3".into(), "b.mp3".into()]),
            fast_options(),
            |_| Ok(SilentSound::many(2)),
            move |evt| {
                let _ = tx.send(evt);
            },
        )
        .unwrap();
        assert!(wait_for(&rx, |e| matches!(e, RuntimeEvent::Error(_))).is_some());
    }
}
