/*
 *  playback/mod.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Playback controller: single file and folder cycling render loops
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

pub mod cycle_timer;
pub mod session;

pub use cycle_timer::CycleTimer;
pub use session::Session;

use log::{debug, error, info, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use walkdir::WalkDir;

use crate::constants::{
    CYCLE_EXTENSIONS, DEFAULT_DWELL, DEFAULT_FRAME_DELAY, ERROR_CLEAR_AFTER, MSG_NEW_SELECTION,
    MSG_SHUTDOWN, MSG_STOPPED, SELECTION_CLEAR_AFTER, STOPPED_CLEAR_AFTER,
};
use crate::decoder::FrameCache;
use crate::display::{DeviceChannel, PanelError, StatusOverlay};
use crate::frame::FrameSequence;

/// What to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Loop one file forever
    Single(PathBuf),
    /// Rotate through every GIF in a folder
    Cycle(PathBuf),
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Single(path) => write!(f, "file {}", path.display()),
            PlaybackMode::Cycle(folder) => write!(f, "cycle over {}", folder.display()),
        }
    }
}

/// Controller state as seen from outside
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    PlayingSingle(PathBuf),
    PlayingCycle { folder: PathBuf, paths: Vec<PathBuf>, index: usize },
}

/// Coarse status for front-ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Playing,
    Error(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => write!(f, "Stopped"),
            Status::Playing => write!(f, "Playing..."),
            Status::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// Timing and initial invert for a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSettings {
    pub frame_delay: Duration,
    pub dwell: Duration,
    pub invert: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            frame_delay: DEFAULT_FRAME_DELAY,
            dwell: DEFAULT_DWELL,
            invert: false,
        }
    }
}

/// True for files a cycle folder picks up.
pub fn is_cycle_candidate(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CYCLE_EXTENSIONS.iter().any(|c| ext.eq_ignore_ascii_case(c)))
}

/// Eligible files directly inside `folder`, sorted by name.
///
/// The folder is created when missing, so a fresh install ends up with an
/// empty folder rather than an I/O error.
pub fn scan_folder(folder: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(folder)?;
    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_cycle_candidate(path))
        .collect();
    paths.sort();
    Ok(paths)
}

struct ActiveSession {
    mode: PlaybackMode,
    items: Vec<Arc<FrameSequence>>,
    session: Arc<Session>,
    workers: Vec<JoinHandle<()>>,
}

/// Playback state machine
///
/// Owns at most one session at a time. Every transition first stops the
/// previous session and joins its threads, so no two render loops ever
/// overlap. Calls may come from any thread.
pub struct PlaybackController {
    channel: Arc<DeviceChannel>,
    cache: Arc<FrameCache>,
    overlay: StatusOverlay,
    frame_delay: Duration,
    dwell: Duration,
    invert: AtomicBool,
    active: Mutex<Option<ActiveSession>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl PlaybackController {
    pub fn new(channel: Arc<DeviceChannel>, cache: Arc<FrameCache>, settings: PlaybackSettings) -> Self {
        Self {
            overlay: StatusOverlay::new(Arc::clone(&channel)),
            channel,
            cache,
            frame_delay: settings.frame_delay,
            dwell: settings.dwell,
            invert: AtomicBool::new(settings.invert),
            active: Mutex::new(None),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn start_single(&self, path: impl Into<PathBuf>) -> Result<(), PanelError> {
        self.start(PlaybackMode::Single(path.into()))
    }

    pub fn start_cycle(&self, folder: impl Into<PathBuf>) -> Result<(), PanelError> {
        self.start(PlaybackMode::Cycle(folder.into()))
    }

    /// Stop whatever is playing and start `mode`.
    ///
    /// Decode failures (single) and empty folders (cycle) are flashed on the
    /// panel, recorded as the current error and returned; no render loop is
    /// spawned in that case.
    pub fn start(&self, mode: PlaybackMode) -> Result<(), PanelError> {
        let mut active = self.lock_active();
        self.start_locked(&mut active, mode)
    }

    /// Stop playback and show the stopped notice.
    pub fn stop(&self) {
        let mut active = self.lock_active();
        if halt(&mut active) {
            info!("Playback stopped");
        }
        self.set_error(None);
        self.overlay.notify(MSG_STOPPED, self.is_inverted(), Some(STOPPED_CLEAR_AFTER));
    }

    /// Flip the invert flag, restarting the current session around it.
    ///
    /// Returns the new flag.
    pub fn toggle_invert(&self) -> bool {
        let mut active = self.lock_active();
        let resume = active
            .as_ref()
            .filter(|run| run.session.is_running())
            .map(|run| run.mode.clone());
        halt(&mut active);

        let inverted = !self.invert.fetch_xor(true, Ordering::SeqCst);
        info!("Invert {}", if inverted { "on" } else { "off" });

        if let Some(mode) = resume {
            if let Err(e) = self.start_locked(&mut active, mode) {
                warn!("Could not resume after invert: {}", e);
            }
        }
        inverted
    }

    /// Switch the single-file source.
    ///
    /// While something is playing this restarts on the new file, otherwise
    /// it only flashes a notice.
    pub fn select_file(&self, path: impl Into<PathBuf>) -> Result<(), PanelError> {
        let path = path.into();
        let mut active = self.lock_active();
        if is_running(&active) {
            self.start_locked(&mut active, PlaybackMode::Single(path))
        } else {
            info!("Selected {}", path.display());
            self.overlay.notify(MSG_NEW_SELECTION, self.is_inverted(), Some(SELECTION_CLEAR_AFTER));
            Ok(())
        }
    }

    /// Stop, leave the reset hint on the panel and release the device.
    pub fn shutdown(&self) {
        let mut active = self.lock_active();
        halt(&mut active);
        if let Err(e) = self.overlay.show(MSG_SHUTDOWN, self.is_inverted(), None) {
            debug!("Shutdown notice not shown: {}", e);
        }
        self.channel.close();
        info!("Playback engine shut down");
    }

    pub fn status(&self) -> Status {
        if let Some(msg) = lock(&self.last_error).clone() {
            return Status::Error(msg);
        }
        if is_running(&self.lock_active()) { Status::Playing } else { Status::Idle }
    }

    pub fn state(&self) -> PlayerState {
        let active = self.lock_active();
        match active.as_ref() {
            Some(run) if run.session.is_running() => match &run.mode {
                PlaybackMode::Single(path) => PlayerState::PlayingSingle(path.clone()),
                PlaybackMode::Cycle(folder) => PlayerState::PlayingCycle {
                    folder: folder.clone(),
                    paths: run.items.iter().map(|seq| seq.path().to_path_buf()).collect(),
                    index: run.session.index(),
                },
            },
            _ => PlayerState::Idle,
        }
    }

    pub fn is_playing(&self) -> bool {
        is_running(&self.lock_active())
    }

    pub fn is_inverted(&self) -> bool {
        self.invert.load(Ordering::SeqCst)
    }

    fn start_locked(&self, active: &mut Option<ActiveSession>, mode: PlaybackMode) -> Result<(), PanelError> {
        halt(active);
        self.set_error(None);

        let invert = self.is_inverted();
        let items = match self.prepare(&mode) {
            Ok(items) => items,
            Err(e) => {
                self.report(&e, invert);
                return Err(e);
            }
        };

        // a late "stopped" clear must not blank the new animation
        self.overlay.cancel_pending();
        let session = Arc::new(Session::new());
        let render = RenderLoop {
            channel: Arc::clone(&self.channel),
            overlay: self.overlay.clone(),
            session: Arc::clone(&session),
            items: items.clone(),
            frame_delay: self.frame_delay,
            invert,
            last_error: Arc::clone(&self.last_error),
        }
        .spawn()?;

        let mut workers = vec![render];
        if let PlaybackMode::Cycle(_) = mode {
            match CycleTimer::new(items.len(), self.dwell).spawn(Arc::clone(&session)) {
                Ok(timer) => workers.push(timer),
                Err(e) => {
                    session.stop();
                    join_all(workers);
                    return Err(e.into());
                }
            }
        }

        info!("Playing {} ({} item(s), invert {})", mode, items.len(), invert);
        *active = Some(ActiveSession { mode, items, session, workers });
        Ok(())
    }

    fn prepare(&self, mode: &PlaybackMode) -> Result<Vec<Arc<FrameSequence>>, PanelError> {
        match mode {
            PlaybackMode::Single(path) => Ok(vec![self.cache.load(path)?]),
            PlaybackMode::Cycle(folder) => {
                let items: Vec<_> = scan_folder(folder)?
                    .iter()
                    .filter_map(|path| {
                        self.cache
                            .load(path)
                            .map_err(|e| warn!("Skipping {} in cycle: {}", path.display(), e))
                            .ok()
                    })
                    .collect();
                if items.is_empty() {
                    return Err(PanelError::EmptyCycle(folder.clone()));
                }
                Ok(items)
            }
        }
    }

    fn report(&self, e: &PanelError, invert: bool) {
        warn!("{}", e);
        self.set_error(Some(e.to_string()));
        self.overlay.notify(e.overlay_text(), invert, Some(ERROR_CLEAR_AFTER));
    }

    fn set_error(&self, msg: Option<String>) {
        *lock(&self.last_error) = msg;
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        lock(&self.active)
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        halt(&mut self.lock_active());
    }
}

/// Stop and join the active session; true if there was one.
fn halt(active: &mut Option<ActiveSession>) -> bool {
    match active.take() {
        Some(run) => {
            run.session.stop();
            join_all(run.workers);
            true
        }
        None => false,
    }
}

fn join_all(workers: Vec<JoinHandle<()>>) {
    for worker in workers {
        let name = worker.thread().name().unwrap_or("worker").to_string();
        if worker.join().is_err() {
            error!("{} thread panicked", name);
        }
    }
}

fn is_running(active: &Option<ActiveSession>) -> bool {
    active.as_ref().is_some_and(|run| run.session.is_running())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One render thread
///
/// Walks the current item frame by frame, checking the running flag before
/// each send and sleeping through the session so a stop cuts the delay
/// short. A pending cycle index is adopted only after a full pass.
struct RenderLoop {
    channel: Arc<DeviceChannel>,
    overlay: StatusOverlay,
    session: Arc<Session>,
    items: Vec<Arc<FrameSequence>>,
    frame_delay: Duration,
    invert: bool,
    last_error: Arc<Mutex<Option<String>>>,
}

impl RenderLoop {
    fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("oled-render".into())
            .spawn(move || self.run())
    }

    fn run(self) {
        let mut current = self.session.index();
        'session: while self.session.is_running() {
            let Some(sequence) = self.items.get(current) else {
                error!("Cycle index {} out of range", current);
                break;
            };
            for frame in sequence.iter() {
                if !self.session.is_running() {
                    break 'session;
                }
                if let Err(e) = self.channel.send(frame, self.invert) {
                    self.fail(e);
                    break 'session;
                }
                if !self.session.sleep(self.frame_delay) {
                    break 'session;
                }
            }
            if let Some(next) = self.session.take_pending() {
                if let Some(item) = self.items.get(next) {
                    info!("Now showing {}", item.path().display());
                }
                current = next;
            }
        }
        debug!("Render loop exiting");
    }

    fn fail(&self, e: PanelError) {
        error!("Playback halted: {}", e);
        *lock(&self.last_error) = Some(e.to_string());
        self.session.stop();
        self.overlay.notify(e.overlay_text(), self.invert, Some(ERROR_CLEAR_AFTER));
    }
}
