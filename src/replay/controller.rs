//! Deterministic playback over a fixed event log.
//!
//! The controller rebuilds session state by feeding events through the same
//! handler registry used for live ingestion, then exposes transport
//! controls: play/pause, scrub, speed, and an autoplay countdown. Every
//! timer task carries the epoch it was spawned under and re-checks it under
//! the lock before touching state, so a tick that fires concurrently with a
//! cancellation can never advance the log.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::engine::HandlerRegistry;
use crate::error::EngineError;
use crate::event::TraceEvent;
use crate::session::SessionStore;

/// Tick period at speed 1.0.
pub const BASE_TICK_INTERVAL: Duration = Duration::from_millis(800);

/// Fastest allowed tick period regardless of speed.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(200);

pub const DEFAULT_COUNTDOWN_SECS: u32 = 3;

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayPhase {
    /// No log loaded; every transport control is a no-op.
    Idle,
    /// Log loaded, not advancing.
    Paused,
    /// Auto-play pending; a visible counter decrements once per second.
    CountingDown,
    /// A timer is advancing the log one event per tick.
    Playing,
}

/// Flags read once when replay starts.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Arm the countdown instead of loading the finished session.
    pub auto_play: bool,
    /// Artifact to pre-select in the panel after the initial rebuild.
    pub focus_target: Option<String>,
}

struct ReplayInner {
    events: Vec<TraceEvent>,
    session_id: String,
    phase: ReplayPhase,
    current_index: Option<usize>,
    speed: f64,
    countdown_remaining: Option<u32>,
    epoch: u64,
    ticker: Option<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
}

impl ReplayInner {
    /// Invalidate outstanding timers. The epoch bump comes first so a tick
    /// that already fired observes it and exits without mutating anything.
    fn fence_timers(&mut self) {
        self.epoch += 1;
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
        self.countdown_remaining = None;
    }
}

/// Drives deterministic playback of one session's event log.
///
/// Cheap to clone; clones share the same underlying state machine.
#[derive(Clone)]
pub struct ReplayController {
    inner: Arc<Mutex<ReplayInner>>,
    store: Arc<Mutex<SessionStore>>,
    registry: Arc<HandlerRegistry>,
}

impl std::fmt::Debug for ReplayController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayController").finish_non_exhaustive()
    }
}

impl ReplayController {
    /// Requires the full ordered log up front; an empty log cannot be
    /// played and is rejected here rather than failing later.
    pub fn new(
        events: Vec<TraceEvent>,
        session_id: impl Into<String>,
        store: Arc<Mutex<SessionStore>>,
        registry: Arc<HandlerRegistry>,
    ) -> Result<Self, EngineError> {
        if events.is_empty() {
            return Err(EngineError::EmptyLog);
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(ReplayInner {
                events,
                session_id: session_id.into(),
                phase: ReplayPhase::Paused,
                current_index: None,
                speed: 1.0,
                countdown_remaining: None,
                epoch: 0,
                ticker: None,
                countdown: None,
            })),
            store,
            registry,
        })
    }

    /// Take over the display and apply the start options: auto-play arms
    /// the countdown at offset zero, otherwise the finished session is
    /// rebuilt and the optional focus target pre-selected.
    pub fn engage(&self, options: &ReplayOptions) {
        let session_id = self.inner.lock().session_id.clone();
        self.store.lock().begin_replay_display(&session_id);

        if options.auto_play {
            self.store.lock().reset(&session_id);
            self.start_autoplay_countdown(DEFAULT_COUNTDOWN_SECS);
        } else {
            self.seek(1.0);
            if let Some(target) = &options.focus_target {
                self.store.lock().focus_artifact(&session_id, target);
            }
        }
    }

    /// Begin advancing one event per tick from the current offset.
    pub fn start(&self) {
        let mut inner = self.inner.lock();
        match inner.phase {
            ReplayPhase::Idle => {
                tracing::warn!("start ignored: no log loaded");
                return;
            }
            ReplayPhase::Playing => return,
            ReplayPhase::Paused | ReplayPhase::CountingDown => {}
        }
        inner.fence_timers();
        inner.phase = ReplayPhase::Playing;
        self.spawn_ticker_locked(&mut inner);
    }

    /// Stop the playback timer; the index is unchanged.
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        inner.fence_timers();
        if inner.phase == ReplayPhase::Playing || inner.phase == ReplayPhase::CountingDown {
            inner.phase = ReplayPhase::Paused;
        }
    }

    /// Jump to a position in `0.0..=1.0`: reset the session, replay every
    /// event up to `floor(position * (len - 1))`, and leave playback
    /// paused. Always a full rebuild, never a patch.
    pub fn seek(&self, position: f64) {
        let mut inner = self.inner.lock();
        if inner.phase == ReplayPhase::Idle || inner.events.is_empty() {
            tracing::warn!("seek ignored: no log loaded");
            return;
        }
        inner.fence_timers();
        inner.phase = ReplayPhase::Paused;

        let clamped = if position.is_finite() {
            position.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let target = (clamped * (inner.events.len() - 1) as f64).floor() as usize;

        let session_id = inner.session_id.clone();
        {
            let mut store = self.store.lock();
            store.reset(&session_id);
            for event in &inner.events[..=target] {
                self.registry.dispatch(event, &session_id, &mut store);
            }
        }
        inner.current_index = Some(target);
    }

    /// Change playback speed. While playing, the running timer restarts at
    /// the new period without re-applying or skipping any event.
    pub fn set_speed(&self, speed: f64) {
        let mut inner = self.inner.lock();
        inner.speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            1.0
        };
        if inner.phase == ReplayPhase::Playing {
            inner.fence_timers();
            self.spawn_ticker_locked(&mut inner);
        }
    }

    /// Arm auto-play: a visible counter decrements once per second and
    /// playback starts when it reaches zero.
    pub fn start_autoplay_countdown(&self, seconds: u32) {
        let mut inner = self.inner.lock();
        if inner.phase == ReplayPhase::Idle {
            tracing::warn!("countdown ignored: no log loaded");
            return;
        }
        if inner.phase == ReplayPhase::Playing {
            return;
        }
        inner.fence_timers();

        if seconds == 0 {
            inner.phase = ReplayPhase::Playing;
            self.spawn_ticker_locked(&mut inner);
            return;
        }

        inner.phase = ReplayPhase::CountingDown;
        inner.countdown_remaining = Some(seconds);
        let epoch = inner.epoch;
        let controller = self.clone();
        inner.countdown = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if !controller.countdown_tick(epoch) {
                    break;
                }
            }
        }));
    }

    /// Abort a pending countdown. Valid at any point while counting down;
    /// afterwards no timer-driven advancement can occur.
    pub fn cancel_autoplay(&self) {
        let mut inner = self.inner.lock();
        if inner.phase != ReplayPhase::CountingDown {
            return;
        }
        inner.fence_timers();
        inner.phase = ReplayPhase::Paused;
    }

    /// Tear down all timers, unload the log, and release the display.
    pub fn exit(&self) {
        let mut inner = self.inner.lock();
        inner.fence_timers();
        inner.phase = ReplayPhase::Idle;
        inner.events.clear();
        inner.current_index = None;
        let session_id = inner.session_id.clone();
        drop(inner);

        self.store.lock().end_replay_display(&session_id);
    }

    pub fn phase(&self) -> ReplayPhase {
        self.inner.lock().phase
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().phase == ReplayPhase::Playing
    }

    /// Index of the last applied event, if any has been applied yet.
    pub fn current_index(&self) -> Option<usize> {
        self.inner.lock().current_index
    }

    /// Seconds left on the auto-play countdown, while one is pending.
    pub fn countdown_remaining(&self) -> Option<u32> {
        self.inner.lock().countdown_remaining
    }

    pub fn speed(&self) -> f64 {
        self.inner.lock().speed
    }

    pub fn session_id(&self) -> String {
        self.inner.lock().session_id.clone()
    }

    /// Number of events in the loaded log (zero after `exit`).
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fraction of the log applied so far, for scrubber display.
    pub fn progress(&self) -> f64 {
        let inner = self.inner.lock();
        match (inner.current_index, inner.events.len()) {
            (Some(index), len) if len > 1 => index as f64 / (len - 1) as f64,
            (Some(_), _) => 1.0,
            (None, _) => 0.0,
        }
    }

    fn spawn_ticker_locked(&self, inner: &mut ReplayInner) {
        let epoch = inner.epoch;
        let period = tick_period(inner.speed);
        let controller = self.clone();
        inner.ticker = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if !controller.advance_if_current(epoch) {
                    break;
                }
            }
        }));
    }

    /// Apply exactly one event, provided the caller's epoch is still
    /// current. Dispatch happens under the controller lock, which is what
    /// keeps a single event "in flight" at a time.
    fn advance_if_current(&self, epoch: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch || inner.phase != ReplayPhase::Playing {
            return false;
        }

        let next = inner.current_index.map_or(0, |index| index + 1);
        if next >= inner.events.len() {
            inner.phase = ReplayPhase::Paused;
            inner.ticker = None;
            return false;
        }

        let event = inner.events[next].clone();
        let session_id = inner.session_id.clone();
        {
            let mut store = self.store.lock();
            self.registry.dispatch(&event, &session_id, &mut store);
        }
        inner.current_index = Some(next);
        true
    }

    fn countdown_tick(&self, epoch: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch || inner.phase != ReplayPhase::CountingDown {
            return false;
        }

        let remaining = inner.countdown_remaining.unwrap_or(1).saturating_sub(1);
        if remaining > 0 {
            inner.countdown_remaining = Some(remaining);
            return true;
        }

        inner.fence_timers();
        inner.phase = ReplayPhase::Playing;
        self.spawn_ticker_locked(&mut inner);
        false
    }
}

fn tick_period(speed: f64) -> Duration {
    BASE_TICK_INTERVAL.div_f64(speed).max(MIN_TICK_INTERVAL)
}
