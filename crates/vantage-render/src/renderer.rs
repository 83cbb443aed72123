//! The viewport renderer: a background thread that turns the installed render
//! target into frames and publishes them to subscribed sinks.
//!
//! The render target slot is the only state behind a lock. Quality level,
//! frame-rate cap and the lifecycle flags are atomics so that UI threads can
//! change them without waiting for a frame in flight. A change is picked up by
//! the next loop iteration at the latest.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use vantage_core::{
    Fingerprint, FramePacer, RenderedFrame, RendererConfig, VantageError, VantageResult,
};

use crate::sink::{FrameSink, SubscriptionId};
use crate::target::RenderTarget;

/// What a single loop iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// No render target installed.
    Idle,
    /// Static target with unchanged content and no pending quality change.
    Unchanged,
    /// A frame is due but the frame-rate cap has not elapsed yet.
    Throttled(Duration),
    /// A frame was produced and published.
    Produced(FrameStats),
    /// Production was attempted and failed; sinks were told.
    Failed,
}

impl IterationOutcome {
    pub fn is_produced(&self) -> bool {
        matches!(self, IterationOutcome::Produced(_))
    }
}

/// Metadata of a published frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub sequence: u64,
    pub frame_delta: Duration,
    pub detail_level: Option<u32>,
}

/// Sink notification produced by an iteration. Delivered on the producing
/// thread before the target lock is released.
enum Delivery {
    Frame(RenderedFrame),
    Failed(VantageError),
}

struct Slot {
    target: Option<RenderTarget>,
    /// Fingerprint of the static target at its last production attempt.
    /// `None` until the installed target has been observed once.
    observed: Option<Fingerprint>,
    pacer: FramePacer,
    /// Message of the last failed attempt; repeats are logged at trace level.
    last_failure: Option<String>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(mut target) = self.target.take() {
            if let Err(e) = target.dispose() {
                tracing::warn!("Failed to dispose render target {}: {}", target.label(), e);
            }
        }
    }
}

struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
    /// Even while stopped, odd while running. Every start and stop bumps it,
    /// so a worker is current only while the state equals its start value.
    state: AtomicU64,
    has_target: AtomicBool,
    /// Thread currently notifying sinks.
    delivering: Mutex<Option<ThreadId>>,
    /// Target change requested by a sink during delivery.
    deferred: Mutex<Option<Option<RenderTarget>>>,
    quality_level: AtomicU32,
    quality_pending: AtomicBool,
    max_fps: AtomicU32,
    sequence: AtomicU64,
    sinks: RwLock<Vec<(SubscriptionId, Arc<dyn FrameSink>)>>,
    next_subscription: AtomicU64,
    idle_backoff: Duration,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.state.load(Ordering::Acquire) == generation
    }

    fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) % 2 == 1
    }

    /// Dispose the installed target and put `next` in its place. On a
    /// disposal failure the slot is left untouched.
    fn install(&self, slot: &mut Slot, next: Option<RenderTarget>) -> VantageResult<()> {
        if let Some(previous) = slot.target.as_mut() {
            previous.dispose().map_err(|e| {
                tracing::warn!("Failed to dispose render target {}: {}", previous.label(), e);
                match e {
                    VantageError::Dispose(_) => e,
                    other => VantageError::Dispose(other.to_string()),
                }
            })?;
            if let Some(old) = slot.target.take() {
                tracing::debug!("Released render target {}", old.label());
            }
        }
        if let Some(target) = &next {
            tracing::debug!("Installed {} render target {}", target.kind(), target.label());
        }
        self.has_target.store(next.is_some(), Ordering::Release);
        slot.target = next;
        slot.observed = None;
        slot.last_failure = None;
        slot.pacer.reset();
        Ok(())
    }

    fn iterate(&self, slot: &mut Slot) -> (IterationOutcome, Option<Delivery>) {
        let Slot {
            target,
            observed,
            pacer,
            last_failure,
        } = slot;
        let Some(target) = target.as_mut() else {
            return (IterationOutcome::Idle, None);
        };

        let fingerprint = if target.is_static() {
            let current = target.fingerprint();
            if *observed == Some(current) && !self.quality_pending.load(Ordering::Acquire) {
                return (IterationOutcome::Unchanged, None);
            }
            Some(current)
        } else {
            None
        };

        let now = Instant::now();
        if let Some(remaining) = pacer.remaining(now, self.max_fps.load(Ordering::Acquire)) {
            return (IterationOutcome::Throttled(remaining), None);
        }
        pacer.mark(now);

        // Consume the pending flag before reading the level: a request that
        // lands while this frame is in flight stays pending for the next one.
        self.quality_pending.store(false, Ordering::Release);
        let requested = self.quality_level.load(Ordering::Acquire);

        let started = Instant::now();
        let result = target.produce(requested);
        let frame_delta = started.elapsed();
        *observed = fingerprint;

        match result {
            Ok(production) => {
                let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
                let mut frame = RenderedFrame::new(production.buffer, frame_delta, sequence);
                if let Some(level) = production.detail_level {
                    frame = frame.with_detail_level(level);
                }
                *last_failure = None;
                tracing::trace!(
                    "Produced frame {} ({}x{}, detail {:?}) in {:?}",
                    sequence,
                    frame.width(),
                    frame.height(),
                    frame.detail_level,
                    frame_delta
                );
                let stats = FrameStats {
                    sequence,
                    frame_delta,
                    detail_level: production.detail_level,
                };
                (IterationOutcome::Produced(stats), Some(Delivery::Frame(frame)))
            }
            Err(e) => {
                let message = e.to_string();
                if last_failure.as_deref() == Some(message.as_str()) {
                    tracing::trace!("Frame production failed again for {}: {}", target.label(), e);
                } else {
                    tracing::warn!("Frame production failed for {}: {}", target.label(), e);
                }
                *last_failure = Some(message);
                (IterationOutcome::Failed, Some(Delivery::Failed(e)))
            }
        }
    }

    /// Run one iteration and notify sinks. The caller holds the target lock
    /// throughout, so the target cannot be replaced while a sink is still
    /// handling its frame. A target change requested by a sink is applied
    /// once all sinks have returned.
    fn step(&self, slot: &mut Slot) -> IterationOutcome {
        let (outcome, delivery) = self.iterate(slot);
        if let Some(delivery) = delivery {
            {
                let _delivering = DeliveryMark::enter(&self.delivering);
                self.deliver(delivery);
            }
            if let Some(next) = self.deferred.lock().take() {
                // Already logged by install; the old target stays installed.
                let _ = self.install(slot, next);
            }
        }
        outcome
    }

    /// Sinks are called on a copy of the list so that a sink may subscribe or
    /// unsubscribe from inside its callback.
    fn sink_snapshot(&self) -> Vec<Arc<dyn FrameSink>> {
        self.sinks.read().iter().map(|(_, sink)| Arc::clone(sink)).collect()
    }

    fn deliver(&self, delivery: Delivery) {
        match delivery {
            Delivery::Frame(frame) => {
                for sink in self.sink_snapshot() {
                    sink.frame_ready(frame.clone());
                }
            }
            Delivery::Failed(e) => {
                for sink in self.sink_snapshot() {
                    sink.frame_failed(&e);
                }
            }
        }
    }
}

/// Marks the current thread as delivering until dropped, also on unwind.
struct DeliveryMark<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> DeliveryMark<'a> {
    fn enter(cell: &'a Mutex<Option<ThreadId>>) -> Self {
        *cell.lock() = Some(thread::current().id());
        Self(cell)
    }
}

impl Drop for DeliveryMark<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

fn render_loop(shared: Arc<Shared>, generation: u64) {
    tracing::debug!("Render thread started (generation {})", generation);
    while shared.is_current(generation) {
        let mut slot = shared.slot.lock();
        let wait = match shared.step(&mut slot) {
            IterationOutcome::Produced(_) => None,
            IterationOutcome::Throttled(remaining) => Some(remaining),
            IterationOutcome::Idle | IterationOutcome::Unchanged | IterationOutcome::Failed => {
                Some(shared.idle_backoff).filter(|d| !d.is_zero())
            }
        };
        if let Some(timeout) = wait {
            if shared.is_current(generation) {
                shared.wake.wait_for(&mut slot, timeout);
            }
        }
    }
    tracing::debug!("Render thread exited (generation {})", generation);
}

/// Produces frames from a render target on a dedicated thread.
///
/// ```no_run
/// use vantage_render::{RenderTarget, StillImage, ViewportRenderer};
///
/// let renderer = ViewportRenderer::new();
/// renderer.subscribe(|frame: vantage_core::RenderedFrame| {
///     println!("frame {} took {:?}", frame.sequence, frame.frame_delta);
/// });
/// let image = image::open("splash.png").unwrap();
/// renderer
///     .set_render_target(RenderTarget::single_resolution(StillImage::new("splash", image)))
///     .unwrap();
/// renderer.start().unwrap();
/// ```
pub struct ViewportRenderer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    thread_name: String,
}

impl ViewportRenderer {
    pub fn new() -> Self {
        Self::with_config(&RendererConfig::default())
    }

    pub fn with_config(config: &RendererConfig) -> Self {
        let shared = Shared {
            slot: Mutex::new(Slot {
                target: None,
                observed: None,
                pacer: FramePacer::new(),
                last_failure: None,
            }),
            wake: Condvar::new(),
            state: AtomicU64::new(0),
            has_target: AtomicBool::new(false),
            delivering: Mutex::new(None),
            deferred: Mutex::new(None),
            quality_level: AtomicU32::new(config.quality_level),
            quality_pending: AtomicBool::new(false),
            max_fps: AtomicU32::new(config.max_frames_per_second),
            sequence: AtomicU64::new(0),
            sinks: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            idle_backoff: config.idle_backoff(),
        };
        Self {
            shared: Arc::new(shared),
            worker: Mutex::new(None),
            thread_name: config.thread_name.clone(),
        }
    }

    /// Spawn the render thread.
    pub fn start(&self) -> VantageResult<()> {
        let generation = self
            .shared
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s % 2 == 0).then_some(s + 1)
            })
            .map_err(|_| VantageError::lifecycle("start", "render thread is already running"))?
            + 1;
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || render_loop(shared, generation))
            .map_err(|e| {
                let _ = self.shared.state.compare_exchange(
                    generation,
                    generation + 1,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                VantageError::Thread(e.to_string())
            })?;
        // A worker from an earlier start/stop cycle exits on its own once it
        // sees the state change; its handle is simply detached.
        *self.worker.lock() = Some(handle);
        tracing::debug!("Viewport renderer started");
        Ok(())
    }

    /// Ask the render thread to exit after its current iteration. Does not
    /// wait for it.
    pub fn stop(&self) -> VantageResult<()> {
        self.shared
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s % 2 == 1).then_some(s + 1)
            })
            .map_err(|_| VantageError::lifecycle("stop", "render thread is not running"))?;
        self.shared.wake.notify_all();
        tracing::debug!("Viewport renderer stopping");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_running()
    }

    /// Install a new render target, disposing the previous one.
    ///
    /// Blocks while a frame is being produced or delivered. If disposing the
    /// previous target fails, it stays installed and `target` is dropped.
    ///
    /// Called from a sink callback, the change is deferred until every sink
    /// has returned and `Ok` is returned immediately; a disposal failure is
    /// then only logged.
    pub fn set_render_target(&self, target: RenderTarget) -> VantageResult<()> {
        self.replace_target(Some(target))
    }

    /// Dispose the current render target and leave the slot empty.
    pub fn clear_render_target(&self) -> VantageResult<()> {
        self.replace_target(None)
    }

    fn replace_target(&self, next: Option<RenderTarget>) -> VantageResult<()> {
        if *self.shared.delivering.lock() == Some(thread::current().id()) {
            tracing::debug!("Deferring render target change until sinks return");
            *self.shared.deferred.lock() = Some(next);
            return Ok(());
        }
        let mut slot = self.shared.slot.lock();
        self.shared.install(&mut slot, next)?;
        drop(slot);
        self.shared.wake.notify_all();
        Ok(())
    }

    pub fn has_render_target(&self) -> bool {
        self.shared.has_target.load(Ordering::Acquire)
    }

    /// Request a detail level; 0 is the best quality. Out-of-range levels are
    /// clamped per target when the frame is produced.
    pub fn set_requested_quality_level(&self, level: u32) {
        self.shared.quality_level.store(level, Ordering::Release);
        self.shared.quality_pending.store(true, Ordering::Release);
        self.shared.wake.notify_all();
    }

    pub fn requested_quality_level(&self) -> u32 {
        self.shared.quality_level.load(Ordering::Acquire)
    }

    /// True between a quality request and the next production attempt.
    pub fn has_pending_quality_change(&self) -> bool {
        self.shared.quality_pending.load(Ordering::Acquire)
    }

    /// Cap production at `fps` frames per second; 0 removes the cap.
    pub fn set_max_frame_count_per_second(&self, fps: u32) {
        self.shared.max_fps.store(fps, Ordering::Release);
        self.shared.wake.notify_all();
    }

    pub fn max_frame_count_per_second(&self) -> u32 {
        self.shared.max_fps.load(Ordering::Acquire)
    }

    /// Number of frames published so far.
    pub fn frames_produced(&self) -> u64 {
        self.shared.sequence.load(Ordering::Acquire)
    }

    pub fn subscribe(&self, sink: impl FrameSink + 'static) -> SubscriptionId {
        self.subscribe_arc(Arc::new(sink))
    }

    pub fn subscribe_arc(&self, sink: Arc<dyn FrameSink>) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.shared.sinks.write().push((id, sink));
        id
    }

    /// Returns false if the subscription was not found.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut sinks = self.shared.sinks.write();
        let before = sinks.len();
        sinks.retain(|(sid, _)| *sid != id);
        sinks.len() != before
    }

    /// Run one loop iteration on the calling thread.
    ///
    /// Serialized with the render thread through the target lock, so it can be
    /// used whether or not the renderer is started. Sinks are notified before
    /// this returns. Must not be called from a sink callback.
    pub fn render_once(&self) -> IterationOutcome {
        let mut slot = self.shared.slot.lock();
        self.shared.step(&mut slot)
    }
}

impl Default for ViewportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewportRenderer {
    fn drop(&mut self) {
        let _ = self
            .shared
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s % 2 == 1).then_some(s + 1)
            });
        self.shared.wake.notify_all();
        if let Some(handle) = self.worker.get_mut().take() {
            // Dropped from a sink callback: the render thread cannot join itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}
