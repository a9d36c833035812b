//! Event transport for the navigation subsystem.
//!
//! Navigation requests arrive over a bounded mpsc channel so any part of the
//! application can ask for a navigation without holding a reference to the
//! text view. Channel policy: single consumer (the view glue), many cheap
//! publisher handles; the bound provides natural backpressure rather than a
//! lossy drop strategy. Requests are low-rate human actions, so a small cap
//! keeps memory flat without ever realistically blocking a producer.
//! Telemetry counters record send failures; they can be inspected in unit
//! tests or periodically logged.

use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const NAV_CHANNEL_CAP: usize = 256;

// Atomic counters, fetch_add relaxed. Intentionally minimal.
pub static NAV_REQUESTS: AtomicU64 = AtomicU64::new(0);
pub static NAV_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static TICKS_EMITTED: AtomicU64 = AtomicU64::new(0);

/// A navigation trigger as delivered by the rest of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateRequest {
    /// Raw character range; validated and clamped against the buffer length
    /// at execution time, not publication time.
    Chars { position: i64, length: i64 },
    /// 1-based line number, resolved to a character range downstream.
    Line { number: usize },
}

/// Events consumed by the view glue's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    Navigate(NavigateRequest),
    /// Heartbeat from the tick source; drives the convergence scheduler and
    /// the highlight fade.
    Tick,
    Shutdown,
}

/// Create the subsystem's bounded event channel.
pub fn channel() -> (Sender<NavEvent>, Receiver<NavEvent>) {
    tokio::sync::mpsc::channel(NAV_CHANNEL_CAP)
}

/// Cheap publisher handle handed to any component that may request a
/// navigation.
#[derive(Debug, Clone)]
pub struct NavigationBus {
    tx: Sender<NavEvent>,
}

impl NavigationBus {
    pub fn new(tx: Sender<NavEvent>) -> Self {
        Self { tx }
    }

    /// Publish a navigation request. Returns `false` when the consumer is
    /// gone (channel closed); the failure is counted, not surfaced.
    pub async fn request(&self, request: NavigateRequest) -> bool {
        use std::sync::atomic::Ordering::Relaxed;
        NAV_REQUESTS.fetch_add(1, Relaxed);
        match self.tx.send(NavEvent::Navigate(request)).await {
            Ok(()) => true,
            Err(_) => {
                NAV_SEND_FAILURES.fetch_add(1, Relaxed);
                tracing::warn!(target: "nav.events", ?request, "request_dropped_channel_closed");
                false
            }
        }
    }

    /// Ask the event loop to shut down.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(NavEvent::Shutdown).await;
    }
}

/// Trait implemented by any async event producer. Implementors hold their
/// configuration and spawn one background task that pushes `NavEvent`s into
/// the shared channel. On channel send failure (consumer dropped) the task
/// must terminate promptly; implementations avoid busy loops by awaiting
/// timers or external futures.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging.
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task, returning its JoinHandle.
    fn spawn(self: Box<Self>, tx: Sender<NavEvent>) -> JoinHandle<()>;
}

/// Registry of event sources spawned together at startup.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, source: S) {
        self.sources.push(Box::new(source));
    }

    /// Spawn all registered sources, returning their JoinHandles. The
    /// supplied `Sender` stays owned by the caller; each source receives its
    /// own clone, so once the caller drops its final clone the sources
    /// observe the closed channel and exit cooperatively. Call after the
    /// channel exists and before the loop begins consuming.
    pub fn spawn_all(&mut self, tx: &Sender<NavEvent>) -> Vec<JoinHandle<()>> {
        // Drain so duplicate spawns are prevented if called twice.
        let mut handles = Vec::with_capacity(self.sources.len());
        for source in self.sources.drain(..) {
            let name = source.name();
            tracing::info!(target: "nav.events", source = name, "spawning event source");
            handles.push(source.spawn(tx.clone()));
        }
        handles
    }
}

/// Interval-adjustable tick source driving the convergence scheduler and the
/// highlight fade.
///
/// The scheduler escalates its polling interval partway through a session,
/// so the cadence cannot be fixed at spawn time: the consumer publishes the
/// currently wanted interval through a watch channel and the source re-arms
/// accordingly. `None` means no ticking wanted right now (navigator idle).
pub struct SchedulerTickSource {
    interval_rx: watch::Receiver<Option<Duration>>,
}

impl SchedulerTickSource {
    /// Returns the source plus the handle used to adjust or pause its
    /// cadence.
    pub fn new(initial: Option<Duration>) -> (Self, watch::Sender<Option<Duration>>) {
        let (tx, rx) = watch::channel(initial);
        (Self { interval_rx: rx }, tx)
    }
}

impl AsyncEventSource for SchedulerTickSource {
    fn name(&self) -> &'static str {
        "scheduler_tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<NavEvent>) -> JoinHandle<()> {
        let mut interval_rx = self.interval_rx;
        tokio::spawn(async move {
            loop {
                let wanted = *interval_rx.borrow_and_update();
                match wanted {
                    Some(interval) => {
                        tokio::select! {
                            _ = tokio::time::sleep(interval) => {
                                TICKS_EMITTED
                                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                                if tx.send(NavEvent::Tick).await.is_err() {
                                    break;
                                }
                            }
                            changed = interval_rx.changed() => {
                                // Re-arm immediately with the new interval.
                                if changed.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    None => {
                        tokio::select! {
                            changed = interval_rx.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                            _ = tx.closed() => break,
                        }
                    }
                }
            }
        })
    }
}
