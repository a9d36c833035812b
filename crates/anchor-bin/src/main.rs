//! Anchorline entrypoint: drives one anchor navigation against a simulated
//! document, with optional mid-session layout perturbations, and reports the
//! subsystem's telemetry at the end.

mod sim;

use anyhow::Result;
use clap::Parser;
use core_events::{
    EventSourceRegistry, NavEvent, NavigateRequest, NavigationBus, SchedulerTickSource,
};
use core_navigate::{AnchorNavigator, NavHost, NavigationOutcome};
use sim::SimWorld;
use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, trace, warn};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "anchorline", version, about = "Anchor navigation demo")]
struct Args {
    /// Optional configuration file path (overrides discovery of
    /// `anchorline.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Simulated document length in characters.
    #[arg(long, default_value_t = 2000)]
    buffer_len: usize,
    /// Simulated viewport height in content units.
    #[arg(long, default_value_t = 120.0)]
    viewport_height: f64,
    /// Character position to navigate to (defaults to the document middle).
    #[arg(long)]
    position: Option<i64>,
    /// Length of the highlighted range.
    #[arg(long, default_value_t = 10)]
    length: i64,
    /// Navigate to a 1-based line number instead of a character range.
    #[arg(long, conflicts_with = "position")]
    line: Option<usize>,
    /// Simulate an expanded header collapsing at the top of the view.
    #[arg(long, default_value_t = false)]
    header_expanded: bool,
    /// Shrink the container by 20 units after this many scheduler ticks.
    #[arg(long)]
    resize_after: Option<u32>,
    /// Shift all content down by this many units after the first tick.
    #[arg(long)]
    drift: Option<f64>,
}

fn configure_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

struct NavRuntime {
    world: SimWorld,
    nav: AnchorNavigator,
    rx: mpsc::Receiver<NavEvent>,
    interval_tx: watch::Sender<Option<Duration>>,
    source_handles: Vec<tokio::task::JoinHandle<()>>,
    header_expanded: bool,
    resize_after: Option<u32>,
    drift: Option<f64>,
}

impl NavRuntime {
    async fn run(&mut self) -> Result<()> {
        while let Some(event) = self.rx.recv().await {
            match event {
                NavEvent::Navigate(request) => {
                    let outcome = self.handle_navigate(request);
                    info!(target: "runtime", ?request, ?outcome, "navigate_handled");
                    if matches!(outcome, NavigationOutcome::Rejected(_)) {
                        break;
                    }
                    self.publish_interval();
                }
                NavEvent::Tick => {
                    if !self.handle_tick() {
                        break;
                    }
                    self.publish_interval();
                }
                NavEvent::Shutdown => break,
            }
        }
        self.rx.close();
        self.finalize_shutdown().await;
        Ok(())
    }

    fn handle_navigate(&mut self, request: NavigateRequest) -> NavigationOutcome {
        // Resolve line requests against the document before the host borrows
        // it mutably.
        let chars = match request {
            NavigateRequest::Chars { position, length } => Ok((position, length)),
            NavigateRequest::Line { number } => {
                core_navigate::line_target(&self.world.document, number)
                    .map(|t| (t.start as i64, t.len as i64))
            }
        };
        let (position, length) = match chars {
            Ok(pair) => pair,
            Err(err) => return NavigationOutcome::Rejected(err),
        };
        let header = self.header_expanded;
        let mut host = NavHost {
            engine: &mut self.world.document,
            viewport: &mut self.world.viewport,
            styles: &mut self.world.styles,
            caret: &mut self.world.caret,
        };
        self.nav.navigate_chars(&mut host, position, length, header)
    }

    fn handle_tick(&mut self) -> bool {
        self.world.complete_pending_animation();

        let ticks = self.nav.session().map(|s| s.tick_count).unwrap_or(0);
        if let Some(drift) = self.drift
            && ticks >= 1
        {
            self.drift = None;
            info!(target: "runtime", drift, "injecting_layout_drift");
            self.world.document.y_offset += drift;
        }
        if let Some(after) = self.resize_after
            && ticks >= after
        {
            self.resize_after = None;
            self.world.shrink_viewport(20.0);
        }

        let mut host = NavHost {
            engine: &mut self.world.document,
            viewport: &mut self.world.viewport,
            styles: &mut self.world.styles,
            caret: &mut self.world.caret,
        };
        self.nav.tick(&mut host)
    }

    fn publish_interval(&self) {
        let _ = self.interval_tx.send(self.nav.next_interval());
    }

    async fn finalize_shutdown(&mut self) {
        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(())) => trace!(target: "runtime.shutdown", "event_source_task_stopped"),
                Ok(Err(err)) if err.is_cancelled() => {
                    trace!(target: "runtime.shutdown", "event_source_task_cancelled")
                }
                Ok(Err(err)) => {
                    warn!(target: "runtime.shutdown", ?err, "event_source_task_error")
                }
                Err(_) => warn!(target: "runtime.shutdown", "event_source_task_timeout"),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = core_config::load_from(args.config.clone())?;

    let world = SimWorld::new(args.buffer_len, args.viewport_height);
    let nav = AnchorNavigator::new(config.effective);

    let (tx, rx) = core_events::channel();
    let (tick_source, interval_tx) = SchedulerTickSource::new(None);
    let mut registry = EventSourceRegistry::new();
    registry.register(tick_source);
    let source_handles = registry.spawn_all(&tx);

    let request = match args.line {
        Some(number) => NavigateRequest::Line { number },
        None => NavigateRequest::Chars {
            position: args.position.unwrap_or((args.buffer_len / 2) as i64),
            length: args.length,
        },
    };
    let bus = NavigationBus::new(tx.clone());
    drop(tx);
    tokio::spawn(async move {
        bus.request(request).await;
    });

    let mut runtime = NavRuntime {
        world,
        nav,
        rx,
        interval_tx,
        source_handles,
        header_expanded: args.header_expanded,
        resize_after: args.resize_after,
        drift: args.drift,
    };
    runtime.run().await?;

    let m = runtime.nav.metrics();
    info!(
        target: "runtime",
        sessions_started = m.sessions_started,
        sessions_completed = m.sessions_completed,
        corrective_scrolls = m.corrective_scrolls,
        forced_repositions = m.forced_repositions,
        deferred_navigations = m.deferred_navigations,
        rejected_targets = m.rejected_targets,
        surface_scrolls = runtime.world.viewport.surface().scroll_count,
        "run_complete"
    );
    println!(
        "navigation complete: {} session(s), {} corrective scroll(s), {} forced reposition(s)",
        m.sessions_completed, m.corrective_scrolls, m.forced_repositions
    );
    Ok(())
}
