//! Measurement scheduling and caching
//!
//! The poller owns the last measurement and makes sure only one speedtest
//! runs at a time. In [`RefreshMode::OnScrape`] a scrape starts a run when the
//! cached result has expired; scrapes that arrive while a run is in flight get
//! the previous result. In [`RefreshMode::Interval`] a background task drives
//! the runs and scrapes only read.

use crate::error::AppError;
use crate::logging::Logger;
use crate::models::{Measurement, Snapshot};
use crate::speedtest::SpeedtestRunner;
use crate::types::RefreshMode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Default)]
struct PollerState {
    last: Option<Measurement>,
    cache_until: Option<Instant>,
    runs_total: u64,
    failures_total: u64,
}

struct Inner {
    runner: Arc<dyn SpeedtestRunner>,
    mode: RefreshMode,
    state: RwLock<PollerState>,
    run_guard: Mutex<()>,
    running: AtomicBool,
    stop: watch::Sender<bool>,
    logger: Logger,
}

/// Resets the in-flight flag even if the run future is dropped
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Single-flight speedtest poller with a cached last result
#[derive(Clone)]
pub struct Poller {
    inner: Arc<Inner>,
}

impl Poller {
    /// Create a poller for the given runner and refresh mode
    pub fn new(runner: Arc<dyn SpeedtestRunner>, mode: RefreshMode, logger: Logger) -> Self {
        Self {
            inner: Arc::new(Inner {
                runner,
                mode,
                state: RwLock::new(PollerState::default()),
                run_guard: Mutex::new(()),
                running: AtomicBool::new(false),
                stop: watch::Sender::new(false),
                logger,
            }),
        }
    }

    pub fn mode(&self) -> RefreshMode {
        self.inner.mode
    }

    /// Serve a scrape: refresh first if the mode and cache call for it
    pub async fn scrape(&self) -> Snapshot {
        if matches!(self.inner.mode, RefreshMode::OnScrape { .. }) && !self.inner.is_fresh().await {
            // Run on a separate task so a disconnecting scraper cannot cancel the CLI
            let inner = self.inner.clone();
            let run = tokio::spawn(async move { inner.run_once(true).await });
            if let Err(e) = run.await {
                self.inner.logger.error(&format!("Speedtest task failed: {}", e)).log().await;
            }
        }
        self.snapshot().await
    }

    /// Run one measurement now, unless one is already in flight or the
    /// poller is shut down
    pub async fn refresh(&self) -> Option<Measurement> {
        self.inner.run_once(false).await
    }

    /// Current state without running anything
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.read().await;
        Snapshot {
            last: state.last.clone(),
            runs_total: state.runs_total,
            failures_total: state.failures_total,
            running: self.inner.running.load(Ordering::SeqCst),
        }
    }

    /// Stop starting new runs and abandon the one in flight, killing the CLI.
    /// Scrapes waiting on that run get the previous result.
    pub fn shutdown(&self) {
        self.inner.stop.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.stop.borrow()
    }

    /// Drive [`RefreshMode::Interval`]; returns `None` in on-scrape mode.
    ///
    /// The first run starts immediately. The task ends when `shutdown` flips
    /// to `true` or its sender is dropped; an in-flight run is abandoned and
    /// the CLI killed.
    pub fn spawn_interval(&self, mut shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        let RefreshMode::Interval { every } = self.inner.mode else {
            return None;
        };
        let poller = self.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                tokio::select! {
                    _ = poller.refresh() => {}
                    _ = shutdown.changed() => break,
                }
            }

            poller.inner.logger.debug("Interval poller stopped").log().await;
        }))
    }
}

impl Inner {
    async fn is_fresh(&self) -> bool {
        let state = self.state.read().await;
        match (&state.last, state.cache_until) {
            (Some(_), Some(until)) => Instant::now() < until,
            _ => false,
        }
    }

    async fn run_once(&self, only_if_stale: bool) -> Option<Measurement> {
        let mut stop = self.stop.subscribe();
        if *stop.borrow_and_update() {
            return None;
        }

        let _guard = match self.run_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.logger.debug("Speedtest already running, serving cached result").log().await;
                return None;
            }
        };

        // A run may have completed between the staleness check and the lock
        if only_if_stale && self.is_fresh().await {
            return None;
        }

        let _running = RunningFlag::raise(&self.running);
        let run_id = Logger::new_correlation_id();
        {
            let mut state = self.state.write().await;
            state.runs_total += 1;
        }

        self.logger.debug("Starting speedtest run")
            .correlation_id(&run_id)
            .field("runner", self.runner.describe())
            .log()
            .await;

        let started = Instant::now();
        let outcome = tokio::select! {
            outcome = self.runner.run() => outcome,
            _ = stop.changed() => {
                self.logger.warn("Speedtest run abandoned on shutdown")
                    .correlation_id(&run_id)
                    .log()
                    .await;
                return None;
            }
        };

        let measurement = match outcome {
            Ok(measurement) => {
                self.logger.info(&measurement.summary())
                    .correlation_id(&run_id)
                    .measurement(&measurement)
                    .log()
                    .await;
                measurement
            }
            Err(error) => {
                self.logger.error(&error.to_string())
                    .correlation_id(&run_id)
                    .error_info(&error)
                    .log()
                    .await;
                match error {
                    AppError::Timeout(message) => Measurement::timeout(message, started.elapsed()),
                    other => Measurement::failed(other.to_string(), started.elapsed()),
                }
            }
        };

        let mut state = self.state.write().await;
        if !measurement.is_successful() {
            state.failures_total += 1;
        }
        state.cache_until = match self.mode {
            RefreshMode::OnScrape { cache_for } => Some(Instant::now() + cache_for),
            RefreshMode::Interval { .. } => None,
        };
        state.last = Some(measurement.clone());

        Some(measurement)
    }
}
