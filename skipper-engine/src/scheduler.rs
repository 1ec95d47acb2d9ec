//! Repeating processing passes, started by page readiness and DOM mutations.
//!
//! A [`Scheduler`] owns the repeating timers. [`Scheduler::drive`] polls a
//! [`PageSignals`] source and turns "document loaded" and "mutation batch
//! observed" into [`Trigger`]s. Under [`TimerPolicy::Single`] a trigger only
//! starts a timer when none is running; under [`TimerPolicy::Accumulate`] every
//! trigger adds another one.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use skipper_common::TimerPolicy;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dom::{DomError, DomHost, PageSignals};
use crate::walker::process_all_frames;

/// Why a timer is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The document finished loading (or already had when we attached).
    Ready,
    /// The observer delivered `batches` mutation batches since the last poll.
    Mutation { batches: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started { timers: usize },
    AlreadyRunning,
    /// [`Scheduler::stop`] was called; no new timers are started.
    Stopped,
}

struct RepeatingTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared<H> {
    host: Arc<H>,
    period: Duration,
    passes: AtomicU64,
}

/// Owner of the repeating processing timers for one page.
pub struct Scheduler<H: DomHost + 'static> {
    shared: Arc<Shared<H>>,
    policy: TimerPolicy,
    shutdown: CancellationToken,
    timers: Mutex<Vec<RepeatingTask>>,
}

impl<H: DomHost + 'static> Scheduler<H> {
    pub fn new(host: Arc<H>, period: Duration, policy: TimerPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                host,
                period,
                passes: AtomicU64::new(0),
            }),
            policy,
            shutdown: CancellationToken::new(),
            timers: Mutex::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> TimerPolicy {
        self.policy
    }

    pub fn period(&self) -> Duration {
        self.shared.period
    }

    /// Request repeating passes. Must be called from within a Tokio runtime.
    pub fn trigger(&self, trigger: Trigger) -> TriggerOutcome {
        if self.shutdown.is_cancelled() {
            return TriggerOutcome::Stopped;
        }

        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        timers.retain(|t| !t.handle.is_finished());

        let wanted = match (self.policy, trigger) {
            (TimerPolicy::Single, _) if !timers.is_empty() => {
                debug!(target: "skipper.scheduler", ?trigger, "repeating timer already active");
                return TriggerOutcome::AlreadyRunning;
            }
            (TimerPolicy::Single, _) | (TimerPolicy::Accumulate, Trigger::Ready) => 1,
            (TimerPolicy::Accumulate, Trigger::Mutation { batches }) => batches.max(1),
        };

        for _ in 0..wanted {
            let cancel = self.shutdown.child_token();
            let handle = tokio::spawn(repeat(self.shared.clone(), cancel.clone()));
            timers.push(RepeatingTask { cancel, handle });
        }

        info!(
            target: "skipper.scheduler",
            ?trigger,
            policy = %self.policy,
            active = timers.len(),
            period_ms = self.shared.period.as_millis() as u64,
            "started repeating timer"
        );
        TriggerOutcome::Started {
            timers: timers.len(),
        }
    }

    /// Timers currently running.
    pub fn active_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| !t.cancel.is_cancelled() && !t.handle.is_finished())
            .count()
    }

    /// Passes completed so far, across all timers.
    pub fn passes(&self) -> u64 {
        self.shared.passes.load(Ordering::Relaxed)
    }

    /// Cancel every timer and refuse further triggers. A pass already in
    /// progress runs to completion.
    pub fn stop(&self) {
        self.shutdown.cancel();
        let stopped = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .count();
        info!(target: "skipper.scheduler", stopped, "scheduler stopped");
    }

    /// Poll `signals` every `poll` until `cancel` fires, triggering on load
    /// and on mutation batches. The first poll happens immediately.
    ///
    /// Signal failures are logged and polling continues.
    pub async fn drive<S>(&self, signals: &S, poll: Duration, cancel: CancellationToken)
    where
        S: PageSignals + ?Sized,
    {
        let mut ticker = interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = SignalState::default();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(error) = self.poll_signals(signals, &mut state).await {
                warn!(target: "skipper.signals", %error, "page signal poll failed");
            }
        }
        debug!(target: "skipper.signals", "signal loop finished");
    }

    async fn poll_signals<S>(&self, signals: &S, state: &mut SignalState) -> Result<(), DomError>
    where
        S: PageSignals + ?Sized,
    {
        let observing = signals.observe_mutations().await?;
        if observing && !state.observing {
            info!(target: "skipper.signals", "mutation observer installed");
        }
        state.observing = observing;

        if !state.loaded && signals.is_loaded().await? {
            state.loaded = true;
            info!(target: "skipper.signals", "document ready, starting passes");
            self.trigger(Trigger::Ready);
        }

        if state.observing {
            let batches = signals.take_mutation_batches().await?;
            if batches > 0 {
                debug!(target: "skipper.signals", batches, "DOM mutations detected");
                self.trigger(Trigger::Mutation { batches });
            }
        }
        Ok(())
    }
}

impl<H: DomHost + 'static> Drop for Scheduler<H> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug, Default)]
struct SignalState {
    loaded: bool,
    observing: bool,
}

async fn repeat<H: DomHost + 'static>(shared: Arc<Shared<H>>, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + shared.period, shared.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let result = process_all_frames(shared.host.as_ref()).await;
        let pass = shared.passes.fetch_add(1, Ordering::Relaxed) + 1;
        match result {
            Ok(summary) => debug!(
                target: "skipper.scheduler",
                pass,
                documents = summary.documents.len(),
                frames_skipped = summary.frames_skipped,
                submitted = summary.submitted(),
                "pass finished"
            ),
            Err(error) => warn!(target: "skipper.scheduler", pass, %error, "pass aborted"),
        }
    }
}
