//! Periodic and on-demand refresh cycles.
//!
//! The scheduler task owns the [`Monitor`] outright. Cycles never overlap: a
//! trigger that arrives while one is running is folded into a single follow-up
//! cycle, and commands that change state wait until the running cycle ends.

use log::{debug, info};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior};

use super::{Monitor, MrId, Snapshot};
use crate::providers::RemoteDataPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ForceRefresh,
    ToggleAutoRetry(MrId),
    ToggleExpanded(MrId),
    OpenInBrowser(MrId),
    /// Switches between "mine" and "all" and refreshes
    ToggleScope,
    Shutdown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Seconds until the next automatic refresh
    pub countdown_secs: u64,
    pub in_flight: bool,
    pub completed_cycles: u64,
}

/// Front-end side of a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SchedulerStatus>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
}

impl SchedulerHandle {
    /// Returns `false` once the scheduler has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn status(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub struct Scheduler<P: ?Sized> {
    interval_secs: u64,
    countdown_secs: u64,
    refresh_pending: bool,
    completed_cycles: u64,
    deferred: VecDeque<Command>,
    commands: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<SchedulerStatus>,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    monitor: Monitor<P>,
}

impl<P: RemoteDataPort + ?Sized> Scheduler<P> {
    pub fn new(monitor: Monitor<P>, interval: Duration) -> (Self, SchedulerHandle) {
        let interval_secs = interval.as_secs().max(1);
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SchedulerStatus {
            countdown_secs: interval_secs,
            in_flight: false,
            completed_cycles: 0,
        });
        let (snapshot_tx, snapshots) = watch::channel(Arc::new(monitor.snapshot()));

        let scheduler = Self {
            interval_secs,
            countdown_secs: interval_secs,
            refresh_pending: false,
            completed_cycles: 0,
            deferred: VecDeque::new(),
            commands,
            status_tx,
            snapshot_tx,
            monitor,
        };
        let handle = SchedulerHandle {
            commands: commands_tx,
            status,
            snapshots,
        };
        (scheduler, handle)
    }

    /// Refreshes immediately, then every interval, until shut down or every
    /// handle is dropped.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        self.request_refresh();

        loop {
            if self.refresh_pending {
                if self.run_cycle(&mut ticker).await == Flow::Stop {
                    break;
                }
                if self.apply_deferred().await == Flow::Stop {
                    break;
                }
                continue;
            }

            tokio::select! {
                _ = ticker.tick() => self.tick(),
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if self.handle(command).await == Flow::Stop {
                        break;
                    }
                }
            }
        }

        info!("Scheduler stopped after {} cycles", self.completed_cycles);
    }

    /// Runs one refresh to completion while keeping the countdown ticking and
    /// queueing whatever commands arrive meanwhile.
    async fn run_cycle(&mut self, ticker: &mut Interval) -> Flow {
        self.refresh_pending = false;
        self.status_tx.send_modify(|status| status.in_flight = true);
        debug!("Refresh cycle {} started", self.completed_cycles + 1);

        {
            let cycle = self.monitor.refresh();
            tokio::pin!(cycle);

            loop {
                tokio::select! {
                    _ = &mut cycle => break,
                    _ = ticker.tick() => {
                        if countdown_elapsed(&mut self.countdown_secs, self.interval_secs) {
                            self.refresh_pending = true;
                        }
                        let countdown_secs = self.countdown_secs;
                        self.status_tx
                            .send_modify(|status| status.countdown_secs = countdown_secs);
                    }
                    command = self.commands.recv() => match command {
                        None | Some(Command::Shutdown) => return Flow::Stop,
                        Some(Command::ForceRefresh) => {
                            self.countdown_secs = self.interval_secs;
                            self.refresh_pending = true;
                        }
                        Some(command) => self.deferred.push_back(command),
                    },
                }
            }
        }

        self.completed_cycles += 1;
        let completed_cycles = self.completed_cycles;
        let countdown_secs = self.countdown_secs;
        self.publish_snapshot();
        self.status_tx.send_modify(|status| {
            status.in_flight = false;
            status.completed_cycles = completed_cycles;
            status.countdown_secs = countdown_secs;
        });
        Flow::Continue
    }

    async fn apply_deferred(&mut self) -> Flow {
        while let Some(command) = self.deferred.pop_front() {
            if self.handle(command).await == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    async fn handle(&mut self, command: Command) -> Flow {
        debug!("Handling {command:?}");
        match command {
            Command::ForceRefresh => self.request_refresh(),
            Command::ToggleScope => {
                let scope = self.monitor.scope().toggled();
                self.monitor.set_scope(scope);
                self.publish_snapshot();
                self.request_refresh();
            }
            Command::ToggleAutoRetry(iid) => {
                self.monitor.toggle_auto_retry(iid).await;
                self.publish_snapshot();
            }
            Command::ToggleExpanded(iid) => {
                self.monitor.toggle_expanded(iid).await;
                self.publish_snapshot();
            }
            Command::OpenInBrowser(iid) => {
                self.monitor.open_in_browser(iid).await;
                self.publish_snapshot();
            }
            Command::Shutdown => return Flow::Stop,
        }
        Flow::Continue
    }

    fn tick(&mut self) {
        if countdown_elapsed(&mut self.countdown_secs, self.interval_secs) {
            self.refresh_pending = true;
        }
        self.publish_countdown();
    }

    /// Resets the countdown and schedules a cycle.
    fn request_refresh(&mut self) {
        self.countdown_secs = self.interval_secs;
        self.refresh_pending = true;
        self.publish_countdown();
    }

    fn publish_countdown(&self) {
        let countdown_secs = self.countdown_secs;
        self.status_tx
            .send_modify(|status| status.countdown_secs = countdown_secs);
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(Arc::new(self.monitor.snapshot()));
    }
}

/// Counts one second down; on expiry resets to `interval_secs` and reports it.
fn countdown_elapsed(countdown_secs: &mut u64, interval_secs: u64) -> bool {
    *countdown_secs = countdown_secs.saturating_sub(1);
    if *countdown_secs == 0 {
        *countdown_secs = interval_secs;
        true
    } else {
        false
    }
}
