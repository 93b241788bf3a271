use std::fs::{self, File, OpenOptions};
use std::future::Future;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::types::ScheduleRequest;

/// Default gap between deadline checks while waiting out a schedule.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Single-slot persistence for a deferred run. Last write wins; a missing
/// or unreadable file reads as "no schedule".
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, request: &ScheduleRequest) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .with_context(|| format!("opening schedule file {:?}", self.path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), request)?;
        Ok(())
    }

    /// A missing, unreadable or corrupt file reads as "no schedule".
    pub fn load(&self) -> Option<ScheduleRequest> {
        let file = File::open(&self.path).ok()?;
        serde_json::from_reader(BufReader::new(file)).ok()
    }

    pub fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// What process start found in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StartupDecision {
    /// Nothing usable stored; collect inputs interactively.
    Fresh,
    /// A pending request. Never auto-executed: the caller offers
    /// wait / run-now / cancel.
    Pending(ScheduleRequest),
}

pub fn startup_decision(store: &ScheduleStore, now: DateTime<Local>) -> StartupDecision {
    match store.load() {
        None => StartupDecision::Fresh,
        Some(request) => match request.scheduled_at {
            Some(at) if at <= now => {
                // Stale leftover from a run that never happened.
                eprintln!("[Schedule] Discarding expired schedule from {}", at.format("%d/%m/%Y %H:%M"));
                store.clear();
                StartupDecision::Fresh
            }
            // A request without a timestamp means "run immediately"; it
            // still goes through the menu so nothing fires unseen.
            _ => StartupDecision::Pending(request),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

/// Sleep until `deadline`, checking at most every `poll` (clamped to the
/// remaining time, so short deadlines are hit precisely) and printing a
/// countdown through the final minute. `cancel` aborts the wait.
pub async fn wait_until(
    deadline: DateTime<Local>,
    poll: Duration,
    cancel: impl Future<Output = ()>,
) -> WaitOutcome {
    tokio::pin!(cancel);
    loop {
        let remaining = match (deadline - Local::now()).to_std() {
            Ok(r) if !r.is_zero() => r,
            _ => return WaitOutcome::Elapsed,
        };
        if remaining <= Duration::from_secs(60) {
            println!("Starting in {} seconds...", remaining.as_secs().max(1));
        }
        tokio::select! {
            _ = &mut cancel => return WaitOutcome::Cancelled,
            _ = tokio::time::sleep(remaining.min(poll)) => {}
        }
    }
}

/// Wait out a stored request. Elapsing consumes the slot so the run cannot
/// fire twice; cancelling consumes it so it cannot fire later either.
pub async fn await_schedule(
    store: &ScheduleStore,
    request: &ScheduleRequest,
    poll: Duration,
    cancel: impl Future<Output = ()>,
) -> WaitOutcome {
    let outcome = match request.scheduled_at {
        Some(deadline) => wait_until(deadline, poll, cancel).await,
        None => WaitOutcome::Elapsed,
    };
    store.clear();
    outcome
}
