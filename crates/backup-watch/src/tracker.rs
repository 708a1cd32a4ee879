/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

// src/tracker.rs
// The active-task table and its scan/reconcile state machine.
//
// The tracker must be driven from a single owner (one task or thread); it
// holds no interior locking itself. All mutation happens through &mut self,
// so a caller on a multithreaded runtime wraps it in a mutex or keeps it
// inside one select loop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use model::{
    ActiveTask, BackupOutcome, BackupPhase, BackupStatusPayload, GuestBackup, GuestId, TaskRef,
    TaskState,
};
use tracing::{debug, info, warn};

use crate::parse::parse_guest_segment;
use crate::segment::segment_log;
use crate::traits::{GuestDirectory, StatusSink, TaskSource};

/// Staleness bounds for the reconcile loop.
#[derive(Debug, Copy, Clone)]
pub struct TrackerConfig {
    /// How long a task may be absent from the status API before it is
    /// assumed gone and dropped without a final publish.
    pub absence_timeout: Duration,
    /// How long status lookups may keep failing before a task is dropped.
    /// Longer than the absence bound so transient API trouble can heal
    /// without losing a still-running backup.
    pub error_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            absence_timeout: Duration::from_secs(60),
            error_timeout: Duration::from_secs(300),
        }
    }
}

/// Tracking state for one remote backup task.
struct TrackedTask {
    guest_id: Option<GuestId>,
    state: TaskState,
    /// Task start, epoch seconds, as reported at discovery time.
    started_at: i64,
    /// Last time the status API answered for this task.
    last_seen: Instant,
    /// Guests a status was ever published for within this task.
    published: HashSet<GuestId>,
    /// Last phase published per guest; the publish gate compares against
    /// this.
    last_phase: HashMap<GuestId, BackupPhase>,
}

enum CheckOutcome {
    Keep,
    Remove,
}

/// Owns the tracked-task table and runs the scan and reconcile passes
/// against it.
pub struct BackupTracker {
    source: Arc<dyn TaskSource>,
    sink: Arc<dyn StatusSink>,
    directory: Arc<dyn GuestDirectory>,
    config: TrackerConfig,
    tracked: HashMap<TaskRef, TrackedTask>,
}

impl BackupTracker {
    pub fn new(
        source: Arc<dyn TaskSource>,
        sink: Arc<dyn StatusSink>,
        directory: Arc<dyn GuestDirectory>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            source,
            sink,
            directory,
            config,
            tracked: HashMap::new(),
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_tracked(&self, task: &TaskRef) -> bool {
        self.tracked.contains_key(task)
    }

    /// Snapshot of tracked tasks and their last-known state, for periodic
    /// logging by the caller.
    pub fn snapshot(&self) -> Vec<(TaskRef, TaskState)> {
        self.tracked
            .iter()
            .map(|(key, entry)| (key.clone(), entry.state))
            .collect()
    }

    /// Pulls the active-task list and seeds tracking for tasks not yet
    /// known. Re-scanning an already-tracked task is a no-op; a newly
    /// discovered task for a guest evicts any older tracked task for that
    /// same guest.
    pub async fn scan(&mut self) {
        let active = match self.source.active_backup_tasks().await {
            Ok(active) => active,
            Err(err) => {
                warn!(error = %err, "active backup task scan failed");
                return;
            }
        };
        debug!(count = active.len(), "active backup tasks on the cluster");

        for task in active {
            let key = task.task_ref();
            if self.tracked.contains_key(&key) {
                continue;
            }
            self.evict_superseded(&key, task.guest_id);
            info!(task = %key, guest = ?task.guest_id, "tracking new backup task");
            self.tracked.insert(key.clone(), new_entry(&task));
            // First analysis right away, so the initial "running" status
            // goes out before the next reconcile tick.
            self.analyze(&key).await;
        }
    }

    fn evict_superseded(&mut self, new_task: &TaskRef, guest_id: Option<GuestId>) {
        let Some(guest_id) = guest_id else { return };
        let stale: Vec<TaskRef> = self
            .tracked
            .iter()
            .filter(|(_, entry)| entry.guest_id == Some(guest_id))
            .map(|(key, _)| key.clone())
            .collect();
        for old in stale {
            info!(old = %old, new = %new_task, %guest_id, "newer backup task supersedes tracked one");
            self.tracked.remove(&old);
        }
    }

    /// Starts a manual backup and seeds its tracking entry directly, so
    /// the first status publish does not wait for the next scan.
    pub async fn start_backup(&mut self, node: &str, vmid: GuestId) -> eyre::Result<TaskRef> {
        let upid = self.source.start_backup(node, vmid).await?;
        let key = TaskRef::new(node, upid);
        info!(task = %key, %vmid, "manual backup started");
        self.evict_superseded(&key, Some(vmid));
        self.tracked.insert(
            key.clone(),
            TrackedTask {
                guest_id: Some(vmid),
                state: TaskState::Running,
                started_at: Utc::now().timestamp(),
                last_seen: Instant::now(),
                published: HashSet::new(),
                last_phase: HashMap::new(),
            },
        );
        self.analyze(&key).await;
        Ok(key)
    }

    /// One reconcile pass over every tracked task. Failures are contained
    /// per task; eviction happens at the end of the pass so the iteration
    /// sees a consistent snapshot.
    pub async fn poll_cycle(&mut self) {
        let keys: Vec<TaskRef> = self.tracked.keys().cloned().collect();
        let mut to_remove = Vec::new();

        for key in keys {
            match self.check_task(&key).await {
                Ok(CheckOutcome::Keep) => {}
                Ok(CheckOutcome::Remove) => to_remove.push(key),
                Err(err) => {
                    warn!(task = %key, error = %err, "backup task check failed");
                    let give_up = self
                        .tracked
                        .get(&key)
                        .is_some_and(|t| t.last_seen.elapsed() > self.config.error_timeout);
                    if give_up {
                        warn!(task = %key, "status lookups failing beyond the error timeout, dropping task");
                        to_remove.push(key);
                    }
                }
            }
        }

        for key in to_remove {
            if let Some(entry) = self.tracked.remove(&key) {
                debug!(task = %key, started_at = entry.started_at, "stopped tracking backup task");
            }
        }
    }

    async fn check_task(&mut self, key: &TaskRef) -> eyre::Result<CheckOutcome> {
        let Some(status) = self.source.task_status(key).await? else {
            // The cluster no longer knows the task. Give it the absence
            // window before concluding it is gone; there is nothing left
            // to publish from a vanished task.
            let stale = self
                .tracked
                .get(key)
                .is_none_or(|t| t.last_seen.elapsed() > self.config.absence_timeout);
            if stale {
                warn!(task = %key, "task absent beyond the absence timeout, dropping");
                return Ok(CheckOutcome::Remove);
            }
            return Ok(CheckOutcome::Keep);
        };

        if let Some(entry) = self.tracked.get_mut(key) {
            entry.state = status.state;
            entry.last_seen = Instant::now();
        }
        self.analyze(key).await;

        if status.state.is_terminal() {
            info!(task = %key, exit = ?status.exit_status, "backup task finished");
            if !status.succeeded() {
                let exit = status.exit_status.as_deref().unwrap_or("unknown");
                self.handle_interruption(key, exit).await;
            }
            // Final pass over the completed log before the entry goes.
            self.analyze(key).await;
            return Ok(CheckOutcome::Remove);
        }
        Ok(CheckOutcome::Keep)
    }

    /// Fetches and re-parses the task log, then offers every guest's
    /// parsed state to the publish gate.
    async fn analyze(&mut self, key: &TaskRef) {
        let logs = match self.source.task_log(key).await {
            Ok(logs) => logs,
            Err(err) => {
                warn!(task = %key, error = %err, "task log fetch failed");
                return;
            }
        };
        if logs.is_empty() {
            debug!(task = %key, "task log still empty");
            return;
        }
        for (vmid, lines) in segment_log(&logs) {
            let backup = parse_guest_segment(&lines);
            self.offer(key, vmid, backup, false).await;
        }
    }

    /// A task that stopped with a non-success exit never wrote error
    /// markers for the guests it abandoned; their segments still parse as
    /// "running". Force those to error and publish unconditionally, so no
    /// consumer is left watching a backup that will never finish.
    async fn handle_interruption(&mut self, key: &TaskRef, exit: &str) {
        info!(task = %key, exit, "reconciling interrupted backup task");
        let logs = match self.source.task_log(key).await {
            Ok(logs) => logs,
            Err(err) => {
                warn!(task = %key, error = %err, "log fetch for interrupted task failed");
                return;
            }
        };
        for (vmid, lines) in segment_log(&logs) {
            let mut backup = parse_guest_segment(&lines);
            if backup.phase == BackupPhase::Completed {
                continue;
            }
            backup.phase = BackupPhase::Error;
            backup.outcome = Some(BackupOutcome::Error);
            backup.error = Some(format!("task interrupted ({exit})"));
            self.offer(key, vmid, backup, true).await;
        }
    }

    /// The publish gate. A status goes out when the (task, guest) pair was
    /// never published or the phase changed since the last publish —
    /// `force` bypasses that check for interruption reporting. An
    /// unresolvable guest is skipped without being marked published, so it
    /// is retried once the directory knows it.
    ///
    /// Forced publishes deliberately leave the gate state alone: the final
    /// analysis pass after an interruption still parses abandoned guests
    /// as "running", and it must dedup against the pre-interruption state
    /// instead of republishing that.
    async fn offer(&mut self, key: &TaskRef, vmid: GuestId, backup: GuestBackup, force: bool) {
        let Some(entry) = self.tracked.get(key) else {
            return;
        };
        let changed = !entry.published.contains(&vmid)
            || entry.last_phase.get(&vmid) != Some(&backup.phase);
        if !force && !changed {
            return;
        }

        let Some(guest_key) = self.directory.resolve(vmid).await else {
            info!(%vmid, phase = ?backup.phase, "guest not in directory, backup status not published");
            return;
        };

        let payload = BackupStatusPayload::from_backup(&backup, vmid, key, Utc::now());
        if let Err(err) = self.sink.publish_backup_status(&guest_key, &payload).await {
            warn!(%vmid, key = %guest_key, error = %err, "backup status publish failed");
            return;
        }
        info!(
            %vmid,
            key = %guest_key,
            phase = ?backup.phase,
            duration = backup.duration.as_deref().unwrap_or(""),
            "backup status published"
        );

        if !force {
            if let Some(entry) = self.tracked.get_mut(key) {
                entry.published.insert(vmid);
                entry.last_phase.insert(vmid, backup.phase);
            }
        }
    }
}

fn new_entry(task: &ActiveTask) -> TrackedTask {
    TrackedTask {
        guest_id: task.guest_id,
        state: task.state,
        started_at: task.start_time,
        last_seen: Instant::now(),
        published: HashSet::new(),
        last_phase: HashMap::new(),
    }
}
