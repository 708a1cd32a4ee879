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

// tests/tracker.rs
// End-to-end tests for the tracking state machine against in-memory
// collaborators: seeding, the publish gate, interruption handling and the
// eviction timeouts.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backup_watch::{BackupTracker, GuestDirectory, StatusSink, TaskSource, TrackerConfig};
use model::{
    ActiveTask, BackupPhase, BackupStatusPayload, GuestId, GuestKey, LogLine, TaskRef,
    TaskState, TaskStatus,
};

#[derive(Default)]
struct FakeCluster {
    active: Mutex<Vec<ActiveTask>>,
    statuses: Mutex<HashMap<TaskRef, TaskStatus>>,
    logs: Mutex<HashMap<TaskRef, Vec<LogLine>>>,
    fail_status: AtomicBool,
    started: Mutex<Vec<(String, GuestId)>>,
}

impl FakeCluster {
    fn set_log(&self, task: &TaskRef, texts: &[&str]) {
        let lines = texts
            .iter()
            .enumerate()
            .map(|(i, t)| LogLine::new(i as u64 + 1, *t))
            .collect();
        self.logs.lock().unwrap().insert(task.clone(), lines);
    }

    fn set_status(&self, task: &TaskRef, state: TaskState, exit: Option<&str>) {
        self.statuses.lock().unwrap().insert(
            task.clone(),
            TaskStatus {
                state,
                exit_status: exit.map(str::to_string),
            },
        );
    }

    fn clear_status(&self, task: &TaskRef) {
        self.statuses.lock().unwrap().remove(task);
    }
}

#[async_trait]
impl TaskSource for FakeCluster {
    async fn active_backup_tasks(&self) -> eyre::Result<Vec<ActiveTask>> {
        Ok(self.active.lock().unwrap().clone())
    }

    async fn task_status(&self, task: &TaskRef) -> eyre::Result<Option<TaskStatus>> {
        if self.fail_status.load(Ordering::Relaxed) {
            eyre::bail!("status endpoint unreachable");
        }
        Ok(self.statuses.lock().unwrap().get(task).cloned())
    }

    async fn task_log(&self, task: &TaskRef) -> eyre::Result<Vec<LogLine>> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .get(task)
            .cloned()
            .unwrap_or_default())
    }

    async fn start_backup(&self, node: &str, vmid: GuestId) -> eyre::Result<String> {
        self.started.lock().unwrap().push((node.to_string(), vmid));
        Ok(format!("UPID:{node}:0001:{vmid}:vzdump:"))
    }
}

#[derive(Default)]
struct RecordingBus {
    published: Mutex<Vec<(GuestKey, BackupStatusPayload)>>,
}

impl RecordingBus {
    fn for_vmid(&self, vmid: GuestId) -> Vec<BackupStatusPayload> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| p.vmid == vmid)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl StatusSink for RecordingBus {
    async fn publish_backup_status(
        &self,
        key: &GuestKey,
        payload: &BackupStatusPayload,
    ) -> eyre::Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((key.clone(), payload.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct FakeDirectory {
    map: Mutex<HashMap<GuestId, GuestKey>>,
}

impl FakeDirectory {
    fn insert(&self, vmid: GuestId, key: &str) {
        self.map
            .lock()
            .unwrap()
            .insert(vmid, GuestKey::from_raw(key));
    }
}

#[async_trait]
impl GuestDirectory for FakeDirectory {
    async fn resolve(&self, vmid: GuestId) -> Option<GuestKey> {
        self.map.lock().unwrap().get(&vmid).cloned()
    }
}

struct Harness {
    cluster: Arc<FakeCluster>,
    bus: Arc<RecordingBus>,
    directory: Arc<FakeDirectory>,
    tracker: BackupTracker,
}

fn harness(config: TrackerConfig) -> Harness {
    let cluster = Arc::new(FakeCluster::default());
    let bus = Arc::new(RecordingBus::default());
    let directory = Arc::new(FakeDirectory::default());
    let tracker = BackupTracker::new(
        cluster.clone(),
        bus.clone(),
        directory.clone(),
        config,
    );
    Harness {
        cluster,
        bus,
        directory,
        tracker,
    }
}

fn active_task(node: &str, upid: &str, vmid: u32) -> ActiveTask {
    ActiveTask {
        node: node.to_string(),
        upid: upid.to_string(),
        guest_id: Some(GuestId(vmid)),
        start_time: 1_756_000_000,
        state: TaskState::Running,
    }
}

#[tokio::test]
async fn scan_seeds_and_publishes_initial_running_status() {
    let mut h = harness(TrackerConfig::default());
    let task = TaskRef::new("pve1", "UPID:a");
    h.cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:a", 101));
    h.cluster.set_log(&task, &["INFO: Starting Backup of VM 101 (lxc)"]);
    h.directory.insert(GuestId(101), "101_web");

    h.tracker.scan().await;

    assert!(h.tracker.is_tracked(&task));
    assert_eq!(h.tracker.tracked_count(), 1);
    let published = h.bus.for_vmid(GuestId(101));
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].status, BackupPhase::Running);
    assert_eq!(published[0].progress, "in progress");
    assert_eq!(published[0].task_id.as_deref(), Some("UPID:a"));
    assert_eq!(published[0].node, "pve1");

    // Re-scanning an already tracked task is a no-op.
    h.tracker.scan().await;
    assert_eq!(h.tracker.tracked_count(), 1);
    assert_eq!(h.bus.count(), 1);
}

#[tokio::test]
async fn publish_gate_fires_only_on_phase_changes() {
    let mut h = harness(TrackerConfig::default());
    let task = TaskRef::new("pve1", "UPID:a");
    h.cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:a", 101));
    h.cluster.set_log(&task, &["INFO: Starting Backup of VM 101 (lxc)"]);
    h.cluster.set_status(&task, TaskState::Running, None);
    h.directory.insert(GuestId(101), "101_web");

    h.tracker.scan().await;
    assert_eq!(h.bus.count(), 1);

    // Same log, same phase: the reconcile pass publishes nothing new.
    h.tracker.poll_cycle().await;
    h.tracker.poll_cycle().await;
    assert_eq!(h.bus.count(), 1);

    // The guest finishes: exactly one more publish.
    h.cluster.set_log(
        &task,
        &[
            "INFO: Starting Backup of VM 101 (lxc)",
            "INFO: Finished Backup of VM 101 (0:05:30)",
            "INFO: archive file size: 2.50GB",
            "INFO: Total bytes written: 5368709120 (5.00GiB, 15MiB/s)",
        ],
    );
    h.tracker.poll_cycle().await;
    let published = h.bus.for_vmid(GuestId(101));
    assert_eq!(published.len(), 2);
    assert_eq!(published[1].status, BackupPhase::Completed);
    assert_eq!(published[1].duration_seconds, Some(330));
    assert_eq!(published[1].compression, Some(50));

    // And nothing further while the phase stays the same.
    h.tracker.poll_cycle().await;
    assert_eq!(h.bus.count(), 2);
}

#[tokio::test]
async fn unresolved_guest_is_skipped_then_retried() {
    let mut h = harness(TrackerConfig::default());
    let task = TaskRef::new("pve1", "UPID:a");
    h.cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:a", 101));
    h.cluster.set_log(&task, &["INFO: Starting Backup of VM 101 (lxc)"]);
    h.cluster.set_status(&task, TaskState::Running, None);

    // Directory does not know the guest yet: nothing may be published and
    // the pair must not be marked as published.
    h.tracker.scan().await;
    assert_eq!(h.bus.count(), 0);

    // Directory catches up: the next cycle publishes.
    h.directory.insert(GuestId(101), "101_web");
    h.tracker.poll_cycle().await;
    assert_eq!(h.bus.count(), 1);
    assert_eq!(h.bus.for_vmid(GuestId(101))[0].status, BackupPhase::Running);
}

#[tokio::test]
async fn interruption_forces_error_only_for_unfinished_guests() {
    let mut h = harness(TrackerConfig::default());
    let task = TaskRef::new("pve1", "UPID:a");
    h.cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:a", 101));
    h.cluster.set_log(
        &task,
        &[
            "INFO: Starting Backup of VM 101 (lxc)",
            "INFO: Finished Backup of VM 101 (0:01:00)",
            "INFO: Starting Backup of VM 102 (lxc)",
            "INFO: suspending guest",
        ],
    );
    h.directory.insert(GuestId(101), "101_web");
    h.directory.insert(GuestId(102), "102_db");

    h.tracker.scan().await;
    assert_eq!(h.bus.for_vmid(GuestId(101)).len(), 1);
    assert_eq!(h.bus.for_vmid(GuestId(102)).len(), 1);

    // The task dies under guest 102.
    h.cluster
        .set_status(&task, TaskState::Stopped, Some("interrupted by signal"));
    h.tracker.poll_cycle().await;

    let vm101 = h.bus.for_vmid(GuestId(101));
    let vm102 = h.bus.for_vmid(GuestId(102));

    // The finished guest keeps its completed status; it is not republished
    // as an error.
    assert_eq!(vm101.len(), 1);
    assert_eq!(vm101[0].status, BackupPhase::Completed);

    // The abandoned guest gets a forced error with a synthetic message
    // embedding the exit status.
    assert_eq!(vm102.len(), 2);
    assert_eq!(vm102[1].status, BackupPhase::Error);
    assert_eq!(
        vm102[1].error.as_deref(),
        Some("task interrupted (interrupted by signal)")
    );

    // Terminal task is gone after the cycle.
    assert_eq!(h.tracker.tracked_count(), 0);
}

#[tokio::test]
async fn clean_completion_does_not_run_the_interruption_path() {
    let mut h = harness(TrackerConfig::default());
    let task = TaskRef::new("pve1", "UPID:a");
    h.cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:a", 101));
    h.cluster.set_log(
        &task,
        &[
            "INFO: Starting Backup of VM 101 (lxc)",
            "INFO: Finished Backup of VM 101 (0:01:00)",
        ],
    );
    h.directory.insert(GuestId(101), "101_web");

    h.tracker.scan().await;
    h.cluster.set_status(&task, TaskState::Stopped, Some("OK"));
    h.tracker.poll_cycle().await;

    let published = h.bus.for_vmid(GuestId(101));
    // One completed publish from the scan; the final pass has nothing new.
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].status, BackupPhase::Completed);
    assert_eq!(h.tracker.tracked_count(), 0);
}

#[tokio::test]
async fn absent_task_is_evicted_after_the_absence_timeout() {
    let mut h = harness(TrackerConfig {
        absence_timeout: Duration::ZERO,
        ..TrackerConfig::default()
    });
    let task = TaskRef::new("pve1", "UPID:a");
    h.cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:a", 101));
    h.cluster.set_log(&task, &["INFO: Starting Backup of VM 101 (lxc)"]);
    h.directory.insert(GuestId(101), "101_web");

    h.tracker.scan().await;
    assert_eq!(h.tracker.tracked_count(), 1);
    h.cluster.clear_status(&task);

    h.tracker.poll_cycle().await;

    // Dropped without any final publish: nothing to report from a task
    // that vanished.
    assert_eq!(h.tracker.tracked_count(), 0);
    assert!(!h.tracker.is_tracked(&task));
    assert_eq!(h.bus.count(), 1); // only the initial running publish
}

#[tokio::test]
async fn absent_task_survives_within_the_absence_window() {
    let mut h = harness(TrackerConfig::default());
    let task = TaskRef::new("pve1", "UPID:a");
    h.cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:a", 101));

    h.tracker.scan().await;
    h.cluster.clear_status(&task);
    h.tracker.poll_cycle().await;

    assert!(h.tracker.is_tracked(&task));
}

#[tokio::test]
async fn failing_status_lookups_evict_only_past_the_error_timeout() {
    let mut patient = harness(TrackerConfig::default());
    let task = TaskRef::new("pve1", "UPID:a");
    patient
        .cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:a", 101));
    patient.tracker.scan().await;
    patient.cluster.fail_status.store(true, Ordering::Relaxed);
    patient.tracker.poll_cycle().await;
    // Default five-minute bound: transient failures do not lose the task.
    assert!(patient.tracker.is_tracked(&task));

    let mut strict = harness(TrackerConfig {
        error_timeout: Duration::ZERO,
        ..TrackerConfig::default()
    });
    strict
        .cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:a", 101));
    strict.tracker.scan().await;
    strict.cluster.fail_status.store(true, Ordering::Relaxed);
    strict.tracker.poll_cycle().await;
    assert_eq!(strict.tracker.tracked_count(), 0);
}

#[tokio::test]
async fn newer_task_for_a_guest_supersedes_the_tracked_one() {
    let mut h = harness(TrackerConfig::default());
    let old_task = TaskRef::new("pve1", "UPID:old");
    h.cluster
        .active
        .lock()
        .unwrap()
        .push(active_task("pve1", "UPID:old", 101));
    h.tracker.scan().await;
    assert!(h.tracker.is_tracked(&old_task));

    // The next scan only sees a newer task for the same guest.
    *h.cluster.active.lock().unwrap() = vec![active_task("pve1", "UPID:new", 101)];
    h.tracker.scan().await;

    assert!(!h.tracker.is_tracked(&old_task));
    assert!(h.tracker.is_tracked(&TaskRef::new("pve1", "UPID:new")));
    assert_eq!(h.tracker.tracked_count(), 1);
}

#[tokio::test]
async fn manual_backup_seeds_tracking_immediately() {
    let mut h = harness(TrackerConfig::default());
    let expected = TaskRef::new("pve1", "UPID:pve1:0001:170:vzdump:");
    h.cluster.set_log(&expected, &["INFO: Starting Backup of VM 170 (lxc)"]);
    h.directory.insert(GuestId(170), "170_cache");

    let task = h
        .tracker
        .start_backup("pve1", GuestId(170))
        .await
        .expect("backup should start");

    assert_eq!(task, expected);
    assert!(h.tracker.is_tracked(&task));
    assert_eq!(
        h.cluster.started.lock().unwrap().as_slice(),
        &[("pve1".to_string(), GuestId(170))]
    );
    // The first analysis ran without waiting for a scan tick.
    let published = h.bus.for_vmid(GuestId(170));
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].status, BackupPhase::Running);
}
