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

// src/traits.rs
// Collaborator seams for the tracker. The daemon implements these over the
// real cluster client, bus client and guest registry; tests implement them
// in memory.

use async_trait::async_trait;
use model::{ActiveTask, BackupStatusPayload, GuestId, GuestKey, LogLine, TaskRef, TaskStatus};

/// Where backup tasks come from: the cluster task API.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// All currently active backup tasks across the cluster.
    async fn active_backup_tasks(&self) -> eyre::Result<Vec<ActiveTask>>;

    /// Status of one task. `Ok(None)` means the cluster no longer knows
    /// the task, as opposed to a failed lookup.
    async fn task_status(&self, task: &TaskRef) -> eyre::Result<Option<TaskStatus>>;

    /// Ordered log lines of one task.
    async fn task_log(&self, task: &TaskRef) -> eyre::Result<Vec<LogLine>>;

    /// Starts a backup for one guest; returns the new task's identifier.
    async fn start_backup(&self, node: &str, vmid: GuestId) -> eyre::Result<String>;
}

/// Where per-guest backup status goes: the bus.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish_backup_status(
        &self,
        key: &GuestKey,
        payload: &BackupStatusPayload,
    ) -> eyre::Result<()>;
}

/// Maps a cluster guest id onto the stable key used in topics. A guest the
/// directory does not know is not published for; the tracker retries once
/// the directory catches up.
#[async_trait]
pub trait GuestDirectory: Send + Sync {
    async fn resolve(&self, vmid: GuestId) -> Option<GuestKey>;
}
