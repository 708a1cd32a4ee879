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

// src/backup.rs
// Parsed backup state for one guest, and the JSON document published for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::guest::GuestId;
use crate::task::TaskRef;

/// Phase of one guest's backup inside a task, derived from its log segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupPhase {
    Running,
    Completed,
    Error,
}

impl BackupPhase {
    /// Human progress label carried alongside the raw phase in the
    /// published document.
    pub fn progress_label(self) -> &'static str {
        match self {
            BackupPhase::Running => "in progress",
            BackupPhase::Completed => "success",
            BackupPhase::Error => "failed",
        }
    }
}

/// Final per-guest verdict. Only present once a finish or error marker was
/// observed in the log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupOutcome {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// Everything the log parser could extract for one guest's segment.
///
/// Every field except `phase` is optional: the parser never guesses, it
/// leaves a field unset when the log did not carry the information (or
/// carried it malformed). Derived fields (compression, speed) are only set
/// when their operands are.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestBackup {
    pub phase: BackupPhase,
    pub outcome: Option<BackupOutcome>,
    /// Raw log line of the failure, or a synthetic message for a task-level
    /// interruption.
    pub error: Option<String>,
    /// Compressed archive size, GiB, 2 decimals.
    pub archive_gib: Option<f64>,
    /// Uncompressed bytes written by the dump, GiB, 2 decimals.
    pub written_gib: Option<f64>,
    /// Duration exactly as printed in the finish marker, e.g. "0:05:30".
    pub duration: Option<String>,
    pub duration_secs: Option<u64>,
    /// Effective throughput, MiB/s, 2 decimals.
    pub speed_mib_s: Option<f64>,
    /// Percentage saved by compression, rounded to whole percent.
    pub compression_pct: Option<i64>,
    /// Uncompressed / compressed, 2 decimals.
    pub compression_ratio: Option<f64>,
    /// Epoch seconds, parsed from the "backup started at" line.
    pub started_at: Option<i64>,
    /// Epoch seconds, parsed from the "backup finished at" line.
    pub finished_at: Option<i64>,
}

impl Default for GuestBackup {
    fn default() -> Self {
        Self {
            phase: BackupPhase::Running,
            outcome: None,
            error: None,
            archive_gib: None,
            written_gib: None,
            duration: None,
            duration_secs: None,
            speed_mib_s: None,
            compression_pct: None,
            compression_ratio: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// The retained JSON document published per guest on every status change.
///
/// One unified shape for all phases; fields that do not apply are serialized
/// as JSON null so consumers see a stable schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupStatusPayload {
    pub status: BackupPhase,
    pub progress: &'static str,
    /// None only for a backup that failed to start (no task exists).
    pub task_id: Option<String>,
    pub vmid: GuestId,
    pub node: String,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub result: Option<BackupOutcome>,
    pub size_gib: Option<f64>,
    pub total_size_gib: Option<f64>,
    pub duration: Option<String>,
    pub duration_seconds: Option<u64>,
    pub speed: Option<f64>,
    pub compression: Option<i64>,
    pub compression_ratio: Option<f64>,
    pub error: Option<String>,
    /// ISO-8601 publish timestamp.
    pub timestamp: String,
}

impl BackupStatusPayload {
    pub fn from_backup(
        backup: &GuestBackup,
        vmid: GuestId,
        task: &TaskRef,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: backup.phase,
            progress: backup.phase.progress_label(),
            task_id: Some(task.upid.clone()),
            vmid,
            node: task.node.clone(),
            start_time: backup.started_at,
            end_time: backup.finished_at,
            result: backup.outcome,
            size_gib: backup.archive_gib,
            total_size_gib: backup.written_gib,
            duration: backup.duration.clone(),
            duration_seconds: backup.duration_secs,
            speed: backup.speed_mib_s,
            compression: backup.compression_pct,
            compression_ratio: backup.compression_ratio,
            error: backup.error.clone(),
            timestamp: now.to_rfc3339(),
        }
    }
}
