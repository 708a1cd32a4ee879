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

// src/parse.rs
// Turns one guest's log segment into a GuestBackup. Pure function over the
// lines; never fails, degrades to "running" with unset fields when markers
// are missing or malformed.

use chrono::{Local, NaiveDateTime, TimeZone};
use lazy_static::lazy_static;
use model::{BackupOutcome, BackupPhase, GuestBackup, LogLine};
use regex::Regex;

lazy_static! {
    static ref ERROR_RE: Regex =
        Regex::new(r"(?i)ERROR:\s+Backup of VM\s+(\d+)\s+failed").unwrap();
    static ref FINISHED_RE: Regex =
        Regex::new(r"(?i)INFO:\s+Finished Backup of VM\s+(\d+).*?\((\d+:\d+:\d+)\)").unwrap();
    static ref ARCHIVE_SIZE_RE: Regex =
        Regex::new(r"(?i)archive file size:\s*([\d.,]+)\s*([A-Za-z]+)").unwrap();
    static ref STARTED_AT_RE: Regex =
        Regex::new(r"(?i)backup started at (\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})").unwrap();
    static ref FINISHED_AT_RE: Regex =
        Regex::new(r"(?i)backup finished at (\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})").unwrap();
    static ref BYTES_WRITTEN_RE: Regex = Regex::new(
        r"(?i)total bytes written:\s*(\d+)\s*\(([\d.]+)\s*([A-Za-z]+),\s*([\d.]+)\s*([A-Za-z/]+)\)"
    )
    .unwrap();
}

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Parses one guest's ordered log segment.
///
/// Marker precedence: an error marker wins over a finish marker for the
/// final phase, regardless of which came first in the log. With neither
/// marker the backup counts as still running.
pub fn parse_guest_segment(lines: &[LogLine]) -> GuestBackup {
    let mut backup = GuestBackup::default();

    let mut saw_error = false;
    let mut error_line: Option<String> = None;
    let mut saw_finished = false;
    let mut finished_duration: Option<String> = None;

    for line in lines {
        let text = line.text.as_str();
        if text.is_empty() {
            continue;
        }

        if ERROR_RE.is_match(text) {
            saw_error = true;
            error_line = Some(text.to_string());
        }

        if let Some(caps) = FINISHED_RE.captures(text) {
            saw_finished = true;
            finished_duration = Some(caps[2].to_string());
        }

        if let Some(caps) = ARCHIVE_SIZE_RE.captures(text) {
            if let Some(gib) = archive_size_gib(&caps[1], &caps[2]) {
                backup.archive_gib = Some(gib);
            }
        }

        if let Some(caps) = STARTED_AT_RE.captures(text) {
            if let Some(epoch) = local_epoch_seconds(&caps[1]) {
                backup.started_at = Some(epoch);
            }
        }

        if let Some(caps) = FINISHED_AT_RE.captures(text) {
            if let Some(epoch) = local_epoch_seconds(&caps[1]) {
                backup.finished_at = Some(epoch);
            }
        }

        if let Some(caps) = BYTES_WRITTEN_RE.captures(text) {
            if let Ok(bytes) = caps[1].parse::<u64>() {
                if bytes > 0 {
                    backup.written_gib = Some(round2(bytes as f64 / BYTES_PER_GIB));
                }
            }
        }
    }

    if let Some(duration) = finished_duration {
        backup.duration_secs = duration_seconds(&duration);
        backup.duration = Some(duration);
    }

    if saw_error {
        backup.phase = BackupPhase::Error;
        backup.outcome = Some(BackupOutcome::Error);
        backup.error = error_line;
    } else if saw_finished {
        backup.phase = BackupPhase::Completed;
        backup.outcome = Some(BackupOutcome::Ok);
    }

    // Derived values, only when both operands made it through.
    if let (Some(size), Some(total)) = (backup.archive_gib, backup.written_gib) {
        if size > 0.0 && total > 0.0 {
            backup.compression_pct = Some(((total - size) / total * 100.0).round() as i64);
            backup.compression_ratio = Some(round2(total / size));
        }
    }
    if let (Some(secs), Some(total)) = (backup.duration_secs, backup.written_gib) {
        if secs > 0 {
            let speed = total * 1024.0 / secs as f64;
            if speed.is_finite() {
                backup.speed_mib_s = Some(round2(speed));
            }
        }
    }

    backup
}

/// Converts an archive-size capture to GiB, 2 decimals. Unknown units and
/// malformed numbers yield None instead of a NaN that would poison the
/// derived fields.
fn archive_size_gib(number: &str, unit: &str) -> Option<f64> {
    let value: f64 = number.replace(',', ".").parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let gib = match unit.to_ascii_uppercase().as_str() {
        "GB" => value,
        "MB" => value / 1024.0,
        "TB" => value * 1024.0,
        "KB" => value / 1024.0 / 1024.0,
        _ => return None,
    };
    Some(round2(gib))
}

/// "H:MM:SS" → seconds.
fn duration_seconds(formatted: &str) -> Option<u64> {
    let parts: Vec<u64> = formatted
        .split(':')
        .map(|p| p.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [h, m, s] => Some(h * 3600 + m * 60 + s),
        _ => None,
    }
}

/// The log prints wall-clock time of the node with no zone; parse it as
/// local time. A DST-ambiguous instant resolves to the earlier mapping.
fn local_epoch_seconds(raw: &str) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
