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

// src/segment.rs
// Splits a task log into one contiguous block per guest.

use lazy_static::lazy_static;
use model::{GuestId, LogLine};
use regex::Regex;

lazy_static! {
    static ref START_RE: Regex =
        Regex::new(r"(?i)INFO:\s+Starting Backup of VM (\d+)").unwrap();
}

/// Splits log lines into per-guest segments, keyed in first-seen order.
///
/// A segment opens at a "Starting Backup of VM {id}" marker and runs until
/// the next such marker or end of input. Segments are NOT closed at
/// "Finished" or "ERROR" markers: size, timing and failure-detail lines for
/// a guest appear after those, and they belong to the same segment. Lines
/// before the first start marker and empty lines are discarded.
///
/// If the same guest opens a second segment (a retried dump in one task),
/// the later segment replaces the earlier one, keeping its original
/// position in the order.
pub fn segment_log(lines: &[LogLine]) -> Vec<(GuestId, Vec<LogLine>)> {
    let mut segments: Vec<(GuestId, Vec<LogLine>)> = Vec::new();
    let mut current: Option<(GuestId, Vec<LogLine>)> = None;

    for line in lines {
        if line.text.is_empty() {
            continue;
        }
        if let Some(caps) = START_RE.captures(&line.text) {
            if let Some(finished) = current.take() {
                commit(&mut segments, finished);
            }
            // A start marker with an id too large to be a real guest id is
            // treated like the prefix before the first marker.
            current = caps[1]
                .parse::<u32>()
                .ok()
                .map(|id| (GuestId(id), vec![line.clone()]));
            continue;
        }
        if let Some((_, segment)) = current.as_mut() {
            segment.push(line.clone());
        }
    }

    if let Some(open) = current.take() {
        commit(&mut segments, open);
    }
    segments
}

fn commit(segments: &mut Vec<(GuestId, Vec<LogLine>)>, segment: (GuestId, Vec<LogLine>)) {
    if let Some(existing) = segments.iter_mut().find(|(id, _)| *id == segment.0) {
        existing.1 = segment.1;
    } else {
        segments.push(segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<LogLine> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| LogLine::new(i as u64 + 1, *t))
            .collect()
    }

    #[test]
    fn splits_into_disjoint_ordered_segments() {
        let input = lines(&[
            "INFO: starting new backup job: vzdump 101 102",
            "INFO: Starting Backup of VM 101 (lxc)",
            "INFO: 101 line one",
            "INFO: Finished Backup of VM 101 (00:01:00)",
            "INFO: archive file size: 1.00GB",
            "INFO: Starting Backup of VM 102 (lxc)",
            "INFO: 102 line one",
        ]);

        let segments = segment_log(&input);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].0, GuestId(101));
        assert_eq!(segments[1].0, GuestId(102));
        // First-seen order, and concatenation reproduces the input minus
        // the prefix before the first start marker.
        let rebuilt: Vec<LogLine> = segments
            .iter()
            .flat_map(|(_, s)| s.iter().cloned())
            .collect();
        assert_eq!(rebuilt, input[1..]);
    }

    #[test]
    fn segments_stay_open_past_finished_and_error_markers() {
        let input = lines(&[
            "INFO: Starting Backup of VM 170 (lxc)",
            "ERROR: Backup of VM 170 failed - command died",
            "INFO: Failed at 2026-08-01 02:10:44",
            "INFO: Backup finished at 2026-08-01 02:10:44",
        ]);

        let segments = segment_log(&input);
        assert_eq!(segments.len(), 1);
        // The lines after the ERROR marker still belong to VM 170.
        assert_eq!(segments[0].1.len(), 4);
    }

    #[test]
    fn prefix_and_empty_lines_are_discarded() {
        let input = vec![
            LogLine::new(1, "INFO: no marker yet"),
            LogLine::new(2, ""),
            LogLine::new(3, "INFO: Starting Backup of VM 5 (lxc)"),
            LogLine::new(4, ""),
            LogLine::new(5, "INFO: kept"),
        ];

        let segments = segment_log(&input);
        assert_eq!(segments.len(), 1);
        let texts: Vec<&str> = segments[0].1.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["INFO: Starting Backup of VM 5 (lxc)", "INFO: kept"]);
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(segment_log(&[]).is_empty());
        assert!(segment_log(&lines(&["INFO: nothing relevant"])).is_empty());
    }

    #[test]
    fn repeated_guest_takes_the_later_segment() {
        let input = lines(&[
            "INFO: Starting Backup of VM 101 (lxc)",
            "INFO: first attempt",
            "INFO: Starting Backup of VM 101 (lxc)",
            "INFO: second attempt",
        ]);

        let segments = segment_log(&input);
        assert_eq!(segments.len(), 1);
        let texts: Vec<&str> = segments[0].1.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["INFO: Starting Backup of VM 101 (lxc)", "INFO: second attempt"]
        );
    }
}
