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

// src/task.rs
// Remote task identity and status as reported by the cluster task API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::guest::GuestId;

/// Exit status value a task reports when it finished cleanly.
pub const TASK_EXIT_OK: &str = "OK";

/// Composite identity of a remote task: the node it runs on plus the
/// cluster-unique task identifier (UPID). Tasks are tracked by this pair;
/// a UPID alone is not assumed unique across nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub node: String,
    pub upid: String,
}

impl TaskRef {
    pub fn new(node: impl Into<String>, upid: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            upid: upid.into(),
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node, self.upid)
    }
}

/// Coarse task lifecycle state. The cluster only ever reports these two.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Running,
    Stopped,
}

impl TaskState {
    pub fn from_api(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("stopped") {
            TaskState::Stopped
        } else {
            TaskState::Running
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Stopped)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Running => f.write_str("running"),
            TaskState::Stopped => f.write_str("stopped"),
        }
    }
}

/// Point-in-time status of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    /// Only present once the task stopped. Anything other than
    /// [`TASK_EXIT_OK`] is an abnormal termination.
    pub exit_status: Option<String>,
}

impl TaskStatus {
    pub fn succeeded(&self) -> bool {
        self.exit_status.as_deref() == Some(TASK_EXIT_OK)
    }
}

/// One entry from the active-task listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTask {
    pub node: String,
    pub upid: String,
    /// Guest the task targets, when the listing carries one.
    pub guest_id: Option<GuestId>,
    /// Task start, epoch seconds.
    pub start_time: i64,
    pub state: TaskState,
}

impl ActiveTask {
    pub fn task_ref(&self) -> TaskRef {
        TaskRef::new(self.node.clone(), self.upid.clone())
    }
}

/// One line of a task log, as returned by the cluster: a 1-based line
/// number and the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub n: u64,
    pub text: String,
}

impl LogLine {
    pub fn new(n: u64, text: impl Into<String>) -> Self {
        Self {
            n,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_from_api_is_case_insensitive() {
        assert_eq!(TaskState::from_api("STOPPED"), TaskState::Stopped);
        assert_eq!(TaskState::from_api("running"), TaskState::Running);
        // Unknown values are treated as still running; the reconcile loop
        // settles them on a later cycle.
        assert_eq!(TaskState::from_api("queued"), TaskState::Running);
    }

    #[test]
    fn succeeded_requires_the_ok_sentinel() {
        let ok = TaskStatus {
            state: TaskState::Stopped,
            exit_status: Some("OK".to_string()),
        };
        assert!(ok.succeeded());

        let interrupted = TaskStatus {
            state: TaskState::Stopped,
            exit_status: Some("interrupted by signal".to_string()),
        };
        assert!(!interrupted.succeeded());

        let still_running = TaskStatus {
            state: TaskState::Running,
            exit_status: None,
        };
        assert!(!still_running.succeeded());
    }
}
