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

// src/error.rs
// Error taxonomy for cluster API calls. Not-found conditions are separate
// variants because callers route on them (migration recovery, task
// completion-by-disappearance).

use model::{GuestId, TaskRef};

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication with the cluster API failed")]
    Auth,

    #[error("guest {vmid} not found on node {node}")]
    GuestNotFound { node: String, vmid: GuestId },

    #[error("task not found: {0}")]
    TaskNotFound(TaskRef),

    #[error("unexpected response from {endpoint}: {detail}")]
    InvalidResponse { endpoint: String, detail: String },
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ClusterError::GuestNotFound { .. } | ClusterError::TaskNotFound(_)
        )
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, ClusterError::Auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_predicate_covers_both_variants() {
        let guest = ClusterError::GuestNotFound {
            node: "pve1".into(),
            vmid: GuestId(170),
        };
        assert!(guest.is_not_found());
        assert!(!guest.is_auth_error());

        let task = ClusterError::TaskNotFound(TaskRef::new("pve1", "UPID:x"));
        assert!(task.is_not_found());

        assert!(!ClusterError::Auth.is_not_found());
        assert!(ClusterError::Auth.is_auth_error());
    }
}
