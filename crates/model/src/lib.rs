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

// src/lib.rs
// Shared domain model for the paddock bridge. Pure data types, no I/O.

pub mod backup;
pub mod guest;
pub mod metrics;
pub mod task;

pub use backup::{BackupOutcome, BackupPhase, BackupStatusPayload, GuestBackup};
pub use guest::{GuestId, GuestKey, ParseGuestIdError};
pub use metrics::{GuestMetrics, NodeMetrics, UsagePair};
pub use task::{ActiveTask, LogLine, TaskRef, TaskState, TaskStatus};
