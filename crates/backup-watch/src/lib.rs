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
// Backup-task tracking: discovers in-flight backup tasks on the cluster,
// parses their streaming logs into per-guest status, and publishes status
// changes to the bus. The tracker owns all state; the cluster, the bus and
// the guest directory are reached through the traits in `traits`, so the
// whole machine runs against in-memory fakes in tests.

mod parse;
mod segment;
mod tracker;
mod traits;

pub use parse::parse_guest_segment;
pub use segment::segment_log;
pub use tracker::{BackupTracker, TrackerConfig};
pub use traits::{GuestDirectory, StatusSink, TaskSource};
