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
// Home-Assistant auto-discovery documents for nodes and guests. This crate
// only builds (topic, document) pairs; publishing them, retained, is the
// daemon's job. Removal is a retained empty payload on the same topic.

mod document;
mod guests;
mod nodes;

pub use document::{Availability, Component, DeviceDocument, DeviceInfo, Origin};
pub use guests::{guest_device, GuestFacts};
pub use nodes::node_device;

/// Topic prefix Home Assistant watches for device discovery.
pub const DISCOVERY_PREFIX: &str = "homeassistant";

/// Topic a device's discovery document lives on. `scope` is the same path
/// segment the data topics use ("nodes" or "lxc").
pub fn config_topic(scope: &str, key: &str) -> String {
    format!("{DISCOVERY_PREFIX}/device/{scope}/{key}/config")
}
