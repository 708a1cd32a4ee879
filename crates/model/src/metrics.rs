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

// src/metrics.rs
// Node and guest state documents, published retained on the data topics.
// Field names here are load-bearing: discovery value templates reference
// them as value_json.<field>.

use serde::{Deserialize, Serialize};

use crate::guest::{GuestId, GuestKey};

/// used/total pair with a precomputed whole-percent usage.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePair {
    pub used: u64,
    pub total: u64,
    pub usage: u8,
}

impl UsagePair {
    pub fn new(used: u64, total: u64) -> Self {
        let usage = if total > 0 {
            ((used as f64 / total as f64) * 100.0).round() as u8
        } else {
            0
        };
        Self { used, total, usage }
    }
}

/// Node state document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetrics {
    pub node: String,
    /// "online" when the node reports uptime, "offline" otherwise.
    pub state: String,
    pub uptime: u64,
    pub cpu_usage: u8,
    pub cpu_cores: u32,
    pub mem_usage: u8,
    pub mem_used: u64,
    pub mem_total: u64,
    pub disk_usage: u8,
    pub disk_used: u64,
    pub disk_total: u64,
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    /// Keys of the guests currently placed on this node.
    pub lxc_list: Vec<GuestKey>,
    pub last_update: String,
}

/// Guest state document, plus the placement facts the bridge itself needs
/// (node, ignore flag).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestMetrics {
    #[serde(skip)]
    pub key: GuestKey,
    #[serde(skip)]
    pub ignored: bool,
    pub state: String,
    pub name: String,
    pub tags: Vec<String>,
    pub vmid: GuestId,
    pub node: String,
    pub cpu_usage: u8,
    pub cpu_cores: u32,
    pub mem_usage: u8,
    pub mem_used: u64,
    pub mem_total: u64,
    pub disk_usage: u8,
    pub disk_used: u64,
    pub disk_total: u64,
    pub swap_usage: u8,
    pub swap_used: u64,
    pub swap_total: u64,
    pub net_in: u64,
    pub net_out: u64,
    pub uptime: u64,
    pub last_update: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_pair_rounds_to_whole_percent() {
        assert_eq!(UsagePair::new(1, 3).usage, 33);
        assert_eq!(UsagePair::new(2, 3).usage, 67);
        assert_eq!(UsagePair::new(0, 0).usage, 0);
    }

    #[test]
    fn guest_metrics_skips_internal_fields() {
        let m = GuestMetrics {
            key: GuestKey::from_raw("101_web"),
            ignored: false,
            state: "running".into(),
            name: "web".into(),
            tags: vec![],
            vmid: GuestId(101),
            node: "pve1".into(),
            cpu_usage: 3,
            cpu_cores: 2,
            mem_usage: 50,
            mem_used: 512,
            mem_total: 1024,
            disk_usage: 10,
            disk_used: 1,
            disk_total: 10,
            swap_usage: 0,
            swap_used: 0,
            swap_total: 0,
            net_in: 0,
            net_out: 0,
            uptime: 42,
            last_update: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("key").is_none());
        assert!(json.get("ignored").is_none());
        assert_eq!(json["vmid"], 101);
    }
}
