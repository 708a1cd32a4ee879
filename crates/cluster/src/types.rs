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

// src/types.rs
// Wire DTOs for the cluster JSON API. Everything the API may omit is
// Option; mapping into model types happens in the client, not here.

use serde::{Deserialize, Deserializer};

/// Every API response wraps its payload in { "data": ... }.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiData<T> {
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketData {
    pub ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeEntry {
    pub node: String,
    #[allow(dead_code)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CpuInfo {
    pub cpus: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpacePair {
    pub used: Option<u64>,
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeStatusData {
    pub uptime: Option<u64>,
    pub cpu: Option<f64>,
    pub cpuinfo: Option<CpuInfo>,
    pub memory: Option<SpacePair>,
    pub rootfs: Option<SpacePair>,
    /// The API reports loadavg as an array of strings.
    #[serde(default, deserialize_with = "de_loadavg")]
    pub loadavg: Option<[f64; 3]>,
}

fn de_loadavg<'de, D>(deserializer: D) -> Result<Option<[f64; 3]>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|values| {
        let mut out = [0.0_f64; 3];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = match value {
                serde_json::Value::String(s) => s.parse().unwrap_or(0.0),
                serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
                _ => 0.0,
            };
        }
        out
    }))
}

/// vmid appears as a number in some listings and a string in others.
pub(crate) fn de_vmid<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    match raw {
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(|v| v as u32)
            .ok_or_else(|| serde::de::Error::custom("vmid out of range")),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| serde::de::Error::custom("vmid is not numeric")),
        other => Err(serde::de::Error::custom(format!(
            "vmid has unexpected type: {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LxcEntry {
    #[serde(deserialize_with = "de_vmid")]
    pub vmid: u32,
    pub name: Option<String>,
    pub status: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LxcStatusData {
    pub name: Option<String>,
    pub status: Option<String>,
    pub tags: Option<String>,
    pub uptime: Option<u64>,
    pub cpu: Option<f64>,
    pub cpus: Option<u32>,
    pub mem: Option<u64>,
    pub maxmem: Option<u64>,
    pub disk: Option<u64>,
    pub maxdisk: Option<u64>,
    pub swap: Option<u64>,
    pub maxswap: Option<u64>,
    pub netin: Option<u64>,
    pub netout: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskEntry {
    pub upid: String,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    /// Target of the task; vzdump tasks carry the guest id here.
    pub id: Option<String>,
    pub starttime: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskStatusData {
    pub status: String,
    pub exitstatus: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskLogEntry {
    pub n: u64,
    pub t: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loadavg_accepts_strings_and_numbers() {
        let status: NodeStatusData = serde_json::from_str(
            r#"{"uptime": 12, "loadavg": ["0.52", 1.25, "0.00"]}"#,
        )
        .unwrap();
        assert_eq!(status.loadavg, Some([0.52, 1.25, 0.0]));
    }

    #[test]
    fn vmid_accepts_both_representations() {
        let a: LxcEntry = serde_json::from_str(r#"{"vmid": 101}"#).unwrap();
        assert_eq!(a.vmid, 101);
        let b: LxcEntry = serde_json::from_str(r#"{"vmid": "170"}"#).unwrap();
        assert_eq!(b.vmid, 170);
        assert!(serde_json::from_str::<LxcEntry>(r#"{"vmid": "x"}"#).is_err());
    }

    #[test]
    fn task_entry_maps_type_keyword() {
        let t: TaskEntry = serde_json::from_str(
            r#"{"upid": "UPID:pve1:0000C3A2:012B9C7D:68B0F000:vzdump:101:root@pam:",
                "type": "vzdump", "id": "101", "starttime": 1756000000,
                "status": "running"}"#,
        )
        .unwrap();
        assert_eq!(t.task_type.as_deref(), Some("vzdump"));
        assert_eq!(t.id.as_deref(), Some("101"));
    }
}
