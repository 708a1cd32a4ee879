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

// src/config.rs
// Bridge configuration, read from a TOML file. Every field defaults, so a
// partial file (or none at all) is valid; secrets normally arrive through
// the file, deployed alongside the service.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Describes the format of the bridge configuration file.
///
/// We only implement Serialize for unit tests.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub cluster: ClusterSection,
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub period: PeriodSection,
}

impl BridgeConfig {
    /// Loads the configuration file in toml format from the given path
    pub fn load_from(path: &Path) -> Result<Self, std::io::Error> {
        let data = std::fs::read_to_string(path)?;

        toml::from_str(&data).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Invalid BridgeConfig toml data: {e}"),
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterSection {
    #[serde(default = "default_cluster_host")]
    pub host: String,
    #[serde(default = "default_cluster_port")]
    pub port: u16,
    #[serde(default = "default_cluster_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_cluster_realm")]
    pub realm: String,
}

// Called if no `[cluster]` section is provided at all. The serde defaults
// above are called if one or more fields are missing.
impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            host: default_cluster_host(),
            port: default_cluster_port(),
            user: default_cluster_user(),
            password: String::new(),
            realm: default_cluster_realm(),
        }
    }
}

fn default_cluster_host() -> String {
    "localhost".to_string()
}

fn default_cluster_port() -> u16 {
    8006
}

fn default_cluster_user() -> String {
    "root".to_string()
}

fn default_cluster_realm() -> String {
    "pam".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MqttSection {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_base_topic")]
    pub base_topic: String,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: None,
            password: None,
            client_id: default_client_id(),
            base_topic: default_base_topic(),
        }
    }
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "paddock".to_string()
}

fn default_base_topic() -> String {
    "paddock".to_string()
}

/// Poll cadences, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeriodSection {
    /// Node and guest data publish cadence.
    #[serde(default = "default_update_secs")]
    pub update_secs: u64,
    /// Full guest-list refresh cadence (migrations, added/removed guests).
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    /// Backup scan and reconcile cadence.
    #[serde(default = "default_backup_check_secs")]
    pub backup_check_secs: u64,
}

impl Default for PeriodSection {
    fn default() -> Self {
        Self {
            update_secs: default_update_secs(),
            refresh_secs: default_refresh_secs(),
            backup_check_secs: default_backup_check_secs(),
        }
    }
}

fn default_update_secs() -> u64 {
    30
}

fn default_refresh_secs() -> u64 {
    300
}

fn default_backup_check_secs() -> u64 {
    10
}
