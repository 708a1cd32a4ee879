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

// src/guests.rs
// Discovery document for a guest (container/VM).

use model::{GuestId, GuestKey};
use mqtt::TopicScheme;

use crate::config_topic;
use crate::document::{Availability, Component, DeviceDocument, DeviceInfo};

/// What the document builder needs to know about a guest. The node matters:
/// the device is wired `via_device` to its node, and republishing after a
/// migration updates that link.
#[derive(Debug, Clone)]
pub struct GuestFacts {
    pub key: GuestKey,
    pub vmid: GuestId,
    pub name: String,
    pub node: String,
    /// Web UI deep link for the device page, when the cluster host is
    /// known.
    pub configuration_url: Option<String>,
}

/// Builds the retained discovery document for one guest. Returns the
/// config topic and the document.
pub fn guest_device(topics: &TopicScheme, guest: &GuestFacts) -> (String, DeviceDocument) {
    let key = guest.key.as_str();
    let state_topic = topics.guest_data(key);
    let command_topic = format!("{state_topic}/command");
    let guest_availability = Availability::at(topics.guest_availability(key));
    let node_availability = Availability::at(topics.node_availability(&guest.node));
    let both = vec![guest_availability.clone(), node_availability];
    let own = vec![guest_availability];

    let info = DeviceInfo {
        identifiers: vec![format!("paddock_{key}")],
        name: format!("{} ({})", guest.name, guest.vmid),
        model: "Proxmox LXC Container".to_string(),
        manufacturer: "Proxmox".to_string(),
        sw_version: env!("CARGO_PKG_VERSION").to_string(),
        via_device: Some(format!("paddock_{}", guest.node)),
        configuration_url: guest.configuration_url.clone(),
    };

    let bytes_to_gib = |field: &str| {
        format!("{{{{ (value_json.{field} / 1024 / 1024 / 1024) | round(2) }}}}")
    };

    let document = DeviceDocument::new(info, &state_topic)
        .with_component(
            format!("{key}_state"),
            Component::sensor(key, "state")
                .named("Status")
                .icon("mdi:cube"),
        )
        .with_component(
            format!("{key}_cpu_usage"),
            Component::sensor(key, "cpu_usage")
                .named("CPU Usage")
                .icon("mdi:cpu-64-bit")
                .unit("%")
                .state_class("measurement")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_cpu_cores"),
            Component::sensor(key, "cpu_cores")
                .named("CPU Cores")
                .icon("mdi:cpu-64-bit")
                .state_class("measurement")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_mem_usage"),
            Component::sensor(key, "mem_usage")
                .named("Memory Usage")
                .icon("mdi:memory")
                .unit("%")
                .state_class("measurement")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_mem_used"),
            Component::sensor(key, "mem_used")
                .named("Memory Used")
                .icon("mdi:memory")
                .device_class("data_size")
                .unit("GiB")
                .value_template(&bytes_to_gib("mem_used"))
                .state_class("measurement")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_mem_total"),
            Component::sensor(key, "mem_total")
                .named("Memory Total")
                .icon("mdi:memory")
                .device_class("data_size")
                .unit("GiB")
                .value_template(&bytes_to_gib("mem_total"))
                .state_class("measurement")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_disk_usage"),
            Component::sensor(key, "disk_usage")
                .named("Disk Usage")
                .icon("mdi:harddisk")
                .unit("%")
                .state_class("measurement")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_swap_usage"),
            Component::sensor(key, "swap_usage")
                .named("Swap Usage")
                .icon("mdi:swap-horizontal")
                .unit("%")
                .state_class("measurement")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_net_in"),
            Component::sensor(key, "net_in")
                .named("Network In")
                .icon("mdi:download")
                .device_class("data_size")
                .unit("GiB")
                .value_template(&bytes_to_gib("net_in"))
                .state_class("total_increasing")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_net_out"),
            Component::sensor(key, "net_out")
                .named("Network Out")
                .icon("mdi:upload")
                .device_class("data_size")
                .unit("GiB")
                .value_template(&bytes_to_gib("net_out"))
                .state_class("total_increasing")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_uptime"),
            Component::sensor(key, "uptime")
                .named("Uptime")
                .icon("mdi:clock")
                .device_class("duration")
                .unit("s")
                .state_class("measurement")
                .availability(both.clone()),
        )
        .with_component(
            format!("{key}_backup_status"),
            Component::sensor(key, "backup_status")
                .named("Backup Status")
                .icon("mdi:backup-restore")
                .state_topic(topics.backup_status(key))
                .value_template("{{ value_json.status }}")
                .availability(both),
        )
        .with_component(
            format!("{key}_start"),
            Component::button(key, "start", &command_topic)
                .named("Start")
                .icon("mdi:play")
                .availability(own.clone()),
        )
        .with_component(
            format!("{key}_stop"),
            Component::button(key, "stop", &command_topic)
                .named("Stop")
                .icon("mdi:stop")
                .availability(own.clone()),
        )
        .with_component(
            format!("{key}_reboot"),
            Component::button(key, "reboot", &command_topic)
                .named("Reboot")
                .icon("mdi:restart")
                .device_class("restart")
                .availability(own.clone()),
        )
        .with_component(
            format!("{key}_refresh"),
            Component::button(key, "refresh", &command_topic)
                .named("Refresh")
                .icon("mdi:refresh")
                .availability(own.clone()),
        )
        .with_component(
            format!("{key}_backup"),
            Component::button(key, "backup", &command_topic)
                .named("Backup")
                .icon("mdi:backup-restore")
                .availability(own),
        );

    (config_topic("lxc", key), document)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> GuestFacts {
        GuestFacts {
            key: GuestKey::from_raw("101_web"),
            vmid: GuestId(101),
            name: "web".to_string(),
            node: "pve1".to_string(),
            configuration_url: Some("https://cluster:8006/#101".to_string()),
        }
    }

    #[test]
    fn guest_document_links_device_to_its_node() {
        let topics = TopicScheme::new("paddock");
        let (topic, document) = guest_device(&topics, &facts());

        assert_eq!(topic, "homeassistant/device/lxc/101_web/config");
        assert_eq!(document.state_topic, "paddock/lxc/101_web");
        assert_eq!(
            document.device.via_device.as_deref(),
            Some("paddock_pve1")
        );
        assert_eq!(document.device.name, "web (101)");
    }

    #[test]
    fn backup_sensor_reads_the_backup_status_topic() {
        let topics = TopicScheme::new("paddock");
        let (_, document) = guest_device(&topics, &facts());

        let backup = &document.components["101_web_backup_status"];
        assert_eq!(
            backup.state_topic.as_deref(),
            Some("paddock/lxc/101_web/backup_status")
        );
        assert_eq!(
            backup.value_template.as_deref(),
            Some("{{ value_json.status }}")
        );
    }

    #[test]
    fn lifecycle_buttons_share_the_command_topic() {
        let topics = TopicScheme::new("paddock");
        let (_, document) = guest_device(&topics, &facts());

        for action in ["start", "stop", "reboot", "refresh", "backup"] {
            let button = &document.components[&format!("101_web_{action}")];
            assert_eq!(button.platform, "button");
            assert_eq!(
                button.command_topic.as_deref(),
                Some("paddock/lxc/101_web/command")
            );
            assert_eq!(
                button.payload_press.as_deref().unwrap(),
                format!(r#"{{"action":"{action}"}}"#)
            );
        }
    }
}
