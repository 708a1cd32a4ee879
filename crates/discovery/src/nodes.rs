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

// src/nodes.rs
// Discovery document for a cluster node.

use mqtt::TopicScheme;

use crate::document::{Availability, Component, DeviceDocument, DeviceInfo};
use crate::config_topic;

/// Builds the retained discovery document for one node. Returns the config
/// topic and the document.
pub fn node_device(topics: &TopicScheme, node: &str) -> (String, DeviceDocument) {
    let state_topic = topics.node_data(node);
    let availability_topic = topics.node_availability(node);
    let availability = vec![Availability::at(&availability_topic)];
    let command_topic = format!("{}/command", state_topic);

    let info = DeviceInfo {
        identifiers: vec![format!("paddock_{node}")],
        name: format!("Cluster {node}"),
        model: "Proxmox VE Node".to_string(),
        manufacturer: "Proxmox".to_string(),
        sw_version: env!("CARGO_PKG_VERSION").to_string(),
        via_device: None,
        configuration_url: None,
    };

    let bytes_to_gib = |field: &str| {
        format!("{{{{ (value_json.{field} / 1024 / 1024 / 1024) | round(1) }}}}")
    };

    let document = DeviceDocument::new(info, &state_topic)
        .with_component(
            format!("{node}_state"),
            Component::binary_sensor(node, "state")
                .named("State")
                .icon("mdi:server")
                .device_class("connectivity")
                .payloads("online", "offline")
                .state_topic(&availability_topic),
        )
        .with_component(
            format!("{node}_lxc_count"),
            Component::sensor(node, "lxc_count")
                .named("LXC Count")
                .icon("mdi:format-list-bulleted")
                .value_template("{{ value_json.lxc_list | length }}")
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_cpu_usage"),
            Component::sensor(node, "cpu_usage")
                .named("CPU Usage")
                .icon("mdi:cpu-64-bit")
                .unit("%")
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_cpu_cores"),
            Component::sensor(node, "cpu_cores")
                .named("CPU Cores")
                .icon("mdi:cpu-64-bit")
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_mem_usage"),
            Component::sensor(node, "mem_usage")
                .named("Memory Usage")
                .icon("mdi:memory")
                .unit("%")
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_mem_used"),
            Component::sensor(node, "mem_used")
                .named("Memory Used")
                .icon("mdi:memory")
                .device_class("data_size")
                .unit("GiB")
                .value_template(&bytes_to_gib("mem_used"))
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_mem_total"),
            Component::sensor(node, "mem_total")
                .named("Memory Total")
                .icon("mdi:memory")
                .device_class("data_size")
                .unit("GiB")
                .value_template(&bytes_to_gib("mem_total"))
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_disk_usage"),
            Component::sensor(node, "disk_usage")
                .named("Disk Usage")
                .icon("mdi:harddisk")
                .unit("%")
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_disk_used"),
            Component::sensor(node, "disk_used")
                .named("Disk Used")
                .icon("mdi:harddisk")
                .device_class("data_size")
                .unit("GiB")
                .value_template(&bytes_to_gib("disk_used"))
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_disk_total"),
            Component::sensor(node, "disk_total")
                .named("Disk Total")
                .icon("mdi:harddisk")
                .device_class("data_size")
                .unit("GiB")
                .value_template(&bytes_to_gib("disk_total"))
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_load1"),
            Component::sensor(node, "load1")
                .named("Load 1m")
                .icon("mdi:gauge")
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_load5"),
            Component::sensor(node, "load5")
                .named("Load 5m")
                .icon("mdi:gauge")
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_load15"),
            Component::sensor(node, "load15")
                .named("Load 15m")
                .icon("mdi:gauge")
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_uptime"),
            Component::sensor(node, "uptime")
                .named("Uptime")
                .icon("mdi:clock")
                .device_class("duration")
                .unit("s")
                .state_class("measurement")
                .availability(availability.clone()),
        )
        .with_component(
            format!("{node}_refresh"),
            Component::button(node, "refresh", &command_topic)
                .named("Refresh")
                .icon("mdi:refresh")
                .availability(availability),
        );

    (config_topic("nodes", node), document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_document_wires_topics_and_templates() {
        let topics = TopicScheme::new("paddock");
        let (topic, document) = node_device(&topics, "pve1");

        assert_eq!(topic, "homeassistant/device/nodes/pve1/config");
        assert_eq!(document.state_topic, "paddock/nodes/pve1");
        assert_eq!(document.device.identifiers, vec!["paddock_pve1"]);

        let state = &document.components["pve1_state"];
        assert_eq!(state.platform, "binary_sensor");
        assert_eq!(
            state.state_topic.as_deref(),
            Some("paddock/nodes/pve1/availability")
        );
        assert_eq!(state.payload_on.as_deref(), Some("online"));

        let cpu = &document.components["pve1_cpu_usage"];
        assert_eq!(
            cpu.value_template.as_deref(),
            Some("{{ value_json.cpu_usage }}")
        );
        let availability = cpu.availability.as_ref().unwrap();
        assert_eq!(availability[0].topic, "paddock/nodes/pve1/availability");

        let refresh = &document.components["pve1_refresh"];
        assert_eq!(
            refresh.command_topic.as_deref(),
            Some("paddock/nodes/pve1/command")
        );
    }
}
