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

// src/document.rs
// The discovery document types. Explicit serde structs; optional entity
// attributes are Options with skip_serializing_if so the published JSON
// only carries what a component actually sets.

use std::collections::BTreeMap;

use serde::Serialize;

/// One device discovery document: device info plus a map of entity
/// components, published as a single retained message.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDocument {
    pub device: DeviceInfo,
    pub origin: Origin,
    pub state_topic: String,
    /// BTreeMap, so republished documents are byte-stable and do not churn
    /// retained storage.
    pub components: BTreeMap<String, Component>,
}

impl DeviceDocument {
    pub fn new(device: DeviceInfo, state_topic: impl Into<String>) -> Self {
        Self {
            device,
            origin: Origin::default(),
            state_topic: state_topic.into(),
            components: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, id: impl Into<String>, component: Component) -> Self {
        self.components.insert(id.into(), component);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
    pub sw_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Origin {
    pub name: &'static str,
}

impl Default for Origin {
    fn default() -> Self {
        Self { name: "paddock" }
    }
}

/// Availability block: where a component reads online/offline from.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub topic: String,
    pub payload_available: &'static str,
    pub payload_not_available: &'static str,
}

impl Availability {
    pub fn at(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload_available: "online",
            payload_not_available: "offline",
        }
    }
}

/// One entity inside a device document. Sensors read a field out of the
/// device's JSON state topic via value_template; buttons publish a JSON
/// action onto a command topic.
#[derive(Debug, Clone, Serialize)]
pub struct Component {
    pub platform: &'static str,
    pub unique_id: String,
    pub object_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub availability_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_entity_name: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_update: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_press: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Vec<Availability>>,
}

impl Component {
    fn base(platform: &'static str, owner: &str, kind: &str) -> Self {
        let entity_id = format!("{owner}_{kind}");
        Self {
            platform,
            unique_id: entity_id.clone(),
            object_id: entity_id,
            name: kind.to_string(),
            icon: None,
            availability_mode: "all",
            has_entity_name: Some(true),
            force_update: None,
            value_template: None,
            state_topic: None,
            command_topic: None,
            payload_press: None,
            payload_on: None,
            payload_off: None,
            device_class: None,
            unit_of_measurement: None,
            state_class: None,
            availability: None,
        }
    }

    /// A sensor reading `value_json.<field>` from the device state topic.
    pub fn sensor(owner: &str, field: &str) -> Self {
        let mut component = Self::base("sensor", owner, field);
        component.force_update = Some(true);
        component.value_template = Some(format!("{{{{ value_json.{field} }}}}"));
        component
    }

    /// A binary sensor over a dedicated topic (availability-style values).
    pub fn binary_sensor(owner: &str, kind: &str) -> Self {
        let mut component = Self::base("binary_sensor", owner, kind);
        component.force_update = Some(true);
        component.value_template = Some("{{ value }}".to_string());
        component
    }

    /// A button publishing `{"action": "<action>"}` on the command topic.
    pub fn button(owner: &str, action: &str, command_topic: impl Into<String>) -> Self {
        let mut component = Self::base("button", owner, action);
        component.has_entity_name = None;
        component.command_topic = Some(command_topic.into());
        component.payload_press = Some(
            serde_json::json!({ "action": action }).to_string(),
        );
        component
    }

    // Attribute setters, builder style.

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit_of_measurement = Some(unit.to_string());
        self
    }

    pub fn device_class(mut self, class: &str) -> Self {
        self.device_class = Some(class.to_string());
        self
    }

    pub fn state_class(mut self, class: &str) -> Self {
        self.state_class = Some(class.to_string());
        self
    }

    pub fn value_template(mut self, template: &str) -> Self {
        self.value_template = Some(template.to_string());
        self
    }

    pub fn state_topic(mut self, topic: impl Into<String>) -> Self {
        self.state_topic = Some(topic.into());
        self
    }

    pub fn payloads(mut self, on: &str, off: &str) -> Self {
        self.payload_on = Some(on.to_string());
        self.payload_off = Some(off.to_string());
        self
    }

    pub fn availability(mut self, availability: Vec<Availability>) -> Self {
        self.availability = Some(availability);
        self
    }
}
