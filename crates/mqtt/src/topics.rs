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

// src/topics.rs
// Every topic shape the bridge speaks, in one place. Data and availability
// topics are retained publishes; command topics are inbound subscriptions.
//
//   <base>/nodes/<node>            node state document
//   <base>/nodes/<node>/availability
//   <base>/nodes/<node>/command
//   <base>/lxc/<key>               guest state document
//   <base>/lxc/<key>/availability
//   <base>/lxc/<key>/backup_status
//   <base>/lxc/<key>/command

/// Which kind of device an inbound command addresses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandScope {
    Node,
    Guest,
}

#[derive(Debug, Clone)]
pub struct TopicScheme {
    base: String,
}

impl TopicScheme {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn node_data(&self, node: &str) -> String {
        format!("{}/nodes/{node}", self.base)
    }

    pub fn node_availability(&self, node: &str) -> String {
        format!("{}/nodes/{node}/availability", self.base)
    }

    pub fn guest_data(&self, key: &str) -> String {
        format!("{}/lxc/{key}", self.base)
    }

    pub fn guest_availability(&self, key: &str) -> String {
        format!("{}/lxc/{key}/availability", self.base)
    }

    pub fn backup_status(&self, key: &str) -> String {
        format!("{}/lxc/{key}/backup_status", self.base)
    }

    pub fn node_command_filter(&self) -> String {
        format!("{}/nodes/+/command", self.base)
    }

    pub fn guest_command_filter(&self) -> String {
        format!("{}/lxc/+/command", self.base)
    }

    /// Parses an inbound command topic into its scope and target key.
    /// Returns `None` for anything that is not exactly
    /// `<base>/(nodes|lxc)/<key>/command`.
    pub fn parse_command(&self, topic: &str) -> Option<(CommandScope, String)> {
        let rest = topic.strip_prefix(self.base.as_str())?.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let scope = match parts.next()? {
            "nodes" => CommandScope::Node,
            "lxc" => CommandScope::Guest,
            _ => return None,
        };
        let key = parts.next()?;
        if key.is_empty() || parts.next()? != "command" || parts.next().is_some() {
            return None;
        }
        Some((scope, key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> TopicScheme {
        TopicScheme::new("paddock")
    }

    #[test]
    fn topic_shapes() {
        let t = scheme();
        assert_eq!(t.node_data("pve1"), "paddock/nodes/pve1");
        assert_eq!(t.guest_availability("101_web"), "paddock/lxc/101_web/availability");
        assert_eq!(t.backup_status("101_web"), "paddock/lxc/101_web/backup_status");
        assert_eq!(t.guest_command_filter(), "paddock/lxc/+/command");
    }

    #[test]
    fn command_topics_parse() {
        let t = scheme();
        assert_eq!(
            t.parse_command("paddock/lxc/101_web/command"),
            Some((CommandScope::Guest, "101_web".to_string()))
        );
        assert_eq!(
            t.parse_command("paddock/nodes/pve1/command"),
            Some((CommandScope::Node, "pve1".to_string()))
        );
    }

    #[test]
    fn malformed_command_topics_are_rejected() {
        let t = scheme();
        assert_eq!(t.parse_command("paddock/lxc/101_web"), None);
        assert_eq!(t.parse_command("paddock/lxc/101_web/command/extra"), None);
        assert_eq!(t.parse_command("paddock/storage/x/command"), None);
        assert_eq!(t.parse_command("other/lxc/101_web/command"), None);
        assert_eq!(t.parse_command("paddock/lxc//command"), None);
    }
}
