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

// src/commands.rs
// Inbound command payloads: `{"action": "<verb>"}` on a node or guest
// command topic.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawCommand {
    action: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GuestAction {
    Start,
    Stop,
    Reboot,
    Refresh,
    Backup,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeAction {
    Restart,
    Shutdown,
    Refresh,
}

/// Parses a guest command payload. `Err` carries a human-readable reason
/// for the log line; unknown verbs are reported, not guessed at.
pub fn parse_guest_command(payload: &[u8]) -> Result<GuestAction, String> {
    let raw: RawCommand =
        serde_json::from_slice(payload).map_err(|e| format!("invalid JSON payload: {e}"))?;
    match raw.action.as_str() {
        "start" => Ok(GuestAction::Start),
        "stop" => Ok(GuestAction::Stop),
        "reboot" => Ok(GuestAction::Reboot),
        "refresh" => Ok(GuestAction::Refresh),
        "backup" => Ok(GuestAction::Backup),
        other => Err(format!("unknown guest action: {other:?}")),
    }
}

pub fn parse_node_command(payload: &[u8]) -> Result<NodeAction, String> {
    let raw: RawCommand =
        serde_json::from_slice(payload).map_err(|e| format!("invalid JSON payload: {e}"))?;
    match raw.action.as_str() {
        "restart" => Ok(NodeAction::Restart),
        "shutdown" => Ok(NodeAction::Shutdown),
        "refresh" => Ok(NodeAction::Refresh),
        other => Err(format!("unknown node action: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_actions_parse() {
        assert_eq!(
            parse_guest_command(br#"{"action": "backup"}"#),
            Ok(GuestAction::Backup)
        );
        assert_eq!(
            parse_guest_command(br#"{"action": "reboot"}"#),
            Ok(GuestAction::Reboot)
        );
    }

    #[test]
    fn bad_payloads_are_rejected_with_a_reason() {
        assert!(parse_guest_command(b"not json").is_err());
        assert!(parse_guest_command(br#"{"other": 1}"#).is_err());
        assert!(parse_guest_command(br#"{"action": "explode"}"#)
            .unwrap_err()
            .contains("explode"));
    }

    #[test]
    fn node_actions_parse() {
        assert_eq!(
            parse_node_command(br#"{"action": "shutdown"}"#),
            Ok(NodeAction::Shutdown)
        );
        assert!(parse_node_command(br#"{"action": "backup"}"#).is_err());
    }
}
