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

// src/options.rs
// Configuration options for the MQTT client.

use std::time::Duration;

// ClientOptions are optional parameters for the client; every field has a
// const default so `ClientOptions::default()` is a working configuration
// for an unauthenticated local broker.
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    // keep_alive sets the keepalive for broker connections.
    // Defaults to DEFAULT_KEEP_ALIVE.
    pub keep_alive: Option<Duration>,
    // channel_capacity is the number of requests the underlying async
    // client buffers between caller and event loop.
    // Defaults to DEFAULT_CHANNEL_CAPACITY.
    pub channel_capacity: Option<usize>,
    // command_queue_size bounds the inbound command channel handed to the
    // consumer. Commands beyond it are dropped with a warning rather than
    // stalling the event loop.
    // Defaults to DEFAULT_COMMAND_QUEUE_SIZE.
    pub command_queue_size: Option<usize>,
    // credentials are optional username/password credentials for the
    // broker.
    pub credentials: Option<ClientCredentials>,
    // client_id_prefix is the stable part of the client id; a per-process
    // suffix is appended so a restarted bridge never collides with its
    // former session.
    pub client_id_prefix: Option<String>,
}

pub(crate) const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
pub(crate) const DEFAULT_CHANNEL_CAPACITY: usize = 64;
pub(crate) const DEFAULT_COMMAND_QUEUE_SIZE: usize = 128;
pub(crate) const DEFAULT_CLIENT_ID_PREFIX: &str = "paddock";

impl ClientOptions {
    // Builder methods that consume and return Self
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    pub fn with_command_queue_size(mut self, size: usize) -> Self {
        self.command_queue_size = Some(size);
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(ClientCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_client_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.client_id_prefix = Some(prefix.into());
        self
    }
}

// ClientCredentials are used for providing a username and password to the
// MQTT broker.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_fields() {
        let options = ClientOptions::default()
            .with_keep_alive(Duration::from_secs(10))
            .with_credentials("user", "secret")
            .with_client_id_prefix("bridge");

        assert_eq!(options.keep_alive, Some(Duration::from_secs(10)));
        assert_eq!(options.credentials.as_ref().unwrap().username, "user");
        assert_eq!(options.client_id_prefix.as_deref(), Some("bridge"));
        assert_eq!(options.channel_capacity, None);
    }
}
