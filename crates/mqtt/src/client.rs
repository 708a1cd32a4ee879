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

// src/client.rs
// The MQTT client. Owns a rumqttc AsyncClient plus a background task that
// drives the event loop: reconnects, re-subscribes the command filters on
// every (re)connect, and forwards inbound publishes to the consumer.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::MqttClientError;
use crate::options::{
    ClientOptions, DEFAULT_CHANNEL_CAPACITY, DEFAULT_CLIENT_ID_PREFIX,
    DEFAULT_COMMAND_QUEUE_SIZE, DEFAULT_KEEP_ALIVE,
};

/// One inbound message from a subscribed command topic.
#[derive(Debug, Clone)]
pub struct CommandMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

pub struct MqttClient {
    client: AsyncClient,
    event_loop_task: JoinHandle<()>,
}

impl MqttClient {
    /// Connects to the broker and spawns the event-loop task. Returns the
    /// client and the receiver of inbound command messages for the given
    /// subscription filters.
    pub fn connect(
        host: &str,
        port: u16,
        command_filters: Vec<String>,
        options: ClientOptions,
    ) -> (Self, mpsc::Receiver<CommandMessage>) {
        let client_id = unique_client_id(
            options
                .client_id_prefix
                .as_deref()
                .unwrap_or(DEFAULT_CLIENT_ID_PREFIX),
        );
        let mut mqtt_options = MqttOptions::new(client_id.clone(), host, port);
        mqtt_options.set_keep_alive(options.keep_alive.unwrap_or(DEFAULT_KEEP_ALIVE));
        mqtt_options.set_clean_session(true);
        if let Some(credentials) = &options.credentials {
            mqtt_options
                .set_credentials(credentials.username.clone(), credentials.password.clone());
        }

        let capacity = options.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let (client, mut event_loop) = AsyncClient::new(mqtt_options, capacity);

        let queue_size = options
            .command_queue_size
            .unwrap_or(DEFAULT_COMMAND_QUEUE_SIZE);
        let (tx, rx) = mpsc::channel(queue_size);

        let subscriber = client.clone();
        let event_loop_task = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(%client_id, "connected to MQTT broker");
                        for filter in &command_filters {
                            if let Err(err) =
                                subscriber.subscribe(filter.clone(), QoS::AtLeastOnce).await
                            {
                                warn!(%filter, error = %err, "command subscription failed");
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        debug!(topic = %publish.topic, "command message received");
                        let message = CommandMessage {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        };
                        match tx.try_send(message) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                warn!(topic = %publish.topic, "command queue full, message dropped");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                debug!("command consumer gone, event loop exiting");
                                return;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "MQTT connection lost, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        (
            Self {
                client,
                event_loop_task,
            },
            rx,
        )
    }

    /// Publishes a raw payload.
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        retain: bool,
    ) -> Result<(), MqttClientError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload.into())
            .await?;
        Ok(())
    }

    /// Serializes a value to JSON and publishes it.
    pub async fn publish_json<T: Serialize>(
        &self,
        topic: &str,
        value: &T,
        retain: bool,
    ) -> Result<(), MqttClientError> {
        let payload = serde_json::to_vec(value)?;
        self.publish(topic, payload, retain).await
    }

    /// Clean disconnect: tells the broker goodbye and stops the event loop
    /// task. Publishes queued before this call are flushed by the broker
    /// handshake.
    pub async fn disconnect(&self) -> Result<(), MqttClientError> {
        self.client.disconnect().await?;
        self.event_loop_task.abort();
        Ok(())
    }
}

// The broker drops the older of two sessions with the same id; a restarted
// bridge must never race its former self.
fn unique_client_id(prefix: &str) -> String {
    static SEQ: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);
    let seq = SEQ.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("{prefix}_{}_{nanos:x}{seq}", std::process::id())
}
