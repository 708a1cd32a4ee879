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

// src/errors.rs
// Error types for the MQTT client, with category predicates so callers can
// route without matching every variant.

#[derive(Debug, thiserror::Error)]
pub enum MqttClientError {
    // ConnectionError covers failures handed back by the underlying
    // client: publish/subscribe requests that could not be queued or sent.
    #[error("MQTT connection error: {0}")]
    ConnectionError(#[from] rumqttc::ClientError),

    // JsonSerializationError covers payloads that could not be encoded
    // before ever reaching the wire.
    #[error("JSON serialization error: {0}")]
    JsonSerializationError(#[from] serde_json::Error),

    // NotConnected is returned for operations attempted after the client
    // was shut down.
    #[error("MQTT client is not connected")]
    NotConnected,
}

impl MqttClientError {
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            MqttClientError::ConnectionError(_) | MqttClientError::NotConnected
        )
    }

    pub fn is_serialization_error(&self) -> bool {
        matches!(self, MqttClientError::JsonSerializationError(_))
    }
}
