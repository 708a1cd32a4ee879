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

// src/lib.rs
// Thin MQTT client for the bridge: retained/JSON publishes out, command
// messages in. Wraps rumqttc; reconnection is the event loop's job.

mod client;
mod errors;
mod options;
pub mod topics;

pub use client::{CommandMessage, MqttClient};
pub use errors::MqttClientError;
pub use options::{ClientCredentials, ClientOptions};
pub use rumqttc::QoS;
pub use topics::{CommandScope, TopicScheme};
