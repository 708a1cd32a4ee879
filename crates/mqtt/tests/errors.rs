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

// tests/errors.rs
// Error creation, conversion, and categorization for the MQTT client.

use mqtt::MqttClientError;
use rumqttc::{ClientError, Disconnect, Request};

// Helper functions to create test errors
fn create_test_connection_error() -> ClientError {
    // Only two variants exist in rumqttc 0.24; Request is constructible.
    ClientError::Request(Request::Disconnect(Disconnect))
}

fn create_test_json_error() -> serde_json::Error {
    serde_json::from_str::<i32>("not a number").unwrap_err()
}

#[test]
fn connection_error_from_client_error() {
    let error = MqttClientError::from(create_test_connection_error());

    match error {
        MqttClientError::ConnectionError(_) => {} // Expected
        _ => panic!("Should be ConnectionError"),
    }

    assert!(error.is_connection_error());
    assert!(!error.is_serialization_error());
}

#[test]
fn json_error_converts_to_serialization_error() {
    let error = MqttClientError::from(create_test_json_error());

    match error {
        MqttClientError::JsonSerializationError(_) => {} // Expected
        _ => panic!("Should be JsonSerializationError"),
    }

    assert!(error.is_serialization_error());
    assert!(!error.is_connection_error());
}

#[test]
fn not_connected_counts_as_connection_error() {
    let error = MqttClientError::NotConnected;
    assert!(error.is_connection_error());
    assert!(!error.is_serialization_error());
}

#[test]
fn errors_render_a_readable_message() {
    let error = MqttClientError::from(create_test_json_error());
    assert!(error.to_string().starts_with("JSON serialization error"));
    assert_eq!(
        MqttClientError::NotConnected.to_string(),
        "MQTT client is not connected"
    );
}
