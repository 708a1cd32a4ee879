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

// src/adapters.rs
// Glue from the backup tracker's collaborator traits onto the real cluster
// client and the bus.

use std::sync::Arc;

use async_trait::async_trait;
use backup_watch::{StatusSink, TaskSource};
use cluster::ClusterClient;
use model::{ActiveTask, BackupStatusPayload, GuestId, GuestKey, LogLine, TaskRef, TaskStatus};
use mqtt::{MqttClient, TopicScheme};

/// The cluster task API as seen by the tracker.
pub struct ClusterTaskSource(pub Arc<ClusterClient>);

#[async_trait]
impl TaskSource for ClusterTaskSource {
    async fn active_backup_tasks(&self) -> eyre::Result<Vec<ActiveTask>> {
        Ok(self.0.active_backup_tasks().await?)
    }

    async fn task_status(&self, task: &TaskRef) -> eyre::Result<Option<TaskStatus>> {
        Ok(self.0.task_status(task).await?)
    }

    async fn task_log(&self, task: &TaskRef) -> eyre::Result<Vec<LogLine>> {
        Ok(self.0.task_log(task).await?)
    }

    async fn start_backup(&self, node: &str, vmid: GuestId) -> eyre::Result<String> {
        Ok(self.0.start_backup(node, vmid).await?)
    }
}

/// Backup status publishes land retained on the guest's backup topic.
pub struct BusStatusSink {
    pub mqtt: Arc<MqttClient>,
    pub topics: TopicScheme,
}

#[async_trait]
impl StatusSink for BusStatusSink {
    async fn publish_backup_status(
        &self,
        key: &GuestKey,
        payload: &BackupStatusPayload,
    ) -> eyre::Result<()> {
        let topic = self.topics.backup_status(key.as_str());
        self.mqtt.publish_json(&topic, payload, true).await?;
        Ok(())
    }
}
