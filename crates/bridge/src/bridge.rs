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

// src/bridge.rs
// The bridge itself: initial discovery, the three periodic passes, command
// dispatch, and shutdown. Everything that mutates shared state (the guest
// registry aside) runs inside one select loop, so the tracked-task table
// has a single owner and needs no lock.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use backup_watch::{BackupTracker, TrackerConfig};
use chrono::Utc;
use cluster::{ClusterClient, ClusterConfig};
use discovery::GuestFacts;
use eyre::Result;
use model::{BackupPhase, BackupStatusPayload, GuestKey};
use mqtt::{ClientOptions, CommandMessage, CommandScope, MqttClient, TopicScheme};
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::adapters::{BusStatusSink, ClusterTaskSource};
use crate::commands::{GuestAction, NodeAction, parse_guest_command, parse_node_command};
use crate::config::BridgeConfig;
use crate::guests::{GuestEntry, GuestRegistry};

/// Builds all collaborators from the configuration and runs the bridge
/// until the shutdown signal fires.
pub async fn run(config: BridgeConfig, shutdown: watch::Receiver<bool>) -> Result<()> {
    info!(
        cluster = %config.cluster.host,
        broker = %config.mqtt.host,
        "starting paddock bridge"
    );

    let cluster = Arc::new(ClusterClient::new(ClusterConfig {
        host: config.cluster.host.clone(),
        port: config.cluster.port,
        user: config.cluster.user.clone(),
        password: config.cluster.password.clone(),
        realm: config.cluster.realm.clone(),
    })?);

    let topics = TopicScheme::new(&config.mqtt.base_topic);
    let mut options = ClientOptions::default().with_client_id_prefix(&config.mqtt.client_id);
    if let (Some(user), Some(pass)) = (&config.mqtt.username, &config.mqtt.password) {
        options = options.with_credentials(user, pass);
    }
    let (mqtt, commands) = MqttClient::connect(
        &config.mqtt.host,
        config.mqtt.port,
        vec![topics.node_command_filter(), topics.guest_command_filter()],
        options,
    );
    let mqtt = Arc::new(mqtt);

    let registry = Arc::new(GuestRegistry::default());
    let tracker = BackupTracker::new(
        Arc::new(ClusterTaskSource(cluster.clone())),
        Arc::new(BusStatusSink {
            mqtt: mqtt.clone(),
            topics: topics.clone(),
        }),
        registry.clone(),
        TrackerConfig::default(),
    );

    let bridge = Bridge {
        config,
        cluster,
        mqtt,
        topics,
        registry,
        tracker,
        nodes: Vec::new(),
    };
    bridge.run(commands, shutdown).await
}

struct Bridge {
    config: BridgeConfig,
    cluster: Arc<ClusterClient>,
    mqtt: Arc<MqttClient>,
    topics: TopicScheme,
    registry: Arc<GuestRegistry>,
    tracker: BackupTracker,
    nodes: Vec<String>,
}

impl Bridge {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<CommandMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        self.discover_nodes().await;
        self.refresh_guests().await;
        info!(
            nodes = self.nodes.len(),
            guests = self.registry.len().await,
            "bridge ready"
        );

        let update_period = Duration::from_secs(self.config.period.update_secs.max(1));
        let refresh_period = Duration::from_secs(self.config.period.refresh_secs.max(1));
        let backup_period = Duration::from_secs(self.config.period.backup_check_secs.max(1));
        info!(
            update = %humantime::format_duration(update_period),
            refresh = %humantime::format_duration(refresh_period),
            backup_check = %humantime::format_duration(backup_period),
            "periodic passes configured"
        );
        let mut update = interval(update_period);
        let mut refresh = interval(refresh_period);
        let mut backup = interval(backup_period);
        for ticker in [&mut update, &mut refresh, &mut backup] {
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }
        // The first refresh tick would repeat the initial discovery.
        refresh.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    break;
                }
                Some(command) = commands.recv() => {
                    self.handle_command(command).await;
                }
                _ = backup.tick() => {
                    self.tracker.scan().await;
                    self.tracker.poll_cycle().await;
                    for (task, state) in self.tracker.snapshot() {
                        debug!(task = %task, %state, "tracked backup task");
                    }
                }
                _ = update.tick() => {
                    self.update_all().await;
                }
                _ = refresh.tick() => {
                    self.discover_nodes().await;
                    self.refresh_guests().await;
                }
            }
        }

        self.shutdown_cleanup().await;
        Ok(())
    }

    /// Lists cluster nodes, publishes discovery for current ones and
    /// removal for nodes that left the cluster.
    async fn discover_nodes(&mut self) {
        let found = match self.cluster.nodes().await {
            Ok(nodes) => nodes,
            Err(err) => {
                error!(error = %err, "node discovery failed");
                return;
            }
        };

        for node in self.nodes.iter().filter(|n| !found.contains(n)) {
            info!(%node, "node left the cluster, removing its discovery");
            let topic = discovery::config_topic("nodes", node);
            if let Err(err) = self.mqtt.publish(&topic, "", true).await {
                warn!(%node, error = %err, "node discovery removal failed");
            }
            self.publish_availability(self.topics.node_availability(node), false)
                .await;
        }

        for node in &found {
            if !self.nodes.contains(node) {
                info!(%node, "node discovered");
            }
            let (topic, document) = discovery::node_device(&self.topics, node);
            if let Err(err) = self.mqtt.publish_json(&topic, &document, true).await {
                warn!(%node, error = %err, "node discovery publish failed");
            }
            self.publish_availability(self.topics.node_availability(node), true)
                .await;
        }

        self.nodes = found;
    }

    /// Walks every node's guest list: publishes discovery for new guests,
    /// updates placement after migrations, and removes guests that are
    /// gone from the whole cluster. Guests on a node that failed to answer
    /// are left untouched rather than treated as removed.
    async fn refresh_guests(&mut self) {
        let mut seen: HashSet<GuestKey> = HashSet::new();
        let mut failed_nodes: HashSet<String> = HashSet::new();

        for node in self.nodes.clone() {
            let guests = match self.cluster.guests(&node).await {
                Ok(guests) => guests,
                Err(err) => {
                    warn!(%node, error = %err, "guest listing failed");
                    failed_nodes.insert(node);
                    continue;
                }
            };
            for guest in guests {
                seen.insert(guest.key.clone());
                let entry = GuestEntry {
                    key: guest.key.clone(),
                    vmid: guest.vmid,
                    name: guest.name.clone(),
                    node: node.clone(),
                };
                match self.registry.get(&guest.key).await {
                    None => {
                        info!(key = %guest.key, node, "guest discovered");
                        self.publish_guest_discovery(&entry).await;
                        self.publish_availability(
                            self.topics.guest_availability(entry.key.as_str()),
                            true,
                        )
                        .await;
                    }
                    Some(existing) if existing.node != node => {
                        info!(
                            key = %guest.key,
                            from = %existing.node,
                            to = %node,
                            "guest migrated, updating discovery"
                        );
                        self.publish_guest_discovery(&entry).await;
                    }
                    Some(_) => {
                        // Republish anyway: keeps the retained document
                        // consistent if it was lost or the schema changed.
                        self.publish_guest_discovery(&entry).await;
                    }
                }
                self.registry.upsert(entry).await;
            }
        }

        for entry in self.registry.snapshot().await {
            if seen.contains(&entry.key) || failed_nodes.contains(&entry.node) {
                continue;
            }
            info!(key = %entry.key, "guest removed from the cluster");
            self.registry.remove(&entry.key).await;
            let topic = discovery::config_topic("lxc", entry.key.as_str());
            if let Err(err) = self.mqtt.publish(&topic, "", true).await {
                warn!(key = %entry.key, error = %err, "guest discovery removal failed");
            }
            self.publish_availability(self.topics.guest_availability(entry.key.as_str()), false)
                .await;
        }
    }

    /// One data-publish pass over every node and guest.
    async fn update_all(&mut self) {
        for node in self.nodes.clone() {
            self.update_node(&node).await;
        }
        for entry in self.registry.snapshot().await {
            self.update_guest(&entry).await;
        }
    }

    async fn update_node(&self, node: &str) {
        match self.cluster.node_status(node).await {
            Ok(metrics) => {
                let online = metrics.state == "online";
                if let Err(err) = self
                    .mqtt
                    .publish_json(&self.topics.node_data(node), &metrics, true)
                    .await
                {
                    warn!(node, error = %err, "node data publish failed");
                }
                self.publish_availability(self.topics.node_availability(node), online)
                    .await;
            }
            Err(err) => {
                warn!(node, error = %err, "node status fetch failed");
                self.publish_availability(self.topics.node_availability(node), false)
                    .await;
            }
        }
    }

    async fn update_guest(&self, entry: &GuestEntry) {
        match self.cluster.guest_status(&entry.node, entry.vmid).await {
            Ok(metrics) if metrics.ignored => {
                debug!(key = %entry.key, "guest now carries the ignore tag, not published");
            }
            Ok(metrics) => {
                if let Err(err) = self
                    .mqtt
                    .publish_json(&self.topics.guest_data(entry.key.as_str()), &metrics, true)
                    .await
                {
                    warn!(key = %entry.key, error = %err, "guest data publish failed");
                }
                self.publish_availability(
                    self.topics.guest_availability(entry.key.as_str()),
                    true,
                )
                .await;
            }
            Err(err) if err.is_not_found() => {
                self.recover_migration(entry).await;
            }
            Err(err) => {
                warn!(key = %entry.key, error = %err, "guest status fetch failed");
                self.publish_availability(
                    self.topics.guest_availability(entry.key.as_str()),
                    false,
                )
                .await;
            }
        }
    }

    /// A guest that vanished from its node usually migrated. Scan the
    /// cluster for it, update the registry and discovery, and publish
    /// fresh data from the new node.
    async fn recover_migration(&self, entry: &GuestEntry) {
        warn!(key = %entry.key, node = %entry.node, "guest missing from its node, scanning cluster");
        match self.cluster.find_guest(entry.vmid).await {
            Ok(Some((node, _))) => {
                info!(key = %entry.key, from = %entry.node, to = %node, "guest migration detected");
                self.registry.set_node(&entry.key, &node).await;
                let moved = GuestEntry {
                    node: node.clone(),
                    ..entry.clone()
                };
                self.publish_guest_discovery(&moved).await;
                match self.cluster.guest_status(&node, entry.vmid).await {
                    Ok(metrics) if !metrics.ignored => {
                        if let Err(err) = self
                            .mqtt
                            .publish_json(
                                &self.topics.guest_data(entry.key.as_str()),
                                &metrics,
                                true,
                            )
                            .await
                        {
                            warn!(key = %entry.key, error = %err, "guest data publish failed");
                        }
                        self.publish_availability(
                            self.topics.guest_availability(entry.key.as_str()),
                            true,
                        )
                        .await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(key = %entry.key, error = %err, "guest status fetch failed after migration");
                    }
                }
            }
            Ok(None) => {
                error!(key = %entry.key, vmid = %entry.vmid, "guest not found on any node");
                self.publish_availability(
                    self.topics.guest_availability(entry.key.as_str()),
                    false,
                )
                .await;
            }
            Err(err) => {
                warn!(key = %entry.key, error = %err, "cluster scan for migrated guest failed");
                self.publish_availability(
                    self.topics.guest_availability(entry.key.as_str()),
                    false,
                )
                .await;
            }
        }
    }

    async fn handle_command(&mut self, command: CommandMessage) {
        let Some((scope, key)) = self.topics.parse_command(&command.topic) else {
            warn!(topic = %command.topic, "message on unrecognized command topic");
            return;
        };
        match scope {
            CommandScope::Guest => self.handle_guest_command(&key, &command.payload).await,
            CommandScope::Node => self.handle_node_command(&key, &command.payload).await,
        }
    }

    async fn handle_guest_command(&mut self, key: &str, payload: &[u8]) {
        let action = match parse_guest_command(payload) {
            Ok(action) => action,
            Err(reason) => {
                warn!(key, %reason, "guest command rejected");
                return;
            }
        };
        let key = GuestKey::from_raw(key);
        let Some(entry) = self.registry.get(&key).await else {
            warn!(%key, ?action, "command for unknown guest");
            return;
        };
        info!(%key, ?action, "guest command received");

        let result = match action {
            GuestAction::Start => self.cluster.start_guest(&entry.node, entry.vmid).await,
            GuestAction::Stop => self.cluster.stop_guest(&entry.node, entry.vmid).await,
            GuestAction::Reboot => self.cluster.reboot_guest(&entry.node, entry.vmid).await,
            GuestAction::Refresh => {
                self.update_guest(&entry).await;
                Ok(())
            }
            GuestAction::Backup => {
                self.manual_backup(&entry).await;
                Ok(())
            }
        };
        if let Err(err) = result {
            error!(%key, ?action, error = %err, "guest command failed");
        }
    }

    async fn manual_backup(&mut self, entry: &GuestEntry) {
        match self.tracker.start_backup(&entry.node, entry.vmid).await {
            Ok(task) => {
                info!(key = %entry.key, task = %task, "backup task started");
            }
            Err(err) => {
                error!(key = %entry.key, error = %err, "backup start failed");
                // Report the failure on the status topic too; a consumer
                // pressing the backup button gets feedback either way.
                let now = Utc::now();
                let payload = BackupStatusPayload {
                    status: BackupPhase::Error,
                    progress: BackupPhase::Error.progress_label(),
                    task_id: None,
                    vmid: entry.vmid,
                    node: entry.node.clone(),
                    start_time: Some(now.timestamp()),
                    end_time: Some(now.timestamp()),
                    result: None,
                    size_gib: None,
                    total_size_gib: None,
                    duration: None,
                    duration_seconds: None,
                    speed: None,
                    compression: None,
                    compression_ratio: None,
                    error: Some(err.to_string()),
                    timestamp: now.to_rfc3339(),
                };
                let topic = self.topics.backup_status(entry.key.as_str());
                if let Err(err) = self.mqtt.publish_json(&topic, &payload, true).await {
                    warn!(key = %entry.key, error = %err, "backup failure publish failed");
                }
            }
        }
    }

    async fn handle_node_command(&mut self, node: &str, payload: &[u8]) {
        let action = match parse_node_command(payload) {
            Ok(action) => action,
            Err(reason) => {
                warn!(node, %reason, "node command rejected");
                return;
            }
        };
        if !self.nodes.iter().any(|n| n == node) {
            warn!(node, ?action, "command for unknown node");
            return;
        }
        info!(node, ?action, "node command received");

        let result = match action {
            NodeAction::Restart => self.cluster.node_command(node, "reboot").await,
            NodeAction::Shutdown => self.cluster.node_command(node, "shutdown").await,
            NodeAction::Refresh => {
                self.update_node(node).await;
                Ok(())
            }
        };
        if let Err(err) = result {
            error!(node, ?action, error = %err, "node command failed");
        }
    }

    async fn publish_guest_discovery(&self, entry: &GuestEntry) {
        let facts = GuestFacts {
            key: entry.key.clone(),
            vmid: entry.vmid,
            name: entry.name.clone(),
            node: entry.node.clone(),
            configuration_url: Some(format!(
                "https://{}:{}/#v1:0:=lxc%2F{}:4:5:=content",
                self.config.cluster.host, self.config.cluster.port, entry.vmid
            )),
        };
        let (topic, document) = discovery::guest_device(&self.topics, &facts);
        if let Err(err) = self.mqtt.publish_json(&topic, &document, true).await {
            warn!(key = %entry.key, error = %err, "guest discovery publish failed");
        }
    }

    async fn publish_availability(&self, topic: String, online: bool) {
        let payload = if online { "online" } else { "offline" };
        if let Err(err) = self.mqtt.publish(&topic, payload, true).await {
            warn!(%topic, error = %err, "availability publish failed");
        }
    }

    /// Timers are dropped with the loop; in-flight API calls were awaited
    /// inline, so nothing needs cancelling. Mark nodes offline and leave.
    async fn shutdown_cleanup(&self) {
        info!("shutting down");
        for node in &self.nodes {
            self.publish_availability(self.topics.node_availability(node), false)
                .await;
        }
        if let Err(err) = self.mqtt.disconnect().await {
            warn!(error = %err, "MQTT disconnect failed");
        }
        info!("bridge stopped");
    }
}
