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
// The cluster API client. Cookie-ticket authentication with a single
// re-authentication retry on 401; every endpoint maps its wire DTO into a
// model type before returning.

use std::time::Duration;

use chrono::Utc;
use model::{
    ActiveTask, GuestId, GuestKey, GuestMetrics, LogLine, NodeMetrics, TaskRef, TaskState,
    TaskStatus, UsagePair,
};
use reqwest::{Method, StatusCode, header};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::ClusterError;
use crate::types::{
    ApiData, LxcEntry, LxcStatusData, NodeEntry, NodeStatusData, TaskEntry, TaskLogEntry,
    TaskStatusData, TicketData,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on log lines fetched per task. vzdump logs for a full
/// multi-guest run stay well under this.
const TASK_LOG_LIMIT: u32 = 5000;

/// Tag that excludes a guest from the bridge entirely.
const IGNORE_TAG: &str = "ha-ignore";

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub realm: String,
}

struct Session {
    ticket: String,
    csrf_token: Option<String>,
}

/// A guest as it appears in a node's guest listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestSummary {
    pub vmid: GuestId,
    pub name: String,
    pub key: GuestKey,
    pub state: String,
    pub tags: Vec<String>,
}

pub struct ClusterClient {
    http: reqwest::Client,
    base: String,
    config: ClusterConfig,
    session: RwLock<Option<Session>>,
}

impl ClusterClient {
    /// Builds the client. Cluster nodes almost always run with self-signed
    /// certificates, so certificate validation is disabled, matching the
    /// trust model of the ticket endpoint itself.
    pub fn new(config: ClusterConfig) -> Result<Self, ClusterError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(HTTP_TIMEOUT)
            .build()?;
        let base = format!("https://{}:{}/api2/json", config.host, config.port);
        Ok(Self {
            http,
            base,
            config,
            session: RwLock::new(None),
        })
    }

    async fn ensure_session(&self) -> Result<(), ClusterError> {
        if self.session.read().await.is_some() {
            return Ok(());
        }
        let url = format!("{}/access/ticket", self.base);
        let form = [
            (
                "username",
                format!("{}@{}", self.config.user, self.config.realm),
            ),
            ("password", self.config.password.clone()),
        ];
        let resp = self.http.post(&url).form(&form).send().await?;
        if !resp.status().is_success() {
            return Err(ClusterError::Auth);
        }
        let body: ApiData<TicketData> = resp.json().await?;
        let ticket = body.data.ok_or(ClusterError::Auth)?;
        info!(host = %self.config.host, "authenticated with the cluster API");
        *self.session.write().await = Some(Session {
            ticket: ticket.ticket,
            csrf_token: ticket.csrf_token,
        });
        Ok(())
    }

    /// Sends one request, re-authenticating once if the ticket was
    /// rejected. The request is rebuilt on retry; reqwest builders are
    /// single-use.
    async fn send(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, String)]>,
    ) -> Result<reqwest::Response, ClusterError> {
        for attempt in 0..2 {
            self.ensure_session().await?;
            let url = format!("{}{}", self.base, path);
            let mut req = self.http.request(method.clone(), &url);
            {
                let session = self.session.read().await;
                if let Some(session) = session.as_ref() {
                    req = req.header(
                        header::COOKIE,
                        format!("PVEAuthCookie={}", session.ticket),
                    );
                    if method != Method::GET {
                        if let Some(token) = &session.csrf_token {
                            req = req.header("CSRFPreventionToken", token);
                        }
                    }
                }
            }
            if let Some(fields) = form {
                req = req.form(&fields);
            }
            let resp = req.send().await?;
            if resp.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!("cluster ticket rejected, re-authenticating");
                self.session.write().await.take();
                continue;
            }
            return Ok(resp);
        }
        Err(ClusterError::Auth)
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ClusterError> {
        let resp = self.send(Method::GET, path, None).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClusterError::InvalidResponse {
                endpoint: path.to_string(),
                detail: format!("http status {status}"),
            });
        }
        let body: ApiData<T> = resp.json().await?;
        Ok(body.data)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<Option<T>, ClusterError> {
        let resp = self.send(Method::POST, path, Some(form)).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClusterError::InvalidResponse {
                endpoint: path.to_string(),
                detail: format!("http status {status}"),
            });
        }
        let body: ApiData<T> = resp.json().await?;
        Ok(body.data)
    }

    /// Names of all cluster nodes.
    pub async fn nodes(&self) -> Result<Vec<String>, ClusterError> {
        let entries: Vec<NodeEntry> = self.get_data("/nodes").await?.unwrap_or_default();
        Ok(entries.into_iter().map(|n| n.node).collect())
    }

    /// Full status document for one node, including the keys of the guests
    /// currently placed on it.
    pub async fn node_status(&self, node: &str) -> Result<NodeMetrics, ClusterError> {
        let path = format!("/nodes/{node}/status");
        let status: NodeStatusData =
            self.get_data(&path)
                .await?
                .ok_or_else(|| ClusterError::InvalidResponse {
                    endpoint: path.clone(),
                    detail: "empty data".to_string(),
                })?;

        let guests = self.guests(node).await?;
        let uptime = status.uptime.unwrap_or(0);
        let memory = status.memory.map_or(UsagePair::default(), |m| {
            UsagePair::new(m.used.unwrap_or(0), m.total.unwrap_or(0))
        });
        let rootfs = status.rootfs.map_or(UsagePair::default(), |d| {
            UsagePair::new(d.used.unwrap_or(0), d.total.unwrap_or(0))
        });
        let loadavg = status.loadavg.unwrap_or([0.0; 3]);

        Ok(NodeMetrics {
            node: node.to_string(),
            state: if uptime > 0 { "online" } else { "offline" }.to_string(),
            uptime,
            cpu_usage: cpu_percent(status.cpu),
            cpu_cores: status.cpuinfo.and_then(|c| c.cpus).unwrap_or(0),
            mem_usage: memory.usage,
            mem_used: memory.used,
            mem_total: memory.total,
            disk_usage: rootfs.usage,
            disk_used: rootfs.used,
            disk_total: rootfs.total,
            load1: loadavg[0],
            load5: loadavg[1],
            load15: loadavg[2],
            lxc_list: guests.into_iter().map(|g| g.key).collect(),
            last_update: Utc::now().to_rfc3339(),
        })
    }

    /// Guests on a node, minus the ones tagged to be ignored.
    pub async fn guests(&self, node: &str) -> Result<Vec<GuestSummary>, ClusterError> {
        let path = format!("/nodes/{node}/lxc");
        let entries: Vec<LxcEntry> = self.get_data(&path).await?.unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let tags = split_tags(entry.tags.as_deref());
                if tags.iter().any(|t| t == IGNORE_TAG) {
                    debug!(vmid = entry.vmid, node, "guest carries the ignore tag, skipped");
                    return None;
                }
                let vmid = GuestId(entry.vmid);
                let name = entry.name.unwrap_or_else(|| format!("CT-{vmid}"));
                Some(GuestSummary {
                    key: GuestKey::new(vmid, &name),
                    vmid,
                    name,
                    state: entry.status.unwrap_or_else(|| "unknown".to_string()),
                    tags,
                })
            })
            .collect())
    }

    /// Current status of one guest. A 404/500 maps to `GuestNotFound` so
    /// callers can run migration recovery.
    pub async fn guest_status(
        &self,
        node: &str,
        vmid: GuestId,
    ) -> Result<GuestMetrics, ClusterError> {
        let path = format!("/nodes/{node}/lxc/{vmid}/status/current");
        let resp = self.send(Method::GET, &path, None).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::INTERNAL_SERVER_ERROR {
            return Err(ClusterError::GuestNotFound {
                node: node.to_string(),
                vmid,
            });
        }
        if !status.is_success() {
            return Err(ClusterError::InvalidResponse {
                endpoint: path,
                detail: format!("http status {status}"),
            });
        }
        let body: ApiData<LxcStatusData> = resp.json().await?;
        let data = body.data.ok_or_else(|| ClusterError::InvalidResponse {
            endpoint: path,
            detail: "empty data".to_string(),
        })?;

        let name = data.name.unwrap_or_else(|| format!("CT-{vmid}"));
        let tags = split_tags(data.tags.as_deref());
        let memory = UsagePair::new(data.mem.unwrap_or(0), data.maxmem.unwrap_or(0));
        let disk = UsagePair::new(data.disk.unwrap_or(0), data.maxdisk.unwrap_or(0));
        let swap = UsagePair::new(data.swap.unwrap_or(0), data.maxswap.unwrap_or(0));

        Ok(GuestMetrics {
            key: GuestKey::new(vmid, &name),
            ignored: tags.iter().any(|t| t == IGNORE_TAG),
            state: data.status.unwrap_or_else(|| "unknown".to_string()),
            name,
            tags,
            vmid,
            node: node.to_string(),
            cpu_usage: cpu_percent(data.cpu),
            cpu_cores: data.cpus.unwrap_or(0),
            mem_usage: memory.usage,
            mem_used: memory.used,
            mem_total: memory.total,
            disk_usage: disk.usage,
            disk_used: disk.used,
            disk_total: disk.total,
            swap_usage: swap.usage,
            swap_used: swap.used,
            swap_total: swap.total,
            net_in: data.netin.unwrap_or(0),
            net_out: data.netout.unwrap_or(0),
            uptime: data.uptime.unwrap_or(0),
            last_update: Utc::now().to_rfc3339(),
        })
    }

    /// Scans every node for a guest id. Used after a `GuestNotFound` to
    /// locate a migrated guest.
    pub async fn find_guest(
        &self,
        vmid: GuestId,
    ) -> Result<Option<(String, GuestSummary)>, ClusterError> {
        for node in self.nodes().await? {
            match self.guests(&node).await {
                Ok(guests) => {
                    if let Some(guest) = guests.into_iter().find(|g| g.vmid == vmid) {
                        return Ok(Some((node, guest)));
                    }
                }
                Err(err) => {
                    debug!(%node, error = %err, "guest scan failed on node, continuing");
                }
            }
        }
        Ok(None)
    }

    /// All currently active backup tasks across the cluster. A node that
    /// fails to answer is skipped; its tasks surface on a later scan.
    pub async fn active_backup_tasks(&self) -> Result<Vec<ActiveTask>, ClusterError> {
        let mut tasks = Vec::new();
        for node in self.nodes().await? {
            let path = format!("/nodes/{node}/tasks?source=active&typefilter=vzdump&limit=200");
            let entries: Vec<TaskEntry> = match self.get_data(&path).await {
                Ok(data) => data.unwrap_or_default(),
                Err(err) => {
                    warn!(%node, error = %err, "active task listing failed on node");
                    continue;
                }
            };
            for entry in entries {
                if entry.task_type.as_deref() != Some("vzdump") {
                    continue;
                }
                tasks.push(ActiveTask {
                    guest_id: entry.id.as_deref().and_then(|id| id.parse().ok()),
                    start_time: entry.starttime.unwrap_or(0),
                    state: entry
                        .status
                        .as_deref()
                        .map_or(TaskState::Running, TaskState::from_api),
                    node: node.clone(),
                    upid: entry.upid,
                });
            }
        }
        Ok(tasks)
    }

    /// Status of one task, or `None` if the cluster no longer knows it.
    pub async fn task_status(
        &self,
        task: &TaskRef,
    ) -> Result<Option<TaskStatus>, ClusterError> {
        let path = format!("/nodes/{}/tasks/{}/status", task.node, task.upid);
        let resp = self.send(Method::GET, &path, None).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::INTERNAL_SERVER_ERROR {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ClusterError::InvalidResponse {
                endpoint: path,
                detail: format!("http status {status}"),
            });
        }
        let body: ApiData<TaskStatusData> = resp.json().await?;
        Ok(body.data.map(|data| TaskStatus {
            state: TaskState::from_api(&data.status),
            exit_status: data.exitstatus,
        }))
    }

    /// Ordered log lines of one task.
    pub async fn task_log(&self, task: &TaskRef) -> Result<Vec<LogLine>, ClusterError> {
        let path = format!(
            "/nodes/{}/tasks/{}/log?start=0&limit={TASK_LOG_LIMIT}",
            task.node, task.upid
        );
        let resp = self.send(Method::GET, &path, None).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::INTERNAL_SERVER_ERROR {
            return Err(ClusterError::TaskNotFound(task.clone()));
        }
        if !status.is_success() {
            return Err(ClusterError::InvalidResponse {
                endpoint: path,
                detail: format!("http status {status}"),
            });
        }
        let body: ApiData<Vec<TaskLogEntry>> = resp.json().await?;
        Ok(body
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|entry| LogLine {
                n: entry.n,
                text: entry.t.unwrap_or_default(),
            })
            .collect())
    }

    /// Starts a backup of one guest. Returns the task upid; a response
    /// without one is an invalid-response error, distinguishable from
    /// transport failures.
    pub async fn start_backup(
        &self,
        node: &str,
        vmid: GuestId,
    ) -> Result<String, ClusterError> {
        let path = format!("/nodes/{node}/vzdump");
        let upid: Option<String> = self
            .post_form(&path, &[("vmid", vmid.to_string())])
            .await?;
        match upid {
            Some(upid) if !upid.is_empty() => Ok(upid),
            _ => Err(ClusterError::InvalidResponse {
                endpoint: path,
                detail: "backup start returned no task id".to_string(),
            }),
        }
    }

    pub async fn start_guest(&self, node: &str, vmid: GuestId) -> Result<(), ClusterError> {
        self.guest_lifecycle(node, vmid, "start").await
    }

    pub async fn stop_guest(&self, node: &str, vmid: GuestId) -> Result<(), ClusterError> {
        self.guest_lifecycle(node, vmid, "stop").await
    }

    pub async fn reboot_guest(&self, node: &str, vmid: GuestId) -> Result<(), ClusterError> {
        self.guest_lifecycle(node, vmid, "reboot").await
    }

    async fn guest_lifecycle(
        &self,
        node: &str,
        vmid: GuestId,
        action: &str,
    ) -> Result<(), ClusterError> {
        let path = format!("/nodes/{node}/lxc/{vmid}/status/{action}");
        let _: Option<String> = self.post_form(&path, &[]).await?;
        info!(node, %vmid, action, "guest lifecycle command sent");
        Ok(())
    }

    /// Node-level power command, "reboot" or "shutdown".
    pub async fn node_command(&self, node: &str, command: &str) -> Result<(), ClusterError> {
        let path = format!("/nodes/{node}/status");
        let _: Option<String> = self
            .post_form(&path, &[("command", command.to_string())])
            .await?;
        info!(node, command, "node power command sent");
        Ok(())
    }
}

fn cpu_percent(fraction: Option<f64>) -> u8 {
    (fraction.unwrap_or(0.0).clamp(0.0, 1.0) * 100.0).round() as u8
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|tags| {
        tags.split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_percent_clamps_and_rounds() {
        assert_eq!(cpu_percent(Some(0.034)), 3);
        assert_eq!(cpu_percent(Some(1.7)), 100);
        assert_eq!(cpu_percent(None), 0);
    }

    #[test]
    fn tags_split_on_semicolons() {
        assert_eq!(
            split_tags(Some("prod; ha-ignore ;web")),
            vec!["prod", "ha-ignore", "web"]
        );
        assert!(split_tags(None).is_empty());
        assert!(split_tags(Some("")).is_empty());
    }
}
