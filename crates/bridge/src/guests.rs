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

// src/guests.rs
// The guest registry: the bridge's view of which guests exist and where
// they live. Maintained by the discovery/refresh passes; consulted by
// command handling and by the backup tracker (as its guest directory).

use std::collections::HashMap;

use async_trait::async_trait;
use backup_watch::GuestDirectory;
use model::{GuestId, GuestKey};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestEntry {
    pub key: GuestKey,
    pub vmid: GuestId,
    pub name: String,
    pub node: String,
}

#[derive(Default)]
pub struct GuestRegistry {
    inner: RwLock<HashMap<GuestKey, GuestEntry>>,
}

impl GuestRegistry {
    pub async fn upsert(&self, entry: GuestEntry) {
        self.inner.write().await.insert(entry.key.clone(), entry);
    }

    pub async fn remove(&self, key: &GuestKey) -> Option<GuestEntry> {
        self.inner.write().await.remove(key)
    }

    pub async fn get(&self, key: &GuestKey) -> Option<GuestEntry> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn find_by_vmid(&self, vmid: GuestId) -> Option<GuestEntry> {
        self.inner
            .read()
            .await
            .values()
            .find(|entry| entry.vmid == vmid)
            .cloned()
    }

    /// Records a new placement after a migration.
    pub async fn set_node(&self, key: &GuestKey, node: &str) {
        if let Some(entry) = self.inner.write().await.get_mut(key) {
            entry.node = node.to_string();
        }
    }

    pub async fn snapshot(&self) -> Vec<GuestEntry> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl GuestDirectory for GuestRegistry {
    async fn resolve(&self, vmid: GuestId) -> Option<GuestKey> {
        self.find_by_vmid(vmid).await.map(|entry| entry.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(vmid: u32, key: &str, node: &str) -> GuestEntry {
        GuestEntry {
            key: GuestKey::from_raw(key),
            vmid: GuestId(vmid),
            name: key.to_string(),
            node: node.to_string(),
        }
    }

    #[tokio::test]
    async fn resolve_maps_vmid_to_key() {
        let registry = GuestRegistry::default();
        registry.upsert(entry(101, "101_web", "pve1")).await;
        registry.upsert(entry(102, "102_db", "pve2")).await;

        assert_eq!(
            registry.resolve(GuestId(101)).await,
            Some(GuestKey::from_raw("101_web"))
        );
        assert_eq!(registry.resolve(GuestId(999)).await, None);
    }

    #[tokio::test]
    async fn set_node_records_migration() {
        let registry = GuestRegistry::default();
        let key = GuestKey::from_raw("101_web");
        registry.upsert(entry(101, "101_web", "pve1")).await;

        registry.set_node(&key, "pve2").await;

        assert_eq!(registry.get(&key).await.unwrap().node, "pve2");
        assert_eq!(registry.len().await, 1);
    }
}
