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

// src/guest.rs
// Guest identity: the numeric cluster id and the stable key used in topics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric id of a VM or container as assigned by the cluster.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a valid guest id: {0:?}")]
pub struct ParseGuestIdError(pub String);

impl FromStr for GuestId {
    type Err = ParseGuestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(GuestId)
            .map_err(|_| ParseGuestIdError(s.to_string()))
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for GuestId {
    fn from(raw: u32) -> Self {
        GuestId(raw)
    }
}

/// Stable key for a guest, used in every topic that refers to it.
///
/// The key is `{vmid}_{name}` with the name lowercased, every
/// non-alphanumeric run collapsed to a single underscore. It stays the same
/// across migrations, which keeps retained topics consistent when a guest
/// moves between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestKey(String);

impl GuestKey {
    pub fn new(vmid: GuestId, name: &str) -> Self {
        let mut normalized = String::with_capacity(name.len());
        let mut last_was_sep = false;
        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                normalized.push(c.to_ascii_lowercase());
                last_was_sep = false;
            } else if !last_was_sep {
                normalized.push('_');
                last_was_sep = true;
            }
        }
        GuestKey(format!("{vmid}_{normalized}"))
    }

    /// Reconstructs a key from its raw topic form, e.g. when parsing an
    /// inbound command topic. No normalization is applied.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        GuestKey(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_id_parses_digits() {
        assert_eq!("101".parse::<GuestId>(), Ok(GuestId(101)));
        assert_eq!(" 170 ".parse::<GuestId>(), Ok(GuestId(170)));
    }

    #[test]
    fn guest_id_rejects_garbage() {
        assert!("".parse::<GuestId>().is_err());
        assert!("10a".parse::<GuestId>().is_err());
        assert!("-3".parse::<GuestId>().is_err());
    }

    #[test]
    fn guest_key_normalizes_names() {
        let key = GuestKey::new(GuestId(101), "My Web-Server");
        assert_eq!(key.as_str(), "101_my_web_server");
    }

    #[test]
    fn guest_key_collapses_separator_runs() {
        let key = GuestKey::new(GuestId(7), "a--b  c");
        assert_eq!(key.as_str(), "7_a_b_c");
    }
}
