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
// The bridge daemon: configuration, wiring and the service loops.

mod adapters;
mod bridge;
mod command_line;
mod commands;
mod config;
mod guests;

use std::path::Path;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::info;

pub use command_line::{Command, Daemon, Options};
pub use config::BridgeConfig;

/// Entry point: resolves options into a configuration and runs the bridge
/// until SIGINT/SIGTERM.
pub async fn start(options: Options) -> eyre::Result<()> {
    if options.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let daemon = match options.sub_cmd {
        Some(Command::Run(daemon)) => *daemon,
        None => Daemon::default(),
    };
    let config = match &daemon.config_path {
        Some(path) => BridgeConfig::load_from(Path::new(path))?,
        None => {
            info!("no configuration file given, using built-in defaults");
            BridgeConfig::default()
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut term = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    bridge::run(config, shutdown_rx).await
}
