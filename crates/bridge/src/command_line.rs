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

use clap::{ArgAction, Parser};

#[derive(Parser)]
#[clap(name = "paddock-bridge")]
pub struct Options {
    #[clap(long, default_value = "false", help = "Print version number and exit")]
    pub version: bool,

    #[clap(short, long, action = ArgAction::Count)]
    pub debug: u8,

    #[clap(subcommand)]
    pub sub_cmd: Option<Command>,
}

#[derive(Parser)]
pub enum Command {
    #[clap(about = "Run the bridge")]
    Run(Box<Daemon>),
}

#[derive(Parser, Default)]
pub struct Daemon {
    /// Path to the TOML configuration file. Without one, every setting
    /// falls back to its built-in default (local broker, local cluster).
    #[clap(long)]
    pub config_path: Option<String>,
}

impl Options {
    pub fn load() -> Self {
        Self::parse()
    }
}
