// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Command line of the `memcpy2d` benchmark.

use std::ffi::OsString;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap::error::ErrorKind;

/// Exit code of a usage error.
pub const USAGE_EXIT_CODE: u8 = 1;

/// Tiled asynchronous host/device copy benchmark.
#[derive(Debug, Parser)]
#[command(name = "memcpy2d", version, about)]
pub struct Cli {
    /// Number of tiles to copy; values above 64 are clamped
    #[arg(value_name = "N_TILES", value_parser = clap::value_parser!(u64).range(1..))]
    pub tiles: u64,
}

impl Cli {
    /// Parse `args`. Help and version requests exit 0; any other parse
    /// failure prints the usage message to stderr and exits 1.
    pub fn parse_or_exit<I, T>(args: I) -> Result<Self, ExitCode>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(cli) => Ok(cli),
            Err(e) => {
                let code = match e.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                    _ => ExitCode::from(USAGE_EXIT_CODE),
                };
                if let Err(io) = e.print() {
                    eprintln!("failed to print usage: {io}");
                }
                if code != ExitCode::SUCCESS && !e.to_string().contains("Usage:") {
                    eprintln!("\n{}", Self::command().render_usage());
                }
                Err(code)
            }
        }
    }
}
